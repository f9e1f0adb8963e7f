//! content-i18n-engine
//!
//! Dynamic content and translation resolution engine: content rows keyed by
//! `(page, section, key, locale)`, nested per-locale message trees, locale
//! fallback, consistency maintenance, coverage diffs and automated
//! translation.

pub mod config;
pub mod coverage;
pub mod error;
pub mod fallback;
pub mod indexer;
pub mod input;
pub mod ir;
pub mod key_path;
pub mod maintenance;
pub mod resolver;
pub mod store;
pub mod syntax;
mod test_utils;
pub mod translate;
pub mod types;

pub use error::EngineError;
