//! Intermediate representations derived from templates.
pub mod key_usage;
