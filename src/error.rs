//! Crate-level error aggregating module errors.

use thiserror::Error;

use crate::config::{
    ConfigError,
    MatcherError,
};
use crate::indexer::IndexerError;
use crate::input::messages::ImportError;
use crate::store::StoreError;
use crate::translate::TranslateError;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Matcher(#[from] MatcherError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Indexer(#[from] IndexerError),

    #[error(transparent)]
    Translate(#[from] TranslateError),

    #[error(transparent)]
    Import(#[from] ImportError),

    #[error("Failed to write output: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize report: {0}")]
    Json(#[from] serde_json::Error),
}
