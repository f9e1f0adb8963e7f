//! Static-source scanner over rendering templates.
pub mod types;
pub mod workspace;

pub use types::{
    IndexerError,
    UsageIndex,
};
pub use workspace::WorkspaceIndexer;
