pub mod extractor;
pub mod scope;
pub mod types;
