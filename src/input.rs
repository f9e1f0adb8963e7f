//! Engine inputs: template sources and message files.
pub mod messages;
pub mod source;
