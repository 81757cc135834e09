//! Schema module - Configuration and source document types.

mod config;
mod source;

pub use config::*;
pub use source::*;
