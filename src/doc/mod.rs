//! The document tree the parser produces, and renderings of it.
mod json;
mod pformat;
mod tree;

pub use json::*;
pub use pformat::*;
pub use tree::*;
