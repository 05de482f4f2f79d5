//! Cursors over the input.
//!
//! Block parsing works on [lines](LineRead). A container (a block quote, a list item, a code block) reads its content
//! through a decorating reader, which strips the container's markers and indentation, and reports a
//! [`ReadError`] at the first line that doesn't belong to it. That lets the same block processors run at any level of
//! nesting.
//!
//! Inline parsing works on a single string, with a [`TextReader`].
mod decorators;
mod line;
mod text;

pub use decorators::*;
pub use line::*;
pub use text::*;
