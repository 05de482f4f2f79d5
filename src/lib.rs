//! Parse CommonMark into a typed document tree.
//!
//! Parsing happens in two stages. First, the [block parser](block) reads the input line by line and builds a tree of
//! blocks: paragraphs, headings, lists, block quotes, code blocks and so on. Then a series of
//! [transforms](transforms) refine that tree: they parse each paragraph's and heading's text into inline nodes
//! (emphasis, links, code spans), group headings into sections, decide which lists are tight, and clean up.
//!
//! ```
//! use cmtree::{NodeKind, ParseOptions, Parser};
//!
//! let doc = Parser::commonmark().parse("# Hello\n\nSome *text*.\n", &ParseOptions::default())?;
//! let section = doc.children(doc.root())[0];
//! assert_eq!(doc.kind(section), &NodeKind::Section { depth: 1 });
//! # Ok::<(), cmtree::Error>(())
//! ```
//!
//! Malformed Markdown never fails the parse; it just becomes text. Problems worth knowing about (like a link
//! reference defined twice) are reported as [diagnostics](diagnostics::Diagnostic).
pub mod block;
mod context;
pub mod diagnostics;
pub mod doc;
mod error;
pub mod inline;
mod parser;
pub mod readers;
pub mod run;
pub mod transforms;
mod util;

pub use context::ParseContext;
pub use doc::{Document, NodeId, NodeKind};
pub use error::*;
pub use parser::*;
pub use util::patterns::Pattern;
