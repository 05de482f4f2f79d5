/// Errors from [`Parser::parse`](crate::Parser::parse).
///
/// Malformed Markdown is never an error: anything that doesn't parse as a construct just becomes text. These errors
/// mean the parser itself is misconfigured.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// No registered block processor accepted a line. The standard catalogue always ends with a paragraph processor
    /// that accepts anything, so this only happens with a custom catalogue that lacks one.
    #[error("internal error: no block processor accepted line {line} of {input}")]
    NoBlockProcessor { input: String, line: usize },
}
