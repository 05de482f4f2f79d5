//! Inline structure: emphasis, links, code spans and the like, within a paragraph's or title's text.
//!
//! The [`InlineParser`] walks the text char by char. At each position, it offers the text to its
//! [`InlineProcessor`]s in order; if none of them takes it, the char is plain text. Emphasis and links can't be
//! decided locally, so their processors leave [marker nodes](crate::doc::NodeKind::EmphasisMarker) behind, which get
//! resolved later.
use crate::context::ParseContext;
use crate::doc::NodeId;
use crate::readers::TextReader;

mod links;
mod std_processors;

pub use links::*;
pub use std_processors::*;

/// What an [`InlineProcessor::run`] did.
///
/// - `Ok(true)`: it consumed something, and appended the corresponding node(s).
/// - `Ok(false)`: it declined; the next processor gets a try.
/// - `Err(Unmatched)`: the construct started but never closed. The processor leaves the reader untouched, and the
///   parser appends the literal as plain text and skips past it.
pub type InlineResult = Result<bool, Unmatched>;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Unmatched {
    /// The opening marker, as written.
    pub literal: String,
}

pub trait InlineProcessor: Send + Sync {
    fn name(&self) -> &'static str;

    fn priority(&self) -> u32 {
        500
    }

    /// Whether the text at the reader's cursor looks like the start of this construct.
    fn matches(&self, reader: &TextReader) -> bool;

    /// Consumes the construct, appending its node(s) to `host`.
    fn run(&self, reader: &mut TextReader, ctx: &mut ParseContext, host: NodeId) -> InlineResult;
}

/// Runs `attempt` on a copy of the reader, and only moves the reader if the attempt succeeds.
pub(crate) fn backtrack<'s, T>(
    reader: &mut TextReader<'s>,
    attempt: impl FnOnce(&mut TextReader<'s>) -> Option<T>,
) -> Option<T> {
    let mut copy = *reader;
    let result = attempt(&mut copy)?;
    *reader = copy;
    Some(result)
}

#[derive(Default)]
pub struct InlineParser {
    processors: Vec<Box<dyn InlineProcessor>>,
}

impl InlineParser {
    pub fn add_processor(&mut self, processor: Box<dyn InlineProcessor>) {
        self.processors.push(processor);
        self.processors.sort_by(|a, b| (a.priority(), a.name()).cmp(&(b.priority(), b.name())));
    }

    pub fn remove_processor(&mut self, name: &str) -> bool {
        let before = self.processors.len();
        self.processors.retain(|p| p.name() != name);
        self.processors.len() != before
    }

    pub fn processor_names(&self) -> Vec<&'static str> {
        self.processors.iter().map(|p| p.name()).collect()
    }

    /// Parses the text in `host`'s last child (if that's a text node) into inline nodes, which replace it.
    pub fn parse(&self, ctx: &mut ParseContext, host: NodeId) {
        let Some(last) = ctx.doc.last_child(host) else {
            return;
        };
        let Some(text) = ctx.doc.kind(last).as_text().map(str::to_string) else {
            return;
        };
        ctx.doc.remove(last);
        ctx.brackets.clear();

        let mut reader = TextReader::new(&text);
        while !reader.is_empty() {
            if self.run_processors(&mut reader, ctx, host) {
                continue;
            }
            let start = reader.position();
            // a backslash that isn't an escape still keeps the next char from starting anything
            if reader.peek() == Some('\\') {
                reader.step_char();
            }
            reader.step_char();
            ctx.doc.append_text(host, reader.slice(start, reader.position()));
        }
    }

    fn run_processors(&self, reader: &mut TextReader, ctx: &mut ParseContext, host: NodeId) -> bool {
        for processor in &self.processors {
            if !processor.matches(reader) {
                continue;
            }
            match processor.run(reader, ctx, host) {
                Ok(true) => return true,
                Ok(false) => {}
                Err(Unmatched { literal }) => {
                    ctx.doc.append_text(host, &literal);
                    reader.step(literal.len());
                    return true;
                }
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::Diagnostic;
    use crate::doc::NodeKind;
    use crate::parser::ParseOptions;

    fn parse_inlines(parser: &InlineParser, text: &str) -> Vec<NodeKind> {
        let options = ParseOptions::default();
        let mut diagnostics: Vec<Diagnostic> = Vec::new();
        let mut ctx = ParseContext::new(&options, &mut diagnostics);
        let para = ctx.doc.create(NodeKind::Paragraph);
        let root = ctx.doc.root();
        ctx.doc.append(root, para);
        let text = ctx.doc.create(NodeKind::text(text));
        ctx.doc.append(para, text);

        parser.parse(&mut ctx, para);
        ctx.doc.children(para).iter().map(|&c| ctx.doc.kind(c).clone()).collect()
    }

    #[test]
    fn no_processors_is_all_text() {
        let parser = InlineParser::default();
        assert_eq!(parse_inlines(&parser, "a *b*"), vec![NodeKind::text("a *b*")]);
    }

    #[test]
    fn unmatched_code_span_is_literal() {
        let mut parser = InlineParser::default();
        parser.add_processor(Box::new(CodeSpanProcessor));
        assert_eq!(parse_inlines(&parser, "a ``b` c"), vec![NodeKind::text("a ``b` c")]);
    }

    #[test]
    fn non_escape_backslash() {
        let mut parser = InlineParser::default();
        parser.add_processor(Box::new(BackslashEscapeProcessor));
        parser.add_processor(Box::new(CodeSpanProcessor));
        assert_eq!(
            parse_inlines(&parser, "\\a \\`b`"),
            vec![NodeKind::text("\\a `b`")]
        );
    }

    #[test]
    fn processor_order() {
        let mut parser = InlineParser::default();
        parser.add_processor(Box::new(LinkCloserProcessor));
        parser.add_processor(Box::new(CodeSpanProcessor));
        parser.add_processor(Box::new(BackslashEscapeProcessor));
        assert_eq!(
            parser.processor_names(),
            vec!["BackslashEscapeProcessor", "CodeSpanProcessor", "LinkCloserProcessor"]
        );
    }

    #[test]
    fn backtrack_only_moves_on_success() {
        let mut reader = TextReader::new("abc");
        let failed: Option<()> = backtrack(&mut reader, |r| {
            r.step(2);
            None
        });
        assert_eq!(failed, None);
        assert_eq!(reader.position(), 0);

        let worked = backtrack(&mut reader, |r| {
            r.step(2);
            Some(r.position())
        });
        assert_eq!(worked, Some(2));
        assert_eq!(reader.position(), 2);
    }
}
