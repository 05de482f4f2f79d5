use crate::block::*;
use crate::context::ParseContext;
use crate::diagnostics::{LogReporter, Reporter};
use crate::doc::Document;
use crate::inline::*;
use crate::readers::LineReader;
use crate::transforms::{self, Transform};
use crate::Error;
use derive_builder::Builder;

/// What to do with hard line breaks.
#[derive(Copy, Clone, Default, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum HardBreaks {
    /// Keep them as [`NodeKind::LineBreak`](crate::NodeKind::LineBreak) nodes.
    #[default]
    Keep,
    /// Turn them into plain newlines, with a warning for each. For hosts that can't represent hard breaks.
    Downgrade,
}

/// Options for a single parse.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Builder)]
#[builder(default)]
pub struct ParseOptions {
    /// Identifies the input in diagnostics: typically a file path.
    #[builder(setter(into))]
    pub source: String,
    /// Whether to nest headings and their content into a tree of sections. If `false`, each heading is a
    /// [`NodeKind::Section`](crate::NodeKind::Section) holding only its title, and the blocks after it are its
    /// siblings.
    pub sections: bool,
    pub hard_breaks: HardBreaks,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            source: "<string>".to_string(),
            sections: true,
            hard_breaks: HardBreaks::Keep,
        }
    }
}

/// A configured parser: the block processors, inline processors and transforms that turn text into a [`Document`].
///
/// [`Parser::commonmark`] gives the standard set. A host can add its own processors and transforms, or remove some of
/// the standard ones, before parsing.
///
/// ```
/// use cmtree::{NodeKind, ParseOptions, Parser};
///
/// let doc = Parser::commonmark().parse("Hello, *world*!", &ParseOptions::default()).unwrap();
/// let para = doc.children(doc.root())[0];
/// assert_eq!(doc.kind(para), &NodeKind::Paragraph);
/// assert_eq!(doc.to_text(para), "Hello, world!");
/// ```
#[derive(Default)]
pub struct Parser {
    block: BlockParser,
    inline: InlineParser,
    transforms: Vec<Box<dyn Transform>>,
}

impl Parser {
    /// A parser with nothing registered.
    pub fn new() -> Self {
        Self::default()
    }

    /// A parser for CommonMark.
    pub fn commonmark() -> Self {
        let mut parser = Self::new();

        parser.add_block_processor(Box::new(ThematicBreakProcessor));
        parser.add_block_processor(Box::new(AtxHeadingProcessor));
        parser.add_block_processor(Box::new(SetextHeadingProcessor));
        parser.add_block_processor(Box::new(IndentedCodeBlockProcessor));
        parser.add_block_processor(Box::new(FencedCodeBlockProcessor::backticks()));
        parser.add_block_processor(Box::new(FencedCodeBlockProcessor::tildes()));
        parser.add_block_processor(Box::new(BlankLineProcessor));
        parser.add_block_processor(Box::new(BlockQuoteProcessor));
        parser.add_block_processor(Box::new(ListProcessor::bullet()));
        parser.add_block_processor(Box::new(ListProcessor::non_empty_bullet()));
        parser.add_block_processor(Box::new(ListProcessor::ordered()));
        parser.add_block_processor(Box::new(ListProcessor::one_based_ordered()));
        for html in HtmlBlockProcessor::all() {
            parser.add_block_processor(Box::new(html));
        }
        parser.add_block_processor(Box::new(LinkReferenceDefinitionProcessor));
        parser.add_block_processor(Box::new(ParagraphProcessor));

        parser.add_inline_processor(Box::new(BackslashEscapeProcessor));
        parser.add_inline_processor(Box::new(EntityReferenceProcessor));
        parser.add_inline_processor(Box::new(CodeSpanProcessor));
        parser.add_inline_processor(Box::new(EmphasisProcessor));
        parser.add_inline_processor(Box::new(UriAutolinkProcessor));
        parser.add_inline_processor(Box::new(EmailAutolinkProcessor));
        parser.add_inline_processor(Box::new(RawHtmlProcessor));
        parser.add_inline_processor(Box::new(HardLinebreakProcessor));
        parser.add_inline_processor(Box::new(SoftLinebreakProcessor));
        parser.add_inline_processor(Box::new(LinkOpenerProcessor));
        parser.add_inline_processor(Box::new(LinkCloserProcessor));

        for transform in transforms::standard() {
            parser.add_transform(transform);
        }
        parser
    }

    pub fn add_block_processor(&mut self, processor: Box<dyn BlockProcessor>) {
        self.block.add_processor(processor);
    }

    pub fn add_inline_processor(&mut self, processor: Box<dyn InlineProcessor>) {
        self.inline.add_processor(processor);
    }

    pub fn add_transform(&mut self, transform: Box<dyn Transform>) {
        self.transforms.push(transform);
        self.transforms
            .sort_by(|a, b| (a.priority(), a.name()).cmp(&(b.priority(), b.name())));
    }

    /// Removes the transform with the given name. Returns whether there was one.
    pub fn remove_transform(&mut self, name: &str) -> bool {
        let before = self.transforms.len();
        self.transforms.retain(|t| t.name() != name);
        self.transforms.len() != before
    }

    /// The transforms' names, in the order they run.
    pub fn transform_names(&self) -> Vec<&'static str> {
        self.transforms.iter().map(|t| t.name()).collect()
    }

    pub fn block_parser(&self) -> &BlockParser {
        &self.block
    }

    pub fn block_parser_mut(&mut self) -> &mut BlockParser {
        &mut self.block
    }

    pub fn inline_parser(&self) -> &InlineParser {
        &self.inline
    }

    pub fn inline_parser_mut(&mut self) -> &mut InlineParser {
        &mut self.inline
    }

    /// Parses the text, sending diagnostics to the [`log`] facade.
    pub fn parse(&self, text: &str, options: &ParseOptions) -> Result<Document, Error> {
        self.parse_with_reporter(text, options, &mut LogReporter)
    }

    /// Parses the text, sending diagnostics to the given reporter.
    pub fn parse_with_reporter(
        &self,
        text: &str,
        options: &ParseOptions,
        reporter: &mut dyn Reporter,
    ) -> Result<Document, Error> {
        let mut ctx = ParseContext::new(options, reporter);
        let mut reader = LineReader::new(text);
        let root = ctx.doc.root();
        self.block.parse(&mut reader, &mut ctx, root)?;

        for transform in &self.transforms {
            log::debug!("applying {}", transform.name());
            transform.apply(self, &mut ctx);
        }
        Ok(ctx.into_document())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::Diagnostic;
    use crate::doc::{NodeId, NodeKind};
    use crate::util::utils_for_test::*;
    use std::time;

    #[test]
    fn transform_order() {
        assert_eq!(
            Parser::commonmark().transform_names(),
            vec![
                "InlineTransform",
                "TightListsDetector",
                "BlanklineFilter",
                "LinebreakFilter",
                "SectionTreeConstructor",
                "BracketConverter",
                "EmphasisConverter",
                "TextNodeConnector",
                "TightListsCompactor",
            ]
        );
    }

    #[test]
    fn block_catalogue_order() {
        let parser = Parser::commonmark();
        let names = parser.block_parser().processor_names();
        assert_eq!(names.first(), Some(&"ThematicBreakProcessor"));
        assert_eq!(names[1], "ScriptHTMLBlockProcessor");
        assert_eq!(
            &names[names.len() - 3..],
            ["LinkReferenceDefinitionProcessor", "SetextHeadingProcessor", "ParagraphProcessor"]
        );
        assert_eq!(names.len(), 21);
    }

    #[test]
    fn options_builder() {
        let options = ParseOptionsBuilder::default()
            .source("in.md")
            .hard_breaks(HardBreaks::Downgrade)
            .build()
            .unwrap();
        assert_eq!(
            options,
            ParseOptions {
                source: "in.md".to_string(),
                sections: true,
                hard_breaks: HardBreaks::Downgrade,
            }
        );
    }

    #[test]
    fn without_inline_parsing() {
        let mut parser = Parser::commonmark();
        assert!(parser.remove_transform("InlineTransform"));
        assert!(!parser.remove_transform("InlineTransform"));

        let doc = parser.parse("*a*", &ParseOptions::default()).unwrap();
        let para = doc.children(doc.root())[0];
        let text = doc.children(para)[0];
        assert_eq!(doc.kind(text), &NodeKind::text("*a*"));
    }

    #[test]
    fn diagnostics_carry_source() {
        let options = ParseOptionsBuilder::default().source("notes.md").build().unwrap();
        let mut diagnostics: Vec<Diagnostic> = Vec::new();
        Parser::commonmark()
            .parse_with_reporter("[a]: /x\n[a]: /y\n", &options, &mut diagnostics)
            .unwrap();
        let diagnostic = diagnostics.first().unwrap();
        assert_eq!(diagnostic.source, "notes.md");
        assert_eq!(diagnostic.line, Some(2));
    }

    #[test]
    fn empty_parser_fails() {
        let result = Parser::new().parse("hello", &ParseOptions::default());
        assert_eq!(
            result,
            Err(Error::NoBlockProcessor {
                input: "<string>".to_string(),
                line: 1,
            })
        );
    }

    #[test]
    fn empty_input() {
        let doc = Parser::commonmark().parse("", &ParseOptions::default()).unwrap();
        assert!(doc.children(doc.root()).is_empty());
    }

    fn apply_passes(parser: &Parser, doc: &Document, passes: &[&dyn Transform]) -> Document {
        let options = ParseOptions::default();
        let mut diagnostics: Vec<Diagnostic> = Vec::new();
        let mut ctx = ParseContext::new(&options, &mut diagnostics);
        ctx.doc = doc.clone();
        for pass in passes {
            pass.apply(parser, &mut ctx);
        }
        ctx.into_document()
    }

    #[test]
    fn list_passes_are_idempotent() {
        let mut parser = Parser::commonmark();
        for name in ["TightListsDetector", "BlanklineFilter", "TightListsCompactor"] {
            assert!(parser.remove_transform(name));
        }
        let undecided = parser
            .parse("- a\n- b\n\n1. c\n\n2. d\n", &ParseOptions::default())
            .unwrap();
        let root = undecided.root();
        let lists: Vec<NodeId> = undecided
            .descendants(root)
            .into_iter()
            .filter(|&id| undecided.kind(id).is_list())
            .collect();
        assert_eq!(lists.len(), 2);
        assert!(lists.iter().all(|&list| undecided.attribute(list, "tight").is_none()));

        let round: [&dyn Transform; 3] = [
            &transforms::TightListsDetector,
            &transforms::BlanklineFilter,
            &transforms::TightListsCompactor,
        ];
        let once = apply_passes(&parser, &undecided, &round);
        let twice = apply_passes(&parser, &undecided, &[round, round].concat());
        assert_eq!(once, twice);

        let kinds = child_kinds(&once, once.root());
        unwrap!(
            &kinds[..],
            [
                NodeKind::BulletList { tight: Some(true), .. },
                NodeKind::EnumeratedList { tight: Some(false), .. }
            ]
        );
        let tight_item = once.children(once.children(once.root())[0])[0];
        assert_eq!(child_kinds(&once, tight_item), vec![&NodeKind::text("a")]);
    }

    #[test]
    fn large_paragraphs_parse_in_linear_time() {
        let inputs = [
            "abcd ".repeat(32_000),
            "line\n".repeat(32_000),
            "[x] ".repeat(32_000),
            "*a ".repeat(32_000),
            "a* ".repeat(32_000),
            "*a* **b** ".repeat(16_000),
            "[x](/u) ".repeat(16_000),
        ];
        let parser = Parser::commonmark();
        for text in inputs {
            let start = time::Instant::now();
            let doc = parser.parse(&text, &ParseOptions::default()).unwrap();
            let elapsed = start.elapsed();
            assert!(
                elapsed < test_delay_ms!(5000),
                "parsing {:?}... took {elapsed:?}",
                &text[..12]
            );
            let para = get_only(doc.children(doc.root()));
            assert_eq!(doc.kind(*para), &NodeKind::Paragraph);
        }
    }

    #[test]
    fn plain_text_is_one_paragraph() {
        let doc = Parser::commonmark()
            .parse("hello there\nworld  \n", &ParseOptions::default())
            .unwrap();
        let root = doc.root();
        assert_eq!(doc.children(root).len(), 1);
        let para = doc.children(root)[0];
        assert_eq!(doc.kind(para), &NodeKind::Paragraph);
        assert_eq!(doc.to_text(para), "hello there\nworld");
    }

    #[test]
    fn unmatched_delimiters_kept_as_text() {
        let doc = Parser::commonmark()
            .parse("a *b _c ** d", &ParseOptions::default())
            .unwrap();
        let para = doc.children(doc.root())[0];
        assert_eq!(doc.children(para).len(), 1);
        assert_eq!(doc.to_text(para), "a *b _c ** d");
    }

    #[test]
    fn escaped_punctuation_is_literal() {
        let punctuation: String = (0u8..128).map(char::from).filter(char::is_ascii_punctuation).collect();
        let escaped: String = punctuation.chars().flat_map(|c| ['\\', c]).collect();
        let doc = Parser::commonmark().parse(&escaped, &ParseOptions::default()).unwrap();
        let para = doc.children(doc.root())[0];
        assert_eq!(doc.children(para).len(), 1);
        assert_eq!(doc.kind(doc.children(para)[0]), &NodeKind::text(punctuation));
    }
}
