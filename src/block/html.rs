use crate::block::{next_line_matches, BlockParser, BlockProcessor};
use crate::context::ParseContext;
use crate::doc::{NodeId, NodeKind};
use crate::readers::LineRead;
use crate::util::patterns::{Pattern, CLOSE_TAG, OPEN_TAG};
use crate::util::text::collapse_trailing_newlines;
use crate::Error;

const BLOCK_TAGS: &[&str] = &[
    "address", "article", "aside", "base", "basefont", "blockquote", "body", "caption", "center", "col", "colgroup",
    "dd", "details", "dialog", "dir", "div", "dl", "dt", "fieldset", "figcaption", "figure", "footer", "form", "frame",
    "frameset", "h1", "h2", "h3", "h4", "h5", "h6", "head", "header", "hr", "html", "iframe", "legend", "li", "link",
    "main", "menu", "menuitem", "meta", "nav", "noframes", "ol", "optgroup", "option", "p", "param", "section",
    "source", "summary", "table", "tbody", "td", "tfoot", "th", "thead", "title", "tr", "track", "ul",
];

/// A raw HTML block. Its lines are kept verbatim, from the opening line up to the first line that contains the closing
/// pattern (or the end of the container).
///
/// CommonMark has seven kinds of these, which differ in how they start and end; see [`Self::all`].
pub struct HtmlBlockProcessor {
    name: &'static str,
    priority: u32,
    interruptable: bool,
    opening: Pattern,
    closing: Pattern,
}

impl HtmlBlockProcessor {
    fn new(name: &'static str, opening: &str, closing: &str) -> Self {
        Self {
            name,
            priority: 500,
            interruptable: true,
            opening: Pattern::new(opening),
            closing: Pattern::new(closing),
        }
    }

    /// `<script>`, `<pre>` and `<style>`, which may contain blank lines.
    pub fn script() -> Self {
        Self {
            priority: 400,
            ..Self::new(
                "ScriptHTMLBlockProcessor",
                r"(?i)^ {0,3}<(script|pre|style)(?:[ \t>]|\n?$)",
                r"(?i)</(script|pre|style)>",
            )
        }
    }

    pub fn comment() -> Self {
        Self::new("CommentHTMLBlockProcessor", r"^ {0,3}<!--", r"-->")
    }

    pub fn processing_instruction() -> Self {
        Self::new("ProcessingInstructionHTMLBlockProcessor", r"^ {0,3}<\?", r"\?>")
    }

    pub fn declaration() -> Self {
        Self::new("DeclarationHTMLBlockProcessor", r"^ {0,3}<![A-Z]+", r">")
    }

    pub fn cdata() -> Self {
        Self::new("CdataHTMLBlockProcessor", r"^ {0,3}<!\[CDATA\[", r"\]\]>")
    }

    /// Block-level tags (`<div>`, `<table>`, ...), open or closing. These run until a blank line.
    pub fn standard_tags() -> Self {
        let tags = BLOCK_TAGS.join("|");
        Self::new(
            "StandardTagsHTMLBlockProcessor",
            &format!(r"(?i)^ {{0,3}}</?(?:{tags})(?:[ \t>]|/>|\n?$)"),
            r"^\s*$",
        )
    }

    /// Any other complete tag alone on its line. These run until a blank line, but can't interrupt a paragraph.
    pub fn complete_tags() -> Self {
        Self {
            interruptable: false,
            ..Self::new(
                "CompleteTagsHTMLBlockProcessor",
                &format!(r"^ {{0,3}}(?:{}|{})\s*$", *OPEN_TAG, *CLOSE_TAG),
                r"^\s*$",
            )
        }
    }

    pub fn all() -> Vec<Self> {
        vec![
            Self::script(),
            Self::comment(),
            Self::processing_instruction(),
            Self::declaration(),
            Self::cdata(),
            Self::standard_tags(),
            Self::complete_tags(),
        ]
    }
}

impl BlockProcessor for HtmlBlockProcessor {
    fn name(&self) -> &'static str {
        self.name
    }

    fn priority(&self) -> u32 {
        self.priority
    }

    fn paragraph_interruptable(&self) -> bool {
        self.interruptable
    }

    fn matches(&self, reader: &dyn LineRead) -> bool {
        next_line_matches(reader, &self.opening)
    }

    fn run(&self, _: &BlockParser, reader: &mut dyn LineRead, ctx: &mut ParseContext, parent: NodeId) -> Result<bool, Error> {
        let line = reader.lineno() + 1;
        let mut value = String::new();
        while let Ok(html_line) = reader.readline() {
            value.push_str(&html_line);
            if self.closing.is_match(&html_line) {
                break;
            }
        }
        collapse_trailing_newlines(&mut value);

        let block = ctx.doc.create_at(NodeKind::HtmlBlock { value }, line);
        ctx.doc.append(parent, block);
        Ok(true)
    }
}
