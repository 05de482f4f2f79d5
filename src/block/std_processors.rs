use crate::block::{next_line_matches, BlockParser, BlockProcessor};
use crate::context::ParseContext;
use crate::doc::{NodeId, NodeKind};
use crate::readers::{FencedCodeBlockReader, IndentedCodeBlockReader, LazyLineReader, LineRead};
use crate::util::entities::decode_entities;
use crate::util::patterns::Pattern;
use crate::util::text::{collapse_trailing_newlines, unescape};
use crate::Error;
use lazy_static::lazy_static;

lazy_static! {
    static ref THEMATIC_BREAK: Pattern = Pattern::new(r"^ {0,3}((\*\s*){3,}|(-\s*){3,}|(_\s*){3,})\s*$");
    static ref ATX_HEADING: Pattern = Pattern::new(r"^ {0,3}(#{1,6})(\s.*)?\n?$");
    static ref ATX_CLOSING_SEQUENCE: Pattern = Pattern::new(r"\s+#+\s*$");
    static ref SETEXT_UNDERLINE: Pattern = Pattern::new(r"^ {0,3}(=+|-+)\s*$");
    static ref INDENTED_CODE: Pattern = Pattern::new(r"^    ");
    static ref BACKTICK_FENCE: Pattern = Pattern::new(r"^( {0,3})(`{3,})([^`\n]*)\n?$");
    static ref TILDE_FENCE: Pattern = Pattern::new(r"^( {0,3})(~{3,})(.*)\n?$");
    static ref BLANK_LINE: Pattern = Pattern::new(r"^\s*$");
}

fn group<'t>(captures: &fancy_regex::Captures<'t>, i: usize) -> &'t str {
    captures.get(i).map_or("", |m| m.as_str())
}

/// Appends a node holding a single text child (or no child at all, for empty text).
fn append_with_text(ctx: &mut ParseContext, parent: NodeId, node: NodeId, text: &str) {
    ctx.doc.append(parent, node);
    if !text.is_empty() {
        let text = ctx.doc.create(NodeKind::text(text));
        ctx.doc.append(node, text);
    }
}

/// Appends a heading: a section (of the given depth) that for now holds only its title.
fn append_heading(ctx: &mut ParseContext, parent: NodeId, depth: u8, title: &str, line: usize) {
    let section = ctx.doc.create_at(NodeKind::Section { depth }, line);
    ctx.doc.append(parent, section);
    let title_node = ctx.doc.create_at(NodeKind::Title, line);
    append_with_text(ctx, section, title_node, title);
}

/// `***`, `---` or `___`, possibly with spaces between.
pub struct ThematicBreakProcessor;

impl BlockProcessor for ThematicBreakProcessor {
    fn name(&self) -> &'static str {
        "ThematicBreakProcessor"
    }

    fn priority(&self) -> u32 {
        200
    }

    fn paragraph_interruptable(&self) -> bool {
        true
    }

    fn matches(&self, reader: &dyn LineRead) -> bool {
        next_line_matches(reader, &THEMATIC_BREAK)
    }

    fn run(&self, _: &BlockParser, reader: &mut dyn LineRead, ctx: &mut ParseContext, parent: NodeId) -> Result<bool, Error> {
        let line = reader.lineno() + 1;
        if reader.readline().is_err() {
            return Ok(false);
        }
        let transition = ctx.doc.create_at(NodeKind::Transition, line);
        ctx.doc.append(parent, transition);
        Ok(true)
    }
}

/// `# Heading`, up to six `#`s.
pub struct AtxHeadingProcessor;

impl BlockProcessor for AtxHeadingProcessor {
    fn name(&self) -> &'static str {
        "ATXHeadingProcessor"
    }

    fn paragraph_interruptable(&self) -> bool {
        true
    }

    fn matches(&self, reader: &dyn LineRead) -> bool {
        next_line_matches(reader, &ATX_HEADING)
    }

    fn run(&self, _: &BlockParser, reader: &mut dyn LineRead, ctx: &mut ParseContext, parent: NodeId) -> Result<bool, Error> {
        let line_no = reader.lineno() + 1;
        let Ok(line) = reader.readline() else {
            return Ok(false);
        };
        let Some(captures) = ATX_HEADING.captures(&line) else {
            reader.step(-1);
            return Ok(false);
        };
        let depth = group(&captures, 1).len() as u8;
        let mut title = group(&captures, 2).to_string();
        if let Some(closing) = ATX_CLOSING_SEQUENCE.captures(&title) {
            let start = closing.get(0).map_or(title.len(), |m| m.start());
            title.truncate(start);
        }
        append_heading(ctx, parent, depth, title.trim(), line_no);
        Ok(true)
    }
}

/// A paragraph-like run of lines, underlined with `===` or `---`.
///
/// This matches any line; if there turns out to be no underline, it puts the lines back.
pub struct SetextHeadingProcessor;

impl BlockProcessor for SetextHeadingProcessor {
    fn name(&self) -> &'static str {
        "SetextHeadingProcessor"
    }

    fn priority(&self) -> u32 {
        750
    }

    fn matches(&self, _reader: &dyn LineRead) -> bool {
        true
    }

    fn run(
        &self,
        parser: &BlockParser,
        reader: &mut dyn LineRead,
        ctx: &mut ParseContext,
        parent: NodeId,
    ) -> Result<bool, Error> {
        let line_no = reader.lineno() + 1;
        let mut lines: Vec<String> = Vec::new();
        let mut underline = None;
        while let Ok(line) = reader.readline() {
            lines.push(line.trim_start().to_string());
            match reader.next_line() {
                Ok(next) if SETEXT_UNDERLINE.is_match(&next) => {
                    reader.step(1);
                    underline = Some(next);
                    break;
                }
                Ok(_) if !parser.is_interrupted(reader) => {}
                _ => break,
            }
        }

        let Some(underline) = underline else {
            reader.step(-(lines.len() as isize));
            return Ok(false);
        };
        let depth = if underline.trim_start().starts_with('=') { 1 } else { 2 };
        append_heading(ctx, parent, depth, lines.concat().trim(), line_no);
        Ok(true)
    }
}

/// Lines indented by four or more spaces.
pub struct IndentedCodeBlockProcessor;

impl BlockProcessor for IndentedCodeBlockProcessor {
    fn name(&self) -> &'static str {
        "IndentedCodeBlockProcessor"
    }

    fn matches(&self, reader: &dyn LineRead) -> bool {
        next_line_matches(reader, &INDENTED_CODE)
    }

    fn run(&self, _: &BlockParser, reader: &mut dyn LineRead, ctx: &mut ParseContext, parent: NodeId) -> Result<bool, Error> {
        let line = reader.lineno() + 1;
        let mut code = String::new();
        let mut code_reader = IndentedCodeBlockReader::new(reader);
        while let Ok(code_line) = code_reader.readline() {
            code.push_str(&code_line);
        }
        let mut code = code.trim_start_matches('\n').to_string();
        collapse_trailing_newlines(&mut code);

        let block = ctx.doc.create_at(
            NodeKind::LiteralBlock {
                language: None,
                value: code,
            },
            line,
        );
        ctx.doc.append(parent, block);
        Ok(true)
    }
}

/// A code block between fences of backticks or tildes.
pub struct FencedCodeBlockProcessor {
    name: &'static str,
    opening: &'static Pattern,
}

impl FencedCodeBlockProcessor {
    pub fn backticks() -> Self {
        Self {
            name: "BacktickFencedCodeBlockProcessor",
            opening: &BACKTICK_FENCE,
        }
    }

    pub fn tildes() -> Self {
        Self {
            name: "TildeFencedCodeBlockProcessor",
            opening: &TILDE_FENCE,
        }
    }
}

impl BlockProcessor for FencedCodeBlockProcessor {
    fn name(&self) -> &'static str {
        self.name
    }

    fn paragraph_interruptable(&self) -> bool {
        true
    }

    fn matches(&self, reader: &dyn LineRead) -> bool {
        next_line_matches(reader, self.opening)
    }

    fn run(&self, _: &BlockParser, reader: &mut dyn LineRead, ctx: &mut ParseContext, parent: NodeId) -> Result<bool, Error> {
        let line_no = reader.lineno() + 1;
        let Ok(line) = reader.readline() else {
            return Ok(false);
        };
        let Some(captures) = self.opening.captures(&line) else {
            reader.step(-1);
            return Ok(false);
        };
        let indent = group(&captures, 1).len();
        let marker = group(&captures, 2);
        let language = group(&captures, 3)
            .split_whitespace()
            .next()
            .map(|word| unescape(&decode_entities(word)).into_owned());

        let mut code = String::new();
        let mut code_reader = FencedCodeBlockReader::new(reader, indent, marker);
        while let Ok(code_line) = code_reader.readline() {
            code.push_str(&code_line);
        }

        let block = ctx.doc.create_at(NodeKind::LiteralBlock { language, value: code }, line_no);
        ctx.doc.append(parent, block);
        Ok(true)
    }
}

/// A line with nothing but whitespace. These are kept as [`NodeKind::BlankLine`] nodes until lists are classified.
pub struct BlankLineProcessor;

impl BlockProcessor for BlankLineProcessor {
    fn name(&self) -> &'static str {
        "BlankLineProcessor"
    }

    fn paragraph_interruptable(&self) -> bool {
        true
    }

    fn matches(&self, reader: &dyn LineRead) -> bool {
        next_line_matches(reader, &BLANK_LINE)
    }

    fn run(&self, _: &BlockParser, reader: &mut dyn LineRead, ctx: &mut ParseContext, parent: NodeId) -> Result<bool, Error> {
        let line = reader.lineno() + 1;
        if reader.readline().is_err() {
            return Ok(false);
        }
        let blank = ctx.doc.create_at(NodeKind::BlankLine, line);
        ctx.doc.append(parent, blank);
        Ok(true)
    }
}

/// The fallback: everything up to the next interrupting block is a paragraph, including lazy continuation lines.
pub struct ParagraphProcessor;

impl BlockProcessor for ParagraphProcessor {
    fn name(&self) -> &'static str {
        "ParagraphProcessor"
    }

    fn priority(&self) -> u32 {
        800
    }

    fn matches(&self, _reader: &dyn LineRead) -> bool {
        true
    }

    fn run(
        &self,
        parser: &BlockParser,
        reader: &mut dyn LineRead,
        ctx: &mut ParseContext,
        parent: NodeId,
    ) -> Result<bool, Error> {
        let line = reader.lineno() + 1;
        let mut text = String::new();
        let mut lazy = LazyLineReader::new(reader);
        while let Ok(paragraph_line) = lazy.readline() {
            text.push_str(paragraph_line.trim_start());
            if parser.is_interrupted(&lazy) {
                break;
            }
        }
        let paragraph = ctx.doc.create_at(NodeKind::Paragraph, line);
        append_with_text(ctx, parent, paragraph, text.trim());
        Ok(true)
    }
}
