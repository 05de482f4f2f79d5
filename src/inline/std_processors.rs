use crate::context::ParseContext;
use crate::doc::{EmphasisMarker, NodeId, NodeKind};
use crate::inline::{InlineProcessor, InlineResult, Unmatched};
use crate::readers::TextReader;
use crate::util::entities::{decode_entity, ENTITY};
use crate::util::patterns::{is_punctuation, Pattern, CLOSE_TAG, ESCAPED_CHAR, OPEN_TAG};
use crate::util::uri::normalize_uri;
use lazy_static::lazy_static;

lazy_static! {
    static ref BACKSLASH_ESCAPE: Pattern = Pattern::new(&format!("^{ESCAPED_CHAR}"));
    static ref EMPHASIS_RUN: Pattern = Pattern::new(r"^(?:\*+|_+)");
    static ref URI_AUTOLINK: Pattern = Pattern::new(r"(?i)^<([a-z][a-z0-9+.-]{1,31}:[^<>\x00-\x20]*)>");
    static ref EMAIL_AUTOLINK: Pattern = Pattern::new(concat!(
        r"^<([a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?",
        r"(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*)>"
    ));
    static ref RAW_HTML: Pattern = Pattern::new(&format!(
        r"^(?:{}|{}|{}|{}|{}|{})",
        *OPEN_TAG,
        *CLOSE_TAG,
        r"<!---->|<!--(?:-?[^>-])(?:-?[^-])*-->",
        r"<\?(?s:.*?)\?>",
        r"<![A-Z]+\s+[^>]*>",
        r"<!\[CDATA\[(?s:.*?)\]\]>",
    ));
    static ref HARD_LINE_BREAK: Pattern = Pattern::new(r"^(?: {2,}|\\)\n");
}

fn is_paragraph(ctx: &ParseContext, host: NodeId) -> bool {
    matches!(ctx.doc.kind(host), NodeKind::Paragraph)
}

/// `\*` and the like: the punctuation char, as plain text.
pub struct BackslashEscapeProcessor;

impl InlineProcessor for BackslashEscapeProcessor {
    fn name(&self) -> &'static str {
        "BackslashEscapeProcessor"
    }

    fn matches(&self, reader: &TextReader) -> bool {
        reader.peek() == Some('\\') && BACKSLASH_ESCAPE.is_match(reader.remain())
    }

    fn run(&self, reader: &mut TextReader, ctx: &mut ParseContext, host: NodeId) -> InlineResult {
        let escaped = reader.slice(reader.position() + 1, reader.position() + 2);
        ctx.doc.append_text(host, escaped);
        reader.step(2);
        Ok(true)
    }
}

/// `&amp;`, `&#35;`, `&#x22;`.
pub struct EntityReferenceProcessor;

impl InlineProcessor for EntityReferenceProcessor {
    fn name(&self) -> &'static str {
        "EntityReferenceProcessor"
    }

    fn matches(&self, reader: &TextReader) -> bool {
        reader.peek() == Some('&') && ENTITY.is_match(reader.remain())
    }

    fn run(&self, reader: &mut TextReader, ctx: &mut ParseContext, host: NodeId) -> InlineResult {
        let Some(len) = ENTITY.match_len(reader.remain()) else {
            return Ok(false);
        };
        let entity = reader.slice(reader.position(), reader.position() + len);
        ctx.doc.append_text(host, &decode_entity(entity));
        reader.step(len);
        Ok(true)
    }
}

/// `` `code` ``, delimited by backtick runs of the same length.
pub struct CodeSpanProcessor;

impl InlineProcessor for CodeSpanProcessor {
    fn name(&self) -> &'static str {
        "CodeSpanProcessor"
    }

    fn matches(&self, reader: &TextReader) -> bool {
        reader.peek() == Some('`')
    }

    fn run(&self, reader: &mut TextReader, ctx: &mut ParseContext, host: NodeId) -> InlineResult {
        let remain = reader.remain();
        let marker_len = remain.bytes().take_while(|&b| b == b'`').count();
        let rest = &remain.as_bytes()[marker_len..];

        let mut i = 0;
        let mut closing = None;
        while i < rest.len() {
            if rest[i] != b'`' {
                i += 1;
                continue;
            }
            let run = rest[i..].iter().take_while(|&&b| b == b'`').count();
            if run == marker_len {
                closing = Some(i);
                break;
            }
            i += run;
        }

        let Some(closing) = closing else {
            return Err(Unmatched {
                literal: "`".repeat(marker_len),
            });
        };
        let code = &remain[marker_len..marker_len + closing];
        let value = code
            .split([' ', '\t', '\r', '\n'])
            .filter(|word| !word.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        let literal = ctx.doc.create(NodeKind::Literal { value });
        ctx.doc.append(host, literal);
        reader.step(marker_len + closing + marker_len);
        Ok(true)
    }
}

/// A run of `*` or `_`, which may open or close emphasis. This only records the run and how it's flanked; emphasis is
/// resolved once all the runs in the text are known.
pub struct EmphasisProcessor;

impl InlineProcessor for EmphasisProcessor {
    fn name(&self) -> &'static str {
        "EmphasisProcessor"
    }

    fn matches(&self, reader: &TextReader) -> bool {
        matches!(reader.peek(), Some('*' | '_'))
    }

    fn run(&self, reader: &mut TextReader, ctx: &mut ParseContext, host: NodeId) -> InlineResult {
        let before = reader.before();
        let Some(len) = EMPHASIS_RUN.match_len(reader.remain()) else {
            return Ok(false);
        };
        let Some(marker) = reader.peek() else {
            return Ok(false);
        };
        reader.step(len);
        let after = reader.peek();

        // the start and end of the text count as whitespace
        let before_whitespace = before.map_or(true, char::is_whitespace);
        let before_punctuation = before.map_or(false, is_punctuation);
        let after_whitespace = after.map_or(true, char::is_whitespace);
        let after_punctuation = after.map_or(false, is_punctuation);

        let left_flanking =
            !after_whitespace && (!after_punctuation || before_whitespace || before_punctuation);
        let right_flanking =
            !before_whitespace && (!before_punctuation || after_whitespace || after_punctuation);
        let (can_open, can_close) = if marker == '_' {
            (
                left_flanking && (!right_flanking || before_punctuation),
                right_flanking && (!left_flanking || after_punctuation),
            )
        } else {
            (left_flanking, right_flanking)
        };

        let node = ctx.doc.create(NodeKind::EmphasisMarker(EmphasisMarker {
            marker,
            orig_length: len,
            curr_length: len,
            can_open,
            can_close,
            interior: can_open && can_close,
        }));
        ctx.doc.append(host, node);
        Ok(true)
    }
}

/// `<https://example.com>`.
pub struct UriAutolinkProcessor;

impl InlineProcessor for UriAutolinkProcessor {
    fn name(&self) -> &'static str {
        "URIAutolinkProcessor"
    }

    fn matches(&self, reader: &TextReader) -> bool {
        reader.peek() == Some('<') && URI_AUTOLINK.is_match(reader.remain())
    }

    fn run(&self, reader: &mut TextReader, ctx: &mut ParseContext, host: NodeId) -> InlineResult {
        let Some(captures) = reader.consume(&URI_AUTOLINK) else {
            return Ok(false);
        };
        let uri = captures.get(1).map_or("", |m| m.as_str());
        append_autolink(ctx, host, normalize_uri(uri), uri);
        Ok(true)
    }
}

/// `<someone@example.com>`, which links to a `mailto:` URI.
pub struct EmailAutolinkProcessor;

impl InlineProcessor for EmailAutolinkProcessor {
    fn name(&self) -> &'static str {
        "EmailAutolinkProcessor"
    }

    fn matches(&self, reader: &TextReader) -> bool {
        reader.peek() == Some('<') && EMAIL_AUTOLINK.is_match(reader.remain())
    }

    fn run(&self, reader: &mut TextReader, ctx: &mut ParseContext, host: NodeId) -> InlineResult {
        let Some(captures) = reader.consume(&EMAIL_AUTOLINK) else {
            return Ok(false);
        };
        let address = captures.get(1).map_or("", |m| m.as_str());
        append_autolink(ctx, host, format!("mailto:{}", normalize_uri(address)), address);
        Ok(true)
    }
}

fn append_autolink(ctx: &mut ParseContext, host: NodeId, refuri: String, text: &str) {
    let reference = ctx.doc.create(NodeKind::Reference { refuri, title: None });
    ctx.doc.append(host, reference);
    let text = ctx.doc.create(NodeKind::text(text));
    ctx.doc.append(reference, text);
}

/// Inline HTML: tags, comments, processing instructions, declarations and CDATA sections.
pub struct RawHtmlProcessor;

impl InlineProcessor for RawHtmlProcessor {
    fn name(&self) -> &'static str {
        "RawHTMLProcessor"
    }

    fn matches(&self, reader: &TextReader) -> bool {
        reader.peek() == Some('<') && RAW_HTML.is_match(reader.remain())
    }

    fn run(&self, reader: &mut TextReader, ctx: &mut ParseContext, host: NodeId) -> InlineResult {
        let Some(captures) = reader.consume(&RAW_HTML) else {
            return Ok(false);
        };
        let value = captures.get(0).map_or("", |m| m.as_str()).to_string();
        let html = ctx.doc.create(NodeKind::InlineHtml { value });
        ctx.doc.append(host, html);
        Ok(true)
    }
}

/// Two or more spaces, or a backslash, at the end of a line. Only paragraphs have these.
pub struct HardLinebreakProcessor;

impl InlineProcessor for HardLinebreakProcessor {
    fn name(&self) -> &'static str {
        "HardLinebreakProcessor"
    }

    fn matches(&self, reader: &TextReader) -> bool {
        matches!(reader.peek(), Some(' ' | '\\')) && HARD_LINE_BREAK.is_match(reader.remain())
    }

    fn run(&self, reader: &mut TextReader, ctx: &mut ParseContext, host: NodeId) -> InlineResult {
        if !is_paragraph(ctx, host) {
            return Ok(false);
        }
        let Some(len) = HARD_LINE_BREAK.match_len(reader.remain()) else {
            return Ok(false);
        };
        reader.step(len);
        let line_break = ctx.doc.create(NodeKind::LineBreak);
        ctx.doc.append(host, line_break);
        Ok(true)
    }
}

/// A single space before a line break, which gets dropped. The newline itself stays as text.
pub struct SoftLinebreakProcessor;

impl InlineProcessor for SoftLinebreakProcessor {
    fn name(&self) -> &'static str {
        "SoftLinebreakProcessor"
    }

    fn matches(&self, reader: &TextReader) -> bool {
        matches!(reader.remain().as_bytes(), [b' ' | b'\t', b'\n', ..])
    }

    fn run(&self, reader: &mut TextReader, ctx: &mut ParseContext, host: NodeId) -> InlineResult {
        if !is_paragraph(ctx, host) {
            return Ok(false);
        }
        reader.step_char();
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::utils_for_test::*;

    /// Parses a single paragraph, and returns its children.
    fn inlines(text: &str) -> Vec<NodeKind> {
        let (doc, _) = parse_for_test(text);
        let para = get_only(doc.children(doc.root()));
        assert_eq!(doc.kind(*para), &NodeKind::Paragraph);
        doc.children(*para).iter().map(|&c| doc.kind(c).clone()).collect()
    }

    fn literal(value: &str) -> NodeKind {
        NodeKind::Literal {
            value: value.to_string(),
        }
    }

    #[test]
    fn escapes() {
        assert_eq!(inlines("\\*not emphasized\\*"), vec![NodeKind::text("*not emphasized*")]);
    }

    #[test]
    fn entities() {
        assert_eq!(inlines("&copy; &#35; &#x22; &nosuch;"), vec![NodeKind::text("© # \" &nosuch;")]);
    }

    #[test]
    fn overlong_numeric_reference_is_text() {
        assert_eq!(inlines("&#87654321; &#1234567;"), vec![NodeKind::text("&#87654321; \u{fffd}")]);
    }

    #[test]
    fn code_spans() {
        assert_eq!(inlines("`foo`"), vec![literal("foo")]);
        assert_eq!(inlines("`` foo ` bar ``"), vec![literal("foo ` bar")]);
        assert_eq!(inlines("`foo\nbar  baz`"), vec![literal("foo bar baz")]);
        assert_eq!(inlines("```foo``"), vec![NodeKind::text("```foo``")]);
    }

    #[test]
    fn code_span_beats_emphasis() {
        assert_eq!(
            inlines("*a `*`"),
            vec![NodeKind::text("*a "), literal("*")]
        );
    }

    #[test]
    fn uri_autolink() {
        let (doc, _) = parse_for_test("<https://example.com/a b>\n\n<https://example.com/a?b[c]>");
        let root = doc.root();
        unwrap!(doc.children(root), [first, second]);
        assert_eq!(doc.to_text(*first), "<https://example.com/a b>");
        let link = get_only(doc.children(*second));
        assert_eq!(
            doc.kind(*link),
            &NodeKind::Reference {
                refuri: "https://example.com/a?b%5Bc%5D".to_string(),
                title: None,
            }
        );
        assert_eq!(doc.to_text(*link), "https://example.com/a?b[c]");
    }

    #[test]
    fn email_autolink() {
        let kinds = inlines("<foo+bar@example.com>");
        unwrap!(&kinds[..], [NodeKind::Reference { refuri, .. }]);
        assert_eq!(refuri, "mailto:foo+bar@example.com");
    }

    #[test]
    fn raw_html() {
        assert_eq!(
            inlines("a <b class=\"x\">c</b> <!-- d -->"),
            vec![
                NodeKind::text("a "),
                NodeKind::InlineHtml {
                    value: "<b class=\"x\">".to_string()
                },
                NodeKind::text("c"),
                NodeKind::InlineHtml {
                    value: "</b>".to_string()
                },
                NodeKind::text(" "),
                NodeKind::InlineHtml {
                    value: "<!-- d -->".to_string()
                },
            ]
        );
        assert_eq!(inlines("a <33> <!-->"), vec![NodeKind::text("a <33> <!-->")]);
    }

    #[test]
    fn line_breaks() {
        assert_eq!(
            inlines("a  \nb\\\nc \nd"),
            vec![
                NodeKind::text("a"),
                NodeKind::LineBreak,
                NodeKind::text("b"),
                NodeKind::LineBreak,
                NodeKind::text("c\nd"),
            ]
        );
    }

    #[test]
    fn soft_breaks_drop_one_trailing_blank() {
        assert_eq!(inlines("a\t\nb \nc\nd"), vec![NodeKind::text("a\nb\nc\nd")]);
        assert_eq!(inlines("a \tb"), vec![NodeKind::text("a \tb")]);
    }

    #[test]
    fn no_line_breaks_in_titles() {
        let (doc, _) = parse_flat("a  \nb\n===\n");
        let section = get_only(doc.children(doc.root()));
        let title = doc.children(*section)[0];
        assert_eq!(child_kinds(&doc, title), vec![&NodeKind::text("a  \nb")]);
    }

    #[test]
    fn flanking() {
        let (doc, _) = parse_for_test("a*b* _c_d *");
        let para = get_only(doc.children(doc.root()));
        let kinds = child_kinds(&doc, *para);
        unwrap!(&kinds[..], [NodeKind::Text { .. }, NodeKind::Emphasis, NodeKind::Text { value }]);
        assert_eq!(value, " _c_d *");
    }
}
