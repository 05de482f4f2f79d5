use crate::context::ParseContext;
use crate::doc::{Bracket, BracketMarker, Document, NodeId, NodeKind};
use crate::inline::{backtrack, InlineProcessor, InlineResult};
use crate::readers::TextReader;
use crate::transforms::resolve_emphasis;
use crate::util::entities::decode_entities;
use crate::util::patterns::{Pattern, ESCAPED_CHAR};
use crate::util::text::{normalize_label, unescape};
use crate::util::uri::normalize_uri;
use lazy_static::lazy_static;

/// The longest a link label may be, in chars (not counting the brackets).
pub(crate) const MAX_LABEL_CHARS: usize = 999;

lazy_static! {
    static ref LINK_OPENER: Pattern = Pattern::new(r"^!?\[");
    // a backslash always pairs with the next char here, so `\>` can't close the destination
    static ref ANGLED_DESTINATION: Pattern = Pattern::new(r"^\s*<((?:[^<>\n\\]|\\[^\n])*)>");
    static ref LEADING_SPACE: Pattern = Pattern::new(r"^[ \n]*");
    static ref TITLE: Pattern = Pattern::new(&format!(
        r#"^\s*("(?:{e}|[^"\\]|\\)*"|'(?:{e}|[^'\\]|\\)*'|\((?:{e}|[^()\\]|\\)*\))"#,
        e = ESCAPED_CHAR
    ));
    static ref CLOSING_PAREN: Pattern = Pattern::new(r"^\s*\)");
    static ref LABEL: Pattern = Pattern::new(&format!(r"^((?:[^\[\]\\]|{ESCAPED_CHAR}|\\)*)\]"));
}

/// A parsed link destination.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct LinkDestination {
    /// Entity-decoded, unescaped and URI-normalized.
    pub uri: String,
    /// Whether it was written in `<...>`.
    pub angled: bool,
}

/// Parses a link destination at the cursor: either `<anything but newlines>`, or a run of non-space chars whose
/// parentheses are balanced. Leading whitespace is skipped.
pub(crate) fn parse_link_destination(reader: &mut TextReader) -> Option<LinkDestination> {
    if let Some(captures) = reader.consume(&ANGLED_DESTINATION) {
        let raw = captures.get(1).map_or("", |m| m.as_str());
        return Some(LinkDestination {
            uri: normalize_destination(raw),
            angled: true,
        });
    }

    reader.consume(&LEADING_SPACE);
    if reader.peek() == Some('<') {
        return None;
    }
    let start = reader.position();
    let mut depth = 0usize;
    while let Some(ch) = reader.peek() {
        match ch {
            '\\' => {
                reader.step_char();
                if reader.peek().map_or(false, |c| c.is_ascii_punctuation()) {
                    reader.step_char();
                }
                continue;
            }
            '(' => depth += 1,
            ')' if depth == 0 => break,
            ')' => depth -= 1,
            c if c.is_whitespace() || c.is_ascii_control() => break,
            _ => {}
        }
        reader.step_char();
    }
    if depth != 0 {
        return None;
    }
    let raw = reader.slice(start, reader.position());
    Some(LinkDestination {
        uri: normalize_destination(raw),
        angled: false,
    })
}

fn normalize_destination(raw: &str) -> String {
    normalize_uri(&unescape(&decode_entities(raw)))
}

/// Parses a quoted or parenthesized link title at the cursor, returning its (unescaped, entity-decoded) contents.
pub(crate) fn parse_link_title(reader: &mut TextReader) -> Option<String> {
    let captures = reader.consume(&TITLE)?;
    let quoted = captures.get(1).map_or("", |m| m.as_str());
    let inner = &quoted[1..quoted.len() - 1];
    Some(unescape(&decode_entities(inner)).into_owned())
}

/// `[` or `![`, which may start a link or image.
pub struct LinkOpenerProcessor;

impl InlineProcessor for LinkOpenerProcessor {
    fn name(&self) -> &'static str {
        "LinkOpenerProcessor"
    }

    fn matches(&self, reader: &TextReader) -> bool {
        matches!(reader.peek(), Some('[' | '!')) && LINK_OPENER.is_match(reader.remain())
    }

    fn run(&self, reader: &mut TextReader, ctx: &mut ParseContext, host: NodeId) -> InlineResult {
        let bracket = if reader.peek() == Some('!') {
            Bracket::ImageOpen
        } else {
            Bracket::Open
        };
        reader.step(bracket.as_str().len());
        let marker = ctx.doc.create(NodeKind::BracketMarker(BracketMarker {
            bracket,
            active: true,
            position: reader.position(),
        }));
        ctx.doc.append(host, marker);
        ctx.brackets.push(marker);
        Ok(true)
    }
}

/// `]`, which closes the most recent opener into a link or image, if what follows makes one.
///
/// After the `]`, this tries, in order: an inline destination (`(/uri "title")`), a full or collapsed reference
/// (`[label]`, `[]`), and the link text itself as a shortcut reference.
pub struct LinkCloserProcessor;

impl InlineProcessor for LinkCloserProcessor {
    fn name(&self) -> &'static str {
        "LinkCloserProcessor"
    }

    fn matches(&self, reader: &TextReader) -> bool {
        reader.peek() == Some(']')
    }

    fn run(&self, reader: &mut TextReader, ctx: &mut ParseContext, host: NodeId) -> InlineResult {
        let closer = ctx.doc.create(NodeKind::BracketMarker(BracketMarker {
            bracket: Bracket::Close,
            active: true,
            position: reader.position(),
        }));
        ctx.doc.append(host, closer);
        reader.step(1);

        if let Some(after_link) = close_link(*reader, ctx, closer) {
            *reader = after_link;
        }
        Ok(true)
    }
}

enum Resolution {
    Found { uri: String, title: Option<String> },
    NotFound,
}

/// Tries to turn the latest opener and `closer` into a link or image. Returns where the reader should continue on
/// success. On failure, any markers that can no longer form a link have been turned into text.
fn close_link<'s>(reader: TextReader<'s>, ctx: &mut ParseContext, closer: NodeId) -> Option<TextReader<'s>> {
    let &opener = ctx.brackets.last()?;
    let opener_marker = bracket_marker(&ctx.doc, opener)?.clone();
    if !opener_marker.active {
        ctx.brackets.pop();
        demote(&mut ctx.doc, opener);
        demote(&mut ctx.doc, closer);
        return None;
    }

    let closer_position = bracket_marker(&ctx.doc, closer)?.position;
    let link_text = reader.slice(opener_marker.position, closer_position);
    let mut reader = reader;
    let resolution = if reader.peek() == Some('(') {
        backtrack(&mut reader, parse_inline_link)
    } else if reader.peek() == Some('[') {
        backtrack(&mut reader, |r| parse_reference(r, &ctx.doc, link_text))
    } else {
        None
    };
    let resolution = resolution.unwrap_or_else(|| lookup_reference(&ctx.doc, link_text));

    ctx.brackets.pop();
    let Resolution::Found { uri, title } = resolution else {
        demote(&mut ctx.doc, opener);
        demote(&mut ctx.doc, closer);
        return None;
    };

    match opener_marker.bracket {
        Bracket::ImageOpen => {
            let image = ctx.doc.create(NodeKind::Paragraph);
            ctx.doc.enclose(opener, closer, image);
            resolve_emphasis(&mut ctx.doc, image);
            let alt = ctx.doc.to_text(image);
            ctx.doc.set_children(image, Vec::new());
            *ctx.doc.kind_mut(image) = NodeKind::Image { uri, alt, title };
        }
        _ => {
            let reference = ctx.doc.create(NodeKind::Reference { refuri: uri, title });
            ctx.doc.enclose(opener, closer, reference);
            // links can't contain links. Everything below an inactive opener is already inactive.
            for &earlier in ctx.brackets.iter().rev() {
                if let NodeKind::BracketMarker(marker) = ctx.doc.kind_mut(earlier) {
                    match marker.bracket {
                        Bracket::Open if !marker.active => break,
                        Bracket::Open => marker.active = false,
                        _ => {}
                    }
                }
            }
        }
    }
    Some(reader)
}

fn bracket_marker(doc: &Document, id: NodeId) -> Option<&BracketMarker> {
    match doc.kind(id) {
        NodeKind::BracketMarker(marker) => Some(marker),
        _ => None,
    }
}

/// Turns a bracket marker into the equivalent plain text, in place.
pub(crate) fn demote(doc: &mut Document, marker: NodeId) {
    let Some(text) = bracket_marker(doc, marker).map(|m| m.bracket.as_str()) else {
        return;
    };
    *doc.kind_mut(marker) = NodeKind::text(text);
}

/// `(destination "title")`, with the reader on the `(`.
fn parse_inline_link(reader: &mut TextReader) -> Option<Resolution> {
    reader.step(1);
    let destination = parse_link_destination(reader)?;
    let title = parse_link_title(reader);
    reader.consume(&CLOSING_PAREN)?;
    Some(Resolution::Found {
        uri: destination.uri,
        title,
    })
}

/// `[label]` or `[]`, with the reader on the `[`. An empty label refers to the link text.
///
/// Returns `None` if there's no well-formed label here (so the link text may still be a shortcut reference), and
/// [`Resolution::NotFound`] if there is one but nothing's defined for it.
fn parse_reference(reader: &mut TextReader, doc: &Document, link_text: &str) -> Option<Resolution> {
    reader.step(1);
    let captures = reader.consume(&LABEL)?;
    let label = captures.get(1).map_or("", |m| m.as_str());
    if label.chars().count() > MAX_LABEL_CHARS {
        return None;
    }
    let label = if label.is_empty() { link_text } else { label };
    Some(lookup_reference(doc, label))
}

fn lookup_reference(doc: &Document, label: &str) -> Resolution {
    let found = doc.lookup_target(&normalize_label(label)).map(|target| doc.kind(target));
    match found {
        Some(NodeKind::Target { refuri, title, .. }) => Resolution::Found {
            uri: refuri.clone(),
            title: title.clone(),
        },
        _ => Resolution::NotFound,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::utils_for_test::*;
    use indoc::indoc;

    fn destination(text: &str) -> Option<(String, bool, &str)> {
        let mut reader = TextReader::new(text);
        let parsed = parse_link_destination(&mut reader)?;
        Some((parsed.uri, parsed.angled, reader.remain()))
    }

    /// Parses a single paragraph, and returns it along with the document.
    fn paragraph(text: &str) -> (Document, NodeId) {
        let (doc, _) = parse_for_test(text);
        let para = *doc
            .children(doc.root())
            .iter()
            .find(|&&c| matches!(doc.kind(c), NodeKind::Paragraph))
            .expect("no paragraph");
        (doc, para)
    }

    #[test]
    fn destinations() {
        assert_eq!(destination("/url)"), Some(("/url".to_string(), false, ")")));
        assert_eq!(destination("  a(b(c))d x"), Some(("a(b(c))d".to_string(), false, " x")));
        assert_eq!(destination("<a b>c"), Some(("a%20b".to_string(), true, "c")));
        assert_eq!(destination("a\\)b)"), Some(("a)b".to_string(), false, ")")));
        assert_eq!(destination("&auml;"), Some(("%C3%A4".to_string(), false, "")));
        assert_eq!(destination("a(b"), None);
        assert_eq!(destination("<a\nb>"), None);
        assert_eq!(destination(")"), Some((String::new(), false, ")")));
    }

    #[test]
    fn angled_destination_escapes() {
        assert_eq!(destination("<foo\\>)"), None);
        assert_eq!(destination("<a\\>b>)"), Some(("a%3Eb".to_string(), true, ")")));
        assert_eq!(destination("<a\\\\>)"), Some(("a%5C".to_string(), true, ")")));
        assert_eq!(destination("<a\\b>)"), Some(("a%5Cb".to_string(), true, ")")));
    }

    #[test]
    fn escaped_angle_doesnt_close_destination() {
        let (doc, para) = paragraph("[link](<foo\\>)");
        assert_eq!(child_kinds(&doc, para), vec![&NodeKind::text("[link](<foo>)")]);
    }

    #[test]
    fn titles() {
        let mut reader = TextReader::new(" \"a \\\" &amp; b\")");
        assert_eq!(parse_link_title(&mut reader), Some("a \" & b".to_string()));
        assert_eq!(reader.remain(), ")");

        let mut reader = TextReader::new("(a (b))");
        assert_eq!(parse_link_title(&mut reader), None);
        assert_eq!(reader.position(), 0);
    }

    #[test]
    fn inline_link() {
        let (doc, para) = paragraph("[link *text*](/uri \"title\")");
        let link = get_only(doc.children(para));
        assert_eq!(
            doc.kind(*link),
            &NodeKind::Reference {
                refuri: "/uri".to_string(),
                title: Some("title".to_string()),
            }
        );
        let kinds = child_kinds(&doc, *link);
        unwrap!(&kinds[..], [NodeKind::Text { .. }, NodeKind::Emphasis]);
    }

    #[test]
    fn inline_link_empty_destination() {
        let (doc, para) = paragraph("[a]()");
        let link = get_only(doc.children(para));
        assert_eq!(
            doc.kind(*link),
            &NodeKind::Reference {
                refuri: String::new(),
                title: None,
            }
        );
    }

    #[test]
    fn reference_links() {
        let md = indoc! {r#"
            [Foo]: /foo 'the title'

            [full][FOO] [collapsed][] [foo] [foo][nope]
        "#};
        let (doc, para) = paragraph(md);
        let kinds = child_kinds(&doc, para);
        unwrap!(
            &kinds[..],
            [
                NodeKind::Reference { .. },
                NodeKind::Text { value: collapsed },
                NodeKind::Reference { .. },
                NodeKind::Text { value: tail }
            ]
        );
        assert_eq!(collapsed, " [collapsed][] ");
        assert_eq!(tail, " [foo][nope]");
        assert_eq!(doc.to_text(doc.children(para)[0]), "full");
    }

    #[test]
    fn failed_inline_link_falls_back_to_shortcut() {
        let md = "[foo]: /foo\n\n[foo](not a link)\n";
        let (doc, para) = paragraph(md);
        let kinds = child_kinds(&doc, para);
        unwrap!(&kinds[..], [NodeKind::Reference { refuri, .. }, NodeKind::Text { value }]);
        assert_eq!(refuri, "/foo");
        assert_eq!(value, "(not a link)");
    }

    #[test]
    fn image_alt_is_flattened() {
        let (doc, para) = paragraph("![foo *bar* `baz`](/img.png)");
        let image = get_only(doc.children(para));
        assert_eq!(
            doc.kind(*image),
            &NodeKind::Image {
                uri: "/img.png".to_string(),
                alt: "foo bar baz".to_string(),
                title: None,
            }
        );
        assert!(doc.children(*image).is_empty());
    }

    #[test]
    fn no_links_in_links() {
        let (doc, para) = paragraph("[a [b](/inner) c](/outer)");
        let kinds = child_kinds(&doc, para);
        unwrap!(&kinds[..], [NodeKind::Text { value: before }, NodeKind::Reference { refuri, .. }, NodeKind::Text { value: after }]);
        assert_eq!(before, "[a ");
        assert_eq!(refuri, "/inner");
        assert_eq!(after, " c](/outer)");
    }

    #[test]
    fn images_can_contain_links() {
        let (doc, para) = paragraph("![a [b](/inner) c](/outer)");
        let image = get_only(doc.children(para));
        unwrap!(doc.kind(*image), NodeKind::Image { uri, alt, .. });
        assert_eq!(uri, "/outer");
        assert_eq!(alt, "a b c");
    }

    #[test]
    fn unmatched_brackets_are_text() {
        let (doc, para) = paragraph("a ] b [c");
        assert_eq!(child_kinds(&doc, para), vec![&NodeKind::text("a ] b [c")]);
    }

    #[test]
    fn label_too_long() {
        let label = "x".repeat(1000);
        let md = format!("[{label}]: /url\n\n[{label}]\n");
        let (doc, _) = parse_for_test(&md);
        let kinds = child_kinds(&doc, doc.root());
        unwrap!(&kinds[..], [NodeKind::Paragraph, NodeKind::Paragraph]);
    }
}
