use crate::block::{next_line_matches, BlockParser, BlockProcessor};
use crate::context::ParseContext;
use crate::doc::{NodeId, NodeKind};
use crate::inline::{parse_link_destination, MAX_LABEL_CHARS};
use crate::readers::{LineRead, MultiLineReader};
use crate::util::entities::decode_entities;
use crate::util::patterns::{Pattern, ESCAPED_CHAR};
use crate::util::text::{collapse_whitespace, is_blank, normalize_label, unescape};
use crate::Error;
use lazy_static::lazy_static;

lazy_static! {
    static ref LABEL_CHARS: String = format!(r"(?:[^\[\]\\]|{ESCAPED_CHAR}|\\)*");
    static ref LABEL_START: Pattern = Pattern::new(&format!(r"^ {{0,3}}\[({})(?:\]:|$)", *LABEL_CHARS));
    static ref LABEL_CONTINUATION: Pattern = Pattern::new(&format!(r"^({})(?:\]:|$)", *LABEL_CHARS));
    static ref WHITESPACE: Pattern = Pattern::new(r"^(?:[ \t]+|(?=\n|$))");
    static ref END_OF_LINE: Pattern = Pattern::new(r"^\s*$");
    static ref TITLE_START: Pattern = Pattern::new(r#"^\s*(["'(])"#);
    static ref DOUBLE_QUOTED_TITLE: Pattern = Pattern::new(&format!(r#"^((?:{ESCAPED_CHAR}|[^"\\]|\\)*)(")?"#));
    static ref SINGLE_QUOTED_TITLE: Pattern = Pattern::new(&format!(r#"^((?:{ESCAPED_CHAR}|[^'\\]|\\)*)(')?"#));
    static ref PARENTHESIZED_TITLE: Pattern = Pattern::new(&format!(r"^((?:{ESCAPED_CHAR}|[^()\\]|\\)*)(\))?"));
}

struct Definition {
    label: String,
    destination: String,
    title: Option<String>,
}

/// A link reference definition:
///
/// ```markdown
/// [label]:
///   /destination
///   "title"
/// ```
///
/// Each of the three parts may start on a new line. The definition becomes a [`NodeKind::Target`], and is registered
/// with the document so that reference links can find it.
pub struct LinkReferenceDefinitionProcessor;

impl BlockProcessor for LinkReferenceDefinitionProcessor {
    fn name(&self) -> &'static str {
        "LinkReferenceDefinitionProcessor"
    }

    fn priority(&self) -> u32 {
        750
    }

    fn matches(&self, reader: &dyn LineRead) -> bool {
        next_line_matches(reader, &LABEL_START)
    }

    fn run(&self, _: &BlockParser, reader: &mut dyn LineRead, ctx: &mut ParseContext, parent: NodeId) -> Result<bool, Error> {
        let start = reader.lineno();
        let definition = {
            let mut multi = MultiLineReader::new(&mut *reader);
            let definition = parse_definition(&mut multi);
            if definition.is_none() {
                multi.reset_to(start);
            }
            definition
        };
        let Some(Definition {
            label,
            destination,
            title,
        }) = definition
        else {
            return Ok(false);
        };

        let line = start + 1;
        let name = collapse_whitespace(&label);
        let target = ctx.doc.create_at(
            NodeKind::Target {
                name: name.clone(),
                refuri: destination,
                title,
            },
            line,
        );
        ctx.doc.append(parent, target);
        if !ctx.doc.register_target(normalize_label(&label), target) {
            ctx.warn(format!("Duplicate explicit target name: \"{name}\""), Some(line));
        }
        Ok(true)
    }
}

fn parse_definition(multi: &mut MultiLineReader) -> Option<Definition> {
    multi.readline().ok()?;
    let label = parse_label(multi)?;
    multi.consume(&WHITESPACE)?;
    let destination = parse_destination(multi)?;
    multi.consume(&WHITESPACE)?;

    let before_title = multi.position();
    let title = match parse_title(multi) {
        Some(title) if multi.consume(&END_OF_LINE).is_some() => Some(title),
        _ => {
            multi.rewind(before_title).ok()?;
            multi.consume(&END_OF_LINE)?;
            None
        }
    };
    Some(Definition {
        label,
        destination,
        title,
    })
}

fn parse_label(multi: &mut MultiLineReader) -> Option<String> {
    let mut part = multi.consume(&LABEL_START)?;
    let mut label = part.group(1).to_string();
    while !part.whole().ends_with("]:") {
        multi.readline().ok()?;
        part = multi.consume(&LABEL_CONTINUATION)?;
        if is_blank(part.whole()) {
            return None;
        }
        label.push_str(part.group(1));
    }
    if is_blank(&label) || label.chars().count() > MAX_LABEL_CHARS {
        return None;
    }
    Some(label)
}

fn parse_destination(multi: &mut MultiLineReader) -> Option<String> {
    if multi.eol() {
        multi.readline().ok()?;
    }
    let destination = multi.with_text_reader(parse_link_destination)?;
    if destination.uri.is_empty() && !destination.angled {
        return None;
    }
    Some(destination.uri)
}

fn parse_title(multi: &mut MultiLineReader) -> Option<String> {
    if multi.eol() {
        multi.readline().ok()?;
    }
    let opening = multi.consume(&TITLE_START)?;
    let body: &Pattern = match opening.group(1) {
        "\"" => &DOUBLE_QUOTED_TITLE,
        "'" => &SINGLE_QUOTED_TITLE,
        _ => &PARENTHESIZED_TITLE,
    };

    let mut title = String::new();
    loop {
        let part = multi.consume(body)?;
        title.push_str(part.group(1));
        if !part.group(2).is_empty() {
            break;
        }
        // an unclosed title has to run to the end of the line, and continue on the next one
        if !multi.remain().is_empty() {
            return None;
        }
        multi.readline().ok()?;
        if is_blank(multi.remain()) {
            return None;
        }
    }
    Some(unescape(&decode_entities(&title)).into_owned())
}
