use crate::doc::{Document, NodeId, NodeKind};
use std::fmt::Write;

const INDENT: &str = "    ";

/// Renders a document as indented pseudo-XML, one node per line:
///
/// ```text
/// <document source="&lt;string&gt;">
///     <paragraph>
///         Hello,
///         <emphasis>
///             world
/// ```
///
/// Text is written as-is (its lines indented to the text node's depth). Nodes with a literal value, like code blocks,
/// write that value as their body.
pub fn pformat(doc: &Document) -> String {
    let mut out = String::new();
    write_node(doc, doc.root(), 0, &mut out);
    out
}

fn write_node(doc: &Document, id: NodeId, depth: usize, out: &mut String) {
    let kind = doc.kind(id);
    if let NodeKind::Text { value } = kind {
        write_lines(value, depth, out);
        return;
    }
    push_indent(depth, out);
    out.push('<');
    out.push_str(kind.tag_name());
    if matches!(kind, NodeKind::Document) {
        write_attr("source", doc.source(), out);
    }
    for name in kind.attribute_names() {
        if *name == "value" {
            continue;
        }
        if let Some(value) = kind.attribute(name) {
            write_attr(name, &value.to_string(), out);
        }
    }
    out.push_str(">\n");

    match kind {
        NodeKind::LiteralBlock { value, .. }
        | NodeKind::HtmlBlock { value }
        | NodeKind::Literal { value }
        | NodeKind::InlineHtml { value }
            if !value.is_empty() =>
        {
            write_lines(value.strip_suffix('\n').unwrap_or(value), depth + 1, out);
        }
        _ => {}
    }
    for &child in doc.children(id) {
        write_node(doc, child, depth + 1, out);
    }
}

fn write_attr(name: &str, value: &str, out: &mut String) {
    // writing to a String can't fail
    let _ = write!(out, " {name}=\"{}\"", html_escape::encode_double_quoted_attribute(value));
}

fn write_lines(text: &str, depth: usize, out: &mut String) {
    for line in text.split('\n') {
        if !line.is_empty() {
            push_indent(depth, out);
            out.push_str(line);
        }
        out.push('\n');
    }
}

fn push_indent(depth: usize, out: &mut String) {
    for _ in 0..depth {
        out.push_str(INDENT);
    }
}
