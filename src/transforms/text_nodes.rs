use crate::context::ParseContext;
use crate::doc::{Document, NodeId, NodeKind};
use crate::parser::Parser;
use crate::transforms::Transform;
use std::collections::HashSet;

/// Merges runs of adjacent text nodes into one.
///
/// Inline parsing and the other transforms leave text fragmented (every unmatched delimiter becomes its own node, for
/// example). After this, no node has two text children in a row.
pub struct TextNodeConnector;

impl Transform for TextNodeConnector {
    fn name(&self) -> &'static str {
        "TextNodeConnector"
    }

    fn priority(&self) -> u32 {
        260
    }

    fn apply(&self, _parser: &Parser, ctx: &mut ParseContext) {
        let root = ctx.doc.root();
        for id in ctx.doc.descendants(root) {
            connect_children(&mut ctx.doc, id);
        }
    }
}

pub(crate) trait Concatenate: Sized {
    fn try_concatenate(&mut self, other: Self) -> Result<(), Self>;

    fn concatenate_similar<I: IntoIterator<Item = Self>>(items: I) -> Vec<Self> {
        let mut results: Vec<Self> = Vec::new();
        for curr in items {
            let rejected = match results.last_mut() {
                Some(prev) => prev.try_concatenate(curr),
                None => Err(curr),
            };
            if let Err(new_segment) = rejected {
                results.push(new_segment);
            }
        }
        results
    }
}

/// A child, or a run of text children.
enum Run {
    Text {
        first: NodeId,
        merged: Vec<NodeId>,
        value: String,
    },
    Other,
}

impl Concatenate for Run {
    fn try_concatenate(&mut self, other: Self) -> Result<(), Self> {
        match (self, other) {
            (
                Run::Text { merged, value, .. },
                Run::Text {
                    first,
                    merged: mut other_merged,
                    value: other_value,
                },
            ) => {
                merged.push(first);
                merged.append(&mut other_merged);
                value.push_str(&other_value);
                Ok(())
            }
            (_, other) => Err(other),
        }
    }
}

fn connect_children(doc: &mut Document, parent: NodeId) {
    let children = doc.children(parent);
    if children.len() < 2 {
        return;
    }
    let runs = children.iter().map(|&id| match doc.kind(id) {
        NodeKind::Text { value } => Run::Text {
            first: id,
            merged: Vec::new(),
            value: value.clone(),
        },
        _ => Run::Other,
    });
    let runs = Run::concatenate_similar(runs.collect::<Vec<_>>());

    let mut absorbed: HashSet<NodeId> = HashSet::new();
    for run in runs {
        let Run::Text { first, merged, value } = run else {
            continue;
        };
        if merged.is_empty() {
            continue;
        }
        *doc.kind_mut(first) = NodeKind::Text { value };
        absorbed.extend(merged);
    }
    if !absorbed.is_empty() {
        doc.retain_children(parent, |id, _| !absorbed.contains(&id));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::utils_for_test::*;

    fn connected(texts: &[Option<&str>]) -> Vec<NodeKind> {
        let mut doc = Document::new("test");
        let root = doc.root();
        let para = doc.create(NodeKind::Paragraph);
        doc.append(root, para);
        for text in texts {
            let kind = match text {
                Some(t) => NodeKind::text(*t),
                None => NodeKind::LineBreak,
            };
            let id = doc.create(kind);
            doc.append(para, id);
        }
        connect_children(&mut doc, para);
        doc.children(para).iter().map(|&id| doc.kind(id).clone()).collect()
    }

    #[test]
    fn merges_runs() {
        assert_eq!(
            connected(&[Some("a"), Some("b"), None, Some("c"), Some("d"), Some("e")]),
            vec![NodeKind::text("ab"), NodeKind::LineBreak, NodeKind::text("cde")]
        );
    }

    #[test]
    fn nothing_to_merge() {
        assert_eq!(
            connected(&[None, Some("a"), None]),
            vec![NodeKind::LineBreak, NodeKind::text("a"), NodeKind::LineBreak]
        );
        assert_eq!(connected(&[Some("only")]), vec![NodeKind::text("only")]);
    }

    #[test]
    fn after_parsing() {
        let (doc, _) = parse_for_test("a * b [c");
        let para = get_only(doc.children(doc.root()));
        assert_eq!(child_kinds(&doc, *para), vec![&NodeKind::text("a * b [c")]);
    }
}
