use crate::context::ParseContext;
use crate::doc::{Document, NodeId, NodeKind};
use crate::parser::Parser;
use crate::transforms::Transform;

/// Decides whether each list is tight: a list is loose if any of its items has a blank line between its children.
///
/// Lists that already know their tightness are left alone.
pub struct TightListsDetector;

impl Transform for TightListsDetector {
    fn name(&self) -> &'static str {
        "TightListsDetector"
    }

    fn priority(&self) -> u32 {
        190
    }

    fn apply(&self, _parser: &Parser, ctx: &mut ParseContext) {
        let root = ctx.doc.root();
        for id in ctx.doc.descendants(root) {
            if !ctx.doc.kind(id).is_list() || tightness(&ctx.doc, id).is_some() {
                continue;
            }
            let loose = ctx.doc.children(id).iter().any(|&item| {
                ctx.doc
                    .children(item)
                    .iter()
                    .skip(1)
                    .any(|&c| matches!(ctx.doc.kind(c), NodeKind::BlankLine))
            });
            set_tightness(&mut ctx.doc, id, !loose);
        }
    }
}

fn tightness(doc: &Document, list: NodeId) -> Option<bool> {
    match doc.kind(list) {
        NodeKind::BulletList { tight, .. } | NodeKind::EnumeratedList { tight, .. } => *tight,
        _ => None,
    }
}

fn set_tightness(doc: &mut Document, list: NodeId, value: bool) {
    if let NodeKind::BulletList { tight, .. } | NodeKind::EnumeratedList { tight, .. } = doc.kind_mut(list) {
        *tight = Some(value);
    }
}

/// In tight lists, unwraps each item's paragraphs, so their inline content sits directly in the item.
pub struct TightListsCompactor;

impl Transform for TightListsCompactor {
    fn name(&self) -> &'static str {
        "TightListsCompactor"
    }

    fn priority(&self) -> u32 {
        300
    }

    fn apply(&self, _parser: &Parser, ctx: &mut ParseContext) {
        let root = ctx.doc.root();
        for list in ctx.doc.descendants(root) {
            if tightness(&ctx.doc, list) != Some(true) {
                continue;
            }
            for item in ctx.doc.children(list).to_vec() {
                for child in ctx.doc.children(item).to_vec() {
                    if matches!(ctx.doc.kind(child), NodeKind::Paragraph) {
                        unwrap_node(&mut ctx.doc, child);
                    }
                }
            }
        }
    }
}

/// Replaces a node with its children.
fn unwrap_node(doc: &mut Document, node: NodeId) {
    for child in doc.children(node).to_vec() {
        doc.insert_before(node, child);
    }
    doc.remove(node);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::utils_for_test::*;
    use indoc::indoc;

    #[test]
    fn tight_items_lose_paragraphs() {
        let (doc, _) = parse_for_test("1. a\n2. b\n");
        let list = get_only(doc.children(doc.root()));
        assert_eq!(
            doc.kind(*list),
            &NodeKind::EnumeratedList {
                start: 1,
                suffix: '.',
                tight: Some(true),
            }
        );
        for &item in doc.children(*list) {
            let kinds = child_kinds(&doc, item);
            unwrap!(&kinds[..], [NodeKind::Text { .. }]);
        }
    }

    #[test]
    fn blank_line_between_blocks_of_an_item() {
        let md = indoc! {"
            - a

              b
            - c
        "};
        let (doc, _) = parse_for_test(md);
        let list = get_only(doc.children(doc.root()));
        assert_eq!(
            doc.kind(*list),
            &NodeKind::BulletList {
                bullet: '-',
                tight: Some(false),
            }
        );
        let first = doc.children(*list)[0];
        let kinds = child_kinds(&doc, first);
        unwrap!(&kinds[..], [NodeKind::Paragraph, NodeKind::Paragraph]);
    }

    #[test]
    fn nested_lists_decided_separately() {
        let md = indoc! {"
            - a
              - b

              - c
        "};
        let (doc, _) = parse_for_test(md);
        let outer = get_only(doc.children(doc.root()));
        assert_eq!(tightness(&doc, *outer), Some(true));
        let first = doc.children(*outer)[0];
        let inner = doc.children(first)[1];
        assert_eq!(tightness(&doc, inner), Some(false));
    }

    #[test]
    fn preset_tightness_kept() {
        let mut doc = Document::new("test");
        let root = doc.root();
        let list = doc.create(NodeKind::BulletList {
            bullet: '*',
            tight: Some(false),
        });
        doc.append(root, list);
        let item = doc.create(NodeKind::ListItem);
        doc.append(list, item);

        let options = crate::parser::ParseOptions::default();
        let mut diagnostics: Vec<crate::diagnostics::Diagnostic> = Vec::new();
        let mut ctx = ParseContext::new(&options, &mut diagnostics);
        ctx.doc = doc;
        TightListsDetector.apply(&Parser::commonmark(), &mut ctx);
        assert_eq!(tightness(&ctx.doc, list), Some(false));
    }
}
