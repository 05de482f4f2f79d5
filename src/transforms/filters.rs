use crate::context::ParseContext;
use crate::doc::{Document, NodeId, NodeKind};
use crate::inline::demote;
use crate::parser::{HardBreaks, Parser};
use crate::transforms::Transform;

/// Drops blank line markers. They're only needed to decide list tightness.
pub struct BlanklineFilter;

impl Transform for BlanklineFilter {
    fn name(&self) -> &'static str {
        "BlanklineFilter"
    }

    fn priority(&self) -> u32 {
        200
    }

    fn apply(&self, _parser: &Parser, ctx: &mut ParseContext) {
        let root = ctx.doc.root();
        for id in ctx.doc.descendants(root) {
            ctx.doc.retain_children(id, |_, kind| !matches!(kind, NodeKind::BlankLine));
        }
    }
}

/// Turns hard line breaks back into plain newlines, if the options ask for that.
pub struct LinebreakFilter;

impl Transform for LinebreakFilter {
    fn name(&self) -> &'static str {
        "LinebreakFilter"
    }

    fn priority(&self) -> u32 {
        200
    }

    fn apply(&self, _parser: &Parser, ctx: &mut ParseContext) {
        if ctx.options.hard_breaks != HardBreaks::Downgrade {
            return;
        }
        let root = ctx.doc.root();
        for id in ctx.doc.descendants(root) {
            if !matches!(ctx.doc.kind(id), NodeKind::LineBreak) {
                continue;
            }
            let line = nearest_line(&ctx.doc, id);
            ctx.warn("A hard line break detected, ignored.", line);
            *ctx.doc.kind_mut(id) = NodeKind::text("\n");
        }
    }
}

/// The line of the node, or of its closest ancestor that has one.
fn nearest_line(doc: &Document, id: NodeId) -> Option<usize> {
    let mut current = Some(id);
    while let Some(node) = current {
        if let Some(line) = doc.line(node) {
            return Some(line);
        }
        current = doc.parent(node);
    }
    None
}

/// Turns any bracket markers that never became part of a link back into text.
pub struct BracketConverter;

impl Transform for BracketConverter {
    fn name(&self) -> &'static str {
        "BracketConverter"
    }

    fn priority(&self) -> u32 {
        250
    }

    fn apply(&self, _parser: &Parser, ctx: &mut ParseContext) {
        let root = ctx.doc.root();
        for id in ctx.doc.descendants(root) {
            if matches!(ctx.doc.kind(id), NodeKind::BracketMarker(_)) {
                demote(&mut ctx.doc, id);
            }
        }
    }
}
