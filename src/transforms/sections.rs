use crate::context::ParseContext;
use crate::doc::{NodeId, NodeKind};
use crate::parser::Parser;
use crate::transforms::Transform;

/// Nests the flat run of headings and blocks into a tree of sections.
///
/// Block parsing leaves every heading as a [`NodeKind::Section`] holding only its title. This moves each block that
/// follows a heading into that heading's section, and each deeper heading into the section above it. A heading that
/// skips levels (an `<h3>` directly under an `<h1>`) is clamped to the next level down, with a warning.
///
/// Documents, block quotes and list items each get their own section tree. Disabled by
/// [`ParseOptions::sections`](crate::ParseOptions::sections).
pub struct SectionTreeConstructor;

impl Transform for SectionTreeConstructor {
    fn name(&self) -> &'static str {
        "SectionTreeConstructor"
    }

    fn priority(&self) -> u32 {
        200
    }

    fn apply(&self, _parser: &Parser, ctx: &mut ParseContext) {
        if !ctx.options.sections {
            return;
        }
        let root = ctx.doc.root();
        for id in ctx.doc.descendants(root) {
            if matches!(ctx.doc.kind(id), NodeKind::Document | NodeKind::BlockQuote | NodeKind::ListItem) {
                construct_section_tree(ctx, id);
            }
        }
    }
}

fn section_depth(ctx: &ParseContext, id: NodeId) -> Option<u8> {
    match ctx.doc.kind(id) {
        NodeKind::Section { depth } => Some(*depth),
        _ => None,
    }
}

fn construct_section_tree(ctx: &mut ParseContext, container: NodeId) {
    // the sections around the current position, outermost first; their depths count up from 1
    let mut open: Vec<NodeId> = Vec::new();
    let mut top_level = Vec::new();
    let mut nested = Vec::new();

    for node in ctx.doc.children(container).to_vec() {
        if let Some(depth) = section_depth(ctx, node) {
            let current_depth = open.len() as u8;
            if current_depth + 1 < depth {
                let title = ctx.doc.children(node).first().copied();
                let message = format!(
                    "Invalid deep section \"{}\" (<h{depth}>) appeared. Recognized a <h{}>.",
                    ctx.doc.to_text(node),
                    current_depth + 1
                );
                let line = title.and_then(|t| ctx.doc.line(t));
                ctx.warn(message, line);
                *ctx.doc.kind_mut(node) = NodeKind::Section {
                    depth: current_depth + 1,
                };
            } else {
                open.truncate(usize::from(depth).saturating_sub(1));
            }
        }

        match open.last() {
            Some(&section) => nested.push((section, node)),
            None => top_level.push(node),
        }
        if section_depth(ctx, node).is_some() {
            open.push(node);
        }
    }

    ctx.doc.set_children(container, top_level);
    for (section, node) in nested {
        ctx.doc.append(section, node);
    }
}
