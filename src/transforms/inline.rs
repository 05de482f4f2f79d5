use crate::context::ParseContext;
use crate::doc::NodeKind;
use crate::parser::Parser;
use crate::transforms::Transform;

/// Runs the inline parser over every paragraph and title.
pub struct InlineTransform;

impl Transform for InlineTransform {
    fn name(&self) -> &'static str {
        "InlineTransform"
    }

    fn priority(&self) -> u32 {
        150
    }

    fn apply(&self, parser: &Parser, ctx: &mut ParseContext) {
        let root = ctx.doc.root();
        for id in ctx.doc.descendants(root) {
            if matches!(ctx.doc.kind(id), NodeKind::Paragraph | NodeKind::Title) {
                parser.inline_parser().parse(ctx, id);
            }
        }
    }
}
