//! Post-parse passes over the whole document.
//!
//! Block parsing leaves some work undone: inline text is still raw, blank lines and delimiter markers are still in the
//! tree, and headings haven't been grouped into sections. Each [`Transform`] does one of those jobs. They run in
//! priority order once block parsing is done.
use crate::context::ParseContext;
use crate::parser::Parser;

mod emphasis;
mod filters;
mod inline;
mod lists;
mod sections;
mod text_nodes;

pub use emphasis::*;
pub use filters::*;
pub use inline::*;
pub use lists::*;
pub use sections::*;
pub use text_nodes::*;

pub trait Transform: Send + Sync {
    fn name(&self) -> &'static str;

    /// Lower priorities run first.
    fn priority(&self) -> u32;

    fn apply(&self, parser: &Parser, ctx: &mut ParseContext);
}

/// The standard transforms, in no particular order.
pub fn standard() -> Vec<Box<dyn Transform>> {
    vec![
        Box::new(InlineTransform),
        Box::new(TightListsDetector),
        Box::new(BlanklineFilter),
        Box::new(LinebreakFilter),
        Box::new(SectionTreeConstructor),
        Box::new(BracketConverter),
        Box::new(EmphasisConverter),
        Box::new(TextNodeConnector),
        Box::new(TightListsCompactor),
    ]
}
