use crate::context::ParseContext;
use crate::doc::{Document, EmphasisMarker, NodeId, NodeKind};
use crate::parser::Parser;
use crate::transforms::Transform;
use std::collections::HashMap;

/// Pairs up emphasis markers into [`NodeKind::Emphasis`] and [`NodeKind::Strong`] nodes.
pub struct EmphasisConverter;

impl Transform for EmphasisConverter {
    fn name(&self) -> &'static str {
        "EmphasisConverter"
    }

    fn priority(&self) -> u32 {
        250
    }

    fn apply(&self, _parser: &Parser, ctx: &mut ParseContext) {
        let root = ctx.doc.root();
        resolve_emphasis(&mut ctx.doc, root);
    }
}

/// Resolves the emphasis markers in `node` and everything under it. Markers that don't pair up become plain text.
pub(crate) fn resolve_emphasis(doc: &mut Document, node: NodeId) {
    for id in doc.descendants(node) {
        if doc.children(id).iter().any(|&c| emphasis_marker(doc, c).is_some()) {
            resolve_children(doc, id);
        }
    }
}

fn emphasis_marker(doc: &Document, id: NodeId) -> Option<&EmphasisMarker> {
    match doc.kind(id) {
        NodeKind::EmphasisMarker(marker) => Some(marker),
        _ => None,
    }
}

fn emphasis_marker_mut(doc: &mut Document, id: NodeId) -> Option<&mut EmphasisMarker> {
    match doc.kind_mut(id) {
        NodeKind::EmphasisMarker(marker) => Some(marker),
        _ => None,
    }
}

/// A child of the node being resolved.
///
/// The children are threaded into a list, so wrapping a run of them into emphasis doesn't shift the rest.
struct Slot {
    node: NodeId,
    prev: Option<usize>,
    next: Option<usize>,
    /// For emphasis created here: the first of its children.
    inner: Option<usize>,
}

/// An emphasis marker that may still pair up. These are threaded into their own list, in text order.
struct Delimiter {
    slot: usize,
    prev: Option<usize>,
    next: Option<usize>,
}

/// Which openers a closer could pair with depends only on these. See [`Resolver::find_opener`].
type OpenerKey = (char, bool, usize);

struct Resolver<'d> {
    doc: &'d mut Document,
    slots: Vec<Slot>,
    head: Option<usize>,
    delimiters: Vec<Delimiter>,
}

fn resolve_children(doc: &mut Document, parent: NodeId) {
    let children = doc.children(parent).to_vec();
    let mut resolver = Resolver::new(doc, &children);
    // openers before this (by delimiter index) have already failed to pair with a closer of the given key
    let mut floors: HashMap<OpenerKey, usize> = HashMap::new();

    let mut current = if resolver.delimiters.is_empty() { None } else { Some(0) };
    while let Some(closer) = current {
        let Some(marker) = resolver.marker(closer).cloned() else {
            break;
        };
        let next = resolver.delimiters[closer].next;
        if !marker.can_close {
            current = next;
            continue;
        }

        let key = (marker.marker, marker.can_open, marker.orig_length % 3);
        match resolver.find_opener(closer, floors.get(&key).copied()) {
            Some(opener) => {
                resolver.wrap(opener, closer);
                let exhausted = resolver.marker(closer).map_or(true, |m| m.curr_length == 0);
                current = if exhausted { next } else { Some(closer) };
            }
            None => {
                floors.insert(key, closer);
                if !marker.can_open {
                    resolver.unlink_delimiter(closer);
                }
                current = next;
            }
        }
    }

    resolver.finish(parent);
}

impl<'d> Resolver<'d> {
    fn new(doc: &'d mut Document, children: &[NodeId]) -> Self {
        let mut slots = Vec::with_capacity(children.len());
        let mut delimiters: Vec<Delimiter> = Vec::new();
        for (i, &node) in children.iter().enumerate() {
            slots.push(Slot {
                node,
                prev: i.checked_sub(1),
                next: (i + 1 < children.len()).then_some(i + 1),
                inner: None,
            });
            if emphasis_marker(doc, node).is_some() {
                let prev = delimiters.len().checked_sub(1);
                if let Some(p) = prev {
                    delimiters[p].next = Some(delimiters.len());
                }
                delimiters.push(Delimiter { slot: i, prev, next: None });
            }
        }
        Self {
            doc,
            head: (!slots.is_empty()).then_some(0),
            slots,
            delimiters,
        }
    }

    fn marker(&self, delimiter: usize) -> Option<&EmphasisMarker> {
        emphasis_marker(self.doc, self.slots[self.delimiters[delimiter].slot].node)
    }

    /// The nearest delimiter before the closer that can open emphasis with it, not looking below `floor`.
    ///
    /// Whether an opener fits a closer only depends on the closer's [`OpenerKey`], so once a search for a key fails,
    /// later closers with that key can skip everything it looked at.
    fn find_opener(&self, closer: usize, floor: Option<usize>) -> Option<usize> {
        let close = self.marker(closer)?;
        let mut candidate = self.delimiters[closer].prev;
        while let Some(opener) = candidate {
            if floor.map_or(false, |f| opener < f) {
                return None;
            }
            if let Some(open) = self.marker(opener) {
                if can_pair(open, close) {
                    return Some(opener);
                }
            }
            candidate = self.delimiters[opener].prev;
        }
        None
    }

    fn wrap(&mut self, opener: usize, closer: usize) {
        let (Some(open), Some(close)) = (self.marker(opener), self.marker(closer)) else {
            return;
        };
        let length = if open.curr_length >= 2 && close.curr_length >= 2 { 2 } else { 1 };
        let kind = if length == 2 {
            NodeKind::Strong
        } else {
            NodeKind::Emphasis
        };
        let node = self.doc.create(kind);

        // the markers in between can no longer pair up with anything
        self.delimiters[opener].next = Some(closer);
        self.delimiters[closer].prev = Some(opener);

        let open_slot = self.delimiters[opener].slot;
        let close_slot = self.delimiters[closer].slot;
        let inner = self.slots[open_slot].next.filter(|&first| first != close_slot);
        if let Some(first) = inner {
            self.slots[first].prev = None;
            if let Some(last) = self.slots[close_slot].prev {
                self.slots[last].next = None;
            }
        }
        let wrapper = self.slots.len();
        self.slots.push(Slot {
            node,
            prev: Some(open_slot),
            next: Some(close_slot),
            inner,
        });
        self.slots[open_slot].next = Some(wrapper);
        self.slots[close_slot].prev = Some(wrapper);

        self.shrink(opener, length);
        self.shrink(closer, length);
    }

    /// Uses up `length` chars of a delimiter, dropping it once there are none left.
    fn shrink(&mut self, delimiter: usize, length: usize) {
        let node = self.slots[self.delimiters[delimiter].slot].node;
        let Some(m) = emphasis_marker_mut(self.doc, node) else {
            return;
        };
        m.curr_length = m.curr_length.saturating_sub(length);
        if m.curr_length == 0 {
            self.unlink_slot(self.delimiters[delimiter].slot);
            self.unlink_delimiter(delimiter);
        }
    }

    fn unlink_delimiter(&mut self, delimiter: usize) {
        let Delimiter { prev, next, .. } = self.delimiters[delimiter];
        if let Some(p) = prev {
            self.delimiters[p].next = next;
        }
        if let Some(n) = next {
            self.delimiters[n].prev = prev;
        }
    }

    /// Only delimiters' slots get unlinked, and those are always at the top level.
    fn unlink_slot(&mut self, slot: usize) {
        let Slot { prev, next, .. } = self.slots[slot];
        match prev {
            Some(p) => self.slots[p].next = next,
            None => self.head = next,
        }
        if let Some(n) = next {
            self.slots[n].prev = prev;
        }
    }

    /// Writes the lists back into the tree, with any markers that are left over as plain text.
    fn finish(self, parent: NodeId) {
        let mut pending = vec![(parent, self.head)];
        while let Some((node, first)) = pending.pop() {
            let mut children = Vec::new();
            let mut current = first;
            while let Some(i) = current {
                let slot = &self.slots[i];
                demote(self.doc, slot.node);
                if slot.inner.is_some() {
                    pending.push((slot.node, slot.inner));
                }
                children.push(slot.node);
                current = slot.next;
            }
            self.doc.set_children(node, children);
        }
    }
}

fn can_pair(opener: &EmphasisMarker, closer: &EmphasisMarker) -> bool {
    if !opener.can_open || opener.marker != closer.marker || opener.curr_length == 0 {
        return false;
    }
    // the "rule of 3"
    let either_interior = opener.interior || closer.interior;
    let both_multiples_of_3 = opener.orig_length % 3 == 0 && closer.orig_length % 3 == 0;
    !(either_interior && (opener.orig_length + closer.orig_length) % 3 == 0 && !both_multiples_of_3)
}

/// Turns an emphasis marker into its remaining chars as text, in place. Other nodes are left alone.
fn demote(doc: &mut Document, id: NodeId) {
    let Some(text) = emphasis_marker(doc, id).map(EmphasisMarker::text) else {
        return;
    };
    *doc.kind_mut(id) = NodeKind::text(text);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::utils_for_test::*;

    /// Renders a paragraph's inlines compactly, as `em(...)` and `strong(...)` around plain text.
    fn render(text: &str) -> String {
        let (doc, _) = parse_for_test(text);
        let para = get_only(doc.children(doc.root()));
        let mut out = String::new();
        render_children(&doc, *para, &mut out);
        out
    }

    fn render_children(doc: &Document, id: NodeId, out: &mut String) {
        for &child in doc.children(id) {
            let wrapper = match doc.kind(child) {
                NodeKind::Emphasis => "em",
                NodeKind::Strong => "strong",
                _ => {
                    out.push_str(&doc.to_text(child));
                    continue;
                }
            };
            out.push_str(wrapper);
            out.push('(');
            render_children(doc, child, out);
            out.push(')');
        }
    }

    #[test]
    fn simple() {
        assert_eq!(render("*a* _b_ **c** __d__"), "em(a) em(b) strong(c) strong(d)");
    }

    #[test]
    fn nested() {
        assert_eq!(render("*a **b** c*"), "em(a strong(b) c)");
        assert_eq!(render("***a***"), "em(strong(a))");
    }

    #[test]
    fn unbalanced() {
        assert_eq!(render("**a*"), "*em(a)");
        assert_eq!(render("*a**"), "em(a)*");
    }

    #[test]
    fn intraword() {
        assert_eq!(render("snake_case_name"), "snake_case_name");
        assert_eq!(render("a*b*c"), "aem(b)c");
    }

    #[test]
    fn rule_of_three() {
        assert_eq!(render("*foo**bar**baz*"), "em(foostrong(bar)baz)");
        assert_eq!(render("*foo**bar*"), "em(foo**bar)");
    }

    #[test]
    fn not_flanking() {
        assert_eq!(render("a * b *"), "a * b *");
    }

    #[test]
    fn no_markers_remain() {
        let (doc, _) = parse_for_test("*a [b* c](/u) _d");
        let root = doc.root();
        assert!(doc.descendants(root).iter().all(|&id| !doc.kind(id).is_transient()));
    }
}
