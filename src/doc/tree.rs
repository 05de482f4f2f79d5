use serde::Serialize;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt::{Display, Formatter};

/// A handle to a node within a [`Document`].
///
/// Ids are only meaningful for the document that created them. A node that has been [removed](Document::remove) keeps
/// its id (and its subtree), but is no longer reachable from the root.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// The type of a node, along with its typed attributes.
///
/// Most kinds are permanent parts of the finished tree. [`NodeKind::BlankLine`], [`NodeKind::EmphasisMarker`] and
/// [`NodeKind::BracketMarker`] are scaffolding: they only exist while parsing, and a finished [`Document`] never
/// contains them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeKind {
    /// The root.
    Document,

    /// A heading and (after section construction) the blocks it governs. The first child is always a [`Self::Title`].
    Section {
        depth: u8,
    },
    /// The text of a heading.
    Title,
    Paragraph,
    BlockQuote,
    BulletList {
        bullet: char,
        /// `None` until the tight-list detection has run.
        tight: Option<bool>,
    },
    EnumeratedList {
        start: u32,
        /// The delimiter after the number: `.` or `)`.
        suffix: char,
        tight: Option<bool>,
    },
    ListItem,
    /// A fenced or indented code block.
    ///
    /// ````markdown
    /// ```rust
    /// fn main() {}
    /// ```
    /// ````
    LiteralBlock {
        language: Option<String>,
        value: String,
    },
    HtmlBlock {
        value: String,
    },
    /// A thematic break (`***`, `---` or `___`).
    Transition,
    /// A link reference definition:
    ///
    /// ```markdown
    /// [label]: /destination "title"
    /// ```
    ///
    /// `name` keeps the label as written (minus surrounding and repeated whitespace).
    Target {
        name: String,
        refuri: String,
        title: Option<String>,
    },

    /// A link; its children are the link text.
    Reference {
        refuri: String,
        title: Option<String>,
    },
    /// An image. Images have no children; the description is flattened into `alt`.
    Image {
        uri: String,
        alt: String,
        title: Option<String>,
    },
    Emphasis,
    Strong,
    /// A code span.
    Literal {
        value: String,
    },
    InlineHtml {
        value: String,
    },
    Text {
        value: String,
    },
    /// A hard line break.
    LineBreak,

    /// A blank line, kept until lists have been classified as tight or loose.
    BlankLine,
    /// A run of `*` or `_` that may become (part of) an emphasis.
    EmphasisMarker(EmphasisMarker),
    /// A `[`, `![` or `]` that may become part of a link or image.
    BracketMarker(BracketMarker),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EmphasisMarker {
    pub marker: char,
    pub orig_length: usize,
    /// How many marker chars are left. Never more than `orig_length`.
    pub curr_length: usize,
    pub can_open: bool,
    pub can_close: bool,
    /// Whether the run is both left- and right-flanking.
    pub interior: bool,
}

impl EmphasisMarker {
    /// The marker chars that have not been consumed yet.
    pub fn text(&self) -> String {
        std::iter::repeat(self.marker).take(self.curr_length).collect()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Bracket {
    Open,
    ImageOpen,
    Close,
}

impl Bracket {
    pub fn as_str(self) -> &'static str {
        match self {
            Bracket::Open => "[",
            Bracket::ImageOpen => "![",
            Bracket::Close => "]",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BracketMarker {
    pub bracket: Bracket,
    /// Openers get deactivated once a link closes after them, since links can't nest.
    pub active: bool,
    /// Byte offset into the inline text: just after an opener, or at a closer.
    pub position: usize,
}

impl BracketMarker {
    pub fn can_open(&self) -> bool {
        !matches!(self.bracket, Bracket::Close)
    }
}

/// A scalar attribute value, as exposed by [`NodeKind::attribute`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum AttrValue {
    Bool(bool),
    Int(u64),
    Str(String),
}

impl AttrValue {
    fn as_bool(&self) -> Option<bool> {
        match self {
            AttrValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    fn as_int(&self) -> Option<u64> {
        match self {
            AttrValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    fn as_char(&self) -> Option<char> {
        let AttrValue::Str(s) = self else {
            return None;
        };
        let mut chars = s.chars();
        match (chars.next(), chars.next()) {
            (Some(ch), None) => Some(ch),
            _ => None,
        }
    }

    fn into_string(self) -> Option<String> {
        match self {
            AttrValue::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl Display for AttrValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            AttrValue::Bool(b) => write!(f, "{b}"),
            AttrValue::Int(i) => write!(f, "{i}"),
            AttrValue::Str(s) => f.write_str(s),
        }
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        AttrValue::Str(value.to_string())
    }
}

impl From<bool> for AttrValue {
    fn from(value: bool) -> Self {
        AttrValue::Bool(value)
    }
}

impl From<u64> for AttrValue {
    fn from(value: u64) -> Self {
        AttrValue::Int(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AttributeError {
    #[error("<{tag}> has no attribute {name:?}")]
    Unknown { tag: &'static str, name: String },
    #[error("invalid value for {name:?}: expected {expected}")]
    InvalidValue { name: String, expected: &'static str },
}

impl NodeKind {
    pub fn text(value: impl Into<String>) -> Self {
        NodeKind::Text { value: value.into() }
    }

    pub fn tag_name(&self) -> &'static str {
        match self {
            NodeKind::Document => "document",
            NodeKind::Section { .. } => "section",
            NodeKind::Title => "title",
            NodeKind::Paragraph => "paragraph",
            NodeKind::BlockQuote => "block_quote",
            NodeKind::BulletList { .. } => "bullet_list",
            NodeKind::EnumeratedList { .. } => "enumerated_list",
            NodeKind::ListItem => "list_item",
            NodeKind::LiteralBlock { .. } => "literal_block",
            NodeKind::HtmlBlock { .. } => "html_block",
            NodeKind::Transition => "transition",
            NodeKind::Target { .. } => "target",
            NodeKind::Reference { .. } => "reference",
            NodeKind::Image { .. } => "image",
            NodeKind::Emphasis => "emphasis",
            NodeKind::Strong => "strong",
            NodeKind::Literal { .. } => "literal",
            NodeKind::InlineHtml { .. } => "inline_html",
            NodeKind::Text { .. } => "text",
            NodeKind::LineBreak => "line_break",
            NodeKind::BlankLine => "blank_line",
            NodeKind::EmphasisMarker(_) => "emphasis_marker",
            NodeKind::BracketMarker(_) => "bracket_marker",
        }
    }

    /// The names of this kind's attributes, in display order.
    pub fn attribute_names(&self) -> &'static [&'static str] {
        match self {
            NodeKind::Section { .. } => &["depth"],
            NodeKind::BulletList { .. } => &["bullet", "tight"],
            NodeKind::EnumeratedList { .. } => &["start", "suffix", "tight"],
            NodeKind::LiteralBlock { .. } => &["language", "value"],
            NodeKind::Target { .. } => &["name", "refuri", "title"],
            NodeKind::Reference { .. } => &["refuri", "title"],
            NodeKind::Image { .. } => &["uri", "alt", "title"],
            NodeKind::HtmlBlock { .. }
            | NodeKind::Literal { .. }
            | NodeKind::InlineHtml { .. }
            | NodeKind::Text { .. } => &["value"],
            NodeKind::EmphasisMarker(_) => &[
                "marker",
                "orig_length",
                "curr_length",
                "can_open",
                "can_close",
                "interior",
            ],
            NodeKind::BracketMarker(_) => &["marker", "can_open", "active", "position"],
            _ => &[],
        }
    }

    /// Gets an attribute by name. Returns `None` for unknown names and for optional attributes that aren't set.
    pub fn attribute(&self, name: &str) -> Option<AttrValue> {
        let str_value = |s: &str| Some(AttrValue::Str(s.to_string()));
        let opt_str_value = |s: &Option<String>| s.as_deref().map(AttrValue::from);
        match (self, name) {
            (NodeKind::Section { depth }, "depth") => Some(AttrValue::Int(u64::from(*depth))),
            (NodeKind::BulletList { bullet, .. }, "bullet") => Some(AttrValue::Str(bullet.to_string())),
            (NodeKind::BulletList { tight, .. } | NodeKind::EnumeratedList { tight, .. }, "tight") => {
                tight.map(AttrValue::Bool)
            }
            (NodeKind::EnumeratedList { start, .. }, "start") => Some(AttrValue::Int(u64::from(*start))),
            (NodeKind::EnumeratedList { suffix, .. }, "suffix") => Some(AttrValue::Str(suffix.to_string())),
            (NodeKind::LiteralBlock { language, .. }, "language") => opt_str_value(language),
            (
                NodeKind::LiteralBlock { value, .. }
                | NodeKind::HtmlBlock { value }
                | NodeKind::Literal { value }
                | NodeKind::InlineHtml { value }
                | NodeKind::Text { value },
                "value",
            ) => str_value(value),
            (NodeKind::Target { name, .. }, "name") => str_value(name),
            (NodeKind::Target { refuri, .. } | NodeKind::Reference { refuri, .. }, "refuri") => str_value(refuri),
            (
                NodeKind::Target { title, .. } | NodeKind::Reference { title, .. } | NodeKind::Image { title, .. },
                "title",
            ) => opt_str_value(title),
            (NodeKind::Image { uri, .. }, "uri") => str_value(uri),
            (NodeKind::Image { alt, .. }, "alt") => str_value(alt),
            (NodeKind::EmphasisMarker(m), _) => match name {
                "marker" => Some(AttrValue::Str(m.marker.to_string())),
                "orig_length" => Some(AttrValue::Int(m.orig_length as u64)),
                "curr_length" => Some(AttrValue::Int(m.curr_length as u64)),
                "can_open" => Some(AttrValue::Bool(m.can_open)),
                "can_close" => Some(AttrValue::Bool(m.can_close)),
                "interior" => Some(AttrValue::Bool(m.interior)),
                _ => None,
            },
            (NodeKind::BracketMarker(b), _) => match name {
                "marker" => str_value(b.bracket.as_str()),
                "can_open" => Some(AttrValue::Bool(b.can_open())),
                "active" => Some(AttrValue::Bool(b.active)),
                "position" => Some(AttrValue::Int(b.position as u64)),
                _ => None,
            },
            _ => None,
        }
    }

    /// Sets an attribute by name.
    ///
    /// Only the attributes of the finished tree can be set; the markers' bookkeeping is read-only from here.
    pub fn set_attribute(&mut self, name: &str, value: AttrValue) -> Result<(), AttributeError> {
        let tag = self.tag_name();
        let invalid = |expected: &'static str| AttributeError::InvalidValue {
            name: name.to_string(),
            expected,
        };
        match (&mut *self, name) {
            (NodeKind::Section { depth }, "depth") => {
                *depth = value
                    .as_int()
                    .and_then(|d| u8::try_from(d).ok())
                    .filter(|d| (1..=6).contains(d))
                    .ok_or_else(|| invalid("an integer from 1 to 6"))?;
            }
            (NodeKind::BulletList { bullet, .. }, "bullet") => {
                *bullet = value
                    .as_char()
                    .filter(|c| matches!(c, '-' | '+' | '*'))
                    .ok_or_else(|| invalid("one of '-', '+' or '*'"))?;
            }
            (NodeKind::BulletList { tight, .. } | NodeKind::EnumeratedList { tight, .. }, "tight") => {
                *tight = Some(value.as_bool().ok_or_else(|| invalid("a bool"))?);
            }
            (NodeKind::EnumeratedList { start, .. }, "start") => {
                *start = value
                    .as_int()
                    .and_then(|s| u32::try_from(s).ok())
                    .ok_or_else(|| invalid("an integer"))?;
            }
            (NodeKind::EnumeratedList { suffix, .. }, "suffix") => {
                *suffix = value
                    .as_char()
                    .filter(|c| matches!(c, '.' | ')'))
                    .ok_or_else(|| invalid("'.' or ')'"))?;
            }
            (NodeKind::LiteralBlock { language, .. }, "language") => {
                *language = Some(value.into_string().ok_or_else(|| invalid("a string"))?);
            }
            (
                NodeKind::LiteralBlock { value: field, .. }
                | NodeKind::HtmlBlock { value: field }
                | NodeKind::Literal { value: field }
                | NodeKind::InlineHtml { value: field }
                | NodeKind::Text { value: field },
                "value",
            )
            | (NodeKind::Target { name: field, .. }, "name")
            | (NodeKind::Target { refuri: field, .. } | NodeKind::Reference { refuri: field, .. }, "refuri")
            | (NodeKind::Image { uri: field, .. }, "uri")
            | (NodeKind::Image { alt: field, .. }, "alt") => {
                *field = value.into_string().ok_or_else(|| invalid("a string"))?;
            }
            (
                NodeKind::Target { title, .. } | NodeKind::Reference { title, .. } | NodeKind::Image { title, .. },
                "title",
            ) => {
                *title = Some(value.into_string().ok_or_else(|| invalid("a string"))?);
            }
            _ => {
                return Err(AttributeError::Unknown {
                    tag,
                    name: name.to_string(),
                })
            }
        }
        Ok(())
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            NodeKind::Text { value } => Some(value),
            _ => None,
        }
    }

    pub fn is_list(&self) -> bool {
        matches!(self, NodeKind::BulletList { .. } | NodeKind::EnumeratedList { .. })
    }

    /// Whether this is one of the kinds that only exist while parsing.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            NodeKind::BlankLine | NodeKind::EmphasisMarker(_) | NodeKind::BracketMarker(_)
        )
    }
}

#[derive(Clone, Debug, PartialEq)]
struct Node {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    line: Option<usize>,
}

/// A parsed document: an arena of [nodes](NodeKind), rooted at a single [`NodeKind::Document`].
///
/// Every node owns its (ordered) children, and knows its parent. All of the mutating operations keep both sides of
/// that relationship in sync: for example, [`Self::append`] detaches the node from wherever it was before.
///
/// The document also holds the registry of link reference definitions, keyed by normalized label.
#[derive(Clone, Debug, PartialEq)]
pub struct Document {
    source: String,
    nodes: Vec<Node>,
    targets: HashMap<String, NodeId>,
}

impl Document {
    pub fn new(source: impl Into<String>) -> Self {
        let root = Node {
            kind: NodeKind::Document,
            parent: None,
            children: Vec::new(),
            line: None,
        };
        Self {
            source: source.into(),
            nodes: vec![root],
            targets: HashMap::new(),
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// The source identifier (usually a file name) this document was parsed from.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Creates a detached node.
    pub fn create(&mut self, kind: NodeKind) -> NodeId {
        self.nodes.push(Node {
            kind,
            parent: None,
            children: Vec::new(),
            line: None,
        });
        NodeId(self.nodes.len() - 1)
    }

    /// Creates a detached node that starts at the given (1-origin) source line.
    pub fn create_at(&mut self, kind: NodeKind, line: usize) -> NodeId {
        let id = self.create(kind);
        self.nodes[id.0].line = Some(line);
        id
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.0].kind
    }

    pub fn kind_mut(&mut self, id: NodeId) -> &mut NodeKind {
        &mut self.nodes[id.0].kind
    }

    pub fn line(&self, id: NodeId) -> Option<usize> {
        self.nodes[id.0].line
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].children.last().copied()
    }

    pub fn attribute(&self, id: NodeId, name: &str) -> Option<AttrValue> {
        self.kind(id).attribute(name)
    }

    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: AttrValue) -> Result<(), AttributeError> {
        self.kind_mut(id).set_attribute(name, value)
    }

    /// The position of `id` within its parent's children.
    ///
    /// This scans from the end, since that's where inline parsing does its work.
    pub fn index_of(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().rposition(|&c| c == id)
    }

    /// Moves `child` to the end of `parent`'s children.
    pub fn append(&mut self, parent: NodeId, child: NodeId) {
        self.remove(child);
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
    }

    /// Moves `child` to `index` within `parent`'s children. The index is interpreted after `child` has been detached
    /// from its previous position.
    pub fn insert(&mut self, parent: NodeId, index: usize, child: NodeId) {
        self.remove(child);
        self.nodes[child.0].parent = Some(parent);
        let children = &mut self.nodes[parent.0].children;
        let index = index.min(children.len());
        children.insert(index, child);
    }

    /// Moves `node` to just before `sibling`. Does nothing if `sibling` is detached.
    pub fn insert_before(&mut self, sibling: NodeId, node: NodeId) {
        self.remove(node);
        if let (Some(parent), Some(index)) = (self.parent(sibling), self.index_of(sibling)) {
            self.insert(parent, index, node);
        }
    }

    /// Moves `node` to just after `sibling`. Does nothing if `sibling` is detached.
    pub fn insert_after(&mut self, sibling: NodeId, node: NodeId) {
        self.remove(node);
        if let (Some(parent), Some(index)) = (self.parent(sibling), self.index_of(sibling)) {
            self.insert(parent, index + 1, node);
        }
    }

    /// Detaches `node` (and its subtree) from its parent.
    pub fn remove(&mut self, node: NodeId) {
        let Some(parent) = self.nodes[node.0].parent.take() else {
            return;
        };
        self.nodes[parent.0].children.retain(|&c| c != node);
    }

    /// Puts `new` where `old` was, and detaches `old`.
    pub fn replace(&mut self, old: NodeId, new: NodeId) {
        if old == new {
            return;
        }
        self.insert_before(old, new);
        self.remove(old);
    }

    /// Moves the siblings strictly between `start` and `end` into `node`, puts `node` where `start` was, and detaches
    /// `start` and `end`.
    ///
    /// `start` and `end` must share a parent, with `start` first; otherwise, nothing changes. Only the siblings from
    /// `start` on get touched, so this is cheap near the end of a long list of children.
    pub fn enclose(&mut self, start: NodeId, end: NodeId, node: NodeId) {
        if node == start || node == end {
            return;
        }
        self.remove(node);
        let Some(parent) = self.parent(start) else {
            return;
        };
        if self.parent(end) != Some(parent) {
            return;
        }
        let (Some(start_idx), Some(end_idx)) = (self.index_of(start), self.index_of(end)) else {
            return;
        };
        if end_idx <= start_idx {
            return;
        }

        let siblings = &mut self.nodes[parent.0].children;
        let mut moving: Vec<NodeId> = siblings.drain(start_idx + 1..=end_idx).collect();
        moving.pop();
        siblings[start_idx] = node;

        self.nodes[start.0].parent = None;
        self.nodes[end.0].parent = None;
        self.nodes[node.0].parent = Some(parent);
        for &child in &moving {
            self.nodes[child.0].parent = Some(node);
        }
        self.nodes[node.0].children.extend(moving);
    }

    /// Detaches the children of `parent` that `keep` rejects, in a single pass.
    pub fn retain_children(&mut self, parent: NodeId, mut keep: impl FnMut(NodeId, &NodeKind) -> bool) {
        let mut children = std::mem::take(&mut self.nodes[parent.0].children);
        children.retain(|&child| {
            let kept = keep(child, &self.nodes[child.0].kind);
            if !kept {
                self.nodes[child.0].parent = None;
            }
            kept
        });
        self.nodes[parent.0].children = children;
    }

    /// Replaces all of `parent`'s children at once. Each new child must be detached, or already a child of `parent`.
    pub(crate) fn set_children(&mut self, parent: NodeId, children: Vec<NodeId>) {
        for old in std::mem::take(&mut self.nodes[parent.0].children) {
            self.nodes[old.0].parent = None;
        }
        for &child in &children {
            self.nodes[child.0].parent = Some(parent);
        }
        self.nodes[parent.0].children = children;
    }

    /// A pre-order snapshot of `id` and everything under it.
    ///
    /// This is a snapshot, so it's safe to restructure the tree while walking it.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            result.push(next);
            stack.extend(self.children(next).iter().rev());
        }
        result
    }

    /// Flattens a subtree into its plain text.
    pub fn to_text(&self, id: NodeId) -> String {
        let mut text = String::new();
        self.write_text(id, &mut text);
        text
    }

    fn write_text(&self, id: NodeId, out: &mut String) {
        match self.kind(id) {
            NodeKind::Text { value }
            | NodeKind::Literal { value }
            | NodeKind::InlineHtml { value }
            | NodeKind::LiteralBlock { value, .. }
            | NodeKind::HtmlBlock { value } => out.push_str(value),
            NodeKind::Image { alt, .. } => out.push_str(alt),
            NodeKind::LineBreak => out.push('\n'),
            NodeKind::EmphasisMarker(marker) => out.push_str(&marker.text()),
            NodeKind::BracketMarker(marker) => out.push_str(marker.bracket.as_str()),
            _ => {
                for &child in self.children(id) {
                    self.write_text(child, out);
                }
            }
        }
    }

    /// Appends text to `parent`, merging it into the last child if that's already a text node.
    pub fn append_text(&mut self, parent: NodeId, text: &str) {
        if text.is_empty() {
            return;
        }
        if let Some(last) = self.last_child(parent) {
            if let NodeKind::Text { value } = self.kind_mut(last) {
                value.push_str(text);
                return;
            }
        }
        let node = self.create(NodeKind::text(text));
        self.append(parent, node);
    }

    /// Registers a link target under its normalized label. The first registration wins: returns `false` (and changes
    /// nothing) if the key was already taken.
    pub fn register_target(&mut self, key: String, node: NodeId) -> bool {
        match self.targets.entry(key) {
            Entry::Occupied(_) => false,
            Entry::Vacant(entry) => {
                entry.insert(node);
                true
            }
        }
    }

    pub fn lookup_target(&self, key: &str) -> Option<NodeId> {
        self.targets.get(key).copied()
    }
}
