use crate::doc::{Document, NodeId};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

/// A serde view of a document (or of any subtree of one).
///
/// Each node becomes an object with its `type` (the [tag name](crate::doc::NodeKind::tag_name)), its attributes, its
/// `line` if known, and its `children` if it has any:
///
/// ```json
/// {"type": "section", "depth": 1, "children": [{"type": "title", "line": 1, "children": [...]}]}
/// ```
///
/// Text nodes are `{"type": "text", "value": "..."}`.
pub struct SerializableDoc<'a> {
    doc: &'a Document,
    node: NodeId,
}

impl<'a> SerializableDoc<'a> {
    pub fn new(doc: &'a Document) -> Self {
        Self::subtree(doc, doc.root())
    }

    pub fn subtree(doc: &'a Document, node: NodeId) -> Self {
        Self { doc, node }
    }
}

impl Serialize for SerializableDoc<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let kind = self.doc.kind(self.node);
        let children = self.doc.children(self.node);
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("type", kind.tag_name())?;
        if self.node == self.doc.root() {
            map.serialize_entry("source", self.doc.source())?;
        }
        for name in kind.attribute_names() {
            if let Some(value) = kind.attribute(name) {
                map.serialize_entry(name, &value)?;
            }
        }
        if let Some(line) = self.doc.line(self.node) {
            map.serialize_entry("line", &line)?;
        }
        if !children.is_empty() {
            let children: Vec<_> = children.iter().map(|&c| SerializableDoc::subtree(self.doc, c)).collect();
            map.serialize_entry("children", &children)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::utils_for_test::*;
    use serde_json::json;

    #[test]
    fn heading_and_list() {
        let (doc, _) = parse_for_test("# Hi\n\n- a\n");
        let actual = serde_json::to_value(SerializableDoc::new(&doc)).unwrap();
        assert_eq!(
            actual,
            json!({
                "type": "document",
                "source": "<string>",
                "children": [
                    {
                        "type": "section",
                        "depth": 1,
                        "line": 1,
                        "children": [
                            {"type": "title", "line": 1, "children": [{"type": "text", "value": "Hi"}]},
                            {
                                "type": "bullet_list",
                                "bullet": "-",
                                "tight": true,
                                "line": 3,
                                "children": [
                                    {"type": "list_item", "line": 3, "children": [{"type": "text", "value": "a"}]},
                                ],
                            },
                        ],
                    },
                ],
            })
        );
    }
}
