use serde::{Deserialize, Serialize};

/// Handle to a node in a [`crate::Document`] arena.
///
/// Ids stay valid for the lifetime of the document; removing a node only
/// detaches it, so a removed node can be reinserted later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Element attribute, kept in source order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

/// Node payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum NodeData {
    /// The document itself, always node 0
    Document,

    /// HTML element
    Element {
        tag: String,
        attributes: Vec<Attribute>,
        /// Live `value` property; `None` reflects the attribute
        #[serde(skip_serializing_if = "Option::is_none")]
        value: Option<String>,
        /// Live `checked` property; `None` reflects the attribute
        #[serde(skip_serializing_if = "Option::is_none")]
        checked: Option<bool>,
    },

    /// Text node
    Text { content: String },

    /// Comment node
    Comment { content: String },
}

impl NodeData {
    pub fn element(tag: impl Into<String>) -> Self {
        NodeData::Element {
            tag: tag.into().to_ascii_lowercase(),
            attributes: Vec::new(),
            value: None,
            checked: None,
        }
    }

    pub fn text(content: impl Into<String>) -> Self {
        NodeData::Text {
            content: content.into(),
        }
    }

    pub fn comment(content: impl Into<String>) -> Self {
        NodeData::Comment {
            content: content.into(),
        }
    }
}

/// Arena slot: payload plus tree links
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub data: NodeData,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
}

impl Node {
    pub(crate) fn new(data: NodeData) -> Self {
        Self {
            data,
            parent: None,
            children: Vec::new(),
        }
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

/// Elements that never have children or a closing tag
pub fn is_void_element(tag: &str) -> bool {
    matches!(
        tag,
        "area" | "base" | "br" | "col" | "embed" | "hr" | "img" | "input" | "link" | "meta" | "source"
            | "track" | "wbr"
    )
}

/// Elements whose content is raw text rather than markup
pub fn is_raw_text_element(tag: &str) -> bool {
    matches!(tag, "script" | "style")
}
