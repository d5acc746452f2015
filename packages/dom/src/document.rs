use crate::error::{DomError, DomResult};
use crate::node::{Attribute, Node, NodeData, NodeId};
use crate::style;
use serde::{Deserialize, Serialize};

/// Arena-backed document tree.
///
/// Node 0 is the document node; everything reachable from it is "connected".
/// Nodes are never freed: detaching keeps the slot so structural directives
/// can park an element and reinsert it later.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    nodes: Vec<Node>,
}

impl Document {
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::new(NodeData::Document)],
        }
    }

    /// The document node
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    fn get(&self, id: NodeId) -> DomResult<&Node> {
        self.nodes.get(id.index()).ok_or(DomError::NodeNotFound(id))
    }

    fn get_mut(&mut self, id: NodeId) -> DomResult<&mut Node> {
        self.nodes.get_mut(id.index()).ok_or(DomError::NodeNotFound(id))
    }

    fn push(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node::new(data));
        id
    }

    // ---------------------------------------------------------------------
    // Creation
    // ---------------------------------------------------------------------

    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.push(NodeData::element(tag))
    }

    pub fn create_text(&mut self, content: &str) -> NodeId {
        self.push(NodeData::text(content))
    }

    pub fn create_comment(&mut self, content: &str) -> NodeId {
        self.push(NodeData::comment(content))
    }

    /// Deep-clone `id` into a new detached subtree
    pub fn clone_subtree(&mut self, id: NodeId) -> DomResult<NodeId> {
        let data = self.get(id)?.data.clone();
        let children = self.get(id)?.children.clone();
        let copy = self.push(data);
        for child in children {
            let child_copy = self.clone_subtree(child)?;
            self.append_child(copy, child_copy)?;
        }
        Ok(copy)
    }

    // ---------------------------------------------------------------------
    // Tree navigation
    // ---------------------------------------------------------------------

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).and_then(|n| n.parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.children(id).first().copied()
    }

    fn sibling_index(&self, id: NodeId) -> Option<(NodeId, usize)> {
        let parent = self.parent(id)?;
        let index = self.children(parent).iter().position(|c| *c == id)?;
        Some((parent, index))
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let (parent, index) = self.sibling_index(id)?;
        self.children(parent).get(index + 1).copied()
    }

    pub fn previous_sibling(&self, id: NodeId) -> Option<NodeId> {
        let (parent, index) = self.sibling_index(id)?;
        index.checked_sub(1).and_then(|i| self.children(parent).get(i).copied())
    }

    /// Next sibling that is an element, skipping text and comments
    pub fn next_element_sibling(&self, id: NodeId) -> Option<NodeId> {
        let (parent, index) = self.sibling_index(id)?;
        self.children(parent)[index + 1..]
            .iter()
            .copied()
            .find(|c| self.is_element(*c))
    }

    /// Whether the node is reachable from the document node
    pub fn is_connected(&self, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(node) = current {
            if node == self.root() {
                return true;
            }
            current = self.parent(node);
        }
        false
    }

    /// Inclusive containment: a node contains itself
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(n) = current {
            if n == ancestor {
                return true;
            }
            current = self.parent(n);
        }
        false
    }

    /// Ancestors of `id`, nearest first, excluding `id`
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut current = self.parent(id);
        while let Some(n) = current {
            out.push(n);
            current = self.parent(n);
        }
        out
    }

    /// Preorder traversal including `id` itself
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(n) = stack.pop() {
            out.push(n);
            stack.extend(self.children(n).iter().rev().copied());
        }
        out
    }

    /// Event propagation path: target first, document node last
    pub fn event_path(&self, target: NodeId) -> Vec<NodeId> {
        let mut path = vec![target];
        path.extend(self.ancestors(target));
        path
    }

    // ---------------------------------------------------------------------
    // Mutation
    // ---------------------------------------------------------------------

    fn check_hierarchy(&self, parent: NodeId, child: NodeId) -> DomResult<()> {
        self.get(parent)?;
        self.get(child)?;
        if self.contains(child, parent) {
            return Err(DomError::HierarchyRequest { parent, child });
        }
        Ok(())
    }

    /// Detach `id` from its parent. Detached nodes keep their subtree.
    pub fn remove(&mut self, id: NodeId) {
        if let Some(parent) = self.parent(id) {
            if let Ok(node) = self.get_mut(parent) {
                node.children.retain(|c| *c != id);
            }
            if let Ok(node) = self.get_mut(id) {
                node.parent = None;
            }
        }
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> DomResult<()> {
        self.check_hierarchy(parent, child)?;
        self.remove(child);
        self.get_mut(parent)?.children.push(child);
        self.get_mut(child)?.parent = Some(parent);
        Ok(())
    }

    /// Insert `child` before `reference` (or at the end when `None`)
    pub fn insert_before(
        &mut self,
        parent: NodeId,
        child: NodeId,
        reference: Option<NodeId>,
    ) -> DomResult<()> {
        let Some(reference) = reference else {
            return self.append_child(parent, child);
        };
        if reference == child {
            return Ok(());
        }
        self.check_hierarchy(parent, child)?;
        if self.parent(reference) != Some(parent) {
            return Err(DomError::NotAChild {
                parent,
                child: reference,
            });
        }
        self.remove(child);
        let index = self
            .children(parent)
            .iter()
            .position(|c| *c == reference)
            .ok_or(DomError::NotAChild {
                parent,
                child: reference,
            })?;
        self.get_mut(parent)?.children.insert(index, child);
        self.get_mut(child)?.parent = Some(parent);
        Ok(())
    }

    /// Insert `child` immediately after `anchor`
    pub fn insert_after(&mut self, anchor: NodeId, child: NodeId) -> DomResult<()> {
        if anchor == child {
            return Ok(());
        }
        let parent = self.parent(anchor).ok_or(DomError::Detached(anchor))?;
        self.check_hierarchy(parent, child)?;
        self.remove(child);
        let index = self
            .children(parent)
            .iter()
            .position(|c| *c == anchor)
            .ok_or(DomError::NotAChild {
                parent,
                child: anchor,
            })?;
        self.get_mut(parent)?.children.insert(index + 1, child);
        self.get_mut(child)?.parent = Some(parent);
        Ok(())
    }

    /// Replace every child of `parent` with a single text node
    pub fn set_text_content(&mut self, parent: NodeId, content: &str) -> DomResult<()> {
        for child in self.children(parent).to_vec() {
            self.remove(child);
        }
        let text = self.create_text(content);
        self.append_child(parent, text)
    }

    // ---------------------------------------------------------------------
    // Node kinds and character data
    // ---------------------------------------------------------------------

    pub fn is_element(&self, id: NodeId) -> bool {
        matches!(self.node(id).map(|n| &n.data), Some(NodeData::Element { .. }))
    }

    pub fn is_text(&self, id: NodeId) -> bool {
        matches!(self.node(id).map(|n| &n.data), Some(NodeData::Text { .. }))
    }

    pub fn is_comment(&self, id: NodeId) -> bool {
        matches!(self.node(id).map(|n| &n.data), Some(NodeData::Comment { .. }))
    }

    pub fn tag_name(&self, id: NodeId) -> Option<&str> {
        match self.node(id).map(|n| &n.data) {
            Some(NodeData::Element { tag, .. }) => Some(tag.as_str()),
            _ => None,
        }
    }

    /// Content of a text or comment node
    pub fn text(&self, id: NodeId) -> Option<&str> {
        match self.node(id).map(|n| &n.data) {
            Some(NodeData::Text { content }) | Some(NodeData::Comment { content }) => {
                Some(content.as_str())
            }
            _ => None,
        }
    }

    /// Replace the content of a text or comment node
    pub fn set_text(&mut self, id: NodeId, new_content: &str) -> DomResult<()> {
        match &mut self.get_mut(id)?.data {
            NodeData::Text { content } | NodeData::Comment { content } => {
                new_content.clone_into(content);
                Ok(())
            }
            _ => Err(DomError::NotAnElement(id)),
        }
    }

    /// Concatenated text of all descendant text nodes
    pub fn text_content(&self, id: NodeId) -> String {
        self.descendants(id)
            .into_iter()
            .filter(|n| self.is_text(*n))
            .filter_map(|n| self.text(n))
            .collect()
    }

    // ---------------------------------------------------------------------
    // Attributes
    // ---------------------------------------------------------------------

    fn element_attributes(&self, id: NodeId) -> Option<&Vec<Attribute>> {
        match self.node(id).map(|n| &n.data) {
            Some(NodeData::Element { attributes, .. }) => Some(attributes),
            _ => None,
        }
    }

    fn element_attributes_mut(&mut self, id: NodeId) -> DomResult<&mut Vec<Attribute>> {
        match &mut self.get_mut(id)?.data {
            NodeData::Element { attributes, .. } => Ok(attributes),
            _ => Err(DomError::NotAnElement(id)),
        }
    }

    pub fn attributes(&self, id: NodeId) -> &[Attribute] {
        self.element_attributes(id).map(|a| a.as_slice()).unwrap_or(&[])
    }

    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element_attributes(id)?
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    pub fn has_attribute(&self, id: NodeId, name: &str) -> bool {
        self.attribute(id, name).is_some()
    }

    /// Set an attribute, keeping its position when it already exists
    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) -> DomResult<()> {
        let attributes = self.element_attributes_mut(id)?;
        match attributes.iter_mut().find(|a| a.name == name) {
            Some(existing) => value.clone_into(&mut existing.value),
            None => attributes.push(Attribute {
                name: name.to_string(),
                value: value.to_string(),
            }),
        }
        Ok(())
    }

    /// Remove an attribute, returning its previous value
    pub fn remove_attribute(&mut self, id: NodeId, name: &str) -> Option<String> {
        let attributes = self.element_attributes_mut(id).ok()?;
        let index = attributes.iter().position(|a| a.name == name)?;
        Some(attributes.remove(index).value)
    }

    /// Elements at or under `from` that carry `name`
    pub fn elements_with_attribute(&self, from: NodeId, name: &str) -> Vec<NodeId> {
        self.descendants(from)
            .into_iter()
            .filter(|n| self.has_attribute(*n, name))
            .collect()
    }

    /// First connected element whose `id` attribute equals `value`
    pub fn element_by_id(&self, value: &str) -> Option<NodeId> {
        self.descendants(self.root())
            .into_iter()
            .find(|n| self.attribute(*n, "id") == Some(value))
    }

    // ---------------------------------------------------------------------
    // Live form properties
    // ---------------------------------------------------------------------

    /// The `value` property: last value set through the property, else the attribute
    pub fn value(&self, id: NodeId) -> String {
        match self.node(id).map(|n| &n.data) {
            Some(NodeData::Element {
                value: Some(value), ..
            }) => value.clone(),
            _ => self.attribute(id, "value").unwrap_or_default().to_string(),
        }
    }

    pub fn set_value(&mut self, id: NodeId, new_value: &str) -> DomResult<()> {
        match &mut self.get_mut(id)?.data {
            NodeData::Element { value, .. } => {
                *value = Some(new_value.to_string());
                Ok(())
            }
            _ => Err(DomError::NotAnElement(id)),
        }
    }

    /// The `checked` property: last value set through the property, else the attribute
    pub fn checked(&self, id: NodeId) -> bool {
        match self.node(id).map(|n| &n.data) {
            Some(NodeData::Element {
                checked: Some(checked),
                ..
            }) => *checked,
            _ => self.has_attribute(id, "checked"),
        }
    }

    pub fn set_checked(&mut self, id: NodeId, new_checked: bool) -> DomResult<()> {
        match &mut self.get_mut(id)?.data {
            NodeData::Element { checked, .. } => {
                *checked = Some(new_checked);
                Ok(())
            }
            _ => Err(DomError::NotAnElement(id)),
        }
    }

    // ---------------------------------------------------------------------
    // Inline style
    // ---------------------------------------------------------------------

    pub fn style_property(&self, id: NodeId, property: &str) -> Option<String> {
        let css = self.attribute(id, "style")?;
        style::parse_declarations(css)
            .into_iter()
            .find(|(name, _)| name == property)
            .map(|(_, value)| value)
    }

    pub fn set_style_property(&mut self, id: NodeId, property: &str, value: &str) -> DomResult<()> {
        let mut declarations = self
            .attribute(id, "style")
            .map(style::parse_declarations)
            .unwrap_or_default();
        match declarations.iter_mut().find(|(name, _)| name == property) {
            Some(existing) => value.clone_into(&mut existing.1),
            None => declarations.push((property.to_string(), value.to_string())),
        }
        self.set_attribute(id, "style", &style::serialize_declarations(&declarations))
    }

    /// Remove one declaration; drops the attribute when nothing is left
    pub fn remove_style_property(&mut self, id: NodeId, property: &str) -> DomResult<()> {
        let Some(css) = self.attribute(id, "style") else {
            return Ok(());
        };
        let mut declarations = style::parse_declarations(css);
        let before = declarations.len();
        declarations.retain(|(name, _)| name != property);
        if declarations.len() == before {
            return Ok(());
        }
        if declarations.is_empty() {
            self.remove_attribute(id, "style");
            Ok(())
        } else {
            self.set_attribute(id, "style", &style::serialize_declarations(&declarations))
        }
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}
