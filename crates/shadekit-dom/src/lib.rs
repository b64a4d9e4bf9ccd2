//! # ShadeKit DOM
//!
//! Host document model for the ShadeKit theme engine: a node tree with
//! attributes and inline styles, discovery of style-bearing nodes, and
//! mutation records delivered over a channel.
//!
//! ## Design Goals
//!
//! 1. **Engine-facing**: Models exactly what the theme engine observes and edits
//! 2. **Observable**: Every structural or attribute change yields a mutation record
//! 3. **Arena storage**: Nodes live in one map, addressed by stable IDs
//! 4. **Selector-lite**: Just enough matching for fix-rule selectors

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use thiserror::Error;
use tokio::sync::mpsc;
use tracing::trace;

/// Errors that can occur in document operations.
#[derive(Error, Debug)]
pub enum DomError {
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),
}

/// Unique identifier for a document node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl NodeId {
    fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "node-{}", self.0)
    }
}

/// The payload of a node.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeData {
    Element {
        tag: String,
        attributes: HashMap<String, String>,
    },
    Text(String),
}

/// One node in the tree.
#[derive(Debug, Clone)]
pub struct Node {
    pub id: NodeId,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub data: NodeData,
}

/// A change to the document, reported to the observer channel.
#[derive(Debug, Clone, PartialEq)]
pub enum MutationRecord {
    /// A node was attached to the tree.
    NodeAdded { node: NodeId },
    /// A node (and its subtree) was detached.
    NodeRemoved { node: NodeId },
    /// An element attribute was set or removed.
    AttributeChanged { node: NodeId, name: String },
    /// The text content under an element changed.
    TextChanged { node: NodeId },
}

impl MutationRecord {
    /// The node the record is about.
    pub fn node(&self) -> NodeId {
        match self {
            MutationRecord::NodeAdded { node }
            | MutationRecord::NodeRemoved { node }
            | MutationRecord::AttributeChanged { node, .. }
            | MutationRecord::TextChanged { node } => *node,
        }
    }
}

/// The document: an arena of nodes under a fixed root element.
///
/// Mutating operations emit a [`MutationRecord`] on the observer channel.
/// Records for detached nodes are not emitted; attaching a built subtree
/// emits one record for the attachment point.
pub struct Document {
    nodes: HashMap<NodeId, Node>,
    root: NodeId,
    mutations_tx: mpsc::UnboundedSender<MutationRecord>,
    mutations_rx: Option<mpsc::UnboundedReceiver<MutationRecord>>,
}

impl Document {
    /// Create a document containing only a root `html` element.
    pub fn new() -> Self {
        let (mutations_tx, mutations_rx) = mpsc::unbounded_channel();
        let root_node = Node {
            id: NodeId::new(),
            parent: None,
            children: Vec::new(),
            data: NodeData::Element {
                tag: "html".to_string(),
                attributes: HashMap::new(),
            },
        };
        let root = root_node.id;
        let mut nodes = HashMap::new();
        nodes.insert(root, root_node);
        Self {
            nodes,
            root,
            mutations_tx,
            mutations_rx: Some(mutations_rx),
        }
    }

    /// Take the mutation receiver. Can only be called once.
    pub fn take_mutation_receiver(&mut self) -> Option<mpsc::UnboundedReceiver<MutationRecord>> {
        self.mutations_rx.take()
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Create a detached element node.
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        let node = Node {
            id: NodeId::new(),
            parent: None,
            children: Vec::new(),
            data: NodeData::Element {
                tag: tag.to_ascii_lowercase(),
                attributes: HashMap::new(),
            },
        };
        let id = node.id;
        self.nodes.insert(id, node);
        id
    }

    /// Create a detached text node.
    pub fn create_text(&mut self, text: &str) -> NodeId {
        let node = Node {
            id: NodeId::new(),
            parent: None,
            children: Vec::new(),
            data: NodeData::Text(text.to_string()),
        };
        let id = node.id;
        self.nodes.insert(id, node);
        id
    }

    /// Attach a detached node under `parent`.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        if !self.nodes.contains_key(&parent) {
            return Err(DomError::NodeNotFound(parent));
        }
        let child_node = self
            .nodes
            .get_mut(&child)
            .ok_or(DomError::NodeNotFound(child))?;
        if child_node.parent.is_some() {
            return Err(DomError::InvalidOperation(format!(
                "{child} is already attached"
            )));
        }
        child_node.parent = Some(parent);
        if let Some(parent_node) = self.nodes.get_mut(&parent) {
            parent_node.children.push(child);
        }
        trace!(%parent, %child, "Node attached");
        self.record(MutationRecord::NodeAdded { node: child });
        Ok(())
    }

    /// Detach `id` and drop its whole subtree from the arena.
    pub fn remove_node(&mut self, id: NodeId) -> Result<(), DomError> {
        if id == self.root {
            return Err(DomError::InvalidOperation(
                "cannot remove the root".to_string(),
            ));
        }
        let parent = self
            .nodes
            .get(&id)
            .ok_or(DomError::NodeNotFound(id))?
            .parent;
        if let Some(parent) = parent {
            if let Some(parent_node) = self.nodes.get_mut(&parent) {
                parent_node.children.retain(|c| *c != id);
            }
        }
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let Some(node) = self.nodes.remove(&current) {
                stack.extend(node.children);
            }
        }
        trace!(node = %id, "Node removed");
        self.record(MutationRecord::NodeRemoved { node: id });
        Ok(())
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    /// The element's tag name, `None` for text nodes.
    pub fn tag(&self, id: NodeId) -> Option<&str> {
        match &self.nodes.get(&id)?.data {
            NodeData::Element { tag, .. } => Some(tag),
            NodeData::Text(_) => None,
        }
    }

    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        match &self.nodes.get(&id)?.data {
            NodeData::Element { attributes, .. } => attributes.get(name).map(String::as_str),
            NodeData::Text(_) => None,
        }
    }

    /// Set an element attribute, emitting a mutation when attached.
    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) -> Result<(), DomError> {
        let node = self.nodes.get_mut(&id).ok_or(DomError::NodeNotFound(id))?;
        let attached = node.parent.is_some() || id == self.root;
        match &mut node.data {
            NodeData::Element { attributes, .. } => {
                attributes.insert(name.to_string(), value.to_string());
            }
            NodeData::Text(_) => {
                return Err(DomError::InvalidOperation(format!(
                    "{id} is a text node"
                )));
            }
        }
        if attached {
            self.record(MutationRecord::AttributeChanged {
                node: id,
                name: name.to_string(),
            });
        }
        Ok(())
    }

    pub fn remove_attribute(&mut self, id: NodeId, name: &str) -> Result<(), DomError> {
        let node = self.nodes.get_mut(&id).ok_or(DomError::NodeNotFound(id))?;
        let attached = node.parent.is_some() || id == self.root;
        let removed = match &mut node.data {
            NodeData::Element { attributes, .. } => attributes.remove(name).is_some(),
            NodeData::Text(_) => false,
        };
        if removed && attached {
            self.record(MutationRecord::AttributeChanged {
                node: id,
                name: name.to_string(),
            });
        }
        Ok(())
    }

    /// The element's `style` attribute value.
    pub fn inline_style(&self, id: NodeId) -> Option<&str> {
        self.attribute(id, "style")
    }

    pub fn set_inline_style(&mut self, id: NodeId, style: &str) -> Result<(), DomError> {
        self.set_attribute(id, "style", style)
    }

    /// Concatenated text of the direct text children of `id`.
    pub fn element_text(&self, id: NodeId) -> String {
        let Some(node) = self.nodes.get(&id) else {
            return String::new();
        };
        let mut out = String::new();
        for child in &node.children {
            if let Some(NodeData::Text(text)) = self.nodes.get(child).map(|n| &n.data) {
                out.push_str(text);
            }
        }
        out
    }

    /// Replace the children of `id` with a single text node.
    pub fn set_element_text(&mut self, id: NodeId, text: &str) -> Result<(), DomError> {
        let node = self.nodes.get(&id).ok_or(DomError::NodeNotFound(id))?;
        let old_children = node.children.clone();
        for child in old_children {
            let mut stack = vec![child];
            while let Some(current) = stack.pop() {
                if let Some(removed) = self.nodes.remove(&current) {
                    stack.extend(removed.children);
                }
            }
        }
        let text_node = self.create_text(text);
        if let Some(text_ref) = self.nodes.get_mut(&text_node) {
            text_ref.parent = Some(id);
        }
        if let Some(node) = self.nodes.get_mut(&id) {
            node.children = vec![text_node];
        }
        self.record(MutationRecord::TextChanged { node: id });
        Ok(())
    }

    /// All node IDs in document order (depth-first from the root).
    pub fn descendants(&self) -> Vec<NodeId> {
        let mut out = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            out.push(id);
            if let Some(node) = self.nodes.get(&id) {
                for child in node.children.iter().rev() {
                    stack.push(*child);
                }
            }
        }
        out
    }

    /// Attached `<style>` elements in document order.
    pub fn style_nodes(&self) -> Vec<NodeId> {
        self.descendants()
            .into_iter()
            .filter(|id| self.tag(*id) == Some("style"))
            .collect()
    }

    /// Attached `<link rel="stylesheet">` elements with an `href`.
    pub fn link_nodes(&self) -> Vec<NodeId> {
        self.descendants()
            .into_iter()
            .filter(|id| {
                self.tag(*id) == Some("link")
                    && self
                        .attribute(*id, "rel")
                        .is_some_and(|rel| rel.split_whitespace().any(|r| r == "stylesheet"))
                    && self.attribute(*id, "href").is_some()
            })
            .collect()
    }

    /// Attached elements carrying a non-empty `style` attribute.
    pub fn styled_elements(&self) -> Vec<NodeId> {
        self.descendants()
            .into_iter()
            .filter(|id| self.inline_style(*id).is_some_and(|s| !s.trim().is_empty()))
            .collect()
    }

    /// Match a node against a comma list of simple selectors.
    ///
    /// Supports `*`, `tag`, `#id`, `.class` and compounds of them
    /// (`div.sidebar`, `input#search.wide`). Descendant combinators and
    /// pseudo-classes are out of scope; fix-rule selectors in practice are
    /// this simple.
    pub fn matches(&self, id: NodeId, selector_list: &str) -> bool {
        selector_list
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .any(|selector| self.matches_compound(id, selector))
    }

    fn matches_compound(&self, id: NodeId, compound: &str) -> bool {
        if self.tag(id).is_none() {
            return false;
        }
        for part in split_compound(compound) {
            let matched = match part {
                SelectorPart::Universal => true,
                SelectorPart::Tag(tag) => {
                    self.tag(id).is_some_and(|t| t.eq_ignore_ascii_case(tag))
                }
                SelectorPart::Id(wanted) => self.attribute(id, "id") == Some(wanted),
                SelectorPart::Class(wanted) => self
                    .attribute(id, "class")
                    .is_some_and(|classes| classes.split_whitespace().any(|c| c == wanted)),
            };
            if !matched {
                return false;
            }
        }
        true
    }

    fn record(&self, record: MutationRecord) {
        // The receiver may be gone when the engine shuts down first.
        let _ = self.mutations_tx.send(record);
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

enum SelectorPart<'a> {
    Universal,
    Tag(&'a str),
    Id(&'a str),
    Class(&'a str),
}

fn split_compound(compound: &str) -> Vec<SelectorPart<'_>> {
    let mut parts = Vec::new();
    let mut rest = compound;
    while !rest.is_empty() {
        let (kind, body) = match rest.as_bytes()[0] {
            b'*' => {
                parts.push(SelectorPart::Universal);
                rest = &rest[1..];
                continue;
            }
            b'#' => ('#', &rest[1..]),
            b'.' => ('.', &rest[1..]),
            _ => ('\0', rest),
        };
        let end = body
            .find(|c| c == '.' || c == '#')
            .unwrap_or(body.len());
        let (name, remainder) = body.split_at(end);
        match kind {
            '#' => parts.push(SelectorPart::Id(name)),
            '.' => parts.push(SelectorPart::Class(name)),
            _ => parts.push(SelectorPart::Tag(name)),
        }
        rest = remainder;
    }
    parts
}
