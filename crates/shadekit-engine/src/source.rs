//! Registry of style sources tracked by the engine.
//!
//! A source is one originating style container: a linked stylesheet, a
//! `<style>` block, or one element's inline style. Each source owns its
//! shadow output and is torn down when the engine disables or the node
//! leaves the document.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use shadekit_dom::NodeId;
use tracing::trace;
use url::Url;

/// Unique identifier for a style source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceId(u64);

impl SourceId {
    fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for SourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "source-{}", self.0)
    }
}

/// What kind of container a source wraps.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceKind {
    /// `<link rel="stylesheet">`, fetched through the loader.
    LinkedSheet { url: Url },
    /// `<style>` element text.
    StyleBlock,
    /// One element's `style` attribute.
    InlineStyle,
}

/// One tracked style container.
#[derive(Debug, Clone)]
pub struct StyleSource {
    pub id: SourceId,
    pub node: NodeId,
    pub kind: SourceKind,
    /// The last observed original text (sheet text or inline declarations).
    pub original: String,
    /// The rewritten output, `None` until the first apply pass or after a
    /// failed load.
    pub shadow: Option<String>,
    /// Set when the linked sheet could not be fetched; the source stays
    /// registered so a later scan can retry.
    pub failed: bool,
}

/// All sources of one document, indexed by ID and by node.
#[derive(Default)]
pub struct SourceRegistry {
    sources: HashMap<SourceId, StyleSource>,
    by_node: HashMap<NodeId, SourceId>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new source for `node`, replacing any existing one.
    pub fn register(&mut self, node: NodeId, kind: SourceKind) -> SourceId {
        if let Some(existing) = self.by_node.remove(&node) {
            self.sources.remove(&existing);
        }
        let id = SourceId::new();
        trace!(%id, %node, ?kind, "Style source registered");
        self.sources.insert(
            id,
            StyleSource {
                id,
                node,
                kind,
                original: String::new(),
                shadow: None,
                failed: false,
            },
        );
        self.by_node.insert(node, id);
        id
    }

    pub fn get(&self, id: SourceId) -> Option<&StyleSource> {
        self.sources.get(&id)
    }

    pub fn get_mut(&mut self, id: SourceId) -> Option<&mut StyleSource> {
        self.sources.get_mut(&id)
    }

    pub fn for_node(&self, node: NodeId) -> Option<SourceId> {
        self.by_node.get(&node).copied()
    }

    /// Drop the source attached to `node`, if any.
    pub fn remove_node(&mut self, node: NodeId) -> Option<StyleSource> {
        let id = self.by_node.remove(&node)?;
        let source = self.sources.remove(&id);
        trace!(%id, %node, "Style source removed");
        source
    }

    /// All source IDs in registration order.
    pub fn ids(&self) -> Vec<SourceId> {
        let mut ids: Vec<SourceId> = self.sources.keys().copied().collect();
        ids.sort();
        ids
    }

    /// Iterate sources in registration order.
    pub fn iter_ordered(&self) -> impl Iterator<Item = &StyleSource> {
        let mut sources: Vec<&StyleSource> = self.sources.values().collect();
        sources.sort_by_key(|s| s.id);
        sources.into_iter()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Drop every source.
    pub fn clear(&mut self) {
        self.sources.clear();
        self.by_node.clear();
    }
}
