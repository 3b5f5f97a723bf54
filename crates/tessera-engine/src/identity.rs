//! Stable keys for model nodes and the positions they were last seen at.
//!
//! Model nodes are rebuilt on every change, so their [`NodeId`] only names one
//! object. A [`Key`] names the logical node: the reconciler hands the key of a
//! replaced object over to its replacement. Positions (parent and child index)
//! are recorded per object and let [`IdentityRegistry::resolve_path`] rebuild a
//! path by climbing parent links.
//!
//! Entries are never tied to the lifetime of the node. Every recording pass
//! bumps a generation counter, and [`IdentityRegistry::sweep`] drops entries
//! that have not been touched for a number of passes.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use log::debug;
use serde::Serialize;
use tessera_model::{Node, NodeId, Path};
use thiserror::Error;

/// Opaque, process-unique token for a logical node
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, PartialOrd, Ord, Serialize)]
pub struct Key(u64);

static NEXT_KEY: AtomicU64 = AtomicU64::new(1);

impl Key {
    fn mint() -> Self {
        Key(NEXT_KEY.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "k{}", self.0)
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PathResolutionError {
    #[error("Node {node:?} has no recorded parent and is not the editor root")]
    Detached { node: NodeId },

    #[error("Node {node:?} has no recorded child index")]
    MissingIndex { node: NodeId },

    #[error("No node is registered under key {key}")]
    UnknownKey { key: Key },

    #[error("Key {key} resolved to {path}, which now holds a different node")]
    Stale { key: Key, path: Path },
}

#[derive(Debug, Clone)]
struct Entry {
    key: Option<Key>,
    parent: Option<NodeId>,
    index: Option<usize>,
    touched: u64,
}

#[derive(Debug, Default)]
pub struct IdentityRegistry {
    entries: HashMap<NodeId, Entry>,
    nodes: HashMap<Key, NodeId>,
    root: Option<NodeId>,
    generation: u64,
}

impl IdentityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(&mut self, node: NodeId) -> &mut Entry {
        let generation = self.generation;
        let entry = self.entries.entry(node).or_insert(Entry {
            key: None,
            parent: None,
            index: None,
            touched: generation,
        });
        entry.touched = generation;
        entry
    }

    /// The key already associated with `node`, or a freshly minted one
    pub fn assign_or_get_key(&mut self, node: &Node) -> Key {
        let id = node.id();
        let key = match self.entry(id).key {
            Some(key) => key,
            None => {
                let key = Key::mint();
                self.entry(id).key = Some(key);
                key
            }
        };
        self.nodes.entry(key).or_insert(id);
        key
    }

    pub fn key(&self, node: &Node) -> Option<Key> {
        self.entries.get(&node.id())?.key
    }

    /// Hands `key` to `node`, making it the node the key resolves to
    pub fn set_key(&mut self, node: &Node, key: Key) {
        let id = node.id();
        self.entry(id).key = Some(key);
        self.nodes.insert(key, id);
    }

    /// The node object currently holding `key`
    pub fn node_for_key(&self, key: Key) -> Option<NodeId> {
        self.nodes.get(&key).copied()
    }

    pub fn record_position(&mut self, node: &Node, parent: &Node, index: usize) {
        let parent = parent.id();
        let entry = self.entry(node.id());
        entry.parent = Some(parent);
        entry.index = Some(index);
    }

    /// Marks `root` as the editor root, where path resolution stops
    pub fn set_root(&mut self, root: &Node) {
        self.entry(root.id());
        self.root = Some(root.id());
    }

    pub fn resolve_path(&self, node: &Node) -> Result<Path, PathResolutionError> {
        self.resolve_id(node.id())
    }

    pub fn resolve_id(&self, node: NodeId) -> Result<Path, PathResolutionError> {
        let mut indices = Vec::new();
        let mut current = node;

        while Some(current) != self.root {
            let entry = self.entries.get(&current);
            let parent = entry
                .and_then(|e| e.parent)
                .ok_or(PathResolutionError::Detached { node: current })?;
            let index = entry
                .and_then(|e| e.index)
                .ok_or(PathResolutionError::MissingIndex { node: current })?;
            indices.push(index);
            current = parent;
        }

        indices.reverse();
        Ok(Path::new(indices))
    }

    /// Resolves the path of whatever node currently holds `key`
    pub fn resolve_key(&self, key: Key) -> Result<Path, PathResolutionError> {
        let node = self
            .node_for_key(key)
            .ok_or(PathResolutionError::UnknownKey { key })?;
        self.resolve_id(node)
    }

    /// Walks the whole tree, making sure every node has a key and an up to date
    /// position. Each call is one generation.
    pub fn record_tree(&mut self, root: &Rc<Node>) {
        self.generation += 1;
        self.set_root(root);
        self.assign_or_get_key(root);
        self.record_children(root);
    }

    fn record_children(&mut self, parent: &Rc<Node>) {
        for (index, child) in parent.children().iter().enumerate() {
            self.assign_or_get_key(child);
            self.record_position(child, parent, index);
            self.record_children(child);
        }
    }

    /// Records positions below nodes that have none yet, which after an
    /// operation are the rebuilt lineages and freshly inserted subtrees.
    /// Shared subtrees only get their new parent noted. Does not start a
    /// generation.
    pub fn record_changes(&mut self, root: &Rc<Node>) {
        self.set_root(root);
        self.assign_or_get_key(root);
        self.record_changed_children(root);
    }

    fn record_changed_children(&mut self, parent: &Rc<Node>) {
        for (index, child) in parent.children().iter().enumerate() {
            let placed = self
                .entries
                .get(&child.id())
                .is_some_and(|entry| entry.parent.is_some());
            self.assign_or_get_key(child);
            self.record_position(child, parent, index);
            if !placed {
                self.record_changed_children(child);
            }
        }
    }

    /// Drops entries untouched for more than `max_age` generations. Returns the
    /// number of entries removed.
    pub fn sweep(&mut self, max_age: u64) -> usize {
        let threshold = self.generation.saturating_sub(max_age);
        let before = self.entries.len();

        let mut released = Vec::new();
        self.entries.retain(|id, entry| {
            let keep = entry.touched >= threshold || Some(*id) == self.root;
            if !keep && let Some(key) = entry.key {
                released.push((key, *id));
            }
            keep
        });
        for (key, id) in released {
            if self.nodes.get(&key) == Some(&id) {
                self.nodes.remove(&key);
            }
        }

        let swept = before - self.entries.len();
        if swept > 0 {
            debug!("swept {swept} identity entries older than generation {threshold}");
        }
        swept
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tessera_model::{Document, Operation};

    fn doc() -> Document {
        Document::new(vec![
            Node::element("paragraph", vec![Node::text("one")]),
            Node::element("paragraph", vec![Node::text("two"), Node::text("three")]),
        ])
    }

    #[test]
    fn test_keys_are_stable_per_object() {
        let mut registry = IdentityRegistry::new();
        let node = Node::text("a");

        let first = registry.assign_or_get_key(&node);
        let second = registry.assign_or_get_key(&node.clone());
        let other = registry.assign_or_get_key(&Node::text("a"));

        assert_eq!(first, second);
        assert_ne!(first, other);
    }

    #[test]
    fn test_resolve_path_climbs_to_root() {
        let doc = doc();
        let mut registry = IdentityRegistry::new();
        registry.record_tree(doc.root());

        let leaf = doc.node(&Path::from([1, 1])).unwrap();
        assert_eq!(registry.resolve_path(leaf).unwrap(), Path::from([1, 1]));
        assert_eq!(registry.resolve_path(doc.root()).unwrap(), Path::root());
    }

    #[test]
    fn test_unrecorded_node_is_detached() {
        let registry = IdentityRegistry::new();
        let node = Node::text("loose");

        assert_eq!(
            registry.resolve_path(&node),
            Err(PathResolutionError::Detached { node: node.id() })
        );
    }

    #[test]
    fn test_set_key_moves_key_to_new_object() {
        let mut doc = doc();
        let mut registry = IdentityRegistry::new();
        registry.record_tree(doc.root());
        let key = registry.key(doc.node(&Path::from([0])).unwrap()).unwrap();

        doc.apply(&Operation::InsertText {
            path: Path::from([0, 0]),
            offset: 0,
            text: "x".to_string(),
        })
        .unwrap();
        let rebuilt = doc.node(&Path::from([0])).unwrap();
        registry.set_key(rebuilt, key);
        registry.record_tree(doc.root());

        assert_eq!(registry.node_for_key(key), Some(rebuilt.id()));
        assert_eq!(registry.resolve_key(key).unwrap(), Path::from([0]));
    }

    #[test]
    fn test_record_changes_matches_full_walk() {
        let mut doc = doc();
        let mut registry = IdentityRegistry::new();
        registry.record_tree(doc.root());
        let shared_leaf = doc.node(&Path::from([1, 1])).unwrap().clone();

        doc.apply(&Operation::MoveNode {
            path: Path::from([1]),
            new_path: Path::from([0]),
        })
        .unwrap();
        doc.apply(&Operation::InsertNode {
            path: Path::from([1, 0]),
            node: Node::element("span", vec![Node::text("new")]),
        })
        .unwrap();
        let generation = registry.generation();
        registry.record_changes(doc.root());

        assert_eq!(registry.generation(), generation);
        assert_eq!(registry.resolve_path(&shared_leaf).unwrap(), Path::from([0, 1]));
        for path in [[0, 0], [0, 1], [1, 1]] {
            let node = doc.node(&Path::from(path)).unwrap();
            assert_eq!(registry.resolve_path(node).unwrap(), Path::from(path));
        }
        let inserted_leaf = doc.node(&Path::from([1, 0, 0])).unwrap();
        assert_eq!(registry.resolve_path(inserted_leaf).unwrap(), Path::from([1, 0, 0]));
        assert!(registry.key(inserted_leaf).is_some());
    }

    #[test]
    fn test_sweep_drops_only_dead_objects() {
        let mut doc = doc();
        let mut registry = IdentityRegistry::new();
        registry.record_tree(doc.root());
        let live = registry.len();

        doc.apply(&Operation::RemoveNode {
            path: Path::from([1]),
            node: Node::text(""),
        })
        .unwrap();
        registry.record_tree(doc.root());
        registry.record_tree(doc.root());

        // root and paragraph [0] were rebuilt or kept; the removed paragraph
        // and its two leaves plus the old root are dead.
        let swept = registry.sweep(1);
        assert_eq!(swept, 4);
        assert_eq!(registry.len(), live - 3);
        assert!(registry.resolve_path(doc.node(&Path::from([0, 0])).unwrap()).is_ok());
    }
}
