//! Per-node change collection for incremental downstream stages.
//!
//! Grouping and aggregation use the collected set to recompute only the paths
//! that changed instead of the whole tree.

use std::collections::{HashMap, HashSet};

use fgrid_core::NodeHandle;

/// Receives per-node notifications while a transaction is applied.
pub trait ChangedRowNodes {
    fn add(&mut self, node: NodeHandle);
    fn update(&mut self, node: NodeHandle);
    fn remove(&mut self, node: NodeHandle);
}

/// Default collector.
///
/// An add wins over a later update of the same node; a removal cancels any
/// pending add or update.
#[derive(Debug, Clone, Default)]
pub struct ChangedRowNodeSet {
    removals: Vec<NodeHandle>,
    removed: HashSet<NodeHandle>,
    order: Vec<NodeHandle>,
    /// `true` when the node was added, `false` when only updated.
    updates: HashMap<NodeHandle, bool>,
}

impl ChangedRowNodeSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.removals.is_empty() && self.updates.is_empty()
    }

    /// Removed nodes, in notification order.
    #[must_use]
    pub fn removals(&self) -> &[NodeHandle] {
        &self.removals
    }

    /// Added nodes, in notification order.
    #[must_use]
    pub fn added(&self) -> Vec<NodeHandle> {
        self.live_updates().filter(|(_, added)| *added).map(|(h, _)| h).collect()
    }

    /// Updated (but not added) nodes, in notification order.
    #[must_use]
    pub fn updated(&self) -> Vec<NodeHandle> {
        self.live_updates().filter(|(_, added)| !*added).map(|(h, _)| h).collect()
    }

    fn live_updates(&self) -> impl Iterator<Item = (NodeHandle, bool)> + '_ {
        self.order
            .iter()
            .filter_map(|h| self.updates.get(h).map(|added| (*h, *added)))
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

impl ChangedRowNodes for ChangedRowNodeSet {
    fn add(&mut self, node: NodeHandle) {
        if self.updates.insert(node, true).is_none() {
            self.order.push(node);
        }
    }

    fn update(&mut self, node: NodeHandle) {
        if !self.updates.contains_key(&node) {
            self.updates.insert(node, false);
            self.order.push(node);
        }
    }

    fn remove(&mut self, node: NodeHandle) {
        if self.updates.remove(&node).is_some() {
            self.order.retain(|h| *h != node);
        }
        if self.removed.insert(node) {
            self.removals.push(node);
        }
    }
}
