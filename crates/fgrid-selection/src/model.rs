//! The row model as seen by the selection engines.
//!
//! Selection state is keyed by row id, so the engines only ever ask the model
//! questions about ids. [`ArenaRowModel`] answers them from a
//! [`RowArena`]; lazily loaded models implement the trait directly.

use fgrid_core::{NodeHandle, RowArena};

use crate::range::RangeSource;

/// Read-only row model queries used by the selection engines.
pub trait SelectionRowModel: RangeSource {
    /// Ids from the top-level ancestor down to `id`, root excluded. `None`
    /// when the row is unknown.
    fn route_to(&self, id: &str) -> Option<Vec<String>>;

    fn exists(&self, id: &str) -> bool;

    fn has_children(&self, id: &str) -> bool;

    fn is_selectable(&self, id: &str) -> bool;

    /// Child count of `id` when it is final (the last child is loaded).
    fn known_child_count(&self, id: &str) -> Option<usize>;

    /// An active filter hides rows, so child counts are not trustworthy.
    fn is_filter_present(&self) -> bool {
        false
    }

    /// Every loaded row id, in display order.
    fn node_ids(&self) -> Vec<String>;
}

/// [`SelectionRowModel`] over an arena-backed tree.
///
/// Groups without a lazily loaded store are fully loaded, so their known child
/// count is their displayed child count.
#[derive(Debug)]
pub struct ArenaRowModel<'a, T> {
    arena: &'a RowArena<T>,
    root: NodeHandle,
    filter_present: bool,
}

impl<'a, T> ArenaRowModel<'a, T> {
    #[must_use]
    pub fn new(arena: &'a RowArena<T>, root: NodeHandle) -> Self {
        Self {
            arena,
            root,
            filter_present: false,
        }
    }

    /// Model over the tree containing `node`, rooted at its top ancestor.
    #[must_use]
    pub fn containing(arena: &'a RowArena<T>, node: NodeHandle) -> Self {
        let mut root = node;
        while let Some(parent) = arena.get(root).and_then(|n| n.parent()) {
            root = parent;
        }
        Self::new(arena, root)
    }

    #[must_use]
    pub fn with_filter_present(mut self, filter_present: bool) -> Self {
        self.filter_present = filter_present;
        self
    }

    #[must_use]
    pub fn root(&self) -> NodeHandle {
        self.root
    }

    fn ids(&self, handles: impl IntoIterator<Item = NodeHandle>) -> Vec<String> {
        handles
            .into_iter()
            .filter_map(|h| self.arena.get(h).map(|n| n.id().to_owned()))
            .collect()
    }
}

impl<T> RangeSource for ArenaRowModel<'_, T> {
    fn nodes_in_range(&self, from: &str, to: &str) -> Option<Vec<String>> {
        let order = self.node_ids();
        let a = order.iter().position(|id| id == from)?;
        let b = order.iter().position(|id| id == to)?;
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        Some(order[lo..=hi].to_vec())
    }

    fn leaf_descendants(&self, id: &str) -> Vec<String> {
        match self.arena.find(id) {
            Some(handle) => self.ids(self.arena.leaf_descendants(handle)),
            None => Vec::new(),
        }
    }
}

impl<T> SelectionRowModel for ArenaRowModel<'_, T> {
    fn route_to(&self, id: &str) -> Option<Vec<String>> {
        let handle = self.arena.find(id)?;
        Some(self.ids(self.arena.route_to(handle)))
    }

    fn exists(&self, id: &str) -> bool {
        self.arena.find(id).is_some()
    }

    fn has_children(&self, id: &str) -> bool {
        self.arena
            .find(id)
            .and_then(|h| self.arena.get(h))
            .is_some_and(|n| n.has_children())
    }

    fn is_selectable(&self, id: &str) -> bool {
        self.arena
            .find(id)
            .and_then(|h| self.arena.get(h))
            .is_some_and(|n| n.selectable)
    }

    fn known_child_count(&self, id: &str) -> Option<usize> {
        let handle = self.arena.find(id)?;
        let node = self.arena.get(handle)?;
        match node.child_store {
            Some(store) => store.known_row_count(),
            None if node.group => Some(self.arena.children(handle).len()),
            None => None,
        }
    }

    fn is_filter_present(&self) -> bool {
        self.filter_present
    }

    fn node_ids(&self) -> Vec<String> {
        self.ids(self.arena.preorder(self.root))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use fgrid_core::{RowNode, StoreInfo};
    use std::sync::Arc;

    /// root
    /// ├── A (group)
    /// │   ├── A1
    /// │   └── A2
    /// ├── B (group, lazily loaded: 3 rows, count final)
    /// │   └── B1
    /// └── C
    pub(crate) fn sample_tree() -> (RowArena<()>, NodeHandle) {
        let mut arena = RowArena::new();
        let root = arena.insert(RowNode::root());
        let a = arena.append_child(root, RowNode::group("A", None)).unwrap();
        arena.append_child(a, RowNode::leaf("A1", Arc::new(()))).unwrap();
        arena.append_child(a, RowNode::leaf("A2", Arc::new(()))).unwrap();
        let b = arena
            .append_child(
                root,
                RowNode::group("B", None).with_child_store(StoreInfo::complete(3)),
            )
            .unwrap();
        arena.append_child(b, RowNode::leaf("B1", Arc::new(()))).unwrap();
        arena.append_child(root, RowNode::leaf("C", Arc::new(()))).unwrap();
        (arena, root)
    }

    #[test]
    fn routes_exclude_root() {
        let (arena, root) = sample_tree();
        let model = ArenaRowModel::new(&arena, root);
        assert_eq!(model.route_to("A2"), Some(vec!["A".to_owned(), "A2".to_owned()]));
        assert_eq!(model.route_to("C"), Some(vec!["C".to_owned()]));
        assert_eq!(model.route_to("nope"), None);
    }

    #[test]
    fn display_order_and_ranges() {
        let (arena, root) = sample_tree();
        let model = ArenaRowModel::new(&arena, root);
        assert_eq!(model.node_ids(), vec!["A", "A1", "A2", "B", "B1", "C"]);
        assert_eq!(
            model.nodes_in_range("B1", "A2"),
            Some(vec!["A2".to_owned(), "B".to_owned(), "B1".to_owned()])
        );
        assert_eq!(model.leaf_descendants("A"), vec!["A1", "A2"]);
    }

    #[test]
    fn child_counts() {
        let (arena, root) = sample_tree();
        let model = ArenaRowModel::new(&arena, root);
        assert_eq!(model.known_child_count("A"), Some(2));
        assert_eq!(model.known_child_count("B"), Some(3));
        assert_eq!(model.known_child_count("C"), None);
        assert!(model.has_children("A"));
        assert!(!model.has_children("C"));
    }

    #[test]
    fn containing_finds_top_root() {
        let (arena, root) = sample_tree();
        let a1 = arena.find("A1").unwrap();
        assert_eq!(ArenaRowModel::containing(&arena, a1).root(), root);
    }
}
