#![forbid(unsafe_code)]

//! Row nodes: the identity + payload holders the grid renders.
//!
//! A [`RowNode`] never owns its neighbours. Tree edges are expressed as
//! [`NodeHandle`]s into a [`RowArena`](crate::arena::RowArena), so a node can be
//! moved, cloned for inspection, or detached without fighting back-references.
//!
//! # Invariants
//!
//! 1. `id` is fixed once the node is inserted into an arena.
//! 2. Roots have `level == -1`, `group == true` and no parent.
//! 3. `source_row_index` is only written by the node manager.

use std::sync::Arc;

use crate::arena::NodeHandle;

/// Id given to synthetic root nodes.
pub const ROOT_NODE_ID: &str = "ROOT_NODE_ID";

/// Size information for a lazily loaded child store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StoreInfo {
    /// Number of rows currently known to the store.
    pub row_count: usize,
    /// Whether the last row index has been reached, making `row_count` final.
    pub last_row_index_known: bool,
}

impl StoreInfo {
    /// A store whose size is final.
    #[must_use]
    pub const fn complete(row_count: usize) -> Self {
        Self {
            row_count,
            last_row_index_known: true,
        }
    }

    /// A store that may still load more rows.
    #[must_use]
    pub const fn partial(row_count: usize) -> Self {
        Self {
            row_count,
            last_row_index_known: false,
        }
    }

    /// Row count, but only when it is final.
    #[must_use]
    pub fn known_row_count(&self) -> Option<usize> {
        self.last_row_index_known.then_some(self.row_count)
    }
}

/// Child lists derived by the grouping/filtering/sorting pipeline.
///
/// `None` means "not computed yet"; `Some(vec![])` means "computed, empty".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DerivedChildren {
    pub after_group: Option<Vec<NodeHandle>>,
    pub after_filter: Option<Vec<NodeHandle>>,
    pub after_agg_filter: Option<Vec<NodeHandle>>,
    pub after_sort: Option<Vec<NodeHandle>>,
}

impl DerivedChildren {
    /// All lists computed and empty.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            after_group: Some(Vec::new()),
            after_filter: Some(Vec::new()),
            after_agg_filter: Some(Vec::new()),
            after_sort: Some(Vec::new()),
        }
    }

    /// All lists invalidated.
    #[must_use]
    pub fn cleared() -> Self {
        Self::default()
    }
}

/// A row in the grid.
#[derive(Debug, Clone)]
pub struct RowNode<T> {
    pub(crate) id: String,
    pub(crate) data: Option<Arc<T>>,
    pub(crate) parent: Option<NodeHandle>,
    /// Depth in the row tree; `-1` for roots, `0` for top-level rows.
    pub level: i32,
    pub group: bool,
    pub expanded: bool,
    pub selectable: bool,
    /// Tri-state flag used by flag-based selection; `None` is indeterminate.
    pub selected: Option<bool>,
    pub source_row_index: Option<usize>,
    /// Cached rendered row index.
    pub row_index: Option<usize>,
    /// Cached rendered row offset in pixels.
    pub row_top: Option<u32>,
    pub child_store: Option<StoreInfo>,
    pub all_leaf_children: Option<Vec<NodeHandle>>,
    pub children: DerivedChildren,
    pub sibling: Option<NodeHandle>,
}

impl<T> RowNode<T> {
    /// A synthetic root node.
    #[must_use]
    pub fn root() -> Self {
        let mut node = Self::bare(ROOT_NODE_ID.to_owned(), None);
        node.reset_as_root();
        node
    }

    /// A top-level leaf row.
    #[must_use]
    pub fn leaf(id: impl Into<String>, data: Arc<T>) -> Self {
        Self::bare(id.into(), Some(data))
    }

    /// A group row; its children are attached through the arena.
    #[must_use]
    pub fn group(id: impl Into<String>, data: Option<Arc<T>>) -> Self {
        let mut node = Self::bare(id.into(), data);
        node.group = true;
        node.children.after_group = Some(Vec::new());
        node
    }

    fn bare(id: String, data: Option<Arc<T>>) -> Self {
        Self {
            id,
            data,
            parent: None,
            level: 0,
            group: false,
            expanded: false,
            selectable: true,
            selected: Some(false),
            source_row_index: None,
            row_index: None,
            row_top: None,
            child_store: None,
            all_leaf_children: None,
            children: DerivedChildren::default(),
            sibling: None,
        }
    }

    /// Turn this node into a fresh root: root id, level `-1`, no parent, and
    /// empty child lists.
    pub fn reset_as_root(&mut self) {
        ROOT_NODE_ID.clone_into(&mut self.id);
        self.level = -1;
        self.group = true;
        self.expanded = true;
        self.parent = None;
        self.source_row_index = None;
        self.all_leaf_children = Some(Vec::new());
        self.children = DerivedChildren::empty();
    }

    /// Attach size information for a lazily loaded child store.
    #[must_use]
    pub fn with_child_store(mut self, store: StoreInfo) -> Self {
        self.child_store = Some(store);
        self
    }

    #[must_use]
    pub fn with_selectable(mut self, selectable: bool) -> Self {
        self.selectable = selectable;
        self
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn data(&self) -> Option<&Arc<T>> {
        self.data.as_ref()
    }

    #[must_use]
    pub fn parent(&self) -> Option<NodeHandle> {
        self.parent
    }

    #[must_use]
    pub fn is_root(&self) -> bool {
        self.level < 0
    }

    /// Whether `data` is the very same allocation this node holds.
    #[must_use]
    pub fn holds(&self, data: &Arc<T>) -> bool {
        self.data.as_ref().is_some_and(|own| Arc::ptr_eq(own, data))
    }

    /// Replace the payload in place, keeping identity.
    pub fn update_data(&mut self, data: Arc<T>) {
        self.data = Some(data);
    }

    /// Whether the node is selected; `None` while indeterminate.
    #[must_use]
    pub fn is_selected(&self) -> Option<bool> {
        self.selected
    }

    /// Groups and nodes with derived children count as having children.
    #[must_use]
    pub fn has_children(&self) -> bool {
        self.group
            || self
                .children
                .after_group
                .as_ref()
                .is_some_and(|c| !c.is_empty())
    }

    /// Forget the rendered position so the renderer fades the row out.
    pub fn clear_row_top_and_row_index(&mut self) {
        self.row_index = None;
        self.row_top = None;
    }
}
