//! Selection collaborator contract used by the row engines.
//!
//! The node manager does not own selection. When a structural change has to
//! drop nodes from the selection it hands them to a [`RowSelection`] in one
//! batched call, so a single downstream notification covers the whole change.
//! [`NodeFlagSelection`] is the simplest implementation: it keeps the flag on
//! each [`RowNode`](crate::node::RowNode).

use tracing::warn;

use crate::arena::{NodeHandle, RowArena};
use crate::event::{EventQueue, SelectionSource};

/// Arguments of a bulk "set selected" call.
#[derive(Debug, Clone)]
pub struct SetNodesSelectedParams<'a> {
    pub nodes: &'a [NodeHandle],
    pub new_value: bool,
    /// Treat the (single) node as the end of a shift-click range.
    pub range_select: bool,
    /// Clear all other selection before selecting.
    pub clear_selection: bool,
    /// The caller emits the change notification itself.
    pub suppress_finish_actions: bool,
    pub source: SelectionSource,
}

impl<'a> SetNodesSelectedParams<'a> {
    #[must_use]
    pub fn new(nodes: &'a [NodeHandle], new_value: bool, source: SelectionSource) -> Self {
        Self {
            nodes,
            new_value,
            range_select: false,
            clear_selection: false,
            suppress_finish_actions: false,
            source,
        }
    }

    #[must_use]
    pub fn range(mut self) -> Self {
        self.range_select = true;
        self
    }

    #[must_use]
    pub fn clearing(mut self) -> Self {
        self.clear_selection = true;
        self
    }

    #[must_use]
    pub fn silent(mut self) -> Self {
        self.suppress_finish_actions = true;
        self
    }
}

/// Selection collaborator consulted and driven by the row engines.
pub trait RowSelection<T> {
    /// Selected flag of a node; `None` while indeterminate.
    fn is_node_selected(&self, arena: &RowArena<T>, node: NodeHandle) -> Option<bool>;

    /// Apply a bulk selection change. Returns the number of updates applied.
    fn set_nodes_selected(
        &mut self,
        arena: &mut RowArena<T>,
        params: &SetNodesSelectedParams<'_>,
    ) -> usize;

    /// Forget nodes that are leaving the model. The nodes are still in the
    /// arena. Returns the number of updates applied.
    ///
    /// Flag-based selections only need the removed rows deselected; id-keyed
    /// selections must drop their entries instead of recording a toggle.
    fn remove_nodes(
        &mut self,
        arena: &mut RowArena<T>,
        nodes: &[NodeHandle],
        source: SelectionSource,
    ) -> usize {
        let selected: Vec<NodeHandle> = nodes
            .iter()
            .copied()
            .filter(|h| self.is_node_selected(arena, *h) == Some(true))
            .collect();
        if selected.is_empty() {
            return 0;
        }
        let params = SetNodesSelectedParams::new(&selected, false, source).silent();
        self.set_nodes_selected(arena, &params)
    }

    /// Recompute group tri-state flags below `root`. Returns whether any group
    /// changed.
    fn update_groups_from_children_selections(
        &mut self,
        _arena: &mut RowArena<T>,
        _root: NodeHandle,
        _source: SelectionSource,
    ) -> bool {
        false
    }
}

/// Flag-per-node selection.
#[derive(Debug, Clone, Default)]
pub struct NodeFlagSelection {
    multi_select: bool,
    changes: EventQueue<SelectionSource>,
}

impl NodeFlagSelection {
    #[must_use]
    pub fn new(multi_select: bool) -> Self {
        Self {
            multi_select,
            changes: EventQueue::new(),
        }
    }

    /// Sources of change notifications this selection emitted itself.
    pub fn take_changes(&mut self) -> Vec<SelectionSource> {
        self.changes.drain()
    }

    fn clear_all<T>(arena: &mut RowArena<T>) -> usize {
        let selected: Vec<NodeHandle> = arena
            .iter()
            .filter(|(_, node)| !node.is_root() && node.selected != Some(false))
            .map(|(handle, _)| handle)
            .collect();
        for handle in &selected {
            if let Some(node) = arena.get_mut(*handle) {
                node.selected = Some(false);
            }
        }
        selected.len()
    }
}

impl<T> RowSelection<T> for NodeFlagSelection {
    fn is_node_selected(&self, arena: &RowArena<T>, node: NodeHandle) -> Option<bool> {
        arena.get(node).and_then(|n| n.selected)
    }

    fn set_nodes_selected(
        &mut self,
        arena: &mut RowArena<T>,
        params: &SetNodesSelectedParams<'_>,
    ) -> usize {
        let exclusive = params.clear_selection && params.new_value;
        let mut updated = 0;
        if !self.multi_select || exclusive {
            if params.nodes.len() > 1 {
                warn!(
                    count = params.nodes.len(),
                    "cannot select multiple rows in single-select mode"
                );
                return 0;
            }
            if params.new_value {
                updated += Self::clear_all(arena);
            }
        }
        for handle in params.nodes {
            let Some(node) = arena.get_mut(*handle) else {
                continue;
            };
            if params.new_value && !node.selectable {
                continue;
            }
            if node.selected != Some(params.new_value) {
                node.selected = Some(params.new_value);
                updated += 1;
            }
        }
        if updated > 0 && !params.suppress_finish_actions {
            self.changes.push(params.source);
        }
        updated
    }

    fn update_groups_from_children_selections(
        &mut self,
        arena: &mut RowArena<T>,
        root: NodeHandle,
        _source: SelectionSource,
    ) -> bool {
        let mut changed = false;
        // Children before parents.
        for handle in arena.preorder(root).into_iter().rev() {
            let Some(node) = arena.get(handle) else {
                continue;
            };
            if !node.group {
                continue;
            }
            let mut any_selected = false;
            let mut any_unselected = false;
            for child in arena.children(handle) {
                match arena.get(*child) {
                    Some(c) if c.selectable => match c.selected {
                        Some(true) => any_selected = true,
                        Some(false) => any_unselected = true,
                        None => {
                            any_selected = true;
                            any_unselected = true;
                        }
                    },
                    _ => {}
                }
            }
            let next = match (any_selected, any_unselected) {
                (false, false) => continue,
                (true, false) => Some(true),
                (false, true) => Some(false),
                (true, true) => None,
            };
            if let Some(group) = arena.get_mut(handle) {
                if group.selected != next {
                    group.selected = next;
                    changed = true;
                }
            }
        }
        changed
    }
}
