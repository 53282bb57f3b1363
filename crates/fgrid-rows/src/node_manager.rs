//! Client-side node manager: turns application row arrays into row nodes.
//!
//! The manager owns the root node's leaf list and the id → node map. It
//! supports three ways of changing data:
//!
//! - [`set_new_row_data`](ClientSideNodeManager::set_new_row_data): rebuild
//!   every node from scratch.
//! - [`update_row_data`](ClientSideNodeManager::update_row_data): apply an
//!   explicit add/remove/update transaction.
//! - [`set_immutable_row_data`](ClientSideNodeManager::set_immutable_row_data):
//!   diff a full array against the existing nodes, apply the diff as a
//!   transaction, then move rows into the array's order.
//!
//! # Invariants
//!
//! 1. The id map holds exactly the ids of the root's leaves.
//! 2. After any structural change, `source_row_index` of each leaf equals its
//!    position in the leaf list.
//! 3. A sibling root, when present, sees the same leaf list as the primary.
//! 4. Remove, update and add phases run strictly in that order.
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | Duplicate id | Id callback returns an id already in use | Warned; newest node wins the id map |
//! | Unknown row | Remove/update of a row with no node | Logged; item skipped |
//! | No id callback on immutable update | Configuration | Logged; full replacement |

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use fgrid_core::{
    DerivedChildren, EventQueue, GetRowIdFn, GridEvent, GridOptions, NodeFlagSelection,
    NodeHandle, RowArena, RowNode, RowSelection, SelectionSource, SetNodesSelectedParams,
};
use tracing::{debug, debug_span, error, warn};

use crate::changed::ChangedRowNodes;
use crate::transaction::{RowDataRefresh, RowDataTransaction, RowNodeTransaction, UpdateRowDataResult};

/// Owns the root node's leaves and reconciles them against row data.
pub struct ClientSideNodeManager<T, S = NodeFlagSelection> {
    options: GridOptions<T>,
    arena: RowArena<T>,
    root: Option<NodeHandle>,
    next_id: u64,
    all_nodes: HashMap<String, NodeHandle>,
    selection: Option<S>,
    events: EventQueue<GridEvent<T>>,
}

impl<T> ClientSideNodeManager<T, NodeFlagSelection> {
    /// Manager with flag-per-node selection, sized from `options`.
    #[must_use]
    pub fn new(options: GridOptions<T>) -> Self {
        let selection = NodeFlagSelection::new(options.is_multi_select());
        Self::with_selection(options, selection)
    }
}

impl<T, S: RowSelection<T>> ClientSideNodeManager<T, S> {
    /// Manager that batches deselections through `selection`.
    #[must_use]
    pub fn with_selection(options: GridOptions<T>, selection: S) -> Self {
        Self {
            selection: Some(selection),
            ..Self::without_selection(options)
        }
    }

    /// Manager without a selection collaborator.
    #[must_use]
    pub fn without_selection(options: GridOptions<T>) -> Self {
        Self {
            options,
            arena: RowArena::new(),
            root: None,
            next_id: 0,
            all_nodes: HashMap::new(),
            selection: None,
            events: EventQueue::new(),
        }
    }

    // ─── Accessors ────────────────────────────────────────────────

    #[must_use]
    pub fn options(&self) -> &GridOptions<T> {
        &self.options
    }

    #[must_use]
    pub fn arena(&self) -> &RowArena<T> {
        &self.arena
    }

    /// Mutable arena access for the downstream pipeline (grouping, row
    /// positions). Leaves and the id map must only change through this
    /// manager.
    pub fn arena_mut(&mut self) -> &mut RowArena<T> {
        &mut self.arena
    }

    #[must_use]
    pub fn root(&self) -> Option<NodeHandle> {
        self.root
    }

    #[must_use]
    pub fn selection(&self) -> Option<&S> {
        self.selection.as_ref()
    }

    pub fn selection_mut(&mut self) -> Option<&mut S> {
        self.selection.as_mut()
    }

    /// Selected flag of a node as the collaborator sees it.
    #[must_use]
    pub fn is_node_selected(&self, handle: NodeHandle) -> Option<bool> {
        self.selection
            .as_ref()
            .and_then(|s| s.is_node_selected(&self.arena, handle))
    }

    /// Forward a selection request to the collaborator. Queues a
    /// `SelectionChanged` event unless the request is silent.
    pub fn set_nodes_selected(&mut self, params: &SetNodesSelectedParams<'_>) -> usize {
        let Some(selection) = self.selection.as_mut() else {
            return 0;
        };
        let applied = selection.set_nodes_selected(&mut self.arena, params);
        if applied > 0 && !params.suppress_finish_actions {
            self.events.push(GridEvent::SelectionChanged {
                source: params.source,
            });
        }
        applied
    }

    /// Node handle for a row id.
    #[must_use]
    pub fn row_node(&self, id: &str) -> Option<NodeHandle> {
        self.all_nodes.get(id).copied()
    }

    #[must_use]
    pub fn node(&self, handle: NodeHandle) -> Option<&RowNode<T>> {
        self.arena.get(handle)
    }

    /// The root's leaves in source order.
    #[must_use]
    pub fn all_leaf_children(&self) -> &[NodeHandle] {
        self.root
            .and_then(|root| self.arena.get(root))
            .and_then(|root| root.all_leaf_children.as_deref())
            .unwrap_or(&[])
    }

    /// Row data in source order.
    #[must_use]
    pub fn extract_row_data(&self) -> Vec<Arc<T>> {
        self.all_leaf_children()
            .iter()
            .filter_map(|h| self.arena.get(*h).and_then(|n| n.data().cloned()))
            .collect()
    }

    /// Take every pending event, oldest first.
    pub fn take_events(&mut self) -> Vec<GridEvent<T>> {
        self.events.drain()
    }

    // ─── Lifecycle ────────────────────────────────────────────────

    /// Bind to a fresh root. O(1) on an unbound manager; rebinding a bound
    /// one first drops its previous nodes, linear in their number.
    pub fn activate(&mut self, mut root: RowNode<T>) -> NodeHandle {
        if !self.arena.is_empty() {
            self.arena.clear();
            self.all_nodes.clear();
        }
        self.next_id = 0;
        root.reset_as_root();
        root.sibling = None;
        let handle = self.arena.insert(root);
        self.root = Some(handle);
        handle
    }

    /// Unbind from the root and forget every node.
    pub fn deactivate(&mut self) {
        if self.root.take().is_some() {
            self.all_nodes.clear();
            self.arena.clear();
        }
    }

    /// Register a sibling root (pivot/secondary tree) mirroring the primary.
    pub fn set_sibling(&mut self, mut sibling: RowNode<T>) -> Option<NodeHandle> {
        let root = self.root?;
        sibling.reset_as_root();
        let primary = self.arena.get(root)?;
        sibling.all_leaf_children = primary.all_leaf_children.clone();
        sibling.children = primary.children.clone();
        let handle = self.arena.insert(sibling);
        if let Some(primary) = self.arena.get_mut(root) {
            primary.sibling = Some(handle);
        }
        Some(handle)
    }

    // ─── Full replacement ─────────────────────────────────────────

    /// Replace all row data, rebuilding every leaf in input order.
    pub fn set_new_row_data(&mut self, rows: &[Arc<T>]) {
        let Some(root) = self.root else {
            return;
        };
        let _span = debug_span!("row_data.replace", rows = rows.len()).entered();

        self.dispatch_row_data_update_started(rows.first());

        let previous = match self.arena.get_mut(root) {
            Some(root_node) => {
                root_node.children = DerivedChildren::cleared();
                root_node.all_leaf_children.take().unwrap_or_default()
            }
            None => return,
        };
        for handle in previous {
            self.arena.release(handle);
        }

        self.all_nodes.clear();
        self.next_id = 0;

        let leaves = rows
            .iter()
            .enumerate()
            .map(|(index, data)| self.create_row_node(root, Arc::clone(data), index))
            .collect();
        self.store_leaves(root, leaves);
        self.sync_sibling_children(root);
        debug!(leaves = rows.len(), "row data replaced");
    }

    // ─── Immutable update ─────────────────────────────────────────

    /// Diff `rows` against the current nodes by id, apply the diff and then
    /// reorder the leaves to follow `rows`.
    pub fn set_immutable_row_data(
        &mut self,
        rows: &[Arc<T>],
        changed: &mut dyn ChangedRowNodes,
    ) -> RowDataRefresh<T> {
        let Some(get_row_id) = self.options.get_row_id.clone() else {
            error!("immutable row data needs a row id callback; replacing all rows instead");
            self.set_new_row_data(rows);
            return RowDataRefresh {
                row_data_updated: true,
                rows_order_changed: true,
                replaced: true,
                transaction: RowNodeTransaction::default(),
            };
        };

        let transaction = self.create_transaction_for_row_data(&get_row_id, rows);
        let UpdateRowDataResult {
            transaction,
            rows_inserted,
        } = self.update_row_data(transaction, changed);

        let order_changed = !self.options.suppress_maintain_unsorted_order
            && self.update_row_order_from_row_data(rows);

        let rows_order_changed = rows_inserted || order_changed;
        RowDataRefresh {
            row_data_updated: rows_order_changed || !transaction.is_empty(),
            rows_order_changed,
            replaced: false,
            transaction,
        }
    }

    /// Convert a full row array into the transaction that turns the current
    /// nodes into it.
    fn create_transaction_for_row_data(
        &self,
        get_row_id: &GetRowIdFn<T>,
        rows: &[Arc<T>],
    ) -> RowDataTransaction<T> {
        let mut existing: HashMap<&str, NodeHandle> = self
            .all_nodes
            .iter()
            .map(|(id, handle)| (id.as_str(), *handle))
            .collect();

        let mut transaction = RowDataTransaction::new();
        for data in rows {
            let id = get_row_id(data, 0);
            match existing.remove(id.as_str()) {
                Some(handle) => {
                    let unchanged = self.arena.get(handle).is_some_and(|n| n.holds(data));
                    if !unchanged {
                        transaction.update.push(Arc::clone(data));
                    }
                }
                None => transaction.add.push(Arc::clone(data)),
            }
        }

        // Whatever was not consumed is gone; report it in leaf order.
        if !existing.is_empty() {
            let leftover: HashSet<NodeHandle> = existing.into_values().collect();
            transaction.remove = self
                .all_leaf_children()
                .iter()
                .filter(|h| leftover.contains(h))
                .filter_map(|h| self.arena.get(*h).and_then(|n| n.data().cloned()))
                .collect();
        }
        transaction
    }

    /// Move leaves so their order follows `rows`. Only the span between the
    /// first and last misplaced position is rewritten. Returns whether the
    /// order changed.
    pub fn update_row_order_from_row_data(&mut self, rows: &[Arc<T>]) -> bool {
        let Some(root) = self.root else {
            return false;
        };
        let mut leaves = self.take_leaves(root);

        let mut out_of_order: HashMap<*const T, NodeHandle> = HashMap::new();
        let mut first_out_of_order = None;
        let mut last_out_of_order = 0;
        for (index, handle) in leaves.iter().enumerate() {
            let Some(node) = self.arena.get(*handle) else {
                continue;
            };
            if rows.get(index).is_some_and(|desired| node.holds(desired)) {
                continue;
            }
            first_out_of_order.get_or_insert(index);
            last_out_of_order = index;
            if let Some(data) = node.data() {
                out_of_order.insert(Arc::as_ptr(data), *handle);
            }
        }

        let Some(first_out_of_order) = first_out_of_order else {
            self.put_leaves(root, leaves);
            return false;
        };

        for index in first_out_of_order..=last_out_of_order {
            let Some(&handle) = rows
                .get(index)
                .and_then(|desired| out_of_order.get(&Arc::as_ptr(desired)))
            else {
                continue;
            };
            leaves[index] = handle;
            if let Some(node) = self.arena.get_mut(handle) {
                node.source_row_index = Some(index);
            }
        }
        debug!(
            first = first_out_of_order,
            last = last_out_of_order,
            "leaf order reconciled"
        );
        self.store_leaves(root, leaves);
        true
    }

    // ─── Transactions ─────────────────────────────────────────────

    /// Apply an explicit transaction.
    pub fn update_row_data(
        &mut self,
        transaction: RowDataTransaction<T>,
        changed: &mut dyn ChangedRowNodes,
    ) -> UpdateRowDataResult<T> {
        let mut result = UpdateRowDataResult::default();
        let Some(root) = self.root else {
            warn!("row data transaction ignored: node manager is not active");
            return result;
        };
        let _span = debug_span!(
            "row_data.transaction",
            add = transaction.add.len(),
            remove = transaction.remove.len(),
            update = transaction.update.len()
        )
        .entered();

        self.dispatch_row_data_update_started(transaction.add.first());

        let removed = self.execute_remove(root, &transaction.remove, changed);
        let removed_selected = removed.iter().any(|handle| self.is_selected(*handle));
        let mut nodes_to_unselect = Vec::new();
        self.execute_update(&transaction.update, &mut result, changed, &mut nodes_to_unselect);
        self.execute_add(root, &transaction.add, transaction.add_index, &mut result, changed);

        self.deselect_nodes(root, &removed, removed_selected, &nodes_to_unselect);

        result.transaction.remove = removed
            .into_iter()
            .filter_map(|handle| self.arena.release(handle))
            .collect();
        result
    }

    fn execute_remove(
        &mut self,
        root: NodeHandle,
        items: &[Arc<T>],
        changed: &mut dyn ChangedRowNodes,
    ) -> Vec<NodeHandle> {
        if items.is_empty() {
            return Vec::new();
        }

        let mut removed_set = HashSet::new();
        let mut removed = Vec::new();
        for item in items {
            let Some(handle) = self.lookup_row_node(item) else {
                continue;
            };
            if !removed_set.insert(handle) {
                continue;
            }
            if let Some(node) = self.arena.get_mut(handle) {
                // The renderer fades the row out instead of repositioning it.
                node.clear_row_top_and_row_index();
                if self.all_nodes.get(node.id()) == Some(&handle) {
                    self.all_nodes.remove(node.id());
                }
            }
            removed.push(handle);
            changed.remove(handle);
        }

        if !removed.is_empty() {
            let mut leaves = self.take_leaves(root);
            leaves.retain(|handle| !removed_set.contains(handle));
            for (index, handle) in leaves.iter().enumerate() {
                if let Some(node) = self.arena.get_mut(*handle) {
                    node.source_row_index = Some(index);
                }
            }
            self.store_leaves(root, leaves);
        }
        removed
    }

    fn execute_update(
        &mut self,
        items: &[Arc<T>],
        result: &mut UpdateRowDataResult<T>,
        changed: &mut dyn ChangedRowNodes,
        nodes_to_unselect: &mut Vec<NodeHandle>,
    ) {
        for item in items {
            let Some(handle) = self.lookup_row_node(item) else {
                continue;
            };
            let selectable = self.options.is_selectable(item);
            if let Some(node) = self.arena.get_mut(handle) {
                node.update_data(Arc::clone(item));
                node.selectable = selectable;
            }
            if !selectable && self.is_selected(handle) {
                nodes_to_unselect.push(handle);
            }
            result.transaction.update.push(handle);
            changed.update(handle);
        }
    }

    fn execute_add(
        &mut self,
        root: NodeHandle,
        items: &[Arc<T>],
        requested_index: Option<f64>,
        result: &mut UpdateRowDataResult<T>,
        changed: &mut dyn ChangedRowNodes,
    ) {
        if items.is_empty() {
            return;
        }

        let mut leaves = self.take_leaves(root);
        let len = leaves.len();
        let mut add_index = len;

        if let Some(requested) = requested_index {
            add_index = sanitize_add_index(requested, len);
            // Legacy placement for path-described trees: insert after the leaf
            // currently rendered just above the requested index.
            if add_index > 0 && self.options.snaps_add_index() {
                let rendered_above = leaves.iter().position(|handle| {
                    self.arena
                        .get(*handle)
                        .is_some_and(|n| n.row_index == Some(add_index - 1))
                });
                if let Some(position) = rendered_above {
                    add_index = position + 1;
                }
            }
        }

        let new_nodes: Vec<NodeHandle> = items
            .iter()
            .enumerate()
            .map(|(offset, data)| {
                let handle = self.create_row_node(root, Arc::clone(data), add_index + offset);
                changed.add(handle);
                handle
            })
            .collect();

        if add_index < len {
            let first_after = add_index + new_nodes.len();
            for (offset, handle) in leaves[add_index..].iter().enumerate() {
                if let Some(node) = self.arena.get_mut(*handle) {
                    node.source_row_index = Some(first_after + offset);
                }
            }
            leaves.splice(add_index..add_index, new_nodes.iter().copied());
            result.rows_inserted = true;
        } else {
            leaves.extend_from_slice(&new_nodes);
        }

        self.store_leaves(root, leaves);
        result.transaction.add = new_nodes;
    }

    /// Drop removed rows from the selection, deselect rows that became
    /// unselectable, and notify once.
    fn deselect_nodes(
        &mut self,
        root: NodeHandle,
        removed: &[NodeHandle],
        removed_selected: bool,
        nodes_to_unselect: &[NodeHandle],
    ) {
        let source = SelectionSource::RowDataChanged;
        let Some(selection) = self.selection.as_mut() else {
            return;
        };
        if !removed.is_empty() {
            selection.remove_nodes(&mut self.arena, removed, source);
        }
        let selection_changed = removed_selected || !nodes_to_unselect.is_empty();
        if !nodes_to_unselect.is_empty() {
            let params = SetNodesSelectedParams::new(nodes_to_unselect, false, source).silent();
            selection.set_nodes_selected(&mut self.arena, &params);
        }

        // Even with nothing deselected, an inserted row can turn a fully
        // selected group into a partially selected one.
        selection.update_groups_from_children_selections(&mut self.arena, root, source);

        if selection_changed {
            self.events.push(GridEvent::SelectionChanged { source });
        }
    }

    // ─── Helpers ──────────────────────────────────────────────────

    fn dispatch_row_data_update_started(&mut self, first_row: Option<&Arc<T>>) {
        self.events.push(GridEvent::RowDataUpdateStarted {
            first_row: first_row.cloned(),
        });
    }

    fn is_selected(&self, handle: NodeHandle) -> bool {
        self.selection
            .as_ref()
            .is_some_and(|s| s.is_node_selected(&self.arena, handle) == Some(true))
    }

    fn create_row_node(&mut self, root: NodeHandle, data: Arc<T>, source_row_index: usize) -> NodeHandle {
        let id = self
            .options
            .row_id(&data, 0)
            .unwrap_or_else(|| self.next_id.to_string());
        let selectable = self.options.is_selectable(&data);

        let mut node = RowNode::leaf(id.clone(), data);
        node.level = 0;
        node.group = false;
        node.expanded = false;
        node.selectable = selectable;
        node.source_row_index = Some(source_row_index);

        let handle = self.arena.insert(node);
        self.arena.set_parent(handle, Some(root));

        if self.all_nodes.contains_key(&id) {
            warn!(
                node_id = %id,
                "duplicate row id; the newest row replaces the previous one in the id map"
            );
        }
        self.all_nodes.insert(id, handle);
        self.next_id += 1;
        handle
    }

    fn lookup_row_node(&self, data: &Arc<T>) -> Option<NodeHandle> {
        match self.options.row_id(data, 0) {
            Some(id) => {
                let found = self.all_nodes.get(&id).copied();
                if found.is_none() {
                    error!(row_id = %id, "could not find a row node with this id");
                }
                found
            }
            None => {
                let found = self
                    .all_leaf_children()
                    .iter()
                    .copied()
                    .find(|h| self.arena.get(*h).is_some_and(|n| n.holds(data)));
                if found.is_none() {
                    error!(
                        "could not find a row node for the data item; without a row id \
                         callback rows are matched by reference"
                    );
                }
                found
            }
        }
    }

    fn take_leaves(&mut self, root: NodeHandle) -> Vec<NodeHandle> {
        self.arena
            .get_mut(root)
            .and_then(|node| node.all_leaf_children.take())
            .unwrap_or_default()
    }

    /// Restore an unchanged leaf list.
    fn put_leaves(&mut self, root: NodeHandle, leaves: Vec<NodeHandle>) {
        if let Some(node) = self.arena.get_mut(root) {
            node.all_leaf_children = Some(leaves);
        }
    }

    /// Store a changed leaf list and mirror it to the sibling root.
    fn store_leaves(&mut self, root: NodeHandle, leaves: Vec<NodeHandle>) {
        let sibling = self.arena.get(root).and_then(|node| node.sibling);
        if let Some(sibling) = sibling.and_then(|s| self.arena.get_mut(s)) {
            sibling.all_leaf_children = Some(leaves.clone());
        }
        self.put_leaves(root, leaves);
    }

    fn sync_sibling_children(&mut self, root: NodeHandle) {
        let Some(primary) = self.arena.get(root) else {
            return;
        };
        let Some(sibling) = primary.sibling else {
            return;
        };
        let children = primary.children.clone();
        if let Some(sibling) = self.arena.get_mut(sibling) {
            sibling.children = children;
        }
    }
}

/// Clamp a requested insertion index. Negative, NaN and out-of-range values
/// append; fractions round up.
fn sanitize_add_index(requested: f64, len: usize) -> usize {
    if requested.is_nan() || requested < 0.0 || requested >= len as f64 {
        return len;
    }
    requested.ceil() as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::changed::ChangedRowNodeSet;
    use fgrid_core::RowSelectionMode;

    #[derive(Debug, PartialEq)]
    struct Row {
        id: u32,
        value: &'static str,
    }

    fn row(id: u32) -> Arc<Row> {
        Arc::new(Row { id, value: "" })
    }

    fn rows(ids: &[u32]) -> Vec<Arc<Row>> {
        ids.iter().map(|id| row(*id)).collect()
    }

    fn keyed_options() -> GridOptions<Row> {
        GridOptions::new()
            .with_row_id(|r: &Row, _| r.id.to_string())
            .with_row_selection(RowSelectionMode::Multiple)
    }

    fn manager(options: GridOptions<Row>) -> ClientSideNodeManager<Row> {
        let mut manager = ClientSideNodeManager::new(options);
        manager.activate(RowNode::root());
        manager
    }

    fn leaf_ids(manager: &ClientSideNodeManager<Row>) -> Vec<String> {
        manager
            .all_leaf_children()
            .iter()
            .map(|h| manager.node(*h).unwrap().id().to_owned())
            .collect()
    }

    fn source_indices(manager: &ClientSideNodeManager<Row>) -> Vec<Option<usize>> {
        manager
            .all_leaf_children()
            .iter()
            .map(|h| manager.node(*h).unwrap().source_row_index)
            .collect()
    }

    fn select(manager: &mut ClientSideNodeManager<Row>, ids: &[&str]) {
        let handles: Vec<NodeHandle> = ids.iter().map(|id| manager.row_node(id).unwrap()).collect();
        let params = SetNodesSelectedParams::new(&handles, true, SelectionSource::Api).silent();
        manager.set_nodes_selected(&params);
        manager.selection_mut().unwrap().take_changes();
    }

    // ─── Activation ───────────────────────────────────────────────

    #[test]
    fn activate_resets_root() {
        let mut m: ClientSideNodeManager<Row> = ClientSideNodeManager::new(keyed_options());
        let mut custom = RowNode::group("custom", None);
        custom.level = 3;
        let root = m.activate(custom);
        let node = m.node(root).unwrap();
        assert_eq!(node.id(), fgrid_core::ROOT_NODE_ID);
        assert_eq!(node.level, -1);
        assert!(node.group);
        assert!(m.all_leaf_children().is_empty());
        assert_eq!(node.children, DerivedChildren::empty());
    }

    #[test]
    fn inactive_manager_ignores_data() {
        let mut m: ClientSideNodeManager<Row> = ClientSideNodeManager::new(keyed_options());
        m.set_new_row_data(&rows(&[1]));
        assert!(m.all_leaf_children().is_empty());
        let result = m.update_row_data(
            RowDataTransaction::new().with_add(rows(&[2])),
            &mut ChangedRowNodeSet::new(),
        );
        assert!(result.transaction.is_empty());
    }

    #[test]
    fn deactivate_forgets_nodes() {
        let mut m = manager(keyed_options());
        m.set_new_row_data(&rows(&[1, 2]));
        m.deactivate();
        assert!(m.root().is_none());
        assert!(m.row_node("1").is_none());
        assert!(m.arena().is_empty());
    }

    #[test]
    fn rebinding_drops_previous_nodes() {
        let mut m = manager(keyed_options());
        m.set_new_row_data(&rows(&[1, 2]));
        let stale = m.row_node("1").unwrap();
        let root = m.activate(RowNode::root());
        assert_eq!(m.root(), Some(root));
        assert!(m.row_node("1").is_none());
        assert!(m.node(stale).is_none());
        assert_eq!(m.arena().len(), 1);

        m.deactivate();
        let root = m.activate(RowNode::root());
        assert_eq!(m.arena().len(), 1);
        assert!(m.node(root).is_some());
    }

    // ─── Full replacement ─────────────────────────────────────────

    #[test]
    fn new_row_data_builds_leaves_in_order() {
        let mut m = manager(keyed_options());
        let data = rows(&[5, 3, 9]);
        m.set_new_row_data(&data);
        assert_eq!(leaf_ids(&m), vec!["5", "3", "9"]);
        assert_eq!(source_indices(&m), vec![Some(0), Some(1), Some(2)]);
        let h = m.row_node("3").unwrap();
        assert!(m.node(h).unwrap().holds(&data[1]));
        assert_eq!(m.node(h).unwrap().parent(), m.root());

        let events = m.take_events();
        assert!(matches!(
            &events[0],
            GridEvent::RowDataUpdateStarted { first_row: Some(r) } if r.id == 5
        ));
    }

    #[test]
    fn generated_ids_restart_on_replacement() {
        let mut m = manager(GridOptions::new());
        m.set_new_row_data(&rows(&[10, 20]));
        assert_eq!(leaf_ids(&m), vec!["0", "1"]);
        m.set_new_row_data(&rows(&[30]));
        assert_eq!(leaf_ids(&m), vec!["0"]);
        assert!(m.row_node("1").is_none());
        // Old leaves are released.
        assert_eq!(m.arena().len(), 2);
    }

    #[test]
    fn new_row_data_clears_derived_children() {
        let mut m = manager(keyed_options());
        m.set_new_row_data(&rows(&[1]));
        let root = m.node(m.root().unwrap()).unwrap();
        assert_eq!(root.children, DerivedChildren::cleared());
    }

    #[test]
    fn extract_row_data_round_trips_pointers() {
        let mut m = manager(keyed_options());
        let data = rows(&[1, 2]);
        m.set_new_row_data(&data);
        let out = m.extract_row_data();
        assert!(Arc::ptr_eq(&out[0], &data[0]));
        assert!(Arc::ptr_eq(&out[1], &data[1]));
    }

    // ─── Immutable update ─────────────────────────────────────────

    #[test]
    fn unchanged_array_is_a_no_op() {
        let mut m = manager(keyed_options());
        let data = rows(&[1, 2, 3]);
        m.set_new_row_data(&data);
        let refresh = m.set_immutable_row_data(&data, &mut ChangedRowNodeSet::new());
        assert!(!refresh.row_data_updated);
        assert!(!refresh.rows_order_changed);
        assert!(refresh.transaction.is_empty());
    }

    #[test]
    fn replace_middle_row() {
        let mut m = manager(keyed_options());
        m.set_new_row_data(&rows(&[1, 2, 3]));
        let h1 = m.row_node("1").unwrap();
        let next = vec![
            m.extract_row_data()[0].clone(),
            row(4),
            m.extract_row_data()[2].clone(),
        ];
        let mut changed = ChangedRowNodeSet::new();
        let refresh = m.set_immutable_row_data(&next, &mut changed);

        assert!(refresh.row_data_updated);
        assert_eq!(refresh.transaction.removed_ids().collect::<Vec<_>>(), vec!["2"]);
        assert!(refresh.transaction.update.is_empty());
        let added: Vec<&str> = refresh
            .transaction
            .add
            .iter()
            .map(|h| m.node(*h).unwrap().id())
            .collect();
        assert_eq!(added, vec!["4"]);
        assert_eq!(leaf_ids(&m), vec!["1", "4", "3"]);
        assert_eq!(source_indices(&m), vec![Some(0), Some(1), Some(2)]);
        assert_eq!(m.row_node("1"), Some(h1));
        assert_eq!(changed.added().len(), 1);
        assert_eq!(changed.removals().len(), 1);
    }

    #[test]
    fn changed_reference_is_an_update_in_place() {
        let mut m = manager(keyed_options());
        m.set_new_row_data(&rows(&[1, 2]));
        let h2 = m.row_node("2").unwrap();
        let fresh = Arc::new(Row { id: 2, value: "new" });
        let next = vec![m.extract_row_data()[0].clone(), Arc::clone(&fresh)];
        let refresh = m.set_immutable_row_data(&next, &mut ChangedRowNodeSet::new());
        assert_eq!(refresh.transaction.update, vec![h2]);
        assert!(!refresh.rows_order_changed);
        assert_eq!(m.node(h2).unwrap().data().unwrap().value, "new");
    }

    #[test]
    fn reorder_only_flags_order_change() {
        let mut m = manager(keyed_options());
        let data = rows(&[1, 2, 3]);
        m.set_new_row_data(&data);
        let reversed: Vec<_> = data.iter().rev().cloned().collect();
        let refresh = m.set_immutable_row_data(&reversed, &mut ChangedRowNodeSet::new());
        assert!(refresh.transaction.is_empty());
        assert!(refresh.rows_order_changed);
        assert!(refresh.row_data_updated);
        assert_eq!(leaf_ids(&m), vec!["3", "2", "1"]);
        assert_eq!(source_indices(&m), vec![Some(0), Some(1), Some(2)]);
    }

    #[test]
    fn suppressed_order_keeps_previous_order() {
        let mut m = manager(keyed_options().with_suppress_maintain_unsorted_order(true));
        let data = rows(&[1, 2, 3]);
        m.set_new_row_data(&data);
        let reversed: Vec<_> = data.iter().rev().cloned().collect();
        let refresh = m.set_immutable_row_data(&reversed, &mut ChangedRowNodeSet::new());
        assert!(!refresh.rows_order_changed);
        assert_eq!(leaf_ids(&m), vec!["1", "2", "3"]);
    }

    #[test]
    fn immutable_without_id_callback_replaces() {
        let mut m = manager(GridOptions::new());
        m.set_new_row_data(&rows(&[1, 2]));
        let refresh = m.set_immutable_row_data(&rows(&[3]), &mut ChangedRowNodeSet::new());
        assert!(refresh.replaced);
        assert_eq!(leaf_ids(&m), vec!["0"]);
    }

    #[test]
    fn swap_touches_only_the_span() {
        let mut m = manager(keyed_options());
        let data = rows(&[1, 2, 3, 4, 5]);
        m.set_new_row_data(&data);
        let handles = m.all_leaf_children().to_vec();
        let swapped = vec![
            data[0].clone(),
            data[3].clone(),
            data[2].clone(),
            data[1].clone(),
            data[4].clone(),
        ];
        assert!(m.update_row_order_from_row_data(&swapped));
        assert_eq!(leaf_ids(&m), vec!["1", "4", "3", "2", "5"]);
        assert_eq!(m.all_leaf_children()[0], handles[0]);
        assert_eq!(m.all_leaf_children()[4], handles[4]);
        assert_eq!(source_indices(&m), vec![Some(0), Some(1), Some(2), Some(3), Some(4)]);
        assert!(!m.update_row_order_from_row_data(&swapped));
    }

    // ─── Transactions ─────────────────────────────────────────────

    #[test]
    fn append_without_index() {
        let mut m = manager(keyed_options());
        m.set_new_row_data(&rows(&[1, 2]));
        let result = m.update_row_data(
            RowDataTransaction::new().with_add(rows(&[3, 4])),
            &mut ChangedRowNodeSet::new(),
        );
        assert!(!result.rows_inserted);
        assert_eq!(leaf_ids(&m), vec!["1", "2", "3", "4"]);
        assert_eq!(source_indices(&m), vec![Some(0), Some(1), Some(2), Some(3)]);
    }

    #[test]
    fn insert_at_index_renumbers_followers() {
        let mut m = manager(keyed_options());
        m.set_new_row_data(&rows(&[1, 2, 3]));
        let result = m.update_row_data(
            RowDataTransaction::new().with_add(rows(&[8, 9])).with_add_index(1.0),
            &mut ChangedRowNodeSet::new(),
        );
        assert!(result.rows_inserted);
        assert_eq!(leaf_ids(&m), vec!["1", "8", "9", "2", "3"]);
        assert_eq!(
            source_indices(&m),
            vec![Some(0), Some(1), Some(2), Some(3), Some(4)]
        );
    }

    #[test]
    fn fractional_index_rounds_up() {
        let mut m = manager(keyed_options());
        m.set_new_row_data(&rows(&[1, 2, 3]));
        m.update_row_data(
            RowDataTransaction::new().with_add(rows(&[9])).with_add_index(1.5),
            &mut ChangedRowNodeSet::new(),
        );
        assert_eq!(leaf_ids(&m), vec!["1", "2", "9", "3"]);
    }

    #[test]
    fn invalid_indices_append() {
        for index in [-1.0, f64::NAN, 3.0, 99.0] {
            let mut m = manager(keyed_options());
            m.set_new_row_data(&rows(&[1, 2, 3]));
            let result = m.update_row_data(
                RowDataTransaction::new().with_add(rows(&[9])).with_add_index(index),
                &mut ChangedRowNodeSet::new(),
            );
            assert!(!result.rows_inserted, "index {index}");
            assert_eq!(leaf_ids(&m), vec!["1", "2", "3", "9"], "index {index}");
        }
    }

    #[test]
    fn tree_data_snaps_to_rendered_row() {
        let mut m = manager(keyed_options().with_tree_data(true));
        m.set_new_row_data(&rows(&[1, 2, 3, 4]));
        // Rendered order differs from source order: leaf "3" renders at row 0.
        for (id, rendered) in [("3", 0), ("1", 1), ("4", 2), ("2", 3)] {
            let h = m.row_node(id).unwrap();
            m.arena_mut().get_mut(h).unwrap().row_index = Some(rendered);
        }
        m.update_row_data(
            RowDataTransaction::new().with_add(rows(&[9])).with_add_index(1.0),
            &mut ChangedRowNodeSet::new(),
        );
        // Inserted right after leaf "3" (source position 2).
        assert_eq!(leaf_ids(&m), vec!["1", "2", "3", "9", "4"]);
    }

    #[test]
    fn remove_and_update_by_reference_without_ids() {
        let mut m = manager(GridOptions::new());
        let data = rows(&[1, 2, 3]);
        m.set_new_row_data(&data);
        let h3 = m.all_leaf_children()[2];
        let result = m.update_row_data(
            RowDataTransaction::new()
                .with_remove([data[1].clone()])
                .with_update([data[2].clone()]),
            &mut ChangedRowNodeSet::new(),
        );
        assert_eq!(result.transaction.removed_ids().collect::<Vec<_>>(), vec!["1"]);
        assert_eq!(result.transaction.update, vec![h3]);
        assert_eq!(source_indices(&m), vec![Some(0), Some(1)]);
    }

    #[test]
    fn unknown_rows_are_skipped() {
        let mut m = manager(keyed_options());
        m.set_new_row_data(&rows(&[1]));
        let result = m.update_row_data(
            RowDataTransaction::new()
                .with_remove(rows(&[7]))
                .with_update(rows(&[8])),
            &mut ChangedRowNodeSet::new(),
        );
        assert!(result.transaction.is_empty());
        assert_eq!(leaf_ids(&m), vec!["1"]);
    }

    #[test]
    fn duplicate_remove_is_reported_once() {
        let mut m = manager(GridOptions::new());
        let data = rows(&[1, 2]);
        m.set_new_row_data(&data);
        let result = m.update_row_data(
            RowDataTransaction::new().with_remove([data[0].clone(), data[0].clone()]),
            &mut ChangedRowNodeSet::new(),
        );
        assert_eq!(result.transaction.remove.len(), 1);
    }

    #[test]
    fn removed_nodes_are_released_and_cleared() {
        let mut m = manager(keyed_options());
        m.set_new_row_data(&rows(&[1, 2]));
        let h1 = m.row_node("1").unwrap();
        m.arena_mut().get_mut(h1).unwrap().row_index = Some(0);
        let result = m.update_row_data(
            RowDataTransaction::new().with_remove(rows(&[1])),
            &mut ChangedRowNodeSet::new(),
        );
        assert!(m.node(h1).is_none());
        assert!(m.row_node("1").is_none());
        let removed = &result.transaction.remove[0];
        assert_eq!(removed.row_index, None);
    }

    #[test]
    fn duplicate_generated_ids_keep_newest() {
        let mut m = manager(GridOptions::new().with_row_id(|_: &Row, _| "same".to_owned()));
        m.set_new_row_data(&rows(&[1, 2]));
        let newest = m.all_leaf_children()[1];
        assert_eq!(m.row_node("same"), Some(newest));
        assert_eq!(m.all_leaf_children().len(), 2);
    }

    // ─── Selection interplay ──────────────────────────────────────

    #[test]
    fn removing_selected_rows_notifies_once() {
        let mut m = manager(keyed_options());
        m.set_new_row_data(&rows(&[1, 2, 3]));
        select(&mut m, &["1", "2"]);
        m.take_events();

        m.update_row_data(
            RowDataTransaction::new().with_remove(rows(&[1, 2])),
            &mut ChangedRowNodeSet::new(),
        );
        let selection_events = m
            .take_events()
            .into_iter()
            .filter(GridEvent::is_selection_changed)
            .count();
        assert_eq!(selection_events, 1);
        // The collaborator was asked to stay silent.
        assert!(m.selection_mut().unwrap().take_changes().is_empty());
    }

    #[test]
    fn rows_becoming_unselectable_are_deselected() {
        let options = keyed_options().with_row_selectable(|r: &Row| r.value != "locked");
        let mut m = manager(options);
        m.set_new_row_data(&rows(&[1, 2]));
        select(&mut m, &["2"]);
        let h2 = m.row_node("2").unwrap();

        m.update_row_data(
            RowDataTransaction::new().with_update([Arc::new(Row { id: 2, value: "locked" })]),
            &mut ChangedRowNodeSet::new(),
        );
        let node = m.node(h2).unwrap();
        assert!(!node.selectable);
        assert_eq!(node.selected, Some(false));
        assert!(m.take_events().iter().any(GridEvent::is_selection_changed));
    }

    #[test]
    fn no_selection_change_no_event() {
        let mut m = manager(keyed_options());
        m.set_new_row_data(&rows(&[1]));
        m.take_events();
        m.update_row_data(
            RowDataTransaction::new().with_add(rows(&[2])),
            &mut ChangedRowNodeSet::new(),
        );
        assert!(!m.take_events().iter().any(GridEvent::is_selection_changed));
    }

    #[test]
    fn manager_without_selection_still_applies() {
        let mut m: ClientSideNodeManager<Row, NodeFlagSelection> =
            ClientSideNodeManager::without_selection(keyed_options());
        m.activate(RowNode::root());
        m.set_new_row_data(&rows(&[1, 2]));
        m.update_row_data(
            RowDataTransaction::new().with_remove(rows(&[1])),
            &mut ChangedRowNodeSet::new(),
        );
        assert_eq!(leaf_ids_generic(&m), vec!["2"]);
        assert!(m.selection().is_none());
    }

    fn leaf_ids_generic<S: RowSelection<Row>>(m: &ClientSideNodeManager<Row, S>) -> Vec<String> {
        m.all_leaf_children()
            .iter()
            .map(|h| m.node(*h).unwrap().id().to_owned())
            .collect()
    }

    // ─── Sibling root ─────────────────────────────────────────────

    #[test]
    fn sibling_mirrors_leaves() {
        let mut m = manager(keyed_options());
        let sibling = m.set_sibling(RowNode::root()).unwrap();
        m.set_new_row_data(&rows(&[1, 2]));
        m.update_row_data(
            RowDataTransaction::new()
                .with_add(rows(&[3]))
                .with_add_index(0.0)
                .with_remove(rows(&[2])),
            &mut ChangedRowNodeSet::new(),
        );
        let primary = m.all_leaf_children().to_vec();
        let mirrored = m.node(sibling).unwrap().all_leaf_children.clone().unwrap();
        assert_eq!(primary, mirrored);
        assert_eq!(leaf_ids(&m), vec!["3", "1"]);
    }

    // ─── Index sanitizing ─────────────────────────────────────────

    #[test]
    fn sanitize_add_index_rules() {
        assert_eq!(sanitize_add_index(-3.0, 5), 5);
        assert_eq!(sanitize_add_index(f64::NAN, 5), 5);
        assert_eq!(sanitize_add_index(5.0, 5), 5);
        assert_eq!(sanitize_add_index(0.0, 5), 0);
        assert_eq!(sanitize_add_index(2.1, 5), 3);
        assert_eq!(sanitize_add_index(4.5, 5), 5);
    }
}
