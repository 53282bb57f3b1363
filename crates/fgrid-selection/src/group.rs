//! Hierarchical selection where selecting a group selects everything below it.
//!
//! Selection is not stored per row. The engine keeps a [`SelectionState`]
//! tree: each entry carries the ambient flag for the rows beneath it, and
//! overrides live only where a row differs from its parent. Selecting a whole
//! group of a million lazily loaded rows is one entry.
//!
//! A row's selected flag is found by walking its route (top-level ancestor
//! down to the row) through the tree, stopping at the deepest entry that
//! exists.
//!
//! # Invariants
//!
//! 1. After every public operation the tree is minimal: no entry repeats its
//!    parent's flag while having no toggles of its own.
//! 2. Unselectable rows never have an entry.
//! 3. A group whose own entry has nested toggles is indeterminate.
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | Range call with several rows | Caller error | Logged; returns 0 |
//! | Several rows in single-select | Caller error | Logged; returns 0 |
//! | Unknown row id | Row not in the model | Logged; row skipped |
//! | Invalid persisted state | Corrupt or foreign document | Logged; `Err`; state kept |

use std::cmp::Reverse;
use std::collections::HashSet;

use fgrid_core::SelectionSource;
use serde_json::Value;
use tracing::{debug, error, warn};

use crate::config::SelectionConfig;
use crate::model::SelectionRowModel;
use crate::range::{RangePartition, RangeSelectionContext};
use crate::state::{
    GroupSelectionState, GroupSerializeOptions, SelectionState, SelectionStateError,
    SelectionStateResult, validate_group_value,
};
use crate::strategy::SelectionParams;

/// Selection engine for `group_selects_children` grids.
#[derive(Debug, Clone, Default)]
pub struct GroupSelectsChildrenStrategy {
    config: SelectionConfig,
    state: SelectionState,
    range: RangeSelectionContext,
}

impl GroupSelectsChildrenStrategy {
    #[must_use]
    pub fn new(config: SelectionConfig) -> Self {
        Self {
            config,
            state: SelectionState::default(),
            range: RangeSelectionContext::new(),
        }
    }

    #[must_use]
    pub fn config(&self) -> &SelectionConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: SelectionConfig) {
        self.config = config;
    }

    /// The live selection tree.
    #[must_use]
    pub fn state(&self) -> &SelectionState {
        &self.state
    }

    #[must_use]
    pub fn range_context(&self) -> &RangeSelectionContext {
        &self.range
    }

    // ─── Selecting ────────────────────────────────────────────────

    /// Apply a selection request. Returns 1 when applied, 0 when rejected or
    /// empty.
    pub fn set_nodes_selected<M: SelectionRowModel + ?Sized>(
        &mut self,
        model: &M,
        params: &SelectionParams<'_>,
    ) -> usize {
        let Some(last) = params.ids.last() else {
            return 0;
        };

        if params.range_select {
            if params.ids.len() > 1 {
                error!(
                    count = params.ids.len(),
                    "range selection targets exactly one row"
                );
                return 0;
            }
            let value = self.override_selection_value(model, params.new_value, params.source);
            if self.range.is_in_range(model, last) {
                let partition = self.range.truncate(model, last);
                self.apply_partition(model, partition, value);
            } else if self.range.root() != Some(last.as_str()) {
                let partition = self.range.extend(model, last, true);
                self.apply_partition(model, partition, value);
            }
            return 1;
        }

        let exclusive = params.clear_selection && params.new_value;
        if !self.config.multi_select || exclusive {
            if params.ids.len() > 1 {
                error!(
                    count = params.ids.len(),
                    "cannot select several rows in single-select mode"
                );
                return 0;
            }
            self.deselect_all_row_nodes();
        }

        for id in params.ids {
            match model.route_to(id) {
                Some(route) => Self::select_route(model, &route, &mut self.state, params.new_value),
                None => warn!(row_id = %id, "cannot select unknown row"),
            }
        }
        self.remove_redundant_state(model);
        self.range.set_root(last.as_str());
        1
    }

    /// UI-driven range clicks take their value from the anchor row.
    fn override_selection_value<M: SelectionRowModel + ?Sized>(
        &self,
        model: &M,
        new_value: bool,
        source: SelectionSource,
    ) -> bool {
        if !source.is_ui_event() {
            return new_value;
        }
        match self.range.root() {
            Some(root) if model.exists(root) => {
                self.is_node_selected(model, root).unwrap_or(false)
            }
            _ => true,
        }
    }

    fn apply_partition<M: SelectionRowModel + ?Sized>(
        &mut self,
        model: &M,
        partition: RangePartition,
        value: bool,
    ) {
        // Selecting shrinks the old range; deselecting leaves rows outside
        // the new range alone.
        if value {
            self.select_range(model, &partition.discard, false);
        }
        self.select_range(model, &partition.keep, value);
    }

    /// Set `value` on every row in `ids`, deepest routes first. A route whose
    /// row was already covered by a deeper route is skipped.
    pub fn select_range<M: SelectionRowModel + ?Sized>(
        &mut self,
        model: &M,
        ids: &[String],
        value: bool,
    ) {
        let mut routes: Vec<Vec<String>> = ids.iter().filter_map(|id| model.route_to(id)).collect();
        routes.sort_by_key(|route| Reverse(route.len()));

        let mut seen: HashSet<String> = HashSet::new();
        for route in &routes {
            let Some(last) = route.last() else {
                continue;
            };
            if seen.contains(last) {
                continue;
            }
            seen.extend(route.iter().cloned());
            Self::select_route(model, route, &mut self.state, value);
        }
        self.remove_redundant_state(model);
    }

    fn select_route<M: SelectionRowModel + ?Sized>(
        model: &M,
        route: &[String],
        state: &mut SelectionState,
        value: bool,
    ) {
        let Some((next, rest)) = route.split_first() else {
            return;
        };

        if rest.is_empty() {
            if state.select_all_children == value || !model.is_selectable(next) {
                state.toggled_nodes.remove(next);
            } else {
                state
                    .toggled_nodes
                    .insert(next.clone(), SelectionState::new(value));
            }
            return;
        }

        let ambient = state.select_all_children;
        let child = state
            .toggled_nodes
            .entry(next.clone())
            .or_insert_with(|| SelectionState::new(ambient));
        Self::select_route(model, rest, child, value);
        if child.select_all_children == ambient && child.toggled_nodes.is_empty() {
            state.toggled_nodes.remove(next);
        }
    }

    // ─── Queries ──────────────────────────────────────────────────

    /// Selected flag of a row; `None` while a group is partially selected.
    #[must_use]
    pub fn is_node_selected<M: SelectionRowModel + ?Sized>(&self, model: &M, id: &str) -> Option<bool> {
        let Some(route) = model.route_to(id) else {
            return Some(false);
        };
        Self::is_route_selected(model, &route, &self.state)
    }

    fn is_route_selected<M: SelectionRowModel + ?Sized>(
        model: &M,
        route: &[String],
        state: &SelectionState,
    ) -> Option<bool> {
        let Some((next, rest)) = route.split_first() else {
            return Some(state.select_all_children);
        };
        let own = state.toggled_nodes.get(next);

        if rest.is_empty() {
            if model.has_children(next) && own.is_some_and(|s| !s.toggled_nodes.is_empty()) {
                return None;
            }
            return Some(state.select_all_children != own.is_some());
        }

        match own {
            Some(child) => Self::is_route_selected(model, rest, child),
            None => Some(state.select_all_children),
        }
    }

    /// Ambient flag for the rows directly beneath `id`.
    #[must_use]
    pub fn select_all_children_at<M: SelectionRowModel + ?Sized>(&self, model: &M, id: &str) -> bool {
        let mut state = &self.state;
        for step in model.route_to(id).unwrap_or_default() {
            match state.toggled_nodes.get(&step) {
                Some(child) => state = child,
                None => break,
            }
        }
        state.select_all_children
    }

    /// `Some(true)` all, `Some(false)` none, `None` some.
    #[must_use]
    pub fn get_select_all_state(&self) -> Option<bool> {
        if self.state.toggled_nodes.is_empty() {
            Some(self.state.select_all_children)
        } else {
            None
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.is_empty()
    }

    /// Unknown: the tree does not enumerate rows that were never loaded.
    #[must_use]
    pub fn selection_count(&self) -> Option<usize> {
        None
    }

    /// Ids of every loaded row that reads as selected.
    pub fn selected_node_ids<M: SelectionRowModel + ?Sized>(&self, model: &M) -> Vec<String> {
        warn!("listing selected rows walks every loaded row; prefer the persisted selection state");
        model
            .node_ids()
            .into_iter()
            .filter(|id| self.is_node_selected(model, id) == Some(true))
            .collect()
    }

    /// Rows are tracked by id, so a recreated row needs no bookkeeping.
    pub fn process_new_row(&mut self, _id: &str) {}

    // ─── Bulk ─────────────────────────────────────────────────────

    pub fn select_all_row_nodes(&mut self) {
        self.state = SelectionState::new(true);
        self.range.reset();
    }

    pub fn deselect_all_row_nodes(&mut self) {
        self.state = SelectionState::new(false);
        self.range.reset();
    }

    // ─── Cleanup ──────────────────────────────────────────────────

    /// Restore minimality. Groups whose every child is toggled (and whose
    /// child count is final) flip their own flag instead. Skipped while a
    /// filter hides rows.
    pub fn remove_redundant_state<M: SelectionRowModel + ?Sized>(&mut self, model: &M) {
        if model.is_filter_present() {
            return;
        }
        Self::clean_children(model, &mut self.state);
    }

    fn clean_children<M: SelectionRowModel + ?Sized>(model: &M, state: &mut SelectionState) {
        let parent_flag = state.select_all_children;
        let keys: Vec<String> = state.toggled_nodes.keys().cloned().collect();
        for key in keys {
            let Some(child) = state.toggled_nodes.get_mut(&key) else {
                continue;
            };
            Self::clean_children(model, child);
            Self::collapse_if_fully_toggled(model, &key, child);
            if child.toggled_nodes.is_empty() && child.select_all_children == parent_flag {
                state.toggled_nodes.remove(&key);
            }
        }
    }

    fn collapse_if_fully_toggled<M: SelectionRowModel + ?Sized>(
        model: &M,
        id: &str,
        state: &mut SelectionState,
    ) {
        let Some(count) = model.known_child_count(id) else {
            return;
        };
        // Stale entries can make the toggle count exceed the child count.
        if state.toggled_nodes.is_empty() || state.toggled_nodes.len() < count {
            return;
        }
        let all_plain_and_present = state
            .toggled_nodes
            .iter()
            .all(|(child_id, child)| child.toggled_nodes.is_empty() && model.exists(child_id));
        if all_plain_and_present {
            debug!(row_id = %id, children = count, "every child toggled; flipping group flag");
            state.select_all_children = !state.select_all_children;
            state.toggled_nodes.clear();
        }
    }

    /// Drop the entries of removed children under the row at `parent_route`
    /// (top-level ancestor first; empty for top-level rows). Returns whether
    /// anything was dropped.
    pub fn delete_selection_state_from_parent<M: SelectionRowModel + ?Sized>(
        &mut self,
        model: &M,
        parent_route: &[String],
        removed_ids: &[String],
    ) -> bool {
        let mut state = &mut self.state;
        for step in parent_route {
            match state.toggled_nodes.get_mut(step) {
                Some(child) => state = child,
                None => return false,
            }
        }

        let mut changed = false;
        for id in removed_ids {
            changed |= state.toggled_nodes.remove(id).is_some();
        }
        if changed {
            self.remove_redundant_state(model);
        }
        changed
    }

    // ─── Persistence ──────────────────────────────────────────────

    #[must_use]
    pub fn get_selected_state(&self) -> GroupSelectionState {
        self.state.to_group_state(GroupSerializeOptions {
            tree_data: self.config.tree_data,
            row_group_depth: self.config.row_group_depth,
        })
    }

    /// Replace the selection. On error the previous selection is kept.
    pub fn set_selected_state(&mut self, state: &GroupSelectionState) -> SelectionStateResult<()> {
        match SelectionState::from_group_state(state) {
            Ok(next) => {
                self.state = next;
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "rejected selection state");
                Err(e)
            }
        }
    }

    /// Replace the selection from an untyped JSON document, checking its
    /// shape first. On error the previous selection is kept.
    pub fn set_selected_state_value(&mut self, value: &Value) -> SelectionStateResult<()> {
        let typed = validate_group_value(value).and_then(|()| {
            serde_json::from_value::<GroupSelectionState>(value.clone())
                .map_err(SelectionStateError::from)
        });
        match typed {
            Ok(state) => self.set_selected_state(&state),
            Err(e) => {
                error!(error = %e, "rejected selection state");
                Err(e)
            }
        }
    }
}
