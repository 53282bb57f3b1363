//! Selection service: owns the configured engine and reports changes.
//!
//! The service is also the [`RowSelection`] collaborator of the row engine,
//! so rows removed or made unselectable by a data change leave the selection
//! under one notification. Removed rows drop their id-keyed entries rather
//! than being recorded as deselected.

use std::collections::BTreeMap;

use fgrid_core::{EventQueue, NodeHandle, RowArena, RowSelection, SelectionSource, SetNodesSelectedParams};
use serde_json::Value;
use tracing::{debug, error};

use crate::config::SelectionConfig;
use crate::model::{ArenaRowModel, SelectionRowModel};
use crate::state::{SelectionSnapshot, SelectionStateResult};
use crate::strategy::{SelectionParams, SelectionStrategy};

/// Selection front door for a grid.
#[derive(Debug, Clone)]
pub struct SelectionService {
    config: SelectionConfig,
    strategy: SelectionStrategy,
    changes: EventQueue<SelectionSource>,
}

impl Default for SelectionService {
    fn default() -> Self {
        Self::new(SelectionConfig::default())
    }
}

impl SelectionService {
    #[must_use]
    pub fn new(config: SelectionConfig) -> Self {
        Self {
            config,
            strategy: SelectionStrategy::for_config(config),
            changes: EventQueue::new(),
        }
    }

    #[must_use]
    pub fn config(&self) -> &SelectionConfig {
        &self.config
    }

    /// Apply new configuration. Switching `group_selects_children` swaps
    /// engines and starts from an empty selection.
    pub fn set_config(&mut self, config: SelectionConfig) {
        let swap = config.group_selects_children != self.config.group_selects_children;
        self.config = config;
        if swap {
            let had_selection = !self.strategy.is_empty();
            self.strategy = SelectionStrategy::for_config(config);
            if had_selection {
                self.changes.push(SelectionSource::Api);
            }
        } else {
            self.strategy.set_config(config);
        }
    }

    #[must_use]
    pub fn strategy(&self) -> &SelectionStrategy {
        &self.strategy
    }

    pub fn strategy_mut(&mut self) -> &mut SelectionStrategy {
        &mut self.strategy
    }

    /// Sources of selection changes since the last call, oldest first.
    pub fn take_changes(&mut self) -> Vec<SelectionSource> {
        self.changes.drain()
    }

    // ─── Selecting ────────────────────────────────────────────────

    pub fn set_nodes_selected<M: SelectionRowModel + ?Sized>(
        &mut self,
        model: &M,
        params: &SelectionParams<'_>,
    ) -> usize {
        let applied = self.strategy.set_nodes_selected(model, params);
        if applied > 0 && !params.suppress_finish_actions {
            self.changes.push(params.source);
        }
        applied
    }

    #[must_use]
    pub fn is_node_selected<M: SelectionRowModel + ?Sized>(&self, model: &M, id: &str) -> Option<bool> {
        self.strategy.is_node_selected(model, id)
    }

    pub fn select_all_row_nodes(&mut self, source: SelectionSource) {
        self.strategy.select_all_row_nodes();
        self.changes.push(source);
    }

    pub fn deselect_all_row_nodes(&mut self, source: SelectionSource) {
        self.strategy.deselect_all_row_nodes();
        self.changes.push(source);
    }

    /// Drop the whole selection.
    pub fn reset(&mut self, source: SelectionSource) {
        debug!(source = source.as_str(), "selection reset");
        self.deselect_all_row_nodes(source);
    }

    #[must_use]
    pub fn get_select_all_state(&self) -> Option<bool> {
        self.strategy.get_select_all_state()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.strategy.is_empty()
    }

    #[must_use]
    pub fn selection_count(&self) -> Option<usize> {
        self.strategy.selection_count()
    }

    pub fn selected_node_ids<M: SelectionRowModel + ?Sized>(&self, model: &M) -> Vec<String> {
        self.strategy.selected_node_ids(model)
    }

    // ─── Persistence ──────────────────────────────────────────────

    #[must_use]
    pub fn get_selected_state(&self) -> SelectionSnapshot {
        self.strategy.get_selected_state()
    }

    pub fn set_selected_state(&mut self, state: &SelectionSnapshot) -> SelectionStateResult<()> {
        self.strategy.set_selected_state(state)?;
        self.changes.push(SelectionSource::Api);
        Ok(())
    }

    pub fn set_selected_state_value(&mut self, value: &Value) -> SelectionStateResult<()> {
        self.strategy.set_selected_state_value(value)?;
        self.changes.push(SelectionSource::Api);
        Ok(())
    }

    pub fn set_selected_state_json(&mut self, json: &str) -> SelectionStateResult<()> {
        let value: Value = serde_json::from_str(json).map_err(|e| {
            error!(error = %e, "rejected selection state");
            e
        })?;
        self.set_selected_state_value(&value)
    }

    // ─── Model lifecycle ──────────────────────────────────────────

    /// A store may have finished loading, making collapsed states possible.
    pub fn on_model_updated<M: SelectionRowModel + ?Sized>(&mut self, model: &M) {
        self.strategy.on_model_updated(model);
    }

    /// Grouping changed: ids no longer describe the same tree.
    pub fn on_row_group_changed(&mut self, row_group_depth: usize) {
        self.config.row_group_depth = row_group_depth;
        self.strategy.set_config(self.config);
        self.reset(SelectionSource::RowGroupChanged);
    }
}

impl<T> RowSelection<T> for SelectionService {
    fn is_node_selected(&self, arena: &RowArena<T>, node: NodeHandle) -> Option<bool> {
        let id = arena.get(node)?.id();
        let model = ArenaRowModel::containing(arena, node);
        self.strategy.is_node_selected(&model, id)
    }

    fn set_nodes_selected(
        &mut self,
        arena: &mut RowArena<T>,
        params: &SetNodesSelectedParams<'_>,
    ) -> usize {
        let Some(first) = params.nodes.first() else {
            return 0;
        };
        let arena: &RowArena<T> = arena;
        let ids: Vec<String> = params
            .nodes
            .iter()
            .filter_map(|h| arena.get(*h).map(|n| n.id().to_owned()))
            .collect();
        let model = ArenaRowModel::containing(arena, *first);
        let request = SelectionParams {
            ids: &ids,
            new_value: params.new_value,
            range_select: params.range_select,
            clear_selection: params.clear_selection,
            suppress_finish_actions: params.suppress_finish_actions,
            source: params.source,
        };
        SelectionService::set_nodes_selected(self, &model, &request)
    }

    fn remove_nodes(
        &mut self,
        arena: &mut RowArena<T>,
        nodes: &[NodeHandle],
        _source: SelectionSource,
    ) -> usize {
        let Some(first) = nodes.first() else {
            return 0;
        };
        let arena: &RowArena<T> = arena;
        // Removed rows grouped by the id route of their parent.
        let mut by_parent: BTreeMap<Vec<String>, Vec<String>> = BTreeMap::new();
        for handle in nodes {
            let Some(node) = arena.get(*handle) else {
                continue;
            };
            let mut route: Vec<String> = arena
                .route_to(*handle)
                .into_iter()
                .filter_map(|h| arena.get(h).map(|n| n.id().to_owned()))
                .collect();
            route.pop();
            by_parent.entry(route).or_default().push(node.id().to_owned());
        }
        let model = ArenaRowModel::containing(arena, *first);
        let mut dropped = 0;
        for (parent_route, ids) in &by_parent {
            if self.strategy.remove_rows(&model, parent_route, ids) {
                dropped += 1;
            }
        }
        debug!(rows = nodes.len(), dropped, "removed rows left the selection");
        dropped
    }
}
