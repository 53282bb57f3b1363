//! Flat selection: an ambient "select all" flag plus the ids that flip it.
//!
//! Used when selecting a group does not select its children. Every row is
//! judged on its own, so no row is ever indeterminate.

use fgrid_core::SelectionSource;
use serde_json::Value;
use tracing::{error, warn};

use crate::config::SelectionConfig;
use crate::model::SelectionRowModel;
use crate::range::{RangePartition, RangeSelectionContext};
use crate::state::{
    FlatSelectionState, FlatState, SelectionStateError, SelectionStateResult, validate_flat_value,
};
use crate::strategy::SelectionParams;

#[derive(Debug, Clone, Default)]
pub struct FlatSelectionStrategy {
    config: SelectionConfig,
    state: FlatState,
    range: RangeSelectionContext,
}

impl FlatSelectionStrategy {
    #[must_use]
    pub fn new(config: SelectionConfig) -> Self {
        Self {
            config,
            state: FlatState::default(),
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

    #[must_use]
    pub fn state(&self) -> &FlatState {
        &self.state
    }

    #[must_use]
    pub fn range_context(&self) -> &RangeSelectionContext {
        &self.range
    }

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

        let exclusive = params.clear_selection && params.new_value && !params.range_select;
        if !self.config.multi_select || exclusive {
            if params.ids.len() > 1 {
                error!(
                    count = params.ids.len(),
                    "cannot select several rows in single-select mode"
                );
                return 0;
            }
            let selectable = model.is_selectable(last);
            self.state = FlatState::default();
            if params.new_value && selectable {
                self.state.toggled.insert(last.clone());
            }
            if selectable {
                self.range.set_root(last.as_str());
            }
            return 1;
        }

        if params.range_select {
            if params.ids.len() > 1 {
                error!(
                    count = params.ids.len(),
                    "range selection targets exactly one row"
                );
                return 0;
            }
            let value = self.override_selection_value(params.new_value, params.source);
            let partition = if self.range.is_in_range(model, last) {
                self.range.truncate(model, last)
            } else {
                self.range.extend(model, last, false)
            };
            self.apply_partition(model, partition, value);
            return 1;
        }

        for id in params.ids {
            self.set_row(model, id, params.new_value);
        }
        self.range.set_root(last.as_str());
        1
    }

    fn override_selection_value(&self, new_value: bool, source: SelectionSource) -> bool {
        if !source.is_ui_event() {
            return new_value;
        }
        self.range
            .root()
            .is_none_or(|root| self.is_node_selected(root) == Some(true))
    }

    fn apply_partition<M: SelectionRowModel + ?Sized>(
        &mut self,
        model: &M,
        partition: RangePartition,
        value: bool,
    ) {
        if value {
            for id in &partition.discard {
                self.set_row(model, id, false);
            }
        }
        for id in &partition.keep {
            self.set_row(model, id, value);
        }
    }

    fn set_row<M: SelectionRowModel + ?Sized>(&mut self, model: &M, id: &str, value: bool) {
        if value == self.state.select_all || !model.is_selectable(id) {
            self.state.toggled.remove(id);
        } else {
            self.state.toggled.insert(id.to_owned());
        }
    }

    /// Drop rows that left the model. Returns whether any toggle was dropped.
    pub fn remove_rows(&mut self, ids: &[String]) -> bool {
        let mut changed = false;
        for id in ids {
            changed |= self.state.toggled.remove(id);
        }
        changed
    }

    #[must_use]
    pub fn is_node_selected(&self, id: &str) -> Option<bool> {
        Some(self.state.select_all != self.state.toggled.contains(id))
    }

    #[must_use]
    pub fn get_select_all_state(&self) -> Option<bool> {
        if self.state.toggled.is_empty() {
            Some(self.state.select_all)
        } else {
            None
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        !self.state.select_all && self.state.toggled.is_empty()
    }

    /// Known unless everything is selected.
    #[must_use]
    pub fn selection_count(&self) -> Option<usize> {
        (!self.state.select_all).then(|| self.state.toggled.len())
    }

    pub fn selected_node_ids<M: SelectionRowModel + ?Sized>(&self, model: &M) -> Vec<String> {
        if !self.state.select_all {
            return self.state.toggled.iter().cloned().collect();
        }
        warn!("listing selected rows walks every loaded row; prefer the persisted selection state");
        model
            .node_ids()
            .into_iter()
            .filter(|id| !self.state.toggled.contains(id))
            .collect()
    }

    pub fn select_all_row_nodes(&mut self) {
        self.state = FlatState {
            select_all: true,
            ..FlatState::default()
        };
        self.range.reset();
    }

    pub fn deselect_all_row_nodes(&mut self) {
        self.state = FlatState::default();
        self.range.reset();
    }

    #[must_use]
    pub fn get_selected_state(&self) -> FlatSelectionState {
        self.state.to_flat_state()
    }

    pub fn set_selected_state(&mut self, state: &FlatSelectionState) {
        self.state = FlatState::from_flat_state(state);
    }

    /// Replace the selection from an untyped JSON document. On error the
    /// previous selection is kept.
    pub fn set_selected_state_value(&mut self, value: &Value) -> SelectionStateResult<()> {
        let typed = validate_flat_value(value).and_then(|()| {
            serde_json::from_value::<FlatSelectionState>(value.clone())
                .map_err(SelectionStateError::from)
        });
        match typed {
            Ok(state) => {
                self.set_selected_state(&state);
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "rejected selection state");
                Err(e)
            }
        }
    }
}
