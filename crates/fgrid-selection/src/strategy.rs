//! The two selection engines behind one interface.

use fgrid_core::SelectionSource;
use serde_json::Value;
use tracing::error;

use crate::config::SelectionConfig;
use crate::flat::FlatSelectionStrategy;
use crate::group::GroupSelectsChildrenStrategy;
use crate::model::SelectionRowModel;
use crate::state::{SelectionSnapshot, SelectionStateError, SelectionStateResult};

/// A selection request expressed in row ids.
#[derive(Debug, Clone)]
pub struct SelectionParams<'a> {
    pub ids: &'a [String],
    pub new_value: bool,
    /// Treat the (single) row as the end of a shift-click range.
    pub range_select: bool,
    /// Clear all other selection before selecting.
    pub clear_selection: bool,
    /// The caller emits the change notification itself.
    pub suppress_finish_actions: bool,
    pub source: SelectionSource,
}

impl<'a> SelectionParams<'a> {
    #[must_use]
    pub fn new(ids: &'a [String], new_value: bool, source: SelectionSource) -> Self {
        Self {
            ids,
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

/// Selection engine picked by `group_selects_children`.
#[derive(Debug, Clone)]
pub enum SelectionStrategy {
    GroupSelectsChildren(GroupSelectsChildrenStrategy),
    Flat(FlatSelectionStrategy),
}

impl SelectionStrategy {
    #[must_use]
    pub fn for_config(config: SelectionConfig) -> Self {
        if config.group_selects_children {
            Self::GroupSelectsChildren(GroupSelectsChildrenStrategy::new(config))
        } else {
            Self::Flat(FlatSelectionStrategy::new(config))
        }
    }

    #[must_use]
    pub fn is_group_selects_children(&self) -> bool {
        matches!(self, Self::GroupSelectsChildren(_))
    }

    pub fn set_config(&mut self, config: SelectionConfig) {
        match self {
            Self::GroupSelectsChildren(s) => s.set_config(config),
            Self::Flat(s) => s.set_config(config),
        }
    }

    pub fn set_nodes_selected<M: SelectionRowModel + ?Sized>(
        &mut self,
        model: &M,
        params: &SelectionParams<'_>,
    ) -> usize {
        match self {
            Self::GroupSelectsChildren(s) => s.set_nodes_selected(model, params),
            Self::Flat(s) => s.set_nodes_selected(model, params),
        }
    }

    #[must_use]
    pub fn is_node_selected<M: SelectionRowModel + ?Sized>(&self, model: &M, id: &str) -> Option<bool> {
        match self {
            Self::GroupSelectsChildren(s) => s.is_node_selected(model, id),
            Self::Flat(s) => s.is_node_selected(id),
        }
    }

    #[must_use]
    pub fn get_selected_state(&self) -> SelectionSnapshot {
        match self {
            Self::GroupSelectsChildren(s) => SelectionSnapshot::Group(s.get_selected_state()),
            Self::Flat(s) => SelectionSnapshot::Flat(s.get_selected_state()),
        }
    }

    /// Replace the selection. A snapshot of the other engine's shape is
    /// rejected and the previous selection kept.
    pub fn set_selected_state(&mut self, state: &SelectionSnapshot) -> SelectionStateResult<()> {
        match (self, state) {
            (Self::GroupSelectsChildren(s), SelectionSnapshot::Group(state)) => {
                s.set_selected_state(state)
            }
            (Self::Flat(s), SelectionSnapshot::Flat(state)) => {
                s.set_selected_state(state);
                Ok(())
            }
            (Self::GroupSelectsChildren(_), SelectionSnapshot::Flat(_)) => {
                error!("rejected flat selection state while groups select children");
                Err(SelectionStateError::FlatStateForGroupStrategy)
            }
            (Self::Flat(_), SelectionSnapshot::Group(_)) => {
                error!("rejected hierarchical selection state for flat selection");
                Err(SelectionStateError::GroupStateForFlatStrategy)
            }
        }
    }

    pub fn set_selected_state_value(&mut self, value: &Value) -> SelectionStateResult<()> {
        match self {
            Self::GroupSelectsChildren(s) => s.set_selected_state_value(value),
            Self::Flat(s) => s.set_selected_state_value(value),
        }
    }

    pub fn select_all_row_nodes(&mut self) {
        match self {
            Self::GroupSelectsChildren(s) => s.select_all_row_nodes(),
            Self::Flat(s) => s.select_all_row_nodes(),
        }
    }

    pub fn deselect_all_row_nodes(&mut self) {
        match self {
            Self::GroupSelectsChildren(s) => s.deselect_all_row_nodes(),
            Self::Flat(s) => s.deselect_all_row_nodes(),
        }
    }

    #[must_use]
    pub fn get_select_all_state(&self) -> Option<bool> {
        match self {
            Self::GroupSelectsChildren(s) => s.get_select_all_state(),
            Self::Flat(s) => s.get_select_all_state(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::GroupSelectsChildren(s) => s.is_empty(),
            Self::Flat(s) => s.is_empty(),
        }
    }

    #[must_use]
    pub fn selection_count(&self) -> Option<usize> {
        match self {
            Self::GroupSelectsChildren(s) => s.selection_count(),
            Self::Flat(s) => s.selection_count(),
        }
    }

    pub fn selected_node_ids<M: SelectionRowModel + ?Sized>(&self, model: &M) -> Vec<String> {
        match self {
            Self::GroupSelectsChildren(s) => s.selected_node_ids(model),
            Self::Flat(s) => s.selected_node_ids(model),
        }
    }

    /// Drop rows under `parent_route` that left the model. Returns whether
    /// any state was dropped.
    pub fn remove_rows<M: SelectionRowModel + ?Sized>(
        &mut self,
        model: &M,
        parent_route: &[String],
        ids: &[String],
    ) -> bool {
        match self {
            Self::GroupSelectsChildren(s) => s.delete_selection_state_from_parent(model, parent_route, ids),
            Self::Flat(s) => s.remove_rows(ids),
        }
    }

    /// Clean up after the model changed. Only the hierarchical engine keeps
    /// derived state.
    pub fn on_model_updated<M: SelectionRowModel + ?Sized>(&mut self, model: &M) {
        if let Self::GroupSelectsChildren(s) = self {
            s.remove_redundant_state(model);
        }
    }
}
