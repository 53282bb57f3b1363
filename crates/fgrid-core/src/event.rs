//! Grid events emitted by the data core.
//!
//! Engines never call listeners directly. They queue events in an
//! [`EventQueue`] and the host drains it after each operation, which keeps
//! every operation synchronous and run-to-completion.

use std::sync::Arc;

/// Origin of a selection change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SelectionSource {
    Api,
    CheckboxSelected,
    RowClicked,
    SpaceKey,
    UiSelectAll,
    UiSelectAllFiltered,
    UiSelectAllCurrentPage,
    RowDataChanged,
    RowGroupChanged,
    SelectableChanged,
}

impl SelectionSource {
    /// Whether the change was driven by direct user interaction.
    #[must_use]
    pub const fn is_ui_event(self) -> bool {
        matches!(
            self,
            Self::CheckboxSelected
                | Self::RowClicked
                | Self::SpaceKey
                | Self::UiSelectAll
                | Self::UiSelectAllFiltered
                | Self::UiSelectAllCurrentPage
        )
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Api => "api",
            Self::CheckboxSelected => "checkboxSelected",
            Self::RowClicked => "rowClicked",
            Self::SpaceKey => "spaceKey",
            Self::UiSelectAll => "uiSelectAll",
            Self::UiSelectAllFiltered => "uiSelectAllFiltered",
            Self::UiSelectAllCurrentPage => "uiSelectAllCurrentPage",
            Self::RowDataChanged => "rowDataChanged",
            Self::RowGroupChanged => "rowGroupChanged",
            Self::SelectableChanged => "selectableChanged",
        }
    }
}

/// An event produced by the data core.
#[derive(Debug, Clone)]
pub enum GridEvent<T> {
    /// Row data is about to change. Carries the first incoming row, if any.
    RowDataUpdateStarted { first_row: Option<Arc<T>> },
    /// The selection changed.
    SelectionChanged { source: SelectionSource },
}

impl<T> GridEvent<T> {
    #[must_use]
    pub fn is_selection_changed(&self) -> bool {
        matches!(self, Self::SelectionChanged { .. })
    }
}

/// FIFO buffer of pending events.
#[derive(Debug, Clone)]
pub struct EventQueue<E> {
    pending: Vec<E>,
}

impl<E> Default for EventQueue<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> EventQueue<E> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            pending: Vec::new(),
        }
    }

    pub fn push(&mut self, event: E) {
        self.pending.push(event);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &E> {
        self.pending.iter()
    }

    /// Take every pending event, oldest first.
    pub fn drain(&mut self) -> Vec<E> {
        std::mem::take(&mut self.pending)
    }
}
