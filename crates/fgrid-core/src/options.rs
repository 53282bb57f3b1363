//! Grid configuration consumed by the data core.

use std::fmt;
use std::sync::Arc;

/// Callback resolving a row's stable id from its data and tree level.
pub type GetRowIdFn<T> = Arc<dyn Fn(&T, i32) -> String + Send + Sync>;

/// Callback deciding whether a row may be selected.
pub type IsRowSelectableFn<T> = Arc<dyn Fn(&T) -> bool + Send + Sync>;

/// Row selection mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RowSelectionMode {
    #[default]
    Single,
    Multiple,
}

/// Options shared by the node manager and the selection collaborators.
pub struct GridOptions<T> {
    /// Row identity callback. Without it rows are identified by `Arc` pointer.
    pub get_row_id: Option<GetRowIdFn<T>>,
    /// Selectability callback. Default: every row is selectable.
    pub is_row_selectable: Option<IsRowSelectableFn<T>>,
    /// Rows form a tree supplied by the application. Default: false.
    pub tree_data: bool,
    /// The tree is described by a data-path callback. Default: false.
    pub data_path: bool,
    /// Keep the previous row order on immutable updates. Default: false.
    pub suppress_maintain_unsorted_order: bool,
    pub row_selection: RowSelectionMode,
}

impl<T> Default for GridOptions<T> {
    fn default() -> Self {
        Self {
            get_row_id: None,
            is_row_selectable: None,
            tree_data: false,
            data_path: false,
            suppress_maintain_unsorted_order: false,
            row_selection: RowSelectionMode::default(),
        }
    }
}

impl<T> Clone for GridOptions<T> {
    fn clone(&self) -> Self {
        Self {
            get_row_id: self.get_row_id.clone(),
            is_row_selectable: self.is_row_selectable.clone(),
            tree_data: self.tree_data,
            data_path: self.data_path,
            suppress_maintain_unsorted_order: self.suppress_maintain_unsorted_order,
            row_selection: self.row_selection,
        }
    }
}

impl<T> fmt::Debug for GridOptions<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GridOptions")
            .field("get_row_id", &self.get_row_id.is_some())
            .field("is_row_selectable", &self.is_row_selectable.is_some())
            .field("tree_data", &self.tree_data)
            .field("data_path", &self.data_path)
            .field(
                "suppress_maintain_unsorted_order",
                &self.suppress_maintain_unsorted_order,
            )
            .field("row_selection", &self.row_selection)
            .finish()
    }
}

impl<T> GridOptions<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Identify rows through `f(data, level)`.
    #[must_use]
    pub fn with_row_id(mut self, f: impl Fn(&T, i32) -> String + Send + Sync + 'static) -> Self {
        self.get_row_id = Some(Arc::new(f));
        self
    }

    #[must_use]
    pub fn with_row_selectable(mut self, f: impl Fn(&T) -> bool + Send + Sync + 'static) -> Self {
        self.is_row_selectable = Some(Arc::new(f));
        self
    }

    /// Enable tree data; `data_path` marks trees described by a path callback.
    #[must_use]
    pub fn with_tree_data(mut self, data_path: bool) -> Self {
        self.tree_data = true;
        self.data_path = data_path;
        self
    }

    #[must_use]
    pub fn with_suppress_maintain_unsorted_order(mut self, suppress: bool) -> Self {
        self.suppress_maintain_unsorted_order = suppress;
        self
    }

    #[must_use]
    pub fn with_row_selection(mut self, mode: RowSelectionMode) -> Self {
        self.row_selection = mode;
        self
    }

    /// Resolve the id of a row, if an id callback is configured.
    #[must_use]
    pub fn row_id(&self, data: &T, level: i32) -> Option<String> {
        self.get_row_id.as_ref().map(|f| f(data, level))
    }

    #[must_use]
    pub fn is_selectable(&self, data: &T) -> bool {
        self.is_row_selectable.as_ref().is_none_or(|f| f(data))
    }

    #[must_use]
    pub fn is_multi_select(&self) -> bool {
        self.row_selection == RowSelectionMode::Multiple
    }

    /// The legacy insertion-index snap only applies to path-described trees.
    #[must_use]
    pub fn snaps_add_index(&self) -> bool {
        self.tree_data && self.data_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Row {
        id: u32,
        locked: bool,
    }

    #[test]
    fn defaults() {
        let opts: GridOptions<Row> = GridOptions::default();
        assert!(opts.get_row_id.is_none());
        assert!(!opts.tree_data);
        assert!(!opts.is_multi_select());
        assert!(opts.is_selectable(&Row { id: 1, locked: true }));
    }

    #[test]
    fn callbacks_are_used() {
        let opts = GridOptions::new()
            .with_row_id(|r: &Row, _| r.id.to_string())
            .with_row_selectable(|r: &Row| !r.locked);
        let row = Row { id: 9, locked: true };
        assert_eq!(opts.row_id(&row, 0).as_deref(), Some("9"));
        assert!(!opts.is_selectable(&row));
    }

    #[test]
    fn snap_requires_tree_data_and_path() {
        let plain: GridOptions<Row> = GridOptions::new();
        assert!(!plain.snaps_add_index());
        assert!(!GridOptions::<Row>::new().with_tree_data(false).snaps_add_index());
        assert!(GridOptions::<Row>::new().with_tree_data(true).snaps_add_index());
    }

    #[test]
    fn debug_hides_callbacks() {
        let opts = GridOptions::new().with_row_id(|r: &Row, _| r.id.to_string());
        let text = format!("{opts:?}");
        assert!(text.contains("get_row_id: true"));
    }
}
