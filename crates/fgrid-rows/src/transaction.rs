//! Row data transactions and their node-level results.

use std::fmt;
use std::sync::Arc;

use fgrid_core::{NodeHandle, RowNode};

/// A batch of row data changes, expressed in application rows.
///
/// Rows in `remove` and `update` are matched to nodes by id when an id
/// callback is configured, otherwise by `Arc` pointer.
pub struct RowDataTransaction<T> {
    pub add: Vec<Arc<T>>,
    pub remove: Vec<Arc<T>>,
    pub update: Vec<Arc<T>>,
    /// Insertion position for `add`. Fractions round up; negative, NaN and
    /// out-of-range values append.
    pub add_index: Option<f64>,
}

impl<T> Default for RowDataTransaction<T> {
    fn default() -> Self {
        Self {
            add: Vec::new(),
            remove: Vec::new(),
            update: Vec::new(),
            add_index: None,
        }
    }
}

impl<T> Clone for RowDataTransaction<T> {
    fn clone(&self) -> Self {
        Self {
            add: self.add.clone(),
            remove: self.remove.clone(),
            update: self.update.clone(),
            add_index: self.add_index,
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for RowDataTransaction<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RowDataTransaction")
            .field("add", &self.add)
            .field("remove", &self.remove)
            .field("update", &self.update)
            .field("add_index", &self.add_index)
            .finish()
    }
}

impl<T> RowDataTransaction<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_add(mut self, rows: impl IntoIterator<Item = Arc<T>>) -> Self {
        self.add.extend(rows);
        self
    }

    #[must_use]
    pub fn with_remove(mut self, rows: impl IntoIterator<Item = Arc<T>>) -> Self {
        self.remove.extend(rows);
        self
    }

    #[must_use]
    pub fn with_update(mut self, rows: impl IntoIterator<Item = Arc<T>>) -> Self {
        self.update.extend(rows);
        self
    }

    #[must_use]
    pub fn with_add_index(mut self, index: f64) -> Self {
        self.add_index = Some(index);
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.add.is_empty() && self.remove.is_empty() && self.update.is_empty()
    }
}

/// The nodes touched by an applied transaction.
///
/// Added and updated nodes are still live in the arena; removed nodes have
/// been released and are handed back by value.
#[derive(Debug)]
pub struct RowNodeTransaction<T> {
    pub add: Vec<NodeHandle>,
    pub update: Vec<NodeHandle>,
    pub remove: Vec<RowNode<T>>,
}

impl<T> Default for RowNodeTransaction<T> {
    fn default() -> Self {
        Self {
            add: Vec::new(),
            update: Vec::new(),
            remove: Vec::new(),
        }
    }
}

impl<T> RowNodeTransaction<T> {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.add.is_empty() && self.update.is_empty() && self.remove.is_empty()
    }

    /// Ids of the removed nodes, in removal order.
    pub fn removed_ids(&self) -> impl Iterator<Item = &str> {
        self.remove.iter().map(RowNode::id)
    }
}

/// Result of [`update_row_data`](crate::ClientSideNodeManager::update_row_data).
#[derive(Debug)]
pub struct UpdateRowDataResult<T> {
    pub transaction: RowNodeTransaction<T>,
    /// Rows were inserted before the end rather than appended.
    pub rows_inserted: bool,
}

impl<T> Default for UpdateRowDataResult<T> {
    fn default() -> Self {
        Self {
            transaction: RowNodeTransaction::default(),
            rows_inserted: false,
        }
    }
}

/// Result of a row data refresh through
/// [`set_immutable_row_data`](crate::ClientSideNodeManager::set_immutable_row_data).
#[derive(Debug)]
pub struct RowDataRefresh<T> {
    /// Anything changed; downstream stages must regroup.
    pub row_data_updated: bool,
    /// Leaf order changed through insertion or reordering.
    pub rows_order_changed: bool,
    /// The whole data set was replaced instead of diffed.
    pub replaced: bool,
    pub transaction: RowNodeTransaction<T>,
}
