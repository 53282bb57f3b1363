//! Selection configuration.

use serde::{Deserialize, Serialize};

/// Configuration for [`SelectionService`](crate::SelectionService) and the
/// strategies it owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    /// Selecting a group selects everything below it. Picks the hierarchical
    /// strategy. Default: false.
    pub group_selects_children: bool,

    /// More than one row may be selected. Default: false.
    pub multi_select: bool,

    /// Rows form an application-supplied tree; every persisted level carries
    /// its flag. Default: false.
    pub tree_data: bool,

    /// Number of active row-group levels. Persisted entries up to this depth
    /// carry an explicit flag. Default: 0.
    pub row_group_depth: usize,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            group_selects_children: false,
            multi_select: false,
            tree_data: false,
            row_group_depth: 0,
        }
    }
}

impl SelectionConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_group_selects_children(mut self, enabled: bool) -> Self {
        self.group_selects_children = enabled;
        self
    }

    #[must_use]
    pub fn with_multi_select(mut self, enabled: bool) -> Self {
        self.multi_select = enabled;
        self
    }

    #[must_use]
    pub fn with_tree_data(mut self, enabled: bool) -> Self {
        self.tree_data = enabled;
        self
    }

    #[must_use]
    pub fn with_row_group_depth(mut self, depth: usize) -> Self {
        self.row_group_depth = depth;
        self
    }
}
