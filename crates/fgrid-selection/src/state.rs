//! Selection state trees and their persisted forms.
//!
//! In memory the hierarchical engine keeps a [`SelectionState`] tree. It is
//! exchanged with the application as a [`GroupSelectionState`] (hierarchical)
//! or a [`FlatSelectionState`] (flat), both camelCase JSON through serde.
//!
//! # Invariants
//!
//! 1. A child entry never carries its parent's flag while having no toggled
//!    children of its own.
//! 2. Imports are atomic: a rejected document leaves the previous state in
//!    place.
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | [`SelectionStateError::NotAnObject`] | Entry is not a JSON object | Import rejected |
//! | [`SelectionStateError::RedundantState`] | Child repeats its parent | Import rejected |
//! | [`SelectionStateError::FlatStateForGroupStrategy`] | `selectAll` present | Import rejected |
//! | [`SelectionStateError::Json`] | Input is not JSON | Import rejected |

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ─────────────────────────────────────────────────────────────────────────────
// In-memory tree
// ─────────────────────────────────────────────────────────────────────────────

/// One level of the hierarchical selection tree.
///
/// `select_all_children` is the ambient flag for rows under this entry;
/// `toggled_nodes` holds the rows (by id) whose flag is flipped, each with its
/// own nested state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionState {
    pub select_all_children: bool,
    pub toggled_nodes: BTreeMap<String, SelectionState>,
}

impl SelectionState {
    #[must_use]
    pub fn new(select_all_children: bool) -> Self {
        Self {
            select_all_children,
            toggled_nodes: BTreeMap::new(),
        }
    }

    /// No ambient selection and no toggles.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        !self.select_all_children && self.toggled_nodes.is_empty()
    }

    /// Whether every entry below differs from its parent or has toggles.
    #[must_use]
    pub fn is_minimal(&self) -> bool {
        self.toggled_nodes.values().all(|child| {
            (child.select_all_children != self.select_all_children
                || !child.toggled_nodes.is_empty())
                && child.is_minimal()
        })
    }

    /// Number of entries below this one.
    #[must_use]
    pub fn entry_count(&self) -> usize {
        self.toggled_nodes
            .values()
            .map(|child| 1 + child.entry_count())
            .sum()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Persisted forms
// ─────────────────────────────────────────────────────────────────────────────

/// Persisted form of the hierarchical selection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupSelectionState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub select_all_children: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub toggled_nodes: Option<Vec<GroupSelectionState>>,
}

/// Persisted form of the flat selection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlatSelectionState {
    pub select_all: bool,
    pub toggled_nodes: Vec<String>,
}

/// Either persisted form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SelectionSnapshot {
    Flat(FlatSelectionState),
    Group(GroupSelectionState),
}

impl From<FlatSelectionState> for SelectionSnapshot {
    fn from(state: FlatSelectionState) -> Self {
        Self::Flat(state)
    }
}

impl From<GroupSelectionState> for SelectionSnapshot {
    fn from(state: GroupSelectionState) -> Self {
        Self::Group(state)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Errors
// ─────────────────────────────────────────────────────────────────────────────

/// Why a persisted selection state was rejected.
///
/// `path` fields name the offending entry as a chain of node ids, `$` being
/// the top-level entry.
#[derive(Debug)]
pub enum SelectionStateError {
    NotAnObject { path: String },
    SelectAllChildrenNotBool { path: String },
    ToggledNodesNotArray { path: String },
    /// A toggled entry lacks a string `nodeId`.
    MissingNodeId { path: String },
    /// A child entry repeats its parent's flag and has no toggles.
    RedundantState { path: String, node_id: String },
    /// Flat state handed to the hierarchical engine.
    FlatStateForGroupStrategy,
    /// Hierarchical state handed to the flat engine.
    GroupStateForFlatStrategy,
    /// `selectAll` is not a boolean.
    SelectAllNotBool,
    /// A flat `toggledNodes` entry is not a string.
    ToggledNodeNotString { index: usize },
    Json(serde_json::Error),
}

impl fmt::Display for SelectionStateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotAnObject { path } => write!(f, "selection state at {path} is not an object"),
            Self::SelectAllChildrenNotBool { path } => {
                write!(f, "selectAllChildren at {path} must be a boolean")
            }
            Self::ToggledNodesNotArray { path } => {
                write!(f, "toggledNodes at {path} must be an array")
            }
            Self::MissingNodeId { path } => {
                write!(f, "every toggled node under {path} needs a string nodeId")
            }
            Self::RedundantState { path, node_id } => write!(
                f,
                "toggled node {node_id} under {path} repeats its parent's selection"
            ),
            Self::FlatStateForGroupStrategy => write!(
                f,
                "flat selection state given while groups select children; expected nodeId/selectAllChildren/toggledNodes"
            ),
            Self::GroupStateForFlatStrategy => write!(
                f,
                "hierarchical selection state given to flat selection; expected selectAll/toggledNodes"
            ),
            Self::SelectAllNotBool => write!(f, "selectAll must be a boolean"),
            Self::ToggledNodeNotString { index } => {
                write!(f, "toggledNodes[{index}] must be a string id")
            }
            Self::Json(e) => write!(f, "invalid selection state JSON: {e}"),
        }
    }
}

impl std::error::Error for SelectionStateError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for SelectionStateError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e)
    }
}

pub type SelectionStateResult<T> = Result<T, SelectionStateError>;

// ─────────────────────────────────────────────────────────────────────────────
// Hierarchical conversion
// ─────────────────────────────────────────────────────────────────────────────

/// Which levels carry an explicit `selectAllChildren` when persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct GroupSerializeOptions {
    pub tree_data: bool,
    pub row_group_depth: usize,
}

impl SelectionState {
    /// Persisted form. Entries deeper than the grouping depth omit their flag
    /// (it is implied by being toggled) unless rows form a tree.
    pub(crate) fn to_group_state(&self, options: GroupSerializeOptions) -> GroupSelectionState {
        self.serialize_level(options, 0, None)
    }

    fn serialize_level(
        &self,
        options: GroupSerializeOptions,
        level: usize,
        node_id: Option<&str>,
    ) -> GroupSelectionState {
        let explicit = options.tree_data || level <= options.row_group_depth;
        let toggled_nodes = (!self.toggled_nodes.is_empty()).then(|| {
            self.toggled_nodes
                .iter()
                .map(|(id, child)| child.serialize_level(options, level + 1, Some(id)))
                .collect()
        });
        GroupSelectionState {
            node_id: node_id.map(str::to_owned),
            select_all_children: explicit.then_some(self.select_all_children),
            toggled_nodes,
        }
    }

    /// Rebuild a tree from its persisted form. A missing top-level flag means
    /// everything is selected; a missing nested flag means the entry flips
    /// its parent.
    pub(crate) fn from_group_state(state: &GroupSelectionState) -> SelectionStateResult<Self> {
        Self::from_group_level(state, state.select_all_children.unwrap_or(true), "$")
    }

    fn from_group_level(
        state: &GroupSelectionState,
        select_all_children: bool,
        path: &str,
    ) -> SelectionStateResult<Self> {
        let mut toggled_nodes = BTreeMap::new();
        for child in state.toggled_nodes.iter().flatten() {
            let Some(node_id) = child.node_id.as_deref() else {
                return Err(SelectionStateError::MissingNodeId {
                    path: path.to_owned(),
                });
            };
            let child_path = format!("{path}/{node_id}");
            let child_flag = child.select_all_children.unwrap_or(!select_all_children);
            let child_state = Self::from_group_level(child, child_flag, &child_path)?;
            if child_state.select_all_children == select_all_children
                && child_state.toggled_nodes.is_empty()
            {
                return Err(SelectionStateError::RedundantState {
                    path: path.to_owned(),
                    node_id: node_id.to_owned(),
                });
            }
            toggled_nodes.insert(node_id.to_owned(), child_state);
        }
        Ok(Self {
            select_all_children,
            toggled_nodes,
        })
    }
}

/// Check the raw shape of a hierarchical document before typed decoding, so
/// each shape fault gets its own error.
pub(crate) fn validate_group_value(value: &Value) -> SelectionStateResult<()> {
    let Value::Object(object) = value else {
        return Err(SelectionStateError::NotAnObject {
            path: "$".to_owned(),
        });
    };
    if object.contains_key("selectAll") {
        return Err(SelectionStateError::FlatStateForGroupStrategy);
    }
    validate_group_object(object, "$")
}

fn validate_group_object(object: &Map<String, Value>, path: &str) -> SelectionStateResult<()> {
    if object
        .get("selectAllChildren")
        .is_some_and(|flag| !flag.is_boolean())
    {
        return Err(SelectionStateError::SelectAllChildrenNotBool {
            path: path.to_owned(),
        });
    }
    let Some(toggled) = object.get("toggledNodes") else {
        return Ok(());
    };
    let Value::Array(children) = toggled else {
        return Err(SelectionStateError::ToggledNodesNotArray {
            path: path.to_owned(),
        });
    };

    let mut child_objects = Vec::with_capacity(children.len());
    for child in children {
        let id = child
            .as_object()
            .and_then(|c| c.get("nodeId").and_then(Value::as_str).map(|id| (c, id)));
        match id {
            Some(entry) => child_objects.push(entry),
            None => {
                return Err(SelectionStateError::MissingNodeId {
                    path: path.to_owned(),
                });
            }
        }
    }
    for (child, id) in child_objects {
        validate_group_object(child, &format!("{path}/{id}"))?;
    }
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Flat conversion
// ─────────────────────────────────────────────────────────────────────────────

/// In-memory flat selection: an ambient flag plus the ids that flip it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlatState {
    pub select_all: bool,
    pub toggled: BTreeSet<String>,
}

impl FlatState {
    pub(crate) fn to_flat_state(&self) -> FlatSelectionState {
        FlatSelectionState {
            select_all: self.select_all,
            toggled_nodes: self.toggled.iter().cloned().collect(),
        }
    }

    pub(crate) fn from_flat_state(state: &FlatSelectionState) -> Self {
        Self {
            select_all: state.select_all,
            toggled: state.toggled_nodes.iter().cloned().collect(),
        }
    }
}

/// Check the raw shape of a flat document.
pub(crate) fn validate_flat_value(value: &Value) -> SelectionStateResult<()> {
    let Value::Object(object) = value else {
        return Err(SelectionStateError::NotAnObject {
            path: "$".to_owned(),
        });
    };
    let Some(select_all) = object.get("selectAll") else {
        return Err(SelectionStateError::GroupStateForFlatStrategy);
    };
    if !select_all.is_boolean() {
        return Err(SelectionStateError::SelectAllNotBool);
    }
    match object.get("toggledNodes") {
        Some(Value::Array(ids)) => {
            if let Some(index) = ids.iter().position(|id| !id.is_string()) {
                return Err(SelectionStateError::ToggledNodeNotString { index });
            }
            Ok(())
        }
        _ => Err(SelectionStateError::ToggledNodesNotArray {
            path: "$".to_owned(),
        }),
    }
}
