#![forbid(unsafe_code)]

//! FrankenGrid public facade crate.
//!
//! Re-exports the row engine, the selection engines and the shared core types,
//! plus a prelude for day-to-day usage.

use std::fmt;

// --- Core re-exports -------------------------------------------------------

pub use fgrid_core::{
    EventQueue, GridEvent, GridOptions, NodeFlagSelection, NodeHandle, RowArena, RowNode,
    RowSelection, RowSelectionMode, SelectionSource, SetNodesSelectedParams, StoreInfo,
};

// --- Row engine re-exports -------------------------------------------------

pub use fgrid_rows::{
    ChangedRowNodeSet, ChangedRowNodes, ClientSideNodeManager, RowDataRefresh,
    RowDataTransaction, RowNodeTransaction, UpdateRowDataResult,
};

// --- Selection re-exports --------------------------------------------------

pub use fgrid_selection::{
    ArenaRowModel, FlatSelectionState, GroupSelectionState, SelectionConfig, SelectionParams,
    SelectionRowModel, SelectionService, SelectionSnapshot, SelectionStateError,
};

/// Client-side row engine whose deselections go through a
/// [`SelectionService`].
pub type ClientSideGrid<T> = ClientSideNodeManager<T, SelectionService>;

// --- Errors ---------------------------------------------------------------

/// Top-level error type for grid hosts.
#[derive(Debug)]
pub enum Error {
    /// A persisted selection was rejected.
    Selection(SelectionStateError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Selection(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Selection(err) => Some(err),
        }
    }
}

impl From<SelectionStateError> for Error {
    fn from(err: SelectionStateError) -> Self {
        Self::Selection(err)
    }
}

/// Standard result type for FrankenGrid APIs.
pub type Result<T> = std::result::Result<T, Error>;

// --- Prelude --------------------------------------------------------------

pub mod prelude {
    pub use crate::{
        ArenaRowModel, ChangedRowNodeSet, ClientSideGrid, ClientSideNodeManager, Error,
        GridEvent, GridOptions, Result, RowDataTransaction, RowNode, SelectionConfig,
        SelectionParams, SelectionService, SelectionSource,
    };

    pub use crate::{core, rows, selection};
}

pub use fgrid_core as core;
pub use fgrid_rows as rows;
pub use fgrid_selection as selection;
