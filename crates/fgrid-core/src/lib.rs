#![forbid(unsafe_code)]

//! Core: row nodes, arena storage, grid options, events, and the selection
//! collaborator contract shared by the FrankenGrid engines.
//!
//! # Role in FrankenGrid
//! `fgrid-core` holds the data every other crate speaks about. The row engine
//! (`fgrid-rows`) creates and mutates [`RowNode`]s inside a [`RowArena`]; the
//! selection engines (`fgrid-selection`) read them through ids and routes.

pub mod arena;
pub mod event;
pub mod node;
pub mod options;
pub mod selection;

pub use arena::{NodeHandle, RowArena};
pub use event::{EventQueue, GridEvent, SelectionSource};
pub use node::{DerivedChildren, ROOT_NODE_ID, RowNode, StoreInfo};
pub use options::{GetRowIdFn, GridOptions, IsRowSelectableFn, RowSelectionMode};
pub use selection::{NodeFlagSelection, RowSelection, SetNodesSelectedParams};
