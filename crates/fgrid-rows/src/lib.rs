#![forbid(unsafe_code)]

//! Client-side row engine for FrankenGrid.
//!
//! # Role in FrankenGrid
//! `fgrid-rows` turns the application's row array into [`RowNode`]s under a
//! root and keeps them reconciled as data changes. Downstream stages (grouping,
//! filtering, sorting) consume the root's leaf list and the
//! [`ChangedRowNodes`] collected during a transaction.
//!
//! [`RowNode`]: fgrid_core::RowNode

pub mod changed;
pub mod node_manager;
pub mod transaction;

pub use changed::{ChangedRowNodeSet, ChangedRowNodes};
pub use node_manager::ClientSideNodeManager;
pub use transaction::{RowDataRefresh, RowDataTransaction, RowNodeTransaction, UpdateRowDataResult};
