#![forbid(unsafe_code)]

//! Selection for FrankenGrid: shift-click ranges, hierarchical
//! "group selects children" state, flat selection, and their persisted forms.
//!
//! # Role in FrankenGrid
//! `fgrid-selection` speaks row ids, never node handles. The engines read the
//! row tree through [`SelectionRowModel`]; [`ArenaRowModel`] adapts a
//! [`RowArena`](fgrid_core::RowArena). [`SelectionService`] owns the engine
//! picked by [`SelectionConfig`] and plugs into the row engine as its
//! [`RowSelection`](fgrid_core::RowSelection) collaborator.
//!
//! # Persisted state
//! The hierarchical engine keeps a minimal tree of toggled ids: an entry
//! exists only where a row's selection differs from what its parent implies.
//! [`GroupSelectionState`] and [`FlatSelectionState`] are the camelCase JSON
//! forms; importing either validates the whole document before replacing the
//! selection.

pub mod config;
pub mod flat;
pub mod group;
pub mod model;
pub mod range;
pub mod service;
pub mod state;
pub mod strategy;

pub use config::SelectionConfig;
pub use flat::FlatSelectionStrategy;
pub use group::GroupSelectsChildrenStrategy;
pub use model::{ArenaRowModel, SelectionRowModel};
pub use range::{RangePartition, RangeSelectionContext, RangeSource};
pub use service::SelectionService;
pub use state::{
    FlatSelectionState, FlatState, GroupSelectionState, SelectionSnapshot, SelectionState,
    SelectionStateError, SelectionStateResult,
};
pub use strategy::{SelectionParams, SelectionStrategy};
