// src/repair/mod.rs

//! Diagnostics in, typed repair actions out.
//!
//! [`RepairPlanner`] picks a bounded, ordered action list from a quality
//! report; [`RepairExecutor`] applies it, either as a deterministic edit or
//! as a single-node regeneration request to the proposer.

pub mod action;
pub mod executor;
pub mod planner;

pub use action::{ActionOutcome, AppliedAction, RepairAction, RepairKind};
pub use executor::RepairExecutor;
pub use planner::RepairPlanner;
