// src/dag/mod.rs

//! Curriculum graph and the planner built on it.
//!
//! - [`graph`] wraps the prerequisite relation in a petgraph graph and
//!   checks structural invariants.
//! - [`order`] computes topological order and critical path.
//! - [`plan`] packs nodes into a bounded weekly schedule.
//! - [`diff`] compares two curriculum versions.

pub mod diff;
pub mod graph;
pub mod order;
pub mod plan;

pub use diff::{compute_diff, DiffReport};
pub use graph::{ensure_valid, validate, CurriculumGraph, StructuralViolation};
pub use order::{critical_path, topological_order};
pub use plan::{build_plan, Plan, WeekPlan};
