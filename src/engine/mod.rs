// src/engine/mod.rs

//! Optimization engine.
//!
//! [`OptimizationLoop`] drives the propose → judge → repair cycle as a
//! small synchronous state machine:
//!
//! `drafting → scoring → {accepted | plateau | repairing}`, with
//! `repairing` looping back to `scoring` and every terminal path ending in
//! `terminated`. Each transition is appended to the [`OptimizationTrace`]
//! before the state changes.

pub mod budget;
pub mod optimizer;
pub mod trace;

pub use budget::RetryBudget;
pub use optimizer::{OptimizationLoop, OptimizeResult};
pub use trace::{
    Decision, IterationRecord, LoopState, OptimizationTrace, StopReason, TRACE_SCHEMA_VERSION,
};
