// src/quality/mod.rs

//! Deterministic quality judge.
//!
//! Each rule family scores one [`Dimension`] from 100 down and emits
//! [`Diagnostic`]s. [`QualityJudge`] combines them into a weighted
//! composite and is the acceptance authority of the optimization loop.

pub mod content;
pub mod diagnostic;
pub mod judge;
pub mod learner;
pub mod rules;

pub use diagnostic::{Diagnostic, Dimension, QualityReport, Rule};
pub use judge::QualityJudge;
