// src/config/mod.rs

//! Configuration loading and validation for lessondag.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk, with env overrides (`loader.rs`).
//! - Validate ranges and cross-field rules (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_from_path, load_or_default};
pub use model::{
    ConfigFile, PlannerSection, PolicySection, ProposerSection, RawConfigFile, StoreSection,
};
