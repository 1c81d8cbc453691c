// src/config/mod.rs

//! Configuration loading and validation for assetflow.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate it and compile tasks into a registry (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path, project_root_of};
pub use model::{
    ConfigFile, ConfigSection, PathsSection, RawConfigFile, ServerSection, StepConfig, TaskConfig,
    TaskKind, TransformerConfig, WatchRuleConfig, WatchSection,
};
