// src/config/mod.rs

//! Configuration loading and validation for hbuild.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate the logic-module graph and install rules (`validate.rs`).
//! - Expose the read-only [`ConfigProvider`] view (`provider.rs`).

pub mod loader;
pub mod model;
pub mod provider;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path};
pub use model::{
    BuildConfig, DepCacheSection, ExcludeRule, GenerateSection, InstallRule, LogicModuleConfig,
    ProjectSection, RawBuildConfig, ToolchainSection, WorkersSection,
};
pub use provider::{transitive_logic_dependencies, ConfigProvider};
