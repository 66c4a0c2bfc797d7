// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::model::{BuildConfig, RawBuildConfig};
use crate::errors::{HbuildError, Result};

/// Load a configuration file from a given path and return the raw
/// `RawBuildConfig`, with `[project].root` resolved against the config file's
/// directory.
///
/// This only performs TOML deserialization; it does **not** perform semantic
/// validation (module graph, install patterns). Use [`load_and_validate`] for
/// that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawBuildConfig> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|e| HbuildError::fs(path, e))?;

    let mut config: RawBuildConfig = toml::from_str(&contents)?;

    let base = config_root_dir(path);
    if config.project.root.is_relative() {
        config.project.root = base.join(&config.project.root);
    }

    Ok(config)
}

/// Load a configuration file from path and run validation.
///
/// This is the recommended entry point for the rest of the application.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<BuildConfig> {
    let raw_config = load_from_path(&path)?;
    let config = BuildConfig::try_from(raw_config)?;
    Ok(config)
}

/// `hbuild.toml` in the current working directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("hbuild.toml")
}

/// Directory relative paths in the config are resolved against.
///
/// A bare file name like `hbuild.toml` has an empty parent; in that case the
/// current working directory is used.
fn config_root_dir(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}
