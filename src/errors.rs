// src/errors.rs

//! Crate-wide error type and result alias.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum HbuildError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Path not found: {0}")]
    PathNotFound(String),

    #[error("External tool failed with exit code {code}: {command}")]
    ExternalTool { command: String, code: i32 },

    #[error("Filesystem error at {path:?}: {source}")]
    FileSystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl HbuildError {
    /// Wrap an IO error with the path it happened on.
    pub fn fs(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        HbuildError::FileSystem {
            path: path.into(),
            source,
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        HbuildError::Config(msg.into())
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, HbuildError>;
