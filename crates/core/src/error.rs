//! Core error types

use thiserror::Error;

use crate::config::ConfigError;

/// Core operation result type
pub type Result<T> = std::result::Result<T, Error>;

/// Failures that stop a whole run rather than a single file
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Invalid file pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    #[error("Invalid glob: {0}")]
    Glob(#[from] globset::Error),

    #[error("Watch error: {0}")]
    Watch(#[from] notify::Error),

    #[error("Task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
