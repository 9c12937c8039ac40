//! # Rendering Error Types

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by a display backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DisplayError {
    /// The display could not be opened. Fatal to `start()`.
    #[error("display initialization failed: {0}")]
    Init(String),

    /// A frame could not be presented.
    #[error("present failed: {0}")]
    Present(String),

    /// The display was closed underneath the loop.
    #[error("display closed")]
    Closed,
}

/// Errors raised while loading or validating a [`RendererConfig`](crate::RendererConfig).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("cannot read {path}: {reason}")]
    Io {
        /// File that failed.
        path: PathBuf,
        /// OS error text.
        reason: String,
    },

    /// The TOML was malformed or had the wrong shape.
    #[error("invalid config TOML: {0}")]
    Parse(String),

    /// A value is out of range.
    #[error("invalid config value: {0}")]
    Invalid(String),
}

/// Errors returned by [`ThreadedRenderer`](crate::ThreadedRenderer) operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RendererError {
    /// `start()` was called while the loop thread is running.
    #[error("renderer is already running")]
    AlreadyRunning,

    /// The display backend failed.
    #[error(transparent)]
    Display(#[from] DisplayError),

    /// A configuration value was rejected.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The OS refused to spawn the render thread.
    #[error("failed to spawn render thread: {0}")]
    ThreadSpawn(String),
}

/// Result type for renderer operations.
pub type RendererResult<T> = Result<T, RendererError>;
