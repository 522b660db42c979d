//! Error types for the server's load path and control client.

use std::io;

use dialscope_core::BuildError;
use thiserror::Error;

/// Errors raised while loading a table from CSV files.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("unknown table id: {0}")]
    UnknownTable(String),

    #[error("unknown DNO granularity: {0}")]
    BadGranularity(String),

    #[error("reload of {0} requires a path")]
    MissingPath(String),

    #[error("reload of dno requires a files list")]
    MissingFiles,

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Errors raised by [`crate::client::ControlClient`].
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("malformed response: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("server error {error}: {message}")]
    Server { error: String, message: String },

    #[error("connection closed by server")]
    Disconnected,
}
