//! Error types for builder, ingest, and query operations.

use std::io;
use thiserror::Error;

use crate::registry::TableId;

/// Errors raised while building a table version from rows or CSV.
///
/// Any of these aborts the build in progress; the currently published
/// version of the table is never affected.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("duplicate key: {0}")]
    DuplicateKey(u64),

    #[error("row count would exceed {} rows", crate::reverse::MAX_ROWS)]
    Overflow,

    #[error("line {line}: unexpected column count ({got})")]
    BadColumns { line: u64, got: usize },

    #[error("line {line}: unparseable numeric field {value:?}")]
    BadField { line: u64, value: String },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Errors raised on the query path.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("table not loaded: {0}")]
    NotAvailable(TableId),
}

pub type Result<T> = std::result::Result<T, BuildError>;
