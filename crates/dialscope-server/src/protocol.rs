//! Control wire protocol: JSON-over-newlines request/response types.
//!
//! Each request is a single JSON line; each response is a single JSON
//! line.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A request from a control client.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Request {
    /// Rebuild one table from CSV and publish it. Every table except
    /// `dno` takes `path`; `dno` takes `files`, one per granularity.
    Reload {
        table: String,
        #[serde(default)]
        path: Option<String>,
        #[serde(default)]
        files: Vec<DnoFile>,
    },
    Status,
    Meta {
        table: String,
    },
    Ping,
}

/// One DNO input file and the dictionary it populates
/// (`full`, `npa`, `npa_nxx`, or `npa_nxx_x`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DnoFile {
    pub path: String,
    pub granularity: String,
}

/// A response sent back to the client.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum Response {
    Ok(OkResponse),
    Error(ErrorResponse),
}

/// Successful response variants.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum OkResponse {
    Reloaded {
        ok: bool,
        table: String,
        rows: usize,
    },
    Status {
        ok: bool,
        tables: Vec<TableStatus>,
    },
    Meta {
        ok: bool,
        table: String,
        meta: Value,
    },
    Pong {
        ok: bool,
    },
}

/// Per-table entry in a status response.
#[derive(Debug, Serialize, Deserialize)]
pub struct TableStatus {
    pub table: String,
    pub available: bool,
    pub rows: usize,
}

/// Error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl Response {
    pub fn reloaded(table: impl Into<String>, rows: usize) -> Self {
        Response::Ok(OkResponse::Reloaded {
            ok: true,
            table: table.into(),
            rows,
        })
    }

    pub fn status(tables: Vec<TableStatus>) -> Self {
        Response::Ok(OkResponse::Status { ok: true, tables })
    }

    pub fn meta(table: impl Into<String>, meta: Value) -> Self {
        Response::Ok(OkResponse::Meta {
            ok: true,
            table: table.into(),
            meta,
        })
    }

    pub fn pong() -> Self {
        Response::Ok(OkResponse::Pong { ok: true })
    }

    pub fn error(error: impl Into<String>, message: impl Into<String>) -> Self {
        Response::Error(ErrorResponse {
            error: error.into(),
            message: message.into(),
        })
    }
}
