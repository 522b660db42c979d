//! Unix domain socket control server.
//!
//! Each connected client sends JSON-line requests and receives JSON-line
//! responses. Reload requests run on a blocking worker so the accept loop
//! and query traffic stay responsive while a table rebuilds.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tracing::{error, info, warn};

use dialscope_core::TableId;

use crate::loader;
use crate::protocol::{Request, Response, TableStatus};
use crate::state::AppState;

/// A control server listening on a Unix socket.
pub struct ControlServer {
    state: Arc<AppState>,
    socket_path: PathBuf,
}

impl ControlServer {
    pub fn new(state: Arc<AppState>, socket_path: PathBuf) -> Self {
        Self { state, socket_path }
    }

    /// Accept connections forever. Removes any stale socket file first;
    /// the caller cleans the file up on shutdown.
    pub async fn run(&self) -> std::io::Result<()> {
        if self.socket_path.exists() {
            std::fs::remove_file(&self.socket_path)?;
        }

        let listener = UnixListener::bind(&self.socket_path)?;
        info!(path = %self.socket_path.display(), "control socket listening");

        loop {
            match listener.accept().await {
                Ok((stream, _addr)) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(state, stream).await {
                            warn!(error = %e, "control connection error");
                        }
                    });
                }
                Err(e) => {
                    error!(error = %e, "control accept error");
                }
            }
        }
    }
}

async fn handle_connection(state: Arc<AppState>, stream: UnixStream) -> std::io::Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);
    let mut line = String::new();

    loop {
        line.clear();
        if reader.read_line(&mut line).await? == 0 {
            break;
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<Request>(trimmed) {
            Ok(request) => dispatch(&state, request).await,
            Err(e) => Response::error("ParseError", e.to_string()),
        };

        let mut bytes = serde_json::to_vec(&response).unwrap_or_else(|e| {
            let fallback = Response::error("SerializationError", e.to_string());
            serde_json::to_vec(&fallback).unwrap_or_default()
        });
        bytes.push(b'\n');

        writer.write_all(&bytes).await?;
        writer.flush().await?;
    }

    Ok(())
}

async fn dispatch(state: &Arc<AppState>, request: Request) -> Response {
    match request {
        Request::Ping => Response::pong(),

        Request::Status => {
            let tables = TableId::ALL
                .iter()
                .map(|&id| TableStatus {
                    table: id.to_string(),
                    available: state.registry.is_available(id),
                    rows: state.registry.rows(id),
                })
                .collect();
            Response::status(tables)
        }

        Request::Meta { table } => match table.parse::<TableId>() {
            Ok(id) => match state.registry.metadata(id) {
                Some(meta) => Response::meta(table, meta),
                None => Response::error("NotAvailable", format!("table not loaded: {id}")),
            },
            Err(e) => Response::error("UnknownTable", e.to_string()),
        },

        Request::Reload { table, path, files } => {
            let state = Arc::clone(state);
            let outcome =
                tokio::task::spawn_blocking(move || loader::reload(&state, &table, path, files))
                    .await;
            match outcome {
                Ok(Ok((id, rows))) => Response::reloaded(id.to_string(), rows),
                Ok(Err(e)) => Response::error("ReloadFailed", e.to_string()),
                Err(e) => Response::error("InternalError", e.to_string()),
            }
        }
    }
}
