//! Client library for the control socket.
//!
//! Each method serializes a JSON-line request, sends it, reads a
//! JSON-line response, and returns the parsed value. Error responses
//! surface as [`ClientError::Server`].

use std::path::Path;

use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};
use tokio::net::UnixStream;
use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};

use crate::error::ClientError;
use crate::protocol::{DnoFile, Request};

pub type Result<T> = std::result::Result<T, ClientError>;

/// Client for a dialscope control socket.
pub struct ControlClient {
    reader: BufReader<OwnedReadHalf>,
    writer: BufWriter<OwnedWriteHalf>,
}

impl ControlClient {
    pub async fn connect(path: &Path) -> Result<Self> {
        let stream = UnixStream::connect(path).await?;
        let (reader, writer) = stream.into_split();
        Ok(Self {
            reader: BufReader::new(reader),
            writer: BufWriter::new(writer),
        })
    }

    /// Send one request and read its response.
    pub async fn request(&mut self, request: &Request) -> Result<Value> {
        let mut bytes = serde_json::to_vec(request)?;
        bytes.push(b'\n');
        self.writer.write_all(&bytes).await?;
        self.writer.flush().await?;

        let mut line = String::new();
        if self.reader.read_line(&mut line).await? == 0 {
            return Err(ClientError::Disconnected);
        }
        let value: Value = serde_json::from_str(line.trim())?;

        if let Some(error) = value.get("error").and_then(Value::as_str) {
            let message = value
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or_default();
            return Err(ClientError::Server {
                error: error.to_string(),
                message: message.to_string(),
            });
        }
        Ok(value)
    }

    pub async fn ping(&mut self) -> Result<Value> {
        self.request(&Request::Ping).await
    }

    pub async fn status(&mut self) -> Result<Value> {
        self.request(&Request::Status).await
    }

    pub async fn meta(&mut self, table: &str) -> Result<Value> {
        self.request(&Request::Meta {
            table: table.to_string(),
        })
        .await
    }

    pub async fn reload(&mut self, table: &str, path: &str) -> Result<Value> {
        self.request(&Request::Reload {
            table: table.to_string(),
            path: Some(path.to_string()),
            files: Vec::new(),
        })
        .await
    }

    pub async fn reload_dno(&mut self, files: Vec<DnoFile>) -> Result<Value> {
        self.request(&Request::Reload {
            table: "dno".to_string(),
            path: None,
            files,
        })
        .await
    }
}
