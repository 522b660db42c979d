//! dialscope server and client library.
//!
//! Serves the enrichment engine over two surfaces: an HTTP API for batch
//! queries (`/target`) and reverse routing-number scans (`/reverse`), and
//! a Unix-socket JSON-line control protocol for runtime CSV reloads,
//! status, and metadata inspection. Reloads rebuild a table off-line and
//! swap it into the registry without interrupting readers.

pub mod client;
pub mod config;
pub mod control;
pub mod error;
pub mod format;
pub mod http;
pub mod loader;
pub mod protocol;
pub mod state;

pub use client::ControlClient;
pub use control::ControlServer;
pub use state::AppState;
