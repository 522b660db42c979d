//! Shared server state.

use dialscope_core::Registry;
use dialscope_core::map::DEFAULT_PREFETCH_WIDTH;
use parking_lot::Mutex;

/// State shared by the HTTP handlers and the control server.
pub struct AppState {
    pub registry: Registry,
    /// Prehash/prefetch window width applied to every table builder.
    pub prefetch_width: usize,
    /// Maximum accepted `/target` body size in bytes.
    pub max_query_length: usize,
    /// Serializes reloads: one ingest worker rebuilds at a time.
    pub reload_lock: Mutex<()>,
}

impl AppState {
    pub fn new(prefetch_width: usize, max_query_length: usize) -> Self {
        Self {
            registry: Registry::new(),
            prefetch_width: prefetch_width.max(1),
            max_query_length,
            reload_lock: Mutex::new(()),
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(DEFAULT_PREFETCH_WIDTH, 32_768)
    }
}
