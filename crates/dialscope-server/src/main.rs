//! dialscope server binary.
//!
//! Loads any configured CSVs, then serves batch queries over HTTP and
//! reload/status commands over the control socket until SIGINT/SIGTERM.

use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;
use tracing::info;

use dialscope_server::config::Config;
use dialscope_server::control::ControlServer;
use dialscope_server::state::AppState;
use dialscope_server::{http, loader};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = Config::parse();
    let state = Arc::new(AppState::new(
        config.prefetch_width,
        config.max_query_length,
    ));

    // Startup loads run to completion before the listeners come up, so a
    // configured table is never observed half-loaded.
    let startup = config.startup_files();
    if !startup.tables.is_empty() || !startup.dno.is_empty() {
        let state = Arc::clone(&state);
        tokio::task::spawn_blocking(move || loader::startup_load(&state, &startup)).await??;
    }

    if let Some(parent) = config.control.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let listener = TcpListener::bind(config.listen).await?;
    info!(listen = %config.listen, control = %config.control.display(), "starting");

    let app = http::router(Arc::clone(&state));
    let control = ControlServer::new(Arc::clone(&state), config.control.clone());

    tokio::select! {
        result = axum::serve(listener, app) => result?,
        result = control.run() => result?,
        _ = shutdown_signal() => {
            info!("shutdown signal received");
        }
    }

    if config.control.exists() {
        let _ = std::fs::remove_file(&config.control);
    }

    Ok(())
}

/// Wait for SIGINT (Ctrl-C) or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to register SIGTERM handler");
        tokio::select! {
            _ = ctrl_c => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
    }
}
