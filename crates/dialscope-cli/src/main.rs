//! Admin CLI: speaks the control protocol of a running dialscope server.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use serde_json::json;

use dialscope_server::client::ControlClient;
use dialscope_server::protocol::DnoFile;

/// dialscope admin console.
#[derive(Parser, Debug)]
#[command(name = "dialscope-cli", version)]
struct Cli {
    /// Control socket of the target server.
    #[arg(short, long, default_value = "/tmp/dialscope/control.sock")]
    control: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Reload a table from CSV. The dno table takes one or more
    /// granularity=path pairs (full, npa, npa_nxx, npa_nxx_x); every
    /// other table takes a single path.
    Reload { table: String, paths: Vec<String> },
    /// Show per-table availability and row counts.
    Status,
    /// Print a table's builder metadata.
    Meta { table: String },
    /// Check that the server is alive.
    Ping,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let mut client = match ControlClient::connect(&cli.control).await {
        Ok(client) => client,
        Err(e) => {
            eprintln!("cannot connect to {}: {e}", cli.control.display());
            process::exit(1);
        }
    };

    let result = match &cli.command {
        Command::Reload { table, paths } => {
            if table == "dno" {
                let files = match parse_dno_files(paths) {
                    Ok(files) => files,
                    Err(message) => {
                        eprintln!("{message}");
                        process::exit(2);
                    }
                };
                client.reload_dno(files).await
            } else {
                let [path] = paths.as_slice() else {
                    eprintln!("reload {table} takes exactly one path");
                    process::exit(2);
                };
                client.reload(table, path).await
            }
        }
        Command::Status => client.status().await,
        Command::Meta { table } => client.meta(table).await,
        Command::Ping => client.ping().await,
    };

    match result {
        Ok(value) => {
            let rendered = serde_json::to_string_pretty(&value)
                .unwrap_or_else(|_| json!({"ok": true}).to_string());
            println!("{rendered}");
        }
        Err(e) => {
            eprintln!("{e}");
            process::exit(1);
        }
    }
}

fn parse_dno_files(paths: &[String]) -> Result<Vec<DnoFile>, String> {
    if paths.is_empty() {
        return Err("reload dno takes granularity=path pairs".to_string());
    }
    paths
        .iter()
        .map(|spec| {
            spec.split_once('=')
                .map(|(granularity, path)| DnoFile {
                    granularity: granularity.to_string(),
                    path: path.to_string(),
                })
                .ok_or_else(|| format!("bad dno file spec {spec:?}, expected granularity=path"))
        })
        .collect()
}
