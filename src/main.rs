//! Folio - Live photo catalog engine
//!
//! Headless daemon: opens a library on a folder and streams catalog
//! change events to stdout as JSON lines until interrupted.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

use clap::Parser;
use folio::observability::init_tracing;
use folio::{Config, Library, Result};
use tokio::sync::broadcast::error::RecvError;

/// Folio - Live photo catalog engine
#[derive(Parser, Debug)]
#[command(name = "folio")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Folder whose image files make up the catalog
    #[arg(short, long, env = "FOLIO_ROOT", default_value = ".")]
    root: std::path::PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "FOLIO_LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Enable JSON logging output
    #[arg(long, env = "FOLIO_LOG_JSON")]
    log_json: bool,

    /// Change-notification coalescing window in milliseconds
    #[arg(long, env = "FOLIO_DEBOUNCE_MS", default_value = "1000")]
    debounce_ms: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(&cli.log_level, cli.log_json);

    tracing::info!("Folio v{} starting...", env!("CARGO_PKG_VERSION"));

    let config = Config {
        root_dir: cli.root,
        log_level: cli.log_level,
        log_json: cli.log_json,
        debounce_ms: cli.debounce_ms,
    };

    tracing::debug!(?config, "Configuration loaded");
    config.validate()?;

    let mut library = Library::open(&config)?;
    let mut events = library.subscribe();

    if !library.is_watching() {
        tracing::warn!(
            root = %config.root_dir.display(),
            "Live notifications unavailable, catalog reflects the initial scan only"
        );
    }

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(event) => {
                    println!("{}", serde_json::to_string(&event).map_err(|e| {
                        folio::Error::internal(format!("event serialization failed: {e}"))
                    })?);
                }
                Err(RecvError::Lagged(missed)) => {
                    tracing::warn!(missed, "Observer fell behind, events dropped");
                }
                Err(RecvError::Closed) => break,
            },
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutting down");
                break;
            }
        }
    }

    library.shutdown();
    Ok(())
}
