//! JournalKV Server Binary
//!
//! Starts the TCP server for JournalKV.

use std::sync::Arc;

use clap::{Parser, ValueEnum};
use tracing_subscriber::{fmt, EnvFilter};

use journalkv::network::Server;
use journalkv::{Config, Engine, JournalBackend};

/// JournalKV Server
#[derive(Parser, Debug)]
#[command(name = "journalkv-server")]
#[command(about = "Key-value store with a replayable transaction log")]
#[command(version)]
struct Args {
    /// Data directory
    #[arg(short, long, default_value = "./journalkv_data")]
    data_dir: String,

    /// Transaction log backend
    #[arg(short, long, value_enum, default_value_t = Backend::File)]
    backend: Backend,

    /// Listen address (host:port)
    #[arg(short, long, default_value = "127.0.0.1:7070")]
    listen: String,

    /// Maximum concurrent connections
    #[arg(short, long, default_value = "1024")]
    max_connections: usize,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum Backend {
    /// Append-only log file
    File,
    /// SQLite table
    Sqlite,
}

impl From<Backend> for JournalBackend {
    fn from(backend: Backend) -> Self {
        match backend {
            Backend::File => JournalBackend::File,
            Backend::Sqlite => JournalBackend::Sqlite,
        }
    }
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,journalkv=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("JournalKV Server v{}", journalkv::VERSION);
    tracing::info!("Data directory: {}", args.data_dir);
    tracing::info!("Listen address: {}", args.listen);

    // Build config from args
    let config = Config::builder()
        .data_dir(&args.data_dir)
        .backend(args.backend.into())
        .listen_addr(&args.listen)
        .max_connections(args.max_connections)
        .build();

    // Open engine (replays the transaction log before serving)
    let engine = match Engine::open(config.clone()) {
        Ok(engine) => Arc::new(engine),
        Err(e) => {
            tracing::error!("Failed to open engine: {}", e);
            std::process::exit(1);
        }
    };

    tracing::info!(
        events_replayed = engine.restore_report().events_replayed,
        "Engine initialized successfully"
    );

    // Start server (blocking)
    let server = Server::new(config, engine);
    if let Err(e) = server.run() {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }

    tracing::info!("Server stopped");
}
