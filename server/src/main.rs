// server/src/main.rs

// Entry point for the clinic backend server. Parses command-line
// arguments, loads configuration, wires the storage backends into the
// services and serves the HTTP API until SIGTERM/SIGINT.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use tokio::signal::unix::{signal, SignalKind};

use services::config::{load_config, StorageBackend};
use services::storage_engine::{BlobStore, DiskStore, MemoryBlobStore, MemoryStore, PostgresStore, RecordStore};

mod api;

#[derive(Parser, Debug)]
#[clap(author, version, about = "Clinic backend API server", long_about = None)]
struct Args {
    /// Path to a YAML configuration file
    #[clap(long, short = 'c', value_name = "FILE")]
    config: Option<PathBuf>,

    /// Override the listen address from the config
    #[clap(long, value_name = "ADDR")]
    listen: Option<String>,

    /// Run against the in-memory store instead of Postgres
    #[clap(long)]
    memory: bool,
}

async fn shutdown_signal() {
    let mut sigterm = signal(SignalKind::terminate()).expect("Failed to set up SIGTERM handler");
    let mut sigint = signal(SignalKind::interrupt()).expect("Failed to set up SIGINT handler");

    tokio::select! {
        _ = sigterm.recv() => {
            info!("Received SIGTERM, shutting down gracefully...");
        }
        _ = sigint.recv() => {
            info!("Received SIGINT, shutting down gracefully...");
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let args = Args::parse();
    let mut config = load_config(args.config.as_deref()).context("Failed to load configuration")?;
    if let Some(listen) = args.listen {
        config.listen_addr = listen;
    }
    if args.memory {
        config.storage_backend = StorageBackend::Memory;
    }

    let (store, blobs): (Arc<dyn RecordStore>, Arc<dyn BlobStore>) = match config.storage_backend {
        StorageBackend::Postgres => {
            let store = PostgresStore::connect(&config.database_url)
                .await
                .context("Failed to connect to the database")?;
            store.ensure_schema().await.context("Failed to prepare schema")?;
            let blobs = DiskStore::new(&config.upload_dir)
                .await
                .context("Failed to prepare upload directory")?;
            (Arc::new(store), Arc::new(blobs))
        }
        StorageBackend::Memory => {
            info!("Running with the in-memory storage backend");
            (Arc::new(MemoryStore::new()), Arc::new(MemoryBlobStore::new()))
        }
    };

    let state = api::state::AppState::new(store, blobs, &config);
    let app = api::build_router(Arc::new(state), &config)?;

    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.listen_addr))?;
    info!("Clinic backend listening on {}", config.listen_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    Ok(())
}
