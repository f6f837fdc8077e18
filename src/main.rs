//! Hydyco — server bootstrap with a file-backed mapping store.
//!
//! Usage:
//!   hydyco                               # Port 3000, root discovered from the install location
//!   hydyco --port 8080                   # Custom port
//!   hydyco --root /path/to/project       # Skip root discovery
//!   hydyco --config hydyco.json          # Load server config from JSON
//!   hydyco --secret mysecret --no-logger

use std::path::PathBuf;

use anyhow::{Context, Result};
use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use clap::Parser;
use hydyco_protocol::ServerConfig;
use hydyco_server::LifecycleController;
use hydyco_store::{MappingStore, RootResolver};
use hydyco_transport::{BoxHandler, router};
use serde_json::{Value, json};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "hydyco", about = "Hydyco server")]
struct Cli {
    /// Port to listen on (0 for OS-assigned); overrides the config file
    #[arg(long)]
    port: Option<u16>,

    /// JSON server config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Auth secret; overrides the config file
    #[arg(long)]
    secret: Option<String>,

    /// Disable request logging
    #[arg(long)]
    no_logger: bool,

    /// Project root holding `.hydyco` (discovered from the install location if omitted)
    #[arg(long)]
    root: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(long)]
    verbose: bool,

    /// Write logs to a file instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,
}

impl Cli {
    fn server_config(&self) -> Result<ServerConfig> {
        let mut config = match &self.config {
            Some(path) => ServerConfig::from_file(path)?,
            None => ServerConfig::default(),
        };
        if let Some(port) = self.port {
            config = config.with_port(port);
        }
        if let Some(secret) = &self.secret {
            config = config.with_secret(secret.clone());
        }
        if self.no_logger {
            config = config.with_logger(false);
        }
        Ok(config)
    }
}

fn init_tracing(cli: &Cli) -> Result<()> {
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    if let Some(log_path) = &cli.log_file {
        if let Some(parent) = log_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating log directory {}", parent.display()))?;
        }
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_path)
            .with_context(|| format!("opening log file {}", log_path.display()))?;

        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::sync::Mutex::new(file))
            .with_ansi(false)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
    Ok(())
}

/// Database handler reporting where the store keeps its data.
fn store_database(store: MappingStore) -> BoxHandler {
    async fn status(State(store): State<MappingStore>) -> Json<Value> {
        Json(json!({
            "driver": "mapping-store",
            "root": store.root().display().to_string(),
            "mappings": store.mappings_dir().display().to_string(),
            "models": store.models_dir().display().to_string(),
        }))
    }

    let routes = Router::new().route("/database", get(status)).with_state(store);
    BoxHandler::new(router("mapping-database", routes))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli)?;

    let config = cli.server_config()?;

    let store = match &cli.root {
        Some(root) => MappingStore::open(&RootResolver::fixed(root)),
        None => MappingStore::open_default(),
    }
    .context("opening mapping store")?;
    info!("Mapping store at {}", store.mappings_dir().display());

    let mut controller = LifecycleController::with_store(config, store.clone());
    controller.register_database(store_database(store))?;

    let mut server = controller.start().await.context("starting server")?;

    tokio::signal::ctrl_c().await.context("waiting for Ctrl+C")?;
    info!("Shutting down");
    server.stop().await;

    Ok(())
}
