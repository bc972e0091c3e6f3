//! Aethermind rules-retrieval server
//!
//! Loads the persisted index and chunk list once at startup (failing fast
//! on missing or inconsistent artifacts), then serves questions over HTTP.

use aethermind::answer::{AnswerGenerator, OpenRouterClient};
use aethermind::config::Config;
use aethermind::history::HistoryStore;
use aethermind::retrieval::{ArtifactPaths, EmbeddingModel, RetrievalEngine};
use aethermind::web::{create_router, AppState};
use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

/// Aethermind Rules Retrieval Server
#[derive(Parser, Debug)]
#[command(name = "aethermind")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Server listen address (overrides config)
    #[arg(short, long, value_name = "ADDR")]
    address: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Generate template config and exit
    #[arg(long, value_name = "FILE")]
    init: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .init();

    // Handle --init flag
    if let Some(init_path) = args.init {
        let path = if init_path.as_os_str().is_empty() {
            PathBuf::from("aethermind.toml")
        } else {
            init_path
        };

        if path.exists() {
            eprintln!("Error: Config file already exists: {}", path.display());
            eprintln!("Remove it first or choose a different path.");
            std::process::exit(1);
        }

        Config::write_template(&path)?;
        println!("Generated config file: {}", path.display());
        println!("\nEdit the file, build the index, then start the server:");
        println!("  aethermind_index --config {}", path.display());
        println!("  aethermind --config {}", path.display());
        return Ok(());
    }

    let config = load_config(&args)?;

    info!(
        address = %config.server.address,
        artifacts_dir = %config.retrieval.artifacts_dir.display(),
        "Configuration loaded"
    );

    // Load the artifact pair before binding the socket: a service with
    // missing or mismatched artifacts must not come up at all.
    let model = EmbeddingModel::new(config.retrieval.embedding_dim);
    let paths = ArtifactPaths::in_dir(&config.retrieval.artifacts_dir);
    let engine = RetrievalEngine::load(&paths, model).context(
        "Failed to load retrieval artifacts; run aethermind_index to build them",
    )?;

    let history = if config.history.enabled {
        match HistoryStore::open(&config.history.db_path) {
            Ok(store) => {
                info!(db_path = %config.history.db_path.display(), "History store ready");
                Some(Arc::new(store))
            }
            Err(e) => {
                // Retrieval does not depend on history; serve without it.
                warn!(error = %e, "Failed to open history store, continuing without it");
                None
            }
        }
    } else {
        info!("History logging disabled");
        None
    };

    let generator: Option<Arc<dyn AnswerGenerator>> = if config.answer.enabled {
        match std::env::var(&config.answer.api_key_env) {
            Ok(api_key) if !api_key.is_empty() => {
                info!(model = %config.answer.model, "Answer generation enabled");
                Some(Arc::new(OpenRouterClient::new(
                    config.answer.endpoint.clone(),
                    config.answer.model.clone(),
                    api_key,
                )))
            }
            _ => {
                warn!(
                    env = %config.answer.api_key_env,
                    "Answer generation enabled but API key not set, serving context only"
                );
                None
            }
        }
    } else {
        info!("Answer generation disabled");
        None
    };

    let state = AppState {
        engine: Arc::new(engine),
        generator,
        history,
        default_top_k: config.retrieval.default_top_k,
    };

    let router = create_router(state);
    let listener = tokio::net::TcpListener::bind(&config.server.address)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.address))?;

    info!(address = %config.server.address, "Aethermind server ready");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutting down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
    }
}

fn load_config(args: &Args) -> Result<Config> {
    let base_config = if let Some(ref config_path) = args.config {
        if !config_path.exists() {
            anyhow::bail!(
                "Config file not found: {}\nUse --init {} to generate.",
                config_path.display(),
                config_path.display()
            );
        }
        info!(path = %config_path.display(), "Loading config");
        Config::from_file(config_path)?
    } else {
        match Config::from_default_locations()? {
            Some((config, path)) => {
                info!(path = %path.display(), "Loading config from default location");
                config
            }
            None => {
                info!("No config file found, using defaults");
                Config::default()
            }
        }
    };

    Ok(base_config.with_overrides(args.address.clone()))
}
