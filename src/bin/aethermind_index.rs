//! Offline index builder
//!
//! Splits the rules corpus into chunks, embeds them and persists the index
//! and chunk list as a matched pair. Run this whenever the corpus changes;
//! there is no incremental update, a rebuild always overwrites.

use aethermind::config::Config;
use aethermind::retrieval::{build_index, ArtifactPaths, EmbeddingModel, RuleChunker};
use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

/// Aethermind Index Builder
#[derive(Parser, Debug)]
#[command(name = "aethermind_index")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Rules text file (overrides config)
    #[arg(short, long, value_name = "FILE")]
    rules: Option<PathBuf>,

    /// Output directory for the artifact pair (overrides config)
    #[arg(short, long, value_name = "DIR")]
    output: Option<PathBuf>,

    /// Maximum characters per chunk (overrides config)
    #[arg(long, value_name = "N")]
    max_chars: Option<usize>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
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

    let mut config = if let Some(ref config_path) = args.config {
        Config::from_file(config_path)?
    } else {
        Config::from_default_locations()?
            .map(|(config, _)| config)
            .unwrap_or_default()
    };

    if let Some(rules) = args.rules {
        config.retrieval.rules_path = rules;
    }
    if let Some(output) = args.output {
        config.retrieval.artifacts_dir = output;
    }
    if let Some(max_chars) = args.max_chars {
        config.retrieval.max_chars = max_chars;
    }

    let rules_path = &config.retrieval.rules_path;
    let text = std::fs::read_to_string(rules_path)
        .with_context(|| format!("Failed to read rules file: {}", rules_path.display()))?;

    info!(
        rules_path = %rules_path.display(),
        max_chars = config.retrieval.max_chars,
        "Splitting rules into chunks"
    );
    let chunker = RuleChunker::new(config.retrieval.max_chars);
    let chunks = chunker.split(&text);

    if chunks.is_empty() {
        anyhow::bail!("Rules file produced no chunks: {}", rules_path.display());
    }

    let model = EmbeddingModel::new(config.retrieval.embedding_dim);
    let paths = ArtifactPaths::in_dir(&config.retrieval.artifacts_dir);

    info!(chunks = chunks.len(), "Building index");
    build_index(&chunks, &model, &paths)?;

    info!(
        index = %paths.index.display(),
        chunks = %paths.chunks.display(),
        "Done"
    );
    Ok(())
}
