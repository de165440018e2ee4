//! Harbor indexer CLI: replays an ordered event log against the document
//! store.

use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use harbor_indexer::chain::EthRpcClient;
use harbor_indexer::config::IndexerConfig;
use harbor_indexer::database::{EntityStore, RocksStore};
use harbor_indexer::feed::EventFeed;
use harbor_indexer::processors::EventRegistry;

#[derive(Parser)]
#[command(name = "harbor-indexer")]
#[command(about = "Harbor exchange aggregation indexer")]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "indexer.toml")]
    config: PathBuf,

    /// NDJSON event log to replay
    #[arg(short, long)]
    events: PathBuf,

    /// Validate configuration and exit
    #[arg(long)]
    dry_run: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = IndexerConfig::from_file(&cli.config)?;
    info!(exchange = %config.deployment.exchange, "configuration loaded");

    if cli.dry_run {
        info!("dry run: configuration is valid");
        return Ok(());
    }
    config.ensure_directories()?;

    let store = Arc::new(RocksStore::open(&config.storage.rocksdb)?);
    let chain = Arc::new(EthRpcClient::new(&config.rpc));
    let deployment = Arc::new(config.deployment.clone());
    let entities = EntityStore::new(store.clone(), chain.clone(), deployment.clone());
    let mut registry = EventRegistry::new(entities, chain, deployment);

    let file = File::open(&cli.events)
        .with_context(|| format!("opening {}", cli.events.display()))?;
    let feed = EventFeed::new(BufReader::new(file));

    let mut processed = 0u64;
    for envelope in feed {
        let envelope = envelope?;
        registry.process(&envelope)?;
        processed += 1;
        if processed % 1_000 == 0 {
            info!(processed, "replay progress");
        }
    }
    store.flush()?;
    info!(processed, "event log replayed");
    Ok(())
}
