//! Chain simulator binary
//!
//! Runs random sources against the batching pool, then reports the chain.

use anyhow::Context;
use chain_core::{Config, Ledger, Metrics, TransactionFactory, TransactionPool, TransactionProducer};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = match std::env::var("CHAIN_CONFIG") {
        Ok(path) => Config::from_file(&path)
            .with_context(|| format!("failed to load config from {}", path))?,
        Err(_) => Config::from_env().context("invalid environment configuration")?,
    };

    tracing::info!("Starting {}", config.service_name);

    let ledger = Arc::new(Ledger::new());
    tracing::info!("Blockchain initialized with genesis block");

    let metrics = Metrics::new().context("failed to create metrics")?;
    let pool = Arc::new(TransactionPool::new(
        ledger.clone(),
        config.batching.clone(),
        metrics.clone(),
    )?);
    let producer = TransactionProducer::new(
        pool.clone(),
        Arc::new(TransactionFactory::new()),
        config.producer.clone(),
    )?;

    pool.start()?;
    producer.start()?;
    tracing::info!(
        "Running for {:?}, press Ctrl+C to stop early",
        config.run_duration()
    );

    tokio::select! {
        _ = tokio::time::sleep(config.run_duration()) => {}
        result = tokio::signal::ctrl_c() => {
            result.context("failed to listen for Ctrl+C")?;
            tracing::info!("Interrupted");
        }
    }

    producer.stop().await?;
    pool.stop().await?;

    report(&ledger, &metrics);
    Ok(())
}

fn report(ledger: &Ledger, metrics: &Metrics) {
    tracing::info!("Final blockchain state");
    tracing::info!("Number of blocks: {}", ledger.len());
    tracing::info!("Blockchain is valid: {}", ledger.verify());
    tracing::info!(
        "Transactions committed: {}, dropped: {}",
        ledger.transaction_count(),
        metrics.transactions_dropped.get()
    );

    for block in ledger.blocks() {
        tracing::info!(
            "Block {}: {} transactions, hash {}...",
            block.index(),
            block.transactions().len(),
            block.short_hash()
        );
    }

    tracing::debug!("Metrics:\n{}", metrics.render());
}
