//! Metrics collection for observability
//!
//! This module provides Prometheus metrics for monitoring the pipeline.
//!
//! # Metrics
//!
//! - `chain_transactions_submitted_total` - Transactions accepted into the intake queue
//! - `chain_transactions_dropped_total` - Transactions dropped because the queue was full
//! - `chain_transactions_rejected_total` - Submissions after the pool stopped
//! - `chain_blocks_committed_total` - Blocks appended by the batcher
//! - `chain_batch_size` - Histogram of committed batch sizes
//! - `chain_height` - Index of the latest block

use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntGauge, Registry, TextEncoder,
};
use std::fmt;
use std::sync::Arc;

/// Metrics collector
///
/// Each collector owns its registry, so independent pipelines (and tests)
/// never share counters.
#[derive(Clone)]
pub struct Metrics {
    /// Transactions accepted into the intake queue
    pub transactions_submitted: IntCounter,

    /// Transactions dropped on a full queue
    pub transactions_dropped: IntCounter,

    /// Submissions refused because the pool stopped
    pub transactions_rejected: IntCounter,

    /// Blocks committed
    pub blocks_committed: IntCounter,

    /// Batch size histogram
    pub batch_size: Histogram,

    /// Latest block index
    pub chain_height: IntGauge,

    /// Prometheus registry
    pub registry: Arc<Registry>,
}

impl Metrics {
    /// Create new metrics collector
    pub fn new() -> prometheus::Result<Self> {
        let registry = Arc::new(Registry::new());

        let transactions_submitted = IntCounter::new(
            "chain_transactions_submitted_total",
            "Transactions accepted into the intake queue",
        )?;
        registry.register(Box::new(transactions_submitted.clone()))?;

        let transactions_dropped = IntCounter::new(
            "chain_transactions_dropped_total",
            "Transactions dropped because the intake queue was full",
        )?;
        registry.register(Box::new(transactions_dropped.clone()))?;

        let transactions_rejected = IntCounter::new(
            "chain_transactions_rejected_total",
            "Transactions submitted after the pool stopped",
        )?;
        registry.register(Box::new(transactions_rejected.clone()))?;

        let blocks_committed = IntCounter::new(
            "chain_blocks_committed_total",
            "Blocks appended to the chain by the batcher",
        )?;
        registry.register(Box::new(blocks_committed.clone()))?;

        let batch_size = Histogram::with_opts(
            HistogramOpts::new("chain_batch_size", "Histogram of committed batch sizes")
                .buckets(vec![1.0, 2.0, 5.0, 10.0, 25.0, 50.0, 100.0, 250.0]),
        )?;
        registry.register(Box::new(batch_size.clone()))?;

        let chain_height = IntGauge::new("chain_height", "Index of the latest block")?;
        registry.register(Box::new(chain_height.clone()))?;

        Ok(Self {
            transactions_submitted,
            transactions_dropped,
            transactions_rejected,
            blocks_committed,
            batch_size,
            chain_height,
            registry,
        })
    }

    /// Record a transaction accepted into the queue
    pub fn record_submitted(&self) {
        self.transactions_submitted.inc();
    }

    /// Record a transaction dropped on a full queue
    pub fn record_dropped(&self) {
        self.transactions_dropped.inc();
    }

    /// Record a submission to a stopped pool
    pub fn record_rejected(&self) {
        self.transactions_rejected.inc();
    }

    /// Record a committed block
    pub fn record_block_committed(&self, batch_size: usize, height: u64) {
        self.blocks_committed.inc();
        self.batch_size.observe(batch_size as f64);
        self.chain_height.set(height as i64);
    }

    /// Get metrics registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Render all metrics in the Prometheus text format
    pub fn render(&self) -> String {
        let mut buffer = Vec::new();
        if let Err(e) = TextEncoder::new().encode(&self.registry.gather(), &mut buffer) {
            tracing::warn!("Failed to encode metrics: {}", e);
        }
        String::from_utf8_lossy(&buffer).into_owned()
    }
}

impl fmt::Debug for Metrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Metrics")
            .field("transactions_submitted", &self.transactions_submitted.get())
            .field("transactions_dropped", &self.transactions_dropped.get())
            .field("transactions_rejected", &self.transactions_rejected.get())
            .field("blocks_committed", &self.blocks_committed.get())
            .field("chain_height", &self.chain_height.get())
            .finish()
    }
}
