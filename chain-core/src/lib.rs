//! Chain Core
//!
//! Batches a stream of transactions into hash-linked blocks.
//!
//! # Architecture
//!
//! - **Bounded intake**: Non-blocking submit, drop on full
//! - **Single consumer**: One batching task owns the in-progress batch
//! - **Size or timeout**: A batch commits at the size threshold or after the
//!   idle timeout, whichever fires first
//! - **Single writer**: Appends to the ledger are serialized behind a lock
//!
//! # Invariants
//!
//! - Chain linkage: every block stores its predecessor's hash
//! - Sequential indices: block i+1 follows block i with no gaps
//! - Sealed contents: stored hashes match recomputed ones
//! - No loss on stop: every accepted transaction is committed
//!
//! # Example
//!
//! ```no_run
//! use chain_core::{AccountId, Config, Ledger, Metrics, TransactionFactory, TransactionPool};
//! use rust_decimal::Decimal;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> chain_core::Result<()> {
//!     let config = Config::default();
//!     let ledger = Arc::new(Ledger::new());
//!     let metrics = Metrics::new().map_err(|e| chain_core::Error::Other(e.to_string()))?;
//!     let pool = TransactionPool::new(ledger.clone(), config.batching, metrics)?;
//!     let factory = TransactionFactory::new();
//!
//!     pool.start()?;
//!     pool.submit(factory.create(AccountId::new("Alice"), AccountId::new("Bob"), Decimal::new(500, 2)));
//!     pool.stop().await?;
//!
//!     assert!(ledger.verify());
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod config;
pub mod crypto;
pub mod error;
pub mod ledger;
pub mod metrics;
pub mod pool;
pub mod producer;
pub mod types;

// Re-exports
pub use config::{BatchingConfig, Config, ProducerConfig};
pub use crypto::{Hash, GENESIS_PREVIOUS_HASH};
pub use error::{Error, Result};
pub use ledger::Ledger;
pub use metrics::Metrics;
pub use pool::{PoolState, TransactionPool};
pub use producer::TransactionProducer;
pub use types::{AccountId, Block, Transaction, TransactionFactory};
