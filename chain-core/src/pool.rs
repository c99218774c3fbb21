//! Transaction pool: bounded intake plus a single batching task
//!
//! This module implements the single-consumer pattern using a Tokio task:
//! - Many sources submit without blocking; a full queue drops the transaction
//! - One batching task owns the in-progress batch
//! - A batch commits when it reaches the size threshold or when the timeout
//!   elapses since the last commit, whichever comes first
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │          Sources (TransactionProducer, tests)         │
//! └─────────────────────┬────────────────────────────────┘
//!                       │
//!                       │ submit() → try_send (drop on full)
//!                       ▼
//! ┌──────────────────────────────────────────────────────┐
//! │             mpsc::channel (bounded)                   │
//! └─────────────────────┬────────────────────────────────┘
//!                       │
//!                       ▼
//! ┌──────────────────────────────────────────────────────┐
//! │              BatchingActor (Single Task)              │
//! │  ┌────────────────────────────────────────────────┐  │
//! │  │ Batch: Vec<Transaction>                        │  │
//! │  │ Timer: timeout or max_batch_size → commit()    │  │
//! │  └────────────────────────────────────────────────┘  │
//! │                       │                               │
//! │                       ▼                               │
//! │                Ledger::append()                       │
//! │         (write lock, hash-linked block)               │
//! └───────────────────────────────────────────────────────┘
//! ```

use crate::{
    config::BatchingConfig, ledger::Ledger, metrics::Metrics, types::Transaction, Error, Result,
};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use tokio::sync::{
    mpsc::{self, error::TrySendError},
    oneshot,
};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Duration, Instant, MissedTickBehavior};

/// Observable lifecycle state of a pool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolState {
    /// Created, batching task not started
    Idle,
    /// Batching task consuming the queue
    Running,
    /// Terminated; a new pool is required to run again
    Stopped,
}

/// Why a batch was committed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CommitTrigger {
    BatchFull,
    Timeout,
    Shutdown,
}

impl fmt::Display for CommitTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CommitTrigger::BatchFull => "batch full",
            CommitTrigger::Timeout => "timeout",
            CommitTrigger::Shutdown => "shutdown",
        };
        f.write_str(s)
    }
}

/// In-progress batch and the commit path into the ledger
struct Batch {
    transactions: Vec<Transaction>,
    max_batch_size: usize,
    ledger: Arc<Ledger>,
    metrics: Metrics,
}

impl Batch {
    fn new(max_batch_size: usize, ledger: Arc<Ledger>, metrics: Metrics) -> Self {
        Self {
            transactions: Vec::with_capacity(max_batch_size),
            max_batch_size,
            ledger,
            metrics,
        }
    }

    /// Add a transaction; commits and returns true when the batch fills up.
    fn push(&mut self, tx: Transaction) -> bool {
        self.transactions.push(tx);
        tracing::debug!(
            "Added transaction to batch ({}/{})",
            self.transactions.len(),
            self.max_batch_size
        );

        if self.transactions.len() >= self.max_batch_size {
            self.commit(CommitTrigger::BatchFull);
            true
        } else {
            false
        }
    }

    /// Commit whatever is pending; returns false for an empty batch.
    fn commit(&mut self, trigger: CommitTrigger) -> bool {
        if self.transactions.is_empty() {
            return false;
        }

        let transactions = std::mem::replace(
            &mut self.transactions,
            Vec::with_capacity(self.max_batch_size),
        );
        let count = transactions.len();
        let block = self.ledger.append(transactions);
        self.metrics.record_block_committed(count, block.index());

        tracing::info!(
            "Created block {} with {} transactions ({}), hash {}",
            block.index(),
            count,
            trigger,
            block.short_hash()
        );
        true
    }
}

/// Task that drains the intake queue into batches
struct BatchingActor {
    /// Intake queue
    receiver: mpsc::Receiver<Transaction>,

    /// Stop signal from the pool
    shutdown: oneshot::Receiver<()>,

    /// Current batch
    batch: Batch,

    /// Idle time before a partial batch commits
    batch_timeout: Duration,
}

impl BatchingActor {
    /// Run the batching loop until stopped or the queue closes
    async fn run(mut self) {
        let mut batch_timer = interval_at(Instant::now() + self.batch_timeout, self.batch_timeout);
        batch_timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                // Incoming transaction
                received = self.receiver.recv() => match received {
                    Some(tx) => {
                        if self.batch.push(tx) {
                            batch_timer.reset();
                        }
                    }
                    // Every sender is gone: flush and exit
                    None => {
                        self.batch.commit(CommitTrigger::Shutdown);
                        break;
                    }
                },

                // Batch timeout expired; the interval reschedules itself
                _ = batch_timer.tick() => {
                    if self.batch.commit(CommitTrigger::Timeout) {
                        tracing::debug!("Timeout reached, partial batch committed");
                    }
                }

                // Stop requested (or the pool was dropped)
                _ = &mut self.shutdown => {
                    self.drain().await;
                    break;
                }
            }
        }

        tracing::debug!("Batching task exited");
    }

    /// Commit everything already accepted into the queue.
    async fn drain(&mut self) {
        self.receiver.close();
        while let Some(tx) = self.receiver.recv().await {
            self.batch.push(tx);
        }
        self.batch.commit(CommitTrigger::Shutdown);
    }
}

enum Lifecycle {
    Idle {
        receiver: mpsc::Receiver<Transaction>,
    },
    Running {
        shutdown: oneshot::Sender<()>,
        task: JoinHandle<()>,
    },
    Stopped,
}

struct Inner {
    /// Intake side of the queue; `None` once stopped
    sender: Option<mpsc::Sender<Transaction>>,
    lifecycle: Lifecycle,
}

/// Batches submitted transactions into blocks on a [`Ledger`]
pub struct TransactionPool {
    inner: Mutex<Inner>,
    ledger: Arc<Ledger>,
    config: BatchingConfig,
    metrics: Metrics,
}

impl TransactionPool {
    /// Create an idle pool.
    ///
    /// Fails with [`Error::Config`] for a zero batch size, capacity or timeout.
    pub fn new(ledger: Arc<Ledger>, config: BatchingConfig, metrics: Metrics) -> Result<Self> {
        config.validate()?;

        let (sender, receiver) = mpsc::channel(config.queue_capacity);

        Ok(Self {
            inner: Mutex::new(Inner {
                sender: Some(sender),
                lifecycle: Lifecycle::Idle { receiver },
            }),
            ledger,
            config,
            metrics,
        })
    }

    /// Spawn the batching task on the current Tokio runtime.
    ///
    /// No-op unless the pool is idle.
    pub fn start(&self) -> Result<()> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| Error::Concurrency(format!("No Tokio runtime: {}", e)))?;

        let mut inner = self.inner.lock();
        let receiver = match std::mem::replace(&mut inner.lifecycle, Lifecycle::Stopped) {
            Lifecycle::Idle { receiver } => receiver,
            other => {
                inner.lifecycle = other;
                return Ok(());
            }
        };

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let actor = BatchingActor {
            receiver,
            shutdown: shutdown_rx,
            batch: Batch::new(
                self.config.max_batch_size,
                self.ledger.clone(),
                self.metrics.clone(),
            ),
            batch_timeout: self.config.batch_timeout(),
        };

        let task = runtime.spawn(actor.run());
        inner.lifecycle = Lifecycle::Running {
            shutdown: shutdown_tx,
            task,
        };

        tracing::info!(
            "Transaction pool started (batch size {}, timeout {:?}, capacity {})",
            self.config.max_batch_size,
            self.config.batch_timeout(),
            self.config.queue_capacity
        );
        Ok(())
    }

    /// Stop accepting transactions and wait until every accepted one is committed.
    ///
    /// No-op once stopped. Stopping an idle pool commits anything it buffered.
    pub async fn stop(&self) -> Result<()> {
        let lifecycle = {
            let mut inner = self.inner.lock();
            inner.sender = None;
            std::mem::replace(&mut inner.lifecycle, Lifecycle::Stopped)
        };

        match lifecycle {
            Lifecycle::Running { shutdown, task } => {
                // The task may already have exited on a closed queue
                let _ = shutdown.send(());
                task.await.map_err(|e| {
                    tracing::error!("Batching task failed: {}", e);
                    Error::Concurrency(format!("Batching task failed: {}", e))
                })?;
            }
            Lifecycle::Idle { mut receiver } => {
                receiver.close();
                let mut batch = Batch::new(
                    self.config.max_batch_size,
                    self.ledger.clone(),
                    self.metrics.clone(),
                );
                while let Ok(tx) = receiver.try_recv() {
                    batch.push(tx);
                }
                batch.commit(CommitTrigger::Shutdown);
            }
            Lifecycle::Stopped => return Ok(()),
        }

        tracing::info!("Transaction pool stopped, chain length {}", self.ledger.len());
        Ok(())
    }

    /// Enqueue a transaction without blocking.
    ///
    /// A full queue drops the transaction; a stopped pool ignores it. Both are
    /// counted in [`Metrics`] and never surface as errors.
    pub fn submit(&self, tx: Transaction) {
        let inner = self.inner.lock();
        let Some(sender) = inner.sender.as_ref() else {
            tracing::debug!("Transaction pool stopped, ignoring transaction {}", tx.id());
            self.metrics.record_rejected();
            return;
        };

        match sender.try_send(tx) {
            Ok(()) => self.metrics.record_submitted(),
            Err(TrySendError::Full(tx)) => {
                tracing::warn!("Transaction pool is full, dropping transaction {}", tx.id());
                self.metrics.record_dropped();
            }
            Err(TrySendError::Closed(tx)) => {
                tracing::debug!("Transaction pool closed, ignoring transaction {}", tx.id());
                self.metrics.record_rejected();
            }
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> PoolState {
        match self.inner.lock().lifecycle {
            Lifecycle::Idle { .. } => PoolState::Idle,
            Lifecycle::Running { .. } => PoolState::Running,
            Lifecycle::Stopped => PoolState::Stopped,
        }
    }

    /// Ledger this pool commits to
    pub fn ledger(&self) -> &Arc<Ledger> {
        &self.ledger
    }

    /// Pool metrics, including the drop counter
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }
}

impl fmt::Debug for TransactionPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransactionPool")
            .field("state", &self.state())
            .field("config", &self.config)
            .finish()
    }
}
