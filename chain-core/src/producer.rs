//! Random transaction sources
//!
//! Each source is a Tokio task that ticks at a fixed interval, picks two
//! distinct users and a random amount, and submits the transaction to the
//! pool. Stopping signals every source over a `watch` channel and joins them.

use crate::{
    config::ProducerConfig,
    pool::TransactionPool,
    types::{AccountId, TransactionFactory},
    Error, Result,
};
use parking_lot::Mutex;
use rand::{seq::SliceRandom, Rng};
use rust_decimal::Decimal;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

/// Running sources and their stop signal
struct Sources {
    stop: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

/// Drives `sources` concurrent tasks that feed random transactions into a pool
pub struct TransactionProducer {
    pool: Arc<TransactionPool>,
    factory: Arc<TransactionFactory>,
    users: Arc<Vec<AccountId>>,
    config: ProducerConfig,
    running: Mutex<Option<Sources>>,
}

impl TransactionProducer {
    /// Create a stopped producer
    pub fn new(
        pool: Arc<TransactionPool>,
        factory: Arc<TransactionFactory>,
        config: ProducerConfig,
    ) -> Result<Self> {
        config.validate()?;
        let users: Vec<AccountId> = config.users.iter().map(AccountId::new).collect();

        Ok(Self {
            pool,
            factory,
            users: Arc::new(users),
            config,
            running: Mutex::new(None),
        })
    }

    /// Spawn the sources. No-op if already running.
    pub fn start(&self) -> Result<()> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| Error::Concurrency(format!("No Tokio runtime: {}", e)))?;

        let mut running = self.running.lock();
        if running.is_some() {
            return Ok(());
        }

        let (stop, stop_rx) = watch::channel(false);
        let tasks = (0..self.config.sources)
            .map(|source| {
                let source = Source {
                    id: source,
                    pool: self.pool.clone(),
                    factory: self.factory.clone(),
                    users: self.users.clone(),
                    stop: stop_rx.clone(),
                };
                runtime.spawn(source.run(self.config.interval()))
            })
            .collect();

        *running = Some(Sources { stop, tasks });
        tracing::info!(
            "Started {} transaction sources every {:?}",
            self.config.sources,
            self.config.interval()
        );
        Ok(())
    }

    /// Signal every source and wait for them to exit. No-op if not running.
    pub async fn stop(&self) -> Result<()> {
        let sources = self.running.lock().take();
        let Some(Sources { stop, tasks }) = sources else {
            return Ok(());
        };

        // Receivers only disappear once their source has exited
        let _ = stop.send(true);

        for task in tasks {
            task.await
                .map_err(|e| Error::Concurrency(format!("Transaction source failed: {}", e)))?;
        }

        tracing::info!("Transaction sources stopped");
        Ok(())
    }

    /// Whether sources are running
    pub fn is_running(&self) -> bool {
        self.running.lock().is_some()
    }
}

impl std::fmt::Debug for TransactionProducer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionProducer")
            .field("config", &self.config)
            .field("running", &self.is_running())
            .finish()
    }
}

/// One transaction source
struct Source {
    id: usize,
    pool: Arc<TransactionPool>,
    factory: Arc<TransactionFactory>,
    users: Arc<Vec<AccountId>>,
    stop: watch::Receiver<bool>,
}

impl Source {
    async fn run(mut self, period: std::time::Duration) {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // First tick completes immediately
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => self.produce_one(),
                changed = self.stop.changed() => {
                    if changed.is_err() || *self.stop.borrow() {
                        break;
                    }
                }
            }
        }

        tracing::debug!("Transaction source {} exited", self.id);
    }

    fn produce_one(&self) {
        let mut rng = rand::thread_rng();
        let Some((from, to)) = pick_pair(&self.users, &mut rng) else {
            return;
        };
        // 0.00 ..= 99.99
        let amount = Decimal::new(rng.gen_range(0..10_000), 2);

        let tx = self.factory.create(from.clone(), to.clone(), amount);
        tracing::debug!("Source {} generated transaction {}", self.id, tx);
        self.pool.submit(tx);
    }
}

/// Two distinct users, or `None` with fewer than two to choose from
fn pick_pair<'a, R: Rng + ?Sized>(
    users: &'a [AccountId],
    rng: &mut R,
) -> Option<(&'a AccountId, &'a AccountId)> {
    let mut picked = users.choose_multiple(rng, 2);
    Some((picked.next()?, picked.next()?))
}
