//! Property-based tests for chain invariants
//!
//! These tests use proptest to verify critical invariants:
//! - Fingerprint determinism: same fields → same hash
//! - Chain linkage: any append sequence verifies
//! - No loss on stop: every accepted transaction is committed, in order
//! - Threshold: full batches are exactly `max_batch_size` long

use chain_core::{
    AccountId, BatchingConfig, Block, Ledger, Metrics, Transaction, TransactionFactory,
    TransactionPool, GENESIS_PREVIOUS_HASH,
};
use chrono::{TimeZone, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;
use std::sync::Arc;

/// Strategy for generating amounts (any sign, two decimal places)
fn amount_strategy() -> impl Strategy<Value = Decimal> {
    (-1_000_000_00i64..1_000_000_00i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// Strategy for generating account IDs
fn account_id_strategy() -> impl Strategy<Value = AccountId> {
    "[A-Z][a-z]{2,8}".prop_map(AccountId::new)
}

/// Strategy for generating transactions with explicit ids and timestamps
fn transaction_strategy() -> impl Strategy<Value = Transaction> {
    (
        1u64..1_000_000,
        account_id_strategy(),
        account_id_strategy(),
        amount_strategy(),
        0i64..4_000_000_000,
    )
        .prop_map(|(id, from, to, amount, secs)| {
            let timestamp = Utc.timestamp_opt(secs, 0).unwrap();
            Transaction::from_parts(id, from, to, amount, timestamp)
        })
}

fn transfer(factory: &TransactionFactory, amount: Decimal) -> Transaction {
    factory.create(AccountId::new("Alice"), AccountId::new("Bob"), amount)
}

fn committed_ids(ledger: &Ledger) -> Vec<u64> {
    ledger
        .blocks()
        .iter()
        .flat_map(|block| block.transactions().iter().map(Transaction::id).collect::<Vec<_>>())
        .collect()
}

/// Create test pool with its own ledger and metrics
fn create_test_pool(max_batch_size: usize, queue_capacity: usize) -> (TransactionPool, Arc<Ledger>) {
    let ledger = Arc::new(Ledger::new());
    let pool = TransactionPool::new(
        ledger.clone(),
        BatchingConfig {
            max_batch_size,
            batch_timeout_ms: 60_000,
            queue_capacity,
        },
        Metrics::new().unwrap(),
    )
    .unwrap();
    (pool, ledger)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Property: a transaction fingerprint is a pure function of its fields
    #[test]
    fn prop_transaction_hash_deterministic(tx in transaction_strategy()) {
        let copy = Transaction::from_parts(
            tx.id(),
            tx.from().clone(),
            tx.to().clone(),
            tx.amount(),
            tx.timestamp(),
        );
        prop_assert_eq!(copy.hash(), tx.hash());
        prop_assert_eq!(tx.compute_hash(), *tx.hash());
    }

    /// Property: sealing is idempotent for unchanged contents
    #[test]
    fn prop_block_hash_idempotent(
        txs in prop::collection::vec(transaction_strategy(), 0..20),
        index in 1u64..10_000,
    ) {
        let block = Block::seal(txs, [3u8; 32], index);
        prop_assert_eq!(block.compute_hash(), *block.hash());
        prop_assert_eq!(block.compute_hash(), block.compute_hash());
    }

    /// Property: any sequence of appends yields a valid chain
    #[test]
    fn prop_chain_linkage(
        batches in prop::collection::vec(prop::collection::vec(amount_strategy(), 0..8), 0..25)
    ) {
        let factory = TransactionFactory::new();
        let ledger = Ledger::new();

        for amounts in &batches {
            let txs = amounts.iter().map(|amount| transfer(&factory, *amount)).collect();
            ledger.append(txs);
        }

        prop_assert!(ledger.verify());
        prop_assert_eq!(ledger.len(), batches.len() + 1);

        let blocks = ledger.blocks();
        prop_assert_eq!(blocks[0].previous_hash(), &GENESIS_PREVIOUS_HASH);
        for (i, pair) in blocks.windows(2).enumerate() {
            prop_assert_eq!(pair[1].index(), i as u64 + 1);
            prop_assert_eq!(pair[1].previous_hash(), pair[0].hash());
        }
    }

    /// Property: stop commits every accepted transaction in submission order
    #[test]
    fn prop_no_loss_on_stop(count in 0usize..60, max_batch_size in 1usize..12) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let factory = TransactionFactory::new();
            let (pool, ledger) = create_test_pool(max_batch_size, 64);
            pool.start().unwrap();

            for i in 0..count {
                pool.submit(transfer(&factory, Decimal::from(i as i64)));
            }
            pool.stop().await.unwrap();

            prop_assert_eq!(pool.metrics().transactions_dropped.get(), 0);
            prop_assert_eq!(ledger.transaction_count(), count);
            prop_assert_eq!(committed_ids(&ledger), (1..=count as u64).collect::<Vec<_>>());
            prop_assert!(ledger.verify());
            Ok(())
        })?;
    }

    /// Property: without a timeout, every block but the last is exactly full
    #[test]
    fn prop_full_batches_exact(count in 1usize..60, max_batch_size in 1usize..12) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let factory = TransactionFactory::new();
            let (pool, ledger) = create_test_pool(max_batch_size, 64);

            for _ in 0..count {
                pool.submit(transfer(&factory, Decimal::ONE));
            }
            pool.start().unwrap();
            pool.stop().await.unwrap();

            let blocks = ledger.blocks();
            let sizes: Vec<usize> = blocks.iter().skip(1).map(|b| b.transactions().len()).collect();
            prop_assert_eq!(sizes.len(), (count + max_batch_size - 1) / max_batch_size);
            let (last, full) = sizes.split_last().unwrap();
            prop_assert!(full.iter().all(|size| *size == max_batch_size));
            prop_assert_eq!(*last, count - full.len() * max_batch_size);
            Ok(())
        })?;
    }

    /// Property: with a blocked consumer, exactly the overflow is dropped
    #[test]
    fn prop_overflow_dropped(capacity in 1usize..16, extra in 0usize..16) {
        let factory = TransactionFactory::new();
        let (pool, _ledger) = create_test_pool(4, capacity);

        for _ in 0..capacity + extra {
            pool.submit(transfer(&factory, Decimal::ONE));
        }

        prop_assert_eq!(pool.metrics().transactions_submitted.get(), capacity as u64);
        prop_assert_eq!(pool.metrics().transactions_dropped.get(), extra as u64);
    }
}

#[cfg(test)]
mod integration_tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_size_and_timeout_race() {
        let factory = TransactionFactory::new();
        let ledger = Arc::new(Ledger::new());
        let pool = TransactionPool::new(
            ledger.clone(),
            BatchingConfig {
                max_batch_size: 3,
                batch_timeout_ms: 5_000,
                queue_capacity: 100,
            },
            Metrics::new().unwrap(),
        )
        .unwrap();
        pool.start().unwrap();

        // A, B, C fill a batch immediately
        for _ in 0..3 {
            pool.submit(transfer(&factory, Decimal::ONE));
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(ledger.len(), 2);

        // D, E wait for the timeout
        pool.submit(transfer(&factory, Decimal::ONE));
        pool.submit(transfer(&factory, Decimal::ONE));
        tokio::time::sleep(Duration::from_millis(5_200)).await;
        assert_eq!(ledger.len(), 3);

        // F is drained on stop
        pool.submit(transfer(&factory, Decimal::ONE));
        pool.stop().await.unwrap();

        let sizes: Vec<usize> = ledger
            .blocks()
            .iter()
            .map(|b| b.transactions().len())
            .collect();
        assert_eq!(sizes, vec![0, 3, 2, 1]);
        assert_eq!(committed_ids(&ledger), vec![1, 2, 3, 4, 5, 6]);
        assert!(ledger.verify());
    }
}
