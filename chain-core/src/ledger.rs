//! Append-only hash-linked ledger
//!
//! The ledger owns the block sequence behind a single `RwLock`:
//! appends take the write lock, verification and snapshots take the read
//! lock, so a reader never observes a half-appended block.
//!
//! # Example
//!
//! ```
//! use chain_core::{AccountId, Ledger, TransactionFactory};
//! use rust_decimal::Decimal;
//!
//! let ledger = Ledger::new();
//! let factory = TransactionFactory::new();
//!
//! let tx = factory.create(AccountId::new("Alice"), AccountId::new("Bob"), Decimal::new(1000, 2));
//! let block = ledger.append(vec![tx]);
//!
//! assert_eq!(block.index(), 1);
//! assert!(ledger.verify());
//! ```

use crate::{
    crypto::GENESIS_PREVIOUS_HASH,
    types::{Block, Transaction},
    Error, Result,
};
use parking_lot::RwLock;

/// Hash-linked chain of blocks, seeded with a genesis block
#[derive(Debug)]
pub struct Ledger {
    blocks: RwLock<Vec<Block>>,
}

impl Ledger {
    /// Create a ledger containing only the genesis block
    pub fn new() -> Self {
        Self {
            blocks: RwLock::new(vec![Block::genesis()]),
        }
    }

    /// Seal the transactions into a new block and append it.
    ///
    /// Returns a copy of the committed block.
    pub fn append(&self, transactions: Vec<Transaction>) -> Block {
        let mut blocks = self.blocks.write();

        // Genesis is never removed, so the tail always exists
        let tail = &blocks[blocks.len() - 1];
        let block = Block::seal(transactions, *tail.hash(), tail.index() + 1);
        blocks.push(block.clone());

        tracing::debug!(
            "Appended block {} with {} transactions ({})",
            block.index(),
            block.transactions().len(),
            block.short_hash()
        );

        block
    }

    /// Check chain integrity, reporting the first violation found
    pub fn validate(&self) -> Result<()> {
        let blocks = self.blocks.read();

        let genesis = blocks.first().ok_or_else(|| Error::IntegrityViolation {
            index: 0,
            reason: "missing genesis block".to_string(),
        })?;

        if genesis.index() != 0 {
            return Err(Error::IntegrityViolation {
                index: genesis.index(),
                reason: "genesis index is not 0".to_string(),
            });
        }

        if genesis.previous_hash() != &GENESIS_PREVIOUS_HASH {
            return Err(Error::IntegrityViolation {
                index: 0,
                reason: "genesis previous hash is not the sentinel".to_string(),
            });
        }

        for pair in blocks.windows(2) {
            let (previous, current) = (&pair[0], &pair[1]);
            Self::check_contents(current)?;

            if current.previous_hash() != previous.hash() {
                return Err(Error::IntegrityViolation {
                    index: current.index(),
                    reason: "previous hash does not match preceding block".to_string(),
                });
            }

            if current.index() != previous.index() + 1 {
                return Err(Error::IntegrityViolation {
                    index: current.index(),
                    reason: format!("index does not follow {}", previous.index()),
                });
            }
        }

        Ok(())
    }

    /// Stored hashes must match what the current contents hash to.
    fn check_contents(block: &Block) -> Result<()> {
        if let Some(tx) = block
            .transactions()
            .iter()
            .find(|tx| tx.compute_hash() != *tx.hash())
        {
            return Err(Error::IntegrityViolation {
                index: block.index(),
                reason: format!("transaction {} hash mismatch", tx.id()),
            });
        }

        if block.compute_hash() != *block.hash() {
            return Err(Error::IntegrityViolation {
                index: block.index(),
                reason: "block hash mismatch".to_string(),
            });
        }

        Ok(())
    }

    /// Whether the chain passes [`Ledger::validate`]
    pub fn verify(&self) -> bool {
        match self.validate() {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Chain verification failed: {}", e);
                false
            }
        }
    }

    /// Number of blocks including genesis
    pub fn len(&self) -> usize {
        self.blocks.read().len()
    }

    /// Always false: the genesis block is never removed
    pub fn is_empty(&self) -> bool {
        self.blocks.read().is_empty()
    }

    /// Most recently appended block
    pub fn latest(&self) -> Block {
        let blocks = self.blocks.read();
        blocks[blocks.len() - 1].clone()
    }

    /// Consistent snapshot of every block
    pub fn blocks(&self) -> Vec<Block> {
        self.blocks.read().clone()
    }

    /// Number of committed transactions (genesis holds none)
    pub fn transaction_count(&self) -> usize {
        self.blocks
            .read()
            .iter()
            .map(|block| block.transactions().len())
            .sum()
    }

    #[cfg(test)]
    pub(crate) fn with_blocks_mut<R>(&self, f: impl FnOnce(&mut Vec<Block>) -> R) -> R {
        f(&mut self.blocks.write())
    }
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AccountId, TransactionFactory};
    use rust_decimal::Decimal;
    use std::sync::Arc;

    fn batch(factory: &TransactionFactory, n: usize) -> Vec<Transaction> {
        (0..n)
            .map(|i| {
                factory.create(
                    AccountId::new("Alice"),
                    AccountId::new("Bob"),
                    Decimal::new(100 + i as i64, 2),
                )
            })
            .collect()
    }

    fn ledger_with_blocks() -> Ledger {
        let factory = TransactionFactory::new();
        let ledger = Ledger::new();
        ledger.append(batch(&factory, 3));
        ledger.append(batch(&factory, 2));
        ledger.append(batch(&factory, 4));
        ledger
    }

    #[test]
    fn test_genesis_invariant() {
        let ledger = Ledger::new();
        assert_eq!(ledger.len(), 1);

        let genesis = ledger.latest();
        assert_eq!(genesis.index(), 0);
        assert!(genesis.transactions().is_empty());
        assert_eq!(genesis.previous_hash(), &GENESIS_PREVIOUS_HASH);
        assert!(ledger.verify());
    }

    #[test]
    fn test_append_links_blocks() {
        let factory = TransactionFactory::new();
        let ledger = Ledger::new();
        let genesis = ledger.latest();

        let first = ledger.append(batch(&factory, 3));
        let second = ledger.append(batch(&factory, 1));

        assert_eq!(first.index(), 1);
        assert_eq!(first.previous_hash(), genesis.hash());
        assert_eq!(second.index(), 2);
        assert_eq!(second.previous_hash(), first.hash());
        assert_eq!(ledger.len(), 3);
        assert_eq!(ledger.transaction_count(), 4);
        assert!(ledger.validate().is_ok());
    }

    #[test]
    fn test_append_empty_batch() {
        let ledger = Ledger::new();
        let block = ledger.append(Vec::new());
        assert_eq!(block.index(), 1);
        assert!(ledger.verify());
    }

    #[test]
    fn test_tampered_amount_detected() {
        let ledger = ledger_with_blocks();
        assert!(ledger.verify());

        ledger.with_blocks_mut(|blocks| {
            blocks[2].transactions_mut()[0].tamper_amount(Decimal::new(999_999, 2));
        });

        assert!(!ledger.verify());
        match ledger.validate() {
            Err(Error::IntegrityViolation { index, .. }) => assert_eq!(index, 2),
            other => panic!("expected integrity violation, got {:?}", other),
        }
    }

    #[test]
    fn test_removed_transaction_detected() {
        let ledger = ledger_with_blocks();
        ledger.with_blocks_mut(|blocks| {
            blocks[1].transactions_mut().pop();
        });
        assert!(!ledger.verify());
    }

    #[test]
    fn test_broken_link_detected() {
        let ledger = ledger_with_blocks();
        ledger.with_blocks_mut(|blocks| {
            blocks[3].set_previous_hash([7u8; 32]);
        });
        assert!(!ledger.verify());
    }

    #[test]
    fn test_reordered_blocks_detected() {
        let ledger = ledger_with_blocks();
        ledger.with_blocks_mut(|blocks| blocks.swap(1, 2));
        assert!(!ledger.verify());
    }

    #[test]
    fn test_bad_genesis_detected() {
        let ledger = Ledger::new();
        ledger.with_blocks_mut(|blocks| blocks[0].set_index(5));
        assert!(!ledger.verify());

        let ledger = Ledger::new();
        ledger.with_blocks_mut(|blocks| blocks[0].set_previous_hash([1u8; 32]));
        assert!(!ledger.verify());
    }

    #[test]
    fn test_concurrent_appends_serialize() {
        let ledger = Arc::new(Ledger::new());
        let factory = Arc::new(TransactionFactory::new());

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let ledger = ledger.clone();
                let factory = factory.clone();
                std::thread::spawn(move || {
                    for _ in 0..25 {
                        ledger.append(batch(&factory, 2));
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(ledger.len(), 101);
        assert_eq!(ledger.transaction_count(), 200);
        assert!(ledger.verify());

        let indices: Vec<u64> = ledger.blocks().iter().map(Block::index).collect();
        assert_eq!(indices, (0..=100).collect::<Vec<u64>>());
    }
}
