//! Core types for the chain
//!
//! All types are designed for:
//! - Deterministic fingerprints (SHA-256 over length-prefixed fields)
//! - Immutability once sealed (private fields, read accessors)
//! - Exact arithmetic (Decimal for amounts)

use crate::crypto::{self, Hash, GENESIS_PREVIOUS_HASH};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Account label (sender or receiver of a transaction)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountId(String);

impl AccountId {
    /// Create new account ID
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get as string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A transfer between two accounts, fingerprinted at creation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    id: u64,
    from: AccountId,
    to: AccountId,
    amount: Decimal,
    timestamp: DateTime<Utc>,
    hash: Hash,
}

impl Transaction {
    /// Build a transaction from explicit parts and fingerprint it.
    ///
    /// Normal callers go through [`TransactionFactory::create`], which
    /// assigns the id and timestamp.
    pub fn from_parts(
        id: u64,
        from: AccountId,
        to: AccountId,
        amount: Decimal,
        timestamp: DateTime<Utc>,
    ) -> Self {
        let mut tx = Self {
            id,
            from,
            to,
            amount,
            timestamp,
            hash: [0u8; 32],
        };
        tx.hash = tx.compute_hash();
        tx
    }

    /// Recompute the fingerprint from the current fields.
    ///
    /// Covers (id, from, to, amount, timestamp seconds).
    pub fn compute_hash(&self) -> Hash {
        let mut hasher = Sha256::new();
        hasher.update(self.id.to_be_bytes());
        crypto::update_field(&mut hasher, self.from.as_str().as_bytes());
        crypto::update_field(&mut hasher, self.to.as_str().as_bytes());
        crypto::update_field(&mut hasher, self.amount.normalize().to_string().as_bytes());
        hasher.update(self.timestamp.timestamp().to_be_bytes());
        hasher.finalize().into()
    }

    /// Unique, creation-ordered identifier
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Sender
    pub fn from(&self) -> &AccountId {
        &self.from
    }

    /// Receiver
    pub fn to(&self) -> &AccountId {
        &self.to
    }

    /// Amount transferred
    pub fn amount(&self) -> Decimal {
        self.amount
    }

    /// Creation time
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Stored fingerprint
    pub fn hash(&self) -> &Hash {
        &self.hash
    }

    #[cfg(test)]
    pub(crate) fn tamper_amount(&mut self, amount: Decimal) {
        self.amount = amount;
    }
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} {} -> {}: {}", self.id, self.from, self.to, self.amount)
    }
}

/// Issues transactions with unique, strictly increasing ids.
///
/// Shared between sources behind an `Arc`; one factory per pipeline keeps
/// tests isolated from each other.
#[derive(Debug, Default)]
pub struct TransactionFactory {
    last_id: AtomicU64,
}

impl TransactionFactory {
    /// Create a factory whose first id is 1
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a transaction stamped with the current time
    pub fn create(&self, from: AccountId, to: AccountId, amount: Decimal) -> Transaction {
        let id = self.last_id.fetch_add(1, Ordering::Relaxed) + 1;
        Transaction::from_parts(id, from, to, amount, Utc::now())
    }

    /// Number of transactions issued so far
    pub fn issued(&self) -> u64 {
        self.last_id.load(Ordering::Relaxed)
    }
}

/// Hash-sealed batch of transactions linked to its predecessor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    index: u64,
    transactions: Vec<Transaction>,
    previous_hash: Hash,
    hash: Hash,
    timestamp: DateTime<Utc>,
}

impl Block {
    /// Build a block and seal its hash
    pub fn seal(transactions: Vec<Transaction>, previous_hash: Hash, index: u64) -> Self {
        let mut block = Self {
            index,
            transactions,
            previous_hash,
            hash: [0u8; 32],
            timestamp: Utc::now(),
        };
        block.hash = block.compute_hash();
        block
    }

    /// Genesis block: index 0, no transactions, sentinel previous hash
    pub fn genesis() -> Self {
        Self::seal(Vec::new(), GENESIS_PREVIOUS_HASH, 0)
    }

    /// Compute block hash
    ///
    /// SHA-256(index ∥ previous hash ∥ transaction hashes in order ∥ timestamp seconds).
    pub fn compute_hash(&self) -> Hash {
        let mut hasher = Sha256::new();
        hasher.update(self.index.to_be_bytes());
        hasher.update(self.previous_hash);
        for tx in &self.transactions {
            hasher.update(tx.hash());
        }
        hasher.update(self.timestamp.timestamp().to_be_bytes());
        hasher.finalize().into()
    }

    /// Append transactions to an uncommitted block and re-seal it
    pub fn append_transactions(&mut self, transactions: impl IntoIterator<Item = Transaction>) {
        self.transactions.extend(transactions);
        self.hash = self.compute_hash();
    }

    /// Position in the chain
    pub fn index(&self) -> u64 {
        self.index
    }

    /// Transactions in commit order
    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    /// Hash of the preceding block
    pub fn previous_hash(&self) -> &Hash {
        &self.previous_hash
    }

    /// Stored hash
    pub fn hash(&self) -> &Hash {
        &self.hash
    }

    /// Seal time
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Full hex hash
    pub fn hash_hex(&self) -> String {
        crypto::to_hex(&self.hash)
    }

    /// Abbreviated hex hash for reports
    pub fn short_hash(&self) -> String {
        crypto::short_hex(&self.hash)
    }

    #[cfg(test)]
    pub(crate) fn transactions_mut(&mut self) -> &mut Vec<Transaction> {
        &mut self.transactions
    }

    #[cfg(test)]
    pub(crate) fn set_previous_hash(&mut self, previous_hash: Hash) {
        self.previous_hash = previous_hash;
    }

    #[cfg(test)]
    pub(crate) fn set_index(&mut self, index: u64) {
        self.index = index;
    }
}
