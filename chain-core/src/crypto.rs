//! Hashing helpers for transactions and blocks
//!
//! This module provides:
//! - The fixed-width [`Hash`] digest type (SHA-256, 32 bytes)
//! - The genesis sentinel used as the first block's previous hash
//! - Hex rendering for logs and reports

use sha2::{Digest, Sha256};

/// 32-byte SHA-256 digest
pub type Hash = [u8; 32];

/// Previous-hash sentinel carried by the genesis block
pub const GENESIS_PREVIOUS_HASH: Hash = [0u8; 32];

/// Number of hex characters shown by [`short_hex`]
pub const SHORT_HASH_LEN: usize = 16;

/// Hash arbitrary bytes using SHA-256
pub fn hash_bytes(data: &[u8]) -> Hash {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Feed a length-prefixed field into a running hasher.
///
/// Prefixing keeps adjacent variable-length fields unambiguous
/// (`"ab" ∥ "c"` and `"a" ∥ "bc"` hash differently).
pub(crate) fn update_field(hasher: &mut Sha256, field: &[u8]) {
    hasher.update((field.len() as u64).to_be_bytes());
    hasher.update(field);
}

/// Lowercase hex encoding of a digest
pub fn to_hex(hash: &Hash) -> String {
    hex::encode(hash)
}

/// Abbreviated hex encoding used in reports
pub fn short_hex(hash: &Hash) -> String {
    let mut full = to_hex(hash);
    full.truncate(SHORT_HASH_LEN);
    full
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_bytes() {
        let data = b"test data";
        let hash1 = hash_bytes(data);
        let hash2 = hash_bytes(data);

        // Same data should produce same hash
        assert_eq!(hash1, hash2);

        // Different data should produce different hash
        let hash3 = hash_bytes(b"different data");
        assert_ne!(hash1, hash3);
    }

    #[test]
    fn test_known_vector() {
        // SHA-256("abc")
        assert_eq!(
            to_hex(&hash_bytes(b"abc")),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_update_field_is_unambiguous() {
        let mut a = Sha256::new();
        update_field(&mut a, b"ab");
        update_field(&mut a, b"c");

        let mut b = Sha256::new();
        update_field(&mut b, b"a");
        update_field(&mut b, b"bc");

        let a: Hash = a.finalize().into();
        let b: Hash = b.finalize().into();
        assert_ne!(a, b);
    }

    #[test]
    fn test_short_hex() {
        let short = short_hex(&hash_bytes(b"abc"));
        assert_eq!(short.len(), SHORT_HASH_LEN);
        assert_eq!(short, "ba7816bf8f01cfea");
    }

    #[test]
    fn test_genesis_sentinel_is_zero() {
        assert!(GENESIS_PREVIOUS_HASH.iter().all(|b| *b == 0));
    }
}
