//! Block and transaction hashing for hash notifications

use sha2::{Digest, Sha256};

/// 32-byte digest in internal byte order
pub type Hash256 = [u8; 32];

/// Serialized block header length
pub const BLOCK_HEADER_SIZE: usize = 80;

/// Chain-specific identifier hashing
///
/// Implementations return digests in internal byte order; the bus reverses
/// them into display order before publishing.
pub trait ChainHasher: Send + Sync {
    /// Hash an 80-byte serialized block header
    fn block_hash(&self, header: &[u8]) -> Hash256;

    /// Hash a full serialized transaction
    fn tx_hash(&self, tx: &[u8]) -> Hash256;
}

/// Double SHA256 for both blocks and transactions
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256dHasher;

impl ChainHasher for Sha256dHasher {
    fn block_hash(&self, header: &[u8]) -> Hash256 {
        double_sha256(header)
    }

    fn tx_hash(&self, tx: &[u8]) -> Hash256 {
        double_sha256(tx)
    }
}

/// Calculate double SHA256
pub fn double_sha256(data: &[u8]) -> Hash256 {
    let first_hash = Sha256::digest(data);
    let second_hash = Sha256::digest(first_hash);
    let mut result = [0u8; 32];
    result.copy_from_slice(&second_hash);
    result
}

/// Reverse an internal-order digest into display order
pub fn to_display_order(hash: Hash256) -> Hash256 {
    let mut reversed = hash;
    reversed.reverse();
    reversed
}

/// Conventional hex form of a digest (as printed by RPC and explorers)
pub fn display_hex(hash: &Hash256) -> String {
    hex::encode(to_display_order(*hash))
}
