//! Minimal consensus-serialization reader
//!
//! Splits a serialized block into its header and per-transaction byte
//! ranges so a connected block can be announced transaction by
//! transaction. Nothing is re-encoded: every slice points into the
//! original buffer, so `hash(slice)` is the transaction id.
//!
//! Transactions follow the legacy layout. Special transactions
//! (16-bit version >= 3 with a non-zero 16-bit type) carry a trailing
//! CompactSize-prefixed extra payload.

use super::error::NotifyError;
use super::hash::BLOCK_HEADER_SIZE;

/// Lowest transaction version that may carry an extra payload
const SPECIAL_TX_VERSION: u16 = 3;

/// A block split into borrowed parts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockParts<'a> {
    pub header: &'a [u8],
    pub transactions: Vec<&'a [u8]>,
}

/// Split a serialized block into header and transactions
pub fn split_block(raw: &[u8]) -> Result<BlockParts<'_>, NotifyError> {
    let mut reader = Reader::new(raw);
    let header = reader.take(BLOCK_HEADER_SIZE)?;
    let tx_count = reader.read_compact_size()?;

    // Each transaction is at least 10 bytes; cap the reservation accordingly
    let mut transactions = Vec::with_capacity((tx_count as usize).min(reader.remaining() / 10));
    for _ in 0..tx_count {
        let start = reader.position();
        skip_transaction(&mut reader)?;
        transactions.push(&raw[start..reader.position()]);
    }

    if reader.remaining() != 0 {
        return Err(NotifyError::Malformed(format!(
            "{} trailing bytes after {} transactions",
            reader.remaining(),
            tx_count
        )));
    }

    Ok(BlockParts {
        header,
        transactions,
    })
}

fn skip_transaction(reader: &mut Reader<'_>) -> Result<(), NotifyError> {
    let version = reader.read_u16_le()?;
    let tx_type = reader.read_u16_le()?;

    let input_count = reader.read_compact_size()?;
    for _ in 0..input_count {
        reader.take(32 + 4)?; // prevout
        reader.skip_var_bytes()?; // script_sig
        reader.take(4)?; // sequence
    }

    let output_count = reader.read_compact_size()?;
    for _ in 0..output_count {
        reader.take(8)?; // value
        reader.skip_var_bytes()?; // script_pubkey
    }

    reader.take(4)?; // lock_time

    if version >= SPECIAL_TX_VERSION && tx_type != 0 {
        reader.skip_var_bytes()?;
    }
    Ok(())
}

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn position(&self) -> usize {
        self.pos
    }

    fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], NotifyError> {
        if n > self.remaining() {
            return Err(NotifyError::Malformed(format!(
                "unexpected end of data at offset {} (need {} bytes, {} left)",
                self.pos,
                n,
                self.remaining()
            )));
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn read_u8(&mut self) -> Result<u8, NotifyError> {
        Ok(self.take(1)?[0])
    }

    fn read_u16_le(&mut self) -> Result<u16, NotifyError> {
        let bytes = self.take(2)?;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    fn read_u32_le(&mut self) -> Result<u32, NotifyError> {
        let bytes = self.take(4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn read_u64_le(&mut self) -> Result<u64, NotifyError> {
        let bytes = self.take(8)?;
        let mut buf = [0u8; 8];
        buf.copy_from_slice(bytes);
        Ok(u64::from_le_bytes(buf))
    }

    fn read_compact_size(&mut self) -> Result<u64, NotifyError> {
        match self.read_u8()? {
            0xfd => Ok(u64::from(self.read_u16_le()?)),
            0xfe => Ok(u64::from(self.read_u32_le()?)),
            0xff => self.read_u64_le(),
            n => Ok(u64::from(n)),
        }
    }

    fn skip_var_bytes(&mut self) -> Result<(), NotifyError> {
        let len = self.read_compact_size()?;
        let len = usize::try_from(len)
            .map_err(|_| NotifyError::Malformed(format!("length {len} overflows usize")))?;
        self.take(len)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coinbase_tx(height: u8) -> Vec<u8> {
        let mut tx = Vec::new();
        tx.extend_from_slice(&1u32.to_le_bytes());
        tx.push(1); // one input
        tx.extend_from_slice(&[0u8; 32]);
        tx.extend_from_slice(&u32::MAX.to_le_bytes());
        tx.extend_from_slice(&[2, 0x51, height]); // script_sig
        tx.extend_from_slice(&u32::MAX.to_le_bytes());
        tx.push(1); // one output
        tx.extend_from_slice(&5_000_000_000u64.to_le_bytes());
        tx.extend_from_slice(&[1, 0x51]);
        tx.extend_from_slice(&0u32.to_le_bytes());
        tx
    }

    fn special_tx() -> Vec<u8> {
        let mut tx = Vec::new();
        tx.extend_from_slice(&3u16.to_le_bytes());
        tx.extend_from_slice(&5u16.to_le_bytes()); // coinbase payload type
        tx.push(0); // no inputs
        tx.push(0); // no outputs
        tx.extend_from_slice(&0u32.to_le_bytes());
        tx.extend_from_slice(&[3, 0xaa, 0xbb, 0xcc]); // extra payload
        tx
    }

    fn block_with(txs: &[Vec<u8>]) -> Vec<u8> {
        let mut block = vec![0x11u8; BLOCK_HEADER_SIZE];
        block.push(txs.len() as u8);
        for tx in txs {
            block.extend_from_slice(tx);
        }
        block
    }

    #[test]
    fn test_split_single_coinbase() {
        let tx = coinbase_tx(1);
        let block = block_with(&[tx.clone()]);
        let parts = split_block(&block).unwrap();
        assert_eq!(parts.header, &block[..BLOCK_HEADER_SIZE]);
        assert_eq!(parts.transactions, vec![tx.as_slice()]);
    }

    #[test]
    fn test_split_preserves_order() {
        let txs = vec![coinbase_tx(1), special_tx(), coinbase_tx(2)];
        let block = block_with(&txs);
        let parts = split_block(&block).unwrap();
        assert_eq!(parts.transactions.len(), 3);
        for (got, want) in parts.transactions.iter().zip(&txs) {
            assert_eq!(*got, want.as_slice());
        }
    }

    #[test]
    fn test_extra_payload_only_for_special_versions() {
        split_block(&block_with(&[special_tx()])).unwrap();

        // Version 2 with a type field set carries no payload
        let mut tx = special_tx();
        tx[0] = 2;
        assert!(matches!(
            split_block(&block_with(&[tx.clone()])),
            Err(NotifyError::Malformed(_))
        ));
        tx.truncate(tx.len() - 4);
        let block = block_with(&[tx.clone()]);
        assert_eq!(split_block(&block).unwrap().transactions, vec![tx.as_slice()]);
    }

    #[test]
    fn test_truncated_block_rejected() {
        let block = block_with(&[coinbase_tx(1)]);
        assert!(matches!(
            split_block(&block[..block.len() - 1]),
            Err(NotifyError::Malformed(_))
        ));
        assert!(split_block(&block[..40]).is_err());
    }

    #[test]
    fn test_trailing_bytes_rejected() {
        let mut block = block_with(&[coinbase_tx(1)]);
        block.push(0);
        assert!(split_block(&block).is_err());
    }

    #[test]
    fn test_compact_size_forms() {
        let mut reader = Reader::new(&[0xfc, 0xfd, 0x34, 0x12, 0xfe, 1, 0, 0, 0]);
        assert_eq!(reader.read_compact_size().unwrap(), 0xfc);
        assert_eq!(reader.read_compact_size().unwrap(), 0x1234);
        assert_eq!(reader.read_compact_size().unwrap(), 1);
        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn test_huge_count_does_not_preallocate() {
        let mut block = vec![0u8; BLOCK_HEADER_SIZE];
        block.extend_from_slice(&[0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0x7f]);
        assert!(split_block(&block).is_err());
    }
}
