//! 2048-bit logs bloom. Maintained per-transaction and folded
//! into a per-block bloom by the host (OR of the per-tx blooms, which is
    //! outside this core's scope — it only ever accumulates within one
    //! transaction's logs).

use ethereum_types::{Address, H256};
use evm_core_common::{keccak256, Log};

/// A 2048-bit (256-byte) bloom filter, laid out identically to the
/// yellow paper's `O(T_r)` so `as_bytes` RLP-encodes directly as a
/// 256-byte string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogsBloom([u8; 256]);

impl Default for LogsBloom {
    fn default() -> Self {
        Self([0u8; 256])
    }
}

impl LogsBloom {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Folds one log entry's address and topics in: three
    /// 11-bit indices per hashed entry.
    pub fn add_log(&mut self, log: &Log) {
        self.add_entry(log.address.as_bytes());
        for topic in &log.topics {
            self.add_entry(topic.as_bytes());
        }
    }

    pub fn add_entries<'a>(&mut self, logs: impl IntoIterator<Item = &'a Log>) {
        for log in logs {
            self.add_log(log);
        }
    }

    /// One bloom entry: `keccak256(entry)`'s first three big-endian 16-bit
    /// chunks, each masked to 11 bits, set bit `0x7FF - (chunk & 0x7FF)`
    /// counting from the low end — the yellow-paper orientation (§4.8).
    fn add_entry(&mut self, entry: &[u8]) {
        let hash = keccak256(entry);
        for chunk_index in 0..3 {
            let hi = hash[chunk_index * 2];
            let lo = hash[chunk_index * 2 + 1];
            let chunk = u16::from_be_bytes([hi, lo]) & 0x7ff;
            let bit_index = 0x7ff - chunk as usize;
            self.set_bit(bit_index);
        }
    }

    fn set_bit(&mut self, bit_index: usize) {
        // Bit 0 is the low bit of the last byte (big-endian byte order,
            // bits numbered from the most-significant end of the filter).
        let byte_index = 255 - bit_index / 8;
        let bit_in_byte = bit_index % 8;
        self.0[byte_index] |= 1 << bit_in_byte;
    }

    fn has_bit(&self, bit_index: usize) -> bool {
        let byte_index = 255 - bit_index / 8;
        let bit_in_byte = bit_index % 8;
        self.0[byte_index] & (1 << bit_in_byte) != 0
    }

    /// Whether `entry`'s three hashed-chunk bits are all set in this
    /// bloom — a necessary (not sufficient) condition for membership.
    pub fn may_contain_entry(&self, entry: &[u8]) -> bool {
        let hash = keccak256(entry);
        (0..3).all(|chunk_index| {
                let hi = hash[chunk_index * 2];
                let lo = hash[chunk_index * 2 + 1];
                let chunk = u16::from_be_bytes([hi, lo]) & 0x7ff;
                self.has_bit(0x7ff - chunk as usize)
        })
    }
}

/// Hashes an address the same way a log's source contributes to the
/// bloom, for external membership checks (e.g. a block-level log filter
    /// checking "could this address have logged in this block").
pub fn address_entry(addr: Address) -> Vec<u8> {
    addr.as_bytes().to_vec()
}

pub fn topic_entry(topic: H256) -> Vec<u8> {
    topic.as_bytes().to_vec()
}

impl evm_core_rlp::RLPEncode for LogsBloom {
    fn encode(&self, buf: &mut Vec<u8>) {
        self.0.to_vec().encode(buf)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use bytes::Bytes;

    fn sample_log() -> Log {
        Log {
            address: Address::from_low_u64_be(0xdead),
            topics: vec![H256::from_low_u64_be(1), H256::from_low_u64_be(2)],
            data: Bytes::new(),
        }
    }

    #[test]
    fn bloom_is_deterministic() {
        let log = sample_log();
        let mut a = LogsBloom::new();
        let mut b = LogsBloom::new();
        a.add_log(&log);
        b.add_log(&log);
        assert_eq!(a, b);
    }

    #[test]
    fn every_set_bit_is_justified_by_an_entry() {
        let log = sample_log();
        let mut bloom = LogsBloom::new();
        bloom.add_log(&log);
        assert!(bloom.may_contain_entry(log.address.as_bytes()));
        for topic in &log.topics {
            assert!(bloom.may_contain_entry(topic.as_bytes()));
        }
    }

    #[test]
    fn unrelated_entry_is_usually_absent() {
        let log = sample_log();
        let mut bloom = LogsBloom::new();
        bloom.add_log(&log);
        let unrelated = Address::from_low_u64_be(0xbeef);
        assert!(!bloom.may_contain_entry(unrelated.as_bytes()));
    }

    #[test]
    fn empty_bloom_has_no_bits_set() {
        let bloom = LogsBloom::new();
        assert_eq!(bloom.as_bytes(), [0u8; 256]);
    }
}
