//! Receipt assembly: `[status, cumulative_gas, bloom, logs]`,
//! optionally prefixed by a one-byte transaction type for typed
//! transactions, inserted into the receipts trie keyed by `RLP(tx_index)`.

use crate::bloom::LogsBloom;
use bytes::Bytes;
use evm_core_common::Log;
use evm_core_rlp::{encode_list, encode_list_raw, encode_to_vec, Encoder, RLPEncode};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    pub tx_type: u8,
    pub status: bool,
    pub cumulative_gas_used: u64,
    pub bloom: LogsBloom,
    pub logs: Vec<Log>,
}

impl Receipt {
    /// A receipt for a transaction whose execution failed validation or
    /// reverted: logs and bloom are cleared to empty.
    pub fn failed(tx_type: u8, cumulative_gas_used: u64) -> Self {
        Self {
            tx_type,
            status: false,
            cumulative_gas_used,
            bloom: LogsBloom::new(),
            logs: Vec::new(),
        }
    }

    pub fn succeeded(tx_type: u8, cumulative_gas_used: u64, logs: Vec<Log>) -> Self {
        let mut bloom = LogsBloom::new();
        bloom.add_entries(&logs);
        Self {
            tx_type,
            status: true,
            cumulative_gas_used,
            bloom,
            logs,
        }
    }

    /// `[status, cumulative_gas, bloom, logs]`, optionally prefixed by the
    /// one-byte type id for EIP-2930/1559 transactions.
    pub fn encode(&self) -> Vec<u8> {
        let log_items: Vec<Vec<u8>> = self.logs.iter().map(encode_log).collect();
        let mut logs_buf = Vec::new();
        encode_list_raw(&log_items, &mut logs_buf);

        let mut list_buf = Vec::new();
        Encoder::new()
            .field(&self.status)
            .field(&self.cumulative_gas_used)
            .field(&self.bloom)
            .raw_field(&logs_buf)
            .finish(&mut list_buf);

        if self.tx_type == 0 {
            list_buf
        } else {
            let mut out = vec![self.tx_type];
            out.extend_from_slice(&list_buf);
            out
        }
    }
}

fn encode_log(log: &Log) -> Vec<u8> {
    let topics_buf = {
        let mut buf = Vec::new();
        encode_list(&log.topics, &mut buf);
        buf
    };
    let mut buf = Vec::new();
    Encoder::new()
        .field(&log.address)
        .raw_field(&topics_buf)
        .field(&Bytes::from(log.data.to_vec()))
        .finish(&mut buf);
    buf
}

/// RLP-encodes the tx index as the receipts-trie key
/// (`insert_receipt(index_rlp, receipt_rlp)`).
pub fn index_key(index: u64) -> Vec<u8> {
    encode_to_vec(&index)
}

#[cfg(test)]
mod test {
    use super::*;
    use ethereum_types::{Address, H256, U256};

    #[test]
    fn failed_receipt_has_empty_logs_and_bloom() {
        let receipt = Receipt::failed(0, 21000);
        assert!(!receipt.status);
        assert!(receipt.logs.is_empty());
        assert_eq!(receipt.bloom.as_bytes(), [0u8; 256]);
    }

    #[test]
    fn succeeded_receipt_folds_logs_into_bloom() {
        let log = Log {
            address: Address::from_low_u64_be(1),
            topics: vec![H256::from_low_u64_be(2)],
            data: Bytes::new(),
        };
        let receipt = Receipt::succeeded(0, 21000, vec![log.clone()]);
        assert!(receipt.bloom.may_contain_entry(log.address.as_bytes()));
    }

    #[test]
    fn encode_is_deterministic() {
        let receipt = Receipt::succeeded(2, 50_000, vec![]);
        let a = receipt.encode();
        let b = receipt.encode();
        assert_eq!(a, b);
        assert_eq!(a[0], 2, "typed receipts are prefixed by their type id");
    }

    #[test]
    fn legacy_receipt_has_no_type_prefix() {
        let receipt = Receipt::succeeded(0, 1, vec![]);
        let encoded = receipt.encode();
        // A legacy (type-0) receipt begins directly with the RLP list
        // header, never a type byte.
        assert!(encoded[0] >= 0xc0);
        let _ = U256::zero();
    }
}
