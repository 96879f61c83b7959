use crate::empty_string_hash;
use bytes::Bytes;
use ethereum_types::{Address, H256, U256};
use serde::{Deserialize, Serialize};

/// World-state account record: nonce, balance, storage-root
/// and code-hash. Storage itself and the code blob are held out-of-line by
/// the `WorldState` implementation (`evm_core-trie`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub nonce: u64,
    pub balance: U256,
    pub storage_root: H256,
    pub code_hash: H256,
}

impl Account {
    pub fn is_empty(&self) -> bool {
        self.nonce == 0 && self.balance.is_zero() && self.code_hash == empty_string_hash()
    }

    pub fn has_code_or_nonce(&self) -> bool {
        self.nonce != 0 || self.code_hash != empty_string_hash()
    }
}

impl Default for Account {
    fn default() -> Self {
        Account {
            nonce: 0,
            balance: U256::zero(),
            storage_root: H256::zero(),
            code_hash: empty_string_hash(),
        }
    }
}

/// An EVM log entry (LOG0..LOG4): source address, up to 4 topics, data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Log {
    pub address: Address,
    pub topics: Vec<H256>,
    pub data: Bytes,
}

/// A Shanghai-era (EIP-4895) validator withdrawal: a block-level credit
/// applied after every transaction has run, outside gas accounting and
/// outside any transaction's journal. `amount` is denominated in gwei, as
/// on the wire; the core converts to wei before crediting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Withdrawal {
    pub index: u64,
    pub validator_index: u64,
    pub address: Address,
    pub amount: u64,
}
