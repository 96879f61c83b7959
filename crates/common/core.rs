//! Primitive types and constants shared by the execution core: addresses,
//! words, accounts, logs, fork configuration and the per-block/per-tx
//! environment the Transaction Driver and Call/Create Engine read from.
//!
//! Out of scope here (per the core's narrow-interface boundary): RLP wire
//! format (`evm_core-rlp`), trie storage (`evm_core-trie`), signature
//! recovery, and precompile implementations.

pub mod constants;
pub mod environment;
pub mod fork;
pub mod types;

pub use ethereum_types::{Address, H256, U256};
pub use constants::*;
pub use environment::{BlockEnv, TxEnv, TxKind};
pub use fork::Fork;
pub use types::{Account, Log, Withdrawal};

/// keccak256 of the empty byte string, the code-hash of an EOA / empty
/// account. Used throughout as the sentinel for "no code".
pub fn empty_string_hash() -> H256 {
    use sha3::{Digest, Keccak256};
    let digest = Keccak256::digest([]);
    H256::from_slice(&digest)
}

pub fn keccak256(data: &[u8]) -> H256 {
    use sha3::{Digest, Keccak256};
    let digest = Keccak256::digest(data);
    H256::from_slice(&digest)
}
