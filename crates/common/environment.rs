use crate::fork::Fork;
use bytes::Bytes;
use ethereum_types::{Address, U256};
use serde::{Deserialize, Serialize};

/// Block metadata the core reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockEnv {
    pub base_fee: U256,
    pub beneficiary: Address,
    pub chain_id: u64,
    pub gas_limit: u64,
    pub number: u64,
    pub timestamp: u64,
    pub random: [u8; 32],
    #[serde(default)]
    pub fork: Fork,
}

/// Whether a transaction targets an existing account (a message call) or
/// has no `to` (contract creation).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxKind {
    Call(Address),
    Create,
}

/// A normalized transaction. Signature recovery happens
/// upstream of this core (explicit Non-goal); `origin` is already resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxEnv {
    pub origin: Address,
    pub kind: TxKind,
    pub value: U256,
    pub data: Bytes,
    pub gas_limit: u64,
    pub max_fee_per_gas: U256,
    pub max_priority_fee_per_gas: U256,
    pub nonce: u64,
    pub chain_id: Option<u64>,
    #[serde(default)]
    pub access_list: Vec<(Address, Vec<U256>)>,
    /// Transaction type id (0 legacy, 1 EIP-2930, 2 EIP-1559); used only
    /// to prefix the receipt.
    pub tx_type: u8,
}

impl TxEnv {
    pub fn is_create(&self) -> bool {
        matches!(self.kind, TxKind::Create)
    }

    pub fn to(&self) -> Option<Address> {
        match self.kind {
            TxKind::Call(addr) => Some(addr),
            TxKind::Create => None,
        }
    }
}
