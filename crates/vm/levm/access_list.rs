use ethereum_types::{Address, U256};
use std::collections::HashSet;

/// Warm/cold sets for EIP-2929, persistent for the whole transaction —
/// membership is *not* reverted across frame reverts.
/// Backed by `HashSet`; notes the observable behavior is set
/// semantics, an append-only ordered scan works equally well.
#[derive(Debug, Default, Clone)]
pub struct AccessList {
    warm_addresses: HashSet<Address>,
    warm_storage_keys: HashSet<(Address, U256)>,
}

impl AccessList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if `addr` was cold (i.e. newly inserted).
    pub fn insert_address(&mut self, addr: Address) -> bool {
        self.warm_addresses.insert(addr)
    }

    pub fn is_warm_address(&self, addr: Address) -> bool {
        self.warm_addresses.contains(&addr)
    }

    /// Returns `true` if `(addr, key)` was cold.
    pub fn insert_storage_key(&mut self, addr: Address, key: U256) -> bool {
        self.warm_storage_keys.insert((addr, key))
    }

    pub fn is_warm_storage_key(&self, addr: Address, key: U256) -> bool {
        self.warm_storage_keys.contains(&(addr, key))
    }
}
