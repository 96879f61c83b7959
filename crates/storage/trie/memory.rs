use crate::state::WorldState;
use bytes::Bytes;
use ethereum_types::{Address, H256, U256};
use evm_core_common::{keccak256, Account};
use std::collections::BTreeMap;

/// Reference `WorldState` used by the engine's own tests and by the
/// `evm_core` CLI when no persistent backend is wired up. Root hashes are
/// `keccak256` over the sorted, RLP-flavored byte concatenation of the
/// relevant entries — deterministic and collision-resistant enough to
/// detect divergence, but not a Merkle-Patricia trie root (see trie.rs).
#[derive(Debug, Default, Clone)]
pub struct InMemoryWorldState {
    accounts: BTreeMap<Address, Account>,
    storage: BTreeMap<(Address, U256), U256>,
    code: BTreeMap<H256, Bytes>,
    receipts: BTreeMap<Vec<u8>, Vec<u8>>,
    transactions: BTreeMap<Vec<u8>, Vec<u8>>,
    trie_data: Vec<u8>,
}

impl InMemoryWorldState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds an account directly, bypassing the journal — used to build
    /// pre-state fixtures in tests.
    pub fn seed_account(&mut self, addr: Address, account: Account) {
        self.accounts.insert(addr, account);
    }

    pub fn seed_storage(&mut self, addr: Address, key: U256, value: U256) {
        self.storage.insert((addr, key), value);
    }

    fn storage_root_of(&self, addr: Address) -> H256 {
        let mut buf = Vec::new();
        for ((a, key), value) in self.storage.range((addr, U256::zero())..) {
            if *a != addr {
                break;
            }
            let mut key_bytes = [0u8; 32];
            key.to_big_endian(&mut key_bytes);
            let mut value_bytes = [0u8; 32];
            value.to_big_endian(&mut value_bytes);
            buf.extend_from_slice(&key_bytes);
            buf.extend_from_slice(&value_bytes);
        }
        keccak256(&buf)
    }
}

impl WorldState for InMemoryWorldState {
    fn read_account(&self, addr: Address) -> Option<Account> {
        self.accounts.get(&addr).cloned()
    }

    fn write_account(&mut self, addr: Address, mut account: Account) {
        account.storage_root = self.storage_root_of(addr);
        self.accounts.insert(addr, account);
    }

    fn delete_account(&mut self, addr: Address) {
        self.accounts.remove(&addr);
        self.storage.retain(|(a, _), _| *a != addr);
    }

    fn read_storage(&self, addr: Address, key: U256) -> U256 {
        self.storage.get(&(addr, key)).copied().unwrap_or_default()
    }

    fn write_storage(&mut self, addr: Address, key: U256, value: U256) {
        if value.is_zero() {
            self.storage.remove(&(addr, key));
        } else {
            self.storage.insert((addr, key), value);
        }
        if let Some(account) = self.accounts.get_mut(&addr) {
            // `storage_root` is recomputed lazily from `storage_root_of` on
            // every hash; the stored field is left stale rather than
            // rehashing eagerly on each SSTORE.
            account.storage_root = H256::zero();
        }
    }

    fn write_code(&mut self, code_hash: H256, code: Bytes) {
        self.code.insert(code_hash, code);
    }

    fn read_code(&self, code_hash: H256) -> Option<Bytes> {
        self.code.get(&code_hash).cloned()
    }

    fn hash_state(&self) -> H256 {
        let mut buf = Vec::new();
        for (addr, account) in &self.accounts {
            buf.extend_from_slice(addr.as_bytes());
            buf.extend_from_slice(&account.nonce.to_be_bytes());
            let mut balance = [0u8; 32];
            account.balance.to_big_endian(&mut balance);
            buf.extend_from_slice(&balance);
            buf.extend_from_slice(self.storage_root_of(*addr).as_bytes());
            buf.extend_from_slice(account.code_hash.as_bytes());
        }
        keccak256(&buf)
    }

    fn hash_txn_trie(&self) -> H256 {
        let mut buf = Vec::new();
        for (k, v) in &self.transactions {
            buf.extend_from_slice(k);
            buf.extend_from_slice(v);
        }
        keccak256(&buf)
    }

    fn hash_receipts_trie(&self) -> H256 {
        let mut buf = Vec::new();
        for (k, v) in &self.receipts {
            buf.extend_from_slice(k);
            buf.extend_from_slice(v);
        }
        keccak256(&buf)
    }

    fn insert_receipt(&mut self, index_rlp: Vec<u8>, receipt_rlp: Vec<u8>) {
        self.receipts.insert(index_rlp, receipt_rlp);
    }

    fn insert_transaction(&mut self, index_rlp: Vec<u8>, tx_rlp: Vec<u8>) {
        self.transactions.insert(index_rlp, tx_rlp);
    }

    fn append_trie_data(&mut self, bytes: &[u8]) {
        self.trie_data.extend_from_slice(bytes);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn hash_state_is_deterministic() {
        let mut a = InMemoryWorldState::new();
        let mut b = InMemoryWorldState::new();
        let addr = Address::from_low_u64_be(1);
        let account = Account {
            nonce: 1,
            balance: U256::from(100),
            ..Default::default()
        };
        a.write_account(addr, account.clone());
        b.write_account(addr, account);
        assert_eq!(a.hash_state(), b.hash_state());
    }

    #[test]
    fn hash_state_changes_with_storage() {
        let mut ws = InMemoryWorldState::new();
        let addr = Address::from_low_u64_be(1);
        ws.write_account(addr, Account::default());
        let before = ws.hash_state();
        ws.write_storage(addr, U256::from(1), U256::from(42));
        ws.write_account(addr, ws.read_account(addr).unwrap());
        let after = ws.hash_state();
        assert_ne!(before, after);
    }

    #[test]
    fn delete_account_removes_its_storage() {
        let mut ws = InMemoryWorldState::new();
        let addr = Address::from_low_u64_be(1);
        ws.write_account(addr, Account::default());
        ws.write_storage(addr, U256::from(1), U256::from(7));
        ws.delete_account(addr);
        assert_eq!(ws.read_storage(addr, U256::from(1)), U256::zero());
        assert!(ws.read_account(addr).is_none());
    }
}
