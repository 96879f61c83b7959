use bytes::Bytes;
use ethereum_types::{Address, H256, U256};
use evm_core_common::Account;

/// The storage engine's contract with the execution core.
/// The core treats world state as a transactional store: reads are
/// lookups, writes go through the engine's own Journal before
/// landing here — this trait itself is not transactional.
pub trait WorldState {
    fn read_account(&self, addr: Address) -> Option<Account>;
    fn write_account(&mut self, addr: Address, account: Account);
    fn delete_account(&mut self, addr: Address);

    fn read_storage(&self, addr: Address, key: U256) -> U256;
    fn write_storage(&mut self, addr: Address, key: U256, value: U256);

    /// Stages code under its keccak hash, verified by the caller
    /// before this is invoked — the store itself trusts the hash given.
    fn write_code(&mut self, code_hash: H256, code: Bytes);
    fn read_code(&self, code_hash: H256) -> Option<Bytes>;

    fn hash_state(&self) -> H256;
    fn hash_txn_trie(&self) -> H256;
    fn hash_receipts_trie(&self) -> H256;

    fn insert_receipt(&mut self, index_rlp: Vec<u8>, receipt_rlp: Vec<u8>);
    fn insert_transaction(&mut self, index_rlp: Vec<u8>, tx_rlp: Vec<u8>);
    fn append_trie_data(&mut self, bytes: &[u8]);
}
