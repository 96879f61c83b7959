//! Thin facade over `evm_core-levm`: the crate a host (CLI, RPC node,
//! prover driver) actually depends on. Re-exports the Top-Level Loop entry
//! point and the types needed to call it, without exposing the Engine's
//! internals to callers who only want to run blocks.

pub use evm_core_levm::{
    run_block, BlockClaims, BlockOutcome, DefaultPrecompiles, DriverError, InvalidTxError,
    PrecompileProvider, Receipt, TxOutcome, VMError,
};
pub use evm_core_trie::{InMemoryWorldState, WorldState};
pub use evm_core_common::{Account, BlockEnv, Fork, Log, TxEnv, TxKind, Withdrawal};
