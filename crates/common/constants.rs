//! Constants table, Shanghai defaults. Values that change across forks
//! (refund quotient, selfdestruct semantics) are parameterized through
//! `Fork` rather than hardcoded.

pub const GAS_TRANSACTION: u64 = 21_000;
pub const GAS_TXDATAZERO: u64 = 4;
pub const GAS_TXDATANONZERO: u64 = 16;
pub const GAS_TXCREATE: u64 = 32_000;
pub const GAS_CREATE: u64 = 32_000;
pub const GAS_CODEDEPOSIT: u64 = 200;
pub const GAS_CALLVALUE: u64 = 9_000;
pub const GAS_CALLSTIPEND: u64 = 2_300;
pub const GAS_NEWACCOUNT: u64 = 25_000;
pub const GAS_WARMACCESS: u64 = 100;
pub const GAS_COLDACCOUNTACCESS: u64 = 2_600;
pub const GAS_SELFDESTRUCT: u64 = 5_000;
pub const GAS_LOG: u64 = 375;
pub const GAS_LOGTOPIC: u64 = 375;
pub const GAS_LOGDATA: u64 = 8;
pub const GAS_KECCAK256: u64 = 30;
pub const GAS_KECCAK256WORD: u64 = 6;

pub const MAX_CODE_SIZE: usize = 24_576;
pub const MAX_INITCODE_SIZE: usize = 49_152;
pub const INITCODE_WORD_COST: u64 = 2;
pub const MAX_REFUND_QUOTIENT: u64 = 5;
/// Pre-EIP-3529 refund quotient, kept for fork-parameterized gas accounting.
pub const MAX_REFUND_QUOTIENT_PRE_LONDON: u64 = 2;
pub const MAX_NONCE: u64 = u64::MAX;
pub const CALL_STACK_LIMIT: usize = 1024;
pub const STACK_LIMIT: usize = 1024;

pub const PRECOMPILE_COUNT_PRE_BYZANTIUM: u64 = 4;
pub const PRECOMPILE_COUNT_SHANGHAI: u64 = 9;

/// SSTORE/SLOAD storage-slot access costs, EIP-2929. Distinct from the
/// account-level `GAS_COLDACCOUNTACCESS` above but needed to meter
/// SSTORE/SLOAD at all.
pub const GAS_COLD_SLOAD: u64 = 2_100;
/// Same value as `GAS_WARMACCESS`; kept as a distinct name for storage-slot
/// reads so call sites read naturally.
pub const GAS_WARM_SLOAD: u64 = GAS_WARMACCESS;
/// EIP-2200 `SSTORE` cost to set a zero slot to a non-zero value.
pub const GAS_SSTORE_SET: u64 = 20_000;
/// EIP-2200 `SSTORE` cost to change a non-zero slot to a different value.
pub const GAS_SSTORE_RESET: u64 = 5_000;
/// EIP-3529 refund for clearing a non-zero slot back to zero (lowered
/// from the pre-3529 value of 15000, consistent with the refund-quotient
/// change the same EIP makes).
pub const GAS_SSTORE_CLEAR_REFUND: u64 = 4_800;
