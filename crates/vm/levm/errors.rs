use bytes::Bytes;
use ethereum_types::{Address, U256};
use thiserror::Error;

/// Frame-level exceptions. Each one rolls back the frame's
/// checkpoint and consumes all of that frame's remaining gas — except
/// `CallDepth` and `InsufficientBalance`, which never fault a frame at all
/// (the call simply reports `success = 0` to its parent without a new
    /// frame ever existing).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VMError {
    #[error("out of gas")]
    OutOfGas,
    #[error("invalid opcode")]
    InvalidOpcode,
    #[error("stack underflow")]
    StackUnderflow,
    #[error("stack overflow")]
    StackOverflow,
    #[error("invalid jump destination")]
    InvalidJumpDest,
    #[error("state-changing operation in a static context")]
    WriteProtection,
    #[error("create destination address already occupied")]
    AddressCollision,
    #[error("deployed code exceeds the maximum code size")]
    CodeSizeLimit,
    #[error("deployed code begins with 0xEF (EIP-3541)")]
    CodeFirstByteEF,
    #[error("init code exceeds the maximum init code size (EIP-3860)")]
    InitcodeSizeLimit,
    #[error("sender nonce would overflow")]
    NonceOverflow,
    #[error("call depth exceeded the 1024 limit")]
    CallDepth,
    #[error("insufficient balance for value transfer")]
    InsufficientBalance,
    #[error("explicit REVERT")]
    Revert(Bytes),
    #[error("internal error: {0}")]
    Internal(InternalError),
}

impl VMError {
    /// Whether this exception consumes the frame's entire remaining gas
    /// (every frame-fault does, per §4.9) as opposed to REVERT, which
    /// preserves leftover gas (§7).
    pub fn consumes_all_gas(&self) -> bool {
        !matches!(self, VMError::Revert(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InternalError {
    #[error("code hash verification failed for a loaded contract")]
    CodeHashMismatch,
    #[error("precompile at this address has no implementation in this core")]
    PrecompileUnavailable,
}

/// Transaction-level validation errors phases 1-3. These skip
/// execution entirely; if gas was already bought the sender is billed the
/// full `gas_limit` (§7).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidTxError {
    #[error("max_fee_per_gas {max_fee} is below block base_fee {base_fee}")]
    FeeCapBelowBaseFee { max_fee: U256, base_fee: U256 },
    #[error("max_priority_fee_per_gas {priority} exceeds max_fee_per_gas {max_fee}")]
    PriorityFeeAboveMaxFee { priority: U256, max_fee: U256 },
    #[error("gas_limit {gas_limit} is below intrinsic gas {intrinsic}")]
    GasLimitBelowIntrinsic { gas_limit: u64, intrinsic: u64 },
    #[error("gas_limit {gas_limit} exceeds block gas_limit {block_gas_limit}")]
    GasLimitAboveBlock { gas_limit: u64, block_gas_limit: u64 },
    #[error("tx nonce {tx_nonce} does not match account nonce {account_nonce}")]
    NonceMismatch { tx_nonce: u64, account_nonce: u64 },
    #[error("sender {sender} has deployed code and cannot originate transactions")]
    SenderIsContract { sender: Address },
    #[error("sender balance {balance} insufficient for upfront cost {cost}")]
    InsufficientFunds { balance: U256, cost: U256 },
    #[error("tx chain_id {tx_chain_id} does not match block chain_id {block_chain_id}")]
    ChainIdMismatch { tx_chain_id: u64, block_chain_id: u64 },
    #[error("init code length {len} exceeds MAX_INITCODE_SIZE")]
    InitcodeTooLarge { len: usize },
    #[error("nonce at or above MAX_NONCE")]
    NonceTooHigh,
}
