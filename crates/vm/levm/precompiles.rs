use crate::errors::{InternalError, VMError};
use bytes::Bytes;
use ethereum_types::Address;

/// Addresses 0x01..=0x09 are reserved for precompiled contracts, dispatched
/// to on call entry before a new frame is ever created. Their actual
/// cryptography (ECRECOVER/secp256k1, SHA256, RIPEMD160, MODEXP, the BN254
/// pairing-friendly curve ops, BLAKE2F) is an explicit Non-goal of this
/// core. `PrecompileProvider` is that narrow interface: the engine
/// dispatches through it and never inlines a curve or hash implementation
/// itself.
pub trait PrecompileProvider {
    /// `None` if `addr` is not a precompile at all.
    fn is_precompile(&self, addr: Address) -> bool {
        let bytes = addr.as_bytes();
        bytes[..19].iter().all(|b| *b == 0) && (1..=9).contains(&bytes[19])
    }

    /// Runs the precompile, charging `gas_available` and returning
    /// `(success, gas_used, output)`.
    fn run(&self, addr: Address, input: &[u8], gas_available: u64) -> Result<PrecompileOutcome, VMError>;
}

pub struct PrecompileOutcome {
    pub success: bool,
    pub gas_used: u64,
    pub output: Bytes,
}

const GAS_IDENTITY_BASE: u64 = 15;
const GAS_IDENTITY_WORD: u64 = 3;

/// The reference provider this core ships: a complete `IDENTITY` (0x04),
/// the one precompile with no external cryptographic dependency, and a
/// documented "unavailable" result for the rest. A host embedding this
/// core for production use is expected to supply a `PrecompileProvider`
/// backed by real secp256k1/sha2/ripemd160/bn254/blake2 crates; see
/// DESIGN.md.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultPrecompiles;

impl PrecompileProvider for DefaultPrecompiles {
    fn run(&self, addr: Address, input: &[u8], gas_available: u64) -> Result<PrecompileOutcome, VMError> {
        let id = addr.as_bytes()[19];
        match id {
            4 => {
                let words = input.len().div_ceil(32) as u64;
                let gas_used = GAS_IDENTITY_BASE + GAS_IDENTITY_WORD * words;
                if gas_used > gas_available {
                    return Ok(PrecompileOutcome {
                            success: false,
                            gas_used: gas_available,
                            output: Bytes::new(),
                    });
                }
                Ok(PrecompileOutcome {
                        success: true,
                        gas_used,
                        output: Bytes::copy_from_slice(input),
                })
            }
            1..=9 => Err(VMError::Internal(InternalError::PrecompileUnavailable)),
            _ => Err(VMError::Internal(InternalError::PrecompileUnavailable)),
        }
    }
}
