use crate::errors::{InternalError, VMError};
use crate::jumpdest::{self, JumpDestMap};
use bytes::Bytes;
use ethereum_types::H256;
use evm_core_common::keccak256;

/// A staged code segment: the raw bytes plus the jump-dest
/// bitmap computed once at a frame's first entry. PC reads past the end
/// of `raw` behave as `STOP` (opcode `0x00`), which `opcode_at` implements
/// by returning `0` rather than growing the buffer — code is immutable
/// and fixed-size once loaded, unlike main memory.
#[derive(Debug, Clone)]
pub struct Code {
    raw: Bytes,
    jumpdest: JumpDestMap,
}

impl Code {
    /// Loads `raw` and verifies it against `expected_hash`
    /// ("obtain the code bytes externally... verify keccak256(loaded) ==
    /// codehash"). In this deterministic rendition the bytes come from the
    /// `WorldState`'s code store rather than a prover oracle.
    pub fn load(raw: Bytes, expected_hash: H256) -> Result<Self, VMError> {
        if keccak256(&raw) != expected_hash {
            return Err(VMError::Internal(InternalError::CodeHashMismatch));
        }
        Ok(Self::from_verified(raw))
    }

    /// Builds a `Code` from bytes already known-correct (e.g. the output
    /// of a constructor run, about to be charged and stored under its own
    /// fresh hash — there is nothing to verify yet).
    pub fn from_verified(raw: Bytes) -> Self {
        let jumpdest = jumpdest::scan(&raw);
        Self { raw, jumpdest }
    }

    pub fn empty() -> Self {
        Self::from_verified(Bytes::new())
    }

    pub fn len(&self) -> usize {
        self.raw.len()
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    pub fn bytes(&self) -> &Bytes {
        &self.raw
    }

    /// Byte at `pc`, or `0x00` (STOP) past the end — the "padded load"
    /// behavior §4.5 describes for CALL-style code staging.
    pub fn opcode_at(&self, pc: usize) -> u8 {
        self.raw.get(pc).copied().unwrap_or(0x00)
    }

    pub fn is_valid_jumpdest(&self, pc: usize) -> bool {
        self.jumpdest.is_valid(pc)
    }

    /// A slice starting at `offset`, zero-padded past the end — the shape
    /// `CODECOPY`/`EXTCODECOPY` need.
    pub fn slice_padded(&self, offset: usize, size: usize) -> Vec<u8> {
        let mut out = vec![0u8; size];
        for (i, byte) in out.iter_mut().enumerate() {
            if let Some(idx) = offset.checked_add(i) {
                if let Some(b) = self.raw.get(idx) {
                    *byte = *b;
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn load_rejects_hash_mismatch() {
        let raw = Bytes::from_static(&[0x00]);
        let wrong_hash = H256::zero();
        assert!(matches!(
            Code::load(raw, wrong_hash),
            Err(VMError::Internal(InternalError::CodeHashMismatch))
        ));
    }

    #[test]
    fn load_accepts_matching_hash() {
        let raw = Bytes::from_static(&[0x5b]);
        let hash = keccak256(&raw);
        let code = Code::load(raw, hash).unwrap();
        assert!(code.is_valid_jumpdest(0));
    }

    #[test]
    fn opcode_past_end_reads_as_stop() {
        let code = Code::from_verified(Bytes::from_static(&[0x01]));
        assert_eq!(code.opcode_at(5), 0x00);
    }
}
