use crate::errors::VMError;
use ethereum_types::U256;

/// Per-context main memory: a growable byte array addressed in
/// words, big-endian, that only ever expands (never shrinks) within a
/// frame's lifetime. Expansion is gas-metered by the caller via
/// [`expansion_cost`] *before* `resize_to` is called, matching the
/// "charge before commit" rule the gas accounting follows everywhere.
#[derive(Debug, Default, Clone)]
pub struct Memory {
    data: Vec<u8>,
}

impl Memory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    fn words(len: usize) -> u64 {
        len.div_ceil(32) as u64
    }

    /// Quadratic memory-expansion cost, yellow-paper `C_mem`:
    /// `3*words + words^2/512`. Checked throughout since `words` can be
    /// large enough for `words*words` to overflow `u64` — geth's
    /// `memoryGasCost` guards the same multiplication the same way.
    fn cost_for_words(words: u64) -> Result<u64, VMError> {
        let linear = 3u64.checked_mul(words).ok_or(VMError::OutOfGas)?;
        let squared = words.checked_mul(words).ok_or(VMError::OutOfGas)?;
        linear.checked_add(squared / 512).ok_or(VMError::OutOfGas)
    }

    /// Gas required to grow memory so that `offset+size` is addressable,
    /// relative to the current size. Zero if no growth is needed. Faults
    /// with `OutOfGas` rather than overflowing if `offset+size` doesn't
    /// fit in a `usize`.
    pub fn expansion_cost(&self, offset: usize, size: usize) -> Result<u64, VMError> {
        if size == 0 {
            return Ok(0);
        }
        let needed = offset.checked_add(size).ok_or(VMError::OutOfGas)?;
        if needed <= self.data.len() {
            return Ok(0);
        }
        let current_words = Self::words(self.data.len());
        let needed_words = Self::words(needed);
        let needed_cost = Self::cost_for_words(needed_words)?;
        let current_cost = Self::cost_for_words(current_words)?;
        Ok(needed_cost.saturating_sub(current_cost))
    }

    fn resize_to(&mut self, new_len: usize) -> Result<(), VMError> {
        if new_len > self.data.len() {
            let words = Self::words(new_len);
            let byte_len = (words as usize).checked_mul(32).ok_or(VMError::OutOfGas)?;
            self.data.resize(byte_len, 0);
        }
        Ok(())
    }

    pub fn load_word(&mut self, offset: usize) -> Result<U256, VMError> {
        let end = offset.checked_add(32).ok_or(VMError::OutOfGas)?;
        self.resize_to(end)?;
        Ok(U256::from_big_endian(&self.data[offset..end]))
    }

    pub fn store_word(&mut self, offset: usize, value: U256) -> Result<(), VMError> {
        let end = offset.checked_add(32).ok_or(VMError::OutOfGas)?;
        self.resize_to(end)?;
        let mut bytes = [0u8; 32];
        value.to_big_endian(&mut bytes);
        self.data[offset..end].copy_from_slice(&bytes);
        Ok(())
    }

    pub fn store_byte(&mut self, offset: usize, value: u8) -> Result<(), VMError> {
        let end = offset.checked_add(1).ok_or(VMError::OutOfGas)?;
        self.resize_to(end)?;
        self.data[offset] = value;
        Ok(())
    }

    pub fn load_range(&mut self, offset: usize, size: usize) -> Result<Vec<u8>, VMError> {
        if size == 0 {
            return Ok(Vec::new());
        }
        let end = offset.checked_add(size).ok_or(VMError::OutOfGas)?;
        self.resize_to(end)?;
        Ok(self.data[offset..end].to_vec())
    }

    pub fn store_range(&mut self, offset: usize, data: &[u8]) -> Result<(), VMError> {
        if data.is_empty() {
            return Ok(());
        }
        let end = offset.checked_add(data.len()).ok_or(VMError::OutOfGas)?;
        self.resize_to(end)?;
        self.data[offset..end].copy_from_slice(data);
        Ok(())
    }

    /// Like `store_range`, but reads from `src` starting at `src_offset`,
    /// zero-padding past its end — the shape every `*COPY` opcode needs
    /// (`CALLDATACOPY`, `CODECOPY`, `EXTCODECOPY`, `RETURNDATACOPY` aside,
    /// which must instead fault past-end per spec).
    pub fn store_range_padded(&mut self, dest_offset: usize, src: &[u8], src_offset: usize, size: usize) -> Result<(), VMError> {
        if size == 0 {
            return Ok(());
        }
        let end = dest_offset.checked_add(size).ok_or(VMError::OutOfGas)?;
        self.resize_to(end)?;
        for i in 0..size {
            let byte = src_offset
                .checked_add(i)
                .and_then(|idx| src.get(idx))
                .copied()
                .unwrap_or(0);
            self.data[dest_offset + i] = byte;
        }
        Ok(())
    }

    /// RETURNDATACOPY reads must not read past the actual return-data
    /// length (unlike CALLDATACOPY/CODECOPY, which zero-pad) — out-of-
    /// bounds is an exception, per the yellow paper.
    pub fn store_range_exact(&mut self, dest_offset: usize, src: &[u8], src_offset: usize, size: usize) -> Result<(), VMError> {
        if size == 0 {
            return Ok(());
        }
        let src_end = src_offset.checked_add(size).ok_or(VMError::InvalidOpcode)?;
        if src_end > src.len() {
            return Err(VMError::InvalidOpcode);
        }
        let dest_end = dest_offset.checked_add(size).ok_or(VMError::OutOfGas)?;
        self.resize_to(dest_end)?;
        self.data[dest_offset..dest_end].copy_from_slice(&src[src_offset..src_end]);
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn store_and_load_word_roundtrip() {
        let mut mem = Memory::new();
        mem.store_word(0, U256::from(42)).unwrap();
        assert_eq!(mem.load_word(0).unwrap(), U256::from(42));
    }

    #[test]
    fn expansion_cost_is_zero_within_bounds() {
        let mut mem = Memory::new();
        mem.store_word(0, U256::zero()).unwrap();
        assert_eq!(mem.expansion_cost(0, 32).unwrap(), 0);
    }

    #[test]
    fn expansion_cost_grows_quadratically_for_large_offsets() {
        let mem = Memory::new();
        let small = mem.expansion_cost(0, 32).unwrap();
        let large = mem.expansion_cost(1_000_000, 32).unwrap();
        assert!(large > small * 1000);
    }

    #[test]
    fn load_range_zero_pads_nothing_new() {
        let mut mem = Memory::new();
        let out = mem.load_range(0, 4).unwrap();
        assert_eq!(out, vec![0, 0, 0, 0]);
    }

    #[test]
    fn expansion_cost_faults_instead_of_overflowing_on_huge_offset() {
        let mem = Memory::new();
        assert_eq!(mem.expansion_cost(usize::MAX - 4, 32), Err(VMError::OutOfGas));
        assert_eq!(mem.expansion_cost(usize::MAX / 2, usize::MAX / 2), Err(VMError::OutOfGas));
    }
}
