use crate::code::Code;
use crate::errors::VMError;
use crate::gas::GasMeter;
use crate::memory::Memory;
use bytes::Bytes;
use ethereum_types::{Address, U256};
use std::rc::Rc;

/// The per-call activation record — §3's "Execution context". Owned by
/// the Engine for the frame's lifetime; created on CALL/CREATE entry,
/// dropped on return/revert. Code is `Rc`-shared rather than cloned: it is
/// immutable for the frame's lifetime and potentially large.
#[derive(Debug, Clone)]
pub struct CallFrame {
    pub id: u64,
    pub parent_id: u64,
    pub address: Address,
    pub caller: Address,
    pub value: U256,
    pub call_data: Bytes,
    pub return_data: Bytes,
    pub memory: Memory,
    pub stack: Vec<U256>,
    pub code: Rc<Code>,
    pub pc: usize,
    pub gas: GasMeter,
    pub is_static: bool,
    /// Journal checkpoint id captured at frame entry.
    pub checkpoint: usize,
    /// Call depth of this frame (the top transaction frame is 0).
    pub depth: usize,
    /// Set when CREATE{,2} is in flight for this frame, so RETURN is
    /// interpreted as "deployed code" rather than "call output".
    pub is_create: bool,
}

pub const MAX_STACK: usize = 1024;

impl CallFrame {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: u64,
        parent_id: u64,
        address: Address,
        caller: Address,
        value: U256,
        call_data: Bytes,
        code: Rc<Code>,
        gas_limit: u64,
        is_static: bool,
        checkpoint: usize,
        depth: usize,
        is_create: bool,
    ) -> Self {
        Self {
            id,
            parent_id,
            address,
            caller,
            value,
            call_data,
            return_data: Bytes::new(),
            memory: Memory::new(),
            stack: Vec::new(),
            code,
            pc: 0,
            gas: GasMeter::new(gas_limit),
            is_static,
            checkpoint,
            depth,
            is_create,
        }
    }

    pub fn push(&mut self, value: U256) -> Result<(), VMError> {
        if self.stack.len() >= MAX_STACK {
            return Err(VMError::StackOverflow);
        }
        self.stack.push(value);
        Ok(())
    }

    pub fn pop(&mut self) -> Result<U256, VMError> {
        self.stack.pop().ok_or(VMError::StackUnderflow)
    }

    pub fn peek(&self, depth_from_top: usize) -> Result<U256, VMError> {
        let len = self.stack.len();
        if depth_from_top >= len {
            return Err(VMError::StackUnderflow);
        }
        Ok(self.stack[len - 1 - depth_from_top])
    }

    /// Swaps the top element with the one `n` deep (SWAP1 uses `n == 1`).
    pub fn swap(&mut self, n: usize) -> Result<(), VMError> {
        let len = self.stack.len();
        if n >= len {
            return Err(VMError::StackUnderflow);
        }
        self.stack.swap(len - 1, len - 1 - n);
        Ok(())
    }

    /// Duplicates the element `n` deep onto the top (DUP1 uses `n == 1`).
    pub fn dup(&mut self, n: usize) -> Result<(), VMError> {
        let len = self.stack.len();
        if n == 0 || n > len {
            return Err(VMError::StackUnderflow);
        }
        let value = self.stack[len - n];
        self.push(value)
    }
}
