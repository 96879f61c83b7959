//! The Call/Create Engine: establishes and tears down nested execution
//! contexts, handling value transfer, checkpointing, precompile dispatch
//! and static-call enforcement uniformly across the five call flavors
//! plus CREATE/CREATE2.

use crate::access_list::AccessList;
use crate::call_frame::CallFrame;
use crate::code::Code;
use crate::errors::{InternalError, VMError};
use crate::gas::{call_gas, CallGasInputs, GasMeter};
use crate::journal::{Journal, JournalEntry};
use crate::opcodes::{self, StepOutcome};
use crate::precompiles::PrecompileProvider;
use crate::substate::Substate;
use bytes::Bytes;
use ethereum_types::{Address, U256};
use evm_core_common::{constants::*, empty_string_hash, keccak256, Account, Fork, Log};
use evm_core_rlp::{encode_list_raw, RLPEncode};
use evm_core_trie::WorldState;
use std::rc::Rc;
use tracing::debug;

/// Terminal state of a frame's execution.
#[derive(Debug)]
pub enum FrameExit {
    Return(Bytes),
    Stop,
    Revert(Bytes),
    Fault(VMError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    Call,
    CallCode,
    DelegateCall,
    StaticCall,
}

impl CallKind {
    pub fn is_call_or_callcode(self) -> bool {
        matches!(self, CallKind::Call | CallKind::CallCode)
    }

    pub fn is_call(self) -> bool {
        self == CallKind::Call
    }
}

pub struct CallOutcome {
    pub success: bool,
    pub gas_left: u64,
    pub return_data: Bytes,
}

pub struct CreateOutcome {
    pub success: bool,
    pub gas_left: u64,
    pub address: Option<Address>,
    pub return_data: Bytes,
}

/// Owns everything the engine needs across the lifetime of one
/// transaction: world state, the journal, the two EIP-2929 access lists,
/// the touched/selfdestruct/created substate, and the accumulated logs
/// and refund counter. Call frames themselves are *not* stored here —
/// they live on the Rust call stack via recursive `call`/`create`
/// invocations, the natural way to model a cooperative, tail-call-like
/// structured transfer of control between contexts.
pub struct VmState<W: WorldState> {
    pub world: W,
    pub journal: Journal,
    pub access_list: AccessList,
    pub substate: Substate,
    pub logs: Vec<Log>,
    pub refund_counter: u64,
    pub fork: Fork,
    next_context_id: u64,
}

impl<W: WorldState> VmState<W> {
    pub fn new(world: W, fork: Fork) -> Self {
        Self {
            world,
            journal: Journal::new(),
            access_list: AccessList::new(),
            substate: Substate::new(),
            logs: Vec::new(),
            refund_counter: 0,
            fork,
            next_context_id: 1,
        }
    }

    fn next_id(&mut self) -> u64 {
        let id = self.next_context_id;
        self.next_context_id += 1;
        id
    }

    // -- Checkpointing ----------------------------------------------------

    pub fn checkpoint(&mut self) -> usize {
        self.journal.checkpoint(self.refund_counter, self.logs.len())
    }

    pub fn commit(&mut self, id: usize) {
        self.journal.commit(id);
    }

    pub fn revert(&mut self, id: usize) {
        let (entries, refund_counter, logs_len) = self.journal.revert(id);
        for entry in entries {
            self.apply_undo(entry);
        }
        self.refund_counter = refund_counter;
        self.logs.truncate(logs_len);
    }

    fn apply_undo(&mut self, entry: JournalEntry) {
        match entry {
            JournalEntry::AccountCreated { addr } => self.world.delete_account(addr),
            JournalEntry::BalanceTransfer { from, to, amount } => {
                // Reverse the movement `transfer_value(from, to, amount)`
                // performed, without re-journalling.
                self.raw_add_balance(from, amount);
                self.raw_sub_balance(to, amount);
            }
            JournalEntry::NonceChange { addr, prior } => self.raw_set_nonce(addr, prior),
            JournalEntry::StorageChange { addr, key, prior } => self.world.write_storage(addr, key, prior),
            JournalEntry::CodeChange { addr, prior_hash } => self.raw_set_code_hash(addr, prior_hash),
            JournalEntry::AccountDestroyed { addr, recipient, balance } => {
                if recipient != addr {
                    self.raw_sub_balance(recipient, balance);
                }
                self.raw_add_balance(addr, balance);
            }
            JournalEntry::AccountTouched { addr } => self.substate.untouch(addr),
            JournalEntry::SelfdestructSetInsert { addr } => self.substate.unmark_for_destruction(addr),
            JournalEntry::CreatedSetInsert { addr } => self.substate.uncreate(addr),
            // The refund counter and logs length are restored directly from
            // the checkpoint's own snapshot above; these per-entry markers
            // exist for the audit trail but carry no separate undo action.
            JournalEntry::Refund { .. } | JournalEntry::Log { .. } => {}
        }
    }

    // -- Account read/write helpers (each journals before writing) -------

    pub fn read_account(&self, addr: Address) -> Account {
        self.world.read_account(addr).unwrap_or_default()
    }

    pub fn balance(&self, addr: Address) -> U256 {
        self.read_account(addr).balance
    }

    fn ensure_account_exists(&mut self, addr: Address) {
        if self.world.read_account(addr).is_none() {
            self.journal.append(JournalEntry::AccountCreated { addr });
            self.world.write_account(addr, Account::default());
        }
    }

    fn raw_add_balance(&mut self, addr: Address, amount: U256) {
        let mut account = self.read_account(addr);
        account.balance += amount;
        self.world.write_account(addr, account);
    }

    fn raw_sub_balance(&mut self, addr: Address, amount: U256) {
        let mut account = self.read_account(addr);
        account.balance -= amount;
        self.world.write_account(addr, account);
    }

    fn raw_set_nonce(&mut self, addr: Address, nonce: u64) {
        let mut account = self.read_account(addr);
        account.nonce = nonce;
        self.world.write_account(addr, account);
    }

    fn raw_set_code_hash(&mut self, addr: Address, code_hash: ethereum_types::H256) {
        let mut account = self.read_account(addr);
        account.code_hash = code_hash;
        self.world.write_account(addr, account);
    }

    /// Moves `amount` from `from` to `to`, journalling both legs as one
    /// `BalanceTransfer` entry. `from == to` is a valid degenerate case
    /// (CALLCODE's self-targeted transfer) — it still validates and
    /// journals, but nets to zero.
    pub fn transfer_value(&mut self, from: Address, to: Address, amount: U256) -> Result<(), VMError> {
        if amount.is_zero() {
            return Ok(());
        }
        if self.balance(from) < amount {
            return Err(VMError::InsufficientBalance);
        }
        self.ensure_account_exists(to);
        self.journal.append(JournalEntry::BalanceTransfer { from, to, amount });
        self.raw_sub_balance(from, amount);
        self.raw_add_balance(to, amount);
        Ok(())
    }

    pub fn bump_nonce(&mut self, addr: Address) -> Result<u64, VMError> {
        let account = self.read_account(addr);
        if self.fork.caps_nonce() && account.nonce == MAX_NONCE {
            return Err(VMError::NonceOverflow);
        }
        self.ensure_account_exists(addr);
        self.journal.append(JournalEntry::NonceChange { addr, prior: account.nonce });
        self.raw_set_nonce(addr, account.nonce + 1);
        Ok(account.nonce + 1)
    }

    pub fn sload(&self, addr: Address, key: U256) -> U256 {
        self.world.read_storage(addr, key)
    }

    pub fn sstore(&mut self, addr: Address, key: U256, value: U256) {
        let prior = self.world.read_storage(addr, key);
        if prior == value {
            return;
        }
        self.ensure_account_exists(addr);
        self.journal.append(JournalEntry::StorageChange { addr, key, prior });
        self.world.write_storage(addr, key, value);
    }

    pub fn touch(&mut self, addr: Address) {
        if self.substate.touch(addr) {
            self.journal.append(JournalEntry::AccountTouched { addr });
        }
    }

    pub fn append_log(&mut self, log: Log) {
        self.journal.append(JournalEntry::Log { prior_logs_len: self.logs.len() });
        self.logs.push(log);
    }

    pub fn add_refund(&mut self, amount: u64) {
        self.journal.append(JournalEntry::Refund { prior_counter: self.refund_counter });
        self.refund_counter += amount;
    }

    pub fn sub_refund(&mut self, amount: u64) {
        self.journal.append(JournalEntry::Refund { prior_counter: self.refund_counter });
        self.refund_counter = self.refund_counter.saturating_sub(amount);
    }

    /// EIP-161 emptiness: the account doesn't exist, or exists with zero
    /// nonce, zero balance, and no code.
    pub fn account_is_dead(&self, addr: Address) -> bool {
        match self.world.read_account(addr) {
            None => true,
            Some(account) => account.is_empty(),
        }
    }

    pub fn load_code(&self, code_hash: ethereum_types::H256) -> Result<Rc<Code>, VMError> {
        if code_hash == empty_string_hash() {
            return Ok(Rc::new(Code::empty()));
        }
        let bytes = self
            .world
            .read_code(code_hash)
            .ok_or(VMError::Internal(InternalError::CodeHashMismatch))?;
        Code::load(bytes, code_hash).map(Rc::new)
    }

    pub fn set_code(&mut self, addr: Address, code: &Bytes) {
        let code_hash = keccak256(code);
        let prior_hash = self.read_account(addr).code_hash;
        self.ensure_account_exists(addr);
        self.journal.append(JournalEntry::CodeChange { addr, prior_hash });
        self.world.write_code(code_hash, code.clone());
        self.raw_set_code_hash(addr, code_hash);
    }

    /// Zeroes `addr`'s balance as part of SELFDESTRUCT, crediting
    /// `recipient` unless it is the same address — in which case the
    /// balance is simply burned, matching the "unless recipient == self"
    /// wording in §4.6. Returns the amount moved.
    pub fn destroy_account_balance(&mut self, addr: Address, recipient: Address) -> U256 {
        let balance = self.balance(addr);
        if balance.is_zero() {
            return balance;
        }
        self.journal.append(JournalEntry::AccountDestroyed { addr, recipient, balance });
        self.raw_sub_balance(addr, balance);
        if recipient != addr {
            self.raw_add_balance(recipient, balance);
        }
        balance
    }

    pub fn mark_for_destruction(&mut self, addr: Address) {
        self.journal.append(JournalEntry::SelfdestructSetInsert { addr });
        self.substate.mark_for_destruction(addr);
    }

    pub fn record_created(&mut self, addr: Address) {
        self.journal.append(JournalEntry::CreatedSetInsert { addr });
        self.substate.record_created(addr);
    }

    // -- Frame execution ---------------------------------------------------

    fn execute_frame(&mut self, frame: &mut CallFrame, precompiles: &dyn PrecompileProvider) -> FrameExit {
        loop {
            match opcodes::step(self, frame, precompiles) {
                Ok(StepOutcome::Continue) => continue,
                Ok(StepOutcome::Exit(exit)) => return exit,
                Err(e) => return FrameExit::Fault(e),
            }
        }
    }

    /// Entry sequence for CALL/CALLCODE/DELEGATECALL/STATICCALL. Memory
    /// expansion and the `C_call` gas charge are the call site's
    /// (`opcodes::call_opcode`) responsibility, since they need the
    /// caller's stack and memory; this function picks up from there.
    #[allow(clippy::too_many_arguments)]
    pub fn call(
        &mut self,
        parent: &CallFrame,
        precompiles: &dyn PrecompileProvider,
        kind: CallKind,
        target: Address,
        value: U256,
        calldata: Bytes,
        gas: u64,
    ) -> Result<CallOutcome, VMError> {
        if parent.depth + 1 > CALL_STACK_LIMIT {
            return Ok(CallOutcome {
                success: false,
                gas_left: 0,
                return_data: Bytes::new(),
            });
        }

        let exec_caller = if kind == CallKind::DelegateCall { parent.caller } else { parent.address };
        let exec_value = if kind == CallKind::DelegateCall { parent.value } else { value };
        let storage_addr = match kind {
            CallKind::CallCode | CallKind::DelegateCall => parent.address,
            _ => target,
        };
        let transfer_recipient = if kind == CallKind::CallCode { parent.address } else { target };

        if kind.is_call_or_callcode() && !value.is_zero() && self.balance(parent.address) < value {
            return Ok(CallOutcome {
                success: false,
                gas_left: 0,
                return_data: Bytes::new(),
            });
        }

        let checkpoint = self.checkpoint();

        if kind.is_call_or_callcode() && !value.is_zero() {
            self.transfer_value(parent.address, transfer_recipient, value)?;
        }
        self.touch(target);
        if kind == CallKind::DelegateCall {
            self.touch(parent.address);
        }

        if precompiles.is_precompile(target) {
            return match precompiles.run(target, &calldata, gas) {
                Ok(outcome) => {
                    if outcome.success {
                        self.commit(checkpoint);
                    } else {
                        self.revert(checkpoint);
                    }
                    Ok(CallOutcome {
                        success: outcome.success,
                        gas_left: gas.saturating_sub(outcome.gas_used),
                        return_data: outcome.output,
                    })
                }
                Err(_) => {
                    self.revert(checkpoint);
                    Ok(CallOutcome {
                        success: false,
                        gas_left: 0,
                        return_data: Bytes::new(),
                    })
                }
            };
        }

        let code_hash = self.read_account(target).code_hash;
        let code = self.load_code(code_hash)?;
        let is_static = parent.is_static || kind == CallKind::StaticCall;
        let id = self.next_id();
        let mut frame = CallFrame::new(
            id,
            parent.id,
            storage_addr,
            exec_caller,
            exec_value,
            calldata,
            code,
            gas,
            is_static,
            checkpoint,
            parent.depth + 1,
            false,
        );

        let exit = self.execute_frame(&mut frame, precompiles);
        Ok(match exit {
            FrameExit::Return(data) => {
                self.commit(checkpoint);
                CallOutcome {
                    success: true,
                    gas_left: frame.gas.remaining(),
                    return_data: data,
                }
            }
            FrameExit::Stop => {
                self.commit(checkpoint);
                CallOutcome {
                    success: true,
                    gas_left: frame.gas.remaining(),
                    return_data: Bytes::new(),
                }
            }
            FrameExit::Revert(data) => {
                self.revert(checkpoint);
                CallOutcome {
                    success: false,
                    gas_left: frame.gas.remaining(),
                    return_data: data,
                }
            }
            FrameExit::Fault(_) => {
                self.revert(checkpoint);
                CallOutcome {
                    success: false,
                    gas_left: 0,
                    return_data: Bytes::new(),
                }
            }
        })
    }

    /// Extra steps for CREATE/CREATE2, layered on top of the same
    /// checkpoint/execute/commit-or-revert shape as `call`. `gas` is the
    /// already-drained `L(gas_left - C_create)` the call site computed
    /// (the 1/64-draining rule).
    pub fn create(
        &mut self,
        parent: &CallFrame,
        precompiles: &dyn PrecompileProvider,
        new_address: Address,
        value: U256,
        init_code: Bytes,
        gas: u64,
    ) -> Result<CreateOutcome, VMError> {
        if parent.depth + 1 > CALL_STACK_LIMIT {
            return Ok(CreateOutcome {
                success: false,
                gas_left: 0,
                address: None,
                return_data: Bytes::new(),
            });
        }
        if self.balance(parent.address) < value {
            return Ok(CreateOutcome {
                success: false,
                gas_left: 0,
                address: None,
                return_data: Bytes::new(),
            });
        }

        // Nonce bump happens before the checkpoint is opened: the
        // creator's nonce stays incremented even when the deployment
        // itself reverts (e.g. EIP-3541 rejection).
        self.bump_nonce(parent.address)?;

        let checkpoint = self.checkpoint();
        self.touch(new_address);

        if !self.account_is_dead(new_address) {
            debug!(address = ?new_address, error = %VMError::AddressCollision, "create destination already occupied");
            self.revert(checkpoint);
            return Ok(CreateOutcome {
                success: false,
                gas_left: 0,
                address: None,
                return_data: Bytes::new(),
            });
        }

        self.transfer_value(parent.address, new_address, value)?;
        // `account_is_dead` above guarantees the nonce is currently zero.
        self.journal.append(JournalEntry::NonceChange { addr: new_address, prior: 0 });
        self.raw_set_nonce(new_address, 1);

        let id = self.next_id();
        let mut frame = CallFrame::new(
            id,
            parent.id,
            new_address,
            parent.address,
            value,
            Bytes::new(),
            Rc::new(Code::from_verified(init_code)),
            gas,
            parent.is_static,
            checkpoint,
            parent.depth + 1,
            true,
        );

        let exit = self.execute_frame(&mut frame, precompiles);
        Ok(match exit {
            FrameExit::Return(deployed) => self.finish_create(&mut frame, checkpoint, new_address, deployed),
            FrameExit::Stop => self.finish_create(&mut frame, checkpoint, new_address, Bytes::new()),
            FrameExit::Revert(data) => {
                self.revert(checkpoint);
                CreateOutcome {
                    success: false,
                    gas_left: frame.gas.remaining(),
                    address: None,
                    return_data: data,
                }
            }
            FrameExit::Fault(_) => {
                self.revert(checkpoint);
                CreateOutcome {
                    success: false,
                    gas_left: 0,
                    address: None,
                    return_data: Bytes::new(),
                }
            }
        })
    }

    /// Entry point for the Transaction Driver's message-call path (§4.7
    /// phase 5): a depth-0 frame with no parent, so none of `call`'s
    /// depth-check/value-check-as-soft-failure machinery applies — the
    /// Driver has already checked the sender's balance covers `value`.
    pub fn call_top_level(
        &mut self,
        precompiles: &dyn PrecompileProvider,
        origin: Address,
        target: Address,
        value: U256,
        calldata: Bytes,
        gas: u64,
    ) -> Result<CallOutcome, VMError> {
        let checkpoint = self.checkpoint();
        if !value.is_zero() {
            self.transfer_value(origin, target, value)?;
        }
        self.touch(target);

        if precompiles.is_precompile(target) {
            return match precompiles.run(target, &calldata, gas) {
                Ok(outcome) => {
                    if outcome.success {
                        self.commit(checkpoint);
                    } else {
                        self.revert(checkpoint);
                    }
                    Ok(CallOutcome {
                        success: outcome.success,
                        gas_left: gas.saturating_sub(outcome.gas_used),
                        return_data: outcome.output,
                    })
                }
                Err(_) => {
                    self.revert(checkpoint);
                    Ok(CallOutcome {
                        success: false,
                        gas_left: 0,
                        return_data: Bytes::new(),
                    })
                }
            };
        }

        let code_hash = self.read_account(target).code_hash;
        let code = self.load_code(code_hash)?;
        let id = self.next_id();
        let mut frame = CallFrame::new(id, 0, target, origin, value, calldata, code, gas, false, checkpoint, 0, false);

        let exit = self.execute_frame(&mut frame, precompiles);
        Ok(match exit {
            FrameExit::Return(data) => {
                self.commit(checkpoint);
                CallOutcome {
                    success: true,
                    gas_left: frame.gas.remaining(),
                    return_data: data,
                }
            }
            FrameExit::Stop => {
                self.commit(checkpoint);
                CallOutcome {
                    success: true,
                    gas_left: frame.gas.remaining(),
                    return_data: Bytes::new(),
                }
            }
            FrameExit::Revert(data) => {
                self.revert(checkpoint);
                CallOutcome {
                    success: false,
                    gas_left: frame.gas.remaining(),
                    return_data: data,
                }
            }
            FrameExit::Fault(_) => {
                self.revert(checkpoint);
                CallOutcome {
                    success: false,
                    gas_left: 0,
                    return_data: Bytes::new(),
                }
            }
        })
    }

    /// Entry point for the Transaction Driver's contract-creation path.
    /// Unlike nested CREATE, the sender's nonce is *not* bumped here — the
    /// Driver already incremented it once in phase 4, and `new_address`
    /// must be computed from the nonce the transaction started with, not a
    /// second bump on top of it.
    pub fn create_top_level(
        &mut self,
        precompiles: &dyn PrecompileProvider,
        origin: Address,
        new_address: Address,
        value: U256,
        init_code: Bytes,
        gas: u64,
    ) -> Result<CreateOutcome, VMError> {
        let checkpoint = self.checkpoint();
        self.touch(new_address);

        if !self.account_is_dead(new_address) {
            debug!(address = ?new_address, error = %VMError::AddressCollision, "create destination already occupied");
            self.revert(checkpoint);
            return Ok(CreateOutcome {
                success: false,
                gas_left: 0,
                address: None,
                return_data: Bytes::new(),
            });
        }

        if !value.is_zero() {
            self.transfer_value(origin, new_address, value)?;
        }
        self.journal.append(JournalEntry::NonceChange { addr: new_address, prior: 0 });
        self.raw_set_nonce(new_address, 1);

        let id = self.next_id();
        let mut frame = CallFrame::new(
            id,
            0,
            new_address,
            origin,
            value,
            Bytes::new(),
            Rc::new(Code::from_verified(init_code)),
            gas,
            false,
            checkpoint,
            0,
            true,
        );

        let exit = self.execute_frame(&mut frame, precompiles);
        Ok(match exit {
            FrameExit::Return(deployed) => self.finish_create(&mut frame, checkpoint, new_address, deployed),
            FrameExit::Stop => self.finish_create(&mut frame, checkpoint, new_address, Bytes::new()),
            FrameExit::Revert(data) => {
                self.revert(checkpoint);
                CreateOutcome {
                    success: false,
                    gas_left: frame.gas.remaining(),
                    address: None,
                    return_data: data,
                }
            }
            FrameExit::Fault(_) => {
                self.revert(checkpoint);
                CreateOutcome {
                    success: false,
                    gas_left: 0,
                    address: None,
                    return_data: Bytes::new(),
                }
            }
        })
    }

    /// Debits `amount` from `addr` without journalling. Used by the
    /// Transaction Driver for the gas-purchase and pay/refund legs (§4.7
    /// phases 4 and 6), which sit outside any frame checkpoint and are
    /// never unwound — the transaction either fully applies or, on
    /// validation failure, never touched state at all.
    pub fn debit(&mut self, addr: Address, amount: U256) {
        self.raw_sub_balance(addr, amount);
    }

    pub fn credit(&mut self, addr: Address, amount: U256) {
        self.ensure_account_exists(addr);
        self.raw_add_balance(addr, amount);
    }

    fn finish_create(&mut self, frame: &mut CallFrame, checkpoint: usize, new_address: Address, deployed: Bytes) -> CreateOutcome {
        if self.fork.rejects_ef_prefix_code() && deployed.first() == Some(&0xEF) {
            debug!(address = ?new_address, error = %VMError::CodeFirstByteEF, "rejecting deployed code");
            self.revert(checkpoint);
            return CreateOutcome {
                success: false,
                gas_left: 0,
                address: None,
                return_data: Bytes::new(),
            };
        }
        if deployed.len() > MAX_CODE_SIZE {
            debug!(address = ?new_address, len = deployed.len(), error = %VMError::CodeSizeLimit, "rejecting deployed code");
            self.revert(checkpoint);
            return CreateOutcome {
                success: false,
                gas_left: 0,
                address: None,
                return_data: Bytes::new(),
            };
        }
        let deposit_cost = GAS_CODEDEPOSIT * deployed.len() as u64;
        if frame.gas.charge(deposit_cost).is_err() {
            self.revert(checkpoint);
            return CreateOutcome {
                success: false,
                gas_left: 0,
                address: None,
                return_data: Bytes::new(),
            };
        }
        self.set_code(new_address, &deployed);
        self.record_created(new_address);
        self.commit(checkpoint);
        CreateOutcome {
            success: true,
            gas_left: frame.gas.remaining(),
            address: Some(new_address),
            return_data: Bytes::new(),
        }
    }
}

/// CREATE address: `keccak256(rlp([sender, sender_nonce]))[12:]`.
pub fn create_address(sender: Address, nonce: u64) -> Address {
    let mut sender_field = Vec::new();
    sender.encode(&mut sender_field);
    let mut nonce_field = Vec::new();
    nonce.encode(&mut nonce_field);

    let mut list = Vec::new();
    encode_list_raw(&[sender_field, nonce_field], &mut list);
    let hash = keccak256(&list);
    Address::from_slice(&hash.as_bytes()[12..])
}

/// CREATE2 address: `keccak256(0xff ++ sender ++ salt ++ keccak256(init_code))[12:]`.
pub fn create2_address(sender: Address, salt: U256, init_code: &[u8]) -> Address {
    let mut buf = Vec::with_capacity(1 + 20 + 32 + 32);
    buf.push(0xffu8);
    buf.extend_from_slice(sender.as_bytes());
    let mut salt_bytes = [0u8; 32];
    salt.to_big_endian(&mut salt_bytes);
    buf.extend_from_slice(&salt_bytes);
    buf.extend_from_slice(keccak256(init_code).as_bytes());
    let hash = keccak256(&buf);
    Address::from_slice(&hash.as_bytes()[12..])
}

pub fn call_gas_for_site(inputs: &CallGasInputs) -> (u64, u64) {
    let result = call_gas(inputs);
    (result.total_charge, result.callee_gas)
}

pub type EngineGasMeter = GasMeter;

#[cfg(test)]
mod test {
    use super::*;
    use crate::precompiles::DefaultPrecompiles;
    use evm_core_trie::InMemoryWorldState;

    fn fund(world: &mut InMemoryWorldState, addr: Address, balance: U256, nonce: u64) {
        world.write_account(
            addr,
            Account {
                nonce,
                balance,
                storage_root: Default::default(),
                code_hash: empty_string_hash(),
            },
        );
    }

    #[test]
    fn create2_address_is_deterministic_and_sensitive_to_each_input() {
        let sender = Address::from_low_u64_be(0xC0FFEE);
        let salt = U256::from(1u64);
        let init_code = [0x60u8, 0x00, 0xf3];

        let a = create2_address(sender, salt, &init_code);
        let b = create2_address(sender, salt, &init_code);
        assert_eq!(a, b, "CREATE2 address derivation must be pure");

        assert_ne!(a, create2_address(sender, U256::from(2u64), &init_code));
        assert_ne!(a, create2_address(Address::from_low_u64_be(0xD00D), salt, &init_code));
        assert_ne!(a, create2_address(sender, salt, &[0x00u8]));
        assert_ne!(a, create_address(sender, 0), "CREATE and CREATE2 addressing must not collide by construction");
    }

    #[test]
    fn create_address_is_deterministic_and_sensitive_to_sender_and_nonce() {
        let sender = Address::from_low_u64_be(0xC0FFEE);
        let a = create_address(sender, 0);
        let b = create_address(sender, 0);
        assert_eq!(a, b);

        let different_nonce = create_address(sender, 1);
        assert_ne!(a, different_nonce);

        let different_sender = create_address(Address::from_low_u64_be(0xBEEF), 0);
        assert_ne!(a, different_sender);
    }

    // Deposits PUSH1 1, PUSH1 0, MSTORE8, PUSH1 1, PUSH1 0, RETURN: a one-byte
    // constructor that deploys its own literal output, `0x01`.
    #[test]
    fn create_top_level_deploys_the_constructors_returned_bytes() {
        let mut world = InMemoryWorldState::new();
        let sender = Address::from_low_u64_be(0xA11CE);
        fund(&mut world, sender, U256::from(10u64).pow(U256::from(18)), 0);

        let mut vm = VmState::new(world, Fork::Shanghai);
        let new_address = create_address(sender, 0);
        let init_code = Bytes::copy_from_slice(&hex_literal::hex!("6001600053600160006000f3"));

        let outcome = vm
            .create_top_level(&DefaultPrecompiles, sender, new_address, U256::zero(), init_code, 200_000)
            .unwrap();

        assert!(outcome.success);
        assert_eq!(outcome.address, Some(new_address));
        let deployed = vm.world.read_account(new_address).unwrap();
        assert_eq!(deployed.nonce, 1);
        assert_ne!(deployed.code_hash, empty_string_hash());
        let code = vm.world.read_code(deployed.code_hash).unwrap();
        assert_eq!(code.as_ref(), &[0x01]);
    }

    // A nested CREATE whose constructor deploys a 0xEF-prefixed body must be
    // rejected (EIP-3541), but the creator's nonce bump survives the revert —
    // the bump happens before the deployment's own checkpoint is opened.
    #[test]
    fn nested_create_rejects_ef_prefixed_code_but_keeps_the_nonce_bump() {
        let mut world = InMemoryWorldState::new();
        let caller = Address::from_low_u64_be(0xCAFE);
        fund(&mut world, caller, U256::from(10u64).pow(U256::from(18)), 3);

        let mut vm = VmState::new(world, Fork::Shanghai);
        let parent = CallFrame::new(1, 0, caller, caller, U256::zero(), Bytes::new(), Rc::new(Code::empty()), 1_000_000, false, 0, 0, false);

        // PUSH1 0xEF, PUSH1 0, MSTORE8, PUSH1 1, PUSH1 0, RETURN.
        let init_code = Bytes::copy_from_slice(&hex_literal::hex!("60ef600053600160006000f3"));
        let new_address = create_address(caller, 3);
        let outcome = vm
            .create(&parent, &DefaultPrecompiles, new_address, U256::zero(), init_code, 200_000)
            .unwrap();

        assert!(!outcome.success);
        assert!(outcome.address.is_none());
        assert!(
            vm.account_is_dead(new_address),
            "the rejected deployment must leave no code or nonce behind at the target address"
        );
        assert_eq!(
            vm.world.read_account(caller).unwrap().nonce,
            4,
            "the creator's nonce bump is not part of the deployment's own checkpoint"
        );
    }

    // CREATE2 to an address that already holds code must fail with no
    // state change, rather than overwriting the occupant.
    #[test]
    fn create2_onto_an_occupied_address_is_rejected() {
        let mut world = InMemoryWorldState::new();
        let caller = Address::from_low_u64_be(0xC0FFEE);
        fund(&mut world, caller, U256::from(10u64).pow(U256::from(18)), 0);

        let salt = U256::from(7u64);
        let init_code = Bytes::copy_from_slice(&hex_literal::hex!("6001600053600160006000f3"));
        let occupied = create2_address(caller, salt, &init_code);
        world.write_account(
            occupied,
            Account {
                nonce: 1,
                balance: U256::zero(),
                storage_root: Default::default(),
                code_hash: evm_core_common::keccak256(&[0x00]),
            },
        );

        let mut vm = VmState::new(world, Fork::Shanghai);
        let outcome = vm
            .create_top_level(&DefaultPrecompiles, caller, occupied, U256::zero(), init_code, 200_000)
            .unwrap();

        assert!(!outcome.success);
        assert!(outcome.address.is_none());
        assert_eq!(vm.world.read_account(occupied).unwrap().nonce, 1, "the occupant must be left untouched");
    }

    // DELEGATECALL keeps the parent's address, caller and value; only the
    // code being executed changes.
    #[test]
    fn delegatecall_inherits_caller_and_value_but_runs_targets_code() {
        let mut world = InMemoryWorldState::new();
        let original_caller = Address::from_low_u64_be(1);
        let proxy = Address::from_low_u64_be(0xA);
        let library = Address::from_low_u64_be(0xB);
        fund(&mut world, proxy, U256::from(77u64), 1);

        let library_code_hash = evm_core_common::keccak256(&[0x00]);
        world.write_code(library_code_hash, Bytes::from_static(&[0x00]));
        fund(&mut world, library, U256::zero(), 1);
        world.write_account(
            library,
            Account {
                nonce: 1,
                balance: U256::zero(),
                storage_root: Default::default(),
                code_hash: library_code_hash,
            },
        );

        let mut vm = VmState::new(world, Fork::Shanghai);
        let parent = CallFrame::new(
            1,
            0,
            proxy,
            original_caller,
            U256::from(9u64),
            Bytes::new(),
            Rc::new(Code::empty()),
            1_000_000,
            false,
            0,
            0,
            false,
        );

        let outcome = vm
            .call(&parent, &DefaultPrecompiles, CallKind::DelegateCall, library, U256::zero(), Bytes::new(), 100_000)
            .unwrap();

        assert!(outcome.success);
        // DELEGATECALL never moves value or touches the caller's balance.
        assert_eq!(vm.world.read_account(proxy).unwrap().balance, U256::from(77u64));
    }

    // CALLCODE runs the target's code but reads/writes the *caller's* own
    // storage, and moves value to the caller itself rather than the target.
    #[test]
    fn callcode_uses_the_callers_storage_context() {
        let mut world = InMemoryWorldState::new();
        let caller = Address::from_low_u64_be(0xA);
        let library = Address::from_low_u64_be(0xB);
        fund(&mut world, caller, U256::from(10u64).pow(U256::from(18)), 1);

        // PUSH1 1 PUSH1 1 SSTORE STOP: unconditionally sets storage slot 1 to 1.
        let code = hex_literal::hex!("600160015500");
        let code_hash = evm_core_common::keccak256(&code);
        world.write_code(code_hash, Bytes::copy_from_slice(&code));
        world.write_account(
            library,
            Account {
                nonce: 1,
                balance: U256::zero(),
                storage_root: Default::default(),
                code_hash,
            },
        );

        let mut vm = VmState::new(world, Fork::Shanghai);
        let parent = CallFrame::new(1, 0, caller, caller, U256::zero(), Bytes::new(), Rc::new(Code::empty()), 1_000_000, false, 0, 0, false);

        let outcome = vm
            .call(&parent, &DefaultPrecompiles, CallKind::CallCode, library, U256::zero(), Bytes::new(), 100_000)
            .unwrap();

        assert!(outcome.success);
        assert_eq!(vm.world.read_storage(caller, U256::from(1)), U256::from(1));
        assert_eq!(vm.world.read_storage(library, U256::from(1)), U256::zero());
    }

    // STATICCALL must reject any state-changing opcode in the callee; the
    // SSTORE in the target's code faults the frame rather than committing.
    #[test]
    fn staticcall_rejects_a_storage_write_in_the_callee() {
        let mut world = InMemoryWorldState::new();
        let caller = Address::from_low_u64_be(0xA);
        let target = Address::from_low_u64_be(0xB);
        fund(&mut world, caller, U256::from(10u64).pow(U256::from(18)), 1);

        let code = hex_literal::hex!("600160015500");
        let code_hash = evm_core_common::keccak256(&code);
        world.write_code(code_hash, Bytes::copy_from_slice(&code));
        world.write_account(
            target,
            Account {
                nonce: 1,
                balance: U256::zero(),
                storage_root: Default::default(),
                code_hash,
            },
        );

        let mut vm = VmState::new(world, Fork::Shanghai);
        let parent = CallFrame::new(1, 0, caller, caller, U256::zero(), Bytes::new(), Rc::new(Code::empty()), 1_000_000, false, 0, 0, false);

        let outcome = vm
            .call(&parent, &DefaultPrecompiles, CallKind::StaticCall, target, U256::zero(), Bytes::new(), 100_000)
            .unwrap();

        assert!(!outcome.success, "a write under STATICCALL must fault the callee frame");
        assert_eq!(vm.world.read_storage(target, U256::from(1)), U256::zero());
    }

    // A faulted nested call leaves no trace in the journal: a balance moved
    // into it by an earlier, already-committed step is untouched, and a
    // second nested call started after the fault sees the same state as if
    // the first had never run.
    #[test]
    fn a_faulted_nested_call_is_fully_isolated_from_its_parent() {
        let mut world = InMemoryWorldState::new();
        let caller = Address::from_low_u64_be(0xA);
        let target = Address::from_low_u64_be(0xB);
        fund(&mut world, caller, U256::from(10u64).pow(U256::from(18)), 1);

        // INVALID (0xfe): always faults the frame immediately.
        let code = hex_literal::hex!("fe");
        let code_hash = evm_core_common::keccak256(&code);
        world.write_code(code_hash, Bytes::copy_from_slice(&code));
        world.write_account(
            target,
            Account {
                nonce: 1,
                balance: U256::zero(),
                storage_root: Default::default(),
                code_hash,
            },
        );

        let mut vm = VmState::new(world, Fork::Shanghai);
        let parent = CallFrame::new(1, 0, caller, caller, U256::zero(), Bytes::new(), Rc::new(Code::empty()), 1_000_000, false, 0, 0, false);

        let balance_before = vm.balance(caller);
        let outcome = vm
            .call(&parent, &DefaultPrecompiles, CallKind::Call, target, U256::from(5u64), Bytes::new(), 100_000)
            .unwrap();

        assert!(!outcome.success);
        assert_eq!(outcome.gas_left, 0, "a fault consumes all gas given to the callee");
        assert_eq!(vm.balance(caller), balance_before, "the attempted value transfer must be fully reverted");
        assert_eq!(vm.balance(target), U256::zero());
    }
}
