use ethereum_types::{Address, H256, U256};

/// A single reversible state mutation. `VmState` appends one of
/// these *before* performing the matching write (journalling is eager),
/// then on revert replays the log in reverse, each entry restoring exactly
/// one prior value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JournalEntry {
    AccountCreated { addr: Address },
    BalanceTransfer { from: Address, to: Address, amount: U256 },
    NonceChange { addr: Address, prior: u64 },
    StorageChange { addr: Address, key: U256, prior: U256 },
    CodeChange { addr: Address, prior_hash: H256 },
    AccountDestroyed { addr: Address, recipient: Address, balance: U256 },
    AccountTouched { addr: Address },
    SelfdestructSetInsert { addr: Address },
    CreatedSetInsert { addr: Address },
    Refund { prior_counter: u64 },
    Log { prior_logs_len: usize },
}

/// Journal length, refund counter, and logs length captured at a frame's
/// entry — everything needed to undo exactly what that frame (and its
    /// descendants) did.
#[derive(Debug, Clone, Copy)]
pub struct Checkpoint {
    journal_len: usize,
    refund_counter: u64,
    logs_len: usize,
}

/// Append-only undo log plus a stack of open checkpoints. `Journal` itself
/// only tracks *that* a mutation happened and what it undoes; applying the
/// undo to world state, the substate, refunds and logs is `VmState`'s job
/// (see `state.rs`) — keeping this type a pure, independently testable
/// log/stack.
#[derive(Debug, Default)]
pub struct Journal {
    entries: Vec<JournalEntry>,
    checkpoints: Vec<Checkpoint>,
}

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, entry: JournalEntry) {
        self.entries.push(entry);
    }

    /// Opens a new checkpoint, returning its id (also its depth in the
        /// checkpoint stack).
    pub fn checkpoint(&mut self, refund_counter: u64, logs_len: usize) -> usize {
        self.checkpoints.push(Checkpoint {
                journal_len: self.entries.len(),
                refund_counter,
                logs_len,
        });
        self.checkpoints.len() - 1
    }

    /// Discards the checkpoint marker for `id` without undoing anything —
    /// its entries remain in the log, folded into whatever ancestor
    /// checkpoint is still open. `commit` is only valid on the topmost
    /// open checkpoint.
    pub fn commit(&mut self, id: usize) {
        assert_eq!(id, self.checkpoints.len() - 1, "commit of a non-topmost checkpoint");
        self.checkpoints.pop();
    }

    /// Pops the topmost checkpoint and returns, in reverse (most recent
        /// first) order, the entries appended since it was opened, along with
    /// the refund counter and logs length to restore. The caller is
    /// responsible for applying each entry's undo to world state and the
    /// substate.
    pub fn revert(&mut self, id: usize) -> (Vec<JournalEntry>, u64, usize) {
        assert_eq!(id, self.checkpoints.len() - 1, "revert of a non-topmost checkpoint");
        let checkpoint = self.checkpoints.pop().expect("checkpoint stack is not empty");
        let undone: Vec<JournalEntry> = self.entries.drain(checkpoint.journal_len..).rev().collect();
        (undone, checkpoint.refund_counter, checkpoint.logs_len)
    }

    pub fn depth(&self) -> usize {
        self.checkpoints.len()
    }
}
