use ethereum_types::Address;
use std::collections::HashSet;

/// The transaction-scoped bookkeeping that journals alongside state:
/// touched addresses, the selfdestruct set, and the
/// created-contracts set (needed for EIP-6780). Unlike `AccessList`
/// (never reverted), every set here is reverted with its enclosing
/// checkpoint — callers undo membership the same way they undo any other
/// journal entry, by calling the `remove_*` methods from `JournalEntry`
/// replay.
#[derive(Debug, Default, Clone)]
pub struct Substate {
    touched: HashSet<Address>,
    selfdestruct_set: HashSet<Address>,
    created_contracts: HashSet<Address>,
}

impl Substate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if `addr` was not already touched.
    pub fn touch(&mut self, addr: Address) -> bool {
        self.touched.insert(addr)
    }

    pub fn untouch(&mut self, addr: Address) {
        self.touched.remove(&addr);
    }

    pub fn is_touched(&self, addr: Address) -> bool {
        self.touched.contains(&addr)
    }

    pub fn touched(&self) -> impl Iterator<Item = &Address> {
        self.touched.iter()
    }

    pub fn mark_for_destruction(&mut self, addr: Address) {
        self.selfdestruct_set.insert(addr);
    }

    pub fn unmark_for_destruction(&mut self, addr: Address) {
        self.selfdestruct_set.remove(&addr);
    }

    pub fn is_marked_for_destruction(&self, addr: Address) -> bool {
        self.selfdestruct_set.contains(&addr)
    }

    pub fn destruction_set(&self) -> impl Iterator<Item = &Address> {
        self.selfdestruct_set.iter()
    }

    /// Record `addr` as created within the current transaction. EIP-6780:
    /// only contracts in this set self-destruct for real at tx end.
    pub fn record_created(&mut self, addr: Address) {
        self.created_contracts.insert(addr);
    }

    pub fn uncreate(&mut self, addr: Address) {
        self.created_contracts.remove(&addr);
    }

    pub fn was_created_this_tx(&self, addr: Address) -> bool {
        self.created_contracts.contains(&addr)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn touch_is_idempotent() {
        let mut substate = Substate::new();
        let addr = Address::from_low_u64_be(1);
        assert!(substate.touch(addr));
        assert!(!substate.touch(addr));
        assert!(substate.is_touched(addr));
    }

    #[test]
    fn selfdestruct_only_applies_to_created_this_tx() {
        let mut substate = Substate::new();
        let old = Address::from_low_u64_be(1);
        let new = Address::from_low_u64_be(2);
        substate.record_created(new);
        substate.mark_for_destruction(old);
        substate.mark_for_destruction(new);
        assert!(!substate.was_created_this_tx(old));
        assert!(substate.was_created_this_tx(new));
    }
}
