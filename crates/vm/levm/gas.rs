use crate::errors::VMError;
use evm_core_common::{constants::*, Fork};

/// A frame's gas budget and running usage. `charge` fails
/// before the offending operation commits — gas accounting is checked
/// first, always.
#[derive(Debug, Clone, Copy)]
pub struct GasMeter {
    limit: u64,
    used: u64,
}

impl GasMeter {
    pub fn new(limit: u64) -> Self {
        Self { limit, used: 0 }
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }

    pub fn used(&self) -> u64 {
        self.used
    }

    pub fn remaining(&self) -> u64 {
        self.limit - self.used
    }

    pub fn charge(&mut self, cost: u64) -> Result<(), VMError> {
        let new_used = self.used.checked_add(cost).ok_or(VMError::OutOfGas)?;
        if new_used > self.limit {
            return Err(VMError::OutOfGas);
        }
        self.used = new_used;
        Ok(())
    }

    /// Consumes all remaining gas; used when a frame faults (§4.9) or a
    /// transaction fails validation (§7).
    pub fn consume_all(&mut self) {
        self.used = self.limit;
    }

    /// Credits unused gas back, e.g. when a callee returns leftover gas
    /// to its parent (§4.6 step 9).
    pub fn refund_unused(&mut self, amount: u64) {
        self.used = self.used.saturating_sub(amount);
    }
}

/// The 63/64 rule: `L(n) = n - n/64`.
pub const fn call_gas_cap(n: u64) -> u64 {
    n - n / 64
}

/// Intrinsic gas: flat cost + per-byte calldata cost +
/// contract-creation flat cost + (EIP-3860) per-word init-code cost.
pub fn intrinsic_gas(data: &[u8], is_create: bool, fork: Fork) -> u64 {
    let zeros = data.iter().filter(|b| **b == 0).count() as u64;
    let nonzeros = data.len() as u64 - zeros;
    let mut gas = GAS_TRANSACTION + GAS_TXDATAZERO * zeros + GAS_TXDATANONZERO * nonzeros;
    if is_create {
        gas += GAS_TXCREATE;
        if fork.meters_initcode() {
            let words = data.len().div_ceil(32) as u64;
            gas += INITCODE_WORD_COST * words;
        }
    }
    gas
}

/// EIP-3529 (and pre-London) refund cap: `min(refund, used_gas / quotient)`.
pub fn capped_refund(refund_counter: u64, used_gas: u64, fork: Fork) -> u64 {
    refund_counter.min(used_gas / fork.refund_quotient())
}

/// Inputs to the CALL-family gas formula.
pub struct CallGasInputs {
    pub cold: bool,
    pub is_call_or_callcode: bool,
    pub is_call: bool,
    pub value_is_nonzero: bool,
    pub recipient_is_dead: bool,
    pub requested_gas: u64,
    pub gas_left: u64,
}

pub struct CallGas {
    /// Total gas charged to the caller for making the call (access +
        /// transfer + new-account + the gas handed to the callee).
    pub total_charge: u64,
    /// Gas the callee actually runs with (includes the stipend, which is
        /// gifted above the 63/64 cap and never charged to the caller).
    pub callee_gas: u64,
}

pub fn call_gas(inputs: &CallGasInputs) -> CallGas {
    let c_access = if inputs.cold {
        GAS_COLDACCOUNTACCESS
    } else {
        GAS_WARMACCESS
    };
    let c_xfer = if inputs.is_call_or_callcode && inputs.value_is_nonzero {
        GAS_CALLVALUE
    } else {
        0
    };
    let c_new = if inputs.is_call && inputs.value_is_nonzero && inputs.recipient_is_dead {
        GAS_NEWACCOUNT
    } else {
        0
    };
    let c_extra = c_access + c_xfer + c_new;
    let available = inputs.gas_left.saturating_sub(c_extra);
    let c_gascap = inputs.requested_gas.min(call_gas_cap(available));
    let c_call = c_extra + c_gascap;
    let stipend = if inputs.value_is_nonzero { GAS_CALLSTIPEND } else { 0 };
    CallGas {
        total_charge: c_call,
        callee_gas: c_gascap + stipend,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn charge_fails_past_limit() {
        let mut meter = GasMeter::new(100);
        meter.charge(60).unwrap();
        assert!(meter.charge(50).is_err());
        assert_eq!(meter.used, 60);
    }

    #[test]
    fn call_gas_cap_matches_63_64_rule() {
        assert_eq!(call_gas_cap(64), 63);
        assert_eq!(call_gas_cap(6400), 6300);
    }

    #[test]
    fn intrinsic_gas_simple_transfer() {
        assert_eq!(intrinsic_gas(&[], false, Fork::Shanghai), GAS_TRANSACTION);
    }

    #[test]
    fn intrinsic_gas_with_calldata() {
        let data = [0xDE, 0xAD, 0xBE, 0xEF];
        assert_eq!(intrinsic_gas(&data, false, Fork::Shanghai), GAS_TRANSACTION + 4 * GAS_TXDATANONZERO);
    }

    #[test]
    fn refund_capped_at_one_fifth_post_london() {
        assert_eq!(capped_refund(1000, 100, Fork::Shanghai), 20);
        assert_eq!(capped_refund(5, 100, Fork::Shanghai), 5);
    }

    #[test]
    fn stipend_is_not_counted_against_call_gas_cap() {
        let inputs = CallGasInputs {
            cold: false,
            is_call_or_callcode: true,
            is_call: true,
            value_is_nonzero: true,
            recipient_is_dead: false,
            requested_gas: u64::MAX,
            gas_left: 1_000_000,
        };
        let result = call_gas(&inputs);
        let expected_cap = call_gas_cap(1_000_000 - GAS_CALLVALUE - GAS_WARMACCESS);
        assert_eq!(result.callee_gas, expected_cap + GAS_CALLSTIPEND);
    }
}
