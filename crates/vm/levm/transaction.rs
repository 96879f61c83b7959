//! Transaction Driver: §4.7's eight phases — fees, intrinsic gas, sender
//! checks, buy gas, dispatch, pay & refund, prune, receipt.

use crate::engine::{create_address, VmState};
use crate::errors::InvalidTxError;
use crate::gas::{capped_refund, intrinsic_gas};
use crate::precompiles::PrecompileProvider;
use crate::receipt::Receipt;
use bytes::Bytes;
use ethereum_types::{Address, U256};
use evm_core_common::{empty_string_hash, constants::*, BlockEnv, TxEnv, TxKind};
use evm_core_trie::WorldState;
use tracing::{debug, trace};

pub struct TxOutcome {
    pub receipt: Receipt,
    pub success: bool,
    pub gas_used: u64,
    /// Address of the deployed contract, for a creation transaction that
    /// succeeded.
    pub created_address: Option<Address>,
}

/// Runs one transaction against `vm` (freshly constructed by the Top-Level
/// Loop for this transaction, so its access lists/substate/logs/refund
/// counter all start empty — only `vm.world` carries state across
/// transactions in a block). `cumulative_gas_used_before` is the running
/// total from earlier transactions in the same block, folded into the
/// receipt.
pub fn execute<W: WorldState>(
    vm: &mut VmState<W>,
    precompiles: &dyn PrecompileProvider,
    block: &BlockEnv,
    tx: &TxEnv,
    cumulative_gas_used_before: u64,
) -> Result<TxOutcome, InvalidTxError> {
    // -- Phase 1: fees -----------------------------------------------------
    if tx.max_fee_per_gas < block.base_fee {
        return Err(InvalidTxError::FeeCapBelowBaseFee {
            max_fee: tx.max_fee_per_gas,
            base_fee: block.base_fee,
        });
    }
    if tx.max_fee_per_gas < tx.max_priority_fee_per_gas {
        return Err(InvalidTxError::PriorityFeeAboveMaxFee {
            priority: tx.max_priority_fee_per_gas,
            max_fee: tx.max_fee_per_gas,
        });
    }
    let computed_priority = tx.max_priority_fee_per_gas.min(tx.max_fee_per_gas - block.base_fee);
    let computed_fee = block.base_fee + computed_priority;

    // -- Phase 2: intrinsic gas ---------------------------------------------
    let intrinsic = intrinsic_gas(&tx.data, tx.is_create(), vm.fork);
    if tx.gas_limit < intrinsic {
        return Err(InvalidTxError::GasLimitBelowIntrinsic {
            gas_limit: tx.gas_limit,
            intrinsic,
        });
    }
    if tx.gas_limit > block.gas_limit {
        return Err(InvalidTxError::GasLimitAboveBlock {
            gas_limit: tx.gas_limit,
            block_gas_limit: block.gas_limit,
        });
    }
    if vm.fork.meters_initcode() && tx.is_create() && tx.data.len() > MAX_INITCODE_SIZE {
        return Err(InvalidTxError::InitcodeTooLarge { len: tx.data.len() });
    }

    // -- Phase 3: sender checks ----------------------------------------------
    let sender = vm.read_account(tx.origin);
    if vm.fork.caps_nonce() && sender.nonce >= MAX_NONCE {
        return Err(InvalidTxError::NonceTooHigh);
    }
    if sender.nonce != tx.nonce {
        return Err(InvalidTxError::NonceMismatch {
            tx_nonce: tx.nonce,
            account_nonce: sender.nonce,
        });
    }
    if sender.code_hash != empty_string_hash() {
        return Err(InvalidTxError::SenderIsContract { sender: tx.origin });
    }
    let upfront_cost = U256::from(tx.gas_limit) * computed_fee + tx.value;
    if sender.balance < upfront_cost {
        return Err(InvalidTxError::InsufficientFunds {
            balance: sender.balance,
            cost: upfront_cost,
        });
    }
    if let Some(tx_chain_id) = tx.chain_id {
        if tx_chain_id != block.chain_id {
            return Err(InvalidTxError::ChainIdMismatch {
                tx_chain_id,
                block_chain_id: block.chain_id,
            });
        }
    }

    // -- Phase 4: buy gas ------------------------------------------------------
    let gas_cost = U256::from(tx.gas_limit) * computed_fee;
    vm.debit(tx.origin, gas_cost);
    vm.bump_nonce(tx.origin).expect("nonce bound already checked in phase 3");

    vm.access_list.insert_address(tx.origin);
    if let Some(to) = tx.to() {
        vm.access_list.insert_address(to);
    }
    if vm.fork.warms_coinbase() {
        vm.access_list.insert_address(block.beneficiary);
    }
    if vm.fork.has_access_lists() {
        for id in 1..=9u64 {
            vm.access_list.insert_address(Address::from_low_u64_be(id));
        }
        for (addr, keys) in &tx.access_list {
            vm.access_list.insert_address(*addr);
            for key in keys {
                vm.access_list.insert_storage_key(*addr, *key);
            }
        }
    }

    trace!(origin = ?tx.origin, intrinsic, gas_limit = tx.gas_limit, "transaction entering dispatch");

    // -- Phase 5: dispatch -----------------------------------------------------
    let gas_for_execution = tx.gas_limit - intrinsic;
    let (success, gas_left, created_address) = match tx.kind {
        TxKind::Call(to) => {
            match vm.call_top_level(precompiles, tx.origin, to, tx.value, tx.data.clone(), gas_for_execution) {
                Ok(outcome) => (outcome.success, outcome.gas_left, None),
                Err(_) => (false, 0, None),
            }
        }
        TxKind::Create => {
            let new_address = create_address(tx.origin, tx.nonce);
            match vm.create_top_level(precompiles, tx.origin, new_address, tx.value, tx.data.clone(), gas_for_execution) {
                Ok(outcome) => (outcome.success, outcome.gas_left, outcome.address),
                Err(_) => (false, 0, None),
            }
        }
    };

    // -- Phase 6: pay & refund ---------------------------------------------
    let used = tx.gas_limit - gas_left;
    let refund = capped_refund(vm.refund_counter, used, vm.fork);
    let leftover = gas_left + refund;
    vm.credit(block.beneficiary, U256::from(used) * computed_priority);
    vm.credit(tx.origin, U256::from(leftover) * computed_fee);

    // -- Phase 7: prune ------------------------------------------------------
    let touched: Vec<Address> = vm.substate.touched().copied().collect();
    for addr in touched {
        if vm.account_is_dead(addr) {
            vm.world.delete_account(addr);
        }
    }
    let destroyed: Vec<Address> = vm.substate.destruction_set().copied().collect();
    for addr in destroyed {
        vm.world.delete_account(addr);
    }

    debug!(success, used, refund, "transaction complete");

    // -- Phase 8: receipt ------------------------------------------------------
    let cumulative_gas_used = cumulative_gas_used_before + used;
    let receipt = if success {
        Receipt::succeeded(tx.tx_type, cumulative_gas_used, vm.logs.clone())
    } else {
        Receipt::failed(tx.tx_type, cumulative_gas_used)
    };

    Ok(TxOutcome {
        receipt,
        success,
        gas_used: used,
        created_address,
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::engine::VmState;
    use crate::precompiles::DefaultPrecompiles;
    use evm_core_common::{Account, Fork, TxKind};
    use evm_core_trie::InMemoryWorldState;

    fn funded_sender(world: &mut InMemoryWorldState, addr: Address, balance: U256) {
        world.write_account(
            addr,
            Account {
                nonce: 0,
                balance,
                storage_root: ethereum_types::H256::zero(),
                code_hash: empty_string_hash(),
            },
        );
    }

    fn base_block() -> BlockEnv {
        BlockEnv {
            base_fee: U256::zero(),
            beneficiary: Address::from_low_u64_be(0xc01bace),
            chain_id: 1,
            gas_limit: 30_000_000,
            number: 1,
            timestamp: 0,
            random: [0u8; 32],
            fork: Fork::Shanghai,
        }
    }

    #[test]
    fn simple_transfer_moves_value_and_charges_intrinsic_gas() {
        let mut world = InMemoryWorldState::default();
        let sender = Address::from_low_u64_be(1);
        let recipient = Address::from_low_u64_be(2);
        funded_sender(&mut world, sender, U256::from(10u64).pow(U256::from(18)));

        let mut vm = VmState::new(world, Fork::Shanghai);
        let block = base_block();
        let tx = TxEnv {
            origin: sender,
            kind: TxKind::Call(recipient),
            value: U256::from(10u64).pow(U256::from(15)),
            data: Bytes::new(),
            gas_limit: 21_000,
            max_fee_per_gas: U256::zero(),
            max_priority_fee_per_gas: U256::zero(),
            nonce: 0,
            chain_id: None,
            access_list: vec![],
            tx_type: 0,
        };

        let outcome = execute(&mut vm, &DefaultPrecompiles, &block, &tx, 0).unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.gas_used, 21_000);
        assert_eq!(vm.balance(recipient), U256::from(10u64).pow(U256::from(15)));
        assert_eq!(vm.read_account(sender).nonce, 1);
    }

    #[test]
    fn rejects_gas_limit_below_intrinsic() {
        let mut world = InMemoryWorldState::default();
        let sender = Address::from_low_u64_be(1);
        funded_sender(&mut world, sender, U256::from(10u64).pow(U256::from(18)));
        let mut vm = VmState::new(world, Fork::Shanghai);
        let block = base_block();
        let tx = TxEnv {
            origin: sender,
            kind: TxKind::Call(Address::from_low_u64_be(2)),
            value: U256::zero(),
            data: Bytes::new(),
            gas_limit: 1_000,
            max_fee_per_gas: U256::zero(),
            max_priority_fee_per_gas: U256::zero(),
            nonce: 0,
            chain_id: None,
            access_list: vec![],
            tx_type: 0,
        };
        assert!(matches!(
            execute(&mut vm, &DefaultPrecompiles, &block, &tx, 0),
            Err(InvalidTxError::GasLimitBelowIntrinsic { .. })
        ));
    }

    fn deploy(world: &mut InMemoryWorldState, addr: Address, code: &[u8], balance: U256) {
        let code_hash = evm_core_common::keccak256(code);
        world.write_code(code_hash, Bytes::copy_from_slice(code));
        world.write_account(
            addr,
            Account {
                nonce: 1,
                balance,
                storage_root: ethereum_types::H256::zero(),
                code_hash,
            },
        );
    }

    // A calls B with a gas stipend far below what B's SSTORE needs. B's
    // write must be fully undone while A, having only made the call and
    // then STOPped, completes successfully.
    #[test]
    fn out_of_gas_in_a_nested_call_does_not_fail_the_caller_or_the_transaction() {
        let mut world = InMemoryWorldState::default();
        let sender = Address::from_low_u64_be(1);
        let a = Address::from_low_u64_be(0xA);
        let b = Address::from_low_u64_be(0xB);
        funded_sender(&mut world, sender, U256::from(10u64).pow(U256::from(18)));

        let mut a_code = vec![
            0x60, 0x00, // retSize
            0x60, 0x00, // retOffset
            0x60, 0x00, // argsSize
            0x60, 0x00, // argsOffset
            0x60, 0x00, // value
            0x73, // PUSH20 <b>
        ];
        a_code.extend_from_slice(b.as_bytes());
        a_code.extend_from_slice(&[0x60, 0x64, 0xf1, 0x00]); // PUSH1 100, CALL, STOP
        deploy(&mut world, a, &a_code, U256::zero());

        let b_code = [0x60, 0x01, 0x60, 0x01, 0x55]; // PUSH1 1, PUSH1 1, SSTORE
        deploy(&mut world, b, &b_code, U256::zero());

        let mut vm = VmState::new(world, Fork::Shanghai);
        let block = base_block();
        let tx = TxEnv {
            origin: sender,
            kind: TxKind::Call(a),
            value: U256::zero(),
            data: Bytes::new(),
            gas_limit: 100_000,
            max_fee_per_gas: U256::zero(),
            max_priority_fee_per_gas: U256::zero(),
            nonce: 0,
            chain_id: None,
            access_list: vec![],
            tx_type: 0,
        };

        let outcome = execute(&mut vm, &DefaultPrecompiles, &block, &tx, 0).unwrap();
        assert!(outcome.success, "A's own frame STOPs regardless of B's failed call");
        assert_eq!(vm.world.read_storage(b, U256::from(1)), U256::zero(), "B's SSTORE must not have committed");
    }

    // A contract created in an earlier transaction that SELFDESTRUCTs now
    // must survive (EIP-6780): only its balance moves, the account itself
    // stays in place.
    #[test]
    fn selfdestruct_of_a_preexisting_contract_moves_balance_but_keeps_the_account() {
        let mut world = InMemoryWorldState::default();
        let sender = Address::from_low_u64_be(1);
        let c = Address::from_low_u64_be(0xC);
        let recipient = Address::from_low_u64_be(0xD);
        funded_sender(&mut world, sender, U256::from(10u64).pow(U256::from(18)));

        let mut c_code = vec![0x73];
        c_code.extend_from_slice(recipient.as_bytes());
        c_code.push(0xff); // SELFDESTRUCT
        let c_balance = U256::from(500u64);
        deploy(&mut world, c, &c_code, c_balance);

        let mut vm = VmState::new(world, Fork::Shanghai);
        let block = base_block();
        let tx = TxEnv {
            origin: sender,
            kind: TxKind::Call(c),
            value: U256::zero(),
            data: Bytes::new(),
            gas_limit: 100_000,
            max_fee_per_gas: U256::zero(),
            max_priority_fee_per_gas: U256::zero(),
            nonce: 0,
            chain_id: None,
            access_list: vec![],
            tx_type: 0,
        };

        let outcome = execute(&mut vm, &DefaultPrecompiles, &block, &tx, 0).unwrap();
        assert!(outcome.success);
        assert!(
            vm.world.read_account(c).is_some(),
            "c predates this transaction, so EIP-6780 forbids actually deleting it"
        );
        assert_eq!(vm.world.read_account(c).unwrap().balance, U256::zero());
        assert_eq!(vm.world.read_account(recipient).unwrap().balance, c_balance);
    }
}
