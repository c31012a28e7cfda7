//! `process_transaction` (spec §4.7): runs a validated, recovered
//! transaction to completion and produces its [`Receipt`]. Orchestrates the
//! outer snapshot, the [`DefaultHook`] bookkeeping phases, the interpreter,
//! and (for contract-creation transactions) the root-level code deposit —
//! the one piece of CREATE's gas accounting that a nested `CREATE` opcode
//! handles for itself (`opcodes::system::create_common`) but a top-level
//! creation transaction has no opcode handler to do it for it.

use super::receipt::{Receipt, logs_bloom};
use super::types::{RecoveredAuthorization, Transaction};
use super::validate::CheckedTransaction;
use crate::db::GeneralizedDatabase;
use crate::environment::{BlockEnvironment, Environment, TransactionEnvironment};
use crate::errors::VMError;
use crate::fork::Fork;
use crate::gas_cost;
use crate::hooks::{DefaultHook, Hook};
use crate::opcodes::system::create1_address;
use crate::vm::VM;
use std::cell::RefCell;
use std::rc::Rc;

pub fn process_transaction(
    db: &mut GeneralizedDatabase,
    block_env: &BlockEnvironment,
    tx: &Transaction,
    checked: &CheckedTransaction,
    fork: Fork,
    index_in_block: usize,
    cumulative_gas_used_before: u64,
) -> Result<Receipt, VMError> {
    let recovered_authorizations: Vec<RecoveredAuthorization> = tx
        .authorization_list
        .iter()
        .map(|auth| RecoveredAuthorization {
            chain_id: auth.chain_id,
            address: auth.address,
            nonce: auth.nonce,
            authority: super::recover::recover_address(auth.signing_hash, auth.y_parity, auth.r, auth.s),
        })
        .collect();

    let tx_env = TransactionEnvironment {
        origin: checked.sender,
        gas_price: checked.effective_gas_price,
        gas: tx.gas_limit,
        access_list_addresses: tx.access_list.iter().map(|entry| entry.address).collect(),
        access_list_storage_keys: tx.access_list_pairs(),
        transient_storage_preload: Vec::new(),
        blob_versioned_hashes: tx.blob_versioned_hashes.clone(),
        authorizations: tx.authorization_list.clone(),
        index_in_block: Some(index_in_block),
        tx_hash: Some(tx.signing_hash),
    };
    let env = Environment::new(block_env, &tx_env, fork);

    let sender_nonce_before = db.get_account(checked.sender)?.nonce;
    let created_address = tx
        .is_contract_creation()
        .then(|| create1_address(checked.sender, sender_nonce_before));
    let code = match (tx.is_contract_creation(), tx.to) {
        (true, _) => tx.data.clone(),
        (false, Some(to)) => db.get_account(to)?.code,
        (false, None) => bytes::Bytes::new(),
    };
    let code_address = created_address.or(tx.to).unwrap_or_default();

    let hook = Rc::new(RefCell::new(DefaultHook {
        sender: checked.sender,
        to: tx.to,
        coinbase: block_env.coinbase,
        effective_gas_price: checked.effective_gas_price,
        priority_fee_per_gas: checked.priority_fee_per_gas,
        gas_limit: tx.gas_limit,
        value: tx.value,
        blob_fee: checked.blob_fee,
        access_list: tx.access_list_pairs(),
        authorizations: recovered_authorizations,
    }));

    db.begin_transaction();
    db.mark_transaction_snapshot();

    let mut vm = VM::new(env, db, vec![hook.clone()]);
    hook.borrow_mut().prepare_execution(&mut vm)?;

    let mut outcome = vm.execute(
        checked.sender,
        tx.to,
        code,
        code_address,
        tx.data.clone(),
        tx.value,
        tx.gas_limit,
        tx.is_contract_creation(),
    )?;

    if let (true, true, Some(addr)) = (tx.is_contract_creation(), outcome.success, created_address) {
        let deployable = vm.validate_deployed_code(&outcome.output).is_ok();
        let remaining = tx.gas_limit.saturating_sub(outcome.gas_used);
        let deposit_cost = gas_cost::CODE_DEPOSIT_PER_BYTE
            .saturating_mul(u64::try_from(outcome.output.len()).unwrap_or(u64::MAX));
        if deployable && deposit_cost <= remaining {
            vm.db.set_code(addr, outcome.output.clone())?;
            outcome.gas_used = outcome.gas_used.saturating_add(deposit_cost);
        } else {
            outcome.success = false;
            outcome.gas_used = tx.gas_limit;
        }
    }

    hook.borrow_mut().finalize_execution(&mut vm, &outcome)?;

    vm.db.destroy_touched_empty_accounts(vm.substate.touched_accounts(), fork)?;
    let logs = vm.substate.extract_logs();
    vm.db.commit_transaction()?;

    let cumulative_gas_used = cumulative_gas_used_before.saturating_add(outcome.gas_used);
    Ok(Receipt {
        tx_type: tx.tx_type,
        succeeded: outcome.success,
        cumulative_gas_used,
        bloom: logs_bloom(&logs),
        logs,
    })
}
