//! Block-body execution (spec §4.8): pre-block system calls, one
//! `process_transaction` per transaction, withdrawals, and post-block system
//! calls, folded into one [`BlockOutput`]. Mirrors `ethrex_levm`'s split
//! between the per-transaction pipeline and the block-level driver that
//! calls it in a loop.

use crate::constants::{
    BEACON_ROOTS_ADDRESS, CONSOLIDATION_REQUEST_PREDEPLOY_ADDRESS, HISTORY_STORAGE_ADDRESS,
    MAX_BLOB_NUMBER_PER_BLOCK, SYSTEM_ADDRESS, SYSTEM_TRANSACTION_GAS,
    WITHDRAWAL_REQUEST_PREDEPLOY_ADDRESS,
};
use crate::db::GeneralizedDatabase;
use crate::environment::{BlockEnvironment, Environment, TransactionEnvironment};
use crate::errors::{InvalidBlock, VMError};
use crate::fork::{Fork, eips};
use crate::gas_cost;
use crate::primitives::{Address, U256};
use crate::transaction::receipt::{Bloom, add_log};
use crate::transaction::{Receipt, Transaction, check_transaction, process_transaction, validate_transaction};
use crate::vm::{FrameOutcome, VM};
use bytes::Bytes;

/// One beacon-chain withdrawal (spec §4.8's EIP-4895 step): a balance
/// credit carrying no transaction, gas cost, or receipt of its own.
#[derive(Debug, Clone)]
pub struct Withdrawal {
    pub index: u64,
    pub validator_index: u64,
    pub address: Address,
    /// Wire units are Gwei; the credited amount is `amount_gwei * 10^9` wei.
    pub amount_gwei: u64,
}

/// Everything a block-body execution produces (spec §4.8): per-transaction
/// receipts, the block's total gas used, its logs bloom, and the EIP-7685
/// request payloads emitted by the post-block system calls.
#[derive(Debug, Clone, Default)]
pub struct BlockOutput {
    pub receipts: Vec<Receipt>,
    pub gas_used: u64,
    pub bloom: Bloom,
    pub requests: Vec<Bytes>,
}

/// Run every transaction in `transactions` against `db`, crediting
/// `withdrawals` afterward, bracketed by the pre- and post-block system
/// calls the active fork requires (spec §4.8). A transaction that fails
/// structural or contextual validation invalidates the whole block — the
/// caller is expected to have already taken a snapshot it can roll back to.
pub fn apply_body(
    db: &mut GeneralizedDatabase,
    block_env: &BlockEnvironment,
    fork: Fork,
    transactions: &[Transaction],
    withdrawals: &[Withdrawal],
) -> Result<BlockOutput, VMError> {
    run_pre_block_system_calls(db, block_env, fork)?;

    let mut output = BlockOutput::default();
    let mut block_gas_remaining = block_env.block_gas_limit;
    let mut block_blob_gas_remaining = if fork.eip(eips::EIP_4844) {
        u64::try_from(MAX_BLOB_NUMBER_PER_BLOCK).unwrap_or(u64::MAX).saturating_mul(gas_cost::GAS_PER_BLOB)
    } else {
        0
    };

    for (index, tx) in transactions.iter().enumerate() {
        validate_transaction(tx, fork).map_err(|source| InvalidBlock::Transaction { index, source })?;

        let checked = check_transaction(
            db,
            tx,
            fork,
            block_env.chain_id,
            block_env.base_fee_per_gas,
            block_env.excess_blob_gas,
            block_gas_remaining,
            block_blob_gas_remaining,
        )
        .map_err(|err| match err {
            VMError::TxValidation(source) => VMError::Block(InvalidBlock::Transaction { index, source }),
            other => other,
        })?;

        let receipt = process_transaction(db, block_env, tx, &checked, fork, index, output.gas_used)?;
        let tx_gas_used = receipt.cumulative_gas_used.saturating_sub(output.gas_used);

        block_gas_remaining = block_gas_remaining.saturating_sub(tx_gas_used);
        block_blob_gas_remaining = block_blob_gas_remaining.saturating_sub(
            u64::try_from(tx.blob_versioned_hashes.len())
                .unwrap_or(u64::MAX)
                .saturating_mul(gas_cost::GAS_PER_BLOB),
        );

        for log in &receipt.logs {
            add_log(&mut output.bloom, log);
        }
        output.gas_used = receipt.cumulative_gas_used;
        output.receipts.push(receipt);
    }

    apply_withdrawals(db, withdrawals)?;

    output.requests = run_post_block_system_calls(db, block_env, fork)?;

    Ok(output)
}

/// EIP-4895: withdrawals credit balances directly, bypassing the
/// transaction pipeline entirely (no gas, no nonce, no signature).
fn apply_withdrawals(db: &mut GeneralizedDatabase, withdrawals: &[Withdrawal]) -> Result<(), VMError> {
    for withdrawal in withdrawals {
        if withdrawal.amount_gwei == 0 {
            continue;
        }
        let mut info = db.get_account(withdrawal.address)?;
        let amount_wei = U256::from(withdrawal.amount_gwei).saturating_mul(U256::from(1_000_000_000u64));
        info.balance = info.balance.saturating_add(amount_wei);
        db.set_account(withdrawal.address, info)?;
    }
    Ok(())
}

/// EIP-4788 (beacon roots) and EIP-2935 (historical block hashes): before
/// any transaction runs, the protocol calls a fixed predeploy with the
/// parent beacon root / the previous block's hash as calldata, discarding
/// gas accounting and tolerating a revert (the ring buffer just doesn't
/// get updated that block).
fn run_pre_block_system_calls(
    db: &mut GeneralizedDatabase,
    block_env: &BlockEnvironment,
    fork: Fork,
) -> Result<(), VMError> {
    if fork.eip(eips::EIP_4788) {
        if let Some(root) = block_env.parent_beacon_block_root {
            run_system_call(db, block_env, fork, *BEACON_ROOTS_ADDRESS, Bytes::copy_from_slice(root.as_bytes()))?;
        }
    }
    if fork.eip(eips::EIP_2935) {
        if let Some(parent_hash) = block_env.block_hashes.get(block_env.number.saturating_sub(1)) {
            run_system_call(
                db,
                block_env,
                fork,
                *HISTORY_STORAGE_ADDRESS,
                Bytes::copy_from_slice(parent_hash.as_bytes()),
            )?;
        }
    }
    Ok(())
}

/// EIP-7002 (withdrawal requests) and EIP-7251 (consolidation requests):
/// after every transaction and withdrawal, the protocol reads back whatever
/// the predeploy queued this block, via a system call with empty calldata.
/// Each predeploy's return data is one EIP-7685 request payload. Unlike the
/// pre-block calls, both EIPs are explicit that a reverting system call here
/// invalidates the whole block.
fn run_post_block_system_calls(
    db: &mut GeneralizedDatabase,
    block_env: &BlockEnvironment,
    fork: Fork,
) -> Result<Vec<Bytes>, VMError> {
    let mut requests = Vec::new();
    if fork.eip(eips::EIP_7002) {
        if let Some(output) = run_mandatory_system_call(db, block_env, fork, *WITHDRAWAL_REQUEST_PREDEPLOY_ADDRESS)? {
            requests.push(output);
        }
    }
    if fork.eip(eips::EIP_7251) {
        if let Some(output) =
            run_mandatory_system_call(db, block_env, fork, *CONSOLIDATION_REQUEST_PREDEPLOY_ADDRESS)?
        {
            requests.push(output);
        }
    }
    Ok(requests)
}

fn run_mandatory_system_call(
    db: &mut GeneralizedDatabase,
    block_env: &BlockEnvironment,
    fork: Fork,
    to: Address,
) -> Result<Option<Bytes>, VMError> {
    let Some(outcome) = run_system_call(db, block_env, fork, to, Bytes::new())? else {
        return Ok(None);
    };
    if !outcome.success {
        return Err(InvalidBlock::SystemTransactionFailed.into());
    }
    Ok((!outcome.output.is_empty()).then_some(outcome.output))
}

/// One system call (spec §4.8): `SYSTEM_ADDRESS` calls `to` with a fixed gas
/// allowance, no value transfer, no nonce bump, no fee payment, and its
/// result never affects `SYSTEM_ADDRESS`'s own balance or nonce. `None` is
/// returned rather than calling into the interpreter at all when `to` has no
/// code — the predeploys are expected to exist from genesis, but a test
/// harness that hasn't deployed one yet shouldn't make every block invalid.
fn run_system_call(
    db: &mut GeneralizedDatabase,
    block_env: &BlockEnvironment,
    fork: Fork,
    to: Address,
    calldata: Bytes,
) -> Result<Option<FrameOutcome>, VMError> {
    let code = db.get_account(to)?.code;
    if code.is_empty() {
        return Ok(None);
    }

    let tx_env = TransactionEnvironment {
        origin: *SYSTEM_ADDRESS,
        gas: SYSTEM_TRANSACTION_GAS,
        index_in_block: None,
        tx_hash: None,
        ..TransactionEnvironment::default()
    };
    let env = Environment::new(block_env, &tx_env, fork);

    // `vm.execute` already wraps the root frame in its own begin/commit-or-
    // rollback checkpoint; a system call has no hook bookkeeping around it
    // the way `process_transaction` does, so no outer checkpoint is needed.
    let mut vm = VM::new(env, db, Vec::new());
    let outcome =
        vm.execute(*SYSTEM_ADDRESS, Some(to), code, to, calldata, U256::zero(), SYSTEM_TRANSACTION_GAS, false)?;
    Ok(Some(outcome))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn withdrawal_of_zero_gwei_is_a_no_op() {
        let withdrawal =
            Withdrawal { index: 0, validator_index: 0, address: Address::zero(), amount_gwei: 0 };
        assert_eq!(withdrawal.amount_gwei, 0);
    }
}
