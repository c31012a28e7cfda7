//! Transaction validation (spec §4.7): `validate_transaction` checks
//! structure alone (no database access); `check_transaction` checks it
//! against block/state context and recovers the sender.

use super::recover::{legacy_v_to_y_parity, recover_address};
use super::types::{Transaction, TxType};
use crate::constants::{MAX_BLOB_NUMBER_PER_BLOCK, MAX_INIT_CODE_SIZE, TX_GAS_LIMIT_CAP, VERSIONED_HASH_VERSION_KZG};
use crate::db::GeneralizedDatabase;
use crate::errors::{TxValidationError, VMError};
use crate::fork::{Fork, eips};
use crate::gas_cost;
use crate::primitives::U256;

/// Structural checks: everything knowable from the transaction alone plus
/// the active fork (spec §4.7).
pub fn validate_transaction(tx: &Transaction, fork: Fork) -> Result<(), TxValidationError> {
    if let Some(eip) = tx.tx_type.enabling_eip() {
        if !fork.eip(eip) {
            return Err(TxValidationError::TypeNotSupportedAtFork);
        }
    }

    let intrinsic = gas_cost::intrinsic_gas(
        fork,
        tx.is_contract_creation(),
        &tx.data,
        tx.access_list_addresses(),
        tx.access_list_storage_keys(),
        tx.authorization_list.len(),
    );
    if intrinsic > tx.gas_limit {
        return Err(TxValidationError::IntrinsicGasExceedsLimit {
            intrinsic,
            gas_limit: tx.gas_limit,
        });
    }

    if fork.eip(eips::EIP_7623) {
        let floor = gas_cost::calldata_floor_gas(&tx.data);
        if floor > tx.gas_limit {
            return Err(TxValidationError::FloorGasExceedsLimit { floor, gas_limit: tx.gas_limit });
        }
    }

    if tx.nonce == u64::MAX {
        return Err(TxValidationError::NonceIsMax(tx.nonce));
    }

    if tx.is_contract_creation() && fork.eip(eips::EIP_3860) && tx.data.len() > MAX_INIT_CODE_SIZE {
        return Err(TxValidationError::InitcodeSizeExceeded {
            actual: tx.data.len(),
            limit: MAX_INIT_CODE_SIZE,
        });
    }

    if fork.eip(eips::EIP_7825) && tx.gas_limit > TX_GAS_LIMIT_CAP {
        return Err(TxValidationError::GasLimitExceedsPerTxCap {
            gas_limit: tx.gas_limit,
            cap: TX_GAS_LIMIT_CAP,
        });
    }

    if tx.is_contract_creation()
        && (!tx.blob_versioned_hashes.is_empty() || !tx.authorization_list.is_empty())
    {
        return Err(TxValidationError::CreateWithBlobOrAuthNotAllowed);
    }

    if matches!(tx.tx_type, TxType::SetCode) && tx.authorization_list.is_empty() {
        return Err(TxValidationError::EmptyAuthorizationList);
    }

    if matches!(tx.tx_type, TxType::Blob) {
        if tx.blob_versioned_hashes.is_empty() {
            return Err(TxValidationError::EmptyBlobHashes);
        }
        if tx.blob_versioned_hashes.len() > MAX_BLOB_NUMBER_PER_BLOCK {
            return Err(TxValidationError::TooManyBlobs {
                count: tx.blob_versioned_hashes.len(),
                limit: MAX_BLOB_NUMBER_PER_BLOCK,
            });
        }
        for hash in &tx.blob_versioned_hashes {
            #[allow(clippy::indexing_slicing)]
            let version = hash.as_bytes()[0];
            if version != VERSIONED_HASH_VERSION_KZG {
                return Err(TxValidationError::InvalidBlobVersionedHashError(version));
            }
        }
    }

    Ok(())
}

/// Outcome of [`check_transaction`]: the sender plus the resolved fees,
/// handed straight to `transaction::process::process_transaction` so it
/// never recomputes them.
#[derive(Debug, Clone)]
pub struct CheckedTransaction {
    pub sender: crate::primitives::Address,
    pub effective_gas_price: U256,
    pub priority_fee_per_gas: U256,
    pub blob_fee: U256,
}

/// Contextual checks against block/state (spec §4.7): remaining block gas
/// and blob gas, sender recovery, fee-market guards, nonce/balance/code.
#[allow(clippy::too_many_arguments)]
pub fn check_transaction(
    db: &mut GeneralizedDatabase,
    tx: &Transaction,
    fork: Fork,
    chain_id: u64,
    base_fee: Option<U256>,
    excess_blob_gas: Option<u64>,
    block_gas_remaining: u64,
    block_blob_gas_remaining: u64,
) -> Result<CheckedTransaction, VMError> {
    if tx.gas_limit > block_gas_remaining {
        return Err(TxValidationError::ExceedsBlockGasLimit {
            tx_gas: tx.gas_limit,
            remaining: block_gas_remaining,
        }
        .into());
    }

    let blob_gas = u64::try_from(tx.blob_versioned_hashes.len())
        .unwrap_or(u64::MAX)
        .saturating_mul(gas_cost::GAS_PER_BLOB);
    if blob_gas > block_blob_gas_remaining {
        return Err(TxValidationError::ExceedsBlockBlobGasLimit {
            tx_blob_gas: blob_gas,
            remaining: block_blob_gas_remaining,
        }
        .into());
    }

    if let Some(tx_chain_id) = tx.chain_id {
        if tx_chain_id != chain_id {
            return Err(TxValidationError::InvalidChainId { tx: tx_chain_id, expected: chain_id }.into());
        }
    }

    let y_parity = match tx.tx_type {
        TxType::Legacy => legacy_v_to_y_parity(tx.v, tx.chain_id),
        _ => u8::try_from(tx.v).ok().filter(|p| *p <= 1),
    }
    .ok_or(TxValidationError::InvalidSignature)?;
    let sender = recover_address(tx.signing_hash, y_parity, tx.r, tx.s)
        .ok_or(TxValidationError::InvalidSignature)?;

    let max_fee = tx.max_fee_per_gas();
    if let Some(base_fee) = base_fee {
        if max_fee < base_fee {
            return Err(TxValidationError::FeeCapBelowBaseFee { max_fee, base_fee }.into());
        }
    }
    if let Some(priority) = tx.max_priority_fee_per_gas {
        if priority > max_fee {
            return Err(TxValidationError::PriorityFeeAboveMaxFee { priority, max_fee }.into());
        }
    }

    let mut blob_fee = U256::zero();
    if matches!(tx.tx_type, TxType::Blob) {
        let blob_gas_price = gas_cost::blob_gas_price(excess_blob_gas.unwrap_or_default());
        let max_blob_fee = tx.max_fee_per_blob_gas.unwrap_or_default();
        if max_blob_fee < blob_gas_price {
            return Err(TxValidationError::BlobFeeCapBelowBlobGasPrice {
                max: max_blob_fee,
                price: blob_gas_price,
            }
            .into());
        }
        blob_fee = blob_gas_price.saturating_mul(U256::from(blob_gas));
    }

    let sender_info = db.get_account(sender)?;
    if sender_info.nonce != tx.nonce {
        return Err(TxValidationError::NonceMismatch { tx: tx.nonce, state: sender_info.nonce }.into());
    }
    if !sender_info.code.is_empty() && sender_info.delegated_address().is_none() {
        return Err(TxValidationError::SenderNotEOA.into());
    }

    let effective_gas_price = tx.effective_gas_price(base_fee);
    let upfront_cost = effective_gas_price
        .saturating_mul(U256::from(tx.gas_limit))
        .saturating_add(tx.value)
        .saturating_add(blob_fee);
    if sender_info.balance < upfront_cost {
        return Err(TxValidationError::InsufficientAccountFunds {
            balance: sender_info.balance,
            cost: upfront_cost,
        }
        .into());
    }

    Ok(CheckedTransaction {
        sender,
        effective_gas_price,
        priority_fee_per_gas: tx.priority_fee_per_gas(base_fee),
        blob_fee,
    })
}
