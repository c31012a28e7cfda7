//! Transaction data model (spec §4.7): the five EIP-2718 typed transactions,
//! each already decoded into its fields. RLP decoding of the wire format is
//! out of scope (spec §1 Non-goals) — a caller hands in a `Transaction` with
//! `signing_hash` already computed from the RLP encoding of the unsigned
//! payload, the same boundary the teacher draws between `ethrex-common`
//! (encodes/decodes) and `ethrex-levm` (executes).

use crate::primitives::{Address, H256, U256};
use bytes::Bytes;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
pub enum TxType {
    Legacy,
    AccessList,
    FeeMarket,
    Blob,
    SetCode,
}

impl TxType {
    /// EIP-2718 type byte; legacy transactions carry none.
    pub fn type_byte(self) -> Option<u8> {
        match self {
            TxType::Legacy => None,
            TxType::AccessList => Some(0x01),
            TxType::FeeMarket => Some(0x02),
            TxType::Blob => Some(0x03),
            TxType::SetCode => Some(0x04),
        }
    }

    /// The EIP that must be active for this type to be accepted at all.
    pub fn enabling_eip(self) -> Option<u16> {
        match self {
            TxType::Legacy => None,
            TxType::AccessList => Some(crate::fork::eips::EIP_2930),
            TxType::FeeMarket => Some(crate::fork::eips::EIP_1559),
            TxType::Blob => Some(crate::fork::eips::EIP_4844),
            TxType::SetCode => Some(crate::fork::eips::EIP_7702),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessListEntry {
    pub address: Address,
    pub storage_keys: Vec<H256>,
}

/// EIP-7702 authorization tuple, pre-recovery: exactly what the wire format
/// carries. `signing_hash` is the keccak256 of `0x05 ‖ rlp([chain_id,
/// address, nonce])`, computed upstream (RLP is out of scope here, spec §1).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationTuple {
    pub chain_id: u64,
    pub address: Address,
    pub nonce: u64,
    pub signing_hash: H256,
    pub y_parity: u8,
    pub r: U256,
    pub s: U256,
}

/// An [`AuthorizationTuple`] after ECDSA recovery. `authority` is `None` if
/// the signature did not recover to a valid address — spec §4.7 treats that
/// as "skip this authorization", not a transaction-level failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveredAuthorization {
    pub chain_id: u64,
    pub address: Address,
    pub nonce: u64,
    pub authority: Option<Address>,
}

/// A fully-decoded transaction of any of the five types (spec §4.7). Fields
/// not meaningful for a given type are left at their default (e.g.
/// `max_fee_per_gas` is `None` for Legacy/AccessList).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub tx_type: TxType,
    pub chain_id: Option<u64>,
    pub nonce: u64,
    pub gas_price: U256,
    pub max_priority_fee_per_gas: Option<U256>,
    pub max_fee_per_gas: Option<U256>,
    pub gas_limit: u64,
    pub to: Option<Address>,
    pub value: U256,
    pub data: Bytes,
    pub access_list: Vec<AccessListEntry>,
    pub max_fee_per_blob_gas: Option<U256>,
    pub blob_versioned_hashes: Vec<H256>,
    pub authorization_list: Vec<AuthorizationTuple>,
    /// keccak256 of the RLP/type-byte encoding actually signed (out of
    /// scope to compute here, spec §1 Non-goals).
    pub signing_hash: H256,
    /// Raw signature `v`: a legacy/EIP-155 value (27/28, or
    /// `chain_id*2+35+{0,1}`) for [`TxType::Legacy`], a bare 0/1 recovery id
    /// for every typed transaction.
    pub v: u64,
    pub r: U256,
    pub s: U256,
}

impl Transaction {
    pub fn is_contract_creation(&self) -> bool {
        self.to.is_none()
    }

    pub fn access_list_addresses(&self) -> usize {
        self.access_list.len()
    }

    pub fn access_list_storage_keys(&self) -> usize {
        self.access_list.iter().map(|entry| entry.storage_keys.len()).sum()
    }

    /// `min(max_priority_fee, max_fee - base_fee) + base_fee` for typed
    /// fee-market transactions; the flat `gas_price` for Legacy/AccessList
    /// (spec §4.7).
    pub fn effective_gas_price(&self, base_fee: Option<U256>) -> U256 {
        match (self.max_fee_per_gas, self.max_priority_fee_per_gas, base_fee) {
            (Some(max_fee), Some(max_priority), Some(base_fee)) => {
                let headroom = max_fee.saturating_sub(base_fee);
                let priority = max_priority.min(headroom);
                base_fee.saturating_add(priority)
            }
            _ => self.gas_price,
        }
    }

    pub fn priority_fee_per_gas(&self, base_fee: Option<U256>) -> U256 {
        self.effective_gas_price(base_fee)
            .saturating_sub(base_fee.unwrap_or_default())
    }

    /// The fee per gas actually bounding the sender's balance check: `gas_price`
    /// for untyped fee transactions, `max_fee_per_gas` for fee-market ones.
    pub fn max_fee_per_gas(&self) -> U256 {
        self.max_fee_per_gas.unwrap_or(self.gas_price)
    }

    pub fn access_list_pairs(&self) -> Vec<(Address, Vec<H256>)> {
        self.access_list
            .iter()
            .map(|entry| (entry.address, entry.storage_keys.clone()))
            .collect()
    }
}
