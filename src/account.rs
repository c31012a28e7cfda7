//! Account data model (spec §3). The storage root is deliberately absent —
//! it is computed on demand by whatever MPT implementation sits behind
//! [`crate::db::Database`]; this crate never stores or caches a root.

use crate::constants::{EOA_DELEGATED_CODE_LEN, EOA_DELEGATION_PREFIX};
use crate::primitives::{Address, U256};
use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// On-chain account data the interpreter reads and mutates. Per-slot storage
/// lives separately in the database (`Database::get_storage`), not inlined
/// here, so that an `Account` clone (taken for journaling) stays cheap.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountInfo {
    pub nonce: u64,
    pub balance: U256,
    pub code: Bytes,
}

impl AccountInfo {
    /// EIP-161: an account is empty iff it has no balance, no code, and a
    /// zero nonce. Empty and absent are indistinguishable for gas/touch
    /// purposes once EIP-161 is active (spec §3 invariants).
    pub fn is_empty(&self) -> bool {
        self.nonce == 0 && self.balance.is_zero() && self.code.is_empty()
    }

    /// Whether this account carries an EIP-7702 delegation designator:
    /// `0xEF0100 ‖ <20-byte address>`.
    pub fn delegated_address(&self) -> Option<Address> {
        if self.code.len() != EOA_DELEGATED_CODE_LEN {
            return None;
        }
        if self.code.first_chunk::<3>()? != &EOA_DELEGATION_PREFIX {
            return None;
        }
        Some(Address::from_slice(self.code.get(3..)?))
    }

    pub fn has_code_or_nonce(&self) -> bool {
        !self.code.is_empty() || self.nonce != 0
    }
}

/// Helper extension, kept separate from `first_chunk` usage above for
/// readability at call sites that don't want the `Option` dance.
pub trait BytesExt {
    fn first_chunk<const N: usize>(&self) -> Option<&[u8; N]>;
}

impl BytesExt for Bytes {
    fn first_chunk<const N: usize>(&self) -> Option<&[u8; N]> {
        self.get(..N)?.try_into().ok()
    }
}
