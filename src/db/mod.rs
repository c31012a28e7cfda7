//! World state (spec §3, §4.2). Two pieces:
//!
//! - [`Database`]: the narrow, read-only interface an external MPT-backed
//!   store implements (spec §6) — the crate never touches tries, RLP or
//!   Keccak directly.
//! - [`GeneralizedDatabase`]: the in-memory cache + journal sitting on top
//!   of it, which is what the interpreter and transaction pipeline actually
//!   read and write. Named after `ethrex_levm::db::gen_db::GeneralizedDatabase`,
//!   whose job it mirrors.

pub mod gen_db;

pub use gen_db::{CacheBackup, GeneralizedDatabase};

use crate::account::AccountInfo;
use crate::errors::DatabaseError;
use crate::primitives::{Address, H256, U256};

/// External narrow interface (spec §6): everything this crate needs from a
/// Merkle-Patricia-Trie-backed store, and nothing more. Implementations are
/// expected to be read-only snapshots of a specific block; all mutation
/// happens in [`GeneralizedDatabase`]'s cache and is flushed by the caller
/// after the block finishes (out of scope here, per spec §1).
pub trait Database: Send + Sync {
    fn get_account_info(&self, address: Address) -> Result<AccountInfo, DatabaseError>;
    fn account_exists(&self, address: Address) -> Result<bool, DatabaseError>;
    fn get_storage_slot(&self, address: Address, key: H256) -> Result<U256, DatabaseError>;
    /// One of the last [`crate::constants::MAX_BLOCK_HASH_HISTORY`] block
    /// hashes; `None` if out of the window the caller maintains.
    fn get_block_hash(&self, block_number: u64) -> Result<Option<H256>, DatabaseError>;
}
