//! The journaled in-memory cache sitting in front of a [`super::Database`].
//!
//! Per spec §9's redesign note, the journal is a single append-only log of
//! *first-write* originals per checkpoint ([`CacheBackup`]), not a deep copy
//! of the whole state on every `begin_transaction`. `commit` folds a
//! checkpoint's backup into its parent (so an even-older rollback still
//! sees the right originals); `rollback` replays it to undo every mutation
//! made since the checkpoint was taken.

use crate::account::AccountInfo;
use crate::errors::{DatabaseError, InternalError, VMError};
use crate::fork::{Fork, eips};
use crate::primitives::{Address, H256, U256};
use rustc_hash::{FxHashMap, FxHashSet};
use std::sync::Arc;

use super::Database;

/// A cached account: either live data or a tombstone recording that the
/// account existed and was destroyed this block (distinct from "never
/// loaded", which simply has no cache entry at all).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheAccount {
    Alive(AccountInfo),
    Destroyed,
}

impl CacheAccount {
    fn info(&self) -> AccountInfo {
        match self {
            CacheAccount::Alive(info) => info.clone(),
            CacheAccount::Destroyed => AccountInfo::default(),
        }
    }
}

/// First-write-wins journal entry for one checkpoint: the account/storage
/// values as they stood immediately *before* this checkpoint was opened.
/// `None` means "no cache entry existed" — rollback must remove the key
/// entirely so the next read reconsults the backing [`Database`].
#[derive(Debug, Default)]
pub struct CacheBackup {
    accounts: FxHashMap<Address, Option<CacheAccount>>,
    storage: FxHashMap<(Address, H256), Option<U256>>,
}

/// In-memory cache + journal over a [`Database`]. Owned exclusively by the
/// block executor for the block's duration; a transaction borrows it
/// through [`GeneralizedDatabase::begin_transaction`].
pub struct GeneralizedDatabase {
    store: Arc<dyn Database>,
    accounts: FxHashMap<Address, CacheAccount>,
    storage: FxHashMap<(Address, H256), U256>,
    transient_storage: FxHashMap<(Address, H256), U256>,
    checkpoints: Vec<CacheBackup>,
    created_accounts: FxHashSet<Address>,
    transaction_snapshot_index: Option<usize>,
}

impl GeneralizedDatabase {
    pub fn new(store: Arc<dyn Database>) -> Self {
        Self {
            store,
            accounts: FxHashMap::default(),
            storage: FxHashMap::default(),
            transient_storage: FxHashMap::default(),
            checkpoints: Vec::new(),
            created_accounts: FxHashSet::default(),
            transaction_snapshot_index: None,
        }
    }

    // -- account access -----------------------------------------------

    fn load_account(&mut self, address: Address) -> Result<(), DatabaseError> {
        if !self.accounts.contains_key(&address) {
            let info = self.store.get_account_info(address)?;
            self.accounts.insert(address, CacheAccount::Alive(info));
        }
        Ok(())
    }

    pub fn get_account(&mut self, address: Address) -> Result<AccountInfo, VMError> {
        self.load_account(address)?;
        Ok(self
            .accounts
            .get(&address)
            .map(CacheAccount::info)
            .unwrap_or_default())
    }

    /// `None` if the account is destroyed or was never observed and does
    /// not exist in the backing store either.
    pub fn get_account_optional(&mut self, address: Address) -> Result<Option<AccountInfo>, VMError> {
        self.load_account(address)?;
        match self.accounts.get(&address) {
            Some(CacheAccount::Alive(info)) => Ok(Some(info.clone())),
            Some(CacheAccount::Destroyed) | None => Ok(None),
        }
    }

    fn record_account_backup(&mut self, address: Address) {
        let Some(backup) = self.checkpoints.last_mut() else {
            return;
        };
        backup
            .accounts
            .entry(address)
            .or_insert_with(|| self.accounts.get(&address).cloned());
    }

    pub fn set_account(&mut self, address: Address, info: AccountInfo) -> Result<(), VMError> {
        self.load_account(address)?;
        self.record_account_backup(address);
        self.accounts.insert(address, CacheAccount::Alive(info));
        Ok(())
    }

    pub fn modify_state(
        &mut self,
        address: Address,
        fork: Fork,
        f: impl FnOnce(&mut AccountInfo),
    ) -> Result<(), VMError> {
        let mut info = self.get_account(address)?;
        f(&mut info);
        if fork.eip(eips::EIP_161) && info.is_empty() && !self.account_has_storage(address)? {
            self.destroy_account(address)?;
        } else {
            self.set_account(address, info)?;
        }
        Ok(())
    }

    pub fn set_account_balance(&mut self, address: Address, balance: U256) -> Result<(), VMError> {
        let mut info = self.get_account(address)?;
        info.balance = balance;
        self.set_account(address, info)
    }

    pub fn increment_nonce(&mut self, address: Address) -> Result<(), VMError> {
        let mut info = self.get_account(address)?;
        info.nonce = info
            .nonce
            .checked_add(1)
            .ok_or(InternalError::Overflow("nonce increment"))?;
        self.set_account(address, info)
    }

    pub fn set_code(&mut self, address: Address, code: bytes::Bytes) -> Result<(), VMError> {
        let mut info = self.get_account(address)?;
        info.code = code;
        self.set_account(address, info)
    }

    /// `move_ether` is an invariant operation (spec §4.2, §7 axis 3):
    /// insufficient balance here is a bug in an upstream check, never a
    /// recoverable user error.
    pub fn move_ether(&mut self, from: Address, to: Address, amount: U256) -> Result<(), VMError> {
        if amount.is_zero() {
            return Ok(());
        }
        let mut sender = self.get_account(from)?;
        if sender.balance < amount {
            return Err(InternalError::InsufficientBalanceInvariant.into());
        }
        sender.balance -= amount;
        self.set_account(from, sender)?;

        let mut recipient = self.get_account(to)?;
        recipient.balance = recipient
            .balance
            .checked_add(amount)
            .ok_or(InternalError::Overflow("balance credit in move_ether"))?;
        self.set_account(to, recipient)?;
        Ok(())
    }

    pub fn destroy_account(&mut self, address: Address) -> Result<(), VMError> {
        self.load_account(address)?;
        self.record_account_backup(address);
        self.accounts.insert(address, CacheAccount::Destroyed);
        self.destroy_storage(address);
        Ok(())
    }

    pub fn destroy_storage(&mut self, address: Address) {
        let keys: Vec<(Address, H256)> = self
            .storage
            .keys()
            .filter(|(a, _)| *a == address)
            .copied()
            .collect();
        for key in keys {
            if let Some(backup) = self.checkpoints.last_mut() {
                backup
                    .storage
                    .entry(key)
                    .or_insert_with(|| self.storage.get(&key).copied());
            }
            self.storage.remove(&key);
        }
    }

    pub fn mark_account_created(&mut self, address: Address) {
        self.created_accounts.insert(address);
    }

    pub fn was_created_this_transaction(&self, address: Address) -> bool {
        self.created_accounts.contains(&address)
    }

    pub fn account_exists(&mut self, address: Address) -> Result<bool, VMError> {
        Ok(self.get_account_optional(address)?.is_some()
            || self.store.account_exists(address)?)
    }

    pub fn account_has_code_or_nonce(&mut self, address: Address) -> Result<bool, VMError> {
        Ok(self.get_account(address)?.has_code_or_nonce())
    }

    /// Whether the cache holds any nonzero slot for `address`. This is a
    /// cache-local check: a full answer would require the backing store to
    /// expose "does this account's storage trie have any entries", which
    /// spec §6 does not include in the narrow [`Database`] interface, so
    /// callers that need certainty use this only for freshly created
    /// accounts within the current transaction.
    pub fn account_has_storage(&mut self, address: Address) -> Result<bool, VMError> {
        Ok(self
            .storage
            .iter()
            .any(|((a, _), v)| *a == address && !v.is_zero()))
    }

    pub fn is_account_alive(&mut self, address: Address) -> Result<bool, VMError> {
        Ok(self.account_exists(address)?)
    }

    pub fn account_exists_and_is_empty(&mut self, address: Address) -> Result<bool, VMError> {
        match self.get_account_optional(address)? {
            Some(info) => Ok(info.is_empty()),
            None => Ok(false),
        }
    }

    pub fn touch_account(&mut self, address: Address) -> Result<(), VMError> {
        // Touching forces the account into the cache (even if unchanged) so
        // it participates in end-of-transaction empty-account cleanup.
        self.load_account(address)?;
        Ok(())
    }

    // -- storage --------------------------------------------------------

    pub fn get_storage(&mut self, address: Address, key: H256) -> Result<U256, VMError> {
        if let Some(value) = self.storage.get(&(address, key)) {
            return Ok(*value);
        }
        let value = self.store.get_storage_slot(address, key)?;
        self.storage.insert((address, key), value);
        Ok(value)
    }

    /// Writing zero deletes the slot (spec §4.2, §8 invariant): the cache
    /// never holds an explicit zero entry once it can remove the key.
    pub fn set_storage(&mut self, address: Address, key: H256, value: U256) -> Result<(), VMError> {
        if let Some(backup) = self.checkpoints.last_mut() {
            backup
                .storage
                .entry((address, key))
                .or_insert_with(|| self.storage.get(&(address, key)).copied());
        }
        if value.is_zero() {
            self.storage.remove(&(address, key));
        } else {
            self.storage.insert((address, key), value);
        }
        Ok(())
    }

    /// Original value for SSTORE gas accounting (spec §4.2, §4.5): taken
    /// from the state as of the start of the current transaction, except
    /// that an account created within this transaction has no "original"
    /// storage at all (always zero).
    pub fn get_storage_original(
        &mut self,
        address: Address,
        key: H256,
        original_values: &FxHashMap<(Address, H256), U256>,
    ) -> Result<U256, VMError> {
        if self.created_accounts.contains(&address) {
            return Ok(U256::zero());
        }
        if let Some(value) = original_values.get(&(address, key)) {
            return Ok(*value);
        }
        self.get_storage(address, key)
    }

    // -- transient storage (EIP-1153) ------------------------------------

    pub fn get_transient(&self, address: Address, key: H256) -> U256 {
        self.transient_storage
            .get(&(address, key))
            .copied()
            .unwrap_or_default()
    }

    pub fn set_transient(&mut self, address: Address, key: H256, value: U256) {
        self.transient_storage.insert((address, key), value);
    }

    pub fn clear_transient_storage(&mut self) {
        self.transient_storage.clear();
    }

    // -- snapshots (spec §4.2) -------------------------------------------

    pub fn begin_transaction(&mut self) {
        self.checkpoints.push(CacheBackup::default());
    }

    pub fn mark_transaction_snapshot(&mut self) {
        self.transaction_snapshot_index = Some(self.checkpoints.len());
    }

    pub fn commit_transaction(&mut self) -> Result<(), VMError> {
        let child = self
            .checkpoints
            .pop()
            .ok_or(InternalError::SnapshotUnderflow)?;
        if let Some(parent) = self.checkpoints.last_mut() {
            for (address, original) in child.accounts {
                parent.accounts.entry(address).or_insert(original);
            }
            for (key, original) in child.storage {
                parent.storage.entry(key).or_insert(original);
            }
        }
        self.maybe_clear_transaction_scope();
        Ok(())
    }

    pub fn rollback_transaction(&mut self) -> Result<(), VMError> {
        let backup = self
            .checkpoints
            .pop()
            .ok_or(InternalError::SnapshotUnderflow)?;
        for (address, original) in backup.accounts {
            match original {
                Some(account) => {
                    self.accounts.insert(address, account);
                }
                None => {
                    self.accounts.remove(&address);
                }
            }
        }
        for (key, original) in backup.storage {
            match original {
                Some(value) => {
                    self.storage.insert(key, value);
                }
                None => {
                    self.storage.remove(&key);
                }
            }
        }
        self.maybe_clear_transaction_scope();
        Ok(())
    }

    fn maybe_clear_transaction_scope(&mut self) {
        if let Some(index) = self.transaction_snapshot_index
            && self.checkpoints.len() < index
        {
            self.transaction_snapshot_index = None;
            self.created_accounts.clear();
        }
    }

    pub fn checkpoint_depth(&self) -> usize {
        self.checkpoints.len()
    }

    /// EIP-161 cleanup: destroy any touched account that ended the
    /// transaction empty (spec §4.2, §4.8).
    pub fn destroy_touched_empty_accounts(
        &mut self,
        touched: &FxHashSet<Address>,
        fork: Fork,
    ) -> Result<(), VMError> {
        if !fork.eip(eips::EIP_161) {
            return Ok(());
        }
        for &address in touched {
            if self.account_exists_and_is_empty(address)? {
                self.destroy_account(address)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EmptyStore;
    impl Database for EmptyStore {
        fn get_account_info(&self, _: Address) -> Result<AccountInfo, DatabaseError> {
            Ok(AccountInfo::default())
        }
        fn account_exists(&self, _: Address) -> Result<bool, DatabaseError> {
            Ok(false)
        }
        fn get_storage_slot(&self, _: Address, _: H256) -> Result<U256, DatabaseError> {
            Ok(U256::zero())
        }
        fn get_block_hash(&self, _: u64) -> Result<Option<H256>, DatabaseError> {
            Ok(None)
        }
    }

    fn db() -> GeneralizedDatabase {
        GeneralizedDatabase::new(Arc::new(EmptyStore))
    }

    #[test]
    fn begin_commit_leaves_live_state_unchanged() {
        let mut db = db();
        let addr = Address::from_low_u64_be(1);
        db.set_account_balance(addr, U256::from(5)).unwrap();

        db.begin_transaction();
        db.set_account_balance(addr, U256::from(10)).unwrap();
        db.commit_transaction().unwrap();

        assert_eq!(db.get_account(addr).unwrap().balance, U256::from(10));
        assert_eq!(db.checkpoint_depth(), 0);
    }

    #[test]
    fn begin_mutate_rollback_restores_prior_state() {
        let mut db = db();
        let addr = Address::from_low_u64_be(1);
        db.set_account_balance(addr, U256::from(5)).unwrap();

        db.begin_transaction();
        db.set_account_balance(addr, U256::from(999)).unwrap();
        db.rollback_transaction().unwrap();

        assert_eq!(db.get_account(addr).unwrap().balance, U256::from(5));
    }

    #[test]
    fn nested_rollback_only_undoes_the_inner_checkpoint() {
        let mut db = db();
        let addr = Address::from_low_u64_be(1);
        db.begin_transaction();
        db.set_account_balance(addr, U256::from(1)).unwrap();
        db.begin_transaction();
        db.set_account_balance(addr, U256::from(2)).unwrap();
        db.rollback_transaction().unwrap();
        assert_eq!(db.get_account(addr).unwrap().balance, U256::from(1));
        db.commit_transaction().unwrap();
        assert_eq!(db.get_account(addr).unwrap().balance, U256::from(1));
    }

    #[test]
    fn setting_a_storage_slot_to_zero_removes_it() {
        let mut db = db();
        let addr = Address::from_low_u64_be(1);
        let key = H256::zero();
        db.set_storage(addr, key, U256::from(7)).unwrap();
        assert_eq!(db.get_storage(addr, key).unwrap(), U256::from(7));
        db.set_storage(addr, key, U256::zero()).unwrap();
        assert!(!db.storage.contains_key(&(addr, key)));
    }

    #[test]
    fn created_account_has_no_original_storage() {
        let mut db = db();
        let addr = Address::from_low_u64_be(1);
        db.mark_account_created(addr);
        let original = FxHashMap::default();
        assert_eq!(
            db.get_storage_original(addr, H256::zero(), &original).unwrap(),
            U256::zero()
        );
    }

    #[test]
    fn transaction_snapshot_index_clears_when_stack_shrinks_below_it() {
        let mut db = db();
        let addr = Address::from_low_u64_be(9);
        db.begin_transaction();
        db.mark_transaction_snapshot();
        db.mark_account_created(addr);
        db.rollback_transaction().unwrap();
        assert!(!db.was_created_this_transaction(addr));
    }
}
