//! Block and transaction environment (spec §3 `BlockEnvironment` /
//! `TransactionEnvironment`), plus the fork configuration threaded through
//! every gas computation (spec §9: "pass fork as an explicit parameter",
//! never process-global state).

use crate::constants::MAX_BLOCK_HASH_HISTORY;
use crate::fork::Fork;
use crate::primitives::{Address, H256, U256};
use std::collections::VecDeque;

/// Per-fork configuration. Deliberately tiny today (just the fork tag) but
/// kept as its own struct, matching `ethrex_levm::EVMConfig`, so future
/// fork-specific knobs (e.g. a blob-gas schedule override for devnets)
/// don't require threading a second parameter through every call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EVMConfig {
    pub fork: Fork,
}

impl EVMConfig {
    pub fn new(fork: Fork) -> Self {
        Self { fork }
    }
}

impl Default for EVMConfig {
    fn default() -> Self {
        Self::new(Fork::default())
    }
}

/// A bounded ring buffer of the most recent block hashes, exposed by the
/// caller (spec §1 Non-goals: "historical-block-hash service beyond the
/// 256-entry buffer").
#[derive(Debug, Clone, Default)]
pub struct BlockHashBuffer {
    hashes: VecDeque<(u64, H256)>,
}

impl BlockHashBuffer {
    pub fn push(&mut self, number: u64, hash: H256) {
        self.hashes.push_back((number, hash));
        while self.hashes.len() > MAX_BLOCK_HASH_HISTORY {
            self.hashes.pop_front();
        }
    }

    pub fn get(&self, number: u64) -> Option<H256> {
        self.hashes
            .iter()
            .find(|(n, _)| *n == number)
            .map(|(_, hash)| *hash)
    }
}

#[derive(Debug, Clone)]
pub struct BlockEnvironment {
    pub chain_id: u64,
    pub block_gas_limit: u64,
    pub block_hashes: BlockHashBuffer,
    pub coinbase: Address,
    pub number: u64,
    pub base_fee_per_gas: Option<U256>,
    pub time: u64,
    pub prev_randao: Option<H256>,
    pub difficulty: U256,
    pub excess_blob_gas: Option<u64>,
    pub parent_beacon_block_root: Option<H256>,
}

#[derive(Debug, Clone, Default)]
pub struct TransactionEnvironment {
    pub origin: Address,
    pub gas_price: U256,
    pub gas: u64,
    pub access_list_addresses: Vec<Address>,
    pub access_list_storage_keys: Vec<(Address, Vec<H256>)>,
    pub transient_storage_preload: Vec<(Address, H256, U256)>,
    pub blob_versioned_hashes: Vec<H256>,
    pub authorizations: Vec<crate::transaction::types::AuthorizationTuple>,
    pub index_in_block: Option<usize>,
    pub tx_hash: Option<H256>,
}

/// Combined execution environment handed to the interpreter: block
/// environment, the active fork config, and the gas price actually paid by
/// this call's originating transaction.
#[derive(Debug, Clone)]
pub struct Environment {
    pub origin: Address,
    pub gas_limit: u64,
    pub gas_price: U256,
    pub coinbase: Address,
    pub number: u64,
    pub time: u64,
    pub prev_randao: Option<H256>,
    pub difficulty: U256,
    pub chain_id: u64,
    pub base_fee_per_gas: Option<U256>,
    pub block_gas_limit: u64,
    pub block_hashes: BlockHashBuffer,
    pub excess_blob_gas: Option<u64>,
    pub parent_beacon_block_root: Option<H256>,
    pub blob_versioned_hashes: Vec<H256>,
    pub tx_hash: Option<H256>,
    pub config: EVMConfig,
}

impl Environment {
    pub fn new(block: &BlockEnvironment, tx: &TransactionEnvironment, fork: Fork) -> Self {
        Self {
            origin: tx.origin,
            gas_limit: tx.gas,
            gas_price: tx.gas_price,
            coinbase: block.coinbase,
            number: block.number,
            time: block.time,
            prev_randao: block.prev_randao,
            difficulty: block.difficulty,
            chain_id: block.chain_id,
            base_fee_per_gas: block.base_fee_per_gas,
            block_gas_limit: block.block_gas_limit,
            block_hashes: block.block_hashes.clone(),
            excess_blob_gas: block.excess_blob_gas,
            parent_beacon_block_root: block.parent_beacon_block_root,
            blob_versioned_hashes: tx.blob_versioned_hashes.clone(),
            tx_hash: tx.tx_hash,
            config: EVMConfig::new(fork),
        }
    }
}
