//! System-boundary constants (spec §6) and interpreter limits.

use crate::primitives::Address;
use std::str::FromStr;

lazy_static::lazy_static! {
    /// Caller of pre- and post-block system transactions (EIP-4788, EIP-2935, …).
    pub static ref SYSTEM_ADDRESS: Address =
        Address::from_str("fffffffffffffffffffffffffffffffffffffffe").expect("valid address literal");
    /// EIP-4788 beacon block root ring buffer contract.
    pub static ref BEACON_ROOTS_ADDRESS: Address =
        Address::from_str("000F3df6D732807Ef1319fB7B8bB8522d0Beac02").expect("valid address literal");
    /// EIP-2935 block hash history contract.
    pub static ref HISTORY_STORAGE_ADDRESS: Address =
        Address::from_str("0000F90827F1C53a10cb7A02335B175320002935").expect("valid address literal");
    /// EIP-7002 validator withdrawal request predeploy.
    pub static ref WITHDRAWAL_REQUEST_PREDEPLOY_ADDRESS: Address =
        Address::from_str("00000961Ef480Eb55e80D19ad83579A64c007002").expect("valid address literal");
    /// EIP-7251 consolidation request predeploy.
    pub static ref CONSOLIDATION_REQUEST_PREDEPLOY_ADDRESS: Address =
        Address::from_str("0000BBdDc7CE488642fb579F8B00f3a590007251").expect("valid address literal");
}

/// Gas given to system transactions; never charged against the block's own
/// gas limit (spec §4.8, §6).
pub const SYSTEM_TRANSACTION_GAS: u64 = 30_000_000;

/// Maximum nested call-frame depth (spec §3, §4.5).
pub const STACK_DEPTH_LIMIT: usize = 1024;

/// Maximum EVM stack length (distinct from call-frame depth).
pub const EVM_STACK_SIZE: usize = 1024;

/// EIP-170: maximum deployed contract bytecode size.
pub const MAX_CODE_SIZE: usize = 24_576;

/// EIP-3860: maximum init-code size.
pub const MAX_INIT_CODE_SIZE: usize = 2 * MAX_CODE_SIZE;

/// EIP-4844: the one allowed leading byte of a blob versioned hash.
pub const VERSIONED_HASH_VERSION_KZG: u8 = 0x01;

/// EIP-7702: prefix marking an EOA's code as a delegation designator.
/// Total delegated-code length is 23 bytes: 3-byte prefix + 20-byte address.
pub const EOA_DELEGATION_PREFIX: [u8; 3] = [0xEF, 0x01, 0x00];
pub const EOA_DELEGATED_CODE_LEN: usize = 23;

/// EIP-3541: contract code may not start with this byte post-London.
pub const INVALID_CONTRACT_PREFIX: u8 = 0xEF;

/// Base transaction gas cost (Yellow Paper `G_transaction`).
pub const TX_BASE_COST: u64 = 21_000;

/// Cooperative-yield cadence for the interpreter loop (spec §4.5, §5).
pub const YIELD_EVERY_N_STEPS: u64 = 100_000;

/// Number of recent block hashes the caller is expected to expose (spec §3).
pub const MAX_BLOCK_HASH_HISTORY: usize = 256;

/// Maximum number of blob-carrying hashes in a single EIP-4844 transaction.
pub const MAX_BLOB_NUMBER_PER_BLOCK: usize = 9;

/// EIP-7623: calldata floor-gas cost per zero / non-zero byte.
pub const TOTAL_COST_FLOOR_PER_TOKEN: u64 = 10;
pub const STANDARD_TOKEN_COST: u64 = 4;
pub const TOKEN_WEIGHT_FOR_NONZERO_BYTE: u64 = 4;

/// EIP-7825: the per-transaction gas-limit cap, once active.
pub const TX_GAS_LIMIT_CAP: u64 = 1 << 24;
