//! Error taxonomy (spec §7): block-invalidating errors, VM execution
//! outcomes (`ExceptionalHalt` / revert), and invariant violations.
//!
//! Mirrors the shape of `ethrex_levm::errors` — a `VMError` enum whose
//! variants are themselves small `thiserror` enums, rather than one flat
//! bag of strings.

use crate::primitives::{Address, U256};
use thiserror::Error;

/// Halts that consume all remaining frame gas, clear output, and are
/// recorded in `Evm::error` (spec §4.5, §7 axis 2). Never aborts the
/// enclosing transaction — it fails the *call*.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExceptionalHalt {
    #[error("stack underflow")]
    StackUnderflow,
    #[error("stack overflow")]
    StackOverflow,
    #[error("out of gas")]
    OutOfGas,
    #[error("invalid opcode 0x{0:02x}")]
    InvalidOpcode(u8),
    #[error("invalid jump destination")]
    InvalidJumpDest,
    #[error("call stack depth limit (1024) exceeded")]
    StackDepthLimit,
    #[error("state-mutating opcode used in a static context")]
    WriteInStaticContext,
    #[error("memory access out of bounds")]
    OutOfBoundsRead,
    #[error("invalid opcode parameter")]
    InvalidParameter,
    #[error("created contract code starts with the EIP-3541 reserved byte")]
    InvalidContractPrefix,
    #[error("address collision on contract creation")]
    AddressCollision,
}

/// Structural/contextual transaction validation failures (spec §4.7,
/// §7 axis 1). These never mutate state beyond the pre-transaction
/// snapshot rollback the caller performs before surfacing the error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TxValidationError {
    #[error("intrinsic gas {intrinsic} exceeds transaction gas limit {gas_limit}")]
    IntrinsicGasExceedsLimit { intrinsic: u64, gas_limit: u64 },
    #[error("calldata floor gas {floor} exceeds transaction gas limit {gas_limit}")]
    FloorGasExceedsLimit { floor: u64, gas_limit: u64 },
    #[error("nonce {0} is at or beyond the maximum representable nonce")]
    NonceIsMax(u64),
    #[error("init code length {actual} exceeds MAX_INIT_CODE_SIZE ({limit})")]
    InitcodeSizeExceeded { actual: usize, limit: usize },
    #[error("transaction gas limit {gas_limit} exceeds the fork's per-tx cap {cap}")]
    GasLimitExceedsPerTxCap { gas_limit: u64, cap: u64 },
    #[error("transaction gas limit {tx_gas} exceeds remaining block gas {remaining}")]
    ExceedsBlockGasLimit { tx_gas: u64, remaining: u64 },
    #[error("blob gas {tx_blob_gas} exceeds remaining block blob gas {remaining}")]
    ExceedsBlockBlobGasLimit { tx_blob_gas: u64, remaining: u64 },
    #[error("sender signature does not recover to a valid address")]
    InvalidSignature,
    #[error("max fee per gas {max_fee} is below the block base fee {base_fee}")]
    FeeCapBelowBaseFee { max_fee: U256, base_fee: U256 },
    #[error("max priority fee {priority} exceeds max fee {max_fee}")]
    PriorityFeeAboveMaxFee { priority: U256, max_fee: U256 },
    #[error("blob transaction has no blob hashes")]
    EmptyBlobHashes,
    #[error("blob transaction has {count} hashes, exceeding the per-block limit of {limit}")]
    TooManyBlobs { count: usize, limit: usize },
    #[error("blob versioned hash has version byte 0x{0:02x}, expected 0x01")]
    InvalidBlobVersionedHashError(u8),
    #[error("max fee per blob gas {max} is below the block blob gas price {price}")]
    BlobFeeCapBelowBlobGasPrice { max: U256, price: U256 },
    #[error("typed transaction is not enabled at this fork")]
    TypeNotSupportedAtFork,
    #[error("contract-creation transactions may not carry blobs or an authorization list")]
    CreateWithBlobOrAuthNotAllowed,
    #[error("EIP-7702 transaction must carry at least one authorization tuple")]
    EmptyAuthorizationList,
    #[error("sender nonce mismatch: tx has {tx}, state has {state}")]
    NonceMismatch { tx: u64, state: u64 },
    #[error("sender account has code and is not a valid EIP-7702 delegation")]
    SenderNotEOA,
    #[error("sender balance {balance} insufficient for upfront cost {cost}")]
    InsufficientAccountFunds { balance: U256, cost: U256 },
    #[error("chain id {tx} does not match the configured chain id {expected}")]
    InvalidChainId { tx: u64, expected: u64 },
}

/// Programming-error-grade invariant violations (spec §7 axis 3). These are
/// never expected to surface for a valid input; the caller should treat
/// them as a fatal bug in the engine or its database implementation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InternalError {
    #[error("move_ether invoked with insufficient balance — upstream balance check was skipped")]
    InsufficientBalanceInvariant,
    #[error("snapshot stack underflow: attempted to pop past the base snapshot")]
    SnapshotUnderflow,
    #[error("no active call frame")]
    NoActiveCallFrame,
    #[error("unknown or unselected fork")]
    InvalidFork,
    #[error("database read failed: {0}")]
    Database(String),
    #[error("arithmetic overflow in a context that must not overflow: {0}")]
    Overflow(&'static str),
    #[error("undefined behaviour reached: {0}")]
    Undefined(&'static str),
}

/// Top-level crate error, covering every fallible boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VMError {
    #[error("exceptional halt: {0}")]
    ExceptionalHalt(#[from] ExceptionalHalt),
    #[error("transaction validation failed: {0}")]
    TxValidation(#[from] TxValidationError),
    #[error(transparent)]
    Internal(#[from] InternalError),
    #[error("precompile execution failed: {0}")]
    Precompile(String),
    #[error("block is invalid: {0}")]
    Block(#[from] InvalidBlock),
}

/// Errors a [`crate::db::Database`] implementation may surface. Kept
/// separate from `VMError` so database adapters don't need to depend on the
/// rest of the error taxonomy (spec §6's narrow-interface principle).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DatabaseError {
    #[error("backing store error: {0}")]
    Store(String),
}

impl From<DatabaseError> for VMError {
    fn from(value: DatabaseError) -> Self {
        VMError::Internal(InternalError::Database(value.to_string()))
    }
}

/// Block-level invalidation (spec §7 axis 1): the whole block is rejected
/// and any partially-applied state is rolled back to the pre-block snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidBlock {
    #[error("transaction {index} failed validation: {source}")]
    Transaction {
        index: usize,
        #[source]
        source: TxValidationError,
    },
    #[error("a system transaction reverted or targeted a contract with no code")]
    SystemTransactionFailed,
    #[error("sum of receipt cumulative gas deltas does not equal block gasUsed")]
    GasAccountingMismatch,
    #[error("state contains an account that is both present and fully empty post-EIP-161")]
    StateWithEmptyAccount(Address),
}
