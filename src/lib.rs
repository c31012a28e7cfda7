//! An Ethereum Virtual Machine execution core: bytecode interpreter, gas
//! metering, nested message calls, journaled world state, the
//! transaction-level validator/processor, and a block-body executor,
//! covering every hard fork from Frontier through the provisional Osaka
//! configuration.
//!
//! What this crate is NOT: it does not decode RLP, build or verify Merkle
//! Patricia Tries, hash with Keccak/SHA-256 at the state-root layer, or
//! implement secp256k1/BN254/BLS12-381/KZG from scratch — those cross a
//! narrow interface ([`db::Database`], the signature-recovery and
//! pairing-check call sites) that an embedder supplies. It has no
//! networking, consensus, JSON-RPC, or mempool.

mod account;
mod block;
mod call_frame;
mod constants;
mod db;
mod environment;
mod errors;
mod fork;
mod gas_cost;
mod hooks;
mod memory;
mod opcodes;
mod precompiles;
mod primitives;
mod trace;
mod transaction;
mod vm;

pub use account::AccountInfo;
pub use block::{BlockOutput, Withdrawal, apply_body};
pub use constants::{MAX_CODE_SIZE, MAX_INIT_CODE_SIZE, STACK_DEPTH_LIMIT};
pub use db::{CacheBackup, Database, GeneralizedDatabase};
pub use environment::{BlockEnvironment, BlockHashBuffer, EVMConfig, Environment, TransactionEnvironment};
pub use errors::{DatabaseError, ExceptionalHalt, InternalError, InvalidBlock, TxValidationError, VMError};
pub use fork::{Fork, eips};
pub use hooks::{DefaultHook, Hook};
pub use precompiles::{KzgVerifier, UnconfiguredVerifier};
pub use primitives::{Address, H256, U256, U256Ext};
pub use trace::{Eip3155Tracer, OpContext, VMTracer};
pub use transaction::{
    AccessListEntry, AuthorizationTuple, Bloom, CheckedTransaction, Receipt, RecoveredAuthorization,
    Transaction, TxType, check_transaction, process_transaction, validate_transaction,
};
pub use vm::{FrameOutcome, Log, Substate, VM};
