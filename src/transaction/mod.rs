//! Transaction pipeline (spec §4.7): the five EIP-2718 transaction types,
//! structural and contextual validation, and `process_transaction`, which
//! drives one transaction through the interpreter and produces its receipt.

pub mod process;
pub mod receipt;
pub mod recover;
pub mod types;
pub mod validate;

pub use process::process_transaction;
pub use receipt::{Bloom, Receipt};
pub use types::{AccessListEntry, AuthorizationTuple, RecoveredAuthorization, Transaction, TxType};
pub use validate::{CheckedTransaction, check_transaction, validate_transaction};
