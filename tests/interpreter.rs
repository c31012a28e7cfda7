//! Whole-frame interpreter scenarios, driven through `VM::execute` directly
//! (no transaction pipeline, no signatures) — the same level `ethrex_levm`'s
//! own `tests/tests.rs` exercises with its `new_evm_with_bytecode` builder.

use evm_core::{
    Address, BlockEnvironment, BlockHashBuffer, Database, DatabaseError, Environment, Fork, H256,
    GeneralizedDatabase, TransactionEnvironment, U256, VM,
};
use std::sync::Arc;

struct EmptyChain;

impl Database for EmptyChain {
    fn get_account_info(&self, _address: Address) -> Result<evm_core::AccountInfo, DatabaseError> {
        Ok(evm_core::AccountInfo::default())
    }
    fn account_exists(&self, _address: Address) -> Result<bool, DatabaseError> {
        Ok(false)
    }
    fn get_storage_slot(&self, _address: Address, _key: H256) -> Result<U256, DatabaseError> {
        Ok(U256::zero())
    }
    fn get_block_hash(&self, _block_number: u64) -> Result<Option<H256>, DatabaseError> {
        Ok(None)
    }
}

fn new_db() -> GeneralizedDatabase {
    GeneralizedDatabase::new(Arc::new(EmptyChain))
}

fn new_environment(fork: Fork) -> Environment {
    let block_env = BlockEnvironment {
        chain_id: 1,
        block_gas_limit: 30_000_000,
        block_hashes: BlockHashBuffer::default(),
        coinbase: Address::zero(),
        number: 1,
        base_fee_per_gas: None,
        time: 0,
        prev_randao: None,
        difficulty: U256::zero(),
        excess_blob_gas: None,
        parent_beacon_block_root: None,
    };
    let tx_env = TransactionEnvironment { gas: 100_000, ..TransactionEnvironment::default() };
    Environment::new(&block_env, &tx_env, fork)
}

#[test]
fn returns_a_constant_from_memory() {
    // PUSH1 0x2a ; PUSH1 0x00 ; MSTORE ; PUSH1 0x20 ; PUSH1 0x00 ; RETURN
    let code = hex::decode("602a60005260206000f3").unwrap();

    let mut db = new_db();
    let env = new_environment(Fork::Prague);
    let caller = Address::from_low_u64_be(1);
    let to = Address::from_low_u64_be(2);

    let mut vm = VM::new(env, &mut db, Vec::new());
    let outcome = vm
        .execute(caller, Some(to), code.into(), to, bytes::Bytes::new(), U256::zero(), 100_000, false)
        .unwrap();

    assert!(outcome.success);
    let mut expected = [0u8; 32];
    expected[31] = 0x2a;
    assert_eq!(&outcome.output[..], &expected[..]);
}

#[test]
fn stack_underflow_halts_the_frame_without_panicking() {
    // POP with nothing on the stack.
    let code = vec![0x50];

    let mut db = new_db();
    let env = new_environment(Fork::Prague);
    let caller = Address::from_low_u64_be(1);
    let to = Address::from_low_u64_be(2);

    let mut vm = VM::new(env, &mut db, Vec::new());
    let outcome = vm
        .execute(caller, Some(to), code.into(), to, bytes::Bytes::new(), U256::zero(), 100_000, false)
        .unwrap();

    assert!(!outcome.success);
    assert!(outcome.output.is_empty());
}

#[test]
fn out_of_gas_halts_rather_than_underflowing_gas_remaining() {
    // PUSH1 0x01 ; PUSH1 0x01 ; ADD, with only 1 gas available.
    let code = hex::decode("6001600101").unwrap();

    let mut db = new_db();
    let env = new_environment(Fork::Prague);
    let caller = Address::from_low_u64_be(1);
    let to = Address::from_low_u64_be(2);

    let mut vm = VM::new(env, &mut db, Vec::new());
    let outcome = vm
        .execute(caller, Some(to), code.into(), to, bytes::Bytes::new(), U256::zero(), 1, false)
        .unwrap();

    assert!(!outcome.success);
}

#[test]
fn revert_preserves_output_and_is_not_success() {
    // PUSH1 0x2a ; PUSH1 0x00 ; MSTORE ; PUSH1 0x20 ; PUSH1 0x00 ; REVERT
    let code = hex::decode("602a60005260206000fd").unwrap();

    let mut db = new_db();
    let env = new_environment(Fork::Prague);
    let caller = Address::from_low_u64_be(1);
    let to = Address::from_low_u64_be(2);

    let mut vm = VM::new(env, &mut db, Vec::new());
    let outcome = vm
        .execute(caller, Some(to), code.into(), to, bytes::Bytes::new(), U256::zero(), 100_000, false)
        .unwrap();

    assert!(!outcome.success);
    let mut expected = [0u8; 32];
    expected[31] = 0x2a;
    assert_eq!(&outcome.output[..], &expected[..]);
}

#[test]
fn eip3155_tracer_records_one_line_per_instruction() {
    let code = hex::decode("6001600101").unwrap(); // PUSH1 1; PUSH1 1; ADD

    let mut db = new_db();
    let env = new_environment(Fork::Prague);
    let caller = Address::from_low_u64_be(1);
    let to = Address::from_low_u64_be(2);

    let mut vm = VM::new(env, &mut db, Vec::new());
    vm.tracer = Some(Box::new(evm_core::Eip3155Tracer::new()));
    let outcome =
        vm.execute(caller, Some(to), code.into(), to, bytes::Bytes::new(), U256::zero(), 100_000, false).unwrap();
    assert!(outcome.success);
}
