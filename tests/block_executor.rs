//! Block-body execution scenarios: withdrawals, and the pre-/post-block
//! system-call asymmetry (EIP-4788/2935 tolerate failure silently, EIP-7002/
//! 7251 invalidate the block on a revert).

use evm_core::{
    AccountInfo, Address, BlockEnvironment, BlockHashBuffer, Database, DatabaseError,
    GeneralizedDatabase, Fork, H256, InvalidBlock, U256, VMError, Withdrawal, apply_body,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct FixtureChain {
    accounts: Mutex<HashMap<Address, AccountInfo>>,
}

impl Database for FixtureChain {
    fn get_account_info(&self, address: Address) -> Result<AccountInfo, DatabaseError> {
        Ok(self.accounts.lock().unwrap().get(&address).cloned().unwrap_or_default())
    }
    fn account_exists(&self, address: Address) -> Result<bool, DatabaseError> {
        Ok(self.accounts.lock().unwrap().contains_key(&address))
    }
    fn get_storage_slot(&self, _address: Address, _key: H256) -> Result<U256, DatabaseError> {
        Ok(U256::zero())
    }
    fn get_block_hash(&self, _block_number: u64) -> Result<Option<H256>, DatabaseError> {
        Ok(None)
    }
}

fn new_db() -> GeneralizedDatabase {
    GeneralizedDatabase::new(Arc::new(FixtureChain::default()))
}

fn block_env() -> BlockEnvironment {
    BlockEnvironment {
        chain_id: 1,
        block_gas_limit: 30_000_000,
        block_hashes: BlockHashBuffer::default(),
        coinbase: Address::zero(),
        number: 1,
        base_fee_per_gas: Some(U256::from(7)),
        time: 0,
        prev_randao: None,
        difficulty: U256::zero(),
        excess_blob_gas: None,
        parent_beacon_block_root: None,
    }
}

#[test]
fn withdrawal_credits_balance_in_wei_from_gwei() {
    let mut db = new_db();
    let address = Address::from_low_u64_be(42);
    let withdrawals = vec![Withdrawal { index: 0, validator_index: 0, address, amount_gwei: 3 }];

    // Shanghai enables EIP-4895 withdrawals but none of the Prague-era
    // system-call EIPs, so no predeploy code needs to exist for this case.
    let output = apply_body(&mut db, &block_env(), Fork::Shanghai, &[], &withdrawals).unwrap();

    assert_eq!(output.gas_used, 0);
    assert!(output.requests.is_empty());
    let balance = db.get_account(address).unwrap().balance;
    assert_eq!(balance, U256::from(3u64) * U256::from(1_000_000_000u64));
}

#[test]
fn zero_amount_withdrawal_does_not_touch_the_account() {
    let mut db = new_db();
    let address = Address::from_low_u64_be(43);
    let withdrawals = vec![Withdrawal { index: 0, validator_index: 0, address, amount_gwei: 0 }];

    apply_body(&mut db, &block_env(), Fork::Shanghai, &[], &withdrawals).unwrap();

    assert_eq!(db.get_account(address).unwrap().balance, U256::zero());
}

#[test]
fn pre_prague_block_with_no_transactions_or_withdrawals_is_a_no_op() {
    let mut db = new_db();
    let output = apply_body(&mut db, &block_env(), Fork::London, &[], &[]).unwrap();
    assert_eq!(output.gas_used, 0);
    assert!(output.receipts.is_empty());
    assert!(output.requests.is_empty());
}

#[test]
fn reverting_withdrawal_requests_predeploy_invalidates_the_block() {
    let mut db = new_db();
    // PUSH1 0x00 ; PUSH1 0x00 ; REVERT
    let code: Vec<u8> = vec![0x60, 0x00, 0x60, 0x00, 0xFD];
    let predeploy_address = withdrawal_request_predeploy_address();
    db.set_code(predeploy_address, code.into()).unwrap();

    let err = apply_body(&mut db, &block_env(), Fork::Prague, &[], &[]).unwrap_err();
    assert!(matches!(err, VMError::Block(InvalidBlock::SystemTransactionFailed)));
}

/// The EIP-7002 withdrawal-request predeploy address, reconstructed from its
/// well-known hex literal rather than depending on a crate-internal constant.
fn withdrawal_request_predeploy_address() -> Address {
    Address::from_slice(&hex::decode("00000961Ef480Eb55e80D19ad83579A64c007002").unwrap())
}
