//! Transaction-level side-effect hooks (SPEC_FULL.md §4). `VM::execute` only
//! drives the interpreter for one message; everything a full transaction
//! needs around it — upfront gas/value debit, EIP-7702 authorization
//! application, refund payout, priority-fee distribution — is driven by a
//! `Vec<Rc<RefCell<dyn Hook>>>` rather than hardcoded into `execute` itself,
//! mirroring `ethrex_levm::hooks`. Only [`DefaultHook`] (L1 mainnet
//! semantics) is implemented here; the seam exists so an embedder can swap in
//! a different fee policy without forking `transaction::process`.

use crate::errors::{InternalError, VMError};
use crate::fork::eips;
use crate::primitives::{Address, U256};
use crate::vm::{FrameOutcome, VM};

/// One phase of a transaction's surrounding bookkeeping, run by
/// [`crate::transaction::process::process_transaction`] immediately before
/// and after the interpreter runs the root call frame.
pub trait Hook {
    /// Runs before the root call frame is pushed: nonce increment, upfront
    /// gas/value debit, substate prewarming, EIP-7702 authorization
    /// application.
    fn prepare_execution(&mut self, vm: &mut VM) -> Result<(), VMError>;

    /// Runs after the interpreter returns: gas refund, unused-gas credit,
    /// priority-fee payment to the coinbase.
    fn finalize_execution(&mut self, vm: &mut VM, outcome: &FrameOutcome) -> Result<(), VMError>;
}

/// L1 mainnet transaction bookkeeping (spec §4.7 `process_transaction`).
pub struct DefaultHook {
    pub sender: Address,
    pub to: Option<Address>,
    pub coinbase: Address,
    pub effective_gas_price: U256,
    pub priority_fee_per_gas: U256,
    pub gas_limit: u64,
    pub value: U256,
    pub blob_fee: U256,
    pub access_list: Vec<(Address, Vec<crate::primitives::H256>)>,
    pub authorizations: Vec<crate::transaction::types::RecoveredAuthorization>,
}

impl Hook for DefaultHook {
    fn prepare_execution(&mut self, vm: &mut VM) -> Result<(), VMError> {
        let fork = vm.env.config.fork;

        vm.db.increment_nonce(self.sender)?;

        let upfront_cost = self
            .effective_gas_price
            .saturating_mul(U256::from(self.gas_limit))
            .saturating_add(self.value)
            .saturating_add(self.blob_fee);
        let mut sender_info = vm.db.get_account(self.sender)?;
        sender_info.balance = sender_info.balance.saturating_sub(upfront_cost);
        vm.db.set_account(self.sender, sender_info)?;

        let coinbase = fork.eip(eips::EIP_3651).then_some(self.coinbase);
        vm.substate
            .prewarm(self.sender, self.to, coinbase, &self.access_list);
        for number in 1..=17u64 {
            let address = precompile_address(number);
            if crate::precompiles::is_precompile(address, fork) {
                vm.substate.add_accessed_address(address);
            }
        }

        for auth in std::mem::take(&mut self.authorizations) {
            apply_authorization(vm, &auth)?;
        }

        Ok(())
    }

    fn finalize_execution(&mut self, vm: &mut VM, outcome: &FrameOutcome) -> Result<(), VMError> {
        let fork = vm.env.config.fork;
        let gas_used = outcome.gas_used;
        let divisor = crate::gas_cost::refund_divisor(fork);
        let refund = vm.substate.capped_refund(gas_used, divisor);
        let gas_unused = self.gas_limit.saturating_sub(gas_used);
        let total_gas_returned = gas_unused.saturating_add(refund);

        let mut sender_info = vm.db.get_account(self.sender)?;
        let reimbursement = self
            .effective_gas_price
            .saturating_mul(U256::from(total_gas_returned));
        sender_info.balance = sender_info
            .balance
            .checked_add(reimbursement)
            .ok_or(InternalError::Overflow("gas reimbursement credit"))?;
        vm.db.set_account(self.sender, sender_info)?;

        let gas_actually_spent = self.gas_limit.saturating_sub(total_gas_returned);
        let coinbase_fee = self
            .priority_fee_per_gas
            .saturating_mul(U256::from(gas_actually_spent));
        if !coinbase_fee.is_zero() {
            let mut coinbase_info = vm.db.get_account(self.coinbase)?;
            coinbase_info.balance = coinbase_info
                .balance
                .checked_add(coinbase_fee)
                .ok_or(InternalError::Overflow("coinbase fee credit"))?;
            vm.db.set_account(self.coinbase, coinbase_info)?;
            vm.substate.touch(self.coinbase);
        }

        Ok(())
    }
}

fn precompile_address(number: u64) -> Address {
    let mut bytes = [0u8; 20];
    #[allow(clippy::indexing_slicing)]
    {
        bytes[19] = u8::try_from(number).unwrap_or(0);
    }
    Address::from_slice(&bytes)
}

/// EIP-7702: delegate `auth.authority`'s code to `0xEF0100‖auth.address`,
/// incrementing its nonce. Authorizations that fail validation (wrong chain
/// id, unrecoverable authority, or a stale nonce/non-delegatable account)
/// are simply skipped with no effect and no refund — only a successfully
/// applied authorization against a pre-existing account refunds anything
/// (spec §4.7).
/// `validate_transaction` already rejects a `SetCode`-typed transaction at
/// forks before EIP-7702 is active, so by the time this runs the fork is
/// never in question — no per-authorization fork check needed here.
fn apply_authorization(
    vm: &mut VM,
    auth: &crate::transaction::types::RecoveredAuthorization,
) -> Result<(), VMError> {
    const PER_EMPTY_ACCOUNT_COST: i64 = 25_000;
    const PER_AUTH_BASE_COST: i64 = 12_500;

    if auth.chain_id != 0 && auth.chain_id != vm.env.chain_id {
        return Ok(());
    }

    let Some(authority) = auth.authority else {
        return Ok(());
    };

    let authority_info = vm.db.get_account(authority)?;
    let is_delegation_or_empty =
        authority_info.code.is_empty() || authority_info.delegated_address().is_some();
    if !is_delegation_or_empty || authority_info.nonce != auth.nonce {
        return Ok(());
    }

    let account_existed = !authority_info.is_empty();
    vm.db.increment_nonce(authority)?;

    let mut delegated_code = Vec::with_capacity(crate::constants::EOA_DELEGATED_CODE_LEN);
    delegated_code.extend_from_slice(&crate::constants::EOA_DELEGATION_PREFIX);
    delegated_code.extend_from_slice(auth.address.as_bytes());
    vm.db.set_code(authority, bytes::Bytes::from(delegated_code))?;
    vm.substate.touch(authority);

    if account_existed {
        vm.substate.add_refund(PER_EMPTY_ACCOUNT_COST - PER_AUTH_BASE_COST);
    }
    Ok(())
}
