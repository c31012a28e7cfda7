//! `CREATE`/`CREATE2`, the `*CALL*` family, and `SELFDESTRUCT` (spec §4.5).
//! The only opcodes that recurse into [`VM::run_current_frame`]: each pushes
//! a child [`CallFrame`], opens a paired `Substate`/database checkpoint, and
//! incorporates the child's [`crate::vm::FrameOutcome`] into the parent
//! frame's stack, memory and gas before returning `OpcodeResult::Continue`.

use super::OpcodeResult;
use crate::call_frame::CallFrame;
use crate::constants::MAX_INIT_CODE_SIZE;
use crate::errors::{ExceptionalHalt, VMError};
use crate::fork::eips;
use crate::gas_cost;
use crate::precompiles;
use crate::primitives::{Address, U256, word_to_address};
use crate::vm::VM;
use bytes::Bytes;
use sha3::{Digest, Keccak256};

fn to_usize(value: U256) -> Result<usize, VMError> {
    value
        .try_into()
        .map_err(|_| VMError::from(ExceptionalHalt::OutOfBoundsRead))
}

// -- CALL family ----------------------------------------------------------

pub fn op_call(vm: &mut VM) -> Result<OpcodeResult, VMError> {
    let gas = vm.pop()?;
    let to = word_to_address(vm.pop()?);
    let value = vm.pop()?;
    let args_offset = to_usize(vm.pop()?)?;
    let args_size = to_usize(vm.pop()?)?;
    let ret_offset = to_usize(vm.pop()?)?;
    let ret_size = to_usize(vm.pop()?)?;

    let is_static = vm.ctx()?.is_static;
    if is_static && !value.is_zero() {
        return Err(ExceptionalHalt::WriteInStaticContext.into());
    }
    let caller = vm.ctx()?.to;

    dispatch_call(
        vm, gas, to, to, caller, value, true, args_offset, args_size, ret_offset, ret_size,
        is_static,
    )
}

/// `CALLCODE`: runs the target's code with the *current* account as both
/// `to` and the value-transfer recipient, so the transfer is always a
/// same-address no-op that only requires `balance >= value`.
pub fn op_callcode(vm: &mut VM) -> Result<OpcodeResult, VMError> {
    let gas = vm.pop()?;
    let code_address = word_to_address(vm.pop()?);
    let value = vm.pop()?;
    let args_offset = to_usize(vm.pop()?)?;
    let args_size = to_usize(vm.pop()?)?;
    let ret_offset = to_usize(vm.pop()?)?;
    let ret_size = to_usize(vm.pop()?)?;

    let is_static = vm.ctx()?.is_static;
    let current = vm.ctx()?.to;

    dispatch_call(
        vm,
        gas,
        code_address,
        current,
        current,
        value,
        true,
        args_offset,
        args_size,
        ret_offset,
        ret_size,
        is_static,
    )
}

/// `DELEGATECALL`: no value popped, no transfer; `caller`/`value` are
/// inherited from the *current* frame's context rather than set anew.
pub fn op_delegatecall(vm: &mut VM) -> Result<OpcodeResult, VMError> {
    let gas = vm.pop()?;
    let code_address = word_to_address(vm.pop()?);
    let args_offset = to_usize(vm.pop()?)?;
    let args_size = to_usize(vm.pop()?)?;
    let ret_offset = to_usize(vm.pop()?)?;
    let ret_size = to_usize(vm.pop()?)?;

    let ctx = vm.ctx()?;
    let is_static = ctx.is_static;
    let current = ctx.to;
    let original_caller = ctx.caller;
    let original_value = ctx.value;

    dispatch_call(
        vm,
        gas,
        code_address,
        current,
        original_caller,
        original_value,
        false,
        args_offset,
        args_size,
        ret_offset,
        ret_size,
        is_static,
    )
}

/// `STATICCALL`: no value popped, forces `is_static = true` for the child
/// regardless of the current frame's own staticness.
pub fn op_staticcall(vm: &mut VM) -> Result<OpcodeResult, VMError> {
    let gas = vm.pop()?;
    let code_address = word_to_address(vm.pop()?);
    let args_offset = to_usize(vm.pop()?)?;
    let args_size = to_usize(vm.pop()?)?;
    let ret_offset = to_usize(vm.pop()?)?;
    let ret_size = to_usize(vm.pop()?)?;
    let caller = vm.ctx()?.to;

    dispatch_call(
        vm,
        gas,
        code_address,
        code_address,
        caller,
        U256::zero(),
        false,
        args_offset,
        args_size,
        ret_offset,
        ret_size,
        true,
    )
}

/// Shared `*CALL*` machinery (spec §4.5): gas accounting (cold/warm, value
/// surcharge, EIP-161 new-account surcharge, EIP-150 63/64ths forwarding),
/// precompile dispatch, and child-frame incorporation.
#[allow(clippy::too_many_arguments)]
fn dispatch_call(
    vm: &mut VM,
    gas_requested: U256,
    code_address: Address,
    frame_to: Address,
    frame_caller: Address,
    value: U256,
    should_transfer_value: bool,
    args_offset: usize,
    args_size: usize,
    ret_offset: usize,
    ret_size: usize,
    is_static: bool,
) -> Result<OpcodeResult, VMError> {
    vm.charge_account_access(code_address)?;

    let transferring_value = should_transfer_value && !value.is_zero();
    if transferring_value {
        vm.charge(gas_cost::CALL_VALUE)?;
    }

    let fork = vm.env.config.fork;
    let callee_exists = vm.db.account_exists(code_address)?;
    let new_account_surcharge = if fork.eip(eips::EIP_161) {
        transferring_value && !callee_exists
    } else {
        !callee_exists
    };
    if new_account_surcharge {
        vm.charge(gas_cost::NEW_ACCOUNT)?;
    }

    vm.expand_memory(&[(args_offset, args_size), (ret_offset, ret_size)])?;

    // Depth limit and insufficient balance fail the *call* (push 0), not the
    // frame executing it — unlike every other check above, which charges gas
    // regardless of whether the call ends up running.
    if vm.depth() >= crate::constants::STACK_DEPTH_LIMIT {
        vm.push(U256::zero())?;
        return Ok(OpcodeResult::Continue);
    }
    if transferring_value {
        let sender_balance = vm.db.get_account(vm.ctx()?.to)?.balance;
        if sender_balance < value {
            vm.push(U256::zero())?;
            return Ok(OpcodeResult::Continue);
        }
    }

    let gas_left = vm.gas_remaining()?;
    let requested: u64 = gas_requested.try_into().unwrap_or(u64::MAX);
    let mut forwarded = gas_cost::call_gas_forwarding(requested, gas_left);
    vm.charge(forwarded)?;
    if transferring_value {
        forwarded = forwarded.saturating_add(gas_cost::CALL_STIPEND);
    }

    let args = vm.current_call_frame_mut()?.memory.load_range(args_offset, args_size);

    vm.db.begin_transaction();
    if transferring_value {
        vm.db.move_ether(vm.ctx()?.to, frame_to, value)?;
    }

    let (success, gas_used, output) = if precompiles::is_precompile(code_address, fork) {
        match precompiles::execute(code_address, &args, forwarded, fork, vm.kzg_verifier.as_ref()) {
            Ok((used, out)) => (true, used, out),
            Err(_) => (false, forwarded, Bytes::new()),
        }
    } else {
        let code = vm.db.get_account(code_address)?.code;
        vm.substate.push_backup();
        let child = CallFrame::new(
            frame_caller,
            frame_to,
            code_address,
            code,
            value,
            args.clone(),
            is_static,
            forwarded,
            vm.depth(),
            should_transfer_value,
            false,
        );
        vm.call_frames.push(child);
        let outcome = vm.run_current_frame()?;
        if outcome.success {
            vm.substate.commit_backup()?;
        } else {
            vm.substate.revert_backup()?;
        }
        (outcome.success, outcome.gas_used, outcome.output)
    };

    if success {
        vm.db.commit_transaction()?;
    } else {
        vm.db.rollback_transaction()?;
    }

    let refund = forwarded.saturating_sub(gas_used);
    vm.current_call_frame_mut()?.refund_gas(refund);
    write_return_data(vm, ret_offset, ret_size, &output)?;
    vm.push(if success { U256::one() } else { U256::zero() })?;
    Ok(OpcodeResult::Continue)
}

/// Copy up to `ret_size` bytes of `output` into memory at `ret_offset`
/// (shorter output leaves the rest of that range untouched) and stash the
/// *full* output as `RETURNDATASIZE`/`RETURNDATACOPY` state (spec §4.5).
fn write_return_data(
    vm: &mut VM,
    ret_offset: usize,
    ret_size: usize,
    output: &[u8],
) -> Result<(), VMError> {
    let n = output.len().min(ret_size);
    if n > 0 {
        #[allow(clippy::indexing_slicing)]
        let slice = &output[..n];
        vm.current_call_frame_mut()?.memory.store_range(ret_offset, slice);
    }
    vm.current_call_frame_mut()?.return_data = Bytes::copy_from_slice(output);
    Ok(())
}

// -- CREATE family ----------------------------------------------------------

pub fn op_create(vm: &mut VM) -> Result<OpcodeResult, VMError> {
    let value = vm.pop()?;
    let offset = to_usize(vm.pop()?)?;
    let size = to_usize(vm.pop()?)?;
    create_common(vm, value, offset, size, None)
}

pub fn op_create2(vm: &mut VM) -> Result<OpcodeResult, VMError> {
    let value = vm.pop()?;
    let offset = to_usize(vm.pop()?)?;
    let size = to_usize(vm.pop()?)?;
    let salt = vm.pop()?;
    create_common(vm, value, offset, size, Some(salt))
}

/// Shared `CREATE`/`CREATE2` machinery (spec §4.5): address derivation,
/// EIP-170/3541/3860 validation, the code-deposit gas charge, and
/// child-frame incorporation.
fn create_common(
    vm: &mut VM,
    value: U256,
    offset: usize,
    size: usize,
    salt: Option<U256>,
) -> Result<OpcodeResult, VMError> {
    if vm.ctx()?.is_static {
        return Err(ExceptionalHalt::WriteInStaticContext.into());
    }

    vm.charge(gas_cost::CREATE)?;
    let fork = vm.env.config.fork;
    if fork.eip(eips::EIP_3860) {
        if size > MAX_INIT_CODE_SIZE {
            return Err(ExceptionalHalt::InvalidParameter.into());
        }
        vm.charge(gas_cost::init_code_cost(size))?;
    }
    if salt.is_some() {
        vm.charge(gas_cost::keccak256_cost(size))?;
    }
    vm.expand_memory(&[(offset, size)])?;
    let init_code = vm.current_call_frame_mut()?.memory.load_range(offset, size);

    if vm.depth() >= crate::constants::STACK_DEPTH_LIMIT {
        vm.push(U256::zero())?;
        return Ok(OpcodeResult::Continue);
    }

    let sender = vm.ctx()?.to;
    let sender_info = vm.db.get_account(sender)?;
    if sender_info.balance < value {
        vm.push(U256::zero())?;
        return Ok(OpcodeResult::Continue);
    }
    let sender_nonce = sender_info.nonce;
    if sender_nonce == u64::MAX {
        vm.push(U256::zero())?;
        return Ok(OpcodeResult::Continue);
    }
    vm.db.increment_nonce(sender)?;

    let new_address = match salt {
        Some(salt) => create2_address(sender, salt, &init_code),
        None => create1_address(sender, sender_nonce),
    };

    if vm.db.account_has_code_or_nonce(new_address)? || vm.db.account_has_storage(new_address)? {
        vm.push(U256::zero())?;
        return Ok(OpcodeResult::Continue);
    }
    vm.substate.touch(new_address);
    vm.access_address(new_address);

    let gas_left = vm.gas_remaining()?;
    let forwarded = gas_left.saturating_sub(gas_left / 64);
    vm.charge(forwarded)?;

    vm.db.begin_transaction();
    vm.substate.push_backup();
    vm.initialize_created_account(new_address)?;
    if !value.is_zero() {
        vm.db.move_ether(sender, new_address, value)?;
    }

    let child = CallFrame::new(
        sender,
        new_address,
        new_address,
        init_code.clone(),
        value,
        Bytes::new(),
        false,
        forwarded,
        vm.depth(),
        true,
        true,
    );
    vm.call_frames.push(child);
    let outcome = vm.run_current_frame()?;

    let deployed_ok = outcome.success && vm.validate_deployed_code(&outcome.output).is_ok();
    let deposit_cost = if deployed_ok {
        gas_cost::CODE_DEPOSIT_PER_BYTE
            .saturating_mul(u64::try_from(outcome.output.len()).unwrap_or(u64::MAX))
    } else {
        0
    };
    let child_gas_remaining = forwarded.saturating_sub(outcome.gas_used);
    let final_success = deployed_ok && deposit_cost <= child_gas_remaining;

    if final_success {
        vm.db.set_code(new_address, outcome.output.clone())?;
        vm.substate.commit_backup()?;
        vm.db.commit_transaction()?;
        let refund = child_gas_remaining.saturating_sub(deposit_cost);
        vm.current_call_frame_mut()?.refund_gas(refund);
        vm.current_call_frame_mut()?.return_data = Bytes::new();
        vm.push(U256::from_big_endian(new_address.as_bytes()))?;
    } else {
        vm.substate.revert_backup()?;
        vm.db.rollback_transaction()?;
        if outcome.success {
            // Deployed code violated EIP-170/3541, or the init code returned
            // with less gas than the deposit cost: all forwarded gas is
            // consumed, matching post-Homestead creation-failure semantics.
            vm.current_call_frame_mut()?.return_data = Bytes::new();
        } else {
            vm.current_call_frame_mut()?.refund_gas(child_gas_remaining);
            vm.current_call_frame_mut()?.return_data = outcome.output.clone();
        }
        vm.push(U256::zero())?;
    }
    Ok(OpcodeResult::Continue)
}

/// `CREATE`'s address: `keccak256(rlp([sender, nonce]))[12..]`. A minimal,
/// single-purpose RLP encoding of exactly this two-item list — general RLP
/// encoding/decoding is out of scope, but deriving a contract address is an
/// EVM-internal concern the interpreter cannot delegate away.
pub(crate) fn create1_address(sender: Address, nonce: u64) -> Address {
    let mut payload = Vec::with_capacity(22 + 9);
    payload.push(0x80 + 20); // RLP string header: addresses are always 20 bytes
    payload.extend_from_slice(sender.as_bytes());
    append_rlp_u64(&mut payload, nonce);

    let mut encoded = Vec::with_capacity(payload.len() + 1);
    // payload.len() <= 21 + 9 = 30, always fits in a short RLP list header.
    encoded.push(0xc0 + u8::try_from(payload.len()).unwrap_or(0));
    encoded.extend_from_slice(&payload);

    let hash = Keccak256::digest(&encoded);
    #[allow(clippy::indexing_slicing)]
    Address::from_slice(&hash[12..])
}

fn append_rlp_u64(buf: &mut Vec<u8>, value: u64) {
    if value == 0 {
        buf.push(0x80);
        return;
    }
    if value < 0x80 {
        buf.push(u8::try_from(value).unwrap_or(0));
        return;
    }
    let bytes = value.to_be_bytes();
    let first_nonzero = bytes.iter().position(|b| *b != 0).unwrap_or(7);
    #[allow(clippy::indexing_slicing)]
    let trimmed = &bytes[first_nonzero..];
    buf.push(0x80 + u8::try_from(trimmed.len()).unwrap_or(8));
    buf.extend_from_slice(trimmed);
}

/// `CREATE2`'s address: `keccak256(0xff ++ sender ++ salt ++ keccak256(init_code))[12..]`.
fn create2_address(sender: Address, salt: U256, init_code: &[u8]) -> Address {
    let init_code_hash = Keccak256::digest(init_code);
    let mut preimage = Vec::with_capacity(1 + 20 + 32 + 32);
    preimage.push(0xffu8);
    preimage.extend_from_slice(sender.as_bytes());
    let mut salt_bytes = [0u8; 32];
    salt.to_big_endian(&mut salt_bytes);
    preimage.extend_from_slice(&salt_bytes);
    preimage.extend_from_slice(&init_code_hash);

    let hash = Keccak256::digest(&preimage);
    #[allow(clippy::indexing_slicing)]
    Address::from_slice(&hash[12..])
}

// -- SELFDESTRUCT -------------------------------------------------------

/// `SELFDESTRUCT` (spec §4.5, EIP-6780, EIP-3529): transfers the account's
/// balance to `beneficiary` and, only if the account was created earlier in
/// the *same* transaction (EIP-6780), deletes it. Always halts the frame.
pub fn op_selfdestruct(vm: &mut VM) -> Result<OpcodeResult, VMError> {
    if vm.ctx()?.is_static {
        return Err(ExceptionalHalt::WriteInStaticContext.into());
    }
    let beneficiary = word_to_address(vm.pop()?);
    let fork = vm.env.config.fork;

    vm.charge(gas_cost::SELFDESTRUCT)?;
    let was_warm = vm.access_address(beneficiary);
    if fork.eip(eips::EIP_2929) && !was_warm {
        vm.charge(gas_cost::SELFDESTRUCT_COLD)?;
    }

    let current = vm.ctx()?.to;
    let balance = vm.db.get_account(current)?.balance;
    let beneficiary_exists = vm.db.account_exists(beneficiary)?;
    if !balance.is_zero() && (!fork.eip(eips::EIP_161) || !beneficiary_exists) {
        vm.charge(gas_cost::NEW_ACCOUNT)?;
    }

    if !balance.is_zero() {
        vm.db.move_ether(current, beneficiary, balance)?;
    }
    vm.substate.touch(beneficiary);
    vm.substate.touch(current);

    let created_this_tx = vm.db.was_created_this_transaction(current);
    if !fork.eip(eips::EIP_6780) || created_this_tx {
        vm.db.destroy_account(current)?;
        vm.substate.add_selfdestruct(current);
        if !fork.eip(eips::EIP_3529) {
            vm.substate.add_refund(
                i64::try_from(gas_cost::SELFDESTRUCT_REFUND_PRE_LONDON).unwrap_or(i64::MAX),
            );
        }
    }

    Ok(OpcodeResult::Return(Bytes::new()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create1_address_is_deterministic_and_depends_on_nonce() {
        let sender = Address::from_low_u64_be(0x1234);
        let a = create1_address(sender, 0);
        let b = create1_address(sender, 1);
        assert_ne!(a, b);
        assert_eq!(a, create1_address(sender, 0));
    }

    #[test]
    fn create2_address_depends_on_salt_and_init_code() {
        let sender = Address::from_low_u64_be(0x1234);
        let code_a = [0x60, 0x00];
        let code_b = [0x60, 0x01];
        let a = create2_address(sender, U256::from(1), &code_a);
        let b = create2_address(sender, U256::from(2), &code_a);
        let c = create2_address(sender, U256::from(1), &code_b);
        assert_ne!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn append_rlp_u64_matches_known_encodings() {
        let mut buf = Vec::new();
        append_rlp_u64(&mut buf, 0);
        assert_eq!(buf, vec![0x80]);

        let mut buf = Vec::new();
        append_rlp_u64(&mut buf, 127);
        assert_eq!(buf, vec![0x7f]);

        let mut buf = Vec::new();
        append_rlp_u64(&mut buf, 128);
        assert_eq!(buf, vec![0x81, 0x80]);
    }
}
