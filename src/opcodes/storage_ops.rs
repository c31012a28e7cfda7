//! Storage opcodes (spec §4.5): `SLOAD`/`SSTORE` (EIP-2929/2200/3529) and
//! `TLOAD`/`TSTORE` (EIP-1153 transient storage).

use super::OpcodeResult;
use crate::errors::{ExceptionalHalt, VMError};
use crate::gas_cost;
use crate::primitives::H256;
use crate::vm::VM;

fn word_to_key(value: crate::primitives::U256) -> H256 {
    let mut bytes = [0u8; 32];
    value.to_big_endian(&mut bytes);
    H256::from(bytes)
}

pub fn op_sload(vm: &mut VM) -> Result<OpcodeResult, VMError> {
    let key = word_to_key(vm.pop()?);
    let address = vm.ctx()?.to;
    let fork = vm.env.config.fork;
    let warm = vm.access_storage_slot(address, key);
    vm.charge(gas_cost::sload_cost(fork, warm))?;
    let value = vm.db.get_storage(address, key)?;
    vm.push(value)?;
    Ok(OpcodeResult::Continue)
}

pub fn op_sstore(vm: &mut VM) -> Result<OpcodeResult, VMError> {
    if vm.ctx()?.is_static {
        return Err(ExceptionalHalt::WriteInStaticContext.into());
    }
    let fork = vm.env.config.fork;

    // EIP-2200/EIP-1706: less than the call stipend remaining forbids SSTORE
    // entirely, independent of the slot's own cost.
    if fork.eip(crate::fork::eips::EIP_2200) && vm.gas_remaining()? <= gas_cost::CALL_STIPEND {
        return Err(ExceptionalHalt::OutOfGas.into());
    }

    let key = word_to_key(vm.pop()?);
    let new_value = vm.pop()?;
    let address = vm.ctx()?.to;

    let warm = vm.access_storage_slot(address, key);
    let current = vm.db.get_storage(address, key)?;
    let original = vm.original_storage_value(address, key)?;

    let (cost, refund_delta) = gas_cost::sstore_cost(fork, original, current, new_value, warm)?;
    vm.charge(cost)?;
    if refund_delta != 0 {
        vm.substate.add_refund(refund_delta);
    }
    vm.db.set_storage(address, key, new_value)?;
    Ok(OpcodeResult::Continue)
}

pub fn op_tload(vm: &mut VM) -> Result<OpcodeResult, VMError> {
    vm.charge(gas_cost::WARM_ACCESS)?;
    let key = word_to_key(vm.pop()?);
    let address = vm.ctx()?.to;
    let value = vm.db.get_transient(address, key);
    vm.push(value)?;
    Ok(OpcodeResult::Continue)
}

pub fn op_tstore(vm: &mut VM) -> Result<OpcodeResult, VMError> {
    if vm.ctx()?.is_static {
        return Err(ExceptionalHalt::WriteInStaticContext.into());
    }
    vm.charge(gas_cost::WARM_ACCESS)?;
    let key = word_to_key(vm.pop()?);
    let value = vm.pop()?;
    let address = vm.ctx()?.to;
    vm.db.set_transient(address, key, value);
    Ok(OpcodeResult::Continue)
}
