//! Control-flow opcodes (spec §4.5): `STOP`, `JUMP`/`JUMPI`, `PC`, `GAS`,
//! `JUMPDEST`, `RETURN`, `REVERT`, `INVALID`.

use super::OpcodeResult;
use crate::errors::{ExceptionalHalt, VMError};
use crate::gas_cost;
use crate::primitives::U256;
use crate::vm::VM;

pub fn op_stop(_vm: &mut VM) -> Result<OpcodeResult, VMError> {
    Ok(OpcodeResult::Return(bytes::Bytes::new()))
}

fn jump_target(vm: &VM, destination: U256) -> Result<usize, VMError> {
    let destination: usize = destination
        .try_into()
        .map_err(|_| VMError::from(ExceptionalHalt::InvalidJumpDest))?;
    if !vm.current_call_frame()?.is_valid_jump_destination(destination) {
        return Err(ExceptionalHalt::InvalidJumpDest.into());
    }
    Ok(destination)
}

pub fn op_jump(vm: &mut VM) -> Result<OpcodeResult, VMError> {
    vm.charge(gas_cost::MID)?;
    let destination = vm.pop()?;
    let target = jump_target(vm, destination)?;
    vm.current_call_frame_mut()?.pc = target;
    Ok(OpcodeResult::Continue)
}

pub fn op_jumpi(vm: &mut VM) -> Result<OpcodeResult, VMError> {
    vm.charge(gas_cost::HIGH)?;
    let destination = vm.pop()?;
    let condition = vm.pop()?;
    if condition.is_zero() {
        let frame = vm.current_call_frame_mut()?;
        frame.pc = frame.pc.saturating_add(1);
        return Ok(OpcodeResult::Continue);
    }
    let target = jump_target(vm, destination)?;
    vm.current_call_frame_mut()?.pc = target;
    Ok(OpcodeResult::Continue)
}

pub fn op_pc(vm: &mut VM) -> Result<OpcodeResult, VMError> {
    vm.charge(gas_cost::BASE)?;
    let pc = vm.current_call_frame()?.pc;
    vm.push(U256::from(pc))?;
    Ok(OpcodeResult::Continue)
}

pub fn op_gas(vm: &mut VM) -> Result<OpcodeResult, VMError> {
    vm.charge(gas_cost::BASE)?;
    // Charged before reading so the reported value matches what the
    // contract actually has left to spend (spec §4.5 `GAS`).
    let remaining = vm.gas_remaining()?;
    vm.push(U256::from(remaining))?;
    Ok(OpcodeResult::Continue)
}

pub fn op_jumpdest(vm: &mut VM) -> Result<OpcodeResult, VMError> {
    vm.charge(gas_cost::JUMPDEST)?;
    Ok(OpcodeResult::Continue)
}

pub fn op_return(vm: &mut VM) -> Result<OpcodeResult, VMError> {
    let offset: usize = vm
        .pop()?
        .try_into()
        .map_err(|_| VMError::from(ExceptionalHalt::OutOfBoundsRead))?;
    let size: usize = vm
        .pop()?
        .try_into()
        .map_err(|_| VMError::from(ExceptionalHalt::OutOfBoundsRead))?;
    vm.expand_memory(&[(offset, size)])?;
    let data = vm.current_call_frame_mut()?.memory.load_range(offset, size);
    Ok(OpcodeResult::Return(data))
}

pub fn op_revert(vm: &mut VM) -> Result<OpcodeResult, VMError> {
    let offset: usize = vm
        .pop()?
        .try_into()
        .map_err(|_| VMError::from(ExceptionalHalt::OutOfBoundsRead))?;
    let size: usize = vm
        .pop()?
        .try_into()
        .map_err(|_| VMError::from(ExceptionalHalt::OutOfBoundsRead))?;
    vm.expand_memory(&[(offset, size)])?;
    let data = vm.current_call_frame_mut()?.memory.load_range(offset, size);
    Ok(OpcodeResult::Revert(data))
}

pub fn op_invalid(_vm: &mut VM) -> Result<OpcodeResult, VMError> {
    Err(ExceptionalHalt::InvalidOpcode(0xFE).into())
}
