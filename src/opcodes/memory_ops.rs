//! Memory opcodes (spec §4.5): `MLOAD`, `MSTORE`, `MSTORE8`, `MSIZE`, `MCOPY`.

use super::OpcodeResult;
use crate::errors::{ExceptionalHalt, VMError};
use crate::gas_cost;
use crate::primitives::U256;
use crate::vm::VM;

fn offset_usize(value: U256) -> Result<usize, VMError> {
    value
        .try_into()
        .map_err(|_| VMError::from(ExceptionalHalt::OutOfBoundsRead))
}

pub fn op_mload(vm: &mut VM) -> Result<OpcodeResult, VMError> {
    let offset = offset_usize(vm.pop()?)?;
    vm.charge(gas_cost::VERY_LOW)?;
    vm.expand_memory(&[(offset, 32)])?;
    let word = vm.current_call_frame_mut()?.memory.load32(offset);
    vm.push(U256::from_big_endian(&word))?;
    Ok(OpcodeResult::Continue)
}

pub fn op_mstore(vm: &mut VM) -> Result<OpcodeResult, VMError> {
    let offset = offset_usize(vm.pop()?)?;
    let value = vm.pop()?;
    vm.charge(gas_cost::VERY_LOW)?;
    vm.expand_memory(&[(offset, 32)])?;
    let mut bytes = [0u8; 32];
    value.to_big_endian(&mut bytes);
    vm.current_call_frame_mut()?.memory.store32(offset, bytes);
    Ok(OpcodeResult::Continue)
}

pub fn op_mstore8(vm: &mut VM) -> Result<OpcodeResult, VMError> {
    let offset = offset_usize(vm.pop()?)?;
    let value = vm.pop()?;
    vm.charge(gas_cost::VERY_LOW)?;
    vm.expand_memory(&[(offset, 1)])?;
    let byte = value.byte(0);
    vm.current_call_frame_mut()?.memory.store_byte(offset, byte);
    Ok(OpcodeResult::Continue)
}

pub fn op_msize(vm: &mut VM) -> Result<OpcodeResult, VMError> {
    vm.charge(gas_cost::BASE)?;
    let len = vm.current_call_frame()?.memory.len();
    vm.push(U256::from(len))?;
    Ok(OpcodeResult::Continue)
}

/// `MCOPY` (EIP-5656): overlap-safe memory-to-memory copy.
pub fn op_mcopy(vm: &mut VM) -> Result<OpcodeResult, VMError> {
    let dest = offset_usize(vm.pop()?)?;
    let src = offset_usize(vm.pop()?)?;
    let size = offset_usize(vm.pop()?)?;
    vm.charge(gas_cost::VERY_LOW)?;
    vm.charge(gas_cost::copy_cost(size))?;
    vm.expand_memory(&[(dest, size), (src, size)])?;
    vm.current_call_frame_mut()?.memory.copy_within(dest, src, size);
    Ok(OpcodeResult::Continue)
}
