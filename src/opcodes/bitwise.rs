//! Comparison and bitwise opcodes (spec §4.5): `LT`..`SAR`.

use super::OpcodeResult;
use crate::errors::VMError;
use crate::gas_cost;
use crate::primitives::{U256, U256Ext};
use crate::vm::VM;

fn bool_to_word(b: bool) -> U256 {
    if b { U256::one() } else { U256::zero() }
}

pub fn op_lt(vm: &mut VM) -> Result<OpcodeResult, VMError> {
    vm.charge(gas_cost::VERY_LOW)?;
    let a = vm.pop()?;
    let b = vm.pop()?;
    vm.push(bool_to_word(a < b))?;
    Ok(OpcodeResult::Continue)
}

pub fn op_gt(vm: &mut VM) -> Result<OpcodeResult, VMError> {
    vm.charge(gas_cost::VERY_LOW)?;
    let a = vm.pop()?;
    let b = vm.pop()?;
    vm.push(bool_to_word(a > b))?;
    Ok(OpcodeResult::Continue)
}

pub fn op_slt(vm: &mut VM) -> Result<OpcodeResult, VMError> {
    vm.charge(gas_cost::VERY_LOW)?;
    let a = vm.pop()?;
    let b = vm.pop()?;
    let (a_mag, a_neg) = a.to_signed();
    let (b_mag, b_neg) = b.to_signed();
    let result = match (a_neg, b_neg) {
        (true, false) => true,
        (false, true) => false,
        (true, true) => a_mag > b_mag,
        (false, false) => a_mag < b_mag,
    };
    vm.push(bool_to_word(result))?;
    Ok(OpcodeResult::Continue)
}

pub fn op_sgt(vm: &mut VM) -> Result<OpcodeResult, VMError> {
    vm.charge(gas_cost::VERY_LOW)?;
    let a = vm.pop()?;
    let b = vm.pop()?;
    let (a_mag, a_neg) = a.to_signed();
    let (b_mag, b_neg) = b.to_signed();
    let result = match (a_neg, b_neg) {
        (true, false) => false,
        (false, true) => true,
        (true, true) => a_mag < b_mag,
        (false, false) => a_mag > b_mag,
    };
    vm.push(bool_to_word(result))?;
    Ok(OpcodeResult::Continue)
}

pub fn op_eq(vm: &mut VM) -> Result<OpcodeResult, VMError> {
    vm.charge(gas_cost::VERY_LOW)?;
    let a = vm.pop()?;
    let b = vm.pop()?;
    vm.push(bool_to_word(a == b))?;
    Ok(OpcodeResult::Continue)
}

pub fn op_iszero(vm: &mut VM) -> Result<OpcodeResult, VMError> {
    vm.charge(gas_cost::VERY_LOW)?;
    let a = vm.pop()?;
    vm.push(bool_to_word(a.is_zero()))?;
    Ok(OpcodeResult::Continue)
}

pub fn op_and(vm: &mut VM) -> Result<OpcodeResult, VMError> {
    vm.charge(gas_cost::VERY_LOW)?;
    let a = vm.pop()?;
    let b = vm.pop()?;
    vm.push(a & b)?;
    Ok(OpcodeResult::Continue)
}

pub fn op_or(vm: &mut VM) -> Result<OpcodeResult, VMError> {
    vm.charge(gas_cost::VERY_LOW)?;
    let a = vm.pop()?;
    let b = vm.pop()?;
    vm.push(a | b)?;
    Ok(OpcodeResult::Continue)
}

pub fn op_xor(vm: &mut VM) -> Result<OpcodeResult, VMError> {
    vm.charge(gas_cost::VERY_LOW)?;
    let a = vm.pop()?;
    let b = vm.pop()?;
    vm.push(a ^ b)?;
    Ok(OpcodeResult::Continue)
}

pub fn op_not(vm: &mut VM) -> Result<OpcodeResult, VMError> {
    vm.charge(gas_cost::VERY_LOW)?;
    let a = vm.pop()?;
    vm.push(!a)?;
    Ok(OpcodeResult::Continue)
}

/// `BYTE`: the `i`-th byte of `x`, counting from the most significant byte.
pub fn op_byte(vm: &mut VM) -> Result<OpcodeResult, VMError> {
    vm.charge(gas_cost::VERY_LOW)?;
    let index = vm.pop()?;
    let value = vm.pop()?;
    let result = if index >= U256::from(32) {
        U256::zero()
    } else {
        let i = usize::try_from(index.as_u32()).unwrap_or(31);
        let mut bytes = [0u8; 32];
        value.to_big_endian(&mut bytes);
        #[allow(clippy::indexing_slicing)]
        U256::from(bytes[i])
    };
    vm.push(result)?;
    Ok(OpcodeResult::Continue)
}

pub fn op_shl(vm: &mut VM) -> Result<OpcodeResult, VMError> {
    vm.charge(gas_cost::VERY_LOW)?;
    let shift = vm.pop()?;
    let value = vm.pop()?;
    let result = if shift >= U256::from(256) {
        U256::zero()
    } else {
        value << shift.as_u32()
    };
    vm.push(result)?;
    Ok(OpcodeResult::Continue)
}

pub fn op_shr(vm: &mut VM) -> Result<OpcodeResult, VMError> {
    vm.charge(gas_cost::VERY_LOW)?;
    let shift = vm.pop()?;
    let value = vm.pop()?;
    let result = if shift >= U256::from(256) {
        U256::zero()
    } else {
        value >> shift.as_u32()
    };
    vm.push(result)?;
    Ok(OpcodeResult::Continue)
}

/// Arithmetic (sign-preserving) right shift.
pub fn op_sar(vm: &mut VM) -> Result<OpcodeResult, VMError> {
    vm.charge(gas_cost::VERY_LOW)?;
    let shift = vm.pop()?;
    let value = vm.pop()?;
    let negative = value.bit(255);
    let result = if shift >= U256::from(256) {
        if negative { U256::MAX } else { U256::zero() }
    } else {
        let s = shift.as_u32();
        let shifted = value >> s;
        if negative && s > 0 {
            let fill = U256::MAX << (256 - usize::try_from(s).unwrap_or(256));
            shifted | fill
        } else {
            shifted
        }
    };
    vm.push(result)?;
    Ok(OpcodeResult::Continue)
}
