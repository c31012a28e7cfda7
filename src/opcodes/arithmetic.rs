//! Arithmetic opcodes (spec §4.5): `ADD`..`SIGNEXTEND`. All wrap modulo
//! 2^256; division/modulo by zero yield zero rather than trapping.

use super::OpcodeResult;
use crate::errors::VMError;
use crate::gas_cost;
use crate::primitives::{U256, U256Ext};
use crate::vm::VM;

macro_rules! binop {
    ($name:ident, $gas:expr, |$a:ident, $b:ident| $body:expr) => {
        pub fn $name(vm: &mut VM) -> Result<OpcodeResult, VMError> {
            vm.charge($gas)?;
            let $a = vm.pop()?;
            let $b = vm.pop()?;
            vm.push($body)?;
            Ok(OpcodeResult::Continue)
        }
    };
}

binop!(op_add, gas_cost::VERY_LOW, |a, b| a.wrapping_add_ext(b));
binop!(op_mul, gas_cost::LOW, |a, b| a.wrapping_mul_ext(b));
binop!(op_sub, gas_cost::VERY_LOW, |a, b| a.wrapping_sub_ext(b));
binop!(op_div, gas_cost::LOW, |a, b| a.evm_div(b));
binop!(op_sdiv, gas_cost::LOW, |a, b| a.evm_sdiv(b));
binop!(op_mod, gas_cost::LOW, |a, b| a.evm_mod(b));
binop!(op_smod, gas_cost::LOW, |a, b| a.evm_smod(b));

pub fn op_addmod(vm: &mut VM) -> Result<OpcodeResult, VMError> {
    vm.charge(gas_cost::MID)?;
    let a = vm.pop()?;
    let b = vm.pop()?;
    let n = vm.pop()?;
    let result = if n.is_zero() {
        U256::zero()
    } else {
        let sum = a.full_mul(U256::one()) + b.full_mul(U256::one()); // widen to avoid overflow
        (sum % n.full_mul(U256::one())).low_u256_checked()
    };
    vm.push(result)?;
    Ok(OpcodeResult::Continue)
}

pub fn op_mulmod(vm: &mut VM) -> Result<OpcodeResult, VMError> {
    vm.charge(gas_cost::MID)?;
    let a = vm.pop()?;
    let b = vm.pop()?;
    let n = vm.pop()?;
    let result = if n.is_zero() {
        U256::zero()
    } else {
        let product = a.full_mul(b);
        (product % n.full_mul(U256::one())).low_u256_checked()
    };
    vm.push(result)?;
    Ok(OpcodeResult::Continue)
}

pub fn op_exp(vm: &mut VM) -> Result<OpcodeResult, VMError> {
    let fork = vm.env.config.fork;
    let base = vm.pop()?;
    let exponent = vm.pop()?;
    vm.charge(gas_cost::exp_cost(fork, exponent))?;
    vm.push(wrapping_pow(base, exponent))?;
    Ok(OpcodeResult::Continue)
}

/// `base ** exponent mod 2^256` via square-and-multiply, using wrapping
/// (`mod 2^256`) multiplication throughout — distinct from `wrapping_pow_mod`
/// in `primitives`, which is the true-modexp formula the `MODEXP`
/// precompile needs.
fn wrapping_pow(mut base: U256, mut exponent: U256) -> U256 {
    let mut result = U256::one();
    while !exponent.is_zero() {
        if exponent.bit(0) {
            result = result.wrapping_mul_ext(base);
        }
        base = base.wrapping_mul_ext(base);
        exponent >>= 1;
    }
    result
}

/// `SIGNEXTEND`: sign-extend the low `(byte_index + 1)` bytes of `value`.
pub fn op_signextend(vm: &mut VM) -> Result<OpcodeResult, VMError> {
    vm.charge(gas_cost::LOW)?;
    let byte_index = vm.pop()?;
    let value = vm.pop()?;
    if byte_index >= U256::from(32) {
        vm.push(value)?;
        return Ok(OpcodeResult::Continue);
    }
    let byte_index = usize::try_from(byte_index.as_u32()).unwrap_or(31);
    let bit_index = byte_index * 8 + 7;
    let sign_bit = value.bit(bit_index);
    let mask = (U256::one() << (bit_index + 1)).saturating_sub(U256::one());
    let result = if sign_bit { value | !mask } else { value & mask };
    vm.push(result)?;
    Ok(OpcodeResult::Continue)
}

/// Small helper trait bridging `ethereum_types`'s `full_mul` (512-bit
/// widening multiply, returned as `U512`) back down once we know the
/// modulus keeps the result in range — `ADDMOD`/`MULMOD` need the wider
/// intermediate to avoid silently wrapping before the `% n`.
trait LowU256 {
    fn low_u256_checked(&self) -> U256;
}

impl LowU256 for ethereum_types::U512 {
    fn low_u256_checked(&self) -> U256 {
        let mut bytes = [0u8; 64];
        self.to_big_endian(&mut bytes);
        U256::from_big_endian(&bytes[32..])
    }
}
