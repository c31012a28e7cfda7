//! `0x05 MODEXP` (EIP-198, repriced by EIP-2565 at Berlin and again by
//! EIP-7883 at Osaka): arbitrary-precision `base ^ exponent mod modulus`.
//! The big-integer arithmetic is delegated to `num-bigint`; this module
//! only handles input parsing and the fork-dependent gas formula.

use super::require_gas;
use crate::errors::VMError;
use crate::fork::Fork;
use bytes::Bytes;
use num_bigint::BigUint;

fn read_len(input: &[u8], offset: usize) -> usize {
    let mut buf = [0u8; 32];
    for (i, slot) in buf.iter_mut().enumerate() {
        if let Some(byte) = input.get(offset + i) {
            *slot = *byte;
        }
    }
    // Lengths beyond usize range would require more memory than exists;
    // saturate rather than trap.
    let value = num_bigint::BigUint::from_bytes_be(&buf);
    let digit = value.to_u64_digits().first().copied().unwrap_or(0);
    usize::try_from(digit).unwrap_or(usize::MAX)
}

fn read_slice(input: &[u8], offset: usize, len: usize) -> Vec<u8> {
    let mut out = vec![0u8; len];
    for (i, slot) in out.iter_mut().enumerate() {
        if let Some(byte) = input.get(offset + i) {
            *slot = *byte;
        }
    }
    out
}

/// Number of bits needed, minus one, to represent the exponent's leading
/// 32 bytes (or fewer if `exp_len < 32`) — the `iteration_count` building
/// block shared by both the EIP-198 and EIP-2565 formulas.
fn exponent_head_bit_length(exponent_head: &[u8]) -> u64 {
    let value = BigUint::from_bytes_be(exponent_head);
    if value == BigUint::from(0u8) {
        0
    } else {
        value.bits().saturating_sub(1)
    }
}

fn iteration_count(exp_len: usize, exponent_head: &[u8]) -> u64 {
    let head_bits = exponent_head_bit_length(exponent_head);
    let exp_len = u64::try_from(exp_len).unwrap_or(u64::MAX);
    if exp_len <= 32 {
        head_bits
    } else {
        8 * (exp_len - 32) + head_bits
    }
}

fn words_of(len: usize) -> u64 {
    u64::try_from(len).unwrap_or(u64::MAX).div_ceil(8)
}

fn gas_berlin(base_len: usize, exp_len: usize, mod_len: usize, exponent_head: &[u8]) -> u64 {
    let max_len = base_len.max(mod_len);
    let words = words_of(max_len);
    let multiplication_complexity = words.saturating_mul(words);
    let iterations = iteration_count(exp_len, exponent_head).max(1);
    (multiplication_complexity.saturating_mul(iterations) / 3).max(200)
}

fn legacy_complexity(x: u64) -> u64 {
    if x <= 64 {
        x.saturating_mul(x)
    } else if x <= 1024 {
        x.saturating_mul(x) / 4 + 96 * x - 3072
    } else {
        x.saturating_mul(x) / 16 + 480 * x - 199_680
    }
}

fn gas_legacy(base_len: usize, exp_len: usize, mod_len: usize, exponent_head: &[u8]) -> u64 {
    let max_len = u64::try_from(base_len.max(mod_len)).unwrap_or(u64::MAX);
    let complexity = legacy_complexity(max_len);
    let iterations = iteration_count(exp_len, exponent_head).max(1);
    (complexity.saturating_mul(iterations) / 20).max(1)
}

pub fn execute(input: &[u8], gas_limit: u64, fork: Fork) -> Result<(u64, Bytes), VMError> {
    let base_len = read_len(input, 0);
    let exp_len = read_len(input, 32);
    let mod_len = read_len(input, 64);

    let header_end = 96usize;
    let base_bytes = read_slice(input, header_end, base_len);
    let exp_bytes = read_slice(input, header_end + base_len, exp_len);
    let mod_bytes = read_slice(input, header_end + base_len + exp_len, mod_len);

    let exponent_head_len = exp_len.min(32);
    let exponent_head = &exp_bytes[..exponent_head_len.min(exp_bytes.len())];

    let cost = if fork.eip(crate::fork::eips::EIP_2565) {
        gas_berlin(base_len, exp_len, mod_len, exponent_head)
    } else {
        gas_legacy(base_len, exp_len, mod_len, exponent_head)
    };
    require_gas(cost, gas_limit)?;

    if mod_len == 0 {
        return Ok((cost, Bytes::new()));
    }

    let modulus = BigUint::from_bytes_be(&mod_bytes);
    let result = if modulus == BigUint::from(0u8) {
        BigUint::from(0u8)
    } else {
        let base = BigUint::from_bytes_be(&base_bytes);
        let exponent = BigUint::from_bytes_be(&exp_bytes);
        base.modpow(&exponent, &modulus)
    };

    let mut output = vec![0u8; mod_len];
    let result_bytes = result.to_bytes_be();
    let start = mod_len.saturating_sub(result_bytes.len());
    #[allow(clippy::indexing_slicing)]
    output[start..].copy_from_slice(&result_bytes);
    Ok((cost, Bytes::from(output)))
}
