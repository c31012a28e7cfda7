//! Precompiled contracts (spec §4.6): addresses `0x01..0x11`. This module
//! owns gas accounting, input/output shaping and fork-gating; the actual
//! cryptographic math is delegated to the crates named in SPEC_FULL.md §3.6
//! (`k256`/`secp256k1`, `sha2`, `ripemd`, `ark-bn254`, `bls12_381`), never
//! reimplemented here.

mod blake2f;
mod bls12_381_group;
mod bn254;
mod ecrecover;
mod identity;
mod kzg;
mod modexp;
mod ripemd160;
mod sha256;

use crate::errors::VMError;
use crate::fork::Fork;
use crate::primitives::Address;
use bytes::Bytes;

pub use kzg::{KzgVerifier, UnconfiguredVerifier};

pub const ECRECOVER: u64 = 1;
pub const SHA256: u64 = 2;
pub const RIPEMD160: u64 = 3;
pub const IDENTITY: u64 = 4;
pub const MODEXP: u64 = 5;
pub const BN254_ADD: u64 = 6;
pub const BN254_MUL: u64 = 7;
pub const BN254_PAIRING: u64 = 8;
pub const BLAKE2F: u64 = 9;
pub const POINT_EVALUATION: u64 = 10;
pub const BLS12_G1ADD: u64 = 11;
pub const BLS12_G1MSM: u64 = 12;
pub const BLS12_G2ADD: u64 = 13;
pub const BLS12_G2MSM: u64 = 14;
pub const BLS12_PAIRING_CHECK: u64 = 15;
pub const BLS12_MAP_FP_TO_G1: u64 = 16;
pub const BLS12_MAP_FP2_TO_G2: u64 = 17;

/// Whether `address` names a precompile active at `fork` (spec §4.6: BLS
/// precompiles only from Prague, point evaluation only from Cancun).
pub fn is_precompile(address: Address, fork: Fork) -> bool {
    let Some(number) = precompile_number(address) else {
        return false;
    };
    match number {
        1..=4 => true,
        5 => fork.eip(crate::fork::eips::EIP_198),
        6 | 7 => fork.eip(crate::fork::eips::EIP_196),
        8 => fork.eip(crate::fork::eips::EIP_197),
        9 => fork.eip(crate::fork::eips::EIP_152),
        10 => fork.eip(crate::fork::eips::EIP_4844),
        11..=17 => fork >= Fork::Prague,
        _ => false,
    }
}

// `Address::as_bytes()` always returns exactly 20 bytes.
#[allow(clippy::indexing_slicing)]
fn precompile_number(address: Address) -> Option<u64> {
    let bytes = address.as_bytes();
    if bytes[..19].iter().any(|b| *b != 0) {
        return None;
    }
    let n = u64::from(bytes[19]);
    (1..=17).contains(&n).then_some(n)
}

/// Execute the precompile at `address`. Returns `(gas_used, output)` on
/// success, or a `VMError::Precompile` describing why input was rejected —
/// callers treat the latter the same as any other exceptional halt (the
/// call fails, remaining gas is consumed, spec §4.6).
pub fn execute(
    address: Address,
    input: &[u8],
    gas_limit: u64,
    fork: Fork,
    kzg_verifier: &dyn KzgVerifier,
) -> Result<(u64, Bytes), VMError> {
    let number = precompile_number(address).ok_or_else(|| {
        VMError::Precompile(format!("{address:?} is not a precompile address"))
    })?;

    match number {
        ECRECOVER => ecrecover::execute(input, gas_limit),
        SHA256 => sha256::execute(input, gas_limit),
        RIPEMD160 => ripemd160::execute(input, gas_limit),
        IDENTITY => identity::execute(input, gas_limit),
        MODEXP => modexp::execute(input, gas_limit, fork),
        BN254_ADD => bn254::add(input, gas_limit, fork),
        BN254_MUL => bn254::mul(input, gas_limit, fork),
        BN254_PAIRING => bn254::pairing(input, gas_limit, fork),
        BLAKE2F => blake2f::execute(input, gas_limit),
        POINT_EVALUATION => kzg::point_evaluation(input, gas_limit, kzg_verifier),
        BLS12_G1ADD => bls12_381_group::g1_add(input, gas_limit),
        BLS12_G1MSM => bls12_381_group::g1_msm(input, gas_limit),
        BLS12_G2ADD => bls12_381_group::g2_add(input, gas_limit),
        BLS12_G2MSM => bls12_381_group::g2_msm(input, gas_limit),
        BLS12_PAIRING_CHECK => bls12_381_group::pairing_check(input, gas_limit),
        BLS12_MAP_FP_TO_G1 => bls12_381_group::map_fp_to_g1(input, gas_limit),
        BLS12_MAP_FP2_TO_G2 => bls12_381_group::map_fp2_to_g2(input, gas_limit),
        _ => Err(VMError::Precompile(format!("unassigned precompile {number}"))),
    }
}

/// Shared "not enough gas" check every precompile performs before doing any
/// work, matching the teacher's `precompiles::execute_precompile` shape.
pub(crate) fn require_gas(cost: u64, gas_limit: u64) -> Result<(), VMError> {
    if cost > gas_limit {
        return Err(crate::errors::ExceptionalHalt::OutOfGas.into());
    }
    Ok(())
}

/// Right-pad (or truncate) `input` to exactly `len` bytes, the common shape
/// every fixed-arity precompile (`ECRECOVER`, `BN254_ADD`, …) expects.
pub(crate) fn padded(input: &[u8], len: usize) -> Vec<u8> {
    let mut buf = vec![0u8; len];
    let n = input.len().min(len);
    #[allow(clippy::indexing_slicing)]
    buf[..n].copy_from_slice(&input[..n]);
    buf
}
