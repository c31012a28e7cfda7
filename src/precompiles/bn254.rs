//! `0x06`/`0x07`/`0x08` BN254 (alt_bn128) `ADD`/`MUL`/`PAIRING` (EIP-196,
//! EIP-197, repriced by EIP-1108 at Istanbul). Curve arithmetic and pairing
//! checks are delegated to `ark-bn254`/`ark-ec`/`ark-ff`.

use super::{padded, require_gas};
use crate::errors::VMError;
use crate::fork::Fork;
use ark_bn254::{Bn254, Fq, Fq2, G1Affine, G2Affine};
use ark_ec::pairing::Pairing;
use ark_ec::AffineRepr;
use ark_ff::{Field, PrimeField};
use bytes::Bytes;

fn fq_from_be(bytes: &[u8]) -> Option<Fq> {
    if bytes.len() != 32 {
        return None;
    }
    Some(Fq::from_be_bytes_mod_order(bytes))
}

fn g1_from_bytes(bytes: &[u8]) -> Option<G1Affine> {
    let x = fq_from_be(bytes.get(0..32)?)?;
    let y = fq_from_be(bytes.get(32..64)?)?;
    if x.is_zero_field() && y.is_zero_field() {
        return Some(G1Affine::identity());
    }
    let point = G1Affine::new_unchecked(x, y);
    point.is_on_curve().then_some(point)
}

fn g1_to_bytes(point: G1Affine) -> [u8; 64] {
    let mut out = [0u8; 64];
    if let Some((x, y)) = point.xy() {
        #[allow(clippy::indexing_slicing)]
        out[0..32].copy_from_slice(&x.into_bigint().to_bytes_be());
        #[allow(clippy::indexing_slicing)]
        out[32..64].copy_from_slice(&y.into_bigint().to_bytes_be());
    }
    out
}

fn g2_from_bytes(bytes: &[u8]) -> Option<G2Affine> {
    // Field-component order in the precompile ABI is (c1, c0) per component,
    // i.e. the imaginary part is serialized first — matches EIP-197.
    let x_c1 = fq_from_be(bytes.get(0..32)?)?;
    let x_c0 = fq_from_be(bytes.get(32..64)?)?;
    let y_c1 = fq_from_be(bytes.get(64..96)?)?;
    let y_c0 = fq_from_be(bytes.get(96..128)?)?;
    let x = Fq2::new(x_c0, x_c1);
    let y = Fq2::new(y_c0, y_c1);
    if x.c0.is_zero_field() && x.c1.is_zero_field() && y.c0.is_zero_field() && y.c1.is_zero_field()
    {
        return Some(G2Affine::identity());
    }
    let point = G2Affine::new_unchecked(x, y);
    point.is_on_curve().then_some(point)
}

trait IsZeroField {
    fn is_zero_field(&self) -> bool;
}
impl IsZeroField for Fq {
    fn is_zero_field(&self) -> bool {
        self.into_bigint().is_zero()
    }
}

pub fn add(input: &[u8], gas_limit: u64, fork: Fork) -> Result<(u64, Bytes), VMError> {
    let cost = if fork.eip(crate::fork::eips::EIP_1108) { 150 } else { 500 };
    require_gas(cost, gas_limit)?;
    let buf = padded(input, 128);
    let invalid = || VMError::Precompile("invalid BN254 G1 point".into());
    #[allow(clippy::indexing_slicing)]
    let a = g1_from_bytes(&buf[0..64]).ok_or_else(invalid)?;
    #[allow(clippy::indexing_slicing)]
    let b = g1_from_bytes(&buf[64..128]).ok_or_else(invalid)?;
    let sum: G1Affine = (a + b).into();
    Ok((cost, Bytes::copy_from_slice(&g1_to_bytes(sum))))
}

pub fn mul(input: &[u8], gas_limit: u64, fork: Fork) -> Result<(u64, Bytes), VMError> {
    let cost = if fork.eip(crate::fork::eips::EIP_1108) { 6_000 } else { 40_000 };
    require_gas(cost, gas_limit)?;
    let buf = padded(input, 96);
    #[allow(clippy::indexing_slicing)]
    let point = g1_from_bytes(&buf[0..64])
        .ok_or_else(|| VMError::Precompile("invalid BN254 G1 point".into()))?;
    #[allow(clippy::indexing_slicing)]
    let scalar = num_bigint::BigUint::from_bytes_be(&buf[64..96]);
    let scalar = ark_bn254::Fr::from_be_bytes_mod_order(&scalar.to_bytes_be());
    let result: G1Affine = (point * scalar).into();
    Ok((cost, Bytes::copy_from_slice(&g1_to_bytes(result))))
}

pub fn pairing(input: &[u8], gas_limit: u64, fork: Fork) -> Result<(u64, Bytes), VMError> {
    if input.len() % 192 != 0 {
        return Err(VMError::Precompile("BN254 pairing input not a multiple of 192".into()));
    }
    let pairs = input.len() / 192;
    let (base, per_pair) = if fork.eip(crate::fork::eips::EIP_1108) {
        (45_000u64, 34_000u64)
    } else {
        (100_000u64, 80_000u64)
    };
    let cost = base.saturating_add(per_pair.saturating_mul(u64::try_from(pairs).unwrap_or(u64::MAX)));
    require_gas(cost, gas_limit)?;

    let mut accumulator = ark_bn254::Fq12::ONE;
    let mut ok = true;
    for chunk in input.chunks_exact(192) {
        let g1 = match g1_from_bytes(chunk.get(0..64).unwrap_or(&[])) {
            Some(p) => p,
            None => {
                ok = false;
                break;
            }
        };
        let g2 = match g2_from_bytes(chunk.get(64..192).unwrap_or(&[])) {
            Some(p) => p,
            None => {
                ok = false;
                break;
            }
        };
        if g1.is_zero() || g2.is_zero() {
            continue;
        }
        let pairing_result = Bn254::pairing(g1, g2);
        accumulator *= pairing_result.0;
    }

    let success = ok && accumulator == ark_bn254::Fq12::ONE;
    let mut output = [0u8; 32];
    if success {
        #[allow(clippy::indexing_slicing)]
        {
            output[31] = 1;
        }
    }
    Ok((cost, Bytes::copy_from_slice(&output)))
}
