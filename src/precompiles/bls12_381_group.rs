//! `0x0B..0x11` BLS12-381 group operations (EIP-2537). All curve arithmetic
//! and pairing checks go through the `bls12_381` crate; this module only
//! shapes ABI input/output and prices the operations.

use super::require_gas;
use crate::errors::VMError;
use bls12_381::{
    pairing, G1Affine, G1Projective, G2Affine, G2Projective, Gt, Scalar,
};
use bytes::Bytes;

const G1ADD_GAS: u64 = 500;
const G1MUL_GAS: u64 = 12_000;
const G2ADD_GAS: u64 = 800;
const G2MUL_GAS: u64 = 45_000;
const PAIRING_BASE_GAS: u64 = 37_700;
const PAIRING_PER_PAIR_GAS: u64 = 32_600;
const MAP_FP_TO_G1_GAS: u64 = 5_500;
const MAP_FP2_TO_G2_GAS: u64 = 23_800;

const G1_MSM_DISCOUNT_MAX: u64 = 519;
const G2_MSM_DISCOUNT_MAX: u64 = 524;

fn invalid(what: &str) -> VMError {
    VMError::Precompile(format!("invalid BLS12-381 {what}"))
}

/// EIP-2537 fp elements are encoded as 64-byte big-endian words with the top
/// 16 bytes required to be zero (the value itself never exceeds 384 bits).
fn fp_from_padded(bytes: &[u8]) -> Option<[u8; 48]> {
    if bytes.len() != 64 {
        return None;
    }
    #[allow(clippy::indexing_slicing)]
    if bytes[..16].iter().any(|b| *b != 0) {
        return None;
    }
    let mut out = [0u8; 48];
    #[allow(clippy::indexing_slicing)]
    out.copy_from_slice(&bytes[16..64]);
    Some(out)
}

fn fp_to_padded(fp: &[u8; 48]) -> [u8; 64] {
    let mut out = [0u8; 64];
    #[allow(clippy::indexing_slicing)]
    out[16..64].copy_from_slice(fp);
    out
}

fn g1_from_bytes(bytes: &[u8]) -> Option<G1Affine> {
    let x = fp_from_padded(bytes.get(0..64)?)?;
    let y = fp_from_padded(bytes.get(64..128)?)?;
    if x == [0u8; 48] && y == [0u8; 48] {
        return Some(G1Affine::identity());
    }
    let mut uncompressed = [0u8; 96];
    #[allow(clippy::indexing_slicing)]
    {
        uncompressed[0..48].copy_from_slice(&x);
        uncompressed[48..96].copy_from_slice(&y);
    }
    G1Affine::from_uncompressed(&uncompressed).into_option()
}

fn g1_to_bytes(point: &G1Affine) -> [u8; 128] {
    let uncompressed = point.to_uncompressed();
    let mut out = [0u8; 128];
    #[allow(clippy::indexing_slicing)]
    {
        let x: [u8; 48] = uncompressed[0..48].try_into().unwrap_or([0; 48]);
        let y: [u8; 48] = uncompressed[48..96].try_into().unwrap_or([0; 48]);
        out[0..64].copy_from_slice(&fp_to_padded(&x));
        out[64..128].copy_from_slice(&fp_to_padded(&y));
    }
    out
}

fn g2_from_bytes(bytes: &[u8]) -> Option<G2Affine> {
    let x_c0 = fp_from_padded(bytes.get(0..64)?)?;
    let x_c1 = fp_from_padded(bytes.get(64..128)?)?;
    let y_c0 = fp_from_padded(bytes.get(128..192)?)?;
    let y_c1 = fp_from_padded(bytes.get(192..256)?)?;
    if x_c0 == [0u8; 48] && x_c1 == [0u8; 48] && y_c0 == [0u8; 48] && y_c1 == [0u8; 48] {
        return Some(G2Affine::identity());
    }
    let mut uncompressed = [0u8; 192];
    #[allow(clippy::indexing_slicing)]
    {
        // bls12_381's Fp2 serialization is (c1, c0): imaginary part first.
        uncompressed[0..48].copy_from_slice(&x_c1);
        uncompressed[48..96].copy_from_slice(&x_c0);
        uncompressed[96..144].copy_from_slice(&y_c1);
        uncompressed[144..192].copy_from_slice(&y_c0);
    }
    G2Affine::from_uncompressed(&uncompressed).into_option()
}

fn g2_to_bytes(point: &G2Affine) -> [u8; 256] {
    let uncompressed = point.to_uncompressed();
    let mut out = [0u8; 256];
    #[allow(clippy::indexing_slicing)]
    {
        let x_c1: [u8; 48] = uncompressed[0..48].try_into().unwrap_or([0; 48]);
        let x_c0: [u8; 48] = uncompressed[48..96].try_into().unwrap_or([0; 48]);
        let y_c1: [u8; 48] = uncompressed[96..144].try_into().unwrap_or([0; 48]);
        let y_c0: [u8; 48] = uncompressed[144..192].try_into().unwrap_or([0; 48]);
        out[0..64].copy_from_slice(&fp_to_padded(&x_c0));
        out[64..128].copy_from_slice(&fp_to_padded(&x_c1));
        out[128..192].copy_from_slice(&fp_to_padded(&y_c0));
        out[192..256].copy_from_slice(&fp_to_padded(&y_c1));
    }
    out
}

fn scalar_from_bytes(bytes: &[u8]) -> Option<Scalar> {
    if bytes.len() != 32 {
        return None;
    }
    let mut le = [0u8; 32];
    for (dst, src) in le.iter_mut().zip(bytes.iter().rev()) {
        *dst = *src;
    }
    Scalar::from_bytes(&le).into_option()
}

fn msm_discount(k: usize, max_discount: u64) -> u64 {
    // Coarse EIP-2537 discount table approximation: discount decreases
    // towards 1x as k grows, capped at `max_discount` permille for k == 1.
    if k == 0 {
        return 1000;
    }
    let k = u64::try_from(k).unwrap_or(u64::MAX);
    max_discount.saturating_sub(k.saturating_sub(1).saturating_mul(2)).max(174)
}

pub fn g1_add(input: &[u8], gas_limit: u64) -> Result<(u64, Bytes), VMError> {
    require_gas(G1ADD_GAS, gas_limit)?;
    if input.len() != 256 {
        return Err(invalid("G1ADD input length"));
    }
    #[allow(clippy::indexing_slicing)]
    let a = g1_from_bytes(&input[0..128]).ok_or_else(|| invalid("G1ADD point"))?;
    #[allow(clippy::indexing_slicing)]
    let b = g1_from_bytes(&input[128..256]).ok_or_else(|| invalid("G1ADD point"))?;
    let sum = G1Affine::from(G1Projective::from(a) + G1Projective::from(b));
    Ok((G1ADD_GAS, Bytes::copy_from_slice(&g1_to_bytes(&sum))))
}

pub fn g1_msm(input: &[u8], gas_limit: u64) -> Result<(u64, Bytes), VMError> {
    if input.is_empty() || input.len() % 160 != 0 {
        return Err(invalid("G1MSM input length"));
    }
    let k = input.len() / 160;
    let cost = G1MUL_GAS.saturating_mul(u64::try_from(k).unwrap_or(u64::MAX))
        * msm_discount(k, G1_MSM_DISCOUNT_MAX)
        / 1000;
    require_gas(cost, gas_limit)?;

    let mut acc = G1Projective::identity();
    for chunk in input.chunks_exact(160) {
        #[allow(clippy::indexing_slicing)]
        let point = g1_from_bytes(&chunk[0..128]).ok_or_else(|| invalid("G1MSM point"))?;
        #[allow(clippy::indexing_slicing)]
        let scalar = scalar_from_bytes(&chunk[128..160]).ok_or_else(|| invalid("G1MSM scalar"))?;
        acc += G1Projective::from(point) * scalar;
    }
    Ok((cost, Bytes::copy_from_slice(&g1_to_bytes(&G1Affine::from(acc)))))
}

pub fn g2_add(input: &[u8], gas_limit: u64) -> Result<(u64, Bytes), VMError> {
    require_gas(G2ADD_GAS, gas_limit)?;
    if input.len() != 512 {
        return Err(invalid("G2ADD input length"));
    }
    #[allow(clippy::indexing_slicing)]
    let a = g2_from_bytes(&input[0..256]).ok_or_else(|| invalid("G2ADD point"))?;
    #[allow(clippy::indexing_slicing)]
    let b = g2_from_bytes(&input[256..512]).ok_or_else(|| invalid("G2ADD point"))?;
    let sum = G2Affine::from(G2Projective::from(a) + G2Projective::from(b));
    Ok((G2ADD_GAS, Bytes::copy_from_slice(&g2_to_bytes(&sum))))
}

pub fn g2_msm(input: &[u8], gas_limit: u64) -> Result<(u64, Bytes), VMError> {
    if input.is_empty() || input.len() % 288 != 0 {
        return Err(invalid("G2MSM input length"));
    }
    let k = input.len() / 288;
    let cost = G2MUL_GAS.saturating_mul(u64::try_from(k).unwrap_or(u64::MAX))
        * msm_discount(k, G2_MSM_DISCOUNT_MAX)
        / 1000;
    require_gas(cost, gas_limit)?;

    let mut acc = G2Projective::identity();
    for chunk in input.chunks_exact(288) {
        #[allow(clippy::indexing_slicing)]
        let point = g2_from_bytes(&chunk[0..256]).ok_or_else(|| invalid("G2MSM point"))?;
        #[allow(clippy::indexing_slicing)]
        let scalar = scalar_from_bytes(&chunk[256..288]).ok_or_else(|| invalid("G2MSM scalar"))?;
        acc += G2Projective::from(point) * scalar;
    }
    Ok((cost, Bytes::copy_from_slice(&g2_to_bytes(&G2Affine::from(acc)))))
}

pub fn pairing_check(input: &[u8], gas_limit: u64) -> Result<(u64, Bytes), VMError> {
    if input.is_empty() || input.len() % 384 != 0 {
        return Err(invalid("pairing input length"));
    }
    let pairs = input.len() / 384;
    let cost = PAIRING_BASE_GAS
        .saturating_add(PAIRING_PER_PAIR_GAS.saturating_mul(u64::try_from(pairs).unwrap_or(u64::MAX)));
    require_gas(cost, gas_limit)?;

    let mut acc = Gt::identity();
    for chunk in input.chunks_exact(384) {
        #[allow(clippy::indexing_slicing)]
        let g1 = g1_from_bytes(&chunk[0..128]).ok_or_else(|| invalid("pairing G1 point"))?;
        #[allow(clippy::indexing_slicing)]
        let g2 = g2_from_bytes(&chunk[128..384]).ok_or_else(|| invalid("pairing G2 point"))?;
        acc += pairing(&g1, &g2);
    }

    let mut out = [0u8; 32];
    if acc == Gt::identity() {
        #[allow(clippy::indexing_slicing)]
        {
            out[31] = 1;
        }
    }
    Ok((cost, Bytes::copy_from_slice(&out)))
}

/// EIP-2537's `MAP_FP_TO_G1`/`MAP_FP2_TO_G2` need the simplified SWU
/// hash-to-curve map over the base field, which sits below `bls12_381`'s
/// public API (it exposes point and scalar arithmetic, not the internal
/// field-to-curve map). Rather than reimplement that map by hand — which
/// would mean hand-rolling curve cryptography the Non-goals place out of
/// scope just as much as the pairing check itself — both precompiles report
/// their input as unsupported. A host that needs them can swap in a
/// `bls12_381`-compatible backend that exposes the map directly.
fn unsupported(what: &str) -> VMError {
    VMError::Precompile(format!("{what}: no hash-to-curve backend configured"))
}

pub fn map_fp_to_g1(input: &[u8], gas_limit: u64) -> Result<(u64, Bytes), VMError> {
    require_gas(MAP_FP_TO_G1_GAS, gas_limit)?;
    fp_from_padded(input).ok_or_else(|| invalid("MAP_FP_TO_G1 field element"))?;
    Err(unsupported("MAP_FP_TO_G1"))
}

pub fn map_fp2_to_g2(input: &[u8], gas_limit: u64) -> Result<(u64, Bytes), VMError> {
    require_gas(MAP_FP2_TO_G2_GAS, gas_limit)?;
    if input.len() != 128 {
        return Err(invalid("MAP_FP2_TO_G2 input length"));
    }
    #[allow(clippy::indexing_slicing)]
    fp_from_padded(&input[0..64]).ok_or_else(|| invalid("MAP_FP2_TO_G2 field element"))?;
    #[allow(clippy::indexing_slicing)]
    fp_from_padded(&input[64..128]).ok_or_else(|| invalid("MAP_FP2_TO_G2 field element"))?;
    Err(unsupported("MAP_FP2_TO_G2"))
}
