//! `0x0A POINT_EVALUATION` (EIP-4844). The KZG commitment scheme itself is
//! out of scope here; this module only validates the calldata shape and the
//! versioned-hash binding, then hands the actual pairing check to whatever
//! [`KzgVerifier`] the host wires in.

use super::require_gas;
use crate::errors::VMError;
use bytes::Bytes;
use sha2::{Digest, Sha256};

const GAS: u64 = 50_000;
const VERSIONED_HASH_VERSION_KZG: u8 = 1;
const FIELD_ELEMENTS_PER_BLOB: u64 = 4096;
const BLS_MODULUS: &str =
    "52435875175126190479447740508185965837690552500527637822603658699938581184513";

/// Returns `true` iff the (commitment, z, y, proof) tuple satisfies
/// `commitment(z) == y` under the KZG trusted setup. Implementations live
/// outside this crate; callers without one configured reject every proof.
pub trait KzgVerifier {
    fn verify_kzg_proof(
        &self,
        commitment: &[u8; 48],
        z: &[u8; 32],
        y: &[u8; 32],
        proof: &[u8; 48],
    ) -> bool;
}

/// Used when no verifier has been wired in; every call is treated as
/// unprovable rather than silently accepted.
pub struct UnconfiguredVerifier;

impl KzgVerifier for UnconfiguredVerifier {
    fn verify_kzg_proof(&self, _: &[u8; 48], _: &[u8; 32], _: &[u8; 32], _: &[u8; 48]) -> bool {
        false
    }
}

fn kzg_to_versioned_hash(commitment: &[u8; 48]) -> [u8; 32] {
    let digest = Sha256::digest(commitment);
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest);
    #[allow(clippy::indexing_slicing)]
    {
        out[0] = VERSIONED_HASH_VERSION_KZG;
    }
    out
}

pub fn point_evaluation(
    input: &[u8],
    gas_limit: u64,
    verifier: &dyn KzgVerifier,
) -> Result<(u64, Bytes), VMError> {
    require_gas(GAS, gas_limit)?;
    if input.len() != 192 {
        return Err(VMError::Precompile(format!(
            "point evaluation input must be 192 bytes, got {}",
            input.len()
        )));
    }
    let invalid = || VMError::Precompile("invalid point evaluation input".into());

    #[allow(clippy::indexing_slicing)]
    let versioned_hash: [u8; 32] = input[0..32].try_into().map_err(|_| invalid())?;
    #[allow(clippy::indexing_slicing)]
    let z: [u8; 32] = input[32..64].try_into().map_err(|_| invalid())?;
    #[allow(clippy::indexing_slicing)]
    let y: [u8; 32] = input[64..96].try_into().map_err(|_| invalid())?;
    #[allow(clippy::indexing_slicing)]
    let commitment: [u8; 48] = input[96..144].try_into().map_err(|_| invalid())?;
    #[allow(clippy::indexing_slicing)]
    let proof: [u8; 48] = input[144..192].try_into().map_err(|_| invalid())?;

    if kzg_to_versioned_hash(&commitment) != versioned_hash {
        return Err(VMError::Precompile("versioned hash mismatch".into()));
    }

    if !verifier.verify_kzg_proof(&commitment, &z, &y, &proof) {
        return Err(VMError::Precompile("KZG proof verification failed".into()));
    }

    // Success output is FIELD_ELEMENTS_PER_BLOB || BLS_MODULUS, both as
    // 32-byte big-endian words, per EIP-4844.
    let mut out = [0u8; 64];
    #[allow(clippy::indexing_slicing)]
    out[0..32].copy_from_slice(&U256_from(FIELD_ELEMENTS_PER_BLOB));
    let modulus = BLS_MODULUS
        .parse::<num_bigint::BigUint>()
        .unwrap_or_default()
        .to_bytes_be();
    let mut modulus_word = [0u8; 32];
    let start = 32usize.saturating_sub(modulus.len());
    #[allow(clippy::indexing_slicing)]
    modulus_word[start..].copy_from_slice(&modulus);
    #[allow(clippy::indexing_slicing)]
    out[32..64].copy_from_slice(&modulus_word);

    Ok((GAS, Bytes::copy_from_slice(&out)))
}

#[allow(non_snake_case)]
fn U256_from(value: u64) -> [u8; 32] {
    let mut out = [0u8; 32];
    #[allow(clippy::indexing_slicing)]
    out[24..].copy_from_slice(&value.to_be_bytes());
    out
}
