//! `0x01 ECRECOVER`: recover the signer address from an ECDSA signature.
//! Invalid input (bad `v`, non-canonical `r`/`s`, unrecoverable signature)
//! is not an error here — it yields empty output, matching the real
//! precompile's behaviour (spec §4.6).

use super::{padded, require_gas};
use crate::errors::VMError;
use bytes::Bytes;
use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};
use sha3::{Digest, Keccak256};

const GAS: u64 = 3_000;

pub fn execute(input: &[u8], gas_limit: u64) -> Result<(u64, Bytes), VMError> {
    require_gas(GAS, gas_limit)?;
    let buf = padded(input, 128);
    #[allow(clippy::indexing_slicing)]
    let (hash, rest) = buf.split_at(32);
    #[allow(clippy::indexing_slicing)]
    let (v_bytes, rs) = rest.split_at(32);
    #[allow(clippy::indexing_slicing)]
    let (r, s) = rs.split_at(32);

    // v must be exactly 27 or 28 with every higher byte zero.
    if v_bytes[..31].iter().any(|b| *b != 0) {
        return Ok((GAS, Bytes::new()));
    }
    #[allow(clippy::indexing_slicing)]
    let v = v_bytes[31];
    let Some(recovery_byte) = v.checked_sub(27).filter(|b| *b <= 1) else {
        return Ok((GAS, Bytes::new()));
    };

    let Ok(recovery_id) = RecoveryId::try_from(recovery_byte) else {
        return Ok((GAS, Bytes::new()));
    };
    let Ok(signature) = Signature::from_scalars(
        <[u8; 32]>::try_from(r).unwrap_or_default(),
        <[u8; 32]>::try_from(s).unwrap_or_default(),
    ) else {
        return Ok((GAS, Bytes::new()));
    };

    let Ok(verifying_key) = VerifyingKey::recover_from_prehash(hash, &signature, recovery_id)
    else {
        return Ok((GAS, Bytes::new()));
    };

    let uncompressed = verifying_key.to_encoded_point(false);
    let Some(public_key_bytes) = uncompressed.as_bytes().get(1..) else {
        return Ok((GAS, Bytes::new()));
    };
    let hash = Keccak256::digest(public_key_bytes);
    let mut output = [0u8; 32];
    #[allow(clippy::indexing_slicing)]
    output[12..].copy_from_slice(&hash[12..]);
    Ok((GAS, Bytes::copy_from_slice(&output)))
}
