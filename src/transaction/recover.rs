//! ECDSA sender/authority recovery (spec §6: "secp256k1 sign/recover/
//! public-key-to-address" consumed as a narrow interface). Same recovery
//! primitive the `ECRECOVER` precompile uses
//! ([`crate::precompiles`]'s `ecrecover` module), reused here because a
//! transaction's sender and an EIP-7702 authorization's authority are both
//! "recover an address from `(hash, recovery_id, r, s)`".

use crate::primitives::{Address, H256, U256};
use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};
use sha3::{Digest, Keccak256};

/// Recovers the address whose key produced `(r, s)` over `hash`, or `None`
/// if the signature is malformed or does not recover. `y_parity` is the
/// 0/1 recovery id for typed transactions and EIP-7702 authorizations; a
/// legacy `v` is translated to it by the caller first (EIP-155 aware).
pub fn recover_address(hash: H256, y_parity: u8, r: U256, s: U256) -> Option<Address> {
    let recovery_id = RecoveryId::try_from(y_parity).ok()?;
    let mut r_bytes = [0u8; 32];
    let mut s_bytes = [0u8; 32];
    r.to_big_endian(&mut r_bytes);
    s.to_big_endian(&mut s_bytes);
    let signature = Signature::from_scalars(r_bytes, s_bytes).ok()?;
    let verifying_key =
        VerifyingKey::recover_from_prehash(hash.as_bytes(), &signature, recovery_id).ok()?;

    let uncompressed = verifying_key.to_encoded_point(false);
    let public_key_bytes = uncompressed.as_bytes().get(1..)?;
    let digest = Keccak256::digest(public_key_bytes);
    Some(Address::from_slice(digest.get(12..)?))
}

/// Legacy `v` to a 0/1 recovery id. Pre-EIP-155: `v - 27`. Post-EIP-155:
/// `v - (chain_id * 2 + 35)`. Returns `None` for a `v` that fits neither
/// scheme.
pub fn legacy_v_to_y_parity(v: u64, chain_id: Option<u64>) -> Option<u8> {
    if v == 27 || v == 28 {
        return u8::try_from(v - 27).ok();
    }
    let chain_id = chain_id?;
    let offset = chain_id.checked_mul(2)?.checked_add(35)?;
    let parity = v.checked_sub(offset)?;
    u8::try_from(parity).ok().filter(|p| *p <= 1)
}
