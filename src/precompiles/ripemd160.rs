//! `0x03 RIPEMD160`: digest is 20 bytes, left-padded to a 32-byte word.

use super::require_gas;
use crate::errors::VMError;
use bytes::Bytes;
use ripemd::{Digest, Ripemd160};

const BASE: u64 = 600;
const PER_WORD: u64 = 120;

pub fn execute(input: &[u8], gas_limit: u64) -> Result<(u64, Bytes), VMError> {
    let words = u64::try_from(input.len()).unwrap_or(u64::MAX).div_ceil(32);
    let cost = BASE.saturating_add(PER_WORD.saturating_mul(words));
    require_gas(cost, gas_limit)?;
    let digest = Ripemd160::digest(input);
    let mut out = [0u8; 32];
    #[allow(clippy::indexing_slicing)]
    out[12..].copy_from_slice(&digest);
    Ok((cost, Bytes::copy_from_slice(&out)))
}
