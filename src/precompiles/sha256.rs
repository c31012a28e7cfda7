//! `0x02 SHA256`.

use super::require_gas;
use crate::errors::VMError;
use bytes::Bytes;
use sha2::{Digest, Sha256};

const BASE: u64 = 60;
const PER_WORD: u64 = 12;

pub fn execute(input: &[u8], gas_limit: u64) -> Result<(u64, Bytes), VMError> {
    let words = u64::try_from(input.len()).unwrap_or(u64::MAX).div_ceil(32);
    let cost = BASE.saturating_add(PER_WORD.saturating_mul(words));
    require_gas(cost, gas_limit)?;
    let digest = Sha256::digest(input);
    Ok((cost, Bytes::copy_from_slice(&digest)))
}
