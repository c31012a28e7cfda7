//! `0x04 IDENTITY`: returns its input unchanged.

use super::require_gas;
use crate::errors::VMError;
use bytes::Bytes;

const BASE: u64 = 15;
const PER_WORD: u64 = 3;

pub fn execute(input: &[u8], gas_limit: u64) -> Result<(u64, Bytes), VMError> {
    let words = u64::try_from(input.len()).unwrap_or(u64::MAX).div_ceil(32);
    let cost = BASE.saturating_add(PER_WORD.saturating_mul(words));
    require_gas(cost, gas_limit)?;
    Ok((cost, Bytes::copy_from_slice(input)))
}
