//! Receipts and the logs bloom filter (spec §4.7, §6). The bloom is plain
//! bit math over a keccak256 digest — `sha3` is already a direct dependency
//! for KECCAK256/CREATE2/EXTCODEHASH, so no new primitive crosses the
//! narrow-interface boundary here.

use crate::transaction::types::TxType;
use crate::vm::Log;
use sha3::{Digest, Keccak256};

pub type Bloom = [u8; 256];

pub fn empty_bloom() -> Bloom {
    [0u8; 256]
}

/// Sets the 3 bits the standard algorithm derives from `data`'s keccak256
/// digest: each of the first three 16-bit big-endian chunks, masked to 11
/// bits, names one of the 2048 bits.
fn set_bits(bloom: &mut Bloom, data: &[u8]) {
    let hash = Keccak256::digest(data);
    for pair in 0..3 {
        #[allow(clippy::indexing_slicing)]
        let chunk = [hash[pair * 2], hash[pair * 2 + 1]];
        let bit = u16::from_be_bytes(chunk) & 0x07ff;
        let byte_index = 255usize.saturating_sub(usize::from(bit / 8));
        let bit_index = bit % 8;
        #[allow(clippy::indexing_slicing)]
        {
            bloom[byte_index] |= 1u8 << bit_index;
        }
    }
}

pub fn add_log(bloom: &mut Bloom, log: &Log) {
    set_bits(bloom, log.address.as_bytes());
    for topic in &log.topics {
        set_bits(bloom, topic.as_bytes());
    }
}

pub fn logs_bloom(logs: &[Log]) -> Bloom {
    let mut bloom = empty_bloom();
    for log in logs {
        add_log(&mut bloom, log);
    }
    bloom
}

/// One transaction's execution result (spec §4.7, §4.8): whether it
/// succeeded, gas accounting, its logs and their bloom.
#[derive(Debug, Clone)]
pub struct Receipt {
    pub tx_type: TxType,
    pub succeeded: bool,
    pub cumulative_gas_used: u64,
    pub bloom: Bloom,
    pub logs: Vec<Log>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::{Address, H256};

    #[test]
    fn bloom_of_no_logs_is_empty() {
        assert_eq!(logs_bloom(&[]), empty_bloom());
    }

    #[test]
    fn bloom_of_a_log_sets_at_least_one_bit() {
        let log = Log { address: Address::from_low_u64_be(1), topics: vec![H256::zero()], data: Default::default() };
        let bloom = logs_bloom(&[log]);
        assert!(bloom.iter().any(|byte| *byte != 0));
    }
}
