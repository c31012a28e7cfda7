//! Fixed-width numeric and byte-container types shared by the rest of the crate.
//!
//! The concrete integers are re-exported from `ethereum_types` (the same
//! crate the teacher's common layer wraps); this module only adds the
//! EVM-flavoured operations `ethereum_types` doesn't provide out of the box:
//! wrapping modular exponentiation, bit length, two's-complement sign
//! handling and tolerant big-endian decoding.

pub use ethereum_types::{Address, H256, U256, U64};

/// 256-bit word width in bytes.
pub const WORD_SIZE: usize = 32;

/// Extension operations on [`U256`] needed by arithmetic/bitwise opcodes.
///
/// All arithmetic here is modulo 2^256 ("wrapping") unless the method name
/// says otherwise — this matches EVM semantics, where ADD/SUB/MUL never
/// trap on overflow.
pub trait U256Ext: Sized {
    fn wrapping_add_ext(self, rhs: Self) -> Self;
    fn wrapping_sub_ext(self, rhs: Self) -> Self;
    fn wrapping_mul_ext(self, rhs: Self) -> Self;

    /// `(self ^ exponent) mod modulus`, square-and-multiply. `modulus == 0`
    /// returns 0; `modulus == 1` returns 0 (everything is 0 mod 1).
    fn wrapping_pow_mod(self, exponent: Self, modulus: Self) -> Self;

    /// EVM DIV: division by zero returns zero instead of trapping.
    fn evm_div(self, rhs: Self) -> Self;
    /// EVM MOD: modulo by zero returns zero instead of trapping.
    fn evm_mod(self, rhs: Self) -> Self;

    /// Number of bits required to represent `self`; `bit_length(0) == 0`.
    fn bit_length(self) -> usize;

    /// Interpret `self` as a two's-complement signed 256-bit integer,
    /// returning `(magnitude, is_negative)` where `magnitude` is the
    /// unsigned absolute value.
    fn to_signed(self) -> (Self, bool);

    /// Signed division per EVM SDIV semantics (division by zero is zero;
    /// `MIN / -1 == MIN`, matching two's-complement wraparound).
    fn evm_sdiv(self, rhs: Self) -> Self;
    /// Signed modulo per EVM SMOD semantics (modulo by zero is zero).
    fn evm_smod(self, rhs: Self) -> Self;

    /// Big-endian decode that left-pads short inputs with zero and rejects
    /// (saturates/truncates from the left, EVM style) longer ones by
    /// reading only the trailing 32 bytes.
    fn from_be_slice_padded(bytes: &[u8]) -> Self;
}

impl U256Ext for U256 {
    fn wrapping_add_ext(self, rhs: Self) -> Self {
        self.overflowing_add(rhs).0
    }

    fn wrapping_sub_ext(self, rhs: Self) -> Self {
        self.overflowing_sub(rhs).0
    }

    fn wrapping_mul_ext(self, rhs: Self) -> Self {
        self.overflowing_mul(rhs).0
    }

    fn wrapping_pow_mod(self, mut exponent: Self, modulus: Self) -> Self {
        if modulus.is_zero() || modulus == U256::one() {
            return U256::zero();
        }
        let mut base = self % modulus;
        let mut result = U256::one();
        while !exponent.is_zero() {
            if exponent.bit(0) {
                result = result.wrapping_mul_ext(base) % modulus;
            }
            base = base.wrapping_mul_ext(base) % modulus;
            exponent >>= 1;
        }
        result
    }

    fn evm_div(self, rhs: Self) -> Self {
        if rhs.is_zero() {
            U256::zero()
        } else {
            self / rhs
        }
    }

    fn evm_mod(self, rhs: Self) -> Self {
        if rhs.is_zero() {
            U256::zero()
        } else {
            self % rhs
        }
    }

    fn bit_length(self) -> usize {
        self.bits()
    }

    fn to_signed(self) -> (Self, bool) {
        let is_negative = self.bit(255);
        if is_negative {
            (self.wrapping_sub_ext(U256::one()) ^ U256::MAX, true)
        } else {
            (self, false)
        }
    }

    fn evm_sdiv(self, rhs: Self) -> Self {
        if rhs.is_zero() {
            return U256::zero();
        }
        let (lhs_mag, lhs_neg) = self.to_signed();
        let (rhs_mag, rhs_neg) = rhs.to_signed();
        let quotient = lhs_mag / rhs_mag;
        if lhs_neg != rhs_neg {
            negate(quotient)
        } else {
            quotient
        }
    }

    fn evm_smod(self, rhs: Self) -> Self {
        if rhs.is_zero() {
            return U256::zero();
        }
        let (lhs_mag, lhs_neg) = self.to_signed();
        let (rhs_mag, _) = rhs.to_signed();
        let remainder = lhs_mag % rhs_mag;
        if lhs_neg {
            negate(remainder)
        } else {
            remainder
        }
    }

    fn from_be_slice_padded(bytes: &[u8]) -> Self {
        if bytes.len() >= WORD_SIZE {
            let start = bytes.len() - WORD_SIZE;
            #[allow(clippy::indexing_slicing)]
            return U256::from_big_endian(&bytes[start..]);
        }
        let mut buf = [0u8; WORD_SIZE];
        let offset = WORD_SIZE - bytes.len();
        #[allow(clippy::indexing_slicing)]
        buf[offset..].copy_from_slice(bytes);
        U256::from_big_endian(&buf)
    }
}

/// Two's-complement negation of an unsigned magnitude: `!x + 1`.
fn negate(x: U256) -> U256 {
    if x.is_zero() {
        x
    } else {
        (!x).wrapping_add_ext(U256::one())
    }
}

/// Truncate a 32-byte word to the low 20 bytes to obtain an [`Address`],
/// matching the EVM convention for stack values interpreted as addresses
/// (used by `BALANCE`, `EXTCODESIZE`, the call family, …).
pub fn word_to_address(word: U256) -> Address {
    let mut bytes = [0u8; WORD_SIZE];
    word.to_big_endian(&mut bytes);
    #[allow(clippy::indexing_slicing)]
    Address::from_slice(&bytes[12..])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bit_length_of_zero_is_zero() {
        assert_eq!(U256::zero().bit_length(), 0);
    }

    #[test]
    fn division_by_zero_is_zero() {
        assert_eq!(U256::from(10).evm_div(U256::zero()), U256::zero());
        assert_eq!(U256::from(10).evm_mod(U256::zero()), U256::zero());
    }

    #[test]
    fn wrapping_pow_mod_one_is_zero() {
        assert_eq!(U256::from(5).wrapping_pow_mod(U256::from(3), U256::one()), U256::zero());
    }

    #[test]
    fn sdiv_matches_two_complement_semantics() {
        // MAX == -1, MAX - 1 == -2; -2 / -1 == 2
        let a = U256::MAX - 1;
        let b = U256::MAX;
        assert_eq!(a.evm_sdiv(b), U256::from(2));
    }

    #[test]
    fn from_be_slice_padded_left_pads_short_input() {
        let value = U256::from_be_slice_padded(&[0x01, 0x02]);
        assert_eq!(value, U256::from(0x0102));
    }
}
