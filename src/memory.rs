//! Frame-local byte memory (spec §3, §4.3). Length is always a multiple of
//! 32 after expansion; growth is gas-metered by the caller via
//! `gas_cost::memory_expansion_cost`, never inside `Memory` itself, so the
//! same expansion formula is the single source of truth for both the
//! charged cost and the actual allocation.

use crate::primitives::WORD_SIZE;
use bytes::Bytes;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Memory {
    data: Vec<u8>,
}

impl Memory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Number of 32-byte words currently allocated.
    pub fn len_words(&self) -> usize {
        self.data.len() / WORD_SIZE
    }

    /// Grow the buffer to at least `new_len`, rounded up to a whole word.
    /// No-op if already large enough. Callers charge gas *before* calling
    /// this, using `gas_cost::memory_expansion_cost` on the same `new_len`.
    pub fn resize(&mut self, new_len: usize) {
        let words = new_len.div_ceil(WORD_SIZE);
        let target = words * WORD_SIZE;
        if target > self.data.len() {
            self.data.resize(target, 0);
        }
    }

    pub fn load32(&mut self, offset: usize) -> [u8; WORD_SIZE] {
        self.resize(offset.saturating_add(WORD_SIZE));
        let mut out = [0u8; WORD_SIZE];
        #[allow(clippy::indexing_slicing)]
        out.copy_from_slice(&self.data[offset..offset + WORD_SIZE]);
        out
    }

    pub fn store32(&mut self, offset: usize, value: [u8; WORD_SIZE]) {
        self.resize(offset.saturating_add(WORD_SIZE));
        #[allow(clippy::indexing_slicing)]
        self.data[offset..offset + WORD_SIZE].copy_from_slice(&value);
    }

    pub fn store_byte(&mut self, offset: usize, value: u8) {
        self.resize(offset.saturating_add(1));
        #[allow(clippy::indexing_slicing)]
        {
            self.data[offset] = value;
        }
    }

    pub fn load_range(&mut self, offset: usize, size: usize) -> Bytes {
        if size == 0 {
            return Bytes::new();
        }
        self.resize(offset.saturating_add(size));
        #[allow(clippy::indexing_slicing)]
        Bytes::copy_from_slice(&self.data[offset..offset + size])
    }

    pub fn store_range(&mut self, offset: usize, data: &[u8]) {
        if data.is_empty() {
            return;
        }
        self.resize(offset.saturating_add(data.len()));
        #[allow(clippy::indexing_slicing)]
        self.data[offset..offset + data.len()].copy_from_slice(data);
    }

    /// `MCOPY` / internal copies that may overlap (EIP-5656 requires
    /// overlap-safe semantics, like `memmove`).
    pub fn copy_within(&mut self, dest: usize, src: usize, size: usize) {
        if size == 0 {
            return;
        }
        let max_end = dest.max(src).saturating_add(size);
        self.resize(max_end);
        self.data.copy_within(src..src + size, dest);
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resize_rounds_up_to_a_whole_word() {
        let mut mem = Memory::new();
        mem.resize(1);
        assert_eq!(mem.len(), 32);
        mem.resize(33);
        assert_eq!(mem.len(), 64);
    }

    #[test]
    fn store_then_load_round_trips() {
        let mut mem = Memory::new();
        let mut word = [0u8; 32];
        word[31] = 0x2a;
        mem.store32(0, word);
        assert_eq!(mem.load32(0), word);
    }

    #[test]
    fn copy_within_handles_overlap_like_memmove() {
        let mut mem = Memory::new();
        mem.store_range(0, &[1, 2, 3, 4, 5, 6, 7, 8]);
        mem.copy_within(2, 0, 6);
        assert_eq!(&mem.as_slice()[0..8], &[1, 2, 1, 2, 3, 4, 5, 6]);
    }
}
