use super::{occupancy_fpr, slot, PairedKeyFilter};
use crate::hash::pair_hash;

/// Bloom filter holding both single keys and ordered key pairs in one bit array.
///
/// A pair `(a, b)` is stored under indices derived from combining the hash values of
/// `a` and `b` position by position, so `(a, b)` and `(b, a)` are distinct entries.
#[derive(Debug, Clone)]
pub struct PairedKeysBloomFilter {
    bits: Vec<u64>,
    num_bits: usize,
    num_hashes: usize,
}

impl PairedKeysBloomFilter {
    /// # Panics
    ///
    /// Panics if `num_hashes` is zero.
    #[must_use]
    pub fn new(num_bits: usize, num_hashes: usize) -> Self {
        assert!(num_hashes > 0, "a Bloom filter needs at least one hash");
        let num_words = num_bits.div_ceil(64).max(1);
        Self {
            bits: vec![0; num_words],
            num_bits: num_words * 64,
            num_hashes,
        }
    }

    #[must_use]
    pub fn num_bits(&self) -> usize {
        self.num_bits
    }

    fn single_indices(&self, key: &[u64]) -> Vec<usize> {
        debug_assert!(key.len() >= self.num_hashes, "too few hash values");
        key.iter()
            .take(self.num_hashes)
            .map(|&h| slot(h, self.num_bits))
            .collect()
    }

    fn pair_indices(&self, first: &[u64], second: &[u64]) -> Vec<usize> {
        debug_assert!(
            first.len() >= self.num_hashes && second.len() >= self.num_hashes,
            "too few hash values"
        );
        first
            .iter()
            .zip(second)
            .take(self.num_hashes)
            .map(|(&a, &b)| slot(pair_hash(a, b), self.num_bits))
            .collect()
    }

    fn set_all(&mut self, indices: &[usize]) {
        for &index in indices {
            self.bits[index / 64] |= 1u64 << (index % 64);
        }
    }

    fn all_set(&self, indices: &[usize]) -> bool {
        indices
            .iter()
            .all(|&index| self.bits[index / 64] & (1u64 << (index % 64)) != 0)
    }
}

impl PairedKeyFilter for PairedKeysBloomFilter {
    fn num_hashes(&self) -> usize {
        self.num_hashes
    }

    fn add_single(&mut self, key: &[u64]) {
        let indices = self.single_indices(key);
        self.set_all(&indices);
    }

    fn add_pair(&mut self, first: &[u64], second: &[u64]) {
        let indices = self.pair_indices(first, second);
        self.set_all(&indices);
    }

    fn test_single(&self, key: &[u64]) -> bool {
        self.all_set(&self.single_indices(key))
    }

    fn test_pair(&self, first: &[u64], second: &[u64]) -> bool {
        self.all_set(&self.pair_indices(first, second))
    }

    fn false_positive_rate(&self) -> f32 {
        let popcount = self.bits.iter().map(|w| w.count_ones() as usize).sum();
        occupancy_fpr(popcount, self.num_bits, self.num_hashes)
    }
}
