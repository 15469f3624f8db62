use super::{occupancy_fpr, slot, MembershipFilter};

/// Bit-array Bloom filter
#[derive(Debug, Clone)]
pub struct BloomFilter {
    bits: Vec<u64>,
    num_bits: usize,
    num_hashes: usize,
}

impl BloomFilter {
    /// Create a filter of `num_bits` bits (rounded up to a whole word, minimum 64)
    /// addressed by `num_hashes` hash values per key.
    ///
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

    /// Number of bits currently set
    #[must_use]
    pub fn popcount(&self) -> usize {
        self.bits.iter().map(|w| w.count_ones() as usize).sum()
    }

    pub fn clear(&mut self) {
        self.bits.fill(0);
    }

    #[inline]
    fn indices<'a>(&'a self, hashes: &'a [u64]) -> impl Iterator<Item = usize> + 'a {
        debug_assert!(hashes.len() >= self.num_hashes, "too few hash values");
        hashes
            .iter()
            .take(self.num_hashes)
            .map(move |&h| slot(h, self.num_bits))
    }
}

impl MembershipFilter for BloomFilter {
    fn num_hashes(&self) -> usize {
        self.num_hashes
    }

    fn insert(&mut self, hashes: &[u64]) {
        let indices: Vec<usize> = self.indices(hashes).collect();
        for index in indices {
            self.bits[index / 64] |= 1u64 << (index % 64);
        }
    }

    fn test(&self, hashes: &[u64]) -> bool {
        self.indices(hashes)
            .all(|index| self.bits[index / 64] & (1u64 << (index % 64)) != 0)
    }

    fn false_positive_rate(&self) -> f32 {
        occupancy_fpr(self.popcount(), self.num_bits, self.num_hashes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::{KmerHasher, StrandedHasher};

    #[test]
    fn test_no_false_negatives() {
        let hasher = StrandedHasher::new(0, 4);
        let mut bloom = BloomFilter::new(1024, 3);

        let keys: [&[u8]; 4] = [b"ACGT", b"TTGA", b"GGGC", b"CATG"];
        for key in keys {
            bloom.insert(&hasher.hash_values(key, 3));
        }
        for key in keys {
            assert!(bloom.test(&hasher.hash_values(key, 3)));
        }
    }

    #[test]
    fn test_empty_filter_rejects() {
        let hasher = StrandedHasher::new(0, 4);
        let bloom = BloomFilter::new(1024, 3);
        assert!(!bloom.test(&hasher.hash_values(b"ACGT", 3)));
        assert!(bloom.false_positive_rate().abs() < f32::EPSILON);
    }

    #[test]
    fn test_false_positive_rate_grows() {
        let hasher = StrandedHasher::new(0, 8);
        let mut bloom = BloomFilter::new(256, 2);
        bloom.insert(&hasher.hash_values(b"ACGTACGT", 2));
        let low = bloom.false_positive_rate();
        for seq in [&b"TTTTACGT"[..], b"GGGGACGT", b"CCCCACGT", b"ATATACGT"] {
            bloom.insert(&hasher.hash_values(seq, 2));
        }
        let high = bloom.false_positive_rate();
        assert!(low > 0.0);
        assert!(high >= low);
        assert!(high <= 1.0);
    }

    #[test]
    fn test_rounds_up_to_word() {
        let bloom = BloomFilter::new(65, 1);
        assert_eq!(bloom.num_bits(), 128);
        assert_eq!(BloomFilter::new(0, 1).num_bits(), 64);
    }
}
