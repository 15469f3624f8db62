use super::{occupancy_fpr, slot, CountingFilter};

/// Counting Bloom filter with saturating 16-bit counters.
///
/// The estimate of a key is the minimum counter over its indices, so collisions can
/// only inflate it.
#[derive(Debug, Clone)]
pub struct CountingBloomFilter {
    counters: Vec<u16>,
    num_hashes: usize,
}

impl CountingBloomFilter {
    /// # Panics
    ///
    /// Panics if `num_counters` or `num_hashes` is zero.
    #[must_use]
    pub fn new(num_counters: usize, num_hashes: usize) -> Self {
        assert!(num_counters > 0, "a counting filter needs at least one counter");
        assert!(num_hashes > 0, "a counting filter needs at least one hash");
        Self {
            counters: vec![0; num_counters],
            num_hashes,
        }
    }

    #[must_use]
    pub fn num_counters(&self) -> usize {
        self.counters.len()
    }

    /// Number of non-zero counters
    #[must_use]
    pub fn occupied(&self) -> usize {
        self.counters.iter().filter(|&&c| c > 0).count()
    }

    fn indices(&self, hashes: &[u64]) -> Vec<usize> {
        debug_assert!(hashes.len() >= self.num_hashes, "too few hash values");
        hashes
            .iter()
            .take(self.num_hashes)
            .map(|&h| slot(h, self.counters.len()))
            .collect()
    }
}

impl CountingFilter for CountingBloomFilter {
    fn num_hashes(&self) -> usize {
        self.num_hashes
    }

    fn increment(&mut self, hashes: &[u64]) {
        let mut indices = self.indices(hashes);
        // A key whose indices collide must bump the shared counter only once
        indices.sort_unstable();
        indices.dedup();
        for index in indices {
            self.counters[index] = self.counters[index].saturating_add(1);
        }
    }

    fn estimate(&self, hashes: &[u64]) -> f32 {
        self.indices(hashes)
            .into_iter()
            .map(|index| self.counters[index])
            .min()
            .map_or(0.0, f32::from)
    }

    fn false_positive_rate(&self) -> f32 {
        occupancy_fpr(self.occupied(), self.counters.len(), self.num_hashes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::{KmerHasher, StrandedHasher};

    #[test]
    fn test_counts_are_monotone() {
        let hasher = StrandedHasher::new(9, 5);
        let mut cbf = CountingBloomFilter::new(4096, 3);
        let hashes = hasher.hash_values(b"ACGTT", 3);

        assert!(cbf.estimate(&hashes).abs() < f32::EPSILON);
        for expected in 1..=5u16 {
            cbf.increment(&hashes);
            assert!(cbf.estimate(&hashes) >= f32::from(expected));
        }
    }

    #[test]
    fn test_saturates() {
        let mut cbf = CountingBloomFilter::new(8, 1);
        for _ in 0..70_000 {
            cbf.increment(&[3]);
        }
        assert!((cbf.estimate(&[3]) - f32::from(u16::MAX)).abs() < f32::EPSILON);
    }

    #[test]
    fn test_occupancy() {
        let mut cbf = CountingBloomFilter::new(16, 2);
        cbf.increment(&[1, 2]);
        cbf.increment(&[1, 2]);
        assert_eq!(cbf.occupied(), 2);
        assert!((cbf.estimate(&[1, 2]) - 2.0).abs() < f32::EPSILON);
        assert!((cbf.false_positive_rate() - 0.015_625).abs() < 1e-6);
    }
}
