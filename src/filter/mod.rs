//! Probabilistic filters addressed by precomputed hash values.
//!
//! The k-mer graph composes three independent capabilities:
//!
//! - [`MembershipFilter`]: approximate set membership
//! - [`CountingFilter`]: approximate multiplicity
//! - [`PairedKeyFilter`]: approximate membership of keys and ordered key pairs
//!
//! All filters are one-sided: an inserted key is never reported absent, while an
//! absent key may be reported present with probability
//! [`false_positive_rate`](MembershipFilter::false_positive_rate). Hash values are
//! computed once by a [`KmerHasher`](crate::hash::KmerHasher) and shared between
//! filters; each filter reads as many values as it was configured for.
//!
//! Population is not internally synchronized. Callers that fill a filter from
//! several threads must serialize writes themselves.

pub mod bloom;
pub mod counting;
pub mod paired;

pub use bloom::BloomFilter;
pub use counting::CountingBloomFilter;
pub use paired::PairedKeysBloomFilter;

/// Approximate set membership
pub trait MembershipFilter {
    /// Number of hash values read per key
    fn num_hashes(&self) -> usize;

    fn insert(&mut self, hashes: &[u64]);

    /// `false` means definitely absent
    fn test(&self, hashes: &[u64]) -> bool;

    /// Estimated probability that an absent key tests present, in `[0, 1]`
    fn false_positive_rate(&self) -> f32;
}

/// Approximate multiplicity counting
pub trait CountingFilter {
    /// Number of hash values read per key
    fn num_hashes(&self) -> usize;

    fn increment(&mut self, hashes: &[u64]);

    /// Never less than the true insert count, except where counters saturate
    fn estimate(&self, hashes: &[u64]) -> f32;

    fn false_positive_rate(&self) -> f32;
}

/// Approximate membership of single keys and ordered key pairs
pub trait PairedKeyFilter {
    /// Number of hash values read per key
    fn num_hashes(&self) -> usize;

    fn add_single(&mut self, key: &[u64]);

    fn add_pair(&mut self, first: &[u64], second: &[u64]);

    fn test_single(&self, key: &[u64]) -> bool;

    fn test_pair(&self, first: &[u64], second: &[u64]) -> bool;

    /// Both keys and the ordered pair are present
    fn test_single_and_pair(&self, first: &[u64], second: &[u64]) -> bool {
        self.test_single(first) && self.test_single(second) && self.test_pair(first, second)
    }

    fn false_positive_rate(&self) -> f32;
}

/// Map a hash value onto `0..num_slots`
#[inline]
pub(crate) fn slot(hash: u64, num_slots: usize) -> usize {
    #[allow(clippy::cast_possible_truncation)]
    {
        (hash % num_slots as u64) as usize
    }
}

/// `(occupied / total) ^ num_hashes`, the chance that all indices of an absent key
/// land on occupied slots.
#[inline]
pub(crate) fn occupancy_fpr(occupied: usize, total: usize, num_hashes: usize) -> f32 {
    if total == 0 {
        return 1.0;
    }
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
    {
        let fraction = occupied as f64 / total as f64;
        fraction.powi(i32::try_from(num_hashes).unwrap_or(i32::MAX)) as f32
    }
}
