//! Deterministic multi-value hashing of k-mers.
//!
//! Every filter in the graph is addressed by the same vector of hash values, computed
//! once per k-mer by a [`KmerHasher`]. Two implementations share the contract:
//!
//! - [`StrandedHasher`]: hashes the k-mer as given
//! - [`CanonicalHasher`]: hashes the lexicographically smaller of the k-mer and its
//!   reverse complement, so both strands map to the same filter entries
//!
//! Values are derived by double hashing (`h1 + i * h2`) from a seeded 128-bit
//! MurmurHash3-style digest. They are stable across calls and processes for a fixed
//! seed and k.

use crate::core::kmer::complement;

/// Capability shared by the stranded and canonical hash functions
pub trait KmerHasher: Send + Sync {
    /// k-mer length this function was configured for
    fn k(&self) -> usize;

    /// `num_hashes` deterministic values for `kmer`
    fn hash_values(&self, kmer: &[u8], num_hashes: usize) -> Vec<u64>;

    /// Whether a k-mer and its reverse complement hash differently
    fn is_stranded(&self) -> bool {
        true
    }
}

const C1: u64 = 0x87c3_7b91_1142_53d5;
const C2: u64 = 0x4cf5_ad43_2745_937f;

#[inline]
fn fmix64(mut h: u64) -> u64 {
    h ^= h >> 33;
    h = h.wrapping_mul(0xff51_afd7_ed55_8ccd);
    h ^= h >> 33;
    h = h.wrapping_mul(0xc4ce_b9fe_1a85_ec53);
    h ^= h >> 33;
    h
}

/// Combine two 64-bit values into one; order matters.
#[inline]
#[must_use]
pub fn pair_hash(first: u64, second: u64) -> u64 {
    fmix64(fmix64(first) ^ second.rotate_left(31))
}

#[inline]
fn load_block(bytes: &[u8]) -> u64 {
    bytes
        .iter()
        .enumerate()
        .fold(0u64, |acc, (i, &b)| acc | (u64::from(b) << (8 * i)))
}

/// Seeded 128-bit digest of a byte string (MurmurHash3 x64 layout)
#[must_use]
pub fn digest128(data: &[u8], seed: u64) -> (u64, u64) {
    let mut h1 = seed;
    let mut h2 = seed;

    let mut blocks = data.chunks_exact(16);
    for block in &mut blocks {
        let mut k1 = load_block(&block[..8]);
        let mut k2 = load_block(&block[8..]);

        k1 = k1.wrapping_mul(C1).rotate_left(31).wrapping_mul(C2);
        h1 ^= k1;
        h1 = h1.rotate_left(27).wrapping_add(h2);
        h1 = h1.wrapping_mul(5).wrapping_add(0x52dc_e729);

        k2 = k2.wrapping_mul(C2).rotate_left(33).wrapping_mul(C1);
        h2 ^= k2;
        h2 = h2.rotate_left(31).wrapping_add(h1);
        h2 = h2.wrapping_mul(5).wrapping_add(0x3849_5ab5);
    }

    let tail = blocks.remainder();
    if tail.len() > 8 {
        let k2 = load_block(&tail[8..]);
        h2 ^= k2.wrapping_mul(C2).rotate_left(33).wrapping_mul(C1);
    }
    if !tail.is_empty() {
        let k1 = load_block(&tail[..tail.len().min(8)]);
        h1 ^= k1.wrapping_mul(C1).rotate_left(31).wrapping_mul(C2);
    }

    let len = data.len() as u64;
    h1 ^= len;
    h2 ^= len;
    h1 = h1.wrapping_add(h2);
    h2 = h2.wrapping_add(h1);
    h1 = fmix64(h1);
    h2 = fmix64(h2);
    h1 = h1.wrapping_add(h2);
    h2 = h2.wrapping_add(h1);

    (h1, h2)
}

/// Expand a digest into `num_hashes` values by double hashing
fn expand(digest: (u64, u64), num_hashes: usize) -> Vec<u64> {
    let (h1, h2) = digest;
    // An odd step never cycles early modulo a power of two
    let step = h2 | 1;
    (0..num_hashes as u64)
        .map(|i| h1.wrapping_add(i.wrapping_mul(step)))
        .collect()
}

/// Hashes k-mers exactly as given
#[derive(Debug, Clone)]
pub struct StrandedHasher {
    seed: u64,
    k: usize,
}

impl StrandedHasher {
    #[must_use]
    pub fn new(seed: u64, k: usize) -> Self {
        Self { seed, k }
    }
}

impl KmerHasher for StrandedHasher {
    fn k(&self) -> usize {
        self.k
    }

    fn hash_values(&self, kmer: &[u8], num_hashes: usize) -> Vec<u64> {
        debug_assert_eq!(kmer.len(), self.k, "k-mer length must equal k");
        expand(digest128(kmer, self.seed), num_hashes)
    }
}

/// Hashes the strand-invariant representative of a k-mer
#[derive(Debug, Clone)]
pub struct CanonicalHasher {
    seed: u64,
    k: usize,
}

impl CanonicalHasher {
    #[must_use]
    pub fn new(seed: u64, k: usize) -> Self {
        Self { seed, k }
    }
}

/// Whether the reverse complement of `kmer` sorts strictly before `kmer`
fn reverse_complement_is_smaller(kmer: &[u8]) -> bool {
    for (&fwd, &rev) in kmer.iter().zip(kmer.iter().rev()) {
        let rc = complement(rev);
        if rc != fwd {
            return rc < fwd;
        }
    }
    false
}

impl KmerHasher for CanonicalHasher {
    fn k(&self) -> usize {
        self.k
    }

    fn is_stranded(&self) -> bool {
        false
    }

    fn hash_values(&self, kmer: &[u8], num_hashes: usize) -> Vec<u64> {
        debug_assert_eq!(kmer.len(), self.k, "k-mer length must equal k");
        if reverse_complement_is_smaller(kmer) {
            let rc = crate::core::kmer::reverse_complement(kmer);
            expand(digest128(&rc, self.seed), num_hashes)
        } else {
            expand(digest128(kmer, self.seed), num_hashes)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::kmer::reverse_complement;

    #[test]
    fn test_deterministic() {
        let hasher = StrandedHasher::new(42, 5);
        let a = hasher.hash_values(b"ACGTA", 4);
        let b = hasher.hash_values(b"ACGTA", 4);
        assert_eq!(a.len(), 4);
        assert_eq!(a, b);

        // Fresh instance with the same seed agrees
        assert_eq!(StrandedHasher::new(42, 5).hash_values(b"ACGTA", 4), a);
    }

    #[test]
    fn test_seed_changes_values() {
        let a = StrandedHasher::new(1, 5).hash_values(b"ACGTA", 3);
        let b = StrandedHasher::new(2, 5).hash_values(b"ACGTA", 3);
        assert_ne!(a, b);
    }

    #[test]
    fn test_prefix_of_more_hashes() {
        let hasher = StrandedHasher::new(0, 4);
        let three = hasher.hash_values(b"GGCA", 3);
        let five = hasher.hash_values(b"GGCA", 5);
        assert_eq!(three[..], five[..3]);
    }

    #[test]
    fn test_stranded_distinguishes_strands() {
        let hasher = StrandedHasher::new(0, 4);
        assert_ne!(
            hasher.hash_values(b"AACG", 2),
            hasher.hash_values(&reverse_complement(b"AACG"), 2)
        );
    }

    #[test]
    fn test_canonical_strand_invariant() {
        let hasher = CanonicalHasher::new(11, 6);
        for kmer in [&b"AACGTG"[..], b"TTTTTT", b"ACGCGT", b"GATTAC"] {
            let rc = reverse_complement(kmer);
            assert_eq!(hasher.hash_values(kmer, 3), hasher.hash_values(&rc, 3));
        }
    }

    #[test]
    fn test_pair_hash_is_ordered() {
        assert_ne!(pair_hash(1, 2), pair_hash(2, 1));
        assert_eq!(pair_hash(5, 9), pair_hash(5, 9));
    }

    #[test]
    fn test_digest_handles_all_tail_lengths() {
        let data = b"ACGTACGTACGTACGTACGTACGTACGTACGTA";
        let digests: std::collections::HashSet<_> =
            (0..=data.len()).map(|n| digest128(&data[..n], 3)).collect();
        assert_eq!(digests.len(), data.len() + 1);
    }
}
