//! Fixed-width 2-bit nucleotide codec.
//!
//! Bases are ranked A=0, C=1, G=2, T=3 and packed 32 to a `u64` word, base `i`
//! occupying bits `2*(i % 32)..2*(i % 32) + 2` of word `i / 32`. Any character outside
//! ACGT/U is replaced by a uniformly random base, so encoding such input is not
//! deterministic unless a seeded random source is supplied.

use rand::Rng;

/// Fraction of a k-mer that a single base or short repeat may occupy before the
/// k-mer is considered low complexity.
pub const LOW_COMPLEXITY_THRESHOLD: f32 = 0.87;

const BASES_PER_WORD: usize = 32;

/// A fixed-length, 2-bit packed nucleotide string
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PackedKmer {
    words: Vec<u64>,
    len: usize,
}

impl PackedKmer {
    /// An all-`A` packed string of `len` bases
    #[must_use]
    pub fn zeroed(len: usize) -> Self {
        Self {
            words: vec![0; len.div_ceil(BASES_PER_WORD)],
            len,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Rank (0..4) of the base at `index`
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds.
    #[inline]
    #[must_use]
    pub fn rank(&self, index: usize) -> u8 {
        assert!(index < self.len, "base index {index} out of bounds for length {}", self.len);
        let shift = 2 * (index % BASES_PER_WORD);
        ((self.words[index / BASES_PER_WORD] >> shift) & 0b11) as u8
    }

    /// Store `rank` (0..4) at `index`
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds.
    #[inline]
    pub fn set_rank(&mut self, index: usize, rank: u8) {
        assert!(index < self.len, "base index {index} out of bounds for length {}", self.len);
        let shift = 2 * (index % BASES_PER_WORD);
        let word = &mut self.words[index / BASES_PER_WORD];
        *word = (*word & !(0b11 << shift)) | (u64::from(rank & 0b11) << shift);
    }
}

/// Rank of a nucleotide, `None` for anything outside ACGT/U
#[inline]
#[must_use]
pub const fn base_to_rank(base: u8) -> Option<u8> {
    match base {
        b'A' | b'a' => Some(0),
        b'C' | b'c' => Some(1),
        b'G' | b'g' => Some(2),
        b'T' | b't' | b'U' | b'u' => Some(3),
        _ => None,
    }
}

/// Upper-case nucleotide for a rank; `T` or `U` for rank 3 depending on `use_uracil`
#[inline]
#[must_use]
pub const fn rank_to_base(rank: u8, use_uracil: bool) -> u8 {
    match rank & 0b11 {
        0 => b'A',
        1 => b'C',
        2 => b'G',
        _ => {
            if use_uracil {
                b'U'
            } else {
                b'T'
            }
        }
    }
}

/// Pack a sequence of any length, drawing replacements for non-nucleotides from `rng`
pub fn pack_sequence_with_rng<R: Rng + ?Sized>(seq: &[u8], rng: &mut R) -> PackedKmer {
    let mut packed = PackedKmer::zeroed(seq.len());
    for (i, &base) in seq.iter().enumerate() {
        let rank = base_to_rank(base).unwrap_or_else(|| rng.gen_range(0..4));
        packed.set_rank(i, rank);
    }
    packed
}

/// Pack a sequence of any length using the thread-local random source for
/// non-nucleotides
#[must_use]
pub fn pack_sequence(seq: &[u8]) -> PackedKmer {
    pack_sequence_with_rng(seq, &mut rand::thread_rng())
}

/// Unpack the first `len` bases of `bits`
#[must_use]
pub fn unpack_sequence(bits: &PackedKmer, len: usize, use_uracil: bool) -> Vec<u8> {
    (0..len.min(bits.len()))
        .map(|i| rank_to_base(bits.rank(i), use_uracil))
        .collect()
}

/// Codec for k-mers of one fixed length, carrying the low-complexity thresholds for
/// that length.
#[derive(Debug, Clone)]
pub struct KmerCodec {
    k: usize,
    t1: usize,
    t2: usize,
    t3: usize,
}

/// Round a base count scaled by the low-complexity threshold
#[inline]
fn scaled_threshold(count: usize) -> usize {
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    {
        (count as f32 * LOW_COMPLEXITY_THRESHOLD).round() as usize
    }
}

impl KmerCodec {
    /// # Panics
    ///
    /// Panics if `k` is zero.
    #[must_use]
    pub fn new(k: usize) -> Self {
        assert!(k > 0, "k must be at least 1");
        // Window counts are scaled from whole window lengths, so k/2 and k/3 truncate.
        Self {
            k,
            t1: scaled_threshold(k),
            t2: scaled_threshold(k / 2),
            t3: scaled_threshold(k / 3),
        }
    }

    #[must_use]
    pub fn k(&self) -> usize {
        self.k
    }

    /// Thresholds for single bases, 2-mers and 3-mers
    #[must_use]
    pub fn thresholds(&self) -> (usize, usize, usize) {
        (self.t1, self.t2, self.t3)
    }

    /// # Panics
    ///
    /// Panics if `kmer` is not exactly k bases long.
    #[must_use]
    pub fn encode(&self, kmer: &[u8]) -> PackedKmer {
        self.encode_with_rng(kmer, &mut rand::thread_rng())
    }

    /// Encode with an explicit random source for non-nucleotide characters
    ///
    /// # Panics
    ///
    /// Panics if `kmer` is not exactly k bases long.
    pub fn encode_with_rng<R: Rng + ?Sized>(&self, kmer: &[u8], rng: &mut R) -> PackedKmer {
        assert_eq!(kmer.len(), self.k, "k-mer length must equal k");
        pack_sequence_with_rng(kmer, rng)
    }

    #[must_use]
    pub fn decode(&self, bits: &PackedKmer) -> Vec<u8> {
        unpack_sequence(bits, self.k, false)
    }

    #[must_use]
    pub fn base(&self, bits: &PackedKmer, index: usize) -> u8 {
        rank_to_base(bits.rank(index), false)
    }

    /// # Panics
    ///
    /// Panics if `base` is not a nucleotide or `index` is out of bounds.
    pub fn set_base(&self, bits: &mut PackedKmer, index: usize, base: u8) {
        let rank = base_to_rank(base).unwrap_or_else(|| panic!("invalid nucleotide: {}", base as char));
        bits.set_rank(index, rank);
    }

    #[must_use]
    pub fn first_base(&self, bits: &PackedKmer) -> u8 {
        self.base(bits, 0)
    }

    #[must_use]
    pub fn last_base(&self, bits: &PackedKmer) -> u8 {
        self.base(bits, self.k - 1)
    }

    pub fn set_first_base(&self, bits: &mut PackedKmer, base: u8) {
        self.set_base(bits, 0, base);
    }

    pub fn set_last_base(&self, bits: &mut PackedKmer, base: u8) {
        self.set_base(bits, self.k - 1, base);
    }

    /// Drop the leading base; the vacated trailing slot reads as `A`
    #[must_use]
    pub fn shift_left(&self, bits: &PackedKmer) -> PackedKmer {
        let mut shifted = PackedKmer::zeroed(self.k);
        for i in 1..self.k {
            shifted.set_rank(i - 1, bits.rank(i));
        }
        shifted
    }

    /// Drop the trailing base; the vacated leading slot reads as `A`
    #[must_use]
    pub fn shift_right(&self, bits: &PackedKmer) -> PackedKmer {
        let mut shifted = PackedKmer::zeroed(self.k);
        for i in 1..self.k {
            shifted.set_rank(i, bits.rank(i - 1));
        }
        shifted
    }

    /// Frequency analysis of single bases, 2-mers and 3-mers without decoding.
    ///
    /// Flags the k-mer when a base occurs at least `t1` times, when two distinct bases
    /// together occur more than `t1` times, when a 2-mer occurs at least `t2` times, or
    /// when a 3-mer occurs at least `t3` times.
    #[must_use]
    pub fn is_low_complexity(&self, bits: &PackedKmer) -> bool {
        let mut nf1 = [0usize; 4];
        let mut nf2 = [[0usize; 4]; 4];
        let mut nf3 = [[[0usize; 4]; 4]; 4];

        let len = self.k.min(bits.len());
        for i in 0..len {
            let c1 = usize::from(bits.rank(i));
            nf1[c1] += 1;
            if i >= 1 {
                let c2 = usize::from(bits.rank(i - 1));
                nf2[c2][c1] += 1;
                if i >= 2 {
                    let c3 = usize::from(bits.rank(i - 2));
                    nf3[c3][c2][c1] += 1;
                }
            }
        }

        // homopolymer content
        if nf1.iter().any(|&n| n >= self.t1) {
            return true;
        }

        // two-base content
        for a in 0..4 {
            for b in (a + 1)..4 {
                if nf1[a] + nf1[b] > self.t1 {
                    return true;
                }
            }
        }

        // dinucleotide repeats
        if nf2.iter().flatten().any(|&n| n >= self.t2) {
            return true;
        }

        // trinucleotide repeats
        nf3.iter().flatten().flatten().any(|&n| n >= self.t3)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_round_trip() {
        let codec = KmerCodec::new(10);
        let bits = codec.encode(b"ACGTTGCAAC");
        assert_eq!(codec.decode(&bits), b"ACGTTGCAAC".to_vec());
    }

    #[test]
    fn test_round_trip_long_sequence() {
        let seq = b"CACGAGACCTCTCTACATCTCGTATGCCGTCTTCTGCTTGAAAAAAAAAAGGCAGCTCCCAGATGGGTCTTG";
        let bits = pack_sequence(seq);
        assert_eq!(bits.len(), seq.len());
        assert_eq!(unpack_sequence(&bits, seq.len(), false), seq.to_vec());
    }

    #[test]
    fn test_uracil() {
        let bits = pack_sequence(b"ACGU");
        assert_eq!(unpack_sequence(&bits, 4, false), b"ACGT".to_vec());
        assert_eq!(unpack_sequence(&bits, 4, true), b"ACGU".to_vec());
    }

    #[test]
    fn test_non_nucleotide_is_random_base() {
        let mut rng = StdRng::seed_from_u64(7);
        let codec = KmerCodec::new(4);
        let bits = codec.encode_with_rng(b"ANGT", &mut rng);
        let decoded = codec.decode(&bits);
        assert_eq!(decoded[0], b'A');
        assert!(b"ACGT".contains(&decoded[1]));
        assert_eq!(&decoded[2..], b"GT");

        // Same seed, same replacement
        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(codec.encode_with_rng(b"ANGT", &mut rng), bits);
    }

    #[test]
    fn test_positional_access() {
        let codec = KmerCodec::new(5);
        let mut bits = codec.encode(b"ACGTA");
        assert_eq!(codec.first_base(&bits), b'A');
        assert_eq!(codec.last_base(&bits), b'A');
        assert_eq!(codec.base(&bits, 2), b'G');

        codec.set_first_base(&mut bits, b'T');
        codec.set_last_base(&mut bits, b'C');
        codec.set_base(&mut bits, 2, b'A');
        assert_eq!(codec.decode(&bits), b"TCATC".to_vec());
    }

    #[test]
    fn test_shifts() {
        let codec = KmerCodec::new(5);
        let bits = codec.encode(b"CGTTG");

        let left = codec.shift_left(&bits);
        assert_eq!(codec.decode(&left), b"GTTGA".to_vec());

        let right = codec.shift_right(&bits);
        assert_eq!(codec.decode(&right), b"ACGTT".to_vec());

        // Rolling window: shift then fill the vacated base
        let mut rolled = codec.shift_left(&bits);
        codec.set_last_base(&mut rolled, b'C');
        assert_eq!(codec.decode(&rolled), b"GTTGC".to_vec());
    }

    #[test]
    fn test_thresholds() {
        let codec = KmerCodec::new(10);
        assert_eq!(codec.thresholds(), (9, 4, 3));
    }

    #[test]
    fn test_low_complexity() {
        let codec = KmerCodec::new(10);
        assert!(codec.is_low_complexity(&codec.encode(b"AAAAAAAAAA")));
        assert!(!codec.is_low_complexity(&codec.encode(b"ACGTACGTAC")));
        // Dinucleotide repeat
        assert!(codec.is_low_complexity(&codec.encode(b"ATATATATAT")));
        // Trinucleotide repeat
        assert!(codec.is_low_complexity(&codec.encode(b"CAGCAGCAGC")));
    }

    #[test]
    fn test_low_complexity_two_base_content() {
        let codec = KmerCodec::new(20);
        // Only A and G, no long homopolymer and no dominating 2-mer or 3-mer
        let bits = codec.encode(b"AAGGAGAAGGGAGGAAAGAG");
        assert!(codec.is_low_complexity(&bits));
    }
}
