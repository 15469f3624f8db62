use serde::{Deserialize, Serialize};

/// Nucleotides in the fixed enumeration order used for every neighbor search
pub const NUCLEOTIDES: [u8; 4] = [b'A', b'C', b'G', b'T'];

/// Direction of a walk through the graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Towards predecessors (prepending bases)
    Left,
    /// Towards successors (appending bases)
    Right,
}

impl Direction {
    #[must_use]
    pub fn opposite(self) -> Self {
        match self {
            Self::Left => Self::Right,
            Self::Right => Self::Left,
        }
    }
}

/// A fixed-length nucleotide string, the atomic unit of the graph.
///
/// The bytes are stored as given (upper-case ACGT is expected); the graph's hash
/// function decides whether a k-mer and its reverse complement share storage.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Kmer(Vec<u8>);

impl Kmer {
    pub fn new(seq: impl Into<Vec<u8>>) -> Self {
        Self(seq.into())
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Leading k-1 bases
    #[must_use]
    pub fn prefix(&self) -> &[u8] {
        &self.0[..self.0.len().saturating_sub(1)]
    }

    /// Trailing k-1 bases
    #[must_use]
    pub fn suffix(&self) -> &[u8] {
        &self.0[self.0.len().min(1)..]
    }

    #[must_use]
    pub fn first_base(&self) -> Option<u8> {
        self.0.first().copied()
    }

    #[must_use]
    pub fn last_base(&self) -> Option<u8> {
        self.0.last().copied()
    }

    /// The k-mer obtained by dropping the first base and appending `base`
    #[must_use]
    pub fn successor(&self, base: u8) -> Self {
        let mut seq = Vec::with_capacity(self.0.len());
        seq.extend_from_slice(self.suffix());
        seq.push(base);
        Self(seq)
    }

    /// The k-mer obtained by dropping the last base and prepending `base`
    #[must_use]
    pub fn predecessor(&self, base: u8) -> Self {
        let mut seq = Vec::with_capacity(self.0.len());
        seq.push(base);
        seq.extend_from_slice(self.prefix());
        Self(seq)
    }

    /// The neighbor in `direction` formed with `base`
    #[must_use]
    pub fn extend(&self, direction: Direction, base: u8) -> Self {
        match direction {
            Direction::Left => self.predecessor(base),
            Direction::Right => self.successor(base),
        }
    }

    /// Same k-1 bases, different trailing base
    #[must_use]
    pub fn with_last_base(&self, base: u8) -> Self {
        let mut seq = self.0.clone();
        if let Some(last) = seq.last_mut() {
            *last = base;
        }
        Self(seq)
    }

    /// Same trailing k-1 bases, different leading base
    #[must_use]
    pub fn with_first_base(&self, base: u8) -> Self {
        let mut seq = self.0.clone();
        if let Some(first) = seq.first_mut() {
            *first = base;
        }
        Self(seq)
    }

    #[must_use]
    pub fn reverse_complement(&self) -> Self {
        Self(reverse_complement(&self.0))
    }
}

impl AsRef<[u8]> for Kmer {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<&str> for Kmer {
    fn from(s: &str) -> Self {
        Self(s.as_bytes().to_vec())
    }
}

impl From<&[u8]> for Kmer {
    fn from(s: &[u8]) -> Self {
        Self(s.to_vec())
    }
}

impl From<Vec<u8>> for Kmer {
    fn from(s: Vec<u8>) -> Self {
        Self(s)
    }
}

impl PartialEq<&str> for Kmer {
    fn eq(&self, other: &&str) -> bool {
        self.0 == other.as_bytes()
    }
}

impl std::fmt::Display for Kmer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.0))
    }
}

/// A k-mer paired with its gated coverage at the time it was looked up
#[derive(Debug, Clone, PartialEq)]
pub struct KmerNode {
    pub kmer: Kmer,
    pub coverage: f32,
}

impl KmerNode {
    pub fn new(kmer: impl Into<Kmer>, coverage: f32) -> Self {
        Self {
            kmer: kmer.into(),
            coverage,
        }
    }
}

/// Complement of a single base; anything outside ACGT maps to `N`
#[inline]
#[must_use]
pub const fn complement(base: u8) -> u8 {
    match base {
        b'A' | b'a' => b'T',
        b'C' | b'c' => b'G',
        b'G' | b'g' => b'C',
        b'T' | b't' | b'U' | b'u' => b'A',
        _ => b'N',
    }
}

#[must_use]
pub fn reverse_complement(seq: &[u8]) -> Vec<u8> {
    seq.iter().rev().map(|&b| complement(b)).collect()
}

/// True for upper-case A, C, G or T
#[inline]
#[must_use]
pub const fn is_nucleotide(base: u8) -> bool {
    matches!(base, b'A' | b'C' | b'G' | b'T')
}

/// All overlapping k-mers of `seq`, left to right. Empty when `seq` is shorter than k.
#[must_use]
pub fn kmerize(seq: &[u8], k: usize) -> Vec<Kmer> {
    if k == 0 || seq.len() < k {
        return Vec::new();
    }
    seq.windows(k).map(Kmer::from).collect()
}

#[must_use]
pub fn first_kmer(seq: &[u8], k: usize) -> Option<Kmer> {
    seq.get(..k).map(Kmer::from)
}

#[must_use]
pub fn last_kmer(seq: &[u8], k: usize) -> Option<Kmer> {
    seq.len()
        .checked_sub(k)
        .map(|start| Kmer::from(&seq[start..]))
}

/// Spell the sequence of a path of overlapping k-mers.
///
/// Returns an empty sequence for an empty path.
#[must_use]
pub fn assemble<K: AsRef<[u8]>>(kmers: &[K]) -> Vec<u8> {
    let Some(first) = kmers.first() else {
        return Vec::new();
    };
    let first = first.as_ref();
    let k = first.len();
    if k == 0 {
        return Vec::new();
    }

    let mut seq = Vec::with_capacity(k + kmers.len() - 1);
    seq.extend_from_slice(&first[..k - 1]);
    seq.extend(kmers.iter().map(|kmer| kmer.as_ref()[k - 1]));
    seq
}

/// Spell a path of nodes
#[must_use]
pub fn assemble_nodes(nodes: &[KmerNode]) -> Vec<u8> {
    let kmers: Vec<&[u8]> = nodes.iter().map(|n| n.kmer.as_bytes()).collect();
    assemble(&kmers)
}

/// Merge `left` and `right` on their longest suffix/prefix overlap of at least
/// `min_overlap` bases.
#[must_use]
pub fn overlap_maximally(left: &[u8], right: &[u8], min_overlap: usize) -> Option<Vec<u8>> {
    let max_overlap = left.len().min(right.len());
    if min_overlap == 0 || min_overlap > max_overlap {
        return None;
    }

    (min_overlap..=max_overlap)
        .rev()
        .find(|&len| left[left.len() - len..] == right[..len])
        .map(|len| {
            let mut merged = Vec::with_capacity(left.len() + right.len() - len);
            merged.extend_from_slice(left);
            merged.extend_from_slice(&right[len..]);
            merged
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_suffix() {
        let kmer = Kmer::from("ACGT");
        assert_eq!(kmer.prefix(), b"ACG");
        assert_eq!(kmer.suffix(), b"CGT");
        assert_eq!(kmer.successor(b'A'), "CGTA");
        assert_eq!(kmer.predecessor(b'T'), "TACG");
        assert_eq!(kmer.with_last_base(b'C'), "ACGC");
        assert_eq!(kmer.with_first_base(b'G'), "GCGT");
    }

    #[test]
    fn test_reverse_complement() {
        assert_eq!(reverse_complement(b"AACGT"), b"ACGTT".to_vec());
        assert_eq!(Kmer::from("ACG").reverse_complement(), "CGT");
        assert_eq!(reverse_complement(b"ANU"), b"ANT".to_vec());
    }

    #[test]
    fn test_kmerize_and_assemble() {
        let seq = b"ACGTACGTT";
        let kmers = kmerize(seq, 3);
        assert_eq!(kmers.len(), 7);
        assert_eq!(kmers[0], "ACG");
        assert_eq!(kmers[6], "GTT");
        assert_eq!(assemble(&kmers), seq.to_vec());

        assert!(kmerize(b"AC", 3).is_empty());
        assert!(assemble::<Kmer>(&[]).is_empty());
    }

    #[test]
    fn test_first_last_kmer() {
        assert_eq!(first_kmer(b"ACGTT", 3), Some(Kmer::from("ACG")));
        assert_eq!(last_kmer(b"ACGTT", 3), Some(Kmer::from("GTT")));
        assert_eq!(last_kmer(b"AC", 3), None);
    }

    #[test]
    fn test_overlap_maximally() {
        assert_eq!(
            overlap_maximally(b"AACCGG", b"CCGGTT", 3),
            Some(b"AACCGGTT".to_vec())
        );
        // Longest overlap wins
        assert_eq!(overlap_maximally(b"AAAA", b"AAAT", 2), Some(b"AAAAT".to_vec()));
        assert_eq!(overlap_maximally(b"AACC", b"GGTT", 1), None);
        assert_eq!(overlap_maximally(b"AC", b"CA", 3), None);
    }
}
