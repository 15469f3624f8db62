use tracing::debug;

use crate::core::kmer::{is_nucleotide, kmerize, Direction, Kmer, KmerNode, NUCLEOTIDES};
use crate::filter::{
    BloomFilter, CountingBloomFilter, CountingFilter, MembershipFilter, PairedKeyFilter,
    PairedKeysBloomFilter,
};
use crate::graph::config::{GraphConfig, GraphError};
use crate::graph::coverage::{median_coverage, window_of_max_median_coverage};
use crate::hash::{CanonicalHasher, KmerHasher, StrandedHasher};

/// A de Bruijn graph whose nodes live only in probabilistic filters.
///
/// Edges are never stored: `u -> v` exists when v is `u` shifted by one base, v tests
/// present in the membership filter and v's gated coverage is positive. Coverage is
/// read from the counting filter only when the membership filter also reports the
/// k-mer, which suppresses counting-filter-only false positives.
///
/// The graph is built in one or more write passes and then queried read-only.
pub struct KmerGraph<M = BloomFilter, C = CountingBloomFilter, P = PairedKeysBloomFilter> {
    hasher: Box<dyn KmerHasher>,
    membership: M,
    counting: C,
    paired: Option<P>,
    num_hashes: usize,
    paired_distance: usize,
    paired_sizing: (usize, usize),
}

impl KmerGraph {
    /// Allocate the membership and counting filters described by `config`.
    /// The paired k-mers filter is allocated later by
    /// [`initialize_paired_kmers_filter`](Self::initialize_paired_kmers_filter).
    ///
    /// # Errors
    ///
    /// Returns the first validation error of `config`.
    pub fn new(config: &GraphConfig) -> Result<Self, GraphError> {
        config.validate()?;

        let hasher: Box<dyn KmerHasher> = if config.stranded {
            Box::new(StrandedHasher::new(config.seed, config.k))
        } else {
            Box::new(CanonicalHasher::new(config.seed, config.k))
        };

        debug!(
            k = config.k,
            stranded = config.stranded,
            membership_bits = config.membership_bits,
            counting_slots = config.counting_slots,
            "Allocating k-mer graph filters"
        );

        let mut graph = Self::from_parts(
            hasher,
            BloomFilter::new(config.membership_bits, config.membership_hashes),
            CountingBloomFilter::new(config.counting_slots, config.counting_hashes),
        );
        graph.paired_distance = config.paired_distance;
        graph.paired_sizing = (config.paired_bits, config.paired_hashes);
        Ok(graph)
    }

    /// Allocate an empty paired k-mers filter sized by the graph's configuration,
    /// discarding any previous one.
    pub fn initialize_paired_kmers_filter(&mut self) {
        let (bits, hashes) = self.paired_sizing;
        debug!(bits, hashes, distance = self.paired_distance, "Allocating paired k-mers filter");
        self.set_paired_filter(PairedKeysBloomFilter::new(bits, hashes));
    }
}

impl<M, C, P> KmerGraph<M, C, P>
where
    M: MembershipFilter,
    C: CountingFilter,
    P: PairedKeyFilter,
{
    /// Compose a graph from an existing hash function and filters
    pub fn from_parts(hasher: Box<dyn KmerHasher>, membership: M, counting: C) -> Self {
        let num_hashes = membership.num_hashes().max(counting.num_hashes());
        Self {
            hasher,
            membership,
            counting,
            paired: None,
            num_hashes,
            paired_distance: 1,
            paired_sizing: (0, 0),
        }
    }

    /// Install a paired k-mers filter, widening the hash vector to the number of values it reads.
    ///
    /// Hash values are a stable prefix sequence, so earlier insertions stay valid.
    pub fn set_paired_filter(&mut self, filter: P) {
        self.num_hashes = self.num_hashes.max(filter.num_hashes());
        self.paired = Some(filter);
    }

    #[must_use]
    pub fn k(&self) -> usize {
        self.hasher.k()
    }

    /// Whether the two strands of a k-mer are stored separately
    #[must_use]
    pub fn is_stranded(&self) -> bool {
        self.hasher.is_stranded()
    }

    #[must_use]
    pub fn paired_kmer_distance(&self) -> usize {
        self.paired_distance
    }

    /// # Errors
    ///
    /// Returns `GraphError::InvalidPairedDistance` for a zero distance.
    pub fn set_paired_kmer_distance(&mut self, distance: usize) -> Result<(), GraphError> {
        if distance == 0 {
            return Err(GraphError::InvalidPairedDistance(distance));
        }
        self.paired_distance = distance;
        Ok(())
    }

    #[must_use]
    pub fn has_paired_filter(&self) -> bool {
        self.paired.is_some()
    }

    fn hash(&self, kmer: &[u8]) -> Vec<u64> {
        debug_assert_eq!(kmer.len(), self.k(), "k-mer length must equal k");
        self.hasher.hash_values(kmer, self.num_hashes)
    }

    fn gated_count(&self, hashes: &[u64]) -> f32 {
        if self.membership.test(hashes) {
            self.counting.estimate(hashes)
        } else {
            0.0
        }
    }

    // ---- build phase ----

    /// Insert one k-mer into the membership and counting filters
    pub fn add(&mut self, kmer: impl AsRef<[u8]>) {
        let hashes = self.hash(kmer.as_ref());
        self.membership.insert(&hashes);
        self.counting.increment(&hashes);
    }

    /// Insert every k-mer of `seq`; windows containing a non-ACGT base are skipped.
    /// Returns the number of k-mers inserted.
    pub fn add_all_from_sequence(&mut self, seq: &[u8]) -> usize {
        let mut added = 0;
        for window in self.valid_windows(seq).into_iter().flatten() {
            self.add(window);
            added += 1;
        }
        added
    }

    /// Every k-length window of `seq`, `None` where it holds a non-ACGT base
    fn valid_windows<'s>(&self, seq: &'s [u8]) -> Vec<Option<&'s [u8]>> {
        let k = self.k();
        if seq.len() < k {
            return Vec::new();
        }
        seq.windows(k)
            .map(|window| window.iter().all(|&b| is_nucleotide(b)).then_some(window))
            .collect()
    }

    fn paired_filter_mut(&mut self) -> Result<&mut P, GraphError> {
        self.paired.as_mut().ok_or(GraphError::PairedFilterNotInitialized)
    }

    /// Record every k-mer of `seq` as fragment-supported, skipping windows with a
    /// non-ACGT base
    ///
    /// # Errors
    ///
    /// Returns `GraphError::PairedFilterNotInitialized` if no paired filter exists.
    pub fn add_fragment_kmers(&mut self, seq: &[u8]) -> Result<(), GraphError> {
        let hashes: Vec<Vec<u64>> = self
            .valid_windows(seq)
            .into_iter()
            .flatten()
            .map(|kmer| self.hash(kmer))
            .collect();
        let filter = self.paired_filter_mut()?;
        for h in &hashes {
            filter.add_single(h);
        }
        Ok(())
    }

    /// Record every k-mer of `seq` as fragment-supported, and every ordered pair of
    /// k-mers exactly `paired_kmer_distance` positions apart. Windows with a non-ACGT
    /// base are skipped, along with any pair they would take part in.
    ///
    /// # Errors
    ///
    /// Returns `GraphError::PairedFilterNotInitialized` if no paired filter exists.
    pub fn add_paired_kmers(&mut self, seq: &[u8]) -> Result<(), GraphError> {
        let distance = self.paired_distance;
        // positions are kept so pairs never bridge a skipped window
        let hashes: Vec<Option<Vec<u64>>> = self
            .valid_windows(seq)
            .into_iter()
            .map(|window| window.map(|kmer| self.hash(kmer)))
            .collect();
        let filter = self.paired_filter_mut()?;
        for h in hashes.iter().flatten() {
            filter.add_single(h);
        }
        for (first, second) in hashes.iter().zip(hashes.iter().skip(distance)) {
            if let (Some(first), Some(second)) = (first, second) {
                filter.add_pair(first, second);
            }
        }
        Ok(())
    }

    // ---- queries ----

    /// Whether `kmer` tests present in the fragment filter; `false` without one
    #[must_use]
    pub fn lookup_fragment_kmer(&self, kmer: impl AsRef<[u8]>) -> bool {
        self.paired
            .as_ref()
            .is_some_and(|filter| filter.test_single(&self.hash(kmer.as_ref())))
    }

    /// Whether both k-mers and the ordered pair `(first, second)` test present;
    /// `false` without a paired filter
    #[must_use]
    pub fn lookup_paired_kmers(&self, first: impl AsRef<[u8]>, second: impl AsRef<[u8]>) -> bool {
        self.paired.as_ref().is_some_and(|filter| {
            filter.test_single_and_pair(&self.hash(first.as_ref()), &self.hash(second.as_ref()))
        })
    }

    #[must_use]
    pub fn contains(&self, kmer: impl AsRef<[u8]>) -> bool {
        self.membership.test(&self.hash(kmer.as_ref()))
    }

    /// Gated coverage: the counting estimate if the k-mer is a member, otherwise 0
    #[must_use]
    pub fn count(&self, kmer: impl AsRef<[u8]>) -> f32 {
        self.gated_count(&self.hash(kmer.as_ref()))
    }

    #[must_use]
    pub fn node(&self, kmer: &Kmer) -> KmerNode {
        KmerNode::new(kmer.clone(), self.count(kmer))
    }

    /// Neighbors in `direction`, trying A, C, G, T in order and keeping members with
    /// positive gated coverage.
    #[must_use]
    pub fn neighbors(&self, kmer: &Kmer, direction: Direction) -> Vec<KmerNode> {
        NUCLEOTIDES
            .iter()
            .filter_map(|&base| {
                let candidate = kmer.extend(direction, base);
                let coverage = self.count(&candidate);
                (coverage > 0.0).then(|| KmerNode::new(candidate, coverage))
            })
            .collect()
    }

    #[must_use]
    pub fn successors(&self, kmer: &Kmer) -> Vec<KmerNode> {
        self.neighbors(kmer, Direction::Right)
    }

    #[must_use]
    pub fn predecessors(&self, kmer: &Kmer) -> Vec<KmerNode> {
        self.neighbors(kmer, Direction::Left)
    }

    /// Members sharing the trailing k-1 bases of `kmer` (any leading base, including
    /// the original). No coverage gate.
    #[must_use]
    pub fn left_variants(&self, kmer: &Kmer) -> Vec<Kmer> {
        NUCLEOTIDES
            .iter()
            .map(|&base| kmer.with_first_base(base))
            .filter(|variant| self.contains(variant))
            .collect()
    }

    /// Members sharing the leading k-1 bases of `kmer` (any trailing base, including
    /// the original). No coverage gate.
    #[must_use]
    pub fn right_variants(&self, kmer: &Kmer) -> Vec<Kmer> {
        NUCLEOTIDES
            .iter()
            .map(|&base| kmer.with_last_base(base))
            .filter(|variant| self.contains(variant))
            .collect()
    }

    /// Gated coverage of every k-mer of `seq`, one value per position
    #[must_use]
    pub fn coverages(&self, seq: &[u8]) -> Vec<f32> {
        let k = self.k();
        if seq.len() < k {
            return Vec::new();
        }
        seq.windows(k).map(|kmer| self.count(kmer)).collect()
    }

    /// Every k-mer of `seq` with its gated coverage
    #[must_use]
    pub fn nodes(&self, seq: &[u8]) -> Vec<KmerNode> {
        kmerize(seq, self.k())
            .into_iter()
            .map(|kmer| {
                let coverage = self.count(&kmer);
                KmerNode::new(kmer, coverage)
            })
            .collect()
    }

    /// Median gated coverage of a path of k-mers
    #[must_use]
    pub fn median_kmer_coverage(&self, kmers: &[Kmer]) -> f32 {
        let counts: Vec<f32> = kmers.iter().map(|kmer| self.count(kmer)).collect();
        median_coverage(&counts)
    }

    /// Median gated coverage of the k-mers of `seq`
    #[must_use]
    pub fn median_sequence_coverage(&self, seq: &[u8]) -> f32 {
        median_coverage(&self.coverages(seq))
    }

    /// Midpoint node of the window of `window_size` nodes with the highest median
    /// coverage; see [`window_of_max_median_coverage`].
    #[must_use]
    pub fn window_of_max_median_coverage<'a>(
        &self,
        path: &'a [KmerNode],
        window_size: usize,
    ) -> Option<&'a KmerNode> {
        window_of_max_median_coverage(path, window_size)
    }

    #[must_use]
    pub fn contains_all(&self, kmers: &[Kmer]) -> bool {
        kmers.iter().all(|kmer| self.contains(kmer))
    }

    /// At least one k-mer long and every k-mer a member
    #[must_use]
    pub fn is_valid_seq(&self, seq: &[u8]) -> bool {
        let k = self.k();
        seq.len() >= k && seq.windows(k).all(|kmer| self.contains(kmer))
    }

    /// Combined false-positive rate of the membership and counting filters
    #[must_use]
    pub fn false_positive_rate(&self) -> f32 {
        self.membership.false_positive_rate() * self.counting.false_positive_rate()
    }

    /// False-positive rate of the paired k-mers filter, if allocated
    #[must_use]
    pub fn paired_false_positive_rate(&self) -> Option<f32> {
        self.paired.as_ref().map(PairedKeyFilter::false_positive_rate)
    }
}

impl<M, C, P> std::fmt::Debug for KmerGraph<M, C, P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KmerGraph")
            .field("k", &self.hasher.k())
            .field("num_hashes", &self.num_hashes)
            .field("paired_distance", &self.paired_distance)
            .field("has_paired_filter", &self.paired.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config(k: usize, stranded: bool) -> GraphConfig {
        GraphConfig {
            k,
            stranded,
            membership_bits: 1 << 20,
            counting_slots: 1 << 18,
            paired_bits: 1 << 20,
            paired_distance: 3,
            ..GraphConfig::default()
        }
    }

    fn kmers_of(nodes: &[KmerNode]) -> Vec<String> {
        nodes.iter().map(|n| n.kmer.to_string()).collect()
    }

    #[test]
    fn test_add_and_count() {
        let mut graph = KmerGraph::new(&small_config(3, true)).unwrap();
        graph.add(b"ACG");
        graph.add(b"ACG");
        graph.add(b"CGT");

        assert!(graph.contains(b"ACG"));
        assert!(graph.count(b"ACG") >= 2.0);
        assert!(graph.count(b"CGT") >= 1.0);
        assert!(!graph.contains(b"TTT"));
        assert!(graph.count(b"TTT").abs() < f32::EPSILON);
    }

    #[test]
    fn test_add_all_skips_invalid_windows() {
        let mut graph = KmerGraph::new(&small_config(3, true)).unwrap();
        assert_eq!(graph.add_all_from_sequence(b"ACGNTTG"), 2);
        assert!(graph.contains(b"ACG"));
        assert!(graph.contains(b"TTG"));
        assert_eq!(graph.add_all_from_sequence(b"AC"), 0);
    }

    #[test]
    fn test_successors_and_predecessors() {
        let mut graph = KmerGraph::new(&small_config(3, true)).unwrap();
        graph.add_all_from_sequence(b"ACGTACGTT");

        let succ = graph.successors(&Kmer::from("ACG"));
        assert_eq!(kmers_of(&succ), vec!["CGT"]);

        let succ = graph.successors(&Kmer::from("CGT"));
        assert_eq!(kmers_of(&succ), vec!["GTA", "GTT"]);

        let pred = graph.predecessors(&Kmer::from("ACG"));
        assert_eq!(kmers_of(&pred), vec!["TAC"]);

        assert!(graph.successors(&Kmer::from("GTT")).is_empty());
    }

    #[test]
    fn test_variants_include_original() {
        let mut graph = KmerGraph::new(&small_config(4, true)).unwrap();
        graph.add(b"ACGT");
        graph.add(b"ACGA");
        graph.add(b"TCGT");

        let right = graph.right_variants(&Kmer::from("ACGT"));
        assert_eq!(right, vec![Kmer::from("ACGA"), Kmer::from("ACGT")]);

        let left = graph.left_variants(&Kmer::from("ACGT"));
        assert_eq!(left, vec![Kmer::from("ACGT"), Kmer::from("TCGT")]);
    }

    #[test]
    fn test_canonical_mode_merges_strands() {
        let mut graph = KmerGraph::new(&small_config(5, false)).unwrap();
        graph.add(b"AACGT");
        assert!(graph.contains(b"ACGTT"));
        assert!(graph.count(b"ACGTT") >= 1.0);

        let mut stranded = KmerGraph::new(&small_config(5, true)).unwrap();
        stranded.add(b"AACGT");
        assert!(!stranded.contains(b"ACGTT"));
        assert!(stranded.is_stranded());
        assert!(!graph.is_stranded());
    }

    #[test]
    fn test_median_and_coverages() {
        let mut graph = KmerGraph::new(&small_config(3, true)).unwrap();
        graph.add_all_from_sequence(b"AACGG");
        graph.add(b"ACG");

        let covs = graph.coverages(b"AACGG");
        assert_eq!(covs.len(), 3);
        assert!(covs[1] >= 2.0);

        let kmers = kmerize(b"AACGG", 3);
        // [1, 2, 1] sorted -> 1
        assert!((graph.median_kmer_coverage(&kmers) - 1.0).abs() < f32::EPSILON);
        assert!((graph.median_sequence_coverage(b"AACGG") - 1.0).abs() < f32::EPSILON);
        assert!(graph.is_valid_seq(b"AACGG"));
        assert!(!graph.is_valid_seq(b"AACGT"));
        assert!(!graph.is_valid_seq(b"AA"));
    }

    #[test]
    fn test_paired_filter_required() {
        let mut graph = KmerGraph::new(&small_config(3, true)).unwrap();
        assert_eq!(
            graph.add_paired_kmers(b"ACGTACGT"),
            Err(GraphError::PairedFilterNotInitialized)
        );
        assert!(!graph.lookup_fragment_kmer(b"ACG"));
        assert!(graph.paired_false_positive_rate().is_none());
    }

    #[test]
    fn test_paired_kmers() {
        let mut graph = KmerGraph::new(&small_config(3, true)).unwrap();
        graph.initialize_paired_kmers_filter();
        assert_eq!(graph.paired_kmer_distance(), 3);
        graph.add_paired_kmers(b"AACCGGTT").unwrap();

        assert!(graph.lookup_fragment_kmer(b"AAC"));
        assert!(graph.lookup_fragment_kmer(b"GTT"));
        // AAC at 0, CGG at 3
        assert!(graph.lookup_paired_kmers(b"AAC", b"CGG"));
        assert!(graph.lookup_paired_kmers(b"CCG", b"GTT"));
        assert!(!graph.lookup_paired_kmers(b"CGG", b"AAC"));
        assert!(graph.paired_false_positive_rate().is_some());
    }

    #[test]
    fn test_paired_filter_with_more_hashes_than_other_filters() {
        let config = GraphConfig {
            membership_hashes: 2,
            counting_hashes: 3,
            paired_hashes: 5,
            ..small_config(5, true)
        };
        let mut graph = KmerGraph::new(&config).unwrap();
        graph.add_all_from_sequence(b"GATTACAGGCTTAAG");
        graph.initialize_paired_kmers_filter();
        graph.add_paired_kmers(b"GATTACAGGCTTAAG").unwrap();

        assert!(graph.lookup_fragment_kmer(b"GATTA"));
        assert!(graph.lookup_paired_kmers(b"GATTA", b"ACAGG"));
        // membership and counting still see the k-mers added before the filter
        assert!(graph.contains(b"GATTA"));
        assert!((graph.count(b"GATTA") - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_fragment_and_pairs_skip_invalid_windows() {
        let mut graph = KmerGraph::new(&small_config(3, true)).unwrap();
        graph.initialize_paired_kmers_filter();
        graph.add_fragment_kmers(b"ACGNTTG").unwrap();
        assert!(graph.lookup_fragment_kmer(b"ACG"));
        assert!(graph.lookup_fragment_kmer(b"TTG"));
        assert!(!graph.lookup_fragment_kmer(b"CGN"));

        // distance 3
        graph.add_paired_kmers(b"AACCGGTTNAACC").unwrap();
        assert!(graph.lookup_paired_kmers(b"AAC", b"CGG"));
        assert!(graph.lookup_paired_kmers(b"CCG", b"GTT"));
        assert!(!graph.lookup_fragment_kmer(b"TTN"));
        assert!(!graph.lookup_fragment_kmer(b"NAA"));
    }

    #[test]
    fn test_set_paired_distance() {
        let mut graph = KmerGraph::new(&small_config(3, true)).unwrap();
        assert!(graph.set_paired_kmer_distance(0).is_err());
        graph.set_paired_kmer_distance(7).unwrap();
        assert_eq!(graph.paired_kmer_distance(), 7);
    }

    #[test]
    fn test_false_positive_rate_bounds() {
        let mut graph = KmerGraph::new(&small_config(3, true)).unwrap();
        assert!(graph.false_positive_rate().abs() < f32::EPSILON);
        graph.add_all_from_sequence(b"ACGTACGTT");
        let fpr = graph.false_positive_rate();
        assert!(fpr > 0.0 && fpr <= 1.0);
    }
}
