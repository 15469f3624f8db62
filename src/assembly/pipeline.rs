//! Contig assembly and read correction over a populated graph.

use std::collections::HashSet;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use tracing::{debug, info};

use crate::assembly::config::AssemblyConfig;
use crate::assembly::correction::correct_mismatches;
use crate::assembly::greedy::find_backbone_path;
use crate::assembly::tips::naive_extend_with_bubble_popping;
use crate::assembly::transcript::KmerRegistry;
use crate::core::codec::KmerCodec;
use crate::core::kmer::{assemble_nodes, kmerize, Kmer};
use crate::filter::{CountingFilter, MembershipFilter, PairedKeyFilter};
use crate::graph::{coverage_gradients, median_coverage, KmerGraph};

/// An assembled sequence with its coverage profile
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Contig {
    pub name: String,
    #[serde(skip)]
    pub sequence: Vec<u8>,
    pub length: usize,
    pub median_coverage: f32,
    /// Sharpest windowed coverage change along the contig; `1.0` when it is too
    /// short to compare two windows
    pub min_coverage_gradient: f32,
}

impl Contig {
    fn new<M, C, P>(
        graph: &KmerGraph<M, C, P>,
        index: usize,
        sequence: Vec<u8>,
        window: usize,
    ) -> Self
    where
        M: MembershipFilter,
        C: CountingFilter,
        P: PairedKeyFilter,
    {
        let coverages = graph.coverages(&sequence);
        let min_coverage_gradient = coverage_gradients(&coverages, window)
            .into_iter()
            .fold(1.0_f32, f32::min);
        Self {
            name: format!("contig_{}", index + 1),
            length: sequence.len(),
            sequence,
            median_coverage: median_coverage(&coverages),
            min_coverage_gradient,
        }
    }
}

/// K-mers consumed by earlier contigs or transcripts, matched in both orientations
/// when the graph merges strands
#[derive(Debug, Clone, Default)]
pub struct UsedKmers {
    kmers: HashSet<Kmer>,
    stranded: bool,
}

impl UsedKmers {
    #[must_use]
    pub fn new(stranded: bool) -> Self {
        Self {
            kmers: HashSet::new(),
            stranded,
        }
    }

    /// A registry matching the strand handling of `graph`
    #[must_use]
    pub fn for_graph<M, C, P>(graph: &KmerGraph<M, C, P>) -> Self
    where
        M: MembershipFilter,
        C: CountingFilter,
        P: PairedKeyFilter,
    {
        Self::new(graph.is_stranded())
    }

    #[must_use]
    pub fn contains(&self, kmer: &Kmer) -> bool {
        self.kmers.contains(kmer)
            || (!self.stranded && self.kmers.contains(&kmer.reverse_complement()))
    }

    /// Claim every k-mer of `seq`
    pub fn claim(&mut self, seq: &[u8], k: usize) {
        self.kmers.extend(kmerize(seq, k));
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.kmers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.kmers.is_empty()
    }
}

impl KmerRegistry for UsedKmers {
    fn is_claimed(&self, kmer: &Kmer) -> bool {
        self.contains(kmer)
    }
}

/// Greedily assemble contigs seeded from `reads`.
///
/// Reads are visited in order. The first k-mer of a read that is covered and not yet
/// part of a contig seeds backbone refinement; reads without such a k-mer are skipped.
/// When `polish` is set, each backbone is further extended through tips and simple
/// bubbles. Contigs shorter than `min_length` are discarded but still claim their
/// k-mers.
pub fn assemble_contigs<M, C, P, S>(
    graph: &KmerGraph<M, C, P>,
    reads: &[S],
    config: &AssemblyConfig,
    polish: bool,
    min_length: usize,
) -> Vec<Contig>
where
    M: MembershipFilter,
    C: CountingFilter,
    P: PairedKeyFilter,
    S: AsRef<[u8]>,
{
    let k = graph.k();
    let mut rng = StdRng::seed_from_u64(config.seed);
    let codec = KmerCodec::new(k);
    let mut used = UsedKmers::for_graph(graph);
    let mut contigs = Vec::new();

    for read in reads {
        let Some(seed) = select_seed(graph, read.as_ref(), &used, &codec) else {
            continue;
        };

        let backbone = find_backbone_path(
            graph,
            &seed,
            config.lookahead,
            config.window_size,
            config.max_iteration,
            config.repivot,
            &mut rng,
        );
        let mut sequence = assemble_nodes(&backbone);
        if polish {
            sequence = naive_extend_with_bubble_popping(graph, &sequence, config.max_tip_length);
        }
        used.claim(&sequence, k);

        if sequence.len() < min_length {
            debug!(seed = %seed, length = sequence.len(), "Discarding short contig");
            continue;
        }
        contigs.push(Contig::new(graph, contigs.len(), sequence, config.window_size));
    }

    info!(contigs = contigs.len(), "Assembly complete");
    contigs
}

/// First present, unclaimed k-mer of `read` that is not low complexity.
///
/// Falls back to the first present, unclaimed k-mer when every candidate is low
/// complexity; at small k the 3-mer threshold flags nearly everything.
fn select_seed<M, C, P>(
    graph: &KmerGraph<M, C, P>,
    read: &[u8],
    used: &UsedKmers,
    codec: &KmerCodec,
) -> Option<Kmer>
where
    M: MembershipFilter,
    C: CountingFilter,
    P: PairedKeyFilter,
{
    let mut fallback = None;
    for kmer in kmerize(read, graph.k()) {
        if used.contains(&kmer) || graph.count(&kmer) <= 0.0 {
            continue;
        }
        if !codec.is_low_complexity(&codec.encode(kmer.as_bytes())) {
            return Some(kmer);
        }
        if fallback.is_none() {
            debug!(kmer = %kmer, "Low complexity seed candidate");
            fallback = Some(kmer);
        }
    }
    fallback
}

/// Outcome of correcting one read
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrectedRead {
    pub sequence: Vec<u8>,
    pub changed: bool,
}

/// Run [`correct_mismatches`] over every read
pub fn correct_reads<M, C, P, S>(
    graph: &KmerGraph<M, C, P>,
    reads: &[S],
    config: &AssemblyConfig,
) -> Vec<CorrectedRead>
where
    M: MembershipFilter,
    C: CountingFilter,
    P: PairedKeyFilter,
    S: AsRef<[u8]>,
{
    reads
        .iter()
        .map(|read| {
            let read = read.as_ref();
            let sequence =
                correct_mismatches(graph, read, config.lookahead, config.mismatches_allowed);
            let changed = sequence != read;
            CorrectedRead { sequence, changed }
        })
        .collect()
}
