//! Fragment- and pair-guided extension of a seed sequence.

use std::collections::HashSet;

use crate::assembly::greedy::max_median_coverage;
use crate::core::kmer::{assemble, kmerize, Direction, Kmer, KmerNode};
use crate::filter::{CountingFilter, MembershipFilter, PairedKeyFilter};
use crate::graph::{median_coverage, KmerGraph};

/// K-mers already claimed by previously assembled transcripts
pub trait KmerRegistry {
    fn is_claimed(&self, kmer: &Kmer) -> bool;
}

impl<S: std::hash::BuildHasher> KmerRegistry for HashSet<Kmer, S> {
    fn is_claimed(&self, kmer: &Kmer) -> bool {
        self.contains(kmer)
    }
}

/// Parameters fixed for one extension
struct Extension<'g, M, C, P, R: ?Sized> {
    graph: &'g KmerGraph<M, C, P>,
    registry: &'g R,
    lookahead: usize,
    coverage_gradient: f32,
    distance: usize,
}

impl<M, C, P, R> Extension<'_, M, C, P, R>
where
    M: MembershipFilter,
    C: CountingFilter,
    P: PairedKeyFilter,
    R: KmerRegistry + ?Sized,
{
    /// Whether `(near, far)` form a confirmed pair, with `near` being the k-mer already
    /// on the path and `far` the candidate, oriented left-to-right along the transcript
    fn is_paired(&self, direction: Direction, near: &Kmer, far: &Kmer) -> bool {
        match direction {
            Direction::Right => self.graph.lookup_paired_kmers(near, far),
            Direction::Left => self.graph.lookup_paired_kmers(far, near),
        }
    }

    /// Pick the next k-mer among `neighbors` of the end of `path`. `path` is ordered in
    /// the direction of extension.
    fn choose(&self, path: &[Kmer], neighbors: Vec<KmerNode>, direction: Direction) -> Option<Kmer> {
        if neighbors.len() == 1 {
            return neighbors.into_iter().next().map(|node| node.kmer);
        }

        let mut supported: Vec<KmerNode> = neighbors
            .into_iter()
            .filter(|node| self.graph.lookup_fragment_kmer(&node.kmer))
            .collect();
        if supported.len() <= 1 {
            return supported.pop().map(|node| node.kmer);
        }

        let local_start = path.len().saturating_sub(self.lookahead);
        let local_median = self.graph.median_kmer_coverage(&path[local_start..]);
        let min_cov = local_median * self.coverage_gradient;

        let mut similar: Vec<(Kmer, f32)> = Vec::with_capacity(supported.len());
        for node in supported {
            let cov = max_median_coverage(self.graph, &node, direction, self.lookahead);
            if cov >= min_cov {
                similar.push((node.kmer, cov));
            }
        }
        if similar.len() == 1 {
            return similar.pop().map(|(kmer, _)| kmer);
        }

        if path.len() >= self.distance {
            let partner = &path[path.len() - self.distance];
            let mut paired = similar
                .iter()
                .filter(|(kmer, _)| self.is_paired(direction, partner, kmer));
            if let (Some((kmer, _)), None) = (paired.next(), paired.next()) {
                return Some(kmer.clone());
            }
        }

        let mut best: Option<(Kmer, f32)> = None;
        for (kmer, cov) in similar {
            if best.as_ref().map_or(true, |(_, best_cov)| cov > *best_cov) {
                best = Some((kmer, cov));
            }
        }
        best.map(|(kmer, _)| kmer)
            .filter(|kmer| !self.registry.is_claimed(kmer))
    }

    /// Extend `path` (ordered in the direction of extension) until a stop condition
    fn run(
        &self,
        path: &mut Vec<Kmer>,
        direction: Direction,
        on_path: &mut HashSet<Kmer>,
        used_pairs: &mut HashSet<(Kmer, Kmer)>,
    ) {
        loop {
            let Some(last) = path.last() else {
                return;
            };
            let neighbors = self.graph.neighbors(last, direction);
            if neighbors.is_empty() {
                return;
            }
            let Some(best) = self.choose(path, neighbors, direction) else {
                return;
            };

            let partner = path
                .len()
                .checked_sub(self.distance)
                .map(|i| path[i].clone());

            if on_path.contains(&best) {
                let Some(partner) = partner.as_ref() else {
                    return;
                };
                if !self.is_paired(direction, partner, &best) {
                    return;
                }
                let pair = match direction {
                    Direction::Right => (partner.clone(), best.clone()),
                    Direction::Left => (best.clone(), partner.clone()),
                };
                if !used_pairs.insert(pair) {
                    return;
                }
            }

            if self.registry.is_claimed(&best)
                && partner.as_ref().map_or(true, |p| self.registry.is_claimed(p))
            {
                return;
            }

            on_path.insert(best.clone());
            path.push(best);
        }
    }
}

/// Extend `fragment` in both directions using fragment and pair evidence.
///
/// At every step the neighbors of the current end k-mer are re-derived and narrowed
/// in order: a unique neighbor is taken; otherwise only fragment-supported neighbors
/// are kept; then only those whose lookahead coverage reaches `coverage_gradient`
/// times the median of the last `lookahead` path k-mers; then a unique candidate
/// paired with the k-mer `paired_kmer_distance` steps back; finally the best-covered
/// candidate if `registry` has not claimed it.
///
/// Extension stops when nothing qualifies, when a k-mer repeats without a fresh
/// confirming pair, or when the candidate (and its partner) are already claimed.
/// A fragment shorter than k is returned unchanged.
pub fn extend_transcript<M, C, P, R>(
    graph: &KmerGraph<M, C, P>,
    fragment: &[u8],
    lookahead: usize,
    coverage_gradient: f32,
    registry: &R,
) -> Vec<u8>
where
    M: MembershipFilter,
    C: CountingFilter,
    P: PairedKeyFilter,
    R: KmerRegistry + ?Sized,
{
    let mut path = kmerize(fragment, graph.k());
    if path.is_empty() {
        return fragment.to_vec();
    }

    let extension = Extension {
        graph,
        registry,
        lookahead: lookahead.max(1),
        coverage_gradient,
        distance: graph.paired_kmer_distance(),
    };

    let mut on_path: HashSet<Kmer> = path.iter().cloned().collect();
    let mut used_pairs = HashSet::new();

    extension.run(&mut path, Direction::Right, &mut on_path, &mut used_pairs);
    path.reverse();
    extension.run(&mut path, Direction::Left, &mut on_path, &mut used_pairs);
    path.reverse();

    assemble(&path)
}

/// Per-position coverage of a transcript, for reporting
pub fn transcript_coverage<M, C, P>(graph: &KmerGraph<M, C, P>, transcript: &[u8]) -> (Vec<f32>, f32)
where
    M: MembershipFilter,
    C: CountingFilter,
    P: PairedKeyFilter,
{
    let coverages = graph.coverages(transcript);
    let median = median_coverage(&coverages);
    (coverages, median)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphConfig;

    fn paired_graph(k: usize, distance: usize, reads: &[&[u8]]) -> KmerGraph {
        let config = GraphConfig {
            k,
            stranded: true,
            membership_bits: 1 << 20,
            counting_slots: 1 << 18,
            paired_bits: 1 << 20,
            paired_distance: distance,
            ..GraphConfig::default()
        };
        let mut graph = KmerGraph::new(&config).unwrap();
        graph.initialize_paired_kmers_filter();
        for read in reads {
            graph.add_all_from_sequence(read);
            graph.add_paired_kmers(read).unwrap();
        }
        graph
    }

    #[test]
    fn test_extends_linear_transcript() {
        let full: &[u8] = b"GATTACAGGCTTAAGCCGATCG";
        let graph = paired_graph(5, 4, &[full]);
        let registry: HashSet<Kmer> = HashSet::new();
        let extended = extend_transcript(&graph, b"GGCTTAAG", 3, 0.5, &registry);
        assert_eq!(extended, full.to_vec());
    }

    #[test]
    fn test_pairs_resolve_repeat() {
        // Two transcripts share the repeat CCATGG; the flanks decide the exit
        let first: &[u8] = b"AAGTCCCATGGTTACG";
        let second: &[u8] = b"TTCGACCATGGAGCAT";
        let graph = paired_graph(5, 6, &[first, first, second, second]);
        let registry: HashSet<Kmer> = HashSet::new();

        let extended = extend_transcript(&graph, b"AAGTCCCAT", 3, 0.5, &registry);
        assert_eq!(extended, first.to_vec());

        let extended = extend_transcript(&graph, b"TTCGACCAT", 3, 0.5, &registry);
        assert_eq!(extended, second.to_vec());
    }

    #[test]
    fn test_short_fragment_is_returned() {
        let graph = paired_graph(5, 4, &[b"GATTACAGG"]);
        let registry: HashSet<Kmer> = HashSet::new();
        assert_eq!(extend_transcript(&graph, b"GAT", 3, 0.5, &registry), b"GAT".to_vec());
    }

    #[test]
    fn test_claimed_kmers_stop_extension() {
        let full: &[u8] = b"GATTACAGGCTTAAGCCGATCG";
        let graph = paired_graph(5, 30, &[full]);
        let registry: HashSet<Kmer> = kmerize(full, 5).into_iter().collect();
        // every neighbor is claimed and no partner is in range
        let extended = extend_transcript(&graph, b"GGCTTAAG", 3, 0.5, &registry);
        assert_eq!(extended, b"GGCTTAAG".to_vec());
    }

    #[test]
    fn test_transcript_coverage() {
        let graph = paired_graph(5, 4, &[b"GATTACAGG", b"GATTACAGG"]);
        let (covs, median) = transcript_coverage(&graph, b"GATTACAGG");
        assert_eq!(covs.len(), 5);
        assert!((median - 2.0).abs() < f32::EPSILON);
    }
}
