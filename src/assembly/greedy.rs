//! Greedy walks through the graph, guided by bounded lookahead.

use std::collections::HashSet;

use rand::Rng;
use tracing::debug;

use crate::assembly::config::RepivotStrategy;
use crate::core::kmer::{Direction, Kmer, KmerNode};
use crate::filter::{CountingFilter, MembershipFilter, PairedKeyFilter};
use crate::graph::{median_coverage, KmerGraph};

/// Best median coverage over every path of at most `lookahead` k-mers that starts at
/// `source` and walks in `direction`.
///
/// The search is an exhaustive depth-first enumeration with an explicit stack of
/// neighbor iterators; its cost grows as `4^lookahead`. A path is scored when it
/// reaches `lookahead` k-mers or dead-ends. A source without neighbors scores its
/// own coverage.
pub fn max_median_coverage<M, C, P>(
    graph: &KmerGraph<M, C, P>,
    source: &KmerNode,
    direction: Direction,
    lookahead: usize,
) -> f32
where
    M: MembershipFilter,
    C: CountingFilter,
    P: PairedKeyFilter,
{
    let neighbors = graph.neighbors(&source.kmer, direction);
    if neighbors.is_empty() {
        return source.coverage;
    }

    let mut best = 0.0_f32;
    let mut path = vec![source.coverage];
    let mut frames = vec![neighbors.into_iter()];

    while let Some(frame) = frames.last_mut() {
        let Some(node) = frame.next() else {
            frames.pop();
            path.pop();
            continue;
        };

        path.push(node.coverage);
        if path.len() < lookahead {
            let next = graph.neighbors(&node.kmer, direction);
            if !next.is_empty() {
                frames.push(next.into_iter());
                continue;
            }
        }

        let cov = median_coverage(&path);
        if cov > best {
            best = cov;
        }
        path.pop();
    }

    best
}

/// One step from `source`: `None` without neighbors, the neighbor itself when unique,
/// otherwise the neighbor whose lookahead search found the highest median coverage.
/// Equal scores keep the earliest neighbor in A, C, G, T order.
pub fn greedy_extend_once<M, C, P>(
    graph: &KmerGraph<M, C, P>,
    source: &Kmer,
    direction: Direction,
    lookahead: usize,
) -> Option<KmerNode>
where
    M: MembershipFilter,
    C: CountingFilter,
    P: PairedKeyFilter,
{
    let mut candidates = graph.neighbors(source, direction);
    if candidates.len() <= 1 {
        return candidates.pop();
    }

    let mut best: Option<(KmerNode, f32)> = None;
    for candidate in candidates {
        let cov = max_median_coverage(graph, &candidate, direction, lookahead);
        if best.as_ref().map_or(true, |(_, best_cov)| cov > *best_cov) {
            best = Some((candidate, cov));
        }
    }
    best.map(|(node, _)| node)
}

/// Walk from `start` in `direction` until there is no neighbor or the next k-mer was
/// already placed. Every k-mer taken is added to `visited`.
fn extend_until_revisit<M, C, P>(
    graph: &KmerGraph<M, C, P>,
    start: &Kmer,
    direction: Direction,
    lookahead: usize,
    visited: &mut HashSet<Kmer>,
) -> Vec<KmerNode>
where
    M: MembershipFilter,
    C: CountingFilter,
    P: PairedKeyFilter,
{
    let mut walk = Vec::new();
    let mut cursor = start.clone();
    while let Some(next) = greedy_extend_once(graph, &cursor, direction, lookahead) {
        if !visited.insert(next.kmer.clone()) {
            break;
        }
        cursor = next.kmer.clone();
        walk.push(next);
    }
    walk
}

/// Greedily extend `seed` to the right and then to the left, never placing a k-mer
/// twice. Returns the path in left-to-right order, seed included.
pub fn greedy_extend<M, C, P>(graph: &KmerGraph<M, C, P>, seed: &Kmer, lookahead: usize) -> Vec<KmerNode>
where
    M: MembershipFilter,
    C: CountingFilter,
    P: PairedKeyFilter,
{
    let mut visited = HashSet::from([seed.clone()]);
    let right = extend_until_revisit(graph, seed, Direction::Right, lookahead, &mut visited);
    let left = extend_until_revisit(graph, seed, Direction::Left, lookahead, &mut visited);

    let mut path = Vec::with_capacity(left.len() + 1 + right.len());
    path.extend(left.into_iter().rev());
    path.push(graph.node(seed));
    path.extend(right);
    path
}

/// Greedy extension repeated from better-supported pivots.
///
/// The first extension starts at `seed`. Each of the remaining `max_iteration - 1`
/// rounds re-pivots on the previous path, to the midpoint of its highest-coverage
/// window or, under [`RepivotStrategy::Alternating`], on every other round to a
/// uniformly random position drawn from `rng`. Returns the last path.
pub fn find_backbone_path<M, C, P, R>(
    graph: &KmerGraph<M, C, P>,
    seed: &Kmer,
    lookahead: usize,
    window_size: usize,
    max_iteration: usize,
    strategy: RepivotStrategy,
    rng: &mut R,
) -> Vec<KmerNode>
where
    M: MembershipFilter,
    C: CountingFilter,
    P: PairedKeyFilter,
    R: Rng + ?Sized,
{
    let mut path = greedy_extend(graph, seed, lookahead);

    for iteration in 1..max_iteration {
        let random_pivot = strategy == RepivotStrategy::Alternating && iteration % 2 == 0;
        let pivot = if random_pivot {
            path.get(rng.gen_range(0..path.len()))
        } else {
            graph.window_of_max_median_coverage(&path, window_size)
        };
        let Some(pivot) = pivot.map(|node| node.kmer.clone()) else {
            break;
        };

        debug!(iteration, pivot = %pivot, path_len = path.len(), "Re-pivoting backbone");
        path = greedy_extend(graph, &pivot, lookahead);
    }

    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::kmer::assemble_nodes;
    use crate::graph::GraphConfig;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn graph_from(k: usize, seqs: &[&[u8]]) -> KmerGraph {
        let config = GraphConfig {
            k,
            stranded: true,
            membership_bits: 1 << 20,
            counting_slots: 1 << 18,
            ..GraphConfig::default()
        };
        let mut graph = KmerGraph::new(&config).unwrap();
        for seq in seqs {
            graph.add_all_from_sequence(seq);
        }
        graph
    }

    #[test]
    fn test_max_median_without_neighbors() {
        let graph = graph_from(4, &[b"ACGTT"]);
        let source = graph.node(&Kmer::from("CGTT"));
        let cov = max_median_coverage(&graph, &source, Direction::Right, 5);
        assert!((cov - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_extend_once_prefers_covered_branch() {
        // CGTA is followed by a well covered path; CGTC by a single read
        let graph = graph_from(
            4,
            &[b"AACGTAGGAT", b"AACGTAGGAT", b"AACGTAGGAT", b"AACGTCTTGC"],
        );
        let next = greedy_extend_once(&graph, &Kmer::from("ACGT"), Direction::Right, 4).unwrap();
        assert_eq!(next.kmer, "CGTA");
    }

    #[test]
    fn test_extend_once_unique_and_none() {
        let graph = graph_from(4, &[b"AACGTAGG"]);
        let next = greedy_extend_once(&graph, &Kmer::from("AACG"), Direction::Right, 3).unwrap();
        assert_eq!(next.kmer, "ACGT");
        assert!(greedy_extend_once(&graph, &Kmer::from("TAGG"), Direction::Right, 3).is_none());
        let prev = greedy_extend_once(&graph, &Kmer::from("ACGT"), Direction::Left, 3).unwrap();
        assert_eq!(prev.kmer, "AACG");
    }

    #[test]
    fn test_greedy_extend_recovers_linear_sequence() {
        let seq = b"GATTACAGGCTTAAGC";
        let graph = graph_from(5, &[seq]);
        let path = greedy_extend(&graph, &Kmer::from("CAGGC"), 3);
        assert_eq!(assemble_nodes(&path), seq.to_vec());
    }

    #[test]
    fn test_greedy_extend_terminates_on_cycle() {
        let graph = graph_from(3, &[b"ACGTACGTACG"]);
        let path = greedy_extend(&graph, &Kmer::from("ACG"), 3);
        let distinct: HashSet<&Kmer> = path.iter().map(|n| &n.kmer).collect();
        assert_eq!(distinct.len(), path.len());
        assert!(path.len() <= 4);
    }

    #[test]
    fn test_backbone_is_reproducible() {
        let graph = graph_from(5, &[b"GATTACAGGCTTAAGCCGATCG"]);
        let seed = Kmer::from("TTACA");
        let mut rng_a = StdRng::seed_from_u64(7);
        let mut rng_b = StdRng::seed_from_u64(7);
        let a = find_backbone_path(&graph, &seed, 3, 4, 4, RepivotStrategy::Alternating, &mut rng_a);
        let b = find_backbone_path(&graph, &seed, 3, 4, 4, RepivotStrategy::Alternating, &mut rng_b);
        assert_eq!(a, b);
        assert_eq!(assemble_nodes(&a), b"GATTACAGGCTTAAGCCGATCG".to_vec());
    }
}
