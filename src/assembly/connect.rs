//! Bridging two anchored sequences through the graph.

use std::collections::HashSet;

use tracing::debug;

use crate::assembly::greedy::greedy_extend_once;
use crate::core::kmer::{first_kmer, last_kmer, overlap_maximally, Direction, Kmer, KmerNode};
use crate::filter::{CountingFilter, MembershipFilter, PairedKeyFilter};
use crate::graph::KmerGraph;

/// Greedy path strictly between `left` and `right`, excluding both anchors.
///
/// Walks right from `left` for at most `bound` steps; reaching `right` returns the
/// k-mers passed on the way. Otherwise walks left from `right` for at most `bound`
/// steps: reaching `left` returns that walk in left-to-right order, and meeting a
/// k-mer of the rightward walk splices the two walks at the first such k-mer.
///
/// `None` means the anchors could not be connected within `bound`; it is an expected
/// outcome, not an error. An empty path means `right` directly follows `left`.
pub fn get_max_coverage_path<M, C, P>(
    graph: &KmerGraph<M, C, P>,
    left: &Kmer,
    right: &Kmer,
    bound: usize,
    lookahead: usize,
) -> Option<Vec<KmerNode>>
where
    M: MembershipFilter,
    C: CountingFilter,
    P: PairedKeyFilter,
{
    let mut forward: Vec<KmerNode> = Vec::with_capacity(bound);
    let mut cursor = left.clone();
    for _ in 0..bound {
        let Some(next) = greedy_extend_once(graph, &cursor, Direction::Right, lookahead) else {
            break;
        };
        if next.kmer == *right {
            return Some(forward);
        }
        cursor = next.kmer.clone();
        forward.push(next);
    }

    let forward_kmers: HashSet<&Kmer> = forward.iter().map(|node| &node.kmer).collect();

    let mut backward: Vec<KmerNode> = Vec::with_capacity(bound);
    let mut cursor = right.clone();
    for _ in 0..bound {
        let Some(next) = greedy_extend_once(graph, &cursor, Direction::Left, lookahead) else {
            break;
        };
        if next.kmer == *left {
            backward.reverse();
            return Some(backward);
        }
        if forward_kmers.contains(&next.kmer) {
            let meet = forward
                .iter()
                .position(|node| node.kmer == next.kmer)
                .unwrap_or(forward.len() - 1);
            let mut path: Vec<KmerNode> = forward[..=meet].to_vec();
            path.extend(backward.into_iter().rev());
            return Some(path);
        }
        cursor = next.kmer.clone();
        backward.push(next);
    }

    debug!(left = %left, right = %right, bound, "No path between anchors");
    None
}

/// Join `left` and `right` through the graph: `left`, then one base per path k-mer,
/// then `right` past its first k-mer. `None` when either side is shorter than k or
/// no path exists.
pub fn connect<M, C, P>(
    graph: &KmerGraph<M, C, P>,
    left: &[u8],
    right: &[u8],
    bound: usize,
    lookahead: usize,
) -> Option<Vec<u8>>
where
    M: MembershipFilter,
    C: CountingFilter,
    P: PairedKeyFilter,
{
    let k = graph.k();
    let anchor_left = last_kmer(left, k)?;
    let anchor_right = first_kmer(right, k)?;
    let path = get_max_coverage_path(graph, &anchor_left, &anchor_right, bound, lookahead)?;

    let mut joined = Vec::with_capacity(left.len() + path.len() + right.len() - (k - 1));
    joined.extend_from_slice(left);
    joined.extend(path.iter().filter_map(|node| node.kmer.last_base()));
    joined.extend_from_slice(&right[k - 1..]);
    Some(joined)
}

/// Chain-connect `segments` in order and return the longest sequence produced.
///
/// A segment that cannot be joined to the running sequence starts a new one.
pub fn connect_segments<M, C, P, S>(
    graph: &KmerGraph<M, C, P>,
    segments: &[S],
    bound: usize,
    lookahead: usize,
) -> Vec<u8>
where
    M: MembershipFilter,
    C: CountingFilter,
    P: PairedKeyFilter,
    S: AsRef<[u8]>,
{
    let Some((first, rest)) = segments.split_first() else {
        return Vec::new();
    };

    let mut last = first.as_ref().to_vec();
    let mut longest = last.clone();
    for segment in rest {
        let segment = segment.as_ref();
        last = connect(graph, &last, segment, bound, lookahead).unwrap_or_else(|| segment.to_vec());
        if last.len() > longest.len() {
            longest.clone_from(&last);
        }
    }
    longest
}

/// Merge on a direct overlap when the merged sequence is fully supported by the
/// graph, otherwise fall back to [`connect`].
pub fn overlap_then_connect<M, C, P>(
    graph: &KmerGraph<M, C, P>,
    left: &[u8],
    right: &[u8],
    bound: usize,
    lookahead: usize,
    min_overlap: usize,
) -> Option<Vec<u8>>
where
    M: MembershipFilter,
    C: CountingFilter,
    P: PairedKeyFilter,
{
    if let Some(merged) = overlap_maximally(left, right, min_overlap) {
        if graph.is_valid_seq(&merged) {
            return Some(merged);
        }
    }
    connect(graph, left, right, bound, lookahead)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphConfig;

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

    const LINEAR: &[u8] = b"GATTACAGGCTTAAGCCGATCG";

    #[test]
    fn test_path_on_linear_graph() {
        let graph = graph_from(5, &[LINEAR]);
        let path =
            get_max_coverage_path(&graph, &Kmer::from("GATTA"), &Kmer::from("TTAAG"), 20, 3)
                .unwrap();
        let kmers: Vec<String> = path.iter().map(|n| n.kmer.to_string()).collect();
        assert_eq!(
            kmers,
            vec!["ATTAC", "TTACA", "TACAG", "ACAGG", "CAGGC", "AGGCT", "GGCTT", "GCTTA", "CTTAA"]
        );
    }

    #[test]
    fn test_adjacent_anchors_give_empty_path() {
        let graph = graph_from(5, &[LINEAR]);
        let path =
            get_max_coverage_path(&graph, &Kmer::from("GATTA"), &Kmer::from("ATTAC"), 5, 3)
                .unwrap();
        assert!(path.is_empty());
    }

    #[test]
    fn test_bound_exhausted() {
        let graph = graph_from(5, &[LINEAR]);
        assert!(
            get_max_coverage_path(&graph, &Kmer::from("GATTA"), &Kmer::from("GATCG"), 3, 3)
                .is_none()
        );
    }

    #[test]
    fn test_connect_reconstructs_gap() {
        let graph = graph_from(5, &[LINEAR]);
        let joined = connect(&graph, b"GATTACA", b"CCGATCG", 50, 3).unwrap();
        assert_eq!(joined, LINEAR.to_vec());
    }

    #[test]
    fn test_connect_short_input() {
        let graph = graph_from(5, &[LINEAR]);
        assert!(connect(&graph, b"GAT", b"CCGATCG", 50, 3).is_none());
    }

    #[test]
    fn test_connect_segments_keeps_longest() {
        let graph = graph_from(5, &[LINEAR]);
        let segments: Vec<&[u8]> = vec![&b"GATTACA"[..], &b"TTAAGC"[..], &b"TTTTTTTT"[..]];
        assert_eq!(connect_segments(&graph, &segments, 50, 3), b"GATTACAGGCTTAAGC".to_vec());

        let empty: Vec<&[u8]> = Vec::new();
        assert!(connect_segments(&graph, &empty, 50, 3).is_empty());
        assert_eq!(connect_segments(&graph, &[b"ACGT"], 50, 3), b"ACGT".to_vec());
    }

    #[test]
    fn test_overlap_before_connect() {
        let graph = graph_from(5, &[LINEAR]);
        let merged = overlap_then_connect(&graph, b"GATTACAGGC", b"CAGGCTTAAG", 50, 3, 4).unwrap();
        assert_eq!(merged, b"GATTACAGGCTTAAG".to_vec());

        let bridged = overlap_then_connect(&graph, b"GATTACA", b"CCGATCG", 50, 3, 4).unwrap();
        assert_eq!(bridged, LINEAR.to_vec());
    }
}
