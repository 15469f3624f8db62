//! Extension through branch points, treating short dead ends as error tips.

use std::collections::HashSet;

use crate::core::kmer::{first_kmer, kmerize, last_kmer, Direction, Kmer};
use crate::filter::{CountingFilter, MembershipFilter, PairedKeyFilter};
use crate::graph::KmerGraph;

/// Whether some walk of `depth` k-mers leaves `source` in `direction`.
///
/// Depth-first with an explicit stack of neighbor iterators; the walk length bounds
/// the search, so cycles are harmless.
pub fn has_depth<M, C, P>(graph: &KmerGraph<M, C, P>, source: &Kmer, direction: Direction, depth: usize) -> bool
where
    M: MembershipFilter,
    C: CountingFilter,
    P: PairedKeyFilter,
{
    if depth == 0 {
        return true;
    }

    let mut frames = vec![graph.neighbors(source, direction).into_iter()];
    while let Some(frame) = frames.last_mut() {
        match frame.next() {
            Some(node) => {
                if frames.len() >= depth {
                    return true;
                }
                frames.push(graph.neighbors(&node.kmer, direction).into_iter());
            }
            None => {
                frames.pop();
            }
        }
    }
    false
}

/// Walk from `start` while the way on is unambiguous, returning the bases gained in
/// reading order (left to right).
///
/// At a branch, the walk continues only if exactly one neighbor has depth
/// `max_tip_length`. It stops at k-mers in `terminators`, and before committing to a
/// k-mer that another deep branch also reaches from the opposite direction. Every
/// k-mer taken is added to `terminators`.
fn naive_walk<M, C, P>(
    graph: &KmerGraph<M, C, P>,
    start: &Kmer,
    direction: Direction,
    max_tip_length: usize,
    terminators: &mut HashSet<Kmer>,
) -> Vec<u8>
where
    M: MembershipFilter,
    C: CountingFilter,
    P: PairedKeyFilter,
{
    let mut bases = Vec::new();
    let mut current = start.clone();

    loop {
        let neighbors = graph.neighbors(&current, direction);
        let best = match neighbors.len() {
            0 => break,
            1 => neighbors[0].kmer.clone(),
            _ => {
                let mut deep = neighbors
                    .iter()
                    .filter(|node| has_depth(graph, &node.kmer, direction, max_tip_length));
                match (deep.next(), deep.next()) {
                    (Some(node), None) => node.kmer.clone(),
                    _ => break,
                }
            }
        };

        if terminators.contains(&best) {
            break;
        }

        let back = direction.opposite();
        let has_back_branch = graph
            .neighbors(&best, back)
            .iter()
            .any(|node| node.kmer != current && has_depth(graph, &node.kmer, back, max_tip_length));
        if has_back_branch {
            break;
        }

        let base = match direction {
            Direction::Right => best.last_base(),
            Direction::Left => best.first_base(),
        };
        bases.extend(base);
        terminators.insert(best.clone());
        current = best;
    }

    if direction == Direction::Left {
        bases.reverse();
    }
    bases
}

/// Extend `fragment` on both sides through unambiguous branch points.
///
/// A fragment shorter than k is returned unchanged.
pub fn naive_extend<M, C, P>(graph: &KmerGraph<M, C, P>, fragment: &[u8], max_tip_length: usize) -> Vec<u8>
where
    M: MembershipFilter,
    C: CountingFilter,
    P: PairedKeyFilter,
{
    let k = graph.k();
    let (Some(first), Some(last)) = (first_kmer(fragment, k), last_kmer(fragment, k)) else {
        return fragment.to_vec();
    };

    let mut terminators: HashSet<Kmer> = kmerize(fragment, k).into_iter().collect();
    let left = naive_walk(graph, &first, Direction::Left, max_tip_length, &mut terminators);
    let right = naive_walk(graph, &last, Direction::Right, max_tip_length, &mut terminators);

    let mut extended = left;
    extended.extend_from_slice(fragment);
    extended.extend(right);
    extended
}

struct BubbleBranch {
    /// Bases to add to the fragment
    bases: Vec<u8>,
    /// The (k-1)-mer where the branch ends, shared by reconverging branches
    boundary: Vec<u8>,
    coverage: f32,
}

/// Choose among the deep branches leaving `end`. Branches must end on the same
/// (k-1)-mer with lengths within one base of each other; the better covered one wins.
/// `None` when no branch is deep or the deep branches disagree.
fn pop_bubble<M, C, P>(
    graph: &KmerGraph<M, C, P>,
    end: &Kmer,
    direction: Direction,
    max_tip_length: usize,
    terminators: &HashSet<Kmer>,
) -> Option<Vec<u8>>
where
    M: MembershipFilter,
    C: CountingFilter,
    P: PairedKeyFilter,
{
    let k = graph.k();
    let mut best: Option<BubbleBranch> = None;

    for candidate in graph.neighbors(end, direction) {
        if terminators.contains(&candidate.kmer) {
            continue;
        }
        let mut seen = terminators.clone();
        seen.insert(candidate.kmer.clone());
        let walked = naive_walk(graph, &candidate.kmer, direction, max_tip_length, &mut seen);
        if walked.len() <= max_tip_length {
            continue;
        }

        // the candidate's own k-mer plus the walk, in reading order
        let (branch, bases) = match direction {
            Direction::Right => {
                let mut branch = candidate.kmer.as_bytes().to_vec();
                branch.extend_from_slice(&walked);
                let mut bases = vec![branch[k - 1]];
                bases.extend_from_slice(&walked);
                (branch, bases)
            }
            Direction::Left => {
                let mut branch = walked.clone();
                branch.extend_from_slice(candidate.kmer.as_bytes());
                let first_base = branch[walked.len()];
                let mut bases = walked;
                bases.push(first_base);
                (branch, bases)
            }
        };
        let boundary = match direction {
            Direction::Right => branch[branch.len() - (k - 1)..].to_vec(),
            Direction::Left => branch[..k - 1].to_vec(),
        };
        let coverage = graph.median_sequence_coverage(&branch);

        match best.as_mut() {
            None => {
                best = Some(BubbleBranch {
                    bases,
                    boundary,
                    coverage,
                });
            }
            Some(current) => {
                if current.boundary != boundary || current.bases.len().abs_diff(bases.len()) > 1 {
                    return None;
                }
                if coverage > current.coverage {
                    *current = BubbleBranch {
                        bases,
                        boundary,
                        coverage,
                    };
                }
            }
        }
    }

    best.map(|branch| branch.bases)
}

/// [`naive_extend`] that also resolves simple bubbles.
///
/// At each end, every neighbor is walked with [`naive_extend`]'s rules. If several
/// walks exceed `max_tip_length`, they are accepted as one bubble only when they
/// reconverge on the same (k-1)-mer and differ in length by at most one base; the
/// better covered walk is appended. Any other disagreement stops extension.
pub fn naive_extend_with_bubble_popping<M, C, P>(
    graph: &KmerGraph<M, C, P>,
    fragment: &[u8],
    max_tip_length: usize,
) -> Vec<u8>
where
    M: MembershipFilter,
    C: CountingFilter,
    P: PairedKeyFilter,
{
    let k = graph.k();
    if fragment.len() < k {
        return fragment.to_vec();
    }

    let mut terminators: HashSet<Kmer> = kmerize(fragment, k).into_iter().collect();
    let mut extended = fragment.to_vec();

    while let Some(end) = first_kmer(&extended, k) {
        let Some(mut bases) = pop_bubble(graph, &end, Direction::Left, max_tip_length, &terminators)
        else {
            break;
        };
        let added = bases.len();
        bases.extend_from_slice(&extended);
        extended = bases;
        terminators.extend(kmerize(&extended[..added + k - 1], k));
    }

    while let Some(end) = last_kmer(&extended, k) {
        let Some(bases) = pop_bubble(graph, &end, Direction::Right, max_tip_length, &terminators)
        else {
            break;
        };
        let joint = extended.len() - (k - 1);
        extended.extend_from_slice(&bases);
        terminators.extend(kmerize(&extended[joint..], k));
    }

    extended
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphConfig;

    const TRUE_SEQ: &[u8] = b"GATTACAGGCTTAAGCCGATCG";

    fn graph_from(k: usize, reads: &[(&[u8], usize)]) -> KmerGraph {
        let config = GraphConfig {
            k,
            stranded: true,
            membership_bits: 1 << 20,
            counting_slots: 1 << 18,
            ..GraphConfig::default()
        };
        let mut graph = KmerGraph::new(&config).unwrap();
        for (read, copies) in reads {
            for _ in 0..*copies {
                graph.add_all_from_sequence(read);
            }
        }
        graph
    }

    #[test]
    fn test_has_depth() {
        let graph = graph_from(5, &[(TRUE_SEQ, 1)]);
        let kmer = Kmer::from("CCGAT");
        assert!(has_depth(&graph, &kmer, Direction::Right, 2));
        assert!(!has_depth(&graph, &kmer, Direction::Right, 3));
        assert!(has_depth(&graph, &kmer, Direction::Left, 10));
        assert!(has_depth(&graph, &kmer, Direction::Right, 0));
    }

    #[test]
    fn test_naive_extend_skips_error_tip() {
        // a single read leaves the path at GCTT and dead-ends three k-mers later
        let graph = graph_from(5, &[(TRUE_SEQ, 5), (b"CAGGCTTTCG", 1)]);
        assert_eq!(naive_extend(&graph, b"ACAGGCTT", 3), TRUE_SEQ.to_vec());
    }

    #[test]
    fn test_naive_extend_stops_at_bubble() {
        let graph = graph_from(5, &[(TRUE_SEQ, 5), (b"GATTACAGGCTTCAGCCGATCG", 2)]);
        assert_eq!(naive_extend(&graph, b"GATTACAGGCTT", 3), b"GATTACAGGCTT".to_vec());
    }

    #[test]
    fn test_bubble_popping_takes_better_covered_side() {
        let graph = graph_from(5, &[(TRUE_SEQ, 5), (b"GATTACAGGCTTCAGCCGATCG", 2)]);
        assert_eq!(
            naive_extend_with_bubble_popping(&graph, b"GATTACAGGCTT", 3),
            TRUE_SEQ.to_vec()
        );
        assert_eq!(
            naive_extend_with_bubble_popping(&graph, b"AGCCGATCG", 3),
            TRUE_SEQ.to_vec()
        );
    }

    #[test]
    fn test_diverging_branches_are_not_popped() {
        let graph = graph_from(5, &[(TRUE_SEQ, 5), (b"AGGCTTCCTAGTACCAGAT", 5)]);
        assert_eq!(
            naive_extend_with_bubble_popping(&graph, b"GATTACAGGCTT", 3),
            b"GATTACAGGCTT".to_vec()
        );
    }

    #[test]
    fn test_short_fragment() {
        let graph = graph_from(5, &[(TRUE_SEQ, 1)]);
        assert_eq!(naive_extend(&graph, b"GAT", 3), b"GAT".to_vec());
        assert_eq!(naive_extend_with_bubble_popping(&graph, b"GAT", 3), b"GAT".to_vec());
    }
}
