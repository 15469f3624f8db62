//! Graph-guided substitution of likely sequencing errors.

use tracing::debug;

use crate::core::kmer::Kmer;
use crate::filter::{CountingFilter, MembershipFilter, PairedKeyFilter};
use crate::graph::{median_coverage, KmerGraph};

/// Median coverage of `source` followed by the k-mers spelled by appending each base
/// of `guide`. Zero if any of those k-mers is absent.
fn right_guided_median_coverage<M, C, P>(graph: &KmerGraph<M, C, P>, source: &Kmer, guide: &[u8]) -> f32
where
    M: MembershipFilter,
    C: CountingFilter,
    P: PairedKeyFilter,
{
    let mut covs = Vec::with_capacity(guide.len() + 1);
    covs.push(graph.count(source));

    let mut cursor = source.clone();
    for &base in guide {
        cursor = cursor.successor(base);
        let count = graph.count(&cursor);
        if count <= 0.0 {
            return 0.0;
        }
        covs.push(count);
    }
    median_coverage(&covs)
}

/// Mirror of [`right_guided_median_coverage`], prepending the bases of `guide` from
/// last to first.
fn left_guided_median_coverage<M, C, P>(graph: &KmerGraph<M, C, P>, source: &Kmer, guide: &[u8]) -> f32
where
    M: MembershipFilter,
    C: CountingFilter,
    P: PairedKeyFilter,
{
    let mut covs = Vec::with_capacity(guide.len() + 1);
    covs.push(graph.count(source));

    let mut cursor = source.clone();
    for &base in guide.iter().rev() {
        cursor = cursor.predecessor(base);
        let count = graph.count(&cursor);
        if count <= 0.0 {
            return 0.0;
        }
        covs.push(count);
    }
    median_coverage(&covs)
}

/// Substitute bases of `seq` that the graph supports better than the observed ones.
///
/// A forward pass visits each k-mer window and may replace its last base with that
/// of a right variant; a backward pass may replace the first base with that of a left
/// variant. A variant replaces the current base only when its coverage, read along
/// the next `lookahead` bases of the sequence, is strictly higher.
///
/// The original sequence is returned unchanged when it is shorter than k, when more
/// than `mismatches_allowed` windows were corrected, or when the corrected sequence
/// contains a k-mer missing from the graph.
#[must_use]
pub fn correct_mismatches<M, C, P>(
    graph: &KmerGraph<M, C, P>,
    seq: &[u8],
    lookahead: usize,
    mismatches_allowed: usize,
) -> Vec<u8>
where
    M: MembershipFilter,
    C: CountingFilter,
    P: PairedKeyFilter,
{
    let k = graph.k();
    if seq.len() < k {
        return seq.to_vec();
    }

    let mut corrected = seq.to_vec();
    let mut num_corrected = 0usize;

    for start in 0..=(seq.len() - k) {
        let end = start + k;
        let kmer = Kmer::from(&corrected[start..end]);
        let variants = graph.right_variants(&kmer);
        if variants.is_empty() {
            continue;
        }

        let guide = corrected[end..(end + lookahead).min(seq.len())].to_vec();
        let mut best_cov = right_guided_median_coverage(graph, &kmer, &guide);
        let mut replacement = None;
        for variant in &variants {
            let cov = right_guided_median_coverage(graph, variant, &guide);
            if cov > best_cov {
                best_cov = cov;
                replacement = variant.last_base();
            }
        }

        if let Some(base) = replacement {
            corrected[end - 1] = base;
            num_corrected += 1;
            if num_corrected > mismatches_allowed {
                debug!(num_corrected, mismatches_allowed, "Too many mismatches, reverting");
                return seq.to_vec();
            }
        }
    }

    for start in (0..=(seq.len() - k)).rev() {
        let kmer = Kmer::from(&corrected[start..start + k]);
        let variants = graph.left_variants(&kmer);
        if variants.is_empty() {
            continue;
        }

        let guide = corrected[start.saturating_sub(lookahead)..start].to_vec();
        let mut best_cov = left_guided_median_coverage(graph, &kmer, &guide);
        let mut replacement = None;
        for variant in &variants {
            let cov = left_guided_median_coverage(graph, variant, &guide);
            if cov > best_cov {
                best_cov = cov;
                replacement = variant.first_base();
            }
        }

        if let Some(base) = replacement {
            corrected[start] = base;
            num_corrected += 1;
            if num_corrected > mismatches_allowed {
                debug!(num_corrected, mismatches_allowed, "Too many mismatches, reverting");
                return seq.to_vec();
            }
        }
    }

    if graph.is_valid_seq(&corrected) {
        corrected
    } else {
        debug!("Corrected sequence is not supported by the graph, reverting");
        seq.to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphConfig;

    const TRUE_SEQ: &[u8] = b"GATTACAGGCTTAAGCCGATCG";

    fn graph_from(k: usize, seqs: &[(&[u8], usize)]) -> KmerGraph {
        let config = GraphConfig {
            k,
            stranded: true,
            membership_bits: 1 << 20,
            counting_slots: 1 << 18,
            ..GraphConfig::default()
        };
        let mut graph = KmerGraph::new(&config).unwrap();
        for (seq, copies) in seqs {
            for _ in 0..*copies {
                graph.add_all_from_sequence(seq);
            }
        }
        graph
    }

    #[test]
    fn test_corrects_single_substitution() {
        // one low-coverage read carries a C instead of G at position 8
        let erroneous: &[u8] = b"GATTACAGCCTTAAGCCGATCG";
        let graph = graph_from(5, &[(TRUE_SEQ, 10), (erroneous, 1)]);
        let corrected = correct_mismatches(&graph, erroneous, 5, 2);
        assert_eq!(corrected, TRUE_SEQ.to_vec());
    }

    #[test]
    fn test_correct_sequence_is_unchanged() {
        let erroneous: &[u8] = b"GATTACAGCCTTAAGCCGATCG";
        let graph = graph_from(5, &[(TRUE_SEQ, 10), (erroneous, 1)]);
        assert_eq!(correct_mismatches(&graph, TRUE_SEQ, 5, 2), TRUE_SEQ.to_vec());
    }

    #[test]
    fn test_too_many_corrections_reverts() {
        let erroneous: &[u8] = b"GATTACAGCCTTAAGCCGATCG";
        let graph = graph_from(5, &[(TRUE_SEQ, 10), (erroneous, 1)]);
        assert_eq!(correct_mismatches(&graph, erroneous, 5, 0), erroneous.to_vec());
    }

    #[test]
    fn test_short_sequence_is_returned() {
        let graph = graph_from(5, &[(TRUE_SEQ, 1)]);
        assert_eq!(correct_mismatches(&graph, b"GATT", 5, 2), b"GATT".to_vec());
    }
}
