//! Coverage statistics over k-mer paths.
//!
//! The median is the graph's only tie-break signal, so its rule is fixed: sort
//! ascending, take the middle value for odd lengths and the mean of the two middle
//! values for even lengths.

use crate::core::kmer::KmerNode;

/// Median of `values` under the sort-and-take-middle rule; `0.0` when empty.
#[must_use]
pub fn median_coverage(values: &[f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f32::total_cmp);

    let half = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[half - 1] + sorted[half]) / 2.0
    } else {
        sorted[half]
    }
}

/// Median coverage of a path of nodes
#[must_use]
pub fn median_node_coverage(path: &[KmerNode]) -> f32 {
    let values: Vec<f32> = path.iter().map(|node| node.coverage).collect();
    median_coverage(&values)
}

/// Midpoint node of the fixed-size window with the greatest median coverage.
///
/// Windows are compared left to right and replace the best only when strictly
/// greater, so the first of several equal windows wins. Paths no longer than the
/// window (or a zero window) yield the path midpoint. Returns `None` for an empty path.
#[must_use]
pub fn window_of_max_median_coverage(path: &[KmerNode], window_size: usize) -> Option<&KmerNode> {
    if path.is_empty() {
        return None;
    }
    if window_size == 0 || path.len() <= window_size {
        return path.get(path.len() / 2);
    }

    let mut best_start = 0;
    let mut best_cov = median_node_coverage(&path[..window_size]);
    for start in 1..=(path.len() - window_size) {
        let cov = median_node_coverage(&path[start..start + window_size]);
        if cov > best_cov {
            best_cov = cov;
            best_start = start;
        }
    }

    path.get(best_start + window_size / 2)
}

/// Ratios between sliding-window median coverages `window` positions apart.
///
/// Each ratio is folded into `(0, 1]` (the smaller median over the larger), so a
/// value well below 1 marks a coverage drop or rise along the sequence. Returns an
/// empty vector when fewer than `2 * window` coverages are given.
#[must_use]
pub fn coverage_gradients(coverages: &[f32], window: usize) -> Vec<f32> {
    if window == 0 || coverages.len() < 2 * window {
        return Vec::new();
    }

    let medians: Vec<f32> = coverages.windows(window).map(median_coverage).collect();
    medians
        .iter()
        .zip(&medians[window..])
        .map(|(&a, &b)| {
            if a == b {
                1.0
            } else if a > b {
                b / a
            } else {
                a / b
            }
        })
        .collect()
}
