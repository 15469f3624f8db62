//! Implicit de Bruijn graph over probabilistic filters.
//!
//! [`KmerGraph`] stores no nodes or edges explicitly. Nodes are k-mers that test
//! present in a membership filter; their coverage comes from a counting filter and
//! is gated on membership. Edges are implied by (k-1)-base overlaps and are
//! discovered by trying each of the four bases at the vacant end of a k-mer.
//!
//! An optional paired k-mers filter records k-mers known to come from the same
//! fragment, and ordered pairs of k-mers a fixed distance apart, for long-range
//! disambiguation during transcript extension.

pub mod config;
pub mod coverage;
pub mod kmer_graph;

pub use config::{GraphConfig, GraphError};
pub use coverage::{
    coverage_gradients, median_coverage, median_node_coverage, window_of_max_median_coverage,
};
pub use kmer_graph::KmerGraph;
