//! # bloom-dbg
//!
//! A library for de novo assembly over a de Bruijn graph held in Bloom filters.
//!
//! Exact k-mer tables grow with every distinct k-mer in a read set, most of which are
//! sequencing errors. `bloom-dbg` stores k-mers in fixed-size probabilistic filters
//! instead and accepts a small, measurable false-positive rate in exchange. The graph
//! is never materialized: nodes are k-mers that test present, and edges are found by
//! trying the four possible extension bases.
//!
//! ## Features
//!
//! - **Gated coverage**: counts are only trusted when the membership filter agrees
//! - **Stranded or canonical storage**: optionally merge a k-mer with its reverse complement
//! - **Coverage-guided traversal**: bounded lookahead breaks ties at branch points
//! - **Path connection**: bridge two sequences through the graph
//! - **Read correction**: substitute bases the graph does not support
//! - **Transcript extension**: fragment and paired k-mer evidence across repeats
//! - **Tip and bubble handling**: extend through error tips and simple bubbles
//!
//! ## Example
//!
//! ```rust
//! use bloom_dbg::{GraphConfig, Kmer, KmerGraph};
//! use bloom_dbg::assembly::connect;
//!
//! let config = GraphConfig {
//!     k: 5,
//!     stranded: true,
//!     membership_bits: 1 << 16,
//!     counting_slots: 1 << 14,
//!     ..GraphConfig::default()
//! };
//! let mut graph = KmerGraph::new(&config).unwrap();
//! graph.add_all_from_sequence(b"GATTACAGGCTTAAGCCGATCG");
//!
//! assert_eq!(graph.count(Kmer::from("GATTA")), 1.0);
//! assert_eq!(graph.successors(&Kmer::from("GATTA")).len(), 1);
//!
//! let bridged = connect(&graph, b"GATTACA", b"CCGATCG", 50, 3).unwrap();
//! assert_eq!(bridged, b"GATTACAGGCTTAAGCCGATCG".to_vec());
//! ```
//!
//! ## Modules
//!
//! - [`core`]: K-mers, traversal directions and the 2-bit codec
//! - [`hash`]: Stranded and canonical multi-value k-mer hashing
//! - [`filter`]: Membership, counting and paired-key Bloom filters
//! - [`graph`]: The implicit k-mer graph and coverage statistics
//! - [`assembly`]: Traversal and assembly algorithms
//! - [`parsing`]: FASTA/FASTQ read input
//! - [`config`]: JSON-loadable run configuration
//! - [`cli`]: Command-line interface implementation

pub mod assembly;
pub mod cli;
pub mod config;
pub mod core;
pub mod filter;
pub mod graph;
pub mod hash;
pub mod parsing;
pub mod utils;

// Re-export commonly used types for convenience
pub use assembly::{AssemblyConfig, Contig};
pub use config::Config;
pub use core::{Direction, Kmer, KmerNode};
pub use graph::{GraphConfig, GraphError, KmerGraph};
