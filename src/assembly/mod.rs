//! Traversal and assembly algorithms over a frozen [`KmerGraph`](crate::graph::KmerGraph).
//!
//! Every algorithm is read-only against the graph and terminates on cyclic graphs:
//! bounded searches are limited by `lookahead`, `bound` or `max_tip_length`, and
//! unbounded walks track the k-mers they have placed.
//!
//! - [`greedy`]: bounded-lookahead greedy extension and backbone refinement
//! - [`connect`]: bridging two sequences through the graph
//! - [`correction`]: graph-guided mismatch correction
//! - [`transcript`]: fragment- and pair-guided extension
//! - [`tips`]: extension through error tips and simple bubbles
//! - [`pipeline`]: contig assembly and read correction over many reads

pub mod config;
pub mod connect;
pub mod correction;
pub mod greedy;
pub mod pipeline;
pub mod tips;
pub mod transcript;

pub use config::{AssemblyConfig, AssemblyConfigError, RepivotStrategy};
pub use connect::{connect, connect_segments, get_max_coverage_path, overlap_then_connect};
pub use correction::correct_mismatches;
pub use greedy::{find_backbone_path, greedy_extend, greedy_extend_once, max_median_coverage};
pub use pipeline::{assemble_contigs, correct_reads, Contig, CorrectedRead, UsedKmers};
pub use tips::{has_depth, naive_extend, naive_extend_with_bubble_popping};
pub use transcript::{extend_transcript, transcript_coverage, KmerRegistry};
