//! Command-line interface for bloom-dbg.
//!
//! This module implements the CLI using clap. Available commands:
//!
//! - **assemble**: Build a graph from reads and greedily assemble contigs
//! - **correct**: Correct substitution errors in reads against their own graph
//! - **extend**: Extend seed fragments into transcripts using fragment and pair evidence
//!
//! ## Usage
//!
//! ```text
//! # Assemble contigs from reads
//! bloom-dbg assemble reads.fq.gz -k 31 --polish -o contigs.fa
//!
//! # Parameters from a JSON file, with a summary report
//! bloom-dbg assemble reads.fa --config params.json --summary summary.json
//!
//! # Correct reads
//! bloom-dbg correct reads.fq > corrected.fa
//!
//! # Extend seeds with paired k-mer evidence
//! bloom-dbg extend reads.fa --seeds seeds.fa --paired-distance 50
//! ```

use std::io::Write;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};

use crate::config::Config;
use crate::graph::KmerGraph;
use crate::parsing::reads::{read_segments, Read, ReadOptions};

pub mod assemble;
pub mod correct;
pub mod extend;

/// Bases per line of FASTA output
const FASTA_LINE_WIDTH: usize = 80;

#[derive(Parser)]
#[command(name = "bloom-dbg")]
#[command(author = "Fulcrum Genomics")]
#[command(version)]
#[command(about = "De novo assembly over a Bloom filter de Bruijn graph")]
#[command(
    long_about = "bloom-dbg stores the k-mers of a read set in probabilistic filters and walks the implied de Bruijn graph.\n\nTraversal is guided by coverage:\n- Branches are resolved by the median coverage of bounded lookahead paths\n- Short dead ends are treated as sequencing-error tips\n- Simple bubbles are popped in favor of the better covered side"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Assemble contigs from reads
    Assemble(assemble::AssembleArgs),

    /// Correct substitution errors in reads
    Correct(correct::CorrectArgs),

    /// Extend seed fragments into transcripts
    Extend(extend::ExtendArgs),
}

/// Inputs and graph parameters shared by every subcommand
#[derive(clap::Args)]
pub struct GraphArgs {
    /// Read files (FASTA or FASTQ, optionally gzip-compressed)
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// JSON configuration file; command-line options override its values
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// k-mer length
    #[arg(short = 'k', long)]
    pub kmer_size: Option<usize>,

    /// Keep the two strands separate instead of merging reverse complements
    #[arg(long)]
    pub stranded: bool,

    /// Bits in the membership filter
    #[arg(long)]
    pub membership_bits: Option<usize>,

    /// Counters in the counting filter
    #[arg(long)]
    pub counting_slots: Option<usize>,

    /// Minimum Phred quality of a kept FASTQ base
    #[arg(long, default_value = "3")]
    pub min_quality: u8,

    /// Reverse-complement every read before use
    #[arg(long)]
    pub reverse_complement: bool,
}

impl GraphArgs {
    /// Load the configuration file (or defaults) and apply command-line overrides
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be loaded or the result is invalid.
    pub fn load_config(&self) -> anyhow::Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::from_file(path)
                .with_context(|| format!("Failed to load configuration {}", path.display()))?,
            None => Config::default(),
        };

        if let Some(k) = self.kmer_size {
            config.graph.k = k;
        }
        if self.stranded {
            config.graph.stranded = true;
        }
        if let Some(bits) = self.membership_bits {
            config.graph.membership_bits = bits;
        }
        if let Some(slots) = self.counting_slots {
            config.graph.counting_slots = slots;
        }

        config.validate()?;
        Ok(config)
    }

    /// Read every input into clean segments at least one k-mer long
    ///
    /// # Errors
    ///
    /// Returns an error if any input cannot be read.
    pub fn load_reads(&self, k: usize, verbose: bool) -> anyhow::Result<Vec<Read>> {
        let options = ReadOptions {
            min_length: k,
            min_quality: self.min_quality,
            reverse_complement: self.reverse_complement,
        };

        let mut reads = Vec::new();
        for path in &self.inputs {
            let segments = read_segments(path, options)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            if verbose {
                eprintln!("Loaded {} segments from {}", segments.len(), path.display());
            }
            reads.extend(segments);
        }
        Ok(reads)
    }
}

/// Build a graph from `reads` in a single write pass
///
/// # Errors
///
/// Returns an error if the graph parameters are invalid.
pub fn build_graph(config: &Config, reads: &[Read], verbose: bool) -> anyhow::Result<KmerGraph> {
    let mut graph = KmerGraph::new(&config.graph)?;
    let inserted: usize = reads
        .iter()
        .map(|read| graph.add_all_from_sequence(&read.sequence))
        .sum();

    tracing::info!(
        kmers = inserted,
        false_positive_rate = graph.false_positive_rate(),
        "Graph built"
    );
    if verbose {
        eprintln!(
            "Inserted {inserted} k-mers (false positive rate {:.2e})",
            graph.false_positive_rate()
        );
    }
    Ok(graph)
}

/// Open the output file, or stdout when none is given
///
/// # Errors
///
/// Returns an error if the file cannot be created.
pub fn open_output(path: Option<&PathBuf>) -> anyhow::Result<Box<dyn Write>> {
    match path {
        Some(path) => {
            let file = std::fs::File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            Ok(Box::new(std::io::BufWriter::new(file)))
        }
        None => Ok(Box::new(std::io::BufWriter::new(std::io::stdout().lock()))),
    }
}

/// Write one FASTA record, wrapping the sequence
///
/// # Errors
///
/// Returns an error if the writer fails.
pub fn write_fasta_record(
    out: &mut dyn Write,
    definition: &str,
    sequence: &[u8],
) -> std::io::Result<()> {
    writeln!(out, ">{definition}")?;
    for line in sequence.chunks(FASTA_LINE_WIDTH) {
        out.write_all(line)?;
        out.write_all(b"\n")?;
    }
    Ok(())
}
