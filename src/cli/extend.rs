use std::io::Write;
use std::path::PathBuf;

use anyhow::Context;
use clap::Args;

use crate::assembly::{extend_transcript, transcript_coverage, UsedKmers};
use crate::cli::{build_graph, open_output, write_fasta_record, GraphArgs};
use crate::core::kmer::kmerize;
use crate::parsing::reads::{read_segments, ReadOptions};

#[derive(Args)]
pub struct ExtendArgs {
    #[command(flatten)]
    pub graph: GraphArgs,

    /// Seed fragments to extend (FASTA or FASTQ)
    #[arg(short, long, required = true)]
    pub seeds: PathBuf,

    /// Output FASTA file (stdout by default)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Distance between the two k-mers of a recorded pair
    #[arg(long)]
    pub paired_distance: Option<usize>,

    /// Lookahead depth for branch resolution
    #[arg(long)]
    pub lookahead: Option<usize>,

    /// Fraction of the local coverage a branch must keep to stay a candidate
    #[arg(long)]
    pub coverage_gradient: Option<f32>,
}

/// Execute extend subcommand
///
/// Seeds are extended in order. Each transcript claims its k-mers (on both strands
/// unless the graph is stranded), so later seeds lying inside an earlier transcript
/// are skipped and later extensions stop where they would re-enter one.
///
/// # Errors
///
/// Returns an error if the inputs or seeds cannot be read, the parameters are
/// invalid, or the output cannot be written.
#[allow(clippy::needless_pass_by_value)] // CLI entry point, values from clap
pub fn run(args: ExtendArgs, verbose: bool) -> anyhow::Result<()> {
    let mut config = args.graph.load_config()?;
    if let Some(distance) = args.paired_distance {
        config.graph.paired_distance = distance;
    }
    if let Some(lookahead) = args.lookahead {
        config.assembly.lookahead = lookahead;
    }
    if let Some(gradient) = args.coverage_gradient {
        config.assembly.coverage_gradient = gradient;
    }
    config.validate()?;

    let k = config.graph.k;
    let reads = args.graph.load_reads(k, verbose)?;

    // first pass fills the graph, second pass records fragments and pairs
    let mut graph = build_graph(&config, &reads, verbose)?;
    graph.initialize_paired_kmers_filter();
    for read in &reads {
        graph.add_paired_kmers(&read.sequence)?;
    }
    if verbose {
        if let Some(rate) = graph.paired_false_positive_rate() {
            eprintln!(
                "Recorded pairs at distance {} (false positive rate {rate:.2e})",
                graph.paired_kmer_distance()
            );
        }
    }

    let seed_options = ReadOptions {
        min_length: k,
        ..ReadOptions::default()
    };
    let seeds = read_segments(&args.seeds, seed_options)
        .with_context(|| format!("Failed to read seeds {}", args.seeds.display()))?;

    let mut claimed = UsedKmers::for_graph(&graph);
    let mut out = open_output(args.output.as_ref())?;
    let mut written = 0;

    for seed in &seeds {
        let seed_kmers = kmerize(&seed.sequence, k);
        if seed_kmers.iter().all(|kmer| claimed.contains(kmer)) {
            tracing::debug!(seed = %seed.name, "Seed already covered by a transcript");
            continue;
        }

        let transcript = extend_transcript(
            &graph,
            &seed.sequence,
            config.assembly.lookahead,
            config.assembly.coverage_gradient,
            &claimed,
        );
        let (_, median) = transcript_coverage(&graph, &transcript);
        claimed.claim(&transcript, k);

        written += 1;
        let definition = format!(
            "transcript_{written} length={} coverage={median:.1} seed={}",
            transcript.len(),
            seed.name
        );
        write_fasta_record(out.as_mut(), &definition, &transcript)?;
    }
    out.flush()?;

    tracing::info!(seeds = seeds.len(), transcripts = written, "Extension complete");
    if verbose {
        eprintln!("Extended {written} transcripts from {} seeds", seeds.len());
    }

    Ok(())
}
