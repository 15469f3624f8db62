use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::Utc;
use clap::Args;

use crate::assembly::{assemble_contigs, Contig, RepivotStrategy};
use crate::cli::{build_graph, open_output, write_fasta_record, GraphArgs};
use crate::config::Config;

#[derive(Args)]
pub struct AssembleArgs {
    #[command(flatten)]
    pub graph: GraphArgs,

    /// Output FASTA file (stdout by default)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Write a JSON run summary to this file
    #[arg(long)]
    pub summary: Option<PathBuf>,

    /// Extend each contig through error tips and simple bubbles
    #[arg(long)]
    pub polish: bool,

    /// Discard contigs shorter than this
    #[arg(long, default_value = "0")]
    pub min_length: usize,

    /// Lookahead depth for branch resolution
    #[arg(long)]
    pub lookahead: Option<usize>,

    /// Window (in k-mers) locating the best-covered region of a backbone
    #[arg(long)]
    pub window_size: Option<usize>,

    /// Number of backbone refinement iterations
    #[arg(long)]
    pub max_iteration: Option<usize>,

    /// How backbone refinement picks the next pivot
    #[arg(long, value_enum)]
    pub repivot: Option<RepivotStrategy>,

    /// Maximum length of a branch treated as an error tip
    #[arg(long)]
    pub max_tip_length: Option<usize>,

    /// Seed of the random source used for re-pivoting
    #[arg(long)]
    pub seed: Option<u64>,
}

impl AssembleArgs {
    fn apply_overrides(&self, config: &mut Config) {
        let assembly = &mut config.assembly;
        if let Some(lookahead) = self.lookahead {
            assembly.lookahead = lookahead;
        }
        if let Some(window_size) = self.window_size {
            assembly.window_size = window_size;
        }
        if let Some(max_iteration) = self.max_iteration {
            assembly.max_iteration = max_iteration;
        }
        if let Some(repivot) = self.repivot {
            assembly.repivot = repivot;
        }
        if let Some(max_tip_length) = self.max_tip_length {
            assembly.max_tip_length = max_tip_length;
        }
        if let Some(seed) = self.seed {
            assembly.seed = seed;
        }
    }
}

/// Execute assemble subcommand
///
/// # Errors
///
/// Returns an error if the inputs cannot be read, the parameters are invalid, or the
/// output cannot be written.
#[allow(clippy::needless_pass_by_value)] // CLI entry point, values from clap
pub fn run(args: AssembleArgs, verbose: bool) -> anyhow::Result<()> {
    let mut config = args.graph.load_config()?;
    args.apply_overrides(&mut config);
    config.validate()?;

    let reads = args.graph.load_reads(config.graph.k, verbose)?;
    if reads.is_empty() {
        eprintln!("Warning: No usable reads found, nothing to assemble.");
    }

    let graph = build_graph(&config, &reads, verbose)?;
    let sequences: Vec<&[u8]> = reads.iter().map(|read| read.sequence.as_slice()).collect();
    let contigs = assemble_contigs(
        &graph,
        &sequences,
        &config.assembly,
        args.polish,
        args.min_length,
    );

    if verbose {
        eprintln!("Assembled {} contigs from {} segments", contigs.len(), reads.len());
    }

    let mut out = open_output(args.output.as_ref())?;
    for contig in &contigs {
        let definition = format!(
            "{} length={} coverage={:.1}",
            contig.name, contig.length, contig.median_coverage
        );
        write_fasta_record(out.as_mut(), &definition, &contig.sequence)?;
    }
    out.flush()?;

    if let Some(path) = &args.summary {
        write_summary(path, &args, &config, &contigs, graph.false_positive_rate())?;
    }

    Ok(())
}

fn write_summary(
    path: &Path,
    args: &AssembleArgs,
    config: &Config,
    contigs: &[Contig],
    false_positive_rate: f32,
) -> anyhow::Result<()> {
    let total_length: usize = contigs.iter().map(|contig| contig.length).sum();
    let summary = serde_json::json!({
        "created_at": Utc::now().to_rfc3339(),
        "inputs": args
            .graph
            .inputs
            .iter()
            .map(|input| input.display().to_string())
            .collect::<Vec<_>>(),
        "config": config,
        "false_positive_rate": false_positive_rate,
        "contig_count": contigs.len(),
        "total_length": total_length,
        "contigs": contigs,
    });

    let file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    serde_json::to_writer_pretty(file, &summary)?;
    Ok(())
}
