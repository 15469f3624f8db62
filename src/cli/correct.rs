use std::io::Write;
use std::path::PathBuf;

use clap::Args;

use crate::assembly::correct_reads;
use crate::cli::{build_graph, open_output, write_fasta_record, GraphArgs};

#[derive(Args)]
pub struct CorrectArgs {
    #[command(flatten)]
    pub graph: GraphArgs,

    /// Output FASTA file (stdout by default)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Lookahead depth used to score alternative bases
    #[arg(long)]
    pub lookahead: Option<usize>,

    /// Corrected k-mer windows tolerated before a read is left unchanged
    #[arg(long)]
    pub mismatches_allowed: Option<usize>,
}

/// Execute correct subcommand
///
/// # Errors
///
/// Returns an error if the inputs cannot be read, the parameters are invalid, or the
/// output cannot be written.
#[allow(clippy::needless_pass_by_value)] // CLI entry point, values from clap
pub fn run(args: CorrectArgs, verbose: bool) -> anyhow::Result<()> {
    let mut config = args.graph.load_config()?;
    if let Some(lookahead) = args.lookahead {
        config.assembly.lookahead = lookahead;
    }
    if let Some(mismatches_allowed) = args.mismatches_allowed {
        config.assembly.mismatches_allowed = mismatches_allowed;
    }
    config.validate()?;

    let reads = args.graph.load_reads(config.graph.k, verbose)?;
    let graph = build_graph(&config, &reads, verbose)?;

    let sequences: Vec<&[u8]> = reads.iter().map(|read| read.sequence.as_slice()).collect();
    let corrected = correct_reads(&graph, &sequences, &config.assembly);
    let changed = corrected.iter().filter(|read| read.changed).count();

    tracing::info!(reads = reads.len(), changed, "Correction complete");
    if verbose {
        eprintln!("Corrected {changed} of {} segments", reads.len());
    }

    let mut out = open_output(args.output.as_ref())?;
    for (read, result) in reads.iter().zip(&corrected) {
        let definition = if result.changed {
            format!("{} corrected", read.name)
        } else {
            read.name.clone()
        };
        write_fasta_record(out.as_mut(), &definition, &result.sequence)?;
    }
    out.flush()?;

    Ok(())
}
