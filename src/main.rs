use bloom_dbg::cli;
use clap::Parser;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();

    // Initialize logging based on verbosity flag
    let filter = if cli.verbose {
        EnvFilter::new("bloom_dbg=debug,info")
    } else {
        EnvFilter::new("bloom_dbg=warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        cli::Commands::Assemble(args) => {
            cli::assemble::run(args, cli.verbose)?;
        }
        cli::Commands::Correct(args) => {
            cli::correct::run(args, cli.verbose)?;
        }
        cli::Commands::Extend(args) => {
            cli::extend::run(args, cli.verbose)?;
        }
    }

    Ok(())
}
