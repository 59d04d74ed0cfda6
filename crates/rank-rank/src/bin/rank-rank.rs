use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a configured query evaluation pass and write TREC output.
    Run {
        /// Path to the `key = value` parameter file (§6).
        param_file: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match &cli.command {
        Commands::Run { param_file } => {
            rank_rank::pipeline::run(param_file)?;
        }
    }
    Ok(())
}
