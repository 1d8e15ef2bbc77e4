mod commands;
mod summary;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ralign", about = "2-D/3-D image registration tool")]
#[command(version)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List alignment strategies and comparators
    List(commands::list::ListArgs),
    /// Align one image to a reference
    Align(commands::align::AlignArgs),
    /// Align a stack of images to one reference with the batch aligner
    Batch(commands::batch::BatchArgs),
    /// Run an alignment job described by a TOML file
    Run(commands::run::RunArgs),
    /// Print a default job file
    Config(commands::config::ConfigArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match &cli.command {
        Commands::List(args) => commands::list::run(args),
        Commands::Align(args) => commands::align::run(args),
        Commands::Batch(args) => commands::batch::run(args),
        Commands::Run(args) => commands::run::run(args),
        Commands::Config(args) => commands::config::run(args),
    }
}
