//! imgpool CLI - Concurrent batch image inversion.
//!
//! Reads every supported image from an input directory, inverts its colors
//! on a bounded pool of workers and writes the results to an output
//! directory. Ctrl-C cancels the batch.
//!
//! # Usage
//!
//! ```bash
//! # Invert ./input into ./output with the configured defaults
//! imgpool process
//!
//! # Explicit directories, 8 workers, timing and stats
//! imgpool process --input ./photos --output ./inverted --workers 8 --timing --stats
//!
//! # View configuration
//! imgpool config show
//! ```

use clap::{Parser, Subcommand};

mod cli;
mod logging;

/// imgpool - Concurrent batch image inversion.
#[derive(Parser, Debug)]
#[command(name = "imgpool")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Invert every image in the input directory
    Process(cli::process::ProcessArgs),

    /// View and manage configuration
    Config(cli::config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logging isn't initialized yet, so use eprintln for config warnings.
    let config = match imgpool_core::Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!(
                "Warning: Failed to load config: {e}\n  \
                 Using default configuration. Check your config file with `imgpool config path`."
            );
            imgpool_core::Config::default()
        }
    };
    logging::init_from_config(&config, cli.verbose, cli.json_logs);

    tracing::debug!("imgpool v{}", imgpool_core::VERSION);

    match cli.command {
        Commands::Process(args) => cli::process::execute(args, config).await,
        Commands::Config(args) => cli::config::execute(args, &config).await,
    }
}
