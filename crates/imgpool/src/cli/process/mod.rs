//! The `imgpool process` command for inverting a directory of images.

mod batch;
mod setup;
pub mod types;

pub use types::{Algorithm, CollectorKind};

use clap::Args;
use imgpool_core::Config;
use std::path::PathBuf;

use batch::run_batch;
use setup::setup;

/// Arguments for the `process` command.
#[derive(Args, Debug, Default)]
pub struct ProcessArgs {
    /// Input directory (defaults to processing.input_dir)
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Output directory (defaults to processing.output_dir)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Number of parallel workers, 1 to 500 (defaults to pool.workers)
    #[arg(short, long, env = "IMGPOOL_WORKERS")]
    pub workers: Option<usize>,

    /// Transform applied to every image
    #[arg(long, value_enum, default_value_t = Algorithm::Invert)]
    pub algo: Algorithm,

    /// Result collector
    #[arg(long, value_enum, default_value_t = CollectorKind::Memory)]
    pub collector: CollectorKind,

    /// Descend into subdirectories of the input directory
    #[arg(short, long)]
    pub recursive: bool,

    /// Log the elapsed processing time
    #[arg(long)]
    pub timing: bool,

    /// Print processing statistics as JSON to stdout
    #[arg(long)]
    pub stats: bool,
}

/// Execute the process command.
pub async fn execute(args: ProcessArgs, config: Config) -> anyhow::Result<()> {
    let ctx = setup(&args, config)?;
    run_batch(ctx, &args).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        args: ProcessArgs,
    }

    #[test]
    fn test_defaults() {
        let args = TestCli::try_parse_from(["imgpool"]).unwrap().args;
        assert!(args.input.is_none());
        assert!(args.output.is_none());
        assert_eq!(args.algo, Algorithm::Invert);
        assert_eq!(args.collector, CollectorKind::Memory);
        assert!(!args.recursive && !args.timing && !args.stats);
    }

    #[test]
    fn test_flags() {
        let args = TestCli::try_parse_from([
            "imgpool",
            "--input",
            "in",
            "--output",
            "out",
            "--workers",
            "8",
            "--collector",
            "fs",
            "--timing",
            "--stats",
        ])
        .unwrap()
        .args;
        assert_eq!(args.input, Some(PathBuf::from("in")));
        assert_eq!(args.workers, Some(8));
        assert_eq!(args.collector, CollectorKind::Fs);
        assert!(args.timing && args.stats);
    }

    #[test]
    fn test_unknown_algorithm_is_rejected() {
        assert!(TestCli::try_parse_from(["imgpool", "--algo", "blur"]).is_err());
    }
}
