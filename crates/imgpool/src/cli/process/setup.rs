//! Run setup: CLI overrides on top of config, path checks.

use imgpool_core::Config;
use std::path::PathBuf;

use super::ProcessArgs;

/// Everything a run needs, resolved from config and flags.
#[derive(Debug)]
pub(crate) struct ProcessContext {
    pub config: Config,
    pub input: PathBuf,
    pub output: PathBuf,
}

/// Apply flag overrides, validate, and make sure the output directory exists.
pub fn setup(args: &ProcessArgs, mut config: Config) -> anyhow::Result<ProcessContext> {
    if let Some(input) = &args.input {
        config.processing.input_dir = input.clone();
    }
    if let Some(output) = &args.output {
        config.processing.output_dir = output.clone();
    }
    if let Some(workers) = args.workers {
        config.pool.workers = workers;
    }
    if args.recursive {
        config.processing.recursive = true;
    }
    config.validate()?;

    let input = config.input_dir();
    if !input.exists() {
        anyhow::bail!(
            "Input path does not exist: {:?}\n\n  Hint: Check the path or set processing.input_dir.",
            input
        );
    }

    let output = config.output_dir();
    std::fs::create_dir_all(&output)
        .map_err(|e| anyhow::anyhow!("Cannot create output directory {:?}: {e}", output))?;

    tracing::debug!(
        input = %input.display(),
        output = %output.display(),
        workers = config.pool.workers,
        algo = %args.algo,
        collector = %args.collector,
        "Run configured"
    );

    Ok(ProcessContext {
        config,
        input,
        output,
    })
}
