//! Batch processing: feed discovered files to the pool, then persist results.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::time::Instant;

use imgpool_core::{
    FileDiscovery, FsCollector, ImagePipeline, ImagePool, InvertTransform, MemoryCollector,
    ResultCollection,
};
use tokio_util::sync::CancellationToken;

use super::setup::ProcessContext;
use super::types::{Algorithm, CollectorKind};
use super::ProcessArgs;

/// Run one batch to completion or until Ctrl-C.
pub async fn run_batch(ctx: ProcessContext, args: &ProcessArgs) -> anyhow::Result<()> {
    let cancel = CancellationToken::new();
    install_interrupt_handler(cancel.clone());
    process_files(ctx, args, cancel).await
}

async fn process_files(
    ctx: ProcessContext,
    args: &ProcessArgs,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    let start_time = Instant::now();

    let files = FileDiscovery::new(ctx.config.processing.clone()).discover(&ctx.input);
    if files.is_empty() {
        tracing::warn!("No supported image files found at {:?}", ctx.input);
        return Ok(());
    }
    tracing::info!(
        "Found {} image(s) to process ({} bytes)",
        files.len(),
        FileDiscovery::total_size(&files)
    );

    let transform = match args.algo {
        Algorithm::Invert => InvertTransform::from_config(&ctx.config),
    };
    let results = ResultCollection::new();
    let pipeline = match args.collector {
        CollectorKind::Memory => {
            ImagePipeline::new(transform, MemoryCollector::new(results.clone()))
        }
        CollectorKind::Fs => ImagePipeline::new(transform, FsCollector::new(&ctx.output)),
    };
    let pool = pipeline.spawn_with_config(&ctx.config.pool, cancel.clone())?;
    tracing::info!("Started {} worker(s)", pool.workers());

    let max_bytes = ctx.config.limits.max_file_size_bytes();
    for file in &files {
        let task = match file.open(max_bytes) {
            Ok(task) => task,
            Err(e) => {
                tracing::error!("Skipping {:?}: {e}", file.path);
                continue;
            }
        };
        if let Err(e) = pool.submit(task, &cancel).await {
            tracing::warn!("Stopped submitting at {:?}: {e}", file.path);
            break;
        }
    }

    if pool.join().await {
        tracing::warn!("Cancellation requested, stopping processing");
        return Ok(());
    }

    if args.collector == CollectorKind::Memory {
        let written = write_results(&results, &ctx.output, &cancel);
        tracing::info!("Wrote {written} image(s) to {:?}", ctx.output);
    }

    report(&pool, args, start_time)
}

fn install_interrupt_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, cancelling");
            cancel.cancel();
        }
    });
}

/// Write every collected image to `output/<basename>`, in name order.
///
/// A file that cannot be written is logged and skipped. Stops early once
/// `cancel` fires. Returns the number of files written.
fn write_results(results: &ResultCollection, output: &Path, cancel: &CancellationToken) -> usize {
    let mut written = 0;
    for (name, bytes) in results.drain_sorted() {
        if cancel.is_cancelled() {
            tracing::warn!("Cancellation requested, stopping output writes");
            break;
        }
        let Some(file_name) = Path::new(&name).file_name() else {
            tracing::error!("Result {name:?} has no file name, skipping");
            continue;
        };
        let path = output.join(file_name);
        match save(&path, &bytes) {
            Ok(()) => written += 1,
            Err(e) => tracing::error!("Unable to save output file {:?}: {e}", path),
        }
    }
    written
}

fn save(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = private_options().open(path)?;
    file.write_all(bytes)
}

#[cfg(unix)]
fn private_options() -> OpenOptions {
    use std::os::unix::fs::OpenOptionsExt;
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true).mode(0o600);
    options
}

#[cfg(not(unix))]
fn private_options() -> OpenOptions {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    options
}

fn report(pool: &ImagePool, args: &ProcessArgs, start_time: Instant) -> anyhow::Result<()> {
    let stats = pool.stats();
    tracing::info!(
        "Processed {} image(s): {} succeeded, {} failed",
        stats.succeeded + stats.failed,
        stats.succeeded,
        stats.failed
    );
    if args.timing {
        tracing::info!("Processing took {:?}", start_time.elapsed());
    }
    if args.stats {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    }
    Ok(())
}
