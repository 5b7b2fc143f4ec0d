#![doc = include_str!("../README.md")]

mod config;
mod telemetry;

use anyhow::{Context, anyhow};
use bulkline::{ConsoleSink, FileSink, SinkRegistry};
use clap::Parser;
use config::{CliArgs, Config, Input};
use std::{
    fs::File,
    io::{self, BufRead, BufReader},
    thread,
};
use telemetry::init_telemetry;

// Using mimalloc for better performance under contention between the input
// threads and the sink workers.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

fn main() -> anyhow::Result<()> {
    // Load from .env
    let _ = dotenvy::dotenv();
    let args = CliArgs::parse();
    let config = Config::try_from(args)?;

    init_telemetry()?;
    log_startup_info(&config);

    let registry = build_registry(&config)?;
    let result = feed_inputs(&registry, &config);

    // Drain the sinks even when an input failed, so no flushed bulk is lost.
    let reports = registry.shutdown()?;
    for report in &reports {
        tracing::info!(
            "Sink {} rendered {} bulks ({} commands), {} failed, {} dropped",
            report.name,
            report.stats.bulks_rendered,
            report.stats.commands_rendered,
            report.stats.render_failures,
            report.stats.bulks_dropped
        );
    }

    result
}

fn log_startup_info(config: &Config) {
    if cfg!(debug_assertions) {
        tracing::info!("Starting bulkline with full config: {:#?}", config);
    } else {
        tracing::info!(
            "Starting bulkline with bulk size {} on {} inputs",
            config.bulk_size,
            config.inputs.len()
        );
    }
}

fn build_registry(config: &Config) -> anyhow::Result<SinkRegistry> {
    let mut builder = SinkRegistry::builder();
    if config.console {
        builder = builder.with_sink_policy(ConsoleSink::stdout(), config.queue);
    }
    if let Some(dir) = &config.log_dir {
        let sink = FileSink::new(dir).context("failed to prepare file sink")?;
        builder = builder.with_sink_policy(sink, config.queue);
    }
    builder.build().context("failed to start sink workers")
}

/// Feeds every input through its own handle, each on its own thread.
///
/// All inputs run to completion; the first error is returned.
fn feed_inputs(registry: &SinkRegistry, config: &Config) -> anyhow::Result<()> {
    thread::scope(|s| {
        let workers: Vec<_> = config
            .inputs
            .iter()
            .map(|input| {
                let worker = s.spawn(move || feed_input(registry, config.bulk_size, input));
                (input, worker)
            })
            .collect();

        let mut first_err = None;
        for (input, worker) in workers {
            let result = worker
                .join()
                .map_err(|_| anyhow!("input thread for {input} panicked"))
                .and_then(|result| result);
            if let Err(e) = result {
                tracing::error!("{e:#}");
                first_err.get_or_insert(e);
            }
        }

        first_err.map_or(Ok(()), Err)
    })
}

fn feed_input(registry: &SinkRegistry, bulk_size: usize, input: &Input) -> anyhow::Result<()> {
    let reader: Box<dyn BufRead> = match input {
        Input::Stdin => Box::new(io::stdin().lock()),
        Input::File(path) => Box::new(BufReader::new(
            File::open(path).with_context(|| format!("failed to open {input}"))?,
        )),
    };

    let mut handle = registry.create_handler(bulk_size)?;
    for line in reader.lines() {
        // The handle is dropped on error, which flushes what was read so far.
        let line = line.with_context(|| format!("failed to read {input}"))?;
        handle.feed(&line);
    }

    let stats = registry.destroy_handler(handle);
    tracing::debug!(
        "Finished {input}: {} lines, {} commands, {} bulks, {} unmatched closes",
        stats.lines,
        stats.commands,
        stats.bulks,
        stats.unmatched_closes
    );

    Ok(())
}
