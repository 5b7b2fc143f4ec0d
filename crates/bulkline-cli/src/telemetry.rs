//! Log output for the `bulkline` binary.
//!
//! Standard output carries the rendered bulks, so every log line goes to
//! standard error. The filter is read from `BULKLINE_LOG`, then `RUST_LOG`,
//! and defaults to `warn`:
//!
//! ```bash
//! BULKLINE_LOG=debug bulkline -n 3 < commands.txt
//! ```

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

pub fn init_telemetry() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(env_filter())
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_thread_ids(true)
                .with_thread_names(true)
                .with_line_number(true)
                .with_target(false)
                .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
                .with_file(true),
        )
        .try_init()?;

    Ok(())
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_env("BULKLINE_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("warn"))
}
