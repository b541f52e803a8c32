use anyhow::{Context, Result};
use std::sync::OnceLock;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::config::MergedConfig;

static INIT_GUARD: OnceLock<()> = OnceLock::new();

/// Install the global subscriber: stderr always, plus a plain-text log file
/// when one is configured.
pub fn initialize_logging(config: &MergedConfig) -> Result<()> {
    if INIT_GUARD.set(()).is_err() {
        // Second call is a no-op
        return Ok(());
    }
    if config.quiet {
        return Ok(());
    }

    let console = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(env_filter(&config.log_filter));

    let file = match &config.log_file {
        Some(path) => {
            let log_file = std::fs::OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(path)
                .with_context(|| format!("Failed to open log file '{}'", path.display()))?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_file(true)
                    .with_line_number(true)
                    .with_writer(log_file)
                    .with_target(true)
                    .with_ansi(false)
                    .with_filter(env_filter(&config.log_filter)),
            )
        }
        None => None,
    };

    // Ignore AlreadyInit errors silently
    let _ = tracing_subscriber::registry()
        .with(console)
        .with(file)
        .try_init();
    Ok(())
}

fn env_filter(directives: &str) -> EnvFilter {
    EnvFilter::try_new(directives).unwrap_or_else(|_| EnvFilter::new("warn"))
}
