//! Tracing subscriber setup.
//!
//! The terminal belongs to the UI, so diagnostics go to a log file.
//! `RUST_LOG` overrides the default `info` filter.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

pub fn default_log_path() -> PathBuf {
    std::env::temp_dir().join("sitesync-terminal.log")
}

/// Install the global subscriber writing to `path`.
pub fn init(path: &Path) -> Result<()> {
    let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    build_subscriber(file)
        .try_init()
        .context("Failed to install tracing subscriber")?;
    tracing::debug!(path = %path.display(), "logging initialised");
    Ok(())
}

pub fn build_subscriber(log_file: File) -> impl tracing::Subscriber + Send + Sync {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = fmt::layer()
        .with_ansi(false)
        .with_writer(Arc::new(log_file));

    tracing_subscriber::registry().with(fmt_layer).with(env_filter)
}
