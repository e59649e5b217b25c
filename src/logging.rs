//! Tracing setup for the import pipeline.
//!
//! Level filtering comes from the `GALLERY_LOG` environment variable
//! (default `info`). Events go to journald when it is reachable; anywhere
//! else, or when the socket is missing, they go to a daily-rolled file
//! under the given directory.

use std::path::PathBuf;
use std::sync::OnceLock;

use anyhow::Result;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

// The non-blocking writer stops flushing once its guard drops; init() is
// called once per process, so the guard lives here.
static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();

pub fn init(log_dir: Option<PathBuf>) -> Result<()> {
    let filter = EnvFilter::try_from_env("GALLERY_LOG").unwrap_or_else(|_| EnvFilter::new("info"));

    #[cfg(target_os = "linux")]
    if let Ok(journald) = tracing_journald::layer() {
        tracing_subscriber::registry()
            .with(filter)
            .with(journald)
            .init();
        tracing::debug!("logging to journald");
        return Ok(());
    }

    let log_dir = log_dir.unwrap_or_else(default_log_dir);
    std::fs::create_dir_all(&log_dir)?;

    let (writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::daily(&log_dir, "import.log"));
    let _ = FILE_GUARD.set(guard);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(writer).with_ansi(false))
        .init();
    tracing::debug!(dir = %log_dir.display(), "logging to file");
    Ok(())
}

fn default_log_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("gallery-ingest/logs")
}
