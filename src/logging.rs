// src/logging.rs
use anyhow::{Context, Result};
use std::{fs::OpenOptions, path::Path, sync::Mutex};
use tracing::Subscriber;
use tracing_subscriber::{
    fmt::{self, MakeWriter},
    layer::SubscriberExt,
    registry::LookupSpan,
    EnvFilter,
};

const DEFAULT_FILTER: &str = "info";

/// Two `fmt` layers over one registry: `console` gets ANSI colours, `file`
/// gets plain lines. Both print `timestamp LEVEL message`.
pub fn subscriber<C, F>(console: C, file: F) -> impl Subscriber + Send + Sync + for<'a> LookupSpan<'a>
where
    C: for<'w> MakeWriter<'w> + Send + Sync + 'static,
    F: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let console_layer = fmt::layer()
        .with_target(false)
        .with_writer(console);
    let file_layer = fmt::layer()
        .with_target(false)
        .with_ansi(false)
        .with_writer(file);

    tracing_subscriber::registry()
        .with(env)
        .with(console_layer)
        .with(file_layer)
}

/// Install the process-wide subscriber: stdout plus `log_path` (appended).
pub fn init(log_path: &Path) -> Result<()> {
    if let Some(parent) = log_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating log directory {}", parent.display()))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)
        .with_context(|| format!("opening log file {}", log_path.display()))?;

    tracing::subscriber::set_global_default(subscriber(std::io::stdout, Mutex::new(file)))
        .context("installing global tracing subscriber")?;
    Ok(())
}
