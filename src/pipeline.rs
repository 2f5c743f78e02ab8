// src/pipeline.rs
use crate::{
    config::Config,
    error::EtlError,
    fetch::{load_query, Fetch},
    process::{reshape::reshape, Table},
    sheet::{read_xlsx, write_xlsx, write_xlsx_checked},
};
use std::{path::PathBuf, time::Instant};
use tracing::{info, instrument};

/// What a successful run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub output_path: PathBuf,
    pub rows: usize,
    pub columns: Vec<String>,
    pub pivoted: bool,
}

/// Load → fetch → reshape → write (→ verify). The first error ends the run
/// and leaves the previous output, if any, in place.
#[instrument(level = "info", skip_all, fields(endpoint = %config.endpoint))]
pub fn run<F: Fetch>(config: &Config, fetcher: &F) -> Result<RunSummary, EtlError> {
    let start = Instant::now();

    // ─── 1) request descriptor ───────────────────────────────────────
    let query = load_query(&config.request_path)?;
    info!("loaded request {}", config.request_path.display());

    // ─── 2) fetch CSV body ───────────────────────────────────────────
    let body = fetcher.fetch(&config.endpoint, &query)?;

    // ─── 3) reshape ──────────────────────────────────────────────────
    let table = reshape(&body, config.pivot)?;

    // ─── 4) write workbook (verified before it replaces the output) ──
    if config.verify_output {
        write_xlsx_checked(&table, &config.output_path, |tmp| verify_written(&table, tmp))?;
    } else {
        write_xlsx(&table, &config.output_path)?;
    }

    info!(rows = table.len(), elapsed = ?start.elapsed(), "pipeline finished");
    Ok(RunSummary {
        output_path: config.output_path.clone(),
        rows: table.len(),
        columns: table.headers,
        pivoted: config.pivot,
    })
}

/// Re-open the workbook at `path` and compare header and row count with `expected`.
pub fn verify_written(expected: &Table, path: &std::path::Path) -> Result<(), EtlError> {
    let back = read_xlsx(path)?;
    if back.headers != expected.headers || back.len() != expected.len() {
        return Err(EtlError::io(
            path,
            std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!(
                    "read back {} rows x {:?}, wrote {} rows x {:?}",
                    back.len(),
                    back.headers,
                    expected.len(),
                    expected.headers
                ),
            ),
        ));
    }
    info!(rows = back.len(), "output verified");
    Ok(())
}
