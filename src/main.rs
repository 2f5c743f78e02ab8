use clap::{error::ErrorKind, Parser};
use sistat_wages::{
    config::{Config, DEFAULT_LOG_PATH},
    fetch::HttpFetcher,
    logging, EtlError,
};
use std::{ffi::OsString, path::PathBuf, process::ExitCode};
use tracing::{error, info};
use url::Url;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Fetch SiStat gross/net monthly pay and save it as an .xlsx workbook",
    long_about = None
)]
struct Cli {
    /// YAML config file; command-line flags override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// PX-Web table endpoint to POST the query to
    #[arg(long)]
    endpoint: Option<Url>,

    /// JSON query descriptor sent as the request body
    #[arg(long)]
    request: Option<PathBuf>,

    /// Workbook to write (overwritten)
    #[arg(long)]
    output: Option<PathBuf>,

    /// Log file (appended)
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Request timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Keep the wide Bruto/Neto columns instead of pivoting them
    #[arg(long)]
    no_pivot: bool,

    /// Skip re-reading the workbook after writing it
    #[arg(long)]
    no_verify: bool,
}

impl Cli {
    fn resolve(&self) -> Result<Config, EtlError> {
        let mut cfg = match &self.config {
            Some(path) => Config::from_yaml_file(path)?,
            None => Config::default(),
        };
        if let Some(endpoint) = &self.endpoint {
            cfg.endpoint = endpoint.clone();
        }
        if let Some(request) = &self.request {
            cfg.request_path = request.clone();
        }
        if let Some(output) = &self.output {
            cfg.output_path = output.clone();
        }
        if let Some(log_file) = &self.log_file {
            cfg.log_path = log_file.clone();
        }
        if let Some(timeout) = self.timeout {
            cfg.timeout_secs = timeout;
        }
        if self.no_pivot {
            cfg.pivot = false;
        }
        if self.no_verify {
            cfg.verify_output = false;
        }
        cfg.validate()?;
        Ok(cfg)
    }
}

/// `--log-file` taken straight from raw arguments, for when clap rejected them.
fn log_file_arg<I: IntoIterator<Item = OsString>>(args: I) -> Option<PathBuf> {
    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        if arg == "--log-file" {
            return args.next().map(PathBuf::from);
        }
        if let Some(value) = arg.to_str().and_then(|a| a.strip_prefix("--log-file=")) {
            return Some(PathBuf::from(value));
        }
    }
    None
}

fn main() -> ExitCode {
    let (config, log_file) = match Cli::try_parse() {
        Ok(cli) => (cli.resolve(), cli.log_file),
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => e.exit(),
        Err(e) => {
            let _ = e.print();
            let message = e.to_string();
            let first = message.lines().next().unwrap_or_default();
            (
                Err(EtlError::Config(first.trim_start_matches("error: ").to_string())),
                log_file_arg(std::env::args_os()),
            )
        }
    };

    // ─── 1) init logging ─────────────────────────────────────────────
    let log_path = match &config {
        Ok(cfg) => cfg.log_path.clone(),
        Err(_) => log_file.unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_PATH)),
    };
    if let Err(e) = logging::init(&log_path) {
        eprintln!("logging setup failed: {:#}", e);
        return ExitCode::from(1);
    }
    info!("startup");

    // ─── 2) run the pipeline ─────────────────────────────────────────
    let outcome = config.and_then(|cfg| {
        let fetcher = HttpFetcher::new(cfg.timeout())?;
        sistat_wages::run(&cfg, &fetcher)
    });

    match outcome {
        Ok(summary) => {
            info!(
                rows = summary.rows,
                pivoted = summary.pivoted,
                "wrote {}",
                summary.output_path.display()
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(kind = e.kind(), "{}", e);
            ExitCode::from(1)
        }
    }
}
