// src/config.rs
use crate::error::EtlError;
use serde::Deserialize;
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};
use url::Url;

/// PX-Web endpoint for table 0701015S (average monthly gross and net pay).
pub const DEFAULT_ENDPOINT: &str = "https://pxweb.stat.si:443/SiStatData/api/v1/sl/Data/0701015S.px";
pub const DEFAULT_REQUEST_PATH: &str = "json_requests/sistat_gross_net_pay_monthly_request.json";
pub const DEFAULT_OUTPUT_PATH: &str = "files/sistat_gross_net_pay_monthly.xlsx";
pub const DEFAULT_LOG_PATH: &str = "logfile.log";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Everything a run needs to know. Loaded from defaults, then an optional
/// YAML file, then command-line overrides.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub endpoint: Url,
    pub request_path: PathBuf,
    pub output_path: PathBuf,
    pub log_path: PathBuf,
    pub timeout_secs: u64,
    /// Reshape into the long Bruto/Neto form before writing.
    pub pivot: bool,
    /// Re-open the written workbook and compare it with the in-memory table.
    pub verify_output: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: Url::parse(DEFAULT_ENDPOINT).expect("default endpoint should parse"),
            request_path: PathBuf::from(DEFAULT_REQUEST_PATH),
            output_path: PathBuf::from(DEFAULT_OUTPUT_PATH),
            log_path: PathBuf::from(DEFAULT_LOG_PATH),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            pivot: true,
            verify_output: true,
        }
    }
}

impl Config {
    /// Parse a YAML document; missing keys keep their defaults.
    ///
    /// Values are not validated here: command-line overrides may still
    /// replace them. Call [`Config::validate`] on the merged result.
    pub fn from_yaml_str(text: &str) -> Result<Self, EtlError> {
        serde_yaml::from_str(text).map_err(|e| EtlError::Config(e.to_string()))
    }

    pub fn from_yaml_file(path: &Path) -> Result<Self, EtlError> {
        if !path.exists() {
            return Err(EtlError::NotFound {
                path: path.to_path_buf(),
            });
        }
        let text = fs::read_to_string(path).map_err(|e| EtlError::io(path, e))?;
        Self::from_yaml_str(&text).map_err(|e| match e {
            EtlError::Config(msg) => EtlError::Config(format!("{}: {}", path.display(), msg)),
            other => other,
        })
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn validate(&self) -> Result<(), EtlError> {
        if self.timeout_secs == 0 {
            return Err(EtlError::Config("timeout_secs must be at least 1".into()));
        }
        if !matches!(self.endpoint.scheme(), "http" | "https") {
            return Err(EtlError::Config(format!(
                "endpoint must be http(s), got {}",
                self.endpoint
            )));
        }
        if self.output_path.as_os_str().is_empty() {
            return Err(EtlError::Config("output_path must not be empty".into()));
        }
        Ok(())
    }
}
