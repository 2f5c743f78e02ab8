// src/error.rs
use std::path::PathBuf;
use thiserror::Error;

/// Every failure the pipeline can hit. All of them are fatal to a run.
#[derive(Error, Debug)]
pub enum EtlError {
    #[error("file not found: {}", .path.display())]
    NotFound { path: PathBuf },

    #[error("malformed input: {0}")]
    MalformedInput(String),

    #[error("network error: {message}")]
    Network {
        message: String,
        #[source]
        source: Option<reqwest::Error>,
    },

    #[error("i/o error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl EtlError {
    pub fn malformed(message: impl Into<String>) -> Self {
        EtlError::MalformedInput(message.into())
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        EtlError::Io {
            path: path.into(),
            source,
        }
    }

    /// Short class name used in log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            EtlError::NotFound { .. } => "NotFound",
            EtlError::MalformedInput(_) => "MalformedInput",
            EtlError::Network { .. } => "NetworkError",
            EtlError::Io { .. } => "IOError",
            EtlError::Config(_) => "ConfigError",
        }
    }
}

impl From<reqwest::Error> for EtlError {
    fn from(err: reqwest::Error) -> Self {
        let message = match err.url() {
            Some(url) => format!("request to {} failed: {}", url, err),
            None => format!("request failed: {}", err),
        };
        EtlError::Network {
            message,
            source: Some(err),
        }
    }
}
