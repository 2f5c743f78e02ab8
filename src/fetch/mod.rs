// src/fetch/mod.rs

use crate::error::EtlError;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};
use url::Url;

/// The PX-Web query sent as the POST body. Its structure belongs to the
/// remote API; we never look inside.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueryDescriptor(pub serde_json::Value);

/// Module for reading the query descriptor from disk
pub mod request {
    use super::*;
    use std::{fs, io::ErrorKind, path::Path};

    /// Read and parse the JSON document at `path`.
    #[instrument(level = "debug", skip_all, fields(path = %path.as_ref().display()))]
    pub fn load_query(path: impl AsRef<Path>) -> Result<QueryDescriptor, EtlError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => EtlError::NotFound {
                path: path.to_path_buf(),
            },
            _ => EtlError::io(path, e),
        })?;

        let value: serde_json::Value = serde_json::from_str(&text).map_err(|e| {
            EtlError::malformed(format!("JSON in {}: {}", path.display(), e))
        })?;
        debug!(bytes = text.len(), "query descriptor loaded");
        Ok(QueryDescriptor(value))
    }
}

/// Module for the single POST against the statistics API
pub mod http {
    use super::*;
    use reqwest::blocking::Client;
    use std::time::Duration;

    const USER_AGENT: &str = concat!("sistat_wages/", env!("CARGO_PKG_VERSION"));

    /// Anything that can turn a query into a CSV body.
    pub trait Fetch {
        fn fetch(&self, endpoint: &Url, query: &QueryDescriptor) -> Result<String, EtlError>;
    }

    /// Blocking reqwest client with a fixed per-request timeout.
    #[derive(Debug, Clone)]
    pub struct HttpFetcher {
        client: Client,
    }

    impl HttpFetcher {
        pub fn new(timeout: Duration) -> Result<Self, EtlError> {
            let client = Client::builder()
                .timeout(timeout)
                .user_agent(USER_AGENT)
                .build()?;
            Ok(Self { client })
        }
    }

    impl Fetch for HttpFetcher {
        #[instrument(level = "info", skip(self, query), fields(url = %endpoint))]
        fn fetch(&self, endpoint: &Url, query: &QueryDescriptor) -> Result<String, EtlError> {
            let resp = self
                .client
                .post(endpoint.clone())
                .json(query)
                .send()?
                .error_for_status()?;
            let status = resp.status();
            let body = resp.text()?;
            info!(%status, bytes = body.len(), "response received");
            Ok(body)
        }
    }
}

pub use http::{Fetch, HttpFetcher};
pub use request::load_query;
