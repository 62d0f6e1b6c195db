//! Blocking "GET the whole body" helper used for remote manifests and URI blocks.

use std::io::Read;
use std::time::Duration;

use reqwest::blocking::Client;
use tracing::debug;

use crate::error::{CodecError, Result};

/// Default timeout for a single request in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Clone, Debug)]
pub struct FetchConfig {
    pub timeout: Duration,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self { timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS) }
    }
}

impl FetchConfig {
    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }

    fn client(&self, url: &str) -> Result<Client> {
        Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|source| CodecError::Fetch { url: url.to_string(), source })
    }
}

/// Fetch `url` and buffer the full response body in memory.
pub fn fetch_bytes(url: &str, cfg: &FetchConfig) -> Result<Vec<u8>> {
    let fetch_err = |source| CodecError::Fetch { url: url.to_string(), source };
    let mut resp = cfg.client(url)?.get(url).send().map_err(fetch_err)?;
    let status = resp.status();
    if !status.is_success() {
        return Err(CodecError::FetchStatus { url: url.to_string(), status: status.as_u16() });
    }
    let mut body = Vec::new();
    resp.read_to_end(&mut body)?;
    debug!(url, bytes = body.len(), "fetched");
    Ok(body)
}
