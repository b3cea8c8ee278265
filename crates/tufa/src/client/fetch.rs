/*
 *  Copyright 2025-2026 Colliery Software
 *
 *  Licensed under the Apache License, Version 2.0 (the "License");
 *  you may not use this file except in compliance with the License.
 *  You may obtain a copy of the License at
 *
 *      http://www.apache.org/licenses/LICENSE-2.0
 *
 *  Unless required by applicable law or agreed to in writing, software
 *  distributed under the License is distributed on an "AS IS" BASIS,
 *  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 *  See the License for the specific language governing permissions and
 *  limitations under the License.
 */

//! Bounded retrieval of files from mirrors.

use std::io::Read;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use ureq::{Agent, AgentBuilder};
use url::Url;

use crate::metadata::IntegrityError;

/// Why one mirror failed to serve a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorAttempt {
    pub url: String,
    pub reason: String,
}

/// Errors that can occur while downloading from mirrors.
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("Connection to {url} failed: {reason}")]
    Connection { url: String, reason: String },

    #[error("{url} returned HTTP {status}")]
    HttpStatus { url: String, status: u16 },

    #[error("{url} sent more than {limit} bytes")]
    TooLarge { url: String, limit: u64 },

    #[error("{url} served a file that does not match its file-info: {source}")]
    Integrity {
        url: String,
        #[source]
        source: IntegrityError,
    },

    #[error("No mirror is eligible to serve '{0}'")]
    NoEligibleMirror(String),

    #[error("All {} mirror(s) failed for '{path}'", attempts.len())]
    AllMirrorsFailed {
        path: String,
        attempts: Vec<MirrorAttempt>,
    },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Retrieves raw bytes from a URL.
///
/// Implementations must stop reading once more than `max_length` bytes
/// have arrived and report [`DownloadError::TooLarge`].
pub trait Fetcher: Send + Sync {
    fn fetch(&self, url: &str, max_length: u64) -> Result<Vec<u8>, DownloadError>;
}

/// Plain-HTTP fetcher with per-connection timeouts. `file://` URLs are
/// read from the local filesystem.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    agent: Agent,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Self {
        let agent = AgentBuilder::new()
            .timeout_connect(timeout)
            .timeout_read(timeout)
            .build();
        Self { agent }
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new(Duration::from_secs(15))
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, url: &str, max_length: u64) -> Result<Vec<u8>, DownloadError> {
        tracing::debug!(url = %url, max_length = max_length, "Fetching");
        if let Some(path) = local_path(url) {
            let file = std::fs::File::open(&path).map_err(|source| DownloadError::Io { path, source })?;
            return read_bounded(file, url, max_length);
        }

        let response = self.agent.get(url).call().map_err(|e| match e {
            ureq::Error::Status(status, _) => DownloadError::HttpStatus {
                url: url.to_string(),
                status,
            },
            ureq::Error::Transport(transport) => DownloadError::Connection {
                url: url.to_string(),
                reason: transport.to_string(),
            },
        })?;

        let declared = response
            .header("Content-Length")
            .and_then(|value| value.trim().parse::<u64>().ok());
        if declared.is_some_and(|length| length > max_length) {
            return Err(DownloadError::TooLarge {
                url: url.to_string(),
                limit: max_length,
            });
        }

        read_bounded(response.into_reader(), url, max_length)
    }
}

fn local_path(url: &str) -> Option<PathBuf> {
    Url::parse(url)
        .ok()
        .filter(|parsed| parsed.scheme() == "file")
        .and_then(|parsed| parsed.to_file_path().ok())
}

/// Reads at most `max_length + 1` bytes so oversized bodies are detected
/// without buffering them.
pub(crate) fn read_bounded(
    reader: impl Read,
    url: &str,
    max_length: u64,
) -> Result<Vec<u8>, DownloadError> {
    let mut body = Vec::new();
    reader
        .take(max_length.saturating_add(1))
        .read_to_end(&mut body)
        .map_err(|e| DownloadError::Connection {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
    if body.len() as u64 > max_length {
        return Err(DownloadError::TooLarge {
            url: url.to_string(),
            limit: max_length,
        });
    }
    Ok(body)
}
