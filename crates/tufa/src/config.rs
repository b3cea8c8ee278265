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

//! Client configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// The order in which a refresh walks the top-level roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RefreshOrder {
    /// root, timestamp, release, targets, delegated targets. Each file is
    /// checked against the file-info pinned by the role before it.
    #[default]
    Secure,
    /// root, targets, release, timestamp. Each file is checked only by
    /// signature, version and expiry.
    Legacy,
}

/// Configuration for a client [`Repository`](crate::client::Repository).
///
/// # Construction
///
/// ```rust,ignore
/// let config = ClientConfig::builder()
///     .repository_dir("/var/lib/app/updates")
///     .fetch_timeout(Duration::from_secs(30))
///     .build();
/// ```
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct ClientConfig {
    repository_dir: PathBuf,
    fetch_timeout: Duration,
    max_metadata_length: u64,
    max_timestamp_length: u64,
    refresh_order: RefreshOrder,
}

impl ClientConfig {
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }

    /// Directory containing `metadata/current` and `metadata/previous`.
    pub fn repository_dir(&self) -> &Path {
        &self.repository_dir
    }

    pub fn metadata_dir(&self) -> PathBuf {
        self.repository_dir.join("metadata")
    }

    /// Connect and read timeout for every fetch.
    pub fn fetch_timeout(&self) -> Duration {
        self.fetch_timeout
    }

    /// Upper bound for metadata whose length is not pinned.
    pub fn max_metadata_length(&self) -> u64 {
        self.max_metadata_length
    }

    pub fn max_timestamp_length(&self) -> u64 {
        self.max_timestamp_length
    }

    pub fn refresh_order(&self) -> RefreshOrder {
        self.refresh_order
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfigBuilder::default().build()
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl Default for ClientConfigBuilder {
    fn default() -> Self {
        Self {
            config: ClientConfig {
                repository_dir: PathBuf::from("."),
                fetch_timeout: Duration::from_secs(15),
                max_metadata_length: 16 * 1024 * 1024,
                max_timestamp_length: 16 * 1024,
                refresh_order: RefreshOrder::Secure,
            },
        }
    }
}

impl ClientConfigBuilder {
    pub fn repository_dir(mut self, value: impl Into<PathBuf>) -> Self {
        self.config.repository_dir = value.into();
        self
    }

    pub fn fetch_timeout(mut self, value: Duration) -> Self {
        self.config.fetch_timeout = value;
        self
    }

    pub fn max_metadata_length(mut self, value: u64) -> Self {
        self.config.max_metadata_length = value;
        self
    }

    pub fn max_timestamp_length(mut self, value: u64) -> Self {
        self.config.max_timestamp_length = value;
        self
    }

    pub fn refresh_order(mut self, value: RefreshOrder) -> Self {
        self.config.refresh_order = value;
        self
    }

    pub fn build(self) -> ClientConfig {
        self.config
    }
}
