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

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use tufa::{ClientConfig, Mirror, MirrorList, RefreshOrder};

use super::ConfigError;

/// Contents of `tufa.toml`. Every section is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TufaConfig {
    #[serde(default)]
    pub keystore: KeystoreSection,
    #[serde(default)]
    pub repository: RepositorySection,
    #[serde(default)]
    pub client: ClientSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeystoreSection {
    pub dir: PathBuf,
}

impl Default for KeystoreSection {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("./keystore"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositorySection {
    pub dir: PathBuf,
    #[serde(default = "default_expiration_days")]
    pub expiration_days: u32,
}

fn default_expiration_days() -> u32 {
    365
}

impl Default for RepositorySection {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("./repository"),
            expiration_days: default_expiration_days(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientSection {
    #[serde(default = "default_client_name")]
    pub name: String,
    /// Holds `metadata/current` and `metadata/previous`.
    pub repository_dir: PathBuf,
    /// Where downloaded targets are installed.
    pub targets_dir: PathBuf,
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
    #[serde(default)]
    pub refresh_order: RefreshOrder,
    /// Used when no trusted mirror list is installed.
    #[serde(default)]
    pub mirrors: Vec<Mirror>,
}

fn default_client_name() -> String {
    "default".to_string()
}

fn default_fetch_timeout_secs() -> u64 {
    15
}

impl Default for ClientSection {
    fn default() -> Self {
        Self {
            name: default_client_name(),
            repository_dir: PathBuf::from("./client"),
            targets_dir: PathBuf::from("./installed"),
            fetch_timeout_secs: default_fetch_timeout_secs(),
            refresh_order: RefreshOrder::default(),
            mirrors: Vec::new(),
        }
    }
}

impl ClientSection {
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig::builder()
            .repository_dir(&self.repository_dir)
            .fetch_timeout(Duration::from_secs(self.fetch_timeout_secs))
            .refresh_order(self.refresh_order)
            .build()
    }

    pub fn mirror_list(&self) -> Result<MirrorList, ConfigError> {
        MirrorList::from_mirrors(self.mirrors.clone())
            .map_err(|e| ConfigError::ValidationError(e.to_string()))
    }
}

impl TufaConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.repository.expiration_days == 0 {
            return Err(ConfigError::ValidationError(
                "repository.expiration_days must be at least 1".to_string(),
            ));
        }
        if self.client.fetch_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "client.fetch_timeout_secs must be at least 1".to_string(),
            ));
        }
        self.client.mirror_list()?;
        Ok(())
    }
}
