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

//! The repository's `config.toml`: which keys sign each top-level role.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::RepoError;
use crate::fsutil::write_atomic;
use crate::metadata::{KeyId, RoleInfo, RoleName};

pub const CONFIG_FILE: &str = "config.toml";

/// Default lifetime of generated metadata.
pub const DEFAULT_EXPIRATION_DAYS: u32 = 365;

/// Signing keys and threshold of one role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleKeys {
    pub keyids: Vec<KeyId>,
    pub threshold: u32,
}

impl RoleKeys {
    pub fn new(keyids: Vec<KeyId>, threshold: u32) -> Self {
        Self { keyids, threshold }
    }

    pub fn to_role_info(&self) -> RoleInfo {
        RoleInfo::new(self.keyids.clone(), self.threshold)
    }
}

/// Role configuration of a repository.
///
/// ```toml
/// expiration_days = 365
///
/// [roles.root]
/// keyids = ["4f2a..."]
/// threshold = 1
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryConfig {
    #[serde(default = "default_expiration_days")]
    pub expiration_days: u32,
    pub roles: BTreeMap<RoleName, RoleKeys>,
}

fn default_expiration_days() -> u32 {
    DEFAULT_EXPIRATION_DAYS
}

impl RepositoryConfig {
    pub fn new(expiration_days: u32) -> Self {
        Self {
            expiration_days,
            roles: BTreeMap::new(),
        }
    }

    pub fn with_role(mut self, role: RoleName, keys: RoleKeys) -> Self {
        self.roles.insert(role, keys);
        self
    }

    pub fn role(&self, role: &RoleName) -> Result<&RoleKeys, RepoError> {
        self.roles
            .get(role)
            .ok_or_else(|| RepoError::Config(format!("no keys configured for role '{role}'")))
    }

    /// Checks that every required role is present with a usable threshold
    /// and that no delegated role appears.
    pub fn validate(&self) -> Result<(), RepoError> {
        if self.expiration_days == 0 {
            return Err(RepoError::Config(
                "expiration_days must be at least 1".to_string(),
            ));
        }
        for role in RoleName::REQUIRED.iter() {
            self.role(role)?;
        }
        for (role, keys) in &self.roles {
            if role.is_delegated() {
                return Err(RepoError::Config(format!(
                    "delegated role '{role}' cannot be configured here"
                )));
            }
            keys.to_role_info().validate(role)?;
        }
        Ok(())
    }
}

/// Writes `config.toml` into `repository_dir`.
pub fn build_config_file(
    repository_dir: &Path,
    config: &RepositoryConfig,
) -> Result<PathBuf, RepoError> {
    if !repository_dir.is_dir() {
        return Err(RepoError::MissingDirectory(repository_dir.to_path_buf()));
    }
    config.validate()?;

    let contents = toml::to_string_pretty(config).map_err(|e| RepoError::Config(e.to_string()))?;
    let path = repository_dir.join(CONFIG_FILE);
    write_atomic(&path, contents.as_bytes()).map_err(RepoError::io(&path))?;
    tracing::info!(path = %path.display(), "Wrote repository configuration");
    Ok(path)
}

/// Reads and validates a `config.toml`.
pub fn read_config_file(path: &Path) -> Result<RepositoryConfig, RepoError> {
    let contents = std::fs::read_to_string(path).map_err(RepoError::io(path))?;
    let config: RepositoryConfig =
        toml::from_str(&contents).map_err(|e| RepoError::Config(e.to_string()))?;
    config.validate()?;
    Ok(config)
}
