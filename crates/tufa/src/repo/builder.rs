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

//! Construction of unsigned role payloads.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Duration, SubsecRound, Utc};
use walkdir::WalkDir;

use super::{RepoError, RepositoryConfig};
use crate::keystore::KeyStore;
use crate::metadata::{
    paths, Delegations, FileInfo, ReleaseMetadata, RoleName, RootMetadata, TargetsMetadata,
    TimestampMetadata,
};

pub(crate) const RELEASE_FILE: &str = "release.txt";
pub(crate) const RELEASE_FILE_GZ: &str = "release.txt.gz";

/// Builds role payloads that expire a fixed interval after creation.
#[derive(Debug, Clone)]
pub struct MetadataBuilder {
    expiration: Duration,
}

impl MetadataBuilder {
    pub fn new(expiration_days: u32) -> Self {
        Self {
            expiration: Duration::days(i64::from(expiration_days)),
        }
    }

    pub fn from_config(config: &RepositoryConfig) -> Self {
        Self::new(config.expiration_days)
    }

    /// Expiry for a payload built now, to whole seconds.
    pub fn expires(&self) -> DateTime<Utc> {
        (Utc::now() + self.expiration).trunc_subsecs(0)
    }

    /// Root payload for `config`. Every configured key must be loaded in
    /// `keystore` so its public half can be embedded.
    pub fn build_root(
        &self,
        config: &RepositoryConfig,
        keystore: &KeyStore,
        version: u64,
    ) -> Result<RootMetadata, RepoError> {
        config.validate()?;

        let mut keys = BTreeMap::new();
        let mut roles = BTreeMap::new();
        for (role, role_keys) in &config.roles {
            for keyid in &role_keys.keyids {
                let key = keystore.get_key(keyid)?;
                keys.insert(keyid.clone(), key.public_key());
            }
            roles.insert(role.clone(), role_keys.to_role_info());
        }

        Ok(RootMetadata {
            version,
            expires: self.expires(),
            keys,
            roles,
        })
    }

    /// Targets payload listing every file under `targets_dir`.
    ///
    /// Paths are relative to `targets_dir`. When `scope` is given only
    /// files within one of its patterns are listed.
    pub fn build_targets(
        &self,
        targets_dir: &Path,
        scope: Option<&[String]>,
        version: u64,
        delegations: Option<Delegations>,
    ) -> Result<TargetsMetadata, RepoError> {
        if !targets_dir.is_dir() {
            return Err(RepoError::MissingDirectory(targets_dir.to_path_buf()));
        }

        let mut targets = BTreeMap::new();
        for (path, fileinfo) in file_infos(targets_dir)? {
            let included = match scope {
                Some(patterns) => patterns.iter().any(|p| paths::is_path_within(&path, p)),
                None => true,
            };
            if included {
                targets.insert(path, fileinfo);
            }
        }

        Ok(TargetsMetadata {
            version,
            expires: self.expires(),
            targets,
            delegations: delegations.filter(|d| !d.is_empty()),
        })
    }

    /// Release payload pinning `root.txt`, `targets.txt` and every
    /// delegated targets file found under `metadata_dir/targets/`.
    pub fn build_release(&self, metadata_dir: &Path, version: u64) -> Result<ReleaseMetadata, RepoError> {
        if !metadata_dir.is_dir() {
            return Err(RepoError::MissingDirectory(metadata_dir.to_path_buf()));
        }

        let mut meta = BTreeMap::new();
        for role in [RoleName::Root, RoleName::Targets] {
            let name = role.metadata_filename();
            meta.insert(name.clone(), required_file_info(&metadata_dir.join(name))?);
        }

        let delegated_dir = metadata_dir.join(RoleName::Targets.as_str());
        if delegated_dir.is_dir() {
            for (path, fileinfo) in file_infos(&delegated_dir)? {
                if path.ends_with(".txt") {
                    meta.insert(format!("{}/{path}", RoleName::Targets), fileinfo);
                }
            }
        }

        Ok(ReleaseMetadata {
            version,
            expires: self.expires(),
            meta,
        })
    }

    /// Timestamp payload pinning the release file. The gzip sibling is
    /// pinned instead when it exists.
    pub fn build_timestamp(
        &self,
        metadata_dir: &Path,
        version: u64,
    ) -> Result<TimestampMetadata, RepoError> {
        let compressed = metadata_dir.join(RELEASE_FILE_GZ);
        let (name, path) = if compressed.is_file() {
            (RELEASE_FILE_GZ, compressed)
        } else {
            (RELEASE_FILE, metadata_dir.join(RELEASE_FILE))
        };

        let fileinfo = required_file_info(&path)?;
        Ok(TimestampMetadata {
            version,
            expires: self.expires(),
            meta: BTreeMap::from([(name.to_string(), fileinfo)]),
        })
    }
}

fn required_file_info(path: &Path) -> Result<FileInfo, RepoError> {
    if !path.is_file() {
        return Err(RepoError::MissingMetadata(path.to_path_buf()));
    }
    FileInfo::from_path(path).map_err(RepoError::io(path))
}

/// File-info of every regular file under `dir`, keyed by relative path.
fn file_infos(dir: &Path) -> Result<Vec<(String, FileInfo)>, RepoError> {
    let mut infos = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(|e| RepoError::Io {
            path: e.path().unwrap_or(dir).to_path_buf(),
            source: e.into(),
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(relative) = paths::relative_target_path(dir, entry.path()) else {
            tracing::warn!(path = %entry.path().display(), "Skipping file with unsupported name");
            continue;
        };
        let fileinfo = FileInfo::from_path(entry.path()).map_err(RepoError::io(entry.path()))?;
        infos.push((relative, fileinfo));
    }
    Ok(infos)
}
