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

//! Mirror descriptions and the ordered mirror list.
//!
//! This module provides:
//! - [`Mirror`] and [`MirrorList`] with add/remove and URL derivation
//! - Building and loading the signed `mirrorlist.txt` document
//! - [`update_mirrorlist`], which replaces the trusted list from a URL

mod update;

pub use update::update_mirrorlist;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::client::{DownloadError, StoreError};
use crate::keystore::KeyStore;
use crate::metadata::{paths, FormatError, KeyId, MirrorsMetadata, RoleName, SignedMetadata};
use crate::repo::{MetadataBuilder, RepoError};
use crate::trust::VerificationError;

/// Errors that can occur while managing or updating mirrors.
#[derive(Debug, Error)]
pub enum MirrorError {
    #[error("A mirror named '{0}' already exists")]
    DuplicateName(String),

    #[error("A mirror with URL prefix '{0}' already exists")]
    DuplicateUrl(String),

    #[error("No mirror with URL prefix '{0}'")]
    NotFound(String),

    #[error("Invalid mirror '{name}': {reason}")]
    InvalidMirror { name: String, reason: String },

    #[error(transparent)]
    Format(#[from] FormatError),

    #[error(transparent)]
    Verification(#[from] VerificationError),

    #[error(transparent)]
    Download(#[from] DownloadError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A server hosting copies of the repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mirror {
    pub name: String,
    pub url_prefix: String,
    pub metadata_path: String,
    pub targets_path: String,
    /// Target path patterns this mirror may serve. Empty means unconfined.
    #[serde(default)]
    pub confined_target_paths: Vec<String>,
}

impl Mirror {
    pub fn new(
        name: impl Into<String>,
        url_prefix: impl Into<String>,
        metadata_path: impl Into<String>,
        targets_path: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            url_prefix: url_prefix.into(),
            metadata_path: metadata_path.into(),
            targets_path: targets_path.into(),
            confined_target_paths: Vec::new(),
        }
    }

    pub fn with_confined_target_paths(mut self, paths: Vec<String>) -> Self {
        self.confined_target_paths = paths;
        self
    }

    pub fn validate(&self) -> Result<(), MirrorError> {
        let invalid = |reason: String| MirrorError::InvalidMirror {
            name: self.name.clone(),
            reason,
        };
        if self.name.trim().is_empty() {
            return Err(invalid("empty name".to_string()));
        }
        let url = Url::parse(&self.url_prefix).map_err(|e| invalid(e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https" | "file") {
            return Err(invalid(format!("unsupported scheme '{}'", url.scheme())));
        }
        for pattern in &self.confined_target_paths {
            paths::validate_path_pattern(pattern)?;
        }
        Ok(())
    }

    /// True when this mirror may serve the target at `path`.
    pub fn serves_target(&self, path: &str) -> bool {
        paths::path_in_confined_paths(path, &self.confined_target_paths)
    }

    pub fn metadata_url(&self, file: &str) -> String {
        self.join_url(&self.metadata_path, file)
    }

    pub fn target_url(&self, path: &str) -> String {
        self.join_url(&self.targets_path, path)
    }

    fn join_url(&self, base_path: &str, file: &str) -> String {
        let mut url = self.url_prefix.trim_end_matches('/').to_string();
        let segments = base_path
            .split('/')
            .chain(file.split('/'))
            .filter(|segment| !segment.is_empty());
        for segment in segments {
            url.push('/');
            url.push_str(&urlencoding::encode(segment));
        }
        url
    }
}

/// Which kind of file a mirror URL is needed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    Metadata,
    Target,
}

/// An ordered set of mirrors with unique names and URL prefixes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MirrorList {
    mirrors: Vec<Mirror>,
}

impl MirrorList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a list, rejecting invalid or duplicate entries.
    pub fn from_mirrors(mirrors: impl IntoIterator<Item = Mirror>) -> Result<Self, MirrorError> {
        let mut list = Self::new();
        for mirror in mirrors {
            list.add_mirror(mirror)?;
        }
        Ok(list)
    }

    pub fn add_mirror(&mut self, mirror: Mirror) -> Result<(), MirrorError> {
        mirror.validate()?;
        if self.mirrors.iter().any(|m| m.name == mirror.name) {
            return Err(MirrorError::DuplicateName(mirror.name));
        }
        if self.mirrors.iter().any(|m| m.url_prefix == mirror.url_prefix) {
            return Err(MirrorError::DuplicateUrl(mirror.url_prefix));
        }
        self.mirrors.push(mirror);
        Ok(())
    }

    /// Removes the mirror with the given URL prefix.
    pub fn remove_mirror(&mut self, url_prefix: &str) -> Result<Mirror, MirrorError> {
        let index = self
            .mirrors
            .iter()
            .position(|m| m.url_prefix == url_prefix)
            .ok_or_else(|| MirrorError::NotFound(url_prefix.to_string()))?;
        Ok(self.mirrors.remove(index))
    }

    pub fn mirrors(&self) -> &[Mirror] {
        &self.mirrors
    }

    pub fn len(&self) -> usize {
        self.mirrors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mirrors.is_empty()
    }

    /// URLs for `path` on every eligible mirror, in mirror order.
    ///
    /// Metadata may come from any mirror. Targets only come from mirrors
    /// whose confinement covers `path`.
    pub fn get_list_of_mirrors(&self, file_type: FileType, path: &str) -> Vec<String> {
        match file_type {
            FileType::Metadata => self.mirrors.iter().map(|m| m.metadata_url(path)).collect(),
            FileType::Target => self
                .mirrors
                .iter()
                .filter(|m| m.serves_target(path))
                .map(|m| m.target_url(path))
                .collect(),
        }
    }

    pub fn to_metadata(&self, builder: &MetadataBuilder, version: u64) -> MirrorsMetadata {
        MirrorsMetadata {
            version,
            expires: builder.expires(),
            mirrors: self.mirrors.clone(),
        }
    }

    /// Signs the current mirror set as `mirrorlist.txt` in `metadata_dir`.
    ///
    /// The version is one more than that of an existing file.
    pub fn build_mirrorlist_file(
        &self,
        keyids: &[KeyId],
        metadata_dir: &Path,
        keystore: &KeyStore,
        builder: &MetadataBuilder,
    ) -> Result<PathBuf, RepoError> {
        let path = metadata_dir.join(RoleName::Mirrorlist.metadata_filename());
        let version = crate::repo::next_version(&path)?;
        let mut signable = SignedMetadata::from_typed(self.to_metadata(builder, version))?;
        crate::repo::sign_metadata(&mut signable, keyids, keystore)?;
        crate::repo::write_metadata_file(&signable, &path)?;
        Ok(path)
    }

    /// Reads a `mirrorlist.txt` that was already verified when installed.
    pub fn load_mirrorlist_from_file(path: &Path) -> Result<Self, MirrorError> {
        let bytes = std::fs::read(path).map_err(|source| MirrorError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let metadata: MirrorsMetadata = SignedMetadata::from_bytes(&bytes)?.typed()?;
        Self::from_mirrors(metadata.mirrors)
    }
}
