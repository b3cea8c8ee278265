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

//! The client's `metadata/current` and `metadata/previous` directories.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::fsutil::write_atomic;
use crate::metadata::{FormatError, RoleName, SignedMetadata};

/// Errors reading trusted metadata back from disk.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Malformed trusted metadata in {}: {source}", path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: FormatError,
    },
}

/// Trusted metadata on disk.
///
/// `current/` holds the newest trusted copy of each role's file and
/// `previous/` the copy it replaced.
#[derive(Debug, Clone)]
pub struct MetadataStore {
    current: PathBuf,
    previous: PathBuf,
}

impl MetadataStore {
    pub fn new(metadata_dir: &Path) -> Self {
        Self {
            current: metadata_dir.join("current"),
            previous: metadata_dir.join("previous"),
        }
    }

    pub fn current_dir(&self) -> &Path {
        &self.current
    }

    pub fn previous_dir(&self) -> &Path {
        &self.previous
    }

    pub fn current_path(&self, role: &RoleName) -> PathBuf {
        self.current.join(role.metadata_filename())
    }

    pub fn previous_path(&self, role: &RoleName) -> PathBuf {
        self.previous.join(role.metadata_filename())
    }

    /// Raw bytes of the current file, or `None` if there is none.
    pub fn read_current(&self, role: &RoleName) -> io::Result<Option<Vec<u8>>> {
        match std::fs::read(self.current_path(role)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Parsed current file, or `None` if there is none. An unreadable or
    /// malformed file is an error, never `None`.
    pub fn load_current(&self, role: &RoleName) -> Result<Option<SignedMetadata>, StoreError> {
        let path = self.current_path(role);
        let Some(bytes) = self
            .read_current(role)
            .map_err(|source| StoreError::Io { path: path.clone(), source })?
        else {
            return Ok(None);
        };
        SignedMetadata::from_bytes(&bytes)
            .map(Some)
            .map_err(|source| StoreError::Malformed { path, source })
    }

    /// Makes `bytes` the current file for `role`.
    ///
    /// The existing current file, if any, is first copied to `previous/`.
    /// Both writes are atomic renames.
    pub fn install(&self, role: &RoleName, bytes: &[u8]) -> io::Result<()> {
        if let Some(existing) = self.read_current(role)? {
            write_atomic(&self.previous_path(role), &existing)?;
        }
        write_atomic(&self.current_path(role), bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_install_rotates_previous() {
        let dir = TempDir::new().unwrap();
        let store = MetadataStore::new(dir.path());
        let role: RoleName = "targets/role1".parse().unwrap();

        store.install(&role, b"v1").unwrap();
        assert!(!store.previous_path(&role).exists());

        store.install(&role, b"v2").unwrap();
        assert_eq!(std::fs::read(store.current_path(&role)).unwrap(), b"v2");
        assert_eq!(std::fs::read(store.previous_path(&role)).unwrap(), b"v1");
        assert!(store.current_path(&role).ends_with("current/targets/role1.txt"));
    }

    #[test]
    fn test_read_missing_is_none() {
        let dir = TempDir::new().unwrap();
        let store = MetadataStore::new(dir.path());
        assert!(store.read_current(&RoleName::Root).unwrap().is_none());
        assert!(store.load_current(&RoleName::Root).unwrap().is_none());
    }

    #[test]
    fn test_load_malformed_is_error() {
        let dir = TempDir::new().unwrap();
        let store = MetadataStore::new(dir.path());
        store.install(&RoleName::Mirrorlist, b"{ truncated").unwrap();

        assert!(matches!(
            store.load_current(&RoleName::Mirrorlist),
            Err(StoreError::Malformed { .. })
        ));
    }

    #[test]
    fn test_load_unreadable_is_error() {
        let dir = TempDir::new().unwrap();
        let store = MetadataStore::new(dir.path());
        std::fs::create_dir_all(store.current_path(&RoleName::Mirrorlist)).unwrap();

        assert!(matches!(
            store.load_current(&RoleName::Mirrorlist),
            Err(StoreError::Io { .. })
        ));
    }
}
