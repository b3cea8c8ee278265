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

//! Repository-side metadata production.
//!
//! This module provides:
//! - [`RepositoryConfig`], the role/key configuration kept in `config.toml`
//! - [`MetadataBuilder`] for unsigned root, targets, release and timestamp
//!   payloads
//! - Signing and scoped writing of metadata files
//! - The [`manage`] operations behind `tufactl`

mod builder;
mod config;
pub mod manage;
mod signer;

pub use builder::MetadataBuilder;
pub use config::{build_config_file, read_config_file, RepositoryConfig, RoleKeys, CONFIG_FILE};
pub use signer::{
    next_version, read_metadata_file, sign_metadata, sign_metadata_for_role, write_metadata_file,
};

use std::path::PathBuf;

use thiserror::Error;

use crate::keystore::KeyError;
use crate::metadata::FormatError;
use crate::mirrors::MirrorError;
use crate::trust::VerificationError;

/// Errors that can occur while building or signing repository metadata.
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("Directory not found: {}", .0.display())]
    MissingDirectory(PathBuf),

    #[error("Metadata file not found: {}", .0.display())]
    MissingMetadata(PathBuf),

    #[error(transparent)]
    Format(#[from] FormatError),

    #[error(transparent)]
    Key(#[from] KeyError),

    #[error(transparent)]
    Verification(#[from] VerificationError),

    #[error("Role '{role}' needs {threshold} signature(s) but only {available} key(s) were given")]
    InsufficientKeys {
        role: String,
        threshold: u32,
        available: usize,
    },

    #[error("Delegation '{role}' is out of scope: {reason}")]
    DelegationOutOfScope { role: String, reason: String },

    #[error("Invalid repository configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Mirror(#[from] MirrorError),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl RepoError {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| RepoError::Io { path, source }
    }
}
