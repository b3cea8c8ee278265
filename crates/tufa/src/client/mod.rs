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

//! Client-side update engine.
//!
//! This module provides:
//! - [`Repository`], which refreshes trusted metadata from mirrors and
//!   downloads verified targets
//! - [`Fetcher`] and the plain-HTTP [`HttpFetcher`]
//! - [`MetadataStore`], the `current/` and `previous/` metadata directories,
//!   and [`StoreError`]
//! - [`RepositoryError`] and [`DownloadError`]

mod download;
mod fetch;
mod store;
mod updater;

pub use download::download_verified;
pub use fetch::{DownloadError, Fetcher, HttpFetcher, MirrorAttempt};
pub use store::{MetadataStore, StoreError};
pub use updater::{Repository, Target, UpdateState};

use std::path::PathBuf;

use thiserror::Error;

use crate::metadata::FormatError;
use crate::mirrors::MirrorError;
use crate::trust::VerificationError;

/// Errors surfaced by the client repository.
///
/// `Security` and `Download` are kept apart so callers can tell an attack
/// or misconfiguration from an unreachable mirror.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Metadata directory not found: {}", .0.display())]
    MissingDirectory(PathBuf),

    #[error("No trusted root metadata at {}", .0.display())]
    MissingRoot(PathBuf),

    #[error("Repository has no mirrors configured")]
    EmptyMirrorList,

    #[error("Operation requires a successful refresh (state: {0})")]
    NotReady(UpdateState),

    #[error("Unknown target: {0}")]
    UnknownTarget(String),

    #[error("Security error: {0}")]
    Security(#[from] VerificationError),

    #[error("Download error: {0}")]
    Download(#[from] DownloadError),

    #[error("Format error: {0}")]
    Format(#[from] FormatError),

    #[error("Mirror error: {0}")]
    Mirror(MirrorError),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl From<MirrorError> for RepositoryError {
    fn from(err: MirrorError) -> Self {
        match err {
            MirrorError::Verification(e) => RepositoryError::Security(e),
            MirrorError::Download(e) => RepositoryError::Download(e),
            other => RepositoryError::Mirror(other),
        }
    }
}
