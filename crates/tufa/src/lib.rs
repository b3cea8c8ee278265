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

//! # tufa
//!
//! Signed-metadata trust framework for updating software from mirrors that
//! may be malicious, compromised or stale.
//!
//! A repository publishes signed metadata for a hierarchy of roles: `root`
//! names the keys of every other role, `targets` lists the files clients
//! may install (and may delegate parts of that authority), `release` pins
//! the exact versions of the other metadata files and `timestamp` pins
//! `release`. A client only accepts metadata that meets its role's
//! signature threshold, is not older than what it already trusts and has
//! not expired, and only writes a target once its bytes match the trusted
//! hashes.
//!
//! ## Modules
//!
//! - [`metadata`]: role names, payloads, file-info and canonical JSON
//! - [`crypto`]: Ed25519 signing and password-based key encryption
//! - [`keystore`]: encrypted key files and the in-memory key cache
//! - [`trust`]: role and key databases, threshold verification
//! - [`repo`]: building and signing repository metadata
//! - [`mirrors`]: mirror lists and their signed metadata
//! - [`client`]: the [`Repository`] refresh state machine and downloads
//!
//! ## Client usage
//!
//! ```ignore
//! use tufa::{ClientConfig, MirrorList, Mirror, Repository};
//!
//! let config = ClientConfig::builder().repository_dir("/var/lib/app").build();
//! let mut mirrors = MirrorList::new();
//! mirrors.add_mirror(Mirror::new("main", "https://updates.example.com", "metadata", "targets"))?;
//!
//! let mut repository = Repository::new("app", config, mirrors)?;
//! repository.refresh()?;
//! let targets = repository.all_targets()?;
//! for target in repository.updated_targets(&targets, "/opt/app".as_ref())? {
//!     repository.download_target(&target, "/opt/app".as_ref())?;
//! }
//! repository.remove_obsolete_targets("/opt/app".as_ref())?;
//! ```

pub mod audit;
pub mod client;
pub mod config;
pub mod crypto;
mod fsutil;
pub mod keystore;
pub mod metadata;
pub mod mirrors;
pub mod repo;
pub mod trust;

pub use client::{DownloadError, Fetcher, HttpFetcher, Repository, RepositoryError, Target, UpdateState};
pub use config::{ClientConfig, RefreshOrder};
pub use keystore::{Key, KeyError, KeyStore};
pub use metadata::{FileInfo, FormatError, RoleName, SignedMetadata};
pub use mirrors::{Mirror, MirrorError, MirrorList};
pub use repo::RepoError;
pub use trust::{TrustStore, VerificationError};
