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

//! The client repository and its refresh state machine.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use chrono::Utc;
use walkdir::WalkDir;

use super::download::download_verified;
use super::fetch::{DownloadError, Fetcher, HttpFetcher, MirrorAttempt};
use super::store::MetadataStore;
use super::RepositoryError;
use crate::audit;
use crate::config::{ClientConfig, RefreshOrder};
use crate::fsutil::{gunzip_bounded, write_atomic};
use crate::metadata::{
    paths, FileInfo, MetadataType, MirrorsMetadata, Payload, RoleName, SignedMetadata,
    TypedPayload,
};
use crate::mirrors::{self, FileType, MirrorList};
use crate::trust::{check_expiry, check_version, TrustStore, VerificationError};

const RELEASE_FILE: &str = "release.txt";
const RELEASE_FILE_GZ: &str = "release.txt.gz";

/// Progress of the current refresh.
///
/// Each `*Verified` state names the role most recently accepted. `Failed`
/// holds until the next call to [`Repository::refresh`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateState {
    Start,
    RootVerified,
    TimestampVerified,
    ReleaseVerified,
    TargetsVerified,
    Ready,
    Failed,
}

impl fmt::Display for UpdateState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            UpdateState::Start => "START",
            UpdateState::RootVerified => "ROOT_VERIFIED",
            UpdateState::TimestampVerified => "TIMESTAMP_VERIFIED",
            UpdateState::ReleaseVerified => "RELEASE_VERIFIED",
            UpdateState::TargetsVerified => "TARGETS_VERIFIED",
            UpdateState::Ready => "READY",
            UpdateState::Failed => "FAILED",
        };
        f.write_str(name)
    }
}

/// A trusted target file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub path: String,
    pub fileinfo: FileInfo,
    /// The role whose metadata lists this target.
    pub role: RoleName,
}

impl Target {
    pub fn length(&self) -> u64 {
        self.fileinfo.length
    }
}

#[derive(Debug, Clone)]
struct TrustedMetadata {
    bytes: Vec<u8>,
    payload: Payload,
}

/// A metadata file that passed every check but is not yet installed.
struct Candidate {
    metadata: TrustedMetadata,
    trust: Option<TrustStore>,
}

/// A named, mirrored repository as seen by one client.
///
/// Holds the trusted metadata from `metadata/current` and the trust store
/// derived from it. Only [`refresh`](Repository::refresh) replaces trusted
/// metadata, and only after a file passes every check.
pub struct Repository {
    name: String,
    config: ClientConfig,
    mirrors: MirrorList,
    fetcher: Box<dyn Fetcher>,
    store: MetadataStore,
    trust: TrustStore,
    trusted: BTreeMap<RoleName, TrustedMetadata>,
    state: UpdateState,
}

impl fmt::Debug for Repository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Repository")
            .field("name", &self.name)
            .field("mirrors", &self.mirrors.len())
            .field("state", &self.state)
            .finish()
    }
}

impl Repository {
    /// Opens a repository that fetches over HTTP.
    ///
    /// # Errors
    ///
    /// `EmptyMirrorList` without mirrors, `MissingDirectory` or
    /// `MissingRoot` if no trusted root is installed, `Security` if the
    /// installed root does not meet its own threshold.
    pub fn new(
        name: impl Into<String>,
        config: ClientConfig,
        mirrors: MirrorList,
    ) -> Result<Self, RepositoryError> {
        let fetcher = Box::new(HttpFetcher::new(config.fetch_timeout()));
        Self::with_fetcher(name, config, mirrors, fetcher)
    }

    pub fn with_fetcher(
        name: impl Into<String>,
        config: ClientConfig,
        mirrors: MirrorList,
        fetcher: Box<dyn Fetcher>,
    ) -> Result<Self, RepositoryError> {
        if mirrors.is_empty() {
            return Err(RepositoryError::EmptyMirrorList);
        }
        Self::open(name.into(), config, mirrors, fetcher)
    }

    /// Opens a repository using the mirror list installed in
    /// `metadata/current/mirrorlist.txt`.
    pub fn from_trusted_mirrorlist(
        name: impl Into<String>,
        config: ClientConfig,
        fetcher: Box<dyn Fetcher>,
    ) -> Result<Self, RepositoryError> {
        let mut repository = Self::open(name.into(), config, MirrorList::new(), fetcher)?;
        let mirrors = match repository.trusted.get(&RoleName::Mirrorlist) {
            Some(trusted) => {
                let metadata = MirrorsMetadata::from_payload(trusted.payload.clone())?;
                MirrorList::from_mirrors(metadata.mirrors)?
            }
            None => MirrorList::new(),
        };
        if mirrors.is_empty() {
            return Err(RepositoryError::EmptyMirrorList);
        }
        repository.mirrors = mirrors;
        Ok(repository)
    }

    fn open(
        name: String,
        config: ClientConfig,
        mirrors: MirrorList,
        fetcher: Box<dyn Fetcher>,
    ) -> Result<Self, RepositoryError> {
        let store = MetadataStore::new(&config.metadata_dir());
        if !store.current_dir().is_dir() {
            return Err(RepositoryError::MissingDirectory(
                store.current_dir().to_path_buf(),
            ));
        }

        let root_path = store.current_path(&RoleName::Root);
        let bytes = store
            .read_current(&RoleName::Root)
            .map_err(|source| RepositoryError::Io {
                path: root_path.clone(),
                source,
            })?
            .ok_or_else(|| RepositoryError::MissingRoot(root_path))?;
        let signable = SignedMetadata::from_bytes(&bytes)?;
        let payload = signable.payload()?;
        let Payload::Root(root) = &payload else {
            return Err(RepositoryError::Format(
                crate::metadata::FormatError::WrongMetadataType {
                    expected: MetadataType::Root.as_str(),
                    found: payload.metadata_type().as_str(),
                },
            ));
        };
        let trust = TrustStore::from_root_metadata(root)?;
        trust.verify(&signable, &RoleName::Root)?;

        let mut repository = Self {
            name,
            config,
            mirrors,
            fetcher,
            store,
            trust,
            trusted: BTreeMap::from([(RoleName::Root, TrustedMetadata { bytes, payload })]),
            state: UpdateState::Start,
        };
        repository.load_local_metadata();
        Ok(repository)
    }

    /// Loads the rest of `current/`. Files that no longer verify under the
    /// installed root are ignored and will be fetched again.
    fn load_local_metadata(&mut self) {
        for role in [
            RoleName::Timestamp,
            RoleName::Release,
            RoleName::Targets,
            RoleName::Mirrorlist,
        ] {
            self.load_local_role(&role);
        }

        let mut seen = BTreeSet::new();
        while let Some(role) = self.next_delegated_role(&seen) {
            seen.insert(role.clone());
            self.load_local_role(&role);
        }
    }

    fn load_local_role(&mut self, role: &RoleName) {
        let bytes = match self.store.read_current(role) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return,
            Err(e) => {
                tracing::warn!(
                    repository = %self.name,
                    role = %role,
                    error = %e,
                    "Cannot read installed metadata"
                );
                return;
            }
        };
        match self.check_local(role, &bytes) {
            Ok(candidate) => {
                if let Some(trust) = candidate.trust {
                    self.trust = trust;
                }
                self.trusted.insert(role.clone(), candidate.metadata);
            }
            Err(e) => tracing::warn!(
                repository = %self.name,
                role = %role,
                error = %e,
                "Ignoring installed metadata that no longer verifies"
            ),
        }
    }

    fn check_local(&self, role: &RoleName, bytes: &[u8]) -> Result<Candidate, VerificationError> {
        let malformed = |reason: String| VerificationError::MalformedMetadata {
            role: role.to_string(),
            reason,
        };
        let signable = SignedMetadata::from_bytes(bytes).map_err(|e| malformed(e.to_string()))?;
        let payload = signable.payload().map_err(|e| malformed(e.to_string()))?;
        if payload.metadata_type() != MetadataType::for_role(role) {
            return Err(malformed(format!(
                "expected {} metadata",
                MetadataType::for_role(role)
            )));
        }
        self.trust.verify(&signable, role)?;
        let trust = self.derive_trust(role, &payload)?;
        Ok(Candidate {
            metadata: TrustedMetadata {
                bytes: bytes.to_vec(),
                payload,
            },
            trust,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> UpdateState {
        self.state
    }

    pub fn get_mirrors(&self) -> &MirrorList {
        &self.mirrors
    }

    pub fn trust(&self) -> &TrustStore {
        &self.trust
    }

    /// Version of the trusted metadata for `role`, if any.
    pub fn trusted_version(&self, role: &RoleName) -> Option<u64> {
        self.trusted.get(role).map(|t| t.payload.version())
    }

    /// Brings trusted metadata up to date from the mirrors.
    ///
    /// Roles are processed in the configured [`RefreshOrder`]. The first
    /// role that cannot be updated ends the refresh in `Failed`; files
    /// already replaced by earlier roles stay replaced.
    pub fn refresh(&mut self) -> Result<(), RepositoryError> {
        self.state = UpdateState::Start;
        let result = match self.config.refresh_order() {
            RefreshOrder::Secure => self.refresh_secure(),
            RefreshOrder::Legacy => self.refresh_legacy(),
        };

        match result {
            Ok(()) => {
                self.state = UpdateState::Ready;
                audit::log_refresh_success(&self.name);
                Ok(())
            }
            Err(e) => {
                self.state = UpdateState::Failed;
                audit::log_refresh_failure(&self.name, &e.to_string());
                Err(e)
            }
        }
    }

    fn refresh_secure(&mut self) -> Result<(), RepositoryError> {
        self.update_role(&RoleName::Root, &RoleName::Root.metadata_filename(), None, false)?;
        self.state = UpdateState::RootVerified;

        self.update_role(
            &RoleName::Timestamp,
            &RoleName::Timestamp.metadata_filename(),
            None,
            false,
        )?;
        self.state = UpdateState::TimestampVerified;

        let (release_file, release_pin) = self.release_pin()?;
        let compressed = release_file == RELEASE_FILE_GZ;
        self.update_role(&RoleName::Release, release_file, Some(&release_pin), compressed)?;
        self.state = UpdateState::ReleaseVerified;
        self.check_root_against_release()?;

        let targets_pin = self.pinned_by_release(&RoleName::Targets)?;
        self.update_role(
            &RoleName::Targets,
            &RoleName::Targets.metadata_filename(),
            Some(&targets_pin),
            false,
        )?;
        self.update_delegated_roles(true)?;
        self.state = UpdateState::TargetsVerified;
        Ok(())
    }

    fn refresh_legacy(&mut self) -> Result<(), RepositoryError> {
        self.update_role(&RoleName::Root, &RoleName::Root.metadata_filename(), None, false)?;
        self.state = UpdateState::RootVerified;

        self.update_role(
            &RoleName::Targets,
            &RoleName::Targets.metadata_filename(),
            None,
            false,
        )?;
        self.update_delegated_roles(false)?;
        self.state = UpdateState::TargetsVerified;

        self.update_role(&RoleName::Release, RELEASE_FILE, None, false)?;
        self.state = UpdateState::ReleaseVerified;

        self.update_role(
            &RoleName::Timestamp,
            &RoleName::Timestamp.metadata_filename(),
            None,
            false,
        )?;
        self.state = UpdateState::TimestampVerified;
        Ok(())
    }

    /// The release file named by the trusted timestamp and its file-info.
    /// A gzip sibling is preferred when listed.
    fn release_pin(&self) -> Result<(&'static str, FileInfo), RepositoryError> {
        let Some(Payload::Timestamp(timestamp)) = self.payload(&RoleName::Timestamp) else {
            return Err(VerificationError::MissingFileInfo(RELEASE_FILE.to_string()).into());
        };
        for file in [RELEASE_FILE_GZ, RELEASE_FILE] {
            if let Some(info) = timestamp.meta.get(file) {
                return Ok((file, info.clone()));
            }
        }
        Err(VerificationError::MissingFileInfo(RELEASE_FILE.to_string()).into())
    }

    fn pinned_by_release(&self, role: &RoleName) -> Result<FileInfo, RepositoryError> {
        let file = role.metadata_filename();
        match self.payload(&RoleName::Release) {
            Some(Payload::Release(release)) => release
                .meta
                .get(&file)
                .cloned()
                .ok_or_else(|| VerificationError::MissingFileInfo(file).into()),
            _ => Err(VerificationError::MissingFileInfo(file).into()),
        }
    }

    fn check_root_against_release(&self) -> Result<(), RepositoryError> {
        let pin = self.pinned_by_release(&RoleName::Root)?;
        let Some(root) = self.trusted.get(&RoleName::Root) else {
            return Err(VerificationError::MissingFileInfo(RoleName::Root.metadata_filename()).into());
        };
        pin.verify(&root.bytes).map_err(|source| {
            let err = VerificationError::FileInfoMismatch {
                file: RoleName::Root.metadata_filename(),
                source,
            };
            audit::log_verification_failure(RoleName::Root.as_str(), &err.to_string());
            RepositoryError::Security(err)
        })
    }

    /// Updates every delegated role reachable from `targets`, parents
    /// before children.
    fn update_delegated_roles(&mut self, pinned: bool) -> Result<(), RepositoryError> {
        let mut done = BTreeSet::new();
        while let Some(role) = self.next_delegated_role(&done) {
            done.insert(role.clone());
            let pin = if pinned {
                Some(self.pinned_by_release(&role)?)
            } else {
                None
            };
            self.update_role(&role, &role.metadata_filename(), pin.as_ref(), false)?;
        }
        Ok(())
    }

    fn next_delegated_role(&self, done: &BTreeSet<RoleName>) -> Option<RoleName> {
        self.trust
            .roles()
            .get_delegated_rolenames(&RoleName::Targets)
            .into_iter()
            .find(|role| !done.contains(role))
    }

    /// Tries each mirror in order until one serves an acceptable file.
    ///
    /// Transport failures fall through to the next mirror. If every mirror
    /// fails and at least one served a file that was rejected, the last
    /// rejection is returned as a security error.
    fn update_role(
        &mut self,
        role: &RoleName,
        remote_file: &str,
        pin: Option<&FileInfo>,
        compressed: bool,
    ) -> Result<(), RepositoryError> {
        let max_length = match pin {
            Some(pin) => pin.length,
            None if *role == RoleName::Timestamp => self.config.max_timestamp_length(),
            None => self.config.max_metadata_length(),
        };

        let urls = self.mirrors.get_list_of_mirrors(FileType::Metadata, remote_file);
        let mut attempts = Vec::new();
        let mut rejection = None;

        for url in &urls {
            let raw = match self.fetcher.fetch(url, max_length) {
                Ok(raw) => raw,
                Err(e) => {
                    audit::log_mirror_fetch_failure(url, &e.to_string());
                    attempts.push(MirrorAttempt {
                        url: url.clone(),
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            match self.check_remote(role, remote_file, &raw, pin, compressed) {
                Ok(candidate) => return self.commit(role, candidate, url),
                Err(e) => {
                    tracing::warn!(url = %url, role = %role, error = %e, "Rejected metadata from mirror");
                    attempts.push(MirrorAttempt {
                        url: url.clone(),
                        reason: e.to_string(),
                    });
                    rejection = Some(e);
                }
            }
        }

        let err = match rejection {
            Some(e) => RepositoryError::Security(e),
            None if urls.is_empty() => {
                RepositoryError::Download(DownloadError::NoEligibleMirror(remote_file.to_string()))
            }
            None => RepositoryError::Download(DownloadError::AllMirrorsFailed {
                path: remote_file.to_string(),
                attempts,
            }),
        };
        audit::log_metadata_update_failure(role.as_str(), &err.to_string());
        Err(err)
    }

    fn check_remote(
        &self,
        role: &RoleName,
        remote_file: &str,
        raw: &[u8],
        pin: Option<&FileInfo>,
        compressed: bool,
    ) -> Result<Candidate, VerificationError> {
        if let Some(pin) = pin {
            pin.verify(raw)
                .map_err(|source| VerificationError::FileInfoMismatch {
                    file: remote_file.to_string(),
                    source,
                })?;
        }

        let bytes = if compressed {
            gunzip_bounded(raw, self.config.max_metadata_length()).map_err(|e| {
                VerificationError::MalformedMetadata {
                    role: role.to_string(),
                    reason: e.to_string(),
                }
            })?
        } else {
            raw.to_vec()
        };

        let candidate = self.check_local(role, &bytes)?;
        let payload = &candidate.metadata.payload;

        if let Payload::Root(new_root) = payload {
            let signable = SignedMetadata::from_bytes(&bytes)?;
            TrustStore::from_root_metadata(new_root)?.verify(&signable, role)?;
        }
        check_version(role, self.trusted_version(role), payload.version())?;
        check_expiry(role, payload.expires(), Utc::now())?;

        if role.is_delegated() {
            if let Payload::Targets(targets) = payload {
                let allowed = self.trust.roles().get_role_paths(role)?.unwrap_or(&[]);
                for path in targets.targets.keys() {
                    if !allowed.iter().any(|pattern| paths::is_path_within(path, pattern)) {
                        return Err(VerificationError::DelegationOutOfScope {
                            role: role.to_string(),
                            reason: format!("target '{path}' is outside the delegated paths"),
                        });
                    }
                }
            }
        }
        Ok(candidate)
    }

    /// Trust implied by accepting `payload` for `role`, if it changes.
    fn derive_trust(
        &self,
        role: &RoleName,
        payload: &Payload,
    ) -> Result<Option<TrustStore>, VerificationError> {
        match payload {
            Payload::Root(root) => {
                let unchanged = matches!(
                    self.payload(&RoleName::Root),
                    Some(Payload::Root(current)) if current == root
                );
                if unchanged {
                    Ok(None)
                } else {
                    Ok(Some(TrustStore::from_root_metadata(root)?))
                }
            }
            Payload::Targets(targets) => {
                let mut trust = self.trust.clone();
                trust.import_delegations(role, targets)?;
                Ok(Some(trust))
            }
            _ => Ok(None),
        }
    }

    fn commit(
        &mut self,
        role: &RoleName,
        candidate: Candidate,
        url: &str,
    ) -> Result<(), RepositoryError> {
        let unchanged = self
            .trusted
            .get(role)
            .is_some_and(|current| current.bytes == candidate.metadata.bytes);
        if !unchanged {
            self.store
                .install(role, &candidate.metadata.bytes)
                .map_err(|source| RepositoryError::Io {
                    path: self.store.current_path(role),
                    source,
                })?;
            audit::log_metadata_update_success(
                role.as_str(),
                candidate.metadata.payload.version(),
                url,
            );
        }

        if let Some(trust) = candidate.trust {
            self.trust = trust;
        }
        self.trusted.insert(role.clone(), candidate.metadata);

        let trust = &self.trust;
        self.trusted
            .retain(|name, _| name.is_top_level() || trust.roles().role_exists(name));
        Ok(())
    }

    fn payload(&self, role: &RoleName) -> Option<&Payload> {
        self.trusted.get(role).map(|t| &t.payload)
    }

    fn require_ready(&self) -> Result<(), RepositoryError> {
        if self.state == UpdateState::Ready {
            Ok(())
        } else {
            Err(RepositoryError::NotReady(self.state))
        }
    }

    /// Every trusted target keyed by path. The top-level targets role wins
    /// over delegations, and a parent wins over its children.
    fn collect_targets(&self) -> BTreeMap<String, Target> {
        let mut roles = vec![RoleName::Targets];
        roles.extend(self.trust.roles().get_delegated_rolenames(&RoleName::Targets));

        let mut targets = BTreeMap::new();
        for role in roles {
            let Some(Payload::Targets(metadata)) = self.payload(&role) else {
                continue;
            };
            let allowed = match self.trust.roles().get_role_paths(&role) {
                Ok(allowed) => allowed,
                Err(_) => continue,
            };
            for (path, fileinfo) in &metadata.targets {
                let permitted = match allowed {
                    None => true,
                    Some(patterns) => patterns.iter().any(|p| paths::is_path_within(path, p)),
                };
                if permitted && !targets.contains_key(path) {
                    targets.insert(
                        path.clone(),
                        Target {
                            path: path.clone(),
                            fileinfo: fileinfo.clone(),
                            role: role.clone(),
                        },
                    );
                }
            }
        }
        targets
    }

    /// All trusted targets, sorted by path.
    pub fn all_targets(&self) -> Result<Vec<Target>, RepositoryError> {
        self.require_ready()?;
        Ok(self.collect_targets().into_values().collect())
    }

    /// The trusted target at `path`.
    pub fn target(&self, path: &str) -> Result<Target, RepositoryError> {
        self.require_ready()?;
        paths::validate_target_path(path)?;
        self.collect_targets()
            .remove(path)
            .ok_or_else(|| RepositoryError::UnknownTarget(path.to_string()))
    }

    /// The subset of `targets` with no regular file at `dest_dir/<path>` or
    /// whose local copy differs from the trusted file-info. A directory at
    /// the path counts as missing.
    pub fn updated_targets(
        &self,
        targets: &[Target],
        dest_dir: &Path,
    ) -> Result<Vec<Target>, RepositoryError> {
        let mut updated = Vec::new();
        for target in targets {
            let local = paths::join_target_path(dest_dir, &target.path)?;
            if !local.is_file() {
                updated.push(target.clone());
                continue;
            }
            match std::fs::read(&local) {
                Ok(bytes) if target.fileinfo.matches(&bytes) => {}
                Ok(_) => updated.push(target.clone()),
                Err(e) if e.kind() == io::ErrorKind::NotFound => updated.push(target.clone()),
                Err(source) => {
                    return Err(RepositoryError::Io {
                        path: local,
                        source,
                    })
                }
            }
        }
        Ok(updated)
    }

    /// Downloads a target into `dest_dir/<path>`.
    ///
    /// The file-info is taken from trusted metadata, not from `target`.
    /// Only mirrors whose confinement covers the path are tried. Nothing
    /// is written unless the bytes match.
    pub fn download_target(&self, target: &Target, dest_dir: &Path) -> Result<PathBuf, RepositoryError> {
        let trusted = self.target(&target.path)?;
        let destination = paths::join_target_path(dest_dir, &trusted.path)?;
        let urls = self
            .mirrors
            .get_list_of_mirrors(FileType::Target, &trusted.path);

        let bytes = download_verified(self.fetcher.as_ref(), &trusted.path, &urls, &trusted.fileinfo)
            .map_err(|e| {
                audit::log_target_download_failure(&trusted.path, &e.to_string());
                e
            })?;
        write_atomic(&destination, &bytes).map_err(|source| RepositoryError::Io {
            path: destination.clone(),
            source,
        })?;

        audit::log_target_download_success(&trusted.path, &destination, trusted.length());
        Ok(destination)
    }

    /// Deletes files under `dest_dir` that are not trusted targets.
    pub fn remove_obsolete_targets(&self, dest_dir: &Path) -> Result<Vec<String>, RepositoryError> {
        self.require_ready()?;
        if !dest_dir.is_dir() {
            return Ok(Vec::new());
        }
        let known = self.collect_targets();

        let mut removed = Vec::new();
        for entry in WalkDir::new(dest_dir).sort_by_file_name() {
            let entry = entry.map_err(|e| RepositoryError::Io {
                path: e.path().unwrap_or(dest_dir).to_path_buf(),
                source: e.into(),
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Some(relative) = paths::relative_target_path(dest_dir, entry.path()) else {
                continue;
            };
            if known.contains_key(&relative) {
                continue;
            }
            std::fs::remove_file(entry.path()).map_err(|source| RepositoryError::Io {
                path: entry.path().to_path_buf(),
                source,
            })?;
            audit::log_target_removed(&relative);
            removed.push(relative);
        }
        Ok(removed)
    }

    /// Replaces the trusted mirror list from `url`. On failure the
    /// installed list and the in-memory mirrors are unchanged.
    pub fn update_mirrorlist(&mut self, url: &str) -> Result<(), RepositoryError> {
        let list = mirrors::update_mirrorlist(
            url,
            &self.config.metadata_dir(),
            &self.trust,
            self.trusted_version(&RoleName::Mirrorlist),
            self.fetcher.as_ref(),
            self.config.max_metadata_length(),
        )?;
        self.mirrors = list;
        self.load_local_role(&RoleName::Mirrorlist);
        Ok(())
    }
}
