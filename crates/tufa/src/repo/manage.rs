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

//! Repository management operations.
//!
//! Each function takes every input explicitly; collecting input from an
//! operator is left to the caller. A repository directory is laid out as:
//!
//! ```text
//! <repository>/config.toml
//! <repository>/metadata/{root,targets,release,timestamp,mirrorlist}.txt
//! <repository>/metadata/targets/<delegated role>.txt
//! <repository>/targets/...
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use super::builder::{RELEASE_FILE, RELEASE_FILE_GZ};
use super::{
    build_config_file, next_version, read_config_file, read_metadata_file, sign_metadata,
    sign_metadata_for_role, write_metadata_file, MetadataBuilder, RepoError, RepositoryConfig,
    RoleKeys, CONFIG_FILE,
};
use crate::audit;
use crate::fsutil::{gzip, write_atomic};
use crate::keystore::{self, KeyStore};
use crate::metadata::{
    paths, Delegations, KeyId, RoleInfo, RoleName, SignedMetadata, TargetsMetadata,
};
use crate::mirrors::{Mirror, MirrorList};

pub const METADATA_DIR: &str = "metadata";
pub const TARGETS_DIR: &str = "targets";

pub fn metadata_dir(repository_dir: &Path) -> PathBuf {
    repository_dir.join(METADATA_DIR)
}

pub fn targets_dir(repository_dir: &Path) -> PathBuf {
    repository_dir.join(TARGETS_DIR)
}

fn role_metadata_path(repository_dir: &Path, role: &RoleName) -> PathBuf {
    metadata_dir(repository_dir).join(role.metadata_filename())
}

/// Generates an Ed25519 key, caches it and writes `<keyid>.key`.
pub fn generate_and_save_key(
    keystore: &KeyStore,
    keystore_dir: &Path,
    password: &str,
) -> Result<KeyId, RepoError> {
    let keyid = keystore.generate_key(password)?;
    keystore.save_keyfile(keystore_dir, &keyid)?;
    Ok(keyid)
}

pub fn list_keyids(keystore_dir: &Path) -> Result<Vec<KeyId>, RepoError> {
    Ok(keystore::list_keyids(keystore_dir)?)
}

/// Re-encrypts `<keyid>.key` under a new password.
///
/// Fails with `BadPassword` if `old` does not decrypt the key file.
pub fn change_password(
    keystore: &KeyStore,
    keystore_dir: &Path,
    keyid: &str,
    old: &str,
    new: &str,
) -> Result<PathBuf, RepoError> {
    keystore.load_keyfile(keystore_dir, keyid, old)?;
    keystore.change_password(keyid, old, new)?;
    Ok(keystore.save_keyfile(keystore_dir, keyid)?)
}

fn load_config(repository_dir: &Path) -> Result<RepositoryConfig, RepoError> {
    if !repository_dir.is_dir() {
        return Err(RepoError::MissingDirectory(repository_dir.to_path_buf()));
    }
    read_config_file(&repository_dir.join(CONFIG_FILE))
}

/// Signs with every configured key for `role` that is loaded.
fn sign_for_configured_role(
    signable: &mut SignedMetadata,
    role: &RoleName,
    config: &RepositoryConfig,
    keystore: &KeyStore,
) -> Result<(), RepoError> {
    let role_keys = config.role(role)?;
    let loaded: Vec<KeyId> = role_keys
        .keyids
        .iter()
        .filter(|keyid| keystore.contains_key(keyid))
        .cloned()
        .collect();
    sign_metadata_for_role(signable, role.as_str(), role_keys.threshold, &loaded, keystore)
}

/// Creates or overwrites `metadata/root.txt` from `config.toml`.
pub fn make_root_metadata(repository_dir: &Path, keystore: &KeyStore) -> Result<PathBuf, RepoError> {
    let config = load_config(repository_dir)?;
    let path = role_metadata_path(repository_dir, &RoleName::Root);
    let builder = MetadataBuilder::from_config(&config);

    let root = builder.build_root(&config, keystore, next_version(&path)?)?;
    let mut signable = SignedMetadata::from_typed(root)?;
    sign_for_configured_role(&mut signable, &RoleName::Root, &config, keystore)?;
    write_metadata_file(&signable, &path)?;
    Ok(path)
}

/// Creates or overwrites `metadata/targets.txt` listing every file under
/// `targets/`. Delegations already declared in the file are kept.
pub fn make_targets_metadata(
    repository_dir: &Path,
    keystore: &KeyStore,
) -> Result<PathBuf, RepoError> {
    let config = load_config(repository_dir)?;
    let path = role_metadata_path(repository_dir, &RoleName::Targets);
    let version = next_version(&path)?;
    let delegations = existing_delegations(&path)?;

    let targets = MetadataBuilder::from_config(&config).build_targets(
        &targets_dir(repository_dir),
        None,
        version,
        delegations,
    )?;
    let mut signable = SignedMetadata::from_typed(targets)?;
    sign_for_configured_role(&mut signable, &RoleName::Targets, &config, keystore)?;
    write_metadata_file(&signable, &path)?;
    Ok(path)
}

fn existing_delegations(path: &Path) -> Result<Option<Delegations>, RepoError> {
    if !path.exists() {
        return Ok(None);
    }
    let targets: TargetsMetadata = read_metadata_file(path)?.typed()?;
    Ok(targets.delegations)
}

/// Creates or overwrites `metadata/release.txt`. With `compress` a gzip
/// copy is written beside it; without, any stale copy is removed.
pub fn make_release_metadata(
    repository_dir: &Path,
    keystore: &KeyStore,
    compress: bool,
) -> Result<PathBuf, RepoError> {
    let config = load_config(repository_dir)?;
    let metadata = metadata_dir(repository_dir);
    let path = metadata.join(RELEASE_FILE);

    let release = MetadataBuilder::from_config(&config).build_release(&metadata, next_version(&path)?)?;
    let mut signable = SignedMetadata::from_typed(release)?;
    sign_for_configured_role(&mut signable, &RoleName::Release, &config, keystore)?;
    write_metadata_file(&signable, &path)?;

    let compressed = metadata.join(RELEASE_FILE_GZ);
    if compress {
        let bytes = gzip(&signable.to_bytes()?).map_err(RepoError::io(&compressed))?;
        write_atomic(&compressed, &bytes).map_err(RepoError::io(&compressed))?;
    } else if compressed.exists() {
        std::fs::remove_file(&compressed).map_err(RepoError::io(&compressed))?;
    }
    Ok(path)
}

/// Creates or overwrites `metadata/timestamp.txt`.
pub fn make_timestamp_metadata(
    repository_dir: &Path,
    keystore: &KeyStore,
) -> Result<PathBuf, RepoError> {
    let config = load_config(repository_dir)?;
    let metadata = metadata_dir(repository_dir);
    let path = metadata.join(RoleName::Timestamp.metadata_filename());

    let timestamp =
        MetadataBuilder::from_config(&config).build_timestamp(&metadata, next_version(&path)?)?;
    let mut signable = SignedMetadata::from_typed(timestamp)?;
    sign_for_configured_role(&mut signable, &RoleName::Timestamp, &config, keystore)?;
    write_metadata_file(&signable, &path)?;
    Ok(path)
}

/// Creates or overwrites `metadata/mirrorlist.txt`. The mirrorlist role
/// must be configured.
pub fn make_mirrorlist_metadata(
    repository_dir: &Path,
    keystore: &KeyStore,
    mirrors: &MirrorList,
) -> Result<PathBuf, RepoError> {
    let config = load_config(repository_dir)?;
    let role_keys = config.role(&RoleName::Mirrorlist)?;
    let loaded: Vec<KeyId> = role_keys
        .keyids
        .iter()
        .filter(|keyid| keystore.contains_key(keyid))
        .cloned()
        .collect();
    if loaded.len() < role_keys.threshold as usize {
        return Err(RepoError::InsufficientKeys {
            role: RoleName::Mirrorlist.to_string(),
            threshold: role_keys.threshold,
            available: loaded.len(),
        });
    }

    mirrors.build_mirrorlist_file(
        &loaded,
        &metadata_dir(repository_dir),
        keystore,
        &MetadataBuilder::from_config(&config),
    )
}

/// Adds signatures from `keyids` to an existing metadata file in place.
pub fn sign_metadata_file(
    path: &Path,
    keyids: &[KeyId],
    keystore: &KeyStore,
) -> Result<(), RepoError> {
    let mut signable = read_metadata_file(path)?;
    sign_metadata(&mut signable, keyids, keystore)?;
    write_metadata_file(&signable, path)
}

/// A new delegated role.
#[derive(Debug, Clone)]
pub struct DelegationRequest {
    pub parent: RoleName,
    pub name: String,
    pub keyids: Vec<KeyId>,
    pub threshold: u32,
    pub paths: Vec<String>,
    /// Keys that re-sign the parent's updated metadata.
    pub parent_keyids: Vec<KeyId>,
}

/// Creates a delegated role and records it in its parent.
///
/// Writes `metadata/<role>.txt` listing the files under `targets/` within
/// the delegated paths, signed by the delegated keys. The parent's
/// `delegations` block gains the role and its public keys, and the parent
/// is re-signed with its version bumped.
pub fn make_delegation(
    repository_dir: &Path,
    keystore: &KeyStore,
    request: &DelegationRequest,
) -> Result<PathBuf, RepoError> {
    let config = load_config(repository_dir)?;
    let role = RoleName::delegated(&request.parent, &request.name)?;
    let info = RoleInfo::new(request.keyids.clone(), request.threshold).with_paths(request.paths.clone());
    info.validate(&role)?;

    let parent_path = role_metadata_path(repository_dir, &request.parent);
    let mut parent: TargetsMetadata = read_metadata_file(&parent_path)?.typed()?;

    let parent_paths = delegated_paths(repository_dir, &request.parent)?;
    if !paths::patterns_within(&request.paths, parent_paths.as_deref()) {
        return Err(RepoError::DelegationOutOfScope {
            role: role.to_string(),
            reason: format!("paths {:?} exceed those of '{}'", request.paths, request.parent),
        });
    }

    let builder = MetadataBuilder::from_config(&config);
    let role_path = role_metadata_path(repository_dir, &role);
    let delegated = builder.build_targets(
        &targets_dir(repository_dir),
        Some(request.paths.as_slice()),
        next_version(&role_path)?,
        existing_delegations(&role_path)?,
    )?;
    let mut signable = SignedMetadata::from_typed(delegated)?;
    sign_metadata_for_role(
        &mut signable,
        role.as_str(),
        request.threshold,
        &request.keyids,
        keystore,
    )?;

    let delegations = parent.delegations.get_or_insert_with(Delegations::default);
    for keyid in &request.keyids {
        delegations
            .keys
            .insert(keyid.clone(), keystore.get_key(keyid)?.public_key());
    }
    delegations.roles.insert(role.clone(), info);
    parent.version += 1;
    parent.expires = builder.expires();

    let mut parent_signable = SignedMetadata::from_typed(parent)?;
    sign_metadata(&mut parent_signable, &request.parent_keyids, keystore)?;

    write_metadata_file(&signable, &role_path)?;
    write_metadata_file(&parent_signable, &parent_path)?;
    audit::log_delegation_created(
        request.parent.as_str(),
        role.as_str(),
        request.threshold,
        &request.paths,
    );
    Ok(role_path)
}

/// Paths a role may sign for as declared by its parent. The top-level
/// targets role is unrestricted.
fn delegated_paths(repository_dir: &Path, role: &RoleName) -> Result<Option<Vec<String>>, RepoError> {
    let Some(parent) = role.parent() else {
        return Ok(None);
    };
    let parent_metadata: TargetsMetadata =
        read_metadata_file(&role_metadata_path(repository_dir, &parent))?.typed()?;
    let info = parent_metadata
        .delegations
        .and_then(|d| d.roles.get(role).cloned())
        .ok_or_else(|| RepoError::DelegationOutOfScope {
            role: role.to_string(),
            reason: format!("not delegated by '{parent}'"),
        })?;
    Ok(Some(info.paths.unwrap_or_default()))
}

/// Keys and threshold to create for one role in a new repository.
#[derive(Debug, Clone)]
pub struct RoleSetup {
    pub key_count: u32,
    pub threshold: u32,
    pub password: String,
}

/// Inputs for [`build_repository`].
#[derive(Debug, Clone)]
pub struct QuickstartOptions {
    pub expiration_days: u32,
    /// Root, targets, release and timestamp are required. Mirrorlist is
    /// optional and needed only when `mirrors` is non-empty.
    pub roles: BTreeMap<RoleName, RoleSetup>,
    pub mirrors: Vec<Mirror>,
    pub compress_release: bool,
}

/// Where [`build_repository`] put things.
#[derive(Debug, Clone)]
pub struct QuickstartReport {
    pub keystore_dir: PathBuf,
    pub repository_dir: PathBuf,
    pub client_metadata_dir: PathBuf,
    pub keyids: BTreeMap<RoleName, Vec<KeyId>>,
}

/// Builds a complete repository from the files in `project_dir`.
///
/// Creates `keystore/`, `repository/` and `client/metadata/` under
/// `output_dir`: keys for every role, `config.toml`, a copy of the project
/// as targets, signed metadata for every role, and a client metadata
/// directory seeded with the new metadata.
pub fn build_repository(
    project_dir: &Path,
    output_dir: &Path,
    keystore: &KeyStore,
    options: &QuickstartOptions,
) -> Result<QuickstartReport, RepoError> {
    if !project_dir.is_dir() {
        return Err(RepoError::MissingDirectory(project_dir.to_path_buf()));
    }
    let keystore_dir = output_dir.join("keystore");
    let repository_dir = output_dir.join("repository");
    let client_metadata_dir = output_dir.join("client").join(METADATA_DIR);
    for dir in [&keystore_dir, &repository_dir, &client_metadata_dir] {
        if dir.exists() {
            return Err(RepoError::Config(format!("{} already exists", dir.display())));
        }
    }
    if !options.mirrors.is_empty() && !options.roles.contains_key(&RoleName::Mirrorlist) {
        return Err(RepoError::Config(
            "mirrors were given but the mirrorlist role is not configured".to_string(),
        ));
    }
    let mirrors = MirrorList::from_mirrors(options.mirrors.clone())?;

    let mut config = RepositoryConfig::new(options.expiration_days);
    let mut keyids = BTreeMap::new();
    for (role, setup) in &options.roles {
        let mut role_keyids = Vec::with_capacity(setup.key_count as usize);
        for _ in 0..setup.key_count {
            role_keyids.push(generate_and_save_key(keystore, &keystore_dir, &setup.password)?);
        }
        config
            .roles
            .insert(role.clone(), RoleKeys::new(role_keyids.clone(), setup.threshold));
        keyids.insert(role.clone(), role_keyids);
    }
    config.validate()?;

    for dir in [metadata_dir(&repository_dir), targets_dir(&repository_dir)] {
        std::fs::create_dir_all(&dir).map_err(RepoError::io(&dir))?;
    }
    build_config_file(&repository_dir, &config)?;
    copy_tree(project_dir, &targets_dir(&repository_dir))?;

    make_root_metadata(&repository_dir, keystore)?;
    make_targets_metadata(&repository_dir, keystore)?;
    if !mirrors.is_empty() {
        make_mirrorlist_metadata(&repository_dir, keystore, &mirrors)?;
    }
    make_release_metadata(&repository_dir, keystore, options.compress_release)?;
    make_timestamp_metadata(&repository_dir, keystore)?;

    seed_client_metadata(&metadata_dir(&repository_dir), &client_metadata_dir)?;
    tracing::info!(
        repository = %repository_dir.display(),
        keys = keystore.len(),
        "Built repository"
    );

    Ok(QuickstartReport {
        keystore_dir,
        repository_dir,
        client_metadata_dir,
        keyids,
    })
}

fn copy_tree(from: &Path, to: &Path) -> Result<(), RepoError> {
    for entry in WalkDir::new(from).sort_by_file_name() {
        let entry = entry.map_err(|e| RepoError::Io {
            path: e.path().unwrap_or(from).to_path_buf(),
            source: e.into(),
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(relative) = paths::relative_target_path(from, entry.path()) else {
            continue;
        };
        let destination = paths::join_target_path(to, &relative)?;
        if let Some(parent) = destination.parent() {
            std::fs::create_dir_all(parent).map_err(RepoError::io(parent))?;
        }
        std::fs::copy(entry.path(), &destination).map_err(RepoError::io(&destination))?;
    }
    Ok(())
}

/// Copies top-level role metadata into the client's `current/` and
/// `previous/` directories.
fn seed_client_metadata(metadata_dir: &Path, client_metadata_dir: &Path) -> Result<(), RepoError> {
    let roles = [
        RoleName::Root,
        RoleName::Targets,
        RoleName::Release,
        RoleName::Timestamp,
        RoleName::Mirrorlist,
    ];
    for subdir in ["current", "previous"] {
        let dir = client_metadata_dir.join(subdir);
        std::fs::create_dir_all(&dir).map_err(RepoError::io(&dir))?;
        for role in &roles {
            let source = metadata_dir.join(role.metadata_filename());
            if source.is_file() {
                let destination = dir.join(role.metadata_filename());
                std::fs::copy(&source, &destination).map_err(RepoError::io(&destination))?;
            }
        }
    }
    Ok(())
}
