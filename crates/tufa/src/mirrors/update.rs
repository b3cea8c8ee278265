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

use std::path::Path;

use chrono::Utc;

use super::{MirrorError, MirrorList};
use crate::audit;
use crate::client::{Fetcher, MetadataStore};
use crate::metadata::{MirrorsMetadata, RoleName, SignedMetadata};
use crate::trust::{check_expiry, check_version, TrustStore, VerificationError};

/// Fetches a signed mirror list from `url` and installs it if trusted.
///
/// The document must meet the mirrorlist role's threshold under `trust`,
/// must not be expired, and must not be older than either `trusted_version`
/// or the installed list. An installed list that cannot be read or parsed
/// is an error. On success the previous list moves to `previous/` and the
/// new bytes are written to `current/`. On any failure the files on disk
/// are unchanged.
pub fn update_mirrorlist(
    url: &str,
    metadata_dir: &Path,
    trust: &TrustStore,
    trusted_version: Option<u64>,
    fetcher: &dyn Fetcher,
    max_length: u64,
) -> Result<MirrorList, MirrorError> {
    let result = fetch_and_install(url, metadata_dir, trust, trusted_version, fetcher, max_length);
    match &result {
        Ok((list, version)) => audit::log_mirrorlist_updated(*version, list.len()),
        Err(e) => audit::log_mirrorlist_rejected(url, &e.to_string()),
    }
    result.map(|(list, _)| list)
}

fn fetch_and_install(
    url: &str,
    metadata_dir: &Path,
    trust: &TrustStore,
    trusted_version: Option<u64>,
    fetcher: &dyn Fetcher,
    max_length: u64,
) -> Result<(MirrorList, u64), MirrorError> {
    let role = RoleName::Mirrorlist;
    let bytes = fetcher.fetch(url, max_length)?;

    let malformed = |reason: String| VerificationError::MalformedMetadata {
        role: role.to_string(),
        reason,
    };
    let signable = SignedMetadata::from_bytes(&bytes).map_err(|e| malformed(e.to_string()))?;
    trust.verify(&signable, &role)?;
    let metadata: MirrorsMetadata = signable.typed().map_err(|e| malformed(e.to_string()))?;

    let store = MetadataStore::new(metadata_dir);
    let installed_version = match store.load_current(&role)? {
        Some(current) => Some(current.typed::<MirrorsMetadata>()?.version),
        None => None,
    };
    check_version(&role, trusted_version.max(installed_version), metadata.version)?;
    check_expiry(&role, metadata.expires, Utc::now())?;

    let list = MirrorList::from_mirrors(metadata.mirrors)?;
    store
        .install(&role, &bytes)
        .map_err(|source| MirrorError::Io {
            path: store.current_path(&role),
            source,
        })?;
    Ok((list, metadata.version))
}
