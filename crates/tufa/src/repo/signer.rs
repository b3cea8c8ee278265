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

//! Signing metadata and reading/writing metadata files.

use std::path::Path;

use super::RepoError;
use crate::audit;
use crate::fsutil::write_atomic;
use crate::keystore::{KeyError, KeyStore};
use crate::metadata::{KeyId, KeyType, SignedMetadata};

/// Adds a signature from each of `keyids` over the canonical `signed`
/// payload, replacing any earlier signature by the same key.
///
/// Every key must be loaded in `keystore` and be an Ed25519 key.
pub fn sign_metadata(
    signable: &mut SignedMetadata,
    keyids: &[KeyId],
    keystore: &KeyStore,
) -> Result<(), RepoError> {
    let message = signable.canonical_bytes()?;
    let mut signatures = Vec::with_capacity(keyids.len());
    for keyid in keyids {
        let key = keystore.get_key(keyid)?;
        if key.keytype() != KeyType::Ed25519 {
            return Err(KeyError::UnsupportedKeyType(key.keytype().as_str().to_string()).into());
        }
        signatures.push(key.sign(&message)?);
    }

    for signature in signatures {
        signable.add_signature(signature);
    }

    let payload = signable.payload()?;
    audit::log_metadata_signed(payload.metadata_type().as_str(), payload.version(), keyids);
    Ok(())
}

/// Signs for a role after checking that enough keys were supplied to
/// meet `threshold`.
pub fn sign_metadata_for_role(
    signable: &mut SignedMetadata,
    role: &str,
    threshold: u32,
    keyids: &[KeyId],
    keystore: &KeyStore,
) -> Result<(), RepoError> {
    let mut distinct = keyids.to_vec();
    distinct.sort();
    distinct.dedup();
    if distinct.len() < threshold as usize {
        return Err(RepoError::InsufficientKeys {
            role: role.to_string(),
            threshold,
            available: distinct.len(),
        });
    }
    sign_metadata(signable, &distinct, keystore)
}

/// Writes `signable` to `path` via a temporary file and rename.
pub fn write_metadata_file(signable: &SignedMetadata, path: &Path) -> Result<(), RepoError> {
    let bytes = signable.to_bytes()?;
    write_atomic(path, &bytes).map_err(RepoError::io(path))?;
    tracing::debug!(path = %path.display(), "Wrote metadata file");
    Ok(())
}

pub fn read_metadata_file(path: &Path) -> Result<SignedMetadata, RepoError> {
    if !path.is_file() {
        return Err(RepoError::MissingMetadata(path.to_path_buf()));
    }
    let bytes = std::fs::read(path).map_err(RepoError::io(path))?;
    Ok(SignedMetadata::from_bytes(&bytes)?)
}

/// Version for a file about to be rewritten at `path`: one more than the
/// existing file's, or 1 if there is none.
pub fn next_version(path: &Path) -> Result<u64, RepoError> {
    if !path.exists() {
        return Ok(1);
    }
    let existing = read_metadata_file(path)?.payload()?;
    Ok(existing.version() + 1)
}
