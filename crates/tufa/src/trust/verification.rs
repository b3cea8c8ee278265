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

//! Signature-threshold, version and expiry checks.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use thiserror::Error;

use super::{KeyDb, RoleDb};
use crate::audit;
use crate::crypto::verify_signature;
use crate::metadata::{
    FormatError, IntegrityError, KeyId, KeyType, RoleName, SignedMetadata,
    SIGNATURE_METHOD_ED25519,
};

/// Trust violations.
///
/// These are hard failures. Callers can tell them apart from transport
/// failures, which are reported as download errors.
#[derive(Debug, Error)]
pub enum VerificationError {
    #[error("Unknown role: {0}")]
    UnknownRole(String),

    #[error("Role already exists: {0}")]
    RoleAlreadyExists(String),

    #[error("Cannot add role '{role}': parent role '{parent}' is not trusted")]
    MissingParentRole { role: String, parent: String },

    #[error("Signature threshold not met for role '{role}': {valid} valid of {required} required")]
    ThresholdNotMet {
        role: String,
        required: u32,
        valid: usize,
    },

    #[error("Metadata for role '{role}' expired at {expires}")]
    Expired {
        role: String,
        expires: DateTime<Utc>,
    },

    #[error("Rollback rejected for role '{role}': trusted version {trusted}, received {received}")]
    Rollback {
        role: String,
        trusted: u64,
        received: u64,
    },

    #[error("File '{file}' does not match its trusted file-info: {source}")]
    FileInfoMismatch {
        file: String,
        #[source]
        source: IntegrityError,
    },

    #[error("No trusted file-info for '{0}'")]
    MissingFileInfo(String),

    #[error("Delegation out of scope for role '{role}': {reason}")]
    DelegationOutOfScope { role: String, reason: String },

    #[error("Key id mismatch: declared {declared}, computed {computed}")]
    KeyIdMismatch { declared: String, computed: String },

    #[error("Malformed metadata received for role '{role}': {reason}")]
    MalformedMetadata { role: String, reason: String },

    #[error(transparent)]
    Format(#[from] FormatError),
}

/// Outcome of a successful signature check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationReport {
    pub role: RoleName,
    pub threshold: u32,
    pub valid_keyids: Vec<KeyId>,
}

/// Counts distinct valid signatures on `signable` from keys authorized for
/// `role` and requires at least the role's threshold.
///
/// A signature counts only if its keyid is listed for the role, the key is
/// in the key database, the key is Ed25519 and the signature verifies over
/// the canonical `signed` bytes. Duplicate keyids count once.
pub fn verify_signatures(
    roles: &RoleDb,
    keys: &KeyDb,
    signable: &SignedMetadata,
    role: &RoleName,
) -> Result<VerificationReport, VerificationError> {
    let info = roles
        .get(role)
        .ok_or_else(|| VerificationError::UnknownRole(role.to_string()))?;
    let message = signable.canonical_bytes()?;

    let mut valid: BTreeSet<&str> = BTreeSet::new();
    for signature in &signable.signatures {
        if valid.contains(signature.keyid.as_str())
            || !info.keyids.contains(&signature.keyid)
            || signature.method != SIGNATURE_METHOD_ED25519
        {
            continue;
        }
        let Some(key) = keys.get_key(&signature.keyid) else {
            continue;
        };
        if key.keytype != KeyType::Ed25519 {
            continue;
        }
        let (Ok(public), Ok(sig)) = (key.public_bytes(), hex::decode(&signature.sig)) else {
            continue;
        };
        if verify_signature(&message, &sig, &public).is_ok() {
            valid.insert(signature.keyid.as_str());
        }
    }

    if valid.len() < info.threshold as usize {
        let err = VerificationError::ThresholdNotMet {
            role: role.to_string(),
            required: info.threshold,
            valid: valid.len(),
        };
        audit::log_verification_failure(role.as_str(), &err.to_string());
        return Err(err);
    }

    audit::log_verification_success(role.as_str(), valid.len(), info.threshold);
    Ok(VerificationReport {
        role: role.clone(),
        threshold: info.threshold,
        valid_keyids: valid.into_iter().map(str::to_string).collect(),
    })
}

/// Rejects a received version lower than the trusted one.
pub fn check_version(
    role: &RoleName,
    trusted: Option<u64>,
    received: u64,
) -> Result<(), VerificationError> {
    match trusted {
        Some(trusted) if received < trusted => Err(VerificationError::Rollback {
            role: role.to_string(),
            trusted,
            received,
        }),
        _ => Ok(()),
    }
}

/// Rejects metadata whose expiry is not after `now`.
pub fn check_expiry(
    role: &RoleName,
    expires: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<(), VerificationError> {
    if expires <= now {
        return Err(VerificationError::Expired {
            role: role.to_string(),
            expires,
        });
    }
    Ok(())
}
