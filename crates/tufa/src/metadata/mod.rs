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

//! Metadata document formats.
//!
//! This module provides:
//! - Role names and role records (`RoleName`, `RoleInfo`)
//! - Public key records and key identifiers
//! - File-info (length plus digests) for targets and metadata files
//! - Typed payloads for the five metadata document types
//! - The signed envelope and its canonical encoding
//! - Target path validation and confinement checks

pub mod canonical;
mod fileinfo;
mod keys;
pub mod paths;
mod payload;
mod role;
mod signable;

pub use fileinfo::{FileInfo, HashAlgorithm, IntegrityError};
pub use keys::{KeyId, KeyType, PublicKey, PublicKeyValue};
pub use payload::{
    Delegations, MetadataType, MirrorsMetadata, Payload, ReleaseMetadata,
    RootMetadata, TargetsMetadata, TimestampMetadata, TypedPayload,
};
pub use role::{RoleInfo, RoleName};
pub use signable::{Signature, SignedMetadata, SIGNATURE_METHOD_ED25519};

use thiserror::Error;

/// Locally detected problems with metadata structure or values.
///
/// These are never caused by the network; a malformed document received
/// from a mirror is reported as a verification failure instead.
#[derive(Debug, Error)]
pub enum FormatError {
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid role name '{0}'")]
    InvalidRoleName(String),

    #[error("Invalid target path '{path}': {reason}")]
    InvalidTargetPath { path: String, reason: String },

    #[error("Invalid threshold {threshold} for role '{role}' with {keys} distinct key(s)")]
    InvalidThreshold {
        role: String,
        threshold: u32,
        keys: usize,
    },

    #[error("Duplicate keyid '{keyid}' listed for role '{role}'")]
    DuplicateKeyId { role: String, keyid: String },

    #[error("Expected {expected} metadata, found {found}")]
    WrongMetadataType {
        expected: &'static str,
        found: &'static str,
    },

    #[error("Root metadata does not declare required role '{0}'")]
    MissingRole(String),

    #[error("Invalid hex in {field}: {reason}")]
    InvalidHex { field: String, reason: String },

    #[error("Expiration must be in the future")]
    ExpirationInPast,

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}
