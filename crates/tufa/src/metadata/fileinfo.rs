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

//! Length-plus-digest descriptions of files.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256, Sha512};
use thiserror::Error;

use super::FormatError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HashAlgorithm {
    Sha256,
    Sha512,
}

impl HashAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            HashAlgorithm::Sha256 => "sha256",
            HashAlgorithm::Sha512 => "sha512",
        }
    }

    pub fn digest_hex(&self, data: &[u8]) -> String {
        match self {
            HashAlgorithm::Sha256 => hex::encode(Sha256::digest(data)),
            HashAlgorithm::Sha512 => hex::encode(Sha512::digest(data)),
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HashAlgorithm {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sha256" => Ok(HashAlgorithm::Sha256),
            "sha512" => Ok(HashAlgorithm::Sha512),
            other => Err(FormatError::InvalidValue {
                field: "hash algorithm".to_string(),
                reason: format!("unsupported algorithm '{other}'"),
            }),
        }
    }
}

/// A mismatch between received bytes and the trusted description of them.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum IntegrityError {
    #[error("Length mismatch: expected {expected} bytes, got {actual}")]
    LengthMismatch { expected: u64, actual: u64 },

    #[error("{algorithm} digest mismatch: expected {expected}, got {actual}")]
    HashMismatch {
        algorithm: String,
        expected: String,
        actual: String,
    },

    #[error("No supported hash algorithm listed")]
    NoSupportedHash,
}

/// Expected length and digests of a file.
///
/// Digest algorithms are kept by name so unrecognized entries survive a
/// round trip; at least one recognized algorithm must be present for a
/// file to verify.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInfo {
    pub length: u64,
    pub hashes: BTreeMap<String, String>,
}

impl FileInfo {
    /// Describes `data` with a SHA-256 digest.
    pub fn from_bytes(data: &[u8]) -> Self {
        Self::from_bytes_with(data, &[HashAlgorithm::Sha256])
    }

    pub fn from_bytes_with(data: &[u8], algorithms: &[HashAlgorithm]) -> Self {
        let hashes = algorithms
            .iter()
            .map(|alg| (alg.as_str().to_string(), alg.digest_hex(data)))
            .collect();
        Self {
            length: data.len() as u64,
            hashes,
        }
    }

    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let data = std::fs::read(path)?;
        Ok(Self::from_bytes(&data))
    }

    /// Checks the length first, then every recognized digest.
    pub fn verify(&self, data: &[u8]) -> Result<(), IntegrityError> {
        let actual = data.len() as u64;
        if actual != self.length {
            return Err(IntegrityError::LengthMismatch {
                expected: self.length,
                actual,
            });
        }

        let mut checked = 0;
        for (name, expected) in &self.hashes {
            let Ok(algorithm) = name.parse::<HashAlgorithm>() else {
                continue;
            };
            let actual = algorithm.digest_hex(data);
            if !actual.eq_ignore_ascii_case(expected) {
                return Err(IntegrityError::HashMismatch {
                    algorithm: name.clone(),
                    expected: expected.clone(),
                    actual,
                });
            }
            checked += 1;
        }

        if checked == 0 {
            return Err(IntegrityError::NoSupportedHash);
        }
        Ok(())
    }

    pub fn matches(&self, data: &[u8]) -> bool {
        self.verify(data).is_ok()
    }
}
