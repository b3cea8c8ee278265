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

//! Public key records as they appear in root and delegation metadata.

use serde::{Deserialize, Serialize};
use serde_json::json;
use sha2::{Digest, Sha256};

use super::canonical::to_canonical_bytes;
use super::FormatError;

/// Hex-encoded SHA-256 identifier of a public key.
pub type KeyId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyType {
    Ed25519,
    /// Recognized in metadata but never used to verify signatures.
    Rsa,
}

impl KeyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyType::Ed25519 => "ed25519",
            KeyType::Rsa => "rsa",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKeyValue {
    /// Hex-encoded public key bytes.
    pub public: String,
}

/// The public half of a key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKey {
    pub keytype: KeyType,
    pub keyval: PublicKeyValue,
}

impl PublicKey {
    pub fn ed25519(public: &[u8]) -> Self {
        Self {
            keytype: KeyType::Ed25519,
            keyval: PublicKeyValue {
                public: hex::encode(public),
            },
        }
    }

    /// Computes the keyid: SHA-256 over the canonical encoding of
    /// `{"keytype": ..., "keyval": {"public": ...}}`.
    pub fn key_id(&self) -> Result<KeyId, FormatError> {
        let value = json!({
            "keytype": self.keytype.as_str(),
            "keyval": { "public": self.keyval.public },
        });
        let digest = Sha256::digest(to_canonical_bytes(&value)?);
        Ok(hex::encode(digest))
    }

    pub fn public_bytes(&self) -> Result<Vec<u8>, FormatError> {
        hex::decode(&self.keyval.public).map_err(|e| FormatError::InvalidHex {
            field: "keyval.public".to_string(),
            reason: e.to_string(),
        })
    }
}
