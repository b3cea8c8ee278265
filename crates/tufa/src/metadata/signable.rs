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

//! The signed envelope: `{"signed": ..., "signatures": [...]}`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::canonical::to_canonical_bytes;
use super::keys::KeyId;
use super::payload::{Payload, TypedPayload};
use super::FormatError;

pub const SIGNATURE_METHOD_ED25519: &str = "ed25519";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    pub keyid: KeyId,
    pub method: String,
    /// Hex-encoded signature bytes.
    pub sig: String,
}

/// A metadata document plus its signatures.
///
/// `signed` is kept as the raw JSON value so that signature checks run
/// over exactly what was received, not over a re-serialized struct.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignedMetadata {
    pub signed: Value,
    #[serde(default)]
    pub signatures: Vec<Signature>,
}

impl SignedMetadata {
    /// Wraps a payload with no signatures.
    pub fn new(payload: &Payload) -> Result<Self, FormatError> {
        Ok(Self {
            signed: serde_json::to_value(payload)?,
            signatures: Vec::new(),
        })
    }

    pub fn from_typed<T: TypedPayload>(payload: T) -> Result<Self, FormatError> {
        Self::new(&payload.into_payload())
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, FormatError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Human-readable file encoding. Only `signed` is canonicalized for
    /// signing, so layout here does not affect verification.
    pub fn to_bytes(&self) -> Result<Vec<u8>, FormatError> {
        let mut bytes = serde_json::to_vec_pretty(self)?;
        bytes.push(b'\n');
        Ok(bytes)
    }

    pub fn canonical_bytes(&self) -> Result<Vec<u8>, FormatError> {
        to_canonical_bytes(&self.signed)
    }

    pub fn payload(&self) -> Result<Payload, FormatError> {
        let payload: Payload = serde_json::from_value(self.signed.clone())?;
        payload.validate()?;
        Ok(payload)
    }

    pub fn typed<T: TypedPayload>(&self) -> Result<T, FormatError> {
        T::from_payload(self.payload()?)
    }

    /// Adds a signature, replacing any earlier signature by the same key.
    pub fn add_signature(&mut self, signature: Signature) {
        match self
            .signatures
            .iter_mut()
            .find(|existing| existing.keyid == signature.keyid)
        {
            Some(existing) => *existing = signature,
            None => self.signatures.push(signature),
        }
    }
}
