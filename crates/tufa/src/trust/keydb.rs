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

//! Registry of trusted public keys.

use std::collections::{BTreeMap, BTreeSet};

use super::VerificationError;
use crate::metadata::{KeyId, PublicKey};

#[derive(Debug, Clone, Default)]
pub struct KeyDb {
    keys: BTreeMap<KeyId, PublicKey>,
}

impl KeyDb {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a key database from a `{keyid: key}` map, checking each keyid.
    pub fn from_keys(keys: &BTreeMap<KeyId, PublicKey>) -> Result<Self, VerificationError> {
        let mut db = Self::new();
        for (keyid, key) in keys {
            db.add_key(keyid, key.clone())?;
        }
        Ok(db)
    }

    /// Adds a key under its declared keyid.
    ///
    /// Re-adding the same key is a no-op. A declared keyid that differs
    /// from the computed one is rejected.
    pub fn add_key(&mut self, keyid: &str, key: PublicKey) -> Result<(), VerificationError> {
        let computed = key.key_id()?;
        if computed != keyid {
            return Err(VerificationError::KeyIdMismatch {
                declared: keyid.to_string(),
                computed,
            });
        }
        self.keys.entry(computed).or_insert(key);
        Ok(())
    }

    pub fn get_key(&self, keyid: &str) -> Option<&PublicKey> {
        self.keys.get(keyid)
    }

    pub fn contains(&self, keyid: &str) -> bool {
        self.keys.contains_key(keyid)
    }

    /// Drops every key not in `referenced`.
    pub fn retain_referenced(&mut self, referenced: &BTreeSet<&KeyId>) {
        self.keys.retain(|keyid, _| referenced.contains(keyid));
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}
