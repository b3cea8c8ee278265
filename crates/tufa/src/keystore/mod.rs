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

//! Password-protected private key storage.
//!
//! A [`KeyStore`] is an in-memory cache of decrypted keys and the password
//! each one is stored under. It is persisted as one encrypted
//! `<keyid>.key` file per key. Keys are cached only after their file
//! decrypted successfully with the supplied password.

mod keyfile;

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use thiserror::Error;

use crate::audit;
use crate::crypto::{self, KdfParams, KeyEncryptionError, SigningError};
use crate::fsutil::write_atomic;
use crate::metadata::{KeyId, KeyType, PublicKey, Signature, SIGNATURE_METHOD_ED25519};

use keyfile::{keyfile_path, KEY_FILE_EXTENSION};

/// Errors that can occur during keystore operations.
#[derive(Debug, Error)]
pub enum KeyError {
    #[error("Unknown key: {0}")]
    UnknownKey(KeyId),

    #[error("Incorrect password for key {0}")]
    BadPassword(KeyId),

    #[error("Key file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Keystore directory not found: {}", .0.display())]
    DirectoryNotFound(PathBuf),

    #[error("Malformed key file {}: {reason}", path.display())]
    Malformed { path: PathBuf, reason: String },

    #[error("Key already exists in keystore: {0}")]
    AlreadyExists(KeyId),

    #[error("Unsupported key type '{0}'")]
    UnsupportedKeyType(String),

    #[error("Password must not be empty")]
    EmptyPassword,

    #[error("Got {keyids} keyid(s) but {passwords} password(s)")]
    ArgumentMismatch { keyids: usize, passwords: usize },

    #[error("Key serialization failed: {0}")]
    Serialization(String),

    #[error("Key encryption error: {0}")]
    Encryption(#[from] KeyEncryptionError),

    #[error("Signing error: {0}")]
    Signing(#[from] SigningError),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A decrypted Ed25519 keypair.
#[derive(Clone)]
pub struct Key {
    keyid: KeyId,
    keytype: KeyType,
    public: Vec<u8>,
    private: Vec<u8>,
}

impl Key {
    /// Generates a fresh Ed25519 key.
    pub fn generate() -> Result<Self, KeyError> {
        let keypair = crypto::generate_signing_keypair();
        Self::from_ed25519_private(&keypair.private_key)
    }

    /// Rebuilds a key from its 32-byte Ed25519 seed.
    pub fn from_ed25519_private(private: &[u8]) -> Result<Self, KeyError> {
        let public = crypto::derive_public_key(private)?;
        let keyid = PublicKey::ed25519(&public)
            .key_id()
            .map_err(|e| KeyError::Serialization(e.to_string()))?;
        Ok(Self {
            keyid,
            keytype: KeyType::Ed25519,
            public,
            private: private.to_vec(),
        })
    }

    pub fn keyid(&self) -> &str {
        &self.keyid
    }

    pub fn keytype(&self) -> KeyType {
        self.keytype
    }

    pub fn public_key(&self) -> PublicKey {
        PublicKey::ed25519(&self.public)
    }

    pub fn public_bytes(&self) -> &[u8] {
        &self.public
    }

    pub(crate) fn private_bytes(&self) -> &[u8] {
        &self.private
    }

    /// Signs `message` and returns a metadata signature record.
    pub fn sign(&self, message: &[u8]) -> Result<Signature, KeyError> {
        let sig = crypto::sign_message(message, &self.private)?;
        Ok(Signature {
            keyid: self.keyid.clone(),
            method: SIGNATURE_METHOD_ED25519.to_string(),
            sig: hex::encode(sig),
        })
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Key")
            .field("keyid", &self.keyid)
            .field("keytype", &self.keytype)
            .field("private", &"<redacted>")
            .finish()
    }
}

struct CachedKey {
    key: Key,
    password: String,
}

/// In-memory cache of decrypted keys keyed by keyid.
pub struct KeyStore {
    keys: Mutex<HashMap<KeyId, CachedKey>>,
    kdf: KdfParams,
}

impl Default for KeyStore {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for KeyStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyStore")
            .field("keyids", &self.keyids())
            .field("kdf", &self.kdf)
            .finish()
    }
}

impl KeyStore {
    pub fn new() -> Self {
        Self::with_kdf_params(KdfParams::default())
    }

    /// Creates a keystore that encrypts new key files with `kdf`.
    pub fn with_kdf_params(kdf: KdfParams) -> Self {
        Self {
            keys: Mutex::new(HashMap::new()),
            kdf,
        }
    }

    pub fn kdf_params(&self) -> &KdfParams {
        &self.kdf
    }

    /// Adds a key and the password it will be saved under.
    ///
    /// # Errors
    ///
    /// Returns `KeyError::AlreadyExists` if the keyid is already cached and
    /// `KeyError::EmptyPassword` for an empty password.
    pub fn add_key(&self, key: Key, password: &str) -> Result<(), KeyError> {
        if password.is_empty() {
            return Err(KeyError::EmptyPassword);
        }
        let mut keys = self.keys.lock();
        if keys.contains_key(key.keyid()) {
            return Err(KeyError::AlreadyExists(key.keyid().to_string()));
        }
        keys.insert(
            key.keyid().to_string(),
            CachedKey {
                key,
                password: password.to_string(),
            },
        );
        Ok(())
    }

    /// Generates a new Ed25519 key, caches it and returns its keyid.
    pub fn generate_key(&self, password: &str) -> Result<KeyId, KeyError> {
        let key = Key::generate()?;
        let keyid = key.keyid().to_string();
        self.add_key(key, password)?;
        audit::log_key_created(&keyid, KeyType::Ed25519.as_str());
        Ok(keyid)
    }

    /// Decrypts `<dir>/<keyid>.key` with `password` and caches the key.
    ///
    /// Loading a key that is already cached succeeds if the password is the
    /// one it is cached under.
    pub fn load_keyfile(&self, dir: &Path, keyid: &str, password: &str) -> Result<KeyId, KeyError> {
        if let Some(cached) = self.keys.lock().get(keyid) {
            return if cached.password == password {
                Ok(keyid.to_string())
            } else {
                Err(KeyError::BadPassword(keyid.to_string()))
            };
        }

        let path = keyfile_path(dir, keyid);
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(KeyError::NotFound(path))
            }
            Err(source) => return Err(KeyError::Io { path, source }),
        };

        let key = keyfile::open(&path, &bytes, keyid, password)?;
        let mut keys = self.keys.lock();
        keys.entry(keyid.to_string()).or_insert(CachedKey {
            key,
            password: password.to_string(),
        });
        audit::log_key_loaded(keyid, &path);
        Ok(keyid.to_string())
    }

    /// Loads each `(keyid, password)` pair from `dir`.
    ///
    /// Keys that fail to load (wrong password, missing or malformed file)
    /// are logged and left out of the result.
    ///
    /// # Errors
    ///
    /// Returns `KeyError::DirectoryNotFound` if `dir` does not exist and
    /// `KeyError::ArgumentMismatch` if the slices differ in length.
    pub fn load_keystore_from_keyfiles(
        &self,
        dir: &Path,
        keyids: &[KeyId],
        passwords: &[String],
    ) -> Result<Vec<KeyId>, KeyError> {
        if !dir.is_dir() {
            return Err(KeyError::DirectoryNotFound(dir.to_path_buf()));
        }
        if keyids.len() != passwords.len() {
            return Err(KeyError::ArgumentMismatch {
                keyids: keyids.len(),
                passwords: passwords.len(),
            });
        }

        let mut loaded = Vec::new();
        for (keyid, password) in keyids.iter().zip(passwords) {
            match self.load_keyfile(dir, keyid, password) {
                Ok(id) => loaded.push(id),
                Err(e) => {
                    audit::log_key_load_failed(keyid, &keyfile_path(dir, keyid), &e.to_string())
                }
            }
        }
        Ok(loaded)
    }

    /// Writes one cached key to `<dir>/<keyid>.key`.
    pub fn save_keyfile(&self, dir: &Path, keyid: &str) -> Result<PathBuf, KeyError> {
        let bytes = {
            let keys = self.keys.lock();
            let cached = keys
                .get(keyid)
                .ok_or_else(|| KeyError::UnknownKey(keyid.to_string()))?;
            keyfile::seal(&cached.key, &cached.password, &self.kdf)?
        };

        let path = keyfile_path(dir, keyid);
        write_atomic(&path, &bytes).map_err(|source| KeyError::Io {
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }

    /// Writes every cached key to `dir`, creating it if needed.
    pub fn save_keystore_to_keyfiles(&self, dir: &Path) -> Result<Vec<PathBuf>, KeyError> {
        std::fs::create_dir_all(dir).map_err(|source| KeyError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        self.keyids()
            .iter()
            .map(|keyid| self.save_keyfile(dir, keyid))
            .collect()
    }

    /// Replaces the password a cached key is saved under.
    ///
    /// # Errors
    ///
    /// `UnknownKey` if the key is not cached, `BadPassword` if `old` is not
    /// its current password.
    pub fn change_password(&self, keyid: &str, old: &str, new: &str) -> Result<(), KeyError> {
        if new.is_empty() {
            return Err(KeyError::EmptyPassword);
        }
        let mut keys = self.keys.lock();
        let cached = keys
            .get_mut(keyid)
            .ok_or_else(|| KeyError::UnknownKey(keyid.to_string()))?;
        if cached.password != old {
            return Err(KeyError::BadPassword(keyid.to_string()));
        }
        cached.password = new.to_string();
        drop(keys);

        audit::log_key_password_changed(keyid);
        Ok(())
    }

    pub fn get_key(&self, keyid: &str) -> Result<Key, KeyError> {
        self.keys
            .lock()
            .get(keyid)
            .map(|cached| cached.key.clone())
            .ok_or_else(|| KeyError::UnknownKey(keyid.to_string()))
    }

    pub fn contains_key(&self, keyid: &str) -> bool {
        self.keys.lock().contains_key(keyid)
    }

    /// Cached keyids in sorted order.
    pub fn keyids(&self) -> Vec<KeyId> {
        let mut ids: Vec<KeyId> = self.keys.lock().keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.keys.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.lock().is_empty()
    }

    /// Drops every cached key and password.
    pub fn clear_keystore(&self) {
        self.keys.lock().clear();
    }
}

/// Lists the keyids of all key files in `dir` without decrypting them.
pub fn list_keyids(dir: &Path) -> Result<Vec<KeyId>, KeyError> {
    let entries = std::fs::read_dir(dir).map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            KeyError::DirectoryNotFound(dir.to_path_buf())
        } else {
            KeyError::Io {
                path: dir.to_path_buf(),
                source,
            }
        }
    })?;

    let mut keyids = Vec::new();
    for entry in entries {
        let path = entry
            .map_err(|source| KeyError::Io {
                path: dir.to_path_buf(),
                source,
            })?
            .path();
        if path.extension().and_then(|e| e.to_str()) != Some(KEY_FILE_EXTENSION) {
            continue;
        }
        if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
            keyids.push(stem.to_string());
        }
    }
    keyids.sort();
    Ok(keyids)
}
