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

//! On-disk `<keyid>.key` container.
//!
//! The outer JSON is readable without the password (keyid, key type, KDF
//! parameters); the key material itself is sealed with AES-256-GCM.

use std::path::{Path, PathBuf};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};

use super::{Key, KeyError};
use crate::crypto::{self, EncryptedKey, KdfParams, KeyEncryptionError};
use crate::metadata::{KeyId, KeyType};

pub(crate) const KEY_FILE_EXTENSION: &str = "key";
const KDF_ALGORITHM: &str = "argon2id";

#[derive(Serialize, Deserialize)]
struct KdfSection {
    algorithm: String,
    salt: String,
    memory_kib: u32,
    iterations: u32,
    parallelism: u32,
}

#[derive(Serialize, Deserialize)]
struct KeyFileContainer {
    keyid: KeyId,
    keytype: KeyType,
    kdf: KdfSection,
    ciphertext: String,
}

#[derive(Serialize, Deserialize)]
struct KeyMaterialValue {
    public: String,
    private: String,
}

#[derive(Serialize, Deserialize)]
struct KeyMaterial {
    keytype: KeyType,
    keyid: KeyId,
    keyval: KeyMaterialValue,
}

pub(crate) fn keyfile_path(dir: &Path, keyid: &str) -> PathBuf {
    dir.join(format!("{keyid}.{KEY_FILE_EXTENSION}"))
}

fn malformed(path: &Path, reason: impl Into<String>) -> KeyError {
    KeyError::Malformed {
        path: path.to_path_buf(),
        reason: reason.into(),
    }
}

/// Serializes and encrypts a key under `password`.
pub(crate) fn seal(key: &Key, password: &str, params: &KdfParams) -> Result<Vec<u8>, KeyError> {
    let material = KeyMaterial {
        keytype: key.keytype(),
        keyid: key.keyid().to_string(),
        keyval: KeyMaterialValue {
            public: hex::encode(key.public_bytes()),
            private: hex::encode(key.private_bytes()),
        },
    };
    let plaintext = serde_json::to_vec(&material).map_err(|e| KeyError::Serialization(e.to_string()))?;
    let encrypted = crypto::encrypt_private_key(&plaintext, password, params)?;

    let container = KeyFileContainer {
        keyid: key.keyid().to_string(),
        keytype: key.keytype(),
        kdf: KdfSection {
            algorithm: KDF_ALGORITHM.to_string(),
            salt: hex::encode(&encrypted.salt),
            memory_kib: encrypted.params.memory_kib,
            iterations: encrypted.params.iterations,
            parallelism: encrypted.params.parallelism,
        },
        ciphertext: STANDARD.encode(&encrypted.ciphertext),
    };
    let mut bytes =
        serde_json::to_vec_pretty(&container).map_err(|e| KeyError::Serialization(e.to_string()))?;
    bytes.push(b'\n');
    Ok(bytes)
}

/// Decrypts a key file read from `path`.
///
/// `expected_keyid` is the keyid implied by the file name; the container,
/// the decrypted material and the key itself must all agree with it.
pub(crate) fn open(
    path: &Path,
    bytes: &[u8],
    expected_keyid: &str,
    password: &str,
) -> Result<Key, KeyError> {
    let container: KeyFileContainer =
        serde_json::from_slice(bytes).map_err(|e| malformed(path, e.to_string()))?;

    if container.keyid != expected_keyid {
        return Err(malformed(
            path,
            format!("file declares keyid {}", container.keyid),
        ));
    }
    if container.kdf.algorithm != KDF_ALGORITHM {
        return Err(malformed(
            path,
            format!("unsupported kdf '{}'", container.kdf.algorithm),
        ));
    }

    let encrypted = EncryptedKey {
        salt: hex::decode(&container.kdf.salt).map_err(|e| malformed(path, e.to_string()))?,
        params: KdfParams::new(
            container.kdf.memory_kib,
            container.kdf.iterations,
            container.kdf.parallelism,
        ),
        ciphertext: STANDARD
            .decode(&container.ciphertext)
            .map_err(|e| malformed(path, e.to_string()))?,
    };

    let plaintext = crypto::decrypt_private_key(&encrypted, password).map_err(|e| match e {
        KeyEncryptionError::DecryptionFailed => KeyError::BadPassword(expected_keyid.to_string()),
        other => malformed(path, other.to_string()),
    })?;

    let material: KeyMaterial =
        serde_json::from_slice(&plaintext).map_err(|e| malformed(path, e.to_string()))?;
    if material.keytype != KeyType::Ed25519 {
        return Err(KeyError::UnsupportedKeyType(
            material.keytype.as_str().to_string(),
        ));
    }

    let private = hex::decode(&material.keyval.private).map_err(|e| malformed(path, e.to_string()))?;
    let key = Key::from_ed25519_private(&private).map_err(|e| malformed(path, e.to_string()))?;

    if hex::encode(key.public_bytes()) != material.keyval.public.to_ascii_lowercase() {
        return Err(malformed(path, "public key does not match private key"));
    }
    if key.keyid() != expected_keyid || material.keyid != expected_keyid {
        return Err(malformed(path, "keyid does not match key material"));
    }
    Ok(key)
}
