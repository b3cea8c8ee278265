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

//! Password-based AES-256-GCM encryption for private keys at rest.
//!
//! A 32-byte key is derived from the password with Argon2id and a random
//! per-file salt. The encrypted payload format is:
//! `nonce (12 bytes) || ciphertext || tag (16 bytes)`.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use argon2::{Algorithm, Argon2, Params, Version};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur during key encryption/decryption.
#[derive(Debug, Error)]
pub enum KeyEncryptionError {
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    /// The password is wrong or the ciphertext was modified.
    #[error("Decryption failed: authentication tag mismatch")]
    DecryptionFailed,

    #[error("Key derivation failed: {0}")]
    KeyDerivationFailed(String),

    #[error("Invalid encrypted data: too short")]
    InvalidEncryptedData,
}

/// Size of the AES-256-GCM nonce in bytes.
const NONCE_SIZE: usize = 12;

/// Size of the random Argon2 salt in bytes.
const SALT_SIZE: usize = 16;

/// Argon2id cost parameters stored alongside every encrypted key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KdfParams {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl KdfParams {
    pub fn new(memory_kib: u32, iterations: u32, parallelism: u32) -> Self {
        Self {
            memory_kib,
            iterations,
            parallelism,
        }
    }

    /// Minimal-cost parameters. Only suitable for tests.
    pub fn insecure_fast() -> Self {
        Self::new(256, 1, 1)
    }
}

impl Default for KdfParams {
    fn default() -> Self {
        Self::new(19_456, 2, 1)
    }
}

/// A private key encrypted under a password-derived key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedKey {
    pub salt: Vec<u8>,
    pub params: KdfParams,
    pub ciphertext: Vec<u8>,
}

/// Derives a 32-byte AES key from a password with Argon2id.
pub fn derive_encryption_key(
    password: &str,
    salt: &[u8],
    params: &KdfParams,
) -> Result<[u8; 32], KeyEncryptionError> {
    let argon_params = Params::new(
        params.memory_kib,
        params.iterations,
        params.parallelism,
        Some(32),
    )
    .map_err(|e| KeyEncryptionError::KeyDerivationFailed(e.to_string()))?;
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, argon_params);

    let mut key = [0u8; 32];
    argon2
        .hash_password_into(password.as_bytes(), salt, &mut key)
        .map_err(|e| KeyEncryptionError::KeyDerivationFailed(e.to_string()))?;
    Ok(key)
}

/// Encrypts private key material under a password.
///
/// # Arguments
///
/// * `plaintext` - The serialized private key material
/// * `password` - The key's password
/// * `params` - Argon2id cost parameters recorded in the result
///
/// # Errors
///
/// Returns `KeyEncryptionError` if key derivation or encryption fails.
pub fn encrypt_private_key(
    plaintext: &[u8],
    password: &str,
    params: &KdfParams,
) -> Result<EncryptedKey, KeyEncryptionError> {
    let mut rng = rand::thread_rng();
    let mut salt = vec![0u8; SALT_SIZE];
    rng.fill_bytes(&mut salt);

    let key = derive_encryption_key(password, &salt, params)?;
    let cipher = Aes256Gcm::new_from_slice(&key)
        .map_err(|e| KeyEncryptionError::EncryptionFailed(e.to_string()))?;

    let mut nonce_bytes = [0u8; NONCE_SIZE];
    rng.fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let sealed = cipher
        .encrypt(nonce, plaintext)
        .map_err(|e| KeyEncryptionError::EncryptionFailed(e.to_string()))?;

    let mut ciphertext = Vec::with_capacity(NONCE_SIZE + sealed.len());
    ciphertext.extend_from_slice(&nonce_bytes);
    ciphertext.extend_from_slice(&sealed);

    Ok(EncryptedKey {
        salt,
        params: *params,
        ciphertext,
    })
}

/// Decrypts private key material encrypted by [`encrypt_private_key`].
///
/// # Errors
///
/// Returns `KeyEncryptionError::DecryptionFailed` for a wrong password or
/// tampered ciphertext, and `InvalidEncryptedData` for truncated input.
pub fn decrypt_private_key(
    encrypted: &EncryptedKey,
    password: &str,
) -> Result<Vec<u8>, KeyEncryptionError> {
    // nonce (12) + tag (16) + at least 1 byte of ciphertext
    if encrypted.ciphertext.len() < NONCE_SIZE + 17 {
        return Err(KeyEncryptionError::InvalidEncryptedData);
    }

    let key = derive_encryption_key(password, &encrypted.salt, &encrypted.params)?;
    let cipher = Aes256Gcm::new_from_slice(&key)
        .map_err(|e| KeyEncryptionError::KeyDerivationFailed(e.to_string()))?;

    let (nonce_bytes, sealed) = encrypted.ciphertext.split_at(NONCE_SIZE);
    cipher
        .decrypt(Nonce::from_slice(nonce_bytes), sealed)
        .map_err(|_| KeyEncryptionError::DecryptionFailed)
}
