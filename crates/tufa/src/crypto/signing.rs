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

//! Ed25519 signing over canonical metadata bytes.
//!
//! Provides functions for:
//! - Generating Ed25519 signing keypairs
//! - Recovering a public key from a stored private seed
//! - Signing and verifying messages

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use thiserror::Error;

/// Errors that can occur during signing operations.
#[derive(Debug, Error)]
pub enum SigningError {
    #[error("Invalid private key: expected 32 bytes, got {0}")]
    InvalidPrivateKeyLength(usize),

    #[error("Invalid public key: expected 32 bytes, got {0}")]
    InvalidPublicKeyLength(usize),

    #[error("Invalid signature: expected 64 bytes, got {0}")]
    InvalidSignatureLength(usize),

    #[error("Malformed public key: {0}")]
    MalformedPublicKey(String),

    #[error("Signature verification failed")]
    VerificationFailed,
}

/// A generated Ed25519 keypair.
pub struct GeneratedKeypair {
    /// The 32-byte private key seed (encrypt before storage)
    pub private_key: Vec<u8>,
    /// The 32-byte public key
    pub public_key: Vec<u8>,
}

/// Generates a new Ed25519 signing keypair from the thread-local CSPRNG.
pub fn generate_signing_keypair() -> GeneratedKeypair {
    let mut csprng = rand::thread_rng();
    let signing_key = SigningKey::generate(&mut csprng);

    GeneratedKeypair {
        private_key: signing_key.to_bytes().to_vec(),
        public_key: signing_key.verifying_key().to_bytes().to_vec(),
    }
}

fn signing_key_from_seed(private_key: &[u8]) -> Result<SigningKey, SigningError> {
    let seed: [u8; 32] = private_key
        .try_into()
        .map_err(|_| SigningError::InvalidPrivateKeyLength(private_key.len()))?;
    Ok(SigningKey::from_bytes(&seed))
}

/// Recomputes the public half of an Ed25519 private seed.
///
/// Used when loading key files to check that the stored public key and
/// the stored private seed belong together.
pub fn derive_public_key(private_key: &[u8]) -> Result<Vec<u8>, SigningError> {
    let signing_key = signing_key_from_seed(private_key)?;
    Ok(signing_key.verifying_key().to_bytes().to_vec())
}

/// Signs a message using an Ed25519 private key.
///
/// # Arguments
///
/// * `message` - The bytes to sign (canonical metadata encoding)
/// * `private_key` - The 32-byte Ed25519 private key seed
///
/// # Returns
///
/// The 64-byte Ed25519 signature.
///
/// # Errors
///
/// Returns `SigningError` if the private key is invalid.
pub fn sign_message(message: &[u8], private_key: &[u8]) -> Result<Vec<u8>, SigningError> {
    let signing_key = signing_key_from_seed(private_key)?;
    Ok(signing_key.sign(message).to_bytes().to_vec())
}

/// Verifies an Ed25519 signature.
///
/// # Arguments
///
/// * `message` - The bytes that were signed
/// * `signature` - The 64-byte Ed25519 signature
/// * `public_key` - The 32-byte Ed25519 public key
///
/// # Errors
///
/// Returns `SigningError` if the inputs are malformed or verification fails.
pub fn verify_signature(
    message: &[u8],
    signature: &[u8],
    public_key: &[u8],
) -> Result<(), SigningError> {
    let key_bytes: [u8; 32] = public_key
        .try_into()
        .map_err(|_| SigningError::InvalidPublicKeyLength(public_key.len()))?;
    let sig_bytes: [u8; 64] = signature
        .try_into()
        .map_err(|_| SigningError::InvalidSignatureLength(signature.len()))?;

    let verifying_key = VerifyingKey::from_bytes(&key_bytes)
        .map_err(|e| SigningError::MalformedPublicKey(e.to_string()))?;
    let sig = Signature::from_bytes(&sig_bytes);

    verifying_key
        .verify(message, &sig)
        .map_err(|_| SigningError::VerificationFailed)
}
