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

//! Cryptographic primitives for metadata signing and key storage.
//!
//! This module provides:
//! - Ed25519 key generation, signing and verification
//! - Argon2id password-based key derivation
//! - AES-256-GCM encryption for private keys at rest

mod key_encryption;
mod signing;

pub use key_encryption::{
    decrypt_private_key, derive_encryption_key, encrypt_private_key, EncryptedKey, KdfParams,
    KeyEncryptionError,
};
pub use signing::{
    derive_public_key, generate_signing_keypair, sign_message, verify_signature,
    GeneratedKeypair, SigningError,
};
