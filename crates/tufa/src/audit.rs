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

//! Security audit logging.
//!
//! This module provides structured audit events for security-sensitive operations:
//! - Key operations (create, load, password change)
//! - Metadata signing and verification
//! - Client refreshes, target downloads and mirror list updates
//!
//! Events are logged through `tracing` with a dotted `event_type` field.

use std::path::Path;

/// Event types for audit records.
pub mod events {
    /// Key generated and added to a keystore.
    pub const KEY_CREATED: &str = "key.created";
    /// Key file decrypted and cached.
    pub const KEY_LOADED: &str = "key.loaded";
    /// Key file could not be loaded.
    pub const KEY_LOAD_FAILED: &str = "key.load_failed";
    pub const KEY_PASSWORD_CHANGED: &str = "key.password_changed";

    /// Metadata document signed.
    pub const METADATA_SIGNED: &str = "metadata.signed";
    pub const DELEGATION_CREATED: &str = "metadata.delegation.created";

    /// Signature threshold satisfied.
    pub const VERIFICATION_SUCCESS: &str = "verification.success";
    /// Metadata rejected by a trust check.
    pub const VERIFICATION_FAILURE: &str = "verification.failure";

    /// Trusted metadata replaced on disk.
    pub const METADATA_UPDATE_SUCCESS: &str = "metadata.update.success";
    /// A role could not be updated from any mirror.
    pub const METADATA_UPDATE_FAILURE: &str = "metadata.update.failure";
    /// A single mirror failed to serve a file.
    pub const MIRROR_FETCH_FAILURE: &str = "mirror.fetch.failure";

    pub const REFRESH_SUCCESS: &str = "refresh.success";
    pub const REFRESH_FAILURE: &str = "refresh.failure";

    pub const TARGET_DOWNLOAD_SUCCESS: &str = "target.download.success";
    pub const TARGET_DOWNLOAD_FAILURE: &str = "target.download.failure";
    pub const TARGET_REMOVED: &str = "target.removed";

    pub const MIRRORLIST_UPDATED: &str = "mirrorlist.updated";
    pub const MIRRORLIST_REJECTED: &str = "mirrorlist.rejected";
}

/// Log a key generation event.
pub fn log_key_created(keyid: &str, keytype: &str) {
    tracing::info!(
        event_type = events::KEY_CREATED,
        keyid = %keyid,
        keytype = %keytype,
        "Key created"
    );
}

pub fn log_key_loaded(keyid: &str, path: &Path) {
    tracing::debug!(
        event_type = events::KEY_LOADED,
        keyid = %keyid,
        path = %path.display(),
        "Key loaded"
    );
}

/// Log a key that could not be loaded. The error never contains key material.
pub fn log_key_load_failed(keyid: &str, path: &Path, error: &str) {
    tracing::warn!(
        event_type = events::KEY_LOAD_FAILED,
        keyid = %keyid,
        path = %path.display(),
        error = %error,
        "Failed to load key"
    );
}

pub fn log_key_password_changed(keyid: &str) {
    tracing::info!(
        event_type = events::KEY_PASSWORD_CHANGED,
        keyid = %keyid,
        "Key password changed"
    );
}

/// Log a metadata signing event.
pub fn log_metadata_signed(metadata_type: &str, version: u64, keyids: &[String]) {
    tracing::info!(
        event_type = events::METADATA_SIGNED,
        metadata_type = %metadata_type,
        version = version,
        keyids = %keyids.join(","),
        "Metadata signed"
    );
}

pub fn log_delegation_created(parent: &str, role: &str, threshold: u32, paths: &[String]) {
    tracing::info!(
        event_type = events::DELEGATION_CREATED,
        parent = %parent,
        role = %role,
        threshold = threshold,
        paths = %paths.join(","),
        "Delegation created"
    );
}

pub fn log_verification_success(role: &str, valid_signatures: usize, threshold: u32) {
    tracing::debug!(
        event_type = events::VERIFICATION_SUCCESS,
        role = %role,
        valid_signatures = valid_signatures,
        threshold = threshold,
        "Metadata verified"
    );
}

/// Log a trust-check rejection.
pub fn log_verification_failure(role: &str, reason: &str) {
    tracing::warn!(
        event_type = events::VERIFICATION_FAILURE,
        role = %role,
        reason = %reason,
        "Metadata verification failed"
    );
}

pub fn log_metadata_update_success(role: &str, version: u64, url: &str) {
    tracing::info!(
        event_type = events::METADATA_UPDATE_SUCCESS,
        role = %role,
        version = version,
        url = %url,
        "Metadata updated"
    );
}

pub fn log_metadata_update_failure(role: &str, error: &str) {
    tracing::error!(
        event_type = events::METADATA_UPDATE_FAILURE,
        role = %role,
        error = %error,
        "Metadata update failed"
    );
}

pub fn log_mirror_fetch_failure(url: &str, reason: &str) {
    tracing::warn!(
        event_type = events::MIRROR_FETCH_FAILURE,
        url = %url,
        reason = %reason,
        "Mirror failed"
    );
}

pub fn log_refresh_success(repository: &str) {
    tracing::info!(
        event_type = events::REFRESH_SUCCESS,
        repository = %repository,
        "Refresh completed"
    );
}

pub fn log_refresh_failure(repository: &str, error: &str) {
    tracing::error!(
        event_type = events::REFRESH_FAILURE,
        repository = %repository,
        error = %error,
        "Refresh failed"
    );
}

/// Log a verified target download.
pub fn log_target_download_success(path: &str, destination: &Path, length: u64) {
    tracing::info!(
        event_type = events::TARGET_DOWNLOAD_SUCCESS,
        target = %path,
        destination = %destination.display(),
        length = length,
        "Target downloaded"
    );
}

pub fn log_target_download_failure(path: &str, error: &str) {
    tracing::error!(
        event_type = events::TARGET_DOWNLOAD_FAILURE,
        target = %path,
        error = %error,
        "Target download failed"
    );
}

pub fn log_target_removed(path: &str) {
    tracing::info!(
        event_type = events::TARGET_REMOVED,
        target = %path,
        "Obsolete target removed"
    );
}

pub fn log_mirrorlist_updated(version: u64, mirrors: usize) {
    tracing::info!(
        event_type = events::MIRRORLIST_UPDATED,
        version = version,
        mirrors = mirrors,
        "Mirror list updated"
    );
}

pub fn log_mirrorlist_rejected(url: &str, error: &str) {
    tracing::warn!(
        event_type = events::MIRRORLIST_REJECTED,
        url = %url,
        error = %error,
        "Mirror list rejected"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use tracing_subscriber::fmt::MakeWriter;

    #[derive(Clone)]
    struct StringWriter(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for StringWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for StringWriter {
        type Writer = StringWriter;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    fn with_captured_logs<F>(f: F) -> String
    where
        F: FnOnce(),
    {
        let buffer = Arc::new(Mutex::new(Vec::new()));
        let writer = StringWriter(buffer.clone());

        let subscriber = tracing_subscriber::fmt()
            .with_writer(writer)
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .finish();

        tracing::subscriber::with_default(subscriber, f);

        let output = buffer.lock().unwrap().clone();
        String::from_utf8(output).unwrap()
    }

    #[test]
    fn test_log_key_created() {
        let output = with_captured_logs(|| log_key_created("abc123", "ed25519"));

        assert!(output.contains(events::KEY_CREATED));
        assert!(output.contains("abc123"));
        assert!(output.contains("ed25519"));
    }

    #[test]
    fn test_log_verification_failure() {
        let output = with_captured_logs(|| {
            log_verification_failure("targets/role1", "threshold not met: 1 of 2")
        });

        assert!(output.contains(events::VERIFICATION_FAILURE));
        assert!(output.contains("targets/role1"));
        assert!(output.contains("threshold not met"));
    }

    #[test]
    fn test_log_target_download_success() {
        let output = with_captured_logs(|| {
            log_target_download_success("pkg/app.tar", Path::new("/tmp/dl/pkg/app.tar"), 42)
        });

        assert!(output.contains(events::TARGET_DOWNLOAD_SUCCESS));
        assert!(output.contains("pkg/app.tar"));
        assert!(output.contains("length=42"));
    }

    #[test]
    fn test_log_key_loaded_is_debug() {
        let output = with_captured_logs(|| log_key_loaded("k1", Path::new("/keys/k1.key")));
        assert!(output.contains("DEBUG"));
        assert!(output.contains(events::KEY_LOADED));
    }

    #[test]
    fn test_event_type_constants() {
        assert!(events::KEY_CREATED.starts_with("key."));
        assert!(events::METADATA_UPDATE_SUCCESS.starts_with("metadata."));
        assert!(events::TARGET_DOWNLOAD_FAILURE.starts_with("target."));
        assert!(events::MIRRORLIST_REJECTED.starts_with("mirrorlist."));
        assert!(events::VERIFICATION_SUCCESS.starts_with("verification."));
    }
}
