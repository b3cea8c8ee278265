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


//! Shared repository and mirror fixtures.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, SubsecRound, Utc};
use parking_lot::Mutex;
use tempfile::TempDir;
use tufa::crypto::KdfParams;
use tufa::metadata::{KeyId, RoleName, TimestampMetadata};
use tufa::repo::manage::{self, QuickstartOptions, QuickstartReport, RoleSetup};
use tufa::repo::{read_metadata_file, sign_metadata};
use tufa::{
    ClientConfig, DownloadError, Fetcher, KeyStore, Mirror, RefreshOrder, Repository,
    SignedMetadata,
};

pub const PASSWORD: &str = "secret";
pub const MIRROR1: &str = "http://mirror1.test";
pub const MIRROR2: &str = "http://mirror2.test";

#[derive(Default)]
struct FetcherState {
    roots: Vec<(String, PathBuf)>,
    overrides: HashMap<String, Vec<u8>>,
    offline: HashSet<String>,
    requests: Vec<String>,
}

/// Serves URL prefixes from local directories. Individual URLs can be
/// overridden and whole mirrors taken offline.
#[derive(Clone, Default)]
pub struct MapFetcher {
    state: Arc<Mutex<FetcherState>>,
}

impl MapFetcher {
    pub fn serve(&self, prefix: &str, dir: &Path) {
        self.state
            .lock()
            .roots
            .push((prefix.to_string(), dir.to_path_buf()));
    }

    pub fn override_url(&self, url: &str, bytes: Vec<u8>) {
        self.state.lock().overrides.insert(url.to_string(), bytes);
    }

    pub fn take_offline(&self, prefix: &str) {
        self.state.lock().offline.insert(prefix.to_string());
    }

    pub fn requests(&self) -> Vec<String> {
        self.state.lock().requests.clone()
    }

    pub fn clear_requests(&self) {
        self.state.lock().requests.clear();
    }
}

impl Fetcher for MapFetcher {
    fn fetch(&self, url: &str, max_length: u64) -> Result<Vec<u8>, DownloadError> {
        let mut state = self.state.lock();
        state.requests.push(url.to_string());

        if state.offline.iter().any(|prefix| url.starts_with(prefix.as_str())) {
            return Err(DownloadError::Connection {
                url: url.to_string(),
                reason: "mirror offline".to_string(),
            });
        }

        let not_found = || DownloadError::HttpStatus {
            url: url.to_string(),
            status: 404,
        };
        let bytes = match state.overrides.get(url) {
            Some(bytes) => bytes.clone(),
            None => {
                let (prefix, dir) = state
                    .roots
                    .iter()
                    .find(|(prefix, _)| url.starts_with(prefix.as_str()))
                    .ok_or_else(not_found)?;
                let relative = url[prefix.len()..].trim_start_matches('/');
                let decoded = urlencoding::decode(relative).map_err(|_| not_found())?;
                std::fs::read(dir.join(decoded.as_ref())).map_err(|_| not_found())?
            }
        };

        if bytes.len() as u64 > max_length {
            return Err(DownloadError::TooLarge {
                url: url.to_string(),
                limit: max_length,
            });
        }
        Ok(bytes)
    }
}

/// A repository built by quickstart, served by two mirrors, with a seeded
/// client.
pub struct TestRepo {
    pub dir: TempDir,
    pub keystore: KeyStore,
    pub report: QuickstartReport,
    pub fetcher: MapFetcher,
    pub compress_release: bool,
}

impl TestRepo {
    pub fn new() -> Self {
        Self::build(false)
    }

    pub fn with_compressed_release() -> Self {
        Self::build(true)
    }

    fn build(compress_release: bool) -> Self {
        let dir = TempDir::new().unwrap();
        let project = dir.path().join("project");
        std::fs::create_dir_all(project.join("docs")).unwrap();
        std::fs::create_dir_all(project.join("plugins")).unwrap();
        std::fs::write(project.join("app.bin"), b"application v1").unwrap();
        std::fs::write(project.join("docs/readme.txt"), b"read me").unwrap();
        std::fs::write(project.join("plugins/extra.bin"), b"plugin v1").unwrap();

        let setup = |key_count, threshold| RoleSetup {
            key_count,
            threshold,
            password: PASSWORD.to_string(),
        };
        let options = QuickstartOptions {
            expiration_days: 30,
            roles: BTreeMap::from([
                (RoleName::Root, setup(2, 2)),
                (RoleName::Targets, setup(1, 1)),
                (RoleName::Release, setup(1, 1)),
                (RoleName::Timestamp, setup(1, 1)),
                (RoleName::Mirrorlist, setup(1, 1)),
            ]),
            mirrors: vec![
                Mirror::new("mirror1", MIRROR1, "metadata", "targets"),
                Mirror::new("mirror2", MIRROR2, "metadata", "targets"),
            ],
            compress_release,
        };

        let keystore = KeyStore::with_kdf_params(KdfParams::insecure_fast());
        let report =
            manage::build_repository(&project, &dir.path().join("out"), &keystore, &options)
                .unwrap();

        let fetcher = MapFetcher::default();
        fetcher.serve(MIRROR1, &report.repository_dir);
        fetcher.serve(MIRROR2, &report.repository_dir);

        Self {
            dir,
            keystore,
            report,
            fetcher,
            compress_release,
        }
    }

    pub fn repository_dir(&self) -> &Path {
        &self.report.repository_dir
    }

    pub fn metadata_dir(&self) -> PathBuf {
        manage::metadata_dir(self.repository_dir())
    }

    pub fn targets_dir(&self) -> PathBuf {
        manage::targets_dir(self.repository_dir())
    }

    pub fn client_dir(&self) -> PathBuf {
        self.report
            .client_metadata_dir
            .parent()
            .unwrap()
            .to_path_buf()
    }

    /// Where the client installs targets.
    pub fn install_dir(&self) -> PathBuf {
        self.dir.path().join("installed")
    }

    pub fn keyids(&self, role: &RoleName) -> Vec<KeyId> {
        self.report.keyids[role].clone()
    }

    pub fn client(&self) -> Repository {
        self.client_with_order(RefreshOrder::Secure)
    }

    pub fn client_with_order(&self, order: RefreshOrder) -> Repository {
        let config = ClientConfig::builder()
            .repository_dir(self.client_dir())
            .refresh_order(order)
            .build();
        Repository::from_trusted_mirrorlist("test", config, Box::new(self.fetcher.clone()))
            .unwrap()
    }

    pub fn write_target(&self, path: &str, bytes: &[u8]) {
        let file = self.targets_dir().join(path);
        std::fs::create_dir_all(file.parent().unwrap()).unwrap();
        std::fs::write(file, bytes).unwrap();
    }

    /// Re-signs targets, release and timestamp after target changes.
    pub fn publish(&self) {
        manage::make_targets_metadata(self.repository_dir(), &self.keystore).unwrap();
        self.publish_release();
    }

    /// Re-signs release and timestamp.
    pub fn publish_release(&self) {
        manage::make_release_metadata(self.repository_dir(), &self.keystore, self.compress_release)
            .unwrap();
        manage::make_timestamp_metadata(self.repository_dir(), &self.keystore).unwrap();
    }

    pub fn metadata_bytes(&self, file: &str) -> Vec<u8> {
        std::fs::read(self.metadata_dir().join(file)).unwrap()
    }

    pub fn client_metadata(&self, file: &str) -> SignedMetadata {
        let path = self.report.client_metadata_dir.join("current").join(file);
        read_metadata_file(&path).unwrap()
    }

    /// A timestamp one version ahead of the published one, with the given
    /// expiry, signed by `keyids`.
    pub fn forge_timestamp(&self, expires: DateTime<Utc>, keyids: &[KeyId]) -> Vec<u8> {
        let current = read_metadata_file(&self.metadata_dir().join("timestamp.txt")).unwrap();
        let mut timestamp: TimestampMetadata = current.typed().unwrap();
        timestamp.version += 1;
        timestamp.expires = expires.trunc_subsecs(0);

        let mut signable = SignedMetadata::from_typed(timestamp).unwrap();
        sign_metadata(&mut signable, keyids, &self.keystore).unwrap();
        signable.to_bytes().unwrap()
    }

    /// Both mirrors serve `bytes` for the metadata file `file`.
    pub fn serve_metadata_everywhere(&self, file: &str, bytes: Vec<u8>) {
        for mirror in [MIRROR1, MIRROR2] {
            self.fetcher
                .override_url(&format!("{mirror}/metadata/{file}"), bytes.clone());
        }
    }
}

pub fn version_of(signable: &SignedMetadata) -> u64 {
    signable.payload().unwrap().version()
}
