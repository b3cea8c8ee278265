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


//! Encrypted key files written by quickstart.

use tufa::keystore::list_keyids;
use tufa::metadata::RoleName;
use tufa::repo::manage;
use tufa::{KeyError, KeyStore, RepoError};

use crate::fixtures::{TestRepo, PASSWORD};

#[test]
fn test_quickstart_keys_reload_from_disk() {
    let repo = TestRepo::new();
    let keystore_dir = &repo.report.keystore_dir;
    assert_eq!(list_keyids(keystore_dir).unwrap().len(), 6);

    let root_keys = repo.keyids(&RoleName::Root);
    let keystore = KeyStore::new();
    let loaded = keystore
        .load_keystore_from_keyfiles(
            keystore_dir,
            &root_keys,
            &[PASSWORD.to_string(), "wrong".to_string()],
        )
        .unwrap();
    assert_eq!(loaded, vec![root_keys[0].clone()]);
    assert!(!keystore.contains_key(&root_keys[1]));
}

#[test]
fn test_metadata_needs_loaded_keys() {
    let repo = TestRepo::new();
    let empty = KeyStore::new();
    assert!(matches!(
        manage::make_timestamp_metadata(repo.repository_dir(), &empty),
        Err(RepoError::InsufficientKeys { threshold: 1, available: 0, .. })
    ));

    let keystore = KeyStore::new();
    for keyid in repo.keyids(&RoleName::Timestamp) {
        keystore
            .load_keyfile(&repo.report.keystore_dir, &keyid, PASSWORD)
            .unwrap();
    }
    manage::make_timestamp_metadata(repo.repository_dir(), &keystore).unwrap();
}

#[test]
fn test_changed_password_applies_to_key_file() {
    let repo = TestRepo::new();
    let keyid = repo.keyids(&RoleName::Release).remove(0);
    let dir = &repo.report.keystore_dir;

    manage::change_password(&KeyStore::new(), dir, &keyid, PASSWORD, "rotated").unwrap();
    assert!(matches!(
        KeyStore::new().load_keyfile(dir, &keyid, PASSWORD),
        Err(KeyError::BadPassword(_))
    ));
    KeyStore::new().load_keyfile(dir, &keyid, "rotated").unwrap();
}
