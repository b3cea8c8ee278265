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


//! Metadata refresh: update order, rollback and freeze protection,
//! threshold checks and mirror failover.

use chrono::{Duration, Utc};
use tufa::metadata::RoleName;
use tufa::repo::{manage, read_metadata_file, sign_metadata};
use tufa::repo::{build_config_file, read_config_file, RoleKeys, CONFIG_FILE};
use tufa::{DownloadError, RefreshOrder, RepositoryError, UpdateState, VerificationError};

use crate::fixtures::{version_of, TestRepo, MIRROR1, MIRROR2, PASSWORD};

#[test]
fn test_initial_refresh_reaches_ready() {
    let repo = TestRepo::new();
    let mut client = repo.client();
    assert_eq!(client.state(), UpdateState::Start);

    client.refresh().unwrap();
    assert_eq!(client.state(), UpdateState::Ready);

    let paths: Vec<String> = client
        .all_targets()
        .unwrap()
        .into_iter()
        .map(|t| t.path)
        .collect();
    assert_eq!(paths, vec!["app.bin", "docs/readme.txt", "plugins/extra.bin"]);
}

#[test]
fn test_targets_require_refresh() {
    let repo = TestRepo::new();
    let client = repo.client();
    assert!(matches!(
        client.all_targets(),
        Err(RepositoryError::NotReady(UpdateState::Start))
    ));
}

#[test]
fn test_refresh_installs_new_metadata() {
    let repo = TestRepo::new();
    repo.write_target("app2.bin", b"second application");
    repo.publish();

    let mut client = repo.client();
    client.refresh().unwrap();
    assert_eq!(client.trusted_version(&RoleName::Targets), Some(2));
    assert_eq!(client.trusted_version(&RoleName::Timestamp), Some(2));
    assert_eq!(client.target("app2.bin").unwrap().length(), 18);

    assert_eq!(version_of(&repo.client_metadata("targets.txt")), 2);
    let previous = tufa::repo::read_metadata_file(
        &repo.report.client_metadata_dir.join("previous/targets.txt"),
    )
    .unwrap();
    assert_eq!(version_of(&previous), 1);
}

#[test]
fn test_legacy_order_refresh() {
    let repo = TestRepo::new();
    repo.write_target("app2.bin", b"second application");
    repo.publish();

    let mut client = repo.client_with_order(RefreshOrder::Legacy);
    client.refresh().unwrap();
    assert_eq!(client.state(), UpdateState::Ready);
    assert!(client.target("app2.bin").is_ok());
}

#[test]
fn test_compressed_release_is_preferred() {
    let repo = TestRepo::with_compressed_release();
    repo.write_target("app2.bin", b"second application");
    repo.publish();

    let mut client = repo.client();
    client.refresh().unwrap();
    assert!(repo
        .fetcher
        .requests()
        .iter()
        .any(|url| url.ends_with("/metadata/release.txt.gz")));
    assert_eq!(client.trusted_version(&RoleName::Release), Some(2));
    assert_eq!(version_of(&repo.client_metadata("release.txt")), 2);
}

#[test]
fn test_rollback_rejected() {
    let repo = TestRepo::new();
    let old_timestamp = repo.metadata_bytes("timestamp.txt");
    repo.publish();

    let mut client = repo.client();
    client.refresh().unwrap();

    repo.serve_metadata_everywhere("timestamp.txt", old_timestamp);
    let err = client.refresh().unwrap_err();
    assert!(
        matches!(
            err,
            RepositoryError::Security(VerificationError::Rollback {
                trusted: 2,
                received: 1,
                ..
            })
        ),
        "unexpected error: {err}"
    );
    assert_eq!(client.state(), UpdateState::Failed);
    assert!(matches!(
        client.all_targets(),
        Err(RepositoryError::NotReady(UpdateState::Failed))
    ));
    assert_eq!(version_of(&repo.client_metadata("timestamp.txt")), 2);
}

#[test]
fn test_expired_timestamp_rejected() {
    let repo = TestRepo::new();
    let keyids = repo.keyids(&RoleName::Timestamp);
    let expired = repo.forge_timestamp(Utc::now() - Duration::days(1), &keyids);
    repo.serve_metadata_everywhere("timestamp.txt", expired);

    let mut client = repo.client();
    let err = client.refresh().unwrap_err();
    assert!(matches!(
        err,
        RepositoryError::Security(VerificationError::Expired { .. })
    ));
    assert_eq!(version_of(&repo.client_metadata("timestamp.txt")), 1);
}

#[test]
fn test_timestamp_signed_by_unknown_key_rejected() {
    let repo = TestRepo::new();
    let rogue = repo.keystore.generate_key(PASSWORD).unwrap();
    let forged = repo.forge_timestamp(Utc::now() + Duration::days(1), &[rogue]);
    repo.serve_metadata_everywhere("timestamp.txt", forged);

    let mut client = repo.client();
    assert!(matches!(
        client.refresh(),
        Err(RepositoryError::Security(VerificationError::ThresholdNotMet { .. }))
    ));
}

#[test]
fn test_targets_not_matching_release_rejected() {
    let repo = TestRepo::new();
    repo.write_target("app2.bin", b"second application");
    repo.publish();

    let mut tampered = repo.metadata_bytes("targets.txt");
    let last = tampered.len() - 1;
    tampered[last] = b' ';
    repo.serve_metadata_everywhere("targets.txt", tampered);

    let mut client = repo.client();
    assert!(matches!(
        client.refresh(),
        Err(RepositoryError::Security(VerificationError::FileInfoMismatch { .. }))
    ));
    assert_eq!(client.state(), UpdateState::Failed);
    assert_eq!(version_of(&repo.client_metadata("targets.txt")), 1);
}

#[test]
fn test_refresh_fails_over_to_second_mirror() {
    let repo = TestRepo::new();
    repo.fetcher.take_offline(MIRROR1);

    let mut client = repo.client();
    client.refresh().unwrap();
    assert!(repo
        .fetcher
        .requests()
        .iter()
        .any(|url| url.starts_with(MIRROR2)));
}

#[test]
fn test_all_mirrors_offline() {
    let repo = TestRepo::new();
    repo.fetcher.take_offline(MIRROR1);
    repo.fetcher.take_offline(MIRROR2);

    let mut client = repo.client();
    match client.refresh() {
        Err(RepositoryError::Download(DownloadError::AllMirrorsFailed { attempts, .. })) => {
            assert_eq!(attempts.len(), 2);
        }
        other => panic!("expected AllMirrorsFailed, got {other:?}"),
    }
}

#[test]
fn test_root_rotation_requires_old_keys() {
    let repo = TestRepo::new();
    let new_root_key = repo.keystore.generate_key(PASSWORD).unwrap();

    let config_path = repo.repository_dir().join(CONFIG_FILE);
    let mut config = read_config_file(&config_path).unwrap();
    config
        .roles
        .insert(RoleName::Root, RoleKeys::new(vec![new_root_key.clone()], 1));
    build_config_file(repo.repository_dir(), &config).unwrap();

    // Signed only by the new key: the old root's threshold is not met.
    let root_path = manage::make_root_metadata(repo.repository_dir(), &repo.keystore).unwrap();
    repo.publish_release();
    let mut client = repo.client();
    assert!(matches!(
        client.refresh(),
        Err(RepositoryError::Security(VerificationError::ThresholdNotMet { .. }))
    ));
    assert_eq!(client.trusted_version(&RoleName::Root), Some(1));

    manage::sign_metadata_file(&root_path, &repo.keyids(&RoleName::Root), &repo.keystore).unwrap();
    repo.publish_release();
    client.refresh().unwrap();
    assert_eq!(client.trusted_version(&RoleName::Root), Some(2));
    assert_eq!(
        client.trust().roles().get_role_keyids(&RoleName::Root).unwrap(),
        vec![new_root_key]
    );
}

#[test]
fn test_root_signed_by_one_of_two_keys_rejected() {
    let repo = TestRepo::new();
    let installed = repo.report.client_metadata_dir.join("current/root.txt");
    let before = std::fs::read(&installed).unwrap();

    let root_path = manage::make_root_metadata(repo.repository_dir(), &repo.keystore).unwrap();
    let mut root = read_metadata_file(&root_path).unwrap();
    assert_eq!(version_of(&root), 2);
    root.signatures.clear();
    let first_key = repo.keyids(&RoleName::Root)[0].clone();
    sign_metadata(&mut root, &[first_key], &repo.keystore).unwrap();
    std::fs::write(&root_path, root.to_bytes().unwrap()).unwrap();
    repo.publish_release();

    let mut client = repo.client();
    assert!(matches!(
        client.refresh(),
        Err(RepositoryError::Security(VerificationError::ThresholdNotMet {
            valid: 1,
            required: 2,
            ..
        }))
    ));
    assert_eq!(client.state(), UpdateState::Failed);
    assert_eq!(client.trusted_version(&RoleName::Root), Some(1));
    assert_eq!(std::fs::read(&installed).unwrap(), before);
}
