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


//! Mirror list updates and per-mirror target confinement.

use tufa::metadata::RoleName;
use tufa::repo::{manage, read_metadata_file, sign_metadata};
use tufa::client::StoreError;
use tufa::{
    ClientConfig, Mirror, MirrorError, MirrorList, Repository, RepositoryError, VerificationError,
};

use crate::fixtures::{version_of, TestRepo, MIRROR1, MIRROR2};

const MIRROR3: &str = "http://docs-mirror.test";

fn three_mirrors() -> MirrorList {
    MirrorList::from_mirrors([
        Mirror::new("mirror1", MIRROR1, "metadata", "targets"),
        Mirror::new("mirror2", MIRROR2, "metadata", "targets"),
        Mirror::new("docs", MIRROR3, "metadata", "targets")
            .with_confined_target_paths(vec!["docs".to_string()]),
    ])
    .unwrap()
}

#[test]
fn test_update_mirrorlist_installs_signed_list() {
    let repo = TestRepo::new();
    repo.fetcher.serve(MIRROR3, repo.repository_dir());
    manage::make_mirrorlist_metadata(repo.repository_dir(), &repo.keystore, &three_mirrors())
        .unwrap();

    let mut client = repo.client();
    client
        .update_mirrorlist(&format!("{MIRROR1}/metadata/mirrorlist.txt"))
        .unwrap();
    assert_eq!(client.get_mirrors().len(), 3);
    assert_eq!(version_of(&repo.client_metadata("mirrorlist.txt")), 2);

    // A fresh client picks the new list up from disk.
    assert_eq!(repo.client().get_mirrors().len(), 3);
}

#[test]
fn test_confined_mirror_serves_only_its_paths() {
    let repo = TestRepo::new();
    repo.fetcher.serve(MIRROR3, repo.repository_dir());
    manage::make_mirrorlist_metadata(repo.repository_dir(), &repo.keystore, &three_mirrors())
        .unwrap();
    let mut client = repo.client();
    client
        .update_mirrorlist(&format!("{MIRROR1}/metadata/mirrorlist.txt"))
        .unwrap();
    client.refresh().unwrap();

    repo.fetcher.take_offline(MIRROR1);
    repo.fetcher.take_offline(MIRROR2);
    repo.fetcher.clear_requests();

    let readme = client.target("docs/readme.txt").unwrap();
    client.download_target(&readme, &repo.install_dir()).unwrap();

    let app = client.target("app.bin").unwrap();
    assert!(client.download_target(&app, &repo.install_dir()).is_err());
    assert!(!repo
        .fetcher
        .requests()
        .contains(&format!("{MIRROR3}/targets/app.bin")));
}

#[test]
fn test_mirrorlist_signed_by_wrong_role_rejected() {
    let repo = TestRepo::new();
    let path =
        manage::make_mirrorlist_metadata(repo.repository_dir(), &repo.keystore, &three_mirrors())
            .unwrap();
    let mut forged = read_metadata_file(&path).unwrap();
    forged.signatures.clear();
    sign_metadata(&mut forged, &repo.keyids(&RoleName::Targets), &repo.keystore).unwrap();
    let url = "http://evil.test/mirrorlist.txt";
    repo.fetcher.override_url(url, forged.to_bytes().unwrap());

    let installed = repo.report.client_metadata_dir.join("current/mirrorlist.txt");
    let before = std::fs::read(&installed).unwrap();

    let mut client = repo.client();
    assert!(matches!(
        client.update_mirrorlist(url),
        Err(RepositoryError::Security(_))
    ));
    assert_eq!(client.get_mirrors().len(), 2);
    assert_eq!(std::fs::read(&installed).unwrap(), before);
}

#[test]
fn test_older_mirrorlist_rejected() {
    let repo = TestRepo::new();
    let old = repo.metadata_bytes("mirrorlist.txt");
    manage::make_mirrorlist_metadata(repo.repository_dir(), &repo.keystore, &three_mirrors())
        .unwrap();
    let mut client = repo.client();
    client
        .update_mirrorlist(&format!("{MIRROR1}/metadata/mirrorlist.txt"))
        .unwrap();

    let url = "http://stale.test/mirrorlist.txt";
    repo.fetcher.override_url(url, old);
    assert!(client.update_mirrorlist(url).is_err());
    assert_eq!(client.get_mirrors().len(), 3);
}

#[test]
fn test_older_mirrorlist_rejected_without_installed_copy() {
    let repo = TestRepo::new();
    let old = repo.metadata_bytes("mirrorlist.txt");
    manage::make_mirrorlist_metadata(repo.repository_dir(), &repo.keystore, &three_mirrors())
        .unwrap();
    let mut client = repo.client();
    client
        .update_mirrorlist(&format!("{MIRROR1}/metadata/mirrorlist.txt"))
        .unwrap();
    assert_eq!(client.trusted_version(&RoleName::Mirrorlist), Some(2));

    // The in-memory trusted version still pins the floor.
    let installed = repo.report.client_metadata_dir.join("current/mirrorlist.txt");
    std::fs::remove_file(&installed).unwrap();

    let url = "http://stale.test/mirrorlist.txt";
    repo.fetcher.override_url(url, old);
    assert!(matches!(
        client.update_mirrorlist(url),
        Err(RepositoryError::Security(VerificationError::Rollback {
            trusted: 2,
            received: 1,
            ..
        }))
    ));
    assert_eq!(client.get_mirrors().len(), 3);
    assert!(!installed.exists());
}

#[test]
fn test_corrupt_installed_mirrorlist_is_an_error() {
    let repo = TestRepo::new();
    let old = repo.metadata_bytes("mirrorlist.txt");
    manage::make_mirrorlist_metadata(repo.repository_dir(), &repo.keystore, &three_mirrors())
        .unwrap();
    let mut client = repo.client();
    client
        .update_mirrorlist(&format!("{MIRROR1}/metadata/mirrorlist.txt"))
        .unwrap();

    let installed = repo.report.client_metadata_dir.join("current/mirrorlist.txt");
    std::fs::write(&installed, b"{ truncated").unwrap();

    let url = "http://stale.test/mirrorlist.txt";
    repo.fetcher.override_url(url, old);
    assert!(matches!(
        client.update_mirrorlist(url),
        Err(RepositoryError::Mirror(MirrorError::Store(StoreError::Malformed { .. })))
    ));
    assert_eq!(client.get_mirrors().len(), 3);
    assert_eq!(std::fs::read(&installed).unwrap(), b"{ truncated");
}

#[test]
fn test_repository_requires_mirrors() {
    let repo = TestRepo::new();
    let config = ClientConfig::builder().repository_dir(repo.client_dir()).build();
    assert!(matches!(
        Repository::with_fetcher(
            "test",
            config,
            MirrorList::new(),
            Box::new(repo.fetcher.clone())
        ),
        Err(RepositoryError::EmptyMirrorList)
    ));
}
