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


//! Target downloads against trusted metadata.

use tufa::{DownloadError, RepositoryError};

use crate::fixtures::{TestRepo, MIRROR1, MIRROR2};

#[test]
fn test_download_all_targets() {
    let repo = TestRepo::new();
    let mut client = repo.client();
    client.refresh().unwrap();

    let install = repo.install_dir();
    for target in client.all_targets().unwrap() {
        let written = client.download_target(&target, &install).unwrap();
        assert_eq!(written, install.join(&target.path));
    }
    assert_eq!(
        std::fs::read(install.join("docs/readme.txt")).unwrap(),
        b"read me"
    );
    assert_eq!(
        std::fs::read(install.join("plugins/extra.bin")).unwrap(),
        b"plugin v1"
    );
}

#[test]
fn test_tampered_target_rejected_everywhere() {
    let repo = TestRepo::new();
    for mirror in [MIRROR1, MIRROR2] {
        repo.fetcher
            .override_url(&format!("{mirror}/targets/app.bin"), b"application v9".to_vec());
    }
    let mut client = repo.client();
    client.refresh().unwrap();

    let target = client.target("app.bin").unwrap();
    match client.download_target(&target, &repo.install_dir()) {
        Err(RepositoryError::Download(DownloadError::AllMirrorsFailed { attempts, .. })) => {
            assert_eq!(attempts.len(), 2);
        }
        other => panic!("expected AllMirrorsFailed, got {other:?}"),
    }
    assert!(!repo.install_dir().join("app.bin").exists());
}

#[test]
fn test_download_skips_bad_mirror() {
    let repo = TestRepo::new();
    repo.fetcher
        .override_url(&format!("{MIRROR1}/targets/app.bin"), b"application v9".to_vec());
    let mut client = repo.client();
    client.refresh().unwrap();
    repo.fetcher.clear_requests();

    let target = client.target("app.bin").unwrap();
    client.download_target(&target, &repo.install_dir()).unwrap();
    assert_eq!(
        std::fs::read(repo.install_dir().join("app.bin")).unwrap(),
        b"application v1"
    );
    assert_eq!(
        repo.fetcher.requests(),
        vec![
            format!("{MIRROR1}/targets/app.bin"),
            format!("{MIRROR2}/targets/app.bin"),
        ]
    );
}

#[test]
fn test_oversized_target_not_read_past_length() {
    let repo = TestRepo::new();
    for mirror in [MIRROR1, MIRROR2] {
        repo.fetcher.override_url(
            &format!("{mirror}/targets/app.bin"),
            b"application v1 with trailing data".to_vec(),
        );
    }
    let mut client = repo.client();
    client.refresh().unwrap();

    let target = client.target("app.bin").unwrap();
    assert!(matches!(
        client.download_target(&target, &repo.install_dir()),
        Err(RepositoryError::Download(DownloadError::AllMirrorsFailed { .. }))
    ));
}

#[test]
fn test_updated_targets_compares_local_copies() {
    let repo = TestRepo::new();
    let mut client = repo.client();
    client.refresh().unwrap();
    let install = repo.install_dir();

    let targets = client.all_targets().unwrap();
    assert_eq!(client.updated_targets(&targets, &install).unwrap().len(), 3);

    for target in &targets {
        client.download_target(target, &install).unwrap();
    }
    assert!(client.updated_targets(&targets, &install).unwrap().is_empty());

    std::fs::write(install.join("app.bin"), b"locally modified").unwrap();
    let updated = client.updated_targets(&targets, &install).unwrap();
    assert_eq!(updated.len(), 1);
    assert_eq!(updated[0].path, "app.bin");
}

#[test]
fn test_directory_in_place_of_target_counts_as_updated() {
    let repo = TestRepo::new();
    let mut client = repo.client();
    client.refresh().unwrap();
    let install = repo.install_dir();
    std::fs::create_dir_all(install.join("app.bin")).unwrap();

    let app = client.target("app.bin").unwrap();
    let updated = client.updated_targets(&[app], &install).unwrap();
    assert_eq!(updated.len(), 1);
    assert_eq!(updated[0].path, "app.bin");
}

#[test]
fn test_remove_obsolete_targets() {
    let repo = TestRepo::new();
    let mut client = repo.client();
    client.refresh().unwrap();
    let install = repo.install_dir();
    for target in client.all_targets().unwrap() {
        client.download_target(&target, &install).unwrap();
    }
    std::fs::create_dir_all(install.join("docs/old")).unwrap();
    std::fs::write(install.join("docs/old/notes.txt"), b"stale").unwrap();
    std::fs::write(install.join("leftover.bin"), b"stale").unwrap();

    let removed = client.remove_obsolete_targets(&install).unwrap();
    assert_eq!(removed, vec!["docs/old/notes.txt", "leftover.bin"]);
    assert!(install.join("app.bin").is_file());
    assert!(!install.join("leftover.bin").exists());
}

#[test]
fn test_unknown_and_invalid_target_paths() {
    let repo = TestRepo::new();
    let mut client = repo.client();
    client.refresh().unwrap();

    assert!(matches!(
        client.target("missing.bin"),
        Err(RepositoryError::UnknownTarget(_))
    ));
    assert!(client.target("../app.bin").is_err());
    assert!(client.target("/etc/passwd").is_err());
}
