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


//! Delegated targets roles.

use tufa::metadata::{RoleName, SignedMetadata};
use tufa::repo::manage::{self, DelegationRequest};
use tufa::repo::{sign_metadata, write_metadata_file, MetadataBuilder};
use tufa::{RepositoryError, VerificationError};

use crate::fixtures::{TestRepo, PASSWORD};

fn plugins_role() -> RoleName {
    RoleName::delegated(&RoleName::Targets, "plugins").unwrap()
}

fn delegate_plugins(repo: &TestRepo) -> DelegationRequest {
    let key = repo.keystore.generate_key(PASSWORD).unwrap();
    let request = DelegationRequest {
        parent: RoleName::Targets,
        name: "plugins".to_string(),
        keyids: vec![key],
        threshold: 1,
        paths: vec!["plugins".to_string()],
        parent_keyids: repo.keyids(&RoleName::Targets),
    };
    manage::make_delegation(repo.repository_dir(), &repo.keystore, &request).unwrap();
    repo.publish_release();
    request
}

#[test]
fn test_client_trusts_delegated_role() {
    let repo = TestRepo::new();
    let request = delegate_plugins(&repo);

    let mut client = repo.client();
    client.refresh().unwrap();
    assert_eq!(client.trusted_version(&plugins_role()), Some(1));
    assert_eq!(client.trusted_version(&RoleName::Targets), Some(2));
    assert!(repo
        .report
        .client_metadata_dir
        .join("current/targets/plugins.txt")
        .is_file());

    // Listed only by the delegated role once it is re-signed.
    repo.write_target("plugins/new.bin", b"new plugin");
    manage::make_delegation(repo.repository_dir(), &repo.keystore, &request).unwrap();
    repo.publish_release();
    client.refresh().unwrap();
    assert_eq!(client.target("plugins/new.bin").unwrap().role, plugins_role());
    assert_eq!(client.target("app.bin").unwrap().role, RoleName::Targets);
}

#[test]
fn test_delegated_role_outside_its_paths_rejected() {
    let repo = TestRepo::new();
    let request = delegate_plugins(&repo);

    // Lists every target, not just plugins/.
    let builder = MetadataBuilder::new(30);
    let overreaching = builder
        .build_targets(&repo.targets_dir(), None, 2, None)
        .unwrap();
    let mut signable = SignedMetadata::from_typed(overreaching).unwrap();
    sign_metadata(&mut signable, &request.keyids, &repo.keystore).unwrap();
    write_metadata_file(&signable, &repo.metadata_dir().join("targets/plugins.txt")).unwrap();
    repo.publish_release();

    let mut client = repo.client();
    assert!(matches!(
        client.refresh(),
        Err(RepositoryError::Security(
            VerificationError::DelegationOutOfScope { .. }
        ))
    ));
}

#[test]
fn test_delegated_role_signed_by_wrong_key_rejected() {
    let repo = TestRepo::new();
    delegate_plugins(&repo);

    let path = repo.metadata_dir().join("targets/plugins.txt");
    let mut signable = tufa::repo::read_metadata_file(&path).unwrap();
    signable.signatures.clear();
    sign_metadata(&mut signable, &repo.keyids(&RoleName::Targets), &repo.keystore).unwrap();
    write_metadata_file(&signable, &path).unwrap();
    repo.publish_release();

    let mut client = repo.client();
    assert!(matches!(
        client.refresh(),
        Err(RepositoryError::Security(VerificationError::ThresholdNotMet { .. }))
    ));
}

#[test]
fn test_delegation_paths_must_lie_within_parent() {
    let repo = TestRepo::new();
    delegate_plugins(&repo);

    let key = repo.keystore.generate_key(PASSWORD).unwrap();
    let nested = DelegationRequest {
        parent: plugins_role(),
        name: "docs".to_string(),
        keyids: vec![key.clone()],
        threshold: 1,
        paths: vec!["docs".to_string()],
        parent_keyids: vec![key],
    };
    assert!(matches!(
        manage::make_delegation(repo.repository_dir(), &repo.keystore, &nested),
        Err(tufa::RepoError::DelegationOutOfScope { .. })
    ));
}
