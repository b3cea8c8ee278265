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

//! Trusted keys and roles.
//!
//! This module provides:
//! - [`RoleDb`] and [`KeyDb`], the registries of trusted roles and keys
//! - [`TrustStore`], which pairs them and is rebuilt from each trusted root
//! - [`VerificationError`] and the threshold, version and expiry checks
//!
//! A `TrustStore` is owned by one client repository. Rebuilding from a new
//! root constructs a fresh store and swaps it in, so a failed rebuild
//! leaves the previous trust untouched.

mod keydb;
mod roledb;
mod verification;

pub use keydb::KeyDb;
pub use roledb::RoleDb;
pub use verification::{
    check_expiry, check_version, verify_signatures, VerificationError, VerificationReport,
};

use std::collections::BTreeSet;

use crate::metadata::{paths, RoleName, RootMetadata, SignedMetadata, TargetsMetadata};

#[derive(Debug, Clone, Default)]
pub struct TrustStore {
    roles: RoleDb,
    keys: KeyDb,
}

impl TrustStore {
    /// Builds trust from a root document's keys and roles.
    pub fn from_root_metadata(root: &RootMetadata) -> Result<Self, VerificationError> {
        let keys = KeyDb::from_keys(&root.keys)?;
        let roles = RoleDb::from_root_metadata(root)?;
        Ok(Self { roles, keys })
    }

    /// Replaces all trust with that of `root`. On error nothing changes.
    pub fn rebuild_from_root(&mut self, root: &RootMetadata) -> Result<(), VerificationError> {
        *self = Self::from_root_metadata(root)?;
        Ok(())
    }

    pub fn roles(&self) -> &RoleDb {
        &self.roles
    }

    pub fn keys(&self) -> &KeyDb {
        &self.keys
    }

    pub fn verify(
        &self,
        signable: &SignedMetadata,
        role: &RoleName,
    ) -> Result<VerificationReport, VerificationError> {
        verify_signatures(&self.roles, &self.keys, signable, role)
    }

    /// Registers the delegations declared by `parent`'s targets document.
    ///
    /// Roles previously delegated beneath `parent` are replaced; roles in
    /// other branches are left alone. Every new role must be a direct child
    /// of `parent`, and its paths must lie within `parent`'s paths. Nothing
    /// is applied unless the whole block is valid.
    pub fn import_delegations(
        &mut self,
        parent: &RoleName,
        targets: &TargetsMetadata,
    ) -> Result<usize, VerificationError> {
        let parent_paths = self.roles.get_role_paths(parent)?.map(<[String]>::to_vec);

        let mut staged = self.clone();
        staged.roles.remove_delegated_roles(parent);

        let Some(delegations) = &targets.delegations else {
            staged.prune_unreferenced_keys();
            *self = staged;
            return Ok(0);
        };

        for (keyid, key) in &delegations.keys {
            staged.keys.add_key(keyid, key.clone())?;
        }

        for (role, info) in &delegations.roles {
            if role.parent().as_ref() != Some(parent) {
                return Err(VerificationError::DelegationOutOfScope {
                    role: role.to_string(),
                    reason: format!("not a direct delegation of '{parent}'"),
                });
            }
            let role_paths = info.paths.as_deref().unwrap_or(&[]);
            if !paths::patterns_within(role_paths, parent_paths.as_deref()) {
                return Err(VerificationError::DelegationOutOfScope {
                    role: role.to_string(),
                    reason: format!("paths {role_paths:?} exceed those of '{parent}'"),
                });
            }
            for keyid in &info.keyids {
                if !staged.keys.contains(keyid) {
                    return Err(VerificationError::DelegationOutOfScope {
                        role: role.to_string(),
                        reason: format!("key {keyid} is not declared in the delegation"),
                    });
                }
            }
            // A delegation without paths may sign for nothing.
            let mut info = info.clone();
            info.paths.get_or_insert_with(Vec::new);
            staged.roles.add_role(role.clone(), info)?;
        }

        staged.prune_unreferenced_keys();
        let count = delegations.roles.len();
        *self = staged;
        Ok(count)
    }

    fn prune_unreferenced_keys(&mut self) {
        let referenced: BTreeSet<_> = self.roles.referenced_keyids().collect();
        self.keys.retain_referenced(&referenced);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keystore::Key;
    use crate::metadata::{Delegations, RoleInfo};
    use chrono::{Duration, Utc};
    use std::collections::BTreeMap;

    fn root_with(key: &Key) -> RootMetadata {
        let keyid = key.keyid().to_string();
        let roles = [
            RoleName::Root,
            RoleName::Targets,
            RoleName::Release,
            RoleName::Timestamp,
        ]
        .into_iter()
        .map(|role| (role, RoleInfo::new(vec![keyid.clone()], 1)))
        .collect();
        RootMetadata {
            version: 1,
            expires: Utc::now() + Duration::days(1),
            keys: BTreeMap::from([(keyid, key.public_key())]),
            roles,
        }
    }

    fn targets_delegating(role: &str, key: &Key, paths: Vec<String>) -> TargetsMetadata {
        TargetsMetadata {
            version: 1,
            expires: Utc::now() + Duration::days(1),
            targets: BTreeMap::new(),
            delegations: Some(Delegations {
                keys: BTreeMap::from([(key.keyid().to_string(), key.public_key())]),
                roles: BTreeMap::from([(
                    role.parse().unwrap(),
                    RoleInfo::new(vec![key.keyid().to_string()], 1).with_paths(paths),
                )]),
            }),
        }
    }

    #[test]
    fn test_root_with_mismatched_keyid_rejected() {
        let key = Key::generate().unwrap();
        let mut root = root_with(&key);
        let public = root.keys.remove(key.keyid()).unwrap();
        root.keys.insert("0".repeat(64), public);

        assert!(matches!(
            TrustStore::from_root_metadata(&root),
            Err(VerificationError::KeyIdMismatch { .. })
        ));
    }

    #[test]
    fn test_import_delegations() {
        let root_key = Key::generate().unwrap();
        let delegate = Key::generate().unwrap();
        let mut trust = TrustStore::from_root_metadata(&root_with(&root_key)).unwrap();

        let targets = targets_delegating("targets/role1", &delegate, vec!["role1".into()]);
        assert_eq!(trust.import_delegations(&RoleName::Targets, &targets).unwrap(), 1);

        let role1: RoleName = "targets/role1".parse().unwrap();
        assert!(trust.roles().role_exists(&role1));
        assert!(trust.keys().contains(delegate.keyid()));
    }

    #[test]
    fn test_reimport_replaces_previous_delegations() {
        let root_key = Key::generate().unwrap();
        let old = Key::generate().unwrap();
        let new = Key::generate().unwrap();
        let mut trust = TrustStore::from_root_metadata(&root_with(&root_key)).unwrap();

        trust
            .import_delegations(
                &RoleName::Targets,
                &targets_delegating("targets/old", &old, vec!["old".into()]),
            )
            .unwrap();
        trust
            .import_delegations(
                &RoleName::Targets,
                &targets_delegating("targets/new", &new, vec!["new".into()]),
            )
            .unwrap();

        assert!(!trust.roles().role_exists(&"targets/old".parse().unwrap()));
        assert!(!trust.keys().contains(old.keyid()));
        assert!(trust.keys().contains(new.keyid()));
    }

    #[test]
    fn test_nested_delegation_must_stay_within_parent_paths() {
        let root_key = Key::generate().unwrap();
        let delegate = Key::generate().unwrap();
        let mut trust = TrustStore::from_root_metadata(&root_with(&root_key)).unwrap();
        trust
            .import_delegations(
                &RoleName::Targets,
                &targets_delegating("targets/role1", &delegate, vec!["role1".into()]),
            )
            .unwrap();

        let role1: RoleName = "targets/role1".parse().unwrap();
        let escaping = targets_delegating("targets/role1/sub", &delegate, vec!["role2".into()]);
        let err = trust.import_delegations(&role1, &escaping).unwrap_err();
        assert!(matches!(err, VerificationError::DelegationOutOfScope { .. }));
        assert!(!trust.roles().role_exists(&"targets/role1/sub".parse().unwrap()));

        let inside = targets_delegating("targets/role1/sub", &delegate, vec!["role1/sub".into()]);
        assert_eq!(trust.import_delegations(&role1, &inside).unwrap(), 1);
    }

    #[test]
    fn test_delegation_must_be_direct_child() {
        let root_key = Key::generate().unwrap();
        let delegate = Key::generate().unwrap();
        let mut trust = TrustStore::from_root_metadata(&root_with(&root_key)).unwrap();

        let grandchild = targets_delegating("targets/a/b", &delegate, vec!["a".into()]);
        assert!(matches!(
            trust.import_delegations(&RoleName::Targets, &grandchild),
            Err(VerificationError::DelegationOutOfScope { .. })
        ));
    }
}
