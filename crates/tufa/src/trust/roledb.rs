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

//! Registry of trusted roles.

use std::collections::BTreeMap;

use super::VerificationError;
use crate::metadata::{KeyId, RoleInfo, RoleName, RootMetadata};

/// Role name to role record. A delegated role is only present while its
/// parent is.
#[derive(Debug, Clone, Default)]
pub struct RoleDb {
    roles: BTreeMap<RoleName, RoleInfo>,
}

impl RoleDb {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the top-level roles declared by a root document.
    pub fn from_root_metadata(root: &RootMetadata) -> Result<Self, VerificationError> {
        let mut db = Self::new();
        for required in RoleName::REQUIRED.iter() {
            if !root.roles.contains_key(required) {
                return Err(VerificationError::UnknownRole(required.to_string()));
            }
        }
        for (role, info) in &root.roles {
            if role.is_delegated() {
                return Err(VerificationError::DelegationOutOfScope {
                    role: role.to_string(),
                    reason: "root may only declare top-level roles".to_string(),
                });
            }
            db.add_role(role.clone(), info.clone())?;
        }
        Ok(db)
    }

    /// Registers a role.
    ///
    /// # Errors
    ///
    /// `RoleAlreadyExists` for a duplicate name, `MissingParentRole` for a
    /// delegated role whose parent is not registered, `Format` for an
    /// invalid threshold or path list.
    pub fn add_role(&mut self, role: RoleName, info: RoleInfo) -> Result<(), VerificationError> {
        info.validate(&role)?;
        if self.roles.contains_key(&role) {
            return Err(VerificationError::RoleAlreadyExists(role.to_string()));
        }
        if let Some(parent) = role.parent() {
            if !self.roles.contains_key(&parent) {
                return Err(VerificationError::MissingParentRole {
                    role: role.to_string(),
                    parent: parent.to_string(),
                });
            }
        }
        self.roles.insert(role, info);
        Ok(())
    }

    /// Removes a role and every role delegated beneath it.
    pub fn remove_role(&mut self, role: &RoleName) -> Result<Vec<RoleName>, VerificationError> {
        if self.roles.remove(role).is_none() {
            return Err(VerificationError::UnknownRole(role.to_string()));
        }
        let mut removed = vec![role.clone()];
        removed.extend(self.remove_delegated_roles(role));
        Ok(removed)
    }

    /// Removes every role delegated (transitively) by `role`, keeping `role`.
    pub fn remove_delegated_roles(&mut self, role: &RoleName) -> Vec<RoleName> {
        let descendants = self.get_delegated_rolenames(role);
        for name in &descendants {
            self.roles.remove(name);
        }
        descendants
    }

    pub fn role_exists(&self, role: &RoleName) -> bool {
        self.roles.contains_key(role)
    }

    pub fn get(&self, role: &RoleName) -> Option<&RoleInfo> {
        self.roles.get(role)
    }

    pub fn get_role_keyids(&self, role: &RoleName) -> Result<&[KeyId], VerificationError> {
        self.require(role).map(|info| info.keyids.as_slice())
    }

    pub fn get_role_threshold(&self, role: &RoleName) -> Result<u32, VerificationError> {
        self.require(role).map(|info| info.threshold)
    }

    /// Permitted target paths of a role; `None` means unrestricted.
    pub fn get_role_paths(&self, role: &RoleName) -> Result<Option<&[String]>, VerificationError> {
        self.require(role).map(|info| info.paths.as_deref())
    }

    /// Every role delegated (transitively) by `role`, in name order.
    pub fn get_delegated_rolenames(&self, role: &RoleName) -> Vec<RoleName> {
        self.roles
            .keys()
            .filter(|name| name.is_descendant_of(role))
            .cloned()
            .collect()
    }

    pub fn get_parent_rolename(&self, role: &RoleName) -> Option<RoleName> {
        role.parent()
    }

    pub fn get_all_parent_roles(&self, role: &RoleName) -> Vec<RoleName> {
        role.ancestors()
    }

    pub fn rolenames(&self) -> impl Iterator<Item = &RoleName> {
        self.roles.keys()
    }

    /// All keyids referenced by any role.
    pub fn referenced_keyids(&self) -> impl Iterator<Item = &KeyId> {
        self.roles.values().flat_map(|info| info.keyids.iter())
    }

    pub fn len(&self) -> usize {
        self.roles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }

    fn require(&self, role: &RoleName) -> Result<&RoleInfo, VerificationError> {
        self.roles
            .get(role)
            .ok_or_else(|| VerificationError::UnknownRole(role.to_string()))
    }
}
