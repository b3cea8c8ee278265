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

//! Role names and role records.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::keys::KeyId;
use super::paths::validate_path_pattern;
use super::FormatError;

/// A top-level or delegated role.
///
/// Delegated roles are written as slash-separated paths rooted at
/// `targets`, e.g. `targets/role1/subrole`. The parent of a delegated
/// role is its name with the last segment removed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum RoleName {
    Root,
    Targets,
    Release,
    Timestamp,
    Mirrorlist,
    Delegated(String),
}

impl RoleName {
    /// The roles every root metadata document must declare.
    pub const REQUIRED: [RoleName; 4] = [
        RoleName::Root,
        RoleName::Targets,
        RoleName::Release,
        RoleName::Timestamp,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            RoleName::Root => "root",
            RoleName::Targets => "targets",
            RoleName::Release => "release",
            RoleName::Timestamp => "timestamp",
            RoleName::Mirrorlist => "mirrorlist",
            RoleName::Delegated(name) => name,
        }
    }

    /// Builds the name of a role delegated by `parent`.
    pub fn delegated(parent: &RoleName, child: &str) -> Result<RoleName, FormatError> {
        if !parent.can_delegate() {
            return Err(FormatError::InvalidRoleName(format!(
                "{}/{}",
                parent.as_str(),
                child
            )));
        }
        format!("{}/{}", parent.as_str(), child).parse()
    }

    pub fn is_top_level(&self) -> bool {
        !matches!(self, RoleName::Delegated(_))
    }

    pub fn is_delegated(&self) -> bool {
        matches!(self, RoleName::Delegated(_))
    }

    /// Only the targets role and its delegations may delegate further.
    pub fn can_delegate(&self) -> bool {
        matches!(self, RoleName::Targets | RoleName::Delegated(_))
    }

    /// The delegating role, or `None` for top-level roles.
    pub fn parent(&self) -> Option<RoleName> {
        match self {
            RoleName::Delegated(name) => {
                let (parent, _) = name.rsplit_once('/')?;
                parent.parse().ok()
            }
            _ => None,
        }
    }

    /// All delegating roles from the immediate parent up to `targets`.
    pub fn ancestors(&self) -> Vec<RoleName> {
        let mut ancestors = Vec::new();
        let mut current = self.parent();
        while let Some(role) = current {
            current = role.parent();
            ancestors.push(role);
        }
        ancestors
    }

    /// True when `self` is delegated (directly or transitively) by `other`.
    pub fn is_descendant_of(&self, other: &RoleName) -> bool {
        match self {
            RoleName::Delegated(name) => name
                .strip_prefix(other.as_str())
                .map(|rest| rest.starts_with('/'))
                .unwrap_or(false),
            _ => false,
        }
    }

    /// The last segment of a delegated role's name.
    pub fn short_name(&self) -> &str {
        let name = self.as_str();
        name.rsplit_once('/').map(|(_, tail)| tail).unwrap_or(name)
    }

    /// Relative file name of this role's metadata document, e.g.
    /// `root.txt` or `targets/role1.txt`.
    pub fn metadata_filename(&self) -> String {
        format!("{}.txt", self.as_str())
    }
}

impl fmt::Display for RoleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RoleName {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "root" => Ok(RoleName::Root),
            "targets" => Ok(RoleName::Targets),
            "release" => Ok(RoleName::Release),
            "timestamp" => Ok(RoleName::Timestamp),
            "mirrorlist" => Ok(RoleName::Mirrorlist),
            _ => {
                let mut segments = s.split('/');
                if segments.next() != Some("targets") {
                    return Err(FormatError::InvalidRoleName(s.to_string()));
                }
                let mut count = 0;
                for segment in segments {
                    count += 1;
                    let bad_segment = segment.is_empty()
                        || segment == "."
                        || segment == ".."
                        || segment
                            .chars()
                            .any(|c| c.is_whitespace() || c.is_control() || c == '\\');
                    if bad_segment {
                        return Err(FormatError::InvalidRoleName(s.to_string()));
                    }
                }
                if count == 0 {
                    return Err(FormatError::InvalidRoleName(s.to_string()));
                }
                Ok(RoleName::Delegated(s.to_string()))
            }
        }
    }
}

impl TryFrom<String> for RoleName {
    type Error = FormatError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<RoleName> for String {
    fn from(role: RoleName) -> Self {
        role.as_str().to_string()
    }
}

/// Keys, threshold and (for delegations) permitted target paths of a role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleInfo {
    pub keyids: Vec<KeyId>,
    pub threshold: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paths: Option<Vec<String>>,
}

impl RoleInfo {
    pub fn new(keyids: Vec<KeyId>, threshold: u32) -> Self {
        Self {
            keyids,
            threshold,
            paths: None,
        }
    }

    pub fn with_paths(mut self, paths: Vec<String>) -> Self {
        self.paths = Some(paths);
        self
    }

    /// Checks `1 <= threshold <= |keyids|`, keyid uniqueness and path syntax.
    pub fn validate(&self, role: &RoleName) -> Result<(), FormatError> {
        let mut seen = BTreeSet::new();
        for keyid in &self.keyids {
            if !seen.insert(keyid.as_str()) {
                return Err(FormatError::DuplicateKeyId {
                    role: role.to_string(),
                    keyid: keyid.clone(),
                });
            }
        }

        if self.threshold == 0 || self.threshold as usize > seen.len() {
            return Err(FormatError::InvalidThreshold {
                role: role.to_string(),
                threshold: self.threshold,
                keys: seen.len(),
            });
        }

        if let Some(paths) = &self.paths {
            for path in paths {
                validate_path_pattern(path)?;
            }
        }
        Ok(())
    }
}
