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

//! Typed `signed` payloads for each metadata document.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::fileinfo::FileInfo;
use super::keys::{KeyId, PublicKey};
use super::role::{RoleInfo, RoleName};
use super::FormatError;
use crate::mirrors::Mirror;

/// The `_type` discriminator of a payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataType {
    Root,
    Targets,
    Release,
    Timestamp,
    Mirrors,
}

impl MetadataType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetadataType::Root => "Root",
            MetadataType::Targets => "Targets",
            MetadataType::Release => "Release",
            MetadataType::Timestamp => "Timestamp",
            MetadataType::Mirrors => "Mirrors",
        }
    }

    /// The document type a role signs. Delegated roles sign targets.
    pub fn for_role(role: &RoleName) -> Self {
        match role {
            RoleName::Root => MetadataType::Root,
            RoleName::Targets | RoleName::Delegated(_) => MetadataType::Targets,
            RoleName::Release => MetadataType::Release,
            RoleName::Timestamp => MetadataType::Timestamp,
            RoleName::Mirrorlist => MetadataType::Mirrors,
        }
    }
}

impl fmt::Display for MetadataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RootMetadata {
    pub version: u64,
    pub expires: DateTime<Utc>,
    pub keys: BTreeMap<KeyId, PublicKey>,
    pub roles: BTreeMap<RoleName, RoleInfo>,
}

/// Keys and roles a targets document hands authority to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delegations {
    pub keys: BTreeMap<KeyId, PublicKey>,
    pub roles: BTreeMap<RoleName, RoleInfo>,
}

impl Delegations {
    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetsMetadata {
    pub version: u64,
    pub expires: DateTime<Utc>,
    pub targets: BTreeMap<String, FileInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delegations: Option<Delegations>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseMetadata {
    pub version: u64,
    pub expires: DateTime<Utc>,
    pub meta: BTreeMap<String, FileInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimestampMetadata {
    pub version: u64,
    pub expires: DateTime<Utc>,
    pub meta: BTreeMap<String, FileInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MirrorsMetadata {
    pub version: u64,
    pub expires: DateTime<Utc>,
    pub mirrors: Vec<Mirror>,
}

/// Any `signed` payload, discriminated by `_type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "_type")]
pub enum Payload {
    Root(RootMetadata),
    Targets(TargetsMetadata),
    Release(ReleaseMetadata),
    Timestamp(TimestampMetadata),
    Mirrors(MirrorsMetadata),
}

impl Payload {
    pub fn metadata_type(&self) -> MetadataType {
        match self {
            Payload::Root(_) => MetadataType::Root,
            Payload::Targets(_) => MetadataType::Targets,
            Payload::Release(_) => MetadataType::Release,
            Payload::Timestamp(_) => MetadataType::Timestamp,
            Payload::Mirrors(_) => MetadataType::Mirrors,
        }
    }

    pub fn version(&self) -> u64 {
        match self {
            Payload::Root(m) => m.version,
            Payload::Targets(m) => m.version,
            Payload::Release(m) => m.version,
            Payload::Timestamp(m) => m.version,
            Payload::Mirrors(m) => m.version,
        }
    }

    pub fn expires(&self) -> DateTime<Utc> {
        match self {
            Payload::Root(m) => m.expires,
            Payload::Targets(m) => m.expires,
            Payload::Release(m) => m.expires,
            Payload::Timestamp(m) => m.expires,
            Payload::Mirrors(m) => m.expires,
        }
    }

    /// Structural checks beyond what deserialization enforces.
    pub fn validate(&self) -> Result<(), FormatError> {
        match self {
            Payload::Root(root) => {
                for required in RoleName::REQUIRED.iter() {
                    if !root.roles.contains_key(required) {
                        return Err(FormatError::MissingRole(required.to_string()));
                    }
                }
                for (role, info) in &root.roles {
                    if role.is_delegated() {
                        return Err(FormatError::InvalidRoleName(role.to_string()));
                    }
                    info.validate(role)?;
                }
                Ok(())
            }
            Payload::Targets(targets) => {
                for path in targets.targets.keys() {
                    super::paths::validate_target_path(path)?;
                }
                if let Some(delegations) = &targets.delegations {
                    for (role, info) in &delegations.roles {
                        if role.is_top_level() {
                            return Err(FormatError::InvalidRoleName(role.to_string()));
                        }
                        info.validate(role)?;
                    }
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }
}

/// Conversion between a payload variant and its concrete struct.
pub trait TypedPayload: Sized {
    const TYPE: MetadataType;

    fn from_payload(payload: Payload) -> Result<Self, FormatError>;

    fn into_payload(self) -> Payload;
}

macro_rules! typed_payload {
    ($ty:ty, $variant:ident) => {
        impl TypedPayload for $ty {
            const TYPE: MetadataType = MetadataType::$variant;

            fn from_payload(payload: Payload) -> Result<Self, FormatError> {
                match payload {
                    Payload::$variant(inner) => Ok(inner),
                    other => Err(FormatError::WrongMetadataType {
                        expected: Self::TYPE.as_str(),
                        found: other.metadata_type().as_str(),
                    }),
                }
            }

            fn into_payload(self) -> Payload {
                Payload::$variant(self)
            }
        }
    };
}

typed_payload!(RootMetadata, Root);
typed_payload!(TargetsMetadata, Targets);
typed_payload!(ReleaseMetadata, Release);
typed_payload!(TimestampMetadata, Timestamp);
typed_payload!(MirrorsMetadata, Mirrors);
