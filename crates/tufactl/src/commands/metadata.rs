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

//! `tufactl metadata ...`
//!
//! Each command reads `config.toml` from the repository directory, asks for
//! the passwords of the keys it needs, and writes one metadata file.

use std::collections::BTreeSet;
use std::path::PathBuf;

use anyhow::{Context as _, Result};
use tufa::metadata::RoleName;
use tufa::repo::manage::{self, DelegationRequest};
use tufa::repo::{build_config_file, read_config_file, RepositoryConfig, RoleKeys, CONFIG_FILE};
use tufa::KeyStore;

use super::{load_keys, Context};
use crate::cli::MetadataCommands;
use crate::input::{prompt_list, prompt_string, prompt_u32, split_list, InputSource};

pub fn run(
    context: &Context,
    command: &MetadataCommands,
    input: &mut dyn InputSource,
) -> Result<()> {
    let path = match command {
        MetadataCommands::Config => write_config(context, input)?,
        MetadataCommands::Root => with_role_keys(context, &[RoleName::Root], input, |ks| {
            manage::make_root_metadata(&context.repository_dir, ks)
        })?,
        MetadataCommands::Targets => with_role_keys(context, &[RoleName::Targets], input, |ks| {
            manage::make_targets_metadata(&context.repository_dir, ks)
        })?,
        MetadataCommands::Release { compress } => {
            with_role_keys(context, &[RoleName::Release], input, |ks| {
                manage::make_release_metadata(&context.repository_dir, ks, *compress)
            })?
        }
        MetadataCommands::Timestamp => {
            with_role_keys(context, &[RoleName::Timestamp], input, |ks| {
                manage::make_timestamp_metadata(&context.repository_dir, ks)
            })?
        }
        MetadataCommands::Mirrorlist => {
            let mirrors = context.config.client.mirror_list()?;
            with_role_keys(context, &[RoleName::Mirrorlist], input, |ks| {
                manage::make_mirrorlist_metadata(&context.repository_dir, ks, &mirrors)
            })?
        }
        MetadataCommands::Sign { file, keys } => {
            let keystore = KeyStore::new();
            let loaded = load_keys(context, &keystore, keys, input)?;
            manage::sign_metadata_file(file, &loaded, &keystore)
                .with_context(|| format!("failed to sign {}", file.display()))?;
            file.clone()
        }
        MetadataCommands::Delegate {
            parent,
            name,
            paths,
            keys,
            threshold,
            parent_keys,
        } => {
            let request = DelegationRequest {
                parent: parent.parse().context("invalid parent role")?,
                name: name.clone(),
                keyids: keys.clone(),
                threshold: *threshold,
                paths: paths.clone(),
                parent_keyids: parent_keys.clone(),
            };
            delegate(context, &request, input)?
        }
    };
    println!("Wrote {}", path.display());
    Ok(())
}

/// Prompts for key ids and a threshold per role and writes `config.toml`.
pub fn write_config(context: &Context, input: &mut dyn InputSource) -> Result<PathBuf> {
    let mut config = RepositoryConfig::new(context.config.repository.expiration_days);
    for role in RoleName::REQUIRED.iter() {
        let keyids = prompt_list(input, &format!("Key ids for the {role} role"))?;
        let threshold = prompt_u32(input, &format!("Threshold for the {role} role"), 1)?;
        config.roles.insert(role.clone(), RoleKeys::new(keyids, threshold));
    }

    let mirrorlist = prompt_string(input, "Key ids for the mirrorlist role (blank to skip)", Some(""))?;
    if !mirrorlist.is_empty() {
        let keyids = split_list(&mirrorlist);
        let threshold = prompt_u32(input, "Threshold for the mirrorlist role", 1)?;
        config
            .roles
            .insert(RoleName::Mirrorlist, RoleKeys::new(keyids, threshold));
    }
    config.validate()?;

    std::fs::create_dir_all(&context.repository_dir)
        .with_context(|| format!("failed to create {}", context.repository_dir.display()))?;
    Ok(build_config_file(&context.repository_dir, &config)?)
}

/// Loads the configured keys of `roles`, then runs `make`.
///
/// Root metadata embeds every role's public keys, so `Root` loads the
/// keys of all configured roles.
fn with_role_keys<F>(
    context: &Context,
    roles: &[RoleName],
    input: &mut dyn InputSource,
    make: F,
) -> Result<PathBuf>
where
    F: FnOnce(&KeyStore) -> Result<PathBuf, tufa::RepoError>,
{
    let config = read_config_file(&context.repository_dir.join(CONFIG_FILE))?;
    let keyids = configured_keyids(&config, roles);

    let keystore = KeyStore::new();
    load_keys(context, &keystore, &keyids, input)?;
    Ok(make(&keystore)?)
}

fn configured_keyids(config: &RepositoryConfig, roles: &[RoleName]) -> Vec<String> {
    let all_roles = roles.contains(&RoleName::Root);
    let keyids: BTreeSet<&String> = config
        .roles
        .iter()
        .filter(|(role, _)| all_roles || roles.contains(role))
        .flat_map(|(_, keys)| &keys.keyids)
        .collect();
    keyids.into_iter().cloned().collect()
}

pub fn delegate(
    context: &Context,
    request: &DelegationRequest,
    input: &mut dyn InputSource,
) -> Result<PathBuf> {
    let keyids: BTreeSet<&String> = request
        .keyids
        .iter()
        .chain(&request.parent_keyids)
        .collect();
    let keyids: Vec<String> = keyids.into_iter().cloned().collect();

    let keystore = KeyStore::new();
    load_keys(context, &keystore, &keyids, input)?;
    manage::make_delegation(&context.repository_dir, &keystore, request)
        .with_context(|| format!("failed to delegate '{}' from '{}'", request.name, request.parent))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TufaConfig;
    use crate::input::ScriptedInput;
    use tempfile::TempDir;

    fn context(dir: &TempDir) -> Context {
        let mut context = Context::new(TufaConfig::default());
        context.keystore_dir = dir.path().join("keystore");
        context.repository_dir = dir.path().join("repository");
        context
    }

    fn generate(context: &Context, count: usize) -> Vec<String> {
        let keystore = KeyStore::new();
        (0..count)
            .map(|_| manage::generate_and_save_key(&keystore, &context.keystore_dir, "pw").unwrap())
            .collect()
    }

    #[test]
    fn test_write_config_prompts_per_role() {
        let dir = TempDir::new().unwrap();
        let context = context(&dir);
        let keys = generate(&context, 2);

        let mut input = ScriptedInput::new([
            format!("{}, {}", keys[0], keys[1]),
            "2".to_string(),
            keys[0].clone(),
            String::new(),
            keys[1].clone(),
            String::new(),
            keys[1].clone(),
            String::new(),
            String::new(),
        ]);
        let path = write_config(&context, &mut input).unwrap();
        assert_eq!(input.remaining(), 0);
        assert!(context.repository_dir.join(CONFIG_FILE).is_file());

        let config = read_config_file(&path).unwrap();
        assert_eq!(config.role(&RoleName::Root).unwrap().threshold, 2);
        assert_eq!(config.role(&RoleName::Targets).unwrap().threshold, 1);
        assert!(config.role(&RoleName::Mirrorlist).is_err());
    }

    #[test]
    fn test_configured_keyids_for_root_covers_all_roles() {
        let config = RepositoryConfig::new(30)
            .with_role(RoleName::Root, RoleKeys::new(vec!["a".into()], 1))
            .with_role(RoleName::Targets, RoleKeys::new(vec!["b".into(), "a".into()], 1))
            .with_role(RoleName::Timestamp, RoleKeys::new(vec!["c".into()], 1));

        assert_eq!(configured_keyids(&config, &[RoleName::Root]), vec!["a", "b", "c"]);
        assert_eq!(configured_keyids(&config, &[RoleName::Targets]), vec!["a", "b"]);
    }

    #[test]
    fn test_metadata_commands_build_signed_repository() {
        let dir = TempDir::new().unwrap();
        let context = context(&dir);
        let key = generate(&context, 1).remove(0);
        std::fs::create_dir_all(manage::targets_dir(&context.repository_dir)).unwrap();
        std::fs::write(manage::targets_dir(&context.repository_dir).join("app.bin"), b"v1").unwrap();

        let mut input = ScriptedInput::new([
            key.clone(), String::new(),
            key.clone(), String::new(),
            key.clone(), String::new(),
            key.clone(), String::new(),
            String::new(),
        ]);
        write_config(&context, &mut input).unwrap();

        for command in [
            MetadataCommands::Root,
            MetadataCommands::Targets,
            MetadataCommands::Release { compress: false },
            MetadataCommands::Timestamp,
        ] {
            let mut input = ScriptedInput::new(["pw"]);
            run(&context, &command, &mut input).unwrap();
        }

        let metadata = manage::metadata_dir(&context.repository_dir);
        for file in ["root.txt", "targets.txt", "release.txt", "timestamp.txt"] {
            assert!(metadata.join(file).is_file(), "{file} missing");
        }
    }

    #[test]
    fn test_wrong_password_fails() {
        let dir = TempDir::new().unwrap();
        let context = context(&dir);
        let key = generate(&context, 1).remove(0);
        let mut input = ScriptedInput::new([
            key.clone(), String::new(),
            key.clone(), String::new(),
            key.clone(), String::new(),
            key.clone(), String::new(),
            String::new(),
        ]);
        write_config(&context, &mut input).unwrap();

        let mut input = ScriptedInput::new(["nope"]);
        assert!(run(&context, &MetadataCommands::Timestamp, &mut input).is_err());
    }
}
