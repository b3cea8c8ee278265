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

pub mod client;
pub mod key;
pub mod metadata;
pub mod quickstart;

use std::path::PathBuf;

use anyhow::{bail, Context as _, Result};
use tufa::KeyStore;

use crate::cli::{Cli, Commands};
use crate::config::{ConfigLoader, TufaConfig};
use crate::input::InputSource;

/// Resolved settings shared by every command.
#[derive(Debug, Clone)]
pub struct Context {
    pub config: TufaConfig,
    pub keystore_dir: PathBuf,
    pub repository_dir: PathBuf,
}

impl Context {
    pub fn new(config: TufaConfig) -> Self {
        Self {
            keystore_dir: config.keystore.dir.clone(),
            repository_dir: config.repository.dir.clone(),
            config,
        }
    }

    /// Loads `tufa.toml` and applies command-line overrides.
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let config = ConfigLoader::new()
            .load_or_default(cli.config.as_deref())
            .context("failed to load configuration")?;
        let mut context = Self::new(config);
        if let Some(dir) = &cli.keystore {
            context.keystore_dir = dir.clone();
        }
        if let Some(dir) = &cli.repository {
            context.repository_dir = dir.clone();
        }
        Ok(context)
    }
}

pub fn run(cli: &Cli, input: &mut dyn InputSource) -> Result<()> {
    let context = Context::from_cli(cli)?;
    match &cli.command {
        Commands::Key(command) => key::run(&context, command, input),
        Commands::Metadata(command) => metadata::run(&context, command, input),
        Commands::Quickstart {
            project_path,
            output,
            mirrors,
            compress,
        } => quickstart::run(&context, project_path, output, mirrors, *compress, input).map(|_| ()),
        Commands::Client(command) => client::run(&context, command),
    }
}

/// Prompts for each key's password and loads it into `keystore`.
///
/// Keys that fail to load are reported and skipped; it is an error only
/// if none load.
pub(crate) fn load_keys(
    context: &Context,
    keystore: &KeyStore,
    keyids: &[String],
    input: &mut dyn InputSource,
) -> Result<Vec<String>> {
    let mut passwords = Vec::with_capacity(keyids.len());
    for keyid in keyids {
        let password = input
            .prompt_password(&format!("Password for key {}", short_keyid(keyid)))
            .context("failed to read password")?;
        passwords.push(password);
    }

    let loaded = keystore
        .load_keystore_from_keyfiles(&context.keystore_dir, keyids, &passwords)
        .with_context(|| format!("failed to load keys from {}", context.keystore_dir.display()))?;
    for keyid in keyids.iter().filter(|keyid| !loaded.contains(keyid)) {
        eprintln!("warning: could not load key {}", short_keyid(keyid));
    }
    if loaded.is_empty() && !keyids.is_empty() {
        bail!("none of the requested keys could be loaded");
    }
    Ok(loaded)
}

pub(crate) fn short_keyid(keyid: &str) -> &str {
    keyid.get(..8).unwrap_or(keyid)
}
