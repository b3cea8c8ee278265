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

//! `tufactl key ...`

use anyhow::{bail, Context as _, Result};
use tufa::repo::manage;
use tufa::KeyStore;

use super::Context;
use crate::cli::KeyCommands;
use crate::input::{prompt_new_password, InputSource};

pub fn run(context: &Context, command: &KeyCommands, input: &mut dyn InputSource) -> Result<()> {
    match command {
        KeyCommands::Generate { count } => {
            for keyid in generate(context, *count, input)? {
                println!("{keyid}");
            }
        }
        KeyCommands::List { format } => list(context, format)?,
        KeyCommands::ChangePassword { keyid } => change_password(context, keyid, input)?,
    }
    Ok(())
}

/// Generates `count` keys sharing one password.
pub fn generate(context: &Context, count: u32, input: &mut dyn InputSource) -> Result<Vec<String>> {
    if count == 0 {
        bail!("count must be at least 1");
    }
    let password = prompt_new_password(input, "Password for the new key(s)")?;
    let keystore = KeyStore::new();
    (0..count)
        .map(|_| {
            manage::generate_and_save_key(&keystore, &context.keystore_dir, &password)
                .context("failed to generate key")
        })
        .collect()
}

pub fn list(context: &Context, format: &str) -> Result<()> {
    let keyids = manage::list_keyids(&context.keystore_dir)?;
    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&keyids)?),
        "human" => {
            if keyids.is_empty() {
                println!("No keys in {}", context.keystore_dir.display());
            }
            for keyid in keyids {
                println!("{keyid}");
            }
        }
        other => bail!("unknown format '{other}' (expected human or json)"),
    }
    Ok(())
}

pub fn change_password(context: &Context, keyid: &str, input: &mut dyn InputSource) -> Result<()> {
    let old = input
        .prompt_password("Current password")
        .context("failed to read password")?;
    let new = prompt_new_password(input, "New password")?;
    manage::change_password(&KeyStore::new(), &context.keystore_dir, keyid, &old, &new)
        .with_context(|| format!("failed to change password of key {keyid}"))?;
    println!("Password changed for {keyid}");
    Ok(())
}
