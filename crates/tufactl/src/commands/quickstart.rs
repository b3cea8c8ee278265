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

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context as _, Result};
use tufa::metadata::RoleName;
use tufa::repo::manage::{self, QuickstartOptions, QuickstartReport, RoleSetup};
use tufa::{KeyStore, Mirror};

use super::Context;
use crate::input::{prompt_new_password, prompt_u32, InputSource};

/// Builds a repository from `project_path` under `output`, prompting for
/// the key count, threshold and password of each role.
///
/// The mirrorlist role is set up only when mirror URLs are given.
pub fn run(
    context: &Context,
    project_path: &Path,
    output: &Path,
    mirror_urls: &[String],
    compress: bool,
    input: &mut dyn InputSource,
) -> Result<QuickstartReport> {
    let mut roles: Vec<RoleName> = RoleName::REQUIRED.to_vec();
    if !mirror_urls.is_empty() {
        roles.push(RoleName::Mirrorlist);
    }

    let mut setups = BTreeMap::new();
    for role in roles {
        let key_count = prompt_u32(input, &format!("Number of keys for the {role} role"), 1)?;
        let threshold = prompt_u32(input, &format!("Threshold for the {role} role"), 1)?;
        let password = prompt_new_password(input, &format!("Password for the {role} keys"))?;
        setups.insert(
            role,
            RoleSetup {
                key_count,
                threshold,
                password,
            },
        );
    }

    let mirrors = mirror_urls
        .iter()
        .enumerate()
        .map(|(i, url)| Mirror::new(format!("mirror{}", i + 1), url.as_str(), "metadata", "targets"))
        .collect();
    let options = QuickstartOptions {
        expiration_days: context.config.repository.expiration_days,
        roles: setups,
        mirrors,
        compress_release: compress,
    };

    let report = manage::build_repository(project_path, output, &KeyStore::new(), &options)
        .with_context(|| format!("quickstart into {} failed", output.display()))?;

    println!("Keystore:        {}", report.keystore_dir.display());
    println!("Repository:      {}", report.repository_dir.display());
    println!("Client metadata: {}", report.client_metadata_dir.display());
    for (role, keyids) in &report.keyids {
        println!("{role}: {}", keyids.join(", "));
    }
    Ok(report)
}
