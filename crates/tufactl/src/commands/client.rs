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

//! `tufactl client ...`

use anyhow::{Context as _, Result};
use tufa::metadata::RoleName;
use tufa::{HttpFetcher, Repository};

use super::Context;
use crate::cli::ClientCommands;

/// What `client update` changed in the targets directory.
#[derive(Debug, Default)]
pub struct UpdateSummary {
    pub downloaded: Vec<String>,
    pub removed: Vec<String>,
}

pub fn run(context: &Context, command: &ClientCommands) -> Result<()> {
    match command {
        ClientCommands::Refresh => {
            let repository = refresh(context)?;
            for role in [
                RoleName::Root,
                RoleName::Timestamp,
                RoleName::Release,
                RoleName::Targets,
            ] {
                if let Some(version) = repository.trusted_version(&role) {
                    println!("{role}: version {version}");
                }
            }
            println!("{}: {}", repository.name(), repository.state());
        }
        ClientCommands::Update { target } => {
            let summary = update(context, target.as_deref())?;
            for path in &summary.downloaded {
                println!("downloaded {path}");
            }
            for path in &summary.removed {
                println!("removed {path}");
            }
            if summary.downloaded.is_empty() && summary.removed.is_empty() {
                println!("Targets are up to date");
            }
        }
        ClientCommands::Mirrors => {
            let repository = open_repository(context)?;
            for mirror in repository.get_mirrors().mirrors() {
                println!("{}\t{}", mirror.name, mirror.url_prefix);
            }
        }
        ClientCommands::UpdateMirrorlist { url } => {
            let mut repository = open_repository(context)?;
            repository
                .update_mirrorlist(url)
                .with_context(|| format!("failed to update mirror list from {url}"))?;
            println!("Mirror list now has {} mirror(s)", repository.get_mirrors().len());
        }
    }
    Ok(())
}

/// Opens the client repository. Mirrors from `tufa.toml` take precedence
/// over the trusted mirror list.
pub fn open_repository(context: &Context) -> Result<Repository> {
    let section = &context.config.client;
    let config = section.client_config();
    let repository = if section.mirrors.is_empty() {
        let fetcher = Box::new(HttpFetcher::new(config.fetch_timeout()));
        Repository::from_trusted_mirrorlist(section.name.clone(), config, fetcher)
    } else {
        Repository::new(section.name.clone(), config, section.mirror_list()?)
    };
    repository.with_context(|| {
        format!(
            "failed to open client repository at {}",
            section.repository_dir.display()
        )
    })
}

pub fn refresh(context: &Context) -> Result<Repository> {
    let mut repository = open_repository(context)?;
    repository.refresh().context("refresh failed")?;
    Ok(repository)
}

/// Refreshes, downloads new or changed targets and, when updating
/// everything, removes files that are no longer targets.
pub fn update(context: &Context, target: Option<&str>) -> Result<UpdateSummary> {
    let repository = refresh(context)?;
    let dest = &context.config.client.targets_dir;

    let targets = match target {
        Some(path) => vec![repository.target(path)?],
        None => repository.all_targets()?,
    };
    let mut summary = UpdateSummary::default();
    for target in repository.updated_targets(&targets, dest)? {
        repository
            .download_target(&target, dest)
            .with_context(|| format!("failed to download {}", target.path))?;
        summary.downloaded.push(target.path);
    }
    if target.is_none() {
        summary.removed = repository.remove_obsolete_targets(dest)?;
    }
    Ok(summary)
}
