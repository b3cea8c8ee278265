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

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "tufactl",
    version,
    about = "Command-line interface for tufa update repositories",
    long_about = "Manage signing keys and signed repository metadata, and refresh a client from mirrors"
)]
pub struct Cli {
    /// Configuration file (defaults to TUFA_CONFIG or the first tufa.toml found)
    #[arg(short, long, global = true, env = "TUFA_CONFIG")]
    pub config: Option<PathBuf>,

    /// Keystore directory, overriding the configuration file
    #[arg(long, global = true)]
    pub keystore: Option<PathBuf>,

    /// Repository directory, overriding the configuration file
    #[arg(long, global = true)]
    pub repository: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Signing key management
    #[command(subcommand)]
    Key(KeyCommands),

    /// Repository metadata generation and signing
    #[command(subcommand)]
    Metadata(MetadataCommands),

    /// Build a complete repository from a project directory
    Quickstart {
        /// Directory whose files become the repository's targets
        project_path: PathBuf,

        /// Directory to create keystore/, repository/ and client/ in
        #[arg(short, long)]
        output: PathBuf,

        /// Mirror URL prefix to publish in the mirror list (repeatable)
        #[arg(long = "mirror", value_name = "URL")]
        mirrors: Vec<String>,

        /// Also write a gzip-compressed release file
        #[arg(long)]
        compress: bool,
    },

    /// Client operations
    #[command(subcommand)]
    Client(ClientCommands),
}

#[derive(Subcommand, Debug)]
pub enum KeyCommands {
    /// Generate new signing keys
    Generate {
        /// Number of keys to generate
        #[arg(short = 'n', long, default_value_t = 1)]
        count: u32,
    },
    /// List key ids in the keystore
    List {
        /// Output format (human or json)
        #[arg(long, default_value = "human")]
        format: String,
    },
    /// Change the password of a key
    ChangePassword {
        keyid: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum MetadataCommands {
    /// Write the repository's config.toml from prompted role keys
    Config,
    /// Create or overwrite root.txt
    Root,
    /// Create or overwrite targets.txt
    Targets,
    /// Create or overwrite release.txt
    Release {
        /// Also write release.txt.gz
        #[arg(long)]
        compress: bool,
    },
    /// Create or overwrite timestamp.txt
    Timestamp,
    /// Create or overwrite mirrorlist.txt from the configured client mirrors
    Mirrorlist,
    /// Add signatures to a metadata file
    Sign {
        file: PathBuf,

        /// Key to sign with (repeatable)
        #[arg(short, long = "key", value_name = "KEYID", required = true)]
        keys: Vec<String>,
    },
    /// Delegate part of a targets role to a new role
    Delegate {
        /// Delegating role, e.g. targets or targets/role1
        #[arg(long, default_value = "targets")]
        parent: String,

        /// Name of the new role within the parent
        #[arg(long)]
        name: String,

        /// Target path the role may sign for (repeatable)
        #[arg(long = "path", value_name = "PATH", required = true)]
        paths: Vec<String>,

        /// Key of the new role (repeatable)
        #[arg(short, long = "key", value_name = "KEYID", required = true)]
        keys: Vec<String>,

        #[arg(long, default_value_t = 1)]
        threshold: u32,

        /// Key that re-signs the parent (repeatable)
        #[arg(long = "parent-key", value_name = "KEYID", required = true)]
        parent_keys: Vec<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum ClientCommands {
    /// Refresh trusted metadata from the mirrors
    Refresh,
    /// Refresh, then download changed targets and remove obsolete ones
    Update {
        /// Only update this target
        #[arg(long)]
        target: Option<String>,
    },
    /// Show the mirrors in use
    Mirrors,
    /// Replace the trusted mirror list from a URL
    UpdateMirrorlist {
        url: String,
    },
}
