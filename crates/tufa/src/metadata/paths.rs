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

//! Target path rules.
//!
//! Target paths are relative, `/`-separated and never contain `.` or `..`
//! segments. A path pattern confines paths to itself and everything below
//! it; the empty pattern matches every path.

use std::path::{Path, PathBuf};

use super::FormatError;

fn invalid(path: &str, reason: &str) -> FormatError {
    FormatError::InvalidTargetPath {
        path: path.to_string(),
        reason: reason.to_string(),
    }
}

/// Validates a target path taken from metadata or a caller.
pub fn validate_target_path(path: &str) -> Result<(), FormatError> {
    if path.is_empty() {
        return Err(invalid(path, "empty path"));
    }
    if path.starts_with('/') {
        return Err(invalid(path, "absolute paths are not allowed"));
    }
    if path.contains('\\') || path.contains('\0') {
        return Err(invalid(path, "contains a forbidden character"));
    }
    if path.len() >= 2 && path.as_bytes()[1] == b':' {
        return Err(invalid(path, "drive prefixes are not allowed"));
    }
    for segment in path.split('/') {
        match segment {
            "" => return Err(invalid(path, "empty path segment")),
            "." | ".." => return Err(invalid(path, "relative segments are not allowed")),
            _ => {}
        }
    }
    Ok(())
}

/// Validates a confinement pattern. The empty pattern is allowed.
pub fn validate_path_pattern(pattern: &str) -> Result<(), FormatError> {
    let trimmed = pattern.trim_end_matches('/');
    if trimmed.is_empty() {
        return Ok(());
    }
    validate_target_path(trimmed)
}

/// True when `path` equals `pattern` or lies below it.
pub fn is_path_within(path: &str, pattern: &str) -> bool {
    let pattern = pattern.trim_end_matches('/');
    if pattern.is_empty() {
        return true;
    }
    match path.strip_prefix(pattern) {
        Some("") => true,
        Some(rest) => rest.starts_with('/'),
        None => false,
    }
}

/// True when `path` is covered by at least one pattern.
///
/// An empty list of patterns means the holder is unconfined.
pub fn path_in_confined_paths(path: &str, patterns: &[String]) -> bool {
    patterns.is_empty() || patterns.iter().any(|p| is_path_within(path, p))
}

/// True when every child pattern lies within some parent pattern.
///
/// `None` for the parent means the parent is unrestricted.
pub fn patterns_within(child: &[String], parent: Option<&[String]>) -> bool {
    match parent {
        None => true,
        Some(parent) => child
            .iter()
            .all(|c| path_in_confined_paths(c.trim_end_matches('/'), parent)),
    }
}

/// Resolves a target path under `base`, rejecting anything that would
/// escape it.
pub fn join_target_path(base: &Path, path: &str) -> Result<PathBuf, FormatError> {
    validate_target_path(path)?;
    let mut joined = base.to_path_buf();
    for segment in path.split('/') {
        joined.push(segment);
    }
    Ok(joined)
}

/// Converts a filesystem path below `base` into a `/`-separated target path.
pub fn relative_target_path(base: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(base).ok()?;
    let segments: Option<Vec<&str>> = relative.components().map(|c| c.as_os_str().to_str()).collect();
    let joined = segments?.join("/");
    if joined.is_empty() {
        None
    } else {
        Some(joined)
    }
}
