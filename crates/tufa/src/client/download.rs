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

//! Verified downloads with mirror fallback.

use super::fetch::{DownloadError, Fetcher, MirrorAttempt};
use crate::audit;
use crate::metadata::FileInfo;

/// Fetches `path` from each URL in turn until one serves bytes matching
/// `fileinfo`.
///
/// Each fetch is capped at the declared length. A mirror that fails,
/// oversends or serves mismatching content is skipped.
pub fn download_verified(
    fetcher: &dyn Fetcher,
    path: &str,
    urls: &[String],
    fileinfo: &FileInfo,
) -> Result<Vec<u8>, DownloadError> {
    if urls.is_empty() {
        return Err(DownloadError::NoEligibleMirror(path.to_string()));
    }

    let mut attempts = Vec::new();
    for url in urls {
        let outcome = fetcher
            .fetch(url, fileinfo.length)
            .and_then(|bytes| match fileinfo.verify(&bytes) {
                Ok(()) => Ok(bytes),
                Err(source) => Err(DownloadError::Integrity {
                    url: url.clone(),
                    source,
                }),
            });

        match outcome {
            Ok(bytes) => return Ok(bytes),
            Err(e) => {
                audit::log_mirror_fetch_failure(url, &e.to_string());
                attempts.push(MirrorAttempt {
                    url: url.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    Err(DownloadError::AllMirrorsFailed {
        path: path.to_string(),
        attempts,
    })
}
