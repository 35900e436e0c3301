/*
Copyright 2025 Google LLC

Licensed under the Apache License, Version 2.0 (the "License");
you may not use this file except in compliance with the License.
You may obtain a copy of the License at

     https://www.apache.org/licenses/LICENSE-2.0

Unless required by applicable law or agreed to in writing, software
distributed under the License is distributed on an "AS IS" BASIS,
WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
See the License for the specific language governing permissions and
limitations under the License.
*/

//! Download of the prebuilt database with a freshness window, so repeated
//! queries do not hammer the server.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};

use crate::vlog;

pub static DB_URL: &str = "https://kerncvs.suse.de/conf_file_map.sqlite";
pub static DB_MAX_AGE: Duration = Duration::from_secs(7 * 24 * 60 * 60);

pub fn http_get(url: &str) -> Result<Vec<u8>> {
    let response = reqwest::blocking::get(url)
        .and_then(|r| r.error_for_status())
        .with_context(|| format!("cannot fetch {url}"))?;
    Ok(response.bytes()?.to_vec())
}

pub fn http_get_string(url: &str) -> Result<String> {
    let bytes = http_get(url)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// The per-user cache directory of the query tool.
pub fn cache_dir() -> Result<PathBuf> {
    let dir = dirs::cache_dir()
        .context("Unable to find a cache dir")?
        .join("suse-get-maintainers");
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Unable to create a cache dir at {}", dir.display()))?;
    Ok(dir)
}

/// Downloads `url` into `cache_file` unless a fresh enough copy exists.
/// The write goes through a temporary file so a dropped connection never
/// leaves a torn database behind.
pub fn fetch_file_if_needed(
    cache_file: &Path,
    url: &str,
    refresh: bool,
    max_age: Duration,
) -> Result<PathBuf> {
    if !refresh {
        if let Ok(metadata) = std::fs::metadata(cache_file) {
            let age = metadata
                .modified()
                .ok()
                .and_then(|m| m.elapsed().ok())
                .unwrap_or(Duration::MAX);
            if age < max_age {
                vlog!(1, "using cached {}", cache_file.display());
                return Ok(cache_file.to_path_buf());
            }
        }
    }

    vlog!(1, "downloading {url}");
    let bytes = http_get(url)?;
    let tmp = cache_file.with_extension("part");
    std::fs::write(&tmp, &bytes)
        .with_context(|| format!("cannot write {}", tmp.display()))?;
    std::fs::rename(&tmp, cache_file)
        .with_context(|| format!("cannot move {} into place", tmp.display()))?;

    Ok(cache_file.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_fresh_cache_is_reused() {
        let tmp = TempDir::new().unwrap();
        let cache = tmp.path().join("db.sqlite");
        std::fs::write(&cache, b"cached").unwrap();

        // A fresh file is returned without touching the (bogus) URL.
        let path =
            fetch_file_if_needed(&cache, "http://invalid.invalid/db", false, DB_MAX_AGE).unwrap();
        assert_eq!(std::fs::read(path).unwrap(), b"cached");
    }

    #[test]
    fn test_refresh_hits_network() {
        let tmp = TempDir::new().unwrap();
        let cache = tmp.path().join("db.sqlite");
        std::fs::write(&cache, b"cached").unwrap();

        assert!(
            fetch_file_if_needed(&cache, "http://invalid.invalid/db", true, DB_MAX_AGE).is_err()
        );
    }
}
