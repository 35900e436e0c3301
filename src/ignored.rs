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

//! Ignored-files collection. The JSON maps `"all"` and branch names to glob
//! lists; every regular file of the expanded tree matching one of them lands
//! in `ignored_file_branch_map`.

use std::path::Path;

use serde::Deserialize;
use serde_json::Value;

use crate::db::F2cDb;
use crate::error::Result;
use crate::fileutil::fnmatch_pathname;

#[derive(Debug, Deserialize)]
pub struct IgnoredFiles(serde_json::Map<String, Value>);

impl IgnoredFiles {
    pub fn load(path: &Path) -> anyhow::Result<IgnoredFiles> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    fn patterns(&self, key: &str) -> Vec<&str> {
        let Some(Value::Array(list)) = self.0.get(key) else {
            return Vec::new();
        };
        list.iter().filter_map(|v| v.as_str()).collect()
    }
}

fn process_ignore(
    db: &F2cDb,
    branch: &str,
    patterns: &[&str],
    rel_path: &Path,
) -> Result<()> {
    let rel = rel_path.display().to_string();
    for pattern in patterns {
        if fnmatch_pathname(pattern, &rel) {
            let (dir, file) = db.insert_path(rel_path)?;
            db.insert_ifb_map(branch, &dir, &file)?;
        }
    }
    Ok(())
}

fn walk_tree(root: &Path, base: &Path, out: &mut Vec<std::path::PathBuf>) -> Result<()> {
    let mut entries: Vec<_> = std::fs::read_dir(root)?.flatten().map(|e| e.path()).collect();
    entries.sort();
    for path in entries {
        if path.is_dir() {
            walk_tree(&path, base, out)?;
        } else if path.is_file() {
            out.push(path.strip_prefix(base).unwrap_or(&path).to_path_buf());
        }
    }
    Ok(())
}

pub fn process_ignores(
    db: &F2cDb,
    branch: &str,
    ignored: &IgnoredFiles,
    root: &Path,
) -> Result<()> {
    let all = ignored.patterns("all");
    let for_branch = ignored.patterns(branch);
    if all.is_empty() && for_branch.is_empty() {
        return Ok(());
    }

    let mut files = Vec::new();
    walk_tree(root, root, &mut files)?;

    for rel_path in &files {
        process_ignore(db, branch, &all, rel_path)?;
        process_ignore(db, branch, &for_branch, rel_path)?;
    }

    Ok(())
}
