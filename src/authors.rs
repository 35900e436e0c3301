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

//! Patch-author extraction. Every patch under `patches.*/` in the branch
//! commit names an author and the files it touches; per (author, file) we
//! count all patches and the subset that are not fixes.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::db::F2cDb;
use crate::error::Result;
use crate::gitutil;
use crate::vlog;

#[derive(Debug, Default, PartialEq)]
struct PatchInfo {
    author: Option<String>,
    files: Vec<String>,
    is_fix: bool,
}

fn extract_email(line: &str) -> Option<String> {
    let start = line.find('<')?;
    let end = line[start..].find('>')?;
    let email = &line[start + 1..start + end];
    if email.is_empty() {
        return None;
    }
    Some(email.to_lowercase())
}

fn parse_patch(content: &str, dump_refs: bool, report_unhandled: bool) -> PatchInfo {
    let mut info = PatchInfo::default();

    for line in content.lines() {
        if let Some(rest) = line.strip_prefix("From: ") {
            if info.author.is_none() {
                info.author = extract_email(rest);
            }
        } else if let Some(rest) = line.strip_prefix("Signed-off-by: ") {
            if info.author.is_none() {
                info.author = extract_email(rest);
            }
        } else if let Some(rest) = line.strip_prefix("References: ") {
            if dump_refs {
                println!("{rest}");
            }
            if rest.contains("git-fixes") {
                info.is_fix = true;
            }
        } else if let Some(rest) = line.strip_prefix("+++ ") {
            if let Some(path) = rest.strip_prefix("b/") {
                info.files.push(path.trim_end().to_string());
            } else if rest != "/dev/null" && report_unhandled {
                println!("unhandled diff header: {line}");
            }
        }
    }

    info
}

/// Accumulated counts keyed by (email, file); deterministic iteration.
type AuthorCounts = BTreeMap<(String, String), (u32, u32)>;

fn account(counts: &mut AuthorCounts, info: &PatchInfo) {
    let Some(author) = &info.author else {
        return;
    };
    for file in &info.files {
        let entry = counts
            .entry((author.clone(), file.clone()))
            .or_insert((0, 0));
        entry.0 += 1;
        if !info.is_fix {
            entry.1 += 1;
        }
    }
}

pub fn process_authors(
    db: &F2cDb,
    branch: &str,
    ksource: &Path,
    commit: &str,
    dump_refs: bool,
    report_unhandled: bool,
) -> Result<()> {
    let mut counts = AuthorCounts::new();

    for path in gitutil::ls_tree(ksource, commit, None)? {
        if !path.starts_with("patches.") {
            continue;
        }
        let content = match gitutil::cat_file(ksource, commit, &path) {
            Ok(content) => content,
            Err(err) => {
                crate::warn!("cannot read patch {path}: {err}");
                continue;
            }
        };
        let info = parse_patch(&content, dump_refs, report_unhandled);
        if info.author.is_none() {
            vlog!(1, "{path}: no author found");
        }
        account(&mut counts, &info);
    }

    for ((email, file), (count, count_no_fixes)) in &counts {
        db.insert_user(email)?;
        let (dir, file) = db.insert_path(&PathBuf::from(file))?;
        db.insert_uf_map(branch, email, &dir, &file, *count, *count_no_fixes)?;
    }

    Ok(())
}
