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

//! Rename mining over the mainline kernel history. For every released
//! version used by the processed branches, collect the renames between that
//! version and the present, collapsing rename chains so a file is mapped
//! straight to its current name.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::db::F2cDb;
use crate::error::{Error, Result};
use crate::gitutil;
use crate::kerncvs::version_sum;

#[derive(Debug, Clone, PartialEq)]
struct RenameInfo {
    path: String,
    similarity: u32,
}

/// oldfile → current name. BTreeMap keeps insert order stable.
type RenameMap = BTreeMap<String, RenameInfo>;

/// One `--raw` rename record: `:mode mode sha sha R<sim>\told\tnew`.
fn parse_raw_line(line: &str) -> Result<(u32, &str, &str)> {
    let bad = |why: &str| Error::Git {
        args: "log --raw".to_string(),
        message: format!("{why}: {line}"),
    };

    if !line.starts_with(':') {
        return Err(bad("bad line"));
    }
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() < 7 {
        return Err(bad("bad formatted line"));
    }
    let similarity: u32 = fields[4][1..].parse().map_err(|_| bad("bad rename part"))?;
    if similarity == 0 {
        return Err(bad("bad rename part"));
    }
    Ok((similarity, fields[5], fields[6]))
}

fn merge_rename(renames: &mut RenameMap, old_file: &str, new_file: &str, similarity: u32) {
    if let Some(fin) = renames.remove(new_file) {
        // do not store reverted and back and forth renames
        if old_file != fin.path {
            renames.insert(
                old_file.to_string(),
                RenameInfo {
                    path: fin.path,
                    similarity: fin.similarity * similarity / 100,
                },
            );
        }
    } else {
        renames.insert(
            old_file.to_string(),
            RenameInfo {
                path: new_file.to_string(),
                similarity,
            },
        );
    }
}

fn process_renames_between(
    db: &F2cDb,
    lrepo: &Path,
    begin: &str,
    end: Option<&str>,
    renames: &mut RenameMap,
) -> Result<()> {
    let range = match end {
        Some(end) => format!("v{begin}..v{end}"),
        None => format!("v{begin}..origin/master"),
    };
    crate::vlog!(1, "\t{range}");

    let out = gitutil::git(
        lrepo,
        &[
            "log",
            "-M30",
            "-l0",
            "--oneline",
            "--no-merges",
            "--raw",
            "--diff-filter=R",
            "--format=",
            &range,
        ],
    )?;

    for line in out.lines() {
        if line.is_empty() {
            continue;
        }
        let (similarity, old_file, new_file) = parse_raw_line(line)?;
        merge_rename(renames, old_file, new_file, similarity);
    }

    let version = version_sum(begin);
    db.begin()?;
    for (old_file, info) in renames.iter() {
        let (olddir, oldfile) = db.insert_path(&PathBuf::from(old_file))?;
        let (newdir, newfile) = db.insert_path(&PathBuf::from(&info.path))?;
        db.insert_rfv_map(
            version,
            info.similarity.min(100),
            &olddir,
            &oldfile,
            &newdir,
            &newfile,
        )?;
    }
    db.end()?;

    Ok(())
}

/// `versions` are the source versions of the processed branches, any order.
pub fn process_renames(db: &F2cDb, lrepo: &Path, versions: &[String]) -> Result<()> {
    let mut sorted: Vec<&str> = versions.iter().map(String::as_str).collect();
    sorted.sort_by_key(|v| version_sum(v));
    sorted.dedup();

    let mut renames = RenameMap::new();
    let mut iter = sorted.iter().rev();
    let Some(&newest) = iter.next() else {
        return Ok(());
    };

    let mut curr = newest;
    process_renames_between(db, lrepo, curr, None, &mut renames)?;
    for &prev in iter {
        process_renames_between(db, lrepo, prev, Some(curr), &mut renames)?;
        curr = prev;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_raw_line() {
        let (sim, old, new) = parse_raw_line(
            ":100644 100644 abcd1234 ef567890 R095\tnet/old.c\tnet/new.c",
        )
        .unwrap();
        assert_eq!(sim, 95);
        assert_eq!(old, "net/old.c");
        assert_eq!(new, "net/new.c");

        assert!(parse_raw_line("garbage").is_err());
        assert!(parse_raw_line(":100644 100644 a b R000\told\tnew").is_err());
    }

    #[test]
    fn test_merge_plain() {
        let mut map = RenameMap::new();
        merge_rename(&mut map, "a.c", "b.c", 90);
        assert_eq!(
            map["a.c"],
            RenameInfo {
                path: "b.c".to_string(),
                similarity: 90
            }
        );
    }

    #[test]
    fn test_merge_chain_collapses() {
        let mut map = RenameMap::new();
        // History is walked newest first: b->c happened after a->b.
        merge_rename(&mut map, "b.c", "c.c", 80);
        merge_rename(&mut map, "a.c", "b.c", 50);
        assert!(!map.contains_key("b.c"));
        assert_eq!(
            map["a.c"],
            RenameInfo {
                path: "c.c".to_string(),
                similarity: 40
            }
        );
    }

    #[test]
    fn test_merge_revert_is_dropped() {
        let mut map = RenameMap::new();
        merge_rename(&mut map, "b.c", "a.c", 100);
        merge_rename(&mut map, "a.c", "b.c", 100);
        assert!(map.is_empty());
    }
}
