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

//! Subprocess git. Tree comparison through a binding is far slower than the
//! git CLI for the workloads here (whole-history rename scans), so every
//! caller goes through these helpers.

use std::path::Path;
use std::process::Command;

use crate::error::{Error, Result};
use crate::log;

/// Runs `git -C <repo> <args…>` and returns stdout. Nonzero exit becomes
/// [`Error::Git`] carrying stderr.
pub fn git(repo: &Path, args: &[&str]) -> Result<String> {
    log!("git -C {} {}", repo.display(), args.join(" "));

    let output = Command::new("git")
        .arg("-C")
        .arg(repo)
        .args(args)
        .output()
        .map_err(Error::Io)?;

    if !output.status.success() {
        return Err(Error::Git {
            args: args.join(" "),
            message: String::from_utf8_lossy(&output.stderr).trim_end().to_string(),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

pub fn rev_parse(repo: &Path, rev: &str) -> Result<String> {
    let out = git(repo, &["rev-parse", "--verify", &format!("{rev}^{{commit}}")])?;
    Ok(out.trim().to_string())
}

pub fn is_merge(repo: &Path, sha: &str) -> Result<bool> {
    let out = git(repo, &["rev-list", "--parents", "-n", "1", sha])?;
    Ok(out.split_whitespace().count() > 2)
}

/// Paths touched by a commit.
pub fn diff_files(repo: &Path, sha: &str) -> Result<Vec<String>> {
    let out = git(
        repo,
        &["diff-tree", "--no-commit-id", "--name-only", "-r", sha],
    )?;
    Ok(out.lines().map(|l| l.to_string()).collect())
}

/// Contents of `path` in `commit`, without touching the work tree.
pub fn cat_file(repo: &Path, commit: &str, path: &str) -> Result<String> {
    git(repo, &["show", &format!("{commit}:{path}")])
}

/// All blob paths of `commit`, optionally limited to a prefix.
pub fn ls_tree(repo: &Path, commit: &str, prefix: Option<&str>) -> Result<Vec<String>> {
    let mut args = vec!["ls-tree", "-r", "--name-only", commit];
    if let Some(prefix) = prefix {
        args.push(prefix);
    }
    let out = git(repo, &args)?;
    Ok(out.lines().map(|l| l.to_string()).collect())
}
