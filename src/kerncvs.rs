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

//! kernel-source plumbing for the database builder: scratch area, clone and
//! fetch of the branch repository, per-branch checkout and patch expansion.

use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result, bail};

use crate::gitutil;
use crate::vlog;

pub static KERNCVS_URL: &str = "kerncvs.suse.de:/srv/git/kernel-source.git";
pub static BRANCHES_CONF_URL: &str = "https://kerncvs.suse.de/branches.conf";

/// `KERNEL_VERSION`-style sum: "6.4.5" → 0x060405.
pub fn version_sum(version: &str) -> u32 {
    let version = version.trim().trim_start_matches('v');
    let mut sum = 0u32;
    for (i, part) in version.split('.').take(3).enumerate() {
        let num: u32 = part
            .chars()
            .take_while(|c| c.is_ascii_digit())
            .collect::<String>()
            .parse()
            .unwrap_or(0);
        sum |= num << (16 - 8 * i);
    }
    sum
}

/// `--dest`, else `$SCRATCH_AREA/fill-db`, else `./fill-db`.
pub fn prepare_scratch_area(dest: Option<&Path>) -> Result<PathBuf> {
    let scratch_area = if let Some(dest) = dest {
        dest.to_path_buf()
    } else if let Some(env) = std::env::var_os("SCRATCH_AREA") {
        PathBuf::from(env).join("fill-db")
    } else {
        crate::warn_color(
            "Neither --dest, nor SCRATCH_AREA defined (defaulting to \"fill-db\")",
        );
        PathBuf::from("fill-db")
    };

    std::fs::create_dir_all(&scratch_area)
        .with_context(|| format!("cannot create {}", scratch_area.display()))?;

    Ok(std::fs::canonicalize(&scratch_area)?)
}

/// Opens (or initializes) `<scratch>/kernel-source` pointing at kerncvs.
pub fn prepare_ksource_git(scratch_area: &Path) -> Result<PathBuf> {
    let ksource = scratch_area.join("kernel-source");

    if ksource.exists() {
        gitutil::git(&ksource, &["rev-parse", "--git-dir"])
            .with_context(|| format!("cannot open {}", ksource.display()))?;
        return Ok(ksource);
    }

    std::fs::create_dir_all(&ksource)?;
    gitutil::git(&ksource, &["init", "-q"]).context("cannot init kernel-source")?;
    gitutil::git(&ksource, &["remote", "add", "origin", KERNCVS_URL])
        .context("cannot add origin")?;

    Ok(ksource)
}

pub fn fetch_branches(ksource: &Path, branches: &[String]) -> Result<()> {
    let mut args = vec![
        "fetch".to_string(),
        "--depth".to_string(),
        "1".to_string(),
        "origin".to_string(),
    ];
    for branch in branches {
        args.push(format!("+refs/heads/{branch}:refs/remotes/origin/{branch}"));
    }
    let args: Vec<&str> = args.iter().map(String::as_str).collect();
    gitutil::git(ksource, &args).context("fetch failed")?;
    Ok(())
}

/// Detached checkout of the branch; returns the HEAD sha.
pub fn checkout_branch(ksource: &Path, branch: &str) -> Result<String> {
    gitutil::git(
        ksource,
        &[
            "checkout",
            "-q",
            "-f",
            "--detach",
            &format!("refs/remotes/origin/{branch}"),
        ],
    )
    .with_context(|| format!("cannot check out '{branch}'"))?;
    let sha = gitutil::rev_parse(ksource, "HEAD").context("cannot find HEAD")?;
    Ok(sha)
}

/// Where a branch gets expanded: slashes cannot appear in the dir name.
pub fn expanded_dir(scratch_area: &Path, branch: &str) -> PathBuf {
    scratch_area.join(branch.replace('/', "_"))
}

/// Runs `scripts/sequence-patch` of the checked-out branch to expand the
/// patch queue into `expanded_tree`.
pub fn expand_branch(scratch_area: &Path, ksource: &Path, expanded_tree: &Path) -> Result<()> {
    let mut seq_patch = PathBuf::from("./scripts/sequence-patch");
    // temporary for old branches
    if !ksource.join(&seq_patch).exists() {
        crate::warn_color("Running old sequence-patch.sh as sequence-patch does not exist");
        seq_patch = PathBuf::from("./scripts/sequence-patch.sh");
    }

    let output = Command::new(&seq_patch)
        .arg(format!("--dir={}", scratch_area.display()))
        .arg(format!("--patch-dir={}", expanded_tree.display()))
        .arg("--rapid")
        .current_dir(ksource)
        .output()
        .with_context(|| format!("cannot run {}", seq_patch.display()))?;

    vlog!(
        2,
        "cmd={} stat={}",
        seq_patch.display(),
        output.status
    );

    if !output.status.success() {
        bail!(
            "cannot seq patch: {} ({})",
            String::from_utf8_lossy(&output.stderr).trim_end(),
            output.status
        );
    }

    Ok(())
}

/// `SRCVERSION` of the branch, from its `rpm/config.sh`.
pub fn src_version(ksource: &Path, commit: &str) -> Result<String> {
    let config = gitutil::cat_file(ksource, commit, "rpm/config.sh")
        .context("cannot obtain rpm/config.sh")?;
    parse_src_version(&config).context("no SRCVERSION in rpm/config.sh")
}

fn parse_src_version(config: &str) -> Option<String> {
    for line in config.lines() {
        if let Some(value) = line.trim().strip_prefix("SRCVERSION=") {
            return Some(value.trim_matches('"').to_string());
        }
    }
    None
}

/// Build branches from kerncvs' branches.conf.
pub fn get_build_branches() -> Result<Vec<String>> {
    let conf = crate::fetch::http_get_string(BRANCHES_CONF_URL)
        .context("Cannot download branches.conf")?;
    Ok(parse_branches_conf(&conf))
}

/// Lines are `name: flags…`; only branches marked for build matter.
fn parse_branches_conf(conf: &str) -> Vec<String> {
    let mut branches = Vec::new();
    for line in conf.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((name, flags)) = line.split_once(':') else {
            continue;
        };
        if flags.split_whitespace().any(|f| f == "build") {
            branches.push(name.trim().to_string());
        }
    }
    branches
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_sum() {
        assert_eq!(version_sum("6.4"), 0x060400);
        assert_eq!(version_sum("6.4.5"), 0x060405);
        assert_eq!(version_sum("v5.14.21"), 0x050e15);
        assert_eq!(version_sum("4.12.14-rc1"), 0x040c0e);
        assert!(version_sum("6.4") < version_sum("6.10"));
    }

    #[test]
    fn test_expanded_dir() {
        assert_eq!(
            expanded_dir(Path::new("/scratch"), "SLE15-SP6/for-next"),
            PathBuf::from("/scratch/SLE15-SP6_for-next")
        );
    }

    #[test]
    fn test_parse_src_version() {
        let config = "# comment\nSRCVERSION=6.4\nOTHER=x\n";
        assert_eq!(parse_src_version(config), Some("6.4".to_string()));
        assert_eq!(parse_src_version("SRCVERSION=\"5.14\"\n"), Some("5.14".to_string()));
        assert_eq!(parse_src_version("nothing here\n"), None);
    }

    #[test]
    fn test_parse_branches_conf() {
        let conf = "\
# comment\n\
master: build\n\
SLE15-SP6: build limited\n\
stable: \n\
cve/linux-5.14: build\n";
        assert_eq!(
            parse_branches_conf(conf),
            vec!["master", "SLE15-SP6", "cve/linux-5.14"]
        );
    }
}
