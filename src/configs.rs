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

//! Per-arch/per-flavor kernel config collection. The kernel-source checkout
//! carries `config/<arch>/<flavor>` files in `.config` syntax; every option
//! lands in `conf_branch_map` as `y`, `m`, `n`, or `v<literal>`.

use std::path::Path;

use crate::db::F2cDb;
use crate::error::Result;
use crate::vlog;

/// One `.config` line → `(option, value)`.
fn parse_config_line(line: &str) -> Option<(&str, String)> {
    let line = line.trim();
    if let Some(rest) = line.strip_prefix("# ") {
        let option = rest.strip_suffix(" is not set")?;
        if !option.starts_with("CONFIG_") {
            return None;
        }
        return Some((option, "n".to_string()));
    }
    if !line.starts_with("CONFIG_") {
        return None;
    }
    let (option, value) = line.split_once('=')?;
    let value = match value {
        "y" => "y".to_string(),
        "m" => "m".to_string(),
        other => format!("v{other}"),
    };
    Some((option, value))
}

fn collect_file(
    db: &F2cDb,
    branch: &str,
    arch: &str,
    flavor: &str,
    content: &str,
) -> Result<()> {
    for line in content.lines() {
        let Some((option, value)) = parse_config_line(line) else {
            continue;
        };
        db.insert_config(option)?;
        db.insert_cb_map(branch, arch, flavor, option, &value)?;
    }
    Ok(())
}

/// Walks `<ksource>/config/<arch>/<flavor>` of a checked-out branch.
pub fn collect_configs(db: &F2cDb, branch: &str, ksource: &Path) -> Result<()> {
    let config_dir = ksource.join("config");
    let Ok(arch_entries) = std::fs::read_dir(&config_dir) else {
        crate::warn!("no config/ directory in {}", ksource.display());
        return Ok(());
    };

    let mut arch_dirs: Vec<_> = arch_entries
        .flatten()
        .map(|e| e.path())
        .filter(|p| p.is_dir())
        .collect();
    arch_dirs.sort();

    for arch_dir in arch_dirs {
        let arch = arch_dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        db.insert_arch(&arch)?;

        let mut flavors: Vec<_> = std::fs::read_dir(&arch_dir)?
            .flatten()
            .map(|e| e.path())
            .filter(|p| p.is_file())
            .collect();
        flavors.sort();

        for flavor_file in flavors {
            let flavor = flavor_file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            vlog!(1, "collecting configs for {arch}/{flavor}");
            db.insert_flavor(&flavor)?;
            let content = std::fs::read_to_string(&flavor_file)?;
            collect_file(db, branch, &arch, &flavor, &content)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config_line() {
        assert_eq!(
            parse_config_line("CONFIG_SMP=y"),
            Some(("CONFIG_SMP", "y".to_string()))
        );
        assert_eq!(
            parse_config_line("CONFIG_USB=m"),
            Some(("CONFIG_USB", "m".to_string()))
        );
        assert_eq!(
            parse_config_line("# CONFIG_DEBUG is not set"),
            Some(("CONFIG_DEBUG", "n".to_string()))
        );
        assert_eq!(
            parse_config_line("CONFIG_HZ=250"),
            Some(("CONFIG_HZ", "v250".to_string()))
        );
        assert_eq!(
            parse_config_line("CONFIG_CMDLINE=\"quiet\""),
            Some(("CONFIG_CMDLINE", "v\"quiet\"".to_string()))
        );
        assert_eq!(parse_config_line("# just a comment"), None);
        assert_eq!(parse_config_line(""), None);
    }

    #[test]
    fn test_collect_file() {
        let db = F2cDb::open_in_memory().unwrap();
        db.create_db().unwrap();
        db.insert_branch("b", "sha", 1).unwrap();
        db.insert_arch("x86_64").unwrap();
        db.insert_flavor("default").unwrap();

        collect_file(
            &db,
            "b",
            "x86_64",
            "default",
            "CONFIG_SMP=y\n# CONFIG_DEBUG is not set\nCONFIG_HZ=250\n",
        )
        .unwrap();

        // Re-running absorbs through the unique constraint.
        collect_file(&db, "b", "x86_64", "default", "CONFIG_SMP=y\n").unwrap();
    }
}
