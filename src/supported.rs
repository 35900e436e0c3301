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

//! `supported.conf` handling: maps a module path to its support level. The
//! file holds `<marker> <glob>` lines; the last matching glob wins.

use std::path::Path;

use crate::fileutil::fnmatch_pathname;

/// Support levels stored into `module_details_map.supported`.
fn marker_level(marker: &str) -> i32 {
    match marker {
        "-?" => -3,
        "-!" => -2,
        "-" => -1,
        "+external" => 1,
        "+base" => 2,
        "+kmp" => 3,
        _ if marker.starts_with('+') => 4,
        _ => 0,
    }
}

pub struct SupportedConf {
    rules: Vec<(i32, String)>,
}

impl SupportedConf {
    pub fn parse(content: &str) -> SupportedConf {
        let mut rules = Vec::new();
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let mut split = line.split_whitespace();
            let (Some(marker), Some(pattern)) = (split.next(), split.next()) else {
                continue;
            };
            rules.push((marker_level(marker), pattern.to_string()));
        }
        SupportedConf { rules }
    }

    /// Level of the module at `rel_path` (extension is irrelevant), 0 when
    /// no rule matches.
    pub fn support_state(&self, rel_path: &Path) -> i32 {
        let stripped = rel_path.with_extension("");
        let path = stripped.display().to_string();
        let name = stripped
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let mut state = 0;
        for (level, pattern) in &self.rules {
            if fnmatch_pathname(pattern, &path)
                || (!pattern.contains('/') && fnmatch_pathname(pattern, &name))
            {
                state = *level;
            }
        }
        state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn conf() -> SupportedConf {
        SupportedConf::parse(
            "# comment\n\
             +base kernel/*\n\
             +kmp drivers/net/ethernet/intel/*\n\
             - drivers/staging/*\n\
             -! drivers/staging/rtl8712\n\
             +external fs/nfs/nfs\n",
        )
    }

    #[test]
    fn test_levels() {
        let c = conf();
        assert_eq!(c.support_state(&PathBuf::from("kernel/fork.o")), 2);
        assert_eq!(
            c.support_state(&PathBuf::from("drivers/net/ethernet/intel/e1000.o")),
            3
        );
        assert_eq!(c.support_state(&PathBuf::from("drivers/staging/foo.o")), -1);
        assert_eq!(c.support_state(&PathBuf::from("fs/nfs/nfs.ko")), 1);
        assert_eq!(c.support_state(&PathBuf::from("sound/core/snd.o")), 0);
    }

    #[test]
    fn test_last_match_wins() {
        let c = conf();
        assert_eq!(
            c.support_state(&PathBuf::from("drivers/staging/rtl8712.o")),
            -2
        );
    }

    #[test]
    fn test_bare_module_name_matches() {
        let c = SupportedConf::parse("- r8169\n");
        assert_eq!(c.support_state(&PathBuf::from("drivers/net/r8169.o")), -1);
    }
}
