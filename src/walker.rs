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

//! The tree walker. Seeds itself from a kernel root (or any directory with a
//! Kbuild/Makefile), drains a LIFO work list of build files, and reports
//! every resolved `(source, config)` and `(source, module)` pair to a
//! [`MakeVisitor`]. Composite objects are resolved by re-walking the current
//! file for `<stem>-{y,m,objs,$(…)}` assignments.

use std::collections::HashSet;
use std::ffi::OsString;
use std::os::unix::ffi::{OsStrExt, OsStringExt};
use std::path::{Path, PathBuf};

use crate::entry::{EntryKind, Interest, evaluate_stmts};
use crate::parser::parse_file;
use crate::stmt::Stmt;
use crate::strutil::normalize_path;
use crate::visitor::MakeVisitor;
use crate::vlog;

/// Nested Kconfig guards in effect at a point of traversal, innermost last.
/// Never empty during a walk; the initial guard is `"y"`.
pub type CondStack = Vec<String>;

/// Can be empty for unknown vars like ACPI_FUTURE_USAGE.
fn is_builtin(cond: &str) -> bool {
    cond.is_empty() || cond == "y" || cond == "m" || cond == "objs"
}

/// The innermost non-builtin guard, `"y"` when there is none.
fn get_cond(s: &CondStack) -> &str {
    s.iter()
        .rev()
        .find(|cond| !is_builtin(cond))
        .map_or("y", |cond| cond.as_str())
}

fn norm(path: &Path) -> PathBuf {
    let normalized = normalize_path(path.as_os_str().as_bytes());
    PathBuf::from(OsString::from_vec(normalized.to_vec()))
}

fn regular_interest(lhs: &[u8]) -> Option<Interest> {
    static LOOKING_FOR: &[(&[u8], Interest)] = &[
        (b"lib-", Interest::Relative),
        (b"obj-", Interest::Relative),
        (b"subdir-", Interest::Relative),
        (b"platform-", Interest::Relative),
        (b"core-", Interest::Absolute),
        (b"drivers-", Interest::Absolute),
        (b"libs-", Interest::Absolute),
        (b"net-", Interest::Absolute),
        (b"virt-", Interest::Absolute),
    ];

    LOOKING_FOR
        .iter()
        .find(|(prefix, _)| lhs.starts_with(prefix))
        .map(|(_, interest)| *interest)
}

/// `<stem>-` followed by a `$(…)` reference or exactly `y`, `m` or `objs`.
fn target_interest(looking_for: &[u8], lhs: &[u8]) -> Option<Interest> {
    let rest = lhs.strip_prefix(looking_for)?;
    if rest.starts_with(b"$") || rest == b"y" || rest == b"m" || rest == b"objs" {
        return Some(Interest::Target);
    }
    None
}

pub struct TreeWalker<'a> {
    visitor: &'a mut dyn MakeVisitor,
    start: PathBuf,
    archs: Vec<String>,
    to_walk: Vec<(CondStack, PathBuf)>,
    visited_dirs: HashSet<PathBuf>,
    visited_paths: HashSet<PathBuf>,
}

impl<'a> TreeWalker<'a> {
    pub fn new(start: &Path, visitor: &'a mut dyn MakeVisitor) -> Self {
        let mut walker = TreeWalker {
            visitor,
            start: start.to_path_buf(),
            archs: Vec::new(),
            to_walk: Vec::new(),
            visited_dirs: HashSet::new(),
            visited_paths: HashSet::new(),
        };

        let s: CondStack = vec!["y".to_string()];

        if start.join("Documentation").exists() {
            walker.add_default_kernel_files(&s);
        } else {
            walker.add_directory(start, &s, start);
        }

        if crate::verbose::verbose() > 0 {
            let files: Vec<String> = walker
                .to_walk
                .iter()
                .map(|(_, p)| p.display().to_string())
                .collect();
            vlog!(1, "walker start=[{}]", files.join(","));
        }

        walker
    }

    /// Sorted so two runs over the same tree emit identical event sequences.
    fn for_each_subdir(dir: &Path, cb: &mut dyn FnMut(&Path)) {
        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(_) => {
                crate::warn!("for_each_subdir: {} not found!", dir.display());
                return;
            }
        };
        let mut dirs: Vec<PathBuf> = entries
            .flatten()
            .map(|e| e.path())
            .filter(|p| p.is_dir())
            .collect();
        dirs.sort();
        for dir in &dirs {
            cb(dir);
        }
    }

    fn add_default_kernel_files(&mut self, s: &CondStack) {
        let start = self.start.clone();

        // start with top-level Makefile
        self.to_walk.push((s.clone(), start.join("Makefile")));
        // and it includes Kbuild
        self.to_walk.push((s.clone(), start.join("Kbuild")));

        let mut archs = Vec::new();
        let mut to_walk = Vec::new();
        Self::for_each_subdir(&start.join("arch"), &mut |path| {
            if let Some(name) = path.file_name() {
                archs.push(name.to_string_lossy().into_owned());
            }
            // we do not handle 'include's, so do what top-level 'Makefile' does
            to_walk.push((s.clone(), path.join("Makefile")));
        });
        self.archs.extend(archs);
        self.to_walk.extend(to_walk);

        let mut to_walk = Vec::new();
        Self::for_each_subdir(&start.join("arch/arm"), &mut |path| {
            static LOOKING_FOR: &[&str] = &["mach-", "plat-"];
            let Some(name) = path.file_name() else {
                return;
            };
            let name = name.to_string_lossy();
            for prefix in LOOKING_FOR {
                if name.starts_with(prefix) {
                    let makefile = path.join("Makefile");
                    if makefile.exists() {
                        to_walk.push((s.clone(), makefile));
                    }
                }
            }
        });
        self.to_walk.extend(to_walk);

        let mips_plat = start.join("arch/mips/Kbuild.platforms");
        if mips_plat.exists() {
            self.to_walk.push((s.clone(), mips_plat));
        }

        let s390_boot = start.join("arch/s390/boot/Makefile");
        if s390_boot.exists() {
            self.to_walk.push((s.clone(), s390_boot));
        }
    }

    fn add_directory(&mut self, kb_path: &Path, s: &CondStack, path: &Path) {
        if crate::verbose::verbose() > 1 {
            vlog!(
                2,
                "add_directory: path={} cond=[{}]",
                path.display(),
                s.join(",")
            );
        }

        for kb_file in ["Kbuild", "Makefile"] {
            let file = path.join(kb_file);
            if file.exists() {
                self.to_walk.push((s.clone(), file));
                return;
            }
        }

        crate::warn!(
            "add_directory: {}: Kbuild/Makefile not found in {}",
            kb_path.display(),
            path.display()
        );
    }

    fn add_regular_entry(
        &mut self,
        s: &CondStack,
        kb_path: &Path,
        stmts: &[Stmt],
        interest: Interest,
        cond: &str,
        kind: EntryKind,
        word: &str,
    ) {
        let kb_dir = kb_path.parent().unwrap_or(Path::new("."));
        match kind {
            EntryKind::Directory => {
                let absolute = interest == Interest::Absolute;
                let dir = if absolute {
                    norm(&self.start.join(word))
                } else {
                    norm(&kb_dir.join(word))
                };
                if !self.visited_dirs.insert(dir.clone()) {
                    return;
                }
                vlog!(
                    2,
                    "pushing dir ({}): {}",
                    if absolute { "abs" } else { "rela" },
                    dir.display()
                );
                let mut new_s = s.clone();
                new_s.push(cond.to_string());
                self.add_directory(kb_path, &new_s, &dir);
            }
            EntryKind::Object => {
                let mut new_s = s.clone();
                new_s.push(cond.to_string());
                self.handle_object(&new_s, &kb_dir.join(word), stmts, None);
            }
        }
    }

    fn handle_object(
        &mut self,
        s: &CondStack,
        obj_path: &Path,
        stmts: &[Stmt],
        module: Option<&Path>,
    ) {
        let obj_path = norm(obj_path);
        vlog!(2, "have OBJ: {}", obj_path.display());

        let cond = get_cond(s).to_string();
        if is_builtin(&cond) {
            return;
        }

        if !self.visited_paths.insert(obj_path.clone()) {
            self.visitor.ignored(&obj_path, &cond);
            return;
        }

        for suffix in ["c", "S", "rs"] {
            let src_path = obj_path.with_extension(suffix);
            if src_path.exists() {
                self.visitor.config(&src_path, &cond);
                if let Some(module) = module {
                    self.visitor.module(&src_path, module);
                }
                return;
            }
        }

        let mut new_s = s.clone();
        new_s.push(cond);
        let module = module
            .map(Path::to_path_buf)
            .unwrap_or_else(|| obj_path.clone());
        if !self.try_handle_target(&new_s, &obj_path, stmts, &module) && crate::verbose::verbose() > 0
        {
            crate::warn!("{} source not found", obj_path.display());
        }
    }

    fn add_target_entry(
        &mut self,
        s: &CondStack,
        obj_path: &Path,
        stmts: &[Stmt],
        module: &Path,
        cond: &str,
        kind: EntryKind,
        word: &str,
        found: &mut bool,
    ) {
        vlog!(2, "add_target_entry: cond={cond} t={kind:?} e={word}");

        if kind == EntryKind::Object {
            let mut new_s = s.clone();
            new_s.push(cond.to_string());
            let parent = obj_path.parent().unwrap_or(Path::new(".")).to_path_buf();
            self.handle_object(&new_s, &parent.join(word), stmts, Some(module));
            *found = true;
        }
    }

    fn try_handle_target(
        &mut self,
        s: &CondStack,
        obj_path: &Path,
        stmts: &[Stmt],
        module: &Path,
    ) -> bool {
        let Some(stem) = obj_path.file_stem() else {
            return false;
        };
        let mut looking_for = stem.as_bytes().to_vec();
        looking_for.push(b'-');

        if crate::verbose::verbose() > 1 {
            vlog!(
                2,
                "try_handle_target: obj={} lookingFor={} cond=[{}]",
                obj_path.display(),
                String::from_utf8_lossy(&looking_for),
                s.join(",")
            );
        }

        let mut found = false;
        let archs = self.archs.clone();
        evaluate_stmts(
            stmts,
            &archs,
            &|lhs| target_interest(&looking_for, lhs),
            &mut |_, cond, kind, word| {
                self.add_target_entry(s, obj_path, stmts, module, cond, kind, word, &mut found);
            },
        );

        vlog!(
            2,
            "try_handle_target DONE: obj={} found={found}",
            obj_path.display()
        );

        found
    }

    fn handle_kbuild_file(&mut self, s: &CondStack, kb_path: &Path) {
        vlog!(2, "handle_kbuild_file: {}", kb_path.display());

        let stmts = match parse_file(kb_path) {
            Ok(stmts) => stmts,
            Err(err) => {
                crate::warn!("{err}");
                return;
            }
        };

        let archs = self.archs.clone();
        evaluate_stmts(
            &stmts,
            &archs,
            &|lhs| regular_interest(lhs),
            &mut |interest, cond, kind, word| {
                self.add_regular_entry(s, kb_path, &stmts, interest, cond, kind, word);
            },
        );
    }

    pub fn walk(&mut self) {
        while let Some((s, path)) = self.to_walk.pop() {
            self.handle_kbuild_file(&s, &path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[derive(Default)]
    struct CollectVisitor {
        configs: Vec<(PathBuf, String)>,
        modules: Vec<(PathBuf, PathBuf)>,
        ignored: Vec<(PathBuf, String)>,
    }

    impl MakeVisitor for CollectVisitor {
        fn config(&mut self, src_path: &Path, cond: &str) {
            self.configs.push((src_path.to_path_buf(), cond.to_string()));
        }

        fn module(&mut self, src_path: &Path, module: &Path) {
            self.modules
                .push((src_path.to_path_buf(), module.to_path_buf()));
        }

        fn ignored(&mut self, obj_path: &Path, cond: &str) {
            self.ignored.push((obj_path.to_path_buf(), cond.to_string()));
        }
    }

    fn rel<'p>(root: &Path, path: &'p Path) -> &'p Path {
        path.strip_prefix(norm(root)).unwrap_or(path)
    }

    fn configs_rel(root: &Path, v: &CollectVisitor) -> Vec<(String, String)> {
        v.configs
            .iter()
            .map(|(p, c)| (rel(root, p).display().to_string(), c.clone()))
            .collect()
    }

    fn run(root: &Path) -> CollectVisitor {
        let mut visitor = CollectVisitor::default();
        TreeWalker::new(root, &mut visitor).walk();
        visitor
    }

    #[test]
    fn test_conditional_object_reported_builtin_skipped() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        fs::write(
            root.join("Kbuild"),
            "obj-$(CONFIG_ABC) := mod-abc.o\nobj-y := mod-y.o\n",
        )
        .unwrap();
        fs::write(root.join("mod-abc.c"), "").unwrap();
        fs::write(root.join("mod-y.c"), "").unwrap();

        let visitor = run(root);
        assert_eq!(
            configs_rel(root, &visitor),
            vec![("mod-abc.c".to_string(), "CONFIG_ABC".to_string())]
        );
        assert!(visitor.modules.is_empty());
        assert!(visitor.ignored.is_empty());
    }

    #[test]
    fn test_composite_target_resolution() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        fs::write(
            root.join("Kbuild"),
            "obj-$(CONFIG_FOO) += foo.o\nfoo-y := a.o b.o\n",
        )
        .unwrap();
        fs::write(root.join("a.c"), "").unwrap();
        fs::write(root.join("b.c"), "").unwrap();

        let visitor = run(root);
        assert_eq!(
            configs_rel(root, &visitor),
            vec![
                ("a.c".to_string(), "CONFIG_FOO".to_string()),
                ("b.c".to_string(), "CONFIG_FOO".to_string()),
            ]
        );
        let modules: Vec<(String, String)> = visitor
            .modules
            .iter()
            .map(|(src, module)| {
                (
                    rel(root, src).display().to_string(),
                    rel(root, module).display().to_string(),
                )
            })
            .collect();
        assert_eq!(
            modules,
            vec![
                ("a.c".to_string(), "foo.o".to_string()),
                ("b.c".to_string(), "foo.o".to_string()),
            ]
        );
    }

    #[test]
    fn test_chained_composite_keeps_outer_module() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        fs::write(
            root.join("Kbuild"),
            "obj-$(CONFIG_C) += big.o\nbig-y := mid.o\nmid-objs := leaf.o\n",
        )
        .unwrap();
        fs::write(root.join("leaf.c"), "").unwrap();

        let visitor = run(root);
        assert_eq!(
            configs_rel(root, &visitor),
            vec![("leaf.c".to_string(), "CONFIG_C".to_string())]
        );
        assert_eq!(
            rel(root, &visitor.modules[0].1).display().to_string(),
            "big.o"
        );
    }

    #[test]
    fn test_subdir_descent_extends_cond_stack() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        fs::write(root.join("Kbuild"), "subdir-$(CONFIG_BAR) := drivers\n").unwrap();
        fs::create_dir(root.join("drivers")).unwrap();
        fs::write(root.join("drivers/Kbuild"), "obj-y += core.o\n").unwrap();
        fs::write(root.join("drivers/core.c"), "").unwrap();

        let visitor = run(root);
        assert_eq!(
            configs_rel(root, &visitor),
            vec![("drivers/core.c".to_string(), "CONFIG_BAR".to_string())]
        );
    }

    #[test]
    fn test_arch_expansion_in_kernel_root() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        fs::create_dir(root.join("Documentation")).unwrap();
        fs::create_dir_all(root.join("arch/arm")).unwrap();
        fs::create_dir_all(root.join("arch/x86")).unwrap();
        fs::write(
            root.join("Makefile"),
            "obj-$(CONFIG_X) += thing-$(SRCARCH).o\n",
        )
        .unwrap();
        fs::write(root.join("thing-arm.c"), "").unwrap();
        fs::write(root.join("thing-x86.c"), "").unwrap();

        let visitor = run(root);
        assert_eq!(
            configs_rel(root, &visitor),
            vec![
                ("thing-arm.c".to_string(), "CONFIG_X".to_string()),
                ("thing-x86.c".to_string(), "CONFIG_X".to_string()),
            ]
        );
    }

    #[test]
    fn test_second_report_is_ignored() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        fs::write(
            root.join("Kbuild"),
            "obj-$(CONFIG_A) += x.o\nobj-$(CONFIG_B) += x.o\n",
        )
        .unwrap();
        fs::write(root.join("x.c"), "").unwrap();

        let visitor = run(root);
        assert_eq!(
            configs_rel(root, &visitor),
            vec![("x.c".to_string(), "CONFIG_A".to_string())]
        );
        assert_eq!(visitor.ignored.len(), 1);
        assert_eq!(
            rel(root, &visitor.ignored[0].0).display().to_string(),
            "x.o"
        );
        assert_eq!(visitor.ignored[0].1, "CONFIG_B");
    }

    #[test]
    fn test_same_source_via_two_kbuilds() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        fs::write(root.join("Kbuild"), "obj-y += a/ b/\n").unwrap();
        fs::create_dir(root.join("a")).unwrap();
        fs::create_dir(root.join("b")).unwrap();
        fs::write(root.join("a/Kbuild"), "obj-$(CONFIG_A) += ../shared.o\n").unwrap();
        fs::write(root.join("b/Kbuild"), "obj-$(CONFIG_B) += ../shared.o\n").unwrap();
        fs::write(root.join("shared.c"), "").unwrap();

        let visitor = run(root);
        // LIFO drain: b/ is walked first.
        assert_eq!(
            configs_rel(root, &visitor),
            vec![("shared.c".to_string(), "CONFIG_B".to_string())]
        );
        assert_eq!(visitor.ignored.len(), 1);
    }

    #[test]
    fn test_directory_visited_once() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        fs::write(
            root.join("Kbuild"),
            "obj-$(CONFIG_A) += sub/\nobj-$(CONFIG_B) += sub/\n",
        )
        .unwrap();
        fs::create_dir(root.join("sub")).unwrap();
        fs::write(root.join("sub/Kbuild"), "obj-y += s.o\n").unwrap();
        fs::write(root.join("sub/s.c"), "").unwrap();

        let visitor = run(root);
        assert_eq!(
            configs_rel(root, &visitor),
            vec![("sub/s.c".to_string(), "CONFIG_A".to_string())]
        );
    }

    #[test]
    fn test_two_runs_are_identical() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        fs::write(
            root.join("Kbuild"),
            "obj-$(CONFIG_A) += x.o sub/\nobj-$(CONFIG_B) += y.o\n",
        )
        .unwrap();
        fs::create_dir(root.join("sub")).unwrap();
        fs::write(root.join("sub/Kbuild"), "obj-$(CONFIG_S) += s.o\n").unwrap();
        fs::write(root.join("sub/s.c"), "").unwrap();
        fs::write(root.join("x.c"), "").unwrap();
        fs::write(root.join("y.c"), "").unwrap();

        let first = run(root);
        let second = run(root);
        assert_eq!(configs_rel(root, &first), configs_rel(root, &second));
        assert_eq!(first.ignored.len(), second.ignored.len());
    }

    #[test]
    fn test_config_events_never_carry_builtin_conds() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        fs::write(
            root.join("Kbuild"),
            "obj-y += a.o\nobj-m += b.o\nlib-$(CONFIG_L) += l.o\n",
        )
        .unwrap();
        for f in ["a.c", "b.c", "l.c"] {
            fs::write(root.join(f), "").unwrap();
        }

        let visitor = run(root);
        for (_, cond) in &visitor.configs {
            assert!(!cond.is_empty());
            assert!(!is_builtin(cond), "builtin cond {cond} reported");
        }
        assert_eq!(visitor.configs.len(), 1);
    }
}
