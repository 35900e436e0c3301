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

//! Database-backed visitor. Stores each `(source, config)` and
//! `(source, module)` fact relative to the tree root, filtering out
//! non-C sources and the documentation/sample/tool trees.

use std::path::{Path, PathBuf};

use crate::db::F2cDb;
use crate::error::Result;
use crate::supported::SupportedConf;
use crate::visitor::MakeVisitor;
use crate::vlog;

pub struct SqliteMakeVisitor<'a> {
    db: &'a F2cDb,
    supported: &'a SupportedConf,
    branch: String,
    base: PathBuf,
    error: Option<crate::error::Error>,
}

impl<'a> SqliteMakeVisitor<'a> {
    pub fn new(
        db: &'a F2cDb,
        supported: &'a SupportedConf,
        branch: &str,
        base: &Path,
    ) -> SqliteMakeVisitor<'a> {
        SqliteMakeVisitor {
            db,
            supported,
            branch: branch.to_string(),
            base: base.to_path_buf(),
            error: None,
        }
    }

    /// The first database failure; the caller rolls the branch back on it.
    pub fn into_error(self) -> Result<()> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn record(&mut self, result: Result<()>) {
        if let Err(err) = result {
            if self.error.is_none() {
                self.error = Some(err);
            }
        }
    }

    fn skip_path(rel_path: &Path) -> bool {
        if rel_path.extension().is_none_or(|ext| ext != "c") {
            return true;
        }

        static SKIP_PATHS: &[&str] = &["Documentation", "samples", "tools"];

        let Some(first) = rel_path.components().next() else {
            return true;
        };
        SKIP_PATHS
            .iter()
            .any(|skip| first.as_os_str() == *skip)
    }

    fn rel<'p>(&self, path: &'p Path) -> &'p Path {
        path.strip_prefix(&self.base).unwrap_or(path)
    }

    fn insert_config(&mut self, src_path: &Path, cond: &str) -> Result<()> {
        let rel_path = self.rel(src_path);

        if Self::skip_path(rel_path) {
            return Ok(());
        }

        vlog!(2, "SQL {} {}", cond, rel_path.display());

        let (dir, file) = self.db.insert_path(rel_path)?;
        self.db.insert_config(cond)?;
        self.db.insert_cf_map(&self.branch, cond, &dir, &file)
    }

    fn insert_module(&mut self, src_path: &Path, module: &Path) -> Result<()> {
        let rel_path = self.rel(src_path);
        let rel_mod = self.rel(module);

        if Self::skip_path(rel_path) {
            return Ok(());
        }

        vlog!(2, "SQL MOD {} {}", rel_mod.display(), rel_path.display());

        let dir_mod = rel_mod
            .parent()
            .map(|d| d.display().to_string())
            .unwrap_or_default();
        let file_mod = rel_mod
            .file_name()
            .map(|f| f.to_string_lossy().into_owned())
            .unwrap_or_default();

        self.db.insert_dir(&dir_mod)?;
        let (dir, file) = self.db.insert_path(rel_path)?;
        self.db.insert_module(&dir_mod, &file_mod)?;
        let supported = self.supported.support_state(rel_mod);
        self.db
            .insert_md_map(&self.branch, &dir_mod, &file_mod, supported)?;
        self.db
            .insert_mf_map(&self.branch, &dir_mod, &file_mod, &dir, &file)
    }
}

impl MakeVisitor for SqliteMakeVisitor<'_> {
    fn config(&mut self, src_path: &Path, cond: &str) {
        let result = self.insert_config(src_path, cond);
        self.record(result);
    }

    fn module(&mut self, src_path: &Path, module: &Path) {
        let result = self.insert_module(src_path, module);
        self.record(result);
    }

    fn ignored(&mut self, obj_path: &Path, cond: &str) {
        vlog!(
            2,
            "ignoring already reported {}, now with {}",
            obj_path.display(),
            cond
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::walker::TreeWalker;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_skip_path() {
        assert!(!SqliteMakeVisitor::skip_path(Path::new("drivers/x.c")));
        assert!(SqliteMakeVisitor::skip_path(Path::new("drivers/x.S")));
        assert!(SqliteMakeVisitor::skip_path(Path::new("drivers/x.rs")));
        assert!(SqliteMakeVisitor::skip_path(Path::new("Documentation/x.c")));
        assert!(SqliteMakeVisitor::skip_path(Path::new("samples/x.c")));
        assert!(SqliteMakeVisitor::skip_path(Path::new("tools/perf/x.c")));
    }

    #[test]
    fn test_walk_into_database() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        fs::write(
            root.join("Kbuild"),
            "obj-$(CONFIG_FOO) += foo.o\nfoo-y := a.o\n",
        )
        .unwrap();
        fs::write(root.join("a.c"), "").unwrap();

        let db = F2cDb::open_in_memory().unwrap();
        db.create_db().unwrap();
        db.insert_branch("b", "sha", 1).unwrap();

        let supported = SupportedConf::parse("+base foo\n");
        let mut visitor = SqliteMakeVisitor::new(&db, &supported, "b", root);
        TreeWalker::new(root, &mut visitor).walk();
        visitor.into_error().unwrap();

        assert_eq!(
            db.select_config("b", "", "a.c").unwrap(),
            vec!["CONFIG_FOO".to_string()]
        );
        assert_eq!(
            db.select_module("b", "", "a.c").unwrap(),
            vec![("".to_string(), "foo.o".to_string())]
        );
    }
}
