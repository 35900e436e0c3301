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

//! The conf_file_map database. Every insert is idempotent (`INSERT OR
//! IGNORE`), so re-registering a known fact is a no-op while real I/O and
//! schema failures still propagate. Deleting a branch cascades through every
//! branch-scoped relation.

use std::path::Path;

use rusqlite::{Connection, OpenFlags, named_params};

use crate::error::{Error, Result};

static CREATE_TABLES: &[(&str, &[&str])] = &[
    (
        "branch",
        &[
            "id INTEGER PRIMARY KEY",
            "branch TEXT NOT NULL UNIQUE",
            "sha TEXT NOT NULL",
            "version INTEGER NOT NULL",
        ],
    ),
    (
        "config",
        &["id INTEGER PRIMARY KEY", "config TEXT NOT NULL UNIQUE"],
    ),
    (
        "arch",
        &["id INTEGER PRIMARY KEY", "arch TEXT NOT NULL UNIQUE"],
    ),
    (
        "flavor",
        &["id INTEGER PRIMARY KEY", "flavor TEXT NOT NULL UNIQUE"],
    ),
    (
        "conf_branch_map",
        &[
            "id INTEGER PRIMARY KEY",
            "branch INTEGER NOT NULL REFERENCES branch(id) ON DELETE CASCADE",
            "arch INTEGER NOT NULL REFERENCES arch(id) ON DELETE CASCADE",
            "flavor INTEGER NOT NULL REFERENCES flavor(id) ON DELETE CASCADE",
            "config INTEGER NOT NULL REFERENCES config(id) ON DELETE CASCADE",
            "value TEXT NOT NULL CHECK(value IN ('n', 'y', 'm') OR substr(value, 1, 1) = 'v')",
            "UNIQUE(branch, config, arch, flavor)",
        ],
    ),
    (
        "dir",
        &["id INTEGER PRIMARY KEY", "dir TEXT NOT NULL UNIQUE"],
    ),
    (
        "file",
        &[
            "id INTEGER PRIMARY KEY",
            "file TEXT NOT NULL",
            "dir INTEGER NOT NULL REFERENCES dir(id)",
            "UNIQUE(file, dir)",
        ],
    ),
    (
        "conf_file_map",
        &[
            "id INTEGER PRIMARY KEY",
            "branch INTEGER NOT NULL REFERENCES branch(id) ON DELETE CASCADE",
            "config INTEGER NOT NULL REFERENCES config(id) ON DELETE CASCADE",
            "file INTEGER NOT NULL REFERENCES file(id) ON DELETE CASCADE",
            "UNIQUE(branch, config, file)",
        ],
    ),
    (
        "conf_dep",
        &[
            "branch INTEGER NOT NULL REFERENCES branch(id) ON DELETE CASCADE",
            "parent INTEGER NOT NULL REFERENCES config(id) ON DELETE CASCADE",
            "child  INTEGER NOT NULL REFERENCES config(id) ON DELETE CASCADE",
            "PRIMARY KEY(branch, parent, child)",
            "CHECK(parent != child)",
        ],
    ),
    (
        "module",
        &[
            "id INTEGER PRIMARY KEY",
            "dir INTEGER NOT NULL REFERENCES dir(id)",
            "module TEXT NOT NULL",
            "UNIQUE(dir, module)",
        ],
    ),
    (
        "module_details_map",
        &[
            "id INTEGER PRIMARY KEY",
            "branch INTEGER NOT NULL REFERENCES branch(id) ON DELETE CASCADE",
            "module INTEGER NOT NULL REFERENCES module(id) ON DELETE CASCADE",
            "supported INTEGER NOT NULL CHECK(supported >= -3 AND supported <= 4)",
            "UNIQUE(branch, module)",
        ],
    ),
    (
        "module_file_map",
        &[
            "branch INTEGER NOT NULL REFERENCES branch(id) ON DELETE CASCADE",
            "module INTEGER NOT NULL REFERENCES module(id) ON DELETE CASCADE",
            "file INTEGER NOT NULL REFERENCES file(id) ON DELETE CASCADE",
            "PRIMARY KEY(branch, module, file)",
        ],
    ),
    (
        "user",
        &["id INTEGER PRIMARY KEY", "email TEXT NOT NULL UNIQUE"],
    ),
    (
        "user_file_map",
        &[
            "id INTEGER PRIMARY KEY",
            "branch INTEGER NOT NULL REFERENCES branch(id) ON DELETE CASCADE",
            "user INTEGER NOT NULL REFERENCES user(id) ON DELETE CASCADE",
            "file INTEGER NOT NULL REFERENCES file(id) ON DELETE CASCADE",
            "count INTEGER NOT NULL",
            "count_no_fixes INTEGER NOT NULL",
            "UNIQUE(branch, user, file)",
        ],
    ),
    (
        "ignored_file_branch_map",
        &[
            "branch INTEGER NOT NULL REFERENCES branch(id) ON DELETE CASCADE",
            "file INTEGER NOT NULL REFERENCES file(id) ON DELETE CASCADE",
            "PRIMARY KEY(branch, file)",
        ],
    ),
    (
        "rename_file_version_map",
        &[
            "version INTEGER NOT NULL CHECK(version > 0)",
            "similarity INTEGER NOT NULL CHECK(similarity BETWEEN 0 AND 100)",
            "oldfile INTEGER NOT NULL REFERENCES file(id) ON DELETE CASCADE",
            "newfile INTEGER NOT NULL REFERENCES file(id) ON DELETE CASCADE",
            "PRIMARY KEY (version, oldfile, newfile)",
            "UNIQUE(version, oldfile)",
            "UNIQUE(version, newfile)",
        ],
    ),
];

static CREATE_INDICES: &[(&str, &str)] = &[
    ("conf_file_map_file_index", "conf_file_map(file)"),
    ("conf_dep_branch_child_index", "conf_dep(branch, child)"),
];

static CREATE_VIEWS: &[(&str, &str)] = &[
    (
        "conf_branch_map_view",
        "SELECT map.id, branch.branch, arch.arch, flavor.flavor, config.config, value \
         FROM conf_branch_map AS map \
         LEFT JOIN branch ON map.branch = branch.id \
         LEFT JOIN config ON map.config = config.id \
         LEFT JOIN arch ON map.arch = arch.id \
         LEFT JOIN flavor ON map.flavor = flavor.id",
    ),
    (
        "conf_file_map_view_raw_file",
        "SELECT map.id, branch.branch, config.config, map.file \
         FROM conf_file_map AS map \
         LEFT JOIN branch ON map.branch = branch.id \
         LEFT JOIN config ON map.config = config.id",
    ),
    (
        "conf_file_map_view",
        "SELECT map.id, map.branch, map.config, dir.dir || '/' || file.file AS path \
         FROM conf_file_map_view_raw_file AS map \
         LEFT JOIN file ON map.file = file.id \
         LEFT JOIN dir ON file.dir = dir.id",
    ),
    (
        "conf_dep_view",
        "SELECT branch.branch, c_parent.config AS parent, c_child.config AS child \
         FROM conf_dep AS map \
         LEFT JOIN branch ON map.branch = branch.id \
         LEFT JOIN config AS c_parent ON map.parent = c_parent.id \
         LEFT JOIN config AS c_child ON map.child = c_child.id",
    ),
    (
        "module_details_map_view",
        "SELECT map.id, branch.branch, \
         module_dir.dir || '/' || module.module AS module, supported \
         FROM module_details_map AS map \
         LEFT JOIN module ON map.module = module.id \
         LEFT JOIN dir AS module_dir ON module.dir = module_dir.id \
         LEFT JOIN branch ON map.branch = branch.id",
    ),
    (
        "module_file_map_view",
        "SELECT branch.branch, \
         module_dir.dir || '/' || module.module AS module, \
         dir.dir || '/' || file.file AS path \
         FROM module_file_map AS map \
         LEFT JOIN module ON map.module = module.id \
         LEFT JOIN dir AS module_dir ON module.dir = module_dir.id \
         LEFT JOIN branch ON map.branch = branch.id \
         LEFT JOIN file ON map.file = file.id \
         LEFT JOIN dir ON file.dir = dir.id",
    ),
    (
        "user_file_map_view",
        "SELECT map.id, user.email, branch.branch, \
         dir.dir || '/' || file.file AS path, map.count, map.count_no_fixes \
         FROM user_file_map AS map \
         LEFT JOIN user ON map.user = user.id \
         LEFT JOIN branch ON map.branch = branch.id \
         LEFT JOIN file ON map.file = file.id \
         LEFT JOIN dir ON file.dir = dir.id",
    ),
    (
        "user_file_map_view_grouped",
        "SELECT email, path, SUM(count) AS count, \
         SUM(count_no_fixes) AS count_no_fixes \
         FROM user_file_map_view GROUP BY email, path",
    ),
    (
        "ignored_file_branch_map_view",
        "SELECT branch.branch, dir.dir || '/' || file.file AS path \
         FROM ignored_file_branch_map AS map \
         LEFT JOIN branch ON map.branch = branch.id \
         LEFT JOIN file ON map.file = file.id \
         LEFT JOIN dir ON file.dir = dir.id",
    ),
    (
        "rename_file_version_map_view",
        "SELECT map.version, map.similarity, \
         olddir.dir || '/' || oldfile.file AS oldpath, \
         newdir.dir || '/' || newfile.file AS newpath \
         FROM rename_file_version_map AS map \
         LEFT JOIN file AS oldfile ON map.oldfile = oldfile.id \
         LEFT JOIN dir AS olddir ON oldfile.dir = olddir.id \
         LEFT JOIN file AS newfile ON map.newfile = newfile.id \
         LEFT JOIN dir AS newdir ON newfile.dir = newdir.id",
    ),
];

pub struct F2cDb {
    conn: Connection,
}

impl F2cDb {
    pub fn open(path: &Path, create: bool) -> Result<F2cDb> {
        let mut flags = OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        if create {
            flags |= OpenFlags::SQLITE_OPEN_CREATE;
        }
        let conn = Connection::open_with_flags(path, flags)?;
        conn.pragma_update(None, "foreign_keys", true)?;
        Ok(F2cDb { conn })
    }

    pub fn open_read_only(path: &Path) -> Result<F2cDb> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        Ok(F2cDb { conn })
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<F2cDb> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", true)?;
        Ok(F2cDb { conn })
    }

    pub fn create_db(&self) -> Result<()> {
        for (table, columns) in CREATE_TABLES {
            let sql = format!(
                "CREATE TABLE IF NOT EXISTS {table}({});",
                columns.join(", ")
            );
            self.conn.execute_batch(&sql)?;
        }
        for (index, on) in CREATE_INDICES {
            self.conn
                .execute_batch(&format!("CREATE INDEX IF NOT EXISTS {index} ON {on};"))?;
        }
        for (view, select) in CREATE_VIEWS {
            self.conn
                .execute_batch(&format!("CREATE VIEW IF NOT EXISTS {view} AS {select};"))?;
        }
        Ok(())
    }

    pub fn begin(&self) -> Result<()> {
        self.conn.execute_batch("BEGIN;")?;
        Ok(())
    }

    pub fn end(&self) -> Result<()> {
        self.conn.execute_batch("COMMIT;")?;
        Ok(())
    }

    pub fn rollback(&self) -> Result<()> {
        self.conn.execute_batch("ROLLBACK;")?;
        Ok(())
    }

    pub fn vacuum(&self) -> Result<()> {
        self.conn.execute_batch("VACUUM;")?;
        Ok(())
    }

    pub fn insert_branch(&self, branch: &str, sha: &str, version: u32) -> Result<()> {
        self.conn
            .prepare_cached("INSERT INTO branch(branch, sha, version) VALUES (:branch, :sha, :version);")?
            .execute(named_params! { ":branch": branch, ":sha": sha, ":version": version })?;
        Ok(())
    }

    pub fn insert_config(&self, config: &str) -> Result<()> {
        self.conn
            .prepare_cached("INSERT OR IGNORE INTO config(config) VALUES (:config);")?
            .execute(named_params! { ":config": config })?;
        Ok(())
    }

    pub fn insert_arch(&self, arch: &str) -> Result<()> {
        self.conn
            .prepare_cached("INSERT OR IGNORE INTO arch(arch) VALUES (:arch);")?
            .execute(named_params! { ":arch": arch })?;
        Ok(())
    }

    pub fn insert_flavor(&self, flavor: &str) -> Result<()> {
        self.conn
            .prepare_cached("INSERT OR IGNORE INTO flavor(flavor) VALUES (:flavor);")?
            .execute(named_params! { ":flavor": flavor })?;
        Ok(())
    }

    pub fn insert_cb_map(
        &self,
        branch: &str,
        arch: &str,
        flavor: &str,
        config: &str,
        value: &str,
    ) -> Result<()> {
        self.conn
            .prepare_cached(
                "INSERT OR IGNORE INTO conf_branch_map(branch, config, arch, flavor, value) VALUES (\
                 (SELECT id FROM branch WHERE branch = :branch), \
                 (SELECT id FROM config WHERE config = :config), \
                 (SELECT id FROM arch WHERE arch = :arch), \
                 (SELECT id FROM flavor WHERE flavor = :flavor), \
                 :value);",
            )?
            .execute(named_params! {
                ":branch": branch,
                ":config": config,
                ":arch": arch,
                ":flavor": flavor,
                ":value": value,
            })?;
        Ok(())
    }

    pub fn insert_dir(&self, dir: &str) -> Result<()> {
        self.conn
            .prepare_cached("INSERT OR IGNORE INTO dir(dir) VALUES (:dir);")?
            .execute(named_params! { ":dir": dir })?;
        Ok(())
    }

    pub fn insert_file(&self, dir: &str, file: &str) -> Result<()> {
        self.conn
            .prepare_cached(
                "INSERT OR IGNORE INTO file(file, dir) VALUES (\
                 :file, (SELECT id FROM dir WHERE dir = :dir));",
            )?
            .execute(named_params! { ":dir": dir, ":file": file })?;
        Ok(())
    }

    /// Splits `path` into (dir, file), registers both, and hands the split
    /// back for the follow-up map insert.
    pub fn insert_path(&self, path: &Path) -> Result<(String, String)> {
        let dir = path
            .parent()
            .map(|d| d.display().to_string())
            .unwrap_or_default();
        let file = path
            .file_name()
            .map(|f| f.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.insert_dir(&dir)?;
        self.insert_file(&dir, &file)?;
        Ok((dir, file))
    }

    pub fn insert_cf_map(&self, branch: &str, config: &str, dir: &str, file: &str) -> Result<()> {
        self.conn
            .prepare_cached(
                "INSERT OR IGNORE INTO conf_file_map(branch, config, file) VALUES (\
                 (SELECT id FROM branch WHERE branch = :branch), \
                 (SELECT id FROM config WHERE config = :config), \
                 (SELECT id FROM file WHERE file = :file AND \
                 dir = (SELECT id FROM dir WHERE dir = :dir)));",
            )?
            .execute(named_params! {
                ":branch": branch,
                ":config": config,
                ":dir": dir,
                ":file": file,
            })?;
        Ok(())
    }

    pub fn insert_conf_dep(&self, branch: &str, parent: &str, child: &str) -> Result<()> {
        self.conn
            .prepare_cached(
                "INSERT OR IGNORE INTO conf_dep(branch, parent, child) VALUES (\
                 (SELECT id FROM branch WHERE branch = :branch), \
                 (SELECT id FROM config WHERE config = :parent), \
                 (SELECT id FROM config WHERE config = :child));",
            )?
            .execute(named_params! { ":branch": branch, ":parent": parent, ":child": child })?;
        Ok(())
    }

    pub fn insert_module(&self, dir: &str, module: &str) -> Result<()> {
        self.conn
            .prepare_cached(
                "INSERT OR IGNORE INTO module(dir, module) VALUES (\
                 (SELECT id FROM dir WHERE dir = :dir), :module);",
            )?
            .execute(named_params! { ":dir": dir, ":module": module })?;
        Ok(())
    }

    pub fn insert_md_map(
        &self,
        branch: &str,
        module_dir: &str,
        module: &str,
        supported: i32,
    ) -> Result<()> {
        self.conn
            .prepare_cached(
                "INSERT OR IGNORE INTO module_details_map(branch, module, supported) VALUES (\
                 (SELECT id FROM branch WHERE branch = :branch), \
                 (SELECT id FROM module WHERE module = :module AND \
                 dir = (SELECT id FROM dir WHERE dir = :module_dir)), \
                 :supported);",
            )?
            .execute(named_params! {
                ":branch": branch,
                ":module_dir": module_dir,
                ":module": module,
                ":supported": supported,
            })?;
        Ok(())
    }

    pub fn insert_mf_map(
        &self,
        branch: &str,
        module_dir: &str,
        module: &str,
        dir: &str,
        file: &str,
    ) -> Result<()> {
        self.conn
            .prepare_cached(
                "INSERT OR IGNORE INTO module_file_map(branch, module, file) VALUES (\
                 (SELECT id FROM branch WHERE branch = :branch), \
                 (SELECT id FROM module WHERE module = :module AND \
                 dir = (SELECT id FROM dir WHERE dir = :module_dir)), \
                 (SELECT id FROM file WHERE file = :file AND \
                 dir = (SELECT id FROM dir WHERE dir = :dir)));",
            )?
            .execute(named_params! {
                ":branch": branch,
                ":module_dir": module_dir,
                ":module": module,
                ":dir": dir,
                ":file": file,
            })?;
        Ok(())
    }

    pub fn insert_user(&self, email: &str) -> Result<()> {
        self.conn
            .prepare_cached("INSERT OR IGNORE INTO user(email) VALUES (:email);")?
            .execute(named_params! { ":email": email })?;
        Ok(())
    }

    pub fn insert_uf_map(
        &self,
        branch: &str,
        email: &str,
        dir: &str,
        file: &str,
        count: u32,
        count_no_fixes: u32,
    ) -> Result<()> {
        self.conn
            .prepare_cached(
                "INSERT OR IGNORE INTO user_file_map(user, branch, file, count, count_no_fixes) \
                 VALUES (\
                 (SELECT id FROM user WHERE email = :email), \
                 (SELECT id FROM branch WHERE branch = :branch), \
                 (SELECT id FROM file WHERE file = :file AND \
                 dir = (SELECT id FROM dir WHERE dir = :dir)), \
                 :count, :countnf);",
            )?
            .execute(named_params! {
                ":branch": branch,
                ":email": email,
                ":dir": dir,
                ":file": file,
                ":count": count,
                ":countnf": count_no_fixes,
            })?;
        Ok(())
    }

    pub fn insert_ifb_map(&self, branch: &str, dir: &str, file: &str) -> Result<()> {
        self.conn
            .prepare_cached(
                "INSERT OR IGNORE INTO ignored_file_branch_map(branch, file) VALUES (\
                 (SELECT id FROM branch WHERE branch = :branch), \
                 (SELECT id FROM file WHERE file = :file AND \
                 dir = (SELECT id FROM dir WHERE dir = :dir)));",
            )?
            .execute(named_params! { ":branch": branch, ":dir": dir, ":file": file })?;
        Ok(())
    }

    pub fn insert_rfv_map(
        &self,
        version: u32,
        similarity: u32,
        olddir: &str,
        oldfile: &str,
        newdir: &str,
        newfile: &str,
    ) -> Result<()> {
        self.conn
            .prepare_cached(
                "INSERT OR IGNORE INTO rename_file_version_map(version, similarity, oldfile, newfile) \
                 VALUES (:version, :similarity, \
                 (SELECT id FROM file WHERE file = :oldfile AND \
                 dir = (SELECT id FROM dir WHERE dir = :olddir)), \
                 (SELECT id FROM file WHERE file = :newfile AND \
                 dir = (SELECT id FROM dir WHERE dir = :newdir)));",
            )?
            .execute(named_params! {
                ":version": version,
                ":similarity": similarity,
                ":olddir": olddir,
                ":oldfile": oldfile,
                ":newdir": newdir,
                ":newfile": newfile,
            })?;
        Ok(())
    }

    pub fn delete_branch(&self, branch: &str) -> Result<()> {
        self.conn
            .prepare_cached("DELETE FROM branch WHERE branch = :branch;")?
            .execute(named_params! { ":branch": branch })?;
        Ok(())
    }

    pub fn has_branch(&self, branch: &str) -> Result<bool> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT 1 FROM branch WHERE branch = :branch;")?;
        let found = stmt
            .query(named_params! { ":branch": branch })?
            .next()?
            .is_some();
        Ok(found)
    }

    pub fn select_config(&self, branch: &str, dir: &str, file: &str) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT config.config \
             FROM conf_file_map AS cfmap \
             LEFT JOIN config ON cfmap.config = config.id \
             WHERE branch = (SELECT id FROM branch WHERE branch = :branch) AND \
             cfmap.file = (SELECT file.id FROM file \
             LEFT JOIN dir ON file.dir = dir.id \
             WHERE dir.dir = :dir AND file.file = :file);",
        )?;
        let rows = stmt.query_map(
            named_params! { ":branch": branch, ":dir": dir, ":file": file },
            |row| row.get::<_, String>(0),
        )?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Error::Db)
    }

    /// Module (dir, name) pairs the file contributes to.
    pub fn select_module(
        &self,
        branch: &str,
        dir: &str,
        file: &str,
    ) -> Result<Vec<(String, String)>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT module_dir.dir, module.module \
             FROM module_file_map AS mfmap \
             LEFT JOIN module ON mfmap.module = module.id \
             LEFT JOIN dir AS module_dir ON module.dir = module_dir.id \
             WHERE mfmap.branch = (SELECT id FROM branch WHERE branch = :branch) AND \
             mfmap.file IN (SELECT file.id FROM file \
             LEFT JOIN dir ON file.dir = dir.id \
             WHERE dir.dir = :dir AND file.file = :file);",
        )?;
        let rows = stmt.query_map(
            named_params! { ":branch": branch, ":dir": dir, ":file": file },
            |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
        )?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Error::Db)
    }

    pub fn select_ignored(&self, branch: &str) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT path FROM ignored_file_branch_map_view \
             WHERE branch = :branch ORDER BY path;",
        )?;
        let rows = stmt.query_map(named_params! { ":branch": branch }, |row| {
            row.get::<_, String>(0)
        })?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Error::Db)
    }

    /// Historical renames of `dir/file`, newest version first.
    pub fn select_renames(&self, dir: &str, file: &str) -> Result<Vec<(u32, u32, String)>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT map.version, map.similarity, \
             newdir.dir || '/' || newfile.file \
             FROM rename_file_version_map AS map \
             LEFT JOIN file AS newfile ON map.newfile = newfile.id \
             LEFT JOIN dir AS newdir ON newfile.dir = newdir.id \
             WHERE map.oldfile = (SELECT file.id FROM file \
             LEFT JOIN dir ON file.dir = dir.id \
             WHERE dir.dir = :dir AND file.file = :file) \
             ORDER BY map.version DESC;",
        )?;
        let rows = stmt.query_map(named_params! { ":dir": dir, ":file": file }, |row| {
            Ok((
                row.get::<_, u32>(0)?,
                row.get::<_, u32>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Error::Db)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn test_db() -> F2cDb {
        let db = F2cDb::open_in_memory().unwrap();
        db.create_db().unwrap();
        db
    }

    #[test]
    fn test_schema_bootstrap_is_idempotent() {
        let db = test_db();
        db.create_db().unwrap();
    }

    #[test]
    fn test_config_roundtrip() {
        let db = test_db();
        db.insert_branch("SLE15-SP6", "abcd", 0x60404).unwrap();
        let (dir, file) = db.insert_path(&PathBuf::from("drivers/x.c")).unwrap();
        db.insert_config("CONFIG_X").unwrap();
        db.insert_cf_map("SLE15-SP6", "CONFIG_X", &dir, &file).unwrap();

        assert_eq!(
            db.select_config("SLE15-SP6", "drivers", "x.c").unwrap(),
            vec!["CONFIG_X".to_string()]
        );
        assert!(db.select_config("other", "drivers", "x.c").unwrap().is_empty());
    }

    #[test]
    fn test_reinsert_is_noop() {
        let db = test_db();
        db.insert_branch("b", "sha", 1).unwrap();
        db.insert_path(&PathBuf::from("kernel/fork.c")).unwrap();
        db.insert_config("CONFIG_FORK").unwrap();
        for _ in 0..2 {
            db.insert_cf_map("b", "CONFIG_FORK", "kernel", "fork.c").unwrap();
        }
        assert_eq!(db.select_config("b", "kernel", "fork.c").unwrap().len(), 1);
    }

    #[test]
    fn test_module_mapping() {
        let db = test_db();
        db.insert_branch("b", "sha", 1).unwrap();
        db.insert_path(&PathBuf::from("drivers/net/a.c")).unwrap();
        db.insert_dir("drivers/net").unwrap();
        db.insert_module("drivers/net", "r8169.o").unwrap();
        db.insert_md_map("b", "drivers/net", "r8169.o", 2).unwrap();
        db.insert_mf_map("b", "drivers/net", "r8169.o", "drivers/net", "a.c")
            .unwrap();

        assert_eq!(
            db.select_module("b", "drivers/net", "a.c").unwrap(),
            vec![("drivers/net".to_string(), "r8169.o".to_string())]
        );
    }

    #[test]
    fn test_delete_branch_cascades() {
        let db = test_db();
        db.insert_branch("b", "sha", 1).unwrap();
        db.insert_path(&PathBuf::from("kernel/fork.c")).unwrap();
        db.insert_config("CONFIG_FORK").unwrap();
        db.insert_cf_map("b", "CONFIG_FORK", "kernel", "fork.c").unwrap();

        db.delete_branch("b").unwrap();
        assert!(!db.has_branch("b").unwrap());
        assert!(db.select_config("b", "kernel", "fork.c").unwrap().is_empty());
    }

    #[test]
    fn test_has_branch() {
        let db = test_db();
        assert!(!db.has_branch("b").unwrap());
        db.insert_branch("b", "sha", 1).unwrap();
        assert!(db.has_branch("b").unwrap());
    }

    #[test]
    fn test_renames() {
        let db = test_db();
        db.insert_path(&PathBuf::from("net/old.c")).unwrap();
        db.insert_path(&PathBuf::from("net/new.c")).unwrap();
        db.insert_rfv_map(0x60000, 95, "net", "old.c", "net", "new.c")
            .unwrap();

        let renames = db.select_renames("net", "old.c").unwrap();
        assert_eq!(renames, vec![(0x60000, 95, "net/new.c".to_string())]);
    }

    #[test]
    fn test_conf_branch_map_unique_absorbs() {
        let db = test_db();
        db.insert_branch("b", "sha", 1).unwrap();
        db.insert_arch("x86_64").unwrap();
        db.insert_flavor("default").unwrap();
        db.insert_config("CONFIG_HZ").unwrap();
        db.insert_cb_map("b", "x86_64", "default", "CONFIG_HZ", "v250")
            .unwrap();
        // The (branch, config, arch, flavor) uniqueness absorbs the re-run.
        db.insert_cb_map("b", "x86_64", "default", "CONFIG_HZ", "v1000")
            .unwrap();
        let count: i64 = db
            .conn
            .query_row("SELECT COUNT(*) FROM conf_branch_map;", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
        let value: String = db
            .conn
            .query_row("SELECT value FROM conf_branch_map_view;", [], |row| row.get(0))
            .unwrap();
        assert_eq!(value, "v250");
    }
}
