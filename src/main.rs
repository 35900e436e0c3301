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

// TODO: Add docs
#![allow(missing_docs)]
#![deny(warnings)]

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::Parser;

use file2config::db::F2cDb;
use file2config::ignored::{IgnoredFiles, process_ignores};
use file2config::sqlvisitor::SqliteMakeVisitor;
use file2config::supported::SupportedConf;
use file2config::visitor::ConsoleMakeVisitor;
use file2config::walker::TreeWalker;
use file2config::{authors, configs, gitutil, kerncvs, renames, section, verbose, warn_color};

/// Generate conf_file_map database (and more)
#[derive(Parser)]
#[command(version)]
struct Opts {
    /// process also this branch
    #[arg(short = 'a', long = "append-branch", value_name = "BRANCH")]
    append_branches: Vec<String>,

    /// branch to process
    #[arg(short = 'b', long = "branch", value_name = "BRANCH")]
    branches: Vec<String>,

    /// force color output
    #[arg(long)]
    force_color: bool,

    /// destination (scratch area); defaults to $SCRATCH_AREA/fill-db
    #[arg(long, value_name = "DIR")]
    dest: Option<PathBuf>,

    /// force branch creation (delete old data)
    #[arg(short, long)]
    force: bool,

    /// quiet mode
    #[arg(short, long)]
    quiet: bool,

    /// verbose mode
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// dump patch references to stdout
    #[arg(long)]
    authors_dump_refs: bool,

    /// report unhandled patch lines to stdout
    #[arg(long)]
    authors_report_unhandled: bool,

    /// path to JSON containing files to be added to ignore table
    #[arg(long, value_name = "JSON")]
    ignored_files: Option<PathBuf>,

    /// create db
    #[arg(
        short = 's',
        long = "sqlite",
        value_name = "FILE",
        num_args = 0..=1,
        default_missing_value = "conf_file_map.sqlite"
    )]
    sqlite: Option<PathBuf>,

    /// create the db if not exists
    #[arg(short = 'S', long = "sqlite-create")]
    sqlite_create: bool,

    /// only create the db (do not fill it)
    #[arg(short = 'O', long = "sqlite-create-only")]
    sqlite_create_only: bool,
}

fn branch_note(branch: &str, branch_no: usize, branch_cnt: usize) -> String {
    let percent = 100.0 * branch_no as f64 / branch_cnt as f64;
    format!("{branch} ({branch_no}/{branch_cnt} -- {percent:.2} %)")
}

fn get_sql(opts: &Opts) -> Result<Option<F2cDb>> {
    let Some(sqlite) = &opts.sqlite else {
        return Ok(None);
    };

    let sql = F2cDb::open(sqlite, opts.sqlite_create)
        .with_context(|| format!("Cannot open/create the db at {}", sqlite.display()))?;
    if opts.sqlite_create {
        sql.create_db().context("Cannot create tables")?;
    }

    Ok(Some(sql))
}

fn skip_branch(sql: Option<&F2cDb>, branch: &str, force: bool) -> Result<bool> {
    let Some(sql) = sql else {
        return Ok(false);
    };

    if force {
        sql.delete_branch(branch)
            .with_context(|| format!("Cannot delete branch '{branch}'"))?;
        return Ok(false);
    }

    Ok(sql.has_branch(branch)?)
}

fn fill_branch(
    opts: &Opts,
    branch_note: &str,
    sql: Option<&F2cDb>,
    branch: &str,
    ksource: &Path,
    sha: &str,
    root: &Path,
    ignored_files: Option<&IgnoredFiles>,
) -> Result<()> {
    section(&format!("{branch_note} -- Running file2config"));
    match sql {
        Some(sql) => {
            let supp_conf = gitutil::cat_file(ksource, sha, "supported.conf")
                .context("Cannot obtain supported.conf")?;
            let supp = SupportedConf::parse(&supp_conf);

            let mut visitor = SqliteMakeVisitor::new(sql, &supp, branch, root);
            TreeWalker::new(root, &mut visitor).walk();
            visitor.into_error()?;

            section(&format!("{branch_note} -- Collecting configs"));
            configs::collect_configs(sql, branch, ksource)?;

            section(&format!("{branch_note} -- Detecting authors of patches"));
            authors::process_authors(
                sql,
                branch,
                ksource,
                sha,
                opts.authors_dump_refs,
                opts.authors_report_unhandled,
            )?;

            if let Some(ignored_files) = ignored_files {
                section(&format!("{branch_note} -- Collecting ignored files"));
                process_ignores(sql, branch, ignored_files, root)?;
            }
        }
        None => {
            let mut visitor = ConsoleMakeVisitor;
            TreeWalker::new(root, &mut visitor).walk();
        }
    }

    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn process_branch(
    opts: &Opts,
    branch_note: &str,
    sql: Option<&F2cDb>,
    branch: &str,
    ksource: &Path,
    sha: &str,
    version: u32,
    root: &Path,
    ignored_files: Option<&IgnoredFiles>,
) -> Result<()> {
    let Some(db) = sql else {
        if !opts.sqlite_create_only {
            fill_branch(
                opts,
                branch_note,
                None,
                branch,
                ksource,
                sha,
                root,
                ignored_files,
            )?;
        }
        return Ok(());
    };

    db.begin()?;
    let result = (|| -> Result<()> {
        db.insert_branch(branch, sha, version)
            .with_context(|| format!("Cannot add branch '{branch}' with SHA '{sha}'"))?;
        if !opts.sqlite_create_only {
            fill_branch(
                opts,
                branch_note,
                sql,
                branch,
                ksource,
                sha,
                root,
                ignored_files,
            )?;
        }
        Ok(())
    })();

    match result {
        Ok(()) => {
            section(&format!("{branch_note} -- Committing"));
            db.end()?;
            Ok(())
        }
        Err(err) => {
            let _ = db.rollback();
            Err(err)
        }
    }
}

fn handle(opts: &Opts) -> Result<()> {
    let linux_git = if opts.sqlite.is_some() {
        let Some(path) = std::env::var_os("LINUX_GIT") else {
            bail!("LINUX_GIT not set");
        };
        Some(PathBuf::from(path))
    } else {
        None
    };

    section("Preparing trees");

    let scratch_area = kerncvs::prepare_scratch_area(opts.dest.as_deref())?;
    let ksource = kerncvs::prepare_ksource_git(&scratch_area)?;

    let mut branches = opts.branches.clone();
    if branches.is_empty() {
        branches = kerncvs::get_build_branches()?;
    }
    branches.extend(opts.append_branches.iter().cloned());
    if branches.is_empty() {
        bail!("no branches to process");
    }

    section("Fetching branches");
    kerncvs::fetch_branches(&ksource, &branches)?;

    let sql = get_sql(opts)?;

    let ignored_files = match &opts.ignored_files {
        Some(path) => Some(
            IgnoredFiles::load(path)
                .with_context(|| format!("Cannot parse JSON from {}", path.display()))?,
        ),
        None => None,
    };

    let branch_cnt = branches.len();
    let mut versions = Vec::new();

    for (branch_no, branch) in branches.iter().enumerate() {
        let note = branch_note(branch, branch_no + 1, branch_cnt);
        section(&format!("{note} -- Starting"));

        if skip_branch(sql.as_ref(), branch, opts.force)? {
            warn_color("Already present, skipping, use -f to force re-creation");
            continue;
        }

        section(&format!("{note} -- Checking Out"));
        let sha = kerncvs::checkout_branch(&ksource, branch)?;
        let src_version = kerncvs::src_version(&ksource, &sha)?;
        versions.push(src_version.clone());

        let expanded_tree = kerncvs::expanded_dir(&scratch_area, branch);
        section(&format!("{note} -- Expanding"));
        kerncvs::expand_branch(&scratch_area, &ksource, &expanded_tree)?;

        process_branch(
            opts,
            &note,
            sql.as_ref(),
            branch,
            &ksource,
            &sha,
            kerncvs::version_sum(&src_version),
            &expanded_tree,
            ignored_files.as_ref(),
        )?;
    }

    if let (Some(sql), Some(linux_git)) = (&sql, &linux_git) {
        section("Collecting renames");
        renames::process_renames(sql, linux_git, &versions)?;

        sql.vacuum().context("Cannot VACUUM the DB")?;
    }

    Ok(())
}

fn main() {
    env_logger::builder()
        .filter_level(log::LevelFilter::Warn)
        .format(|buf, record| {
            if let (Some(file), Some(line)) = (record.file(), record.line()) {
                writeln!(buf, "*f2c*: {file}:{line}: {}", record.args())
            } else {
                writeln!(buf, "*f2c*: {}", record.args())
            }
        })
        .parse_env("F2C_LOG")
        .init();

    let opts = Opts::parse();
    verbose::set_verbose(opts.verbose as u32);
    verbose::set_quiet(opts.quiet);
    verbose::set_force_color(opts.force_color);

    if let Err(err) = handle(&opts) {
        file2config::error_color(&format!("{err:#}"));
        std::process::exit(1);
    }
}
