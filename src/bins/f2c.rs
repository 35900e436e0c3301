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

use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::Parser;

use file2config::db::F2cDb;
use file2config::output::{OutputFormatter, OutputFormatterJson, OutputFormatterSimple};
use file2config::{fetch, gitutil, verbose, warn_color};

/// Client for the conf_file_map database
#[derive(Parser)]
#[command(version)]
struct Opts {
    /// force color output
    #[arg(long)]
    force_color: bool,

    /// refresh the db file
    #[arg(short, long)]
    refresh: bool,

    /// verbose mode
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// clone of the mainline kernel repo
    #[arg(short = 'k', long = "kernel-tree", value_name = "DIR", env = "LINUX_GIT")]
    kernel_tree: Option<PathBuf>,

    /// path to the db; downloaded into the cache dir when not given
    #[arg(long, value_name = "FILE")]
    sqlite: Option<PathBuf>,

    /// branch to query
    #[arg(short, long)]
    branch: String,

    /// file for which to find configs of; - for stdin.
    /// This option can be provided multiple times with different values.
    #[arg(short = 'f', long = "file", value_name = "FILE")]
    files: Vec<String>,

    /// SHA of a commit for which to find configs of; - for stdin.
    /// This option can be provided multiple times with different values.
    /// SHA could be in any form accepted by git-rev-parse.
    #[arg(short = 's', long = "sha", value_name = "SHA")]
    shas: Vec<String>,

    /// include also module path in the output
    #[arg(short, long)]
    module: bool,

    /// emit JSON instead of plain lines
    #[arg(short, long)]
    json: bool,
}

/// Expands `-` into stdin lines, anything else passes through.
fn handle_cmdline_files(values: &[String], callback: &mut dyn FnMut(&str) -> Result<()>) -> Result<()> {
    for value in values {
        if value != "-" {
            callback(value)?;
            continue;
        }
        for line in std::io::stdin().lock().lines() {
            let line = line?;
            let line = line.trim();
            if !line.is_empty() {
                callback(line)?;
            }
        }
    }
    Ok(())
}

fn split_path(file: &Path) -> (String, String) {
    let dir = file
        .parent()
        .map(|d| d.display().to_string())
        .unwrap_or_default();
    let name = file
        .file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_default();
    (dir, name)
}

fn select_config_query(
    opts: &Opts,
    sql: &F2cDb,
    formatter: &mut dyn OutputFormatter,
    file: &Path,
) -> Result<()> {
    let (dir, name) = split_path(file);
    let configs = sql.select_config(&opts.branch, &dir, &name)?;

    if configs.is_empty() {
        // Maybe the file only exists under a newer name.
        for (_version, similarity, new_path) in sql.select_renames(&dir, &name)? {
            formatter.add_rename(&file.display().to_string(), &new_path, similarity);
        }
        return Ok(());
    }

    let module = if opts.module {
        sql.select_module(&opts.branch, &dir, &name)?
            .first()
            .map(|(mod_dir, mod_name)| format!("{mod_dir}/{mod_name}"))
    } else {
        None
    };

    for config in &configs {
        formatter.add_config(
            &file.display().to_string(),
            config,
            module.as_deref(),
        );
    }

    Ok(())
}

fn handle_files(opts: &Opts, sql: &F2cDb, formatter: &mut dyn OutputFormatter) -> Result<()> {
    handle_cmdline_files(&opts.files, &mut |file| {
        formatter.new_obj("file", file);
        select_config_query(opts, sql, &mut *formatter, Path::new(file))
    })
}

fn handle_sha(
    opts: &Opts,
    sql: &F2cDb,
    formatter: &mut dyn OutputFormatter,
    kernel_tree: &Path,
    sha: &str,
) -> Result<()> {
    let commit = gitutil::rev_parse(kernel_tree, sha)
        .with_context(|| format!("Cannot find commit {sha}"))?;

    if gitutil::is_merge(kernel_tree, &commit)? {
        warn_color(&format!("{sha} is a merge commit, skipping"));
        return Ok(());
    }

    formatter.new_obj("sha", sha);
    for file in gitutil::diff_files(kernel_tree, &commit)
        .with_context(|| format!("Cannot walk diff for commit {sha}"))?
    {
        select_config_query(opts, sql, &mut *formatter, Path::new(&file))?;
    }

    Ok(())
}

fn handle_shas(opts: &Opts, sql: &F2cDb, formatter: &mut dyn OutputFormatter) -> Result<()> {
    if opts.shas.is_empty() {
        return Ok(());
    }

    let Some(kernel_tree) = &opts.kernel_tree else {
        bail!("--sha given but no kernel tree (--kernel-tree or LINUX_GIT)");
    };

    handle_cmdline_files(&opts.shas, &mut |sha| {
        handle_sha(opts, sql, &mut *formatter, kernel_tree, sha)
    })
}

fn handle(opts: &Opts) -> Result<()> {
    let sqlite = match &opts.sqlite {
        Some(path) => path.clone(),
        None => {
            let cache = fetch::cache_dir()?.join("conf_file_map.sqlite");
            fetch::fetch_file_if_needed(&cache, fetch::DB_URL, opts.refresh, fetch::DB_MAX_AGE)?
        }
    };

    let sql = F2cDb::open_read_only(&sqlite)
        .with_context(|| format!("Unable to open the db {}", sqlite.display()))?;

    let mut formatter: Box<dyn OutputFormatter> = if opts.json {
        Box::new(OutputFormatterJson::new())
    } else {
        Box::new(OutputFormatterSimple::new(opts.module))
    };

    handle_files(opts, &sql, formatter.as_mut())?;
    handle_shas(opts, &sql, formatter.as_mut())?;

    formatter.print();

    Ok(())
}

fn main() {
    env_logger::builder()
        .filter_level(log::LevelFilter::Warn)
        .format(|buf, record| writeln!(buf, "*f2c*: {}", record.args()))
        .parse_env("F2C_LOG")
        .init();

    let opts = Opts::parse();
    verbose::set_verbose(opts.verbose as u32);
    verbose::set_force_color(opts.force_color);

    if let Err(err) = handle(&opts) {
        file2config::error_color(&format!("{err:#}"));
        std::process::exit(1);
    }
}
