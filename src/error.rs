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

use std::path::PathBuf;

use thiserror::Error;

/// Error kinds of the pipeline. Inside the resolver only database failures
/// are fatal; everything else is logged and walked past.
#[derive(Debug, Error)]
pub enum Error {
    #[error("cannot read {path}: {source}")]
    FileNotFound {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("{file}: failed to parse: {errors} errors")]
    ParseFailure { file: PathBuf, errors: usize },

    #[error(transparent)]
    Db(#[from] rusqlite::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("{sha} is a merge commit")]
    MergeCommit { sha: String },

    #[error("git {args}: {message}")]
    Git { args: String, message: String },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
