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
#![deny(unsafe_op_in_unsafe_fn)]
#![deny(clippy::undocumented_unsafe_blocks)]

pub mod authors;
pub mod configs;
pub mod db;
pub mod entry;
pub mod error;
pub mod expr;
pub mod fetch;
pub mod fileutil;
pub mod gitutil;
pub mod ignored;
pub mod kerncvs;
pub mod loc;
pub mod output;
pub mod parser;
pub mod renames;
pub mod sqlvisitor;
pub mod stmt;
pub mod strutil;
pub mod supported;
pub mod symtab;
pub mod verbose;
pub mod visitor;
pub mod walker;

#[macro_export]
macro_rules! log {
    ($fmt:expr $(, $($arg:tt)*)?) => {
        log::trace!($fmt, $($($arg)*)?)
    };
}

#[macro_export]
macro_rules! warn {
    ($fmt:expr $(, $($arg:tt)*)?) => {
        eprintln!($fmt, $($($arg)*)?)
    };
}

/// Traces gated by the `-v` level, matching the original tools' habit of
/// growing chattier with every repetition of the flag.
#[macro_export]
macro_rules! vlog {
    ($level:expr, $fmt:expr $(, $($arg:tt)*)?) => {
        if $crate::verbose::verbose() >= $level {
            eprintln!($fmt, $($($arg)*)?)
        }
    };
}

const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const RED: &str = "\x1b[31m";

/// Prints a green `== msg ==` progress banner unless quiet.
pub fn section(msg: &str) {
    if verbose::quiet() {
        return;
    }
    if verbose::color_enabled() {
        eprintln!("{BOLD}{GREEN}== {msg} =={RESET}");
    } else {
        eprintln!("== {msg} ==");
    }
}

pub fn warn_color(msg: &str) {
    if verbose::color_enabled() {
        eprintln!("{BOLD}{YELLOW}{msg}{RESET}");
    } else {
        eprintln!("{msg}");
    }
}

pub fn error_color(msg: &str) {
    if verbose::color_enabled() {
        eprintln!("{BOLD}{RED}{msg}{RESET}");
    } else {
        eprintln!("{msg}");
    }
}
