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

//! Process-wide verbosity and color state, set once from the command line.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

static VERBOSE: AtomicU32 = AtomicU32::new(0);
static QUIET: AtomicBool = AtomicBool::new(false);
static FORCE_COLOR: AtomicBool = AtomicBool::new(false);

pub fn set_verbose(level: u32) {
    VERBOSE.store(level, Ordering::Relaxed);
}

pub fn verbose() -> u32 {
    VERBOSE.load(Ordering::Relaxed)
}

pub fn set_quiet(quiet: bool) {
    QUIET.store(quiet, Ordering::Relaxed);
}

pub fn quiet() -> bool {
    QUIET.load(Ordering::Relaxed)
}

pub fn set_force_color(force: bool) {
    FORCE_COLOR.store(force, Ordering::Relaxed);
}

pub fn color_enabled() -> bool {
    if FORCE_COLOR.load(Ordering::Relaxed) {
        return true;
    }
    // SAFETY: isatty only inspects the descriptor.
    unsafe { libc::isatty(libc::STDERR_FILENO) == 1 }
}
