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

use std::path::Path;

/// Sink for the facts the tree walker derives. Invoked single-threaded, in
/// deterministic order.
pub trait MakeVisitor {
    /// `src_path` is gated by the Kconfig symbol `cond`, exactly as spelled
    /// in the Makefile.
    fn config(&mut self, src_path: &Path, cond: &str);

    /// `src_path` contributes to the composite object `module`.
    fn module(&mut self, src_path: &Path, module: &Path);

    /// A second attempt to register `obj_path`; diagnostic only.
    fn ignored(&mut self, obj_path: &Path, cond: &str);
}

pub struct ConsoleMakeVisitor;

impl MakeVisitor for ConsoleMakeVisitor {
    fn config(&mut self, src_path: &Path, cond: &str) {
        println!("{} {}", cond, src_path.display());
    }

    fn module(&mut self, src_path: &Path, module: &Path) {
        println!("MOD {} {}", module.display(), src_path.display());
    }

    fn ignored(&mut self, obj_path: &Path, cond: &str) {
        println!(
            "ignoring already reported {}, now with {}",
            obj_path.display(),
            cond
        );
    }
}
