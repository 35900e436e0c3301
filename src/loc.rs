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

use std::{fmt::Display, sync::LazyLock};

use bytes::Bytes;

use crate::symtab::{Symbol, intern};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Loc {
    pub filename: Symbol,
    pub line: i32,
}

impl Display for Loc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.filename, self.line)
    }
}

static DEFAULT_FILENAME: LazyLock<Symbol> = LazyLock::new(|| intern("<unknown>"));

impl Default for Loc {
    fn default() -> Self {
        Loc {
            filename: *DEFAULT_FILENAME,
            line: 0,
        }
    }
}

/// One syntax error reported by the full parse pass.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub loc: Loc,
    pub column: usize,
    pub message: String,
    pub rule_stack: Vec<&'static str>,
    /// The offending source line and the byte range to underline in it.
    pub line_text: Bytes,
    pub token_start: usize,
    pub token_len: usize,
}

impl Diagnostic {
    /// Location and message, the line itself, a caret underline, and the
    /// rule invocation stack.
    pub fn report(&self) {
        eprintln!("error: {}:{} {}", self.loc, self.column, self.message);
        eprintln!("{}", String::from_utf8_lossy(&self.line_text));
        let mut underline = " ".repeat(self.token_start);
        underline.push_str(&"^".repeat(self.token_len.max(1)));
        eprintln!("{underline}");
        let mut stack = String::new();
        for rule in self.rule_stack.iter().rev() {
            stack.push_str(rule);
            stack.push(',');
        }
        eprintln!("rule stack: {stack}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loc_display() {
        let loc = Loc {
            filename: intern("drivers/Makefile"),
            line: 12,
        };
        assert_eq!(loc.to_string(), "drivers/Makefile:12");
    }
}
