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

//! RHS words and their controlled expansion. A word is a sequence of atoms;
//! an atom is either literal text or a `$(NAME)` reference. Only the few
//! builtins the kernel build uses for per-architecture file names are
//! expanded; everything else evaluates to its own source text.

use bytes::Bytes;

use crate::strutil::{find_close_paren, is_identifier};

#[derive(Debug, Clone, PartialEq)]
pub enum Atom {
    Literal(Bytes),
    /// `$(NAME)` with a plain identifier body.
    Ref(Bytes),
}

pub type Word = Vec<Atom>;

/// Expansion sets for the recognized builtins. `$(SRCARCH)` is handled
/// separately since its set comes from the tree. Adding a builtin is a
/// one-line change.
static BUILTINS: &[(&[u8], &[&str])] = &[
    (b"BITS", &["32", "64"]),
    (b"CSKYABI", &["abiv1", "abiv2"]),
];

fn expand_ref(name: &[u8], archs: &[String]) -> Option<Vec<String>> {
    if name == b"SRCARCH" {
        return Some(archs.to_vec());
    }
    for (builtin, expansions) in BUILTINS {
        if name == *builtin {
            return Some(expansions.iter().map(|e| e.to_string()).collect());
        }
    }
    None
}

/// Splits one whitespace-free word into atoms.
pub fn parse_word(word: &Bytes) -> Word {
    let mut atoms = Vec::new();
    let mut lit_start = 0usize;
    let mut i = 0usize;
    while i < word.len() {
        if word[i] == b'$' && i + 1 < word.len() {
            let open = word[i + 1];
            if open == b'(' || open == b'{' {
                if let Some(close) = find_close_paren(&word[i + 2..], open) {
                    if lit_start < i {
                        atoms.push(Atom::Literal(word.slice(lit_start..i)));
                    }
                    let body = word.slice(i + 2..i + 2 + close);
                    let whole = word.slice(i..i + 2 + close + 1);
                    if is_identifier(&body) {
                        atoms.push(Atom::Ref(body));
                    } else {
                        // Function calls and nested references are one
                        // opaque literal atom.
                        atoms.push(Atom::Literal(whole));
                    }
                    i += 2 + close + 1;
                    lit_start = i;
                    continue;
                }
            }
        }
        i += 1;
    }
    if lit_start < word.len() {
        atoms.push(Atom::Literal(word.slice(lit_start..)));
    }
    atoms
}

/// Evaluates a word to the cartesian product of its atom expansions.
pub fn expand_word(word: &Word, archs: &[String]) -> Vec<String> {
    let mut evaluated: Vec<String> = Vec::new();
    for atom in word {
        let expansions = match atom {
            Atom::Literal(lit) => vec![String::from_utf8_lossy(lit).into_owned()],
            Atom::Ref(name) => expand_ref(name, archs)
                .unwrap_or_else(|| vec![format!("$({})", String::from_utf8_lossy(name))]),
        };
        if evaluated.is_empty() {
            evaluated = expansions;
        } else {
            let mut next = Vec::with_capacity(evaluated.len() * expansions.len());
            for prefix in &evaluated {
                for e in &expansions {
                    next.push(format!("{prefix}{e}"));
                }
            }
            evaluated = next;
        }
    }
    evaluated
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word(s: &'static [u8]) -> Word {
        parse_word(&Bytes::from_static(s))
    }

    fn archs() -> Vec<String> {
        vec!["arm".to_string(), "x86".to_string()]
    }

    #[test]
    fn test_parse_plain_word() {
        assert_eq!(
            word(b"ulcast.o"),
            vec![Atom::Literal(Bytes::from_static(b"ulcast.o"))]
        );
    }

    #[test]
    fn test_parse_ref_word() {
        assert_eq!(
            word(b"thing-$(SRCARCH).o"),
            vec![
                Atom::Literal(Bytes::from_static(b"thing-")),
                Atom::Ref(Bytes::from_static(b"SRCARCH")),
                Atom::Literal(Bytes::from_static(b".o")),
            ]
        );
    }

    #[test]
    fn test_parse_func_word_stays_literal() {
        assert_eq!(
            word(b"$(word 2,a b).o"),
            vec![
                Atom::Literal(Bytes::from_static(b"$(word 2,a b)")),
                Atom::Literal(Bytes::from_static(b".o")),
            ]
        );
    }

    #[test]
    fn test_expand_srcarch() {
        let exp = expand_word(&word(b"thing-$(SRCARCH).o"), &archs());
        assert_eq!(exp, vec!["thing-arm.o", "thing-x86.o"]);
    }

    #[test]
    fn test_expand_unknown_ref_is_literal() {
        let exp = expand_word(&word(b"io-$(FOO).o"), &archs());
        assert_eq!(exp, vec!["io-$(FOO).o"]);
    }

    #[test]
    fn test_expand_cartesian_product() {
        // Two expanding atoms: |SRCARCH| * |BITS| = 4 results.
        let exp = expand_word(&word(b"$(SRCARCH)-$(BITS).o"), &archs());
        assert_eq!(exp, vec!["arm-32.o", "arm-64.o", "x86-32.o", "x86-64.o"]);
    }

    #[test]
    fn test_expand_empty_word() {
        assert!(expand_word(&Vec::new(), &archs()).is_empty());
    }
}
