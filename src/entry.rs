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

//! Turns parsed assignments into Directory/Object entry events. The caller
//! supplies the interest predicate deciding which LHS patterns matter and a
//! sink receiving one event per expanded word.

use crate::expr::expand_word;
use crate::stmt::{AssignStmt, Stmt, each_assign};
use crate::strutil::trim_suffix;
use crate::vlog;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Directory,
    Object,
}

/// Tag returned by an interest predicate. For directory words it decides
/// whether the word resolves against the tree root or the current Makefile's
/// directory; `Target` is used while resolving a composite object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interest {
    Relative,
    Absolute,
    Target,
}

/// `subdir-*`, except the flags variants which hold compiler switches.
fn is_subdir_rule(lhs: &[u8]) -> bool {
    let Some(rest) = lhs.strip_prefix(b"subdir-") else {
        return false;
    };
    !rest.starts_with(b"asflags-") && !rest.starts_with(b"ccflags-")
}

/// The condition of an assignment: the captured `$(…)` symbol when present,
/// otherwise the LHS sans its `-y`/`-m`/`-objs` suffix, otherwise empty.
/// An empty condition is legal and resolves through the builtin check later.
fn extract_cond(assign: &AssignStmt) -> String {
    if let Some(cond) = &assign.lhs_cond {
        return String::from_utf8_lossy(cond).into_owned();
    }
    for suffix in [b"-y".as_slice(), b"-m".as_slice(), b"-objs".as_slice()] {
        let stripped = trim_suffix(&assign.lhs, suffix);
        if stripped.len() != assign.lhs.len() {
            return String::from_utf8_lossy(&suffix[1..]).into_owned();
        }
    }
    String::new()
}

pub fn evaluate_assign(
    assign: &AssignStmt,
    archs: &[String],
    is_interesting: &dyn Fn(&[u8]) -> Option<Interest>,
    entry: &mut dyn FnMut(Interest, &str, EntryKind, &str),
) {
    let Some(interest) = is_interesting(&assign.lhs) else {
        return;
    };

    let cond = extract_cond(assign);
    let subdir = is_subdir_rule(&assign.lhs);

    for word in &assign.rhs {
        for text in expand_word(word, archs) {
            vlog!(3, "evaluated word: {text}");
            if text.ends_with('/') || subdir {
                entry(interest, &cond, EntryKind::Directory, &text);
            } else if text.len() > 2 && text.ends_with(".o") {
                entry(interest, &cond, EntryKind::Object, &text);
            }
        }
    }
}

pub fn evaluate_stmts(
    stmts: &[Stmt],
    archs: &[String],
    is_interesting: &dyn Fn(&[u8]) -> Option<Interest>,
    entry: &mut dyn FnMut(Interest, &str, EntryKind, &str),
) {
    each_assign(stmts, &mut |assign| {
        evaluate_assign(assign, archs, is_interesting, &mut *entry);
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_buf;
    use crate::symtab::intern;
    use bytes::Bytes;

    fn eval(input: &'static [u8]) -> Vec<(String, EntryKind, String)> {
        let stmts = parse_buf(&Bytes::from_static(input), intern("<entry-test>")).unwrap();
        let archs = vec!["arm".to_string(), "x86".to_string()];
        let mut events = Vec::new();
        evaluate_stmts(
            &stmts,
            &archs,
            &|_lhs| Some(Interest::Relative),
            &mut |_, cond, kind, word| {
                events.push((cond.to_string(), kind, word.to_string()));
            },
        );
        events
    }

    #[test]
    fn test_object_entry() {
        assert_eq!(
            eval(b"obj-$(CONFIG_USB) += usb.o\n"),
            vec![(
                "CONFIG_USB".to_string(),
                EntryKind::Object,
                "usb.o".to_string()
            )]
        );
    }

    #[test]
    fn test_cond_from_suffix() {
        assert_eq!(
            eval(b"obj-y += built-in-thing.o\n"),
            vec![(
                "y".to_string(),
                EntryKind::Object,
                "built-in-thing.o".to_string()
            )]
        );
        assert_eq!(eval(b"foo-objs := a.o\n")[0].0, "objs");
    }

    #[test]
    fn test_directory_by_trailing_slash() {
        assert_eq!(
            eval(b"obj-$(CONFIG_NET) += net/\n"),
            vec![(
                "CONFIG_NET".to_string(),
                EntryKind::Directory,
                "net/".to_string()
            )]
        );
    }

    #[test]
    fn test_subdir_without_slash_is_directory() {
        assert_eq!(
            eval(b"subdir-y := foo\n"),
            vec![("y".to_string(), EntryKind::Directory, "foo".to_string())]
        );
    }

    #[test]
    fn test_subdir_flags_are_not_entries() {
        assert!(eval(b"subdir-ccflags-y := -Wall\n").is_empty());
        assert!(eval(b"subdir-asflags-y := -Wa,-x\n").is_empty());
    }

    #[test]
    fn test_empty_rhs_yields_nothing() {
        assert!(eval(b"obj-y :=\n").is_empty());
    }

    #[test]
    fn test_non_object_words_are_dropped() {
        assert!(eval(b"obj-y += -DFOO bar.h\n").is_empty());
    }

    #[test]
    fn test_uninteresting_lhs_yields_nothing() {
        let stmts = parse_buf(
            &Bytes::from_static(b"hostprogs-y := tool.o\n"),
            intern("<entry-test>"),
        )
        .unwrap();
        let mut events = 0;
        evaluate_stmts(&stmts, &[], &|_| None, &mut |_, _, _, _| events += 1);
        assert_eq!(events, 0);
    }

    #[test]
    fn test_arch_expansion() {
        let events = eval(b"obj-$(CONFIG_KVM) += kvm-$(SRCARCH).o\n");
        assert_eq!(
            events
                .iter()
                .map(|(_, _, w)| w.as_str())
                .collect::<Vec<_>>(),
            vec!["kvm-arm.o", "kvm-x86.o"]
        );
    }
}
