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

use bytes::{BufMut, Bytes, BytesMut};
use memchr::{memchr, memchr2, memrchr};

pub fn is_space_byte(c: &u8) -> bool {
    let c = *c;
    (b'\t'..=b'\r').contains(&c) || c == b' '
}

pub fn word_scanner(s: &[u8]) -> impl Iterator<Item = &[u8]> {
    s.split(is_space_byte).filter(|s| !s.is_empty())
}

pub fn skip_until2(s: &[u8], needle1: u8, needle2: u8) -> usize {
    memchr2(needle1, needle2, s).unwrap_or(s.len())
}

pub fn trim_suffix<'a>(s: &'a [u8], suffix: &[u8]) -> &'a [u8] {
    match s.strip_suffix(suffix) {
        Some(s) => s,
        None => s,
    }
}

pub fn trim_left_space(s: &[u8]) -> &[u8] {
    let mut s = s;
    loop {
        if s.is_empty() {
            return s;
        }
        s = s.trim_ascii_start();
        if s.starts_with(b"\\\r") || s.starts_with(b"\\\n") {
            s = &s[2..];
        } else {
            return s;
        }
    }
}

pub fn trim_right_space(s: &[u8]) -> &[u8] {
    let mut s = s;
    while let [rest @ .., last] = s {
        match last {
            b'\t' | b'\x0b' | b'\x0c' | b' ' => s = rest,
            b'\r' | b'\n' => {
                if rest.ends_with(b"\\") {
                    s = &rest[..rest.len() - 1];
                } else {
                    s = rest;
                }
            }
            _ => break,
        }
    }
    s
}

pub fn trim_space(s: &[u8]) -> &[u8] {
    trim_right_space(trim_left_space(s))
}

/// First occurrence of any byte from `pattern` that is not inside `$(…)` /
/// `${…}` groups and not backslash-escaped.
pub fn find_outside_paren(s: &[u8], pattern: &[u8]) -> Option<usize> {
    let mut prev_backslash = false;
    let mut paren_stack: Vec<u8> = Vec::new();
    let mut pattern_set = [false; 128];
    for c in pattern {
        assert!(c.is_ascii());
        pattern_set[*c as usize] = true;
    }

    for (i, c) in s.iter().enumerate() {
        if c.is_ascii() && pattern_set[*c as usize] && paren_stack.is_empty() && !prev_backslash {
            return Some(i);
        }
        match c {
            b'(' => paren_stack.push(b')'),
            b'{' => paren_stack.push(b'}'),
            b')' | b'}' => {
                if paren_stack.last() == Some(c) {
                    paren_stack.pop();
                }
            }
            _ => {}
        }
        prev_backslash = *c == b'\\' && !prev_backslash;
    }
    None
}

/// Splits `s` into whitespace-separated words, keeping `$(…)` groups intact
/// even when their body contains spaces. A backslash-newline continuation
/// counts as whitespace.
pub fn split_words_outside_paren(s: &[u8]) -> Vec<&[u8]> {
    let mut words = Vec::new();
    let mut depth = 0usize;
    let mut start: Option<usize> = None;
    let mut i = 0usize;
    while i < s.len() {
        let c = s[i];
        if depth == 0 && c == b'\\' && matches!(s.get(i + 1), Some(&(b'\n' | b'\r'))) {
            if let Some(st) = start.take() {
                words.push(&s[st..i]);
            }
            i += 2;
            continue;
        }
        match c {
            b'(' | b'{' => depth += 1,
            b')' | b'}' => depth = depth.saturating_sub(1),
            _ => {}
        }
        if depth == 0 && is_space_byte(&c) {
            if let Some(st) = start.take() {
                words.push(&s[st..i]);
            }
        } else if start.is_none() {
            start = Some(i);
        }
        i += 1;
    }
    if let Some(st) = start {
        words.push(&s[st..]);
    }
    words
}

/// Given `s` starting right after a `$(` or `${`, the index of the matching
/// close paren, or `None` when the group never closes.
pub fn find_close_paren(s: &[u8], open: u8) -> Option<usize> {
    let close = match open {
        b'(' => b')',
        b'{' => b'}',
        _ => return None,
    };
    let mut depth = 1usize;
    for (i, c) in s.iter().enumerate() {
        if *c == open {
            depth += 1;
        } else if *c == close {
            depth -= 1;
            if depth == 0 {
                return Some(i);
            }
        }
    }
    None
}

pub fn is_identifier(s: &[u8]) -> bool {
    !s.is_empty()
        && s.iter()
            .all(|c| c.is_ascii_alphanumeric() || *c == b'_')
}

pub fn normalize_path(mut o: &[u8]) -> Bytes {
    if o.is_empty() {
        return Bytes::new();
    }
    let mut ret = BytesMut::new();
    if o.starts_with(b"/") {
        ret.put_u8(b'/');
        o = &o[1..];
    }
    while !o.is_empty() {
        let idx = memchr(b'/', o);
        let (dir, rest) = match idx {
            Some(idx) => (&o[..idx], &o[idx + 1..]),
            None => (o, [].as_slice()),
        };
        o = rest;

        if dir == b"." || (dir == b".." && ret.as_ref() == b"/") {
            continue;
        } else if dir == b".." && !ret.is_empty() && ret.as_ref() != b".." && !ret.ends_with(b"/..")
        {
            match memrchr(b'/', ret.as_ref()) {
                Some(index) => {
                    if index == 0 {
                        ret.truncate(1);
                    } else {
                        ret.truncate(index);
                    }
                }
                None => {
                    ret.truncate(0);
                }
            }
        } else if !dir.is_empty() {
            if !ret.is_empty() && !ret.ends_with(b"/") {
                ret.put_u8(b'/');
            }
            ret.put_slice(dir);
        }
    }
    ret.into()
}

#[derive(Debug, PartialEq, Eq)]
pub struct EndOfLine {
    pub line: Bytes,
    pub rest: Bytes,
    pub lf_cnt: i32,
}

pub fn find_end_of_line(buf: &Bytes) -> EndOfLine {
    let mut lf_cnt = 0;
    let mut e = 0usize;
    loop {
        if e >= buf.len() {
            break;
        }
        e += skip_until2(&buf[e..], b'\n', b'\\');
        if e >= buf.len() {
            assert!(buf.len() == e);
            break;
        }
        let c = &buf[e..];
        if c.starts_with(b"\0") {
            break;
        } else if c.starts_with(b"\\") {
            if c.starts_with(b"\\\n") {
                e += 2;
                lf_cnt += 1;
            } else if c.starts_with(b"\\\r\n") {
                e += 3;
                lf_cnt += 1;
            } else if c.starts_with(b"\\\\") {
                e += 2;
            } else {
                e += 1;
            }
        } else if c.starts_with(b"\n") {
            return EndOfLine {
                line: buf.slice(..e),
                rest: buf.slice(e + 1..),
                lf_cnt: lf_cnt + 1,
            };
        }
    }
    EndOfLine {
        line: buf.slice(..e),
        rest: buf.slice(e..),
        lf_cnt,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_word_scanner() {
        let ss = word_scanner(b"obj-y obj-m  lib-y").collect::<Vec<&[u8]>>();
        assert_eq!(ss, vec![b"obj-y".as_slice(), b"obj-m".as_slice(), b"lib-y".as_slice()]);

        let ss = word_scanner(b"").collect::<Vec<&[u8]>>();
        assert!(ss.is_empty());
    }

    #[test]
    fn test_trim_left_space() {
        assert_eq!(trim_left_space(b" \tfoo"), b"foo");
        assert_eq!(trim_left_space(b" \\\n bar"), b"bar");
        assert_eq!(trim_left_space(b" \\a bar"), b"\\a bar");
    }

    #[test]
    fn test_trim_suffix() {
        assert_eq!(trim_suffix(b"vmx-y", b"-y"), b"vmx");
        assert_eq!(trim_suffix(b"vmx", b"-y"), b"vmx");
        assert_eq!(trim_suffix(b"bar", b""), b"bar");
    }

    #[test]
    fn test_find_outside_paren() {
        assert_eq!(find_outside_paren(b"obj-y := a.o", b":="), Some(6));
        assert_eq!(find_outside_paren(b"obj-$(CONFIG_X:y=n) += a.o", b":="), Some(21));
        assert_eq!(find_outside_paren(b"a(b:c)d", b":"), None);
        assert_eq!(find_outside_paren(b"a\\:b:c", b":"), Some(4));
        assert_eq!(find_outside_paren(b"", b"a"), None);
    }

    #[test]
    fn test_split_words_outside_paren() {
        assert_eq!(
            split_words_outside_paren(b"a.o  b.o"),
            vec![b"a.o".as_slice(), b"b.o".as_slice()]
        );
        assert_eq!(
            split_words_outside_paren(b"$(addprefix foo/, a.o) b.o"),
            vec![b"$(addprefix foo/, a.o)".as_slice(), b"b.o".as_slice()]
        );
        assert!(split_words_outside_paren(b"  ").is_empty());
        assert_eq!(
            split_words_outside_paren(b"a.o \\\n\tb.o"),
            vec![b"a.o".as_slice(), b"b.o".as_slice()]
        );
    }

    #[test]
    fn test_find_close_paren() {
        assert_eq!(find_close_paren(b"CONFIG_X)", b'('), Some(8));
        assert_eq!(find_close_paren(b"a$(b)c)x", b'('), Some(6));
        assert_eq!(find_close_paren(b"never", b'('), None);
    }

    #[test]
    fn test_is_identifier() {
        assert!(is_identifier(b"SRCARCH"));
        assert!(is_identifier(b"CONFIG_64BIT"));
        assert!(!is_identifier(b""));
        assert!(!is_identifier(b"a b"));
        assert!(!is_identifier(b"foo/bar"));
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path(b""), "");
        assert_eq!(normalize_path(b"/tmp"), "/tmp");
        assert_eq!(normalize_path(b"a////b"), "a/b");
        assert_eq!(normalize_path(b"a//.//b"), "a/b");
        assert_eq!(normalize_path(b"a////b//../c/////"), "a/c");
        assert_eq!(normalize_path(b"./foo"), "foo");
        assert_eq!(normalize_path(b"x/y/..//../foo"), "foo");
        assert_eq!(normalize_path(b"/../foo"), "/foo");
    }

    #[test]
    fn test_find_end_of_line() {
        assert_eq!(
            find_end_of_line(&Bytes::from_static(b"foo\nbar")),
            EndOfLine {
                line: Bytes::from_static(b"foo"),
                rest: Bytes::from_static(b"bar"),
                lf_cnt: 1
            }
        );
        assert_eq!(
            find_end_of_line(&Bytes::from_static(b"foo\\\nbar\nbaz")),
            EndOfLine {
                line: Bytes::from_static(b"foo\\\nbar"),
                rest: Bytes::from_static(b"baz"),
                lf_cnt: 2
            }
        );
    }
}
