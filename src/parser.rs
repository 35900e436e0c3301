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

//! Two-pass Makefile parser. The fast pass assumes the file is unambiguous
//! kernel Kbuild dialect and cancels on the first construct it cannot
//! predict; the full pass re-reads the same tokens, reports diagnostics with
//! an underline of the offending token, recovers, and counts errors. Both
//! passes build identical statement lists on success.

use std::os::unix::ffi::OsStrExt;
use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;
use memchr::memchr3;
use parking_lot::Mutex;

use crate::error::Error;
use crate::expr::{Word, parse_word};
use crate::loc::{Diagnostic, Loc};
use crate::stmt::{AssignOp, AssignStmt, CondOp, IfStmt, IncludeStmt, Stmt};
use crate::strutil::{
    find_close_paren, find_end_of_line, find_outside_paren, split_words_outside_paren,
    trim_left_space, trim_right_space, trim_space,
};
use crate::symtab::{Symbol, intern};
use crate::{log, vlog};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Fast,
    Full,
}

/// Fast-pass bail-out; the caller restarts in `Mode::Full`.
struct Cancelled;

type ParseResult<T = ()> = Result<T, Cancelled>;

struct IfState {
    stmt: Arc<IfStmt>,
    is_in_else: bool,
    num_nest: i32,
}

struct Parser {
    buf: Bytes,
    l: usize,
    mode: Mode,
    // Represents if we just parsed a rule; its tab-indented command lines
    // are swallowed without being statements.
    after_rule: bool,

    stmts: Arc<Mutex<Vec<Stmt>>>,
    out_stmts: Arc<Mutex<Vec<Stmt>>>,

    define_name: Option<Bytes>,
    num_define_nest: i32,

    num_if_nest: i32,
    if_stack: Vec<IfState>,

    loc: Loc,
    cur_line: Bytes,
    num_errors: usize,
}

impl Parser {
    fn with_buf(buf: &Bytes, loc: Loc, mode: Mode) -> Self {
        let stmts = Arc::new(Mutex::new(Vec::new()));
        Self {
            buf: buf.clone(),
            l: 0,
            mode,
            after_rule: false,

            stmts: stmts.clone(),
            out_stmts: stmts,

            define_name: None,
            num_define_nest: 0,

            num_if_nest: 0,
            if_stack: Vec::new(),

            loc,
            cur_line: Bytes::new(),
            num_errors: 0,
        }
    }

    fn error(
        &mut self,
        rule: &'static str,
        column: usize,
        token_len: usize,
        message: String,
    ) -> ParseResult {
        if self.mode == Mode::Fast {
            return Err(Cancelled);
        }
        let diag = Diagnostic {
            loc: self.loc.clone(),
            column,
            message,
            rule_stack: vec!["makefile", "line", rule],
            line_text: self.cur_line.clone(),
            token_start: column,
            token_len,
        };
        diag.report();
        self.num_errors += 1;
        Ok(())
    }

    fn parse(&mut self) -> ParseResult {
        self.l = 0;
        let buf = self.buf.clone();

        while self.l < buf.len() {
            let eol = find_end_of_line(&buf.slice(self.l..));
            let new_l = self.l + eol.line.len();
            self.loc.line += 1;
            let mut line = eol.line;
            if line.ends_with(b"\r") {
                line.truncate(line.len() - 1);
            }
            self.cur_line = line.clone();
            self.parse_line(line)?;
            self.loc.line += eol.lf_cnt - 1;
            if new_l == buf.len() {
                break;
            }
            self.l = new_l + 1
        }

        if !self.if_stack.is_empty() {
            self.error("endif", 0, 1, "*** missing `endif'.".to_string())?;
            self.if_stack.clear();
        }
        if self.define_name.is_some() {
            self.error(
                "define",
                0,
                1,
                "*** missing `endef', unterminated `define'.".to_string(),
            )?;
            self.define_name = None;
        }

        Ok(())
    }

    fn parse_line(&mut self, line: Bytes) -> ParseResult {
        if self.define_name.is_some() {
            return self.parse_inside_define(line);
        }

        if line.is_empty() || &*line == b"\r" {
            return Ok(());
        }

        if line.starts_with(b"\t") {
            if self.after_rule {
                // A command of the previous rule; nothing the resolver cares
                // about.
                return Ok(());
            }
            return self.error(
                "command",
                0,
                1,
                "*** commands commence before first target.".to_string(),
            );
        }

        let line = line.slice_ref(trim_left_space(&line));

        if line.starts_with(b"#") {
            return Ok(());
        }

        if self.handle_make_directive(&line)? {
            return Ok(());
        }

        self.parse_rule_or_assign(line)
    }

    fn parse_rule_or_assign(&mut self, line: Bytes) -> ParseResult {
        let Some(sep) = find_outside_paren(line.as_ref(), b":=;") else {
            return self.parse_rule(line);
        };
        let s = &line[sep..];
        if s.starts_with(b";") {
            return self.parse_rule(line);
        } else if s.starts_with(b"=") {
            return self.parse_assign(line, sep);
        } else if s[1..].starts_with(b"=") {
            return self.parse_assign(line, sep + 1);
        } else if s.starts_with(b":") {
            return self.parse_rule(line);
        }
        unreachable!()
    }

    /// Rules and their targets carry no Kconfig information; they are
    /// recognized only so their command block can be skipped.
    fn parse_rule(&mut self, line: Bytes) -> ParseResult {
        let line = line.slice_ref(trim_left_space(&line));
        if line.is_empty() {
            return Ok(());
        }
        self.after_rule = true;
        Ok(())
    }

    fn parse_assign(&mut self, line: Bytes, separator_pos: usize) -> ParseResult {
        if separator_pos == 0 {
            return self.error("assign", 0, 1, "*** empty variable name ***".to_string());
        }
        let assign = parse_assign_statement(&line, separator_pos);
        let lhs = line.slice_ref(assign.lhs);
        let lhs_cond = capture_lhs_cond(&lhs);

        let rhs_text = line.slice_ref(assign.rhs);
        let rhs_text = match find_outside_paren(&rhs_text, b"#") {
            Some(comment) => rhs_text.slice(..comment),
            None => rhs_text,
        };

        let mut rhs: Vec<Word> = Vec::new();
        for word in split_words_outside_paren(&rhs_text) {
            if let Some(open) = unterminated_reference(word) {
                let column = line.len() - rhs_text.len() + open;
                self.error(
                    "word",
                    column.min(self.cur_line.len()),
                    word.len() - open,
                    "unterminated variable reference".to_string(),
                )?;
                // Recovery: drop the whole assignment, keep parsing.
                return Ok(());
            }
            rhs.push(parse_word(&rhs_text.slice_ref(word)));
        }

        self.after_rule = false;
        self.out_stmts.lock().push(AssignStmt::new(
            self.loc.clone(),
            lhs,
            lhs_cond,
            assign.op,
            rhs,
        ));
        Ok(())
    }

    fn parse_include(&mut self, line: Bytes, directive: &[u8]) -> ParseResult {
        self.out_stmts.lock().push(IncludeStmt::new(
            self.loc.clone(),
            line,
            !directive.starts_with(b"-") && !directive.starts_with(b"s"),
        ));
        self.after_rule = false;
        Ok(())
    }

    fn parse_define(&mut self, line: Bytes) -> ParseResult {
        if line.is_empty() {
            return self.error("define", 0, 1, "*** empty variable name.".to_string());
        }
        self.define_name = Some(line);
        self.num_define_nest = 1;
        self.after_rule = false;
        Ok(())
    }

    /// `define` bodies are canned command text; they are skipped wholesale.
    fn parse_inside_define(&mut self, line: Bytes) -> ParseResult {
        let line = line.slice_ref(trim_left_space(&line));
        let directive = Parser::get_directive(&line);
        if directive == b"define" {
            self.num_define_nest += 1;
        } else if directive == b"endef" {
            self.num_define_nest -= 1;
        }
        if self.num_define_nest > 0 {
            return Ok(());
        }

        let rest = trim_right_space(Parser::remove_comment(trim_left_space(
            &line["endef".len()..],
        )));
        if !rest.is_empty() {
            crate::warn!(
                "{}: extraneous text after `endef' directive",
                self.loc
            );
        }
        self.define_name = None;
        Ok(())
    }

    fn enter_if(&mut self, stmt: Arc<IfStmt>) {
        self.if_stack.push(IfState {
            stmt: stmt.clone(),
            is_in_else: false,
            num_nest: self.num_if_nest,
        });
        self.out_stmts = stmt.true_stmts.clone();
    }

    fn parse_ifdef(&mut self, line: Bytes, directive: &[u8]) -> ParseResult {
        let op = if directive[2] == b'n' {
            CondOp::Ifndef
        } else {
            CondOp::Ifdef
        };
        if line.is_empty() {
            self.error(
                "ifdef",
                0,
                1,
                "*** invalid syntax in conditional.".to_string(),
            )?;
        }
        let stmt = IfStmt::new(self.loc.clone(), op, line);
        self.out_stmts.lock().push(stmt.clone());
        self.enter_if(stmt);
        Ok(())
    }

    fn parse_ifeq(&mut self, line: Bytes, directive: &[u8]) -> ParseResult {
        let op = if directive[2] == b'n' {
            CondOp::Ifneq
        } else {
            CondOp::Ifeq
        };

        if !valid_cond_syntax(&line) {
            self.error(
                "ifeq",
                self.cur_line.len() - line.len().min(self.cur_line.len()),
                line.len().max(1),
                "*** invalid syntax in conditional.".to_string(),
            )?;
        }

        // The guard is never evaluated; keep it verbatim and descend so the
        // conditional structure stays balanced even after a syntax error.
        let stmt = IfStmt::new(self.loc.clone(), op, line);
        self.out_stmts.lock().push(stmt.clone());
        self.enter_if(stmt);
        Ok(())
    }

    fn parse_else(&mut self, line: Bytes) -> ParseResult {
        if !self.check_if_stack("else")? {
            return Ok(());
        }
        if self.if_stack.last().unwrap().is_in_else {
            return self.error(
                "else",
                0,
                4,
                "*** only one `else' per conditional.".to_string(),
            );
        }
        let st = self.if_stack.last_mut().unwrap();
        st.is_in_else = true;
        self.out_stmts = st.stmt.false_stmts.clone();
        let num_nest = st.num_nest;

        let next_if = trim_left_space(&line);
        if next_if.is_empty() {
            return Ok(());
        }

        self.num_if_nest = num_nest + 1;
        if !self.handle_else_if_directive(&line.slice_ref(next_if))? {
            crate::warn!("{}: extraneous text after `else' directive", self.loc);
        }
        self.num_if_nest = 0;
        Ok(())
    }

    fn parse_endif(&mut self, line: Bytes) -> ParseResult {
        if !self.check_if_stack("endif")? {
            return Ok(());
        }
        if !line.is_empty() {
            self.error(
                "endif",
                0,
                line.len(),
                "extraneous text after `endif` directive".to_string(),
            )?;
        }
        let num_nest = self.if_stack.last().unwrap().num_nest;
        for _ in 0..=num_nest {
            self.if_stack.pop();
        }
        if let Some(st) = self.if_stack.last() {
            if st.is_in_else {
                self.out_stmts = st.stmt.false_stmts.clone();
            } else {
                self.out_stmts = st.stmt.true_stmts.clone();
            }
        } else {
            self.out_stmts = self.stmts.clone();
        }
        Ok(())
    }

    /// `export`/`override` may prefix an assignment; anything else on the
    /// line is irrelevant here.
    fn parse_assign_prefix(&mut self, line: Bytes) -> ParseResult {
        if self.handle_make_directive(&line)? {
            return Ok(());
        }
        if find_outside_paren(&line, b"=").is_some() {
            return self.parse_rule_or_assign(line);
        }
        Ok(())
    }

    fn check_if_stack(&mut self, keyword: &'static str) -> ParseResult<bool> {
        if self.if_stack.is_empty() {
            self.error(
                keyword,
                0,
                keyword.len(),
                format!("*** extraneous `{keyword}'."),
            )?;
            return Ok(false);
        }
        Ok(true)
    }

    fn remove_comment(line: &[u8]) -> &[u8] {
        if let Some(i) = find_outside_paren(line, b"#") {
            return &line[..i];
        }
        line
    }

    fn get_directive(line: &[u8]) -> &[u8] {
        if line.len() < 4 {
            return &[];
        }
        let l = &line[0..9.min(line.len())];
        if let Some(i) = memchr3(b' ', b'\t', b'#', l) {
            return &l[..i];
        }
        l
    }

    fn handle_make_directive(&mut self, line: &Bytes) -> ParseResult<bool> {
        let directive = Parser::get_directive(line);
        let rest = line.slice_ref(trim_right_space(Parser::remove_comment(trim_left_space(
            &line[directive.len()..],
        ))));
        match directive {
            b"include" | b"-include" | b"sinclude" => self.parse_include(rest, directive)?,
            b"define" => self.parse_define(rest)?,
            b"ifdef" | b"ifndef" => self.parse_ifdef(rest, directive)?,
            b"ifeq" | b"ifneq" => self.parse_ifeq(rest, directive)?,
            b"else" => self.parse_else(rest)?,
            b"endif" => self.parse_endif(rest)?,
            b"override" | b"export" => self.parse_assign_prefix(rest)?,
            b"unexport" => {}
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn handle_else_if_directive(&mut self, line: &Bytes) -> ParseResult<bool> {
        let directive = Parser::get_directive(line);
        let rest = line.slice_ref(trim_right_space(Parser::remove_comment(trim_left_space(
            &line[directive.len()..],
        ))));
        match directive {
            b"ifdef" | b"ifndef" => self.parse_ifdef(rest, directive)?,
            b"ifeq" | b"ifneq" => self.parse_ifeq(rest, directive)?,
            _ => return Ok(false),
        }
        Ok(true)
    }
}

struct ParsedAssign<'a> {
    lhs: &'a [u8],
    rhs: &'a [u8],
    op: AssignOp,
}

fn parse_assign_statement(line: &[u8], sep: usize) -> ParsedAssign<'_> {
    assert!(sep != 0);
    let mut op = AssignOp::Eq;
    let mut lhs = &line[..sep];
    if lhs.ends_with(b":") {
        lhs = &lhs[..lhs.len() - 1];
        op = AssignOp::ColonEq;
    } else if lhs.ends_with(b"+") {
        lhs = &lhs[..lhs.len() - 1];
        op = AssignOp::PlusEq;
    } else if lhs.ends_with(b"?") {
        lhs = &lhs[..lhs.len() - 1];
        op = AssignOp::QuestionEq;
    }
    lhs = trim_space(lhs);
    let rhs = trim_left_space(&line[line.len().min(sep + 1)..]);
    ParsedAssign { lhs, rhs, op }
}

/// The Kconfig-like symbol of an `obj-$(CONFIG_FOO)` LHS.
fn capture_lhs_cond(lhs: &Bytes) -> Option<Bytes> {
    let mut i = 0usize;
    while i + 1 < lhs.len() {
        if lhs[i] == b'$' && (lhs[i + 1] == b'(' || lhs[i + 1] == b'{') {
            let close = find_close_paren(&lhs[i + 2..], lhs[i + 1])?;
            let body = lhs.slice(i + 2..i + 2 + close);
            if crate::strutil::is_identifier(&body) {
                return Some(body);
            }
            i += 2 + close + 1;
            continue;
        }
        i += 1;
    }
    None
}

fn unterminated_reference(word: &[u8]) -> Option<usize> {
    let mut i = 0usize;
    while i + 1 < word.len() {
        if word[i] == b'$' && (word[i + 1] == b'(' || word[i + 1] == b'{') {
            match find_close_paren(&word[i + 2..], word[i + 1]) {
                Some(close) => i += 2 + close + 1,
                None => return Some(i),
            }
            continue;
        }
        i += 1;
    }
    None
}

fn valid_cond_syntax(line: &[u8]) -> bool {
    if line.is_empty() {
        return false;
    }
    if line[0] == b'(' {
        let Some(close) = find_close_paren(&line[1..], b'(') else {
            return false;
        };
        return find_outside_paren(&line[1..close + 1], b",").is_some();
    }
    let quote = line[0];
    if quote != b'\'' && quote != b'"' {
        return false;
    }
    memchr::memchr(quote, &line[1..]).is_some()
}

fn run_pass(buf: &Bytes, loc: Loc, mode: Mode) -> Result<(Vec<Stmt>, usize), Cancelled> {
    let mut p = Parser::with_buf(buf, loc, mode);
    p.parse()?;
    let stmts = std::mem::take(&mut *p.stmts.lock());
    Ok((stmts, p.num_errors))
}

/// Parses a buffer with the fast pass, falling back to the diagnosing full
/// pass on cancellation.
pub fn parse_buf(buf: &Bytes, filename: Symbol) -> Result<Vec<Stmt>, Error> {
    let loc = Loc { filename, line: 0 };
    match run_pass(buf, loc.clone(), Mode::Fast) {
        Ok((stmts, _)) => {
            log!("parsed {filename}: {} statements", stmts.len());
            Ok(stmts)
        }
        Err(Cancelled) => {
            vlog!(1, "{filename}: fast parse not enough, trying full parse");
            let Ok((stmts, errors)) = run_pass(buf, loc, Mode::Full) else {
                unreachable!("full pass never cancels");
            };
            if errors > 0 {
                crate::warn!("{filename}: full parse failed too: {errors} errors");
                return Err(Error::ParseFailure {
                    file: filename.to_string().into(),
                    errors,
                });
            }
            Ok(stmts)
        }
    }
}

pub fn parse_file(path: &Path) -> Result<Vec<Stmt>, Error> {
    let buf = std::fs::read(path).map_err(|source| Error::FileNotFound {
        path: path.to_path_buf(),
        source,
    })?;
    let filename = intern(path.as_os_str().as_bytes().to_vec());
    parse_buf(&Bytes::from(buf), filename)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stmt::each_assign;

    fn parse(input: &'static [u8]) -> Result<Vec<Stmt>, Error> {
        parse_buf(&Bytes::from_static(input), intern("<test>"))
    }

    fn assigns(stmts: &[Stmt]) -> Vec<(String, Option<String>, usize)> {
        let mut out = Vec::new();
        each_assign(stmts, &mut |a| {
            out.push((
                String::from_utf8_lossy(&a.lhs).into_owned(),
                a.lhs_cond
                    .as_ref()
                    .map(|c| String::from_utf8_lossy(c).into_owned()),
                a.rhs.len(),
            ));
        });
        out
    }

    #[test]
    fn test_get_directive() {
        assert_eq!(Parser::get_directive(b"ifdef VAR"), b"ifdef");
        assert_eq!(Parser::get_directive(b"endif"), b"endif");
        assert_eq!(Parser::get_directive(b"obj"), b"");
    }

    #[test]
    fn test_parse_simple_assigns() {
        let stmts = parse(b"obj-y := fork.o exec.o\nobj-$(CONFIG_SMP) += smp.o\n").unwrap();
        let a = assigns(&stmts);
        assert_eq!(
            a,
            vec![
                ("obj-y".to_string(), None, 2),
                (
                    "obj-$(CONFIG_SMP)".to_string(),
                    Some("CONFIG_SMP".to_string()),
                    1
                ),
            ]
        );
    }

    #[test]
    fn test_parse_continuation() {
        let stmts = parse(b"obj-y := a.o \\\n\tb.o c.o\n").unwrap();
        assert_eq!(assigns(&stmts), vec![("obj-y".to_string(), None, 3)]);
    }

    #[test]
    fn test_parse_conditional_structure() {
        let stmts = parse(
            b"ifeq ($(CONFIG_X),y)\nobj-y += a.o\nelse\nobj-y += b.o\nendif\nobj-m += c.o\n",
        )
        .unwrap();
        // Both arms are visited.
        assert_eq!(assigns(&stmts).len(), 3);
        assert_eq!(stmts.len(), 2);
    }

    #[test]
    fn test_parse_else_if_chain() {
        let stmts = parse(
            b"ifdef A\nobj-y += a.o\nelse ifdef B\nobj-y += b.o\nelse\nobj-y += c.o\nendif\n",
        )
        .unwrap();
        assert_eq!(assigns(&stmts).len(), 3);
    }

    #[test]
    fn test_rules_and_commands_are_skipped() {
        let stmts = parse(b"all: vmlinux\n\t$(CC) -o $@ $<\nobj-y += init.o\n").unwrap();
        assert_eq!(assigns(&stmts), vec![("obj-y".to_string(), None, 1)]);
    }

    #[test]
    fn test_define_body_is_skipped() {
        let stmts = parse(b"define rule_cc\n\tfoo := bar\nendef\nobj-y += a.o\n").unwrap();
        assert_eq!(assigns(&stmts).len(), 1);
    }

    #[test]
    fn test_include_is_recorded_not_followed() {
        let stmts = parse(b"include scripts/Makefile.lib\n").unwrap();
        assert_eq!(stmts.len(), 1);
        assert!(assigns(&stmts).is_empty());
    }

    #[test]
    fn test_export_assign() {
        let stmts = parse(b"export KBUILD_LDS := arch/x86/kernel/vmlinux.lds\n").unwrap();
        assert_eq!(assigns(&stmts), vec![("KBUILD_LDS".to_string(), None, 1)]);
    }

    #[test]
    fn test_comment_in_rhs() {
        let stmts = parse(b"obj-y := a.o # b.o never built\n").unwrap();
        assert_eq!(assigns(&stmts), vec![("obj-y".to_string(), None, 1)]);
    }

    #[test]
    fn test_stray_endif_fails_both_passes() {
        assert!(matches!(
            parse(b"endif\n"),
            Err(Error::ParseFailure { errors: 1, .. })
        ));
    }

    #[test]
    fn test_missing_endif_fails() {
        assert!(matches!(
            parse(b"ifdef CONFIG_X\nobj-y += a.o\n"),
            Err(Error::ParseFailure { .. })
        ));
    }

    #[test]
    fn test_unterminated_reference_fails() {
        assert!(matches!(
            parse(b"obj-y += $(CONFIG_X.o\n"),
            Err(Error::ParseFailure { .. })
        ));
    }
}
