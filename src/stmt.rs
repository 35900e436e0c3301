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

use std::{fmt::Debug, sync::Arc};

use bytes::Bytes;
use parking_lot::Mutex;

use crate::expr::Word;
use crate::loc::Loc;

pub type Stmt = Arc<dyn Statement + Send + Sync>;

pub trait Statement: Debug {
    fn loc(&self) -> Loc;

    /// Calls `f` on every assignment in source order. Conditional blocks are
    /// not evaluated; both arms are visited.
    fn each_assign(&self, f: &mut dyn FnMut(&AssignStmt));
}

pub fn each_assign(stmts: &[Stmt], f: &mut dyn FnMut(&AssignStmt)) {
    for stmt in stmts {
        stmt.each_assign(f);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Eq,
    ColonEq,
    PlusEq,
    QuestionEq,
}

pub struct AssignStmt {
    loc: Loc,

    /// Literal LHS text, e.g. `obj-$(CONFIG_USB)` or `foo-objs`.
    pub lhs: Bytes,
    /// The Kconfig-like symbol captured inside `$(…)` on the LHS, if any.
    pub lhs_cond: Option<Bytes>,
    pub op: AssignOp,
    pub rhs: Vec<Word>,
}

impl Statement for AssignStmt {
    fn loc(&self) -> Loc {
        self.loc.clone()
    }

    fn each_assign(&self, f: &mut dyn FnMut(&AssignStmt)) {
        f(self)
    }
}

impl Debug for AssignStmt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "AssignStmt(lhs={:?} cond={:?} op={:?} rhs={:?} loc={})",
            String::from_utf8_lossy(&self.lhs),
            self.lhs_cond,
            self.op,
            self.rhs,
            self.loc
        )
    }
}

impl AssignStmt {
    pub fn new(
        loc: Loc,
        lhs: Bytes,
        lhs_cond: Option<Bytes>,
        op: AssignOp,
        rhs: Vec<Word>,
    ) -> Arc<AssignStmt> {
        Arc::new(AssignStmt {
            loc,
            lhs,
            lhs_cond,
            op,
            rhs,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CondOp {
    Ifeq,
    Ifneq,
    Ifdef,
    Ifndef,
}

/// An `ifeq`/`ifdef` block. The guard is kept for debugging only; the
/// resolver walks both arms unconditionally.
pub struct IfStmt {
    loc: Loc,

    pub op: CondOp,
    pub cond: Bytes,
    pub true_stmts: Arc<Mutex<Vec<Stmt>>>,
    pub false_stmts: Arc<Mutex<Vec<Stmt>>>,
}

impl Statement for IfStmt {
    fn loc(&self) -> Loc {
        self.loc.clone()
    }

    fn each_assign(&self, f: &mut dyn FnMut(&AssignStmt)) {
        for stmt in self.true_stmts.lock().iter() {
            stmt.each_assign(f);
        }
        for stmt in self.false_stmts.lock().iter() {
            stmt.each_assign(f);
        }
    }
}

impl Debug for IfStmt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "IfStmt(op={:?}, cond={:?} t={} f={} loc={})",
            self.op,
            String::from_utf8_lossy(&self.cond),
            self.true_stmts.lock().len(),
            self.false_stmts.lock().len(),
            self.loc
        )
    }
}

impl IfStmt {
    pub fn new(loc: Loc, op: CondOp, cond: Bytes) -> Arc<IfStmt> {
        Arc::new(IfStmt {
            loc,
            op,
            cond,
            true_stmts: Arc::new(Mutex::new(Vec::new())),
            false_stmts: Arc::new(Mutex::new(Vec::new())),
        })
    }
}

/// An `include`/`-include` line. Recorded, never followed.
pub struct IncludeStmt {
    loc: Loc,

    pub expr: Bytes,
    pub should_exist: bool,
}

impl Statement for IncludeStmt {
    fn loc(&self) -> Loc {
        self.loc.clone()
    }

    fn each_assign(&self, _f: &mut dyn FnMut(&AssignStmt)) {}
}

impl Debug for IncludeStmt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "IncludeStmt({:?}, loc={})",
            String::from_utf8_lossy(&self.expr),
            self.loc
        )
    }
}

impl IncludeStmt {
    pub fn new(loc: Loc, expr: Bytes, should_exist: bool) -> Arc<IncludeStmt> {
        Arc::new(IncludeStmt {
            loc,
            expr,
            should_exist,
        })
    }
}
