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

//! Interned strings for Makefile paths and identifiers. A `Symbol` is a
//! cheap-to-copy handle; the table only ever grows and lives for the whole
//! process.

use std::{
    collections::HashMap,
    fmt::{Debug, Display},
    num::NonZeroUsize,
    sync::LazyLock,
};

use bytes::Bytes;
use parking_lot::Mutex;

static SYMTAB: LazyLock<Mutex<Symtab>> = LazyLock::new(|| Mutex::new(Symtab::new()));

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Symbol(NonZeroUsize);

impl Display for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let r = SYMTAB.lock();
        write!(f, "{}", String::from_utf8_lossy(&r.symbols[self.0.get()]))
    }
}

impl Debug for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let r = SYMTAB.lock();
        write!(f, "{:?}({})", r.symbols[self.0.get()], self.0.get())
    }
}

impl Symbol {
    pub fn as_bytes(&self) -> Bytes {
        let r = SYMTAB.lock();
        r.symbols[self.0.get()].clone()
    }
}

struct Symtab {
    symbols: Vec<Bytes>,
    symtab: HashMap<Bytes, Symbol>,
}

impl Symtab {
    fn new() -> Self {
        // Index 0 is unusable with NonZeroUsize; park an empty entry there.
        Self {
            symbols: vec![Bytes::new()],
            symtab: HashMap::new(),
        }
    }

    fn intern<T: Into<Bytes> + AsRef<[u8]>>(&mut self, s: T) -> Symbol {
        let s = s.into();
        if let Some(sym) = self.symtab.get(&s) {
            return *sym;
        }
        let sym = Symbol(NonZeroUsize::new(self.symbols.len()).unwrap());
        self.symbols.push(s.clone());
        self.symtab.insert(s, sym);
        sym
    }
}

pub fn intern<T: Into<Bytes> + AsRef<[u8]>>(s: T) -> Symbol {
    let mut w = SYMTAB.lock();
    w.intern(s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intern() {
        let sym = intern("foo");
        let sym2 = intern("bar");
        let sym3 = intern("foo");
        assert_ne!(sym, sym2);
        assert_eq!(sym, sym3);
    }

    #[test]
    fn test_symbol_to_string() {
        let sym = intern("obj-y");
        assert_eq!(sym.to_string(), "obj-y");
        assert_eq!(sym.as_bytes(), Bytes::from_static(b"obj-y"));
    }
}
