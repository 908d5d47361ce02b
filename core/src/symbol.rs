//! Interned words.
//!
//! Category names, error ids, `where`-block labels, and origin filenames are
//! all interned so that comparing two symbols is a pointer-free integer
//! compare rather than a string compare. The interner is process-wide and
//! append-only, owned by the current thread only (`spec.md §5`: no locks),
//! matching the `#[thread_local]` idiom used for other process-wide runtime
//! state in this codebase's ancestry.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;

thread_local! {
    static INTERNER: RefCell<Interner> = RefCell::new(Interner::new());
}

struct Interner {
    strings: Vec<Box<str>>,
    lookup: HashMap<Box<str>, u32>,
}

impl Interner {
    fn new() -> Self {
        Self { strings: Vec::new(), lookup: HashMap::new() }
    }

    fn intern(&mut self, s: &str) -> u32 {
        if let Some(&id) = self.lookup.get(s) {
            return id;
        }
        let id = self.strings.len() as u32;
        let boxed: Box<str> = s.into();
        self.strings.push(boxed.clone());
        self.lookup.insert(boxed, id);
        id
    }

    fn resolve(&self, id: u32) -> &str {
        &self.strings[id as usize]
    }
}

/// An interned word. Cheap to copy and compare; resolves back to its spelling
/// through the thread-local interner table.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Symbol(u32);

impl Symbol {
    /// Interns `s`, returning the symbol for it (a repeat of an existing
    /// spelling returns the same symbol).
    pub fn intern(s: &str) -> Self {
        INTERNER.with(|i| Symbol(i.borrow_mut().intern(s)))
    }

    /// Returns the spelling this symbol was interned from.
    pub fn as_str(&self) -> &'static str {
        INTERNER.with(|i| {
            // SAFETY: the interner is append-only and thread-local; entries
            // are never removed or reallocated out from under a live Symbol,
            // so the returned &str lives as long as the thread does.
            let s = i.borrow().resolve(self.0);
            unsafe { std::mem::transmute::<&str, &'static str>(s) }
        })
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}", self.as_str())
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The marker word placed at the exact failure index in a `near` block
/// (`spec.md §9` "Near-block marker").
pub fn near_marker() -> Symbol {
    Symbol::intern("??")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_is_idempotent() {
        let a = Symbol::intern("invalid-arg");
        let b = Symbol::intern("invalid-arg");
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "invalid-arg");
    }

    #[test]
    fn distinct_spellings_are_distinct() {
        let a = Symbol::intern("foo");
        let b = Symbol::intern("bar");
        assert_ne!(a, b);
    }
}
