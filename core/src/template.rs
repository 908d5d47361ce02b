//! Message templates (`spec.md §3`, §4.4 "Template").
//!
//! A template is either a plain string (arity 0) or a string carrying named
//! placeholders `{like_this}` (one per required argument). This collapses the
//! source's "block of interleaved strings and get-words" into a single
//! string, the same collapse `thiserror`'s own `#[error("...")]` format
//! strings perform over their named fields (see `DESIGN.md`).

use crate::symbol::Symbol;
use crate::value::Value;
use smallvec::SmallVec;
use std::fmt;

/// Most catalog templates bind a handful of arguments at most (the builtin
/// catalog's widest template takes three); inlining up to four avoids a heap
/// allocation per template for the common case, the same small-vec-for-
/// small-arity tradeoff the teacher makes for its own fixed-width register
/// lists.
type ParamList = SmallVec<[Symbol; 4]>;

#[derive(Clone, Debug)]
pub struct Template {
    raw: String,
    /// Placeholder names in first-occurrence order; this is the template's
    /// arity and the order `make_error` consumes variadic arguments in.
    params: ParamList,
}

impl Template {
    /// Parses `raw`, extracting `{name}` placeholders. `{{`/`}}` escape a
    /// literal brace and do not count as a placeholder.
    pub fn parse(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let mut params = ParamList::new();
        let bytes = raw.as_bytes();
        let mut i = 0;
        while i < bytes.len() {
            match bytes[i] {
                b'{' if bytes.get(i + 1) == Some(&b'{') => i += 2,
                b'{' => {
                    if let Some(end) = raw[i + 1..].find('}') {
                        let name = &raw[i + 1..i + 1 + end];
                        if !name.is_empty() {
                            params.push(Symbol::intern(name));
                        }
                        i = i + 1 + end + 1;
                    } else {
                        i += 1;
                    }
                },
                _ => i += 1,
            }
        }
        Self { raw, params }
    }

    /// Number of named arguments this template requires.
    pub fn arity(&self) -> usize {
        self.params.len()
    }

    /// Placeholder names in the order they must be supplied to `make_error`.
    pub fn params(&self) -> &[Symbol] {
        &self.params
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Renders the template, substituting `{name}` placeholders by looking
    /// them up in `args`. A placeholder with no matching argument is left as
    /// a literal "?" rather than panicking, since message rendering must
    /// never fail (`spec.md §7`: a malformed field degrades, it does not
    /// crash).
    pub fn render(&self, args: &[(Symbol, Value)]) -> String {
        let mut out = String::with_capacity(self.raw.len());
        let bytes = self.raw.as_bytes();
        let mut i = 0;
        while i < bytes.len() {
            match bytes[i] {
                b'{' if bytes.get(i + 1) == Some(&b'{') => {
                    out.push('{');
                    i += 2;
                },
                b'}' if bytes.get(i + 1) == Some(&b'}') => {
                    out.push('}');
                    i += 2;
                },
                b'{' => {
                    if let Some(end) = self.raw[i + 1..].find('}') {
                        let name = &self.raw[i + 1..i + 1 + end];
                        let sym = Symbol::intern(name);
                        match args.iter().find(|(k, _)| *k == sym) {
                            Some((_, v)) => {
                                use fmt::Write;
                                let _ = write!(out, "{v}");
                            },
                            None => out.push('?'),
                        }
                        i = i + 1 + end + 1;
                    } else {
                        out.push('{');
                        i += 1;
                    }
                },
                b if b < 0x80 => {
                    out.push(b as char);
                    i += 1;
                },
                _ => {
                    // Advance by one UTF-8 scalar; multi-byte sequences are
                    // copied verbatim since we're walking bytes.
                    let ch = self.raw[i..].chars().next().unwrap_or('\u{fffd}');
                    out.push(ch);
                    i += ch.len_utf8();
                },
            }
        }
        out
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
