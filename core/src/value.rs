//! The runtime's value cell (`spec.md §3`).
//!
//! A real interpreter's cell is a fixed-size tagged union with a 32-bit
//! header; in Rust the enum discriminant *is* that header; there is no
//! separate uninitialized/forbidden-to-read state to track; every `Value` is
//! constructed as a valid member of the enum by construction.

use std::fmt;
use std::sync::Arc;

use crate::array::Array;
use crate::symbol::Symbol;

/// The universal value type.
#[derive(Clone, Debug)]
pub enum Value {
    /// The "no value" placeholder used for unset optional slots.
    Blank,
    /// A true/false value.
    Logic(bool),
    /// A signed integer.
    Integer(i64),
    /// An interned word (category names, ids, labels, filenames).
    Word(Symbol),
    /// An immutable UTF-8 string.
    String(Arc<str>),
    /// A nested, growable sequence of cells.
    Block(Array),
}

impl Value {
    pub fn word(s: &str) -> Self {
        Value::Word(Symbol::intern(s))
    }

    pub fn string(s: impl Into<Arc<str>>) -> Self {
        Value::String(s.into())
    }

    pub fn is_blank(&self) -> bool {
        matches!(self, Value::Blank)
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_word(&self) -> Option<Symbol> {
        match self {
            Value::Word(w) => Some(*w),
            _ => None,
        }
    }

    pub fn as_string(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_block(&self) -> Option<&Array> {
        match self {
            Value::Block(a) => Some(a),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Blank => write!(f, ""),
            Value::Logic(b) => write!(f, "{b}"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Word(w) => write!(f, "{w}"),
            Value::String(s) => write!(f, "{s}"),
            Value::Block(a) => {
                write!(f, "[")?;
                for (i, cell) in a.cells().iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{cell}")?;
                }
                write!(f, "]")
            },
        }
    }
}

/// Structural equality for cells used by `ErrorValue` equality (`spec.md §4.4`):
/// same kind and same payload. `Block` equality recurses structurally.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Blank, Value::Blank) => true,
            (Value::Logic(a), Value::Logic(b)) => a == b,
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Word(a), Value::Word(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Block(a), Value::Block(b)) => a.cells() == b.cells(),
            _ => false,
        }
    }
}
