//! The structured error object (`spec.md §3` Error object, §4.4, and the
//! non-block cases of the §4.5 user-mode constructor).

use std::sync::Arc;

use itertools::Itertools;

use crate::array::{Array, ArrayFlags};
use crate::catalog::with_catalog;
use crate::context::Context;
use crate::symbol::Symbol;
use crate::template::Template;
use crate::value::Value;
use crate::USER_CODE;

// Fixed 1-based slot positions, per `spec.md §3`.
const SLOT_CODE: usize = 1;
const SLOT_TYPE: usize = 2;
const SLOT_ID: usize = 3;
const SLOT_MESSAGE: usize = 4;
const SLOT_NEAR: usize = 5;
const SLOT_WHERE: usize = 6;
const SLOT_FILE: usize = 7;
const SLOT_LINE: usize = 8;
/// Named template arguments start right after the eight fixed slots.
pub const FIRST_ARG_SLOT: usize = 9;

#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum BuildError {
    #[error("error code {0} does not match its declared type/id in the catalog")]
    #[diagnostic(help("either omit the explicit code or supply a (type, id) pair the catalog actually defines"))]
    CodeTypeIdMismatch(i32),

    #[error("(type: {0}, id: {1}) does not resolve in the error catalog")]
    UnresolvedTypeId(String, String),

    #[error("USER_CODE ({0}) may not be used as an explicit error code")]
    UserCodeIsReserved(i32),

    #[error("value of type {0} cannot be converted into an error")]
    InvalidErrorInput(&'static str),
}

/// A structured error object: the eight fixed slots plus any named template
/// arguments bound after construction.
#[derive(Clone, Debug)]
pub struct ErrorValue {
    ctx: Context,
}

impl ErrorValue {
    /// An error object with all eight fixed slots blank and no arguments.
    pub fn blank_template() -> Self {
        // Fixed slot names, matching `spec.md §3`'s table; these are purely
        // descriptive keys, the 1-based positions are what callers rely on.
        let names = ["code", "type", "id", "message", "near", "where", "file", "line"];
        let mut ctx = Context::new();
        for name in names {
            ctx.push(Symbol::intern(name), Value::Blank);
        }
        Self { ctx }
    }

    pub fn code(&self) -> Option<i32> {
        match self.ctx.slot(SLOT_CODE)? {
            Value::Integer(i) => Some(*i as i32),
            _ => None,
        }
    }

    pub fn category(&self) -> Option<Symbol> {
        self.ctx.slot(SLOT_TYPE)?.as_word()
    }

    pub fn id(&self) -> Option<Symbol> {
        self.ctx.slot(SLOT_ID)?.as_word()
    }

    pub fn message_value(&self) -> Option<&Value> {
        self.ctx.slot(SLOT_MESSAGE)
    }

    pub fn near(&self) -> Option<&Array> {
        self.ctx.slot(SLOT_NEAR)?.as_block()
    }

    pub fn where_block(&self) -> Option<&Array> {
        self.ctx.slot(SLOT_WHERE)?.as_block()
    }

    pub fn file(&self) -> Option<Symbol> {
        self.ctx.slot(SLOT_FILE)?.as_word()
    }

    pub fn line(&self) -> Option<i64> {
        self.ctx.slot(SLOT_LINE)?.as_integer()
    }

    pub fn args(&self) -> impl Iterator<Item = (Symbol, &Value)> {
        self.ctx.iter().skip(FIRST_ARG_SLOT - 1)
    }

    pub fn arg(&self, name: Symbol) -> Option<&Value> {
        self.args().find(|(k, _)| *k == name).map(|(_, v)| v)
    }

    pub fn set_code(&mut self, v: Option<i32>) {
        *self.ctx.slot_mut(SLOT_CODE).unwrap() = v.map(|i| Value::Integer(i as i64)).unwrap_or(Value::Blank);
    }

    pub fn set_category(&mut self, v: Option<Symbol>) {
        *self.ctx.slot_mut(SLOT_TYPE).unwrap() = v.map(Value::Word).unwrap_or(Value::Blank);
    }

    pub fn set_id(&mut self, v: Option<Symbol>) {
        *self.ctx.slot_mut(SLOT_ID).unwrap() = v.map(Value::Word).unwrap_or(Value::Blank);
    }

    pub fn set_message(&mut self, v: Value) {
        *self.ctx.slot_mut(SLOT_MESSAGE).unwrap() = v;
    }

    pub fn set_near(&mut self, v: Array) {
        *self.ctx.slot_mut(SLOT_NEAR).unwrap() = Value::Block(v);
    }

    pub fn set_where(&mut self, labels: Vec<Symbol>) {
        let cells = labels.into_iter().map(Value::Word).collect();
        *self.ctx.slot_mut(SLOT_WHERE).unwrap() =
            Value::Block(Array::with_flags(cells, ArrayFlags::empty()));
    }

    pub fn set_file(&mut self, v: Option<Symbol>) {
        *self.ctx.slot_mut(SLOT_FILE).unwrap() = v.map(Value::Word).unwrap_or(Value::Blank);
    }

    pub fn set_line(&mut self, v: Option<i64>) {
        *self.ctx.slot_mut(SLOT_LINE).unwrap() = v.map(Value::Integer).unwrap_or(Value::Blank);
    }

    /// Appends a new named argument slot (used by `make_error` when filling
    /// template placeholders, `spec.md §4.5` step 4).
    pub fn push_arg(&mut self, name: Symbol, value: Value) {
        self.ctx.push(name, value);
    }

    pub fn context(&self) -> &Context {
        &self.ctx
    }

    /// Validates and, where possible, completes the (code, type, id) triple
    /// against the catalog, per `spec.md §3`'s invariants.
    pub fn validate_and_fill(&mut self) -> Result<(), BuildError> {
        match (self.code(), self.category(), self.id()) {
            (Some(code), _, _) if code == USER_CODE => {
                Err(BuildError::UserCodeIsReserved(USER_CODE))
            },
            (Some(code), _, _) if code < USER_CODE => with_catalog(|cat| {
                match cat.lookup(code) {
                    Some((cat_word, id_word, _)) => {
                        if let Some(existing) = self.category() {
                            if existing != cat_word {
                                return Err(BuildError::CodeTypeIdMismatch(code));
                            }
                        }
                        if let Some(existing) = self.id() {
                            if existing != id_word {
                                return Err(BuildError::CodeTypeIdMismatch(code));
                            }
                        }
                        self.set_category(Some(cat_word));
                        self.set_id(Some(id_word));
                        Ok(())
                    },
                    None => Err(BuildError::CodeTypeIdMismatch(code)),
                }
            }),
            (None, Some(cat_word), Some(id_word)) => with_catalog(|cat| {
                match cat.resolve(cat_word, id_word) {
                    Some(code) => {
                        self.set_code(Some(code));
                        Ok(())
                    },
                    None => Err(BuildError::UnresolvedTypeId(
                        cat_word.as_str().to_string(),
                        id_word.as_str().to_string(),
                    )),
                }
            }),
            _ => Ok(()),
        }
    }

    /// Builds a plain user error from a string message: code/type/id blank
    /// (`spec.md §4.5` "User-mode constructor ... String").
    pub fn from_message(message: impl Into<Arc<str>>) -> Self {
        let mut e = Self::blank_template();
        e.set_message(Value::String(message.into()));
        e
    }

    /// Builds an error by merging `fields` (a raw key→value list, as produced
    /// by evaluating an object spec or another error's context) over a fresh
    /// blank template, then validating (`spec.md §4.5` "Error/Object" case).
    pub fn from_fields(fields: Vec<(Symbol, Value)>) -> Result<Self, BuildError> {
        let mut e = Self::blank_template();
        for (key, value) in fields {
            if let Some(pos) = ["code", "type", "id", "message", "near", "where", "file", "line"]
                .iter()
                .position(|n| Symbol::intern(n) == key)
            {
                *e.ctx.slot_mut(pos + 1).unwrap() = value;
            } else {
                e.push_arg(key, value);
            }
        }
        e.validate_and_fill()?;
        Ok(e)
    }

    /// Template skeleton used by `make_error` before argument slots are
    /// appended (`spec.md §4.5` step 3: "shallow-copying the root error
    /// template").
    pub fn root_template() -> Self {
        Self::blank_template()
    }

    /// Fills the four cataloged fixed slots from a resolved catalog entry.
    pub fn fill_catalog_fields(&mut self, code: i32, category: Symbol, id: Symbol, template: &Template) {
        self.set_code(Some(code));
        self.set_category(Some(category));
        self.set_id(Some(id));
        self.set_message(Value::String(Arc::from(template.raw())));
    }
}

/// Structural equality over (code, type, id, named arguments); `where`/
/// `near`/`file`/`line` are advisory (`spec.md §4.4` "Equality of error").
impl PartialEq for ErrorValue {
    fn eq(&self, other: &Self) -> bool {
        if self.code() != other.code() || self.category() != other.category() || self.id() != other.id() {
            return false;
        }
        let a = self.args().sorted_by_key(|(k, _)| *k).collect_vec();
        let b = other.args().sorted_by_key(|(k, _)| *k).collect_vec();
        a.len() == b.len() && a.iter().zip(b.iter()).all(|((k1, v1), (k2, v2))| k1 == k2 && v1 == v2)
    }
}
