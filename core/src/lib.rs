//! Data model for the interpreter's structured error objects: value cells,
//! arrays, contexts, interned symbols, the message-template mechanism, and the
//! error catalog these are built from.
//!
//! This crate has no notion of a running interpreter (no stack, no call
//! frames, no handler chain); that live state is `rt-runtime`'s job. This
//! crate only describes what an error *is* and how one is looked up.

pub mod array;
pub mod catalog;
pub mod context;
pub mod error_value;
pub mod mold;
pub mod symbol;
pub mod template;
pub mod value;

pub use array::{Array, ArrayFlags};
pub use catalog::{Catalog, CatalogError, Category};
pub use context::Context;
pub use error_value::{BuildError, ErrorValue};
pub use symbol::Symbol;
pub use template::Template;
pub use value::Value;

/// Error codes below this value are reserved for the builtin catalog loaded
/// from `assets/catalog.json`. See `spec.md §3`.
pub const CATEGORY_SIZE: i32 = 100;

/// Hard ceiling on the number of builtin categories the embedded catalog may
/// define; `USER_CODE` is derived from this.
pub const MAX_BUILTIN_CATEGORIES: i32 = 10;

/// First code value reserved for user-defined errors.
pub const USER_CODE: i32 = MAX_BUILTIN_CATEGORIES * CATEGORY_SIZE;
