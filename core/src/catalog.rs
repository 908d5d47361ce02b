//! The error catalog (`spec.md §3` Catalog, §4.4 `lookup`).
//!
//! A two-level table: categories keyed by word, each an ordered id→template
//! map. The integer code for an error is `category.code + position - 1`
//! where `position` is the 1-based index of the id within its category. The
//! catalog is built once at startup from an embedded data asset
//! (`assets/catalog.json`) and thereafter mutated only by
//! [`Catalog::register_category`] (`spec.md §5` Shared-resource policy).

use std::sync::Arc;

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use serde::Deserialize;

use crate::symbol::Symbol;
use crate::template::Template;
use crate::{CATEGORY_SIZE, MAX_BUILTIN_CATEGORIES};

/// A namespace of related error ids.
#[derive(Clone, Debug)]
pub struct Category {
    /// Base code; always a multiple of [`CATEGORY_SIZE`].
    pub code: i32,
    /// Human-readable category name, e.g. "Script".
    pub type_name: Arc<str>,
    ids: IndexMap<Symbol, Template>,
}

impl Category {
    /// Looks up the template at 1-based position `slot_index + 1`.
    fn template_at(&self, slot_index: i32) -> Option<(Symbol, &Template)> {
        if slot_index < 0 {
            return None;
        }
        self.ids
            .get_index(slot_index as usize)
            .map(|(id, template)| (*id, template))
    }

    /// Looks up a template by id word, returning its 1-based position.
    fn position_of(&self, id: Symbol) -> Option<usize> {
        self.ids.get_index_of(&id).map(|i| i + 1)
    }

    pub fn ids(&self) -> impl Iterator<Item = (Symbol, &Template)> {
        self.ids.iter().map(|(k, v)| (*k, v))
    }
}

#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum CatalogError {
    #[error("malformed catalog asset: {0}")]
    #[diagnostic(help("check assets/catalog.json for a structural error"))]
    MalformedAsset(String),

    #[error("category '{0}' is already registered")]
    DuplicateCategory(String),

    #[error("category base code {0} is not a multiple of {CATEGORY_SIZE}")]
    MisalignedBase(i32),

    #[error("out of error category numbers: the catalog supports at most {MAX_BUILTIN_CATEGORIES} categories")]
    #[diagnostic(help(
        "registering another category would collide with USER_CODE; free up a category slot or raise MAX_BUILTIN_CATEGORIES"
    ))]
    OutOfErrorNumbers,
}

/// The catalog: an ordered list of categories, indexed both by position
/// (for `code / CATEGORY_SIZE` lookups) and by name (for registration and
/// `(type, id)` resolution).
pub struct Catalog {
    categories: IndexMap<Symbol, Category>,
}

impl Catalog {
    fn empty() -> Self {
        Self { categories: IndexMap::new() }
    }

    /// Parses the embedded catalog asset and builds the initial table. Public
    /// so callers needing an isolated catalog (tests, or an embedder wanting
    /// a private copy rather than the process-wide singleton) can build one
    /// without going through [`with_catalog`].
    pub fn from_asset() -> Result<Self, CatalogError> {
        let asset: CatalogAsset = serde_json::from_str(include_str!("../assets/catalog.json"))
            .map_err(|e| CatalogError::MalformedAsset(e.to_string()))?;
        let mut cat = Self::empty();
        for (name, entry) in asset.categories {
            let ids = entry
                .ids
                .into_iter()
                .map(|(id, template)| (Symbol::intern(&id), Template::parse(template)))
                .collect();
            cat.insert_category(&name, entry.code, &entry.r#type, ids)?;
        }
        Ok(cat)
    }

    fn insert_category(
        &mut self,
        name: &str,
        code: i32,
        type_name: &str,
        ids: IndexMap<Symbol, Template>,
    ) -> Result<i32, CatalogError> {
        if code % CATEGORY_SIZE != 0 {
            return Err(CatalogError::MisalignedBase(code));
        }
        let sym = Symbol::intern(name);
        if self.categories.contains_key(&sym) {
            return Err(CatalogError::DuplicateCategory(name.to_string()));
        }
        self.categories.insert(
            sym,
            Category { code, type_name: Arc::from(type_name), ids },
        );
        Ok(code)
    }

    /// Registers a brand new category, assigning it the next free multiple
    /// of `CATEGORY_SIZE`. Returns the assigned base code.
    pub fn register_category(
        &mut self,
        name: &str,
        type_name: &str,
        ids: Vec<(&str, Template)>,
    ) -> Result<i32, CatalogError> {
        let next_index = self.categories.len() as i32;
        if next_index >= MAX_BUILTIN_CATEGORIES {
            return Err(CatalogError::OutOfErrorNumbers);
        }
        let code = next_index * CATEGORY_SIZE;
        let ids = ids.into_iter().map(|(id, t)| (Symbol::intern(id), t)).collect();
        tracing::debug!(category = name, code, "registering error category");
        self.insert_category(name, code, type_name, ids)
    }

    /// `spec.md §4.4`: `lookup(code) -> (category_word, id_word, template) | none`.
    pub fn lookup(&self, code: i32) -> Option<(Symbol, Symbol, &Template)> {
        if code < 0 {
            return None;
        }
        let cat_index = code / CATEGORY_SIZE;
        let slot_index = code % CATEGORY_SIZE;
        let (cat_word, category) = self.categories.get_index(cat_index as usize)?;
        debug_assert_eq!(category.code, cat_index * CATEGORY_SIZE);
        let (id_word, template) = category.template_at(slot_index)?;
        Some((*cat_word, id_word, template))
    }

    /// The reverse of [`Catalog::lookup`]: resolves `(type, id)` back to a
    /// code, used when a code-less error carries explicit words that must be
    /// consistent with the catalog (`spec.md §3` invariants).
    pub fn resolve(&self, category: Symbol, id: Symbol) -> Option<i32> {
        let cat = self.categories.get(&category)?;
        let position = cat.position_of(id)?;
        Some(cat.code + position as i32 - 1)
    }

    pub fn category(&self, name: Symbol) -> Option<&Category> {
        self.categories.get(&name)
    }

    pub fn category_count(&self) -> usize {
        self.categories.len()
    }
}

#[derive(Deserialize)]
struct CatalogAsset {
    categories: IndexMap<String, CategoryAsset>,
}

#[derive(Deserialize)]
struct CategoryAsset {
    code: i32,
    r#type: String,
    ids: IndexMap<String, String>,
}

static CATALOG: Lazy<RwLock<Catalog>> = Lazy::new(|| {
    RwLock::new(Catalog::from_asset().expect("embedded catalog.json must parse"))
});

/// Borrows the process-wide catalog for reading.
pub fn with_catalog<R>(f: impl FnOnce(&Catalog) -> R) -> R {
    f(&CATALOG.read())
}

/// Borrows the process-wide catalog for a mutation (category registration).
pub fn with_catalog_mut<R>(f: impl FnOnce(&mut Catalog) -> R) -> R {
    f(&mut CATALOG.write())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_categories_load_from_the_embedded_asset() {
        with_catalog(|cat| {
            assert!(cat.category_count() >= 4);
            let special = cat.category(Symbol::intern("special")).unwrap();
            assert_eq!(special.code, 0);
        });
    }

    #[test]
    fn lookup_resolves_code_to_category_and_id() {
        with_catalog(|cat| {
            let (category, id, template) = cat.lookup(0).unwrap();
            assert_eq!(category.as_str(), "special");
            assert_eq!(id.as_str(), "halt");
            assert_eq!(template.arity(), 0);
        });
    }

    #[test]
    fn lookup_of_unregistered_category_returns_none() {
        with_catalog(|cat| {
            assert!(cat.lookup(900).is_none());
        });
    }

    #[test]
    fn resolve_is_the_inverse_of_lookup() {
        with_catalog(|cat| {
            let (category, id, _) = cat.lookup(0).unwrap();
            assert_eq!(cat.resolve(category, id), Some(0));
        });
    }

    // These two tests build a private catalog instead of mutating the
    // process-wide `CATALOG` static, since registration is one-way and the
    // static is shared by every test in this binary.

    #[test]
    fn register_category_returns_next_multiple_of_category_size() {
        let mut cat = Catalog::from_asset().unwrap();
        let before = cat.category_count() as i32;
        let code = cat
            .register_category("io_ext", "IoExtension", vec![("timed-out", Template::parse("timed out"))])
            .unwrap();
        assert_eq!(code, before * CATEGORY_SIZE);
        let (_, id, _) = cat.lookup(code).unwrap();
        assert_eq!(id.as_str(), "timed-out");
    }

    #[test]
    fn running_out_of_category_numbers_is_an_error() {
        let mut cat = Catalog::from_asset().unwrap();
        let mut last = Ok(0);
        while cat.category_count() < MAX_BUILTIN_CATEGORIES as usize + 1 {
            last = cat.register_category(
                &format!("overflow{}", cat.category_count()),
                "Overflow",
                vec![],
            );
            if last.is_err() {
                break;
            }
        }
        assert!(matches!(last, Err(CatalogError::OutOfErrorNumbers)));
    }
}
