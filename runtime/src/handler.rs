//! The handler stack (`spec.md §4.2`, C2).
//!
//! A handler is a snapshot plus a haltable flag plus a slot the unwinder
//! drops a caught error into. `Rc<RefCell<_>>` rather than a bare field
//! because `with_trap`'s caller needs to read the slot after `catch_unwind`
//! returns, while the unwinder (running inside the panic payload, on the
//! same thread, before unwinding reaches `catch_unwind`) needs to write it;
//! both sides hold a clone of the same handle.

use std::rc::Rc;
use std::cell::RefCell;

use rt_core::ErrorValue;

use crate::runtime_state::Runtime;
use crate::snapshot::Snapshot;

/// A caught error, handed back from the handler's slot once unwinding
/// reaches the `catch_unwind` boundary.
pub type ErrorSlot = Rc<RefCell<Option<ErrorValue>>>;

/// One installed handler (`spec.md §4.2`'s "handler record").
#[derive(Clone)]
pub struct Handler {
    pub snapshot: Snapshot,
    /// `false` means halts pass straight through without stopping here
    /// (`spec.md §4.2` "unhaltable handler").
    pub haltable: bool,
    pub slot: ErrorSlot,
}

impl Handler {
    pub fn new(snapshot: Snapshot, haltable: bool) -> Self {
        Self { snapshot, haltable, slot: Rc::new(RefCell::new(None)) }
    }
}

/// Pushes a new handler onto `rt`'s stack, snapshotting current state first
/// (`spec.md §4.2` "install").
pub fn push_handler(rt: &mut Runtime, haltable: bool) -> Handler {
    let snapshot = Snapshot::capture(rt);
    let handler = Handler::new(snapshot, haltable);
    rt.handlers.push(handler.clone());
    tracing::trace!(depth = rt.handlers.len(), haltable, "handler installed");
    handler
}

/// Pops the innermost handler, asserting it is the one just installed
/// (`spec.md §4.2` "uninstall must be strictly LIFO").
pub fn pop_handler(rt: &mut Runtime, installed: &Handler) {
    let popped = rt.handlers.pop().expect("pop_handler called with no handler installed");
    assert!(
        Rc::ptr_eq(&popped.slot, &installed.slot),
        "handler pop/install mismatch: handlers must be released strictly LIFO"
    );
    tracing::trace!(depth = rt.handlers.len(), "handler released");
}
