//! Process-wide transient runtime state (`spec.md §5`).
//!
//! Everything the handler stack and unwinder touch lives here, in one
//! struct held behind a single `thread_local!`. No internal locking: this
//! mirrors `maize/kernel/src/panic.rs`'s `#[thread_local] static IS_PANICKING`
//! idiom rather than `core`'s process-wide `Lazy<RwLock<_>>` pattern, because
//! `spec.md §5` is explicit that this state has exactly one owner at a time
//! and is never shared across threads.

use std::cell::RefCell;

use rt_core::{Symbol, Value};

use crate::frame::Frame;
use crate::handler::Handler;

/// A manually-tracked allocation outside the GC-managed arena (`spec.md §2`
/// GLOSSARY "manual allocation"). The runtime only needs to know how many
/// are outstanding and to be able to free them during unwind; what they
/// point to is opaque here.
#[derive(Debug)]
pub struct ManualAlloc {
    pub tag: Symbol,
}

/// A reified argument chunk for a call in progress (`spec.md §2` GLOSSARY
/// "chunk"). Tracked only so the unwinder can drop chunks belonging to
/// frames above the target handler (`spec.md §4.3` step 2).
#[derive(Debug)]
pub struct ArgChunk {
    pub owner_frame: usize,
}

/// All process-wide transient state, single-threaded, single-owner.
pub struct Runtime {
    /// The data stack.
    pub stack: Vec<Value>,
    /// Reified argument chunks for calls in progress.
    pub chunks: Vec<ArgChunk>,
    /// The evaluator's call-frame stack.
    pub frames: Vec<Frame>,
    /// Manual (non-GC) allocations outstanding.
    pub manual_allocs: Vec<ManualAlloc>,
    /// Values pinned against collection while referenced only from native
    /// (non-cell) storage.
    pub guard_list: Vec<Value>,
    /// Scratch buffer used while molding/forming values.
    pub scratch: String,
    /// Depth of nested mold operations in progress.
    pub mold_depth: usize,
    /// Symbols accumulated by an in-progress collection pass; `Snapshot::capture`
    /// refuses to run while this is non-empty (`spec.md §4.1`).
    pub collect_buffer: Vec<Symbol>,
    /// The argument register a `throw`/`catch` pair communicates through.
    pub thrown: Option<Value>,
    /// Set for the duration of a `mold`/`form` call; cleared explicitly by
    /// the unwinder on the way out, since a `panic`-based unwind bypasses
    /// any `Drop`-based guard (`DESIGN.md` Open Question 2).
    pub building_mold: bool,
    /// The stack of installed handlers, innermost last.
    pub handlers: Vec<Handler>,
    /// Cleared once the boot sequence installs its outermost handler;
    /// `fail()` before that point is a hard runtime error
    /// (`RuntimeError::StartupNotFinished`).
    pub startup_finished: bool,
}

impl Runtime {
    pub fn new() -> Self {
        Self {
            stack: Vec::new(),
            chunks: Vec::new(),
            frames: Vec::new(),
            manual_allocs: Vec::new(),
            guard_list: Vec::new(),
            scratch: String::new(),
            mold_depth: 0,
            collect_buffer: Vec::new(),
            thrown: None,
            building_mold: false,
            handlers: Vec::new(),
            startup_finished: false,
        }
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

/// A scoped replacement for the source's raw "currently building a mold"
/// flag (`DESIGN.md` Open Question 2). Ordinary (non-unwinding) callers get
/// guaranteed release via `Drop`; the unwinder does not rely on that and
/// clears `building_mold` itself in `unwind.rs` step 7, since a panic-based
/// unwind can cross this guard's scope without ever running its `Drop`.
pub struct MoldGuard {
    depth_before: usize,
}

impl MoldGuard {
    /// Enters a nested mold/form operation on the current thread's runtime,
    /// bumping the mold-stack depth and setting the in-progress flag.
    pub fn enter() -> Self {
        let depth_before = with_runtime_mut(|rt| {
            let before = rt.mold_depth;
            rt.mold_depth += 1;
            rt.building_mold = true;
            before
        });
        Self { depth_before }
    }
}

impl Drop for MoldGuard {
    fn drop(&mut self) {
        with_runtime_mut(|rt| {
            rt.mold_depth = self.depth_before;
            if self.depth_before == 0 {
                rt.building_mold = false;
            }
        });
    }
}

thread_local! {
    static RUNTIME: RefCell<Runtime> = RefCell::new(Runtime::new());
}

/// Runs `f` with shared access to the thread's runtime state.
pub fn with_runtime<R>(f: impl FnOnce(&Runtime) -> R) -> R {
    RUNTIME.with(|cell| f(&cell.borrow()))
}

/// Runs `f` with exclusive access to the thread's runtime state.
pub fn with_runtime_mut<R>(f: impl FnOnce(&mut Runtime) -> R) -> R {
    RUNTIME.with(|cell| f(&mut cell.borrow_mut()))
}
