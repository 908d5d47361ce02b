//! A minimal evaluator call-frame stack.
//!
//! `spec.md §1` treats "the evaluator's reduction rules and the function-call
//! protocol" as an external collaborator, relied on only through *frame
//! push/pop* and *argument-list drop* contracts. This module is that
//! contract made concrete enough to unwind and to build `where`/`near`
//! blocks against (`SPEC_FULL.md §3`), without reimplementing an evaluator.

use rt_core::{Array, Symbol, Value};

/// What kind of thing a frame represents, for the unwinder's per-frame
/// cleanup (`spec.md §4.3` step 1) and the `where`-block builder's
/// "invoked-functions" filter (`spec.md §4.4`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameKind {
    /// A native or user function call.
    Function,
    /// A call consuming a C-level variadic argument list; needs its own
    /// cleanup routine on unwind (`spec.md §4.3` step 1b).
    Variadic,
    /// Anything else walked by the evaluator (e.g. a block being reduced)
    /// that is not itself an invoked function.
    Other,
}

/// One entry on the evaluator's call stack.
#[derive(Clone, Debug)]
pub struct Frame {
    /// The function name shown in a `where` block, if this frame is an
    /// invoked function.
    pub label: Option<Symbol>,
    pub kind: FrameKind,
    /// The source array this frame is executing (a block, or a reified
    /// variadic list), and the index of the cell currently executing.
    pub source: Array,
    pub index: usize,
    /// Still gathering arguments for its call, so such frames are skipped by
    /// the `where`-block builder (`spec.md §4.4`: "skipping frames that are
    /// ... mid-fulfillment").
    pub fulfilling: bool,
    /// The frame's output slot. Reset to `Value::Blank` on unwind in place
    /// of the source's end-marker cell (`spec.md §4.3` step 1c).
    pub output: Value,
    /// Whether a matching argument region (chunk cells) was allocated for
    /// this frame; dropped in step 2 of the unwind, not here.
    pub has_argument_region: bool,
}

impl Frame {
    pub fn invoked(label: Symbol, source: Array) -> Self {
        Self {
            label: Some(label),
            kind: FrameKind::Function,
            source,
            index: 0,
            fulfilling: false,
            output: Value::Blank,
            has_argument_region: true,
        }
    }

    pub fn variadic(label: Symbol, source: Array) -> Self {
        Self {
            label: Some(label),
            kind: FrameKind::Variadic,
            source,
            index: 0,
            fulfilling: false,
            output: Value::Blank,
            has_argument_region: true,
        }
    }

    /// Is this an invoked function whose label belongs in a `where` block?
    pub fn is_invoked_and_settled(&self) -> bool {
        matches!(self.kind, FrameKind::Function | FrameKind::Variadic) && !self.fulfilling
    }
}
