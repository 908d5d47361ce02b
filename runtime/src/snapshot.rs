//! State snapshot (`spec.md §4.1`, C1).
//!
//! Captures the scalar cursors of every piece of transient runtime state that
//! must be rolled back on unwind. There is no `cpu_state` field the way the
//! source has one for its `setjmp` buffer; control transfer back to the
//! handler's resume point is done with `std::panic` instead; see
//! `unwind.rs` and `DESIGN.md`.

use crate::runtime_state::Runtime;

/// A record of where every tracked cursor stood when a handler was installed.
#[derive(Clone, Copy, Debug)]
pub struct Snapshot {
    pub dsp: usize,
    pub chunk_top: usize,
    pub frame_top: usize,
    pub manual_allocs_len: usize,
    pub guard_len: usize,
    pub scratch_len: usize,
    pub mold_stack_len: usize,
}

impl Snapshot {
    /// `spec.md §4.1` `snap(s)`. Panics (a programming error, not a fail) if
    /// a symbol collection is in progress, since only the collect-end
    /// routine invoked during unwind knows how to unwind it safely.
    pub fn capture(rt: &Runtime) -> Self {
        assert!(
            rt.collect_buffer.is_empty(),
            "snap() taken while a symbol collection is in progress"
        );
        Self {
            dsp: rt.stack.len(),
            chunk_top: rt.chunks.len(),
            frame_top: rt.frames.len(),
            manual_allocs_len: rt.manual_allocs.len(),
            guard_len: rt.guard_list.len(),
            scratch_len: rt.scratch.len(),
            mold_stack_len: rt.mold_depth,
        }
    }

    /// `spec.md §4.1` `assert_balanced(s)` (debug only): every cursor must
    /// equal its value at snapshot time, i.e. the guarded region performed no
    /// net push without a matching pop.
    #[track_caller]
    pub fn assert_balanced(&self, rt: &Runtime) {
        debug_assert_eq!(rt.stack.len(), self.dsp, "data stack leaked past handler scope");
        debug_assert_eq!(rt.chunks.len(), self.chunk_top, "argument chunk leaked past handler scope");
        debug_assert_eq!(rt.frames.len(), self.frame_top, "evaluator frame leaked past handler scope");
        debug_assert_eq!(
            rt.manual_allocs.len(),
            self.manual_allocs_len,
            "manual allocation leaked past handler scope"
        );
        debug_assert_eq!(rt.guard_list.len(), self.guard_len, "GC guard leaked past handler scope");
        debug_assert_eq!(rt.scratch.len(), self.scratch_len, "scratch buffer leaked past handler scope");
        debug_assert_eq!(rt.mold_depth, self.mold_stack_len, "mold stack leaked past handler scope");
    }
}
