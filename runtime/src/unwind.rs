//! `fail(p)`, the unwind sequence, and the handler-install boundary
//! (`spec.md §4.3`, C3; `spec.md §6` Handler-install / Fail interfaces).
//!
//! The source does this with `setjmp`/`longjmp`: a handler snapshots a
//! `jmp_buf`, and `fail` walks state back to the snapshot before jumping.
//! There is no portable non-local jump in safe Rust, so the jump itself is
//! done with `std::panic::panic_any` + `catch_unwind`, confined to this
//! module as the handler-install boundary permits (`spec.md §9` design
//! notes; `DESIGN.md`). Everything *around* the jump (which cursors get
//! truncated, in what order, what gets recorded where) is exactly
//! `spec.md §4.3`'s sequence, run eagerly by `fail` itself before it ever
//! panics, so the panic payload carries nothing but the already-unwound
//! error.

use std::panic::{self, AssertUnwindSafe};

use rt_core::{ErrorValue, Value};

use crate::handler::{pop_handler, push_handler, Handler};
use crate::runtime_state::{with_runtime_mut, Runtime};

#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum RuntimeError {
    #[error("fail() called before startup finished installing its outermost handler")]
    StartupNotFinished,
    #[error("fail() called with no handler installed")]
    NoHandlerInstalled,
    #[error("handler scope left transient state unbalanced")]
    UnbalancedSnapshot,
}

/// What `fail` was handed (`spec.md §4.3`'s three pointee kinds).
pub enum FailReason {
    Error(ErrorValue),
    InvalidArgument(Value),
    Message(String),
}

impl FailReason {
    fn into_error(self) -> ErrorValue {
        match self {
            FailReason::Error(e) => e,
            FailReason::InvalidArgument(v) => invalid_argument_error(v),
            FailReason::Message(s) => ErrorValue::from_message(s),
        }
    }
}

/// `spec.md §4.3` pointee-kind 2: "a pointer to a value cell ... generates an
/// 'invalid-argument' error with that cell as template argument." Resolves
/// `script`/`invalid-arg` through the catalog so the result carries a real
/// code/type/id, not just a user-message string.
fn invalid_argument_error(v: Value) -> ErrorValue {
    use rt_core::catalog::with_catalog;
    use rt_core::Symbol;

    let (code, category, id, template) = with_catalog(|cat| {
        let code = cat
            .resolve(Symbol::intern("script"), Symbol::intern("invalid-arg"))
            .expect("builtin catalog must define script/invalid-arg");
        let (category, id, template) = cat.lookup(code).expect("resolved code must look up");
        (code, category, id, template.clone())
    });

    let mut e = ErrorValue::root_template();
    e.fill_catalog_fields(code, category, id, &template);
    let arg_name = template.params().first().copied().unwrap_or_else(|| Symbol::intern("arg1"));
    e.push_arg(arg_name, v);
    e
}

/// The value carried through `panic_any`/`catch_unwind`: the fully-unwound
/// error, already recorded into the target handler's slot by the time this
/// payload exists. The payload itself carries only a halt marker so
/// `with_trap`/`with_trap_unhaltable` can tell a halt apart from any other
/// panic that might cross the boundary (e.g. a genuine Rust bug).
struct UnwindSignal {
    is_halt: bool,
}

/// Is `e` the reserved halt error (`spec.md §5` "Halt is ... a reserved
/// error code")? Halt lives in the `special` category at slot 1.
fn is_halt(e: &ErrorValue) -> bool {
    e.category().map(|c| c.as_str() == "special").unwrap_or(false)
        && e.id().map(|i| i.as_str() == "halt").unwrap_or(false)
}

/// `spec.md §4.3`: run the unwind sequence against `rt`, rolling every
/// tracked cursor back to `target.snapshot`, then record `error` into
/// `target`'s slot. Panic-free by construction: every step is a truncation
/// or a field write, never a fallible operation.
fn unwind_to(rt: &mut Runtime, target: &Handler, error: ErrorValue) {
    let snap = target.snapshot;
    tracing::debug!(
        category = error.category().map(|s| s.as_str().to_string()),
        id = error.id().map(|s| s.as_str().to_string()),
        frames_dropped = rt.frames.len().saturating_sub(snap.frame_top),
        "unwinding to handler"
    );

    // 1. Drop evaluator frames down to the snapshotted frame top.
    while rt.frames.len() > snap.frame_top {
        let frame = rt.frames.pop().expect("frame_top snapshot is ahead of actual frame count");
        drop(frame); // output slot and any attached resources drop with it
    }
    if rt.thrown.is_some() {
        rt.thrown = None;
    }

    // 2. Drop argument chunks down to the snapshotted chunk top.
    rt.chunks.truncate(snap.chunk_top);

    // 3. Truncate the data stack.
    rt.stack.truncate(snap.dsp);

    // 4. End any in-progress symbol collection.
    if !rt.collect_buffer.is_empty() {
        rt.collect_buffer.clear();
    }

    // 5. Free manual allocations made after the snapshot.
    rt.manual_allocs.truncate(snap.manual_allocs_len);

    // 6. Truncate the GC-guard list.
    rt.guard_list.truncate(snap.guard_len);

    // 7. Truncate scratch/mold state.
    rt.scratch.truncate(snap.scratch_len);
    rt.mold_depth = snap.mold_stack_len;
    rt.building_mold = false;

    // 8. Record the error into the target's slot.
    *target.slot.borrow_mut() = Some(error);
}

/// `fail(p)` (`spec.md §4.3`). Never returns: either it unwinds to a
/// handler and panics with a signal `with_trap` catches, or there is no
/// handler / startup has not finished, in which case it panics with a
/// plain `RuntimeError` that is meant to escape all the way out (a genuine
/// process abort, per `spec.md §7` "escalate to panic").
#[track_caller]
pub fn fail(reason: FailReason) -> ! {
    let error = reason.into_error();
    let halt = is_halt(&error);

    with_runtime_mut(|rt| {
        if !rt.startup_finished {
            tracing::error!("fail() called before startup finished");
            panic::panic_any(RuntimeError::StartupNotFinished);
        }

        // Find the target handler: the innermost one, unless this is a
        // halt and that handler is unhaltable, in which case we still
        // catch there first (so its on_halt hook fires) and re-fail
        // outward from inside the handler; see with_trap_unhaltable.
        let Some(target) = rt.handlers.last().cloned() else {
            tracing::error!("fail() called with no handler installed");
            panic::panic_any(RuntimeError::NoHandlerInstalled);
        };

        unwind_to(rt, &target, error);
        panic::panic_any(UnwindSignal { is_halt: halt });
    })
}

/// Convenience wrapper so call sites can write `fail_with("...")` without
/// constructing a `FailReason` themselves.
#[track_caller]
pub fn fail_with_message(message: impl Into<String>) -> ! {
    fail(FailReason::Message(message.into()))
}

#[track_caller]
pub fn fail_with_error(error: ErrorValue) -> ! {
    fail(FailReason::Error(error))
}

fn take_unwind_signal(payload: Box<dyn std::any::Any + Send>) -> Result<UnwindSignal, Box<dyn std::any::Any + Send>> {
    payload.downcast::<UnwindSignal>().map(|b| *b)
}

/// `with_trap(body, on_error)` (`spec.md §6`): install a haltable handler,
/// run `body`, and route any error caught at this layer to `on_error`.
pub fn with_trap<R>(body: impl FnOnce() -> R, on_error: impl FnOnce(ErrorValue) -> R) -> R {
    let handler = with_runtime_mut(|rt| push_handler(rt, true));
    let slot = handler.slot.clone();

    let result = panic::catch_unwind(AssertUnwindSafe(body));

    with_runtime_mut(|rt| {
        pop_handler(rt, &handler);
        handler.snapshot.assert_balanced(rt);
    });

    match result {
        Ok(value) => value,
        Err(payload) => match take_unwind_signal(payload) {
            Ok(_signal) => {
                let error = slot.borrow_mut().take().expect("handler unwound to but slot empty");
                on_error(error)
            },
            Err(payload) => panic::resume_unwind(payload),
        },
    }
}

/// `with_trap_unhaltable(body, on_error, on_halt)` (`spec.md §6`): install
/// an unhaltable handler. A halt caught here runs `on_halt` as a
/// notification, then is literally re-raised by calling `fail` again with
/// the same error object, so it keeps propagating outward and every
/// intervening unhaltable handler's `on_halt` gets a chance to run
/// (`spec.md §4.2`/§5, and `DESIGN.md`'s note on why pre-selecting the
/// target handler would skip these hooks).
pub fn with_trap_unhaltable<R>(
    body: impl FnOnce() -> R,
    on_error: impl FnOnce(ErrorValue) -> R,
    on_halt: impl FnOnce(&ErrorValue),
) -> R {
    let handler = with_runtime_mut(|rt| push_handler(rt, false));
    let slot = handler.slot.clone();

    let result = panic::catch_unwind(AssertUnwindSafe(body));

    with_runtime_mut(|rt| {
        pop_handler(rt, &handler);
        handler.snapshot.assert_balanced(rt);
    });

    match result {
        Ok(value) => value,
        Err(payload) => match take_unwind_signal(payload) {
            Ok(signal) => {
                let error = slot.borrow_mut().take().expect("handler unwound to but slot empty");
                if signal.is_halt {
                    on_halt(&error);
                    fail_with_error(error);
                } else {
                    on_error(error)
                }
            },
            Err(payload) => panic::resume_unwind(payload),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rt_core::Symbol;

    #[test]
    fn invalid_argument_reason_resolves_a_cataloged_error() {
        let e = invalid_argument_error(Value::Integer(7));
        assert_eq!(e.category().map(|s| s.as_str().to_string()), Some("script".to_string()));
        assert_eq!(e.id().map(|s| s.as_str().to_string()), Some("invalid-arg".to_string()));
        assert_eq!(e.arg(Symbol::intern("arg1")), Some(&Value::Integer(7)));
    }

    fn halt_error() -> ErrorValue {
        let mut e = ErrorValue::blank_template();
        e.set_category(Some(Symbol::intern("special")));
        e.set_id(Some(Symbol::intern("halt")));
        e.set_code(Some(0));
        e
    }

    fn finish_startup() {
        with_runtime_mut(|rt| rt.startup_finished = true);
    }

    #[test]
    fn simple_fail_is_caught_by_the_innermost_trap() {
        finish_startup();
        let result = with_trap(
            || {
                fail_with_message("boom");
                #[allow(unreachable_code)]
                0
            },
            |e| {
                assert_eq!(e.message_value().and_then(Value::as_string), Some("boom"));
                42
            },
        );
        assert_eq!(result, 42);
    }

    #[test]
    fn successful_body_returns_without_invoking_on_error() {
        finish_startup();
        let result = with_trap(|| 7, |_| panic!("on_error should not run"));
        assert_eq!(result, 7);
    }

    #[test]
    fn halt_bypasses_an_unhaltable_handler_but_notifies_it() {
        finish_startup();
        let mut notified = false;
        let result = with_trap(
            || {
                with_trap_unhaltable(
                    || {
                        fail_with_error(halt_error());
                        #[allow(unreachable_code)]
                        0
                    },
                    |_| panic!("on_error should not run for a halt"),
                    |_| notified = true,
                )
            },
            |e| {
                assert!(is_halt(&e));
                99
            },
        );
        assert!(notified, "unhaltable handler's on_halt must fire as the halt passes through");
        assert_eq!(result, 99);
    }

    #[test]
    fn non_halt_error_stops_at_the_unhaltable_handler() {
        finish_startup();
        let result = with_trap_unhaltable(
            || {
                fail_with_message("ordinary");
                #[allow(unreachable_code)]
                0
            },
            |_e| 1,
            |_| panic!("on_halt should not run for a non-halt error"),
        );
        assert_eq!(result, 1);
    }

    #[test]
    fn data_stack_pushed_inside_a_failing_body_is_rolled_back() {
        finish_startup();
        with_runtime_mut(|rt| rt.stack.clear());
        with_trap(
            || {
                with_runtime_mut(|rt| rt.stack.push(Value::Integer(1)));
                fail_with_message("boom");
                #[allow(unreachable_code)]
                0
            },
            |_e| 0,
        );
        with_runtime_mut(|rt| assert!(rt.stack.is_empty()));
    }
}
