//! End-to-end scenarios for the handler stack and unwinder (`spec.md §8`
//! "Concrete end-to-end scenarios").

use rt_core::catalog::with_catalog;
use rt_core::{Symbol, Template, Value};
use rt_runtime::frame::Frame;
use rt_runtime::runtime_state::with_runtime_mut;
use rt_runtime::{constructors, fail_with_error, fail_with_message, with_trap, with_trap_unhaltable};

fn finish_startup() {
    with_runtime_mut(|rt| rt.startup_finished = true);
}

fn script_code(id: &str) -> i32 {
    with_catalog(|cat| cat.resolve(Symbol::intern("script"), Symbol::intern(id))).unwrap()
}

/// Scenario 1: simple catch.
#[test]
fn simple_catch_carries_code_id_and_bound_argument() {
    finish_startup();
    let code = script_code("invalid-arg");

    let e = with_trap(
        || {
            let built = with_runtime_mut(|rt| constructors::make_error(rt, code, vec![Value::Integer(42)]));
            fail_with_error(built.unwrap());
            #[allow(unreachable_code)]
            unreachable!()
        },
        |e| e,
    );

    assert_eq!(e.code(), Some(code));
    assert_eq!(e.id(), Some(Symbol::intern("invalid-arg")));
    assert_eq!(e.arg(Symbol::intern("arg1")), Some(&Value::Integer(42)));
}

/// Scenario 2: nested fail with frames produces a `where` block in
/// most-recent-first order, and frame top is restored after resume.
#[test]
fn nested_fail_builds_where_block_in_call_order_and_restores_frame_top() {
    finish_startup();
    with_runtime_mut(|rt| {
        rt.frames.clear();
        rt.stack.clear();
    });

    let frame_top_before = with_runtime_mut(|rt| rt.frames.len());

    let e = with_trap(
        || {
            with_runtime_mut(|rt| {
                rt.frames.push(Frame::invoked(Symbol::intern("a"), rt_core::Array::new()));
                rt.frames.push(Frame::invoked(Symbol::intern("b"), rt_core::Array::new()));
                rt.frames.push(Frame::invoked(Symbol::intern("c"), rt_core::Array::new()));
            });
            let e = with_runtime_mut(|rt| {
                let mut e = rt_core::ErrorValue::from_message("boom");
                constructors::set_location(rt, &mut e);
                e
            });
            fail_with_error(e);
            #[allow(unreachable_code)]
            unreachable!()
        },
        |e| e,
    );

    let labels: Vec<String> = e
        .where_block()
        .expect("where block must be populated")
        .cells()
        .iter()
        .map(|v| v.to_string())
        .collect();
    assert_eq!(labels, vec!["c", "b", "a"]);

    let frame_top_after = with_runtime_mut(|rt| rt.frames.len());
    assert_eq!(frame_top_after, frame_top_before);
}

/// Scenario 3: a plain user error from a string has every catalog field
/// blank and molds with no type prefix.
#[test]
fn user_error_from_string_molds_without_a_type_prefix() {
    let e = constructors::error_from(rt_runtime::ErrorSource::String("oops".into())).unwrap();
    assert_eq!(e.code(), None);
    assert_eq!(e.category(), None);
    assert_eq!(e.id(), None);
    assert_eq!(e.to_string(), "** Error: oops");
}

/// Scenario 4: halt bypasses an unhaltable handler, which still gets
/// notified, and the outer haltable handler's `on_error` runs with the halt.
#[test]
fn halt_bypasses_unhaltable_handler_and_reaches_outer_trap() {
    finish_startup();
    let mut inner_notified = false;

    let outer_result = with_trap(
        || {
            with_trap_unhaltable(
                || {
                    let mut halt = rt_core::ErrorValue::blank_template();
                    halt.set_category(Some(Symbol::intern("special")));
                    halt.set_id(Some(Symbol::intern("halt")));
                    halt.set_code(Some(0));
                    fail_with_error(halt);
                    #[allow(unreachable_code)]
                    unreachable!()
                },
                |_e: rt_core::ErrorValue| panic!("unhaltable on_error must not run for a halt"),
                |_halt| inner_notified = true,
            )
        },
        |e| e.id(),
    );

    assert!(inner_notified);
    assert_eq!(outer_result, Some(Symbol::intern("halt")));
}

/// Scenario 5: manual allocations made inside a failing body are all freed
/// by the time the handler resumes.
#[test]
fn manual_allocations_are_freed_across_a_fail() {
    finish_startup();
    let before = with_runtime_mut(|rt| rt.manual_allocs.len());

    with_trap(
        || {
            with_runtime_mut(|rt| {
                rt.manual_allocs.push(rt_runtime::runtime_state::ManualAlloc { tag: Symbol::intern("a") });
                rt.manual_allocs.push(rt_runtime::runtime_state::ManualAlloc { tag: Symbol::intern("b") });
            });
            fail_with_message("x");
            #[allow(unreachable_code)]
            unreachable!()
        },
        |_e| (),
    );

    let after = with_runtime_mut(|rt| rt.manual_allocs.len());
    assert_eq!(after, before);
}

/// Scenario 6: registering a new category assigns the next `CATEGORY_SIZE`
/// multiple, and looking up a code within it recovers the right id and
/// template arity. Uses a private catalog instance rather than the
/// process-wide one, since registration is one-way and the global catalog
/// is shared by every test in this binary.
#[test]
fn extension_category_is_assigned_the_next_base_code() {
    let mut cat = rt_core::Catalog::from_asset().unwrap();
    let before = cat.category_count() as i32;
    let base = cat
        .register_category(
            "widget",
            "Widget",
            vec![("jammed", Template::parse("widget {name} jammed"))],
        )
        .unwrap();
    assert_eq!(base, before * rt_core::CATEGORY_SIZE);

    let (category, id, template) = cat.lookup(base).unwrap();
    assert_eq!(category.as_str(), "widget");
    assert_eq!(id.as_str(), "jammed");
    assert_eq!(template.arity(), 1);
}
