//! Error constructors (`spec.md §4.5`, C5).

use itertools::Itertools;
use smallvec::SmallVec;

use rt_core::{Array, ArrayFlags, ErrorValue, Symbol, Value, USER_CODE};
use rt_core::catalog::with_catalog;

use crate::frame::Frame;
use crate::runtime_state::Runtime;

#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum ConstructError {
    #[error("error code {0} is not registered in the catalog")]
    UnknownCode(i32),
    #[error("template for code {0} expects {expected} argument(s), got {got}")]
    ArityMismatch { code: i32, expected: usize, got: usize },
    #[error("category '{0}' has no id '{1}' in the catalog")]
    UnknownId(String, String),
    #[error(transparent)]
    #[diagnostic(transparent)]
    Build(#[from] rt_core::BuildError),
    #[error("value of this kind cannot be converted into an error")]
    InvalidErrorInput,
}

/// `make_error(code, args…)` (`spec.md §4.5`).
///
/// `code == USER_CODE` takes a single message argument (string/block/blank).
/// Any other code looks up `(type, id, template)` in the catalog; the
/// template's arity determines how many further `args` are consumed, bound
/// to the template's named placeholders in order.
pub fn make_error(rt: &Runtime, code: i32, args: Vec<Value>) -> Result<ErrorValue, ConstructError> {
    tracing::trace!(code, arg_count = args.len(), "constructing error");
    if code == USER_CODE {
        let message = args.into_iter().next().unwrap_or(Value::Blank);
        let mut e = ErrorValue::root_template();
        e.set_message(message);
        set_location(rt, &mut e);
        return Ok(e);
    }

    let (category, id, template) = with_catalog(|cat| {
        cat.lookup(code).map(|(category, id, template)| (category, id, template.clone()))
    })
    .ok_or(ConstructError::UnknownCode(code))?;

    let arity = template.arity();
    if args.len() != arity {
        return Err(ConstructError::ArityMismatch { code, expected: arity, got: args.len() });
    }

    let mut e = ErrorValue::root_template();
    e.fill_catalog_fields(code, category, id, &template);
    for (param, value) in template.params().iter().zip(args.into_iter()) {
        e.push_arg(*param, value);
    }
    set_location(rt, &mut e);
    Ok(e)
}

/// Convenience wrapper matching `spec.md §7`'s script-category taxonomy:
/// builds a `script` error by id, looking its code up from the catalog
/// first (implementers need only provide `make_error` plus a table like
/// this one, per `spec.md §4.5` "Fixed-arity wrappers").
pub fn make_script_error(rt: &Runtime, id: &str, args: Vec<Value>) -> Result<ErrorValue, ConstructError> {
    let code = with_catalog(|cat| cat.resolve(Symbol::intern("script"), Symbol::intern(id)))
        .ok_or_else(|| ConstructError::UnknownId("script".to_string(), id.to_string()))?;
    make_error(rt, code, args)
}

/// `error_from` (`spec.md §4.5` "User-mode constructor from a value").
pub enum ErrorSource {
    String(String),
    /// Pre-evaluated field list, standing in for "evaluating the block with
    /// bindings to the root error's fields" (`spec.md` notes this step may
    /// itself throw; that propagation is the evaluator's responsibility,
    /// out of scope here, so callers pass the already-evaluated fields).
    Fields(Vec<(Symbol, Value)>),
    Error(ErrorValue),
}

pub fn error_from(source: ErrorSource) -> Result<ErrorValue, ConstructError> {
    match source {
        ErrorSource::String(s) => Ok(ErrorValue::from_message(s)),
        ErrorSource::Fields(fields) => ErrorValue::from_fields(fields).map_err(ConstructError::from),
        ErrorSource::Error(e) => Ok(e),
    }
}

/// "Set location" (`spec.md §4.4`): builds the `where`/`near`/`file`/`line`
/// fields from the current frame chain. A no-op if there is no executing
/// frame (e.g. an error constructed before evaluation has started).
pub fn set_location(rt: &Runtime, e: &mut ErrorValue) {
    if rt.frames.is_empty() {
        return;
    }

    let labels: Vec<Symbol> = rt
        .frames
        .iter()
        .rev()
        .filter(|f| f.is_invoked_and_settled())
        .filter_map(|f| f.label)
        .collect_vec();
    e.set_where(labels);

    let top = rt.frames.last().expect("checked non-empty above");
    e.set_near(build_near_block(top));

    if let Some((file, line)) = find_file_line(rt) {
        e.set_file(Some(file));
        e.set_line(Some(line));
    }
}

const NEAR_WINDOW: usize = 6;
const ELLIPSIS: &str = "...";

/// Builds the *near* block (`spec.md §4.4`): up to six cells centered on
/// the current execution index, with a one-word marker at the exact index
/// and ellipsis words where the window was truncated.
fn build_near_block(frame: &Frame) -> Array {
    let cells = frame.source.cells();
    let len = cells.len();
    let half = NEAR_WINDOW / 2;
    let start = frame.index.saturating_sub(half);
    let end = (start + NEAR_WINDOW).min(len);
    let start = end.saturating_sub(NEAR_WINDOW).min(start);

    // The window is bounded (`NEAR_WINDOW` cells plus up to two ellipsis
    // words), so a small inline buffer avoids a heap allocation for the
    // common case, the same bounded-scratch-buffer idiom the unwinder's own
    // `Runtime::scratch` uses for mold output.
    let mut out: SmallVec<[Value; NEAR_WINDOW + 2]> = SmallVec::new();
    if start > 0 {
        out.push(Value::word(ELLIPSIS));
    }
    for (i, cell) in cells.iter().enumerate().take(end).skip(start) {
        if i == frame.index {
            out.push(Value::Word(rt_core::symbol::near_marker()));
        } else {
            out.push(cell.clone());
        }
    }
    if end < len {
        out.push(Value::word(ELLIPSIS));
    }
    Array::with_flags(out.into_vec(), ArrayFlags::empty())
}

/// Walks the frame chain for the nearest file-line-bearing source array.
fn find_file_line(rt: &Runtime) -> Option<(Symbol, i64)> {
    rt.frames.iter().rev().find_map(|f| {
        if f.source.has_file_line() {
            // The file/line pair is carried by convention as the array's
            // first two cells when the file-line flag is set, mirroring
            // how `file/line`-bearing source blocks are tagged at parse
            // time; see `DESIGN.md`.
            let cells = f.source.cells();
            let file = cells.first()?.as_word()?;
            let line = cells.get(1)?.as_integer()?;
            Some((file, line))
        } else {
            None
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::Frame;

    #[test]
    fn make_error_for_user_code_takes_a_single_message() {
        let rt = Runtime::new();
        let e = make_error(&rt, USER_CODE, vec![Value::string("oops")]).unwrap();
        assert_eq!(e.message_value().and_then(Value::as_string), Some("oops"));
        assert_eq!(e.code(), None);
    }

    #[test]
    fn make_error_binds_catalog_template_arguments_by_name() {
        let rt = Runtime::new();
        let code =
            with_catalog(|cat| cat.resolve(Symbol::intern("special"), Symbol::intern("quit"))).unwrap();
        let e = make_error(&rt, code, vec![Value::Integer(7)]).unwrap();
        assert_eq!(e.code(), Some(code));
        assert_eq!(e.category().map(|s| s.as_str().to_string()), Some("special".to_string()));
    }

    #[test]
    fn make_error_rejects_wrong_arity() {
        let rt = Runtime::new();
        let code =
            with_catalog(|cat| cat.resolve(Symbol::intern("special"), Symbol::intern("quit"))).unwrap();
        let err = make_error(&rt, code, vec![]).unwrap_err();
        assert!(matches!(err, ConstructError::ArityMismatch { .. }));
    }

    #[test]
    fn error_from_string_builds_a_blank_template_error() {
        let e = error_from(ErrorSource::String("plain".into())).unwrap();
        assert_eq!(e.message_value().and_then(Value::as_string), Some("plain"));
    }

    #[test]
    fn set_location_is_a_no_op_without_an_executing_frame() {
        let rt = Runtime::new();
        let mut e = ErrorValue::from_message("x");
        set_location(&rt, &mut e);
        assert!(e.where_block().is_none());
    }

    #[test]
    fn build_near_block_marks_the_current_index_and_truncates_with_ellipses() {
        let cells: Vec<Value> = (0..10).map(Value::Integer).collect();
        let source = Array::from_cells(cells);
        let frame = Frame { index: 5, ..Frame::invoked(Symbol::intern("f"), source) };
        let near = build_near_block(&frame);
        let rendered: Vec<String> = near.cells().iter().map(|v| v.to_string()).collect();
        assert!(rendered.contains(&rt_core::symbol::near_marker().to_string()));
        assert!(rendered.first() == Some(&ELLIPSIS.to_string()));
        assert!(rendered.last() == Some(&ELLIPSIS.to_string()));
    }
}
