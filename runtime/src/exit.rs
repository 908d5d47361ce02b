//! CLI/process exit-status mapping (`spec.md §6` "CLI/process surface").

use rt_core::{ErrorValue, Value};

/// Exit status for an uncaught halt reaching the process boundary.
pub const UNCAUGHT_HALT_STATUS: i32 = 130;

/// Exit status for a security-policy violation whose action is *quit*.
pub const SECURITY_QUIT_STATUS: i32 = 101;

/// Converts a `quit`/`exit` value to an OS exit status (`spec.md §6`):
/// integer → integer (low 32 bits); blank → 0; error → its code; anything
/// else → 1.
pub fn exit_status_for(value: &Value) -> i32 {
    match value {
        Value::Integer(i) => *i as i32,
        Value::Blank => 0,
        _ => 1,
    }
}

/// Same conversion for an error value reaching the process boundary
/// uncaught: its code if it has one, else 1.
pub fn exit_status_for_error(e: &ErrorValue) -> i32 {
    e.code().unwrap_or(1)
}

/// Whatever `quit`/`exit` was handed: an ordinary cell, or an `ErrorValue`
/// (the `error` case in `spec.md §6`'s conversion table). The core data
/// model keeps `Value` and `ErrorValue` as distinct types (`spec.md §3`:
/// an error object is a `Context`, not a cell variant) rather than folding
/// errors into the `Value` enum as a payload-bearing kind, so the CLI
/// surface that needs to dispatch on "is this an error" takes this sum type
/// at its one call site instead.
pub enum ExitValue {
    Cell(Value),
    Error(ErrorValue),
}

impl ExitValue {
    /// The single conversion `spec.md §6` describes, covering both branches.
    pub fn exit_status(&self) -> i32 {
        match self {
            ExitValue::Cell(v) => exit_status_for(v),
            ExitValue::Error(e) => exit_status_for_error(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_value_exits_with_its_low_32_bits() {
        assert_eq!(exit_status_for(&Value::Integer(7)), 7);
        assert_eq!(exit_status_for(&Value::Integer((1i64 << 33) | 5)), 5);
    }

    #[test]
    fn blank_value_exits_zero() {
        assert_eq!(exit_status_for(&Value::Blank), 0);
    }

    #[test]
    fn other_value_kinds_exit_one() {
        assert_eq!(exit_status_for(&Value::word("x")), 1);
    }

    #[test]
    fn error_exit_status_uses_its_code() {
        let mut e = ErrorValue::blank_template();
        e.set_code(Some(42));
        assert_eq!(exit_status_for_error(&e), 42);
    }

    #[test]
    fn error_without_a_code_exits_one() {
        let e = ErrorValue::from_message("x");
        assert_eq!(exit_status_for_error(&e), 1);
    }

    #[test]
    fn exit_value_dispatches_on_cell_vs_error() {
        assert_eq!(ExitValue::Cell(Value::Integer(5)).exit_status(), 5);
        let mut e = ErrorValue::blank_template();
        e.set_code(Some(7));
        assert_eq!(ExitValue::Error(e).exit_status(), 7);
    }
}
