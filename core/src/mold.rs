//! Rendering an error object for display (`spec.md §7` "User-visible
//! failure").
//!
//! ```text
//! ** <type> Error: <formatted-message>
//! ** Where: <where-block>
//! ** Near: <near-block>
//! ** File: <file>
//! ** Line: <line>
//! ```
//!
//! Blank fields are omitted entirely; a malformed `message` field renders as
//! the fixed `bad-error-format` marker instead of panicking.

use std::fmt;

use crate::catalog::with_catalog;
use crate::error_value::ErrorValue;
use crate::template::Template;
use crate::value::Value;

const BAD_ERROR_FORMAT: &str = "bad-error-format";

fn type_display(e: &ErrorValue) -> Option<String> {
    let category = e.category()?;
    let human = with_catalog(|cat| cat.category(category).map(|c| c.type_name.to_string()));
    Some(human.unwrap_or_else(|| category.as_str().to_string()))
}

fn message_display(e: &ErrorValue) -> Option<String> {
    match e.message_value() {
        None => None,
        Some(Value::Blank) => None,
        Some(Value::String(s)) => {
            let template = Template::parse(s.as_ref());
            if template.arity() == 0 {
                Some(s.to_string())
            } else {
                let args: Vec<_> = e.args().map(|(k, v)| (k, v.clone())).collect();
                Some(template.render(&args))
            }
        },
        Some(Value::Block(block)) => Some(block.to_string()),
        Some(_) => Some(BAD_ERROR_FORMAT.to_string()),
    }
}

/// Renders `e` the way `spec.md §7` describes. A bare helper (rather than
/// just a `Display` impl) so callers that only need the message line (e.g.
/// log statements) don't have to discard the rest.
pub fn mold(e: &ErrorValue) -> String {
    let mut lines = Vec::new();

    let header = match (type_display(e), message_display(e)) {
        (Some(ty), Some(msg)) => format!("** {ty} Error: {msg}"),
        (Some(ty), None) => format!("** {ty} Error"),
        (None, Some(msg)) => format!("** Error: {msg}"),
        (None, None) => "** Error".to_string(),
    };
    lines.push(header);

    if let Some(where_block) = e.where_block() {
        if !where_block.is_empty() {
            lines.push(format!("** Where: {}", Value::Block(where_block.clone())));
        }
    }
    if let Some(near) = e.near() {
        if !near.is_empty() {
            lines.push(format!("** Near: {}", Value::Block(near.clone())));
        }
    }
    if let Some(file) = e.file() {
        lines.push(format!("** File: {file}"));
    }
    if let Some(line) = e.line() {
        lines.push(format!("** Line: {line}"));
    }

    lines.join("\n")
}

impl fmt::Display for ErrorValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&mold(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbol::Symbol;

    #[test]
    fn plain_user_error_has_no_type_prefix() {
        let e = ErrorValue::from_message("oops");
        assert_eq!(mold(&e), "** Error: oops");
    }

    #[test]
    fn cataloged_error_shows_its_category_type_and_renders_args() {
        let mut e = ErrorValue::blank_template();
        e.set_category(Some(Symbol::intern("script")));
        e.set_id(Some(Symbol::intern("invalid-arg")));
        e.set_message(Value::string("invalid argument: {arg1}"));
        e.push_arg(Symbol::intern("arg1"), Value::word("foo"));
        assert_eq!(mold(&e), "** Script Error: invalid argument: foo");
    }

    #[test]
    fn blank_fields_are_omitted() {
        let e = ErrorValue::from_message("oops");
        let rendered = mold(&e);
        assert!(!rendered.contains("Where"));
        assert!(!rendered.contains("Near"));
        assert!(!rendered.contains("File"));
        assert!(!rendered.contains("Line"));
    }

    #[test]
    fn malformed_message_field_renders_as_bad_error_format() {
        let mut e = ErrorValue::blank_template();
        e.set_message(Value::Integer(42));
        assert_eq!(mold(&e), "** Error: bad-error-format");
    }
}
