//! Diagnostic reporting. Every error the checker and parser raise goes
//! through one narrow funnel: a format string with at most one `%s`, an
//! optional name to fill it with, and a running count so the driver knows
//! whether to fail.

use std::cell::Cell;
use std::io::Write;

/// `redefinition of '%s'`
pub const REDEFINED: &str = "redefinition of '%s'";
/// `redeclaration of '%s'`
pub const REDECLARED: &str = "redeclaration of '%s'";
/// `conflicting types for '%s'`
pub const CONFLICTING: &str = "conflicting types for '%s'";
/// `'%s' undeclared`
pub const UNDECLARED: &str = "'%s' undeclared";
/// `'%s' has type void`
pub const VOID_OBJECT: &str = "'%s' has type void";
/// `invalid return type`
pub const INVALID_RETURN_TYPE: &str = "invalid return type";
/// `invalid type for test expression`
pub const INVALID_TEST_TYPE: &str = "invalid type for test expression";
/// `lvalue required in expression`
pub const LVALUE_REQUIRED: &str = "lvalue required in expression";
/// `invalid operands to binary %s`
pub const INVALID_BINARY_OPERANDS: &str = "invalid operands to binary %s";
/// `invalid operand to unary %s`
pub const INVALID_UNARY_OPERAND: &str = "invalid operand to unary %s";
/// `called object is not a function`
pub const NOT_A_FUNCTION: &str = "called object is not a function";
/// `invalid arguments to called function`
pub const INVALID_ARGUMENTS: &str = "invalid arguments to called function";

/// Counts diagnostics and writes them to an arbitrary sink (stderr in
/// production, a `Vec<u8>` in tests). The parser and checker share one of
/// these for the whole compilation; the driver checks [`Reporter::count`]
/// after parsing to decide the exit code.
pub struct Reporter<W> {
  sink: W,
  count: Cell<u32>,
}

impl<W: Write> Reporter<W> {
  pub fn new(sink: W) -> Self { Reporter { sink, count: Cell::new(0) } }

  #[must_use] pub fn count(&self) -> u32 { self.count.get() }

  /// Substitutes the first (and only) `%s` in `format` with `name`, if
  /// both are present, and writes the result followed by a newline.
  pub fn report(&mut self, format: &str, name: Option<&str>) {
    self.count.set(self.count.get() + 1);
    let message = match name {
      Some(name) => format.replacen("%s", name, 1),
      None => format.to_string(),
    };
    let _ = writeln!(self.sink, "{message}");
    log::debug!("reported: {message}");
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn substitutes_the_single_placeholder() {
    let mut r = Reporter::new(Vec::new());
    r.report(REDEFINED, Some("x"));
    assert_eq!(String::from_utf8(r.sink).unwrap(), "redefinition of 'x'\n");
  }

  #[test]
  fn leaves_format_untouched_without_a_name() {
    let mut r = Reporter::new(Vec::new());
    r.report(NOT_A_FUNCTION, None);
    assert_eq!(String::from_utf8(r.sink).unwrap(), "called object is not a function\n");
  }

  #[test]
  fn count_tracks_every_call() {
    let mut r = Reporter::new(Vec::new());
    r.report(LVALUE_REQUIRED, None);
    r.report(UNDECLARED, Some("y"));
    assert_eq!(r.count(), 2);
  }
}
