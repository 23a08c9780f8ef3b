//! The semantic checker: per-construct type rules over a scope stack.
//!
//! Grounded in `examples/original_source/phase3/checker.cpp` and
//! `phase4/checker.cpp` (the message catalog in [`crate::report`] is lifted
//! directly from the latter's `E1`..`E7`/`redefined`/`redeclared`/
//! `conflicting`/`undeclared`/`void_object` constants). Every `check*`
//! function here returns [`Type::error()`] silently when any input already
//! is the error type, so errors never cascade.

use std::io::Write;
use std::rc::Rc;

use if_chain::if_chain;
use itertools::{EitherOrBoth, Itertools};

use crate::report::{self, Reporter};
use crate::scope::Scope;
use crate::symbol::Symbol;
use crate::types::{Specifier, Type};

pub struct Checker<W> {
  pub scope: Scope,
  pub reporter: Reporter<W>,
}

impl<W: Write> Checker<W> {
  #[must_use] pub fn new(reporter: Reporter<W>) -> Self {
    let mut scope = Scope::new();
    scope.open_scope();
    Checker { scope, reporter }
  }

  pub fn declare_function(&mut self, name: &Rc<str>, ty: Type) -> Rc<Symbol> {
    match self.scope.find_outermost(name) {
      None => {
        let sym = Rc::new(Symbol::new(name.clone(), ty));
        self.scope.insert_outermost(sym.clone());
        sym
      }
      Some(existing) => {
        if existing.ty != ty {
          self.reporter.report(report::CONFLICTING, Some(name));
        }
        existing
      }
    }
  }

  /// `defined` distinguishes a true definition (parameter list known) from
  /// a second bare declaration, which the source treats identically to
  /// [`Checker::declare_function`].
  pub fn define_function(&mut self, name: &Rc<str>, ty: Type) -> Rc<Symbol> {
    if let Some(existing) = self.scope.find_outermost(name) {
      if existing.ty.is_function() && existing.ty.parameters().is_some() {
        self.reporter.report(report::REDEFINED, Some(name));
      } else if existing.ty != ty {
        self.reporter.report(report::CONFLICTING, Some(name));
      }
      self.scope.remove_outermost(name);
    }
    let sym = Rc::new(Symbol::new(name.clone(), ty));
    self.scope.insert_outermost(sym.clone());
    sym
  }

  /// Any redeclaration in the current frame is discarded: the *original*
  /// symbol is returned and kept, only a diagnostic is emitted. Only an
  /// outright-absent name gets inserted.
  pub fn declare_variable(&mut self, name: &Rc<str>, ty: Type) -> Rc<Symbol> {
    match self.scope.find(name) {
      None => {
        if ty.is_scalar() && ty.indirection == 0 && ty.specifier == Specifier::Void {
          self.reporter.report(report::VOID_OBJECT, Some(name));
        }
        let sym = Rc::new(Symbol::new(name.clone(), ty));
        self.scope.insert(sym.clone());
        sym
      }
      Some(existing) => {
        if !self.scope.is_outermost() {
          self.reporter.report(report::REDECLARED, Some(name));
        } else if existing.ty != ty {
          self.reporter.report(report::CONFLICTING, Some(name));
        }
        existing
      }
    }
  }

  /// Looks up `name`; on failure, reports *undeclared* and inserts an
  /// `ERROR`-typed symbol in the *current* (innermost) frame, matching the
  /// source's quirk of masking outer-scope lookups after one typo.
  pub fn check_identifier(&mut self, name: &Rc<str>) -> Rc<Symbol> {
    match self.scope.lookup(name) {
      Some(sym) => sym,
      None => {
        self.reporter.report(report::UNDECLARED, Some(name));
        let sym = Rc::new(Symbol::new(name.clone(), Type::error()));
        self.scope.insert(sym.clone());
        sym
      }
    }
  }

  pub fn check_not(&mut self, e: &Type) -> Type {
    if e.is_error() { return Type::error() }
    if !e.is_predicate() {
      self.reporter.report(report::INVALID_UNARY_OPERAND, Some("!"));
      return Type::error();
    }
    Type::scalar(Specifier::Int, 0)
  }

  pub fn check_negate(&mut self, e: &Type) -> Type {
    if e.is_error() { return Type::error() }
    if !e.is_numeric() {
      self.reporter.report(report::INVALID_UNARY_OPERAND, Some("-"));
      return Type::error();
    }
    e.clone()
  }

  pub fn check_dereference(&mut self, e: &Type) -> Type {
    if_chain! {
      if !e.is_error();
      let p = e.promote();
      if p.is_pointer();
      if p.specifier != Specifier::Void;
      then {
        Type::scalar(p.specifier, p.indirection - 1)
      } else {
        if !e.is_error() {
          self.reporter.report(report::INVALID_UNARY_OPERAND, Some("*"));
        }
        Type::error()
      }
    }
  }

  pub fn check_address(&mut self, e: &Type, is_lvalue: bool) -> Type {
    if e.is_error() { return Type::error() }
    if !is_lvalue {
      self.reporter.report(report::LVALUE_REQUIRED, None);
      return Type::error();
    }
    Type::scalar(e.specifier, e.indirection + 1)
  }

  pub fn check_sizeof(&mut self, e: &Type) -> Type {
    if e.is_error() { return Type::error() }
    if !e.is_predicate() {
      self.reporter.report(report::INVALID_UNARY_OPERAND, Some("sizeof"));
      return Type::error();
    }
    Type::scalar(Specifier::Long, 0)
  }

  pub fn check_index(&mut self, a: &Type, i: &Type) -> Type {
    if_chain! {
      if !a.is_error() && !i.is_error();
      let pa = a.promote();
      let pi = i.promote();
      if pa.is_pointer();
      if pa.specifier != Specifier::Void;
      if pi.is_numeric();
      then {
        Type::scalar(pa.specifier, pa.indirection - 1)
      } else {
        if !a.is_error() && !i.is_error() {
          self.reporter.report(report::INVALID_BINARY_OPERANDS, Some("[]"));
        }
        Type::error()
      }
    }
  }

  fn check_multiplicative(&mut self, l: &Type, r: &Type, op: &str) -> Type {
    if l.is_error() || r.is_error() { return Type::error() }
    let pl = l.promote();
    let pr = r.promote();
    if !pl.is_numeric() || !pr.is_numeric() {
      self.reporter.report(report::INVALID_BINARY_OPERANDS, Some(op));
      return Type::error();
    }
    if pl.specifier == Specifier::Long || pr.specifier == Specifier::Long {
      Type::scalar(Specifier::Long, 0)
    } else {
      Type::scalar(Specifier::Int, 0)
    }
  }

  pub fn check_multiplication(&mut self, l: &Type, r: &Type) -> Type { self.check_multiplicative(l, r, "*") }
  pub fn check_division(&mut self, l: &Type, r: &Type) -> Type { self.check_multiplicative(l, r, "/") }
  pub fn check_modulus(&mut self, l: &Type, r: &Type) -> Type { self.check_multiplicative(l, r, "%") }

  pub fn check_addition(&mut self, l: &Type, r: &Type) -> Type {
    if l.is_error() || r.is_error() { return Type::error() }
    let pl = l.promote();
    let pr = r.promote();
    if pl.is_numeric() && pr.is_numeric() {
      return if pl.specifier == Specifier::Long || pr.specifier == Specifier::Long {
        Type::scalar(Specifier::Long, 0)
      } else {
        Type::scalar(Specifier::Int, 0)
      };
    }
    if pl.is_pointer() && pl.specifier != Specifier::Void && pr.is_numeric() {
      return Type::scalar(pl.specifier, pl.indirection);
    }
    if pr.is_pointer() && pr.specifier != Specifier::Void && pl.is_numeric() {
      return Type::scalar(pr.specifier, pr.indirection);
    }
    self.reporter.report(report::INVALID_BINARY_OPERANDS, Some("+"));
    Type::error()
  }

  pub fn check_subtraction(&mut self, l: &Type, r: &Type) -> Type {
    if l.is_error() || r.is_error() { return Type::error() }
    let pl = l.promote();
    let pr = r.promote();
    if pl.is_numeric() && pr.is_numeric() {
      return if pl.specifier == Specifier::Long || pr.specifier == Specifier::Long {
        Type::scalar(Specifier::Long, 0)
      } else {
        Type::scalar(Specifier::Int, 0)
      };
    }
    if pl.is_pointer() && pl.specifier != Specifier::Void && pr.is_numeric() {
      return Type::scalar(pl.specifier, pl.indirection);
    }
    if pl.is_pointer() && pr.is_pointer() && pl.specifier != Specifier::Void
      && pl.specifier == pr.specifier && pl.indirection == pr.indirection
    {
      return Type::scalar(Specifier::Long, 0);
    }
    self.reporter.report(report::INVALID_BINARY_OPERANDS, Some("-"));
    Type::error()
  }

  fn check_relational(&mut self, l: &Type, r: &Type, op: &str) -> Type {
    if l.is_error() || r.is_error() { return Type::error() }
    let pl = l.promote();
    let pr = r.promote();
    let both_numeric = pl.is_numeric() && pr.is_numeric();
    let both_pointer = pl.is_pointer() && pr.is_pointer()
      && pl.specifier == pr.specifier && pl.indirection == pr.indirection;
    if !both_numeric && !both_pointer {
      self.reporter.report(report::INVALID_BINARY_OPERANDS, Some(op));
      return Type::error();
    }
    Type::scalar(Specifier::Int, 0)
  }

  pub fn check_less_than(&mut self, l: &Type, r: &Type) -> Type { self.check_relational(l, r, "<") }
  pub fn check_greater_than(&mut self, l: &Type, r: &Type) -> Type { self.check_relational(l, r, ">") }
  pub fn check_less_or_equal(&mut self, l: &Type, r: &Type) -> Type { self.check_relational(l, r, "<=") }
  pub fn check_greater_or_equal(&mut self, l: &Type, r: &Type) -> Type { self.check_relational(l, r, ">=") }

  fn check_equality(&mut self, l: &Type, r: &Type, op: &str) -> Type {
    if l.is_error() || r.is_error() { return Type::error() }
    if !l.is_compatible_with(r) {
      self.reporter.report(report::INVALID_BINARY_OPERANDS, Some(op));
      return Type::error();
    }
    Type::scalar(Specifier::Int, 0)
  }

  pub fn check_equal(&mut self, l: &Type, r: &Type) -> Type { self.check_equality(l, r, "==") }
  pub fn check_not_equal(&mut self, l: &Type, r: &Type) -> Type { self.check_equality(l, r, "!=") }

  fn check_logical(&mut self, l: &Type, r: &Type, op: &str) -> Type {
    if l.is_error() || r.is_error() { return Type::error() }
    if !l.is_predicate() || !r.is_predicate() {
      self.reporter.report(report::INVALID_BINARY_OPERANDS, Some(op));
      return Type::error();
    }
    Type::scalar(Specifier::Int, 0)
  }

  pub fn check_logical_and(&mut self, l: &Type, r: &Type) -> Type { self.check_logical(l, r, "&&") }
  pub fn check_logical_or(&mut self, l: &Type, r: &Type) -> Type { self.check_logical(l, r, "||") }

  pub fn check_function(&mut self, callee: &Type, args: &[Type]) -> Type {
    if callee.is_error() || args.iter().any(Type::is_error) { return Type::error() }
    if !callee.is_function() {
      self.reporter.report(report::NOT_A_FUNCTION, None);
      return Type::error();
    }
    let ok = match callee.parameters() {
      None => args.iter().all(Type::is_predicate),
      Some(params) => params.iter().zip_longest(args).all(|pair| match pair {
        EitherOrBoth::Both(p, a) => p.is_compatible_with(a),
        EitherOrBoth::Left(_) | EitherOrBoth::Right(_) => false,
      }),
    };
    if !ok {
      self.reporter.report(report::INVALID_ARGUMENTS, None);
      return Type::error();
    }
    Type::scalar(callee.specifier, callee.indirection)
  }

  pub fn check_assignment(&mut self, lhs: &Type, is_lvalue: bool, rhs: &Type) {
    if lhs.is_error() || rhs.is_error() { return }
    if !is_lvalue {
      self.reporter.report(report::LVALUE_REQUIRED, None);
      return;
    }
    if !lhs.is_compatible_with(rhs) {
      self.reporter.report(report::INVALID_BINARY_OPERANDS, Some("="));
    }
  }

  pub fn check_test(&mut self, e: &Type) {
    if e.is_error() { return }
    if !e.is_predicate() {
      self.reporter.report(report::INVALID_TEST_TYPE, None);
    }
  }

  pub fn check_return(&mut self, e: &Type, enclosing: &Type) {
    if e.is_error() || enclosing.is_error() { return }
    if !e.is_compatible_with(enclosing) {
      self.reporter.report(report::INVALID_RETURN_TYPE, None);
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn checker() -> Checker<Vec<u8>> { Checker::new(Reporter::new(Vec::new())) }

  #[test]
  fn declare_function_twice_with_same_type_is_silent() {
    let mut c = checker();
    let ty = Type::function(Specifier::Int, 0, Some(Rc::from(vec![])));
    c.declare_function(&Rc::from("f"), ty.clone());
    c.declare_function(&Rc::from("f"), ty);
    assert_eq!(c.reporter.count(), 0);
  }

  #[test]
  fn declare_function_twice_with_different_type_reports_conflicting() {
    let mut c = checker();
    c.declare_function(&Rc::from("f"), Type::function(Specifier::Int, 0, None));
    c.declare_function(&Rc::from("f"), Type::function(Specifier::Long, 0, None));
    assert_eq!(c.reporter.count(), 1);
  }

  #[test]
  fn void_scalar_global_reports_void_object() {
    let mut c = checker();
    c.declare_variable(&Rc::from("x"), Type::scalar(Specifier::Void, 0));
    assert_eq!(c.reporter.count(), 1);
  }

  #[test]
  fn void_pointer_global_is_fine() {
    let mut c = checker();
    c.declare_variable(&Rc::from("x"), Type::scalar(Specifier::Void, 1));
    assert_eq!(c.reporter.count(), 0);
  }

  #[test]
  fn redeclaring_in_a_nested_scope_reports_redeclaration() {
    let mut c = checker();
    c.scope.open_scope();
    c.declare_variable(&Rc::from("x"), Type::scalar(Specifier::Int, 0));
    c.declare_variable(&Rc::from("x"), Type::scalar(Specifier::Int, 0));
    assert_eq!(c.reporter.count(), 1);
  }

  #[test]
  fn undeclared_identifier_reports_and_inserts_error_symbol() {
    let mut c = checker();
    let sym = c.check_identifier(&Rc::from("y"));
    assert!(sym.ty.is_error());
    assert_eq!(c.reporter.count(), 1);
    // Second lookup finds the inserted error symbol without reporting again.
    let sym2 = c.check_identifier(&Rc::from("y"));
    assert!(sym2.ty.is_error());
    assert_eq!(c.reporter.count(), 1);
  }

  #[test]
  fn character_literal_is_not_numeric_for_negate() {
    let mut c = checker();
    let character = Type::scalar(Specifier::Character, 0);
    let result = c.check_negate(&character);
    assert!(result.is_error());
    assert_eq!(c.reporter.count(), 1);
  }

  #[test]
  fn void_pointer_dereference_is_rejected() {
    let mut c = checker();
    let result = c.check_dereference(&Type::scalar(Specifier::Void, 1));
    assert!(result.is_error());
    assert_eq!(c.reporter.count(), 1);
  }

  #[test]
  fn pointer_plus_int_yields_pointer_but_void_pointer_plus_int_errors() {
    let mut c = checker();
    let int_ptr = Type::scalar(Specifier::Int, 1);
    let int_val = Type::scalar(Specifier::Int, 0);
    assert_eq!(c.check_addition(&int_ptr, &int_val), int_ptr.clone());

    let void_ptr = Type::scalar(Specifier::Void, 1);
    assert!(c.check_addition(&void_ptr, &int_val).is_error());
  }

  #[test]
  fn pointer_minus_pointer_same_specifier_yields_long() {
    let mut c = checker();
    let a = Type::scalar(Specifier::Int, 1);
    let b = Type::scalar(Specifier::Int, 1);
    assert_eq!(c.check_subtraction(&a, &b), Type::scalar(Specifier::Long, 0));
  }

  #[test]
  fn unspecified_parameter_list_accepts_any_predicate_args() {
    let mut c = checker();
    let callee = Type::function(Specifier::Int, 0, None);
    let args = vec![Type::scalar(Specifier::Int, 0), Type::scalar(Specifier::Int, 1)];
    assert!(!c.check_function(&callee, &args).is_error());
  }
}
