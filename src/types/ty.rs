//! The `Type` value and its operations: equality, promotion, compatibility,
//! and byte size. Mirrors the four declarator kinds a Simple C type can take.

use std::rc::Rc;

/// The base type keyword. `Character` is not a real declarable specifier —
/// it is what a character *literal* gets instead of `Char`, reproducing a
/// quirk of the course compiler this is based on (see `checkNumeric`
/// below). Nothing in Simple C source can declare a variable with this
/// specifier; only the parser's primary-expression rule for `CHARACTER`
/// tokens produces it.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Specifier {
  Int,
  Char,
  Long,
  Void,
  Character,
}

/// Which of the four declarator shapes a type has, plus its payload.
#[derive(Clone, Debug)]
pub enum Declarator {
  Scalar,
  Array(u64),
  /// `None` means the parameter list is unspecified (a bare `f()`
  /// declaration); `Some` is an ordered list of parameter types from a
  /// definition or prototype.
  Function(Option<Rc<[Type]>>),
  Error,
}

/// A Simple C type: declarator kind, specifier, pointer depth, and
/// declarator-specific payload (array length or parameter list).
#[derive(Clone, Debug)]
pub struct Type {
  pub specifier: Specifier,
  pub indirection: u32,
  pub declarator: Declarator,
}

impl Type {
  /// Construct a scalar type.
  #[must_use] pub fn scalar(specifier: Specifier, indirection: u32) -> Self {
    Type { specifier, indirection, declarator: Declarator::Scalar }
  }

  /// Construct an array type.
  #[must_use] pub fn array(specifier: Specifier, indirection: u32, length: u64) -> Self {
    Type { specifier, indirection, declarator: Declarator::Array(length) }
  }

  /// Construct a function type. `parameters = None` means the parameter
  /// list is unspecified.
  #[must_use] pub fn function(specifier: Specifier, indirection: u32,
    parameters: Option<Rc<[Type]>>
  ) -> Self {
    Type { specifier, indirection, declarator: Declarator::Function(parameters) }
  }

  /// The distinguished error type. Equal to itself, absorbed silently by
  /// every check.
  #[must_use] pub fn error() -> Self {
    Type { specifier: Specifier::Int, indirection: 0, declarator: Declarator::Error }
  }

  #[must_use] pub fn is_error(&self) -> bool { matches!(self.declarator, Declarator::Error) }
  #[must_use] pub fn is_scalar(&self) -> bool { matches!(self.declarator, Declarator::Scalar) }
  #[must_use] pub fn is_array(&self) -> bool { matches!(self.declarator, Declarator::Array(_)) }
  #[must_use] pub fn is_function(&self) -> bool { matches!(self.declarator, Declarator::Function(_)) }

  #[must_use] pub fn parameters(&self) -> Option<&Rc<[Type]>> {
    match &self.declarator {
      Declarator::Function(p) => p.as_ref(),
      _ => None,
    }
  }

  /// Array-to-pointer decay; identity on every other declarator. Used in
  /// every context that expects an r-value.
  #[must_use] pub fn promote(&self) -> Type {
    match self.declarator {
      Declarator::Array(_) =>
        Type::scalar(self.specifier, self.indirection + 1),
      _ => self.clone(),
    }
  }

  /// True for `{INT, CHAR, LONG}` scalars with no indirection. Note this
  /// does *not* recognize `Character` (see the doc comment on
  /// [`Specifier::Character`]) — a raw character literal is not numeric
  /// until it has gone through whatever turned it into one, which in
  /// Simple C never happens. Callers that need array/function operands
  /// treated as non-numeric should call this directly (unpromoted); callers
  /// doing pointer arithmetic should promote first.
  #[must_use] pub fn is_numeric(&self) -> bool {
    self.is_scalar() && self.indirection == 0 &&
      matches!(self.specifier, Specifier::Int | Specifier::Char | Specifier::Long)
  }

  /// Indirection >= 1 after promotion — covers both real pointers and
  /// decayed arrays.
  #[must_use] pub fn is_pointer(&self) -> bool {
    let p = self.promote();
    p.is_scalar() && p.indirection >= 1
  }

  /// A scalar (numeric or pointer) after promotion — suitable for a
  /// boolean test, `sizeof`, or a varargs-style call argument.
  #[must_use] pub fn is_predicate(&self) -> bool {
    self.promote().is_scalar()
  }

  /// Both operands numeric, or both pointer to the same specifier and
  /// indirection, after promotion.
  #[must_use] pub fn is_compatible_with(&self, other: &Type) -> bool {
    let a = self.promote();
    let b = other.promote();
    if a.is_numeric() && b.is_numeric() { return true }
    a.is_pointer() && b.is_pointer() && a.specifier == b.specifier && a.indirection == b.indirection
  }

  /// Size of one element, ignoring any `Array` wrapper: 8 for any pointer,
  /// otherwise by specifier.
  fn element_size(&self) -> u64 {
    if self.indirection > 0 { return 8 }
    match self.specifier {
      Specifier::Char | Specifier::Character => 1,
      Specifier::Int => 4,
      Specifier::Long => 8,
      Specifier::Void => 0,
    }
  }

  /// Byte size: `N * size(element)` for arrays, `size(element)` otherwise.
  /// Only used by code generation.
  #[must_use] pub fn size(&self) -> u64 {
    match self.declarator {
      Declarator::Array(len) => len * self.element_size(),
      _ => self.element_size(),
    }
  }
}

impl PartialEq for Type {
  fn eq(&self, other: &Type) -> bool {
    match (&self.declarator, &other.declarator) {
      (Declarator::Error, Declarator::Error) => true,
      (Declarator::Error, _) | (_, Declarator::Error) => false,
      (Declarator::Scalar, Declarator::Scalar) =>
        self.specifier == other.specifier && self.indirection == other.indirection,
      (Declarator::Array(n1), Declarator::Array(n2)) =>
        self.specifier == other.specifier && self.indirection == other.indirection && n1 == n2,
      (Declarator::Function(p1), Declarator::Function(p2)) => {
        if self.specifier != other.specifier || self.indirection != other.indirection {
          return false
        }
        match (p1, p2) {
          (None, _) | (_, None) => true,
          (Some(a), Some(b)) => a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x == y),
        }
      }
      _ => false,
    }
  }
}
impl Eq for Type {}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn error_equals_itself_regardless_of_payload() {
    let e1 = Type::error();
    let mut e2 = Type::error();
    e2.specifier = Specifier::Long;
    e2.indirection = 3;
    assert_eq!(e1, e2);
    assert_ne!(e1, Type::scalar(Specifier::Int, 0));
  }

  #[test]
  fn array_promotes_to_pointer() {
    let arr = Type::array(Specifier::Int, 0, 10);
    let p = arr.promote();
    assert!(p.is_scalar());
    assert_eq!(p.indirection, 1);
    assert_eq!(p.specifier, Specifier::Int);
  }

  #[test]
  fn array_size_is_length_times_element() {
    assert_eq!(Type::array(Specifier::Int, 0, 10).size(), 40);
    assert_eq!(Type::array(Specifier::Char, 1, 4).size(), 32);
  }

  #[test]
  fn character_literal_specifier_is_not_numeric() {
    let lit = Type::scalar(Specifier::Character, 0);
    assert!(!lit.is_numeric());
    assert!(lit.is_predicate());
  }

  #[test]
  fn unspecified_parameters_are_compatible_with_anything() {
    let unspecified = Type::function(Specifier::Int, 0, None);
    let specified = Type::function(Specifier::Int, 0,
      Some(vec![Type::scalar(Specifier::Int, 0)].into()));
    assert_eq!(unspecified, specified);
  }

  #[test]
  fn pointer_compatibility_requires_same_specifier_and_indirection() {
    let int_ptr = Type::scalar(Specifier::Int, 1);
    let char_ptr = Type::scalar(Specifier::Char, 1);
    assert!(!int_ptr.is_compatible_with(&char_ptr));
    assert!(int_ptr.is_compatible_with(&Type::scalar(Specifier::Int, 1)));
  }
}
