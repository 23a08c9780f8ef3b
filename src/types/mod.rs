//! Type representation for Simple C.

mod ty;

pub use ty::{Declarator, Specifier, Type};
