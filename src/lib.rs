//! A recursive-descent compiler for Simple C: a small, typed subset of C
//! (`int`/`char`/`long`/`void`, pointers, fixed-size arrays, globals and
//! functions, a restricted statement grammar) compiled straight to
//! x86-64 System V assembly text with no intermediate representation and
//! no optimization passes. See `SPEC_FULL.md` for the full module map.

pub mod ast;
pub mod checker;
pub mod codegen;
pub mod driver;
pub mod lexer;
pub mod parser;
pub mod report;
pub mod scope;
pub mod symbol;
pub mod token;
pub mod types;

pub use driver::compile;
