//! The top-level driver: read a translation unit, parse and check it, emit
//! assembly. The shape ("parse; on success, generate") follows spec.md
//! §6's exit-code rule: only a syntax error fails the process. Semantic
//! diagnostics are reported to stderr but never stop code generation. The
//! teaching compiler this is based on may happily emit assembly for a
//! semantically broken program.

use std::io::{Read, Write};
use std::process::ExitCode;
use std::rc::Rc;

use crate::ast::Stmt;
use crate::codegen::Codegen;
use crate::parser::Parser;
use crate::report::Reporter;

/// Reads all of `reader`, compiles it, and writes assembly to `writer`.
/// Returns `ExitCode::FAILURE` only when a syntax error was encountered.
pub fn compile(mut reader: impl Read, writer: impl Write) -> ExitCode {
  let mut src = Vec::new();
  if reader.read_to_end(&mut src).is_err() {
    return ExitCode::FAILURE;
  }

  let reporter = Reporter::new(std::io::stderr());
  let mut parser = Parser::new(&src, reporter);
  let result = parser.run();
  let (ast, functions, mut checker) = parser.into_parts();

  if result.is_err() {
    return ExitCode::FAILURE;
  }

  let globals = checker.scope.close_scope();
  let mut codegen = Codegen::new(&ast, writer);

  for &id in &functions {
    if let Stmt::Function(sym, body) = ast.stmt(id) {
      let sym: Rc<_> = sym.clone();
      let body = *body;
      if codegen.generate_function(&sym, body).is_err() {
        return ExitCode::FAILURE;
      }
    }
  }
  if codegen.generate_globals(globals.symbols()).is_err() {
    return ExitCode::FAILURE;
  }

  ExitCode::SUCCESS
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn syntax_error_emits_no_assembly() {
    let mut out = Vec::new();
    let _ = compile("int main( { return 0; }".as_bytes(), &mut out);
    assert!(out.is_empty(), "a syntax error must not reach code generation");
  }

  #[test]
  fn semantic_error_still_emits_assembly() {
    let mut out = Vec::new();
    let _ = compile("int main() { return undeclared; }".as_bytes(), &mut out);
    assert!(!out.is_empty(), "a well-formed-but-unchecked program still emits assembly");
  }

  #[test]
  fn well_formed_program_emits_a_callable_function_label() {
    let mut out = Vec::new();
    let _ = compile("int add(int a, int b) { return a + b; }".as_bytes(), &mut out);
    let text = String::from_utf8(out).unwrap();
    assert!(text.contains("add:"));
    assert!(text.contains("ret"));
  }
}
