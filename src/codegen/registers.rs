//! The fixed register pool and its weak bidirectional binding to AST nodes.
//!
//! Each register holds at most one bound expression node; each expression
//! node holds at most one bound register. The two links are kept in sync by
//! [`RegisterFile::assign`]; nothing else in this module writes to either
//! side directly.

use crate::ast::{Ast, NodeId};

/// The allocation pool, in `getreg()`'s search order. `Rax` doubles as the
/// division quotient / call-result register; the caller is responsible for
/// not treating it as general-purpose mid-division.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum RegId {
  Rax, Rdi, Rsi, Rdx, Rcx, R8, R9, R10, R11,
}

impl RegId {
  pub const POOL: [RegId; 9] = [
    RegId::Rax, RegId::Rdi, RegId::Rsi, RegId::Rdx, RegId::Rcx,
    RegId::R8, RegId::R9, RegId::R10, RegId::R11,
  ];

  /// The six System V argument registers, in order.
  pub const PARAMETERS: [RegId; 6] = [
    RegId::Rdi, RegId::Rsi, RegId::Rdx, RegId::Rcx, RegId::R8, RegId::R9,
  ];

  #[must_use] pub fn name(self, size: u64) -> &'static str {
    match (self, size) {
      (RegId::Rax, 1) => "%al", (RegId::Rax, 4) => "%eax", (RegId::Rax, _) => "%rax",
      (RegId::Rdi, 1) => "%dil", (RegId::Rdi, 4) => "%edi", (RegId::Rdi, _) => "%rdi",
      (RegId::Rsi, 1) => "%sil", (RegId::Rsi, 4) => "%esi", (RegId::Rsi, _) => "%rsi",
      (RegId::Rdx, 1) => "%dl", (RegId::Rdx, 4) => "%edx", (RegId::Rdx, _) => "%rdx",
      (RegId::Rcx, 1) => "%cl", (RegId::Rcx, 4) => "%ecx", (RegId::Rcx, _) => "%rcx",
      (RegId::R8, 1) => "%r8b", (RegId::R8, 4) => "%r8d", (RegId::R8, _) => "%r8",
      (RegId::R9, 1) => "%r9b", (RegId::R9, 4) => "%r9d", (RegId::R9, _) => "%r9",
      (RegId::R10, 1) => "%r10b", (RegId::R10, 4) => "%r10d", (RegId::R10, _) => "%r10",
      (RegId::R11, 1) => "%r11b", (RegId::R11, 4) => "%r11d", (RegId::R11, _) => "%r11",
    }
  }
}

/// Tracks which node (if any) currently occupies each register. Spilling
/// and loading are done by the caller (they need to emit assembly, which
/// this type knows nothing about); this type only maintains the binding.
#[derive(Default, Debug)]
pub struct RegisterFile {
  bound: [Option<NodeId>; 9],
}

impl RegisterFile {
  #[must_use] pub fn new() -> Self { RegisterFile { bound: [None; 9] } }

  fn slot(reg: RegId) -> usize {
    RegId::POOL.iter().position(|&r| r == reg).expect("RegId is always in POOL")
  }

  #[must_use] pub fn node_in(&self, reg: RegId) -> Option<NodeId> { self.bound[Self::slot(reg)] }

  /// The first register bound to no node, in pool order. Matches the
  /// source's linear `getreg()` scan exactly, including its one quirk: if
  /// called twice in a row with no intervening `assign`, it returns the
  /// same register both times.
  #[must_use] pub fn getreg(&self) -> RegId {
    let reg = RegId::POOL.iter().copied().find(|&r| self.node_in(r).is_none())
      .expect("register pool exhausted");
    log::trace!("getreg: {reg:?}");
    reg
  }

  /// Rebind `expr` and `reg` to each other, breaking whatever each was
  /// previously bound to. Either argument may be `None` to simply clear a
  /// side: `assign(None, Some(reg))` evicts `reg`; `assign(Some(expr),
  /// None)` clears `expr`'s register cell without claiming a new one.
  pub fn assign(&mut self, ast: &Ast, expr: Option<NodeId>, reg: Option<RegId>) {
    if let Some(expr) = expr {
      if let Some(old) = ast.expr(expr).register.get() {
        self.bound[Self::slot(old)] = None;
      }
    }
    if let Some(reg) = reg {
      if let Some(old) = self.bound[Self::slot(reg)] {
        log::debug!("assign: evicting node {old:?} from {reg:?}");
        ast.expr(old).register.set(None);
      }
    }
    if let Some(expr) = expr {
      ast.expr(expr).register.set(reg);
    }
    if let Some(reg) = reg {
      self.bound[Self::slot(reg)] = expr;
    }
    log::trace!("assign: {expr:?} <-> {reg:?}");
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::ast::ExprKind;
  use crate::types::{Specifier, Type};

  #[test]
  fn getreg_returns_first_free_register_in_pool_order() {
    let file = RegisterFile::new();
    assert_eq!(file.getreg(), RegId::Rax);
  }

  #[test]
  fn assign_binds_both_directions() {
    let mut ast = Ast::new();
    let id = ast.push_expr(ExprKind::Number(1), Type::scalar(Specifier::Int, 0));
    let mut file = RegisterFile::new();
    file.assign(&ast, Some(id), Some(RegId::Rax));
    assert_eq!(ast.expr(id).register.get(), Some(RegId::Rax));
    assert_eq!(file.node_in(RegId::Rax), Some(id));
  }

  #[test]
  fn rebinding_a_register_evicts_its_previous_node() {
    let mut ast = Ast::new();
    let a = ast.push_expr(ExprKind::Number(1), Type::scalar(Specifier::Int, 0));
    let b = ast.push_expr(ExprKind::Number(2), Type::scalar(Specifier::Int, 0));
    let mut file = RegisterFile::new();
    file.assign(&ast, Some(a), Some(RegId::Rax));
    file.assign(&ast, Some(b), Some(RegId::Rax));
    assert_eq!(ast.expr(a).register.get(), None);
    assert_eq!(file.node_in(RegId::Rax), Some(b));
  }

  #[test]
  fn evicting_with_none_clears_the_register_only() {
    let mut ast = Ast::new();
    let id = ast.push_expr(ExprKind::Number(1), Type::scalar(Specifier::Int, 0));
    let mut file = RegisterFile::new();
    file.assign(&ast, Some(id), Some(RegId::Rdx));
    file.assign(&ast, None, Some(RegId::Rdx));
    assert_eq!(ast.expr(id).register.get(), None);
    assert_eq!(file.node_in(RegId::Rdx), None);
  }
}
