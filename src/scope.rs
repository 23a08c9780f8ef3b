//! Nested lexical scopes: a stack of frames, each an ordered sequence of
//! symbols. The bottom frame is the distinguished outermost (file) scope;
//! functions are always inserted there regardless of the current depth.

use std::rc::Rc;

use smallvec::SmallVec;

use crate::symbol::Symbol;

/// One lexical frame: the symbols declared directly in it, in declaration
/// order (declaration order matters downstream, since codegen spills
/// parameters in this order). Most Simple C scopes hold a handful of names,
/// so the common case never touches the heap.
#[derive(Default, Debug)]
pub struct Frame {
  symbols: SmallVec<[Rc<Symbol>; 8]>,
}

impl Frame {
  #[must_use] pub fn symbols(&self) -> &[Rc<Symbol>] { &self.symbols }

  fn position(&self, name: &str) -> Option<usize> {
    self.symbols.iter().position(|s| &*s.name == name)
  }
}

/// The scope stack. `open_scope`/`close_scope` push and pop frames;
/// `find` searches only the innermost frame, `lookup` walks outward to the
/// outermost.
#[derive(Debug)]
pub struct Scope {
  frames: Vec<Frame>,
}

impl Scope {
  #[must_use] pub fn new() -> Self { Scope { frames: Vec::new() } }

  pub fn open_scope(&mut self) {
    self.frames.push(Frame::default());
    log::trace!("open_scope: depth now {}", self.frames.len());
  }

  /// Pop the innermost frame and return it.
  pub fn close_scope(&mut self) -> Frame {
    let frame = self.frames.pop().expect("close_scope with no open scope");
    log::trace!("close_scope: depth now {}, {} symbols dropped", self.frames.len(), frame.symbols.len());
    frame
  }

  #[must_use] pub fn outermost(&self) -> &Frame {
    self.frames.first().expect("no outermost scope")
  }

  fn outermost_mut(&mut self) -> &mut Frame {
    self.frames.first_mut().expect("no outermost scope")
  }

  #[must_use] pub fn is_outermost(&self) -> bool { self.frames.len() == 1 }

  fn toplevel_mut(&mut self) -> &mut Frame {
    self.frames.last_mut().expect("no open scope")
  }

  pub fn insert(&mut self, symbol: Rc<Symbol>) {
    log::debug!("insert {} into frame {}", symbol.name, self.frames.len() - 1);
    self.toplevel_mut().symbols.push(symbol);
  }

  pub fn insert_outermost(&mut self, symbol: Rc<Symbol>) {
    self.outermost_mut().symbols.push(symbol);
  }

  /// Remove the symbol with the given name from the current (innermost)
  /// frame, if present.
  pub fn remove(&mut self, name: &str) {
    let frame = self.toplevel_mut();
    if let Some(i) = frame.position(name) {
      log::debug!("remove {name} from current frame");
      frame.symbols.remove(i);
    }
  }

  pub fn remove_outermost(&mut self, name: &str) {
    let frame = self.outermost_mut();
    if let Some(i) = frame.position(name) {
      frame.symbols.remove(i);
    }
  }

  /// Search the current (innermost) frame only.
  #[must_use] pub fn find(&self, name: &str) -> Option<Rc<Symbol>> {
    let frame = self.frames.last().expect("no open scope");
    frame.position(name).map(|i| frame.symbols[i].clone())
  }

  #[must_use] pub fn find_outermost(&self, name: &str) -> Option<Rc<Symbol>> {
    let frame = self.outermost();
    frame.position(name).map(|i| frame.symbols[i].clone())
  }

  /// Search the current frame, then each enclosing frame in turn, out to
  /// the outermost.
  #[must_use] pub fn lookup(&self, name: &str) -> Option<Rc<Symbol>> {
    self.frames.iter().rev().find_map(|frame| {
      frame.position(name).map(|i| frame.symbols[i].clone())
    })
  }
}

impl Default for Scope {
  fn default() -> Self { Self::new() }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::types::{Specifier, Type};

  fn sym(name: &str) -> Rc<Symbol> {
    Rc::new(Symbol::new(name.into(), Type::scalar(Specifier::Int, 0)))
  }

  #[test]
  fn insert_then_find_returns_the_inserted_symbol() {
    let mut scope = Scope::new();
    scope.open_scope();
    scope.insert(sym("x"));
    assert!(scope.find("x").is_some());
    assert!(scope.find("y").is_none());
  }

  #[test]
  fn insert_then_close_then_lookup_in_parent_finds_it() {
    let mut scope = Scope::new();
    scope.open_scope();
    scope.insert(sym("outer"));
    scope.open_scope();
    scope.insert(sym("inner"));
    scope.close_scope();
    assert!(scope.lookup("outer").is_some());
    assert!(scope.find("outer").is_none());
  }

  #[test]
  fn lookup_walks_outward_but_find_does_not() {
    let mut scope = Scope::new();
    scope.open_scope();
    scope.insert(sym("a"));
    scope.open_scope();
    assert!(scope.lookup("a").is_some());
    assert!(scope.find("a").is_none());
  }

  #[test]
  fn functions_always_land_in_the_outermost_frame() {
    let mut scope = Scope::new();
    scope.open_scope();
    scope.open_scope();
    scope.open_scope();
    scope.insert_outermost(sym("f"));
    assert!(scope.find_outermost("f").is_some());
    assert!(scope.find("f").is_none());
  }
}
