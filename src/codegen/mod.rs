//! The code generator: walks the AST once, emitting x86-64 System V AT&T
//! assembly text. Grounded throughout in
//! `examples/original_source/phase6/generator.cpp`, which supplies the
//! suffix/size rules, the `assign`/`load`/`getreg` register discipline
//! (including the "`getreg()` called twice" sequence in the comparison
//! operators, §9 of the design notes), division/remainder via
//! `%rax`/`%rdx`, short-circuit `&&`/`||`, and the prologue/epilogue shape.
//! Array indexing has no surviving reference implementation in the source
//! pack (the retrieved `generator.cpp` never defines `Subscript::generate`);
//! its codegen below is an extrapolation from the Dereference/address
//! patterns the source does show, noted as such in `DESIGN.md`.

pub mod registers;

use std::io;
use std::io::Write;
use std::rc::Rc;

use hashbrown::HashMap;

use crate::ast::{Ast, ExprKind, NodeId, Stmt};
use crate::symbol::Symbol;

use registers::{RegId, RegisterFile};

const STACK_ALIGNMENT: i32 = 16;
const NUM_PARAM_REGS: usize = 6;
const SIZEOF_PARAM: u32 = 8;

#[cfg(target_os = "macos")]
const GLOBAL_PREFIX: &str = "_";
#[cfg(not(target_os = "macos"))]
const GLOBAL_PREFIX: &str = "";

fn suffix(size: u64) -> &'static str {
  match size { 1 => "b", 4 => "l", _ => "q" }
}

/// Everything the generator threads through every `generate` call, bundled
/// rather than kept as module statics (spec.md's "global mutable state"
/// design note).
pub struct Codegen<'a, W> {
  ast: &'a Ast,
  out: W,
  regs: RegisterFile,
  offset: i32,
  funcname: Rc<str>,
  labels: u32,
  /// Distinct string literals, in first-use order for `.data` emission,
  /// with an index side table for exact-contents interning lookups.
  strings: Vec<Rc<str>>,
  string_index: HashMap<Rc<str>, u32>,
}

impl<'a, W: Write> Codegen<'a, W> {
  #[must_use] pub fn new(ast: &'a Ast, out: W) -> Self {
    Codegen {
      ast, out,
      regs: RegisterFile::new(),
      offset: 0,
      funcname: Rc::from(""),
      labels: 0,
      strings: Vec::new(),
      string_index: HashMap::new(),
    }
  }

  fn label(&mut self) -> String {
    let l = format!(".L{}", self.labels);
    self.labels += 1;
    l
  }

  fn string_label(&mut self, s: &Rc<str>) -> String {
    if let Some(&n) = self.string_index.get(s) {
      return format!(".LS{n}");
    }
    let n = self.strings.len() as u32;
    self.strings.push(s.clone());
    self.string_index.insert(s.clone(), n);
    format!(".LS{n}")
  }

  fn operand(&mut self, id: NodeId) -> String {
    let expr = self.ast.expr(id);
    if let Some(reg) = expr.register.get() {
      return reg.name(expr.ty.size().max(1)).to_string();
    }
    match &expr.kind {
      ExprKind::Ident(sym) => {
        if sym.offset.get() == 0 {
          format!("{GLOBAL_PREFIX}{}", sym.name)
        } else {
          format!("{}(%rbp)", sym.offset.get())
        }
      }
      ExprKind::Number(n) => format!("${n}"),
      ExprKind::Str(s) => self.string_label(s),
      _ => format!("{}(%rbp)", expr.offset.get()),
    }
  }

  fn size_of(&self, id: NodeId) -> u64 { self.ast.expr(id).ty.size().max(1) }

  fn ensure_in_reg(&mut self, id: NodeId) -> RegId {
    if let Some(r) = self.ast.expr(id).register.get() { return r }
    let reg = self.regs.getreg();
    self.load(id, reg);
    reg
  }

  /// `load(expr, reg)`: spill whatever currently occupies `reg`, then move
  /// `expr`'s current operand into it.
  fn load(&mut self, id: NodeId, reg: RegId) {
    if self.ast.expr(id).register.get() == Some(reg) { return }
    if let Some(occupant) = self.regs.node_in(reg) {
      let size = self.size_of(occupant);
      self.offset -= size as i32;
      let slot = self.offset;
      self.ast.expr(occupant).offset.set(slot);
      let name = reg.name(size);
      let sfx = suffix(size);
      let _ = writeln!(self.out, "\tmov{sfx}\t{name}, {slot}(%rbp)");
    }
    let size = self.size_of(id);
    let operand = self.operand(id);
    let sfx = suffix(size);
    let name = reg.name(size);
    let _ = writeln!(self.out, "\tmov{sfx}\t{operand}, {name}");
    self.regs.assign(self.ast, Some(id), Some(reg));
  }

  fn evict(&mut self, reg: RegId) {
    log::trace!("evict {reg:?}");
    self.regs.assign(self.ast, None, Some(reg));
  }

  fn release(&mut self, id: NodeId) {
    log::trace!("release {id:?}");
    self.regs.assign(self.ast, Some(id), None);
  }

  /// Generate `id`, ensure it lands in a register, and branch on it.
  fn test(&mut self, id: NodeId, label: &str, if_true: bool) {
    self.generate_expr(id);
    let reg = self.ensure_in_reg(id);
    let size = self.size_of(id);
    let name = reg.name(size);
    let sfx = suffix(size);
    let jump = if if_true { "jne" } else { "je" };
    let _ = writeln!(self.out, "\tcmp{sfx}\t$0, {name}");
    let _ = writeln!(self.out, "\t{jump}\t{label}");
    self.release(id);
  }

  fn binary_arith(&mut self, id: NodeId, l: NodeId, r: NodeId, op: &str) {
    self.generate_expr(l);
    self.generate_expr(r);
    self.ensure_in_reg(l);
    let left_reg = self.ast.expr(l).register.get().unwrap();
    let right_operand = self.operand(r);
    let sfx = suffix(self.size_of(l));
    let left_name = left_reg.name(self.size_of(l));
    let _ = writeln!(self.out, "\t{op}{sfx}\t{right_operand}, {left_name}");
    self.release(r);
    self.regs.assign(self.ast, Some(id), Some(left_reg));
  }

  fn divmod(&mut self, id: NodeId, l: NodeId, r: NodeId, want_remainder: bool) {
    self.generate_expr(l);
    self.generate_expr(r);
    self.load(l, RegId::Rax);
    self.evict(RegId::Rdx);
    self.load(r, RegId::Rcx);
    let _ = writeln!(self.out, "\t{}", if self.size_of(l) == 8 { "cqto" } else { "cltd" });
    let sfx = suffix(self.size_of(r));
    let right_name = RegId::Rcx.name(self.size_of(r));
    let _ = writeln!(self.out, "\tidiv{sfx}\t{right_name}");
    self.release(r);
    self.release(l);
    let result_reg = if want_remainder { RegId::Rdx } else { RegId::Rax };
    self.regs.assign(self.ast, Some(id), Some(result_reg));
  }

  fn compare(&mut self, id: NodeId, l: NodeId, r: NodeId, set: &str) {
    self.generate_expr(l);
    self.generate_expr(r);
    self.ensure_in_reg(l);
    let left_reg = self.ast.expr(l).register.get().unwrap();
    let left_name = left_reg.name(self.size_of(l));
    let right_operand = self.operand(r);
    let sfx = suffix(self.size_of(l));
    let _ = writeln!(self.out, "\tcmp{sfx}\t{right_operand}, {left_name}");
    self.release(r);
    self.release(l);
    let result_reg = self.regs.getreg();
    self.regs.assign(self.ast, Some(id), Some(result_reg));
    let byte_reg = self.regs.getreg();
    let byte_name = byte_reg.name(1);
    let _ = writeln!(self.out, "\t{set}\t{byte_name}");
    let dest = result_reg.name(4);
    let _ = writeln!(self.out, "\tmovzbl\t{byte_name}, {dest}");
  }

  fn generate_expr(&mut self, id: NodeId) {
    let kind_needs_dispatch = matches!(self.ast.expr(id).kind,
      ExprKind::Number(_) | ExprKind::Str(_) | ExprKind::Ident(_));
    if kind_needs_dispatch { return }

    match &self.ast.expr(id).kind {
      ExprKind::Number(_) | ExprKind::Str(_) | ExprKind::Ident(_) => unreachable!(),
      ExprKind::Call(callee, args) => self.generate_call(id, callee.clone(), args.clone()),
      ExprKind::Not(e) => {
        let e = *e;
        self.generate_expr(e);
        self.ensure_in_reg(e);
        let sfx = suffix(self.size_of(e));
        let name = self.ast.expr(e).register.get().unwrap().name(self.size_of(e));
        let _ = writeln!(self.out, "\tcmp{sfx}\t$0, {name}");
        self.release(e);
        let reg = self.regs.getreg();
        self.regs.assign(self.ast, Some(id), Some(reg));
        let byte = self.regs.getreg();
        let _ = writeln!(self.out, "\tsete\t{}", byte.name(1));
        let _ = writeln!(self.out, "\tmovzbl\t{}, {}", byte.name(1), reg.name(4));
      }
      ExprKind::Negate(e) => {
        let e = *e;
        self.generate_expr(e);
        self.ensure_in_reg(e);
        let reg = self.ast.expr(e).register.get().unwrap();
        let sfx = suffix(self.size_of(e));
        let _ = writeln!(self.out, "\tneg{sfx}\t{}", reg.name(self.size_of(e)));
        self.regs.assign(self.ast, Some(id), Some(reg));
      }
      ExprKind::Dereference(e) => {
        let e = *e;
        self.generate_expr(e);
        self.ensure_in_reg(e);
        let reg = self.ast.expr(e).register.get().unwrap();
        let sfx = suffix(self.size_of(id));
        let name = reg.name(self.size_of(id));
        let _ = writeln!(self.out, "\tmov{sfx}\t({}), {name}", reg.name(8));
        self.regs.assign(self.ast, Some(id), Some(reg));
      }
      ExprKind::Address(e) => {
        let e = *e;
        if let ExprKind::Dereference(p) = &self.ast.expr(e).kind {
          let p = *p;
          self.generate_expr(p);
          self.ensure_in_reg(p);
          let reg = self.ast.expr(p).register.get().unwrap();
          self.regs.assign(self.ast, Some(id), Some(reg));
        } else {
          let reg = self.regs.getreg();
          self.regs.assign(self.ast, Some(id), Some(reg));
          let operand = self.operand(e);
          let _ = writeln!(self.out, "\tleaq\t{operand}, {}", reg.name(8));
        }
      }
      ExprKind::SizeOf(_) => {
        let reg = self.regs.getreg();
        self.regs.assign(self.ast, Some(id), Some(reg));
        let size = self.ast.expr(id).ty.size();
        let _ = writeln!(self.out, "\tmovq\t$0, {}", reg.name(8));
        let _ = writeln!(self.out, "\taddq\t${size}, {}", reg.name(8));
      }
      ExprKind::Cast(_, e) => {
        let e = *e;
        self.generate_expr(e);
        let source = self.size_of(e);
        let target = self.size_of(id);
        if source >= target {
          self.ensure_in_reg(e);
          let reg = self.ast.expr(e).register.get().unwrap();
          self.regs.assign(self.ast, Some(id), Some(reg));
        } else {
          let reg = self.regs.getreg();
          self.regs.assign(self.ast, Some(id), Some(reg));
          let operand = self.operand(e);
          let op = match (source, target) {
            (1, 4) => "movsbl",
            (1, 8) => "movsbq",
            _ => "movslq",
          };
          let _ = writeln!(self.out, "\t{op}\t{operand}, {}", reg.name(target));
        }
      }
      ExprKind::Add(l, r) => { let (l, r) = (*l, *r); self.binary_arith(id, l, r, "add") }
      ExprKind::Sub(l, r) => { let (l, r) = (*l, *r); self.binary_arith(id, l, r, "sub") }
      ExprKind::Mul(l, r) => { let (l, r) = (*l, *r); self.binary_arith(id, l, r, "imul") }
      ExprKind::Div(l, r) => { let (l, r) = (*l, *r); self.divmod(id, l, r, false) }
      ExprKind::Rem(l, r) => { let (l, r) = (*l, *r); self.divmod(id, l, r, true) }
      ExprKind::LessThan(l, r) => { let (l, r) = (*l, *r); self.compare(id, l, r, "setl") }
      ExprKind::GreaterThan(l, r) => { let (l, r) = (*l, *r); self.compare(id, l, r, "setg") }
      ExprKind::LessOrEqual(l, r) => { let (l, r) = (*l, *r); self.compare(id, l, r, "setle") }
      ExprKind::GreaterOrEqual(l, r) => { let (l, r) = (*l, *r); self.compare(id, l, r, "setge") }
      ExprKind::Equal(l, r) => { let (l, r) = (*l, *r); self.compare(id, l, r, "sete") }
      ExprKind::NotEqual(l, r) => { let (l, r) = (*l, *r); self.compare(id, l, r, "setne") }
      ExprKind::LogicalAnd(l, r) => { let (l, r) = (*l, *r); self.short_circuit(id, l, r, false) }
      ExprKind::LogicalOr(l, r) => { let (l, r) = (*l, *r); self.short_circuit(id, l, r, true) }
      ExprKind::Index(base, idx) => { let (base, idx) = (*base, *idx); self.generate_index(id, base, idx) }
    }
  }

  fn short_circuit(&mut self, id: NodeId, l: NodeId, r: NodeId, is_or: bool) {
    let success = self.label();
    let failure = self.label();
    self.test(l, &success, is_or);
    self.test(r, &success, is_or);
    let reg = self.regs.getreg();
    self.regs.assign(self.ast, Some(id), Some(reg));
    let (fallthrough, on_success) = if is_or { (0, 1) } else { (1, 0) };
    let name = reg.name(4);
    let _ = writeln!(self.out, "\tmovl\t${fallthrough}, {name}");
    let _ = writeln!(self.out, "\tjmp\t{failure}");
    let _ = writeln!(self.out, "{success}:");
    let _ = writeln!(self.out, "\tmovl\t${on_success}, {name}");
    let _ = writeln!(self.out, "{failure}:");
  }

  /// `a[i]`: compute `base + i * element_size` into a register, then load
  /// through it. No reference implementation survives in the source pack;
  /// see the module doc comment.
  fn generate_index(&mut self, id: NodeId, base: NodeId, idx: NodeId) {
    self.generate_expr(base);
    self.generate_expr(idx);
    self.ensure_in_reg(base);
    self.ensure_in_reg(idx);
    let base_reg = self.ast.expr(base).register.get().unwrap();
    let idx_reg = self.ast.expr(idx).register.get().unwrap();
    let elem_size = self.ast.expr(id).ty.size().max(1);
    let _ = writeln!(self.out, "\timulq\t${elem_size}, {}", idx_reg.name(8));
    let _ = writeln!(self.out, "\taddq\t{}, {}", idx_reg.name(8), base_reg.name(8));
    self.release(idx);
    let sfx = suffix(elem_size);
    let dest = base_reg.name(elem_size);
    let _ = writeln!(self.out, "\tmov{sfx}\t({}), {dest}", base_reg.name(8));
    self.regs.assign(self.ast, Some(id), Some(base_reg));
  }

  fn generate_call(&mut self, id: NodeId, callee: Rc<Symbol>, args: Vec<NodeId>) {
    for &arg in args.iter().rev() {
      self.generate_expr(arg);
    }
    let mut stack_bytes = 0u32;
    if args.len() > NUM_PARAM_REGS {
      let extra = (args.len() - NUM_PARAM_REGS) as u32 * SIZEOF_PARAM;
      let rem = extra % STACK_ALIGNMENT as u32;
      if rem != 0 {
        let pad = STACK_ALIGNMENT as u32 - rem;
        let _ = writeln!(self.out, "\tsubq\t${pad}, %rsp");
        stack_bytes += pad;
      }
    }
    for (i, &arg) in args.iter().enumerate().rev() {
      if i >= NUM_PARAM_REGS {
        stack_bytes += SIZEOF_PARAM;
        self.load(arg, RegId::Rax);
        let _ = writeln!(self.out, "\tpushq\t%rax");
      } else {
        self.load(arg, RegId::PARAMETERS[i]);
      }
      self.release(arg);
    }
    for &reg in &RegId::POOL { self.evict(reg) }
    if callee.ty.parameters().is_none() {
      let _ = writeln!(self.out, "\tmovl\t$0, %eax");
    }
    let _ = writeln!(self.out, "\tcall\t{GLOBAL_PREFIX}{}", callee.name);
    if stack_bytes > 0 {
      let _ = writeln!(self.out, "\taddq\t${stack_bytes}, %rsp");
    }
    self.regs.assign(self.ast, Some(id), Some(RegId::Rax));
  }

  fn assign_offsets(&mut self, symbols: &[Rc<Symbol>]) {
    for sym in symbols {
      let size = sym.ty.size().max(1) as i32;
      self.offset -= size;
      sym.offset.set(self.offset);
    }
  }

  fn generate_stmt(&mut self, id: NodeId) {
    match self.ast.stmt(id) {
      Stmt::Block(decls, stmts) => {
        self.assign_offsets(decls);
        for &s in stmts { self.generate_stmt(s) }
      }
      Stmt::Simple(e) => { let e = *e; self.generate_expr(e); self.release(e) }
      Stmt::Assignment(l, r) => { let (l, r) = (*l, *r); self.generate_assignment(l, r) }
      Stmt::Return(e) => {
        let e = *e;
        self.generate_expr(e);
        self.load(e, RegId::Rax);
        let _ = writeln!(self.out, "\tjmp\t{}.exit", self.funcname);
        self.release(e);
      }
      Stmt::While(e, body) => { let (e, body) = (*e, *body); self.generate_while(e, body) }
      Stmt::For(init, e, incr, body) => {
        let (init, e, incr, body) = (*init, *e, *incr, *body);
        self.generate_for(init, e, incr, body);
      }
      Stmt::If(e, then, else_) => { let (e, then, else_) = (*e, *then, *else_); self.generate_if(e, then, else_) }
      Stmt::Function(..) => unreachable!("nested function definitions do not occur in Simple C"),
    }
  }

  fn generate_assignment(&mut self, lhs: NodeId, rhs: NodeId) {
    self.generate_expr(rhs);
    if let ExprKind::Dereference(p) = &self.ast.expr(lhs).kind {
      let p = *p;
      self.generate_expr(p);
      self.ensure_in_reg(p);
      self.ensure_in_reg(rhs);
      let sfx = suffix(self.size_of(rhs));
      let p_reg = self.ast.expr(p).register.get().unwrap();
      let r_name = self.ast.expr(rhs).register.get().unwrap().name(self.size_of(rhs));
      let _ = writeln!(self.out, "\tmov{sfx}\t{r_name}, ({})", p_reg.name(8));
      self.release(rhs);
      self.release(p);
    } else if let ExprKind::Index(base, idx) = &self.ast.expr(lhs).kind {
      let (base, idx) = (*base, *idx);
      self.generate_expr(base);
      self.generate_expr(idx);
      self.ensure_in_reg(base);
      self.ensure_in_reg(idx);
      let base_reg = self.ast.expr(base).register.get().unwrap();
      let idx_reg = self.ast.expr(idx).register.get().unwrap();
      let elem_size = self.ast.expr(lhs).ty.size().max(1);
      let _ = writeln!(self.out, "\timulq\t${elem_size}, {}", idx_reg.name(8));
      let _ = writeln!(self.out, "\taddq\t{}, {}", idx_reg.name(8), base_reg.name(8));
      self.release(idx);
      self.ensure_in_reg(rhs);
      let sfx = suffix(elem_size);
      let r_name = self.ast.expr(rhs).register.get().unwrap().name(elem_size);
      let _ = writeln!(self.out, "\tmov{sfx}\t{r_name}, ({})", base_reg.name(8));
      self.release(rhs);
      self.release(base);
    } else {
      self.ensure_in_reg(rhs);
      let sfx = suffix(self.size_of(rhs));
      let r_name = self.ast.expr(rhs).register.get().unwrap().name(self.size_of(rhs));
      let l_operand = self.operand(lhs);
      let _ = writeln!(self.out, "\tmov{sfx}\t{r_name}, {l_operand}");
      self.release(rhs);
      self.release(lhs);
    }
  }

  fn generate_while(&mut self, e: NodeId, body: NodeId) {
    let loop_label = self.label();
    let exit_label = self.label();
    let _ = writeln!(self.out, "{loop_label}:");
    self.test(e, &exit_label, false);
    self.generate_stmt(body);
    let _ = writeln!(self.out, "\tjmp\t{loop_label}");
    let _ = writeln!(self.out, "{exit_label}:");
  }

  fn generate_for(&mut self, init: NodeId, e: NodeId, incr: NodeId, body: NodeId) {
    self.generate_stmt(init);
    let loop_label = self.label();
    let exit_label = self.label();
    let _ = writeln!(self.out, "{loop_label}:");
    self.test(e, &exit_label, false);
    self.generate_stmt(body);
    self.generate_stmt(incr);
    let _ = writeln!(self.out, "\tjmp\t{loop_label}");
    let _ = writeln!(self.out, "{exit_label}:");
  }

  fn generate_if(&mut self, e: NodeId, then: NodeId, else_: Option<NodeId>) {
    let skip = self.label();
    self.test(e, &skip, false);
    self.generate_stmt(then);
    if let Some(else_) = else_ {
      let exit = self.label();
      let _ = writeln!(self.out, "\tjmp\t{exit}");
      let _ = writeln!(self.out, "{skip}:");
      self.generate_stmt(else_);
      let _ = writeln!(self.out, "{exit}:");
    } else {
      let _ = writeln!(self.out, "{skip}:");
    }
  }

  /// Emits one function's prologue, body, and epilogue.
  pub fn generate_function(&mut self, sym: &Rc<Symbol>, body: NodeId) -> io::Result<()> {
    self.funcname = sym.name.clone();
    self.offset = 0;
    let (decls, stmts) = match self.ast.stmt(body) {
      Stmt::Block(decls, stmts) => (decls.clone(), stmts.clone()),
      _ => unreachable!("a function body is always a block"),
    };
    let param_count = sym.ty.parameters().map_or(0, |p| p.len());

    for (i, decl) in decls.iter().enumerate() {
      if i < param_count && i < NUM_PARAM_REGS {
        let size = decl.ty.size().max(1) as i32;
        self.offset -= size;
        decl.offset.set(self.offset);
      } else if i < param_count {
        decl.offset.set(STACK_ALIGNMENT + (i - NUM_PARAM_REGS) as i32 * SIZEOF_PARAM as i32);
      } else {
        let size = decl.ty.size().max(1) as i32;
        self.offset -= size;
        decl.offset.set(self.offset);
      }
    }

    writeln!(self.out, "{GLOBAL_PREFIX}{}:", sym.name)?;
    writeln!(self.out, "\tpushq\t%rbp")?;
    writeln!(self.out, "\tmovq\t%rsp, %rbp")?;
    writeln!(self.out, "\tmovl\t${}.size, %eax", sym.name)?;
    writeln!(self.out, "\tsubq\t%rax, %rsp")?;

    for (i, decl) in decls.iter().take(param_count.min(NUM_PARAM_REGS)).enumerate() {
      let size = decl.ty.size().max(1);
      let sfx = suffix(size);
      let reg_name = RegId::PARAMETERS[i].name(size);
      writeln!(self.out, "\tmov{sfx}\t{reg_name}, {}(%rbp)", decl.offset.get())?;
    }

    for &s in &stmts { self.generate_stmt(s) }

    writeln!(self.out)?;
    writeln!(self.out, "{GLOBAL_PREFIX}{}.exit:", sym.name)?;
    writeln!(self.out, "\tmovq\t%rbp, %rsp")?;
    writeln!(self.out, "\tpopq\t%rbp")?;
    writeln!(self.out, "\tret")?;
    writeln!(self.out)?;

    let mut frame_size = -self.offset;
    if frame_size % STACK_ALIGNMENT != 0 {
      frame_size += STACK_ALIGNMENT - (frame_size % STACK_ALIGNMENT);
    }
    writeln!(self.out, "\t.set\t{}.size, {frame_size}", sym.name)?;
    writeln!(self.out, "\t.globl\t{GLOBAL_PREFIX}{}", sym.name)?;
    writeln!(self.out)?;
    Ok(())
  }

  /// Emits `.comm`s for globals and the `.data` section for interned
  /// strings. Called once, after every function has been generated.
  pub fn generate_globals(&mut self, globals: &[Rc<Symbol>]) -> io::Result<()> {
    for sym in globals {
      if !sym.ty.is_function() {
        writeln!(self.out, "\t.comm\t{GLOBAL_PREFIX}{}, {}", sym.name, sym.ty.size())?;
      }
    }
    writeln!(self.out, "\t.data")?;
    for (n, text) in self.strings.iter().enumerate() {
      writeln!(self.out, ".LS{n}:\t.asciz\t\"{}\"", escape(text))?;
    }
    Ok(())
  }
}

fn escape(s: &str) -> String {
  let mut out = String::with_capacity(s.len());
  for c in s.chars() {
    match c {
      '\n' => out.push_str("\\n"),
      '\t' => out.push_str("\\t"),
      '\\' => out.push_str("\\\\"),
      '"' => out.push_str("\\\""),
      '\0' => out.push_str("\\0"),
      c => out.push(c),
    }
  }
  out
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::ast::Ast;
  use crate::types::{Specifier, Type};

  fn sym(name: &str, ty: Type) -> Rc<Symbol> { Rc::new(Symbol::new(name.into(), ty)) }

  #[test]
  fn division_emits_cltd_before_idiv_for_32_bit() {
    let mut ast = Ast::new();
    let l = ast.push_expr(ExprKind::Number(10), Type::scalar(Specifier::Int, 0));
    let r = ast.push_expr(ExprKind::Number(3), Type::scalar(Specifier::Int, 0));
    let div = ast.push_expr(ExprKind::Div(l, r), Type::scalar(Specifier::Int, 0));
    let mut out = Vec::new();
    {
      let mut cg = Codegen::new(&ast, &mut out);
      cg.generate_expr(div);
    }
    let text = String::from_utf8(out).unwrap();
    assert!(text.contains("cltd"));
    assert!(text.contains("idiv"));
    assert_eq!(ast.expr(div).register.get(), Some(RegId::Rax));
  }

  #[test]
  fn remainder_binds_result_to_rdx() {
    let mut ast = Ast::new();
    let l = ast.push_expr(ExprKind::Number(10), Type::scalar(Specifier::Long, 0));
    let r = ast.push_expr(ExprKind::Number(3), Type::scalar(Specifier::Long, 0));
    let rem = ast.push_expr(ExprKind::Rem(l, r), Type::scalar(Specifier::Long, 0));
    let mut out = Vec::new();
    {
      let mut cg = Codegen::new(&ast, &mut out);
      cg.generate_expr(rem);
    }
    assert!(String::from_utf8(out).unwrap().contains("cqto"));
    assert_eq!(ast.expr(rem).register.get(), Some(RegId::Rdx));
  }

  #[test]
  fn short_circuit_and_tests_left_before_ever_touching_right() {
    let mut ast = Ast::new();
    let a_sym = sym("a", Type::scalar(Specifier::Int, 0));
    let b_sym = sym("b", Type::scalar(Specifier::Int, 0));
    a_sym.offset.set(-4);
    b_sym.offset.set(-8);
    let a = ast.push_expr(ExprKind::Ident(a_sym), Type::scalar(Specifier::Int, 0));
    let b = ast.push_expr(ExprKind::Ident(b_sym), Type::scalar(Specifier::Int, 0));
    let and = ast.push_expr(ExprKind::LogicalAnd(a, b), Type::scalar(Specifier::Int, 0));
    let mut out = Vec::new();
    {
      let mut cg = Codegen::new(&ast, &mut out);
      cg.generate_expr(and);
    }
    let text = String::from_utf8(out).unwrap();
    let first_cmp = text.find("cmp").unwrap();
    let b_ref = text.find("-8(%rbp)").unwrap();
    assert!(first_cmp < b_ref, "left operand must be tested before the right operand is ever referenced");
  }

  #[test]
  fn seven_argument_call_pads_the_stack_and_pushes_the_overflow_argument() {
    let mut ast = Ast::new();
    let params: Rc<[Type]> = (0..7).map(|_| Type::scalar(Specifier::Int, 0)).collect();
    let callee = sym("variadic_sink", Type::function(Specifier::Int, 0, Some(params)));
    let args: Vec<NodeId> = (0..7)
      .map(|n| ast.push_expr(ExprKind::Number(n), Type::scalar(Specifier::Int, 0)))
      .collect();
    let call = ast.push_expr(ExprKind::Call(callee, args), Type::scalar(Specifier::Int, 0));
    let mut out = Vec::new();
    {
      let mut cg = Codegen::new(&ast, &mut out);
      cg.generate_expr(call);
    }
    let text = String::from_utf8(out).unwrap();
    let sub = text.find("subq\t$8, %rsp").expect("misaligned overflow must be padded to 16 bytes");
    let push = text.find("pushq\t%rax").expect("the seventh argument is pushed, not passed in a register");
    let add = text.find("addq\t$16, %rsp").expect("caller cleans up both the pushed argument and the padding");
    assert!(sub < push, "padding happens before the overflow argument is pushed");
    assert!(push < add, "the call's cleanup runs after the argument is pushed");
    assert_eq!(ast.expr(call).register.get(), Some(RegId::Rax));
  }

  #[test]
  fn six_argument_call_needs_no_stack_adjustment() {
    let mut ast = Ast::new();
    let params: Rc<[Type]> = (0..6).map(|_| Type::scalar(Specifier::Int, 0)).collect();
    let callee = sym("hexary_sink", Type::function(Specifier::Int, 0, Some(params)));
    let args: Vec<NodeId> = (0..6)
      .map(|n| ast.push_expr(ExprKind::Number(n), Type::scalar(Specifier::Int, 0)))
      .collect();
    let call = ast.push_expr(ExprKind::Call(callee, args), Type::scalar(Specifier::Int, 0));
    let mut out = Vec::new();
    {
      let mut cg = Codegen::new(&ast, &mut out);
      cg.generate_expr(call);
    }
    let text = String::from_utf8(out).unwrap();
    assert!(!text.contains("subq"));
    assert!(!text.contains("pushq"));
    assert!(!text.contains("addq\t$"));
  }

  #[test]
  fn globals_emit_comm_for_variables_and_skip_functions() {
    let ast = Ast::new();
    let var = sym("counter", Type::scalar(Specifier::Int, 0));
    let func = sym("helper", Type::function(Specifier::Void, 0, None));
    let mut out = Vec::new();
    {
      let mut cg = Codegen::new(&ast, &mut out);
      cg.generate_globals(&[var, func]).unwrap();
    }
    let text = String::from_utf8(out).unwrap();
    assert!(text.contains(".comm"));
    assert!(text.contains("counter"));
    assert!(!text.contains("helper"));
  }
}
