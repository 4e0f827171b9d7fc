use crate::ast::*;
use crate::error::{Error, Result};
use hex::{num_nibbles, Instr, OprInstr, Syscall};
use hexasm::{Directive, DirectiveKind};
use num::FromPrimitive;
use std::collections::HashMap;
use util::Location;

// Frame layout, in words from the frame base (the stack pointer in mem[1]):
//
//   base+0        return address (byte address)
//   base+1        result slot
//   base+2 ..     actuals, then var locals, then expression temporaries
//
// The stack grows downward. A caller places a callee's actuals below its
// own frame, at base - callee_frame + 2 + i, then moves the stack pointer
// down by the callee's frame size. Syscalls follow the same shape, which is
// what fixes the EXIT/WRITE/READ operand slots at sp+1..sp+3.

const FRAME_HEADER: u32 = 2;
const SYSCALL_FRAME: u32 = 2;

/// Frame size of the synthesized bitwise routines: header, two actuals and
/// two locals.
const HELPER_FRAME: u32 = 6;

/// Immediates needing five or more nibbles are loaded from the pool.
const MAX_INLINE_NIBBLES: usize = 4;

/// Initial stack pointer, loaded from the data word at byte 4.
const STACK_BASE: i32 = 1 << 16;

/// Lower a folded program to the assembler's directive stream.
///
/// Code generation runs twice: a sizing pass records each procedure's
/// temporary high-water mark (temp usage does not depend on the frame-size
/// operands), then the emitting pass runs with the final frame sizes.
pub fn generate(program: &Program) -> Result<Vec<Directive>> {
    let mut sizes = initial_frame_sizes(program);
    let mut sizing = CodeGen::new(program, &sizes);
    sizing.run()?;
    let watermarks = sizing.temp_watermarks.clone();
    for (name, temps) in watermarks {
        if let Some(size) = sizes.get_mut(&name) {
            *size += temps;
        }
    }
    let mut codegen = CodeGen::new(program, &sizes);
    codegen.run()?;
    Ok(codegen.directives)
}

fn initial_frame_sizes(program: &Program) -> HashMap<String, u32> {
    let mut sizes = HashMap::new();
    for proc in &program.procs {
        let vars = proc
            .locals
            .iter()
            .filter(|decl| matches!(decl.kind, DeclKind::Var))
            .count() as u32;
        sizes.insert(
            proc.name.clone(),
            FRAME_HEADER + proc.formals.len() as u32 + vars,
        );
    }
    sizes.insert("_bitand".to_owned(), HELPER_FRAME);
    sizes.insert("_bitor".to_owned(), HELPER_FRAME);
    sizes
}

/// What a name denotes during code generation.
#[derive(Clone, Debug)]
enum Binding {
    /// A val with a known value.
    Const(i32),
    /// A frame slot holding a value (val formals, var locals, proc and
    /// func formals).
    Slot(u32),
    /// A frame slot holding an array base address.
    ArraySlot(u32),
    /// A labelled global word.
    GlobalVar(String),
    /// A labelled global array; the name denotes its base address.
    GlobalArray(String),
    Routine { is_func: bool },
}

/// An operand that can be materialized directly into breg, so binary
/// operations need not spill their left operand for it.
#[derive(Clone, Debug)]
enum SimpleVal {
    Const(i32),
    Slot(u32),
    GlobalWord(String),
    Addr(String),
}

struct CodeGen<'a> {
    program: &'a Program,
    frame_sizes: &'a HashMap<String, u32>,
    globals: HashMap<String, Binding>,
    directives: Vec<Directive>,
    const_pool: Vec<i32>,
    const_map: HashMap<i32, usize>,
    string_pool: Vec<Vec<u8>>,
    string_map: HashMap<Vec<u8>, usize>,
    label_count: u32,
    need_bitand: bool,
    need_bitor: bool,
    env: HashMap<String, Binding>,
    temp_base: u32,
    temp_next: u32,
    temp_max: u32,
    temp_watermarks: HashMap<String, u32>,
}

impl<'a> CodeGen<'a> {
    fn new(program: &'a Program, frame_sizes: &'a HashMap<String, u32>) -> CodeGen<'a> {
        CodeGen {
            program,
            frame_sizes,
            globals: HashMap::new(),
            directives: Vec::new(),
            const_pool: Vec::new(),
            const_map: HashMap::new(),
            string_pool: Vec::new(),
            string_map: HashMap::new(),
            label_count: 0,
            need_bitand: false,
            need_bitor: false,
            env: HashMap::new(),
            temp_base: FRAME_HEADER,
            temp_next: 0,
            temp_max: 0,
            temp_watermarks: HashMap::new(),
        }
    }

    fn run(&mut self) -> Result<()> {
        let program = self.program;
        self.collect_globals()?;
        if !program.procs.iter().any(|p| p.name == "main") {
            return Err(Error::UnknownSymbol {
                location: Location::default(),
                name: "main".to_owned(),
            });
        }
        self.gen_startup();
        for proc in &program.procs {
            self.gen_proc(proc)?;
        }
        if self.need_bitand {
            self.gen_bitand();
        }
        if self.need_bitor {
            self.gen_bitor();
        }
        self.gen_globals()?;
        self.gen_pools();
        Ok(())
    }

    // Directive emission helpers ========================================= //

    fn emit(&mut self, kind: DirectiveKind) {
        self.directives.push(Directive::synth(kind));
    }

    fn gen_data(&mut self, value: i32) {
        self.emit(DirectiveKind::Data(value));
    }

    fn gen_label(&mut self, name: &str) {
        self.emit(DirectiveKind::Label {
            name: name.to_owned(),
            value: 0,
        });
    }

    fn gen_imm(&mut self, instr: Instr, value: i32) {
        self.emit(DirectiveKind::InstrImm { instr, value });
    }

    fn gen_ref(&mut self, instr: Instr, label: &str) {
        self.emit(DirectiveKind::InstrLabel {
            instr,
            label: label.to_owned(),
            relative: !instr.has_absolute_operand(),
            value: 0,
        });
    }

    fn gen_opr(&mut self, opr: OprInstr) {
        self.emit(DirectiveKind::InstrOp(opr));
    }

    fn new_label(&mut self) -> String {
        let label = format!("_L{}", self.label_count);
        self.label_count += 1;
        label
    }

    // Constants and pools ================================================ //

    fn intern_const(&mut self, value: i32) -> String {
        let index = match self.const_map.get(&value) {
            Some(&index) => index,
            None => {
                let index = self.const_pool.len();
                self.const_pool.push(value);
                self.const_map.insert(value, index);
                index
            }
        };
        format!("_const{}", index)
    }

    fn intern_string(&mut self, bytes: &[u8]) -> String {
        let index = match self.string_map.get(bytes) {
            Some(&index) => index,
            None => {
                let index = self.string_pool.len();
                self.string_pool.push(bytes.to_vec());
                self.string_map.insert(bytes.to_vec(), index);
                index
            }
        };
        format!("_str{}", index)
    }

    fn gen_const(&mut self, value: i32) {
        if num_nibbles(value) <= MAX_INLINE_NIBBLES {
            self.gen_imm(Instr::LDAC, value);
        } else {
            let label = self.intern_const(value);
            self.gen_ref(Instr::LDAM, &label);
        }
    }

    // Temporaries ======================================================== //

    fn alloc_temp(&mut self) -> u32 {
        let slot = self.temp_base + self.temp_next;
        self.temp_next += 1;
        if self.temp_next > self.temp_max {
            self.temp_max = self.temp_next;
        }
        slot
    }

    fn free_temp(&mut self) {
        self.temp_next -= 1;
    }

    // Name resolution ==================================================== //

    fn lookup(&self, name: &str) -> Option<Binding> {
        self.env
            .get(name)
            .or_else(|| self.globals.get(name))
            .cloned()
    }

    fn resolve(&self, name: &str, location: Location) -> Result<Binding> {
        self.lookup(name).ok_or_else(|| Error::UnknownSymbol {
            location,
            name: name.to_owned(),
        })
    }

    fn simple_value(&mut self, expr: &Expr) -> Option<SimpleVal> {
        if let Some(value) = expr.const_value {
            return Some(SimpleVal::Const(value));
        }
        match &expr.kind {
            ExprKind::VarRef(name) => match self.lookup(name)? {
                Binding::Const(value) => Some(SimpleVal::Const(value)),
                Binding::Slot(slot) | Binding::ArraySlot(slot) => Some(SimpleVal::Slot(slot)),
                Binding::GlobalVar(label) => Some(SimpleVal::GlobalWord(label)),
                Binding::GlobalArray(label) => Some(SimpleVal::Addr(label)),
                Binding::Routine { .. } => None,
            },
            ExprKind::String(bytes) => {
                let bytes = bytes.clone();
                Some(SimpleVal::Addr(self.intern_string(&bytes)))
            }
            _ => None,
        }
    }

    fn gen_simple_into_areg(&mut self, value: &SimpleVal) {
        match value {
            SimpleVal::Const(v) => self.gen_const(*v),
            SimpleVal::Slot(slot) => {
                self.gen_imm(Instr::LDAM, 1);
                self.gen_imm(Instr::LDAI, *slot as i32);
            }
            SimpleVal::GlobalWord(label) => {
                let label = label.clone();
                self.gen_ref(Instr::LDAM, &label);
            }
            SimpleVal::Addr(label) => {
                let label = label.clone();
                self.gen_ref(Instr::LDAC, &label);
            }
        }
    }

    fn gen_simple_into_breg(&mut self, value: &SimpleVal) {
        match value {
            SimpleVal::Const(v) => {
                if num_nibbles(*v) <= MAX_INLINE_NIBBLES {
                    self.gen_imm(Instr::LDBC, *v);
                } else {
                    let label = self.intern_const(*v);
                    self.gen_ref(Instr::LDBM, &label);
                }
            }
            SimpleVal::Slot(slot) => {
                self.gen_imm(Instr::LDBM, 1);
                self.gen_imm(Instr::LDBI, *slot as i32);
            }
            SimpleVal::GlobalWord(label) => {
                let label = label.clone();
                self.gen_ref(Instr::LDBM, &label);
            }
            SimpleVal::Addr(label) => {
                let label = label.clone();
                self.gen_ref(Instr::LDBC, &label);
            }
        }
    }

    // Program skeleton =================================================== //

    fn collect_globals(&mut self) -> Result<()> {
        let program = self.program;
        for decl in &program.globals {
            let binding = match &decl.kind {
                DeclKind::Val(_) => Binding::Const(decl.value.ok_or_else(|| {
                    Error::NonConstVal {
                        location: decl.location,
                        name: decl.name.clone(),
                    }
                })?),
                DeclKind::Var => Binding::GlobalVar(decl.name.clone()),
                DeclKind::Array(_) => Binding::GlobalArray(decl.name.clone()),
            };
            self.globals.insert(decl.name.clone(), binding);
        }
        for proc in &program.procs {
            self.globals.insert(
                proc.name.clone(),
                Binding::Routine {
                    is_func: proc.is_func,
                },
            );
        }
        Ok(())
    }

    /// The preamble branches over the stack-pointer word to the startup
    /// glue, which calls `main` and falls into the exit glue.
    fn gen_startup(&mut self) {
        self.gen_ref(Instr::BR, "start");
        self.gen_data(STACK_BASE);
        self.gen_label("start");
        let main_frame = self.frame_size("main");
        let ret = self.new_label();
        self.gen_ref(Instr::LDAP, &ret);
        self.gen_imm(Instr::LDBM, 1);
        self.gen_imm(Instr::STAI, -main_frame);
        self.adjust_sp(OprInstr::SUB, main_frame);
        self.gen_ref(Instr::BR, "main");
        self.gen_label(&ret);
        self.adjust_sp(OprInstr::ADD, main_frame);
        self.gen_label("exit");
        self.gen_imm(Instr::LDAC, 0);
        self.gen_imm(Instr::LDBM, 1);
        self.gen_imm(Instr::STAI, -1);
        self.adjust_sp(OprInstr::SUB, (SYSCALL_FRAME + 1) as i32);
        self.gen_imm(Instr::LDAC, Syscall::EXIT as i32);
        self.gen_opr(OprInstr::SVC);
    }

    fn frame_size(&self, name: &str) -> i32 {
        *self.frame_sizes.get(name).expect("unsized routine") as i32
    }

    fn adjust_sp(&mut self, opr: OprInstr, amount: i32) {
        self.gen_imm(Instr::LDAM, 1);
        self.gen_imm(Instr::LDBC, amount);
        self.gen_opr(opr);
        self.gen_imm(Instr::STAM, 1);
    }

    fn gen_proc(&mut self, proc: &Proc) -> Result<()> {
        self.env.clear();
        let mut slot = FRAME_HEADER;
        for formal in &proc.formals {
            let binding = match formal.kind {
                FormalKind::Array => Binding::ArraySlot(slot),
                _ => Binding::Slot(slot),
            };
            self.env.insert(formal.name.clone(), binding);
            slot += 1;
        }
        for decl in &proc.locals {
            match &decl.kind {
                DeclKind::Var => {
                    self.env.insert(decl.name.clone(), Binding::Slot(slot));
                    slot += 1;
                }
                DeclKind::Val(_) => {
                    let value = decl.value.ok_or_else(|| Error::NonConstVal {
                        location: decl.location,
                        name: decl.name.clone(),
                    })?;
                    self.env.insert(decl.name.clone(), Binding::Const(value));
                }
                DeclKind::Array(_) => unreachable!("local arrays are not parsed"),
            }
        }
        self.temp_base = slot;
        self.temp_next = 0;
        self.temp_max = 0;
        if proc.is_func {
            self.emit(DirectiveKind::Func(proc.name.clone()));
        } else {
            self.emit(DirectiveKind::Proc(proc.name.clone()));
        }
        self.gen_label(&proc.name);
        self.gen_stmt(&proc.body)?;
        self.gen_epilogue();
        self.temp_watermarks
            .insert(proc.name.clone(), self.temp_max);
        Ok(())
    }

    fn gen_epilogue(&mut self) {
        self.gen_imm(Instr::LDBM, 1);
        self.gen_imm(Instr::LDBI, 0);
        self.gen_opr(OprInstr::BRB);
    }

    fn gen_globals(&mut self) -> Result<()> {
        let program = self.program;
        for decl in &program.globals {
            match &decl.kind {
                DeclKind::Val(_) => {}
                DeclKind::Var => {
                    self.gen_label(&decl.name);
                    self.gen_data(0);
                }
                DeclKind::Array(length) => {
                    let length = length.const_value.expect("array length is folded");
                    if length < 0 {
                        return Err(Error::NonConstArrayLength {
                            location: decl.location,
                        });
                    }
                    self.gen_label(&decl.name);
                    for _ in 0..length {
                        self.gen_data(0);
                    }
                }
            }
        }
        Ok(())
    }

    fn gen_pools(&mut self) {
        for index in 0..self.const_pool.len() {
            let value = self.const_pool[index];
            self.gen_label(&format!("_const{}", index));
            self.gen_data(value);
        }
        for index in 0..self.string_pool.len() {
            let words = pack_string(&self.string_pool[index]);
            self.gen_label(&format!("_str{}", index));
            for word in words {
                self.gen_data(word);
            }
        }
    }

    // Statements ========================================================= //

    fn gen_stmt(&mut self, stmt: &Stmt) -> Result<()> {
        match &stmt.kind {
            StmtKind::Skip => Ok(()),
            StmtKind::Stop => {
                self.gen_ref(Instr::BR, "exit");
                Ok(())
            }
            StmtKind::Return(expr) => {
                self.gen_expr(expr)?;
                self.gen_imm(Instr::LDBM, 1);
                self.gen_imm(Instr::STAI, 1);
                self.gen_epilogue();
                Ok(())
            }
            StmtKind::If(condition, then_stmt, else_stmt) => {
                let else_label = self.new_label();
                let end_label = self.new_label();
                self.gen_expr(condition)?;
                self.gen_ref(Instr::BRZ, &else_label);
                self.gen_stmt(then_stmt)?;
                self.gen_ref(Instr::BR, &end_label);
                self.gen_label(&else_label);
                self.gen_stmt(else_stmt)?;
                self.gen_label(&end_label);
                Ok(())
            }
            StmtKind::While(condition, body) => {
                let loop_label = self.new_label();
                let end_label = self.new_label();
                self.gen_label(&loop_label);
                self.gen_expr(condition)?;
                self.gen_ref(Instr::BRZ, &end_label);
                self.gen_stmt(body)?;
                self.gen_ref(Instr::BR, &loop_label);
                self.gen_label(&end_label);
                Ok(())
            }
            StmtKind::Seq(stmts) => {
                for stmt in stmts {
                    self.gen_stmt(stmt)?;
                }
                Ok(())
            }
            StmtKind::Call(expr) => match &expr.kind {
                ExprKind::Call(callee, args) => {
                    self.gen_call(callee, args, expr.location, false)
                }
                _ => unreachable!("call statement holds a call"),
            },
            StmtKind::Ass(lhs, rhs) => self.gen_assign(lhs, rhs),
        }
    }

    fn gen_assign(&mut self, lhs: &Expr, rhs: &Expr) -> Result<()> {
        match &lhs.kind {
            ExprKind::VarRef(name) => match self.resolve(name, lhs.location)? {
                Binding::Slot(slot) | Binding::ArraySlot(slot) => {
                    self.gen_expr(rhs)?;
                    self.gen_imm(Instr::LDBM, 1);
                    self.gen_imm(Instr::STAI, slot as i32);
                    Ok(())
                }
                Binding::GlobalVar(label) => {
                    self.gen_expr(rhs)?;
                    self.gen_ref(Instr::STAM, &label);
                    Ok(())
                }
                _ => Err(Error::InvalidAssignment {
                    location: lhs.location,
                    name: name.clone(),
                }),
            },
            ExprKind::Subscript(name, index) => {
                self.gen_expr(index)?;
                self.gen_array_base_add(name, lhs.location)?;
                let temp = self.alloc_temp();
                self.gen_imm(Instr::LDBM, 1);
                self.gen_imm(Instr::STAI, temp as i32);
                self.gen_expr(rhs)?;
                self.gen_imm(Instr::LDBM, 1);
                self.gen_imm(Instr::LDBI, temp as i32);
                self.gen_imm(Instr::STAI, 0);
                self.free_temp();
                Ok(())
            }
            _ => Err(Error::InvalidAssignment {
                location: lhs.location,
                name: "expression".to_owned(),
            }),
        }
    }

    // Expressions ======================================================== //

    fn gen_expr(&mut self, expr: &Expr) -> Result<()> {
        if let Some(value) = expr.const_value {
            self.gen_const(value);
            return Ok(());
        }
        match &expr.kind {
            ExprKind::Number(value) => self.gen_const(*value as i32),
            ExprKind::Boolean(value) => self.gen_const(*value as i32),
            ExprKind::String(bytes) => {
                let bytes = bytes.clone();
                let label = self.intern_string(&bytes);
                self.gen_ref(Instr::LDAC, &label);
            }
            ExprKind::VarRef(name) => match self.resolve(name, expr.location)? {
                Binding::Const(value) => self.gen_const(value),
                Binding::Slot(slot) | Binding::ArraySlot(slot) => {
                    self.gen_imm(Instr::LDAM, 1);
                    self.gen_imm(Instr::LDAI, slot as i32);
                }
                Binding::GlobalVar(label) => self.gen_ref(Instr::LDAM, &label),
                Binding::GlobalArray(label) => self.gen_ref(Instr::LDAC, &label),
                // A routine used as a value is its entry address.
                Binding::Routine { .. } => self.gen_ref(Instr::LDAP, name),
            },
            ExprKind::Subscript(name, index) => {
                self.gen_expr(index)?;
                self.gen_array_base_add(name, expr.location)?;
                self.gen_imm(Instr::LDAI, 0);
            }
            ExprKind::Call(callee, args) => {
                self.gen_call(callee, args, expr.location, true)?;
            }
            ExprKind::Unary(op, element) => {
                let minuend = match op {
                    UnaryOp::Minus => 0,
                    UnaryOp::Not => -1,
                };
                if let Some(value) = self.simple_value(element) {
                    self.gen_const(minuend);
                    self.gen_simple_into_breg(&value);
                } else {
                    self.gen_expr(element)?;
                    let temp = self.alloc_temp();
                    self.gen_imm(Instr::LDBM, 1);
                    self.gen_imm(Instr::STAI, temp as i32);
                    self.gen_const(minuend);
                    self.gen_imm(Instr::LDBM, 1);
                    self.gen_imm(Instr::LDBI, temp as i32);
                    self.free_temp();
                }
                self.gen_opr(OprInstr::SUB);
            }
            ExprKind::Binary(op, lhs, rhs) => self.gen_binary(*op, lhs, rhs)?,
        }
        Ok(())
    }

    /// Add an array's base address to the index in areg.
    fn gen_array_base_add(&mut self, name: &str, location: Location) -> Result<()> {
        match self.resolve(name, location)? {
            Binding::GlobalArray(label) => self.gen_ref(Instr::LDBC, &label),
            Binding::ArraySlot(slot) => {
                self.gen_imm(Instr::LDBM, 1);
                self.gen_imm(Instr::LDBI, slot as i32);
            }
            _ => {
                return Err(Error::NotAnArray {
                    location,
                    name: name.to_owned(),
                })
            }
        }
        self.gen_opr(OprInstr::ADD);
        Ok(())
    }

    fn gen_binary(&mut self, op: BinOp, lhs: &Expr, rhs: &Expr) -> Result<()> {
        match op {
            BinOp::Plus => self.gen_arith(OprInstr::ADD, lhs, rhs),
            BinOp::Minus => self.gen_arith(OprInstr::SUB, lhs, rhs),
            BinOp::And => {
                self.need_bitand = true;
                self.gen_routine_call("_bitand", &[&*lhs, &*rhs], true)
            }
            BinOp::Or => {
                self.need_bitor = true;
                self.gen_routine_call("_bitor", &[&*lhs, &*rhs], true)
            }
            BinOp::Eq => {
                self.gen_arith(OprInstr::SUB, lhs, rhs)?;
                self.gen_select(&[Instr::BRZ], true)
            }
            BinOp::Ne => {
                self.gen_arith(OprInstr::SUB, lhs, rhs)?;
                self.gen_select(&[Instr::BRZ], false)
            }
            BinOp::Ls => {
                self.gen_arith(OprInstr::SUB, lhs, rhs)?;
                self.gen_select(&[Instr::BRN], true)
            }
            BinOp::Ge => {
                self.gen_arith(OprInstr::SUB, lhs, rhs)?;
                self.gen_select(&[Instr::BRN], false)
            }
            BinOp::Gr => {
                self.gen_arith(OprInstr::SUB, lhs, rhs)?;
                self.gen_select(&[Instr::BRN, Instr::BRZ], false)
            }
            BinOp::Le => {
                self.gen_arith(OprInstr::SUB, lhs, rhs)?;
                self.gen_select(&[Instr::BRN, Instr::BRZ], true)
            }
        }
    }

    /// Compute `a ⊕ b` into areg with b in breg. A simple b is materialized
    /// after a; otherwise b is evaluated first and spilled to a temporary,
    /// so the observable order for compound operands is right then left.
    fn gen_arith(&mut self, opr: OprInstr, a: &Expr, b: &Expr) -> Result<()> {
        if let Some(value) = self.simple_value(b) {
            self.gen_expr(a)?;
            self.gen_simple_into_breg(&value);
        } else {
            self.gen_expr(b)?;
            let temp = self.alloc_temp();
            self.gen_imm(Instr::LDBM, 1);
            self.gen_imm(Instr::STAI, temp as i32);
            self.gen_expr(a)?;
            self.gen_imm(Instr::LDBM, 1);
            self.gen_imm(Instr::LDBI, temp as i32);
            self.free_temp();
        }
        self.gen_opr(opr);
        Ok(())
    }

    /// Turn the difference in areg into a 1/0 flag. Each branch jumps to
    /// the taken value; falling through all of them loads the other. All
    /// comparisons test `lhs - rhs`, so `>` and `<=` take two branches.
    fn gen_select(&mut self, branches: &[Instr], value_if_taken: bool) -> Result<()> {
        let taken = self.new_label();
        let done = self.new_label();
        for &branch in branches {
            self.gen_ref(branch, &taken);
        }
        self.gen_imm(Instr::LDAC, !value_if_taken as i32);
        self.gen_ref(Instr::BR, &done);
        self.gen_label(&taken);
        self.gen_imm(Instr::LDAC, value_if_taken as i32);
        self.gen_label(&done);
        Ok(())
    }

    // Calls ============================================================== //

    fn gen_call(
        &mut self,
        callee: &Callee,
        args: &[Expr],
        location: Location,
        want_result: bool,
    ) -> Result<()> {
        match callee {
            Callee::Number(value) => {
                self.gen_syscall(*value as i32, args, location, want_result)
            }
            Callee::Name(name) => match self.resolve(name, location)? {
                Binding::Routine { .. } => {
                    let args: Vec<&Expr> = args.iter().collect();
                    self.gen_routine_call(name, &args, want_result)
                }
                Binding::Const(value) => self.gen_syscall(value, args, location, want_result),
                _ => Err(Error::UnsupportedCall {
                    location,
                    name: name.clone(),
                }),
            },
        }
    }

    /// Evaluate the actuals and store them into the callee frame below the
    /// current one. Actuals that are not simple are evaluated up front into
    /// caller temporaries, so nested calls cannot clobber outgoing slots.
    fn gen_actuals(&mut self, args: &[&Expr], frame: i32) -> Result<()> {
        let mut staged: Vec<Option<u32>> = Vec::with_capacity(args.len());
        let mut simples: Vec<Option<SimpleVal>> = Vec::with_capacity(args.len());
        for arg in args {
            match self.simple_value(arg) {
                Some(value) => {
                    staged.push(None);
                    simples.push(Some(value));
                }
                None => {
                    self.gen_expr(arg)?;
                    let temp = self.alloc_temp();
                    self.gen_imm(Instr::LDBM, 1);
                    self.gen_imm(Instr::STAI, temp as i32);
                    staged.push(Some(temp));
                    simples.push(None);
                }
            }
        }
        let mut temps = 0;
        for index in 0..args.len() {
            match (&staged[index], &simples[index]) {
                (Some(temp), _) => {
                    let temp = *temp;
                    self.gen_imm(Instr::LDAM, 1);
                    self.gen_imm(Instr::LDAI, temp as i32);
                    temps += 1;
                }
                (None, Some(value)) => {
                    let value = value.clone();
                    self.gen_simple_into_areg(&value);
                }
                (None, None) => unreachable!(),
            }
            self.gen_imm(Instr::LDBM, 1);
            self.gen_imm(Instr::STAI, FRAME_HEADER as i32 + index as i32 - frame);
        }
        for _ in 0..temps {
            self.free_temp();
        }
        Ok(())
    }

    fn gen_routine_call(&mut self, name: &str, args: &[&Expr], want_result: bool) -> Result<()> {
        let frame = self.frame_size(name);
        self.gen_actuals(args, frame)?;
        let ret = self.new_label();
        self.gen_ref(Instr::LDAP, &ret);
        self.gen_imm(Instr::LDBM, 1);
        self.gen_imm(Instr::STAI, -frame);
        self.adjust_sp(OprInstr::SUB, frame);
        self.gen_ref(Instr::BR, name);
        self.gen_label(&ret);
        self.adjust_sp(OprInstr::ADD, frame);
        if want_result {
            self.gen_imm(Instr::LDAM, 1);
            self.gen_imm(Instr::LDAI, 1 - frame);
        }
        Ok(())
    }

    fn gen_syscall(
        &mut self,
        number: i32,
        args: &[Expr],
        location: Location,
        want_result: bool,
    ) -> Result<()> {
        if Syscall::from_i32(number).is_none() {
            return Err(Error::InvalidSyscall {
                location,
                value: number,
            });
        }
        let frame = (SYSCALL_FRAME + args.len() as u32) as i32;
        let args: Vec<&Expr> = args.iter().collect();
        self.gen_actuals(&args, frame)?;
        self.adjust_sp(OprInstr::SUB, frame);
        self.gen_imm(Instr::LDAC, number);
        self.gen_opr(OprInstr::SVC);
        self.adjust_sp(OprInstr::ADD, frame);
        if want_result {
            self.gen_imm(Instr::LDAM, 1);
            self.gen_imm(Instr::LDAI, 1 - frame);
        }
        Ok(())
    }

    // Synthesized bitwise routines ======================================= //

    /// Load a helper frame slot into areg.
    fn helper_load(&mut self, slot: u32) {
        self.gen_imm(Instr::LDAM, 1);
        self.gen_imm(Instr::LDAI, slot as i32);
    }

    /// Store areg into a helper frame slot.
    fn helper_store(&mut self, slot: u32) {
        self.gen_imm(Instr::LDBM, 1);
        self.gen_imm(Instr::STAI, slot as i32);
    }

    /// Double the value in a helper frame slot.
    fn helper_double(&mut self, slot: u32) {
        self.helper_load(slot);
        self.gen_imm(Instr::LDBM, 1);
        self.gen_imm(Instr::LDBI, slot as i32);
        self.gen_opr(OprInstr::ADD);
        self.helper_store(slot);
    }

    /// Emit the shared shape of the bitwise routines: 32 iterations of
    /// shift-result, test the top bits of both operands via the emitted
    /// test block, then double everything. Slots: a=2, b=3, result=4,
    /// counter=5.
    fn gen_bit_helper<F>(&mut self, name: &str, gen_test: F)
    where
        F: FnOnce(&mut CodeGen<'a>, &str, &str),
    {
        let loop_label = format!("{}_loop", name);
        let next_label = format!("{}_next", name);
        let done_label = format!("{}_done", name);
        self.emit(DirectiveKind::Func(name.to_owned()));
        self.gen_label(name);
        self.gen_imm(Instr::LDAC, 0);
        self.helper_store(4);
        self.gen_imm(Instr::LDAC, 32);
        self.helper_store(5);
        self.gen_label(&loop_label);
        self.helper_load(5);
        self.gen_ref(Instr::BRZ, &done_label);
        self.helper_double(4);
        gen_test(self, name, &next_label);
        self.gen_label(&next_label);
        self.helper_double(2);
        self.helper_double(3);
        self.helper_load(5);
        self.gen_imm(Instr::LDBC, 1);
        self.gen_opr(OprInstr::SUB);
        self.helper_store(5);
        self.gen_ref(Instr::BR, &loop_label);
        self.gen_label(&done_label);
        self.helper_load(4);
        self.gen_imm(Instr::LDBM, 1);
        self.gen_imm(Instr::STAI, 1);
        self.gen_epilogue();
    }

    /// Increment the result slot.
    fn helper_set_bit(&mut self) {
        self.helper_load(4);
        self.gen_imm(Instr::LDBC, 1);
        self.gen_opr(OprInstr::ADD);
        self.helper_store(4);
    }

    fn gen_bitand(&mut self) {
        self.gen_bit_helper("_bitand", |this, name, next_label| {
            let first = format!("{}_hi1", name);
            let second = format!("{}_hi2", name);
            this.helper_load(2);
            this.gen_ref(Instr::BRN, &first);
            this.gen_ref(Instr::BR, next_label);
            this.gen_label(&first);
            this.helper_load(3);
            this.gen_ref(Instr::BRN, &second);
            this.gen_ref(Instr::BR, next_label);
            this.gen_label(&second);
            this.helper_set_bit();
        });
    }

    fn gen_bitor(&mut self) {
        self.gen_bit_helper("_bitor", |this, name, next_label| {
            let set = format!("{}_set", name);
            this.helper_load(2);
            this.gen_ref(Instr::BRN, &set);
            this.helper_load(3);
            this.gen_ref(Instr::BRN, &set);
            this.gen_ref(Instr::BR, next_label);
            this.gen_label(&set);
            this.helper_set_bit();
        });
    }
}

/// Pack a string into data words: a length byte, the bytes, zero padding,
/// little-endian within each word.
fn pack_string(bytes: &[u8]) -> Vec<i32> {
    let mut packed = Vec::with_capacity(bytes.len() + 1);
    packed.push(bytes.len().min(255) as u8);
    packed.extend_from_slice(bytes);
    while packed.len() % 4 != 0 {
        packed.push(0);
    }
    packed
        .chunks_exact(4)
        .map(|chunk| i32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}
