use util::Location;

/// The program AST: global declarations followed by procedure declarations.
///
/// Nodes are tagged sums per category, with expressions carrying the
/// constant value filled in by the folding pass. Passes walk the tree with
/// exhaustive matches.
#[derive(Clone, Debug, PartialEq)]
pub struct Program {
    pub globals: Vec<Decl>,
    pub procs: Vec<Proc>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Proc {
    pub location: Location,
    pub name: String,
    pub is_func: bool,
    pub formals: Vec<Formal>,
    pub locals: Vec<Decl>,
    pub body: Stmt,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Decl {
    pub location: Location,
    pub name: String,
    pub kind: DeclKind,
    /// For vals, the folded value of the initializer.
    pub value: Option<i32>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum DeclKind {
    Val(Expr),
    Var,
    Array(Expr),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Formal {
    pub location: Location,
    pub name: String,
    pub kind: FormalKind,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FormalKind {
    Val,
    Array,
    Proc,
    Func,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Stmt {
    pub location: Location,
    pub kind: StmtKind,
}

#[derive(Clone, Debug, PartialEq)]
pub enum StmtKind {
    Skip,
    Stop,
    Return(Expr),
    If(Expr, Box<Stmt>, Box<Stmt>),
    While(Expr, Box<Stmt>),
    Seq(Vec<Stmt>),
    /// The expression is always an `ExprKind::Call`.
    Call(Expr),
    Ass(Expr, Expr),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Expr {
    pub location: Location,
    pub const_value: Option<i32>,
    pub kind: ExprKind,
}

impl Expr {
    pub fn new(location: Location, kind: ExprKind) -> Expr {
        Expr {
            location,
            const_value: None,
            kind,
        }
    }
}

/// A call target: a named procedure or val, or a literal syscall number.
#[derive(Clone, Debug, PartialEq)]
pub enum Callee {
    Name(String),
    Number(u32),
}

#[derive(Clone, Debug, PartialEq)]
pub enum ExprKind {
    VarRef(String),
    Subscript(String, Box<Expr>),
    Call(Callee, Vec<Expr>),
    Number(u32),
    Boolean(bool),
    String(Vec<u8>),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinOp, Box<Expr>, Box<Expr>),
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum UnaryOp {
    Minus,
    Not,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BinOp {
    Plus,
    Minus,
    Or,
    And,
    Eq,
    Ne,
    Ls,
    Le,
    Gr,
    Ge,
}

impl BinOp {
    pub fn as_str(self) -> &'static str {
        match self {
            BinOp::Plus => "+",
            BinOp::Minus => "-",
            BinOp::Or => "or",
            BinOp::And => "and",
            BinOp::Eq => "=",
            BinOp::Ne => "~=",
            BinOp::Ls => "<",
            BinOp::Le => "<=",
            BinOp::Gr => ">",
            BinOp::Ge => ">=",
        }
    }
}

impl UnaryOp {
    pub fn as_str(self) -> &'static str {
        match self {
            UnaryOp::Minus => "-",
            UnaryOp::Not => "~",
        }
    }
}

/// Render the indented syntax tree, with `[const=N]` annotations on folded
/// expressions.
pub fn print_tree(program: &Program) -> String {
    let mut printer = Printer::default();
    printer.program(program);
    printer.out
}

#[derive(Default)]
struct Printer {
    out: String,
    indent: usize,
}

impl Printer {
    fn line(&mut self, text: String) {
        for _ in 0..self.indent {
            self.out.push_str("  ");
        }
        self.out.push_str(&text);
        self.out.push('\n');
    }

    fn loc(location: Location) -> String {
        format!(" [loc={}]", location)
    }

    fn const_val(expr: &Expr) -> String {
        match expr.const_value {
            Some(value) => format!(" [const={}]", value),
            None => String::new(),
        }
    }

    fn program(&mut self, program: &Program) {
        self.line("program".to_owned());
        self.indent += 1;
        for decl in &program.globals {
            self.decl(decl);
        }
        for proc in &program.procs {
            self.proc(proc);
        }
        self.indent -= 1;
    }

    fn proc(&mut self, proc: &Proc) {
        let keyword = if proc.is_func { "func" } else { "proc" };
        self.line(format!("{} {}{}", keyword, proc.name, Printer::loc(proc.location)));
        self.indent += 1;
        for formal in &proc.formals {
            let kind = match formal.kind {
                FormalKind::Val => "valformal",
                FormalKind::Array => "arrayformal",
                FormalKind::Proc => "procformal",
                FormalKind::Func => "funcformal",
            };
            self.line(format!("{} {}{}", kind, formal.name, Printer::loc(formal.location)));
        }
        for decl in &proc.locals {
            self.decl(decl);
        }
        self.stmt(&proc.body);
        self.indent -= 1;
    }

    fn decl(&mut self, decl: &Decl) {
        match &decl.kind {
            DeclKind::Val(expr) => {
                self.line(format!("valdecl {}{}", decl.name, Printer::loc(decl.location)));
                self.indent += 1;
                self.expr(expr);
                self.indent -= 1;
            }
            DeclKind::Var => {
                self.line(format!("vardecl {}{}", decl.name, Printer::loc(decl.location)));
            }
            DeclKind::Array(expr) => {
                self.line(format!("arraydecl {}{}", decl.name, Printer::loc(decl.location)));
                self.indent += 1;
                self.expr(expr);
                self.indent -= 1;
            }
        }
    }

    fn stmt(&mut self, stmt: &Stmt) {
        match &stmt.kind {
            StmtKind::Skip => self.line(format!("skipstmt{}", Printer::loc(stmt.location))),
            StmtKind::Stop => self.line(format!("stopstmt{}", Printer::loc(stmt.location))),
            StmtKind::Return(expr) => {
                self.line(format!("returnstmt{}", Printer::loc(stmt.location)));
                self.indent += 1;
                self.expr(expr);
                self.indent -= 1;
            }
            StmtKind::If(condition, then_stmt, else_stmt) => {
                self.line(format!("ifstmt{}", Printer::loc(stmt.location)));
                self.indent += 1;
                self.expr(condition);
                self.stmt(then_stmt);
                self.stmt(else_stmt);
                self.indent -= 1;
            }
            StmtKind::While(condition, body) => {
                self.line(format!("whilestmt{}", Printer::loc(stmt.location)));
                self.indent += 1;
                self.expr(condition);
                self.stmt(body);
                self.indent -= 1;
            }
            StmtKind::Seq(stmts) => {
                self.line(format!("seqstmt{}", Printer::loc(stmt.location)));
                self.indent += 1;
                for stmt in stmts {
                    self.stmt(stmt);
                }
                self.indent -= 1;
            }
            StmtKind::Call(expr) => {
                if let ExprKind::Call(callee, args) = &expr.kind {
                    self.line(format!(
                        "callstmt {}{}",
                        callee_name(callee),
                        Printer::loc(stmt.location)
                    ));
                    self.indent += 1;
                    for arg in args {
                        self.expr(arg);
                    }
                    self.indent -= 1;
                }
            }
            StmtKind::Ass(lhs, rhs) => {
                self.line(format!("assstmt{}", Printer::loc(stmt.location)));
                self.indent += 1;
                self.expr(lhs);
                self.expr(rhs);
                self.indent -= 1;
            }
        }
    }

    fn expr(&mut self, expr: &Expr) {
        let loc = Printer::loc(expr.location);
        match &expr.kind {
            ExprKind::VarRef(name) => {
                self.line(format!("varref {}{}{}", name, Printer::const_val(expr), loc))
            }
            ExprKind::Subscript(name, index) => {
                self.line(format!("arraysubscript {}{}", name, loc));
                self.indent += 1;
                self.expr(index);
                self.indent -= 1;
            }
            ExprKind::Call(callee, args) => {
                self.line(format!("call {}{}", callee_name(callee), loc));
                self.indent += 1;
                for arg in args {
                    self.expr(arg);
                }
                self.indent -= 1;
            }
            ExprKind::Number(value) => {
                self.line(format!("number {}{}{}", value, Printer::const_val(expr), loc))
            }
            ExprKind::Boolean(value) => {
                self.line(format!("boolean {}{}{}", value, Printer::const_val(expr), loc))
            }
            ExprKind::String(bytes) => self.line(format!(
                "string {}{}",
                String::from_utf8_lossy(bytes).escape_default(),
                loc
            )),
            ExprKind::Unary(op, element) => {
                self.line(format!(
                    "unaryop {}{}{}",
                    op.as_str(),
                    Printer::const_val(expr),
                    loc
                ));
                self.indent += 1;
                self.expr(element);
                self.indent -= 1;
            }
            ExprKind::Binary(op, lhs, rhs) => {
                self.line(format!(
                    "binaryop {}{}{}",
                    op.as_str(),
                    Printer::const_val(expr),
                    loc
                ));
                self.indent += 1;
                self.expr(lhs);
                self.expr(rhs);
                self.indent -= 1;
            }
        }
    }
}

fn callee_name(callee: &Callee) -> String {
    match callee {
        Callee::Name(name) => name.clone(),
        Callee::Number(value) => value.to_string(),
    }
}
