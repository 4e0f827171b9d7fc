use crate::ast::*;
use crate::error::{Error, Result};
use crate::symbol::{Symbol, SymbolKind, SymbolScope, SymbolTable};

/// Constant propagation: a post-order pass that fills in `const_value` on
/// expressions and the folded value of val declarations. The pass is a
/// fixed point over the AST; running it again changes nothing.
pub fn fold_program(program: &mut Program) -> Result<()> {
    let mut table = SymbolTable::new();
    for decl in &mut program.globals {
        fold_decl(decl, &mut table, SymbolScope::Global)?;
    }
    for proc in &program.procs {
        let kind = if proc.is_func {
            SymbolKind::Func
        } else {
            SymbolKind::Proc
        };
        table.insert(&proc.name, Symbol::new(kind, SymbolScope::Global, None));
    }
    for proc in &mut program.procs {
        table.enter_scope();
        for formal in &proc.formals {
            let kind = match formal.kind {
                FormalKind::Val => SymbolKind::Val,
                FormalKind::Array => SymbolKind::Array,
                FormalKind::Proc => SymbolKind::Proc,
                FormalKind::Func => SymbolKind::Func,
            };
            // Formals have no compile-time value, including val formals.
            table.insert(&formal.name, Symbol::new(kind, SymbolScope::Local, None));
        }
        for decl in &mut proc.locals {
            fold_decl(decl, &mut table, SymbolScope::Local)?;
        }
        fold_stmt(&mut proc.body, &mut table)?;
        table.exit_scope();
    }
    Ok(())
}

fn fold_decl(decl: &mut Decl, table: &mut SymbolTable, scope: SymbolScope) -> Result<()> {
    match &mut decl.kind {
        DeclKind::Val(expr) => {
            fold_expr(expr, table)?;
            decl.value = expr.const_value;
            table.insert(
                &decl.name,
                Symbol::new(SymbolKind::Val, scope, decl.value),
            );
        }
        DeclKind::Var => {
            table.insert(&decl.name, Symbol::new(SymbolKind::Var, scope, None));
        }
        DeclKind::Array(length) => {
            fold_expr(length, table)?;
            if length.const_value.is_none() {
                return Err(Error::NonConstArrayLength {
                    location: decl.location,
                });
            }
            table.insert(&decl.name, Symbol::new(SymbolKind::Array, scope, None));
        }
    }
    Ok(())
}

fn fold_stmt(stmt: &mut Stmt, table: &mut SymbolTable) -> Result<()> {
    match &mut stmt.kind {
        StmtKind::Skip | StmtKind::Stop => Ok(()),
        StmtKind::Return(expr) => fold_expr(expr, table),
        StmtKind::If(condition, then_stmt, else_stmt) => {
            fold_expr(condition, table)?;
            fold_stmt(then_stmt, table)?;
            fold_stmt(else_stmt, table)
        }
        StmtKind::While(condition, body) => {
            fold_expr(condition, table)?;
            fold_stmt(body, table)
        }
        StmtKind::Seq(stmts) => {
            for stmt in stmts {
                fold_stmt(stmt, table)?;
            }
            Ok(())
        }
        StmtKind::Call(expr) => fold_expr(expr, table),
        StmtKind::Ass(lhs, rhs) => {
            fold_expr(lhs, table)?;
            fold_expr(rhs, table)
        }
    }
}

fn fold_expr(expr: &mut Expr, table: &mut SymbolTable) -> Result<()> {
    let location = expr.location;
    match &mut expr.kind {
        ExprKind::Number(value) => {
            expr.const_value = Some(*value as i32);
        }
        ExprKind::Boolean(value) => {
            expr.const_value = Some(*value as i32);
        }
        ExprKind::String(_) => {}
        ExprKind::VarRef(name) => {
            let symbol = table.lookup(name).ok_or_else(|| Error::UnknownSymbol {
                location,
                name: name.clone(),
            })?;
            if symbol.kind == SymbolKind::Val {
                expr.const_value = symbol.value;
            }
        }
        ExprKind::Subscript(name, index) => {
            table.lookup(name).ok_or_else(|| Error::UnknownSymbol {
                location,
                name: name.clone(),
            })?;
            fold_expr(index, table)?;
        }
        ExprKind::Call(_, args) => {
            for arg in args {
                fold_expr(arg, table)?;
            }
        }
        ExprKind::Unary(op, element) => {
            fold_expr(element, table)?;
            if let Some(value) = element.const_value {
                expr.const_value = Some(match op {
                    UnaryOp::Minus => value.wrapping_neg(),
                    UnaryOp::Not => !value,
                });
            }
        }
        ExprKind::Binary(op, lhs, rhs) => {
            fold_expr(lhs, table)?;
            fold_expr(rhs, table)?;
            if let (Some(l), Some(r)) = (lhs.const_value, rhs.const_value) {
                expr.const_value = Some(fold_binop(*op, l, r));
            }
        }
    }
    Ok(())
}

pub fn fold_binop(op: BinOp, l: i32, r: i32) -> i32 {
    match op {
        BinOp::Plus => l.wrapping_add(r),
        BinOp::Minus => l.wrapping_sub(r),
        BinOp::Or => l | r,
        BinOp::And => l & r,
        BinOp::Eq => (l == r) as i32,
        BinOp::Ne => (l != r) as i32,
        BinOp::Ls => (l < r) as i32,
        BinOp::Le => (l <= r) as i32,
        BinOp::Gr => (l > r) as i32,
        BinOp::Ge => (l >= r) as i32,
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::lexer::Lexer;
    use crate::parser::Parser;
    use matches::assert_matches;

    fn folded(input: &str) -> Result<Program> {
        let mut lexer = Lexer::new(input);
        let mut program = Parser::new(&mut lexer).parse_program()?;
        fold_program(&mut program)?;
        Ok(program)
    }

    fn main_call_arg_value(program: &Program) -> Option<i32> {
        match &program.procs.last().unwrap().body.kind {
            StmtKind::Call(expr) => match &expr.kind {
                ExprKind::Call(_, args) => args[0].const_value,
                _ => None,
            },
            _ => None,
        }
    }

    #[test]
    fn literals_fold() {
        let program = folded("proc main () is 0(42)").unwrap();
        assert_eq!(main_call_arg_value(&program), Some(42));
        let program = folded("proc main () is 0(true)").unwrap();
        assert_eq!(main_call_arg_value(&program), Some(1));
    }

    #[test]
    fn val_references_fold() {
        let program = folded("val x = 3; val y = x + 1; proc main () is 0(y)").unwrap();
        assert_eq!(program.globals[1].value, Some(4));
        assert_eq!(main_call_arg_value(&program), Some(4));
    }

    #[test]
    fn unary_ops_fold() {
        assert_eq!(
            main_call_arg_value(&folded("proc main () is 0(-42)").unwrap()),
            Some(-42)
        );
        assert_eq!(
            main_call_arg_value(&folded("proc main () is 0(-(-42))").unwrap()),
            Some(42)
        );
        // Complement, not logical negation.
        assert_eq!(
            main_call_arg_value(&folded("proc main () is 0(~0)").unwrap()),
            Some(-1)
        );
        assert_eq!(
            main_call_arg_value(&folded("proc main () is 0(~42)").unwrap()),
            Some(!42)
        );
    }

    #[test]
    fn binary_ops_fold() {
        let cases = [
            ("1 + 2", 3),
            ("(1) - (2)", -1),
            ("5 or 3", 7),
            ("5 and 3", 1),
            ("(3) = (3)", 1),
            ("(3) ~= (3)", 0),
            ("(-1) < (0)", 1),
            ("(1) <= (0)", 0),
            ("(1) > (0)", 1),
            ("(-1) >= (0)", 0),
        ];
        for &(expr, expected) in &cases {
            let program = folded(&format!("proc main () is 0({})", expr)).unwrap();
            assert_eq!(main_call_arg_value(&program), Some(expected), "{}", expr);
        }
    }

    #[test]
    fn calls_do_not_fold() {
        let program = folded("func f(val x) is return x proc main () is 0(f(1))").unwrap();
        assert_eq!(main_call_arg_value(&program), None);
    }

    #[test]
    fn shadowed_names_bind_innermost() {
        let program = folded(
            "val x = 1;\n\
             proc p (val x) is 0(x)\n\
             proc main () is 0(x)",
        )
        .unwrap();
        // Inside p the formal shadows the global val, so the argument does
        // not fold; in main the global is visible again.
        assert_eq!(main_call_arg_value(&program), Some(1));
        match &program.procs[0].body.kind {
            StmtKind::Call(expr) => match &expr.kind {
                ExprKind::Call(_, args) => assert_eq!(args[0].const_value, None),
                _ => unreachable!(),
            },
            _ => unreachable!(),
        }
    }

    #[test]
    fn unknown_symbol() {
        assert_matches!(
            folded("proc main () is 0(nope)"),
            Err(Error::UnknownSymbol { .. })
        );
    }

    #[test]
    fn non_const_array_length() {
        assert_matches!(
            folded("var x; array foo[x]; proc main () is skip"),
            Err(Error::NonConstArrayLength { .. })
        );
    }

    #[test]
    fn folding_is_idempotent() {
        let input = "val x = 10;\n\
                     array a[x + 2];\n\
                     proc f (val n) is return n + x\n\
                     proc main () is if x < 11 then 0(f(x)) else 0(~x)";
        let mut lexer = Lexer::new(input);
        let mut program = Parser::new(&mut lexer).parse_program().unwrap();
        fold_program(&mut program).unwrap();
        let once = program.clone();
        fold_program(&mut program).unwrap();
        assert_eq!(program, once);
    }
}
