use crate::ast::*;
use crate::error::{Error, Result};
use crate::lexer::Lexer;
use crate::token::Token;

/// Recursive-descent parser for the X language.
///
/// There is no operator precedence: chains of an associative operator are
/// allowed, all other compound expressions require explicit brackets.
pub struct Parser<'a> {
    lexer: &'a mut Lexer,
}

impl<'a> Parser<'a> {
    pub fn new(lexer: &'a mut Lexer) -> Parser<'a> {
        Parser { lexer }
    }

    /// Expect the given last token and advance past it.
    fn expect(&mut self, token: Token) -> Result<()> {
        if token != self.lexer.last_token() {
            return Err(Error::UnexpectedToken {
                location: self.lexer.location(),
                expected: token,
                found: self.lexer.last_token(),
            });
        }
        self.lexer.get_next_token()?;
        Ok(())
    }

    fn parse_identifier(&mut self) -> Result<String> {
        if self.lexer.last_token() == Token::Identifier {
            let name = self.lexer.identifier().to_owned();
            self.lexer.get_next_token()?;
            Ok(name)
        } else {
            Err(Error::ExpectedName {
                location: self.lexer.location(),
            })
        }
    }

    fn token_to_binop(token: Token) -> BinOp {
        match token {
            Token::Plus => BinOp::Plus,
            Token::Minus => BinOp::Minus,
            Token::Or => BinOp::Or,
            Token::And => BinOp::And,
            Token::Eq => BinOp::Eq,
            Token::Ne => BinOp::Ne,
            Token::Ls => BinOp::Ls,
            Token::Le => BinOp::Le,
            Token::Gr => BinOp::Gr,
            Token::Ge => BinOp::Ge,
            _ => unreachable!("not a binary operator"),
        }
    }

    /// binary-op-RHS := <element> [ <assoc-op> <binary-op-RHS> ]
    ///
    /// Chains are only continued for the same associative operator.
    fn parse_binop_rhs(&mut self, op: Token) -> Result<Expr> {
        let location = self.lexer.location();
        let element = self.parse_element()?;
        if op.is_associative() && op == self.lexer.last_token() {
            self.lexer.get_next_token()?;
            let rhs = self.parse_binop_rhs(op)?;
            Ok(Expr::new(
                location,
                ExprKind::Binary(Parser::token_to_binop(op), Box::new(element), Box::new(rhs)),
            ))
        } else {
            Ok(element)
        }
    }

    /// expression :=
    ///   "-" <element>
    ///   "~" <element>
    ///   <element> [ <binary-op> <binary-op-RHS> ]
    fn parse_expr(&mut self) -> Result<Expr> {
        let location = self.lexer.location();
        if self.lexer.last_token() == Token::Minus {
            self.lexer.get_next_token()?;
            let element = self.parse_element()?;
            return Ok(Expr::new(
                location,
                ExprKind::Unary(UnaryOp::Minus, Box::new(element)),
            ));
        }
        if self.lexer.last_token() == Token::Not {
            self.lexer.get_next_token()?;
            let element = self.parse_element()?;
            return Ok(Expr::new(
                location,
                ExprKind::Unary(UnaryOp::Not, Box::new(element)),
            ));
        }
        let element = self.parse_element()?;
        let op = self.lexer.last_token();
        if op.is_binary_op() {
            self.lexer.get_next_token()?;
            let rhs = self.parse_binop_rhs(op)?;
            return Ok(Expr::new(
                location,
                ExprKind::Binary(Parser::token_to_binop(op), Box::new(element), Box::new(rhs)),
            ));
        }
        Ok(element)
    }

    /// expression-list := <expr> [ "," <expr> ]*
    fn parse_expr_list(&mut self) -> Result<Vec<Expr>> {
        let mut exprs = vec![self.parse_expr()?];
        while self.lexer.last_token() == Token::Comma {
            self.lexer.get_next_token()?;
            exprs.push(self.parse_expr()?);
        }
        Ok(exprs)
    }

    fn parse_call_args(&mut self) -> Result<Vec<Expr>> {
        if self.lexer.get_next_token()? == Token::RParen {
            self.lexer.get_next_token()?;
            Ok(Vec::new())
        } else {
            let args = self.parse_expr_list()?;
            self.expect(Token::RParen)?;
            Ok(args)
        }
    }

    /// element :=
    ///   <identifier>
    ///   <identifier> "[" <expr> "]"
    ///   <identifier> "(" <expr-list> ")"
    ///   <number>
    ///   <number> "(" <expr-list> ")"
    ///   <string>
    ///   "true" | "false"
    ///   "(" <expr> ")"
    fn parse_element(&mut self) -> Result<Expr> {
        let location = self.lexer.location();
        match self.lexer.last_token() {
            Token::Identifier => {
                let name = self.parse_identifier()?;
                match self.lexer.last_token() {
                    // Array subscript.
                    Token::LBracket => {
                        self.lexer.get_next_token()?;
                        let index = self.parse_expr()?;
                        self.expect(Token::RBracket)?;
                        Ok(Expr::new(
                            location,
                            ExprKind::Subscript(name, Box::new(index)),
                        ))
                    }
                    // Procedure or function call.
                    Token::LParen => {
                        let args = self.parse_call_args()?;
                        Ok(Expr::new(
                            location,
                            ExprKind::Call(Callee::Name(name), args),
                        ))
                    }
                    // Variable reference.
                    _ => Ok(Expr::new(location, ExprKind::VarRef(name))),
                }
            }
            Token::Number => {
                let value = self.lexer.number();
                // A literal followed by an argument list is a syscall.
                if self.lexer.get_next_token()? == Token::LParen {
                    let args = self.parse_call_args()?;
                    Ok(Expr::new(
                        location,
                        ExprKind::Call(Callee::Number(value), args),
                    ))
                } else {
                    Ok(Expr::new(location, ExprKind::Number(value)))
                }
            }
            Token::String => {
                let bytes = self.lexer.string().to_vec();
                self.lexer.get_next_token()?;
                Ok(Expr::new(location, ExprKind::String(bytes)))
            }
            Token::True => {
                self.lexer.get_next_token()?;
                Ok(Expr::new(location, ExprKind::Boolean(true)))
            }
            Token::False => {
                self.lexer.get_next_token()?;
                Ok(Expr::new(location, ExprKind::Boolean(false)))
            }
            Token::LParen => {
                self.lexer.get_next_token()?;
                let expr = self.parse_expr()?;
                self.expect(Token::RParen)?;
                Ok(expr)
            }
            token => Err(Error::ParserToken {
                location,
                token,
                context: "in expression element",
            }),
        }
    }

    /// declaration :=
    ///   "val" <identifier> "=" <expr> ";"
    ///   "var" <identifier> ";"
    ///   "array" <identifier> "[" <expr> "]" ";"
    fn parse_decl(&mut self) -> Result<Decl> {
        let location = self.lexer.location();
        match self.lexer.last_token() {
            Token::Val => {
                self.lexer.get_next_token()?;
                let name = self.parse_identifier()?;
                self.expect(Token::Eq)?;
                let expr = self.parse_expr()?;
                self.expect(Token::Semicolon)?;
                Ok(Decl {
                    location,
                    name,
                    kind: DeclKind::Val(expr),
                    value: None,
                })
            }
            Token::Var => {
                self.lexer.get_next_token()?;
                let name = self.parse_identifier()?;
                self.expect(Token::Semicolon)?;
                Ok(Decl {
                    location,
                    name,
                    kind: DeclKind::Var,
                    value: None,
                })
            }
            Token::Array => {
                self.lexer.get_next_token()?;
                let name = self.parse_identifier()?;
                self.expect(Token::LBracket)?;
                let length = self.parse_expr()?;
                self.expect(Token::RBracket)?;
                self.expect(Token::Semicolon)?;
                Ok(Decl {
                    location,
                    name,
                    kind: DeclKind::Array(length),
                    value: None,
                })
            }
            token => Err(Error::ParserToken {
                location,
                token,
                context: "in declaration",
            }),
        }
    }

    fn parse_global_decls(&mut self) -> Result<Vec<Decl>> {
        let mut decls = Vec::new();
        while let Token::Val | Token::Var | Token::Array = self.lexer.last_token() {
            decls.push(self.parse_decl()?);
        }
        Ok(decls)
    }

    fn parse_local_decls(&mut self) -> Result<Vec<Decl>> {
        let mut decls = Vec::new();
        while let Token::Val | Token::Var = self.lexer.last_token() {
            decls.push(self.parse_decl()?);
        }
        Ok(decls)
    }

    /// formal := ("val" | "array" | "proc" | "func") <identifier>
    fn parse_formal(&mut self) -> Result<Formal> {
        let location = self.lexer.location();
        let kind = match self.lexer.last_token() {
            Token::Val => FormalKind::Val,
            Token::Array => FormalKind::Array,
            Token::Proc => FormalKind::Proc,
            Token::Func => FormalKind::Func,
            token => {
                return Err(Error::ParserToken {
                    location,
                    token,
                    context: "in formal",
                })
            }
        };
        self.lexer.get_next_token()?;
        let name = self.parse_identifier()?;
        Ok(Formal {
            location,
            name,
            kind,
        })
    }

    fn parse_formals(&mut self) -> Result<Vec<Formal>> {
        let mut formals = Vec::new();
        while let Token::Val | Token::Array | Token::Proc | Token::Func = self.lexer.last_token() {
            formals.push(self.parse_formal()?);
            if self.lexer.last_token() == Token::Comma {
                self.lexer.get_next_token()?;
            }
        }
        Ok(formals)
    }

    /// statement :=
    ///   "skip" | "stop" | "return" <expr>
    ///   "if" <expr> "then" <stmt> "else" <stmt>
    ///   "while" <expr> "do" <stmt>
    ///   "{" <stmt> [ ";" <stmt> ]* "}"
    ///   <identifier> ":=" <expr>
    ///   <identifier> "(" <expr-list> ")"
    ///   <number> "(" <expr-list> ")"
    fn parse_statement(&mut self) -> Result<Stmt> {
        let location = self.lexer.location();
        match self.lexer.last_token() {
            Token::Skip => {
                self.lexer.get_next_token()?;
                Ok(Stmt {
                    location,
                    kind: StmtKind::Skip,
                })
            }
            Token::Stop => {
                self.lexer.get_next_token()?;
                Ok(Stmt {
                    location,
                    kind: StmtKind::Stop,
                })
            }
            Token::Return => {
                self.lexer.get_next_token()?;
                Ok(Stmt {
                    location,
                    kind: StmtKind::Return(self.parse_expr()?),
                })
            }
            Token::If => {
                self.lexer.get_next_token()?;
                let condition = self.parse_expr()?;
                self.expect(Token::Then)?;
                let then_stmt = self.parse_statement()?;
                self.expect(Token::Else)?;
                let else_stmt = self.parse_statement()?;
                Ok(Stmt {
                    location,
                    kind: StmtKind::If(condition, Box::new(then_stmt), Box::new(else_stmt)),
                })
            }
            Token::While => {
                self.lexer.get_next_token()?;
                let condition = self.parse_expr()?;
                self.expect(Token::Do)?;
                let body = self.parse_statement()?;
                Ok(Stmt {
                    location,
                    kind: StmtKind::While(condition, Box::new(body)),
                })
            }
            Token::Begin => {
                self.lexer.get_next_token()?;
                let mut stmts = vec![self.parse_statement()?];
                while self.lexer.last_token() == Token::Semicolon {
                    self.lexer.get_next_token()?;
                    stmts.push(self.parse_statement()?);
                }
                self.expect(Token::End)?;
                Ok(Stmt {
                    location,
                    kind: StmtKind::Seq(stmts),
                })
            }
            Token::Identifier | Token::Number => {
                let element = self.parse_element()?;
                if let ExprKind::Call(..) = element.kind {
                    return Ok(Stmt {
                        location,
                        kind: StmtKind::Call(element),
                    });
                }
                self.expect(Token::Ass)?;
                Ok(Stmt {
                    location,
                    kind: StmtKind::Ass(element, self.parse_expr()?),
                })
            }
            token => Err(Error::ParserToken {
                location,
                token,
                context: "in statement",
            }),
        }
    }

    /// proc-decl :=
    ///   ("proc" | "func") <name> "(" <formals> ")" "is" <local-decl>* <statement>
    fn parse_proc_decl(&mut self) -> Result<Proc> {
        let location = self.lexer.location();
        let is_func = self.lexer.last_token() == Token::Func;
        self.lexer.get_next_token()?;
        let name = self.parse_identifier()?;
        self.expect(Token::LParen)?;
        let formals = if self.lexer.last_token() == Token::RParen {
            self.lexer.get_next_token()?;
            Vec::new()
        } else {
            let formals = self.parse_formals()?;
            self.expect(Token::RParen)?;
            formals
        };
        self.expect(Token::Is)?;
        let locals = self.parse_local_decls()?;
        let body = self.parse_statement()?;
        Ok(Proc {
            location,
            name,
            is_func,
            formals,
            locals,
            body,
        })
    }

    pub fn parse_program(&mut self) -> Result<Program> {
        self.lexer.get_next_token()?;
        let globals = self.parse_global_decls()?;
        let mut procs = Vec::new();
        while let Token::Proc | Token::Func = self.lexer.last_token() {
            procs.push(self.parse_proc_decl()?);
        }
        self.expect(Token::EndOfFile)?;
        Ok(Program { globals, procs })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use matches::assert_matches;

    pub fn parse(input: &str) -> Result<Program> {
        let mut lexer = Lexer::new(input);
        Parser::new(&mut lexer).parse_program()
    }

    #[test]
    fn minimal_program() {
        let program = parse("proc main () is skip").unwrap();
        assert_eq!(program.procs.len(), 1);
        assert_eq!(program.procs[0].name, "main");
        assert!(!program.procs[0].is_func);
        assert_matches!(program.procs[0].body.kind, StmtKind::Skip);
    }

    #[test]
    fn globals_and_locals() {
        let program = parse(
            "val x = 1; var y; array z[10];\n\
             proc main () is var a; val b = 2; { a := b; z[x] := a }",
        )
        .unwrap();
        assert_eq!(program.globals.len(), 3);
        assert_matches!(program.globals[0].kind, DeclKind::Val(_));
        assert_matches!(program.globals[1].kind, DeclKind::Var);
        assert_matches!(program.globals[2].kind, DeclKind::Array(_));
        assert_eq!(program.procs[0].locals.len(), 2);
    }

    #[test]
    fn syscall_call_targets() {
        let program = parse("proc main () is 0(2(0))").unwrap();
        match &program.procs[0].body.kind {
            StmtKind::Call(expr) => match &expr.kind {
                ExprKind::Call(Callee::Number(0), args) => {
                    assert_eq!(args.len(), 1);
                    assert_matches!(args[0].kind, ExprKind::Call(Callee::Number(2), _));
                }
                other => panic!("unexpected callee {:?}", other),
            },
            other => panic!("unexpected statement {:?}", other),
        }
    }

    #[test]
    fn associative_chains_nest_right() {
        let program = parse("proc main () is 0(1 + 2 + 3)").unwrap();
        match &program.procs[0].body.kind {
            StmtKind::Call(expr) => match &expr.kind {
                ExprKind::Call(_, args) => match &args[0].kind {
                    ExprKind::Binary(BinOp::Plus, lhs, rhs) => {
                        assert_matches!(lhs.kind, ExprKind::Number(1));
                        assert_matches!(rhs.kind, ExprKind::Binary(BinOp::Plus, _, _));
                    }
                    other => panic!("unexpected expression {:?}", other),
                },
                _ => unreachable!(),
            },
            _ => unreachable!(),
        }
    }

    #[test]
    fn formals() {
        let program =
            parse("proc p (val a, array b, proc c, func d) is skip").unwrap();
        let kinds: Vec<FormalKind> =
            program.procs[0].formals.iter().map(|f| f.kind).collect();
        assert_eq!(
            kinds,
            vec![
                FormalKind::Val,
                FormalKind::Array,
                FormalKind::Proc,
                FormalKind::Func
            ]
        );
    }

    #[test]
    fn unexpected_token_errors() {
        assert_matches!(
            parse("val foo = bar[100~"),
            Err(Error::UnexpectedToken { .. })
        );
        assert_matches!(parse("val foo = 1"), Err(Error::UnexpectedToken { .. }));
        assert_matches!(parse("array foo[100]~"), Err(Error::UnexpectedToken { .. }));
        assert_matches!(parse("proc foo() is if 0 xxx"), Err(Error::UnexpectedToken { .. }));
        assert_matches!(parse("proc foo() is while 0 xxx"), Err(Error::UnexpectedToken { .. }));
        assert_matches!(parse("proc foo() is { skip x"), Err(Error::UnexpectedToken { .. }));
        assert_matches!(parse("proc foo() is skip x"), Err(Error::UnexpectedToken { .. }));
        assert_matches!(parse("proc foo() is bar x"), Err(Error::UnexpectedToken { .. }));
    }

    #[test]
    fn expected_name_errors() {
        assert_matches!(parse("proc ~"), Err(Error::ExpectedName { .. }));
        assert_matches!(parse("var 1;"), Err(Error::ExpectedName { .. }));
    }

    #[test]
    fn parser_token_errors() {
        assert_matches!(parse("val foo = +"), Err(Error::ParserToken { .. }));
        assert_matches!(parse("proc foo(val a, foo b) is skip"), Err(Error::ParserToken { .. }));
        assert_matches!(parse("proc foo() is ~"), Err(Error::ParserToken { .. }));
    }
}
