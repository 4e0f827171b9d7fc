//! Compiler for the X language, targeting the Hex processor through the
//! [hexasm](../hexasm/index.html) assembler.
//!
//! X is a small imperative language: `val`, `var` and `array` declarations,
//! procedures and functions, `if`/`while`/assignment statements, and
//! expressions over a single word type. Syscalls are reached by calling a
//! numeric literal (or a val bound to one): `0` exits with a code, `1`
//! writes a byte to a stream, `2` reads one. `|` starts a comment.
//!
//! The pipeline is lexing, recursive-descent parsing to an AST, symbol
//! resolution with constant folding, then code generation into the
//! assembler's directive stream, which resolves labels and emits the
//! binary. There is no operator precedence: chains of a single associative
//! operator (`+`, `and`, `or`) are allowed, everything else is bracketed.

mod ast;
mod codegen;
mod constprop;
mod error;
mod lexer;
mod parser;
mod symbol;
mod token;


pub use crate::ast::{print_tree, Program};
pub use crate::error::{Error, Result};
pub use crate::lexer::Lexer;
pub use crate::parser::Parser;
pub use crate::symbol::{Symbol, SymbolKind, SymbolScope, SymbolTable};
pub use crate::token::Token;

/// Parse a source program into its AST.
pub fn parse(input: &str) -> Result<Program> {
    let mut lexer = Lexer::new(input);
    Parser::new(&mut lexer).parse_program()
}

/// Parse and fold a source program.
pub fn parse_and_fold(input: &str) -> Result<Program> {
    let mut program = parse(input)?;
    constprop::fold_program(&mut program)?;
    Ok(program)
}

/// Compile a source program to the assembler's directive stream.
pub fn compile(input: &str) -> Result<Vec<hexasm::Directive>> {
    let program = parse_and_fold(input)?;
    codegen::generate(&program)
}

/// Compile a source program and assemble it into an executable image.
pub fn compile_binary(input: &str) -> Result<hexfile::Program> {
    Ok(hexasm::CodeGen::new(compile(input)?)?.assemble())
}

/// Compile a source program and render the resolved assembly listing.
pub fn compile_listing(input: &str) -> Result<String> {
    let codegen = hexasm::CodeGen::new(compile(input)?)?;
    let mut out = Vec::new();
    codegen
        .emit_listing(&mut out)
        .expect("writing to a buffer cannot fail");
    Ok(String::from_utf8(out).expect("listing is ascii"))
}
