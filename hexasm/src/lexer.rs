use crate::token::Token;
use std::collections::HashMap;
use std::io::{self, Write};
use util::Location;

const EOF: i32 = -1;

/// Free-form, line-oriented lexer for the assembly language. Whitespace
/// separates tokens and `#` comments run to the end of the line.
pub struct Lexer {
    table: HashMap<&'static str, Token>,
    input: Vec<u8>,
    pos: usize,
    last_char: i32,
    identifier: String,
    value: u32,
    last_token: Token,
    line_number: usize,
    char_number: usize,
    current_line: String,
}

impl Lexer {
    pub fn new(input: &str) -> Lexer {
        let mut lexer = Lexer {
            table: keyword_table(),
            input: input.as_bytes().to_vec(),
            pos: 0,
            last_char: 0,
            identifier: String::new(),
            value: 0,
            last_token: Token::NONE,
            line_number: 0,
            char_number: 0,
            current_line: String::new(),
        };
        lexer.read_char();
        lexer
    }

    fn read_char(&mut self) -> i32 {
        match self.input.get(self.pos) {
            Some(&byte) => {
                self.pos += 1;
                self.last_char = i32::from(byte);
                self.current_line.push(byte as char);
            }
            None => self.last_char = EOF,
        }
        self.char_number += 1;
        self.last_char
    }

    fn new_line(&mut self) {
        self.line_number += 1;
        self.char_number = 0;
        self.current_line.clear();
    }

    fn read_token(&mut self) -> Token {
        // Skip whitespace.
        while self.last_char != EOF && (self.last_char as u8 as char).is_ascii_whitespace() {
            if self.last_char == i32::from(b'\n') {
                self.new_line();
            }
            self.read_char();
        }
        // Comment.
        if self.last_char == i32::from(b'#') {
            while self.last_char != EOF && self.last_char != i32::from(b'\n') {
                self.read_char();
            }
            if self.last_char == i32::from(b'\n') {
                self.new_line();
                self.read_char();
            }
            return self.read_token();
        }
        // Identifier or mnemonic keyword.
        if is_name_start(self.last_char) {
            self.identifier = (self.last_char as u8 as char).to_string();
            while is_name_char(self.read_char()) {
                self.identifier.push(self.last_char as u8 as char);
            }
            return self.lookup_keyword();
        }
        // Number.
        if is_digit(self.last_char) {
            let mut number = (self.last_char as u8 as char).to_string();
            while is_digit(self.read_char()) {
                number.push(self.last_char as u8 as char);
            }
            self.value = number.parse::<u64>().unwrap_or(u64::max_value()) as u32;
            return Token::NUMBER;
        }
        // Symbols.
        if self.last_char == i32::from(b'-') {
            self.read_char();
            return Token::MINUS;
        }
        // End of file.
        if self.last_char == EOF {
            self.current_line.clear();
            return Token::EndOfFile;
        }
        self.read_char();
        Token::NONE
    }

    fn lookup_keyword(&self) -> Token {
        self.table
            .get(self.identifier.as_str())
            .copied()
            .unwrap_or(Token::IDENTIFIER)
    }

    pub fn get_next_token(&mut self) -> Token {
        self.last_token = self.read_token();
        self.last_token
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn number(&self) -> u32 {
        self.value
    }

    pub fn last_token(&self) -> Token {
        self.last_token
    }

    pub fn line(&self) -> &str {
        &self.current_line
    }

    pub fn location(&self) -> Location {
        Location::new(self.line_number, self.char_number)
    }

    /// Tokenise the input only and report the tokens.
    pub fn emit_tokens<W: Write>(&mut self, out: &mut W) -> io::Result<()> {
        loop {
            match self.get_next_token() {
                Token::IDENTIFIER => writeln!(out, "IDENTIFIER {}", self.identifier())?,
                Token::NUMBER => writeln!(out, "NUMBER {}", self.number())?,
                Token::EndOfFile => {
                    writeln!(out, "EOF")?;
                    return Ok(());
                }
                token => writeln!(out, "{}", token)?,
            }
        }
    }
}

fn is_digit(c: i32) -> bool {
    c >= 0 && (c as u8 as char).is_ascii_digit()
}

fn is_name_start(c: i32) -> bool {
    c >= 0 && ((c as u8 as char).is_ascii_alphabetic() || c as u8 == b'_')
}

fn is_name_char(c: i32) -> bool {
    c >= 0 && ((c as u8 as char).is_ascii_alphanumeric() || c as u8 == b'_')
}

fn keyword_table() -> HashMap<&'static str, Token> {
    let mut table = HashMap::new();
    table.insert("ADD", Token::ADD);
    table.insert("BR", Token::BR);
    table.insert("BRB", Token::BRB);
    table.insert("BRN", Token::BRN);
    table.insert("BRZ", Token::BRZ);
    table.insert("DATA", Token::DATA);
    table.insert("FUNC", Token::FUNC);
    table.insert("LDAC", Token::LDAC);
    table.insert("LDAI", Token::LDAI);
    table.insert("LDAM", Token::LDAM);
    table.insert("LDAP", Token::LDAP);
    table.insert("LDBC", Token::LDBC);
    table.insert("LDBI", Token::LDBI);
    table.insert("LDBM", Token::LDBM);
    table.insert("OPR", Token::OPR);
    table.insert("PROC", Token::PROC);
    table.insert("STAI", Token::STAI);
    table.insert("STAM", Token::STAM);
    table.insert("SUB", Token::SUB);
    table.insert("SVC", Token::SVC);
    table
}
