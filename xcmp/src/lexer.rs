use crate::error::{Error, Result};
use crate::token::Token;
use std::collections::HashMap;
use std::io::{self, Write};
use util::Location;

const EOF: i32 = -1;

/// Lexer for the X language: `|` comments, decimal and `#`-prefixed
/// hexadecimal numbers, character constants with C-style escapes, strings,
/// and the one- and two-character symbols.
pub struct Lexer {
    table: HashMap<&'static str, Token>,
    input: Vec<u8>,
    pos: usize,
    last_char: i32,
    identifier: String,
    string: Vec<u8>,
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
            string: Vec::new(),
            value: 0,
            last_token: Token::EndOfFile,
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

    fn token_error(&self, message: &str) -> Error {
        Error::Token {
            location: self.location(),
            message: message.to_owned(),
        }
    }

    fn read_dec_int(&mut self) {
        let mut number = (self.last_char as u8 as char).to_string();
        while is_digit(self.read_char()) {
            number.push(self.last_char as u8 as char);
        }
        self.value = number.parse::<u64>().unwrap_or(u64::max_value()) as u32;
    }

    fn read_hex_int(&mut self) -> Result<()> {
        let mut number = String::new();
        while is_hex_digit(self.read_char()) {
            number.push(self.last_char as u8 as char);
        }
        if number.is_empty() {
            return Err(self.token_error("expected hexadecimal digits after #"));
        }
        self.value = u64::from_str_radix(&number, 16).unwrap_or(u64::max_value()) as u32;
        Ok(())
    }

    /// Read one character of a character constant or string, handling the
    /// escapes `\\`, `\'`, `\"`, `\t`, `\r` and `\n`.
    fn read_char_const(&mut self) -> Result<u8> {
        let ch = if self.last_char == i32::from(b'\\') {
            self.read_char();
            match self.last_char as u8 {
                b'\\' => b'\\',
                b'\'' => b'\'',
                b'"' => b'"',
                b't' => b'\t',
                b'r' => b'\r',
                b'n' => b'\n',
                _ => {
                    return Err(Error::CharConst {
                        location: self.location(),
                    })
                }
            }
        } else {
            self.last_char as u8
        };
        self.read_char();
        Ok(ch)
    }

    fn read_string(&mut self) -> Result<()> {
        self.string.clear();
        while self.last_char != i32::from(b'"') && self.last_char != EOF {
            let ch = self.read_char_const()?;
            self.string.push(ch);
        }
        Ok(())
    }

    fn read_token(&mut self) -> Result<Token> {
        // Skip whitespace.
        while self.last_char != EOF && (self.last_char as u8 as char).is_ascii_whitespace() {
            if self.last_char == i32::from(b'\n') {
                self.new_line();
            }
            self.read_char();
        }
        // Comment.
        if self.last_char == i32::from(b'|') {
            while self.last_char != EOF && self.last_char != i32::from(b'\n') {
                self.read_char();
            }
            if self.last_char == i32::from(b'\n') {
                self.new_line();
                self.read_char();
            }
            return self.read_token();
        }
        // Identifier or keyword.
        if is_alpha(self.last_char) {
            self.identifier = (self.last_char as u8 as char).to_string();
            while is_name_char(self.read_char()) {
                self.identifier.push(self.last_char as u8 as char);
            }
            return Ok(self
                .table
                .get(self.identifier.as_str())
                .copied()
                .unwrap_or(Token::Identifier));
        }
        // Decimal number.
        if is_digit(self.last_char) {
            self.read_dec_int();
            return Ok(Token::Number);
        }
        // Hexadecimal number.
        if self.last_char == i32::from(b'#') {
            self.read_hex_int()?;
            return Ok(Token::Number);
        }
        if self.last_char == EOF {
            self.current_line.clear();
            return Ok(Token::EndOfFile);
        }
        let token = match self.last_char as u8 {
            b'[' => {
                self.read_char();
                Token::LBracket
            }
            b']' => {
                self.read_char();
                Token::RBracket
            }
            b'(' => {
                self.read_char();
                Token::LParen
            }
            b')' => {
                self.read_char();
                Token::RParen
            }
            b'{' => {
                self.read_char();
                Token::Begin
            }
            b'}' => {
                self.read_char();
                Token::End
            }
            b';' => {
                self.read_char();
                Token::Semicolon
            }
            b',' => {
                self.read_char();
                Token::Comma
            }
            b'+' => {
                self.read_char();
                Token::Plus
            }
            b'-' => {
                self.read_char();
                Token::Minus
            }
            b'=' => {
                self.read_char();
                Token::Eq
            }
            b'<' => {
                if self.read_char() == i32::from(b'=') {
                    self.read_char();
                    Token::Le
                } else {
                    Token::Ls
                }
            }
            b'>' => {
                if self.read_char() == i32::from(b'=') {
                    self.read_char();
                    Token::Ge
                } else {
                    Token::Gr
                }
            }
            b'~' => {
                if self.read_char() == i32::from(b'=') {
                    self.read_char();
                    Token::Ne
                } else {
                    Token::Not
                }
            }
            b':' => {
                if self.read_char() == i32::from(b'=') {
                    self.read_char();
                    Token::Ass
                } else {
                    return Err(self.token_error("'=' expected"));
                }
            }
            b'\'' => {
                self.read_char();
                self.value = u32::from(self.read_char_const()?);
                if self.last_char != i32::from(b'\'') {
                    return Err(self.token_error("expected ' after char constant"));
                }
                self.read_char();
                Token::Number
            }
            b'"' => {
                self.read_char();
                self.read_string()?;
                if self.last_char != i32::from(b'"') {
                    return Err(self.token_error("expected \" after string"));
                }
                self.read_char();
                Token::String
            }
            _ => return Err(self.token_error("unexpected character")),
        };
        Ok(token)
    }

    pub fn get_next_token(&mut self) -> Result<Token> {
        self.last_token = self.read_token()?;
        Ok(self.last_token)
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn number(&self) -> u32 {
        self.value
    }

    pub fn string(&self) -> &[u8] {
        &self.string
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
    pub fn emit_tokens<W: Write>(&mut self, out: &mut W) -> Result<()> {
        loop {
            let token = self.get_next_token()?;
            let result = match token {
                Token::Identifier => writeln!(out, "IDENTIFIER {}", self.identifier()),
                Token::Number => writeln!(out, "NUMBER {}", self.number()),
                Token::String => {
                    writeln!(out, "STRING {}", String::from_utf8_lossy(self.string()))
                }
                Token::EndOfFile => {
                    let result = writeln!(out, "EOF");
                    io_to_token_error(result, self.location())?;
                    return Ok(());
                }
                token => writeln!(out, "{}", token),
            };
            io_to_token_error(result, self.location())?;
        }
    }
}

fn io_to_token_error(result: io::Result<()>, location: Location) -> Result<()> {
    result.map_err(|err| Error::Token {
        location,
        message: format!("write failed: {}", err),
    })
}

fn is_digit(c: i32) -> bool {
    c >= 0 && (c as u8 as char).is_ascii_digit()
}

fn is_hex_digit(c: i32) -> bool {
    c >= 0 && (c as u8 as char).is_ascii_hexdigit()
}

fn is_alpha(c: i32) -> bool {
    c >= 0 && (c as u8 as char).is_ascii_alphabetic()
}

fn is_name_char(c: i32) -> bool {
    c >= 0 && ((c as u8 as char).is_ascii_alphanumeric() || c as u8 == b'_')
}

fn keyword_table() -> HashMap<&'static str, Token> {
    let mut table = HashMap::new();
    table.insert("and", Token::And);
    table.insert("array", Token::Array);
    table.insert("do", Token::Do);
    table.insert("else", Token::Else);
    table.insert("false", Token::False);
    table.insert("func", Token::Func);
    table.insert("if", Token::If);
    table.insert("is", Token::Is);
    table.insert("or", Token::Or);
    table.insert("proc", Token::Proc);
    table.insert("return", Token::Return);
    table.insert("skip", Token::Skip);
    table.insert("stop", Token::Stop);
    table.insert("then", Token::Then);
    table.insert("true", Token::True);
    table.insert("val", Token::Val);
    table.insert("var", Token::Var);
    table.insert("while", Token::While);
    table
}
