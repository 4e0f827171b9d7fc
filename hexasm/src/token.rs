use hex::{Instr, OprInstr};
use std::fmt;

/// Lexer tokens for the assembly language. Mnemonics are keywords; any
/// other word is an identifier, used for labels.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Token {
    NUMBER,
    MINUS,
    DATA,
    PROC,
    FUNC,
    LDAM,
    LDBM,
    STAM,
    LDAC,
    LDBC,
    LDAP,
    LDAI,
    LDBI,
    STAI,
    BR,
    BRZ,
    BRN,
    BRB,
    SVC,
    ADD,
    SUB,
    OPR,
    IDENTIFIER,
    EndOfFile,
    NONE,
}

impl Token {
    pub fn as_str(self) -> &'static str {
        match self {
            Token::NUMBER => "NUMBER",
            Token::MINUS => "MINUS",
            Token::DATA => "DATA",
            Token::PROC => "PROC",
            Token::FUNC => "FUNC",
            Token::LDAM => "LDAM",
            Token::LDBM => "LDBM",
            Token::STAM => "STAM",
            Token::LDAC => "LDAC",
            Token::LDBC => "LDBC",
            Token::LDAP => "LDAP",
            Token::LDAI => "LDAI",
            Token::LDBI => "LDBI",
            Token::STAI => "STAI",
            Token::BR => "BR",
            Token::BRZ => "BRZ",
            Token::BRN => "BRN",
            Token::BRB => "BRB",
            Token::SVC => "SVC",
            Token::ADD => "ADD",
            Token::SUB => "SUB",
            Token::OPR => "OPR",
            Token::IDENTIFIER => "IDENTIFIER",
            Token::EndOfFile => "END_OF_FILE",
            Token::NONE => "NONE",
        }
    }

    /// The opcode a mnemonic token denotes, for instruction-forming tokens.
    pub fn to_instr(self) -> Option<Instr> {
        let instr = match self {
            Token::LDAM => Instr::LDAM,
            Token::LDBM => Instr::LDBM,
            Token::STAM => Instr::STAM,
            Token::LDAC => Instr::LDAC,
            Token::LDBC => Instr::LDBC,
            Token::LDAP => Instr::LDAP,
            Token::LDAI => Instr::LDAI,
            Token::LDBI => Instr::LDBI,
            Token::STAI => Instr::STAI,
            Token::BR => Instr::BR,
            Token::BRZ => Instr::BRZ,
            Token::BRN => Instr::BRN,
            Token::OPR => Instr::OPR,
            _ => return None,
        };
        Some(instr)
    }

    /// The OPR sub-operation a token denotes.
    pub fn to_opr_instr(self) -> Option<OprInstr> {
        let opr = match self {
            Token::BRB => OprInstr::BRB,
            Token::ADD => OprInstr::ADD,
            Token::SUB => OprInstr::SUB,
            Token::SVC => OprInstr::SVC,
            _ => return None,
        };
        Some(opr)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
