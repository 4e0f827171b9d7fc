use crate::token::Token;
use thiserror::Error;
use util::Location;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the X front end, from lexing through code generation.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum Error {
    #[error("{location}: {message}")]
    Token { location: Location, message: String },
    #[error("{location}: bad character constant")]
    CharConst { location: Location },
    #[error("{location}: invalid token {token} {context}")]
    ParserToken {
        location: Location,
        token: Token,
        context: &'static str,
    },
    #[error("{location}: expected {expected}, found {found}")]
    UnexpectedToken {
        location: Location,
        expected: Token,
        found: Token,
    },
    #[error("{location}: name expected")]
    ExpectedName { location: Location },
    #[error("{location}: array length is not a constant")]
    NonConstArrayLength { location: Location },
    #[error("{location}: invalid syscall number {value}")]
    InvalidSyscall { location: Location, value: i32 },
    #[error("{location}: could not find symbol {name}")]
    UnknownSymbol { location: Location, name: String },
    #[error("{location}: val {name} is not a constant")]
    NonConstVal { location: Location, name: String },
    #[error("{location}: cannot assign to {name}")]
    InvalidAssignment { location: Location, name: String },
    #[error("{location}: {name} is not an array")]
    NotAnArray { location: Location, name: String },
    #[error("{location}: cannot call {name}")]
    UnsupportedCall { location: Location, name: String },
    #[error("assembly of generated code failed: {0}")]
    Asm(#[from] hexasm::Error),
}

impl Error {
    pub fn location(&self) -> Option<Location> {
        match self {
            Error::Token { location, .. }
            | Error::CharConst { location }
            | Error::ParserToken { location, .. }
            | Error::UnexpectedToken { location, .. }
            | Error::ExpectedName { location }
            | Error::NonConstArrayLength { location }
            | Error::InvalidSyscall { location, .. }
            | Error::UnknownSymbol { location, .. }
            | Error::NonConstVal { location, .. }
            | Error::InvalidAssignment { location, .. }
            | Error::NotAnArray { location, .. }
            | Error::UnsupportedCall { location, .. } => Some(*location),
            Error::Asm(err) => err.location(),
        }
    }
}
