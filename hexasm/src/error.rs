use crate::token::Token;
use thiserror::Error;
use util::Location;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Clone, Debug, Error, PartialEq)]
pub enum Error {
    #[error("{location}: unrecognised token {token}")]
    UnrecognisedToken { location: Location, token: Token },
    #[error("{location}: unexpected token {token}")]
    UnexpectedToken { location: Location, token: Token },
    #[error("{location}: unexpected operand to OPR {token}")]
    InvalidOpr { location: Location, token: Token },
    #[error("{location}: unknown label {label}")]
    UnknownLabel { location: Location, label: String },
    #[error("{location}: absolute reference to unaligned label {label}")]
    UnalignedLabel { location: Location, label: String },
    #[error("label resolution did not converge")]
    ResolveDiverged,
}

impl Error {
    /// The source position the error refers to, where one exists.
    pub fn location(&self) -> Option<Location> {
        match self {
            Error::UnrecognisedToken { location, .. }
            | Error::UnexpectedToken { location, .. }
            | Error::InvalidOpr { location, .. }
            | Error::UnknownLabel { location, .. }
            | Error::UnalignedLabel { location, .. } => Some(*location),
            Error::ResolveDiverged => None,
        }
    }
}
