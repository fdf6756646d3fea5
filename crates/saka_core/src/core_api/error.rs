use std::error::Error as StdError;
use std::fmt;

use crate::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoreErrorCode {
    Io,
    Format,
    NotFound,
    Truncated,
    ValueOutOfRange,
    UnsupportedOperation,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreError {
    pub code: CoreErrorCode,
    pub message: String,
}

impl CoreError {
    pub fn new(code: CoreErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.code, self.message)
    }
}

impl StdError for CoreError {}

impl From<Error> for CoreError {
    fn from(err: Error) -> Self {
        let code = match &err {
            Error::FormatMismatch(_) => CoreErrorCode::Format,
            Error::NotFound(_) => CoreErrorCode::NotFound,
            Error::Truncated { .. } => CoreErrorCode::Truncated,
            Error::ValueOutOfRange(_) => CoreErrorCode::ValueOutOfRange,
            Error::Io(_) => CoreErrorCode::Io,
        };
        Self::new(code, err.to_string())
    }
}
