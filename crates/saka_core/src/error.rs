use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// A structural invariant of the card or save blob does not hold
    /// (magic, header length, checksum, section accounting).
    #[error("format mismatch: {0}")]
    FormatMismatch(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("truncated {what}: need {need}, have {have}")]
    Truncated {
        what: &'static str,
        need: u64,
        have: u64,
    },

    #[error("value out of range: {0}")]
    ValueOutOfRange(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn format(message: impl Into<String>) -> Self {
        Self::FormatMismatch(message.into())
    }

    pub(crate) fn range(message: impl Into<String>) -> Self {
        Self::ValueOutOfRange(message.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
