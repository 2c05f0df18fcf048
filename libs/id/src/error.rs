use thiserror::Error;

/// Why a string is not a valid identifier.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IdError {
    #[error("identifier is empty")]
    Empty,

    /// No `_` between prefix and ULID.
    #[error("identifier '{0}' has no prefix separator")]
    NoSeparator(String),

    /// Well-formed, but for another kind of record (a pilot id where a
    /// mission id was expected, say).
    #[error("expected a '{expected}_' identifier, got prefix '{found}'")]
    WrongPrefix {
        expected: &'static str,
        found: String,
    },

    #[error("malformed ULID '{ulid}': {reason}")]
    BadUlid { ulid: String, reason: String },
}

impl IdError {
    pub fn is_wrong_kind(&self) -> bool {
        matches!(self, Self::WrongPrefix { .. })
    }
}
