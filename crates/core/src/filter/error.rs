//! Filter expression error types.

use thiserror::Error;

/// Errors raised while parsing or validating a filter expression.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FilterError {
    /// The text is not a well-formed literal.
    #[error("Invalid filter syntax at offset {offset}: {message}")]
    Syntax {
        /// Byte offset of the offending input.
        offset: usize,
        /// What was expected.
        message: String,
    },

    /// The literal parsed but is neither a condition nor a logical group.
    #[error("Invalid filter shape: {0}")]
    InvalidShape(String),

    /// The condition names a field the account catalog does not have.
    #[error("Unknown account field: {0}")]
    UnknownField(String),

    /// The condition uses an operator that is not supported.
    #[error("Unsupported filter operator: {0}")]
    UnsupportedOperator(String),
}

impl FilterError {
    pub(crate) fn syntax(offset: usize, message: impl Into<String>) -> Self {
        Self::Syntax {
            offset,
            message: message.into(),
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Syntax { .. } => "FILTER_SYNTAX",
            Self::InvalidShape(_) => "FILTER_INVALID_SHAPE",
            Self::UnknownField(_) => "FILTER_UNKNOWN_FIELD",
            Self::UnsupportedOperator(_) => "FILTER_UNSUPPORTED_OPERATOR",
        }
    }
}
