use std::fmt;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SqlMarshalError {
    #[cfg(feature = "sqlite")]
    #[error(transparent)]
    SqliteError(#[from] rusqlite::Error),

    /// The host value's kind cannot target the column type at all.
    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    /// The host value has the right kind but does not fit the column.
    #[error("Range overflow: {0}")]
    RangeOverflow(String),

    /// The value or call is structurally wrong for the API contract.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A transaction or blob handle is not in a state that permits the operation.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("SQL execution error: {0}")]
    ExecutionError(String),

    #[error("Unimplemented feature: {0}")]
    Unimplemented(String),

    #[error("Other database error: {0}")]
    Other(String),
}

/// Coarse classification of a [`SqlMarshalError`].
///
/// Callers that need to assert on a specific failure (for example a
/// `RangeOverflow` when binding `100_000` to a `SMALLINT`) match on this
/// instead of the message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    TypeMismatch,
    RangeOverflow,
    InvalidArgument,
    InvalidState,
    Config,
    Engine,
}

impl SqlMarshalError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            SqlMarshalError::TypeMismatch(_) => ErrorKind::TypeMismatch,
            SqlMarshalError::RangeOverflow(_) => ErrorKind::RangeOverflow,
            SqlMarshalError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            SqlMarshalError::InvalidState(_) => ErrorKind::InvalidState,
            SqlMarshalError::ConfigError(_) => ErrorKind::Config,
            #[cfg(feature = "sqlite")]
            SqlMarshalError::SqliteError(_) => ErrorKind::Engine,
            SqlMarshalError::ExecutionError(_)
            | SqlMarshalError::Unimplemented(_)
            | SqlMarshalError::Other(_) => ErrorKind::Engine,
        }
    }

    /// True for the three kinds a bind can fail with.
    #[must_use]
    pub fn is_conversion(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::TypeMismatch | ErrorKind::RangeOverflow | ErrorKind::InvalidArgument
        )
    }

    /// Prefix the message with the parameter or column that produced it.
    ///
    /// The kind is preserved; errors coming from the engine pass through untouched.
    #[must_use]
    pub fn with_context(self, context: impl fmt::Display) -> Self {
        match self {
            SqlMarshalError::TypeMismatch(msg) => {
                SqlMarshalError::TypeMismatch(format!("{context}: {msg}"))
            }
            SqlMarshalError::RangeOverflow(msg) => {
                SqlMarshalError::RangeOverflow(format!("{context}: {msg}"))
            }
            SqlMarshalError::InvalidArgument(msg) => {
                SqlMarshalError::InvalidArgument(format!("{context}: {msg}"))
            }
            SqlMarshalError::InvalidState(msg) => {
                SqlMarshalError::InvalidState(format!("{context}: {msg}"))
            }
            other => other,
        }
    }
}

impl From<serde_json::Error> for SqlMarshalError {
    fn from(err: serde_json::Error) -> Self {
        SqlMarshalError::ConfigError(format!("invalid options document: {err}"))
    }
}
