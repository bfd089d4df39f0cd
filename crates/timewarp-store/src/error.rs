use std::fmt;

/// Result type for timewarp-store operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur in the store layer.
#[derive(Debug)]
pub enum Error {
    /// Malformed input: a null snapshot, empty execution id, unknown `order_by`, ...
    InvalidArgument(String),
    /// No snapshot, execution or sequence matched the request.
    NotFound(String),
    /// The backing store is unreachable or returned an I/O failure.
    Unavailable(String),
    /// SQLite-specific failure, kept distinguishable from a generic `Unavailable`.
    Database(rusqlite::Error),
    /// The request's context was cancelled or past its deadline before the
    /// operation completed.
    Cancelled,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidArgument(msg) => write!(f, "invalid argument: {}", msg),
            Error::NotFound(msg) => write!(f, "not found: {}", msg),
            Error::Unavailable(msg) => write!(f, "store unavailable: {}", msg),
            Error::Database(err) => write!(f, "database error: {}", err),
            Error::Cancelled => write!(f, "operation cancelled"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Database(err) => Some(err),
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(err)
    }
}

impl From<Error> for timewarp_types::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::InvalidArgument(msg) => timewarp_types::Error::InvalidArgument(msg),
            Error::NotFound(msg) => timewarp_types::Error::NotFound(msg),
            Error::Unavailable(msg) => timewarp_types::Error::Unavailable(msg),
            Error::Database(err) => timewarp_types::Error::Unavailable(err.to_string()),
            Error::Cancelled => timewarp_types::Error::Cancelled,
        }
    }
}
