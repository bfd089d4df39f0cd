use std::fmt;

/// Result type for timewarp-engine operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug)]
pub enum Error {
    Store(timewarp_store::Error),
    /// The execution has no snapshots to build a timeline from.
    EmptyExecution(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Store(err) => write!(f, "store error: {}", err),
            Error::EmptyExecution(id) => write!(f, "execution {} has no recorded snapshots", id),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Store(err) => Some(err),
            Error::EmptyExecution(_) => None,
        }
    }
}

impl From<timewarp_store::Error> for Error {
    fn from(err: timewarp_store::Error) -> Self {
        Error::Store(err)
    }
}

impl From<Error> for timewarp_types::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::Store(err) => err.into(),
            Error::EmptyExecution(id) => timewarp_types::Error::NotFound(id),
        }
    }
}
