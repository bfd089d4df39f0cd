use std::fmt;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug)]
pub enum Error {
    Store(timewarp_store::Error),
    Replay(timewarp_replay::Error),
    NotFound(String),
    /// A branch operation required a completed branch (or a completed
    /// parent branch) but it wasn't.
    FailedPrecondition(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Store(err) => write!(f, "store error: {}", err),
            Error::Replay(err) => write!(f, "replay error: {}", err),
            Error::NotFound(msg) => write!(f, "not found: {}", msg),
            Error::FailedPrecondition(msg) => write!(f, "failed precondition: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Store(err) => Some(err),
            Error::Replay(err) => Some(err),
            Error::NotFound(_) | Error::FailedPrecondition(_) => None,
        }
    }
}

impl From<timewarp_store::Error> for Error {
    fn from(err: timewarp_store::Error) -> Self {
        Error::Store(err)
    }
}

impl From<timewarp_replay::Error> for Error {
    fn from(err: timewarp_replay::Error) -> Self {
        Error::Replay(err)
    }
}

impl From<Error> for timewarp_types::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::Store(err) => err.into(),
            Error::Replay(err) => err.into(),
            Error::NotFound(msg) => timewarp_types::Error::NotFound(msg),
            Error::FailedPrecondition(msg) => timewarp_types::Error::FailedPrecondition(msg),
        }
    }
}
