use std::fmt;

/// Result type for timewarp-recorder operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur in the recorder layer.
#[derive(Debug)]
pub enum Error {
    /// Underlying store rejected the write.
    Store(timewarp_store::Error),
    /// `record` was called before `start_execution`.
    NoActiveExecution,
    /// Malformed config (sample_rate out of [0, 1], zero batch size, ...).
    InvalidConfig(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Store(err) => write!(f, "store error: {}", err),
            Error::NoActiveExecution => write!(f, "no active execution: call start_execution first"),
            Error::InvalidConfig(msg) => write!(f, "invalid recorder config: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Store(err) => Some(err),
            Error::NoActiveExecution | Error::InvalidConfig(_) => None,
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
            Error::NoActiveExecution => {
                timewarp_types::Error::FailedPrecondition(err.to_string())
            }
            Error::InvalidConfig(msg) => timewarp_types::Error::InvalidArgument(msg),
        }
    }
}
