use std::fmt;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug)]
pub enum Error {
    Store(timewarp_store::Error),
    Engine(timewarp_engine::Error),
    /// The replay's context was cancelled or its deadline elapsed.
    DeadlineExceeded,
    /// A tool/LLM executor call failed mid-step.
    Step(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Store(err) => write!(f, "store error: {}", err),
            Error::Engine(err) => write!(f, "engine error: {}", err),
            Error::DeadlineExceeded => write!(f, "replay deadline exceeded"),
            Error::Step(msg) => write!(f, "step execution failed: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Store(err) => Some(err),
            Error::Engine(err) => Some(err),
            Error::DeadlineExceeded | Error::Step(_) => None,
        }
    }
}

impl From<timewarp_store::Error> for Error {
    fn from(err: timewarp_store::Error) -> Self {
        Error::Store(err)
    }
}

impl From<timewarp_engine::Error> for Error {
    fn from(err: timewarp_engine::Error) -> Self {
        Error::Engine(err)
    }
}

impl From<Error> for timewarp_types::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::Store(err) => err.into(),
            Error::Engine(err) => err.into(),
            Error::DeadlineExceeded => timewarp_types::Error::DeadlineExceeded,
            Error::Step(msg) => timewarp_types::Error::Internal(msg),
        }
    }
}
