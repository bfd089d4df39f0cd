use std::fmt;

pub type Result<T> = std::result::Result<T, Error>;

/// Error type for SDK operations. Wraps every layer the facade composes;
/// `source()` chains down to whichever one actually failed.
#[derive(Debug)]
pub enum Error {
    Store(timewarp_store::Error),
    Recorder(timewarp_recorder::Error),
    Engine(timewarp_engine::Error),
    Replay(timewarp_replay::Error),
    Branch(timewarp_branch::Error),
    /// No execution or branch exists under the given id.
    NotFound(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Store(err) => write!(f, "{err}"),
            Error::Recorder(err) => write!(f, "{err}"),
            Error::Engine(err) => write!(f, "{err}"),
            Error::Replay(err) => write!(f, "{err}"),
            Error::Branch(err) => write!(f, "{err}"),
            Error::NotFound(msg) => write!(f, "not found: {msg}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Store(err) => Some(err),
            Error::Recorder(err) => Some(err),
            Error::Engine(err) => Some(err),
            Error::Replay(err) => Some(err),
            Error::Branch(err) => Some(err),
            Error::NotFound(_) => None,
        }
    }
}

impl From<timewarp_store::Error> for Error {
    fn from(err: timewarp_store::Error) -> Self {
        Error::Store(err)
    }
}

impl From<timewarp_recorder::Error> for Error {
    fn from(err: timewarp_recorder::Error) -> Self {
        Error::Recorder(err)
    }
}

impl From<timewarp_engine::Error> for Error {
    fn from(err: timewarp_engine::Error) -> Self {
        Error::Engine(err)
    }
}

impl From<timewarp_replay::Error> for Error {
    fn from(err: timewarp_replay::Error) -> Self {
        Error::Replay(err)
    }
}

impl From<timewarp_branch::Error> for Error {
    fn from(err: timewarp_branch::Error) -> Self {
        Error::Branch(err)
    }
}
