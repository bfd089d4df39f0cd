use std::fmt;

/// Result type for timewarp-types operations, and the common `Result` re-exported
/// by every downstream crate that doesn't need its own error kind.
pub type Result<T> = std::result::Result<T, Error>;

/// Closed error taxonomy shared across the whole workspace.
///
/// Every downstream crate defines its own `Error` enum with a `From<timewarp_types::Error>`
/// impl rather than re-using this one directly, so that errors keep the crate they
/// originated in visible in their `Display` output. This is the common vocabulary
/// those enums wrap.
#[derive(Debug)]
pub enum Error {
    /// Malformed input: a null snapshot, empty execution id, unknown `order_by`, etc.
    InvalidArgument(String),
    /// No snapshot, execution, branch or sequence matched the request.
    NotFound(String),
    /// The backing store is unreachable or returned an I/O failure.
    Unavailable(String),
    /// The operation's context was cancelled before it completed.
    Cancelled,
    /// The operation's deadline elapsed before it completed.
    DeadlineExceeded,
    /// The operation requires a precondition (e.g. a completed branch) that doesn't hold.
    FailedPrecondition(String),
    /// An invariant the code assumed (e.g. contiguous sequence numbers) was violated.
    Internal(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidArgument(msg) => write!(f, "invalid argument: {}", msg),
            Error::NotFound(msg) => write!(f, "not found: {}", msg),
            Error::Unavailable(msg) => write!(f, "unavailable: {}", msg),
            Error::Cancelled => write!(f, "operation cancelled"),
            Error::DeadlineExceeded => write!(f, "deadline exceeded"),
            Error::FailedPrecondition(msg) => write!(f, "failed precondition: {}", msg),
            Error::Internal(msg) => write!(f, "internal error: {}", msg),
        }
    }
}

impl std::error::Error for Error {}
