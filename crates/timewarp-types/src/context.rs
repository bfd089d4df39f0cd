use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A lightweight, cloneable cancellation token carried through store, replay
/// and branching calls.
///
/// `Context` is the Rust-native stand-in for the request-scoped cancellation
/// context the framework side of this system passes around; rather than
/// borrowing any particular async runtime's context type, it's a plain struct
/// so it works the same whether the caller is sync (the store) or async
/// (replay, branching).
///
/// Clones share the same cancellation flag: cancelling one clone cancels
/// every clone derived from it, which is what lets `what_if_multiple`
/// propagate a single cancellation to every spawned branch.
#[derive(Debug, Clone)]
pub struct Context {
    cancelled: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl Context {
    /// A context that never cancels and has no deadline.
    pub fn background() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
            deadline: None,
        }
    }

    /// A context that is considered cancelled once `timeout` has elapsed.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
            deadline: Some(Instant::now() + timeout),
        }
    }

    /// Derive a child sharing this context's cancellation flag, optionally
    /// tightening the deadline.
    pub fn child(&self, timeout: Option<Duration>) -> Self {
        let child_deadline = match (self.deadline, timeout.map(|t| Instant::now() + t)) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (Some(a), None) => Some(a),
            (None, Some(b)) => Some(b),
            (None, None) => None,
        };
        Self {
            cancelled: self.cancelled.clone(),
            deadline: child_deadline,
        }
    }

    /// Mark this context (and every clone/child derived from it) as cancelled.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// True if explicitly cancelled or if the deadline has elapsed.
    pub fn is_cancelled(&self) -> bool {
        if self.cancelled.load(Ordering::SeqCst) {
            return true;
        }
        matches!(self.deadline, Some(d) if Instant::now() >= d)
    }

    /// Remaining time until the deadline, if any.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline.map(|d| d.saturating_duration_since(Instant::now()))
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::background()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn background_never_cancels() {
        let ctx = Context::background();
        assert!(!ctx.is_cancelled());
    }

    #[test]
    fn explicit_cancel_propagates_to_children() {
        let ctx = Context::background();
        let child = ctx.child(None);
        ctx.cancel();
        assert!(child.is_cancelled());
    }

    #[test]
    fn timeout_expires() {
        let ctx = Context::with_timeout(Duration::from_millis(1));
        std::thread::sleep(Duration::from_millis(10));
        assert!(ctx.is_cancelled());
    }

    #[test]
    fn child_deadline_is_tightest() {
        let ctx = Context::with_timeout(Duration::from_secs(10));
        let child = ctx.child(Some(Duration::from_millis(1)));
        std::thread::sleep(Duration::from_millis(10));
        assert!(child.is_cancelled());
        assert!(!ctx.is_cancelled());
    }
}
