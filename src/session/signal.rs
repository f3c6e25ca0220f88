//! One-way stop flag shared by the two loops of a session.

use tokio_util::sync::{CancellationToken, DropGuard};

/// Shared cancellation flag: `Active` until cancelled, then `Cancelled` forever.
///
/// Clones observe the same state. A signal created with [`child_of`] is also
/// cancelled when its parent token is, which is how a server shutdown reaches
/// every running session.
///
/// [`child_of`]: CancellationSignal::child_of
#[derive(Debug, Clone, Default)]
pub struct CancellationSignal {
    token: CancellationToken,
}

impl CancellationSignal {
    /// A fresh, active signal with no parent.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A fresh signal that follows `parent` into the cancelled state.
    ///
    /// Cancelling the child never affects the parent.
    #[must_use]
    pub fn child_of(parent: &CancellationToken) -> Self {
        Self {
            token: parent.child_token(),
        }
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Move to `Cancelled`. Idempotent, and safe to call from several tasks
    /// at once.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// A guard that cancels the signal when dropped, including during unwinding.
    #[must_use]
    pub fn drop_guard(&self) -> DropGuard {
        self.token.clone().drop_guard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_active() {
        assert!(!CancellationSignal::new().is_cancelled());
    }

    #[test]
    fn test_cancel_is_idempotent() {
        let signal = CancellationSignal::new();
        signal.cancel();
        assert!(signal.is_cancelled());

        signal.cancel();
        assert!(signal.is_cancelled());
    }

    #[test]
    fn test_concurrent_cancel() {
        let signal = CancellationSignal::new();
        std::thread::scope(|scope| {
            for _ in 0..8 {
                let signal = signal.clone();
                scope.spawn(move || signal.cancel());
            }
        });
        assert!(signal.is_cancelled());
    }

    #[test]
    fn test_clones_share_state() {
        let signal = CancellationSignal::new();
        let other = signal.clone();
        other.cancel();
        assert!(signal.is_cancelled());
    }

    #[test]
    fn test_parent_cancels_child() {
        let parent = CancellationToken::new();
        let signal = CancellationSignal::child_of(&parent);
        assert!(!signal.is_cancelled());

        parent.cancel();
        assert!(signal.is_cancelled());
        signal.cancel();
        assert!(signal.is_cancelled());
    }

    #[test]
    fn test_child_does_not_cancel_parent() {
        let parent = CancellationToken::new();
        let signal = CancellationSignal::child_of(&parent);
        signal.cancel();
        assert!(!parent.is_cancelled());
    }

    #[test]
    fn test_drop_guard_cancels() {
        let signal = CancellationSignal::new();
        {
            let _guard = signal.drop_guard();
            assert!(!signal.is_cancelled());
        }
        assert!(signal.is_cancelled());
    }
}
