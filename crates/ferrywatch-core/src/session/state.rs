use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

// ── SessionState ─────────────────────────────────────────────────────

/// Connection state observable by consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Closed,
    /// `attempt` counts consecutive failures since the last open.
    Connecting { attempt: u32 },
    Open,
}

impl SessionState {
    pub fn is_open(self) -> bool {
        matches!(self, Self::Open)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Closed => f.write_str("closed"),
            Self::Connecting { attempt: 0 } => f.write_str("connecting"),
            Self::Connecting { attempt } => write!(f, "reconnecting (attempt {attempt})"),
            Self::Open => f.write_str("open"),
        }
    }
}

// ── Stats ────────────────────────────────────────────────────────────

/// Point-in-time snapshot of a session's counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SessionStats {
    pub frames_received: u64,
    pub notifications_dispatched: u64,
    /// Frames that failed to decode or fell outside the scope.
    pub frames_dropped: u64,
    pub keys_invalidated: u64,
    pub invalidate_failures: u64,
    pub reconnects: u64,
}

#[derive(Debug, Default)]
pub(crate) struct Counters {
    pub frames_received: AtomicU64,
    pub notifications_dispatched: AtomicU64,
    pub frames_dropped: AtomicU64,
    pub keys_invalidated: AtomicU64,
    pub invalidate_failures: AtomicU64,
    pub reconnects: AtomicU64,
}

impl Counters {
    pub fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> SessionStats {
        SessionStats {
            frames_received: self.frames_received.load(Ordering::Relaxed),
            notifications_dispatched: self.notifications_dispatched.load(Ordering::Relaxed),
            frames_dropped: self.frames_dropped.load(Ordering::Relaxed),
            keys_invalidated: self.keys_invalidated.load(Ordering::Relaxed),
            invalidate_failures: self.invalidate_failures.load(Ordering::Relaxed),
            reconnects: self.reconnects.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_attempts() {
        assert_eq!(SessionState::Closed.to_string(), "closed");
        assert_eq!(SessionState::Connecting { attempt: 0 }.to_string(), "connecting");
        assert_eq!(
            SessionState::Connecting { attempt: 3 }.to_string(),
            "reconnecting (attempt 3)"
        );
        assert!(SessionState::Open.is_open());
        assert!(!SessionState::default().is_open());
    }

    #[test]
    fn snapshot_reads_counters() {
        let counters = Counters::default();
        Counters::bump(&counters.frames_received);
        Counters::bump(&counters.frames_received);
        Counters::bump(&counters.keys_invalidated);

        let stats = counters.snapshot();
        assert_eq!(stats.frames_received, 2);
        assert_eq!(stats.keys_invalidated, 1);
        assert_eq!(stats.reconnects, 0);
    }
}
