use std::time::{Duration, Instant};

use crate::PollSession;

/// Wall-clock budget of one poll session.
pub const POLL_BUDGET: Duration = Duration::from_millis(120_000);

/// Fixed spacing between two ticks of one poll session.
pub const POLL_INTERVAL: Duration = Duration::from_millis(2_000);

/// Anything that remembers when its poll session began.
pub trait SessionStart {
    fn started_at(&self) -> Instant;
}

impl SessionStart for PollSession {
    fn started_at(&self) -> Instant {
        PollSession::started_at(self)
    }
}

/// True once `budget` has elapsed since the session started.
pub fn has_exceeded_budget(session: &impl SessionStart, budget: Duration, now: Instant) -> bool {
    now.saturating_duration_since(session.started_at()) >= budget
}
