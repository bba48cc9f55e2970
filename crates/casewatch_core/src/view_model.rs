use crate::{CaseStatus, RiskLevel};

/// Display-ready verdict for one case, derived from the latest poll and never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewState {
    pub display_status: CaseStatus,
    pub message: String,
    pub risk_score: Option<u8>,
    pub risk_level: Option<RiskLevel>,
    pub is_updating: bool,
    pub is_timed_out: bool,
}

impl ViewState {
    /// Marks the state as the last known status of a session that ran out of budget.
    pub fn timed_out(mut self) -> Self {
        self.is_timed_out = true;
        self.is_updating = false;
        self
    }

    /// Marks the state as no longer refreshing without flagging a timeout.
    pub fn settled(mut self) -> Self {
        self.is_updating = false;
        self
    }

    /// Short suffix shown next to the status badge.
    pub fn refresh_hint(&self) -> Option<&'static str> {
        if self.is_timed_out {
            Some("Auto-refresh paused")
        } else if self.is_updating {
            Some("Updating…")
        } else {
            None
        }
    }
}
