use std::fmt;
use std::time::Instant;

use crate::{CaseId, JobId, ViewState};

/// Why a poll session ended. Distinct from the case's own business status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StopReason {
    Completed,
    TimedOut,
    Error,
    Cancelled,
}

impl StopReason {
    pub fn label(self) -> &'static str {
        match self {
            StopReason::Completed => "completed",
            StopReason::TimedOut => "timed-out",
            StopReason::Error => "error",
            StopReason::Cancelled => "cancelled",
        }
    }

    /// True when the session ended without the caller asking and before the case settled.
    pub fn is_self_inflicted(self) -> bool {
        matches!(self, StopReason::TimedOut | StopReason::Error)
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Final report of a poll session, handed to `on_stop` exactly once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollStop {
    pub case_id: CaseId,
    pub reason: StopReason,
    /// Last successfully reconciled state, flagged when the budget ran out.
    pub last_view: Option<ViewState>,
    /// Job reference the session was following when it stopped.
    pub job_ref: Option<JobId>,
    pub error: Option<String>,
}

/// Bookkeeping for one entity's active polling attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollSession {
    case_id: CaseId,
    started_at: Instant,
    in_flight: bool,
    stopped: Option<StopReason>,
    job_ref: Option<JobId>,
    last_view: Option<ViewState>,
}

impl PollSession {
    pub fn new(case_id: CaseId, started_at: Instant) -> Self {
        Self {
            case_id,
            started_at,
            in_flight: false,
            stopped: None,
            job_ref: None,
            last_view: None,
        }
    }

    /// Seeds the job reference so the first tick can fetch case and job together.
    pub fn with_job_ref(mut self, job_ref: Option<JobId>) -> Self {
        self.job_ref = job_ref;
        self
    }

    pub fn case_id(&self) -> &CaseId {
        &self.case_id
    }

    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    pub fn in_flight(&self) -> bool {
        self.in_flight
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.is_some()
    }

    pub fn stop_reason(&self) -> Option<StopReason> {
        self.stopped
    }

    pub fn job_ref(&self) -> Option<&JobId> {
        self.job_ref.as_ref()
    }

    pub fn last_view(&self) -> Option<&ViewState> {
        self.last_view.as_ref()
    }

    pub(crate) fn begin_fetch(&mut self) {
        self.in_flight = true;
    }

    pub(crate) fn end_fetch(&mut self) {
        self.in_flight = false;
    }

    pub(crate) fn remember(&mut self, job_ref: Option<JobId>, view: ViewState) {
        self.job_ref = job_ref;
        self.last_view = Some(view);
    }

    pub(crate) fn stop(&mut self, reason: StopReason, error: Option<String>) -> PollStop {
        self.stopped = Some(reason);
        self.in_flight = false;
        let last_view = self.last_view.clone().map(|view| match reason {
            StopReason::TimedOut => view.timed_out(),
            StopReason::Error => view.settled(),
            StopReason::Completed | StopReason::Cancelled => view,
        });
        PollStop {
            case_id: self.case_id.clone(),
            reason,
            last_view,
            job_ref: self.job_ref.clone(),
            error,
        }
    }
}
