use std::time::Instant;

use crate::{AnalysisJob, Case};

/// Case and job as observed by one completed fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub case: Case,
    pub job: Option<AnalysisJob>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// Scheduled tick of the session's interval.
    Tick { now: Instant },
    /// The fetch started by the last `Effect::Fetch` resolved.
    Fetched(Snapshot),
    /// The fetch started by the last `Effect::Fetch` failed.
    FetchFailed { error: String },
    /// Caller asked to stop the session.
    Cancel,
}
