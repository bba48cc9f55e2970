use crate::{CaseId, JobId, PollStop, ViewState};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Fetch the case, and the job when a reference is already known.
    Fetch {
        case_id: CaseId,
        job_ref: Option<JobId>,
    },
    /// Hand a freshly reconciled state to `on_update`.
    Emit(ViewState),
    /// Hand the final report to `on_stop`.
    Stop(PollStop),
}
