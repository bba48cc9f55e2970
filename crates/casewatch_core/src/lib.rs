//! Casewatch core: data model, reconciliation and the pure poll-session state machine.
mod effect;
mod membership;
mod model;
mod msg;
mod reconcile;
mod session;
mod timeout;
mod update;
mod view_model;

pub use effect::Effect;
pub use membership::{plan as plan_membership, Member, MembershipPlan};
pub use model::{AnalysisJob, Case, CaseId, CaseStatus, JobId, JobStatus, RiskLevel};
pub use msg::{Msg, Snapshot};
pub use reconcile::reconcile;
pub use session::{PollSession, PollStop, StopReason};
pub use timeout::{has_exceeded_budget, SessionStart, POLL_BUDGET, POLL_INTERVAL};
pub use update::update;
pub use view_model::ViewState;
