use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use casewatch_core::{
    has_exceeded_budget, plan_membership, Case, CaseId, JobId, Member, MembershipPlan, PollStop,
    StopReason, ViewState, POLL_BUDGET,
};
use engine_logging::{engine_debug, engine_warn};
use tokio::time::Instant;

use crate::poller::lock;
use crate::{CaseClient, JobStatusPoller, PollObserver, PollerError};

/// Job reference each member session followed when it stopped on its own.
type Finished = Arc<Mutex<HashMap<CaseId, Option<JobId>>>>;

/// Keeps one poll session running per non-terminal case of the last list seen.
///
/// The coordinator owns no refresh timer of its own: the list view re-fetches
/// the case list while [`is_any_active`](Self::is_any_active) holds and hands
/// each result to [`reconcile_membership`](Self::reconcile_membership).
pub struct BatchPollCoordinator {
    poller: JobStatusPoller,
    token: String,
    observer: Arc<dyn PollObserver>,
    finished: Finished,
    members: BTreeMap<CaseId, Member>,
}

impl BatchPollCoordinator {
    pub fn new(
        client: Arc<dyn CaseClient>,
        token: impl Into<String>,
        observer: Arc<dyn PollObserver>,
    ) -> Result<Self, PollerError> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(PollerError::InvalidStart("token must not be empty"));
        }
        let finished = Finished::default();
        Ok(Self {
            poller: JobStatusPoller::new(client),
            token,
            observer: Arc::new(MemberObserver {
                inner: observer,
                finished: finished.clone(),
            }),
            finished,
            members: BTreeMap::new(),
        })
    }

    /// Starts and cancels member sessions so they match the non-terminal cases of `cases`.
    ///
    /// Returns the changes that were applied.
    pub fn reconcile_membership(&mut self, cases: &[Case]) -> MembershipPlan {
        self.sync_members();

        let plan = plan_membership(&self.members, cases);
        for case_id in &plan.release {
            self.poller.cancel(case_id);
            self.members.remove(case_id);
            lock(&self.finished).remove(case_id);
        }
        for (case_id, job_ref) in &plan.start {
            match self.poller.start_seeded(
                case_id.clone(),
                job_ref.clone(),
                &self.token,
                self.observer.clone(),
            ) {
                Ok(_) => {
                    self.members.insert(
                        case_id.clone(),
                        Member {
                            job_ref: job_ref.clone(),
                            active: true,
                        },
                    );
                }
                Err(err) => engine_warn!("Skipping case {:?}: {}", case_id, err),
            }
        }

        if !plan.is_empty() {
            engine_debug!(
                "Membership reconciled: started={} released={} tracked={}",
                plan.start.len(),
                plan.release.len(),
                self.members.len()
            );
        }
        plan
    }

    /// Retires members whose session reported its stop, remembering the job
    /// reference it followed. A session that is gone but has not reported yet
    /// stays active until the report arrives.
    fn sync_members(&mut self) {
        let mut finished = lock(&self.finished);
        for (case_id, member) in self.members.iter_mut() {
            if self.poller.is_active(case_id) {
                continue;
            }
            if let Some(job_ref) = finished.remove(case_id) {
                member.active = false;
                member.job_ref = job_ref;
            }
        }
    }

    /// True while at least one member session is still polling within its budget.
    pub fn is_any_active(&self) -> bool {
        let now = Instant::now().into_std();
        self.poller
            .active_sessions()
            .iter()
            .any(|session| !has_exceeded_budget(session, POLL_BUDGET, now))
    }

    /// Ids with a running member session.
    pub fn active_ids(&self) -> Vec<CaseId> {
        self.poller
            .active_sessions()
            .into_iter()
            .map(|session| session.case_id)
            .collect()
    }

    /// Cancels every member session.
    pub fn shutdown(&mut self) {
        self.poller.cancel_all();
        self.members.clear();
        lock(&self.finished).clear();
    }
}

struct MemberObserver {
    inner: Arc<dyn PollObserver>,
    finished: Finished,
}

impl PollObserver for MemberObserver {
    fn on_update(&self, case_id: &CaseId, view: &ViewState) {
        self.inner.on_update(case_id, view);
    }

    fn on_stop(&self, stop: &PollStop) {
        if stop.reason != StopReason::Cancelled {
            lock(&self.finished).insert(stop.case_id.clone(), stop.job_ref.clone());
        }
        self.inner.on_stop(stop);
    }
}
