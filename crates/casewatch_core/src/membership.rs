use std::collections::{BTreeMap, BTreeSet};

use crate::{Case, CaseId, JobId};

/// What a coordinator remembers about a case it has polled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    /// Job reference the poller was seeded with, replaced by the one it
    /// was following once it stops.
    pub job_ref: Option<JobId>,
    /// False once the poller stopped on its own (timeout or fetch error).
    pub active: bool,
}

/// Poller lifecycle changes needed to match the latest case list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MembershipPlan {
    pub start: Vec<(CaseId, Option<JobId>)>,
    /// Ids to cancel (if still running) and forget.
    pub release: Vec<CaseId>,
}

impl MembershipPlan {
    pub fn is_empty(&self) -> bool {
        self.start.is_empty() && self.release.is_empty()
    }
}

/// Diffs the tracked members against the non-terminal cases of `cases`.
///
/// Running members are left alone so their budget is preserved. A retired
/// member (stopped on its own while still non-terminal) is only started again
/// once its case carries a different job reference.
pub fn plan(members: &BTreeMap<CaseId, Member>, cases: &[Case]) -> MembershipPlan {
    let mut plan = MembershipPlan::default();
    let mut wanted = BTreeSet::new();

    for case in cases.iter().filter(|case| !case.status.is_terminal()) {
        if !wanted.insert(case.id.clone()) {
            continue;
        }
        let rearm = match members.get(&case.id) {
            None => true,
            Some(member) if member.active => false,
            Some(member) => member.job_ref != case.job_ref,
        };
        if rearm {
            plan.start.push((case.id.clone(), case.job_ref.clone()));
        }
    }

    plan.release = members
        .keys()
        .filter(|id| !wanted.contains(*id))
        .cloned()
        .collect();
    plan
}
