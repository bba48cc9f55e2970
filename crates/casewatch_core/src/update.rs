use crate::{
    has_exceeded_budget, reconcile, Effect, Msg, PollSession, Snapshot, StopReason, POLL_BUDGET,
};

/// Pure update function: applies a message to a poll session and returns any effects.
///
/// Once the session is stopped every message is ignored, so a fetch that
/// resolves after cancellation never produces an `Effect::Emit`.
pub fn update(mut session: PollSession, msg: Msg) -> (PollSession, Vec<Effect>) {
    if session.is_stopped() {
        return (session, Vec::new());
    }

    let effects = match msg {
        Msg::Tick { now } => {
            if session.in_flight() {
                // Skip rather than queue; the pending fetch is still the newest knowledge.
                return (session, Vec::new());
            }
            if has_exceeded_budget(&session, POLL_BUDGET, now) {
                vec![Effect::Stop(session.stop(StopReason::TimedOut, None))]
            } else {
                session.begin_fetch();
                vec![Effect::Fetch {
                    case_id: session.case_id().clone(),
                    job_ref: session.job_ref().cloned(),
                }]
            }
        }
        Msg::Fetched(snapshot) => {
            session.end_fetch();
            apply_snapshot(&mut session, snapshot)
        }
        Msg::FetchFailed { error } => {
            vec![Effect::Stop(session.stop(StopReason::Error, Some(error)))]
        }
        Msg::Cancel => vec![Effect::Stop(session.stop(StopReason::Cancelled, None))],
    };

    (session, effects)
}

fn apply_snapshot(session: &mut PollSession, snapshot: Snapshot) -> Vec<Effect> {
    let Snapshot { case, job } = snapshot;
    // A job fetched for an older reference says nothing about the current run.
    let job = job.filter(|job| case.job_ref.as_ref() == Some(&job.id));
    let view = reconcile(&case, job.as_ref());
    session.remember(case.job_ref.clone(), view.clone());

    let mut effects = vec![Effect::Emit(view)];
    // The case record decides termination; a completed job alone keeps polling.
    if case.status.is_terminal() {
        effects.push(Effect::Stop(session.stop(StopReason::Completed, None)));
    }
    effects
}
