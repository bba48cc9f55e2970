use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use casewatch_core::{
    update, CaseId, Effect, JobId, Msg, PollSession, PollStop, SessionStart, Snapshot, StopReason,
    POLL_INTERVAL,
};
use engine_logging::{engine_debug, engine_info, engine_trace, engine_warn};
use futures_util::future::BoxFuture;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::{CaseClient, ClientError, PollObserver, PollerError};

type Registry = Arc<Mutex<HashMap<CaseId, SessionEntry>>>;
type FetchFuture = BoxFuture<'static, Result<Snapshot, ClientError>>;

/// Identity of a running poll session, as returned by [`JobStatusPoller::start`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInfo {
    pub case_id: CaseId,
    pub started_at: std::time::Instant,
    pub generation: u64,
}

impl SessionStart for SessionInfo {
    fn started_at(&self) -> std::time::Instant {
        self.started_at
    }
}

struct SessionEntry {
    info: SessionInfo,
    cancel: CancellationToken,
    _task: JoinHandle<()>,
}

/// Polls individual cases until they turn terminal, time out, fail or get cancelled.
///
/// Every session runs on its own tokio task, so `start` must be called from
/// within a runtime. Dropping the poller cancels all of its sessions.
pub struct JobStatusPoller {
    client: Arc<dyn CaseClient>,
    registry: Registry,
    next_generation: AtomicU64,
}

impl JobStatusPoller {
    pub fn new(client: Arc<dyn CaseClient>) -> Self {
        Self {
            client,
            registry: Arc::new(Mutex::new(HashMap::new())),
            next_generation: AtomicU64::new(1),
        }
    }

    /// Starts polling `case_id`, or returns the running session for it.
    pub fn start(
        &self,
        case_id: CaseId,
        token: &str,
        observer: Arc<dyn PollObserver>,
    ) -> Result<SessionInfo, PollerError> {
        self.start_seeded(case_id, None, token, observer)
    }

    /// Like [`start`](Self::start), seeding the job reference already known
    /// from a list so the first tick fetches case and job together.
    pub fn start_seeded(
        &self,
        case_id: CaseId,
        job_ref: Option<JobId>,
        token: &str,
        observer: Arc<dyn PollObserver>,
    ) -> Result<SessionInfo, PollerError> {
        if case_id.is_empty() {
            return Err(PollerError::InvalidStart("case id must not be empty"));
        }
        if token.trim().is_empty() {
            return Err(PollerError::InvalidStart("token must not be empty"));
        }

        let mut registry = lock(&self.registry);
        if let Some(entry) = registry.get(&case_id) {
            engine_trace!("Poll session for case {} already running", case_id);
            return Ok(entry.info.clone());
        }

        let started_at = Instant::now();
        let info = SessionInfo {
            case_id: case_id.clone(),
            started_at: started_at.into_std(),
            generation: self.next_generation.fetch_add(1, Ordering::Relaxed),
        };
        let cancel = CancellationToken::new();
        let task = SessionTask {
            session: PollSession::new(case_id.clone(), info.started_at).with_job_ref(job_ref),
            started_at,
            generation: info.generation,
            client: self.client.clone(),
            token: Arc::from(token),
            observer,
            cancel: cancel.clone(),
            registry: self.registry.clone(),
        };

        engine_info!(
            "Poll session started case_id={} generation={}",
            case_id,
            info.generation
        );
        let handle = tokio::spawn(task.run());
        registry.insert(
            case_id,
            SessionEntry {
                info: info.clone(),
                cancel,
                _task: handle,
            },
        );
        Ok(info)
    }

    /// Stops the session for `case_id`. No-op when none is running.
    pub fn cancel(&self, case_id: &CaseId) {
        let entry = lock(&self.registry).remove(case_id);
        if let Some(entry) = entry {
            engine_debug!("Cancelling poll session for case {}", case_id);
            entry.cancel.cancel();
        }
    }

    pub fn cancel_all(&self) {
        let entries: Vec<SessionEntry> = lock(&self.registry).drain().map(|(_, e)| e).collect();
        for entry in entries {
            entry.cancel.cancel();
        }
    }

    pub fn is_active(&self, case_id: &CaseId) -> bool {
        lock(&self.registry).contains_key(case_id)
    }

    pub fn session(&self, case_id: &CaseId) -> Option<SessionInfo> {
        lock(&self.registry).get(case_id).map(|entry| entry.info.clone())
    }

    pub fn active_sessions(&self) -> Vec<SessionInfo> {
        let mut sessions: Vec<SessionInfo> = lock(&self.registry)
            .values()
            .map(|entry| entry.info.clone())
            .collect();
        sessions.sort_by(|a, b| a.case_id.cmp(&b.case_id));
        sessions
    }
}

impl Drop for JobStatusPoller {
    fn drop(&mut self) {
        self.cancel_all();
    }
}

struct SessionTask {
    session: PollSession,
    started_at: Instant,
    generation: u64,
    client: Arc<dyn CaseClient>,
    token: Arc<str>,
    observer: Arc<dyn PollObserver>,
    cancel: CancellationToken,
    registry: Registry,
}

impl SessionTask {
    async fn run(self) {
        let SessionTask {
            mut session,
            started_at,
            generation,
            client,
            token,
            observer,
            cancel,
            registry,
        } = self;
        let case_id = session.case_id().clone();

        let mut interval = time::interval_at(started_at + POLL_INTERVAL, POLL_INTERVAL);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut in_flight: Option<FetchFuture> = None;

        let stop = loop {
            let msg = tokio::select! {
                biased;
                _ = cancel.cancelled() => Msg::Cancel,
                outcome = next_outcome(&mut in_flight) => {
                    in_flight = None;
                    match outcome {
                        Ok(snapshot) => Msg::Fetched(snapshot),
                        Err(err) => Msg::FetchFailed { error: err.to_string() },
                    }
                }
                _ = interval.tick() => Msg::Tick { now: Instant::now().into_std() },
            };

            let is_tick = matches!(msg, Msg::Tick { .. });
            let (next, effects) = update(session, msg);
            session = next;
            if is_tick && effects.is_empty() {
                engine_trace!("Tick skipped for case {}: fetch still in flight", case_id);
            }

            let mut stop = None;
            for effect in effects {
                match effect {
                    Effect::Fetch {
                        case_id: target,
                        job_ref,
                    } => {
                        engine_debug!("Fetching case {} (job {:?})", target, job_ref);
                        in_flight = Some(Box::pin(fetch_snapshot(
                            client.clone(),
                            token.clone(),
                            target,
                            job_ref,
                        )));
                    }
                    Effect::Emit(view) => {
                        if cancel.is_cancelled() {
                            engine_trace!("Dropping update for cancelled case {}", case_id);
                        } else {
                            observer.on_update(&case_id, &view);
                        }
                    }
                    Effect::Stop(report) => stop = Some(report),
                }
            }
            if let Some(stop) = stop {
                break stop;
            }
        };

        release(&registry, &case_id, generation);
        log_stop(&stop);
        observer.on_stop(&stop);
    }
}

async fn next_outcome(slot: &mut Option<FetchFuture>) -> Result<Snapshot, ClientError> {
    match slot.as_mut() {
        Some(fetch) => fetch.await,
        None => std::future::pending().await,
    }
}

/// Fetches the case and, concurrently, the job it pointed at last time.
///
/// When the case now names a different job (a new analyze trigger), that job
/// is fetched before returning so the snapshot is consistent.
async fn fetch_snapshot(
    client: Arc<dyn CaseClient>,
    token: Arc<str>,
    case_id: CaseId,
    known_job: Option<JobId>,
) -> Result<Snapshot, ClientError> {
    let (case, job) = match &known_job {
        Some(job_id) => {
            let (case, job) = tokio::try_join!(
                client.fetch_case(&token, &case_id),
                client.fetch_job(&token, job_id)
            )?;
            (case, Some(job))
        }
        None => (client.fetch_case(&token, &case_id).await?, None),
    };

    let job = match (&case.job_ref, job) {
        (Some(current), Some(job)) if &job.id == current => Some(job),
        (Some(current), _) if !case.status.is_terminal() => {
            Some(client.fetch_job(&token, current).await?)
        }
        _ => None,
    };

    Ok(Snapshot { case, job })
}

fn release(registry: &Registry, case_id: &CaseId, generation: u64) {
    let mut registry = lock(registry);
    if registry
        .get(case_id)
        .is_some_and(|entry| entry.info.generation == generation)
    {
        registry.remove(case_id);
    }
}

fn log_stop(stop: &PollStop) {
    match stop.reason {
        StopReason::Completed | StopReason::Cancelled => {
            engine_info!("Poll session for case {} ended: {}", stop.case_id, stop.reason);
        }
        StopReason::TimedOut => {
            engine_warn!(
                "Poll session for case {} timed out; auto-refresh paused",
                stop.case_id
            );
        }
        StopReason::Error => {
            engine_warn!(
                "Poll session for case {} stopped on fetch error: {}",
                stop.case_id,
                stop.error.as_deref().unwrap_or("unknown")
            );
        }
    }
}

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
