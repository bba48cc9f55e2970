use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use casewatch_core::{Case, CaseId, JobId, StopReason, POLL_INTERVAL};
use casewatch_engine::{
    BatchPollCoordinator, CaseClient, ChannelObserver, ClientError, JobStatusPoller, PollEvent,
};
use engine_logging::{engine_info, engine_warn};
use tokio::signal;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::error::AppError;
use crate::render;

type ListFuture<'a> = Pin<Box<dyn Future<Output = Result<Vec<Case>, ClientError>> + Send + 'a>>;

/// Shows one case and, unless it already settled, polls it until it does.
pub async fn watch(
    client: Arc<dyn CaseClient>,
    token: &str,
    case_id: CaseId,
) -> Result<StopReason, AppError> {
    let case = client.fetch_case(token, &case_id).await?;
    print_cases(std::slice::from_ref(&case));
    if case.status.is_terminal() {
        return Ok(StopReason::Completed);
    }
    follow(client, token, case_id, case.job_ref).await
}

/// Triggers a new analysis job, optionally following the case afterwards.
pub async fn analyze(
    client: Arc<dyn CaseClient>,
    token: &str,
    case_id: CaseId,
    watch_after: bool,
) -> Result<StopReason, AppError> {
    let accepted = client.trigger_analyze(token, &case_id).await?;
    println!("{case_id}: analysis queued as job {}", accepted.job_ref);
    engine_info!("Analyze triggered case_id={} job={}", case_id, accepted.job_ref);
    if !watch_after {
        return Ok(StopReason::Completed);
    }
    follow(client, token, case_id, Some(accepted.job_ref)).await
}

/// Lists cases and polls every pending one, refreshing the list while any poller is live.
pub async fn dashboard(client: Arc<dyn CaseClient>, token: &str) -> Result<(), AppError> {
    let cases = client.list_cases(token).await?;
    print_cases(&cases);
    println!("{}", render::summary_line(&cases));

    let (observer, mut rx) = ChannelObserver::new();
    let mut coordinator = BatchPollCoordinator::new(client.clone(), token, Arc::new(observer))?;
    print_lines(render::plan_lines(&coordinator.reconcile_membership(&cases)));
    if !coordinator.is_any_active() {
        println!("No pending cases.");
        return Ok(());
    }

    let mut refresh = time::interval_at(Instant::now() + POLL_INTERVAL, POLL_INTERVAL);
    refresh.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut listing = true;
    let mut pending_list: Option<ListFuture<'_>> = None;

    while coordinator.is_any_active() {
        tokio::select! {
            Some(event) = rx.recv() => print_event(&event),
            listed = next_listing(&mut pending_list) => {
                pending_list = None;
                match listed {
                    Ok(cases) => {
                        print_lines(render::plan_lines(&coordinator.reconcile_membership(&cases)));
                    }
                    Err(err) => {
                        engine_warn!("Case list refresh stopped: {}", err);
                        listing = false;
                    }
                }
            }
            _ = refresh.tick(), if listing && pending_list.is_none() => {
                pending_list = Some(client.list_cases(token));
            }
            _ = signal::ctrl_c() => {
                coordinator.shutdown();
                break;
            }
        }
    }

    coordinator.shutdown();
    while let Ok(event) = rx.try_recv() {
        print_event(&event);
    }
    Ok(())
}

async fn next_listing(slot: &mut Option<ListFuture<'_>>) -> Result<Vec<Case>, ClientError> {
    match slot.as_mut() {
        Some(fetch) => fetch.await,
        None => std::future::pending().await,
    }
}

async fn follow(
    client: Arc<dyn CaseClient>,
    token: &str,
    case_id: CaseId,
    job_ref: Option<JobId>,
) -> Result<StopReason, AppError> {
    let poller = JobStatusPoller::new(client);
    let (observer, mut rx) = ChannelObserver::new();
    poller.start_seeded(case_id.clone(), job_ref, token, Arc::new(observer))?;

    loop {
        tokio::select! {
            event = rx.recv() => match event {
                Some(PollEvent::Stopped(stop)) => {
                    println!("{}", render::stop_line(&stop));
                    return Ok(stop.reason);
                }
                Some(event) => print_event(&event),
                None => return Ok(StopReason::Cancelled),
            },
            _ = signal::ctrl_c() => poller.cancel(&case_id),
        }
    }
}

fn print_cases(cases: &[Case]) {
    println!("{}", render::case_header());
    for case in cases {
        println!("{}", render::case_row(case));
    }
}

fn print_event(event: &PollEvent) {
    match event {
        PollEvent::Updated { case_id, view } => println!("{}", render::view_line(case_id, view)),
        PollEvent::Stopped(stop) => println!("{}", render::stop_line(stop)),
    }
}

fn print_lines(lines: Vec<String>) {
    for line in lines {
        println!("{line}");
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use super::*;
    use casewatch_core::{AnalysisJob, CaseStatus, JobStatus};
    use casewatch_engine::{AnalyzeAccepted, FailureKind};
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;

    fn case(status: CaseStatus, job_ref: Option<&str>) -> Case {
        Case {
            id: CaseId::new("c1"),
            status,
            risk_score: if status == CaseStatus::Analyzed { Some(64) } else { None },
            job_ref: job_ref.map(JobId::new),
            created_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
        }
    }

    /// Replays case responses in order, repeating the last one.
    #[derive(Default)]
    struct ScriptedClient {
        responses: Mutex<VecDeque<Result<Case, ClientError>>>,
        list: Vec<Case>,
        case_fetches: AtomicUsize,
    }

    impl ScriptedClient {
        fn new(responses: Vec<Result<Case, ClientError>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                ..Self::default()
            }
        }

        fn case_fetches(&self) -> usize {
            self.case_fetches.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl CaseClient for ScriptedClient {
        async fn fetch_case(&self, _token: &str, _case_id: &CaseId) -> Result<Case, ClientError> {
            self.case_fetches.fetch_add(1, Ordering::SeqCst);
            let mut responses = self.responses.lock().unwrap();
            if responses.len() > 1 {
                responses.pop_front().unwrap()
            } else {
                responses.front().cloned().unwrap()
            }
        }

        async fn fetch_job(&self, _token: &str, job_id: &JobId) -> Result<AnalysisJob, ClientError> {
            Ok(AnalysisJob {
                id: job_id.clone(),
                status: JobStatus::Running,
                error: None,
            })
        }

        async fn list_cases(&self, _token: &str) -> Result<Vec<Case>, ClientError> {
            Ok(self.list.clone())
        }

        async fn trigger_analyze(
            &self,
            _token: &str,
            _case_id: &CaseId,
        ) -> Result<AnalyzeAccepted, ClientError> {
            Ok(AnalyzeAccepted {
                job_ref: JobId::new("j9"),
            })
        }
    }

    #[tokio::test(start_paused = true)]
    async fn follow_returns_completed_once_case_settles() {
        let client = Arc::new(ScriptedClient::new(vec![
            Ok(case(CaseStatus::Processing, Some("j1"))),
            Ok(case(CaseStatus::Analyzed, Some("j1"))),
        ]));

        let reason = follow(client.clone(), "token", CaseId::new("c1"), Some(JobId::new("j1")))
            .await
            .unwrap();

        assert_eq!(reason, StopReason::Completed);
        assert_eq!(render::exit_code_for(reason), 0);
        assert_eq!(client.case_fetches(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn follow_reports_fetch_error_with_failing_exit_code() {
        let client = Arc::new(ScriptedClient::new(vec![Err(ClientError::new(
            FailureKind::HttpStatus(503),
            "unavailable",
        ))]));

        let reason = follow(client, "token", CaseId::new("c1"), None).await.unwrap();

        assert_eq!(reason, StopReason::Error);
        assert_eq!(render::exit_code_for(reason), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn watch_does_not_poll_a_settled_case() {
        let client = Arc::new(ScriptedClient::new(vec![Ok(case(
            CaseStatus::Failed,
            Some("j1"),
        ))]));

        let reason = watch(client.clone(), "token", CaseId::new("c1")).await.unwrap();

        assert_eq!(reason, StopReason::Completed);
        assert_eq!(client.case_fetches(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn analyze_with_watch_follows_the_new_job() {
        let client = Arc::new(ScriptedClient::new(vec![
            Ok(case(CaseStatus::Processing, Some("j9"))),
            Ok(case(CaseStatus::Analyzed, Some("j9"))),
        ]));

        let reason = analyze(client.clone(), "token", CaseId::new("c1"), true)
            .await
            .unwrap();

        assert_eq!(reason, StopReason::Completed);
        assert_eq!(client.case_fetches(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn dashboard_returns_once_every_pending_case_settles() {
        let client = Arc::new(ScriptedClient {
            list: vec![case(CaseStatus::Processing, None)],
            ..ScriptedClient::new(vec![
                Ok(case(CaseStatus::Processing, None)),
                Ok(case(CaseStatus::Analyzed, None)),
            ])
        });

        dashboard(client.clone(), "token").await.unwrap();

        assert_eq!(client.case_fetches(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn dashboard_without_pending_cases_polls_nothing() {
        let client = Arc::new(ScriptedClient {
            list: vec![case(CaseStatus::Analyzed, None)],
            ..ScriptedClient::default()
        });

        dashboard(client.clone(), "token").await.unwrap();

        assert_eq!(client.case_fetches(), 0);
    }
}
