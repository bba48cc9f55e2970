#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use casewatch_core::{AnalysisJob, Case, CaseId, CaseStatus, JobId, JobStatus, PollStop, ViewState};
use casewatch_engine::{AnalyzeAccepted, CaseClient, ClientError, FailureKind, PollEvent};
use chrono::{TimeZone, Utc};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::Instant;

pub fn case(id: &str, status: CaseStatus, job_ref: Option<&str>) -> Case {
    Case {
        id: CaseId::new(id),
        status,
        risk_score: if status == CaseStatus::Analyzed { Some(55) } else { None },
        job_ref: job_ref.map(JobId::new),
        created_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
    }
}

pub fn job(id: &str, status: JobStatus, error: Option<&str>) -> AnalysisJob {
    AnalysisJob {
        id: JobId::new(id),
        status,
        error: error.map(ToOwned::to_owned),
    }
}

/// Scripted backend. Each case id replays its responses in order and then
/// keeps answering with the last one.
#[derive(Default)]
pub struct FakeClient {
    cases: Mutex<HashMap<CaseId, Vec<Result<Case, ClientError>>>>,
    jobs: Mutex<HashMap<JobId, AnalysisJob>>,
    list: Mutex<Vec<Case>>,
    delay: Duration,
    case_fetches: AtomicUsize,
    job_fetches: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    fetch_times: Mutex<Vec<(CaseId, Instant)>>,
}

impl FakeClient {
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    pub fn script_case(&self, id: &str, responses: Vec<Case>) {
        self.cases
            .lock()
            .unwrap()
            .insert(CaseId::new(id), responses.into_iter().map(Ok).collect());
    }

    pub fn fail_case(&self, id: &str, status: u16) {
        self.cases.lock().unwrap().insert(
            CaseId::new(id),
            vec![Err(ClientError::new(
                FailureKind::HttpStatus(status),
                format!("status {status}"),
            ))],
        );
    }

    pub fn add_job(&self, job: AnalysisJob) {
        self.jobs.lock().unwrap().insert(job.id.clone(), job);
    }

    pub fn case_fetches(&self) -> usize {
        self.case_fetches.load(Ordering::SeqCst)
    }

    pub fn job_fetches(&self) -> usize {
        self.job_fetches.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn fetch_times(&self, id: &str) -> Vec<Instant> {
        self.fetch_times
            .lock()
            .unwrap()
            .iter()
            .filter(|(case_id, _)| case_id.as_str() == id)
            .map(|(_, at)| *at)
            .collect()
    }

    fn next_case(&self, case_id: &CaseId) -> Result<Case, ClientError> {
        let mut cases = self.cases.lock().unwrap();
        let Some(responses) = cases.get_mut(case_id) else {
            return Err(ClientError::new(FailureKind::HttpStatus(404), "not found"));
        };
        if responses.len() > 1 {
            responses.remove(0)
        } else {
            responses[0].clone()
        }
    }
}

#[async_trait::async_trait]
impl CaseClient for FakeClient {
    async fn fetch_case(&self, _token: &str, case_id: &CaseId) -> Result<Case, ClientError> {
        self.case_fetches.fetch_add(1, Ordering::SeqCst);
        self.fetch_times
            .lock()
            .unwrap()
            .push((case_id.clone(), Instant::now()));
        let now_in_flight = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now_in_flight, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.next_case(case_id)
    }

    async fn fetch_job(&self, _token: &str, job_id: &JobId) -> Result<AnalysisJob, ClientError> {
        self.job_fetches.fetch_add(1, Ordering::SeqCst);
        self.jobs
            .lock()
            .unwrap()
            .get(job_id)
            .cloned()
            .ok_or_else(|| ClientError::new(FailureKind::HttpStatus(404), "job not found"))
    }

    async fn list_cases(&self, _token: &str) -> Result<Vec<Case>, ClientError> {
        Ok(self.list.lock().unwrap().clone())
    }

    async fn trigger_analyze(
        &self,
        _token: &str,
        case_id: &CaseId,
    ) -> Result<AnalyzeAccepted, ClientError> {
        Ok(AnalyzeAccepted {
            job_ref: JobId::new(format!("job-{case_id}")),
        })
    }
}

/// Drains events until the stop report for `case_id`, returning the updates seen on the way.
pub async fn collect_until_stop(
    rx: &mut UnboundedReceiver<PollEvent>,
    case_id: &str,
) -> (Vec<ViewState>, PollStop) {
    let mut updates = Vec::new();
    loop {
        match rx.recv().await.expect("event channel open") {
            PollEvent::Updated { case_id: id, view } if id.as_str() == case_id => {
                updates.push(view)
            }
            PollEvent::Stopped(stop) if stop.case_id.as_str() == case_id => {
                return (updates, stop)
            }
            _ => {}
        }
    }
}
