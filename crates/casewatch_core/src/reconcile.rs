use crate::{AnalysisJob, Case, CaseStatus, JobStatus, RiskLevel, ViewState};

const MAX_RISK_SCORE: u8 = 100;

/// Merges a case and its (possibly missing) analysis job into one view state.
///
/// A terminal case wins over whatever the job reports; until then the job
/// status drives the message. `is_timed_out` is always false here, the poller
/// layers it on from its stop reason.
pub fn reconcile(case: &Case, job: Option<&AnalysisJob>) -> ViewState {
    if case.status.is_terminal() {
        return from_terminal_case(case);
    }

    let message = match job {
        Some(job) if job.status == JobStatus::Failed => job
            .error
            .as_deref()
            .map(str::trim)
            .filter(|error| !error.is_empty())
            .map(ToOwned::to_owned)
            .unwrap_or_else(|| "Analysis job failed".to_string()),
        Some(job) if job.status == JobStatus::Completed => {
            "Job: completed, waiting for case update".to_string()
        }
        Some(job) => format!("Job: {}", job.status),
        None if case.status == CaseStatus::Uploaded && case.job_ref.is_none() => {
            "Awaiting analysis".to_string()
        }
        None => "Processing…".to_string(),
    };

    ViewState {
        display_status: case.status,
        message,
        risk_score: None,
        risk_level: None,
        is_updating: true,
        is_timed_out: false,
    }
}

fn from_terminal_case(case: &Case) -> ViewState {
    let (message, risk_score) = match case.status {
        CaseStatus::Analyzed => match case.risk_score.map(|s| s.min(MAX_RISK_SCORE)) {
            Some(score) => (
                format!(
                    "Risk score {score}/100 ({})",
                    RiskLevel::from_score(score).label()
                ),
                Some(score),
            ),
            None => ("Analysis complete".to_string(), None),
        },
        _ => ("Analysis failed".to_string(), None),
    };

    ViewState {
        display_status: case.status,
        message,
        risk_score,
        risk_level: risk_score.map(RiskLevel::from_score),
        is_updating: false,
        is_timed_out: false,
    }
}
