use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opaque identifier of a case, stable for the case's lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CaseId(String);

impl CaseId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for CaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CaseId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Opaque identifier of one analysis job execution.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for JobId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaseStatus {
    Uploaded,
    Processing,
    Analyzed,
    Failed,
}

impl CaseStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, CaseStatus::Analyzed | CaseStatus::Failed)
    }

    pub fn label(self) -> &'static str {
        match self {
            CaseStatus::Uploaded => "uploaded",
            CaseStatus::Processing => "processing",
            CaseStatus::Analyzed => "analyzed",
            CaseStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for CaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    pub fn label(self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One uploaded document under review, as returned by `GET /cases/{id}`.
///
/// Decodes both the documented camelCase shape and the backend's native
/// row, which uses snake_case names and keeps the job id under
/// `signals.analysis_job_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "CaseRow")]
pub struct Case {
    pub id: CaseId,
    pub status: CaseStatus,
    pub risk_score: Option<u8>,
    pub job_ref: Option<JobId>,
    pub created_at: DateTime<Utc>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CaseRow {
    #[serde(alias = "case_id")]
    id: CaseId,
    status: CaseStatus,
    #[serde(default, alias = "risk_score")]
    risk_score: Option<u8>,
    #[serde(default, alias = "job_ref")]
    job_ref: Option<JobId>,
    #[serde(default)]
    signals: Option<CaseSignals>,
    #[serde(alias = "created_at")]
    created_at: DateTime<Utc>,
}

#[derive(Deserialize)]
struct CaseSignals {
    #[serde(default)]
    analysis_job_id: Option<JobId>,
}

impl From<CaseRow> for Case {
    fn from(row: CaseRow) -> Self {
        let job_ref = row
            .job_ref
            .or_else(|| row.signals.and_then(|signals| signals.analysis_job_id));
        Self {
            id: row.id,
            status: row.status,
            risk_score: row.risk_score,
            job_ref,
            created_at: row.created_at,
        }
    }
}

/// One asynchronous execution of the analysis pipeline, owned by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisJob {
    pub id: JobId,
    pub status: JobStatus,
    #[serde(default)]
    pub error: Option<String>,
}

/// Risk bands used when presenting an analyzed case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub fn from_score(score: u8) -> Self {
        match score {
            70..=u8::MAX => RiskLevel::Critical,
            50..=69 => RiskLevel::High,
            30..=49 => RiskLevel::Medium,
            _ => RiskLevel::Low,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            RiskLevel::Low => "Low",
            RiskLevel::Medium => "Medium",
            RiskLevel::High => "High",
            RiskLevel::Critical => "Critical",
        }
    }
}
