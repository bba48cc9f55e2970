use std::fmt;

use casewatch_core::{CaseId, JobId, PollStop, ViewState};
use serde::Deserialize;
use thiserror::Error;

/// Events forwarded by [`crate::ChannelObserver`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollEvent {
    Updated { case_id: CaseId, view: ViewState },
    Stopped(PollStop),
}

/// Response of `POST /cases/{id}/analyze`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeAccepted {
    #[serde(alias = "job_ref", alias = "job_id")]
    pub job_ref: JobId,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct ClientError {
    pub kind: FailureKind,
    pub message: String,
}

impl ClientError {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    HttpStatus(u16),
    Timeout,
    TooLarge { max_bytes: u64, actual: Option<u64> },
    Decode,
    Network,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::TooLarge { max_bytes, actual } => {
                write!(f, "response too large (max {max_bytes}, actual {actual:?})")
            }
            FailureKind::Decode => write!(f, "malformed response body"),
            FailureKind::Network => write!(f, "network error"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PollerError {
    #[error("invalid start: {0}")]
    InvalidStart(&'static str),
}
