use std::time::Duration;

use casewatch_core::{AnalysisJob, Case, CaseId, JobId};
use futures_util::StreamExt;
use reqwest::Url;
use serde::de::DeserializeOwned;

use crate::{AnalyzeAccepted, ClientError, FailureKind};

#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub base_url: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub max_bytes: u64,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000/".to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            max_bytes: 2 * 1024 * 1024,
        }
    }
}

/// Thin request functions for the case and job resources. No retry or state logic.
#[async_trait::async_trait]
pub trait CaseClient: Send + Sync {
    async fn fetch_case(&self, token: &str, case_id: &CaseId) -> Result<Case, ClientError>;

    async fn fetch_job(&self, token: &str, job_id: &JobId) -> Result<AnalysisJob, ClientError>;

    async fn list_cases(&self, token: &str) -> Result<Vec<Case>, ClientError>;

    async fn trigger_analyze(
        &self,
        token: &str,
        case_id: &CaseId,
    ) -> Result<AnalyzeAccepted, ClientError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestCaseClient {
    settings: ClientSettings,
    base: Url,
    client: reqwest::Client,
}

impl ReqwestCaseClient {
    pub fn new(settings: ClientSettings) -> Result<Self, ClientError> {
        let base = Url::parse(&settings.base_url)
            .map_err(|err| ClientError::new(FailureKind::InvalidUrl, err.to_string()))?;
        if base.cannot_be_a_base() {
            return Err(ClientError::new(
                FailureKind::InvalidUrl,
                format!("{base} cannot be used as a base url"),
            ));
        }

        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| ClientError::new(FailureKind::Network, err.to_string()))?;

        Ok(Self {
            settings,
            base,
            client,
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        // `new` rejects cannot-be-a-base urls, so the segments are always editable.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, ClientError> {
        let response = request.send().await.map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::new(
                FailureKind::HttpStatus(status.as_u16()),
                status.to_string(),
            ));
        }

        if let Some(content_len) = response.content_length() {
            if content_len > self.settings.max_bytes {
                return Err(ClientError::new(
                    FailureKind::TooLarge {
                        max_bytes: self.settings.max_bytes,
                        actual: Some(content_len),
                    },
                    "response too large",
                ));
            }
        }

        let mut bytes = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(map_reqwest_error)?;
            let next_len = bytes.len() as u64 + chunk.len() as u64;
            if next_len > self.settings.max_bytes {
                return Err(ClientError::new(
                    FailureKind::TooLarge {
                        max_bytes: self.settings.max_bytes,
                        actual: Some(next_len),
                    },
                    "response too large",
                ));
            }
            bytes.extend_from_slice(&chunk);
        }

        serde_json::from_slice(&bytes)
            .map_err(|err| ClientError::new(FailureKind::Decode, err.to_string()))
    }
}

#[async_trait::async_trait]
impl CaseClient for ReqwestCaseClient {
    async fn fetch_case(&self, token: &str, case_id: &CaseId) -> Result<Case, ClientError> {
        let url = self.endpoint(&["cases", case_id.as_str()]);
        self.send(self.client.get(url).bearer_auth(token)).await
    }

    async fn fetch_job(&self, token: &str, job_id: &JobId) -> Result<AnalysisJob, ClientError> {
        let url = self.endpoint(&["jobs", job_id.as_str()]);
        self.send(self.client.get(url).bearer_auth(token)).await
    }

    async fn list_cases(&self, token: &str) -> Result<Vec<Case>, ClientError> {
        let url = self.endpoint(&["cases"]);
        self.send(self.client.get(url).bearer_auth(token)).await
    }

    async fn trigger_analyze(
        &self,
        token: &str,
        case_id: &CaseId,
    ) -> Result<AnalyzeAccepted, ClientError> {
        let url = self.endpoint(&["cases", case_id.as_str(), "analyze"]);
        self.send(self.client.post(url).bearer_auth(token)).await
    }
}

fn map_reqwest_error(err: reqwest::Error) -> ClientError {
    if err.is_timeout() {
        return ClientError::new(FailureKind::Timeout, err.to_string());
    }
    if err.is_builder() {
        return ClientError::new(FailureKind::InvalidUrl, err.to_string());
    }
    ClientError::new(FailureKind::Network, err.to_string())
}
