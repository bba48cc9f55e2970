//! Casewatch engine: entity clients and the polling runtime.
mod client;
mod coordinator;
mod observer;
mod poller;
mod types;

pub use client::{CaseClient, ClientSettings, ReqwestCaseClient};
pub use coordinator::BatchPollCoordinator;
pub use observer::{CallbackObserver, ChannelObserver, PollObserver};
pub use poller::{JobStatusPoller, SessionInfo};
pub use types::{AnalyzeAccepted, ClientError, FailureKind, PollEvent, PollerError};
