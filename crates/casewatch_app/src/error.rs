use std::path::PathBuf;

use casewatch_engine::{ClientError, PollerError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("failed to read config {path:?}: {source}")]
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config {path:?}: {message}")]
    ConfigParse { path: PathBuf, message: String },
    #[error("unknown log level {0:?}")]
    LogLevel(String),
    #[error("no bearer token given (use --token or CASEWATCH_TOKEN)")]
    MissingToken,
    #[error(transparent)]
    Client(#[from] ClientError),
    #[error(transparent)]
    Poller(#[from] PollerError),
}
