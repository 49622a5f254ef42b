use thiserror::Error;

use crate::types::JobStatus;

/// Errors returned by session, binder and job operations.
///
/// Every variant is recoverable: the session stays usable after any of them.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("Invalid generation request: {0}")]
    InvalidRequest(String),

    #[error("No prompt text is bound")]
    MissingPrompt,

    #[error("Generation job {0} is still running")]
    JobInFlight(String),

    #[error("Job {0} has already been started")]
    AlreadyStarted(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Generation failed: {0}")]
    GenerationFailed(String),

    #[error("No prompt has been bound yet")]
    Unbound,

    #[error("Job {job_id} is not running (status: {status})")]
    NotRunning { job_id: String, status: JobStatus },

    #[error("No async runtime available: {0}")]
    Runtime(String),
}

pub type Result<T> = std::result::Result<T, SessionError>;
