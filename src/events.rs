use serde::{Deserialize, Serialize};

use crate::types::GenerationKind;

/// Emitted when a generation job starts running.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStartedEvent {
    pub job_id: String,
    pub kind: GenerationKind,
    pub count: u32,
}

/// Emitted on every progress tick, including the final one at 100.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobProgressEvent {
    pub job_id: String,
    pub progress: u8,
}

/// Emitted after a job's results have been seeded into the curation set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobCompletedEvent {
    pub job_id: String,
    pub item_count: usize,
}

/// Emitted when the generator fails or returns an unusable batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobFailedEvent {
    pub job_id: String,
    pub error: String,
    pub progress: u8,
}

/// Emitted when a running job is cancelled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobCancelledEvent {
    pub job_id: String,
    pub progress: u8,
}

/// Emitted after any mutation of the curation set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurationChangedEvent {
    pub total: usize,
    pub selected: usize,
}

/// Emitted when a catalog prompt is bound into the prompt box.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptBoundEvent {
    pub prompt_id: String,
}

/// Everything a session broadcasts to its subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum SessionEvent {
    JobStarted(JobStartedEvent),
    JobProgress(JobProgressEvent),
    JobCompleted(JobCompletedEvent),
    JobFailed(JobFailedEvent),
    JobCancelled(JobCancelledEvent),
    CurationChanged(CurationChangedEvent),
    PromptBound(PromptBoundEvent),
}

impl SessionEvent {
    /// Frontend event name, e.g. `generation:job_progress`.
    pub fn name(&self) -> &'static str {
        match self {
            SessionEvent::JobStarted(_) => "generation:job_started",
            SessionEvent::JobProgress(_) => "generation:job_progress",
            SessionEvent::JobCompleted(_) => "generation:job_completed",
            SessionEvent::JobFailed(_) => "generation:job_failed",
            SessionEvent::JobCancelled(_) => "generation:job_cancelled",
            SessionEvent::CurationChanged(_) => "generation:curation_changed",
            SessionEvent::PromptBound(_) => "generation:prompt_bound",
        }
    }
}
