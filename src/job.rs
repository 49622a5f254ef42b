use tracing::debug;

use crate::config::SessionConfig;
use crate::error::{Result, SessionError};
use crate::types::{GeneratedItem, GenerationRequest, ItemPayload, JobSnapshot, JobStatus};

/// Proof that a tick, completion or failure belongs to the current run.
///
/// Every terminal transition invalidates the token, so a timer callback that
/// fires after `cancel()` carries a stale token and changes nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickToken(u64);

/// Result of presenting a token to [`GenerationJob::tick`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Progress moved forward to the contained value (below 100).
    Advanced(u8),
    /// Progress is at 100; the generator should be called now.
    ReadyToGenerate,
    /// The token is stale or the job is no longer running. Nothing changed.
    Stale,
}

/// A single generation attempt: `Idle -> Running -> Completed | Cancelled | Failed`.
///
/// The job itself is synchronous; the session drives it from a timer task.
/// A terminal job cannot be restarted, create a fresh one instead.
#[derive(Debug, Clone)]
pub struct GenerationJob {
    id: String,
    request: Option<GenerationRequest>,
    status: JobStatus,
    progress: u8,
    results: Vec<GeneratedItem>,
    error: Option<String>,
    epoch: u64,
    progress_step: u8,
    max_count: u32,
    started_at: Option<String>,
    finished_at: Option<String>,
}

impl GenerationJob {
    /// Create an idle job with a generated UUID.
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            request: None,
            status: JobStatus::Idle,
            progress: 0,
            results: Vec::new(),
            error: None,
            epoch: 0,
            progress_step: config.progress_step.clamp(1, 100),
            max_count: config.max_count,
            started_at: None,
            finished_at: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn request(&self) -> Option<&GenerationRequest> {
        self.request.as_ref()
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    pub fn progress(&self) -> u8 {
        self.progress
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Results of a completed job not yet taken.
    pub fn results(&self) -> &[GeneratedItem] {
        &self.results
    }

    /// Validate the request and enter `Running` with progress 0.
    pub fn start(&mut self, request: GenerationRequest) -> Result<TickToken> {
        if self.status != JobStatus::Idle {
            return Err(SessionError::AlreadyStarted(self.id.clone()));
        }
        request.validate(self.max_count)?;

        self.request = Some(request);
        self.status = JobStatus::Running;
        self.progress = 0;
        self.started_at = Some(chrono::Utc::now().to_rfc3339());
        Ok(self.next_token())
    }

    /// Advance progress by one step.
    pub fn tick(&mut self, token: TickToken) -> TickOutcome {
        if !self.accepts(token) {
            debug!(job_id = %self.id, status = %self.status, "discarding stale tick");
            return TickOutcome::Stale;
        }
        if self.progress < 100 {
            self.progress = self.progress.saturating_add(self.progress_step).min(100);
        }
        if self.progress == 100 {
            TickOutcome::ReadyToGenerate
        } else {
            TickOutcome::Advanced(self.progress)
        }
    }

    /// Turn the generator's payloads into results and enter `Completed`.
    ///
    /// Returns the new status, or `None` if the token is stale or progress has
    /// not reached 100 yet. A short batch or a payload of the wrong kind
    /// fails the job instead; extra payloads beyond `count` are dropped.
    pub fn complete(
        &mut self,
        token: TickToken,
        mut payloads: Vec<ItemPayload>,
    ) -> Option<JobStatus> {
        if !self.accepts(token) {
            return None;
        }
        if self.progress < 100 {
            debug!(
                job_id = %self.id,
                progress = self.progress,
                "discarding results before progress reached 100"
            );
            return None;
        }
        let (kind, count) = match self.request.as_ref() {
            Some(request) => (request.kind, request.count as usize),
            None => return None,
        };

        if payloads.len() < count {
            let cause = format!(
                "generator returned {} of {} requested items",
                payloads.len(),
                count
            );
            return Some(self.finish_failed(cause));
        }
        if let Some(wrong) = payloads.iter().find(|p| p.kind() != kind) {
            let cause = format!(
                "generator returned a {} item for a {} request",
                wrong.kind(),
                kind
            );
            return Some(self.finish_failed(cause));
        }

        payloads.truncate(count);
        self.results = payloads
            .into_iter()
            .map(|payload| GeneratedItem::from_job(&self.id, payload))
            .collect();
        self.progress = 100;
        self.status = JobStatus::Completed;
        self.finish();
        Some(self.status)
    }

    /// Record a generator failure. Progress keeps its last value.
    ///
    /// Returns `false` if the token is stale.
    pub fn fail(&mut self, token: TickToken, cause: impl Into<String>) -> bool {
        if !self.accepts(token) {
            return false;
        }
        self.finish_failed(cause.into());
        true
    }

    /// Stop the job immediately and drop any partial results.
    pub fn cancel(&mut self) -> Result<()> {
        if self.status != JobStatus::Running {
            return Err(SessionError::NotRunning {
                job_id: self.id.clone(),
                status: self.status,
            });
        }
        self.results.clear();
        self.status = JobStatus::Cancelled;
        self.finish();
        Ok(())
    }

    /// Hand over the completed results. Subsequent calls return nothing.
    pub fn take_results(&mut self) -> Vec<GeneratedItem> {
        std::mem::take(&mut self.results)
    }

    /// Read-only copy of the job's observable state.
    pub fn snapshot(&self) -> JobSnapshot {
        JobSnapshot {
            job_id: Some(self.id.clone()),
            kind: self.request.as_ref().map(|r| r.kind),
            status: self.status,
            progress: self.progress,
            error: self.error.clone(),
            started_at: self.started_at.clone(),
            finished_at: self.finished_at.clone(),
        }
    }

    fn accepts(&self, token: TickToken) -> bool {
        self.status == JobStatus::Running && token.0 == self.epoch
    }

    fn next_token(&mut self) -> TickToken {
        self.epoch += 1;
        TickToken(self.epoch)
    }

    fn finish_failed(&mut self, cause: String) -> JobStatus {
        self.results.clear();
        self.error = Some(cause);
        self.status = JobStatus::Failed;
        self.finish();
        self.status
    }

    fn finish(&mut self) {
        // invalidate every outstanding token
        self.epoch += 1;
        self.finished_at = Some(chrono::Utc::now().to_rfc3339());
    }
}
