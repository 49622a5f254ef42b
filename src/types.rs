use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SessionError};

/// Which console module a request belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GenerationKind {
    Domain,
    Logo,
    Image,
}

impl GenerationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            GenerationKind::Domain => "domain",
            GenerationKind::Logo => "logo",
            GenerationKind::Image => "image",
        }
    }
}

impl fmt::Display for GenerationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Job status lifecycle: Idle -> Running -> Completed/Cancelled/Failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum JobStatus {
    #[default]
    Idle,
    Running,
    Completed,
    Cancelled,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Idle => "idle",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Cancelled => "cancelled",
            JobStatus::Failed => "failed",
        }
    }

    /// Completed, Cancelled and Failed have no outgoing transition.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Cancelled | JobStatus::Failed
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parameters of one generation attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    pub kind: GenerationKind,
    pub prompt_text: String,
    pub count: u32,
    /// Optional visual style (e.g. "Minimalist"), passed through to the generator.
    pub style: Option<String>,
}

impl GenerationRequest {
    pub fn new(kind: GenerationKind, prompt_text: impl Into<String>, count: u32) -> Self {
        Self {
            kind,
            prompt_text: prompt_text.into(),
            count,
            style: None,
        }
    }

    /// Set the style for this request (builder pattern).
    pub fn with_style(mut self, style: impl Into<String>) -> Self {
        self.style = Some(style.into());
        self
    }

    /// Check that `count` lies in `1..=max_count` and the prompt is not blank.
    pub fn validate(&self, max_count: u32) -> Result<()> {
        if self.count == 0 || self.count > max_count {
            return Err(SessionError::InvalidRequest(format!(
                "count must be between 1 and {}, got {}",
                max_count, self.count
            )));
        }
        if self.prompt_text.trim().is_empty() {
            return Err(SessionError::InvalidRequest(
                "prompt text is empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Kind-specific content of a generated item. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ItemPayload {
    Domain { name: String, available: bool },
    Logo { reference: String },
    Image { reference: String },
}

impl ItemPayload {
    pub fn kind(&self) -> GenerationKind {
        match self {
            ItemPayload::Domain { .. } => GenerationKind::Domain,
            ItemPayload::Logo { .. } => GenerationKind::Logo,
            ItemPayload::Image { .. } => GenerationKind::Image,
        }
    }

    /// Human-readable name used for display and search.
    pub fn label(&self) -> &str {
        match self {
            ItemPayload::Domain { name, .. } => name,
            ItemPayload::Logo { reference } | ItemPayload::Image { reference } => reference,
        }
    }

    /// Domains carry an availability flag; logos and images are always available.
    pub fn is_available(&self) -> bool {
        match self {
            ItemPayload::Domain { available, .. } => *available,
            _ => true,
        }
    }
}

/// One candidate produced by a generation job.
///
/// The id and payload never change. Selection and tags are mutated only
/// through [`CurationSet`](crate::CurationSet).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedItem {
    id: String,
    seq: u64,
    job_id: Option<String>,
    payload: ItemPayload,
    selected: bool,
    tags: BTreeSet<String>,
    created_at: String,
}

impl GeneratedItem {
    /// Create a fresh, unselected, untagged item with a generated UUID.
    pub fn new(payload: ItemPayload) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            seq: 0,
            job_id: None,
            payload,
            selected: false,
            tags: BTreeSet::new(),
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub(crate) fn from_job(job_id: &str, payload: ItemPayload) -> Self {
        let mut item = Self::new(payload);
        item.job_id = Some(job_id.to_string());
        item
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Insertion sequence number inside the curation set.
    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// The job that produced this item, if any.
    pub fn job_id(&self) -> Option<&str> {
        self.job_id.as_deref()
    }

    pub fn payload(&self) -> &ItemPayload {
        &self.payload
    }

    pub fn kind(&self) -> GenerationKind {
        self.payload.kind()
    }

    pub fn label(&self) -> &str {
        self.payload.label()
    }

    pub fn is_available(&self) -> bool {
        self.payload.is_available()
    }

    pub fn is_selected(&self) -> bool {
        self.selected
    }

    pub fn tags(&self) -> &BTreeSet<String> {
        &self.tags
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    pub fn created_at(&self) -> &str {
        &self.created_at
    }

    pub(crate) fn set_seq(&mut self, seq: u64) {
        self.seq = seq;
    }

    pub(crate) fn set_selected(&mut self, selected: bool) {
        self.selected = selected;
    }

    pub(crate) fn tags_mut(&mut self) -> &mut BTreeSet<String> {
        &mut self.tags
    }
}

/// Read-only view of a job, safe to hand to the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSnapshot {
    /// `None` until the first job is started.
    pub job_id: Option<String>,
    pub kind: Option<GenerationKind>,
    pub status: JobStatus,
    pub progress: u8,
    pub error: Option<String>,
    pub started_at: Option<String>,
    pub finished_at: Option<String>,
}
