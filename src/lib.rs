//! # Generation Session
//!
//! Prompt binding, cancellable generation jobs with progress, and curation
//! of the generated items for admin consoles (domain, logo and image
//! generators).
//!
//! ## Features
//!
//! - Drag-and-drop or list-pick prompt binding with free-form editing
//! - One generation job per session, ticking progress on a timer
//! - Race-free cancellation: late ticks and late results are discarded
//! - Selection, tagging, filtering and bulk removal of generated items
//! - Read-only status snapshots plus an event stream for the frontend
//! - Optional Tauri event forwarding (`tauri` feature)
//!
//! ## Quick Start
//!
//! 1. Implement [`ItemGenerator`] for your backend (or use [`SimulatedGenerator`])
//! 2. Create a [`GenerationSession`] with a [`PromptCatalog`] and [`SessionConfig`]
//! 3. [`bind`](GenerationSession::bind) a prompt and [`start`](GenerationSession::start) a job
//! 4. Curate the results and commit [`selected_items`](GenerationSession::selected_items)
//!
//! See `demos/basic_session.rs` for a complete walkthrough.

pub mod config;
pub mod curation;
pub mod error;
pub mod events;
pub mod job;
pub mod prompt;
pub mod session;
pub mod simulated;
#[cfg(feature = "tauri")]
pub mod tauri_bridge;
pub mod types;

pub use config::{ResultPolicy, SessionConfig, SessionConfigBuilder};
pub use curation::{CurationSet, SortOrder, View, ViewQuery};
pub use error::{Result, SessionError};
pub use events::SessionEvent;
pub use job::{GenerationJob, TickOutcome, TickToken};
pub use prompt::{BoundPrompt, Prompt, PromptBinder, PromptCatalog};
pub use session::{GenerationSession, SessionStatus};
pub use simulated::SimulatedGenerator;
pub use types::{
    GeneratedItem, GenerationKind, GenerationRequest, ItemPayload, JobSnapshot, JobStatus,
};

/// The backend that turns a request into item payloads.
///
/// The session awaits this once per job, after progress reaches 100. Return
/// exactly `request.count` payloads of `request.kind`; anything shorter or of
/// another kind fails the job. Errors become the job's failure cause.
///
/// # Example
///
/// ```ignore
/// use generation_session::*;
///
/// struct DomainService;
///
/// impl ItemGenerator for DomainService {
///     async fn generate(&self, request: &GenerationRequest) -> anyhow::Result<Vec<ItemPayload>> {
///         let names = lookup_names(&request.prompt_text, request.count).await?;
///         Ok(names
///             .into_iter()
///             .map(|(name, available)| ItemPayload::Domain { name, available })
///             .collect())
///     }
/// }
/// ```
pub trait ItemGenerator: Send + Sync + 'static {
    fn generate(
        &self,
        request: &GenerationRequest,
    ) -> impl std::future::Future<Output = anyhow::Result<Vec<ItemPayload>>> + Send;
}
