use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::{ResultPolicy, SessionConfig};
use crate::curation::{CurationSet, ViewQuery};
use crate::error::{Result, SessionError};
use crate::events::*;
use crate::job::{GenerationJob, TickOutcome, TickToken};
use crate::prompt::{BoundPrompt, PromptBinder, PromptCatalog};
use crate::types::{GeneratedItem, GenerationKind, GenerationRequest, JobSnapshot, JobStatus};
use crate::ItemGenerator;

/// Everything the presentation layer needs to render a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatus {
    pub job: JobSnapshot,
    pub prompt_text: String,
    /// The curation view for the requested query.
    pub items: Vec<GeneratedItem>,
    /// Size of the whole curation set, not just the view.
    pub total: usize,
    pub selected: usize,
}

struct SessionState {
    binder: PromptBinder,
    /// The most recent job. Replaced by the next `start()`.
    job: Option<GenerationJob>,
    driver: Option<JoinHandle<()>>,
    curation: CurationSet,
}

struct Shared {
    state: Mutex<SessionState>,
    job_tx: watch::Sender<JobSnapshot>,
    events: broadcast::Sender<SessionEvent>,
    config: SessionConfig,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: SessionEvent) {
        // no subscribers is fine
        let _ = self.events.send(event);
    }

    fn publish_job(&self, job: &GenerationJob) {
        self.job_tx.send_replace(job.snapshot());
    }

    fn curation_changed(&self, curation: &CurationSet) {
        self.emit(SessionEvent::CurationChanged(CurationChangedEvent {
            total: curation.len(),
            selected: curation.selected_count(),
        }));
    }
}

/// Orchestrates prompt binding, one generation job at a time, and curation.
///
/// All state lives behind a single lock that is never held across an
/// `.await`, so ticks, completions, cancellations and curation actions are
/// applied one after another in the order they take the lock.
///
/// # Example
///
/// ```no_run
/// use generation_session::*;
///
/// # async fn run() -> Result<()> {
/// let catalog = PromptCatalog::from_texts(["Generate a catchy domain for a fitness app"]);
/// let session =
///     GenerationSession::new(catalog, SimulatedGenerator::new(), SessionConfig::default());
///
/// session.bind("prompt-0")?;
/// session.start(GenerationKind::Domain, 5)?;
/// session.wait_for_job().await?;
///
/// session.remove_unavailable();
/// let shortlist = session.selected_items();
/// # let _ = shortlist;
/// # Ok(())
/// # }
/// ```
pub struct GenerationSession<G> {
    shared: Arc<Shared>,
    generator: Arc<G>,
}

impl<G> GenerationSession<G>
where
    G: ItemGenerator,
{
    /// Create a session with no prompt bound and an empty curation set.
    pub fn new(catalog: PromptCatalog, generator: G, config: SessionConfig) -> Self {
        let (job_tx, _) = watch::channel(JobSnapshot::default());
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        let state = SessionState {
            binder: PromptBinder::new(catalog),
            job: None,
            driver: None,
            curation: CurationSet::new(),
        };
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(state),
                job_tx,
                events,
                config,
            }),
            generator: Arc::new(generator),
        }
    }

    /// Get the session configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.shared.config
    }

    /// Get a copy of the prompt catalog.
    pub fn catalog(&self) -> PromptCatalog {
        self.shared.lock().binder.catalog().clone()
    }

    // -- Prompt binding --

    /// Bind a catalog prompt (from a drop event or a list pick).
    pub fn bind(&self, prompt_id: &str) -> Result<BoundPrompt> {
        let mut state = self.shared.lock();
        let bound = state.binder.bind(prompt_id)?.clone();
        debug!(prompt_id, "prompt bound");
        self.shared.emit(SessionEvent::PromptBound(PromptBoundEvent {
            prompt_id: prompt_id.to_string(),
        }));
        Ok(bound)
    }

    /// Replace the bound prompt's text with free-form input.
    pub fn edit(&self, text: impl Into<String>) -> Result<()> {
        self.shared.lock().binder.edit(text)
    }

    /// Get the text the next job will use (empty if nothing is bound).
    pub fn current_text(&self) -> String {
        self.shared.lock().binder.current_text().to_string()
    }

    // -- Generation --

    /// Start a generation job for the bound prompt.
    ///
    /// Must be called from within a Tokio runtime; the job's ticks run on a
    /// spawned task. Returns the new job's id.
    pub fn start(&self, kind: GenerationKind, count: u32) -> Result<String> {
        self.start_with_style(kind, count, None)
    }

    /// Like [`start`](Self::start), passing a visual style to the generator.
    pub fn start_with_style(
        &self,
        kind: GenerationKind,
        count: u32,
        style: Option<String>,
    ) -> Result<String> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| SessionError::Runtime(e.to_string()))?;

        let mut state = self.shared.lock();

        let prompt_text = state.binder.current_text().to_string();
        if prompt_text.trim().is_empty() {
            return Err(SessionError::MissingPrompt);
        }

        let mut request = GenerationRequest::new(kind, prompt_text, count);
        if let Some(style) = style {
            request = request.with_style(style);
        }
        request.validate(self.shared.config.max_count)?;

        if let Some(running) = state
            .job
            .as_ref()
            .filter(|job| job.status() == JobStatus::Running)
        {
            return Err(SessionError::JobInFlight(running.id().to_string()));
        }

        let mut job = GenerationJob::new(&self.shared.config);
        let token = job.start(request.clone())?;
        let job_id = job.id().to_string();
        self.shared.publish_job(&job);
        state.job = Some(job);

        let driver = runtime.spawn(drive_job(
            Arc::clone(&self.shared),
            Arc::clone(&self.generator),
            job_id.clone(),
            token,
            request,
        ));
        if let Some(previous) = state.driver.replace(driver) {
            previous.abort();
        }

        info!(job_id = %job_id, %kind, count, "generation job started");
        self.shared.emit(SessionEvent::JobStarted(JobStartedEvent {
            job_id: job_id.clone(),
            kind,
            count,
        }));
        Ok(job_id)
    }

    /// Cancel the running job. No tick or result lands after this returns.
    pub fn cancel(&self) -> Result<()> {
        let mut state = self.shared.lock();
        let job = state
            .job
            .as_mut()
            .ok_or_else(|| SessionError::NotFound("no generation job to cancel".to_string()))?;
        job.cancel()?;

        let job_id = job.id().to_string();
        let progress = job.progress();
        self.shared.publish_job(job);
        if let Some(driver) = state.driver.take() {
            driver.abort();
        }

        info!(job_id = %job_id, progress, "generation job cancelled");
        self.shared
            .emit(SessionEvent::JobCancelled(JobCancelledEvent { job_id, progress }));
        Ok(())
    }

    /// Snapshot of the most recent job (`Idle` before the first start).
    pub fn job(&self) -> JobSnapshot {
        job_snapshot(&self.shared.lock())
    }

    /// Progress channel carrying the latest job snapshot.
    pub fn watch_job(&self) -> watch::Receiver<JobSnapshot> {
        self.shared.job_tx.subscribe()
    }

    /// Event stream for the presentation layer.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.shared.events.subscribe()
    }

    /// Wait until the current job leaves `Running`.
    ///
    /// A failed job is reported as [`SessionError::GenerationFailed`]; a
    /// completed or cancelled job returns its final snapshot. There is no
    /// internal timeout, so wrap this in `tokio::time::timeout` and call
    /// [`cancel`](Self::cancel) if a deadline is needed.
    pub async fn wait_for_job(&self) -> Result<JobSnapshot> {
        let mut rx = self.shared.job_tx.subscribe();
        loop {
            let snapshot = rx.borrow_and_update().clone();
            if snapshot.status != JobStatus::Running {
                return match snapshot.status {
                    JobStatus::Failed => Err(SessionError::GenerationFailed(
                        snapshot.error.unwrap_or_default(),
                    )),
                    _ => Ok(snapshot),
                };
            }
            if rx.changed().await.is_err() {
                return Ok(snapshot);
            }
        }
    }

    // -- Observable state --

    /// Status with every item in insertion order.
    pub fn status(&self) -> SessionStatus {
        self.status_with(&ViewQuery::default())
    }

    /// Status whose `items` are the view selected by `query`.
    pub fn status_with(&self, query: &ViewQuery) -> SessionStatus {
        let state = self.shared.lock();
        SessionStatus {
            job: job_snapshot(&state),
            prompt_text: state.binder.current_text().to_string(),
            items: state.curation.view(query).to_vec(),
            total: state.curation.len(),
            selected: state.curation.selected_count(),
        }
    }

    /// Selected items in insertion order, for downstream commit actions.
    pub fn selected_items(&self) -> Vec<GeneratedItem> {
        self.shared.lock().curation.selected().cloned().collect()
    }

    /// Get one item by id.
    pub fn item(&self, item_id: &str) -> Result<GeneratedItem> {
        self.shared
            .lock()
            .curation
            .get(item_id)
            .cloned()
            .ok_or_else(|| SessionError::NotFound(format!("item '{}'", item_id)))
    }

    /// Get every distinct tag in the curation set, sorted.
    pub fn all_tags(&self) -> Vec<String> {
        self.shared
            .lock()
            .curation
            .all_tags()
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    // -- Curation --
    //
    // Each action emits `CurationChanged` only when it altered the set.

    /// Flip the selection of one item. Returns `false` for an unknown id.
    pub fn toggle(&self, item_id: &str) -> bool {
        self.mutate(|curation| curation.toggle(item_id), |toggled| *toggled)
    }

    /// Select or deselect every item currently in the set.
    pub fn set_all_selected(&self, selected: bool) {
        self.mutate(
            |curation| curation.set_all_selected(selected),
            |changed| *changed > 0,
        );
    }

    /// Tag one item. Returns `true` if the tag was newly added.
    pub fn add_tag(&self, item_id: &str, tag: &str) -> bool {
        self.mutate(|curation| curation.add_tag(item_id, tag), |added| *added)
    }

    /// Untag one item. Returns `true` if the tag was present.
    pub fn remove_tag(&self, item_id: &str, tag: &str) -> bool {
        self.mutate(
            |curation| curation.remove_tag(item_id, tag),
            |removed| *removed,
        )
    }

    /// Tag every selected item. Returns how many items gained the tag.
    pub fn bulk_add_tag(&self, tag: &str) -> usize {
        self.mutate(|curation| curation.bulk_add_tag(tag), |tagged| *tagged > 0)
    }

    /// Permanently remove every item matching `predicate`.
    pub fn filter_out<F>(&self, predicate: F) -> usize
    where
        F: FnMut(&GeneratedItem) -> bool,
    {
        let removed = self.mutate(|curation| curation.filter_out(predicate), |n| *n > 0);
        info!(removed, "items filtered out of curation set");
        removed
    }

    /// Permanently remove every unavailable item.
    pub fn remove_unavailable(&self) -> usize {
        let removed = self.mutate(CurationSet::remove_unavailable, |n| *n > 0);
        info!(removed, "unavailable items removed");
        removed
    }

    /// Permanently remove every selected item.
    pub fn remove_selected(&self) -> usize {
        let removed = self.mutate(CurationSet::remove_selected, |n| *n > 0);
        info!(removed, "selected items removed");
        removed
    }

    /// Remove one item by id, returning it.
    pub fn remove(&self, item_id: &str) -> Option<GeneratedItem> {
        self.mutate(|curation| curation.remove(item_id), Option::is_some)
    }

    /// Empty the curation set.
    pub fn clear(&self) {
        self.mutate(
            |curation| {
                let had_items = !curation.is_empty();
                curation.clear();
                had_items
            },
            |had_items| *had_items,
        );
    }

    fn mutate<R>(
        &self,
        f: impl FnOnce(&mut CurationSet) -> R,
        changed: impl FnOnce(&R) -> bool,
    ) -> R {
        let mut state = self.shared.lock();
        let result = f(&mut state.curation);
        if changed(&result) {
            self.shared.curation_changed(&state.curation);
        }
        result
    }
}

impl<G> Drop for GenerationSession<G> {
    fn drop(&mut self) {
        if let Some(driver) = self.shared.lock().driver.take() {
            driver.abort();
        }
    }
}

fn job_snapshot(state: &SessionState) -> JobSnapshot {
    state
        .job
        .as_ref()
        .map(GenerationJob::snapshot)
        .unwrap_or_default()
}

/// Tick a job until it reaches 100, then call the generator and seed the results.
async fn drive_job<G>(
    shared: Arc<Shared>,
    generator: Arc<G>,
    job_id: String,
    token: TickToken,
    request: GenerationRequest,
) where
    G: ItemGenerator,
{
    loop {
        tokio::time::sleep(shared.config.tick_interval).await;

        let mut state = shared.lock();
        let Some(job) = state.job.as_mut().filter(|job| job.id() == job_id) else {
            return;
        };

        match job.tick(token) {
            TickOutcome::Stale => return,
            TickOutcome::Advanced(progress) => {
                shared.publish_job(job);
                shared.emit(SessionEvent::JobProgress(JobProgressEvent {
                    job_id: job_id.clone(),
                    progress,
                }));
            }
            TickOutcome::ReadyToGenerate => {
                shared.publish_job(job);
                shared.emit(SessionEvent::JobProgress(JobProgressEvent {
                    job_id: job_id.clone(),
                    progress: 100,
                }));
                break;
            }
        }
    }

    debug!(job_id = %job_id, kind = %request.kind, "awaiting generator");
    let generated = generator.generate(&request).await;

    let mut state = shared.lock();
    let SessionState { job, curation, .. } = &mut *state;
    let Some(job) = job.as_mut().filter(|job| job.id() == job_id) else {
        return;
    };

    let payloads = match generated {
        Ok(payloads) => payloads,
        Err(err) => {
            let cause = format!("{:#}", err);
            if job.fail(token, cause.clone()) {
                shared.publish_job(job);
                warn!(job_id = %job_id, error = %cause, "generation job failed");
                shared.emit(SessionEvent::JobFailed(JobFailedEvent {
                    job_id,
                    error: cause,
                    progress: job.progress(),
                }));
            } else {
                debug!(job_id = %job_id, "discarding failure of a finished job");
            }
            return;
        }
    };

    match job.complete(token, payloads) {
        Some(JobStatus::Completed) => {
            let items = job.take_results();
            shared.publish_job(job);
            if shared.config.result_policy == ResultPolicy::Replace {
                curation.clear();
            }
            let item_count = curation.seed(items);
            info!(job_id = %job_id, item_count, "generation job completed");
            shared.emit(SessionEvent::JobCompleted(JobCompletedEvent {
                job_id,
                item_count,
            }));
            shared.curation_changed(curation);
        }
        Some(_) => {
            let cause = job.error().unwrap_or_default().to_string();
            shared.publish_job(job);
            warn!(job_id = %job_id, error = %cause, "generator returned an unusable batch");
            shared.emit(SessionEvent::JobFailed(JobFailedEvent {
                job_id,
                error: cause,
                progress: job.progress(),
            }));
        }
        None => debug!(job_id = %job_id, "discarding results of a finished job"),
    }
}
