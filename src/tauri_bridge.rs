use tauri::{AppHandle, Emitter};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::warn;

use crate::events::SessionEvent;

/// Re-emit every session event to the Tauri frontend.
///
/// Events are emitted under [`SessionEvent::name`] (e.g.
/// `generation:job_progress`) with the inner payload as camelCase JSON.
/// The task ends when the session is dropped.
///
/// ```ignore
/// let session = GenerationSession::new(catalog, generator, SessionConfig::default());
/// forward_events(session.subscribe(), app.handle().clone());
/// ```
pub fn forward_events(mut rx: broadcast::Receiver<SessionEvent>, app_handle: AppHandle) {
    tauri::async_runtime::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => {
                    let result = match &event {
                        SessionEvent::JobStarted(e) => app_handle.emit(event.name(), e),
                        SessionEvent::JobProgress(e) => app_handle.emit(event.name(), e),
                        SessionEvent::JobCompleted(e) => app_handle.emit(event.name(), e),
                        SessionEvent::JobFailed(e) => app_handle.emit(event.name(), e),
                        SessionEvent::JobCancelled(e) => app_handle.emit(event.name(), e),
                        SessionEvent::CurationChanged(e) => app_handle.emit(event.name(), e),
                        SessionEvent::PromptBound(e) => app_handle.emit(event.name(), e),
                    };
                    if let Err(e) = result {
                        warn!(event = event.name(), error = %e, "failed to emit session event");
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "frontend event forwarder lagged");
                }
                Err(RecvError::Closed) => break,
            }
        }
    });
}
