
use std::sync::atomic::Ordering;
use std::time::Duration;

use generation_session::*;
use test_helpers::*;
use tokio::sync::broadcast;

fn drain_progress(rx: &mut broadcast::Receiver<SessionEvent>) -> Vec<u8> {
    let mut progress = Vec::new();
    while let Ok(event) = rx.try_recv() {
        if let SessionEvent::JobProgress(e) = event {
            progress.push(e.progress);
        }
    }
    progress
}

// -- Happy path --

#[tokio::test(start_paused = true)]
async fn test_fitness_domain_scenario() {
    let session = session_with(SimulatedGenerator::seeded(11));
    session.bind("prompt-1").unwrap();
    assert_eq!(session.current_text(), FITNESS_PROMPT);

    let mut events = session.subscribe();
    let started = tokio::time::Instant::now();
    let job_id = session.start(GenerationKind::Domain, 5).unwrap();
    assert_eq!(session.job().status, JobStatus::Running);
    assert_eq!(session.job().progress, 0);

    let done = session.wait_for_job().await.unwrap();
    assert_eq!(done.job_id.as_deref(), Some(job_id.as_str()));
    assert_eq!(done.status, JobStatus::Completed);
    assert_eq!(done.progress, 100);
    assert!(started.elapsed() >= Duration::from_secs(5));

    assert_eq!(
        drain_progress(&mut events),
        vec![10, 20, 30, 40, 50, 60, 70, 80, 90, 100]
    );

    let status = session.status();
    assert_eq!(status.total, 5);
    assert_eq!(status.items.len(), 5);
    assert_eq!(status.selected, 0);
    assert!(status
        .items
        .iter()
        .all(|item| !item.is_selected() && item.tags().is_empty()));
    assert!(status
        .items
        .iter()
        .all(|item| item.job_id() == Some(job_id.as_str())));
}

#[tokio::test(start_paused = true)]
async fn test_event_order_for_completed_job() {
    let session = session_with(SimulatedGenerator::seeded(5));
    session.bind("prompt-0").unwrap();
    let mut events = session.subscribe();

    session.start(GenerationKind::Domain, 2).unwrap();
    session.wait_for_job().await.unwrap();

    let mut names = Vec::new();
    while let Ok(event) = events.try_recv() {
        names.push(event.name());
    }
    assert_eq!(names.first(), Some(&"generation:job_started"));
    let completed = names
        .iter()
        .position(|n| *n == "generation:job_completed")
        .unwrap();
    let last_progress = names
        .iter()
        .rposition(|n| *n == "generation:job_progress")
        .unwrap();
    assert!(last_progress < completed);
    assert_eq!(names.last(), Some(&"generation:curation_changed"));
}

#[tokio::test(start_paused = true)]
async fn test_styled_image_job() {
    let session = session_with(SimulatedGenerator::seeded(3));
    session.bind("prompt-0").unwrap();
    session
        .start_with_style(GenerationKind::Image, 3, Some("Minimalist".to_string()))
        .unwrap();
    session.wait_for_job().await.unwrap();

    let items = session.status().items;
    assert_eq!(items.len(), 3);
    assert!(items
        .iter()
        .all(|i| i.kind() == GenerationKind::Image && i.label().contains("(Minimalist)")));
}

// -- Rejected starts --

#[tokio::test(start_paused = true)]
async fn test_second_start_while_running_is_rejected() {
    let session = session_with(SimulatedGenerator::seeded(9));
    session.bind("prompt-1").unwrap();

    let first = session.start(GenerationKind::Domain, 5).unwrap();
    let second = session.start(GenerationKind::Domain, 3);
    assert_eq!(second, Err(SessionError::JobInFlight(first.clone())));

    let done = session.wait_for_job().await.unwrap();
    assert_eq!(done.job_id.as_deref(), Some(first.as_str()));
    assert_eq!(session.status().total, 5);
}

#[tokio::test(start_paused = true)]
async fn test_zero_count_is_invalid_and_changes_nothing() {
    let session = session_with(SimulatedGenerator::seeded(1));
    session.bind("prompt-2").unwrap();
    let before = session.status();

    let result = session.start(GenerationKind::Logo, 0);
    assert!(matches!(result, Err(SessionError::InvalidRequest(_))));
    assert_eq!(session.status(), before);

    let too_many = session.start(GenerationKind::Logo, 51);
    assert!(matches!(too_many, Err(SessionError::InvalidRequest(_))));
    assert_eq!(session.status(), before);
}

#[tokio::test]
async fn test_missing_prompt() {
    let session = session_with(SimulatedGenerator::seeded(1));
    assert_eq!(
        session.start(GenerationKind::Domain, 3),
        Err(SessionError::MissingPrompt)
    );
    assert_eq!(session.edit("typed before binding"), Err(SessionError::Unbound));

    session.bind("prompt-0").unwrap();
    session.edit("   ").unwrap();
    assert_eq!(
        session.start(GenerationKind::Domain, 3),
        Err(SessionError::MissingPrompt)
    );
    assert_eq!(session.job().status, JobStatus::Idle);
}

#[tokio::test]
async fn test_bind_unknown_prompt() {
    let session = session_with(SimulatedGenerator::seeded(1));
    assert!(matches!(
        session.bind("prompt-42"),
        Err(SessionError::NotFound(_))
    ));
    assert_eq!(session.current_text(), "");
}

#[tokio::test(start_paused = true)]
async fn test_edited_prompt_reaches_generator() {
    let generator = CapturingGenerator::default();
    let session = session_with(generator.clone());
    session.bind("prompt-0").unwrap();
    session.edit("  A domain for a climbing gym  ").unwrap();
    session.start(GenerationKind::Domain, 1).unwrap();
    session.wait_for_job().await.unwrap();

    assert_eq!(session.current_text(), "  A domain for a climbing gym  ");
    assert_eq!(generator.prompts(), vec!["  A domain for a climbing gym  "]);
}

#[tokio::test(start_paused = true)]
async fn test_bound_prompt_reaches_generator_unchanged() {
    let generator = CapturingGenerator::default();
    let session = session_with(generator.clone());
    session.bind("prompt-1").unwrap();
    session
        .start_with_style(GenerationKind::Domain, 2, Some("Playful".to_string()))
        .unwrap();
    session.wait_for_job().await.unwrap();

    let requests = generator.requests.lock().unwrap().clone();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].prompt_text, FITNESS_PROMPT);
    assert_eq!(requests[0].count, 2);
    assert_eq!(requests[0].style.as_deref(), Some("Playful"));
}

// -- Cancellation --

#[tokio::test(start_paused = true)]
async fn test_cancel_mid_run_freezes_progress() {
    let session = session_with(SimulatedGenerator::seeded(2));
    session.bind("prompt-1").unwrap();
    session.start(GenerationKind::Domain, 5).unwrap();

    tokio::time::sleep(Duration::from_millis(1250)).await;
    assert_eq!(session.job().progress, 20);

    session.cancel().unwrap();
    let cancelled = session.job();
    assert_eq!(cancelled.status, JobStatus::Cancelled);

    tokio::time::sleep(Duration::from_secs(10)).await;
    let later = session.job();
    assert_eq!(later.status, JobStatus::Cancelled);
    assert_eq!(later.progress, 20);
    assert_eq!(session.status().total, 0);

    let waited = session.wait_for_job().await.unwrap();
    assert_eq!(waited.status, JobStatus::Cancelled);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_on_tick_boundary_is_race_free() {
    let session = session_with(SimulatedGenerator::seeded(2));
    session.bind("prompt-1").unwrap();
    session.start(GenerationKind::Domain, 5).unwrap();

    // the driver's third tick is due at the same instant
    tokio::time::sleep(Duration::from_millis(1500)).await;
    session.cancel().unwrap();
    let frozen = session.job().progress;
    assert!(frozen == 20 || frozen == 30);

    let mut events = session.subscribe();
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(session.job().progress, frozen);
    assert!(drain_progress(&mut events).is_empty());
    assert!(session.status().items.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_cancel_while_awaiting_generator() {
    let session = session_with(PendingGenerator);
    session.bind("prompt-0").unwrap();
    session.start(GenerationKind::Logo, 2).unwrap();

    // never resolves on its own
    let waited = tokio::time::timeout(Duration::from_secs(60), session.wait_for_job()).await;
    assert!(waited.is_err());
    let stuck = session.job();
    assert_eq!(stuck.status, JobStatus::Running);
    assert_eq!(stuck.progress, 100);

    session.cancel().unwrap();
    let job = session.job();
    assert_eq!(job.status, JobStatus::Cancelled);
    assert_eq!(job.progress, 100);
    assert_eq!(session.status().total, 0);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_after_completion_is_rejected() {
    let session = session_with(SimulatedGenerator::seeded(2));
    session.bind("prompt-0").unwrap();
    session.start(GenerationKind::Domain, 1).unwrap();
    session.wait_for_job().await.unwrap();

    assert!(matches!(
        session.cancel(),
        Err(SessionError::NotRunning {
            status: JobStatus::Completed,
            ..
        })
    ));
    assert_eq!(session.status().total, 1);
}

#[tokio::test(start_paused = true)]
async fn test_restart_after_cancel() {
    let session = session_with(SimulatedGenerator::seeded(8));
    session.bind("prompt-0").unwrap();
    let first = session.start(GenerationKind::Domain, 4).unwrap();
    tokio::time::sleep(Duration::from_millis(700)).await;
    session.cancel().unwrap();

    let second = session.start(GenerationKind::Domain, 2).unwrap();
    assert_ne!(first, second);
    let done = session.wait_for_job().await.unwrap();
    assert_eq!(done.job_id.as_deref(), Some(second.as_str()));
    assert_eq!(session.status().total, 2);
}

// -- Failure --

#[tokio::test(start_paused = true)]
async fn test_generator_failure() {
    let session = session_with(FailingGenerator);
    session.bind("prompt-0").unwrap();
    session.start(GenerationKind::Domain, 3).unwrap();

    match session.wait_for_job().await {
        Err(SessionError::GenerationFailed(cause)) => {
            assert!(cause.contains("registrar unreachable"))
        }
        other => panic!("Expected GenerationFailed, got {:?}", other),
    }

    let job = session.job();
    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(job.progress, 100);
    assert!(job.error.is_some());
    assert_eq!(session.status().total, 0);

    // the session stays usable
    session.start(GenerationKind::Domain, 1).unwrap();
    assert_eq!(session.job().status, JobStatus::Running);
}

// -- Accumulation and curation --

#[tokio::test(start_paused = true)]
async fn test_batches_accumulate_in_order() {
    let generator = AlternatingGenerator::default();
    let calls = generator.calls.clone();
    let session = session_with(generator);
    session.bind("prompt-1").unwrap();

    session.start(GenerationKind::Domain, 3).unwrap();
    session.wait_for_job().await.unwrap();
    session.start(GenerationKind::Domain, 2).unwrap();
    session.wait_for_job().await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    let labels: Vec<_> = session
        .status()
        .items
        .iter()
        .map(|i| i.label().to_string())
        .collect();
    assert_eq!(
        labels,
        vec![
            "batch0-domain-0.com",
            "batch0-domain-1.com",
            "batch0-domain-2.com",
            "batch1-domain-0.com",
            "batch1-domain-1.com",
        ]
    );

    let desc = session.status_with(&ViewQuery::new().with_order(SortOrder::Desc));
    assert_eq!(desc.items[0].label(), "batch1-domain-1.com");
    assert_eq!(desc.total, 5);
}

#[tokio::test(start_paused = true)]
async fn test_replace_policy_keeps_latest_batch() {
    init_tracing();
    let config = SessionConfig::builder()
        .with_result_policy(ResultPolicy::Replace)
        .with_tick_interval(Duration::from_millis(50))
        .build();
    let session = GenerationSession::new(domain_catalog(), AlternatingGenerator::default(), config);
    session.bind("prompt-0").unwrap();

    session.start(GenerationKind::Domain, 3).unwrap();
    session.wait_for_job().await.unwrap();
    session.start(GenerationKind::Domain, 2).unwrap();
    session.wait_for_job().await.unwrap();

    let items = session.status().items;
    assert_eq!(items.len(), 2);
    assert!(items.iter().all(|i| i.label().starts_with("batch1")));
}

#[tokio::test(start_paused = true)]
async fn test_curation_through_session() {
    let session = session_with(AlternatingGenerator::default());
    session.bind("prompt-1").unwrap();
    session.start(GenerationKind::Domain, 4).unwrap();
    session.wait_for_job().await.unwrap();

    let ids: Vec<String> = session
        .status()
        .items
        .iter()
        .map(|i| i.id().to_string())
        .collect();

    assert!(session.toggle(&ids[0]));
    assert!(session.toggle(&ids[1]));
    assert!(!session.toggle("not-an-item"));
    assert_eq!(session.bulk_add_tag("shortlist"), 2);
    assert!(session.add_tag(&ids[3], "backup"));

    let shortlisted = session.status_with(&ViewQuery::new().with_tag("shortlist"));
    assert_eq!(shortlisted.items.len(), 2);
    assert_eq!(shortlisted.total, 4);
    assert_eq!(session.all_tags(), vec!["backup", "shortlist"]);

    // unavailable: indices 1 and 3
    assert_eq!(session.remove_unavailable(), 2);
    let remaining = session.status();
    assert_eq!(remaining.total, 2);
    let kept = session.item(&ids[0]).unwrap();
    assert!(kept.is_selected());
    assert!(kept.has_tag("shortlist"));

    let committed = session.selected_items();
    assert_eq!(committed.len(), 1);
    assert_eq!(committed[0].id(), ids[0]);

    assert!(session.remove_tag(&ids[0], "shortlist"));
    assert_eq!(session.remove_selected(), 1);
    assert!(session.remove(&ids[2]).is_some());
    assert_eq!(session.status().total, 0);
}

#[tokio::test(start_paused = true)]
async fn test_select_all_then_bulk_tag() {
    let session = session_with(SimulatedGenerator::seeded(6));
    session.bind("prompt-0").unwrap();
    session.start(GenerationKind::Domain, 6).unwrap();
    session.wait_for_job().await.unwrap();

    session.set_all_selected(true);
    assert_eq!(session.bulk_add_tag("review"), 6);
    assert!(session.status().items.iter().all(|i| i.has_tag("review")));

    session.set_all_selected(false);
    assert_eq!(session.bulk_add_tag("ignored"), 0);
    assert!(session.selected_items().is_empty());

    let custom = session.filter_out(|item| item.has_tag("review"));
    assert_eq!(custom, 6);
    session.clear();
    assert_eq!(session.status().total, 0);
}

#[tokio::test(start_paused = true)]
async fn test_curation_events_only_on_change() {
    let session = session_with(AlternatingGenerator::default());
    let mut events = session.subscribe();

    session.clear();
    assert!(!session.toggle("not-an-item"));
    assert_eq!(session.bulk_add_tag("shortlist"), 0);
    assert!(events.try_recv().is_err());

    session.bind("prompt-0").unwrap();
    session.start(GenerationKind::Domain, 2).unwrap();
    session.wait_for_job().await.unwrap();
    let mut events = session.subscribe();

    let id = session.status().items[0].id().to_string();
    assert!(session.toggle(&id));
    match events.try_recv().unwrap() {
        SessionEvent::CurationChanged(e) => {
            assert_eq!(e.total, 2);
            assert_eq!(e.selected, 1);
        }
        other => panic!("Expected CurationChanged, got {:?}", other),
    }

    assert!(!session.add_tag(&id, "  "));
    assert!(!session.remove_tag(&id, "never-added"));
    assert!(session.remove("not-an-item").is_none());
    assert!(events.try_recv().is_err());

    session.clear();
    assert!(matches!(
        events.try_recv(),
        Ok(SessionEvent::CurationChanged(_))
    ));
}

// -- Wire shape for the frontend --

#[test]
fn test_event_serialization_shape() {
    let event = SessionEvent::JobProgress(generation_session::events::JobProgressEvent {
        job_id: "job-1".to_string(),
        progress: 40,
    });
    let value = serde_json::to_value(&event).unwrap();
    assert_eq!(value["type"], "jobProgress");
    assert_eq!(value["payload"]["jobId"], "job-1");
    assert_eq!(value["payload"]["progress"], 40);
}

#[test]
fn test_status_serialization_shape() {
    let mut set = CurationSet::new();
    set.seed(vec![GeneratedItem::new(ItemPayload::Domain {
        name: "fitpulse.com".to_string(),
        available: true,
    })]);
    let value = serde_json::to_value(set.view(&ViewQuery::new()).to_vec()).unwrap();
    assert_eq!(value[0]["payload"]["kind"], "domain");
    assert_eq!(value[0]["payload"]["name"], "fitpulse.com");
    assert_eq!(value[0]["selected"], false);
    assert!(value[0]["createdAt"].is_string());
}
