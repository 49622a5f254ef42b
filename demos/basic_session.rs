use std::time::Duration;

use generation_session::*;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let catalog = PromptCatalog::new(vec![
        Prompt::new("tech", "Create a domain name for a tech startup focusing on AI")
            .with_tag("domain"),
        Prompt::new("fitness", "Generate a catchy domain for a fitness app")
            .with_tag("domain"),
        Prompt::new("coffee", "Design a logo for a coffee shop called 'Bean Haven'")
            .with_tag("logo"),
    ]);

    let config = SessionConfig::builder()
        .with_tick_interval(Duration::from_millis(100))
        .build();
    let session = GenerationSession::new(catalog, SimulatedGenerator::new(), config);

    // Print progress as it arrives
    let mut events = session.subscribe();
    let printer = tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                SessionEvent::JobProgress(e) => println!("  progress {}%", e.progress),
                SessionEvent::JobCompleted(e) => println!("  {} items generated", e.item_count),
                SessionEvent::JobCancelled(e) => println!("  cancelled at {}%", e.progress),
                _ => {}
            }
        }
    });

    let bound = session.bind("fitness")?;
    println!("Bound prompt: {}", bound.text);

    println!("Generating 5 domains...");
    session.start(GenerationKind::Domain, 5)?;
    session.wait_for_job().await?;

    println!("Starting a logo job and cancelling it...");
    session.bind("coffee")?;
    session.start(GenerationKind::Logo, 4)?;
    tokio::time::sleep(Duration::from_millis(350)).await;
    session.cancel()?;

    let removed = session.remove_unavailable();
    println!("Removed {} taken domains", removed);

    session.set_all_selected(true);
    session.bulk_add_tag("shortlist");

    let status = session.status();
    println!(
        "\n{} items ({} selected), last job {}",
        status.total, status.selected, status.job.status
    );
    for item in session.selected_items() {
        let tags: Vec<_> = item.tags().iter().map(String::as_str).collect();
        println!("  {} [{}]", item.label(), tags.join(", "));
    }

    drop(session);
    let _ = printer.await;
    Ok(())
}
