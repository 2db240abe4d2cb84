use std::sync::Arc;
use std::time::Duration;

use reminder_engine::alarm::LogPresenter;
use reminder_engine::guard::SteadyHost;
use reminder_engine::reminder::now_millis;
use reminder_engine::store::MemoryStore;
use reminder_engine::{EngineConfig, EngineDeps, Reminder, ReminderEngine, RepeatMode};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let owner = std::env::var("REMINDER_OWNER").unwrap_or_else(|_| "demo-user".to_string());

    let first_delay_secs: u64 = std::env::var("REMINDER_DEMO_DELAY_SECS")
        .unwrap_or_else(|_| "10".to_string())
        .parse()
        .unwrap_or(10);

    eprintln!("⏰ Reminder Engine v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Owner: {}", owner);
    eprintln!("   First demo alarm in {}s. Ctrl-C to exit.\n", first_delay_secs);

    // Seed a couple of demo reminders into the in-memory store.
    let store = Arc::new(MemoryStore::new());
    let now = now_millis();

    let mut soon = Reminder::new(
        "demo-oneshot",
        &owner,
        "Stand up",
        "Stretch for a minute",
        now + (first_delay_secs as i64) * 1_000,
    );
    soon.snooze_minutes = 1;
    store.insert(soon).await;

    let mut daily = Reminder::new(
        "demo-daily",
        &owner,
        "Drink water",
        "A glass of water, every day",
        now + (first_delay_secs as i64) * 1_000 + 5_000,
    );
    daily.repeat_mode = RepeatMode::Daily;
    store.insert(daily).await;

    let config = EngineConfig {
        // Tight ticks so the demo's backup path is visible within seconds.
        queue_tick: Duration::from_secs(2),
        ..EngineConfig::default()
    };

    let engine = ReminderEngine::new(
        config,
        EngineDeps {
            store,
            presenter: Arc::new(LogPresenter),
            host: Arc::new(SteadyHost),
        },
        &owner,
    );

    let mut events = engine.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            if let Ok(json) = serde_json::to_string(&event) {
                tracing::debug!("event: {}", json);
            }
        }
    });

    engine.start().await?;

    tokio::signal::ctrl_c().await?;
    eprintln!("\nShutting down.");
    engine.stop().await;
    Ok(())
}
