use std::sync::Arc;

use anyhow::Result;
use focustimer::{
    next_break_kind, spawn_dispatcher, ConfigStore, IntervalKind, NotificationService,
    QuoteService, SessionController, SessionEvent, SessionSnapshot, SessionStatus, StatsStore,
    EVENT_CHANNEL_CAPACITY,
};
use log::info;
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::{broadcast, mpsc},
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging (reads RUST_LOG env var)
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    info!("FocusTimer starting up...");

    let data_dir = dirs::data_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("focustimer");
    std::fs::create_dir_all(&data_dir)?;

    let config = Arc::new(ConfigStore::new(data_dir.join("config.json"))?);
    let stats = StatsStore::new(data_dir.join("focustimer.sqlite3"))?;

    let (events_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
    let (effects_tx, effects_rx) = mpsc::unbounded_channel();

    let notifier = NotificationService::new(events_tx.clone());
    spawn_dispatcher(
        effects_rx,
        stats.clone(),
        notifier,
        QuoteService::new(),
        events_tx.clone(),
    );

    let controller = SessionController::new(config, effects_tx, events_tx.clone());

    let mut events = events_tx.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => render_event(event),
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    println!("FocusTimer commands: start, pause, reset, focus, break, status, stats, quit");
    render_snapshot(&controller.snapshot().await);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match line.trim() {
            "" => {}
            "start" => match controller.start().await {
                Ok(snapshot) => render_snapshot(&snapshot),
                Err(err) => println!("{err}"),
            },
            "pause" => controller.pause().await,
            "reset" => controller.reset().await,
            "focus" => {
                controller.begin_interval(IntervalKind::Focus).await;
            }
            "break" => {
                // Same break the cycle would pick next, based on the counter.
                let completed = controller.snapshot().await.state.completed_focus_sessions;
                controller.begin_interval(next_break_kind(completed)).await;
            }
            "status" => render_snapshot(&controller.snapshot().await),
            "stats" => match stats.totals().await {
                Ok(totals) => {
                    let hours = totals.total_focus_seconds / 3600;
                    let minutes = (totals.total_focus_seconds % 3600) / 60;
                    println!(
                        "Total focus time: {hours}h {minutes}m | Sessions completed: {}",
                        totals.sessions_completed
                    );
                }
                Err(err) => println!("Failed to load stats: {err:#}"),
            },
            "quit" | "exit" => break,
            other => println!("Unknown command: {other}"),
        }
    }

    Ok(())
}

fn format_clock(remaining_ms: u64) -> String {
    let minutes = (remaining_ms / 1000) / 60;
    let seconds = (remaining_ms / 1000) % 60;
    format!("{minutes:02}:{seconds:02}")
}

fn render_snapshot(snapshot: &SessionSnapshot) {
    let status = match snapshot.state.status {
        SessionStatus::Idle => "armed",
        SessionStatus::Running => "running",
        SessionStatus::Paused => "paused",
    };
    println!(
        "[{} | {status}] {} ({}%)",
        snapshot.state.kind.as_str(),
        format_clock(snapshot.remaining_ms),
        snapshot.progress
    );
}

fn render_event(event: SessionEvent) {
    match event {
        SessionEvent::Tick {
            remaining_ms,
            progress,
        } => println!("{} ({progress}%)", format_clock(remaining_ms)),
        SessionEvent::StateChanged(snapshot) => render_snapshot(&snapshot),
        SessionEvent::Notification(notification) => {
            println!("*** {}: {}", notification.title(), notification.body());
        }
        SessionEvent::QuoteFetched(quote) => {
            println!("\"{}\" - {}", quote.quote, quote.author);
        }
    }
}
