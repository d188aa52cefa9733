use log::{error, info, warn};
use tokio::{
    sync::{broadcast, mpsc},
    task::JoinHandle,
};

use crate::{
    notify::{Notification, NotificationService},
    quote::QuoteService,
    stats::StatsStore,
};

use super::controller::SessionEvent;

/// A side effect the state machine wants performed at an interval boundary.
/// These are requests, not actions: the engine hands them to the dispatcher
/// and never blocks on (or learns about) their outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SideEffectRequest {
    NotifyBreakStart { minutes: u64 },
    NotifyFocusStart,
    RecordStat { focus_seconds: u64 },
    FetchMotivationalQuote,
}

/// Drains side-effect requests from the engine, fanning each one out as its
/// own detached task. A hung stat write or quote fetch therefore never
/// stalls the countdown, and a pause/reset after dispatch does not cancel
/// requests already in flight.
pub fn spawn_dispatcher(
    mut requests: mpsc::UnboundedReceiver<SideEffectRequest>,
    stats: StatsStore,
    notifier: NotificationService,
    quotes: QuoteService,
    events: broadcast::Sender<SessionEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(request) = requests.recv().await {
            match request {
                SideEffectRequest::RecordStat { focus_seconds } => {
                    let stats = stats.clone();
                    tokio::spawn(async move {
                        if let Err(err) = stats.record_completion(focus_seconds).await {
                            error!("Failed to record completed focus session: {err:#}");
                        }
                    });
                }
                SideEffectRequest::NotifyBreakStart { minutes } => {
                    notifier.notify(Notification::BreakStart { minutes });
                }
                SideEffectRequest::NotifyFocusStart => {
                    notifier.notify(Notification::FocusStart);
                }
                SideEffectRequest::FetchMotivationalQuote => {
                    let quotes = quotes.clone();
                    let events = events.clone();
                    tokio::spawn(async move {
                        match quotes.fetch().await {
                            Ok(quote) => {
                                let _ = events.send(SessionEvent::QuoteFetched(quote));
                            }
                            // Silent from the user's perspective; no retry.
                            Err(err) => warn!("Quote fetch failed: {err:#}"),
                        }
                    });
                }
            }
        }

        info!("Effect dispatcher shutting down");
    })
}
