use log::info;
use serde::Serialize;
use tokio::sync::broadcast;

use crate::engine::SessionEvent;

/// A user-facing alert raised at an interval boundary.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum Notification {
    BreakStart { minutes: u64 },
    FocusStart,
}

impl Notification {
    pub fn title(&self) -> &'static str {
        match self {
            Notification::BreakStart { .. } => "Focus Session Complete!",
            Notification::FocusStart => "Break's Over!",
        }
    }

    pub fn body(&self) -> String {
        match self {
            Notification::BreakStart { minutes } => {
                format!("Time for a {minutes}-minute break.")
            }
            Notification::FocusStart => "Time to get back to focus.".to_string(),
        }
    }
}

/// Delivers alerts to whoever is observing the session event stream. The
/// engine never waits for delivery confirmation; a send with no subscribers
/// is simply dropped.
#[derive(Clone)]
pub struct NotificationService {
    events: broadcast::Sender<SessionEvent>,
}

impl NotificationService {
    pub fn new(events: broadcast::Sender<SessionEvent>) -> Self {
        Self { events }
    }

    pub fn notify(&self, notification: Notification) {
        info!("{}: {}", notification.title(), notification.body());
        let _ = self.events.send(SessionEvent::Notification(notification));
    }
}
