pub mod config;
pub mod engine;
pub mod notify;
pub mod quote;
pub mod stats;

pub use config::{ConfigStore, TimerConfig};
pub use engine::{
    next_break_kind, project, resolve, spawn_dispatcher, EngineError, IntervalKind,
    SessionController, SessionEvent, SessionSnapshot, SessionState, SessionStatus,
    SideEffectRequest, EVENT_CHANNEL_CAPACITY, MS_PER_MINUTE,
};
pub use notify::{Notification, NotificationService};
pub use quote::{Quote, QuoteService};
pub use stats::{StatsStore, StatsTotals};
