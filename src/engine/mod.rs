pub mod controller;
pub mod effects;
pub mod progress;
pub mod resolver;
pub mod state;

pub use controller::{SessionController, SessionEvent, SessionSnapshot, EVENT_CHANNEL_CAPACITY};
pub use effects::{spawn_dispatcher, SideEffectRequest};
pub use progress::project;
pub use resolver::{next_break_kind, resolve, MS_PER_MINUTE};
pub use state::{IntervalKind, SessionState, SessionStatus};

use thiserror::Error;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum EngineError {
    /// `start` was called while the countdown was already running. Callers
    /// must pause or reset first; the state is left untouched. Pause and
    /// reset without an active interval are no-ops, and invalid configured
    /// durations are clamped at resolve time, so neither is an error here.
    #[error("countdown already running")]
    AlreadyRunning,
}
