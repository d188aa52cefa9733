use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::config::TimerConfig;

use super::effects::SideEffectRequest;
use super::resolver::{next_break_kind, resolve, MS_PER_MINUTE};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum IntervalKind {
    Focus,
    ShortBreak,
    LongBreak,
}

impl IntervalKind {
    pub fn is_break(&self) -> bool {
        matches!(self, IntervalKind::ShortBreak | IntervalKind::LongBreak)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            IntervalKind::Focus => "Focus",
            IntervalKind::ShortBreak => "ShortBreak",
            IntervalKind::LongBreak => "LongBreak",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SessionStatus {
    Idle,
    Running,
    Paused,
}

impl Default for SessionStatus {
    fn default() -> Self {
        SessionStatus::Idle
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    pub kind: IntervalKind,
    pub status: SessionStatus,
    pub total_ms: u64,
    pub remaining_ms: u64,
    pub completed_focus_sessions: u32,
    /// Remaining time at the last (re)start; combines with `running_anchor`
    /// to compute the true remaining duration.
    #[serde(skip)]
    pub remaining_ms_baseline: u64,
    #[serde(skip)]
    pub running_anchor: Option<Instant>,
}

impl SessionState {
    pub fn new(total_ms: u64) -> Self {
        Self {
            kind: IntervalKind::Focus,
            status: SessionStatus::Idle,
            total_ms,
            remaining_ms: total_ms,
            completed_focus_sessions: 0,
            remaining_ms_baseline: total_ms,
            running_anchor: None,
        }
    }

    pub fn current_remaining_ms(&self) -> u64 {
        if let (SessionStatus::Running, Some(anchor)) = (self.status, self.running_anchor) {
            self.remaining_ms_baseline
                .saturating_sub(anchor.elapsed().as_millis() as u64)
        } else {
            self.remaining_ms
        }
    }

    pub fn sync_remaining_from_anchor(&mut self) {
        if let (SessionStatus::Running, Some(anchor)) = (self.status, self.running_anchor) {
            self.remaining_ms = self
                .remaining_ms_baseline
                .saturating_sub(anchor.elapsed().as_millis() as u64);
        }
    }

    /// Starts (or resumes) the countdown from whatever `remaining_ms`
    /// currently holds. The anchor is taken at `now`, so a paused interval
    /// picks up exactly where it left off.
    pub fn begin_running(&mut self, now: Instant) {
        self.remaining_ms_baseline = self.remaining_ms;
        self.running_anchor = Some(now);
        self.status = SessionStatus::Running;
    }

    pub fn pause(&mut self) {
        self.sync_remaining_from_anchor();
        self.running_anchor = None;
        self.remaining_ms_baseline = self.remaining_ms;
        self.status = SessionStatus::Paused;
    }

    /// Arms a fresh interval of `kind`: Idle, full remaining time, no anchor.
    pub fn rearm(&mut self, kind: IntervalKind, total_ms: u64) {
        self.kind = kind;
        self.total_ms = total_ms;
        self.remaining_ms = total_ms;
        self.remaining_ms_baseline = total_ms;
        self.running_anchor = None;
        self.status = SessionStatus::Idle;
    }

    /// The interval-completion algorithm. Fires once per interval, when the
    /// countdown reaches zero:
    /// - a completed Focus interval bumps the counter, requests a stat write
    ///   and a quote fetch, and arms the short or long break the counter
    ///   selects;
    /// - a completed break arms the next Focus interval.
    /// The next interval is armed but not started.
    pub fn complete_interval(&mut self, config: &TimerConfig) -> Vec<SideEffectRequest> {
        let mut requests = Vec::new();

        if self.kind == IntervalKind::Focus {
            self.completed_focus_sessions += 1;
            requests.push(SideEffectRequest::RecordStat {
                focus_seconds: self.total_ms / 1000,
            });
            requests.push(SideEffectRequest::FetchMotivationalQuote);

            let next = next_break_kind(self.completed_focus_sessions);
            let total_ms = resolve(next, self.completed_focus_sessions, config);
            requests.push(SideEffectRequest::NotifyBreakStart {
                minutes: total_ms / MS_PER_MINUTE,
            });
            self.rearm(next, total_ms);
        } else {
            let total_ms = resolve(IntervalKind::Focus, self.completed_focus_sessions, config);
            requests.push(SideEffectRequest::NotifyFocusStart);
            self.rearm(IntervalKind::Focus, total_ms);
        }

        requests
    }
}
