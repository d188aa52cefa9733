use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use log::{debug, error, info};
use serde::Serialize;
use tokio::{
    sync::{broadcast, mpsc, Mutex},
    task::JoinHandle,
    time,
};

use crate::{config::ConfigStore, notify::Notification, quote::Quote};

use super::{
    effects::SideEffectRequest,
    progress,
    resolver::{resolve, MS_PER_MINUTE},
    state::{IntervalKind, SessionState, SessionStatus},
    EngineError,
};

pub const EVENT_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub state: SessionState,
    pub remaining_ms: u64,
    pub progress: u8,
}

/// Everything observers get to see. Snapshots and ticks come from the
/// controller itself; notifications and quotes arrive via the effect
/// dispatcher. Slow subscribers lag and drop, they never stall the engine.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionEvent {
    StateChanged(SessionSnapshot),
    #[serde(rename_all = "camelCase")]
    Tick { remaining_ms: u64, progress: u8 },
    Notification(Notification),
    QuoteFetched(Quote),
}

/// The session state machine. Owns the single `SessionState`, drives the
/// one-second countdown ticker, and emits side-effect requests at interval
/// boundaries. All mutation goes through one async mutex, so ticks and user
/// commands never interleave mid-transition.
#[derive(Clone)]
pub struct SessionController {
    state: Arc<Mutex<SessionState>>,
    config: Arc<ConfigStore>,
    effects: mpsc::UnboundedSender<SideEffectRequest>,
    events: broadcast::Sender<SessionEvent>,
    ticker: Arc<Mutex<Option<JoinHandle<()>>>>,
    tick_interval: Duration,
}

impl SessionController {
    pub fn new(
        config: Arc<ConfigStore>,
        effects: mpsc::UnboundedSender<SideEffectRequest>,
        events: broadcast::Sender<SessionEvent>,
    ) -> Self {
        Self::with_tick_interval(config, effects, events, Duration::from_secs(1))
    }

    fn with_tick_interval(
        config: Arc<ConfigStore>,
        effects: mpsc::UnboundedSender<SideEffectRequest>,
        events: broadcast::Sender<SessionEvent>,
        tick_interval: Duration,
    ) -> Self {
        let initial_total = resolve(IntervalKind::Focus, 0, &config.read());
        Self {
            state: Arc::new(Mutex::new(SessionState::new(initial_total))),
            config,
            effects,
            events,
            ticker: Arc::new(Mutex::new(None)),
            tick_interval,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        let mut guard = self.state.lock().await;
        guard.sync_remaining_from_anchor();
        snapshot_of(&guard)
    }

    /// Starts the armed interval, or resumes a paused one from its exact
    /// remaining time. Starting while already running is an error and leaves
    /// the state untouched.
    pub async fn start(&self) -> Result<SessionSnapshot, EngineError> {
        {
            let mut state = self.state.lock().await;
            if state.status == SessionStatus::Running {
                return Err(EngineError::AlreadyRunning);
            }
            state.begin_running(Instant::now());
        }

        self.spawn_ticker().await;
        Ok(self.emit_state_changed().await)
    }

    /// Freezes the countdown at its current remaining time. No-op unless
    /// running.
    pub async fn pause(&self) {
        {
            let mut state = self.state.lock().await;
            if state.status != SessionStatus::Running {
                debug!("Pause ignored: no running countdown");
                return;
            }
            state.pause();
        }

        self.cancel_ticker().await;
        self.emit_state_changed().await;
    }

    /// Cancels the countdown and re-arms the current interval at its full
    /// duration. No side effects fire. No-op while idle.
    pub async fn reset(&self) {
        {
            let mut state = self.state.lock().await;
            if state.status == SessionStatus::Idle {
                debug!("Reset ignored: no active interval");
                return;
            }
            let kind = state.kind;
            let total_ms = state.total_ms;
            state.rearm(kind, total_ms);
        }

        self.cancel_ticker().await;
        self.emit_state_changed().await;
    }

    /// Priority override for re-entry signals ("begin break now" / "begin
    /// focus now"): preempts whatever interval is active without running its
    /// completion algorithm, forces `kind` with a freshly resolved duration,
    /// and starts it immediately.
    pub async fn begin_interval(&self, kind: IntervalKind) -> SessionSnapshot {
        self.cancel_ticker().await;

        {
            let mut state = self.state.lock().await;
            let total_ms = resolve(kind, state.completed_focus_sessions, &self.config.read());
            state.rearm(kind, total_ms);
            state.begin_running(Instant::now());
        }

        self.spawn_ticker().await;
        self.emit_state_changed().await
    }

    async fn spawn_ticker(&self) {
        let mut ticker_guard = self.ticker.lock().await;
        if let Some(handle) = ticker_guard.take() {
            handle.abort();
        }

        let state = self.state.clone();
        let config = self.config.clone();
        let effects = self.effects.clone();
        let events = self.events.clone();
        let tick_interval = self.tick_interval;

        let handle = tokio::spawn(async move {
            let mut interval = time::interval(tick_interval);
            loop {
                interval.tick().await;

                let (remaining, total) = {
                    let mut guard = state.lock().await;
                    if guard.status != SessionStatus::Running {
                        break;
                    }
                    guard.sync_remaining_from_anchor();
                    (guard.remaining_ms, guard.total_ms)
                };

                if remaining == 0 {
                    let (finished, snapshot, requests) = {
                        let mut guard = state.lock().await;
                        // A pause/reset may have won the race since the
                        // first lock; completion must not fire for it.
                        if guard.status != SessionStatus::Running {
                            break;
                        }
                        let finished = guard.kind;
                        let requests = guard.complete_interval(&config.read());
                        (finished, snapshot_of(&guard), requests)
                    };

                    info!(
                        "{} interval complete; {} armed for {} min",
                        finished.as_str(),
                        snapshot.state.kind.as_str(),
                        snapshot.state.total_ms / MS_PER_MINUTE,
                    );

                    for request in requests {
                        if effects.send(request).is_err() {
                            error!("Effect dispatcher is gone; dropping side-effect request");
                        }
                    }

                    let _ = events.send(SessionEvent::StateChanged(snapshot));
                    break;
                }

                let _ = events.send(SessionEvent::Tick {
                    remaining_ms: remaining,
                    progress: progress::project(remaining, total),
                });
            }
        });

        *ticker_guard = Some(handle);
    }

    async fn cancel_ticker(&self) {
        if let Some(handle) = self.ticker.lock().await.take() {
            handle.abort();
        }
    }

    async fn emit_state_changed(&self) -> SessionSnapshot {
        let mut guard = self.state.lock().await;
        guard.sync_remaining_from_anchor();
        let snapshot = snapshot_of(&guard);
        let _ = self
            .events
            .send(SessionEvent::StateChanged(snapshot.clone()));
        snapshot
    }

    #[cfg(test)]
    async fn arm_for_test(&self, kind: IntervalKind, total_ms: u64) {
        let mut state = self.state.lock().await;
        state.rearm(kind, total_ms);
    }
}

fn snapshot_of(state: &SessionState) -> SessionSnapshot {
    SessionSnapshot {
        remaining_ms: state.remaining_ms,
        progress: progress::project(state.remaining_ms, state.total_ms),
        state: state.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    struct Harness {
        controller: SessionController,
        effects_rx: mpsc::UnboundedReceiver<SideEffectRequest>,
        events_tx: broadcast::Sender<SessionEvent>,
        _dir: TempDir,
    }

    fn harness(tick_interval: Duration) -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let config = Arc::new(ConfigStore::new(dir.path().join("config.json")).unwrap());
        let (events_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let (effects_tx, effects_rx) = mpsc::unbounded_channel();
        let controller = SessionController::with_tick_interval(
            config,
            effects_tx,
            events_tx.clone(),
            tick_interval,
        );
        Harness {
            controller,
            effects_rx,
            events_tx,
            _dir: dir,
        }
    }

    async fn wait_until_idle(controller: &SessionController) -> SessionSnapshot {
        for _ in 0..200 {
            let snapshot = controller.snapshot().await;
            if snapshot.state.status == SessionStatus::Idle {
                return snapshot;
            }
            time::sleep(Duration::from_millis(10)).await;
        }
        panic!("countdown never completed");
    }

    #[tokio::test]
    async fn initial_snapshot_is_armed_focus() {
        let h = harness(Duration::from_secs(1));
        let snapshot = h.controller.snapshot().await;

        assert_eq!(snapshot.state.kind, IntervalKind::Focus);
        assert_eq!(snapshot.state.status, SessionStatus::Idle);
        assert_eq!(snapshot.state.total_ms, 25 * MS_PER_MINUTE);
        assert_eq!(snapshot.remaining_ms, snapshot.state.total_ms);
        assert_eq!(snapshot.progress, 100);
    }

    #[tokio::test]
    async fn double_start_reports_already_running() {
        let h = harness(Duration::from_secs(1));

        let started = h.controller.start().await.unwrap();
        assert_eq!(started.state.status, SessionStatus::Running);

        assert_eq!(
            h.controller.start().await.unwrap_err(),
            EngineError::AlreadyRunning
        );
        assert_eq!(
            h.controller.snapshot().await.state.status,
            SessionStatus::Running
        );
    }

    #[tokio::test]
    async fn pause_then_resume_keeps_exact_remaining() {
        let h = harness(Duration::from_secs(1));

        h.controller.start().await.unwrap();
        time::sleep(Duration::from_millis(30)).await;
        h.controller.pause().await;

        let frozen = h.controller.snapshot().await;
        assert_eq!(frozen.state.status, SessionStatus::Paused);
        assert!(frozen.remaining_ms < frozen.state.total_ms);

        // Paused time does not leak into the countdown.
        time::sleep(Duration::from_millis(50)).await;
        assert_eq!(
            h.controller.snapshot().await.remaining_ms,
            frozen.remaining_ms
        );

        let resumed = h.controller.start().await.unwrap();
        assert_eq!(resumed.state.status, SessionStatus::Running);
        assert!(resumed.remaining_ms <= frozen.remaining_ms);
        assert!(resumed.remaining_ms >= frozen.remaining_ms.saturating_sub(20));
    }

    #[tokio::test]
    async fn pause_and_reset_while_idle_are_noops() {
        let h = harness(Duration::from_secs(1));

        h.controller.pause().await;
        h.controller.reset().await;

        let snapshot = h.controller.snapshot().await;
        assert_eq!(snapshot.state.status, SessionStatus::Idle);
        assert_eq!(snapshot.remaining_ms, snapshot.state.total_ms);
    }

    #[tokio::test]
    async fn reset_restores_full_interval_without_side_effects() {
        let mut h = harness(Duration::from_secs(1));

        h.controller.start().await.unwrap();
        time::sleep(Duration::from_millis(30)).await;
        h.controller.reset().await;

        let snapshot = h.controller.snapshot().await;
        assert_eq!(snapshot.state.status, SessionStatus::Idle);
        assert_eq!(snapshot.state.kind, IntervalKind::Focus);
        assert_eq!(snapshot.remaining_ms, 25 * MS_PER_MINUTE);
        assert_eq!(snapshot.state.completed_focus_sessions, 0);
        assert!(h.effects_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn completion_fires_effects_and_arms_break() {
        let mut h = harness(Duration::from_millis(10));
        let mut events = h.events_tx.subscribe();

        h.controller
            .arm_for_test(IntervalKind::Focus, 80)
            .await;
        h.controller.start().await.unwrap();

        let snapshot = wait_until_idle(&h.controller).await;
        assert_eq!(snapshot.state.kind, IntervalKind::ShortBreak);
        assert_eq!(snapshot.state.completed_focus_sessions, 1);
        assert_eq!(snapshot.state.total_ms, 5 * MS_PER_MINUTE);
        assert_eq!(snapshot.remaining_ms, snapshot.state.total_ms);
        assert_eq!(snapshot.progress, 100);

        assert_eq!(
            h.effects_rx.recv().await,
            Some(SideEffectRequest::RecordStat { focus_seconds: 0 })
        );
        assert_eq!(
            h.effects_rx.recv().await,
            Some(SideEffectRequest::FetchMotivationalQuote)
        );
        assert_eq!(
            h.effects_rx.recv().await,
            Some(SideEffectRequest::NotifyBreakStart { minutes: 5 })
        );

        // The event stream saw the armed-break snapshot exactly once.
        let mut completions = 0;
        while let Ok(event) = events.try_recv() {
            if let SessionEvent::StateChanged(s) = event {
                if s.state.status == SessionStatus::Idle
                    && s.state.kind == IntervalKind::ShortBreak
                {
                    completions += 1;
                }
            }
        }
        assert_eq!(completions, 1);
    }

    #[tokio::test]
    async fn break_completion_does_not_record_stats() {
        let mut h = harness(Duration::from_millis(10));

        h.controller
            .arm_for_test(IntervalKind::ShortBreak, 60)
            .await;
        h.controller.start().await.unwrap();

        let snapshot = wait_until_idle(&h.controller).await;
        assert_eq!(snapshot.state.kind, IntervalKind::Focus);
        assert_eq!(snapshot.state.completed_focus_sessions, 0);

        assert_eq!(
            h.effects_rx.recv().await,
            Some(SideEffectRequest::NotifyFocusStart)
        );
        assert!(h.effects_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn override_preempts_without_running_completion() {
        let mut h = harness(Duration::from_secs(1));

        h.controller.start().await.unwrap();
        let snapshot = h.controller.begin_interval(IntervalKind::LongBreak).await;

        assert_eq!(snapshot.state.kind, IntervalKind::LongBreak);
        assert_eq!(snapshot.state.status, SessionStatus::Running);
        assert_eq!(snapshot.state.total_ms, 15 * MS_PER_MINUTE);
        assert_eq!(snapshot.state.completed_focus_sessions, 0);
        assert!(h.effects_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn override_works_from_idle_and_paused() {
        let h = harness(Duration::from_secs(1));

        let snapshot = h.controller.begin_interval(IntervalKind::ShortBreak).await;
        assert_eq!(snapshot.state.status, SessionStatus::Running);
        assert_eq!(snapshot.state.total_ms, 5 * MS_PER_MINUTE);

        h.controller.pause().await;
        let snapshot = h.controller.begin_interval(IntervalKind::Focus).await;
        assert_eq!(snapshot.state.status, SessionStatus::Running);
        assert_eq!(snapshot.state.kind, IntervalKind::Focus);
        assert_eq!(snapshot.remaining_ms, 25 * MS_PER_MINUTE);
    }
}
