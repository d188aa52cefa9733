use std::{
    convert::TryFrom,
    path::PathBuf,
    sync::{mpsc, Arc, Mutex},
    thread::{self, JoinHandle},
};

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use log::{error, info};
use rusqlite::{params, Connection};
use serde::Serialize;
use tokio::sync::oneshot;
use uuid::Uuid;

mod migrations;

use migrations::run_migrations;

type StatsTask = Box<dyn FnOnce(&mut Connection) + Send + 'static>;

enum StatsCommand {
    Execute(StatsTask),
    Shutdown,
}

struct StatsStoreInner {
    sender: mpsc::Sender<StatsCommand>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for StatsStoreInner {
    fn drop(&mut self) {
        let mut guard = match self.worker.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if let Some(handle) = guard.take() {
            if let Err(err) = self.sender.send(StatsCommand::Shutdown) {
                error!("Failed to send shutdown to stats thread: {err}");
            }
            if let Err(join_err) = handle.join() {
                error!("Failed to join stats thread: {join_err:?}");
            }
        }
    }
}

fn to_i64(value: u64) -> Result<i64> {
    i64::try_from(value).map_err(|_| anyhow!("value {value} exceeds SQLite INTEGER range"))
}

fn to_u64(value: i64) -> Result<u64> {
    u64::try_from(value).map_err(|_| anyhow!("value {value} is negative"))
}

/// Cumulative focus totals, as rendered by the stats screen.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StatsTotals {
    pub total_focus_seconds: u64,
    pub sessions_completed: u64,
}

/// Persists one row per completed focus session and aggregates the
/// cumulative totals. SQLite lives on a dedicated worker thread; callers
/// hand it closures over an mpsc channel and await the reply.
#[derive(Clone)]
pub struct StatsStore {
    inner: Arc<StatsStoreInner>,
}

impl StatsStore {
    pub fn new(db_path: PathBuf) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("failed to create stats directory {}", parent.display())
            })?;
        }

        let (command_tx, command_rx) = mpsc::channel::<StatsCommand>();
        let (ready_tx, ready_rx) = mpsc::channel();
        let path_for_thread = db_path.clone();

        let worker = thread::Builder::new()
            .name("focustimer-stats".into())
            .spawn(move || {
                let mut conn = match Connection::open(&path_for_thread) {
                    Ok(connection) => connection,
                    Err(err) => {
                        let _ = ready_tx.send(Err(anyhow::Error::new(err)
                            .context("failed to open stats database")));
                        return;
                    }
                };

                if let Err(err) = conn.pragma_update(None, "journal_mode", "WAL") {
                    error!("Failed to enable WAL mode: {err}");
                }

                let init_result =
                    run_migrations(&mut conn).context("failed to run stats migrations");
                if ready_tx.send(init_result).is_err() {
                    error!("Stats initialization receiver dropped before ready signal");
                    return;
                }

                while let Ok(command) = command_rx.recv() {
                    match command {
                        StatsCommand::Execute(task) => {
                            task(&mut conn);
                        }
                        StatsCommand::Shutdown => break,
                    }
                }

                info!("Stats thread shutting down");
            })
            .with_context(|| "failed to spawn stats worker thread")?;

        ready_rx
            .recv()
            .context("stats worker exited before signaling readiness")??;

        info!("Stats store initialized at {}", db_path.display());

        Ok(Self {
            inner: Arc::new(StatsStoreInner {
                sender: command_tx,
                worker: Mutex::new(Some(worker)),
            }),
        })
    }

    async fn execute<F, T>(&self, task: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let sender = self.inner.sender.clone();
        let (reply_tx, reply_rx) = oneshot::channel();

        let command = StatsCommand::Execute(Box::new(move |conn| {
            let result = task(conn);
            if reply_tx.send(result).is_err() {
                error!("Stats caller dropped before receiving result");
            }
        }));

        sender
            .send(command)
            .map_err(|err| anyhow!("failed to send command to stats thread: {err}"))?;

        reply_rx
            .await
            .map_err(|_| anyhow!("stats thread terminated unexpectedly"))?
    }

    /// Appends one completion: cumulative focus time grows by
    /// `focus_seconds` and the completed-session count by one. Retry policy
    /// is the caller's concern, not the store's.
    pub async fn record_completion(&self, focus_seconds: u64) -> Result<()> {
        let id = Uuid::new_v4().to_string();
        let completed_at = Utc::now();

        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO completions (id, focus_seconds, completed_at)
                 VALUES (?1, ?2, ?3)",
                params![id, to_i64(focus_seconds)?, completed_at.to_rfc3339()],
            )
            .with_context(|| "failed to insert completion")?;
            Ok(())
        })
        .await
    }

    pub async fn totals(&self) -> Result<StatsTotals> {
        self.execute(|conn| {
            let (focus_seconds, sessions): (i64, i64) = conn.query_row(
                "SELECT COALESCE(SUM(focus_seconds), 0), COUNT(*) FROM completions",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )?;

            Ok(StatsTotals {
                total_focus_seconds: to_u64(focus_seconds)?,
                sessions_completed: to_u64(sessions)?,
            })
        })
        .await
    }
}
