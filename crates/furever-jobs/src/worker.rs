//! Retention worker: runs auto-archival and audit-log pruning on an interval.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{broadcast, mpsc};
use tokio::time::sleep;
use tracing::{error, info, instrument};

use furever_core::defaults::{EVENT_BUS_CAPACITY, RETENTION_WORKER_INTERVAL_SECS};
use furever_core::{Error, Result, RetentionReport, RetentionRepository};
use furever_db::Database;

/// Configuration for the retention worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetentionWorkerConfig {
    /// Whether the worker runs at all.
    pub enabled: bool,
    /// Seconds between runs.
    pub interval_secs: u64,
    /// Actor recorded on auto-archived records; `None` for system actions.
    pub actor_id: Option<i32>,
    /// Run once immediately instead of waiting a full interval.
    pub run_on_start: bool,
}

impl Default for RetentionWorkerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: RETENTION_WORKER_INTERVAL_SECS,
            actor_id: None,
            run_on_start: true,
        }
    }
}

impl RetentionWorkerConfig {
    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `RETENTION_WORKER_ENABLED` | `true` | Enable/disable the worker |
    /// | `RETENTION_WORKER_INTERVAL_SECS` | `86400` | Seconds between runs |
    /// | `RETENTION_WORKER_ACTOR_ID` | unset | User id recorded as the actor |
    pub fn from_env() -> Self {
        let enabled = std::env::var("RETENTION_WORKER_ENABLED")
            .map(|v| v != "false" && v != "0")
            .unwrap_or(true);

        let interval_secs = std::env::var("RETENTION_WORKER_INTERVAL_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(RETENTION_WORKER_INTERVAL_SECS)
            .max(1);

        let actor_id = std::env::var("RETENTION_WORKER_ACTOR_ID")
            .ok()
            .and_then(|v| v.parse::<i32>().ok());

        Self {
            enabled,
            interval_secs,
            actor_id,
            ..Self::default()
        }
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_interval_secs(mut self, secs: u64) -> Self {
        self.interval_secs = secs;
        self
    }

    pub fn with_actor(mut self, actor_id: Option<i32>) -> Self {
        self.actor_id = actor_id;
        self
    }

    pub fn with_run_on_start(mut self, run_on_start: bool) -> Self {
        self.run_on_start = run_on_start;
        self
    }
}

/// Event emitted by the retention worker.
#[derive(Debug, Clone, PartialEq)]
pub enum RetentionEvent {
    WorkerStarted,
    /// One pass finished.
    RunCompleted(RetentionReport),
    /// One pass aborted abnormally; the worker keeps its schedule.
    RunFailed { error: String },
    WorkerStopped,
}

/// Handle to control a running worker.
pub struct RetentionWorkerHandle {
    shutdown_tx: mpsc::Sender<()>,
    event_rx: broadcast::Receiver<RetentionEvent>,
}

impl RetentionWorkerHandle {
    /// Signal the worker to shut down gracefully.
    pub async fn shutdown(&self) -> Result<()> {
        self.shutdown_tx
            .send(())
            .await
            .map_err(|_| Error::Internal("Failed to send shutdown signal".into()))?;
        Ok(())
    }

    /// Get a receiver for worker events.
    pub fn events(&self) -> broadcast::Receiver<RetentionEvent> {
        self.event_rx.resubscribe()
    }
}

/// Worker that applies the retention policies on a fixed schedule.
pub struct RetentionWorker {
    retention: Arc<dyn RetentionRepository>,
    config: RetentionWorkerConfig,
    event_tx: broadcast::Sender<RetentionEvent>,
}

impl RetentionWorker {
    pub fn new(retention: Arc<dyn RetentionRepository>, config: RetentionWorkerConfig) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_BUS_CAPACITY);
        Self {
            retention,
            config,
            event_tx,
        }
    }

    /// Worker over a database's retention repository.
    pub fn from_database(db: &Database, config: RetentionWorkerConfig) -> Self {
        Self::new(Arc::new(db.retention.clone()), config)
    }

    /// Start the worker and return a handle for control.
    pub fn start(self) -> RetentionWorkerHandle {
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel(1);
        let event_rx = self.event_tx.subscribe();

        tokio::spawn(async move {
            self.run(&mut shutdown_rx).await;
        });

        RetentionWorkerHandle {
            shutdown_tx,
            event_rx,
        }
    }

    #[instrument(skip(self, shutdown_rx))]
    async fn run(&self, shutdown_rx: &mut mpsc::Receiver<()>) {
        if !self.config.enabled {
            info!(
                subsystem = "jobs",
                component = "retention_worker",
                "Retention worker is disabled, not starting"
            );
            return;
        }

        info!(
            subsystem = "jobs",
            component = "retention_worker",
            interval_secs = self.config.interval_secs,
            actor_id = ?self.config.actor_id,
            "Retention worker started"
        );
        let _ = self.event_tx.send(RetentionEvent::WorkerStarted);

        if self.config.run_on_start {
            self.run_once().await;
        }

        let interval = Duration::from_secs(self.config.interval_secs);
        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    info!(
                        subsystem = "jobs",
                        component = "retention_worker",
                        "Retention worker received shutdown signal"
                    );
                    break;
                }
                _ = sleep(interval) => {
                    self.run_once().await;
                }
            }
        }

        let _ = self.event_tx.send(RetentionEvent::WorkerStopped);
        info!(
            subsystem = "jobs",
            component = "retention_worker",
            "Retention worker stopped"
        );
    }

    /// One pass in its own task; a panic surfaces as `RunFailed`.
    async fn run_once(&self) {
        let start = Instant::now();
        let retention = self.retention.clone();
        let actor = self.config.actor_id;

        let event = match tokio::spawn(async move { retention.run_retention(actor).await }).await {
            Ok(report) => {
                info!(
                    subsystem = "jobs",
                    component = "retention_worker",
                    op = "run",
                    records_archived = report.records_archived(),
                    log_entries_pruned = report.log_entries_pruned,
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Retention pass complete"
                );
                RetentionEvent::RunCompleted(report)
            }
            Err(e) => {
                error!(
                    subsystem = "jobs",
                    component = "retention_worker",
                    op = "run",
                    error = ?e,
                    "Retention pass aborted"
                );
                RetentionEvent::RunFailed {
                    error: e.to_string(),
                }
            }
        };
        let _ = self.event_tx.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU64, Ordering};

    struct CountingRetention {
        runs: AtomicU64,
        panic_on_first: bool,
    }

    impl CountingRetention {
        fn new(panic_on_first: bool) -> Arc<Self> {
            Arc::new(Self {
                runs: AtomicU64::new(0),
                panic_on_first,
            })
        }
    }

    #[async_trait]
    impl RetentionRepository for CountingRetention {
        async fn auto_archive_completed_requests(&self, _actor: Option<i32>) -> u64 {
            1
        }

        async fn auto_archive_adopted_pets(&self, _actor: Option<i32>) -> u64 {
            2
        }

        async fn run_retention(&self, actor: Option<i32>) -> RetentionReport {
            let run = self.runs.fetch_add(1, Ordering::SeqCst);
            if self.panic_on_first && run == 0 {
                panic!("simulated retention failure");
            }
            RetentionReport {
                requests_archived: self.auto_archive_completed_requests(actor).await,
                pets_archived: self.auto_archive_adopted_pets(actor).await,
                log_entries_pruned: run,
            }
        }
    }

    #[test]
    fn test_worker_config_default() {
        let config = RetentionWorkerConfig::default();
        assert!(config.enabled);
        assert_eq!(config.interval_secs, 86_400);
        assert_eq!(config.actor_id, None);
        assert!(config.run_on_start);
    }

    #[test]
    fn test_worker_config_builder() {
        let config = RetentionWorkerConfig::default()
            .with_enabled(false)
            .with_interval_secs(60)
            .with_actor(Some(4))
            .with_run_on_start(false);

        assert!(!config.enabled);
        assert_eq!(config.interval_secs, 60);
        assert_eq!(config.actor_id, Some(4));
        assert!(!config.run_on_start);
    }

    #[tokio::test(start_paused = true)]
    async fn test_worker_runs_on_schedule_and_stops() {
        let retention = CountingRetention::new(false);
        let config = RetentionWorkerConfig::default().with_interval_secs(60);
        let handle = RetentionWorker::new(retention.clone(), config).start();
        let mut events = handle.events();

        assert_eq!(events.recv().await.unwrap(), RetentionEvent::WorkerStarted);
        match events.recv().await.unwrap() {
            RetentionEvent::RunCompleted(report) => {
                assert_eq!(report.records_archived(), 3);
                assert_eq!(report.log_entries_pruned, 0);
            }
            other => panic!("unexpected event {:?}", other),
        }
        match events.recv().await.unwrap() {
            RetentionEvent::RunCompleted(report) => assert_eq!(report.log_entries_pruned, 1),
            other => panic!("unexpected event {:?}", other),
        }

        handle.shutdown().await.unwrap();
        loop {
            match events.recv().await.unwrap() {
                RetentionEvent::WorkerStopped => break,
                RetentionEvent::RunCompleted(_) => continue,
                other => panic!("unexpected event {:?}", other),
            }
        }
        assert!(retention.runs.load(Ordering::SeqCst) >= 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_worker_survives_failed_run() {
        let retention = CountingRetention::new(true);
        let config = RetentionWorkerConfig::default().with_interval_secs(5);
        let handle = RetentionWorker::new(retention.clone(), config).start();
        let mut events = handle.events();

        assert_eq!(events.recv().await.unwrap(), RetentionEvent::WorkerStarted);
        assert!(matches!(
            events.recv().await.unwrap(),
            RetentionEvent::RunFailed { .. }
        ));
        assert!(matches!(
            events.recv().await.unwrap(),
            RetentionEvent::RunCompleted(_)
        ));
        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_disabled_worker_exits_without_events() {
        let retention = CountingRetention::new(false);
        let config = RetentionWorkerConfig::default().with_enabled(false);
        let handle = RetentionWorker::new(retention.clone(), config).start();
        let mut events = handle.events();

        assert!(matches!(
            events.recv().await,
            Err(broadcast::error::RecvError::Closed)
        ));
        assert_eq!(retention.runs.load(Ordering::SeqCst), 0);
    }
}
