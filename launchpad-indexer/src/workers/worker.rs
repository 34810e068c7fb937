use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::error::SyncError;

/// One periodic job of a network's sync engine.
#[async_trait::async_trait]
pub trait Worker: Send + Sync + 'static {
    type Stats: Clone + Default + Serialize + Send + Sync;

    fn get_name(&self) -> &'static str;

    async fn work(&self) -> Result<(), SyncError>;

    async fn get_stats(&self) -> Self::Stats;

    async fn reset(&self) {}

    /// Out-of-band wake-ups, for workers that can react to pushed chain
    /// activity between ticks.
    async fn subscribe(&self) -> Option<mpsc::Receiver<()>> {
        None
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerStats<S> {
    pub name: &'static str,
    pub executing: bool,
    pub success_count: u64,
    pub error_count: u64,
    pub last_execution_ms: Option<u64>,
    pub last_success_at: Option<DateTime<Utc>>,
    pub last_error_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub stats: S,
}

#[derive(Clone, Debug, Default)]
struct ExecutionState {
    success_count: u64,
    error_count: u64,
    last_execution_ms: Option<u64>,
    last_success_at: Option<DateTime<Utc>>,
    last_error_at: Option<DateTime<Utc>>,
    last_error: Option<String>,
}

/// Clears the executing flag however the run ends, aborts included.
struct ExecutingGuard<'a>(&'a AtomicBool);

impl Drop for ExecutingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Drives a [`Worker`] through `idle -> executing -> (success | error) -> idle`.
pub struct WorkerRunner<W: Worker> {
    worker: Arc<W>,
    tick_divider: u64,
    executing: AtomicBool,
    state: Mutex<ExecutionState>,
}

impl<W: Worker> WorkerRunner<W> {
    pub fn new(worker: W, tick_divider: u64) -> Self {
        Self {
            worker: Arc::new(worker),
            tick_divider: tick_divider.max(1),
            executing: AtomicBool::new(false),
            state: Mutex::new(ExecutionState::default()),
        }
    }

    pub fn get_worker(&self) -> &Arc<W> {
        &self.worker
    }

    pub fn is_executing(&self) -> bool {
        self.executing.load(Ordering::SeqCst)
    }

    /// Runs the worker when `tick_id` falls on its divider and no run is in
    /// flight. Returns whether it ran.
    pub async fn execute(&self, tick_id: u64) -> bool {
        if tick_id % self.tick_divider != 0 {
            return false;
        }
        if self.executing.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst).is_err()
        {
            debug!(worker = self.worker.get_name(), tick_id, "still executing, skipped");
            return false;
        }
        let _guard = ExecutingGuard(&self.executing);

        let started_at = Instant::now();
        let result = self.worker.work().await;
        let elapsed_ms = started_at.elapsed().as_millis() as u64;

        let mut state = self.state.lock().await;
        state.last_execution_ms = Some(elapsed_ms);
        match result {
            Ok(()) => {
                state.success_count += 1;
                state.last_success_at = Some(Utc::now());
            }
            Err(e) => {
                if e.is_transient() {
                    warn!(worker = self.worker.get_name(), error = %e, "worker failed");
                } else {
                    error!(worker = self.worker.get_name(), error = %e, "worker failed");
                }

                state.error_count += 1;
                state.last_error_at = Some(Utc::now());
                state.last_error = Some(e.to_string());
            }
        }

        true
    }

    /// Spawns the wake-up loop when the worker supports push notifications.
    pub async fn start(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        let mut wake_ups = self.worker.subscribe().await?;
        let runner = self.clone();

        Some(tokio::spawn(async move {
            while wake_ups.recv().await.is_some() {
                runner.execute(0).await;
            }
        }))
    }

    pub async fn reset(&self) {
        *self.state.lock().await = ExecutionState::default();
        self.worker.reset().await;
    }

    pub async fn get_stats(&self) -> WorkerStats<W::Stats> {
        let state = self.state.lock().await.clone();

        WorkerStats {
            name: self.worker.get_name(),
            executing: self.is_executing(),
            success_count: state.success_count,
            error_count: state.error_count,
            last_execution_ms: state.last_execution_ms,
            last_success_at: state.last_success_at,
            last_error_at: state.last_error_at,
            last_error: state.last_error,
            stats: self.worker.get_stats().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicU64;
    use std::time::Duration;

    use super::*;

    #[derive(Default)]
    struct CountingWorker {
        runs: AtomicU64,
        fail: AtomicBool,
    }

    #[async_trait::async_trait]
    impl Worker for CountingWorker {
        type Stats = u64;

        fn get_name(&self) -> &'static str {
            "counting"
        }

        async fn work(&self) -> Result<(), SyncError> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;

            if self.fail.load(Ordering::SeqCst) {
                Err(SyncError::Provider("unreachable".to_owned()))
            } else {
                Ok(())
            }
        }

        async fn get_stats(&self) -> u64 {
            self.runs.load(Ordering::SeqCst)
        }
    }

    #[tokio::test]
    pub async fn runs_only_on_divider_ticks() {
        let runner = WorkerRunner::new(CountingWorker::default(), 5);

        for tick_id in 0..11 {
            runner.execute(tick_id).await;
        }

        assert_eq!(runner.get_stats().await.stats, 3);
        assert_eq!(runner.get_stats().await.success_count, 3);
    }

    #[tokio::test]
    pub async fn skips_while_a_run_is_in_flight() {
        let runner = Arc::new(WorkerRunner::new(CountingWorker::default(), 1));

        let (first, second) = tokio::join!(runner.execute(0), runner.execute(0));

        assert!(first ^ second);
        assert_eq!(runner.get_stats().await.stats, 1);
        assert!(!runner.is_executing());
    }

    #[tokio::test]
    pub async fn records_errors_and_resets() {
        let runner = WorkerRunner::new(CountingWorker::default(), 1);
        runner.get_worker().fail.store(true, Ordering::SeqCst);

        runner.execute(0).await;

        let stats = runner.get_stats().await;
        assert_eq!(stats.error_count, 1);
        assert!(stats.last_error.unwrap().contains("unreachable"));
        assert!(stats.last_error_at.is_some());

        runner.reset().await;
        assert_eq!(runner.get_stats().await.error_count, 0);
    }
}
