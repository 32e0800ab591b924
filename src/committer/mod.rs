use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use tokio::sync::Notify;
use tokio::task::JoinHandle;

use crate::contracts::{CommitResult, Committer, LockResultExt, SinkError, StorageEngine};
use crate::metrics::CommitterMetrics;
use crate::sink::DurableSink;

/// Configuration for the background committer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitterConfig {
    /// Longest time an entry waits in the pool
    pub interval: Duration,
    /// Pool depth that triggers a commit before the interval elapses
    pub threshold: usize,
}

impl Default for CommitterConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(1000),
            threshold: 500,
        }
    }
}

impl CommitterConfig {
    /// Creates a config from environment variables.
    ///
    /// Environment variables:
    /// - `STRAND_COMMIT_INTERVAL_MS`: Commit interval in ms (default: 1000)
    /// - `STRAND_COMMIT_THRESHOLD`: Pool depth that forces a commit (default: 500)
    pub fn from_env() -> Self {
        let default = Self::default();
        let interval = std::env::var("STRAND_COMMIT_INTERVAL_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|v| *v > 0)
            .map(Duration::from_millis)
            .unwrap_or(default.interval);
        let threshold = std::env::var("STRAND_COMMIT_THRESHOLD")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .filter(|v| *v > 0)
            .unwrap_or(default.threshold);

        Self {
            interval,
            threshold,
        }
    }
}

/// Background task that commits a sink's pool on an interval, or early once
/// the pool reaches the configured depth.
///
/// A failed commit leaves the pool as it was; the next wake-up retries.
pub struct BackgroundCommitter<E>
where
    E: StorageEngine + 'static,
{
    sink: Arc<DurableSink<E>>,
    config: CommitterConfig,
    /// Flag to signal shutdown
    shutdown: Arc<AtomicBool>,
    /// Woken by the sink's depth watch and by `stop`
    wake: Arc<Notify>,
    task_handle: RwLock<Option<JoinHandle<()>>>,
    metrics: Arc<CommitterMetrics>,
}

impl<E> BackgroundCommitter<E>
where
    E: StorageEngine + 'static,
{
    pub fn new(sink: Arc<DurableSink<E>>, config: CommitterConfig) -> Self {
        Self {
            sink,
            config,
            shutdown: Arc::new(AtomicBool::new(false)),
            wake: Arc::new(Notify::new()),
            task_handle: RwLock::new(None),
            metrics: Arc::new(CommitterMetrics::default()),
        }
    }

    pub fn config(&self) -> &CommitterConfig {
        &self.config
    }

    pub fn metrics(&self) -> Arc<CommitterMetrics> {
        Arc::clone(&self.metrics)
    }

    pub fn is_running(&self) -> bool {
        self.task_handle
            .read()
            .map(|h| h.iter().any(|h| !h.is_finished()))
            .unwrap_or(false)
    }

    /// Runs `commit_pool` on the blocking pool; SQLite I/O must not stall
    /// the runtime's worker threads.
    async fn commit_blocking(sink: &Arc<DurableSink<E>>) -> Result<CommitResult, SinkError> {
        let sink = Arc::clone(sink);
        tokio::task::spawn_blocking(move || sink.commit_pool())
            .await
            .map_err(|e| SinkError::Task(e.to_string()))?
    }
}

impl<E> Committer for BackgroundCommitter<E>
where
    E: StorageEngine + 'static,
{
    async fn start(&self) -> Result<(), SinkError> {
        if self.is_running() {
            return Ok(());
        }
        self.shutdown.store(false, Ordering::SeqCst);
        self.sink
            .watch_depth(self.config.threshold, Arc::clone(&self.wake))?;

        let sink = Arc::clone(&self.sink);
        let shutdown = Arc::clone(&self.shutdown);
        let wake = Arc::clone(&self.wake);
        let metrics = Arc::clone(&self.metrics);
        let interval = self.config.interval;

        let handle = tokio::spawn(async move {
            tracing::info!(
                interval_ms = interval.as_millis() as u64,
                "Committer background task started"
            );

            loop {
                let by_threshold = tokio::select! {
                    _ = tokio::time::sleep(interval) => false,
                    _ = wake.notified() => true,
                };

                if shutdown.load(Ordering::SeqCst) {
                    tracing::info!("Committer shutdown requested");
                    break;
                }

                let failed = match Self::commit_blocking(&sink).await {
                    Ok(result) => {
                        if !result.is_empty() {
                            tracing::debug!(
                                entries = result.entries_committed,
                                remaining = result.pool_remaining,
                                by_threshold,
                                "Background commit"
                            );
                        }
                        false
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Background commit failed, will retry");
                        true
                    }
                };
                metrics.record_tick(by_threshold, failed);
            }

            tracing::info!("Committer background task stopped");
        });

        let mut task_handle = self.task_handle.write().map_lock_err()?;
        *task_handle = Some(handle);

        Ok(())
    }

    async fn stop(&self) -> Result<CommitResult, SinkError> {
        self.shutdown.store(true, Ordering::SeqCst);
        self.wake.notify_one();

        let handle = {
            let mut task_handle = self.task_handle.write().map_lock_err()?;
            task_handle.take()
        };

        if let Some(handle) = handle {
            handle.await.map_err(|e| SinkError::Task(e.to_string()))?;
        }
        self.sink.clear_depth_watch()?;

        let result = Self::commit_blocking(&self.sink).await?;
        tracing::info!(entries = result.entries_committed, "Final commit on stop");
        Ok(result)
    }

    async fn commit_now(&self) -> Result<CommitResult, SinkError> {
        Self::commit_blocking(&self.sink).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_default() {
        let config = CommitterConfig::default();
        assert_eq!(config.interval, Duration::from_secs(1));
        assert_eq!(config.threshold, 500);
    }

    #[test]
    fn from_env_reads_and_validates() {
        std::env::set_var("STRAND_COMMIT_INTERVAL_MS", "250");
        std::env::set_var("STRAND_COMMIT_THRESHOLD", "0");

        let config = CommitterConfig::from_env();
        assert_eq!(config.interval, Duration::from_millis(250));
        // Zero falls back to the default
        assert_eq!(config.threshold, 500);

        std::env::remove_var("STRAND_COMMIT_INTERVAL_MS");
        std::env::remove_var("STRAND_COMMIT_THRESHOLD");
    }
}
