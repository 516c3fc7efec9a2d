//! RecoveryWorker - recovery queue を処理するループ
//!
//! # フロー
//! 1. QueueStore::blocking_pop() で payload 取得（デコード失敗はスキップ）
//! 2. `retry_count:<id>` を読む（なければ 0）
//! 3. limit 以上: recovery queue から削除して終了（監査ログなし）
//! 4. limit 未満:
//!    - SingleShot: 監査ログ（recovery-processing）→ counter を INCR
//!    - Requeue: placeholder が残っていれば後回し。なければ再実行 →
//!      監査ログ → INCR → 失敗かつ limit 未満なら placeholder を書いて再 push
//!    - 再 push に失敗したら 1 回だけ再試行し、だめなら primary queue に戻す
//!
//! counter の読み取りと INCR の間はアトミックではない。
//! 途中で落ちると 1 回分多く試行されうる（at-least-once）。

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use super::config::{QueueConfig, RecoveryMode};
use super::worker_group::{Worker, idle};
use crate::domain::{AuditRecord, PollingStatus, PollingTask, TaskState};
use crate::error::PollqError;
use crate::ports::{AuditSink, QueueStore, TaskProcessor};

/// What one recovery iteration did with the popped task.
///
/// `attempts` is the retry counter after the iteration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecoveryOutcome {
    /// Attempt audited; the task leaves the queue system.
    Recorded { task: PollingTask, attempts: u64 },

    /// Attempt failed again and the task was pushed back (requeue mode).
    Requeued { task: PollingTask, attempts: u64 },

    /// Placeholder still live, pushed back untouched (requeue mode).
    Deferred { task: PollingTask },

    /// Retry limit reached; the task is dropped for good.
    Abandoned { task: PollingTask, attempts: u64 },
}

impl RecoveryOutcome {
    pub fn task(&self) -> &PollingTask {
        match self {
            RecoveryOutcome::Recorded { task, .. }
            | RecoveryOutcome::Requeued { task, .. }
            | RecoveryOutcome::Deferred { task }
            | RecoveryOutcome::Abandoned { task, .. } => task,
        }
    }

    pub fn state(&self) -> TaskState {
        match self {
            RecoveryOutcome::Recorded { .. } => TaskState::Recorded,
            RecoveryOutcome::Requeued { .. } | RecoveryOutcome::Deferred { .. } => {
                TaskState::RoutedRecovery
            }
            RecoveryOutcome::Abandoned { .. } => TaskState::Abandoned,
        }
    }
}

pub struct RecoveryWorker {
    store: Arc<dyn QueueStore>,
    audit: Arc<dyn AuditSink>,
    processor: Arc<dyn TaskProcessor>,
    config: QueueConfig,
}

impl RecoveryWorker {
    pub fn new(
        store: Arc<dyn QueueStore>,
        audit: Arc<dyn AuditSink>,
        processor: Arc<dyn TaskProcessor>,
        config: QueueConfig,
    ) -> Self {
        Self {
            store,
            audit,
            processor,
            config,
        }
    }

    /// Pop one entry and handle it. `Ok(None)` once shutdown is requested.
    ///
    /// A deferred task makes the worker idle for `idle_backoff` before returning.
    pub async fn process_next(
        &self,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Result<Option<RecoveryOutcome>, PollqError> {
        let Some(raw) = self
            .store
            .blocking_pop(&self.config.recovery_queue, shutdown)
            .await?
        else {
            return Ok(None);
        };

        let outcome = self.handle_entry(&raw).await?;
        if matches!(outcome, RecoveryOutcome::Deferred { .. }) {
            idle(self.config.idle_backoff, shutdown).await;
        }
        Ok(Some(outcome))
    }

    /// Handle an entry that has already been popped from the recovery queue.
    pub async fn handle_entry(&self, raw: &str) -> Result<RecoveryOutcome, PollqError> {
        let task = PollingTask::decode(raw)?;
        let count = self.retry_count(&task).await?;
        info!(
            task_id = task.id(),
            transaction_id = task.transaction_id(),
            retry_count = count,
            "processing recovery task"
        );

        if self.config.recovery.is_exhausted(count) {
            self.store
                .remove_by_value(&self.config.recovery_queue, raw)
                .await?;
            warn!(task_id = task.id(), retry_count = count, "task reached retry limit");
            return Ok(RecoveryOutcome::Abandoned {
                task,
                attempts: count,
            });
        }

        match self.config.recovery.mode {
            RecoveryMode::SingleShot => {
                self.record_attempt(&task).await?;
                let attempts = self.increment(&task).await?;
                Ok(RecoveryOutcome::Recorded { task, attempts })
            }
            RecoveryMode::Requeue => self.retry(task, raw).await,
        }
    }

    async fn retry(&self, task: PollingTask, raw: &str) -> Result<RecoveryOutcome, PollqError> {
        // placeholder が生きている間はバックオフ中
        if self.store.get(&task.schedule_key()).await?.is_some() {
            self.push_back(&task, raw).await?;
            debug!(task_id = task.id(), "task still in backoff, deferred");
            return Ok(RecoveryOutcome::Deferred { task });
        }

        let outcome = self.processor.process(&task).await;
        self.record_attempt(&task).await?;
        let attempts = self.increment(&task).await?;

        if !outcome.is_failure() {
            return Ok(RecoveryOutcome::Recorded { task, attempts });
        }
        if self.config.recovery.is_exhausted(attempts) {
            warn!(task_id = task.id(), retry_count = attempts, "last recovery attempt failed");
            return Ok(RecoveryOutcome::Abandoned { task, attempts });
        }

        self.store
            .set_with_ttl(&task.schedule_key(), raw, self.config.recovery.backoff)
            .await?;
        self.push_back(&task, raw).await?;
        info!(
            task_id = task.id(),
            retry_count = attempts,
            backoff_secs = self.config.recovery.backoff.as_secs(),
            "recovery attempt failed, requeued"
        );
        Ok(RecoveryOutcome::Requeued { task, attempts })
    }

    /// Return a popped entry to the recovery queue.
    ///
    /// One retry, then the primary queue as a fallback: the entry may be
    /// processed again, but it is never dropped while either push works.
    async fn push_back(&self, task: &PollingTask, raw: &str) -> Result<(), PollqError> {
        let Err(first) = self.store.push(&self.config.recovery_queue, raw).await else {
            return Ok(());
        };
        warn!(task_id = task.id(), error = %first, "push back to recovery failed, retrying");

        let Err(err) = self.store.push(&self.config.recovery_queue, raw).await else {
            return Ok(());
        };
        match self.store.push(&self.config.primary_queue, raw).await {
            Ok(()) => error!(
                task_id = task.id(),
                error = %err,
                "recovery queue unavailable, task returned to primary queue"
            ),
            Err(fallback_err) => error!(
                task_id = task.id(),
                error = %fallback_err,
                "failed to return task to any queue, task lost"
            ),
        }
        Err(err)
    }

    /// Current retry counter; an absent key counts as 0.
    pub async fn retry_count(&self, task: &PollingTask) -> Result<u64, PollqError> {
        let key = task.retry_counter_key();
        match self.store.get(&key).await? {
            None => Ok(0),
            Some(value) => value
                .trim()
                .parse::<u64>()
                .map_err(|_| PollqError::InvalidCounter { key, value }),
        }
    }

    async fn record_attempt(&self, task: &PollingTask) -> Result<(), PollqError> {
        self.audit
            .insert(&AuditRecord::for_task(task, PollingStatus::RecoveryProcessing))
            .await
    }

    async fn increment(&self, task: &PollingTask) -> Result<u64, PollqError> {
        let next = self.store.increment(&task.retry_counter_key()).await?;
        Ok(next.max(0) as u64)
    }
}

#[async_trait]
impl Worker for RecoveryWorker {
    fn name(&self) -> &str {
        "recovery-worker"
    }

    async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(
            queue = %self.config.recovery_queue,
            limit = self.config.recovery.limit,
            mode = ?self.config.recovery.mode,
            "{} starting",
            self.name()
        );
        loop {
            match self.process_next(&mut shutdown).await {
                Ok(Some(outcome)) => {
                    debug!(task_id = outcome.task().id(), state = ?outcome.state(), "iteration done");
                }
                Ok(None) => break,
                Err(err @ PollqError::StoreUnavailable(_)) => {
                    error!(error = %err, "{} store error", self.name());
                    idle(self.config.idle_backoff, &mut shutdown).await;
                }
                Err(err) => {
                    error!(error = %err, "{} iteration failed", self.name());
                }
            }
        }
        info!("{} stopped", self.name());
    }
}
