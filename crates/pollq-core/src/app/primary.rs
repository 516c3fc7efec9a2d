//! PrimaryWorker - primary queue を処理するループ
//!
//! # フロー
//! 1. QueueStore::blocking_pop() で payload 取得
//! 2. PollingTask にデコード（失敗したらログを出してスキップ）
//! 3. TaskProcessor で実行 → Outcome
//! 4. 成功: 監査ログ（primary-processing）を追記
//! 5. 失敗: recovery queue へ移動 + schedule placeholder を書く

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use super::config::QueueConfig;
use super::worker_group::{Worker, idle};
use crate::domain::{AuditRecord, PollingStatus, PollingTask, TaskState};
use crate::error::PollqError;
use crate::ports::{AuditSink, QueueStore, TaskProcessor};

/// What one primary iteration did with the popped task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrimaryOutcome {
    Completed(PollingTask),
    RoutedToRecovery(PollingTask),
}

impl PrimaryOutcome {
    pub fn task(&self) -> &PollingTask {
        match self {
            PrimaryOutcome::Completed(task) | PrimaryOutcome::RoutedToRecovery(task) => task,
        }
    }

    pub fn state(&self) -> TaskState {
        match self {
            PrimaryOutcome::Completed(_) => TaskState::Completed,
            PrimaryOutcome::RoutedToRecovery(_) => TaskState::RoutedRecovery,
        }
    }
}

pub struct PrimaryWorker {
    store: Arc<dyn QueueStore>,
    audit: Arc<dyn AuditSink>,
    processor: Arc<dyn TaskProcessor>,
    config: QueueConfig,
}

impl PrimaryWorker {
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
    pub async fn process_next(
        &self,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Result<Option<PrimaryOutcome>, PollqError> {
        let Some(raw) = self
            .store
            .blocking_pop(&self.config.primary_queue, shutdown)
            .await?
        else {
            return Ok(None);
        };
        self.handle_entry(&raw).await.map(Some)
    }

    /// Handle an entry that has already been popped from the primary queue.
    pub async fn handle_entry(&self, raw: &str) -> Result<PrimaryOutcome, PollqError> {
        let task = PollingTask::decode(raw)?;
        info!(
            task_id = task.id(),
            transaction_id = task.transaction_id(),
            "processing task"
        );

        let outcome = self.processor.process(&task).await;
        if outcome.is_failure() {
            warn!(
                task_id = task.id(),
                reason = outcome.reason.as_deref().unwrap_or_default(),
                "task failed, routing to recovery"
            );
            self.route_to_recovery(&task, raw).await?;
            return Ok(PrimaryOutcome::RoutedToRecovery(task));
        }

        self.audit
            .insert(&AuditRecord::for_task(&task, PollingStatus::PrimaryProcessing))
            .await?;
        debug!(task_id = task.id(), "audit row written");
        Ok(PrimaryOutcome::Completed(task))
    }

    /// recovery へ push してから primary から削除する。
    /// 途中でプロセスが落ちても重複にはなるが消失はしない（at-least-once）。
    async fn route_to_recovery(&self, task: &PollingTask, raw: &str) -> Result<(), PollqError> {
        if let Err(err) = self.store.push(&self.config.recovery_queue, raw).await {
            // pop 済みなので、戻さないとタスクが消える
            if let Err(restore_err) = self.store.push(&self.config.primary_queue, raw).await {
                error!(
                    task_id = task.id(),
                    error = %restore_err,
                    "failed to return task to primary queue, task lost"
                );
            }
            return Err(err);
        }

        let removed = self
            .store
            .remove_by_value(&self.config.primary_queue, raw)
            .await?;
        self.store
            .set_with_ttl(&task.schedule_key(), raw, self.config.placeholder_ttl)
            .await?;

        info!(
            task_id = task.id(),
            duplicates_removed = removed,
            queue = %self.config.recovery_queue,
            "task moved to recovery queue"
        );
        Ok(())
    }
}

#[async_trait]
impl Worker for PrimaryWorker {
    fn name(&self) -> &str {
        "primary-worker"
    }

    async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(queue = %self.config.primary_queue, "{} starting", self.name());
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
