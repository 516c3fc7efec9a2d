use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::info;

/// A long-running consumer loop.
#[async_trait]
pub trait Worker: Send + Sync {
    /// Worker name for logging.
    fn name(&self) -> &str;

    /// Run until `shutdown` carries `true` (or its sender is dropped).
    ///
    /// Errors inside one iteration are logged and never end the loop.
    async fn run(&self, shutdown: watch::Receiver<bool>);
}

/// Worker group handle.
/// - 各ワーカーは専用の tokio task で動く
/// - `shutdown_tx` を drop するとワーカー全体が止まる
/// - `join()` で全ワーカーの終了を待てる
pub struct WorkerGroup {
    shutdown_tx: watch::Sender<bool>,
    joins: Vec<JoinHandle<()>>,
}

impl WorkerGroup {
    pub fn spawn(workers: Vec<Arc<dyn Worker>>) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let mut joins = Vec::with_capacity(workers.len());
        for worker in workers {
            let rx = shutdown_rx.clone();
            let join = tokio::spawn(async move {
                worker.run(rx).await;
            });
            joins.push(join);
        }

        Self { shutdown_tx, joins }
    }

    /// Request shutdown for all workers.
    /// In-flight task handling is not cancelled; the loops stop at their
    /// next pop.
    pub fn request_shutdown(&self) {
        // receivers may already be dropped
        let _ = self.shutdown_tx.send(true);
    }

    pub fn len(&self) -> usize {
        self.joins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.joins.is_empty()
    }

    /// Shutdown and wait for all workers.
    pub async fn shutdown_and_join(self) {
        self.request_shutdown();
        for j in self.joins {
            let _ = j.await;
        }
        info!("all workers stopped");
    }
}

/// Sleep for `duration`, returning early if shutdown is requested.
pub(crate) async fn idle(duration: Duration, shutdown: &mut watch::Receiver<bool>) {
    if *shutdown.borrow() {
        return;
    }
    tokio::select! {
        _ = tokio::time::sleep(duration) => {}
        _ = shutdown.changed() => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::config::QueueConfig;
    use crate::app::primary::PrimaryWorker;
    use crate::app::recovery::RecoveryWorker;
    use crate::domain::{PollingStatus, PollingTask};
    use crate::impls::{InMemoryAuditSink, InMemoryStore, SentinelProcessor};
    use crate::ports::QueueStore;

    #[tokio::test]
    async fn both_stages_run_and_stop_on_shutdown() {
        let store = Arc::new(InMemoryStore::new());
        let audit = Arc::new(InMemoryAuditSink::new());
        let processor = Arc::new(SentinelProcessor::new());
        let config = QueueConfig::default();

        let primary = Arc::new(PrimaryWorker::new(
            store.clone(),
            audit.clone(),
            processor.clone(),
            config.clone(),
        ));
        let recovery = Arc::new(RecoveryWorker::new(
            store.clone(),
            audit.clone(),
            processor,
            config.clone(),
        ));
        let group = WorkerGroup::spawn(vec![
            primary as Arc<dyn Worker>,
            recovery as Arc<dyn Worker>,
        ]);
        assert_eq!(group.len(), 2);

        for (id, txn) in [("1", "txn_1"), ("42", "fail_task")] {
            let payload = PollingTask::new(id, txn).encode().unwrap();
            store.push(&config.primary_queue, &payload).await.unwrap();
        }

        // primary 1 行 + recovery 1 行
        for _ in 0..200 {
            if audit.rows().await.len() >= 2 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        group.shutdown_and_join().await;

        let rows = audit.rows().await;
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().any(|r| r.transaction_id == "txn_1"
            && r.polling_status == PollingStatus::PrimaryProcessing));
        assert!(rows.iter().any(|r| r.transaction_id == "fail_task"
            && r.polling_status == PollingStatus::RecoveryProcessing));
        assert_eq!(store.get("retry_count:42").await.unwrap().as_deref(), Some("1"));
        assert_eq!(store.len(&config.primary_queue).await.unwrap(), 0);
        assert_eq!(store.len(&config.recovery_queue).await.unwrap(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn idle_returns_early_on_shutdown() {
        let (tx, mut rx) = watch::channel(false);
        let start = tokio::time::Instant::now();
        let waiter = tokio::spawn(async move {
            idle(Duration::from_secs(60), &mut rx).await;
        });
        tokio::task::yield_now().await;
        tx.send(true).unwrap();
        waiter.await.unwrap();
        assert!(start.elapsed() < Duration::from_secs(60));
    }
}
