//! Enqueuer - タスクを primary queue に投入する
//!
//! 1 件ごとに LPUSH → schedule placeholder（TTL 付き）の順で書く。

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use super::config::QueueConfig;
use crate::domain::{EnqueueBatchRequest, PollingTask};
use crate::error::PollqError;
use crate::ports::{IdGenerator, QueueStore};

pub struct Enqueuer {
    store: Arc<dyn QueueStore>,
    ids: Arc<dyn IdGenerator>,
    config: QueueConfig,
}

impl Enqueuer {
    pub fn new(store: Arc<dyn QueueStore>, ids: Arc<dyn IdGenerator>, config: QueueConfig) -> Self {
        Self { store, ids, config }
    }

    /// Enqueue one task with the configured placeholder TTL.
    pub async fn enqueue(&self, task: &PollingTask) -> Result<(), PollqError> {
        self.enqueue_with_ttl(task, self.config.placeholder_ttl).await
    }

    pub async fn enqueue_with_ttl(
        &self,
        task: &PollingTask,
        placeholder_ttl: Duration,
    ) -> Result<(), PollqError> {
        let payload = task.encode()?;
        self.store
            .push(&self.config.primary_queue, &payload)
            .await?;
        self.store
            .set_with_ttl(&task.schedule_key(), &payload, placeholder_ttl)
            .await?;
        debug!(
            task_id = task.id(),
            transaction_id = task.transaction_id(),
            queue = %self.config.primary_queue,
            "task enqueued"
        );
        Ok(())
    }

    /// Validate `request` and enqueue `count` independent tasks.
    ///
    /// Stops at the first store error; tasks enqueued before it stay queued.
    pub async fn enqueue_batch(
        &self,
        request: &EnqueueBatchRequest,
    ) -> Result<Vec<PollingTask>, PollqError> {
        request.validate()?;

        let ttl = request.delay();
        // count は上限なしなので、事前確保はしない
        let mut tasks = Vec::new();
        for _ in 0..request.count {
            let task = PollingTask::new(
                self.ids.generate_task_id(),
                self.ids.generate_transaction_id(),
            );
            self.enqueue_with_ttl(&task, ttl).await?;
            tasks.push(task);
        }

        info!(
            count = tasks.len(),
            recipient = %request.recipient,
            subject = %request.subject,
            delay_secs = ttl.as_secs(),
            "batch enqueued"
        );
        Ok(tasks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    use rstest::rstest;

    use crate::impls::InMemoryStore;
    use crate::impls::flaky_store::{ALWAYS, FlakyStore};
    use crate::ports::{SystemClock, UlidGenerator};

    fn enqueuer(store: Arc<dyn QueueStore>) -> Enqueuer {
        Enqueuer::new(
            store,
            Arc::new(UlidGenerator::new(SystemClock)),
            QueueConfig::default(),
        )
    }

    fn request(count: i64) -> EnqueueBatchRequest {
        EnqueueBatchRequest {
            count,
            delay_seconds: 30,
            recipient: "ops@example.com".into(),
            subject: "transfer".into(),
            body: "hello".into(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn enqueue_pushes_and_writes_placeholder() {
        let store = Arc::new(InMemoryStore::new());
        let enq = enqueuer(store.clone());
        let task = PollingTask::new("42", "fail_task");

        enq.enqueue(&task).await.unwrap();

        let payload = task.encode().unwrap();
        assert_eq!(store.entries("polling_queue").await, vec![payload.clone()]);
        assert_eq!(
            store.get("pollingQueue:repeat:42").await.unwrap(),
            Some(payload)
        );
        assert_eq!(
            store.ttl("pollingQueue:repeat:42").await,
            Some(Duration::from_secs(10))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn batch_creates_count_distinct_tasks() {
        let store = Arc::new(InMemoryStore::new());
        let enq = enqueuer(store.clone());

        let tasks = enq.enqueue_batch(&request(3)).await.unwrap();

        assert_eq!(tasks.len(), 3);
        assert_eq!(store.len("polling_queue").await.unwrap(), 3);
        let ids: HashSet<_> = tasks.iter().map(|t| t.id().to_string()).collect();
        assert_eq!(ids.len(), 3);
        assert_eq!(
            store.ttl(&tasks[0].schedule_key()).await,
            Some(Duration::from_secs(30))
        );
    }

    #[tokio::test]
    async fn batch_rejects_invalid_request_without_side_effects() {
        let store = Arc::new(InMemoryStore::new());
        let enq = enqueuer(store.clone());

        let err = enq.enqueue_batch(&request(0)).await.unwrap_err();
        assert!(err.is_client_error());
        assert_eq!(store.len("polling_queue").await.unwrap(), 0);
    }

    #[rstest]
    #[case::max(i64::MAX)]
    #[case::huge(1 << 42)]
    #[tokio::test]
    async fn huge_batch_fails_on_the_store_instead_of_allocating(#[case] count: i64) {
        let store = Arc::new(FlakyStore::new().fail_push("polling_queue", ALWAYS));
        let enq = enqueuer(store.clone());

        let err = enq.enqueue_batch(&request(count)).await.unwrap_err();
        assert!(matches!(err, PollqError::StoreUnavailable(_)));
        assert_eq!(store.inner.len("polling_queue").await.unwrap(), 0);
    }
}
