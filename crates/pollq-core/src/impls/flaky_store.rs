//! FlakyStore - 障害を注入できるテスト用ストア
//!
//! InMemoryStore をラップし、指定した queue への push / remove_by_value を
//! 指定回数だけ StoreUnavailable で失敗させる。

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;

use super::memory_store::InMemoryStore;
use crate::error::PollqError;
use crate::ports::QueueStore;

/// Fail every call, not just the first few.
pub(crate) const ALWAYS: usize = usize::MAX;

#[derive(Default)]
pub(crate) struct FlakyStore {
    pub(crate) inner: InMemoryStore,
    push_failures: Mutex<HashMap<String, usize>>,
    remove_failures: Mutex<HashMap<String, usize>>,
}

impl FlakyStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn fail_push(mut self, queue: &str, times: usize) -> Self {
        self.push_failures
            .get_mut()
            .unwrap()
            .insert(queue.to_string(), times);
        self
    }

    pub(crate) fn fail_remove(mut self, queue: &str, times: usize) -> Self {
        self.remove_failures
            .get_mut()
            .unwrap()
            .insert(queue.to_string(), times);
        self
    }

    fn take_failure(failures: &Mutex<HashMap<String, usize>>, queue: &str) -> bool {
        let mut failures = failures.lock().unwrap();
        match failures.get_mut(queue) {
            Some(0) | None => false,
            Some(left) => {
                if *left != ALWAYS {
                    *left -= 1;
                }
                true
            }
        }
    }
}

fn refused() -> PollqError {
    PollqError::StoreUnavailable("connection refused".into())
}

#[async_trait]
impl QueueStore for FlakyStore {
    async fn push(&self, queue: &str, entry: &str) -> Result<(), PollqError> {
        if Self::take_failure(&self.push_failures, queue) {
            return Err(refused());
        }
        self.inner.push(queue, entry).await
    }

    async fn blocking_pop(
        &self,
        queue: &str,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Result<Option<String>, PollqError> {
        self.inner.blocking_pop(queue, shutdown).await
    }

    async fn remove_by_value(&self, queue: &str, entry: &str) -> Result<u64, PollqError> {
        if Self::take_failure(&self.remove_failures, queue) {
            return Err(refused());
        }
        self.inner.remove_by_value(queue, entry).await
    }

    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> Result<(), PollqError> {
        self.inner.set_with_ttl(key, value, ttl).await
    }

    async fn get(&self, key: &str) -> Result<Option<String>, PollqError> {
        self.inner.get(key).await
    }

    async fn increment(&self, key: &str) -> Result<i64, PollqError> {
        self.inner.increment(key).await
    }

    async fn len(&self, queue: &str) -> Result<usize, PollqError> {
        self.inner.len(queue).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fails_the_requested_number_of_times_then_recovers() {
        let store = FlakyStore::new().fail_push("q", 2);

        assert!(store.push("q", "a").await.is_err());
        assert!(store.push("q", "a").await.is_err());
        store.push("q", "a").await.unwrap();
        store.push("other", "b").await.unwrap();

        assert_eq!(store.inner.entries("q").await, vec!["a"]);
    }
}
