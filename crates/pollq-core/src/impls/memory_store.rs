//! InMemoryStore - 開発用・テスト用のバッキングストア
//!
//! # 実装詳細
//! - queue 名ごとに VecDeque（head = front, tail = back）
//! - key/value は期限（tokio::time::Instant）付き
//! - tokio::sync::Mutex で排他制御、Notify で push を待機中の pop に通知
//!
//! 期限は tokio の時計で判定するので、テストでは `tokio::time::pause()` +
//! `advance()` で TTL 切れを再現できる。

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify, watch};
use tokio::time::Instant;

use crate::error::PollqError;
use crate::ports::QueueStore;

struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|at| at > now)
    }
}

#[derive(Default)]
struct State {
    lists: HashMap<String, VecDeque<String>>,
    keys: HashMap<String, Entry>,
}

impl State {
    fn live_entry(&mut self, key: &str) -> Option<&Entry> {
        let now = Instant::now();
        if self.keys.get(key).is_some_and(|e| !e.is_live(now)) {
            self.keys.remove(key);
        }
        self.keys.get(key)
    }
}

pub struct InMemoryStore {
    state: Mutex<State>,
    notify: Notify,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
            notify: Notify::new(),
        }
    }

    /// Snapshot of `queue`, head first.
    pub async fn entries(&self, queue: &str) -> Vec<String> {
        let state = self.state.lock().await;
        state
            .lists
            .get(queue)
            .map(|q| q.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Remaining time-to-live of `key`, if it is live and has one.
    pub async fn ttl(&self, key: &str) -> Option<Duration> {
        let mut state = self.state.lock().await;
        let now = Instant::now();
        state
            .live_entry(key)
            .and_then(|e| e.expires_at)
            .map(|at| at.saturating_duration_since(now))
    }
}

#[cfg(test)]
impl InMemoryStore {
    /// Keys currently held, expired or not.
    async fn stored_key_count(&self) -> usize {
        self.state.lock().await.keys.len()
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl QueueStore for InMemoryStore {
    async fn push(&self, queue: &str, entry: &str) -> Result<(), PollqError> {
        {
            let mut state = self.state.lock().await;
            state
                .lists
                .entry(queue.to_string())
                .or_default()
                .push_front(entry.to_string());
        }
        // ロック解放後に通知
        self.notify.notify_waiters();
        Ok(())
    }

    async fn blocking_pop(
        &self,
        queue: &str,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Result<Option<String>, PollqError> {
        loop {
            if *shutdown.borrow() {
                return Ok(None);
            }

            // 通知の取りこぼしを防ぐため、状態確認の前に待機を登録しておく
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let mut state = self.state.lock().await;
                if let Some(entry) = state.lists.get_mut(queue).and_then(|q| q.pop_back()) {
                    return Ok(Some(entry));
                }
            }

            tokio::select! {
                _ = &mut notified => {}
                changed = shutdown.changed() => {
                    // sender が drop された場合も停止扱い
                    if changed.is_err() {
                        return Ok(None);
                    }
                }
            }
        }
    }

    async fn remove_by_value(&self, queue: &str, entry: &str) -> Result<u64, PollqError> {
        let mut state = self.state.lock().await;
        let Some(list) = state.lists.get_mut(queue) else {
            return Ok(0);
        };
        match list.iter().position(|e| e == entry) {
            Some(idx) => {
                list.remove(idx);
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> Result<(), PollqError> {
        let mut state = self.state.lock().await;
        let now = Instant::now();
        // 期限切れのキーは読まれない限り残るので、書き込みのたびに掃除する
        state.keys.retain(|_, e| e.is_live(now));
        state.keys.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: Some(now + ttl),
            },
        );
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, PollqError> {
        let mut state = self.state.lock().await;
        Ok(state.live_entry(key).map(|e| e.value.clone()))
    }

    async fn increment(&self, key: &str) -> Result<i64, PollqError> {
        let mut state = self.state.lock().await;
        let current = match state.live_entry(key) {
            Some(e) => e.value.parse::<i64>().map_err(|_| {
                PollqError::StoreUnavailable(format!(
                    "value at {key} is not an integer or out of range"
                ))
            })?,
            None => 0,
        };
        let next = current + 1;
        // INCR は既存の TTL を保持する
        let expires_at = state.keys.get(key).and_then(|e| e.expires_at);
        state.keys.insert(
            key.to_string(),
            Entry {
                value: next.to_string(),
                expires_at,
            },
        );
        Ok(next)
    }

    async fn len(&self, queue: &str) -> Result<usize, PollqError> {
        let state = self.state.lock().await;
        Ok(state.lists.get(queue).map_or(0, VecDeque::len))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn no_shutdown() -> (watch::Sender<bool>, watch::Receiver<bool>) {
        watch::channel(false)
    }

    #[tokio::test]
    async fn push_pop_is_fifo() {
        let store = InMemoryStore::new();
        let (_tx, mut rx) = no_shutdown();
        store.push("q", "a").await.unwrap();
        store.push("q", "b").await.unwrap();

        assert_eq!(store.entries("q").await, vec!["b", "a"]);
        assert_eq!(store.blocking_pop("q", &mut rx).await.unwrap().as_deref(), Some("a"));
        assert_eq!(store.blocking_pop("q", &mut rx).await.unwrap().as_deref(), Some("b"));
        assert_eq!(store.len("q").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn push_wakes_blocked_pop() {
        let store = Arc::new(InMemoryStore::new());
        let (_tx, rx) = no_shutdown();

        let waiter = tokio::spawn({
            let store = store.clone();
            let mut rx = rx.clone();
            async move { store.blocking_pop("q", &mut rx).await.unwrap() }
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        store.push("other", "x").await.unwrap();
        store.push("q", "payload").await.unwrap();

        assert_eq!(waiter.await.unwrap().as_deref(), Some("payload"));
        assert_eq!(store.entries("other").await, vec!["x"]);
    }

    #[tokio::test]
    async fn shutdown_cancels_blocked_pop() {
        let store = Arc::new(InMemoryStore::new());
        let (tx, rx) = no_shutdown();

        let waiter = tokio::spawn({
            let store = store.clone();
            let mut rx = rx.clone();
            async move { store.blocking_pop("q", &mut rx).await.unwrap() }
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        tx.send(true).unwrap();
        assert_eq!(waiter.await.unwrap(), None);
    }

    #[tokio::test]
    async fn remove_by_value_removes_one_exact_match() {
        let store = InMemoryStore::new();
        store.push("q", "a").await.unwrap();
        store.push("q", "b").await.unwrap();
        store.push("q", "a").await.unwrap();

        assert_eq!(store.remove_by_value("q", "a").await.unwrap(), 1);
        assert_eq!(store.entries("q").await, vec!["b", "a"]);
    }

    #[tokio::test]
    async fn remove_by_value_absent_is_noop() {
        let store = InMemoryStore::new();
        assert_eq!(store.remove_by_value("missing", "a").await.unwrap(), 0);

        store.push("q", "a").await.unwrap();
        assert_eq!(store.remove_by_value("q", "zzz").await.unwrap(), 0);
        assert_eq!(store.len("q").await.unwrap(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn keys_expire_after_ttl() {
        let store = InMemoryStore::new();
        store.set_with_ttl("k", "v", Duration::from_secs(10)).await.unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v"));
        assert_eq!(store.ttl("k").await, Some(Duration::from_secs(10)));

        tokio::time::advance(Duration::from_secs(11)).await;
        assert_eq!(store.get("k").await.unwrap(), None);
        assert_eq!(store.ttl("k").await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn expired_keys_are_dropped_on_the_next_write() {
        let store = InMemoryStore::new();
        for id in 0..5 {
            let key = format!("pollingQueue:repeat:{id}");
            store.set_with_ttl(&key, "v", Duration::from_secs(10)).await.unwrap();
        }
        assert_eq!(store.stored_key_count().await, 5);

        tokio::time::advance(Duration::from_secs(11)).await;
        store.set_with_ttl("fresh", "v", Duration::from_secs(10)).await.unwrap();

        assert_eq!(store.stored_key_count().await, 1);
        assert_eq!(store.get("fresh").await.unwrap().as_deref(), Some("v"));
    }

    #[tokio::test]
    async fn increment_counts_from_zero() {
        let store = InMemoryStore::new();
        assert_eq!(store.get("c").await.unwrap(), None);
        assert_eq!(store.increment("c").await.unwrap(), 1);
        assert_eq!(store.increment("c").await.unwrap(), 2);
        assert_eq!(store.get("c").await.unwrap().as_deref(), Some("2"));
    }

    #[tokio::test]
    async fn increment_rejects_non_integer() {
        let store = InMemoryStore::new();
        store.set_with_ttl("c", "abc", Duration::from_secs(60)).await.unwrap();
        let err = store.increment("c").await.unwrap_err();
        assert!(matches!(err, PollqError::StoreUnavailable(_)));
    }
}
