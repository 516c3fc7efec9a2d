//! QueueStore port - バッキングストア（Redis または InMemory）
//!
//! キューの中身と retry counter の正本（source of truth）はここにある。
//!
//! # 設計原則
//! - 各操作は単体でアトミック（LPUSH / BRPOP / LREM / INCR）
//! - 複数操作の組み合わせはアトミックではない（at-least-once 前提）
//! - blocking pop は停止シグナルで中断できる

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;

use crate::error::PollqError;

/// List + key/value capability consumed by both workers.
///
/// Lists are head-insert / tail-remove, so a queue drains in FIFO order.
#[async_trait]
pub trait QueueStore: Send + Sync {
    /// Insert `entry` at the head of `queue`. Never blocks.
    async fn push(&self, queue: &str, entry: &str) -> Result<(), PollqError>;

    /// Remove and return the oldest entry of `queue`, waiting until one exists.
    ///
    /// Returns `Ok(None)` once `shutdown` carries `true`.
    async fn blocking_pop(
        &self,
        queue: &str,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Result<Option<String>, PollqError>;

    /// Remove the first exact match of `entry`. Absent entries are a no-op.
    ///
    /// Returns how many entries were removed (0 or 1).
    async fn remove_by_value(&self, queue: &str, entry: &str) -> Result<u64, PollqError>;

    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> Result<(), PollqError>;

    /// `Ok(None)` means the key is absent (or expired); that is not an error.
    async fn get(&self, key: &str) -> Result<Option<String>, PollqError>;

    /// Atomically add one and return the new value. Missing keys count from 0.
    async fn increment(&self, key: &str) -> Result<i64, PollqError>;

    /// Number of entries currently in `queue`.
    async fn len(&self, queue: &str) -> Result<usize, PollqError>;
}
