//! Queue configuration, passed explicitly to every worker at construction.

use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const PRIMARY_QUEUE: &str = "polling_queue";
pub const RECOVERY_QUEUE: &str = "polling_queue_recovery";

/// How the recovery worker treats a task below the retry limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryMode {
    /// One audited recovery attempt, counter incremented, task not re-pushed.
    #[default]
    SingleShot,

    /// Re-run the processor and re-push failed tasks until the limit is hit,
    /// waiting out the schedule placeholder between attempts.
    Requeue,
}

/// Recovery policy for failed tasks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveryPolicy {
    /// A task whose counter reaches this value is abandoned.
    pub limit: u64,

    /// Placeholder TTL written before a requeued attempt.
    pub backoff: Duration,

    pub mode: RecoveryMode,
}

impl RecoveryPolicy {
    pub fn single_shot(limit: u64) -> Self {
        Self {
            limit,
            backoff: Duration::from_secs(10),
            mode: RecoveryMode::SingleShot,
        }
    }

    pub fn requeue(limit: u64, backoff: Duration) -> Self {
        Self {
            limit,
            backoff,
            mode: RecoveryMode::Requeue,
        }
    }

    /// Has a task with `count` recorded attempts used up its budget?
    pub fn is_exhausted(&self, count: u64) -> bool {
        count >= self.limit
    }
}

impl Default for RecoveryPolicy {
    fn default() -> Self {
        Self::single_shot(3)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueConfig {
    pub primary_queue: String,
    pub recovery_queue: String,

    /// TTL of the schedule placeholder written on (re-)enqueue.
    pub placeholder_ttl: Duration,

    /// Idle delay after deferring a task that is still in backoff.
    pub idle_backoff: Duration,

    pub recovery: RecoveryPolicy,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            primary_queue: PRIMARY_QUEUE.to_string(),
            recovery_queue: RECOVERY_QUEUE.to_string(),
            placeholder_ttl: Duration::from_secs(10),
            idle_backoff: Duration::from_secs(1),
            recovery: RecoveryPolicy::default(),
        }
    }
}
