//! SentinelProcessor - 予約済みの transaction_id で失敗をシミュレートする
//!
//! 実処理を持たないデフォルト実装。`transaction_id == "fail_task"` なら失敗。

use async_trait::async_trait;

use crate::domain::{Outcome, PollingTask};
use crate::ports::TaskProcessor;

/// Reserved transaction id that forces the failure path.
pub const FAIL_SENTINEL: &str = "fail_task";

pub struct SentinelProcessor {
    sentinel: String,
}

impl SentinelProcessor {
    pub fn new() -> Self {
        Self::with_sentinel(FAIL_SENTINEL)
    }

    pub fn with_sentinel(sentinel: impl Into<String>) -> Self {
        Self {
            sentinel: sentinel.into(),
        }
    }
}

impl Default for SentinelProcessor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TaskProcessor for SentinelProcessor {
    async fn process(&self, task: &PollingTask) -> Outcome {
        if task.transaction_id() == self.sentinel {
            Outcome::failure(format!("transaction_id matched sentinel {:?}", self.sentinel))
        } else {
            Outcome::success()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn only_the_sentinel_fails() {
        let p = SentinelProcessor::new();
        assert!(p.process(&PollingTask::new("42", "fail_task")).await.is_failure());
        assert!(!p.process(&PollingTask::new("7", "txn_7")).await.is_failure());
    }

    #[tokio::test]
    async fn custom_sentinel() {
        let p = SentinelProcessor::with_sentinel("boom");
        assert!(p.process(&PollingTask::new("1", "boom")).await.is_failure());
        assert!(!p.process(&PollingTask::new("1", "fail_task")).await.is_failure());
    }
}
