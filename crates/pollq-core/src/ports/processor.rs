//! TaskProcessor port - タスクの実処理と成否判定
//!
//! ルーティング（primary → recovery）は Outcome だけを見る。
//! 実処理を差し替えてもワーカー側のコードは変わらない。

use async_trait::async_trait;

use crate::domain::{Outcome, PollingTask};

/// Runs a task and classifies the result as success or failure.
#[async_trait]
pub trait TaskProcessor: Send + Sync {
    async fn process(&self, task: &PollingTask) -> Outcome;
}
