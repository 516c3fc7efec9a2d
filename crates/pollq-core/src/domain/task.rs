//! PollingTask - キューに流れる作業単位
//!
//! # 設計原則
//! - 生成後は immutable（フィールドを書き換えない）
//! - エンコード結果は常に同じバイト列になる（LREM の完全一致削除が前提）
//! - `id` が retry counter / schedule placeholder のキーになる

use serde::{Deserialize, Serialize};

use crate::error::PollqError;

/// Key prefix of the per-task retry counter.
pub const RETRY_COUNTER_PREFIX: &str = "retry_count:";

/// Key prefix of the TTL-bounded schedule placeholder.
pub const SCHEDULE_PREFIX: &str = "pollingQueue:repeat:";

/// One unit of work.
///
/// Wire shape: `{"id": "...", "transaction_id": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PollingTask {
    id: String,
    transaction_id: String,
}

impl PollingTask {
    pub fn new(id: impl Into<String>, transaction_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            transaction_id: transaction_id.into(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn transaction_id(&self) -> &str {
        &self.transaction_id
    }

    /// Serialize into the queue payload.
    pub fn encode(&self) -> Result<String, PollqError> {
        serde_json::to_string(self).map_err(PollqError::Encode)
    }

    /// Parse a queue payload.
    pub fn decode(raw: &str) -> Result<Self, PollqError> {
        serde_json::from_str(raw).map_err(PollqError::MalformedPayload)
    }

    /// `retry_count:<id>`
    pub fn retry_counter_key(&self) -> String {
        format!("{RETRY_COUNTER_PREFIX}{}", self.id)
    }

    /// `pollingQueue:repeat:<id>`
    pub fn schedule_key(&self) -> String {
        format!("{SCHEDULE_PREFIX}{}", self.id)
    }
}
