//! AuditSink port - 監査ログの追記先（PostgreSQL または InMemory）
//!
//! insert のみ。読み戻しはしない。

use async_trait::async_trait;

use crate::domain::AuditRecord;
use crate::error::PollqError;

/// Append-only store of processing attempts.
///
/// Failures surface as `PollqError::AuditWriteFailed`.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn insert(&self, record: &AuditRecord) -> Result<(), PollqError>;
}
