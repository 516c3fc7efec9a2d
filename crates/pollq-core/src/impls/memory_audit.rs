//! InMemoryAuditSink - テスト・デモ用の監査ログ

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::AuditRecord;
use crate::error::PollqError;
use crate::ports::AuditSink;

#[derive(Default)]
pub struct InMemoryAuditSink {
    rows: Mutex<Vec<AuditRecord>>,
}

impl InMemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// All rows in insertion order.
    pub async fn rows(&self) -> Vec<AuditRecord> {
        self.rows.lock().await.clone()
    }
}

#[async_trait]
impl AuditSink for InMemoryAuditSink {
    async fn insert(&self, record: &AuditRecord) -> Result<(), PollqError> {
        self.rows.lock().await.push(record.clone());
        Ok(())
    }
}
