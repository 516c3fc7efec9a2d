//! PgAuditSink - PostgreSQL の `transactions` テーブルへ追記する
//!
//! 書き込みのみ。行の更新・削除・読み戻しはしない。

use async_trait::async_trait;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing::info;

use crate::domain::AuditRecord;
use crate::error::PollqError;
use crate::ports::AuditSink;

const CREATE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS transactions (
    id             BIGSERIAL PRIMARY KEY,
    task_id        TEXT,
    transaction_id TEXT NOT NULL,
    polling_status TEXT NOT NULL,
    created_at     TIMESTAMPTZ NOT NULL DEFAULT now()
)
"#;

const INSERT_ROW: &str =
    "INSERT INTO transactions (task_id, transaction_id, polling_status) VALUES ($1, $2, $3)";

pub struct PgAuditSink {
    pool: PgPool,
}

impl PgAuditSink {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, PollqError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| PollqError::AuditWriteFailed(format!("connect: {e}")))?;
        Ok(Self::new(pool))
    }

    /// Create the audit table if it does not exist yet.
    pub async fn ensure_schema(&self) -> Result<(), PollqError> {
        sqlx::query(CREATE_TABLE)
            .execute(&self.pool)
            .await
            .map_err(|e| PollqError::AuditWriteFailed(format!("schema: {e}")))?;
        info!("audit schema ready");
        Ok(())
    }
}

#[async_trait]
impl AuditSink for PgAuditSink {
    async fn insert(&self, record: &AuditRecord) -> Result<(), PollqError> {
        sqlx::query(INSERT_ROW)
            .bind(&record.task_id)
            .bind(&record.transaction_id)
            .bind(record.polling_status.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| PollqError::AuditWriteFailed(e.to_string()))?;
        Ok(())
    }
}
