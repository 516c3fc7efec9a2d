//! Impls - ports の実装
//!
//! # 含まれる実装
//! - **InMemoryStore**: 開発用・テスト用のバッキングストア
//! - **InMemoryAuditSink**: テスト用の監査ログ
//! - **SentinelProcessor**: `fail_task` で失敗をシミュレートする成否判定
//! - **RedisStore**: 本番用バッキングストア（feature `redis`）
//! - **PgAuditSink**: 本番用監査ログ（feature `postgres`）

pub mod memory_audit;
pub mod memory_store;
pub mod sentinel;

#[cfg(test)]
pub(crate) mod flaky_store;

#[cfg(feature = "redis")]
pub mod redis_store;

#[cfg(feature = "postgres")]
pub mod pg_audit;

pub use self::memory_audit::InMemoryAuditSink;
pub use self::memory_store::InMemoryStore;
pub use self::sentinel::{FAIL_SENTINEL, SentinelProcessor};

#[cfg(feature = "redis")]
pub use self::redis_store::RedisStore;

#[cfg(feature = "postgres")]
pub use self::pg_audit::PgAuditSink;
