//! pollq-core
//!
//! At-least-once background task queue with a two-stage failure path.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（PollingTask, AuditRecord, Outcome, TaskState, EnqueueBatchRequest）
//! - **ports**: 抽象化レイヤー（QueueStore, AuditSink, TaskProcessor, Clock, IdGenerator）
//! - **app**: アプリケーションロジック（Enqueuer, PrimaryWorker, RecoveryWorker, WorkerGroup）
//! - **impls**: 実装（InMemoryStore, RedisStore, PgAuditSink など）
//! - **error**: エラー型

pub mod app;
pub mod domain;
pub mod error;
pub mod impls;
pub mod ports;

pub use app::{
    Enqueuer, Pipeline, PipelineBuilder, PrimaryWorker, QueueConfig, RecoveryMode,
    RecoveryPolicy, RecoveryWorker, WorkerGroup,
};
pub use domain::{AuditRecord, EnqueueBatchRequest, PollingStatus, PollingTask};
pub use error::PollqError;
