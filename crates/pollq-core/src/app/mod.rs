//! App - アプリケーション層
//!
//! ports を組み合わせてルーティングとリトライ管理を実装する。
//!
//! # 主要コンポーネント
//! - **Enqueuer**: primary queue への投入
//! - **PrimaryWorker**: pop → 実行 → 成功なら監査ログ、失敗なら recovery へ
//! - **RecoveryWorker**: pop → retry counter 確認 → 記録 or 破棄
//! - **WorkerGroup**: ワーカーごとに tokio task を起動し、停止シグナルを配る
//! - **PipelineBuilder**: 上記のワイヤリング

pub mod builder;
pub mod config;
pub mod enqueue;
pub mod primary;
pub mod recovery;
pub mod worker_group;

pub use self::builder::{BuildError, Pipeline, PipelineBuilder};
pub use self::config::{QueueConfig, RecoveryMode, RecoveryPolicy};
pub use self::enqueue::Enqueuer;
pub use self::primary::{PrimaryOutcome, PrimaryWorker};
pub use self::recovery::{RecoveryOutcome, RecoveryWorker};
pub use self::worker_group::{Worker, WorkerGroup};
