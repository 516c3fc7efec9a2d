//! Ports - 抽象化レイヤー
//!
//! 外部システム（Redis, PostgreSQL）への境界を trait で定義する。
//!
//! # 設計原則
//! - Redis（QueueStore）がキュー状態と retry counter の正本
//! - PostgreSQL（AuditSink）は追記のみの監査ログで、ルーティングには使わない
//! - 成否判定（TaskProcessor）は差し替え可能

pub mod audit_sink;
pub mod clock;
pub mod id_generator;
pub mod processor;
pub mod queue_store;

pub use self::audit_sink::AuditSink;
pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::processor::TaskProcessor;
pub use self::queue_store::QueueStore;
