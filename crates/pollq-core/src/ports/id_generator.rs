//! IdGenerator port - ID 生成の抽象化
//!
//! Task の `id` と `transaction_id` はどちらも不透明な文字列。
//! 本番では ULID を使う（時刻でソート可能、調整なしで分散生成できる）。

use ulid::Ulid;

use crate::ports::Clock;

/// Produces identities for newly enqueued tasks.
pub trait IdGenerator: Send + Sync {
    fn generate_task_id(&self) -> String;

    fn generate_transaction_id(&self) -> String;
}

/// UlidGenerator は ULID ベースの ID 生成器
///
/// Clock から timestamp 部分を取るので、FixedClock を渡せば
/// テストで timestamp を固定できる。
pub struct UlidGenerator<C> {
    clock: C,
}

impl<C: Clock> UlidGenerator<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }

    fn next_ulid(&self) -> Ulid {
        let timestamp_ms = self.clock.now().timestamp_millis() as u64;
        Ulid::from_parts(timestamp_ms, rand::random())
    }
}

impl<C: Clock> IdGenerator for UlidGenerator<C> {
    fn generate_task_id(&self) -> String {
        self.next_ulid().to_string()
    }

    fn generate_transaction_id(&self) -> String {
        format!("txn-{}", self.next_ulid())
    }
}
