//! RedisStore - 本番用のバッキングストア
//!
//! | 操作 | コマンド |
//! |---|---|
//! | push | LPUSH |
//! | blocking_pop | BRPOP（短いタイムアウトで繰り返す） |
//! | remove_by_value | LREM count=1 |
//! | set_with_ttl | SET .. EX |
//! | get / increment / len | GET / INCR / LLEN |
//!
//! BRPOP は queue ごとの専用コネクションで実行する。multiplexed コネクション上で
//! blocking コマンドを流すと他のコマンドまで待たされるため。
//! 専用コネクションは使い回し、エラーが出たときだけ張り直す。

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use tokio::sync::{Mutex, watch};
use tracing::{debug, instrument};

use crate::error::PollqError;
use crate::ports::QueueStore;

/// Default upper bound of a single BRPOP round trip.
pub const DEFAULT_POP_TIMEOUT: Duration = Duration::from_secs(1);

fn store_err(e: redis::RedisError) -> PollqError {
    PollqError::StoreUnavailable(e.to_string())
}

pub struct RedisStore {
    client: redis::Client,
    conn: MultiplexedConnection,
    /// Idle BRPOP connections keyed by queue name.
    pop_conns: Mutex<HashMap<String, MultiplexedConnection>>,
    pop_timeout: Duration,
}

impl RedisStore {
    /// Connect to `redis_url` (e.g. `redis://localhost:6379/0`).
    pub async fn connect(redis_url: &str, pop_timeout: Duration) -> Result<Self, PollqError> {
        let client = redis::Client::open(redis_url).map_err(store_err)?;
        let conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(store_err)?;
        debug!("connected to redis");
        Ok(Self {
            client,
            conn,
            pop_conns: Mutex::new(HashMap::new()),
            pop_timeout,
        })
    }

    /// Take the idle BRPOP connection for `queue`, or open one.
    ///
    /// The connection is checked out for the whole pop, so concurrent pops on
    /// one queue never share a blocked connection.
    async fn checkout_pop_conn(&self, queue: &str) -> Result<MultiplexedConnection, PollqError> {
        if let Some(conn) = self.pop_conns.lock().await.remove(queue) {
            return Ok(conn);
        }
        debug!(queue, "opening dedicated pop connection");
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(store_err)
    }

    async fn checkin_pop_conn(&self, queue: &str, conn: MultiplexedConnection) {
        self.pop_conns.lock().await.insert(queue.to_string(), conn);
    }

    /// Number of idle BRPOP connections currently kept.
    pub async fn idle_pop_connections(&self) -> usize {
        self.pop_conns.lock().await.len()
    }

    /// BRPOP の timeout 引数は秒（整数）で渡す。0 は無限待ちになるので最低 1 秒。
    fn pop_timeout_secs(&self) -> u64 {
        self.pop_timeout.as_secs().max(1)
    }
}

#[async_trait]
impl QueueStore for RedisStore {
    async fn push(&self, queue: &str, entry: &str) -> Result<(), PollqError> {
        let mut conn = self.conn.clone();
        redis::cmd("LPUSH")
            .arg(queue)
            .arg(entry)
            .query_async::<_, i64>(&mut conn)
            .await
            .map_err(store_err)?;
        Ok(())
    }

    #[instrument(skip(self, shutdown), err)]
    async fn blocking_pop(
        &self,
        queue: &str,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Result<Option<String>, PollqError> {
        let mut conn = self.checkout_pop_conn(queue).await?;

        // BRPOP の future を途中で drop すると pop 済みの要素を失うので、
        // select で中断せず、タイムアウトごとに停止シグナルを確認する
        loop {
            if *shutdown.borrow() {
                self.checkin_pop_conn(queue, conn).await;
                return Ok(None);
            }

            // エラー時はコネクションを返却せずに捨て、次回張り直す
            let popped: Option<(String, String)> = redis::cmd("BRPOP")
                .arg(queue)
                .arg(self.pop_timeout_secs())
                .query_async(&mut conn)
                .await
                .map_err(store_err)?;

            if let Some((_queue, entry)) = popped {
                self.checkin_pop_conn(queue, conn).await;
                return Ok(Some(entry));
            }
        }
    }

    async fn remove_by_value(&self, queue: &str, entry: &str) -> Result<u64, PollqError> {
        let mut conn = self.conn.clone();
        redis::cmd("LREM")
            .arg(queue)
            .arg(1)
            .arg(entry)
            .query_async::<_, u64>(&mut conn)
            .await
            .map_err(store_err)
    }

    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> Result<(), PollqError> {
        let mut conn = self.conn.clone();
        redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("EX")
            .arg(ttl.as_secs().max(1))
            .query_async::<_, ()>(&mut conn)
            .await
            .map_err(store_err)
    }

    async fn get(&self, key: &str) -> Result<Option<String>, PollqError> {
        let mut conn = self.conn.clone();
        redis::cmd("GET")
            .arg(key)
            .query_async::<_, Option<String>>(&mut conn)
            .await
            .map_err(store_err)
    }

    async fn increment(&self, key: &str) -> Result<i64, PollqError> {
        let mut conn = self.conn.clone();
        redis::cmd("INCR")
            .arg(key)
            .query_async::<_, i64>(&mut conn)
            .await
            .map_err(store_err)
    }

    async fn len(&self, queue: &str) -> Result<usize, PollqError> {
        let mut conn = self.conn.clone();
        redis::cmd("LLEN")
            .arg(queue)
            .query_async::<_, usize>(&mut conn)
            .await
            .map_err(store_err)
    }
}
