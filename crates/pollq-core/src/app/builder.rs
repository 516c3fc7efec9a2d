//! PipelineBuilder - ストア・監査ログ・成否判定を組み合わせて
//! Enqueuer と 2 つのワーカーを構築する
//!
//! # Fail-fast 設計
//! - store と audit は必須。足りなければ build() が BuildError を返す
//! - processor / id generator / config は省略時にデフォルトを使う
//!
//! # 使用例
//! ```ignore
//! let pipeline = PipelineBuilder::new()
//!     .store(store)
//!     .audit(audit)
//!     .build()?;
//! let group = pipeline.spawn_workers();
//! ```

use std::sync::Arc;

use super::config::QueueConfig;
use super::enqueue::Enqueuer;
use super::primary::PrimaryWorker;
use super::recovery::RecoveryWorker;
use super::worker_group::{Worker, WorkerGroup};
use crate::impls::SentinelProcessor;
use crate::ports::{AuditSink, IdGenerator, QueueStore, SystemClock, TaskProcessor, UlidGenerator};

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("missing component: {0}")]
    MissingComponent(&'static str),
}

#[derive(Default)]
pub struct PipelineBuilder {
    store: Option<Arc<dyn QueueStore>>,
    audit: Option<Arc<dyn AuditSink>>,
    processor: Option<Arc<dyn TaskProcessor>>,
    ids: Option<Arc<dyn IdGenerator>>,
    config: QueueConfig,
}

impl PipelineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store(mut self, store: Arc<dyn QueueStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn audit(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = Some(audit);
        self
    }

    pub fn processor(mut self, processor: Arc<dyn TaskProcessor>) -> Self {
        self.processor = Some(processor);
        self
    }

    pub fn id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = Some(ids);
        self
    }

    pub fn config(mut self, config: QueueConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Result<Pipeline, BuildError> {
        let store = self.store.ok_or(BuildError::MissingComponent("store"))?;
        let audit = self.audit.ok_or(BuildError::MissingComponent("audit"))?;
        let processor = self
            .processor
            .unwrap_or_else(|| Arc::new(SentinelProcessor::new()));
        let ids = self
            .ids
            .unwrap_or_else(|| Arc::new(UlidGenerator::new(SystemClock)));

        Ok(Pipeline {
            enqueuer: Arc::new(Enqueuer::new(store.clone(), ids, self.config.clone())),
            primary: Arc::new(PrimaryWorker::new(
                store.clone(),
                audit.clone(),
                processor.clone(),
                self.config.clone(),
            )),
            recovery: Arc::new(RecoveryWorker::new(store, audit, processor, self.config)),
        })
    }
}

/// Enqueuer + both workers sharing one store, audit sink, and config.
pub struct Pipeline {
    pub enqueuer: Arc<Enqueuer>,
    pub primary: Arc<PrimaryWorker>,
    pub recovery: Arc<RecoveryWorker>,
}

impl Pipeline {
    /// One dedicated tokio task per worker.
    pub fn spawn_workers(&self) -> WorkerGroup {
        let primary: Arc<dyn Worker> = self.primary.clone();
        let recovery: Arc<dyn Worker> = self.recovery.clone();
        WorkerGroup::spawn(vec![primary, recovery])
    }
}
