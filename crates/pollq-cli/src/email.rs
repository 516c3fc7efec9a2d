use std::time::Duration;

use async_trait::async_trait;
use pollq_core::domain::{Outcome, PollingTask};
use pollq_core::impls::SentinelProcessor;
use pollq_core::ports::TaskProcessor;
use tracing::info;

/// Pretends to send one email per task.
///
/// Success or failure is still decided by the sentinel rule, so a task
/// carrying `fail_task` walks the recovery path exactly as with the plain
/// [`SentinelProcessor`].
pub struct SimulatedEmailProcessor {
    decider: SentinelProcessor,
    send_latency: Duration,
}

impl SimulatedEmailProcessor {
    pub fn new(send_latency: Duration) -> Self {
        Self {
            decider: SentinelProcessor::new(),
            send_latency,
        }
    }
}

impl Default for SimulatedEmailProcessor {
    fn default() -> Self {
        Self::new(Duration::from_millis(50))
    }
}

#[async_trait]
impl TaskProcessor for SimulatedEmailProcessor {
    async fn process(&self, task: &PollingTask) -> Outcome {
        info!(
            task_id = task.id(),
            transaction_id = task.transaction_id(),
            "sending email"
        );
        tokio::time::sleep(self.send_latency).await;

        let outcome = self.decider.process(task).await;
        info!(
            task_id = task.id(),
            failed = outcome.is_failure(),
            "email send finished"
        );
        outcome
    }
}
