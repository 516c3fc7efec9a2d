//! Audit rows written per processing attempt.
//!
//! The audit trail is append-only and write-only from the queue's point of
//! view. It is never consulted to decide routing.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::task::PollingTask;

/// Which worker stage produced an audit row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PollingStatus {
    PrimaryProcessing,
    RecoveryProcessing,
}

impl PollingStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PollingStatus::PrimaryProcessing => "primary-processing",
            PollingStatus::RecoveryProcessing => "recovery-processing",
        }
    }
}

impl fmt::Display for PollingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub task_id: String,
    pub transaction_id: String,
    pub polling_status: PollingStatus,
}

impl AuditRecord {
    pub fn for_task(task: &PollingTask, polling_status: PollingStatus) -> Self {
        Self {
            task_id: task.id().to_string(),
            transaction_id: task.transaction_id().to_string(),
            polling_status,
        }
    }
}
