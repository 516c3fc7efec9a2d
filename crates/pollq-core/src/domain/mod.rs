//! Domain model (task, audit row, outcome, lifecycle state, enqueue request).

pub mod audit;
pub mod outcome;
pub mod request;
pub mod state;
pub mod task;

pub use audit::{AuditRecord, PollingStatus};
pub use outcome::{Outcome, OutcomeKind};
pub use request::EnqueueBatchRequest;
pub use state::TaskState;
pub use task::PollingTask;
