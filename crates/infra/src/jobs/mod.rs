//! Categorization jobs.
//!
//! ## Components
//!
//! - `JobRegistry`: every job record, plus `job created`/`job updated` events
//! - `WorkQueue`: FIFO intake, one task at a time
//! - `Worker`: runs a `ClassificationTask` under a timeout

pub mod queue;
pub mod registry;
pub mod task;

pub use queue::{QueueError, QueueStats, WorkQueue, WorkQueueConfig, Worker};
pub use registry::{JobRegistry, RegistryError};
pub use task::{ClassificationTask, CollaboratorError, TaskError, TaskOutcome};
