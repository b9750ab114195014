//! Job lifecycle events and their delivery.
//!
//! - [`JobEvent`]: what happened to a job, plus a full snapshot of all jobs
//! - [`Listeners`]: synchronous, in-order callbacks attached to the job registry
//! - [`EventBus`] / [`InMemoryEventBus`]: non-blocking fan-out to push-channel observers

pub mod bus;
pub mod event;
pub mod in_memory_bus;
pub mod listener;

pub use bus::{EventBus, Subscription};
pub use event::{JobEvent, JobEventKind, JOBS_SNAPSHOT_EVENT};
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
pub use listener::{Listener, Listeners};
