//! `autocat-core`: domain building blocks for transaction categorization.
//!
//! This crate contains **pure domain** types (no IO): job records and their
//! lifecycle, category mappings, manual rules, and the inbound webhook
//! validation chain. The cancellation token every collaborator call takes is
//! re-exported from `tokio-util`.

pub mod category;
pub mod error;
pub mod id;
pub mod job;
pub mod webhook;

pub use category::{CategoryMap, ManualRule, ManualRules};
pub use error::{DomainError, DomainResult};
pub use id::{JobId, TransactionId};
pub use job::{Job, JobData, JobStatus};
pub use webhook::{AcceptedWebhook, validate_webhook};

pub use tokio_util::sync::CancellationToken;
