//! External service clients/adapters.

pub mod firefly;

use async_trait::async_trait;
use serde_json::Value as JsonValue;

use autocat_core::{CancellationToken, CategoryMap, TransactionId};

pub use firefly::{FireflyClient, FireflyConfig};

/// Ledger failure.
#[derive(Debug, Clone, thiserror::Error)]
pub enum LedgerError {
    /// The ledger answered with a non-success status.
    #[error("ledger request failed: {status} - {body}")]
    Http { status: u16, body: String },

    /// The ledger could not be reached.
    #[error("ledger transport error: {0}")]
    Transport(String),

    /// The ledger answered, but not in the expected shape.
    #[error("unexpected ledger response: {0}")]
    Decode(String),

    /// The job that issued this call was abandoned.
    #[error("ledger call cancelled")]
    Cancelled,
}

/// System of record for transactions and categories.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Current category set, name → identifier.
    async fn get_categories(&self, cancel: &CancellationToken) -> Result<CategoryMap, LedgerError>;

    /// Assign `category_id` to every split in `transactions` of group `transaction_id`.
    async fn set_category(
        &self,
        transaction_id: &TransactionId,
        transactions: &[JsonValue],
        category_id: &str,
        cancel: &CancellationToken,
    ) -> Result<(), LedgerError>;
}
