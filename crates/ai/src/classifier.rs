use async_trait::async_trait;

use autocat_core::CancellationToken;

use crate::result::{AiError, Classification};

/// Guesses a spending category for a transaction.
#[async_trait]
pub trait Classifier: Send + Sync {
    /// Pick one of `categories` for a transaction to `destination_name`
    /// described as `description`.
    ///
    /// Implementations should give up early once `cancel` is cancelled.
    async fn classify(
        &self,
        categories: &[String],
        destination_name: &str,
        description: &str,
        cancel: &CancellationToken,
    ) -> Result<Classification, AiError>;
}
