//! Category resolution: manual rules first, classifier second.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use autocat_ai::Classifier;
use autocat_core::{CancellationToken, CategoryMap, ManualRules};

use crate::external::LedgerClient;
use crate::jobs::CollaboratorError;

/// Prompt recorded when a manual rule decided the category.
pub const MANUAL_PROMPT: &str = "Fetched from manual categories configuration";

/// Where a resolved category came from.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionSource {
    Manual,
    Classifier,
}

/// Outcome of resolving one transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Ledger's canonical category name; `None` when nothing matched.
    pub category: Option<String>,
    /// Ledger identifier for `category`.
    pub category_id: Option<String>,
    pub prompt: String,
    pub response: String,
    pub source: ResolutionSource,
}

/// A manual rule hit that also exists in the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManualMatch {
    /// Category as written in the rule.
    pub rule_category: String,
    /// Canonical ledger name.
    pub category: String,
    pub category_id: String,
}

/// Pure manual-rule decision.
///
/// The first rule matching `description` wins, but only counts if its
/// category also exists in the ledger (case-insensitive). A rule that points
/// at an unknown category yields `None`; later rules are not consulted.
pub fn manual_match(
    rules: &ManualRules,
    categories: &CategoryMap,
    description: &str,
) -> Option<ManualMatch> {
    let rule = rules.find(description)?;
    match categories.find_ignore_case(&rule.category) {
        Some((name, id)) => Some(ManualMatch {
            rule_category: rule.category.clone(),
            category: name.to_string(),
            category_id: id.to_string(),
        }),
        None => {
            warn!(
                category = %rule.category,
                pattern = %rule.transaction_contains,
                "manual rule matched, but its category does not exist in the ledger"
            );
            None
        }
    }
}

/// Decides the category of one transaction.
///
/// Fetches the ledger's category set fresh on every call. Manual rules are
/// operator-curated and always take precedence over the classifier.
pub struct CategoryResolver {
    ledger: Arc<dyn LedgerClient>,
    classifier: Arc<dyn Classifier>,
    rules: ManualRules,
}

impl CategoryResolver {
    pub fn new(
        ledger: Arc<dyn LedgerClient>,
        classifier: Arc<dyn Classifier>,
        rules: ManualRules,
    ) -> Self {
        Self {
            ledger,
            classifier,
            rules,
        }
    }

    pub fn rules(&self) -> &ManualRules {
        &self.rules
    }

    pub async fn resolve(
        &self,
        destination_name: &str,
        description: &str,
        cancel: &CancellationToken,
    ) -> Result<Resolution, CollaboratorError> {
        let categories = self.ledger.get_categories(cancel).await?;

        if let Some(hit) = manual_match(&self.rules, &categories, description) {
            info!(category = %hit.category, "category found in manual configuration");
            return Ok(Resolution {
                category: Some(hit.category),
                category_id: Some(hit.category_id),
                prompt: MANUAL_PROMPT.to_string(),
                response: hit.rule_category,
                source: ResolutionSource::Manual,
            });
        }

        let classification = self
            .classifier
            .classify(&categories.names(), destination_name, description, cancel)
            .await?;

        let matched = classification
            .category
            .as_deref()
            .and_then(|name| categories.get(name).map(|id| (name.to_string(), id.to_string())));
        if classification.category.is_some() && matched.is_none() {
            warn!(
                guess = ?classification.category,
                "classifier returned a category the ledger does not know"
            );
        }

        let (category, category_id) = matched.unzip();
        Ok(Resolution {
            category,
            category_id,
            prompt: classification.prompt,
            response: classification.response,
            source: ResolutionSource::Classifier,
        })
    }
}

impl core::fmt::Debug for CategoryResolver {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CategoryResolver")
            .field("rules", &self.rules.len())
            .finish_non_exhaustive()
    }
}
