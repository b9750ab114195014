//! Intake validation for ledger webhooks.
//!
//! The checks run in a fixed order and stop at the first failure; every
//! failure is a [`DomainError::InvalidWebhookPayload`] whose message names the
//! violated rule. Only withdrawals that have no category yet are accepted.

use serde_json::Value as JsonValue;

use crate::error::{DomainError, DomainResult};
use crate::id::TransactionId;

pub const EXPECTED_TRIGGER: &str = "STORE_TRANSACTION";
pub const EXPECTED_RESPONSE: &str = "TRANSACTIONS";
pub const WITHDRAWAL: &str = "withdrawal";

/// The parts of an accepted webhook the rest of the pipeline needs.
#[derive(Debug, Clone, PartialEq)]
pub struct AcceptedWebhook {
    /// Ledger id of the transaction group (used for the write-back).
    pub transaction_id: TransactionId,
    /// Counterparty of the first split.
    pub destination_name: String,
    /// Free-text description of the first split.
    pub description: String,
    /// The splits exactly as received; echoed back on write-back.
    pub transactions: Vec<JsonValue>,
}

/// Run the intake checks over a raw webhook body.
pub fn validate_webhook(payload: &JsonValue) -> DomainResult<AcceptedWebhook> {
    if payload.get("trigger").and_then(JsonValue::as_str) != Some(EXPECTED_TRIGGER) {
        return Err(DomainError::invalid_payload(
            "trigger is not STORE_TRANSACTION. Request will not be processed",
        ));
    }

    if payload.get("response").and_then(JsonValue::as_str) != Some(EXPECTED_RESPONSE) {
        return Err(DomainError::invalid_payload(
            "response is not TRANSACTIONS. Request will not be processed",
        ));
    }

    let content = payload.get("content");

    let transaction_id = content
        .and_then(|c| c.get("id"))
        .and_then(transaction_id_of)
        .ok_or_else(|| DomainError::invalid_payload("Missing content.id"))?;

    let transactions = match content.and_then(|c| c.get("transactions")) {
        Some(JsonValue::Array(items)) if !items.is_empty() => items,
        _ => {
            return Err(DomainError::invalid_payload(
                "No transactions are available in content.transactions",
            ));
        }
    };

    let first = &transactions[0];

    if first.get("type").and_then(JsonValue::as_str) != Some(WITHDRAWAL) {
        return Err(DomainError::invalid_payload(
            "content.transactions[0].type has to be 'withdrawal'. Transaction will be ignored.",
        ));
    }

    if !first.get("category_id").is_none_or(JsonValue::is_null) {
        return Err(DomainError::invalid_payload(
            "content.transactions[0].category_id is already set. Transaction will be ignored.",
        ));
    }

    let description = non_empty_str(first, "description").ok_or_else(|| {
        DomainError::invalid_payload("Missing content.transactions[0].description")
    })?;

    let destination_name = non_empty_str(first, "destination_name").ok_or_else(|| {
        DomainError::invalid_payload("Missing content.transactions[0].destination_name")
    })?;

    Ok(AcceptedWebhook {
        transaction_id,
        destination_name: destination_name.to_string(),
        description: description.to_string(),
        transactions: transactions.clone(),
    })
}

fn transaction_id_of(value: &JsonValue) -> Option<TransactionId> {
    match value {
        JsonValue::String(s) if !s.is_empty() => Some(TransactionId::new(s.clone())),
        JsonValue::Number(n) if n.as_u64().is_some_and(|n| n > 0) => {
            Some(TransactionId::new(n.to_string()))
        }
        _ => None,
    }
}

fn non_empty_str<'a>(value: &'a JsonValue, field: &str) -> Option<&'a str> {
    value
        .get(field)
        .and_then(JsonValue::as_str)
        .filter(|s| !s.is_empty())
}
