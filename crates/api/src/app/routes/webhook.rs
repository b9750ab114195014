use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::Value as JsonValue;
use tracing::{info, warn};

use autocat_core::{DomainError, validate_webhook};

use crate::app::errors::{queue_error_to_response, rejection};
use crate::app::services::AppServices;

/// POST /webhook
///
/// Accepts a ledger "transaction stored" notification. On acceptance a job
/// is queued and `200 Queued` returned right away; processing is
/// asynchronous and its outcome is only visible on the push channel.
pub async fn receive(Extension(services): Extension<Arc<AppServices>>, body: Bytes) -> Response {
    let payload: JsonValue = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(e) => {
            let err = DomainError::invalid_payload(format!("Request body is not valid JSON: {e}"));
            warn!(error = %err, "webhook rejected");
            return rejection(&err);
        }
    };

    let accepted = match validate_webhook(&payload) {
        Ok(accepted) => accepted,
        Err(err) => {
            warn!(error = %err, "webhook rejected");
            return rejection(&err);
        }
    };

    let transaction_id = accepted.transaction_id.clone();
    match services.queue().submit(accepted) {
        Ok(job) => {
            info!(job_id = %job.id, transaction_id = %transaction_id, "job queued");
            (StatusCode::OK, "Queued").into_response()
        }
        Err(e) => queue_error_to_response(e),
    }
}
