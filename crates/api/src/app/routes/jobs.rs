use std::sync::Arc;

use axum::{Json, extract::Extension};

use autocat_core::Job;
use autocat_infra::jobs::QueueStats;

use crate::app::services::AppServices;

/// GET /jobs
///
/// All known jobs in creation order.
pub async fn list(Extension(services): Extension<Arc<AppServices>>) -> Json<Vec<Job>> {
    Json(services.registry().jobs())
}

/// GET /queue/stats
pub async fn queue_stats(Extension(services): Extension<Arc<AppServices>>) -> Json<QueueStats> {
    Json(services.queue().stats())
}
