//! Push channel for job progress.

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    extract::Extension,
    response::sse::{Event as SseEvent, Sse},
};
use tokio_stream::Stream;

use crate::app::services::{self, AppServices};

/// GET /events
///
/// Server-Sent Events. The first event is `jobs` with the current snapshot;
/// after that every `job created` / `job updated` arrives as `{job, jobs}`.
/// Observers that disconnect are dropped on the next publish.
pub async fn stream_events(
    Extension(services): Extension<Arc<AppServices>>,
) -> Sse<impl Stream<Item = Result<SseEvent, Infallible>>> {
    services::job_sse_stream(services)
}
