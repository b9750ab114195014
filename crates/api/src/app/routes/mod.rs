use axum::{
    Router,
    routing::{get, post},
};

pub mod event_stream;
pub mod jobs;
pub mod system;
pub mod webhook;

/// Router for the job pipeline endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/webhook", post(webhook::receive))
        .route("/jobs", get(jobs::list))
        .route("/queue/stats", get(jobs::queue_stats))
        .route("/events", get(event_stream::stream_events))
}
