//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: registry, work queue, push channel
//! - `routes/`: HTTP routes + handlers
//! - `errors.rs`: consistent error responses

use std::path::PathBuf;
use std::sync::Arc;

use axum::{Extension, Router, routing::get};
use tower::ServiceBuilder;
use tower_http::{services::ServeDir, trace::TraceLayer};

pub mod errors;
pub mod routes;
pub mod services;

pub use services::{AppServices, ServiceParts};

/// Router options that do not belong to the job pipeline.
#[derive(Debug, Clone, Default)]
pub struct AppOptions {
    /// Serve static files from this directory at `/`.
    pub static_dir: Option<PathBuf>,
}

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub fn build_app(services: Arc<AppServices>, options: AppOptions) -> Router {
    let app = Router::new()
        .route("/health", get(routes::system::health))
        .merge(routes::router())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(Extension(services)),
        );

    match options.static_dir {
        Some(dir) => app.fallback_service(ServeDir::new(dir)),
        None => app,
    }
}
