//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: builds the query pipeline from configuration
//! - `routes/`: HTTP routes + handlers
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{Extension, Router, routing::get};
use tower::ServiceBuilder;

use usageql_infra::AppConfig;

use crate::middleware;

pub mod errors;
pub mod routes;
pub mod services;

/// Build the full HTTP router from configuration (entrypoint used by `main.rs`).
pub fn build_app(config: &AppConfig) -> Result<Router, services::ServicesError> {
    let services = services::build_services(config)?;
    Ok(build_router(Arc::new(services)))
}

/// Router over already-built services. Tests use this with in-memory collaborators.
pub fn build_router(services: Arc<AppServices>) -> Router {
    Router::new()
        .route("/health", get(routes::system::health))
        .route("/health/ready", get(routes::system::ready))
        .nest("/api/v1", routes::router())
        .layer(
            ServiceBuilder::new()
                .layer(axum::middleware::from_fn(middleware::request_context))
                .layer(Extension(services)),
        )
}

pub use services::AppServices;
