use axum::{Router, routing::post};

pub mod query;
pub mod system;

/// Router for the versioned query API (mounted under `/api/v1`).
pub fn router() -> Router {
    Router::new().route("/query", post(query::process_query))
}
