use std::sync::Arc;

use axum::{Json, extract::Extension, http::StatusCode, response::IntoResponse};

use usageql_core::HealthResponse;

use crate::app::errors;
use crate::app::services::AppServices;

/// Liveness: the process is up. Does not touch the database.
pub async fn health(Extension(services): Extension<Arc<AppServices>>) -> Json<HealthResponse> {
    Json(HealthResponse::healthy(
        services.service_name.clone(),
        services.version.clone(),
    ))
}

/// Readiness: the database answers a trivial round trip.
pub async fn ready(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    if services.pipeline.executor().test_connectivity().await {
        (
            StatusCode::OK,
            Json(serde_json::json!({ "status": "ready", "database": "reachable" })),
        )
            .into_response()
    } else {
        errors::json_error(
            StatusCode::SERVICE_UNAVAILABLE,
            "not_ready",
            "database is unreachable",
        )
    }
}
