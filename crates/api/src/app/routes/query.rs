use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, rejection::JsonRejection},
    http::StatusCode,
};
use tracing::info;

use usageql_core::{QueryRequest, QueryResponse};

use crate::app::errors;
use crate::app::services::AppServices;

/// `POST /api/v1/query`
///
/// Malformed or invalid requests get a 422. Anything past request validation
/// answers 200 with `success` and `stage` describing the outcome.
pub async fn process_query(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<QueryRequest>, JsonRejection>,
) -> Result<Json<QueryResponse>, axum::response::Response> {
    let Json(request) = body.map_err(|rejection| {
        errors::json_error(
            StatusCode::UNPROCESSABLE_ENTITY,
            "invalid_request",
            rejection.body_text(),
        )
    })?;

    let tenant_id = request
        .validate()
        .map_err(errors::domain_error_to_response)?;

    let run = services.pipeline.run(&request.question, &tenant_id).await;
    let response = run.into_response();

    info!(
        tenant_id = %tenant_id,
        success = response.success,
        row_count = ?response.row_count,
        stage = ?response.stage,
        "query request processed"
    );
    Ok(Json(response))
}
