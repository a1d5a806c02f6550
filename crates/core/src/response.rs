//! Outbound response shapes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::result::RowMap;

/// The single response shape returned for every request, whichever stage
/// ended it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResponse {
    pub success: bool,
    pub question: String,
    pub tenant_id: String,
    /// Candidate query text; empty when generation never produced one.
    pub sql_query: String,
    pub explanation: Option<String>,
    pub data: Option<Vec<RowMap>>,
    pub columns: Option<Vec<String>>,
    pub row_count: Option<usize>,
    pub truncated: Option<bool>,
    /// Stage that ended a failed request (`generation`, `validation`, `execution`).
    pub stage: Option<String>,
    pub error: Option<String>,
    pub natural_language_response: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl QueryResponse {
    /// Skeleton with every optional field empty and `success = false`.
    pub fn new(question: impl Into<String>, tenant_id: impl Into<String>) -> Self {
        Self {
            success: false,
            question: question.into(),
            tenant_id: tenant_id.into(),
            sql_query: String::new(),
            explanation: None,
            data: None,
            columns: None,
            row_count: None,
            truncated: None,
            stage: None,
            error: None,
            natural_language_response: None,
            timestamp: Utc::now(),
        }
    }
}

/// Liveness payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    /// Unix timestamp in seconds.
    pub timestamp: f64,
}

impl HealthResponse {
    pub fn healthy(service: impl Into<String>, version: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            status: "healthy".to_string(),
            service: service.into(),
            version: version.into(),
            timestamp: now.timestamp_millis() as f64 / 1000.0,
        }
    }
}
