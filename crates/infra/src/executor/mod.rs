//! Query execution against the relational store.
//!
//! [`QueryExecutor`] is the only path from a query string to the store. It
//! re-runs both textual guards itself before any store call, bounds each
//! round trip with a wall-clock timeout, and caps the result size when
//! configured to.

pub mod in_memory;
pub mod postgres;
pub mod store;

use std::time::{Duration, Instant};

use tracing::{debug, info, instrument, warn};

use usageql_core::{ExecutionResult, TenantId, validate_candidate};

pub use in_memory::InMemoryQueryStore;
pub use postgres::PostgresQueryStore;
pub use store::{ExecutionError, QueryStore, SchemaColumn};

pub const SCHEMA_UNAVAILABLE: &str = "Error retrieving schema information";

/// Per-executor limits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutorConfig {
    /// Wall-clock bound on each store round trip.
    pub query_timeout: Duration,
    /// Truncate results beyond this many rows. `None` means no cap.
    pub max_rows: Option<usize>,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            query_timeout: Duration::from_secs(30),
            max_rows: None,
        }
    }
}

/// Runs validated queries and materializes their results.
#[derive(Debug, Clone)]
pub struct QueryExecutor<S> {
    store: S,
    config: ExecutorConfig,
}

impl<S> QueryExecutor<S>
where
    S: QueryStore,
{
    pub fn new(store: S, config: ExecutorConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Execute `query` on behalf of `tenant_id`.
    ///
    /// The query is checked again here regardless of what the caller already
    /// did; a query that fails either guard never reaches the store. Timed-out
    /// queries are not retried.
    #[instrument(skip(self, query, tenant_id), fields(tenant_id = %tenant_id), err)]
    pub async fn execute(
        &self,
        query: &str,
        tenant_id: &TenantId,
    ) -> Result<ExecutionResult, ExecutionError> {
        if let Err(reason) = validate_candidate(query, tenant_id) {
            warn!(check = reason.check(), %reason, "executor refused unvalidated query");
            return Err(ExecutionError::Unvalidated(reason));
        }

        debug!(query, "executing query");
        let started = Instant::now();
        let limit = self.config.query_timeout;

        let fetch = self.store.fetch(query, self.config.max_rows);
        let result = match tokio::time::timeout(limit, fetch).await {
            Ok(Ok(result)) => result.capped(self.config.max_rows),
            Ok(Err(ExecutionError::Timeout(_))) | Err(_) => {
                return Err(ExecutionError::Timeout(limit));
            }
            Ok(Err(err)) => return Err(err),
        };

        info!(
            row_count = result.row_count,
            columns = result.columns.len(),
            truncated = result.truncated,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "query executed"
        );
        Ok(result)
    }

    /// Whether the store answers a trivial round trip within the query timeout.
    pub async fn test_connectivity(&self) -> bool {
        match tokio::time::timeout(self.config.query_timeout, self.store.ping()).await {
            Ok(Ok(())) => true,
            Ok(Err(err)) => {
                warn!(error = %err, "connectivity probe failed");
                false
            }
            Err(_) => {
                warn!("connectivity probe timed out");
                false
            }
        }
    }

    /// Human-readable, store-wide schema listing.
    ///
    /// Table and column names are not tenant-scoped; do not surface this to
    /// end users unreviewed.
    pub async fn describe_schema(&self) -> String {
        match tokio::time::timeout(self.config.query_timeout, self.store.schema_columns()).await {
            Ok(Ok(columns)) => format_schema(&columns),
            Ok(Err(err)) => {
                warn!(error = %err, "schema lookup failed");
                SCHEMA_UNAVAILABLE.to_string()
            }
            Err(_) => {
                warn!("schema lookup timed out");
                SCHEMA_UNAVAILABLE.to_string()
            }
        }
    }
}

fn format_schema(columns: &[SchemaColumn]) -> String {
    let mut out = String::from("Database Schema:\n");
    let mut current: Option<&str> = None;
    for col in columns {
        if current != Some(col.table_name.as_str()) {
            out.push_str(&format!("\nTable: {}\n", col.table_name));
            current = Some(col.table_name.as_str());
        }
        let nullable = if col.is_nullable { "NULL" } else { "NOT NULL" };
        out.push_str(&format!("- {} ({}) {}\n", col.column_name, col.data_type, nullable));
    }
    out
}
