//! Relational store boundary.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use usageql_core::{DenyReason, ExecutionResult};

/// Failure while running a query against the store.
///
/// `Display` carries diagnostic detail for logs; use
/// [`ExecutionError::public_message`] for anything returned to a caller.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExecutionError {
    /// The query failed the executor's own re-validation and never reached the store.
    #[error("query refused before execution: {0}")]
    Unvalidated(DenyReason),

    /// Network, authentication or pool acquisition failure.
    #[error("store connection failed: {0}")]
    Connection(String),

    #[error("query exceeded timeout of {0:?}")]
    Timeout(Duration),

    /// The store parsed or planned the query and refused it.
    #[error(
        "store rejected query{}: {message}",
        .code.as_deref().map(|c| format!(" ({c})")).unwrap_or_default()
    )]
    Rejected {
        code: Option<String>,
        message: String,
    },

    /// A value in the result set could not be materialized.
    #[error("failed to decode result: {0}")]
    Decode(String),
}

impl ExecutionError {
    /// Caller-safe message. Never contains raw store errors or connection details.
    pub fn public_message(&self) -> String {
        match self {
            ExecutionError::Unvalidated(reason) => reason.to_string(),
            ExecutionError::Connection(_) => "the database is currently unavailable".to_string(),
            ExecutionError::Timeout(limit) => {
                format!("query timed out after {} seconds", limit.as_secs_f64())
            }
            ExecutionError::Rejected { .. } => {
                "the database could not run the generated query".to_string()
            }
            ExecutionError::Decode(_) => "the query result could not be read".to_string(),
        }
    }
}

/// One column as reported by the store's catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaColumn {
    pub table_name: String,
    pub column_name: String,
    pub data_type: String,
    pub is_nullable: bool,
}

/// Read-only access to a relational store.
///
/// Implementations run exactly the text they are given. Validation is the
/// caller's job (see [`super::QueryExecutor`]).
#[async_trait]
pub trait QueryStore: Send + Sync {
    /// Run `query` and materialize its result set, stopping after `max_rows`
    /// rows when a cap is given.
    async fn fetch(
        &self,
        query: &str,
        max_rows: Option<usize>,
    ) -> Result<ExecutionResult, ExecutionError>;

    /// Trivial round trip.
    async fn ping(&self) -> Result<(), ExecutionError>;

    /// Store-wide column catalog, ordered by table then column position.
    async fn schema_columns(&self) -> Result<Vec<SchemaColumn>, ExecutionError>;
}

#[async_trait]
impl<S> QueryStore for Arc<S>
where
    S: QueryStore + ?Sized,
{
    async fn fetch(
        &self,
        query: &str,
        max_rows: Option<usize>,
    ) -> Result<ExecutionResult, ExecutionError> {
        (**self).fetch(query, max_rows).await
    }

    async fn ping(&self) -> Result<(), ExecutionError> {
        (**self).ping().await
    }

    async fn schema_columns(&self) -> Result<Vec<SchemaColumn>, ExecutionError> {
        (**self).schema_columns().await
    }
}
