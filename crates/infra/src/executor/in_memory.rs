//! Scripted in-memory store for tests and local runs.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use usageql_core::ExecutionResult;

use super::store::{ExecutionError, QueryStore, SchemaColumn};

#[derive(Debug, Clone)]
enum Scripted {
    Rows(ExecutionResult),
    Fail(ExecutionError),
}

#[derive(Debug, Clone)]
struct Script {
    response: Scripted,
    delay: Option<Duration>,
}

/// Answers queries from a fixed script keyed by exact query text.
///
/// Every query that reaches [`QueryStore::fetch`] is recorded before any
/// scripted delay, so tests can assert on what was (or was not) sent.
#[derive(Debug, Default)]
pub struct InMemoryQueryStore {
    scripts: HashMap<String, Script>,
    schema: Vec<SchemaColumn>,
    executed: Mutex<Vec<String>>,
    unreachable: AtomicBool,
}

impl InMemoryQueryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_result(mut self, query: impl Into<String>, result: ExecutionResult) -> Self {
        self.scripts.insert(
            query.into(),
            Script {
                response: Scripted::Rows(result),
                delay: None,
            },
        );
        self
    }

    pub fn with_error(mut self, query: impl Into<String>, error: ExecutionError) -> Self {
        self.scripts.insert(
            query.into(),
            Script {
                response: Scripted::Fail(error),
                delay: None,
            },
        );
        self
    }

    /// Delay the scripted response for `query` (no-op if not scripted).
    pub fn with_delay(mut self, query: &str, delay: Duration) -> Self {
        if let Some(script) = self.scripts.get_mut(query) {
            script.delay = Some(delay);
        }
        self
    }

    pub fn with_schema(mut self, columns: Vec<SchemaColumn>) -> Self {
        self.schema = columns;
        self
    }

    /// Simulate a store that refuses connections.
    pub fn set_reachable(&self, reachable: bool) {
        self.unreachable.store(!reachable, Ordering::SeqCst);
    }

    /// Queries received so far, in order.
    pub fn executed(&self) -> Vec<String> {
        self.executed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn check_reachable(&self) -> Result<(), ExecutionError> {
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(ExecutionError::Connection("connection refused".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl QueryStore for InMemoryQueryStore {
    async fn fetch(
        &self,
        query: &str,
        max_rows: Option<usize>,
    ) -> Result<ExecutionResult, ExecutionError> {
        self.executed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(query.to_string());
        self.check_reachable()?;

        let Some(script) = self.scripts.get(query).cloned() else {
            return Err(ExecutionError::Rejected {
                code: Some("42601".to_string()),
                message: "no scripted response for query".to_string(),
            });
        };

        if let Some(delay) = script.delay {
            tokio::time::sleep(delay).await;
        }

        match script.response {
            Scripted::Rows(result) => Ok(result.capped(max_rows)),
            Scripted::Fail(err) => Err(err),
        }
    }

    async fn ping(&self) -> Result<(), ExecutionError> {
        self.check_reachable()
    }

    async fn schema_columns(&self) -> Result<Vec<SchemaColumn>, ExecutionError> {
        self.check_reachable()?;
        Ok(self.schema.clone())
    }
}
