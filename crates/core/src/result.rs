//! Materialized result sets.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// One result row: column name → value, in result-column order.
pub type RowMap = serde_json::Map<String, JsonValue>;

/// Result of executing a validated query.
///
/// Owned by the executor until handed to the orchestrator, immutable after.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// Column names in result order.
    pub columns: Vec<String>,
    pub rows: Vec<RowMap>,
    /// Number of rows in `rows` (after truncation).
    pub row_count: usize,
    /// `true` when the store produced more rows than the configured cap.
    pub truncated: bool,
}

impl ExecutionResult {
    pub fn new(columns: Vec<String>, rows: Vec<RowMap>) -> Self {
        let row_count = rows.len();
        Self {
            columns,
            rows,
            row_count,
            truncated: false,
        }
    }

    /// A statement that produced no result set.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_truncated(mut self, truncated: bool) -> Self {
        self.truncated = truncated;
        self
    }

    /// Keep at most `max_rows` rows, flagging the result when rows were dropped.
    pub fn capped(mut self, max_rows: Option<usize>) -> Self {
        if let Some(max) = max_rows {
            if self.rows.len() > max {
                self.rows.truncate(max);
                self.row_count = max;
                self.truncated = true;
            }
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.row_count == 0
    }

    /// Value of the first column of the first row, if any.
    pub fn scalar(&self) -> Option<&JsonValue> {
        let first_col = self.columns.first()?;
        self.rows.first()?.get(first_col)
    }
}
