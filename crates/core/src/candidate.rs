//! Candidate queries produced by the external generator.

use serde::{Deserialize, Serialize};

/// Where a candidate query came from.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryOrigin {
    Generated,
}

/// A query string that has not been trusted yet.
///
/// Immutable once produced: created by the generator, consumed once by the
/// gateway, discarded after execution or rejection. Holding a
/// `QueryCandidate` says nothing about its safety.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryCandidate {
    text: String,
    origin: QueryOrigin,
}

impl QueryCandidate {
    pub fn generated(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            origin: QueryOrigin::Generated,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn origin(&self) -> QueryOrigin {
        self.origin
    }

    pub fn into_text(self) -> String {
        self.text
    }
}
