//! Inbound request shape.

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};
use crate::id::TenantId;

/// Upper bound on question length, in characters.
pub const MAX_QUESTION_CHARS: usize = 1000;

/// A natural-language question asked on behalf of one tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryRequest {
    pub question: String,
    pub tenant_id: String,
}

impl QueryRequest {
    pub fn new(question: impl Into<String>, tenant_id: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            tenant_id: tenant_id.into(),
        }
    }

    /// Check field bounds and return the parsed tenant.
    pub fn validate(&self) -> DomainResult<TenantId> {
        let chars = self.question.chars().count();
        if self.question.trim().is_empty() {
            return Err(DomainError::validation("question must not be empty"));
        }
        if chars > MAX_QUESTION_CHARS {
            return Err(DomainError::validation(format!(
                "question must be at most {MAX_QUESTION_CHARS} characters (got {chars})"
            )));
        }
        TenantId::parse(self.tenant_id.as_str())
    }
}
