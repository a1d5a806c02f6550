//! Candidate query generation.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{instrument, warn};

use usageql_core::{QueryCandidate, TenantId};

use crate::error::AiError;
use crate::openai::{ChatMessage, OpenAiClient};
use crate::prompt;

/// Used when the explanation call fails; generation itself still succeeds.
pub const EXPLANATION_FALLBACK: &str =
    "Generated SQL query to answer your question about product usage data.";

/// Generator output: an untrusted candidate plus an optional explanation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedQuery {
    pub candidate: QueryCandidate,
    pub explanation: Option<String>,
}

/// Turns a question into a candidate query for one tenant.
///
/// Implementations may be told to respect the safety rules, but callers must
/// treat every output as untrusted input.
#[async_trait]
pub trait QueryGenerator: Send + Sync {
    async fn generate(
        &self,
        question: &str,
        tenant_id: &TenantId,
    ) -> Result<GeneratedQuery, AiError>;
}

#[async_trait]
impl<G> QueryGenerator for Arc<G>
where
    G: QueryGenerator + ?Sized,
{
    async fn generate(
        &self,
        question: &str,
        tenant_id: &TenantId,
    ) -> Result<GeneratedQuery, AiError> {
        (**self).generate(question, tenant_id).await
    }
}

/// Strip markdown fences and a leading `sql` language tag from model output.
pub fn clean_model_output(raw: &str) -> String {
    let trimmed = raw.trim().trim_matches(|c: char| c == '`' || c.is_whitespace());

    let untagged = match trimmed.get(..3) {
        Some(tag) if tag.eq_ignore_ascii_case("sql") => {
            let rest = &trimmed[3..];
            if rest.is_empty() || rest.starts_with(char::is_whitespace) {
                rest
            } else {
                trimmed
            }
        }
        _ => trimmed,
    };

    untagged.trim().to_string()
}

/// LLM-backed generator.
#[derive(Debug, Clone)]
pub struct OpenAiQueryGenerator {
    client: Arc<OpenAiClient>,
    schema: String,
}

impl OpenAiQueryGenerator {
    pub fn new(client: Arc<OpenAiClient>) -> Self {
        Self {
            client,
            schema: prompt::USAGE_SCHEMA.to_string(),
        }
    }

    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = schema.into();
        self
    }

    async fn explain(&self, question: &str, query: &str) -> String {
        let messages = [
            ChatMessage::system(prompt::EXPLANATION_SYSTEM),
            ChatMessage::user(prompt::explanation_user(question, query)),
        ];
        match self.client.complete(&messages, Some(0.3), Some(200)).await {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "explanation generation failed; using fallback");
                EXPLANATION_FALLBACK.to_string()
            }
        }
    }
}

#[async_trait]
impl QueryGenerator for OpenAiQueryGenerator {
    #[instrument(skip(self, question, tenant_id), fields(tenant_id = %tenant_id), err)]
    async fn generate(
        &self,
        question: &str,
        tenant_id: &TenantId,
    ) -> Result<GeneratedQuery, AiError> {
        let messages = [
            ChatMessage::system(prompt::generation_system(&self.schema, tenant_id)),
            ChatMessage::user(question),
        ];

        let raw = self.client.complete(&messages, None, None).await?;
        let query = clean_model_output(&raw);
        if query.is_empty() {
            return Err(AiError::EmptyOutput);
        }

        let explanation = self.explain(question, &query).await;

        Ok(GeneratedQuery {
            candidate: QueryCandidate::generated(query),
            explanation: Some(explanation),
        })
    }
}

/// Generator with canned answers, for local runs and tests.
///
/// `{tenant_id}` in a canned query is replaced with the requesting tenant.
#[derive(Debug, Clone, Default)]
pub struct FixedQueryGenerator {
    answers: HashMap<String, String>,
    fallback: Option<String>,
}

impl FixedQueryGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_answer(mut self, question: impl Into<String>, query: impl Into<String>) -> Self {
        self.answers.insert(question.into(), query.into());
        self
    }

    pub fn with_default(mut self, query: impl Into<String>) -> Self {
        self.fallback = Some(query.into());
        self
    }
}

#[async_trait]
impl QueryGenerator for FixedQueryGenerator {
    async fn generate(
        &self,
        question: &str,
        tenant_id: &TenantId,
    ) -> Result<GeneratedQuery, AiError> {
        let template = self
            .answers
            .get(question)
            .or(self.fallback.as_ref())
            .ok_or_else(|| {
                AiError::Unavailable(format!("no canned query for question: {question}"))
            })?;

        Ok(GeneratedQuery {
            candidate: QueryCandidate::generated(
                template.replace("{tenant_id}", tenant_id.as_str()),
            ),
            explanation: None,
        })
    }
}
