//! Result summarization (best-effort).

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use tracing::instrument;

use usageql_core::ExecutionResult;

use crate::error::AiError;
use crate::openai::{ChatMessage, OpenAiClient};
use crate::prompt;

/// Rows sent to the model; the rest are only counted.
const PREVIEW_ROWS: usize = 20;

/// Turns an executed result into a natural-language answer.
#[async_trait]
pub trait ResultSummarizer: Send + Sync {
    async fn summarize(
        &self,
        question: &str,
        query: &str,
        result: &ExecutionResult,
    ) -> Result<String, AiError>;
}

#[async_trait]
impl<S> ResultSummarizer for Arc<S>
where
    S: ResultSummarizer + ?Sized,
{
    async fn summarize(
        &self,
        question: &str,
        query: &str,
        result: &ExecutionResult,
    ) -> Result<String, AiError> {
        (**self).summarize(question, query, result).await
    }
}

/// LLM-backed summarizer.
#[derive(Debug, Clone)]
pub struct OpenAiSummarizer {
    client: Arc<OpenAiClient>,
}

impl OpenAiSummarizer {
    pub fn new(client: Arc<OpenAiClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ResultSummarizer for OpenAiSummarizer {
    #[instrument(skip_all, fields(row_count = result.row_count), err)]
    async fn summarize(
        &self,
        question: &str,
        query: &str,
        result: &ExecutionResult,
    ) -> Result<String, AiError> {
        let shown = result.rows.len().min(PREVIEW_ROWS);
        let rows_json = serde_json::to_string(&result.rows[..shown])
            .map_err(|e| AiError::MalformedOutput(format!("failed to encode rows: {e}")))?;

        let messages = [
            ChatMessage::system(prompt::SUMMARY_SYSTEM),
            ChatMessage::user(prompt::summary_user(
                question,
                query,
                &result.columns,
                &rows_json,
                result.row_count,
                shown,
            )),
        ];

        self.client.complete(&messages, Some(0.3), Some(300)).await
    }
}

/// Deterministic summarizer built from sentence templates. Never fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateSummarizer;

impl TemplateSummarizer {
    pub fn render(question: &str, result: &ExecutionResult) -> String {
        let mut text = match (result.row_count, result.columns.len()) {
            (0, _) => format!(
                "Based on your question '{question}', I found no data matching your criteria."
            ),
            (1, 1) => {
                let column = &result.columns[0];
                let value = result.scalar().map(render_value).unwrap_or_default();
                format!(
                    "The {} for your question '{question}' is {value}.",
                    column.replace('_', " ")
                )
            }
            (1, _) => format!(
                "I found 1 result for your question '{question}': {}.",
                describe_row(result, 0)
            ),
            (n, _) => format!(
                "I found {n} results for your question '{question}'. The first row shows {}.",
                describe_row(result, 0)
            ),
        };

        if result.truncated {
            text.push_str(" Results were truncated to the configured row limit.");
        }
        text
    }
}

#[async_trait]
impl ResultSummarizer for TemplateSummarizer {
    async fn summarize(
        &self,
        question: &str,
        _query: &str,
        result: &ExecutionResult,
    ) -> Result<String, AiError> {
        Ok(Self::render(question, result))
    }
}

fn describe_row(result: &ExecutionResult, idx: usize) -> String {
    let Some(row) = result.rows.get(idx) else {
        return String::new();
    };
    result
        .columns
        .iter()
        .map(|c| {
            let v = row.get(c).map(render_value).unwrap_or_default();
            format!("{c} = {v}")
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn render_value(v: &JsonValue) -> String {
    match v {
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}
