//! Per-request orchestration.
//!
//! `Start → Generating → Validating → Executing → Summarizing → Completed | Failed(stage)`
//!
//! Nothing is kept between requests. A run suspends only at the generator,
//! store and summarizer calls; dropping the future at any of those points
//! abandons the request and releases whatever the store held.

use std::sync::Arc;

use tracing::{info, instrument, warn};

use usageql_ai::{AiError, QueryGenerator, ResultSummarizer};
use usageql_core::{
    DenyReason, ExecutionResult, QueryCandidate, QueryResponse, TenantId, validate_candidate,
};

use crate::executor::{ExecutionError, QueryExecutor, QueryStore};

/// Returned in place of a summary when the summarizer fails.
pub const SUMMARY_FALLBACK: &str =
    "The query ran successfully, but a natural-language summary could not be produced.";

/// Pipeline stage that ended a failed run.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Stage {
    Generation,
    Validation,
    Execution,
    Summarization,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Generation => "generation",
            Stage::Validation => "validation",
            Stage::Execution => "execution",
            Stage::Summarization => "summarization",
        }
    }
}

impl core::fmt::Display for Stage {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    pub text: String,
    /// `true` when `text` is [`SUMMARY_FALLBACK`].
    pub degraded: bool,
}

#[derive(Debug)]
pub enum PipelineOutcome {
    Success {
        candidate: QueryCandidate,
        explanation: Option<String>,
        result: ExecutionResult,
        summary: Summary,
    },
    /// A guard denied the candidate; the store was never called.
    Rejected {
        candidate: QueryCandidate,
        explanation: Option<String>,
        reason: DenyReason,
    },
    ExecutionFailed {
        candidate: QueryCandidate,
        explanation: Option<String>,
        error: ExecutionError,
    },
    /// The candidate generator failed; nothing was validated or executed.
    UpstreamFailed { stage: Stage, error: AiError },
}

impl PipelineOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, PipelineOutcome::Success { .. })
    }

    /// Stage that ended the run, `None` on success.
    pub fn failed_stage(&self) -> Option<Stage> {
        match self {
            PipelineOutcome::Success { .. } => None,
            PipelineOutcome::Rejected { .. } => Some(Stage::Validation),
            PipelineOutcome::ExecutionFailed { .. } => Some(Stage::Execution),
            PipelineOutcome::UpstreamFailed { stage, .. } => Some(*stage),
        }
    }

    /// Caller-safe error text, `None` on success.
    pub fn public_error(&self) -> Option<String> {
        match self {
            PipelineOutcome::Success { .. } => None,
            PipelineOutcome::Rejected { reason, .. } => Some(reason.to_string()),
            PipelineOutcome::ExecutionFailed { error, .. } => Some(error.public_message()),
            PipelineOutcome::UpstreamFailed { error, .. } => Some(error.public_message()),
        }
    }
}

/// Terminal state of one request.
#[derive(Debug)]
pub struct PipelineRun {
    pub question: String,
    pub tenant_id: TenantId,
    pub outcome: PipelineOutcome,
}

impl PipelineRun {
    /// Flatten into the single outbound shape.
    ///
    /// A rejected candidate keeps its text in `sql_query` for audit.
    pub fn into_response(self) -> QueryResponse {
        let mut response = QueryResponse::new(self.question, self.tenant_id.as_str());
        let stage = self.outcome.failed_stage();
        let error = self.outcome.public_error();

        match self.outcome {
            PipelineOutcome::Success {
                candidate,
                explanation,
                result,
                summary,
            } => {
                response.success = true;
                response.sql_query = candidate.into_text();
                response.explanation = explanation;
                response.columns = Some(result.columns);
                response.row_count = Some(result.row_count);
                response.truncated = Some(result.truncated);
                response.data = Some(result.rows);
                response.natural_language_response = Some(summary.text);
            }
            PipelineOutcome::Rejected {
                candidate,
                explanation,
                ..
            }
            | PipelineOutcome::ExecutionFailed {
                candidate,
                explanation,
                ..
            } => {
                response.sql_query = candidate.into_text();
                response.explanation = explanation;
            }
            PipelineOutcome::UpstreamFailed { .. } => {}
        }

        if let Some(error) = error {
            response.natural_language_response =
                Some(format!("Sorry, I couldn't process your question: {error}"));
            response.error = Some(error);
        }
        response.stage = stage.map(|s| s.as_str().to_string());
        response
    }
}

/// Sequences generation, validation, execution and summarization.
#[derive(Clone)]
pub struct QueryPipeline {
    generator: Arc<dyn QueryGenerator>,
    executor: QueryExecutor<Arc<dyn QueryStore>>,
    summarizer: Arc<dyn ResultSummarizer>,
}

impl QueryPipeline {
    pub fn new(
        generator: Arc<dyn QueryGenerator>,
        executor: QueryExecutor<Arc<dyn QueryStore>>,
        summarizer: Arc<dyn ResultSummarizer>,
    ) -> Self {
        Self {
            generator,
            executor,
            summarizer,
        }
    }

    pub fn executor(&self) -> &QueryExecutor<Arc<dyn QueryStore>> {
        &self.executor
    }

    #[instrument(skip(self, question, tenant_id), fields(tenant_id = %tenant_id))]
    pub async fn run(&self, question: &str, tenant_id: &TenantId) -> PipelineRun {
        let outcome = self.run_stages(question, tenant_id).await;
        match outcome.failed_stage() {
            None => info!("pipeline completed"),
            Some(stage) => info!(stage = %stage, "pipeline failed"),
        }
        PipelineRun {
            question: question.to_string(),
            tenant_id: tenant_id.clone(),
            outcome,
        }
    }

    async fn run_stages(&self, question: &str, tenant_id: &TenantId) -> PipelineOutcome {
        let generated = match self.generator.generate(question, tenant_id).await {
            Ok(generated) => generated,
            Err(error) => {
                warn!(
                    stage = %Stage::Generation,
                    %error,
                    transient = error.is_transient(),
                    "candidate generation failed"
                );
                return PipelineOutcome::UpstreamFailed {
                    stage: Stage::Generation,
                    error,
                };
            }
        };
        let candidate = generated.candidate;
        let explanation = generated.explanation;

        // Denials are logged without the candidate text.
        if let Err(reason) = validate_candidate(candidate.text(), tenant_id) {
            warn!(
                stage = %Stage::Validation,
                check = reason.check(),
                %reason,
                "candidate rejected"
            );
            return PipelineOutcome::Rejected {
                candidate,
                explanation,
                reason,
            };
        }

        let result = match self.executor.execute(candidate.text(), tenant_id).await {
            Ok(result) => result,
            Err(error) => {
                warn!(stage = %Stage::Execution, %error, "execution failed");
                return PipelineOutcome::ExecutionFailed {
                    candidate,
                    explanation,
                    error,
                };
            }
        };

        let summary = match self
            .summarizer
            .summarize(question, candidate.text(), &result)
            .await
        {
            Ok(text) => Summary {
                text,
                degraded: false,
            },
            Err(error) => {
                warn!(
                    stage = %Stage::Summarization,
                    %error,
                    "summarization failed, using fallback"
                );
                Summary {
                    text: SUMMARY_FALLBACK.to_string(),
                    degraded: true,
                }
            }
        };

        PipelineOutcome::Success {
            candidate,
            explanation,
            result,
            summary,
        }
    }
}
