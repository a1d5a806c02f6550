//! `usageql-ai`
//!
//! **Responsibility:** the language-model side of the pipeline.
//!
//! - A [`QueryGenerator`] turns a question into a *candidate* query. Its output
//!   is untrusted: nothing here validates or executes SQL.
//! - A [`ResultSummarizer`] turns an executed result back into prose. It is
//!   best-effort; callers must survive its failure.

pub mod error;
pub mod generator;
pub mod openai;
pub mod prompt;
pub mod summarizer;

pub use error::AiError;
pub use generator::{
    EXPLANATION_FALLBACK, FixedQueryGenerator, GeneratedQuery, OpenAiQueryGenerator,
    QueryGenerator, clean_model_output,
};
pub use openai::{ChatMessage, OpenAiClient, OpenAiConfig};
pub use summarizer::{OpenAiSummarizer, ResultSummarizer, TemplateSummarizer};
