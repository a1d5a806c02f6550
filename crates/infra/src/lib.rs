//! Infrastructure layer: configuration, the query executor and its stores,
//! and the request pipeline that ties generation, validation, execution and
//! summarization together.

pub mod config;
pub mod executor;
pub mod pipeline;


pub use config::{AppConfig, ConfigError, DatabaseConfig, ServerConfig, SummarizerKind};
pub use executor::{
    ExecutionError, ExecutorConfig, InMemoryQueryStore, PostgresQueryStore, QueryExecutor,
    QueryStore, SchemaColumn,
};
pub use pipeline::{PipelineOutcome, PipelineRun, QueryPipeline, SUMMARY_FALLBACK, Stage, Summary};
