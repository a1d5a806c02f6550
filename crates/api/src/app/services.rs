//! Service wiring: configuration in, a ready-to-serve pipeline out.

use std::sync::Arc;

use thiserror::Error;

use usageql_ai::{
    AiError, OpenAiClient, OpenAiQueryGenerator, OpenAiSummarizer, QueryGenerator,
    ResultSummarizer, TemplateSummarizer,
};
use usageql_infra::{
    AppConfig, ConfigError, PostgresQueryStore, QueryExecutor, QueryPipeline, QueryStore,
    ServerConfig, SummarizerKind,
};

#[derive(Debug, Error)]
pub enum ServicesError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to build language model client: {0}")]
    Llm(#[from] AiError),
}

/// Everything a handler needs, shared across requests.
pub struct AppServices {
    pub pipeline: QueryPipeline,
    pub service_name: String,
    pub version: String,
}

impl AppServices {
    pub fn new(pipeline: QueryPipeline, server: &ServerConfig) -> Self {
        Self {
            pipeline,
            service_name: server.app_name.clone(),
            version: server.version.clone(),
        }
    }
}

/// Wire the production pipeline: Postgres store, OpenAI generator, and the
/// configured summarizer. No connection is opened here.
pub fn build_services(config: &AppConfig) -> Result<AppServices, ServicesError> {
    let store: Arc<dyn QueryStore> = Arc::new(
        PostgresQueryStore::connect_lazy(&config.database)?
            .with_statement_timeout(config.executor.query_timeout),
    );
    let executor = QueryExecutor::new(store, config.executor.clone());

    let client = Arc::new(OpenAiClient::new(config.llm.clone())?);
    let generator: Arc<dyn QueryGenerator> = Arc::new(OpenAiQueryGenerator::new(client.clone()));
    let summarizer: Arc<dyn ResultSummarizer> = match config.summarizer {
        SummarizerKind::Llm => Arc::new(OpenAiSummarizer::new(client)),
        SummarizerKind::Template => Arc::new(TemplateSummarizer),
    };

    Ok(AppServices::new(
        QueryPipeline::new(generator, executor, summarizer),
        &config.server,
    ))
}
