//! Configuration loading and representation.
//!
//! Every component receives its settings explicitly at construction; nothing
//! reads the environment after [`AppConfig::from_env`] returns.

use std::str::FromStr;
use std::time::Duration;

use sqlx::postgres::{PgConnectOptions, PgSslMode};
use thiserror::Error;

use usageql_ai::OpenAiConfig;

use crate::executor::ExecutorConfig;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required setting {0}")]
    Missing(&'static str),

    #[error("invalid value for {key}: {value:?} ({reason})")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Relational store connection parameters.
#[derive(Clone)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: String,
    pub ssl_mode: String,
    pub pool_size: u32,
    pub connect_timeout: Duration,
    /// Full connection URL; overrides the discrete fields when set.
    pub url: Option<String>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            database: "telemetry".to_string(),
            user: "postgres".to_string(),
            password: String::new(),
            ssl_mode: "require".to_string(),
            pool_size: 5,
            connect_timeout: Duration::from_secs(10),
            url: None,
        }
    }
}

impl core::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("ssl_mode", &self.ssl_mode)
            .field("pool_size", &self.pool_size)
            .field("connect_timeout", &self.connect_timeout)
            .field("url", &self.url.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl DatabaseConfig {
    pub fn connect_options(&self) -> Result<PgConnectOptions, ConfigError> {
        if let Some(url) = &self.url {
            return PgConnectOptions::from_str(url).map_err(|e| ConfigError::Invalid {
                key: "DATABASE_URL",
                value: "<redacted>".to_string(),
                reason: e.to_string(),
            });
        }

        let ssl_mode = PgSslMode::from_str(&self.ssl_mode).map_err(|e| ConfigError::Invalid {
            key: "DB_SSL_MODE",
            value: self.ssl_mode.clone(),
            reason: e.to_string(),
        })?;

        Ok(PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .database(&self.database)
            .username(&self.user)
            .password(&self.password)
            .ssl_mode(ssl_mode))
    }
}

/// Which summarizer the pipeline uses.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SummarizerKind {
    Llm,
    Template,
}

impl FromStr for SummarizerKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "llm" => Ok(SummarizerKind::Llm),
            "template" => Ok(SummarizerKind::Template),
            other => Err(format!("expected `llm` or `template`, got `{other}`")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub app_name: String,
    pub version: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8000".to_string(),
            app_name: "SaaS Product Usage Data Assistant".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Process configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub executor: ExecutorConfig,
    pub llm: OpenAiConfig,
    pub summarizer: SummarizerKind,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key/value source (environment, test maps).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Lookup(lookup);

        let db_defaults = DatabaseConfig::default();
        let database = DatabaseConfig {
            host: env.string("DB_HOST").unwrap_or(db_defaults.host),
            port: env.parse("DB_PORT")?.unwrap_or(db_defaults.port),
            database: env.string("DB_NAME").unwrap_or(db_defaults.database),
            user: env.string("DB_USER").unwrap_or(db_defaults.user),
            password: env.string("DB_PASSWORD").unwrap_or_default(),
            ssl_mode: env.string("DB_SSL_MODE").unwrap_or(db_defaults.ssl_mode),
            pool_size: env.parse("DB_POOL_SIZE")?.unwrap_or(db_defaults.pool_size),
            connect_timeout: env
                .parse::<u64>("DB_CONNECT_TIMEOUT")?
                .map(Duration::from_secs)
                .unwrap_or(db_defaults.connect_timeout),
            url: env.string("DATABASE_URL"),
        };
        if database.pool_size == 0 {
            return Err(ConfigError::Invalid {
                key: "DB_POOL_SIZE",
                value: "0".to_string(),
                reason: "pool needs at least one connection".to_string(),
            });
        }

        let exec_defaults = ExecutorConfig::default();
        let executor = ExecutorConfig {
            query_timeout: env
                .parse::<u64>("DB_QUERY_TIMEOUT")?
                .map(Duration::from_secs)
                .unwrap_or(exec_defaults.query_timeout),
            max_rows: env.parse("QUERY_MAX_ROWS")?,
        };
        if executor.query_timeout.is_zero() {
            return Err(ConfigError::Invalid {
                key: "DB_QUERY_TIMEOUT",
                value: "0".to_string(),
                reason: "timeout must be positive".to_string(),
            });
        }

        let llm_defaults = OpenAiConfig::default();
        let llm = OpenAiConfig {
            base_url: env.string("OPENAI_BASE_URL").unwrap_or(llm_defaults.base_url),
            api_key: env.string("OPENAI_API_KEY").ok_or(ConfigError::Missing("OPENAI_API_KEY"))?,
            model: env.string("OPENAI_MODEL").unwrap_or(llm_defaults.model),
            temperature: env.parse("OPENAI_TEMPERATURE")?.unwrap_or(llm_defaults.temperature),
            max_tokens: env.parse("OPENAI_MAX_TOKENS")?.unwrap_or(llm_defaults.max_tokens),
            timeout: env
                .parse::<u64>("OPENAI_TIMEOUT_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(llm_defaults.timeout),
        };

        let summarizer = env.parse("SUMMARIZER")?.unwrap_or(SummarizerKind::Llm);

        let server_defaults = ServerConfig::default();
        let server = ServerConfig {
            bind_addr: env.string("BIND_ADDR").unwrap_or(server_defaults.bind_addr),
            app_name: env.string("APP_NAME").unwrap_or(server_defaults.app_name),
            version: env.string("APP_VERSION").unwrap_or(server_defaults.version),
        };

        Ok(Self {
            server,
            database,
            executor,
            llm,
            summarizer,
        })
    }
}

struct Lookup<F>(F);

impl<F> Lookup<F>
where
    F: Fn(&str) -> Option<String>,
{
    /// Non-blank value, trimmed.
    fn string(&self, key: &str) -> Option<String> {
        (self.0)(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn parse<T>(&self, key: &'static str) -> Result<Option<T>, ConfigError>
    where
        T: FromStr,
        T::Err: core::fmt::Display,
    {
        match self.string(key) {
            None => Ok(None),
            Some(raw) => raw.parse::<T>().map(Some).map_err(|e| ConfigError::Invalid {
                key,
                value: raw,
                reason: e.to_string(),
            }),
        }
    }
}
