//! Postgres-backed query store.
//!
//! Every [`QueryStore::fetch`] runs inside its own transaction that is marked
//! `READ ONLY`, carries a server-side `statement_timeout`, and is always rolled
//! back. The pooled connection goes back to the pool when the transaction is
//! dropped, whichever way the call exits (including cancellation, where sqlx
//! queues the rollback itself).
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | ExecutionError |
//! |------------|----------------------|----------------|
//! | Database | `57014` (query_canceled) | `Timeout` |
//! | Database | any other | `Rejected` |
//! | Io / Tls / PoolTimedOut / PoolClosed / Protocol | N/A | `Connection` |
//! | ColumnDecode / Decode / TypeNotFound | N/A | `Decode` |
//! | Other | N/A | `Rejected` |

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde_json::{Number, Value as JsonValue};
use sqlx::postgres::types::{Oid, PgInterval};
use sqlx::postgres::{PgColumn, PgHasArrayType, PgPool, PgPoolOptions, PgRow};
use sqlx::{Column, Executor, Postgres, Row, Statement, Transaction, TypeInfo};
use tokio_stream::StreamExt;
use tracing::{debug, instrument};
use uuid::Uuid;

use usageql_core::{ExecutionResult, RowMap};

use super::store::{ExecutionError, QueryStore, SchemaColumn};
use crate::config::{ConfigError, DatabaseConfig};

const SCHEMA_QUERY: &str = r#"
    SELECT
        table_name::text,
        column_name::text,
        data_type::text,
        is_nullable::text
    FROM information_schema.columns
    WHERE table_schema = 'public'
    ORDER BY table_name, ordinal_position
"#;

/// Query store over a bounded Postgres connection pool.
#[derive(Debug, Clone)]
pub struct PostgresQueryStore {
    pool: PgPool,
    statement_timeout: Option<Duration>,
}

impl PostgresQueryStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            statement_timeout: None,
        }
    }

    /// Build a pool from configuration without opening a connection yet.
    ///
    /// Connections are established on first use, so a process can start (and
    /// report unready) while the database is down.
    pub fn connect_lazy(config: &DatabaseConfig) -> Result<Self, ConfigError> {
        let options = config.connect_options()?;
        let pool = PgPoolOptions::new()
            .max_connections(config.pool_size)
            .acquire_timeout(config.connect_timeout)
            .connect_lazy_with(options);
        Ok(Self::new(pool))
    }

    /// Server-side limit applied to each query, in addition to the
    /// executor's wall-clock timeout.
    pub fn with_statement_timeout(mut self, timeout: Duration) -> Self {
        self.statement_timeout = Some(timeout);
        self
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn begin_read_only(&self) -> Result<Transaction<'static, Postgres>, ExecutionError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        sqlx::query("SET TRANSACTION READ ONLY")
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("set_read_only", e))?;

        if let Some(timeout) = self.statement_timeout {
            sqlx::query("SELECT set_config('statement_timeout', $1, true)")
                .bind(timeout.as_millis().to_string())
                .execute(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("set_statement_timeout", e))?;
        }

        Ok(tx)
    }
}

#[async_trait]
impl QueryStore for PostgresQueryStore {
    #[instrument(skip(self, query), err)]
    async fn fetch(
        &self,
        query: &str,
        max_rows: Option<usize>,
    ) -> Result<ExecutionResult, ExecutionError> {
        let mut tx = self.begin_read_only().await?;

        let statement = (&mut *tx)
            .prepare(query)
            .await
            .map_err(|e| map_sqlx_error("prepare", e))?;

        let columns: Vec<PgColumn> = statement.columns().to_vec();
        if columns.is_empty() {
            tx.rollback()
                .await
                .map_err(|e| map_sqlx_error("rollback", e))?;
            return Ok(ExecutionResult::empty());
        }

        let mut rows = Vec::new();
        let mut truncated = false;
        {
            let mut stream = statement.query().fetch(&mut *tx);
            while let Some(row) = stream.next().await {
                let row = row.map_err(|e| map_sqlx_error("fetch", e))?;
                if max_rows.is_some_and(|max| rows.len() >= max) {
                    truncated = true;
                    break;
                }
                rows.push(decode_row(&row, &columns)?);
            }
        }

        tx.rollback()
            .await
            .map_err(|e| map_sqlx_error("rollback", e))?;

        let names = columns.iter().map(|c| c.name().to_string()).collect();
        debug!(rows = rows.len(), truncated, "materialized result set");
        Ok(ExecutionResult::new(names, rows).with_truncated(truncated))
    }

    async fn ping(&self) -> Result<(), ExecutionError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("ping", e))?;
        Ok(())
    }

    #[instrument(skip(self), err)]
    async fn schema_columns(&self) -> Result<Vec<SchemaColumn>, ExecutionError> {
        let rows: Vec<(String, String, String, String)> = sqlx::query_as(SCHEMA_QUERY)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("schema_columns", e))?;

        Ok(rows
            .into_iter()
            .map(|(table_name, column_name, data_type, is_nullable)| SchemaColumn {
                table_name,
                column_name,
                data_type,
                is_nullable: is_nullable.eq_ignore_ascii_case("YES"),
            })
            .collect())
    }
}

fn decode_row(row: &PgRow, columns: &[PgColumn]) -> Result<RowMap, ExecutionError> {
    let mut map = RowMap::new();
    for (idx, column) in columns.iter().enumerate() {
        let value = decode_cell(row, idx, column)?;
        map.insert(column.name().to_string(), value);
    }
    Ok(map)
}

/// Convert one cell to JSON by its Postgres type name. NULL maps to `null`.
///
/// Types without a mapping are a decode error, never a guessed value.
fn decode_cell(row: &PgRow, idx: usize, column: &PgColumn) -> Result<JsonValue, ExecutionError> {
    let type_name = column.type_info().name();
    let value = scalar_cell(row, idx, type_name)
        .or_else(|| array_cell(row, idx, type_name))
        .unwrap_or_else(|| {
            Err(ExecutionError::Decode(format!(
                "unsupported type {} in column {}",
                type_name,
                column.name()
            )))
        })?;
    Ok(value.unwrap_or(JsonValue::Null))
}

type Cell = Result<Option<JsonValue>, ExecutionError>;

fn get<T>(row: &PgRow, idx: usize, to_json: fn(T) -> JsonValue) -> Cell
where
    T: for<'r> sqlx::Decode<'r, Postgres> + sqlx::Type<Postgres>,
{
    row.try_get::<Option<T>, _>(idx)
        .map(|v| v.map(to_json))
        .map_err(|e| map_sqlx_error("decode", e))
}

fn get_array<T>(row: &PgRow, idx: usize, to_json: fn(T) -> JsonValue) -> Cell
where
    T: for<'r> sqlx::Decode<'r, Postgres> + sqlx::Type<Postgres> + PgHasArrayType,
{
    row.try_get::<Option<Vec<Option<T>>>, _>(idx)
        .map(|v| v.map(|items| array(items, to_json)))
        .map_err(|e| map_sqlx_error("decode", e))
}

fn scalar_cell(row: &PgRow, idx: usize, type_name: &str) -> Option<Cell> {
    let cell = match type_name {
        "BOOL" => get::<bool>(row, idx, JsonValue::from),
        "INT2" => get::<i16>(row, idx, JsonValue::from),
        "INT4" => get::<i32>(row, idx, JsonValue::from),
        "INT8" => get::<i64>(row, idx, JsonValue::from),
        "OID" => get::<Oid>(row, idx, |v| JsonValue::from(v.0)),
        "FLOAT4" => get::<f32>(row, idx, |v| float(f64::from(v))),
        "FLOAT8" => get::<f64>(row, idx, float),
        "NUMERIC" => get::<Decimal>(row, idx, decimal),
        "TEXT" | "VARCHAR" | "BPCHAR" | "NAME" => get::<String>(row, idx, JsonValue::from),
        "UUID" => get::<Uuid>(row, idx, display),
        "DATE" => get::<NaiveDate>(row, idx, display),
        "TIME" => get::<NaiveTime>(row, idx, display),
        "TIMESTAMP" => get::<NaiveDateTime>(row, idx, display),
        "TIMESTAMPTZ" => get::<DateTime<Utc>>(row, idx, |v| JsonValue::from(v.to_rfc3339())),
        "INTERVAL" => get::<PgInterval>(row, idx, interval),
        "JSON" | "JSONB" => get::<JsonValue>(row, idx, |v| v),
        "VOID" => Ok(None),
        _ => return None,
    };
    Some(cell)
}

fn array_cell(row: &PgRow, idx: usize, type_name: &str) -> Option<Cell> {
    let element = type_name.strip_suffix("[]")?;
    let cell = match element {
        "BOOL" => get_array::<bool>(row, idx, JsonValue::from),
        "INT2" => get_array::<i16>(row, idx, JsonValue::from),
        "INT4" => get_array::<i32>(row, idx, JsonValue::from),
        "INT8" => get_array::<i64>(row, idx, JsonValue::from),
        "FLOAT4" => get_array::<f32>(row, idx, |v| float(f64::from(v))),
        "FLOAT8" => get_array::<f64>(row, idx, float),
        "NUMERIC" => get_array::<Decimal>(row, idx, decimal),
        "TEXT" | "VARCHAR" | "BPCHAR" | "NAME" => {
            get_array::<String>(row, idx, JsonValue::from)
        }
        "UUID" => get_array::<Uuid>(row, idx, display),
        "DATE" => get_array::<NaiveDate>(row, idx, display),
        "TIME" => get_array::<NaiveTime>(row, idx, display),
        "TIMESTAMP" => get_array::<NaiveDateTime>(row, idx, display),
        "TIMESTAMPTZ" => {
            get_array::<DateTime<Utc>>(row, idx, |v| JsonValue::from(v.to_rfc3339()))
        }
        "INTERVAL" => get_array::<PgInterval>(row, idx, interval),
        _ => return None,
    };
    Some(cell)
}

fn array<T>(items: Vec<Option<T>>, to_json: fn(T) -> JsonValue) -> JsonValue {
    JsonValue::Array(
        items
            .into_iter()
            .map(|v| v.map_or(JsonValue::Null, to_json))
            .collect(),
    )
}

fn display<T: ToString>(v: T) -> JsonValue {
    JsonValue::from(v.to_string())
}

/// Postgres' default interval output, e.g. `1 year 2 mons 3 days 04:05:06.5`.
fn interval(v: PgInterval) -> JsonValue {
    let mut parts = Vec::new();
    let (years, months) = (v.months / 12, v.months % 12);
    for (n, unit) in [(years, "year"), (months, "mon"), (v.days, "day")] {
        if n != 0 {
            let plural = if n == 1 { "" } else { "s" };
            parts.push(format!("{n} {unit}{plural}"));
        }
    }

    if v.microseconds != 0 || parts.is_empty() {
        let sign = if v.microseconds < 0 { "-" } else { "" };
        let micros = v.microseconds.unsigned_abs();
        let secs = micros / 1_000_000;
        let frac = micros % 1_000_000;
        let (hours, minutes) = (secs / 3600, secs / 60 % 60);
        let mut time = format!("{sign}{hours:02}:{minutes:02}:{:02}", secs % 60);
        if frac != 0 {
            let digits = format!("{frac:06}");
            time.push('.');
            time.push_str(digits.trim_end_matches('0'));
        }
        parts.push(time);
    }

    JsonValue::from(parts.join(" "))
}

fn float(v: f64) -> JsonValue {
    Number::from_f64(v).map_or(JsonValue::Null, JsonValue::Number)
}

fn decimal(v: Decimal) -> JsonValue {
    if v.fract().is_zero() {
        if let Some(i) = v.to_i64() {
            return JsonValue::from(i);
        }
    }
    match v.to_f64().and_then(Number::from_f64) {
        Some(n) => JsonValue::Number(n),
        None => JsonValue::from(v.to_string()),
    }
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> ExecutionError {
    match err {
        sqlx::Error::Database(db_err) => {
            let code = db_err.code().map(|c| c.into_owned());
            if code.as_deref() == Some("57014") {
                return ExecutionError::Timeout(Duration::ZERO);
            }
            ExecutionError::Rejected {
                code,
                message: format!("database error in {}: {}", operation, db_err.message()),
            }
        }
        sqlx::Error::Io(e) => {
            ExecutionError::Connection(format!("io error in {}: {}", operation, e))
        }
        sqlx::Error::Tls(e) => {
            ExecutionError::Connection(format!("tls error in {}: {}", operation, e))
        }
        sqlx::Error::Protocol(e) => {
            ExecutionError::Connection(format!("protocol error in {}: {}", operation, e))
        }
        sqlx::Error::PoolTimedOut => {
            ExecutionError::Connection(format!("timed out acquiring connection in {}", operation))
        }
        sqlx::Error::PoolClosed => {
            ExecutionError::Connection(format!("connection pool closed in {}", operation))
        }
        e @ (sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::Decode(_)
        | sqlx::Error::TypeNotFound { .. }) => {
            ExecutionError::Decode(format!("in {}: {}", operation, e))
        }
        other => ExecutionError::Rejected {
            code: None,
            message: format!("error in {}: {}", operation, other),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_errors_are_connection_failures() {
        assert!(matches!(
            map_sqlx_error("begin_transaction", sqlx::Error::PoolTimedOut),
            ExecutionError::Connection(_)
        ));
        assert!(matches!(
            map_sqlx_error("fetch", sqlx::Error::PoolClosed),
            ExecutionError::Connection(_)
        ));
    }

    #[test]
    fn io_errors_are_connection_failures() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        assert!(matches!(
            map_sqlx_error("ping", sqlx::Error::Io(io)),
            ExecutionError::Connection(_)
        ));
    }

    #[test]
    fn decode_errors_are_classified() {
        let err = sqlx::Error::ColumnDecode {
            index: "0".to_string(),
            source: "bad bytes".into(),
        };
        assert!(matches!(map_sqlx_error("decode", err), ExecutionError::Decode(_)));
    }

    #[test]
    fn whole_decimals_become_integers() {
        assert_eq!(decimal(Decimal::new(1250, 0)), JsonValue::from(1250));
        assert_eq!(decimal(Decimal::new(125, 1)), JsonValue::from(12.5));
    }

    #[test]
    fn non_finite_floats_become_null() {
        assert_eq!(float(f64::NAN), JsonValue::Null);
        assert_eq!(float(2.5), JsonValue::from(2.5));
    }

    #[test]
    fn intervals_render_like_postgres() {
        let span = |months, days, microseconds| PgInterval {
            months,
            days,
            microseconds,
        };
        assert_eq!(interval(span(0, 3, 4 * 3_600_000_000)), JsonValue::from("3 days 04:00:00"));
        assert_eq!(
            interval(span(14, 1, 5_500_000)),
            JsonValue::from("1 year 2 mons 1 day 00:00:05.5")
        );
        assert_eq!(interval(span(0, 0, -90_000_000)), JsonValue::from("-00:01:30"));
        assert_eq!(interval(span(0, -1, 0)), JsonValue::from("-1 days"));
        assert_eq!(interval(span(0, 0, 0)), JsonValue::from("00:00:00"));
    }

    #[test]
    fn arrays_keep_null_elements() {
        assert_eq!(
            array(vec![Some("a".to_string()), None], JsonValue::from),
            serde_json::json!(["a", null])
        );
        let dates = vec![NaiveDate::from_ymd_opt(2024, 1, 2)];
        assert_eq!(array(dates, display), serde_json::json!(["2024-01-02"]));
        assert_eq!(array(vec![Some(f64::INFINITY)], float), serde_json::json!([null]));
    }

    #[tokio::test]
    async fn lazy_pool_does_not_connect_at_construction() {
        let config = DatabaseConfig {
            host: "127.0.0.1".to_string(),
            port: 1,
            ssl_mode: "disable".to_string(),
            connect_timeout: Duration::from_millis(200),
            ..DatabaseConfig::default()
        };
        let store = PostgresQueryStore::connect_lazy(&config).unwrap();
        assert!(matches!(store.ping().await, Err(ExecutionError::Connection(_))));
    }
}
