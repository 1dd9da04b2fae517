//! Capability traits for the two external collaborators the core consumes
//! but does not implement (§1: "Out of scope ... named only by
//! interface"). Grounded on the teacher's `r2e_core::guards::Identity`
//! trait (decouple guards from a concrete identity struct) and
//! `r2e_data::repository::Repository` (async trait naming the shape of an
//! external system without owning it).

use async_trait::async_trait;
use std::collections::HashMap;

/// A resolved tabular result, handed back by `EmbeddedSql::query` and by
/// external connections. Column-major to keep conversion to `records`,
/// `rows`, and `columns` orientations (spec §6) cheap in either direction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableResult {
    pub columns: Vec<ColumnSchema>,
    /// One `Vec<CellValue>` per column, all of equal length.
    pub column_values: Vec<Vec<CellValue>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSchema {
    pub name: String,
    pub r#type: String,
    pub description: Option<String>,
    pub category: ColumnCategory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnCategory {
    Dimension,
    Measure,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(untagged)]
pub enum CellValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Decimal(rust_decimal::Decimal),
    Text(String),
    Date(chrono::NaiveDate),
}

impl TableResult {
    pub fn num_rows(&self) -> usize {
        self.column_values.first().map(|c| c.len()).unwrap_or(0)
    }

    pub fn empty_with_schema(columns: Vec<ColumnSchema>) -> Self {
        let column_values = columns.iter().map(|_| Vec::new()).collect();
        Self {
            columns,
            column_values,
        }
    }
}

/// The embedded analytical query engine capability (§1, §4.4): run a query
/// string against named relations, register named relations (seeds,
/// source imports, federate materializations), and bind placeholder
/// values through a prepared-statement mechanism rather than
/// string-interpolation (§4.5, §9).
#[async_trait]
pub trait EmbeddedSql: Send + Sync {
    /// Register a relation (seed table, imported source result, or a
    /// previously materialized federate) under `name` so later queries in
    /// the same connection can reference it.
    async fn register(&self, name: &str, data: TableResult) -> Result<(), EngineError>;

    /// Run a read-only query against already-registered relations,
    /// binding `placeholders` through the engine's parameterized query
    /// facility. Multiple calls may run concurrently.
    async fn query(
        &self,
        sql: &str,
        placeholders: &HashMap<String, String>,
    ) -> Result<TableResult, EngineError>;

    /// Run a write operation (`CREATE TABLE ... AS`, `CREATE VIEW ...`).
    /// Calls to `execute` across concurrent callers on the same
    /// connection must be serialized by the implementation (§4.4, §5).
    async fn execute(&self, sql: &str) -> Result<(), EngineError>;

    /// Close the connection. Called exactly once, on every exit path
    /// (success, error, or cancellation) of a request (§4.4, §5).
    async fn close(&self) -> Result<(), EngineError>;
}

#[derive(Debug, Clone)]
pub struct EngineError {
    pub message: String,
    pub timed_out: bool,
}

impl EngineError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            timed_out: false,
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            timed_out: true,
        }
    }
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for EngineError {}

/// An external connection capability for `source`/`dbview` models: push a
/// compiled query string to a named external database and get a
/// [`TableResult`] back, respecting `sql_timeout_seconds` (§4.4, §5).
#[async_trait]
pub trait ExternalConnection: Send + Sync {
    async fn run_query(
        &self,
        table_or_query: &str,
        timeout_seconds: u64,
    ) -> Result<TableResult, EngineError>;
}

/// A minimal user record, just enough for parameter cascade filtering
/// (§3: lookup by `user_attribute` path) and scope checks (§4.6).
pub trait User: Send + Sync {
    fn identity(&self) -> &str;
    fn attribute(&self, path: &str) -> Option<&str>;
    fn access_level(&self) -> u32;
}

/// The authentication backend capability (§1): validate a token into a
/// user, and check scope access. Named only by interface; the core never
/// issues tokens or stores accounts.
#[async_trait]
pub trait Authenticator: Send + Sync {
    type U: User;

    async fn authenticate(&self, token: &str) -> Result<Self::U, EngineError>;

    async fn can_user_access_scope(&self, user: Option<&Self::U>, scope: &str) -> bool;
}
