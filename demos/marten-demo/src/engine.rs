//! An in-process, in-memory stand-in for the embedded analytical engine
//! and for external database connections (§1: these are out-of-scope
//! collaborators named only by interface). Understands exactly the SQL
//! subset the demo's model templates render: `SELECT * FROM <relation>`
//! and `CREATE TABLE|VIEW <name> AS <select>`.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use marten_core::capability::{ColumnCategory, ColumnSchema, EmbeddedSql, EngineError, ExternalConnection, TableResult};
use regex::Regex;

#[derive(Default)]
pub struct InMemoryEngine {
    relations: Mutex<HashMap<String, TableResult>>,
}

impl InMemoryEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Preloads seed relations the way a real engine would bake static
    /// seed data into a fresh connection before any model compiles
    /// (`ModelType::Seed` nodes are no-ops at execution time).
    pub fn with_seeds(seeds: HashMap<String, TableResult>) -> Self {
        Self {
            relations: Mutex::new(seeds),
        }
    }

    fn run_select(&self, sql: &str) -> Result<TableResult, EngineError> {
        let select_from = Regex::new(r"(?i)^\s*select\s+\*\s+from\s+(\w+)\s*$").unwrap();
        let caps = select_from
            .captures(sql.trim())
            .ok_or_else(|| EngineError::new(format!("unsupported query: {sql}")))?;
        let name = &caps[1];
        self.relations
            .lock()
            .expect("engine lock poisoned")
            .get(name)
            .cloned()
            .ok_or_else(|| EngineError::new(format!("no such relation: {name}")))
    }
}

#[async_trait]
impl EmbeddedSql for InMemoryEngine {
    async fn register(&self, name: &str, data: TableResult) -> Result<(), EngineError> {
        self.relations.lock().expect("engine lock poisoned").insert(name.to_string(), data);
        Ok(())
    }

    async fn query(&self, sql: &str, _placeholders: &HashMap<String, String>) -> Result<TableResult, EngineError> {
        self.run_select(sql)
    }

    async fn execute(&self, sql: &str) -> Result<(), EngineError> {
        let create_as = Regex::new(r"(?is)^\s*create\s+(table|view)\s+(\w+)\s+as\s+(.+)$").unwrap();
        let caps = create_as
            .captures(sql.trim())
            .ok_or_else(|| EngineError::new(format!("unsupported statement: {sql}")))?;
        let name = caps[2].to_string();
        let select = caps[3].to_string();
        let result = self.run_select(&select)?;
        self.relations.lock().expect("engine lock poisoned").insert(name, result);
        Ok(())
    }

    async fn close(&self) -> Result<(), EngineError> {
        Ok(())
    }
}

/// A named external source, returning a fixed table regardless of the
/// query text — stands in for a real warehouse connection in the demo.
pub struct FixedExternalConnection {
    pub table: TableResult,
    pub latency: Duration,
}

#[async_trait]
impl ExternalConnection for FixedExternalConnection {
    async fn run_query(&self, _table_or_query: &str, _timeout_seconds: u64) -> Result<TableResult, EngineError> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        Ok(self.table.clone())
    }
}

pub fn column(name: &str, ty: &str, category: ColumnCategory) -> ColumnSchema {
    ColumnSchema {
        name: name.to_string(),
        r#type: ty.to_string(),
        description: None,
        category,
    }
}
