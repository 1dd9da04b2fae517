//! `ModelNode` and the declared model registry (C3, §3, §4.3).

use std::collections::HashSet;
use std::sync::atomic::{AtomicU8, Ordering};

use marten_core::capability::TableResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelType {
    Seed,
    Source,
    Dbview,
    Federate,
    Build,
}

impl ModelType {
    pub fn is_leaf(self) -> bool {
        matches!(self, ModelType::Seed | ModelType::Source)
    }
}

/// The query artifact backing a non-leaf model (§4.3).
#[derive(Clone)]
pub enum QueryArtifact {
    /// Raw SQL template text, rendered by the compiler (§4.4).
    Sql(String),
    /// An imperative model: `dependencies` discovers upstream names
    /// before compilation proceeds; `run` is the deferred callable.
    Imperative(std::sync::Arc<dyn super::imperative::ImperativeModel>),
}

impl std::fmt::Debug for QueryArtifact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueryArtifact::Sql(sql) => f.debug_tuple("Sql").field(sql).finish(),
            QueryArtifact::Imperative(_) => f.debug_tuple("Imperative").finish(),
        }
    }
}

/// Declared, load-time configuration for one model (§4.3). Immutable
/// after the registry is built.
#[derive(Clone, Debug)]
pub struct ModelConfig {
    pub name: String,
    pub model_type: ModelType,
    /// For `federate` models: emit `CREATE VIEW` instead of `CREATE TABLE`.
    pub materialize_as_view: bool,
    /// For `source` models: the named external connection.
    pub connection_name: Option<String>,
    /// For `source`/`dbview` models: the table or query referenced on
    /// the external connection.
    pub source_table_or_query: Option<String>,
    pub query: Option<QueryArtifact>,
    pub declared_columns: Vec<marten_core::capability::ColumnSchema>,
}

/// Lazily transitions `pending -> in_progress -> done`, guarding
/// per-node compile memoization under concurrent compilation (§4.4).
#[derive(Debug)]
pub struct CompileState(AtomicU8);

const PENDING: u8 = 0;
const IN_PROGRESS: u8 = 1;
const DONE: u8 = 2;

impl Default for CompileState {
    fn default() -> Self {
        CompileState(AtomicU8::new(PENDING))
    }
}

impl CompileState {
    pub fn is_done(&self) -> bool {
        self.0.load(Ordering::Acquire) == DONE
    }

    /// Attempts to claim the compile slot for this node; returns true if
    /// the caller is now responsible for compiling it (pending -> in
    /// progress).
    pub fn try_claim(&self) -> bool {
        self.0
            .compare_exchange(PENDING, IN_PROGRESS, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn mark_done(&self) {
        self.0.store(DONE, Ordering::Release);
    }
}

/// Runtime node (§3): owned by one `Dag`, carrying compiled query text,
/// discovered dependency edges, and materialization-need flags.
pub struct ModelNode {
    pub config: ModelConfig,
    pub compiled_sql: Option<String>,
    pub upstreams: HashSet<String>,
    pub downstreams: HashSet<String>,
    pub needs_engine_table: bool,
    pub needs_host_dataframe: bool,
    pub is_target: bool,
    pub compile_state: CompileState,
    pub confirmed_acyclic: std::sync::atomic::AtomicBool,
    pub result: std::sync::Mutex<Option<TableResult>>,
}

impl ModelNode {
    pub fn new(config: ModelConfig) -> Self {
        ModelNode {
            config,
            compiled_sql: None,
            upstreams: HashSet::new(),
            downstreams: HashSet::new(),
            needs_engine_table: false,
            needs_host_dataframe: false,
            is_target: false,
            compile_state: CompileState::default(),
            confirmed_acyclic: std::sync::atomic::AtomicBool::new(false),
            result: std::sync::Mutex::new(None),
        }
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }
}
