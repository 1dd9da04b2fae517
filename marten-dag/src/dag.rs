//! DAG Builder & Executor (C4, §4.4) — compiles model queries, validates
//! acyclicity, and executes the model graph with node-level parallelism
//! over a single shared engine connection.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Instant;

use marten_core::capability::{EmbeddedSql, ExternalConnection, TableResult};
use tokio::sync::Mutex as AsyncMutex;
use tokio_util::sync::CancellationToken;

use crate::compile::{compile_sql, discover_imperative_dependencies};
use crate::context::QueryExecutionContext;
use crate::error::DagError;
use crate::imperative::ImperativeModel;
use crate::node::{ModelNode, ModelType, QueryArtifact};
use crate::registry::ModelRegistry;

/// §12 (SPEC_FULL): per-node timing, exposed for instrumentation and for
/// the "execution partial order" testable property (§8).
#[derive(Debug, Clone)]
pub struct NodeTiming {
    pub model: String,
    pub started_at: Instant,
    pub finished_at: Instant,
}

/// `{target_model, models_by_name, datalake_path}` (§3).
pub struct Dag {
    target_model: String,
    nodes: HashMap<String, ModelNode>,
    datalake_path: std::path::PathBuf,
}

impl Dag {
    /// §4.4 compilation + acyclicity check, starting from `target_model`.
    /// Walks the transitive closure, compiling each reachable node and
    /// recording discovered edges; a cycle anywhere in that closure fails
    /// the whole build with `configuration_error`.
    pub fn build(
        registry: &ModelRegistry,
        target_model: &str,
        datalake_path: std::path::PathBuf,
        ctx: &QueryExecutionContext,
        project_vars: &HashMap<String, String>,
        env_vars: &HashMap<String, String>,
    ) -> Result<Self, DagError> {
        if !registry.contains(target_model) {
            return Err(DagError::Configuration(format!("unknown target model: {target_model}")));
        }

        let mut nodes: HashMap<String, ModelNode> = HashMap::new();
        let mut to_visit = vec![target_model.to_string()];
        let mut visited: HashSet<String> = HashSet::new();

        while let Some(name) = to_visit.pop() {
            if visited.contains(&name) {
                continue;
            }
            visited.insert(name.clone());

            let config = registry
                .get(&name)
                .ok_or_else(|| DagError::Configuration(format!("unknown model referenced: {name}")))?
                .clone();

            let mut node = ModelNode::new(config.clone());
            node.is_target = name == target_model;

            let (compiled_sql, dependencies) = match &config.query {
                None => (None, Vec::new()),
                Some(QueryArtifact::Sql(template)) => {
                    let (rendered, refs) = compile_sql(&name, template, ctx, project_vars, env_vars)?;
                    (Some(rendered), refs)
                }
                Some(artifact @ QueryArtifact::Imperative(_)) => {
                    (None, discover_imperative_dependencies(artifact, ctx))
                }
            };
            node.compiled_sql = compiled_sql;
            node.upstreams = dependencies.iter().cloned().collect();
            node.compile_state.mark_done();

            for dep in &dependencies {
                if !registry.contains(dep) {
                    return Err(DagError::Configuration(format!(
                        "model '{name}' depends on unknown model '{dep}'"
                    )));
                }
                to_visit.push(dep.clone());
            }

            nodes.insert(name, node);
        }

        // Propagate materialization needs and downstream edges (§4.4):
        // a SQL downstream needs its upstream registered as an engine
        // relation; an imperative downstream needs it as a host-side
        // lazy value.
        let edges: Vec<(String, String, bool)> = nodes
            .values()
            .flat_map(|n| {
                let downstream_is_sql = matches!(n.config.query, Some(QueryArtifact::Sql(_)));
                n.upstreams
                    .iter()
                    .map(move |up| (up.clone(), n.name().to_string(), downstream_is_sql))
                    .collect::<Vec<_>>()
            })
            .collect();

        for (upstream, downstream, downstream_is_sql) in edges {
            if let Some(up_node) = nodes.get_mut(&upstream) {
                up_node.downstreams.insert(downstream);
                if downstream_is_sql {
                    up_node.needs_engine_table = true;
                } else {
                    up_node.needs_host_dataframe = true;
                }
            }
        }
        if let Some(target) = nodes.get_mut(target_model) {
            target.needs_host_dataframe = true;
        }

        let dag = Dag {
            target_model: target_model.to_string(),
            nodes,
            datalake_path,
        };
        dag.check_acyclic()?;
        Ok(dag)
    }

    pub fn target_model(&self) -> &str {
        &self.target_model
    }

    pub fn datalake_path(&self) -> &std::path::Path {
        &self.datalake_path
    }

    /// §4.4: "A DFS from the target, carrying the current path as a set:
    /// if the next node is in-path, raise `configuration_error`."
    /// Memoizes `confirmed_acyclic` per node to keep subsequent checks
    /// O(N) (not meaningfully reused within one build, but kept so a
    /// caller re-validating an already-built DAG short-circuits).
    fn check_acyclic(&self) -> Result<(), DagError> {
        let mut path: Vec<&str> = Vec::new();
        let mut path_set: HashSet<&str> = HashSet::new();
        self.dfs_acyclic(&self.target_model, &mut path, &mut path_set)
    }

    fn dfs_acyclic<'a>(
        &'a self,
        name: &'a str,
        path: &mut Vec<&'a str>,
        path_set: &mut HashSet<&'a str>,
    ) -> Result<(), DagError> {
        let Some(node) = self.nodes.get(name) else {
            return Ok(());
        };
        if node.confirmed_acyclic.load(Ordering::Acquire) {
            return Ok(());
        }
        if path_set.contains(name) {
            return Err(DagError::Configuration(format!(
                "cycle in model dependency graph at '{name}'"
            )));
        }
        path.push(name);
        path_set.insert(name);
        for upstream in &node.upstreams {
            self.dfs_acyclic(upstream, path, path_set)?;
        }
        path.pop();
        path_set.remove(name);
        node.confirmed_acyclic.store(true, Ordering::Release);
        Ok(())
    }

    /// Nodes in the closure with zero upstreams (§4.4 "Terminal (root)
    /// set").
    fn roots(&self) -> Vec<String> {
        self.nodes
            .values()
            .filter(|n| n.upstreams.is_empty())
            .map(|n| n.name().to_string())
            .collect()
    }

    /// §4.4 execution model: a counter-gated concurrent scheduler over a
    /// single shared engine connection, cancellable on first failure.
    pub async fn execute(
        &self,
        engine: Arc<dyn EmbeddedSql>,
        external: Arc<dyn ExternalConnectionResolver>,
        ctx: &QueryExecutionContext,
        sql_timeout_seconds: u64,
    ) -> Result<Vec<NodeTiming>, DagError> {
        let write_lock = Arc::new(AsyncMutex::new(()));
        let cancel = CancellationToken::new();
        let ctx = Arc::new(ctx.clone());
        let remaining: HashMap<String, std::sync::atomic::AtomicUsize> = self
            .nodes
            .iter()
            .map(|(name, node)| (name.clone(), std::sync::atomic::AtomicUsize::new(node.upstreams.len())))
            .collect();

        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<Result<(NodeTiming, Option<TableResult>), DagError>>();
        let mut inflight = 0usize;
        let mut timings = Vec::new();
        let mut runnable: Vec<String> = self.roots();

        loop {
            while let Some(name) = runnable.pop() {
                inflight += 1;
                let tx = tx.clone();
                let cancel = cancel.clone();
                let engine = engine.clone();
                let external = external.clone();
                let write_lock = write_lock.clone();
                let node_sql = self.nodes[&name].compiled_sql.clone();
                let node_type = self.nodes[&name].config.model_type;
                let materialize_as_view = self.nodes[&name].config.materialize_as_view;
                let needs_engine_table = self.nodes[&name].needs_engine_table;
                let needs_host_dataframe = self.nodes[&name].needs_host_dataframe;
                let connection_name = self.nodes[&name].config.connection_name.clone();
                let source_table_or_query = self.nodes[&name].config.source_table_or_query.clone();
                let imperative_model = match &self.nodes[&name].config.query {
                    Some(QueryArtifact::Imperative(model)) => Some(model.clone()),
                    _ => None,
                };
                let ctx = ctx.clone();

                tokio::spawn(async move {
                    if cancel.is_cancelled() {
                        return;
                    }
                    let started_at = Instant::now();
                    let result = run_node(
                        &name,
                        node_type,
                        materialize_as_view,
                        needs_engine_table,
                        needs_host_dataframe,
                        node_sql,
                        connection_name,
                        source_table_or_query,
                        imperative_model,
                        &ctx,
                        &*engine,
                        &*external,
                        &write_lock,
                        sql_timeout_seconds,
                        &cancel,
                    )
                    .await;
                    let finished_at = Instant::now();
                    let outcome = result.map(|host_result| {
                        (
                            NodeTiming {
                                model: name,
                                started_at,
                                finished_at,
                            },
                            host_result,
                        )
                    });
                    if outcome.is_err() {
                        cancel.cancel();
                    }
                    let _ = tx.send(outcome);
                });
            }

            if inflight == 0 {
                break;
            }

            match rx.recv().await {
                Some(Ok((timing, host_result))) => {
                    inflight -= 1;
                    let finished_node = timing.model.clone();
                    timings.push(timing);
                    if let Some(node) = self.nodes.get(&finished_node) {
                        if let Some(tr) = host_result {
                            *node.result.lock().expect("node result lock poisoned") = Some(tr);
                        }
                        for downstream in &node.downstreams {
                            if let Some(counter) = remaining.get(downstream) {
                                if counter.fetch_sub(1, Ordering::AcqRel) == 1 {
                                    runnable.push(downstream.clone());
                                }
                            }
                        }
                    }
                }
                Some(Err(err)) => {
                    inflight -= 1;
                    if inflight == 0 {
                        let _ = engine.close().await;
                        return Err(err);
                    }
                    // Drain remaining in-flight nodes, then surface the
                    // first error (§4.4: "the request fails with the
                    // first error (other errors are logged)").
                    while inflight > 0 {
                        if rx.recv().await.is_some() {
                            inflight -= 1;
                        }
                    }
                    let _ = engine.close().await;
                    return Err(err);
                }
                None => break,
            }
        }

        let _ = engine.close().await;
        Ok(timings)
    }
}

/// Resolves a named external connection for `source`/`dbview` models
/// (§4.4: "execute the compiled query against the named external
/// connection"). Kept separate from `EmbeddedSql` because a project may
/// declare many external connections sharing one embedded engine.
#[async_trait::async_trait]
pub trait ExternalConnectionResolver: Send + Sync {
    async fn resolve(&self, connection_name: &str) -> Option<Arc<dyn ExternalConnection>>;
}

#[allow(clippy::too_many_arguments)]
async fn run_node(
    name: &str,
    model_type: ModelType,
    materialize_as_view: bool,
    needs_engine_table: bool,
    needs_host_dataframe: bool,
    compiled_sql: Option<String>,
    connection_name: Option<String>,
    source_table_or_query: Option<String>,
    imperative_model: Option<Arc<dyn ImperativeModel>>,
    ctx: &QueryExecutionContext,
    engine: &dyn EmbeddedSql,
    external: &dyn ExternalConnectionResolver,
    write_lock: &AsyncMutex<()>,
    sql_timeout_seconds: u64,
    cancel: &CancellationToken,
) -> Result<Option<TableResult>, DagError> {
    if cancel.is_cancelled() {
        return Err(DagError::execution(name, "cancelled"));
    }

    // §4.4/§4.3: imperative models bypass the SQL-template path entirely
    // — the callable is the query.
    if let Some(model) = imperative_model {
        let result = model.run(ctx).await?;
        if needs_engine_table {
            let _guard = write_lock.lock().await;
            engine
                .register(name, result.clone())
                .await
                .map_err(|e| DagError::execution(name, e.to_string()))?;
        }
        return Ok(if needs_host_dataframe { Some(result) } else { None });
    }

    match model_type {
        ModelType::Seed => Ok(None),
        ModelType::Source => {
            let connection_name = connection_name
                .ok_or_else(|| DagError::Configuration(format!("source '{name}' has no connection_name")))?;
            let query = source_table_or_query
                .ok_or_else(|| DagError::Configuration(format!("source '{name}' has no table/query")))?;
            let conn = external
                .resolve(&connection_name)
                .await
                .ok_or_else(|| DagError::Configuration(format!("unknown connection '{connection_name}'")))?;
            let result = conn
                .run_query(&query, sql_timeout_seconds)
                .await
                .map_err(|e| DagError::execution(name, e.to_string()))?;
            if needs_engine_table {
                let _guard = write_lock.lock().await;
                engine
                    .register(name, result)
                    .await
                    .map_err(|e| DagError::execution(name, e.to_string()))?;
            }
            Ok(None)
        }
        ModelType::Dbview => {
            let connection_name = connection_name
                .ok_or_else(|| DagError::Configuration(format!("dbview '{name}' has no connection_name")))?;
            let sql = compiled_sql.ok_or_else(|| DagError::Configuration(format!("dbview '{name}' has no query")))?;
            let conn = external
                .resolve(&connection_name)
                .await
                .ok_or_else(|| DagError::Configuration(format!("unknown connection '{connection_name}'")))?;
            let result = conn
                .run_query(&sql, sql_timeout_seconds)
                .await
                .map_err(|e| DagError::execution(name, e.to_string()))?;
            let _guard = write_lock.lock().await;
            engine
                .register(name, result)
                .await
                .map_err(|e| DagError::execution(name, e.to_string()))
                .map(|_| None)
        }
        ModelType::Federate | ModelType::Build => {
            let select = compiled_sql
                .ok_or_else(|| DagError::Configuration(format!("federate '{name}' has no query")))?;
            let kind = if materialize_as_view { "VIEW" } else { "TABLE" };
            let ddl = format!("CREATE {kind} {name} AS {select}");
            let _guard = write_lock.lock().await;
            engine
                .execute(&ddl)
                .await
                .map_err(|e| DagError::execution(name, e.to_string()))
                .map(|_| None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::ModelConfig;
    use marten_params::ParameterSet;
    use std::collections::HashMap as Map;

    fn seed(name: &str) -> ModelConfig {
        ModelConfig {
            name: name.to_string(),
            model_type: ModelType::Seed,
            materialize_as_view: false,
            connection_name: None,
            source_table_or_query: None,
            query: None,
            declared_columns: vec![],
        }
    }

    fn federate(name: &str, sql: &str) -> ModelConfig {
        ModelConfig {
            name: name.to_string(),
            model_type: ModelType::Federate,
            materialize_as_view: false,
            connection_name: None,
            source_table_or_query: None,
            query: Some(QueryArtifact::Sql(sql.to_string())),
            declared_columns: vec![],
        }
    }

    #[test]
    fn build_detects_a_cycle() {
        let a = federate("a", "select * from {{ ref(\"b\") }}");
        let b = federate("b", "select * from {{ ref(\"a\") }}");
        let registry = ModelRegistry::build(vec![a, b]).unwrap();
        let ctx = QueryExecutionContext::new(ParameterSet::default(), Map::new(), None);
        let result = Dag::build(&registry, "a", std::path::PathBuf::from("."), &ctx, &Map::new(), &Map::new());
        assert!(matches!(result, Err(DagError::Configuration(msg)) if msg.contains("cycle")));
    }

    #[test]
    fn build_discovers_ref_edges() {
        let upstream = seed("orders");
        let downstream = federate("totals", "select sum(x) from {{ ref(\"orders\") }}");
        let registry = ModelRegistry::build(vec![upstream, downstream]).unwrap();
        let ctx = QueryExecutionContext::new(ParameterSet::default(), Map::new(), None);
        let dag = Dag::build(&registry, "totals", std::path::PathBuf::from("."), &ctx, &Map::new(), &Map::new())
            .unwrap();
        assert!(dag.nodes.get("totals").unwrap().upstreams.contains("orders"));
        assert!(dag.nodes.get("orders").unwrap().needs_engine_table);
    }

    struct ConstModel(i64);

    #[async_trait::async_trait]
    impl crate::imperative::ImperativeModel for ConstModel {
        fn dependencies(&self, _ctx: &QueryExecutionContext) -> Vec<String> {
            Vec::new()
        }

        async fn run(&self, _ctx: &QueryExecutionContext) -> Result<TableResult, DagError> {
            Ok(TableResult {
                columns: vec![marten_core::capability::ColumnSchema {
                    name: "value".to_string(),
                    r#type: "int".to_string(),
                    description: None,
                    category: marten_core::capability::ColumnCategory::Measure,
                }],
                column_values: vec![vec![marten_core::capability::CellValue::Int(self.0)]],
            })
        }
    }

    fn imperative(name: &str, value: i64) -> ModelConfig {
        ModelConfig {
            name: name.to_string(),
            model_type: ModelType::Build,
            materialize_as_view: false,
            connection_name: None,
            source_table_or_query: None,
            query: Some(QueryArtifact::Imperative(std::sync::Arc::new(ConstModel(value)))),
            declared_columns: vec![],
        }
    }

    struct RecordingEngine {
        registered: std::sync::Mutex<Vec<String>>,
    }

    #[async_trait::async_trait]
    impl EmbeddedSql for RecordingEngine {
        async fn register(&self, name: &str, _data: TableResult) -> Result<(), marten_core::capability::EngineError> {
            self.registered.lock().unwrap().push(name.to_string());
            Ok(())
        }

        async fn query(
            &self,
            _sql: &str,
            _placeholders: &Map<String, String>,
        ) -> Result<TableResult, marten_core::capability::EngineError> {
            Ok(TableResult::default())
        }

        async fn execute(&self, _sql: &str) -> Result<(), marten_core::capability::EngineError> {
            Ok(())
        }

        async fn close(&self) -> Result<(), marten_core::capability::EngineError> {
            Ok(())
        }
    }

    struct NoExternal;

    #[async_trait::async_trait]
    impl ExternalConnectionResolver for NoExternal {
        async fn resolve(&self, _connection_name: &str) -> Option<Arc<dyn ExternalConnection>> {
            None
        }
    }

    #[tokio::test]
    async fn execute_registers_an_imperative_models_result_when_downstream_needs_it() {
        let upstream = imperative("const_model", 42);
        let downstream = federate("totals", "select sum(value) from {{ ref(\"const_model\") }}");
        let registry = ModelRegistry::build(vec![upstream, downstream]).unwrap();
        let ctx = QueryExecutionContext::new(ParameterSet::default(), Map::new(), None);
        let dag = Dag::build(&registry, "totals", std::path::PathBuf::from("."), &ctx, &Map::new(), &Map::new())
            .unwrap();
        assert!(dag.nodes.get("const_model").unwrap().needs_engine_table);

        let engine = Arc::new(RecordingEngine {
            registered: std::sync::Mutex::new(Vec::new()),
        });
        let external = Arc::new(NoExternal);
        dag.execute(engine.clone(), external, &ctx, 30).await.unwrap();

        assert!(engine.registered.lock().unwrap().contains(&"const_model".to_string()));
    }

    #[tokio::test]
    async fn execute_stores_a_host_side_imperative_result_when_it_is_the_target() {
        let target = imperative("const_model", 7);
        let registry = ModelRegistry::build(vec![target]).unwrap();
        let ctx = QueryExecutionContext::new(ParameterSet::default(), Map::new(), None);
        let dag = Dag::build(&registry, "const_model", std::path::PathBuf::from("."), &ctx, &Map::new(), &Map::new())
            .unwrap();
        assert!(dag.nodes.get("const_model").unwrap().needs_host_dataframe);
        assert!(!dag.nodes.get("const_model").unwrap().needs_engine_table);

        let engine = Arc::new(RecordingEngine {
            registered: std::sync::Mutex::new(Vec::new()),
        });
        let external = Arc::new(NoExternal);
        dag.execute(engine.clone(), external, &ctx, 30).await.unwrap();

        let stored = dag.nodes.get("const_model").unwrap().result.lock().unwrap().clone();
        assert!(stored.is_some());
        assert!(engine.registered.lock().unwrap().is_empty());
    }
}
