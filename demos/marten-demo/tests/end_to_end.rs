use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use marten_core::capability::{Authenticator, EmbeddedSql, ExternalConnection};
use marten_dag::{Dag, ExternalConnectionResolver, ModelConfig, ModelRegistry, ModelType, QueryArtifact, QueryExecutionContext};
use marten_demo::project::{project, seed_relations};
use marten_demo::{DemoAuthenticator, DemoUser, InMemoryEngine};
use marten_orchestrator::{get_dataset, GetDatasetRequest, Orientation};
use marten_params::{resolve_all, ParameterSet, RawSelection, RawSelections};

struct NoExternalConnections;

#[async_trait]
impl ExternalConnectionResolver for NoExternalConnections {
    async fn resolve(&self, _connection_name: &str) -> Option<Arc<dyn ExternalConnection>> {
        None
    }
}

fn demo_user(scopes: &[&str]) -> DemoUser {
    DemoUser {
        identity: "demo-user".into(),
        attributes: HashMap::new(),
        access_level: 1,
        allowed_scopes: scopes.iter().map(|s| s.to_string()).collect(),
    }
}

fn authenticator_with(user: DemoUser) -> DemoAuthenticator {
    DemoAuthenticator::new().with_user("t", user)
}

#[test]
fn cascading_select_changes_city_options() {
    let project = project();
    let mut selections: RawSelections = HashMap::new();
    selections.insert("region".into(), RawSelection::Str("eu".into()));

    let params = resolve_all(&project.parameters, &selections, |_| None).unwrap();
    let city = params.get("city").unwrap();
    match city {
        marten_params::Parameter::SingleSelect { visible_options, selected_id, .. } => {
            assert_eq!(visible_options.len(), 1);
            assert_eq!(visible_options[0].id, "ber");
            assert_eq!(selected_id.as_deref(), Some("ber"));
        }
        other => panic!("expected SingleSelect, got {other:?}"),
    }
}

#[test]
fn date_bounds_reject_out_of_range_selection() {
    let project = project();
    let mut selections: RawSelections = HashMap::new();
    selections.insert("as_of".into(), RawSelection::Str("1999-01-01".into()));

    let err = resolve_all(&project.parameters, &selections, |_| None).unwrap_err();
    assert!(matches!(err, marten_params::ParamsError::InvalidSelection { .. }));
}

#[test]
fn cycle_detection_fails_the_dag_build() {
    let a = ModelConfig {
        name: "a".into(),
        model_type: ModelType::Federate,
        materialize_as_view: false,
        connection_name: None,
        source_table_or_query: None,
        query: Some(QueryArtifact::Sql("select * from {{ ref('b') }}".into())),
        declared_columns: vec![],
    };
    let b = ModelConfig {
        name: "b".into(),
        model_type: ModelType::Federate,
        materialize_as_view: false,
        connection_name: None,
        source_table_or_query: None,
        query: Some(QueryArtifact::Sql("select * from {{ ref('a') }}".into())),
        declared_columns: vec![],
    };
    let registry = ModelRegistry::build(vec![a, b]).unwrap();
    let ctx = QueryExecutionContext::new(ParameterSet::default(), HashMap::new(), None);
    let result = Dag::build(&registry, "a", std::path::PathBuf::new(), &ctx, &HashMap::new(), &HashMap::new());
    assert!(result.is_err());
}

#[tokio::test]
async fn parallel_execution_respects_dependency_order() {
    let registry = project().models;
    let ctx = QueryExecutionContext::new(ParameterSet::default(), HashMap::new(), None);
    let dag = Dag::build(&registry, "orders_by_city", std::path::PathBuf::new(), &ctx, &HashMap::new(), &HashMap::new()).unwrap();

    let engine: Arc<dyn EmbeddedSql> = Arc::new(InMemoryEngine::with_seeds(seed_relations()));
    let timings = dag.execute(engine, Arc::new(NoExternalConnections), &ctx, 30).await.unwrap();

    let seed_timing = timings.iter().find(|t| t.model == "seed_orders").unwrap();
    let federate_timing = timings.iter().find(|t| t.model == "orders_by_city").unwrap();
    assert!(seed_timing.finished_at <= federate_timing.started_at);
}

#[tokio::test]
async fn result_paging_respects_offset_and_limit() {
    let project = project();
    let authenticator = authenticator_with(demo_user(&["sales.read"]));
    let user = authenticator.authenticate("t").await.unwrap();
    let raw_selections = HashMap::new();

    let cache = marten_cache::CoalescingCache::new(std::time::Duration::from_secs(60), 10);
    let request_for = |offset: usize| GetDatasetRequest {
        dataset_name: "orders",
        raw_selections: &raw_selections,
        configurables: HashMap::new(),
        offset,
        limit: 1,
        orientation: Orientation::Rows,
        post_sql: None,
        select: None,
    };

    let first = get_dataset(
        &project,
        &authenticator,
        Some(&user),
        request_for(0),
        &cache,
        || Arc::new(InMemoryEngine::with_seeds(seed_relations())) as Arc<dyn EmbeddedSql>,
        Arc::new(NoExternalConnections),
        30,
        10_000,
    )
    .await
    .unwrap();

    assert_eq!(first.total_num_rows, 3);
    assert_eq!(first.data_details.num_rows, 1);
}

#[tokio::test]
async fn scope_denial_is_forbidden() {
    let project = project();
    let authenticator = authenticator_with(demo_user(&["other.scope"]));
    let user = authenticator.authenticate("t").await.unwrap();
    let raw_selections = HashMap::new();
    let cache = marten_cache::CoalescingCache::new(std::time::Duration::from_secs(60), 10);

    let result = get_dataset(
        &project,
        &authenticator,
        Some(&user),
        GetDatasetRequest {
            dataset_name: "orders",
            raw_selections: &raw_selections,
            configurables: HashMap::new(),
            offset: 0,
            limit: 10,
            orientation: Orientation::Records,
            post_sql: None,
            select: None,
        },
        &cache,
        || Arc::new(InMemoryEngine::with_seeds(seed_relations())) as Arc<dyn EmbeddedSql>,
        Arc::new(NoExternalConnections),
        30,
        10_000,
    )
    .await;

    assert!(matches!(result, Err(marten_core::error::MartenError::Forbidden { .. })));
}
