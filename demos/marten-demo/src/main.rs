use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use marten_core::capability::{Authenticator, EmbeddedSql, ExternalConnection};
use marten_dag::ExternalConnectionResolver;
use marten_demo::project::{project, seed_relations};
use marten_demo::{DemoAuthenticator, DemoUser, InMemoryEngine};
use marten_orchestrator::{get_dataset, GetDatasetRequest, Orientation};

struct NoExternalConnections;

#[async_trait]
impl ExternalConnectionResolver for NoExternalConnections {
    async fn resolve(&self, _connection_name: &str) -> Option<Arc<dyn ExternalConnection>> {
        None
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::from_default_env()).init();

    let project = project();
    let authenticator = DemoAuthenticator::new().with_user(
        "demo-token",
        DemoUser {
            identity: "demo-user".into(),
            attributes: HashMap::new(),
            access_level: 1,
            allowed_scopes: vec!["sales.read".into()],
        },
    );
    let user = authenticator.authenticate("demo-token").await.expect("demo token resolves");

    let results_cache = marten_cache::CoalescingCache::new(std::time::Duration::from_secs(60), 100);
    let raw_selections = HashMap::new();

    let result = get_dataset(
        &project,
        &authenticator,
        Some(&user),
        GetDatasetRequest {
            dataset_name: "orders",
            raw_selections: &raw_selections,
            configurables: HashMap::new(),
            offset: 0,
            limit: 100,
            orientation: Orientation::Records,
            post_sql: None,
            select: None,
        },
        &results_cache,
        || Arc::new(InMemoryEngine::with_seeds(seed_relations())) as Arc<dyn EmbeddedSql>,
        Arc::new(NoExternalConnections),
        30,
        10_000,
    )
    .await
    .expect("dataset resolves");

    println!("{}", serde_json::to_string_pretty(&result.data).unwrap());
}
