//! Handler-shaped functions for the §6 HTTP surface. Each function takes
//! already-parsed inputs (no framework extractor types beyond `HeaderMap`,
//! which is just data) and returns a response DTO or a [`MartenError`];
//! wiring these into an actual router is left to the embedding
//! application (§1 Non-goal: "the embedding HTTP framework").

use std::collections::HashMap;
use std::sync::Arc;

use marten_core::capability::{Authenticator, EmbeddedSql, User};
use marten_core::error::MartenError;
use marten_dag::{Dag, ExternalConnectionResolver};
use marten_orchestrator::{get_dataset, DatasetResultModel, GetDatasetRequest, ProjectDefinition};
use marten_params::{resolve_all, resolve_subtree, ParamsError, RawSelections};
use serde::Serialize;
use serde_json::json;

use crate::reserved::ReservedKeys;

/// `…/data-catalog` (§6): datasets and dashboards visible to the caller.
#[derive(Debug, Serialize)]
pub struct DataCatalogEntry {
    pub name: String,
    pub kind: &'static str,
    pub scope: String,
}

pub async fn data_catalog<A: Authenticator>(
    project: &ProjectDefinition,
    authenticator: &A,
    user: Option<&A::U>,
) -> Vec<DataCatalogEntry> {
    let mut entries = Vec::new();
    for dataset in project.datasets.values() {
        if authenticator.can_user_access_scope(user, &dataset.scope).await {
            entries.push(DataCatalogEntry {
                name: dataset.name.clone(),
                kind: "dataset",
                scope: dataset.scope.clone(),
            });
        }
    }
    for dashboard in project.dashboards.values() {
        if authenticator.can_user_access_scope(user, &dashboard.scope).await {
            entries.push(DataCatalogEntry {
                name: dashboard.name.clone(),
                kind: "dashboard",
                scope: dashboard.scope.clone(),
            });
        }
    }
    entries
}

/// `…/parameters` and `…/dataset/{name}/parameters` (§6): resolve the
/// full project parameter graph, or (via `x_parent_param`) only the
/// subtree below one changed parameter.
pub fn resolve_parameters<U: User>(
    project: &ProjectDefinition,
    user: Option<&U>,
    raw_selections: &RawSelections,
    parent_param: Option<&str>,
) -> Result<serde_json::Value, MartenError> {
    let resolve_attr = |attr: Option<&str>| attr.and_then(|path| user.and_then(|u| u.attribute(path)).map(str::to_string));

    let params = match parent_param {
        None => resolve_all(&project.parameters, raw_selections, resolve_attr).map_err(MartenError::from)?,
        Some(changed) => {
            if raw_selections.len() > 1 {
                return Err(ParamsError::AmbiguousUpdateSelection.into());
            }
            resolve_subtree(&project.parameters, changed, raw_selections, resolve_attr).map_err(MartenError::from)?
        }
    };

    Ok(json!({ "parameters": params.iter().map(|p| p.to_wire()).collect::<Vec<_>>() }))
}

/// The `…/dataset/{name}` response: either an executed result, or (when
/// `x_verify_params` is set) the resolved parameters from a dry run that
/// validated the DAG but never executed it (§12 supplemented feature).
pub enum DatasetResponse {
    Result(DatasetResultModel),
    Verified(serde_json::Value),
}

/// `…/dataset/{name}` (§6): resolve + execute, or a dry run.
#[allow(clippy::too_many_arguments)]
pub async fn dataset<A: Authenticator>(
    project: &ProjectDefinition,
    authenticator: &A,
    user: Option<&A::U>,
    dataset_name: &str,
    raw_selections: &RawSelections,
    reserved: &ReservedKeys,
    configurables: HashMap<String, String>,
    results_cache: &marten_cache::CoalescingCache<marten_cache::SelectionKey, Arc<marten_core::capability::TableResult>>,
    engine_factory: impl FnMut() -> Arc<dyn EmbeddedSql>,
    external: Arc<dyn ExternalConnectionResolver>,
    sql_timeout_seconds: u64,
    max_rows_output: usize,
) -> Result<DatasetResponse, MartenError>
where
    A::U: Clone + 'static,
{
    let def = project
        .dataset(dataset_name)
        .ok_or_else(|| MartenError::configuration_error(format!("unknown dataset: {dataset_name}")))?;

    if reserved.verify_params {
        if !authenticator.can_user_access_scope(user, &def.scope).await {
            return Err(MartenError::Forbidden {
                message: format!("user may not access dataset '{dataset_name}'"),
            });
        }
        let resolve_attr = |attr: Option<&str>| attr.and_then(|path| user.and_then(|u| u.attribute(path)).map(str::to_string));
        let params = resolve_all(&project.parameters, raw_selections, resolve_attr).map_err(MartenError::from)?;
        let dag_user: Option<Arc<dyn User>> = user.cloned().map(|u| Arc::new(u) as Arc<dyn User>);
        let ctx = marten_dag::QueryExecutionContext::new(params, HashMap::new(), dag_user);
        Dag::build(&project.models, &def.target_model, std::path::PathBuf::new(), &ctx, &HashMap::new(), &HashMap::new())
            .map_err(MartenError::from)?;
        let wire = json!({ "parameters": ctx.prms.iter().map(|p| p.to_wire()).collect::<Vec<_>>() });
        return Ok(DatasetResponse::Verified(wire));
    }

    let result = get_dataset(
        project,
        authenticator,
        user,
        GetDatasetRequest {
            dataset_name,
            raw_selections,
            configurables,
            offset: reserved.offset,
            limit: reserved.limit,
            orientation: reserved.orientation,
            post_sql: reserved.sql_query.clone(),
            select: reserved.select.clone(),
        },
        results_cache,
        engine_factory,
        external,
        sql_timeout_seconds,
        max_rows_output,
    )
    .await?;
    Ok(DatasetResponse::Result(result))
}

/// `…/dashboard/{name}/parameters` (§6): same resolution as
/// `resolve_parameters`, gated by the dashboard's own scope.
pub async fn dashboard_parameters<A: Authenticator>(
    project: &ProjectDefinition,
    authenticator: &A,
    user: Option<&A::U>,
    dashboard_name: &str,
    raw_selections: &RawSelections,
    parent_param: Option<&str>,
) -> Result<serde_json::Value, MartenError> {
    let def = project
        .dashboard(dashboard_name)
        .ok_or_else(|| MartenError::configuration_error(format!("unknown dashboard: {dashboard_name}")))?;
    if !authenticator.can_user_access_scope(user, &def.scope).await {
        return Err(MartenError::Forbidden {
            message: format!("user may not access dashboard '{dashboard_name}'"),
        });
    }
    resolve_parameters(project, user, raw_selections, parent_param)
}

/// `…/dashboard/{name}` (§6): "return rendered dashboard bytes" — the
/// dashboard's constituent datasets, each resolved and executed, keyed by
/// dataset name.
#[allow(clippy::too_many_arguments)]
pub async fn dashboard<A: Authenticator>(
    project: &ProjectDefinition,
    authenticator: &A,
    user: Option<&A::U>,
    dashboard_name: &str,
    raw_selections: &RawSelections,
    reserved: &ReservedKeys,
    configurables: HashMap<String, String>,
    results_cache: &marten_cache::CoalescingCache<marten_cache::SelectionKey, Arc<marten_core::capability::TableResult>>,
    mut engine_factory: impl FnMut() -> Arc<dyn EmbeddedSql>,
    external: Arc<dyn ExternalConnectionResolver>,
    sql_timeout_seconds: u64,
    max_rows_output: usize,
) -> Result<HashMap<String, DatasetResultModel>, MartenError>
where
    A::U: Clone + 'static,
{
    let def = project
        .dashboard(dashboard_name)
        .ok_or_else(|| MartenError::configuration_error(format!("unknown dashboard: {dashboard_name}")))?;
    if !authenticator.can_user_access_scope(user, &def.scope).await {
        return Err(MartenError::Forbidden {
            message: format!("user may not access dashboard '{dashboard_name}'"),
        });
    }

    let mut rendered = HashMap::new();
    for dataset_name in &def.dataset_names {
        let response = dataset(
            project,
            authenticator,
            user,
            dataset_name,
            raw_selections,
            reserved,
            configurables.clone(),
            results_cache,
            &mut engine_factory,
            external.clone(),
            sql_timeout_seconds,
            max_rows_output,
        )
        .await?;
        if let DatasetResponse::Result(model) = response {
            rendered.insert(dataset_name.clone(), model);
        }
    }
    Ok(rendered)
}

/// §6: collect configurables visible to this caller, honoring the
/// "extracted only when the user's access level meets a configured
/// threshold" rule (§4.8).
pub fn elevated_configurables<U: User>(
    project: &ProjectDefinition,
    user: Option<&U>,
    header_configurables: HashMap<String, String>,
    min_access_level: u32,
) -> HashMap<String, String> {
    let access_level = user.map(|u| u.access_level()).unwrap_or(0);
    if access_level < min_access_level {
        return HashMap::new();
    }
    project.filter_declared_configurables(header_configurables)
}
