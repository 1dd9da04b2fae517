//! `get_dataset` (C6, §4.6): the dataset/dashboard orchestrator entry
//! point tying together authorization, C2 resolution, C4 execution, and
//! result shaping.

use std::collections::HashMap;
use std::sync::Arc;

use marten_cache::{CoalescingCache, SelectionKey};
use marten_core::capability::{Authenticator, EmbeddedSql, User};
use marten_core::error::MartenError;
use marten_core::selection::{SelectionTuple, SelectionValue};
use marten_dag::{Dag, ExternalConnectionResolver, QueryExecutionContext};
use marten_params::{resolve_all, ParameterSet, RawSelections};

use crate::orientation::{paginate_and_orient, DatasetResultModel, Orientation};
use crate::project::ProjectDefinition;

pub struct GetDatasetRequest<'a> {
    pub dataset_name: &'a str,
    pub raw_selections: &'a RawSelections,
    pub configurables: HashMap<String, String>,
    pub offset: usize,
    pub limit: usize,
    pub orientation: Orientation,
    pub post_sql: Option<String>,
    pub select: Option<Vec<String>>,
}

#[allow(clippy::too_many_arguments)]
pub async fn get_dataset<A: Authenticator>(
    project: &ProjectDefinition,
    authenticator: &A,
    user: Option<&A::U>,
    request: GetDatasetRequest<'_>,
    results_cache: &CoalescingCache<SelectionKey, Arc<marten_core::capability::TableResult>>,
    mut engine_factory: impl FnMut() -> Arc<dyn EmbeddedSql>,
    external: Arc<dyn ExternalConnectionResolver>,
    sql_timeout_seconds: u64,
    max_rows_output: usize,
) -> Result<DatasetResultModel, MartenError>
where
    A::U: Clone + 'static,
{
    // Step 1: scope authorization (§4.6).
    let dataset = project
        .dataset(request.dataset_name)
        .ok_or_else(|| MartenError::configuration_error(format!("unknown dataset: {}", request.dataset_name)))?;
    if !authenticator.can_user_access_scope(user, &dataset.scope).await {
        return Err(MartenError::Forbidden {
            message: format!("user may not access dataset '{}'", request.dataset_name),
        });
    }

    let configurables = project.filter_declared_configurables(request.configurables);

    // Step 3: resolve parameters via C2 using the full config set, then
    // project down to the dataset's declared list if present.
    let params = resolve_all(&project.parameters, request.raw_selections, |attr| {
        attr.and_then(|path| user.and_then(|u| u.attribute(path)).map(str::to_string))
    })
    .map_err(MartenError::from)?;
    let params = project_parameters(params, dataset.declared_parameters.as_deref());

    let cache_key = selection_key_for_dataset(request.dataset_name, user, &params, &configurables);

    let target_model = dataset.target_model.clone();
    let dag_user: Option<Arc<dyn User>> = user.cloned().map(|u| Arc::new(u) as Arc<dyn User>);
    let result = results_cache
        .get_or_compute(cache_key, || {
            run_dag(
                project,
                &target_model,
                params,
                configurables,
                dag_user,
                engine_factory(),
                external,
                sql_timeout_seconds,
            )
        })
        .await?;

    // Step 5: enforce max_rows_output, apply post-SQL, then paginate/orient.
    // Post-SQL runs against a fresh engine connection, since the one the
    // DAG used may already be closed by the time a cache hit skips it.
    let post_sql_engine = request.post_sql.as_deref().map(|_| engine_factory());
    let (final_table, total_num_rows) = apply_post_sql_and_cap(
        result.as_ref(),
        request.post_sql.as_deref(),
        post_sql_engine,
        max_rows_output,
    )
    .await?;

    Ok(paginate_and_orient(
        &final_table,
        total_num_rows,
        request.offset,
        request.limit,
        request.orientation,
        request.select.as_deref(),
    ))
}

fn project_parameters(full: ParameterSet, declared: Option<&[String]>) -> ParameterSet {
    match declared {
        None => full,
        Some(names) => full.project(names),
    }
}

fn selection_key_for_dataset<U: User>(
    dataset_name: &str,
    user: Option<&U>,
    params: &ParameterSet,
    configurables: &HashMap<String, String>,
) -> SelectionKey {
    let mut selections: Vec<(String, SelectionValue)> = params
        .iter()
        .map(|p| {
            let ids = p.selected_ids_for_children();
            let value = if ids.len() == 1 {
                SelectionValue::single(ids.into_iter().next().unwrap())
            } else {
                SelectionValue::list(ids)
            };
            (p.name().to_string(), value)
        })
        .collect();
    selections.sort_by(|a, b| a.0.cmp(&b.0));
    let configurables_vec: Vec<(String, String)> = configurables.iter().map(|(k, v)| (k.clone(), v.clone())).collect();

    SelectionTuple::new(
        "dataset",
        dataset_name,
        user.map(|u| u.identity().to_string()),
        selections,
        configurables_vec,
    )
}

#[allow(clippy::too_many_arguments)]
async fn run_dag(
    project: &ProjectDefinition,
    target_model: &str,
    params: ParameterSet,
    configurables: HashMap<String, String>,
    user: Option<Arc<dyn User>>,
    engine: Arc<dyn EmbeddedSql>,
    external: Arc<dyn ExternalConnectionResolver>,
    sql_timeout_seconds: u64,
) -> Result<Arc<marten_core::capability::TableResult>, MartenError> {
    let ctx = QueryExecutionContext::new(params, configurables, user);
    let dag = Dag::build(
        &project.models,
        target_model,
        std::path::PathBuf::new(),
        &ctx,
        &HashMap::new(),
        &HashMap::new(),
    )
    .map_err(MartenError::from)?;

    dag.execute(engine.clone(), external, &ctx, sql_timeout_seconds)
        .await
        .map_err(MartenError::from)?;

    // §4.6 step 5: "Take the target's host lazy value" — the embedded
    // engine is queried for the materialized target relation.
    let table = engine
        .query(&format!("SELECT * FROM {target_model}"), &HashMap::new())
        .await
        .map_err(|e| MartenError::execution_error(target_model, e.to_string()))?;
    Ok(Arc::new(table))
}

/// §13 decision: the cap is enforced *after* post-SQL, since post-SQL
/// commonly aggregates a large upstream result down to a small one.
/// Post-SQL runs against a throwaway connection with the DAG's result
/// registered under the fixed relation name `result`.
async fn apply_post_sql_and_cap(
    table: &marten_core::capability::TableResult,
    post_sql: Option<&str>,
    post_sql_engine: Option<Arc<dyn EmbeddedSql>>,
    max_rows_output: usize,
) -> Result<(marten_core::capability::TableResult, usize), MartenError> {
    let table = match (post_sql, post_sql_engine) {
        (Some(sql), Some(engine)) => {
            engine
                .register("result", table.clone())
                .await
                .map_err(|e| MartenError::execution_error("result", e.to_string()))?;
            let transformed = engine
                .query(sql, &HashMap::new())
                .await
                .map_err(|e| MartenError::execution_error("result", e.to_string()))?;
            let _ = engine.close().await;
            transformed
        }
        _ => table.clone(),
    };

    let num_rows = table.num_rows();
    if num_rows > max_rows_output {
        return Err(MartenError::DatasetResultTooLarge {
            num_rows,
            max_rows: max_rows_output,
        });
    }
    Ok((table, num_rows))
}
