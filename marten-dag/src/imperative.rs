//! The imperative-model collaborator interface (§4.3, §4.4): a model
//! whose query is a callable rather than a SQL template.

use async_trait::async_trait;
use marten_core::capability::TableResult;

use crate::context::QueryExecutionContext;
use crate::error::DagError;

/// §4.4: "invoke its declared `dependencies(ctx)` to obtain the
/// dependency set, then wrap the main callable for deferred execution".
#[async_trait]
pub trait ImperativeModel: Send + Sync {
    /// Discovers this model's upstream dependency names. Called once per
    /// DAG build, before execution.
    fn dependencies(&self, ctx: &QueryExecutionContext) -> Vec<String>;

    /// Runs the model to produce its tabular result.
    async fn run(&self, ctx: &QueryExecutionContext) -> Result<TableResult, DagError>;
}
