//! Project-level declarations consumed by the orchestrator: the parameter
//! config set (C1), the model registry (C3), and the dataset/dashboard
//! catalog (§4.6, §6 `…/data-catalog`).

use std::collections::HashMap;

use marten_core::capability::ColumnSchema;
use marten_dag::ModelRegistry;
use marten_params::ParameterConfigSet;

#[derive(Debug, Clone)]
pub struct DatasetDef {
    pub name: String,
    pub target_model: String,
    /// §4.6 step 1: the scope checked via `Authenticator.can_user_access_scope`.
    pub scope: String,
    /// §4.6 step 3: "project to the dataset's declared parameter list if
    /// present"; `None` means every project parameter applies.
    pub declared_parameters: Option<Vec<String>>,
}

#[derive(Debug, Clone)]
pub struct DashboardDef {
    pub name: String,
    pub scope: String,
    pub dataset_names: Vec<String>,
}

pub struct ProjectDefinition {
    pub name: String,
    pub parameters: ParameterConfigSet,
    pub models: ModelRegistry,
    pub datasets: HashMap<String, DatasetDef>,
    pub dashboards: HashMap<String, DashboardDef>,
    pub configurable_names: Vec<String>,
    /// Target model's declared output columns, for schema attachment
    /// (§4.6 step 6).
    pub model_columns: HashMap<String, Vec<ColumnSchema>>,
}

impl ProjectDefinition {
    pub fn dataset(&self, name: &str) -> Option<&DatasetDef> {
        self.datasets.get(name)
    }

    pub fn dashboard(&self, name: &str) -> Option<&DashboardDef> {
        self.dashboards.get(name)
    }

    /// §4.8: "Elevated configurables are extracted only when the user's
    /// access level meets a configured threshold" — filters a raw
    /// configurables map down to project-declared names.
    pub fn filter_declared_configurables(
        &self,
        raw: HashMap<String, String>,
    ) -> HashMap<String, String> {
        raw.into_iter()
            .filter(|(k, _)| self.configurable_names.iter().any(|n| n == k))
            .collect()
    }
}
