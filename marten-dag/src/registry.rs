//! Data Model Registry (C3, §4.3): load-time, by-name store of every
//! declared model's config and query artifact.

use std::collections::HashMap;

use crate::error::DagError;
use crate::node::ModelConfig;

#[derive(Debug, Default)]
pub struct ModelRegistry {
    models: HashMap<String, ModelConfig>,
}

impl ModelRegistry {
    /// §4.3: "Model names must be globally unique across all model
    /// types; duplicates fail with `configuration_error`."
    pub fn build(configs: Vec<ModelConfig>) -> Result<Self, DagError> {
        let mut models = HashMap::with_capacity(configs.len());
        for config in configs {
            let name = config.name.clone();
            if models.insert(name.clone(), config).is_some() {
                return Err(DagError::Configuration(format!("duplicate model name: {name}")));
            }
        }
        Ok(ModelRegistry { models })
    }

    pub fn get(&self, name: &str) -> Option<&ModelConfig> {
        self.models.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.models.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.models.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::ModelType;

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

    #[test]
    fn duplicate_model_names_are_rejected() {
        let err = ModelRegistry::build(vec![seed("orders"), seed("orders")]).unwrap_err();
        assert!(matches!(err, DagError::Configuration(_)));
    }

    #[test]
    fn distinct_names_build_fine() {
        let reg = ModelRegistry::build(vec![seed("orders"), seed("customers")]).unwrap();
        assert!(reg.contains("orders"));
        assert!(reg.contains("customers"));
    }
}
