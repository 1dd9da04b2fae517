use std::path::Path;

use super::value::{ConfigValue, ValueMap};
use super::ConfigError;

/// Load and parse a YAML file, flattening it into dot-separated keys.
/// Adapted from the teacher's `r2e_core::config::loader::load_yaml_file`.
pub(crate) fn load_yaml_file(path: &Path, values: &mut ValueMap) -> Result<(), ConfigError> {
    if path.exists() {
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::Load(e.to_string()))?;
        load_yaml_str(&content, values)?;
    }
    Ok(())
}

pub(crate) fn load_yaml_str(content: &str, values: &mut ValueMap) -> Result<(), ConfigError> {
    let yaml: serde_yaml::Value =
        serde_yaml::from_str(content).map_err(|e| ConfigError::Load(e.to_string()))?;
    flatten_yaml("", &yaml, values);
    Ok(())
}

fn flatten_yaml(prefix: &str, value: &serde_yaml::Value, out: &mut ValueMap) {
    match value {
        serde_yaml::Value::Mapping(map) => {
            for (k, v) in map {
                let key_str = match k {
                    serde_yaml::Value::String(s) => s.clone(),
                    other => format!("{other:?}"),
                };
                let full_key = if prefix.is_empty() {
                    key_str
                } else {
                    format!("{prefix}.{key_str}")
                };
                flatten_yaml(&full_key, v, out);
            }
        }
        serde_yaml::Value::Sequence(seq) => {
            if !prefix.is_empty() {
                out.insert(
                    prefix.to_string(),
                    ConfigValue::List(seq.iter().map(ConfigValue::from_yaml).collect()),
                );
            }
        }
        leaf => {
            if !prefix.is_empty() {
                out.insert(prefix.to_string(), ConfigValue::from_yaml(leaf));
            }
        }
    }
}

/// Apply `MARTEN_<DOTTED_KEY>` environment overrides on top of file-sourced
/// values (lower-cased, underscores mapped to dots), the way the original
/// project split project-committed config from environment-supplied
/// overrides in `_environcfg.py`/`_env_vars.py`.
pub(crate) fn apply_env_overrides(prefix: &str, values: &mut ValueMap) {
    for (key, raw) in std::env::vars() {
        let Some(rest) = key.strip_prefix(prefix) else {
            continue;
        };
        let dotted = rest.to_lowercase().replace('_', ".");
        if dotted.is_empty() {
            continue;
        }
        values.insert(dotted, ConfigValue::from_env_str(&raw));
    }
}
