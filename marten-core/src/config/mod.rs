mod loader;
pub mod value;

use std::ops::Deref;
use std::path::Path;

pub use value::{ConfigValue, FromConfigValue};

/// Error type for configuration operations. Adapted from the teacher's
/// `r2e_core::config::ConfigError`.
#[derive(Debug)]
pub enum ConfigError {
    NotFound(String),
    TypeMismatch { key: String, expected: &'static str },
    Load(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::NotFound(key) => write!(f, "config key not found: {key}"),
            ConfigError::TypeMismatch { key, expected } => {
                write!(f, "config key '{key}' is not a valid {expected}")
            }
            ConfigError::Load(msg) => write!(f, "failed to load config: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// A loaded, dot-key-flattened configuration tree (project manifest plus
/// environment overrides). Immutable once built (§3 lifecycle invariant:
/// "created once at project load ... immutable thereafter").
#[derive(Debug, Clone, Default)]
pub struct RawConfig(value::ValueMap);

impl RawConfig {
    pub fn load(manifest_path: &Path, env_prefix: &str) -> Result<Self, ConfigError> {
        let mut values = value::ValueMap::new();
        loader::load_yaml_file(manifest_path, &mut values)?;
        loader::apply_env_overrides(env_prefix, &mut values);
        Ok(Self(values))
    }

    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        let mut values = value::ValueMap::new();
        loader::load_yaml_str(content, &mut values)?;
        Ok(Self(values))
    }

    pub fn get<T: FromConfigValue>(&self, key: &str) -> Result<T, ConfigError> {
        let raw = self
            .0
            .get(key)
            .ok_or_else(|| ConfigError::NotFound(key.to_string()))?;
        T::from_config_value(raw, key)
    }

    pub fn get_or<T: FromConfigValue>(&self, key: &str, default: T) -> T {
        self.get(key).unwrap_or(default)
    }
}

/// Strongly-typed project-level settings pulled out of [`RawConfig`] once,
/// at load time (§4.7, §6, §5).
#[derive(Debug, Clone)]
pub struct ProjectConfig {
    pub project_name: String,
    pub version_prefix: String,
    pub max_rows_output: usize,
    pub sql_timeout_seconds: u64,
    pub no_cache: bool,
    pub parameters_cache_ttl_seconds: u64,
    pub parameters_cache_capacity: usize,
    pub dataset_cache_ttl_seconds: u64,
    pub dataset_cache_capacity: usize,
    pub max_limit: usize,
    pub elevated_access_level: u32,
    raw: RawConfig,
}

impl ProjectConfig {
    pub fn from_raw(raw: RawConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            project_name: raw.get_or("project.name", "untitled".to_string()),
            version_prefix: raw.get_or("project.version_prefix".into(), "v0".to_string()),
            max_rows_output: raw.get_or::<u64>("limits.max_rows_output", 100_000) as usize,
            sql_timeout_seconds: raw.get_or("limits.sql_timeout_seconds", 30),
            no_cache: raw.get_or("cache.no_cache", false),
            parameters_cache_ttl_seconds: raw.get_or("cache.parameters.ttl_seconds", 60),
            parameters_cache_capacity: raw.get_or::<u64>("cache.parameters.capacity", 1000) as usize,
            dataset_cache_ttl_seconds: raw.get_or("cache.datasets.ttl_seconds", 60),
            dataset_cache_capacity: raw.get_or::<u64>("cache.datasets.capacity", 200) as usize,
            max_limit: raw.get_or::<u64>("limits.max_limit", 10_000) as usize,
            elevated_access_level: raw.get_or::<u64>("security.elevated_access_level", 100) as u32,
            raw,
        })
    }
}

impl Deref for ProjectConfig {
    type Target = RawConfig;
    fn deref(&self) -> &Self::Target {
        &self.raw
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_manifest_omits_keys() {
        let raw = RawConfig::from_yaml_str("project:\n  name: demo\n").unwrap();
        let cfg = ProjectConfig::from_raw(raw).unwrap();
        assert_eq!(cfg.project_name, "demo");
        assert_eq!(cfg.max_rows_output, 100_000);
        assert!(!cfg.no_cache);
    }

    #[test]
    fn explicit_values_override_defaults() {
        let raw = RawConfig::from_yaml_str(
            "project:\n  name: demo\nlimits:\n  max_rows_output: 50\ncache:\n  no_cache: true\n",
        )
        .unwrap();
        let cfg = ProjectConfig::from_raw(raw).unwrap();
        assert_eq!(cfg.max_rows_output, 50);
        assert!(cfg.no_cache);
    }

    #[test]
    fn env_override_wins_over_file() {
        std::env::set_var("MARTEN_TEST_ENV_OVERRIDE_KEY", "99");
        let raw = RawConfig::load(Path::new("/nonexistent.yml"), "MARTEN_TEST_ENV_OVERRIDE_").unwrap();
        let v: i64 = raw.get("key").unwrap();
        assert_eq!(v, 99);
        std::env::remove_var("MARTEN_TEST_ENV_OVERRIDE_KEY");
    }
}
