//! Reserved query/body keys and headers (§6). Handlers read these before
//! touching C2/C6; nothing here is framework-specific — callers hand in
//! already-merged key/value maps from whatever extractor they use.

use std::collections::HashMap;

use marten_core::error::{sub_codes, MartenError};
use marten_orchestrator::Orientation;

/// The `x_`-prefixed request keys (§6), parsed once per request.
#[derive(Debug, Clone)]
pub struct ReservedKeys {
    pub verify_params: bool,
    pub parent_param: Option<String>,
    pub orientation: Orientation,
    pub offset: usize,
    pub limit: usize,
    pub sql_query: Option<String>,
    pub select: Option<Vec<String>>,
}

impl ReservedKeys {
    /// Parses reserved keys from a merged query-string/body map, applying
    /// the project's `max_limit` cap (§6: "enforced against a project
    /// cap") and an `x-orientation` header override if present.
    pub fn parse(raw: &HashMap<String, String>, orientation_header: Option<&str>, max_limit: usize) -> Result<Self, MartenError> {
        let verify_params = parse_bool(raw.get("x_verify_params"))?;
        let parent_param = raw.get("x_parent_param").filter(|s| !s.is_empty()).cloned();

        let orientation_raw = orientation_header.or_else(|| raw.get("x_orientation").map(String::as_str));
        let orientation = match orientation_raw {
            None => Orientation::default(),
            Some(s) => parse_orientation(s)?,
        };

        let offset = parse_usize(raw.get("x_offset"), "x_offset")?.unwrap_or(0);
        let limit = parse_usize(raw.get("x_limit"), "x_limit")?.unwrap_or(1000).min(max_limit);

        let sql_query = raw.get("x_sql_query").filter(|s| !s.is_empty()).cloned();
        let select = raw.get("x_select").map(|s| s.split(',').map(|p| p.trim().to_string()).collect());

        Ok(ReservedKeys {
            verify_params,
            parent_param,
            orientation,
            offset,
            limit,
            sql_query,
            select,
        })
    }
}

fn parse_bool(value: Option<&String>) -> Result<bool, MartenError> {
    match value.map(String::as_str) {
        None | Some("") => Ok(false),
        Some("true") | Some("1") => Ok(true),
        Some("false") | Some("0") => Ok(false),
        Some(other) => Err(malformed("x_verify_params", other)),
    }
}

fn parse_usize(value: Option<&String>, key: &str) -> Result<Option<usize>, MartenError> {
    match value {
        None => Ok(None),
        Some(s) => s.parse::<usize>().map(Some).map_err(|_| malformed(key, s)),
    }
}

fn parse_orientation(s: &str) -> Result<Orientation, MartenError> {
    match s {
        "records" => Ok(Orientation::Records),
        "rows" => Ok(Orientation::Rows),
        "columns" => Ok(Orientation::Columns),
        other => Err(malformed("x_orientation", other)),
    }
}

fn malformed(key: &str, value: &str) -> MartenError {
    MartenError::invalid_input(sub_codes::MALFORMED_RESERVED_KEY, format!("malformed reserved key '{key}': '{value}'"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn defaults_when_absent() {
        let keys = ReservedKeys::parse(&HashMap::new(), None, 1000).unwrap();
        assert!(!keys.verify_params);
        assert_eq!(keys.offset, 0);
        assert_eq!(keys.limit, 1000);
        assert_eq!(keys.orientation, Orientation::Records);
    }

    #[test]
    fn header_overrides_body_orientation() {
        let raw = map(&[("x_orientation", "rows")]);
        let keys = ReservedKeys::parse(&raw, Some("columns"), 1000).unwrap();
        assert_eq!(keys.orientation, Orientation::Columns);
    }

    #[test]
    fn limit_is_capped_by_project_max() {
        let raw = map(&[("x_limit", "5000")]);
        let keys = ReservedKeys::parse(&raw, None, 1000).unwrap();
        assert_eq!(keys.limit, 1000);
    }

    #[test]
    fn malformed_orientation_is_rejected() {
        let raw = map(&[("x_orientation", "sideways")]);
        assert!(ReservedKeys::parse(&raw, None, 1000).is_err());
    }
}
