//! Reserved header normalization (§6): `x-api-key`, `x-config-<name>`,
//! `x-feature-flags`. Grounded on the teacher's plain re-export of
//! `axum::http::HeaderMap` as the header type handlers work with.

use std::collections::HashMap;

use axum::http::HeaderMap;
use marten_core::error::{sub_codes, MartenError};

const CONFIGURABLE_PREFIX: &str = "x-config-";

/// Alternative bearer credential (§6: "`x-api-key` — alternative bearer
/// credential").
pub fn api_key(headers: &HeaderMap) -> Option<&str> {
    headers.get("x-api-key").and_then(|v| v.to_str().ok())
}

pub fn orientation_header(headers: &HeaderMap) -> Option<&str> {
    headers.get("x-orientation").and_then(|v| v.to_str().ok())
}

/// Comma-separated feature flags (§6).
pub fn feature_flags(headers: &HeaderMap) -> Vec<String> {
    headers
        .get("x-feature-flags")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.split(',').map(|p| p.trim().to_string()).filter(|p| !p.is_empty()).collect())
        .unwrap_or_default()
}

/// Collects `x-config-<name>` headers into a configurables map. Two
/// headers normalizing to the same `<name>` (case-insensitively, since
/// HTTP header names are case-insensitive) is a client error, not a
/// silent overwrite (§6: `duplicate_configurable_header`).
pub fn configurable_headers(headers: &HeaderMap) -> Result<HashMap<String, String>, MartenError> {
    let mut out: HashMap<String, String> = HashMap::new();
    for name in headers.keys() {
        let lower = name.as_str().to_ascii_lowercase();
        let Some(configurable_name) = lower.strip_prefix(CONFIGURABLE_PREFIX) else {
            continue;
        };
        if configurable_name.is_empty() {
            continue;
        }
        // `HeaderName` is already case-insensitive, so repeated header
        // lines with the same name (a client sending `x-config-region`
        // twice) are the only way to actually collide here.
        let mut values = headers.get_all(name).iter();
        let value = values
            .next()
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| MartenError::invalid_input(sub_codes::MALFORMED_RESERVED_KEY, format!("non-ascii value for '{name}'")))?;
        if values.next().is_some() {
            return Err(MartenError::invalid_input(
                sub_codes::DUPLICATE_CONFIGURABLE_HEADER,
                format!("duplicate configurable header for '{configurable_name}'"),
            ));
        }
        out.insert(configurable_name.to_string(), value.to_string());
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(&str, &str)]) -> HeaderMap {
        let mut h = HeaderMap::new();
        for (k, v) in pairs {
            h.insert(axum::http::HeaderName::from_bytes(k.as_bytes()).unwrap(), HeaderValue::from_str(v).unwrap());
        }
        h
    }

    #[test]
    fn collects_distinct_configurables() {
        let h = headers(&[("x-config-region", "us"), ("x-config-tier", "gold")]);
        let configs = configurable_headers(&h).unwrap();
        assert_eq!(configs.get("region").map(String::as_str), Some("us"));
        assert_eq!(configs.get("tier").map(String::as_str), Some("gold"));
    }

    #[test]
    fn feature_flags_split_and_trim() {
        let h = headers(&[("x-feature-flags", "a, b ,c")]);
        assert_eq!(feature_flags(&h), vec!["a", "b", "c"]);
    }

    #[test]
    fn missing_headers_yield_empty() {
        let h = HeaderMap::new();
        assert!(configurable_headers(&h).unwrap().is_empty());
        assert!(feature_flags(&h).is_empty());
        assert!(api_key(&h).is_none());
    }
}
