//! The parsing grammar from spec §6: a raw incoming selection may arrive
//! as a single query-string value or as a JSON body value, and list-like
//! widgets accept either a JSON array or a comma-delimited string.

use serde_json::Value as JsonValue;

#[derive(Debug, Clone)]
pub enum RawSelection {
    Absent,
    Str(String),
    Json(JsonValue),
}

impl RawSelection {
    pub fn is_absent(&self) -> bool {
        match self {
            RawSelection::Absent => true,
            RawSelection::Str(s) => s.is_empty(),
            RawSelection::Json(JsonValue::Null) => true,
            RawSelection::Json(JsonValue::Array(a)) => a.is_empty(),
            RawSelection::Json(JsonValue::String(s)) => s.is_empty(),
            _ => false,
        }
    }

    /// Single scalar form (single-select id, a date literal, a number
    /// literal, free text).
    pub fn as_scalar(&self) -> Option<String> {
        match self {
            RawSelection::Absent => None,
            RawSelection::Str(s) => Some(s.clone()),
            RawSelection::Json(JsonValue::String(s)) => Some(s.clone()),
            RawSelection::Json(JsonValue::Number(n)) => Some(n.to_string()),
            RawSelection::Json(JsonValue::Bool(b)) => Some(b.to_string()),
            RawSelection::Json(JsonValue::Array(a)) if a.len() == 1 => {
                a[0].as_str().map(|s| s.to_string())
            }
            _ => None,
        }
    }

    /// List form: a JSON array of strings, OR a comma-delimited string
    /// (§6: "either a JSON array of ids OR a comma-delimited list").
    pub fn as_list(&self) -> Option<Vec<String>> {
        match self {
            RawSelection::Absent => None,
            RawSelection::Json(JsonValue::Array(items)) => Some(
                items
                    .iter()
                    .map(|v| match v {
                        JsonValue::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .collect(),
            ),
            RawSelection::Json(JsonValue::String(s)) => {
                Some(s.split(',').map(|p| p.trim().to_string()).collect())
            }
            RawSelection::Str(s) => Some(s.split(',').map(|p| p.trim().to_string()).collect()),
            _ => None,
        }
    }

    /// Exactly-two form for date-range/number-range (§6: "a JSON array of
    /// two dates OR a comma-delimited pair").
    pub fn as_pair(&self) -> Option<(String, String)> {
        let list = self.as_list()?;
        if list.len() == 2 {
            Some((list[0].clone(), list[1].clone()))
        } else {
            None
        }
    }
}

impl From<Option<String>> for RawSelection {
    fn from(value: Option<String>) -> Self {
        match value {
            Some(s) => RawSelection::Str(s),
            None => RawSelection::Absent,
        }
    }
}

impl From<JsonValue> for RawSelection {
    fn from(value: JsonValue) -> Self {
        RawSelection::Json(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_from_comma_string() {
        let raw = RawSelection::Str("a, b,c".into());
        assert_eq!(raw.as_list().unwrap(), vec!["a", "b", "c"]);
    }

    #[test]
    fn list_from_json_array() {
        let raw = RawSelection::Json(serde_json::json!(["a", "b"]));
        assert_eq!(raw.as_list().unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn pair_requires_exactly_two() {
        assert!(RawSelection::Str("a,b,c".into()).as_pair().is_none());
        assert_eq!(
            RawSelection::Str("2023-01-01,2023-02-01".into()).as_pair(),
            Some(("2023-01-01".to_string(), "2023-02-01".to_string()))
        );
    }

    #[test]
    fn absent_detection() {
        assert!(RawSelection::Absent.is_absent());
        assert!(RawSelection::Str(String::new()).is_absent());
        assert!(!RawSelection::Str("x".into()).is_absent());
    }
}
