//! `ParameterOption` (§3): immutable, per-variant option values, each
//! exposing `is_valid(user_group_value, selected_parent_ids)` (§4.1).
//! Represented as a tagged enum with per-variant data (§9: "multiple
//! dispatch over variants ... as tagged variants with a small interface
//! rather than inheritance hierarchies"), matching how the teacher
//! represents its own small sum types (e.g. `r2e_data::query::Condition`,
//! `r2e_core::config::ConfigValue`).

use chrono::NaiveDate;
use rust_decimal::Decimal;

/// Fields shared by every option variant (§3: "Shared: optional set of
/// user-group tags, optional set of parent option ids"). Empty = no
/// restriction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OptionFilters {
    pub user_groups: Vec<String>,
    pub parent_option_ids: Vec<String>,
}

impl OptionFilters {
    /// §4.1: "both the user-group filter and parent-id filter ... are
    /// satisfied". Empty filter sets never exclude (§8 monotonicity
    /// property).
    pub fn is_valid(&self, user_group_value: Option<&str>, selected_parent_ids: &[String]) -> bool {
        let user_ok = self.user_groups.is_empty()
            || user_group_value
                .map(|v| self.user_groups.iter().any(|g| g == v))
                .unwrap_or(false);
        let parent_ok = self.parent_option_ids.is_empty()
            || selected_parent_ids
                .iter()
                .any(|p| self.parent_option_ids.contains(p));
        user_ok && parent_ok
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectParameterOption {
    pub id: String,
    pub label: String,
    pub is_default: bool,
    pub custom_fields: serde_json::Map<String, serde_json::Value>,
    pub filters: OptionFilters,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DateParameterOption {
    pub default_date: NaiveDate,
    pub min_date: Option<NaiveDate>,
    pub max_date: Option<NaiveDate>,
    pub date_format: String,
    pub filters: OptionFilters,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DateRangeParameterOption {
    pub default_start: NaiveDate,
    pub default_end: NaiveDate,
    pub min_date: Option<NaiveDate>,
    pub max_date: Option<NaiveDate>,
    pub date_format: String,
    pub filters: OptionFilters,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NumberParameterOption {
    pub min_value: Decimal,
    pub max_value: Decimal,
    pub increment: Decimal,
    pub default_value: Decimal,
    pub filters: OptionFilters,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NumberRangeParameterOption {
    pub min_value: Decimal,
    pub max_value: Decimal,
    pub increment: Decimal,
    pub default_lower_value: Decimal,
    pub default_upper_value: Decimal,
    pub filters: OptionFilters,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InputType {
    Text,
    Textarea,
    Number,
    Date,
    #[serde(rename = "datetime-local")]
    DatetimeLocal,
    Month,
    Time,
    Color,
    Password,
}

impl InputType {
    /// `%`-style strptime pattern for this input type, or `None` when the
    /// type is unconstrained text (§6 parsing grammar).
    pub fn strptime_pattern(self) -> Option<&'static str> {
        match self {
            InputType::Date => Some("%Y-%m-%d"),
            InputType::DatetimeLocal => Some("%Y-%m-%dT%H:%M"),
            InputType::Month => Some("%Y-%m"),
            InputType::Time => Some("%H:%M"),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextParameterOption {
    pub default_text: String,
    pub input_type: InputType,
    pub filters: OptionFilters,
}

/// `ParameterOption` variant (§3).
#[derive(Debug, Clone, PartialEq)]
pub enum ParameterOption {
    Select(SelectParameterOption),
    Date(DateParameterOption),
    DateRange(DateRangeParameterOption),
    Number(NumberParameterOption),
    NumberRange(NumberRangeParameterOption),
    Text(TextParameterOption),
}

impl ParameterOption {
    pub fn filters(&self) -> &OptionFilters {
        match self {
            ParameterOption::Select(o) => &o.filters,
            ParameterOption::Date(o) => &o.filters,
            ParameterOption::DateRange(o) => &o.filters,
            ParameterOption::Number(o) => &o.filters,
            ParameterOption::NumberRange(o) => &o.filters,
            ParameterOption::Text(o) => &o.filters,
        }
    }

    /// §4.1: "Each option exposes `is_valid(user_group_value,
    /// selected_parent_ids)`".
    pub fn is_valid(&self, user_group_value: Option<&str>, selected_parent_ids: &[String]) -> bool {
        self.filters()
            .is_valid(user_group_value, selected_parent_ids)
    }

    pub fn as_select(&self) -> Option<&SelectParameterOption> {
        match self {
            ParameterOption::Select(o) => Some(o),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filters(groups: &[&str], parents: &[&str]) -> OptionFilters {
        OptionFilters {
            user_groups: groups.iter().map(|s| s.to_string()).collect(),
            parent_option_ids: parents.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn empty_user_groups_never_exclude() {
        let f = filters(&[], &["p1"]);
        assert!(f.is_valid(None, &["p1".into()]));
        assert!(f.is_valid(Some("anything"), &["p1".into()]));
    }

    #[test]
    fn empty_parent_ids_never_exclude() {
        let f = filters(&["g1"], &[]);
        assert!(f.is_valid(Some("g1"), &[]));
        assert!(f.is_valid(Some("g1"), &["whatever".into()]));
    }

    #[test]
    fn both_filters_must_pass() {
        let f = filters(&["g1"], &["p1"]);
        assert!(f.is_valid(Some("g1"), &["p1".into()]));
        assert!(!f.is_valid(Some("g2"), &["p1".into()]));
        assert!(!f.is_valid(Some("g1"), &["p2".into()]));
    }

    #[test]
    fn public_scope_with_no_user_group_value_fails_restricted_filter() {
        let f = filters(&["g1"], &[]);
        assert!(!f.is_valid(None, &[]));
    }
}
