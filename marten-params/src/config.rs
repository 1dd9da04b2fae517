//! `ParameterConfig` (§3, §4.1): the declared, immutable shape of a
//! parameter plus its `all_options`. `with_selection` projects a config
//! plus a raw request value into a resolved [`Parameter`].

use std::collections::HashMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::error::ParamsError;
use crate::option::{
    DateParameterOption, DateRangeParameterOption, InputType, NumberParameterOption,
    NumberRangeParameterOption, ParameterOption, SelectParameterOption, TextParameterOption,
};
use crate::parameter::Parameter;
use crate::raw::RawSelection;

#[derive(Debug, Clone)]
pub struct ParamMeta {
    pub name: String,
    pub label: String,
    pub description: String,
    /// §4.1: the user attribute path consulted for the user-group filter.
    pub user_attribute: Option<String>,
    /// §4.1: "Parents must be selection parameters" — `None` for roots.
    pub parent_name: Option<String>,
}

#[derive(Debug, Clone)]
pub enum ParameterConfig {
    SingleSelect {
        meta: ParamMeta,
        options: Vec<SelectParameterOption>,
        /// Computed during `ParameterConfigSet::build` (§3): true when some
        /// other config names this one as `parent_name`.
        trigger_refresh: bool,
    },
    MultiSelect {
        meta: ParamMeta,
        options: Vec<SelectParameterOption>,
        trigger_refresh: bool,
        show_select_all: bool,
        order_matters: bool,
        none_is_all: bool,
    },
    Date {
        meta: ParamMeta,
        options: Vec<DateParameterOption>,
    },
    DateRange {
        meta: ParamMeta,
        options: Vec<DateRangeParameterOption>,
    },
    Number {
        meta: ParamMeta,
        options: Vec<NumberParameterOption>,
    },
    NumberRange {
        meta: ParamMeta,
        options: Vec<NumberRangeParameterOption>,
    },
    Text {
        meta: ParamMeta,
        options: Vec<TextParameterOption>,
    },
}

impl ParameterConfig {
    pub fn meta(&self) -> &ParamMeta {
        match self {
            ParameterConfig::SingleSelect { meta, .. }
            | ParameterConfig::MultiSelect { meta, .. }
            | ParameterConfig::Date { meta, .. }
            | ParameterConfig::DateRange { meta, .. }
            | ParameterConfig::Number { meta, .. }
            | ParameterConfig::NumberRange { meta, .. }
            | ParameterConfig::Text { meta, .. } => meta,
        }
    }

    pub fn name(&self) -> &str {
        &self.meta().name
    }

    pub fn is_select(&self) -> bool {
        matches!(
            self,
            ParameterConfig::SingleSelect { .. } | ParameterConfig::MultiSelect { .. }
        )
    }

    fn set_trigger_refresh(&mut self, value: bool) {
        match self {
            ParameterConfig::SingleSelect { trigger_refresh, .. }
            | ParameterConfig::MultiSelect { trigger_refresh, .. } => *trigger_refresh = value,
            _ => {}
        }
    }

    /// §4.1 "Config operations": project `all_options` through validity,
    /// then apply the raw selection (or defaults), producing a resolved
    /// [`Parameter`].
    ///
    /// `user_group_value` comes from resolving `meta.user_attribute`
    /// against the authenticated user (§4.1). `selected_parent_ids` is the
    /// parent's current selection, empty for root parameters.
    pub fn with_selection(
        &self,
        raw: &RawSelection,
        user_group_value: Option<&str>,
        selected_parent_ids: &[String],
    ) -> Result<Parameter, ParamsError> {
        match self {
            ParameterConfig::SingleSelect {
                meta,
                options,
                trigger_refresh,
            } => {
                let visible = visible_select(options, user_group_value, selected_parent_ids);
                let selected_id = if raw.is_absent() {
                    visible.iter().find(|o| o.is_default).or(visible.first()).map(|o| o.id.clone())
                } else {
                    let requested = raw
                        .as_scalar()
                        .ok_or_else(|| invalid(meta, raw, "expected a single option id"))?;
                    if !visible.iter().any(|o| o.id == requested) {
                        return Err(invalid(
                            meta,
                            raw,
                            "id is not among the currently visible options",
                        ));
                    }
                    Some(requested)
                };
                Ok(Parameter::SingleSelect {
                    name: meta.name.clone(),
                    label: meta.label.clone(),
                    description: meta.description.clone(),
                    trigger_refresh: *trigger_refresh,
                    visible_options: visible.into_iter().cloned().collect(),
                    selected_id,
                })
            }
            ParameterConfig::MultiSelect {
                meta,
                options,
                trigger_refresh,
                show_select_all,
                order_matters,
                none_is_all,
            } => {
                let visible = visible_select(options, user_group_value, selected_parent_ids);
                let visible_ids: Vec<&str> = visible.iter().map(|o| o.id.as_str()).collect();
                let selected_ids = if raw.is_absent() {
                    let defaults: Vec<String> = visible
                        .iter()
                        .filter(|o| o.is_default)
                        .map(|o| o.id.clone())
                        .collect();
                    if defaults.is_empty() && *none_is_all {
                        visible.iter().map(|o| o.id.clone()).collect()
                    } else {
                        defaults
                    }
                } else {
                    let requested = raw
                        .as_list()
                        .ok_or_else(|| invalid(meta, raw, "expected a list of option ids"))?;
                    for id in &requested {
                        if !visible_ids.contains(&id.as_str()) {
                            return Err(invalid(
                                meta,
                                raw,
                                format!("id '{id}' is not among the currently visible options"),
                            ));
                        }
                    }
                    requested
                };
                Ok(Parameter::MultiSelect {
                    name: meta.name.clone(),
                    label: meta.label.clone(),
                    description: meta.description.clone(),
                    trigger_refresh: *trigger_refresh,
                    show_select_all: *show_select_all,
                    order_matters: *order_matters,
                    none_is_all: *none_is_all,
                    visible_options: visible.into_iter().cloned().collect(),
                    selected_ids,
                })
            }
            ParameterConfig::Date { meta, options } => {
                let opt = current_option(options, user_group_value, selected_parent_ids)
                    .ok_or_else(|| disabled_source(meta))?;
                let selected_date = if raw.is_absent() {
                    opt.default_date
                } else {
                    let text = raw.as_scalar().ok_or_else(|| invalid(meta, raw, "expected a date"))?;
                    let parsed = NaiveDate::parse_from_str(&text, &opt.date_format)
                        .map_err(|_| invalid(meta, raw, format!("does not match format '{}'", opt.date_format)))?;
                    check_date_bounds(meta, raw, parsed, opt.min_date, opt.max_date)?;
                    parsed
                };
                Ok(Parameter::Date {
                    name: meta.name.clone(),
                    label: meta.label.clone(),
                    description: meta.description.clone(),
                    visible_options: options.clone(),
                    date_format: opt.date_format.clone(),
                    selected_date,
                })
            }
            ParameterConfig::DateRange { meta, options } => {
                let opt = current_date_range_option(options, user_group_value, selected_parent_ids)
                    .ok_or_else(|| disabled_source(meta))?;
                let (selected_start, selected_end) = if raw.is_absent() {
                    (opt.default_start, opt.default_end)
                } else {
                    let (s, e) = raw
                        .as_pair()
                        .ok_or_else(|| invalid(meta, raw, "expected a pair of dates"))?;
                    let start = NaiveDate::parse_from_str(&s, &opt.date_format)
                        .map_err(|_| invalid(meta, raw, format!("start does not match format '{}'", opt.date_format)))?;
                    let end = NaiveDate::parse_from_str(&e, &opt.date_format)
                        .map_err(|_| invalid(meta, raw, format!("end does not match format '{}'", opt.date_format)))?;
                    if start > end {
                        return Err(invalid(meta, raw, "start date is after end date"));
                    }
                    check_date_bounds(meta, raw, start, opt.min_date, opt.max_date)?;
                    check_date_bounds(meta, raw, end, opt.min_date, opt.max_date)?;
                    (start, end)
                };
                Ok(Parameter::DateRange {
                    name: meta.name.clone(),
                    label: meta.label.clone(),
                    description: meta.description.clone(),
                    visible_options: options.clone(),
                    date_format: opt.date_format.clone(),
                    selected_start,
                    selected_end,
                })
            }
            ParameterConfig::Number { meta, options } => {
                let opt = current_number_option(options, user_group_value, selected_parent_ids)
                    .ok_or_else(|| disabled_source(meta))?;
                let selected_value = if raw.is_absent() {
                    opt.default_value
                } else {
                    let text = raw.as_scalar().ok_or_else(|| invalid(meta, raw, "expected a number"))?;
                    let value: Decimal = text
                        .parse()
                        .map_err(|_| invalid(meta, raw, "is not a valid decimal number"))?;
                    check_number_bounds(meta, raw, value, opt.min_value, opt.max_value, opt.increment)?;
                    value
                };
                Ok(Parameter::Number {
                    name: meta.name.clone(),
                    label: meta.label.clone(),
                    description: meta.description.clone(),
                    visible_options: options.clone(),
                    selected_value,
                })
            }
            ParameterConfig::NumberRange { meta, options } => {
                let opt = current_number_range_option(options, user_group_value, selected_parent_ids)
                    .ok_or_else(|| disabled_source(meta))?;
                let (selected_lower, selected_upper) = if raw.is_absent() {
                    (opt.default_lower_value, opt.default_upper_value)
                } else {
                    let (lo, hi) = raw
                        .as_pair()
                        .ok_or_else(|| invalid(meta, raw, "expected a pair of numbers"))?;
                    let lo: Decimal = lo
                        .parse()
                        .map_err(|_| invalid(meta, raw, "lower bound is not a valid decimal number"))?;
                    let hi: Decimal = hi
                        .parse()
                        .map_err(|_| invalid(meta, raw, "upper bound is not a valid decimal number"))?;
                    if lo > hi {
                        return Err(invalid(meta, raw, "lower bound is greater than upper bound"));
                    }
                    check_number_bounds(meta, raw, lo, opt.min_value, opt.max_value, opt.increment)?;
                    check_number_bounds(meta, raw, hi, opt.min_value, opt.max_value, opt.increment)?;
                    (lo, hi)
                };
                Ok(Parameter::NumberRange {
                    name: meta.name.clone(),
                    label: meta.label.clone(),
                    description: meta.description.clone(),
                    visible_options: options.clone(),
                    selected_lower,
                    selected_upper,
                })
            }
            ParameterConfig::Text { meta, options } => {
                let opt = current_text_option(options, user_group_value, selected_parent_ids)
                    .ok_or_else(|| disabled_source(meta))?;
                let selected_text = if raw.is_absent() {
                    opt.default_text.clone()
                } else {
                    let text = raw.as_scalar().ok_or_else(|| invalid(meta, raw, "expected text"))?;
                    if let Some(pattern) = opt.input_type.strptime_pattern() {
                        NaiveDate::parse_from_str(&text, pattern)
                            .map_err(|_| invalid(meta, raw, format!("does not match format '{pattern}'")))?;
                    }
                    text
                };
                Ok(Parameter::Text {
                    name: meta.name.clone(),
                    label: meta.label.clone(),
                    description: meta.description.clone(),
                    selected_text,
                })
            }
        }
    }
}

fn invalid(meta: &ParamMeta, raw: &RawSelection, reason: impl Into<String>) -> ParamsError {
    ParamsError::InvalidSelection {
        parameter: meta.name.clone(),
        raw_value: format!("{raw:?}"),
        reason: reason.into(),
    }
}

/// §4.1: a disabled non-select parameter (no option is currently
/// applicable) has no valid selection to fall back on; this is reported
/// as a configuration error rather than surfaced to the caller, since the
/// resolver (§4.2) turns it into a `Parameter::Disabled` before it ever
/// reaches `with_selection`.
fn disabled_source(meta: &ParamMeta) -> ParamsError {
    ParamsError::ConfigurationError(format!(
        "parameter '{}' has no currently applicable option",
        meta.name
    ))
}

fn visible_select<'a>(
    options: &'a [SelectParameterOption],
    user_group_value: Option<&str>,
    selected_parent_ids: &[String],
) -> Vec<&'a SelectParameterOption> {
    options
        .iter()
        .filter(|o| o.filters.is_valid(user_group_value, selected_parent_ids))
        .collect()
}

fn current_option<'a>(
    options: &'a [DateParameterOption],
    user_group_value: Option<&str>,
    selected_parent_ids: &[String],
) -> Option<&'a DateParameterOption> {
    options
        .iter()
        .find(|o| o.filters.is_valid(user_group_value, selected_parent_ids))
}

fn current_date_range_option<'a>(
    options: &'a [DateRangeParameterOption],
    user_group_value: Option<&str>,
    selected_parent_ids: &[String],
) -> Option<&'a DateRangeParameterOption> {
    options
        .iter()
        .find(|o| o.filters.is_valid(user_group_value, selected_parent_ids))
}

fn current_number_option<'a>(
    options: &'a [NumberParameterOption],
    user_group_value: Option<&str>,
    selected_parent_ids: &[String],
) -> Option<&'a NumberParameterOption> {
    options
        .iter()
        .find(|o| o.filters.is_valid(user_group_value, selected_parent_ids))
}

fn current_number_range_option<'a>(
    options: &'a [NumberRangeParameterOption],
    user_group_value: Option<&str>,
    selected_parent_ids: &[String],
) -> Option<&'a NumberRangeParameterOption> {
    options
        .iter()
        .find(|o| o.filters.is_valid(user_group_value, selected_parent_ids))
}

fn current_text_option<'a>(
    options: &'a [TextParameterOption],
    user_group_value: Option<&str>,
    selected_parent_ids: &[String],
) -> Option<&'a TextParameterOption> {
    options
        .iter()
        .find(|o| o.filters.is_valid(user_group_value, selected_parent_ids))
}

fn check_date_bounds(
    meta: &ParamMeta,
    raw: &RawSelection,
    value: NaiveDate,
    min: Option<NaiveDate>,
    max: Option<NaiveDate>,
) -> Result<(), ParamsError> {
    if let Some(min) = min {
        if value < min {
            return Err(invalid(meta, raw, format!("is before the minimum date {min}")));
        }
    }
    if let Some(max) = max {
        if value > max {
            return Err(invalid(meta, raw, format!("is after the maximum date {max}")));
        }
    }
    Ok(())
}

fn check_number_bounds(
    meta: &ParamMeta,
    raw: &RawSelection,
    value: Decimal,
    min: Decimal,
    max: Decimal,
    increment: Decimal,
) -> Result<(), ParamsError> {
    if value < min || value > max {
        return Err(invalid(meta, raw, format!("is outside the range [{min}, {max}]")));
    }
    if !marten_core::numeric::on_increment_lattice(min, increment, value) {
        return Err(invalid(
            meta,
            raw,
            format!("is not reachable from {min} in steps of {increment}"),
        ));
    }
    Ok(())
}

/// Owning registry of all declared parameter configs (§4.1), indexed by
/// name, with the parent/child adjacency and `trigger_refresh` flags
/// resolved once at load time.
#[derive(Debug, Clone, Default)]
pub struct ParameterConfigSet {
    configs: HashMap<String, ParameterConfig>,
    /// parent name -> ordered child names, for the resolver's work-list.
    children: HashMap<String, Vec<String>>,
    /// Declaration order, preserved for deterministic iteration.
    order: Vec<String>,
}

impl ParameterConfigSet {
    /// §4.1 "Validating the parameter graph": duplicate names, unknown
    /// parents, non-select parents, and multi-select parents of
    /// non-select children are all configuration errors.
    pub fn build(mut configs: Vec<ParameterConfig>) -> Result<Self, ParamsError> {
        let mut order = Vec::with_capacity(configs.len());
        let mut seen = std::collections::HashSet::new();
        for c in &configs {
            if !seen.insert(c.name().to_string()) {
                return Err(ParamsError::ConfigurationError(format!(
                    "duplicate parameter name: {}",
                    c.name()
                )));
            }
            order.push(c.name().to_string());
        }

        let mut children: HashMap<String, Vec<String>> = HashMap::new();
        let mut trigger_names: std::collections::HashSet<String> = std::collections::HashSet::new();

        for c in &configs {
            let Some(parent_name) = c.meta().parent_name.clone() else {
                continue;
            };
            let parent = configs
                .iter()
                .find(|p| p.name() == parent_name)
                .ok_or_else(|| {
                    ParamsError::ConfigurationError(format!(
                        "parameter '{}' references unknown parent '{parent_name}'",
                        c.name()
                    ))
                })?;
            if !parent.is_select() {
                return Err(ParamsError::ConfigurationError(format!(
                    "parent '{parent_name}' of '{}' is not a selection parameter",
                    c.name()
                )));
            }
            if !c.is_select() && matches!(parent, ParameterConfig::MultiSelect { .. }) {
                return Err(ParamsError::ConfigurationError(format!(
                    "only single-select parents may parent non-select children ('{}' under '{parent_name}')",
                    c.name()
                )));
            }
            children.entry(parent_name.clone()).or_default().push(c.name().to_string());
            trigger_names.insert(parent_name);
        }

        check_acyclic(&configs)?;
        for c in &configs {
            if !c.is_select() {
                check_no_option_collision(c)?;
            }
        }

        for c in &mut configs {
            if trigger_names.contains(c.name()) {
                c.set_trigger_refresh(true);
            }
        }

        let configs = configs.into_iter().map(|c| (c.name().to_string(), c)).collect();
        Ok(ParameterConfigSet {
            configs,
            children,
            order,
        })
    }

    pub fn get(&self, name: &str) -> Option<&ParameterConfig> {
        self.configs.get(name)
    }

    pub fn children_of(&self, name: &str) -> &[String] {
        self.children.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Root parameters, in declaration order (§4.2: the resolver's
    /// initial work-list).
    pub fn roots(&self) -> Vec<&str> {
        self.order
            .iter()
            .filter(|name| {
                self.configs
                    .get(name.as_str())
                    .and_then(|c| c.meta().parent_name.as_ref())
                    .is_none()
            })
            .map(String::as_str)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.configs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.configs.is_empty()
    }
}

fn check_acyclic(configs: &[ParameterConfig]) -> Result<(), ParamsError> {
    for c in configs {
        let mut current = c.meta().parent_name.clone();
        let mut hops = 0usize;
        while let Some(name) = current {
            hops += 1;
            if hops > configs.len() {
                return Err(ParamsError::ConfigurationError(format!(
                    "cycle detected in parameter parent graph at '{}'",
                    c.name()
                )));
            }
            current = configs
                .iter()
                .find(|p| p.name() == name)
                .and_then(|p| p.meta().parent_name.clone());
        }
    }
    Ok(())
}

/// §4.1: a non-select child's options must not have overlapping filters,
/// since only the first currently-applicable option is ever used — two
/// options that could both apply at once make that choice ambiguous.
fn check_no_option_collision(config: &ParameterConfig) -> Result<(), ParamsError> {
    let filters: Vec<&crate::option::OptionFilters> = match config {
        ParameterConfig::Date { options, .. } => options.iter().map(|o| &o.filters).collect(),
        ParameterConfig::DateRange { options, .. } => options.iter().map(|o| &o.filters).collect(),
        ParameterConfig::Number { options, .. } => options.iter().map(|o| &o.filters).collect(),
        ParameterConfig::NumberRange { options, .. } => options.iter().map(|o| &o.filters).collect(),
        ParameterConfig::Text { options, .. } => options.iter().map(|o| &o.filters).collect(),
        _ => return Ok(()),
    };
    for i in 0..filters.len() {
        for j in (i + 1)..filters.len() {
            if filters_could_collide(filters[i], filters[j]) {
                return Err(ParamsError::ConfigurationError(format!(
                    "parameter '{}' has two options whose filters could both apply at once",
                    config.name()
                )));
            }
        }
    }
    Ok(())
}

fn filters_could_collide(a: &crate::option::OptionFilters, b: &crate::option::OptionFilters) -> bool {
    let groups_overlap = a.user_groups.is_empty()
        || b.user_groups.is_empty()
        || a.user_groups.iter().any(|g| b.user_groups.contains(g));
    let parents_overlap = a.parent_option_ids.is_empty()
        || b.parent_option_ids.is_empty()
        || a.parent_option_ids.iter().any(|p| b.parent_option_ids.contains(p));
    groups_overlap && parents_overlap
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn meta(name: &str, parent: Option<&str>) -> ParamMeta {
        ParamMeta {
            name: name.to_string(),
            label: name.to_string(),
            description: String::new(),
            user_attribute: None,
            parent_name: parent.map(str::to_string),
        }
    }

    fn select_option(id: &str, is_default: bool) -> SelectParameterOption {
        SelectParameterOption {
            id: id.to_string(),
            label: id.to_string(),
            is_default,
            custom_fields: Default::default(),
            filters: Default::default(),
        }
    }

    #[test]
    fn single_select_defaults_to_the_flagged_default_option() {
        let cfg = ParameterConfig::SingleSelect {
            meta: meta("region", None),
            options: vec![select_option("us", false), select_option("eu", true)],
            trigger_refresh: false,
        };
        let resolved = cfg.with_selection(&RawSelection::Absent, None, &[]).unwrap();
        match resolved {
            Parameter::SingleSelect { selected_id, .. } => {
                assert_eq!(selected_id, Some("eu".to_string()))
            }
            _ => panic!("expected single select"),
        }
    }

    #[test]
    fn single_select_rejects_id_outside_visible_set() {
        let cfg = ParameterConfig::SingleSelect {
            meta: meta("region", None),
            options: vec![select_option("us", true)],
            trigger_refresh: false,
        };
        let err = cfg
            .with_selection(&RawSelection::Str("fr".into()), None, &[])
            .unwrap_err();
        assert!(matches!(err, ParamsError::InvalidSelection { .. }));
    }

    #[test]
    fn number_rejects_off_lattice_value() {
        let cfg = ParameterConfig::Number {
            meta: meta("page_size", None),
            options: vec![NumberParameterOption {
                min_value: dec!(0),
                max_value: dec!(100),
                increment: dec!(10),
                default_value: dec!(10),
                filters: Default::default(),
            }],
        };
        assert!(cfg
            .with_selection(&RawSelection::Str("25".into()), None, &[])
            .is_err());
        assert!(cfg
            .with_selection(&RawSelection::Str("30".into()), None, &[])
            .is_ok());
    }

    #[test]
    fn build_flags_trigger_refresh_on_parents() {
        let parent = ParameterConfig::SingleSelect {
            meta: meta("region", None),
            options: vec![select_option("us", true)],
            trigger_refresh: false,
        };
        let child = ParameterConfig::SingleSelect {
            meta: meta("city", Some("region")),
            options: vec![select_option("nyc", true)],
            trigger_refresh: false,
        };
        let set = ParameterConfigSet::build(vec![parent, child]).unwrap();
        match set.get("region").unwrap() {
            ParameterConfig::SingleSelect { trigger_refresh, .. } => assert!(*trigger_refresh),
            _ => panic!(),
        }
        assert_eq!(set.children_of("region"), &["city".to_string()]);
    }

    #[test]
    fn build_rejects_multi_select_parent_of_non_select_child() {
        let parent = ParameterConfig::MultiSelect {
            meta: meta("regions", None),
            options: vec![select_option("us", true)],
            trigger_refresh: false,
            show_select_all: false,
            order_matters: false,
            none_is_all: false,
        };
        let child = ParameterConfig::Number {
            meta: meta("limit", Some("regions")),
            options: vec![NumberParameterOption {
                min_value: dec!(0),
                max_value: dec!(10),
                increment: dec!(1),
                default_value: dec!(1),
                filters: Default::default(),
            }],
        };
        assert!(ParameterConfigSet::build(vec![parent, child]).is_err());
    }

    #[test]
    fn build_rejects_duplicate_names() {
        let a = ParameterConfig::SingleSelect {
            meta: meta("region", None),
            options: vec![select_option("us", true)],
            trigger_refresh: false,
        };
        let b = a.clone();
        assert!(ParameterConfigSet::build(vec![a, b]).is_err());
    }
}
