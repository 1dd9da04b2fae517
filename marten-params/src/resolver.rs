//! `ParameterSet` resolver (§4.2): walks the declared parameter graph
//! breadth-first from the roots, resolving each parameter against its
//! parent's current selection and the caller's raw request values.

use std::collections::{HashMap, VecDeque};

use crate::config::ParameterConfigSet;
use crate::error::ParamsError;
use crate::parameter::Parameter;
use crate::raw::RawSelection;

/// Per-request raw selections, keyed by parameter name. Parameters absent
/// from this map resolve against their defaults (§4.1).
pub type RawSelections = HashMap<String, RawSelection>;

/// The outcome of resolving one request's full parameter graph: every
/// declared parameter, each either a live [`Parameter`] or `None` when it
/// was disabled because its parent selection left no applicable option.
#[derive(Debug, Clone, Default)]
pub struct ParameterSet {
    resolved: HashMap<String, Parameter>,
    order: Vec<String>,
}

impl ParameterSet {
    pub fn get(&self, name: &str) -> Option<&Parameter> {
        self.resolved.get(name)
    }

    /// Parameters in resolution order (roots first, breadth-first by
    /// depth), matching the order the wire model lists them in.
    pub fn iter(&self) -> impl Iterator<Item = &Parameter> {
        self.order.iter().filter_map(move |name| self.resolved.get(name))
    }

    pub fn selected_ids(&self, name: &str) -> Vec<String> {
        self.resolved
            .get(name)
            .map(|p| p.selected_ids_for_children())
            .unwrap_or_default()
    }

    /// Projects this set down to the named parameters, preserving their
    /// relative resolution order. Used when a dataset declares only a
    /// subset of the project's parameters (§4.6 step 3).
    pub fn project(&self, names: &[String]) -> ParameterSet {
        let order: Vec<String> = self.order.iter().filter(|n| names.iter().any(|d| d == *n)).cloned().collect();
        let resolved = order
            .iter()
            .filter_map(|n| self.resolved.get(n).map(|p| (n.clone(), p.clone())))
            .collect();
        ParameterSet { resolved, order }
    }
}

/// §4.2: "Resolve the full parameter graph for one request": a work-list
/// algorithm starting from root parameters, enqueuing a parameter's
/// children only after it resolves, using the parent's currently selected
/// ids as that child's `selected_parent_ids` context.
///
/// Function resolving a user-group value for a parameter's
/// `user_attribute`, kept as a caller-supplied closure so this module
/// stays independent of the concrete `User` type (§4.1 capability
/// boundary).
pub fn resolve_all<F>(
    configs: &ParameterConfigSet,
    raw: &RawSelections,
    resolve_user_attribute: F,
) -> Result<ParameterSet, ParamsError>
where
    F: Fn(Option<&str>) -> Option<String>,
{
    let mut resolved: HashMap<String, Parameter> = HashMap::new();
    let mut order: Vec<String> = Vec::new();
    let mut queue: VecDeque<(String, Vec<String>)> =
        configs.roots().into_iter().map(|name| (name.to_string(), Vec::new())).collect();

    while let Some((name, parent_ids)) = queue.pop_front() {
        let Some(config) = configs.get(&name) else {
            continue;
        };
        let user_group_value =
            resolve_user_attribute(config.meta().user_attribute.as_deref());
        let raw_selection = raw.get(&name).cloned().unwrap_or(RawSelection::Absent);

        let parameter = match config.with_selection(&raw_selection, user_group_value.as_deref(), &parent_ids) {
            Ok(p) => p,
            Err(ParamsError::ConfigurationError(_)) => Parameter::Disabled {
                name: config.name().to_string(),
                label: config.meta().label.clone(),
                description: config.meta().description.clone(),
            },
            Err(other) => return Err(other),
        };

        let children_ids = parameter.selected_ids_for_children();
        order.push(name.clone());
        resolved.insert(name.clone(), parameter);

        for child in configs.children_of(&name) {
            queue.push_back((child.clone(), children_ids.clone()));
        }
    }

    Ok(ParameterSet { resolved, order })
}

/// §6 "updates" mode (`x_parent_param`): re-resolve only the subtree
/// rooted at a single changed parameter, given its already-known new
/// selection. Exactly one top-level selection key is expected by the
/// endpoint contract; callers enforce that before calling this (§4.2,
/// `ParamsError::AmbiguousUpdateSelection`).
pub fn resolve_subtree<F>(
    configs: &ParameterConfigSet,
    changed_param: &str,
    raw: &RawSelections,
    resolve_user_attribute: F,
) -> Result<ParameterSet, ParamsError>
where
    F: Fn(Option<&str>) -> Option<String>,
{
    let config = configs
        .get(changed_param)
        .ok_or_else(|| ParamsError::UnknownParameter(changed_param.to_string()))?;
    let user_group_value = resolve_user_attribute(config.meta().user_attribute.as_deref());
    let raw_selection = raw.get(changed_param).cloned().unwrap_or(RawSelection::Absent);

    // The changed parameter's own parent selection is not re-derived here
    // (it did not change); only the subtree below it is recomputed.
    let parameter = config.with_selection(&raw_selection, user_group_value.as_deref(), &[])?;

    let mut resolved = HashMap::new();
    let mut order = Vec::new();
    let mut queue: VecDeque<(String, Vec<String>)> = configs
        .children_of(changed_param)
        .iter()
        .map(|c| (c.clone(), parameter.selected_ids_for_children()))
        .collect();

    order.push(changed_param.to_string());
    resolved.insert(changed_param.to_string(), parameter);

    while let Some((name, parent_ids)) = queue.pop_front() {
        let Some(config) = configs.get(&name) else {
            continue;
        };
        let user_group_value = resolve_user_attribute(config.meta().user_attribute.as_deref());
        let raw_selection = raw.get(&name).cloned().unwrap_or(RawSelection::Absent);

        let parameter = match config.with_selection(&raw_selection, user_group_value.as_deref(), &parent_ids) {
            Ok(p) => p,
            Err(ParamsError::ConfigurationError(_)) => Parameter::Disabled {
                name: config.name().to_string(),
                label: config.meta().label.clone(),
                description: config.meta().description.clone(),
            },
            Err(other) => return Err(other),
        };

        let children_ids = parameter.selected_ids_for_children();
        order.push(name.clone());
        resolved.insert(name.clone(), parameter);

        for child in configs.children_of(&name) {
            queue.push_back((child.clone(), children_ids.clone()));
        }
    }

    Ok(ParameterSet { resolved, order })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ParamMeta;
    use crate::option::SelectParameterOption;

    fn meta(name: &str, parent: Option<&str>) -> ParamMeta {
        ParamMeta {
            name: name.to_string(),
            label: name.to_string(),
            description: String::new(),
            user_attribute: None,
            parent_name: parent.map(str::to_string),
        }
    }

    fn option(id: &str, is_default: bool, parents: &[&str]) -> SelectParameterOption {
        SelectParameterOption {
            id: id.to_string(),
            label: id.to_string(),
            is_default,
            custom_fields: Default::default(),
            filters: crate::option::OptionFilters {
                user_groups: vec![],
                parent_option_ids: parents.iter().map(|s| s.to_string()).collect(),
            },
        }
    }

    fn region_city_set() -> ParameterConfigSet {
        let region = crate::config::ParameterConfig::SingleSelect {
            meta: meta("region", None),
            options: vec![option("us", true, &[]), option("eu", false, &[])],
            trigger_refresh: false,
        };
        let city = crate::config::ParameterConfig::SingleSelect {
            meta: meta("city", Some("region")),
            options: vec![
                option("nyc", true, &["us"]),
                option("paris", true, &["eu"]),
            ],
            trigger_refresh: false,
        };
        ParameterConfigSet::build(vec![region, city]).unwrap()
    }

    #[test]
    fn resolves_child_against_parent_default_selection() {
        let set = region_city_set();
        let result = resolve_all(&set, &RawSelections::new(), |_| None).unwrap();
        match result.get("city").unwrap() {
            Parameter::SingleSelect { selected_id, visible_options, .. } => {
                assert_eq!(selected_id, &Some("nyc".to_string()));
                assert_eq!(visible_options.len(), 1);
            }
            _ => panic!("expected single select"),
        }
    }

    #[test]
    fn changing_parent_changes_child_visible_set() {
        let set = region_city_set();
        let mut raw = RawSelections::new();
        raw.insert("region".to_string(), RawSelection::Str("eu".into()));
        let result = resolve_all(&set, &raw, |_| None).unwrap();
        match result.get("city").unwrap() {
            Parameter::SingleSelect { selected_id, .. } => {
                assert_eq!(selected_id, &Some("paris".to_string()));
            }
            _ => panic!("expected single select"),
        }
    }

    #[test]
    fn resolve_subtree_only_recomputes_changed_branch() {
        let set = region_city_set();
        let mut raw = RawSelections::new();
        raw.insert("region".to_string(), RawSelection::Str("eu".into()));
        let result = resolve_subtree(&set, "region", &raw, |_| None).unwrap();
        assert!(result.get("region").is_some());
        assert!(result.get("city").is_some());
    }
}
