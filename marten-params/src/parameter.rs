//! `Parameter` (§3): the resolved `(config, currently-visible options,
//! selection)` triple for a single request.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde_json::json;

use crate::option::{DateParameterOption, DateRangeParameterOption, NumberParameterOption, NumberRangeParameterOption, SelectParameterOption};

#[derive(Debug, Clone)]
pub enum Parameter {
    SingleSelect {
        name: String,
        label: String,
        description: String,
        trigger_refresh: bool,
        visible_options: Vec<SelectParameterOption>,
        selected_id: Option<String>,
    },
    MultiSelect {
        name: String,
        label: String,
        description: String,
        trigger_refresh: bool,
        show_select_all: bool,
        order_matters: bool,
        none_is_all: bool,
        visible_options: Vec<SelectParameterOption>,
        selected_ids: Vec<String>,
    },
    Date {
        name: String,
        label: String,
        description: String,
        visible_options: Vec<DateParameterOption>,
        date_format: String,
        selected_date: NaiveDate,
    },
    DateRange {
        name: String,
        label: String,
        description: String,
        visible_options: Vec<DateRangeParameterOption>,
        date_format: String,
        selected_start: NaiveDate,
        selected_end: NaiveDate,
    },
    Number {
        name: String,
        label: String,
        description: String,
        visible_options: Vec<NumberParameterOption>,
        selected_value: Decimal,
    },
    NumberRange {
        name: String,
        label: String,
        description: String,
        visible_options: Vec<NumberRangeParameterOption>,
        selected_lower: Decimal,
        selected_upper: Decimal,
    },
    Text {
        name: String,
        label: String,
        description: String,
        selected_text: String,
    },
    /// §3: "disabled parameters serialize as a distinct 'none' variant".
    Disabled {
        name: String,
        label: String,
        description: String,
    },
}

impl Parameter {
    pub fn name(&self) -> &str {
        match self {
            Parameter::SingleSelect { name, .. }
            | Parameter::MultiSelect { name, .. }
            | Parameter::Date { name, .. }
            | Parameter::DateRange { name, .. }
            | Parameter::Number { name, .. }
            | Parameter::NumberRange { name, .. }
            | Parameter::Text { name, .. }
            | Parameter::Disabled { name, .. } => name,
        }
    }

    /// §3: "A parameter is enabled when its visible-option set is
    /// non-empty (or, for date/number, when a currently-applicable
    /// option exists)".
    pub fn is_enabled(&self) -> bool {
        !matches!(self, Parameter::Disabled { .. })
    }

    /// §4.2: "After resolving a select node, append its visible children"
    /// — only select widgets can trigger a refresh.
    pub fn trigger_refresh(&self) -> bool {
        match self {
            Parameter::SingleSelect { trigger_refresh, .. } => *trigger_refresh,
            Parameter::MultiSelect { trigger_refresh, .. } => *trigger_refresh,
            _ => false,
        }
    }

    /// The ids currently selected for this parameter, used as the
    /// "parent selection" context when resolving its children (§4.2), and
    /// as the selection-tuple source for cache keys (§3, §7).
    pub fn selected_ids_for_children(&self) -> Vec<String> {
        match self {
            Parameter::SingleSelect { selected_id, .. } => {
                selected_id.iter().cloned().collect()
            }
            Parameter::MultiSelect { selected_ids, .. } => selected_ids.clone(),
            _ => Vec::new(),
        }
    }

    /// §6 `ParametersModel` wire shape, one object per parameter.
    /// Disabled parameters serialize with `widget_type: "none"`.
    pub fn to_wire(&self) -> serde_json::Value {
        match self {
            Parameter::SingleSelect {
                name,
                label,
                description,
                trigger_refresh,
                visible_options,
                selected_id,
            } => json!({
                "name": name, "label": label, "description": description,
                "widget_type": "single_select",
                "trigger_refresh": trigger_refresh,
                "options": visible_options.iter().map(select_option_wire).collect::<Vec<_>>(),
                "selected_id": selected_id,
            }),
            Parameter::MultiSelect {
                name,
                label,
                description,
                trigger_refresh,
                show_select_all,
                order_matters,
                none_is_all,
                visible_options,
                selected_ids,
            } => json!({
                "name": name, "label": label, "description": description,
                "widget_type": "multi_select",
                "trigger_refresh": trigger_refresh,
                "show_select_all": show_select_all,
                "order_matters": order_matters,
                "none_is_all": none_is_all,
                "options": visible_options.iter().map(select_option_wire).collect::<Vec<_>>(),
                "selected_ids": selected_ids,
            }),
            Parameter::Date {
                name,
                label,
                description,
                date_format,
                selected_date,
                ..
            } => json!({
                "name": name, "label": label, "description": description,
                "widget_type": "date",
                "format": date_format,
                "selected_date": selected_date.format(date_format).to_string(),
            }),
            Parameter::DateRange {
                name,
                label,
                description,
                date_format,
                selected_start,
                selected_end,
                ..
            } => json!({
                "name": name, "label": label, "description": description,
                "widget_type": "date_range",
                "format": date_format,
                "selected_start": selected_start.format(date_format).to_string(),
                "selected_end": selected_end.format(date_format).to_string(),
            }),
            Parameter::Number {
                name,
                label,
                description,
                selected_value,
                ..
            } => json!({
                "name": name, "label": label, "description": description,
                "widget_type": "number",
                "selected_value": selected_value.to_string(),
            }),
            Parameter::NumberRange {
                name,
                label,
                description,
                selected_lower,
                selected_upper,
                ..
            } => json!({
                "name": name, "label": label, "description": description,
                "widget_type": "number_range",
                "selected_lower": selected_lower.to_string(),
                "selected_upper": selected_upper.to_string(),
            }),
            Parameter::Text {
                name,
                label,
                description,
                selected_text,
            } => json!({
                "name": name, "label": label, "description": description,
                "widget_type": "text",
                "selected_text": selected_text,
            }),
            Parameter::Disabled {
                name,
                label,
                description,
            } => json!({
                "name": name, "label": label, "description": description,
                "widget_type": "none",
            }),
        }
    }
}

fn select_option_wire(o: &SelectParameterOption) -> serde_json::Value {
    json!({
        "id": o.id,
        "label": o.label,
        "custom_fields": o.custom_fields,
    })
}
