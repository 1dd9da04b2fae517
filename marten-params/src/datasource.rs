//! DataSource-backed parameter configs (§4.1 "DataSource conversion"): a
//! config whose `all_options` come from a query result rather than a
//! static manifest list. Conversion groups rows by `id_col`, aggregates
//! widget-specific columns, and sorts by `order_by_col` (falling back to
//! `id_col`).

use std::collections::BTreeMap;

use chrono::NaiveDate;
use marten_core::capability::{CellValue, TableResult};
use rust_decimal::Decimal;

use crate::config::{ParamMeta, ParameterConfig};
use crate::error::ParamsError;
use crate::option::{
    DateParameterOption, DateRangeParameterOption, InputType, NumberParameterOption,
    NumberRangeParameterOption, OptionFilters, SelectParameterOption, TextParameterOption,
};

/// Which columns of the backing query carry which role (§4.1). Optional
/// columns that are absent from the result set are treated as "no
/// restriction" / "use the declared default" for every row.
#[derive(Debug, Clone, Default)]
pub struct DataSourceColumns {
    pub id_col: String,
    pub label_col: Option<String>,
    pub order_by_col: Option<String>,
    pub is_default_col: Option<String>,
    pub custom_fields_cols: Vec<String>,
    pub user_group_col: Option<String>,
    pub parent_id_col: Option<String>,
    pub min_col: Option<String>,
    pub max_col: Option<String>,
    pub increment_col: Option<String>,
    pub default_col: Option<String>,
    pub default_end_col: Option<String>,
    pub date_format: String,
}

#[derive(Debug, Clone, Copy)]
pub enum DataSourceWidget {
    SingleSelect,
    MultiSelect { show_select_all: bool, order_matters: bool, none_is_all: bool },
    Date,
    DateRange,
    Number,
    NumberRange,
    Text(InputType),
}

/// A minimal column-name -> value accessor over one row of a column-major
/// [`TableResult`], since every conversion below reads several named
/// columns per row.
struct Row<'a> {
    index: &'a BTreeMap<&'a str, usize>,
    table: &'a TableResult,
    row_idx: usize,
}

impl<'a> Row<'a> {
    fn cell(&self, col: &str) -> Option<&'a CellValue> {
        let col_idx = *self.index.get(col)?;
        self.table.column_values.get(col_idx)?.get(self.row_idx)
    }

    fn string(&self, col: &str) -> Option<String> {
        match self.cell(col)? {
            CellValue::Text(s) => Some(s.clone()),
            CellValue::Int(i) => Some(i.to_string()),
            CellValue::Float(f) => Some(f.to_string()),
            CellValue::Decimal(d) => Some(d.to_string()),
            CellValue::Bool(b) => Some(b.to_string()),
            CellValue::Date(d) => Some(d.format("%Y-%m-%d").to_string()),
            CellValue::Null => None,
        }
    }

    fn bool(&self, col: &str) -> bool {
        matches!(self.cell(col), Some(CellValue::Bool(true)))
    }

    fn decimal(&self, col: &str) -> Option<Decimal> {
        match self.cell(col)? {
            CellValue::Decimal(d) => Some(*d),
            CellValue::Int(i) => Some(Decimal::from(*i)),
            CellValue::Float(f) => Decimal::try_from(*f).ok(),
            CellValue::Text(s) => s.parse().ok(),
            _ => None,
        }
    }

    fn date(&self, col: &str, format: &str) -> Option<NaiveDate> {
        let text = self.string(col)?;
        NaiveDate::parse_from_str(&text, format).ok()
    }
}

fn build_index<'a>(table: &'a TableResult) -> BTreeMap<&'a str, usize> {
    table
        .columns
        .iter()
        .enumerate()
        .map(|(i, c)| (c.name.as_str(), i))
        .collect()
}

fn missing_column(name: &str, col: &str) -> ParamsError {
    ParamsError::ConfigurationError(format!(
        "datasource parameter '{name}' is missing required column '{col}'"
    ))
}

/// §4.1: convert a query result into a concrete [`ParameterConfig`].
pub fn convert(
    meta: ParamMeta,
    widget: DataSourceWidget,
    columns: &DataSourceColumns,
    table: &TableResult,
) -> Result<ParameterConfig, ParamsError> {
    let index = build_index(table);
    if !index.contains_key(columns.id_col.as_str()) {
        return Err(missing_column(&meta.name, &columns.id_col));
    }

    let rows: Vec<Row<'_>> = (0..table.num_rows())
        .map(|row_idx| Row { index: &index, table, row_idx })
        .collect();

    match widget {
        DataSourceWidget::SingleSelect => Ok(ParameterConfig::SingleSelect {
            meta,
            options: group_into_select_options(columns, &rows)?,
            trigger_refresh: false,
        }),
        DataSourceWidget::MultiSelect { show_select_all, order_matters, none_is_all } => {
            Ok(ParameterConfig::MultiSelect {
                meta,
                options: group_into_select_options(columns, &rows)?,
                trigger_refresh: false,
                show_select_all,
                order_matters,
                none_is_all,
            })
        }
        DataSourceWidget::Date => {
            let options = rows
                .iter()
                .map(|row| {
                    Ok(DateParameterOption {
                        default_date: row
                            .date(columns.default_col.as_deref().unwrap_or(&columns.id_col), &columns.date_format)
                            .ok_or_else(|| missing_column(&meta.name, "default date"))?,
                        min_date: columns.min_col.as_deref().and_then(|c| row.date(c, &columns.date_format)),
                        max_date: columns.max_col.as_deref().and_then(|c| row.date(c, &columns.date_format)),
                        date_format: columns.date_format.clone(),
                        filters: row_filters(columns, row),
                    })
                })
                .collect::<Result<Vec<_>, ParamsError>>()?;
            Ok(ParameterConfig::Date { meta, options })
        }
        DataSourceWidget::DateRange => {
            let end_col = columns.default_end_col.as_deref().unwrap_or(&columns.id_col);
            let options = rows
                .iter()
                .map(|row| {
                    Ok(DateRangeParameterOption {
                        default_start: row
                            .date(columns.default_col.as_deref().unwrap_or(&columns.id_col), &columns.date_format)
                            .ok_or_else(|| missing_column(&meta.name, "default start date"))?,
                        default_end: row
                            .date(end_col, &columns.date_format)
                            .ok_or_else(|| missing_column(&meta.name, "default end date"))?,
                        min_date: columns.min_col.as_deref().and_then(|c| row.date(c, &columns.date_format)),
                        max_date: columns.max_col.as_deref().and_then(|c| row.date(c, &columns.date_format)),
                        date_format: columns.date_format.clone(),
                        filters: row_filters(columns, row),
                    })
                })
                .collect::<Result<Vec<_>, ParamsError>>()?;
            Ok(ParameterConfig::DateRange { meta, options })
        }
        DataSourceWidget::Number => {
            let options = rows
                .iter()
                .map(|row| {
                    Ok(NumberParameterOption {
                        min_value: columns.min_col.as_deref().and_then(|c| row.decimal(c)).unwrap_or(Decimal::ZERO),
                        max_value: columns.max_col.as_deref().and_then(|c| row.decimal(c)).unwrap_or(Decimal::ZERO),
                        increment: columns.increment_col.as_deref().and_then(|c| row.decimal(c)).unwrap_or(Decimal::ONE),
                        default_value: columns
                            .default_col
                            .as_deref()
                            .and_then(|c| row.decimal(c))
                            .ok_or_else(|| missing_column(&meta.name, "default value"))?,
                        filters: row_filters(columns, row),
                    })
                })
                .collect::<Result<Vec<_>, ParamsError>>()?;
            Ok(ParameterConfig::Number { meta, options })
        }
        DataSourceWidget::NumberRange => {
            let options = rows
                .iter()
                .map(|row| {
                    Ok(NumberRangeParameterOption {
                        min_value: columns.min_col.as_deref().and_then(|c| row.decimal(c)).unwrap_or(Decimal::ZERO),
                        max_value: columns.max_col.as_deref().and_then(|c| row.decimal(c)).unwrap_or(Decimal::ZERO),
                        increment: columns.increment_col.as_deref().and_then(|c| row.decimal(c)).unwrap_or(Decimal::ONE),
                        default_lower_value: columns
                            .default_col
                            .as_deref()
                            .and_then(|c| row.decimal(c))
                            .ok_or_else(|| missing_column(&meta.name, "default lower value"))?,
                        default_upper_value: columns
                            .default_end_col
                            .as_deref()
                            .and_then(|c| row.decimal(c))
                            .ok_or_else(|| missing_column(&meta.name, "default upper value"))?,
                        filters: row_filters(columns, row),
                    })
                })
                .collect::<Result<Vec<_>, ParamsError>>()?;
            Ok(ParameterConfig::NumberRange { meta, options })
        }
        DataSourceWidget::Text(input_type) => {
            let options = rows
                .iter()
                .map(|row| TextParameterOption {
                    default_text: columns
                        .default_col
                        .as_deref()
                        .and_then(|c| row.string(c))
                        .unwrap_or_default(),
                    input_type,
                    filters: row_filters(columns, row),
                })
                .collect();
            Ok(ParameterConfig::Text { meta, options })
        }
    }
}

fn row_filters(columns: &DataSourceColumns, row: &Row) -> OptionFilters {
    OptionFilters {
        user_groups: columns
            .user_group_col
            .as_deref()
            .and_then(|c| row.string(c))
            .map(|v| vec![v])
            .unwrap_or_default(),
        parent_option_ids: columns
            .parent_id_col
            .as_deref()
            .and_then(|c| row.string(c))
            .map(|v| vec![v])
            .unwrap_or_default(),
    }
}

/// Groups rows sharing an `id_col` value into a single option, merging
/// their `user_group_col`/`parent_id_col` values into that option's
/// filter lists, then sorts by `order_by_col` (or `id_col`).
fn group_into_select_options(
    columns: &DataSourceColumns,
    rows: &[Row<'_>],
) -> Result<Vec<SelectParameterOption>, ParamsError> {
    struct Group {
        label: String,
        is_default: bool,
        custom_fields: serde_json::Map<String, serde_json::Value>,
        user_groups: Vec<String>,
        parent_option_ids: Vec<String>,
        order_key: String,
    }

    let mut groups: BTreeMap<String, Group> = BTreeMap::new();
    let mut first_seen_order: Vec<String> = Vec::new();

    for row in rows {
        let id = row
            .string(&columns.id_col)
            .ok_or_else(|| missing_column("datasource", &columns.id_col))?;
        let group = groups.entry(id.clone()).or_insert_with(|| {
            first_seen_order.push(id.clone());
            Group {
                label: columns
                    .label_col
                    .as_deref()
                    .and_then(|c| row.string(c))
                    .unwrap_or_else(|| id.clone()),
                is_default: false,
                custom_fields: Default::default(),
                user_groups: Vec::new(),
                parent_option_ids: Vec::new(),
                order_key: columns
                    .order_by_col
                    .as_deref()
                    .and_then(|c| row.string(c))
                    .unwrap_or_else(|| id.clone()),
            }
        });
        if columns.is_default_col.as_deref().map(|c| row.bool(c)).unwrap_or(false) {
            group.is_default = true;
        }
        for field in &columns.custom_fields_cols {
            if let Some(v) = row.string(field) {
                group.custom_fields.insert(field.clone(), serde_json::Value::String(v));
            }
        }
        if let Some(c) = &columns.user_group_col {
            if let Some(v) = row.string(c) {
                if !group.user_groups.contains(&v) {
                    group.user_groups.push(v);
                }
            }
        }
        if let Some(c) = &columns.parent_id_col {
            if let Some(v) = row.string(c) {
                if !group.parent_option_ids.contains(&v) {
                    group.parent_option_ids.push(v);
                }
            }
        }
    }

    let mut ordered: Vec<(String, SelectParameterOption)> = first_seen_order
        .into_iter()
        .map(|id| {
            let g = groups.remove(&id).expect("group inserted above");
            let option = SelectParameterOption {
                id,
                label: g.label,
                is_default: g.is_default,
                custom_fields: g.custom_fields,
                filters: OptionFilters {
                    user_groups: g.user_groups,
                    parent_option_ids: g.parent_option_ids,
                },
            };
            (g.order_key, option)
        })
        .collect();

    ordered.sort_by(|(ka, _), (kb, _)| ka.cmp(kb));
    Ok(ordered.into_iter().map(|(_, option)| option).collect())
}
