//! A small sample project: a `region -> city` cascading select, a
//! `min_amount` number parameter, a seed -> federate model chain, and one
//! dataset built on top of it.

use std::collections::HashMap;

use chrono::NaiveDate;
use marten_core::capability::{ColumnCategory, ColumnSchema, TableResult};
use marten_dag::{ModelConfig, ModelRegistry, ModelType, QueryArtifact};
use marten_orchestrator::{DashboardDef, DatasetDef, ProjectDefinition};
use marten_params::{
    DateParameterOption, NumberParameterOption, OptionFilters, ParamMeta, ParameterConfig, ParameterConfigSet,
    SelectParameterOption,
};
use rust_decimal::Decimal;

use crate::engine::column;

pub fn region_option(id: &str, label: &str, is_default: bool) -> SelectParameterOption {
    SelectParameterOption {
        id: id.to_string(),
        label: label.to_string(),
        is_default,
        custom_fields: Default::default(),
        filters: OptionFilters::default(),
    }
}

pub fn city_option(id: &str, label: &str, is_default: bool, parent_region: &str) -> SelectParameterOption {
    SelectParameterOption {
        id: id.to_string(),
        label: label.to_string(),
        is_default,
        custom_fields: Default::default(),
        filters: OptionFilters {
            user_groups: Vec::new(),
            parent_option_ids: vec![parent_region.to_string()],
        },
    }
}

pub fn parameter_configs() -> ParameterConfigSet {
    let region = ParameterConfig::SingleSelect {
        meta: ParamMeta {
            name: "region".into(),
            label: "Region".into(),
            description: "Sales region".into(),
            user_attribute: None,
            parent_name: None,
        },
        options: vec![
            region_option("na", "North America", true),
            region_option("eu", "Europe", false),
        ],
        trigger_refresh: false,
    };

    let city = ParameterConfig::SingleSelect {
        meta: ParamMeta {
            name: "city".into(),
            label: "City".into(),
            description: "City within the selected region".into(),
            user_attribute: None,
            parent_name: Some("region".into()),
        },
        options: vec![
            city_option("nyc", "New York", true, "na"),
            city_option("tor", "Toronto", false, "na"),
            city_option("ber", "Berlin", true, "eu"),
        ],
        trigger_refresh: false,
    };

    let as_of = ParameterConfig::Date {
        meta: ParamMeta {
            name: "as_of".into(),
            label: "As of".into(),
            description: "Reporting date".into(),
            user_attribute: None,
            parent_name: None,
        },
        options: vec![DateParameterOption {
            default_date: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            min_date: Some(NaiveDate::from_ymd_opt(2020, 1, 1).unwrap()),
            max_date: Some(NaiveDate::from_ymd_opt(2030, 12, 31).unwrap()),
            date_format: "%Y-%m-%d".into(),
            filters: OptionFilters::default(),
        }],
    };

    let min_amount = ParameterConfig::Number {
        meta: ParamMeta {
            name: "min_amount".into(),
            label: "Minimum amount".into(),
            description: "Minimum order amount".into(),
            user_attribute: None,
            parent_name: None,
        },
        options: vec![NumberParameterOption {
            min_value: Decimal::new(0, 0),
            max_value: Decimal::new(100_000, 0),
            increment: Decimal::new(50, 0),
            default_value: Decimal::new(0, 0),
            filters: OptionFilters::default(),
        }],
    };

    ParameterConfigSet::build(vec![region, city, as_of, min_amount]).expect("sample project parameters are well-formed")
}

fn orders_seed_table() -> TableResult {
    TableResult {
        columns: vec![
            column("city", "text", ColumnCategory::Dimension),
            column("amount", "int", ColumnCategory::Measure),
        ],
        column_values: vec![
            vec![
                marten_core::capability::CellValue::Text("nyc".into()),
                marten_core::capability::CellValue::Text("tor".into()),
                marten_core::capability::CellValue::Text("ber".into()),
            ],
            vec![
                marten_core::capability::CellValue::Int(120),
                marten_core::capability::CellValue::Int(75),
                marten_core::capability::CellValue::Int(200),
            ],
        ],
    }
}

/// Seed data, registered directly on a fresh engine connection before
/// any model compiles (`ModelType::Seed` is a no-op at execution time).
pub fn seed_relations() -> HashMap<String, TableResult> {
    let mut relations = HashMap::new();
    relations.insert("seed_orders".to_string(), orders_seed_table());
    relations
}

pub fn model_registry() -> ModelRegistry {
    let seed = ModelConfig {
        name: "seed_orders".into(),
        model_type: ModelType::Seed,
        materialize_as_view: false,
        connection_name: None,
        source_table_or_query: None,
        query: None,
        declared_columns: vec![
            column("city", "text", ColumnCategory::Dimension),
            column("amount", "int", ColumnCategory::Measure),
        ],
    };

    let orders_by_city = ModelConfig {
        name: "orders_by_city".into(),
        model_type: ModelType::Federate,
        materialize_as_view: false,
        connection_name: None,
        source_table_or_query: None,
        query: Some(QueryArtifact::Sql("select * from {{ ref('seed_orders') }}".into())),
        declared_columns: vec![
            column("city", "text", ColumnCategory::Dimension),
            column("amount", "int", ColumnCategory::Measure),
        ],
    };

    ModelRegistry::build(vec![seed, orders_by_city]).expect("sample project models are well-formed")
}

pub fn project() -> ProjectDefinition {
    let mut datasets = HashMap::new();
    datasets.insert(
        "orders".to_string(),
        DatasetDef {
            name: "orders".into(),
            target_model: "orders_by_city".into(),
            scope: "sales.read".into(),
            declared_parameters: None,
        },
    );

    let mut dashboards = HashMap::new();
    dashboards.insert(
        "sales-overview".to_string(),
        DashboardDef {
            name: "sales-overview".into(),
            scope: "sales.read".into(),
            dataset_names: vec!["orders".to_string()],
        },
    );

    let mut model_columns = HashMap::new();
    model_columns.insert(
        "orders_by_city".to_string(),
        vec![
            column("city", "text", ColumnCategory::Dimension),
            column("amount", "int", ColumnCategory::Measure),
        ],
    );

    ProjectDefinition {
        name: "sales-demo".into(),
        parameters: parameter_configs(),
        models: model_registry(),
        datasets,
        dashboards,
        configurable_names: vec!["tenant".to_string()],
        model_columns,
    }
}
