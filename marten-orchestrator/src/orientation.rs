//! §6 `DatasetResultModel` shaping: orientation and pagination, applied
//! after cache lookup and after any post-SQL (§4.7, §13).

use marten_core::capability::{CellValue, ColumnSchema, TableResult};
use serde::Serialize;
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    Records,
    Rows,
    Columns,
}

impl Default for Orientation {
    fn default() -> Self {
        Orientation::Records
    }
}

#[derive(Debug, Serialize)]
pub struct FieldSchema {
    pub name: String,
    pub r#type: String,
    pub description: Option<String>,
    pub category: marten_core::capability::ColumnCategory,
}

impl From<&ColumnSchema> for FieldSchema {
    fn from(c: &ColumnSchema) -> Self {
        FieldSchema {
            name: c.name.clone(),
            r#type: c.r#type.clone(),
            description: c.description.clone(),
            category: c.category,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DataDetails {
    pub num_rows: usize,
    pub orientation: Orientation,
}

impl Serialize for Orientation {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let s = match self {
            Orientation::Records => "records",
            Orientation::Rows => "rows",
            Orientation::Columns => "columns",
        };
        serializer.serialize_str(s)
    }
}

#[derive(Debug, Serialize)]
pub struct DatasetResultModel {
    pub schema: SchemaModel,
    pub total_num_rows: usize,
    pub data_details: DataDetails,
    pub data: Value,
}

#[derive(Debug, Serialize)]
pub struct SchemaModel {
    pub fields: Vec<FieldSchema>,
}

/// §8 pagination law: `offset`/`limit` select a contiguous slice of rows
/// from `table`, optionally restricted to `select` columns (`x_select`),
/// before `orient` reshapes it.
pub fn paginate_and_orient(
    table: &TableResult,
    total_num_rows: usize,
    offset: usize,
    limit: usize,
    orientation: Orientation,
    select: Option<&[String]>,
) -> DatasetResultModel {
    let column_indices: Vec<usize> = match select {
        Some(names) => names
            .iter()
            .filter_map(|n| table.columns.iter().position(|c| &c.name == n))
            .collect(),
        None => (0..table.columns.len()).collect(),
    };

    let end = (offset + limit).min(table.num_rows());
    let start = offset.min(end);
    let row_range = start..end;
    let num_rows = row_range.len();

    let data = match orientation {
        Orientation::Records => Value::Array(
            row_range
                .clone()
                .map(|row_idx| {
                    let mut obj = Map::new();
                    for &col_idx in &column_indices {
                        obj.insert(
                            table.columns[col_idx].name.clone(),
                            cell_to_json(&table.column_values[col_idx][row_idx]),
                        );
                    }
                    Value::Object(obj)
                })
                .collect(),
        ),
        Orientation::Rows => Value::Array(
            row_range
                .clone()
                .map(|row_idx| {
                    Value::Array(
                        column_indices
                            .iter()
                            .map(|&col_idx| cell_to_json(&table.column_values[col_idx][row_idx]))
                            .collect(),
                    )
                })
                .collect(),
        ),
        Orientation::Columns => {
            let mut obj = Map::new();
            for &col_idx in &column_indices {
                let values: Vec<Value> = row_range
                    .clone()
                    .map(|row_idx| cell_to_json(&table.column_values[col_idx][row_idx]))
                    .collect();
                obj.insert(table.columns[col_idx].name.clone(), Value::Array(values));
            }
            Value::Object(obj)
        }
    };

    let fields = column_indices.iter().map(|&i| FieldSchema::from(&table.columns[i])).collect();

    DatasetResultModel {
        schema: SchemaModel { fields },
        total_num_rows,
        data_details: DataDetails { num_rows, orientation },
        data,
    }
}

fn cell_to_json(cell: &CellValue) -> Value {
    match cell {
        CellValue::Null => Value::Null,
        CellValue::Bool(b) => Value::Bool(*b),
        CellValue::Int(i) => Value::Number((*i).into()),
        CellValue::Float(f) => serde_json::Number::from_f64(*f).map(Value::Number).unwrap_or(Value::Null),
        CellValue::Decimal(d) => Value::String(d.to_string()),
        CellValue::Text(s) => Value::String(s.clone()),
        CellValue::Date(d) => Value::String(d.format("%Y-%m-%d").to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use marten_core::capability::ColumnCategory;

    fn sample_table() -> TableResult {
        TableResult {
            columns: vec![ColumnSchema {
                name: "a".into(),
                r#type: "int".into(),
                description: None,
                category: ColumnCategory::Measure,
            }],
            column_values: vec![vec![CellValue::Int(1), CellValue::Int(2), CellValue::Int(3)]],
        }
    }

    #[test]
    fn pagination_slices_requested_window() {
        let table = sample_table();
        let result = paginate_and_orient(&table, 3, 1, 1, Orientation::Rows, None);
        assert_eq!(result.total_num_rows, 3);
        assert_eq!(result.data_details.num_rows, 1);
        assert_eq!(result.data, serde_json::json!([[2]]));
    }

    #[test]
    fn zero_limit_returns_empty_data_with_nonzero_total() {
        let table = sample_table();
        let result = paginate_and_orient(&table, 3, 0, 0, Orientation::Rows, None);
        assert_eq!(result.total_num_rows, 3);
        assert_eq!(result.data_details.num_rows, 0);
        assert_eq!(result.data, serde_json::json!([]));
    }

    #[test]
    fn orientations_carry_identical_row_content() {
        let table = sample_table();
        let records = paginate_and_orient(&table, 3, 0, 3, Orientation::Records, None);
        let rows = paginate_and_orient(&table, 3, 0, 3, Orientation::Rows, None);
        let columns = paginate_and_orient(&table, 3, 0, 3, Orientation::Columns, None);
        assert_eq!(records.data, serde_json::json!([{"a":1},{"a":2},{"a":3}]));
        assert_eq!(rows.data, serde_json::json!([[1],[2],[3]]));
        assert_eq!(columns.data, serde_json::json!({"a":[1,2,3]}));
    }
}
