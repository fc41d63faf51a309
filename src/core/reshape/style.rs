//! Output styles
//!
//! | style | shape |
//! |---|---|
//! | `rowwise_by_id` | table id → `[{attribute id: value}]` |
//! | `rowwise_by_name` | table name → `[{attribute name: value}]` |
//! | `rowwise_by_name_with_cardinality` | as `rowwise_by_name`, unit-cardinality tables as one object |
//! | `rowwise_no_name` | table name → `{attributes: [name], data: [[value]]}` |
//! | `columnwise_by_name` | table name → `{attribute name: [value]}` |

use crate::domain::{CifdbError, Document, MappedRow, Result};
use crate::schema::{AttributeDef, SchemaTable};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Serialization shape of output documents
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Style {
    #[default]
    RowwiseById,
    RowwiseByName,
    RowwiseByNameWithCardinality,
    RowwiseNoName,
    ColumnwiseByName,
}

impl Style {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RowwiseById => "rowwise_by_id",
            Self::RowwiseByName => "rowwise_by_name",
            Self::RowwiseByNameWithCardinality => "rowwise_by_name_with_cardinality",
            Self::RowwiseNoName => "rowwise_no_name",
            Self::ColumnwiseByName => "columnwise_by_name",
        }
    }
}

impl FromStr for Style {
    type Err = CifdbError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "rowwise_by_id" => Ok(Self::RowwiseById),
            "rowwise_by_name" => Ok(Self::RowwiseByName),
            "rowwise_by_name_with_cardinality" => Ok(Self::RowwiseByNameWithCardinality),
            "rowwise_no_name" => Ok(Self::RowwiseNoName),
            "columnwise_by_name" => Ok(Self::ColumnwiseByName),
            other => Err(CifdbError::Configuration(format!(
                "Unknown document style '{other}'"
            ))),
        }
    }
}

impl fmt::Display for Style {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Schema attributes present in at least one row, in schema order
fn present_attributes<'t>(table: &'t SchemaTable, rows: &[MappedRow]) -> Vec<&'t AttributeDef> {
    table
        .attributes()
        .iter()
        .filter(|a| rows.iter().any(|row| row.contains_key(&a.id)))
        .collect()
}

/// Re-keys a row in schema order, by id or by name
fn ordered_row(attributes: &[&AttributeDef], row: &MappedRow, by_name: bool) -> Value {
    let mut out = Map::new();
    for attribute in attributes {
        if let Some(value) = row.get(&attribute.id) {
            let key = if by_name { &attribute.name } else { &attribute.id };
            out.insert(key.clone(), value.clone());
        }
    }
    Value::Object(out)
}

/// Writes one table's rows into `document` in the requested style
pub fn shape_table(document: &mut Document, table: &SchemaTable, rows: &[MappedRow], style: Style) {
    let attributes = present_attributes(table, rows);

    let (key, value) = match style {
        Style::RowwiseById => (
            table.id.clone(),
            Value::Array(rows.iter().map(|r| ordered_row(&attributes, r, false)).collect()),
        ),
        Style::RowwiseByName => (
            table.name.clone(),
            Value::Array(rows.iter().map(|r| ordered_row(&attributes, r, true)).collect()),
        ),
        Style::RowwiseByNameWithCardinality => {
            let value = match rows {
                [first, rest @ ..] if table.has_unit_cardinality() => {
                    if !rest.is_empty() {
                        tracing::warn!(
                            table_id = %table.id,
                            rows = rows.len(),
                            "Unit-cardinality table has multiple rows, emitting the first"
                        );
                    }
                    ordered_row(&attributes, first, true)
                }
                _ => Value::Array(rows.iter().map(|r| ordered_row(&attributes, r, true)).collect()),
            };
            (table.name.clone(), value)
        }
        Style::RowwiseNoName => {
            let names: Vec<Value> = attributes
                .iter()
                .map(|a| Value::String(a.name.clone()))
                .collect();
            let data: Vec<Value> = rows
                .iter()
                .map(|row| {
                    Value::Array(
                        attributes
                            .iter()
                            .map(|a| row.get(&a.id).cloned().unwrap_or(Value::Null))
                            .collect(),
                    )
                })
                .collect();
            let mut shaped = Map::new();
            shaped.insert("attributes".to_string(), Value::Array(names));
            shaped.insert("data".to_string(), Value::Array(data));
            (table.name.clone(), Value::Object(shaped))
        }
        Style::ColumnwiseByName => {
            let mut shaped = Map::new();
            for attribute in &attributes {
                let column = rows
                    .iter()
                    .map(|row| row.get(&attribute.id).cloned().unwrap_or(Value::Null))
                    .collect();
                shaped.insert(attribute.name.clone(), Value::Array(column));
            }
            (table.name.clone(), Value::Object(shaped))
        }
    };

    document.insert(key, value);
}
