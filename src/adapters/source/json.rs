//! JSON container reader
//!
//! Reads files of the form
//! `[{"name": "1ABC", "categories": {"entry": {"attributes": ["id"], "rows": [["1ABC"]]}}}]`.
//! Non-string cells are rendered as text; JSON null becomes `?`.

use super::SourceParser;
use crate::domain::{Category, CifdbError, Result, ResultExt, SourceContainer, MISSING_VALUE};
use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Deserialize)]
struct RawContainer {
    name: String,
    /// File order is kept (`preserve_order`)
    #[serde(default)]
    categories: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct RawCategory {
    attributes: Vec<String>,
    #[serde(default)]
    rows: Vec<Vec<Value>>,
}

fn cell(value: Value) -> String {
    match value {
        Value::Null => MISSING_VALUE.to_string(),
        Value::String(s) => s,
        other => other.to_string(),
    }
}

/// Parses JSON text into containers
pub fn parse_json_str(text: &str) -> Result<Vec<SourceContainer>> {
    let raw: Vec<RawContainer> = serde_json::from_str(text)
        .map_err(|e| CifdbError::Parse(format!("Invalid container JSON: {e}")))?;

    raw.into_iter()
        .map(|container| {
            let mut parsed = SourceContainer::new(container.name.clone());
            for (name, value) in container.categories {
                let category: RawCategory = serde_json::from_value(value).map_err(|e| {
                    CifdbError::Parse(format!(
                        "Invalid category '{name}' in '{}': {e}",
                        container.name
                    ))
                })?;
                let width = category.attributes.len();
                if let Some(row) = category.rows.iter().find(|r| r.len() != width) {
                    return Err(CifdbError::Parse(format!(
                        "Category '{name}' in '{}' has a row of {} values for {width} attributes",
                        container.name,
                        row.len()
                    )));
                }
                let rows = category
                    .rows
                    .into_iter()
                    .map(|row| row.into_iter().map(cell).collect())
                    .collect();
                parsed.append(Category::with_rows(name, category.attributes, rows));
            }
            Ok(parsed)
        })
        .collect()
}

/// Reads JSON container files from the local filesystem
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonContainerReader;

impl JsonContainerReader {
    pub fn new() -> Self {
        Self
    }
}

impl SourceParser for JsonContainerReader {
    fn parse(&self, locator: &str) -> Result<Vec<SourceContainer>> {
        let text = std::fs::read_to_string(locator)
            .with_context(|| format!("Failed to read {locator}"))?;
        parse_json_str(&text).with_context(|| format!("Failed to parse {locator}"))
    }
}
