//! Slice partitioning of aggregate mapped data
//!
//! A slice splits the table → rows map into one sub-map per distinct slice key. A
//! slice key is the tuple of child-attribute values, in parent-item order, observed
//! in tables that map every parent item of the slice.

use crate::domain::{CifdbError, MappedRow, Result, TableRowMap};
use crate::schema::SchemaCatalog;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;

/// Rows of one slice
#[derive(Debug, Clone, PartialEq)]
pub struct SlicePart {
    /// Child-attribute values identifying the slice, in parent-item order
    pub key: Vec<Value>,
    pub tables: TableRowMap,
}

/// A sliced table contributing more than one row to a unit-cardinality slice
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CardinalityViolation {
    pub table_id: String,
    pub key: Vec<Value>,
    pub rows: usize,
}

/// Data-quality conditions found while slicing
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SliceReport {
    pub slice_name: String,
    pub slices: usize,
    pub cardinality_violations: Vec<CardinalityViolation>,
    /// Rows skipped because a key component was null or absent
    pub null_keys: usize,
}

impl SliceReport {
    pub fn is_clean(&self) -> bool {
        self.cardinality_violations.is_empty() && self.null_keys == 0
    }
}

/// How a mapped table takes part in a slice
enum Role {
    /// Child attribute ids per parent item; `None` where the table lacks that parent
    Sliced(Vec<Option<String>>),
    Extra,
}

/// Partitions `mapped` by the named slice
///
/// # Errors
///
/// Returns [`CifdbError::Configuration`] if the slice is not defined.
pub fn slice_tables(
    catalog: &SchemaCatalog,
    mapped: &TableRowMap,
    slice_name: &str,
) -> Result<(Vec<SlicePart>, SliceReport)> {
    if !catalog.has_slice(slice_name) {
        return Err(CifdbError::Configuration(format!(
            "Undefined slice '{slice_name}'"
        )));
    }
    let parents = catalog.slice_parent_items(slice_name);
    let mut report = SliceReport {
        slice_name: slice_name.to_string(),
        ..Default::default()
    };

    let roles: Vec<(&str, &[MappedRow], Role)> = mapped
        .iter()
        .filter_map(|(table_id, rows)| {
            let table = catalog.schema_object(table_id)?;
            if table.has_slice_attributes(slice_name) {
                let children = parents
                    .iter()
                    .map(|p| {
                        table
                            .slice_attribute_id(slice_name, &p.category, &p.attribute)
                            .map(str::to_string)
                    })
                    .collect();
                Some((table_id, rows, Role::Sliced(children)))
            } else if table.is_slice_extra(slice_name) {
                Some((table_id, rows, Role::Extra))
            } else {
                None
            }
        })
        .collect();

    // Distinct keys in first-seen order
    let mut keys: Vec<Vec<Value>> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    for (table_id, rows, role) in &roles {
        let Role::Sliced(children) = role else {
            continue;
        };
        let Some(children) = children.iter().cloned().collect::<Option<Vec<String>>>() else {
            continue;
        };
        for row in rows.iter() {
            let key: Option<Vec<Value>> = children
                .iter()
                .map(|child| row.get(child).filter(|v| !v.is_null()).cloned())
                .collect();
            let Some(key) = key else {
                report.null_keys += 1;
                tracing::warn!(table_id, slice = slice_name, "Row has a null slice key, skipped");
                continue;
            };
            if seen.insert(Value::Array(key.clone()).to_string()) {
                keys.push(key);
            }
        }
    }

    let mut parts = Vec::with_capacity(keys.len());
    for key in keys {
        let mut tables = TableRowMap::new();
        for (table_id, rows, role) in &roles {
            let selected: Vec<MappedRow> = match role {
                Role::Extra => rows.to_vec(),
                Role::Sliced(children) => rows
                    .iter()
                    .filter(|row| row_matches(row, children, &key))
                    .cloned()
                    .collect(),
            };
            if selected.is_empty() {
                continue;
            }
            if matches!(role, Role::Sliced(_))
                && selected.len() > 1
                && catalog.has_slice_unit_cardinality(table_id, slice_name)
            {
                let shown_key = Value::Array(key.clone());
                tracing::warn!(
                    table_id,
                    slice = slice_name,
                    key = %shown_key,
                    rows = selected.len(),
                    "Unit-cardinality slice table has multiple rows"
                );
                report.cardinality_violations.push(CardinalityViolation {
                    table_id: table_id.to_string(),
                    key: key.clone(),
                    rows: selected.len(),
                });
            }
            tables.append(table_id, selected);
        }
        parts.push(SlicePart { key, tables });
    }

    report.slices = parts.len();
    Ok((parts, report))
}

/// True if every child attribute the table carries equals its key component
fn row_matches(row: &MappedRow, children: &[Option<String>], key: &[Value]) -> bool {
    children
        .iter()
        .zip(key)
        .all(|(child, component)| match child {
            Some(child) => row.get(child) == Some(component),
            None => true,
        })
}
