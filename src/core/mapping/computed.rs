//! Computed (synthetic) attribute handlers
//!
//! Each handler runs once per table against the full row list.

use crate::core::mapping::convert::{convert_value, FilterFlags};
use crate::domain::{ContainerMetadata, MappedRow, SourceContainer};
use crate::schema::{ComputedAttribute, ComputedMethod, SchemaTable};
use serde_json::Value;

/// Applies every computed attribute of `table` to `rows`
pub fn apply_computed_attributes(
    table: &SchemaTable,
    rows: &mut [MappedRow],
    container: &SourceContainer,
    metadata: &ContainerMetadata,
    flags: FilterFlags,
) {
    for computed in table.computed_attributes() {
        apply(table, computed, rows, container, metadata, flags);
    }
}

fn apply(
    table: &SchemaTable,
    computed: &ComputedAttribute,
    rows: &mut [MappedRow],
    container: &SourceContainer,
    metadata: &ContainerMetadata,
    flags: FilterFlags,
) {
    let attribute_id = computed.attribute_id.as_str();

    let broadcast = match &computed.method {
        ComputedMethod::DatablockId => Value::String(container.name().to_string()),
        ComputedMethod::LoadDateTime => {
            let date = metadata.load_date_or_now();
            match table.attribute(attribute_id) {
                Some(attribute) => convert_value(&table.id, attribute, &date, flags),
                None => Value::String(date),
            }
        }
        ComputedMethod::Locator => Value::String(metadata.locator_or_unknown()),
        ComputedMethod::RowIndex => {
            for (index, row) in rows.iter_mut().enumerate() {
                row.insert(attribute_id.to_string(), Value::from(index + 1));
            }
            return;
        }
        ComputedMethod::Unsupported(name) => {
            tracing::error!(
                table_id = %table.id,
                attribute_id,
                method = %name,
                "Unsupported computed-attribute method, attribute left null"
            );
            Value::Null
        }
    };

    for row in rows.iter_mut() {
        row.insert(attribute_id.to_string(), broadcast.clone());
    }
}
