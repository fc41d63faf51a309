//! Category mapper
//!
//! Projects source categories onto schema tables. Tables with no mapped category
//! get a single placeholder row, single-category tables keep source row order, and
//! multi-category tables join rows by merge key with the later category winning on
//! conflicting attributes.

use crate::core::mapping::computed::apply_computed_attributes;
use crate::core::mapping::convert::{convert_value, FilterFlags};
use crate::core::mapping::derived::apply_derived_categories;
use crate::domain::{Category, ContainerMetadata, MappedRow, SourceContainer, TableRowMap};
use crate::schema::{SchemaCatalog, SchemaTable};
use serde_json::Value;
use std::collections::HashMap;

/// Merge key: one component per merge-index attribute, `None` if the column is absent
type MergeKey = Vec<Option<String>>;

/// Include/exclude restriction on the set of mapped tables
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableSelection {
    include: Option<Vec<String>>,
    exclude: Vec<String>,
}

impl TableSelection {
    pub fn all() -> Self {
        Self::default()
    }

    /// Restricts candidate tables to `include`; `None` or an empty list means all
    pub fn set_include_list(&mut self, include: Option<Vec<String>>) {
        self.include = include.filter(|list| !list.is_empty());
    }

    /// Tables always removed, even when also included
    pub fn set_exclude_list(&mut self, exclude: Vec<String>) {
        self.exclude = exclude;
    }

    /// Resolves the selection against the catalog, in catalog order
    ///
    /// Undefined table ids are skipped.
    pub fn resolve<'c>(&self, catalog: &'c SchemaCatalog) -> Vec<&'c str> {
        if let Some(include) = &self.include {
            for id in include.iter().filter(|id| !catalog.has_schema_object(id)) {
                tracing::debug!(table_id = %id, "Included table is not defined in the schema");
            }
        }

        catalog
            .schema_id_list()
            .into_iter()
            .filter(|id| match &self.include {
                Some(include) => include.iter().any(|i| i == id),
                None => true,
            })
            .filter(|id| !self.exclude.iter().any(|e| e == id))
            .collect()
    }
}

/// Maps source containers onto schema tables
#[derive(Debug, Clone, Copy)]
pub struct CategoryMapper<'a> {
    catalog: &'a SchemaCatalog,
    flags: FilterFlags,
}

impl<'a> CategoryMapper<'a> {
    pub fn new(catalog: &'a SchemaCatalog, flags: FilterFlags) -> Self {
        Self { catalog, flags }
    }

    pub fn flags(&self) -> FilterFlags {
        self.flags
    }

    /// Maps one container onto every table in `table_ids`
    ///
    /// Derived categories are built on a copy of the container first. Every
    /// requested table gets an entry, possibly empty.
    pub fn map_container(
        &self,
        container: &SourceContainer,
        metadata: &ContainerMetadata,
        table_ids: &[&str],
    ) -> TableRowMap {
        let enriched = apply_derived_categories(container, self.catalog.derived_categories());
        let mut mapped = TableRowMap::new();

        for table_id in table_ids {
            let Some(table) = self.catalog.schema_object(table_id) else {
                tracing::debug!(table_id, "Skipping undefined table");
                continue;
            };
            let rows = self.map_table(table, &enriched, metadata);
            mapped.append(&table.id, rows);
        }
        mapped
    }

    /// Produces the mapped rows of one table for one container
    pub fn map_table(
        &self,
        table: &SchemaTable,
        container: &SourceContainer,
        metadata: &ContainerMetadata,
    ) -> Vec<MappedRow> {
        let template = row_template(table);
        let categories = table.map_instance_category_list();

        let mut rows = match categories.as_slice() {
            [] => vec![template],
            [category] => match container.get_obj(category) {
                Some(category) => (0..category.row_count())
                    .map(|row| {
                        let mut mapped = template.clone();
                        self.project_row(table, category, row, &mut mapped);
                        mapped
                    })
                    .collect(),
                None => Vec::new(),
            },
            _ => self.merge_categories(table, container, &categories, &template),
        };

        apply_computed_attributes(table, &mut rows, container, metadata, self.flags);

        if self.flags.drop_empty_attributes {
            for row in &mut rows {
                row.retain(|_, value| !value.is_null());
            }
        }
        rows
    }

    fn merge_categories(
        &self,
        table: &SchemaTable,
        container: &SourceContainer,
        categories: &[&str],
        template: &MappedRow,
    ) -> Vec<MappedRow> {
        let mut positions: HashMap<MergeKey, usize> = HashMap::new();
        let mut merged: Vec<MappedRow> = Vec::new();

        for category_name in categories {
            let Some(category) = container.get_obj(category_name) else {
                continue;
            };
            let merge_index = table.map_merge_index_attributes(category_name);
            for attribute in merge_index.iter().filter(|a| !category.has_attribute(a)) {
                tracing::warn!(
                    container = container.name(),
                    table_id = %table.id,
                    category = category_name,
                    attribute = %attribute,
                    "Merge-key attribute missing, treating component as null"
                );
            }

            for row in 0..category.row_count() {
                let key: MergeKey = merge_index
                    .iter()
                    .map(|attribute| category.value(attribute, row).map(str::to_string))
                    .collect();

                let position = *positions.entry(key).or_insert_with(|| {
                    merged.push(template.clone());
                    merged.len() - 1
                });
                self.project_row(table, category, row, &mut merged[position]);
            }
        }
        merged
    }

    /// Writes the converted values of one source row into `mapped`
    fn project_row(&self, table: &SchemaTable, category: &Category, row: usize, mapped: &mut MappedRow) {
        for (source_attribute, attribute_id) in table.map_category_attributes(category.name()) {
            let Some(attribute) = table.attribute(attribute_id) else {
                continue;
            };
            let value = match category.value(source_attribute, row) {
                Some(raw) => convert_value(&table.id, attribute, raw, self.flags),
                None => Value::Null,
            };
            mapped.insert(attribute_id.to_string(), value);
        }
    }
}

/// Row with every non-computed attribute set to null, in schema order
fn row_template(table: &SchemaTable) -> MappedRow {
    table
        .attributes()
        .iter()
        .filter(|a| a.method.is_none())
        .map(|a| (a.id.clone(), Value::Null))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{AttributeDef, AttributeSource, MethodRef};
    use serde_json::json;

    fn attr(id: &str, order: u32, source: Option<(&str, &str)>, method: Option<&str>) -> AttributeDef {
        AttributeDef {
            id: id.to_string(),
            name: id.to_lowercase(),
            app_type: Default::default(),
            order,
            nullable: true,
            primary_key: false,
            enumeration: Vec::new(),
            iterable_delimiter: None,
            source: source.map(|(c, a)| AttributeSource {
                category: c.to_string(),
                attribute: a.to_string(),
            }),
            method: method.map(|m| MethodRef {
                name: m.to_string(),
                args: Vec::new(),
            }),
        }
    }

    fn category(name: &str, attributes: &[&str], rows: &[&[&str]]) -> Category {
        Category::with_rows(
            name,
            attributes.iter().map(|a| a.to_string()).collect(),
            rows.iter()
                .map(|r| r.iter().map(|v| v.to_string()).collect())
                .collect(),
        )
    }

    fn catalog() -> SchemaCatalog {
        let entity = SchemaTable::new(
            "ENTITY",
            "entity",
            vec![
                attr("ID", 1, Some(("entity", "id")), None),
                attr("TYPE", 2, Some(("entity", "type")), None),
                attr("ROW", 3, None, Some("rowindex()")),
            ],
        )
        .with_category("entity", &[]);

        let poly = SchemaTable::new(
            "ENTITY_POLY",
            "entity_poly",
            vec![
                attr("ENTITY_ID", 1, Some(("entity_poly", "entity_id")), None),
                attr("POLY_TYPE", 2, Some(("entity_poly", "type")), None),
                attr("SEQ", 3, Some(("entity_poly_seq_info", "seq")), None),
            ],
        )
        .with_category("entity_poly", &["entity_id"])
        .with_category("entity_poly_seq_info", &["entity_id"]);

        let info = SchemaTable::new(
            "INFO",
            "info",
            vec![
                attr("BLOCK", 1, None, Some("datablockid()")),
                attr("NOTE", 2, None, None),
            ],
        );

        SchemaCatalog::new("test", vec![entity, poly, info])
            .build(true)
            .unwrap()
    }

    fn container() -> SourceContainer {
        let mut c = SourceContainer::new("1ABC");
        c.append(category(
            "entity",
            &["id", "type", "unmapped"],
            &[&["1", "polymer", "x"], &["2", "non-polymer", "y"]],
        ));
        c.append(category(
            "entity_poly",
            &["entity_id", "type"],
            &[&["1", "polypeptide(L)"], &["3", "polyribonucleotide"]],
        ));
        c.append(category(
            "entity_poly_seq_info",
            &["entity_id", "seq"],
            &[&["3", "ACGU"], &["1", "MKV"], &["4", "GG"]],
        ));
        c
    }

    #[test]
    fn test_single_category_projection() {
        let catalog = catalog();
        let mapper = CategoryMapper::new(&catalog, FilterFlags::default());
        let table = catalog.schema_object("ENTITY").unwrap();

        let rows = mapper.map_table(table, &container(), &ContainerMetadata::default());
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["ID"], json!("1"));
        assert_eq!(rows[1]["TYPE"], json!("non-polymer"));
        assert_eq!(rows[1]["ROW"], json!(2));
        assert!(!rows[0].contains_key("unmapped"));
        assert_eq!(
            rows[0].keys().map(String::as_str).collect::<Vec<_>>(),
            vec!["ID", "TYPE", "ROW"]
        );
    }

    #[test]
    fn test_multi_category_merge() {
        let catalog = catalog();
        let mapper = CategoryMapper::new(&catalog, FilterFlags::default());
        let table = catalog.schema_object("ENTITY_POLY").unwrap();

        let rows = mapper.map_table(table, &container(), &ContainerMetadata::default());
        let ids: Vec<&Value> = rows.iter().map(|r| &r["ENTITY_ID"]).collect();
        assert_eq!(ids, vec![&json!("1"), &json!("3"), &json!("4")]);
        assert_eq!(rows[0]["SEQ"], json!("MKV"));
        assert_eq!(rows[1]["POLY_TYPE"], json!("polyribonucleotide"));
        assert_eq!(rows[1]["SEQ"], json!("ACGU"));
        assert_eq!(rows[2]["POLY_TYPE"], Value::Null);
    }

    #[test]
    fn test_missing_merge_key_is_null_component() {
        let catalog = catalog();
        let mapper = CategoryMapper::new(&catalog, FilterFlags::default());
        let table = catalog.schema_object("ENTITY_POLY").unwrap();

        let mut c = SourceContainer::new("X");
        c.append(category("entity_poly", &["type"], &[&["a"], &["b"]]));
        let rows = mapper.map_table(table, &c, &ContainerMetadata::default());

        // Both rows share the all-null key and merge into one
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["POLY_TYPE"], json!("b"));
    }

    #[test]
    fn test_synthetic_table_placeholder_row() {
        let catalog = catalog();
        let mapper = CategoryMapper::new(&catalog, FilterFlags::default());
        let table = catalog.schema_object("INFO").unwrap();

        let rows = mapper.map_table(table, &container(), &ContainerMetadata::default());
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["BLOCK"], json!("1ABC"));
        assert_eq!(rows[0]["NOTE"], Value::Null);
    }

    #[test]
    fn test_drop_empty_attributes() {
        let catalog = catalog();
        let flags = FilterFlags {
            drop_empty_attributes: true,
            ..Default::default()
        };
        let mapper = CategoryMapper::new(&catalog, flags);
        let table = catalog.schema_object("INFO").unwrap();

        let rows = mapper.map_table(table, &container(), &ContainerMetadata::default());
        assert!(!rows[0].contains_key("NOTE"));
        assert!(rows[0].contains_key("BLOCK"));
    }

    #[test]
    fn test_mapping_is_pure() {
        let catalog = catalog();
        let mapper = CategoryMapper::new(&catalog, FilterFlags::default());
        let tables = catalog.schema_id_list();
        let c = container();
        let metadata = ContainerMetadata::for_locator("/data/1abc.cif");

        let first = mapper.map_container(&c, &metadata, &tables);
        let mut twice = first.clone();
        twice.extend(mapper.map_container(&c, &metadata, &tables));

        for (table_id, rows) in twice.iter() {
            let single = first.rows(table_id).unwrap();
            assert_eq!(rows.len(), single.len() * 2);
            assert_eq!(&rows[..single.len()], single);
            assert_eq!(&rows[single.len()..], single);
        }
    }

    #[test]
    fn test_unknown_method_shapes_as_null_column() {
        let entry = SchemaTable::new(
            "ENTRY",
            "entry",
            vec![
                attr("ID", 1, Some(("entry", "id")), None),
                attr("ODD", 2, None, Some("frobnicate()")),
            ],
        )
        .with_category("entry", &[]);
        let catalog = SchemaCatalog::new("lenient", vec![entry]).build(false).unwrap();

        let mut container = SourceContainer::new("1ABC");
        container.append(category("entry", &["id"], &[&["1ABC"]]));

        let mapper = CategoryMapper::new(&catalog, FilterFlags::default());
        let mapped = mapper.map_container(&container, &ContainerMetadata::default(), &["ENTRY"]);
        let document = crate::core::reshape::Reshaper::new(&catalog)
            .apply_shape(&mapped, crate::core::reshape::Style::RowwiseById);

        assert_eq!(
            Value::Object(document),
            json!({"ENTRY": [{"ID": "1ABC", "ODD": null}]})
        );
    }

    #[test]
    fn test_table_selection() {
        let catalog = catalog();

        let mut selection = TableSelection::all();
        assert_eq!(selection.resolve(&catalog).len(), 3);

        selection.set_include_list(Some(vec![
            "ENTITY".to_string(),
            "INFO".to_string(),
            "UNDEFINED".to_string(),
        ]));
        selection.set_exclude_list(vec!["INFO".to_string()]);
        assert_eq!(selection.resolve(&catalog), vec!["ENTITY"]);
    }
}
