//! Schema catalog
//!
//! The catalog is loaded once per run from a JSON document and is read-only after
//! [`SchemaCatalog::prepare`] has validated it.

use crate::domain::context::ResultExt;
use crate::domain::{CifdbError, Result};
use crate::schema::methods::DerivedCategoryDef;
use crate::schema::table::{SchemaTable, SliceAttribute};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

/// One clause of a data selector: every row of `category` must carry one of `values`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectorClause {
    pub category: String,
    pub attribute: String,
    pub values: Vec<String>,
}

/// Parent category/attribute that partitions a named slice
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SliceParent {
    pub category: String,
    pub attribute: String,
}

/// Read-only lookup service over the schema definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaCatalog {
    pub name: String,
    #[serde(default)]
    pub version: Option<String>,
    tables: Vec<SchemaTable>,
    #[serde(default)]
    selectors: BTreeMap<String, Vec<SelectorClause>>,
    #[serde(default)]
    slices: BTreeMap<String, Vec<SliceParent>>,
    #[serde(default)]
    derived_categories: Vec<DerivedCategoryDef>,
}

impl SchemaCatalog {
    /// Starts a catalog in code; finish with [`SchemaCatalog::build`]
    pub fn new(name: impl Into<String>, tables: Vec<SchemaTable>) -> Self {
        Self {
            name: name.into(),
            version: None,
            tables,
            selectors: BTreeMap::new(),
            slices: BTreeMap::new(),
            derived_categories: Vec::new(),
        }
    }

    /// Validates a catalog built in code, as a loaded one would be
    pub fn build(mut self, strict_methods: bool) -> Result<Self> {
        self.prepare(strict_methods)?;
        Ok(self)
    }

    pub fn with_selector(mut self, name: impl Into<String>, clauses: Vec<SelectorClause>) -> Self {
        self.selectors.insert(name.into(), clauses);
        self
    }

    pub fn with_slice(mut self, name: impl Into<String>, parents: Vec<SliceParent>) -> Self {
        self.slices.insert(name.into(), parents);
        self
    }

    pub fn with_derived_category(mut self, derived: DerivedCategoryDef) -> Self {
        self.derived_categories.push(derived);
        self
    }

    /// Parses and validates a catalog from JSON text
    ///
    /// # Errors
    ///
    /// Returns [`CifdbError::Schema`] if the document is malformed or fails validation.
    pub fn from_json_str(json: &str, strict_methods: bool) -> Result<Self> {
        let mut catalog: SchemaCatalog = serde_json::from_str(json)
            .map_err(|e| CifdbError::Schema(format!("Invalid schema catalog: {e}")))?;
        catalog.prepare(strict_methods)?;
        Ok(catalog)
    }

    /// Reads, parses and validates a catalog file
    pub fn from_file(path: impl AsRef<Path>, strict_methods: bool) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read schema catalog {}", path.display()))?;
        let catalog = Self::from_json_str(&json, strict_methods)
            .with_context(|| format!("Schema catalog {}", path.display()))?;

        tracing::info!(
            schema = %catalog.name,
            tables = catalog.tables.len(),
            selectors = catalog.selectors.len(),
            slices = catalog.slices.len(),
            "Schema catalog loaded"
        );
        Ok(catalog)
    }

    /// Validates the catalog and resolves computed-attribute methods
    ///
    /// # Errors
    ///
    /// Returns a single [`CifdbError::Schema`] listing every problem found.
    pub fn prepare(&mut self, strict_methods: bool) -> Result<()> {
        let mut problems = Vec::new();

        let mut ids = HashSet::new();
        for table in &mut self.tables {
            if !ids.insert(table.id.clone()) {
                problems.push(format!("duplicate table id {}", table.id));
            }
            problems.extend(table.prepare(strict_methods));
        }

        for (selector, clauses) in &self.selectors {
            if clauses.is_empty() {
                problems.push(format!("selector {selector} has no clauses"));
            }
        }

        for (slice, parents) in &self.slices {
            if parents.is_empty() {
                problems.push(format!("slice {slice} has no parent items"));
            }
            for table in &self.tables {
                let Some(table_slice) = table.slice(slice) else {
                    continue;
                };
                for attribute in &table_slice.attributes {
                    let declared = parents.iter().any(|p| {
                        p.category == attribute.parent_category
                            && p.attribute == attribute.parent_attribute
                    });
                    if !declared {
                        problems.push(format!(
                            "table {}: slice {} references undeclared parent {}.{}",
                            table.id, slice, attribute.parent_category, attribute.parent_attribute
                        ));
                    }
                    if table.attribute(&attribute.child_attribute).is_none() {
                        problems.push(format!(
                            "table {}: slice {} child attribute {} is not defined",
                            table.id, slice, attribute.child_attribute
                        ));
                    }
                }
            }
        }
        for table in &self.tables {
            for slice in table.slice_names() {
                if !self.slices.contains_key(slice) {
                    problems.push(format!("table {}: unknown slice {}", table.id, slice));
                }
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(CifdbError::Schema(problems.join("; ")))
        }
    }

    /// Table ids in declared order
    pub fn schema_id_list(&self) -> Vec<&str> {
        self.tables.iter().map(|t| t.id.as_str()).collect()
    }

    pub fn schema_object(&self, table_id: &str) -> Option<&SchemaTable> {
        self.tables.iter().find(|t| t.id == table_id)
    }

    pub fn has_schema_object(&self, table_id: &str) -> bool {
        self.schema_object(table_id).is_some()
    }

    pub fn tables(&self) -> &[SchemaTable] {
        &self.tables
    }

    /// Attribute ids of a table sorted by declared order
    pub fn attribute_id_list(&self, table_id: &str) -> Vec<&str> {
        self.schema_object(table_id)
            .map(SchemaTable::attribute_id_list)
            .unwrap_or_default()
    }

    pub fn attribute_name_list(&self, table_id: &str) -> Vec<&str> {
        self.schema_object(table_id)
            .map(SchemaTable::attribute_name_list)
            .unwrap_or_default()
    }

    pub fn data_selectors(&self, name: &str) -> Option<&[SelectorClause]> {
        self.selectors.get(name).map(Vec::as_slice)
    }

    pub fn data_selector_names(&self) -> Vec<&str> {
        self.selectors.keys().map(String::as_str).collect()
    }

    pub fn slice_names(&self) -> Vec<&str> {
        self.slices.keys().map(String::as_str).collect()
    }

    pub fn has_slice(&self, slice_name: &str) -> bool {
        self.slices.contains_key(slice_name)
    }

    /// Parent items partitioning a slice, in declared order
    pub fn slice_parent_items(&self, slice_name: &str) -> &[SliceParent] {
        self.slices
            .get(slice_name)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// `(table id, slice attributes)` for every table carrying slice attributes
    pub fn slice_attributes(&self, slice_name: &str) -> Vec<(&str, &[SliceAttribute])> {
        self.tables
            .iter()
            .filter_map(|t| {
                t.slice(slice_name)
                    .filter(|s| !s.attributes.is_empty())
                    .map(|s| (t.id.as_str(), s.attributes.as_slice()))
            })
            .collect()
    }

    pub fn has_slice_unit_cardinality(&self, table_id: &str, slice_name: &str) -> bool {
        self.schema_object(table_id)
            .map(|t| t.has_slice_unit_cardinality(slice_name))
            .unwrap_or(false)
    }

    pub fn is_slice_extra(&self, table_id: &str, slice_name: &str) -> bool {
        self.schema_object(table_id)
            .map(|t| t.is_slice_extra(slice_name))
            .unwrap_or(false)
    }

    pub fn derived_categories(&self) -> &[DerivedCategoryDef] {
        &self.derived_categories
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::methods::{ComputedMethod, DerivedCategoryBuilder};

    const CATALOG: &str = r#"{
        "name": "pdbx_core",
        "version": "1.0",
        "tables": [
            {
                "id": "ENTITY",
                "name": "entity",
                "attributes": [
                    {"id": "TYPE", "name": "type", "order": 2,
                     "source": {"category": "entity", "attribute": "type"},
                     "enumeration": ["polymer", "non-polymer", "water"]},
                    {"id": "ID", "name": "id", "order": 1, "primary_key": true,
                     "source": {"category": "entity", "attribute": "id"}},
                    {"id": "ROW", "name": "row", "order": 3,
                     "method": {"name": "rowindex()"}}
                ],
                "categories": [{"category": "entity"}],
                "slices": {
                    "ENTITY": {
                        "attributes": [{"parent_category": "ENTITY", "parent_attribute": "ID",
                                        "child_attribute": "ID"}],
                        "unit_cardinality": true
                    }
                }
            },
            {
                "id": "ENTRY",
                "name": "entry",
                "attributes": [
                    {"id": "ENTRY_ID", "name": "entry_id", "order": 1,
                     "source": {"category": "entry", "attribute": "id"}}
                ],
                "categories": [{"category": "entry"}],
                "slices": {"ENTITY": {"extra": true}}
            }
        ],
        "selectors": {
            "PUBLIC_RELEASE": [
                {"category": "pdbx_database_status", "attribute": "status_code", "values": ["REL"]}
            ]
        },
        "slices": {"ENTITY": [{"category": "ENTITY", "attribute": "ID"}]},
        "derived_categories": [
            {"category": "rcsb_entry_container_identifiers", "builder": "build_container_entry_ids"}
        ]
    }"#;

    #[test]
    fn test_load_catalog() {
        let catalog = SchemaCatalog::from_json_str(CATALOG, true).unwrap();

        assert_eq!(catalog.schema_id_list(), vec!["ENTITY", "ENTRY"]);
        assert_eq!(catalog.attribute_id_list("ENTITY"), vec!["ID", "TYPE", "ROW"]);
        assert_eq!(catalog.attribute_name_list("ENTITY"), vec!["id", "type", "row"]);
        assert!(catalog.attribute_id_list("NOPE").is_empty());

        let entity = catalog.schema_object("ENTITY").unwrap();
        assert_eq!(entity.primary_key_attribute_id_list(), vec!["ID"]);
        assert_eq!(entity.map_instance_category_list(), vec!["entity"]);
        assert_eq!(
            entity.map_attribute_function("ROW"),
            Some(&ComputedMethod::RowIndex)
        );
        assert_eq!(entity.map_other_attribute_id_list(), vec!["ROW"]);

        assert_eq!(catalog.data_selector_names(), vec!["PUBLIC_RELEASE"]);
        assert_eq!(catalog.data_selectors("PUBLIC_RELEASE").unwrap().len(), 1);
        assert!(catalog.data_selectors("MISSING").is_none());

        assert_eq!(catalog.slice_names(), vec!["ENTITY"]);
        assert_eq!(catalog.slice_attributes("ENTITY").len(), 1);
        assert!(catalog.has_slice_unit_cardinality("ENTITY", "ENTITY"));
        assert!(catalog.is_slice_extra("ENTRY", "ENTITY"));
        assert!(!catalog.is_slice_extra("ENTITY", "ENTITY"));

        assert_eq!(
            catalog.derived_categories()[0].builder,
            DerivedCategoryBuilder::BuildContainerEntryIds
        );
    }

    #[test]
    fn test_attribute_order_strictly_increasing() {
        let catalog = SchemaCatalog::from_json_str(CATALOG, true).unwrap();
        for table in catalog.tables() {
            let orders: Vec<u32> = table.attributes().iter().map(|a| a.order).collect();
            assert!(orders.windows(2).all(|w| w[0] < w[1]), "{}", table.id);
        }
    }

    #[test]
    fn test_unknown_method_rejected_when_strict() {
        let json = CATALOG.replace("rowindex()", "frobnicate()");
        let err = SchemaCatalog::from_json_str(&json, true).unwrap_err();
        assert!(matches!(err, CifdbError::Schema(_)));
        assert!(err.to_string().contains("frobnicate"));

        assert!(SchemaCatalog::from_json_str(&json, false).is_ok());
    }

    #[test]
    fn test_undeclared_slice_rejected() {
        let json = CATALOG.replace(
            r#""slices": {"ENTITY": [{"category": "ENTITY", "attribute": "ID"}]},"#,
            "",
        );
        let err = SchemaCatalog::from_json_str(&json, true).unwrap_err();
        assert!(err.to_string().contains("unknown slice"));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.json");
        std::fs::write(&path, CATALOG).unwrap();

        let catalog = SchemaCatalog::from_file(&path, true).unwrap();
        assert_eq!(catalog.name, "pdbx_core");

        let missing = SchemaCatalog::from_file(dir.path().join("absent.json"), true);
        assert!(matches!(missing, Err(CifdbError::Io(_))));
    }
}
