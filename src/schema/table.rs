//! Schema table definitions
//!
//! A [`SchemaTable`] is the target-side table: ordered attributes, keys, the source
//! categories it is mapped from and its participation in named slices.

use crate::schema::methods::ComputedMethod;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

/// Application data type class of an attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum AppType {
    /// Character data (char, varchar, text, ...)
    #[default]
    String,
    /// Integer data
    Integer,
    /// Floating point data
    Float,
    /// Calendar date
    Date,
    /// Date and time
    DateTime,
}

impl AppType {
    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Integer | Self::Float)
    }

    pub fn is_temporal(&self) -> bool {
        matches!(self, Self::Date | Self::DateTime)
    }
}

impl FromStr for AppType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_lowercase();
        match lowered.as_str() {
            "string" | "char" | "varchar" | "text" | "mediumtext" | "longtext" | "code" => {
                Ok(Self::String)
            }
            "float" | "double" | "double precision" | "decimal" | "numeric" | "number" => {
                Ok(Self::Float)
            }
            "date" => Ok(Self::Date),
            "datetime" | "timestamp" => Ok(Self::DateTime),
            other if other.starts_with("int") || other == "bigint" || other == "smallint" => {
                Ok(Self::Integer)
            }
            _ => Err(format!("Unknown application type '{s}'")),
        }
    }
}

impl TryFrom<String> for AppType {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<AppType> for String {
    fn from(app_type: AppType) -> Self {
        match app_type {
            AppType::String => "string",
            AppType::Integer => "integer",
            AppType::Float => "float",
            AppType::Date => "date",
            AppType::DateTime => "datetime",
        }
        .to_string()
    }
}

/// Source category/attribute an attribute is projected from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeSource {
    pub category: String,
    pub attribute: String,
}

/// Reference to a computed-attribute method as written in the catalog file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodRef {
    pub name: String,
    #[serde(default)]
    pub args: Vec<String>,
}

/// One attribute of a schema table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeDef {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub app_type: AppType,
    /// Position of the attribute; orders every list/tuple output
    pub order: u32,
    #[serde(default = "default_true")]
    pub nullable: bool,
    #[serde(default)]
    pub primary_key: bool,
    /// Allowed values, in their canonical spelling
    #[serde(default)]
    pub enumeration: Vec<String>,
    #[serde(default)]
    pub iterable_delimiter: Option<String>,
    #[serde(default)]
    pub source: Option<AttributeSource>,
    #[serde(default)]
    pub method: Option<MethodRef>,
}

impl AttributeDef {
    pub fn is_iterable(&self) -> bool {
        self.iterable_delimiter.is_some()
    }

    pub fn is_enumerated(&self) -> bool {
        !self.enumeration.is_empty()
    }

    /// Canonical spelling of an enumerated value, matched case-insensitively
    pub fn normalize_enum<'a>(&'a self, value: &'a str) -> &'a str {
        self.enumeration
            .iter()
            .find(|e| e.eq_ignore_ascii_case(value))
            .map(String::as_str)
            .unwrap_or(value)
    }
}

/// A source category mapped into a table with its merge-index attributes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryMapping {
    pub category: String,
    /// Source attribute names forming the merge key, in declared order
    #[serde(default)]
    pub merge_index: Vec<String>,
}

/// Parent/child attribute correspondence of a slice
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SliceAttribute {
    pub parent_category: String,
    pub parent_attribute: String,
    pub child_attribute: String,
}

/// Participation of a table in one named slice
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSlice {
    #[serde(default)]
    pub attributes: Vec<SliceAttribute>,
    /// At most one row per slice key is expected
    #[serde(default)]
    pub unit_cardinality: bool,
    /// Shared content replicated into every slice
    #[serde(default)]
    pub extra: bool,
}

/// A computed attribute resolved against the method registry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComputedAttribute {
    pub attribute_id: String,
    pub method: ComputedMethod,
    pub args: Vec<String>,
}

/// Target-side table definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaTable {
    pub id: String,
    pub name: String,
    attributes: Vec<AttributeDef>,
    #[serde(default)]
    categories: Vec<CategoryMapping>,
    #[serde(default)]
    slices: BTreeMap<String, TableSlice>,
    #[serde(default)]
    delete_attribute: Option<String>,
    #[serde(default)]
    unit_cardinality: bool,
    #[serde(skip)]
    computed: Vec<ComputedAttribute>,
}

impl SchemaTable {
    /// Creates a table definition; call [`SchemaTable::prepare`] before use
    pub fn new(id: impl Into<String>, name: impl Into<String>, attributes: Vec<AttributeDef>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            attributes,
            categories: Vec::new(),
            slices: BTreeMap::new(),
            delete_attribute: None,
            unit_cardinality: false,
            computed: Vec::new(),
        }
    }

    pub fn with_category(mut self, category: impl Into<String>, merge_index: &[&str]) -> Self {
        self.categories.push(CategoryMapping {
            category: category.into(),
            merge_index: merge_index.iter().map(|s| s.to_string()).collect(),
        });
        self
    }

    pub fn with_slice(mut self, slice_name: impl Into<String>, slice: TableSlice) -> Self {
        self.slices.insert(slice_name.into(), slice);
        self
    }

    pub fn with_unit_cardinality(mut self, unit: bool) -> Self {
        self.unit_cardinality = unit;
        self
    }

    /// Sorts attributes by order and resolves computed-attribute methods
    ///
    /// Returns the list of problems found. With `strict_methods`, unknown method
    /// names are reported as problems; otherwise they are kept as
    /// [`ComputedMethod::Unsupported`] and logged.
    pub fn prepare(&mut self, strict_methods: bool) -> Vec<String> {
        let mut problems = Vec::new();
        self.attributes.sort_by_key(|a| a.order);

        for pair in self.attributes.windows(2) {
            if pair[0].order == pair[1].order {
                problems.push(format!(
                    "table {}: attributes {} and {} share order {}",
                    self.id, pair[0].id, pair[1].id, pair[0].order
                ));
            }
        }

        let mut seen = std::collections::HashSet::new();
        for attribute in &self.attributes {
            if !seen.insert(attribute.id.as_str()) {
                problems.push(format!(
                    "table {}: duplicate attribute id {}",
                    self.id, attribute.id
                ));
            }
            if let Some(source) = &attribute.source {
                if !self.categories.iter().any(|c| c.category == source.category) {
                    problems.push(format!(
                        "table {}: attribute {} maps from undeclared category {}",
                        self.id, attribute.id, source.category
                    ));
                }
            }
        }

        if self.categories.len() > 1 {
            for mapping in &self.categories {
                if mapping.merge_index.is_empty() {
                    problems.push(format!(
                        "table {}: category {} has no merge index",
                        self.id, mapping.category
                    ));
                }
            }
        }

        self.computed.clear();
        for attribute in &self.attributes {
            let Some(method_ref) = &attribute.method else {
                continue;
            };
            let method = match ComputedMethod::parse(&method_ref.name) {
                Some(method) => method,
                None if strict_methods => {
                    problems.push(format!(
                        "table {}: unknown computed-attribute method '{}' for {}",
                        self.id, method_ref.name, attribute.id
                    ));
                    continue;
                }
                None => {
                    tracing::error!(
                        table_id = %self.id,
                        attribute_id = %attribute.id,
                        method = %method_ref.name,
                        "Unsupported computed-attribute method"
                    );
                    ComputedMethod::Unsupported(method_ref.name.clone())
                }
            };
            self.computed.push(ComputedAttribute {
                attribute_id: attribute.id.clone(),
                method,
                args: method_ref.args.clone(),
            });
        }

        problems
    }

    pub fn attributes(&self) -> &[AttributeDef] {
        &self.attributes
    }

    pub fn attribute(&self, attribute_id: &str) -> Option<&AttributeDef> {
        self.attributes.iter().find(|a| a.id == attribute_id)
    }

    /// Attribute ids in declared order
    pub fn attribute_id_list(&self) -> Vec<&str> {
        self.attributes.iter().map(|a| a.id.as_str()).collect()
    }

    /// Attribute names in declared order
    pub fn attribute_name_list(&self) -> Vec<&str> {
        self.attributes.iter().map(|a| a.name.as_str()).collect()
    }

    pub fn attribute_name(&self, attribute_id: &str) -> Option<&str> {
        self.attribute(attribute_id).map(|a| a.name.as_str())
    }

    pub fn primary_key_attribute_id_list(&self) -> Vec<&str> {
        self.attributes
            .iter()
            .filter(|a| a.primary_key)
            .map(|a| a.id.as_str())
            .collect()
    }

    /// Source categories in declared mapping order
    pub fn map_instance_category_list(&self) -> Vec<&str> {
        self.categories.iter().map(|c| c.category.as_str()).collect()
    }

    pub fn map_merge_index_attributes(&self, category: &str) -> &[String] {
        self.categories
            .iter()
            .find(|c| c.category == category)
            .map(|c| c.merge_index.as_slice())
            .unwrap_or(&[])
    }

    /// `(source attribute name, schema attribute id)` pairs mapped from `category`
    pub fn map_category_attributes(&self, category: &str) -> Vec<(&str, &str)> {
        self.attributes
            .iter()
            .filter_map(|a| match &a.source {
                Some(source) if source.category == category => {
                    Some((source.attribute.as_str(), a.id.as_str()))
                }
                _ => None,
            })
            .collect()
    }

    /// Attribute ids with no source category mapping (computed or unmapped)
    pub fn map_other_attribute_id_list(&self) -> Vec<&str> {
        self.attributes
            .iter()
            .filter(|a| a.source.is_none())
            .map(|a| a.id.as_str())
            .collect()
    }

    pub fn map_attribute_function(&self, attribute_id: &str) -> Option<&ComputedMethod> {
        self.computed
            .iter()
            .find(|c| c.attribute_id == attribute_id)
            .map(|c| &c.method)
    }

    pub fn map_attribute_function_args(&self, attribute_id: &str) -> &[String] {
        self.computed
            .iter()
            .find(|c| c.attribute_id == attribute_id)
            .map(|c| c.args.as_slice())
            .unwrap_or(&[])
    }

    pub fn computed_attributes(&self) -> &[ComputedAttribute] {
        &self.computed
    }

    pub fn delete_attribute(&self) -> Option<&str> {
        self.delete_attribute.as_deref()
    }

    pub fn has_unit_cardinality(&self) -> bool {
        self.unit_cardinality
    }

    pub fn slice(&self, slice_name: &str) -> Option<&TableSlice> {
        self.slices.get(slice_name)
    }

    pub fn slice_names(&self) -> impl Iterator<Item = &str> {
        self.slices.keys().map(String::as_str)
    }

    pub fn has_slice_attributes(&self, slice_name: &str) -> bool {
        self.slice(slice_name)
            .map(|s| !s.attributes.is_empty())
            .unwrap_or(false)
    }

    pub fn has_slice_unit_cardinality(&self, slice_name: &str) -> bool {
        self.slice(slice_name)
            .map(|s| s.unit_cardinality)
            .unwrap_or(false)
    }

    pub fn is_slice_extra(&self, slice_name: &str) -> bool {
        self.slice(slice_name).map(|s| s.extra).unwrap_or(false)
    }

    /// Child attribute corresponding to a slice parent item
    pub fn slice_attribute_id(
        &self,
        slice_name: &str,
        parent_category: &str,
        parent_attribute: &str,
    ) -> Option<&str> {
        self.slice(slice_name)?
            .attributes
            .iter()
            .find(|a| a.parent_category == parent_category && a.parent_attribute == parent_attribute)
            .map(|a| a.child_attribute.as_str())
    }
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attribute(id: &str, order: u32, source: Option<(&str, &str)>) -> AttributeDef {
        AttributeDef {
            id: id.to_string(),
            name: id.to_lowercase(),
            app_type: AppType::String,
            order,
            nullable: true,
            primary_key: false,
            enumeration: Vec::new(),
            iterable_delimiter: None,
            source: source.map(|(c, a)| AttributeSource {
                category: c.to_string(),
                attribute: a.to_string(),
            }),
            method: None,
        }
    }

    #[test]
    fn test_app_type_from_str() {
        assert_eq!("VARCHAR".parse::<AppType>().unwrap(), AppType::String);
        assert_eq!("int".parse::<AppType>().unwrap(), AppType::Integer);
        assert_eq!("INTEGER".parse::<AppType>().unwrap(), AppType::Integer);
        assert_eq!("double precision".parse::<AppType>().unwrap(), AppType::Float);
        assert_eq!("datetime".parse::<AppType>().unwrap(), AppType::DateTime);
        assert!("blob".parse::<AppType>().is_err());
    }

    #[test]
    fn test_prepare_sorts_by_order() {
        let mut table = SchemaTable::new(
            "ENTITY",
            "entity",
            vec![
                attribute("TYPE", 2, Some(("entity", "type"))),
                attribute("ID", 1, Some(("entity", "id"))),
            ],
        )
        .with_category("entity", &[]);

        assert!(table.prepare(true).is_empty());
        assert_eq!(table.attribute_id_list(), vec!["ID", "TYPE"]);
        assert_eq!(
            table.map_category_attributes("entity"),
            vec![("id", "ID"), ("type", "TYPE")]
        );
    }

    #[test]
    fn test_prepare_reports_problems() {
        let mut table = SchemaTable::new(
            "T",
            "t",
            vec![
                attribute("A", 1, Some(("x", "a"))),
                attribute("B", 1, Some(("undeclared", "b"))),
            ],
        )
        .with_category("x", &[])
        .with_category("y", &["id"]);

        let problems = table.prepare(true);
        assert!(problems.iter().any(|p| p.contains("share order")));
        assert!(problems.iter().any(|p| p.contains("undeclared category")));
        assert!(problems.iter().any(|p| p.contains("no merge index")));
    }

    #[test]
    fn test_unknown_method_strict_and_lenient() {
        let mut with_method = attribute("M", 1, None);
        with_method.method = Some(MethodRef {
            name: "frobnicate()".to_string(),
            args: Vec::new(),
        });
        let mut strict = SchemaTable::new("T", "t", vec![with_method.clone()]);
        assert_eq!(strict.prepare(true).len(), 1);

        let mut lenient = SchemaTable::new("T", "t", vec![with_method]);
        assert!(lenient.prepare(false).is_empty());
        assert!(matches!(
            lenient.map_attribute_function("M"),
            Some(ComputedMethod::Unsupported(_))
        ));
    }

    #[test]
    fn test_normalize_enum() {
        let mut attr = attribute("TYPE", 1, None);
        attr.enumeration = vec!["polymer".to_string(), "non-polymer".to_string()];
        assert_eq!(attr.normalize_enum("POLYMER"), "polymer");
        assert_eq!(attr.normalize_enum("water"), "water");
    }
}
