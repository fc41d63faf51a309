//! Source containers
//!
//! A [`SourceContainer`] is one parsed record: a named set of categories, each an
//! ordered list of attribute names plus an ordered list of positional rows. Values are
//! kept as the raw strings the parser produced; `?` and `.` mark missing values.

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Placeholder written into cells that have no value
pub const MISSING_VALUE: &str = "?";

/// Returns true if the raw value is one of the null markers (`?` or `.`)
pub fn is_null_marker(value: &str) -> bool {
    value == "?" || value == "."
}

/// A named, columnar table within one source record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    name: String,
    attributes: Vec<String>,
    #[serde(default)]
    rows: Vec<Vec<String>>,
}

impl Category {
    /// Creates an empty category with the given attribute names
    pub fn new(name: impl Into<String>, attributes: Vec<String>) -> Self {
        Self {
            name: name.into(),
            attributes,
            rows: Vec::new(),
        }
    }

    /// Creates a category from attribute names and rows
    ///
    /// Rows shorter than the attribute list are padded with [`MISSING_VALUE`].
    pub fn with_rows(name: impl Into<String>, attributes: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let mut category = Self::new(name, attributes);
        for row in rows {
            category.append_row(row);
        }
        category
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn attribute_list(&self) -> &[String] {
        &self.attributes
    }

    pub fn row_list(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn has_attribute(&self, attribute: &str) -> bool {
        self.attribute_index(attribute).is_some()
    }

    /// Position of the attribute within each row
    pub fn attribute_index(&self, attribute: &str) -> Option<usize> {
        self.attributes.iter().position(|a| a == attribute)
    }

    /// Raw value of `attribute` in row `row`
    ///
    /// Returns `None` if the attribute is not defined or the row does not exist.
    pub fn value(&self, attribute: &str, row: usize) -> Option<&str> {
        let index = self.attribute_index(attribute)?;
        self.rows.get(row)?.get(index).map(String::as_str)
    }

    /// All values of `attribute` in row order
    pub fn attribute_value_list(&self, attribute: &str) -> Vec<&str> {
        match self.attribute_index(attribute) {
            Some(index) => self
                .rows
                .iter()
                .filter_map(|row| row.get(index).map(String::as_str))
                .collect(),
            None => Vec::new(),
        }
    }

    /// Values of `attribute` in rows where `match_attribute` equals `match_value`
    pub fn select_values_where(
        &self,
        attribute: &str,
        match_value: &str,
        match_attribute: &str,
    ) -> Vec<&str> {
        let (Some(index), Some(match_index)) = (
            self.attribute_index(attribute),
            self.attribute_index(match_attribute),
        ) else {
            return Vec::new();
        };

        self.rows
            .iter()
            .filter(|row| row.get(match_index).map(String::as_str) == Some(match_value))
            .filter_map(|row| row.get(index).map(String::as_str))
            .collect()
    }

    /// Appends a row, padding or truncating it to the attribute count
    pub fn append_row(&mut self, mut row: Vec<String>) {
        row.resize(self.attributes.len(), MISSING_VALUE.to_string());
        self.rows.push(row);
    }

    /// Appends an attribute column filled with [`MISSING_VALUE`]
    pub fn append_attribute(&mut self, attribute: impl Into<String>) {
        let attribute = attribute.into();
        if self.has_attribute(&attribute) {
            return;
        }
        self.attributes.push(attribute);
        for row in &mut self.rows {
            row.push(MISSING_VALUE.to_string());
        }
    }

    /// Sets a value, growing the row list as needed
    pub fn set_value(&mut self, value: impl Into<String>, attribute: &str, row: usize) {
        if !self.has_attribute(attribute) {
            self.append_attribute(attribute);
        }
        let Some(index) = self.attribute_index(attribute) else {
            return;
        };
        while self.rows.len() <= row {
            self.rows
                .push(vec![MISSING_VALUE.to_string(); self.attributes.len()]);
        }
        self.rows[row][index] = value.into();
    }
}

/// One parsed source record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceContainer {
    name: String,
    #[serde(default)]
    categories: Vec<Category>,
}

impl SourceContainer {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            categories: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns true if the category is present (it may still have zero rows)
    pub fn exists(&self, category: &str) -> bool {
        self.get_obj(category).is_some()
    }

    pub fn get_obj(&self, category: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.name() == category)
    }

    pub fn get_obj_mut(&mut self, category: &str) -> Option<&mut Category> {
        self.categories.iter_mut().find(|c| c.name() == category)
    }

    /// Adds a category, replacing any existing category with the same name
    pub fn append(&mut self, category: Category) {
        match self
            .categories
            .iter_mut()
            .find(|c| c.name() == category.name())
        {
            Some(existing) => *existing = category,
            None => self.categories.push(category),
        }
    }

    pub fn category_names(&self) -> Vec<&str> {
        self.categories.iter().map(Category::name).collect()
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }
}

/// Per-container provenance passed alongside the container to every mapping call
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerMetadata {
    /// Locator (file path or URI) the container was parsed from
    pub locator: Option<String>,

    /// Load timestamp assigned when the container was read
    pub load_date: Option<String>,
}

impl ContainerMetadata {
    /// Metadata for a container read now from `locator`
    pub fn for_locator(locator: impl Into<String>) -> Self {
        Self {
            locator: Some(locator.into()),
            load_date: Some(timestamp()),
        }
    }

    /// Locator or `"unknown"`
    pub fn locator_or_unknown(&self) -> String {
        self.locator
            .clone()
            .unwrap_or_else(|| "unknown".to_string())
    }

    /// Load date or a fresh timestamp
    pub fn load_date_or_now(&self) -> String {
        self.load_date.clone().unwrap_or_else(timestamp)
    }
}

/// Current UTC timestamp in the `YYYY-MM-DD:HH:MM:SS` form used for load dates
pub fn timestamp() -> String {
    Utc::now().format("%Y-%m-%d:%H:%M:%S").to_string()
}
