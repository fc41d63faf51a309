//! Reshaping of mapped table data into output documents

pub mod slice;
pub mod style;

pub use slice::{slice_tables, CardinalityViolation, SlicePart, SliceReport};
pub use style::{shape_table, Style};

use crate::domain::{Document, Result, TableRowMap};
use crate::schema::SchemaCatalog;

/// Serializes mapped tables into documents of one style
#[derive(Debug, Clone, Copy)]
pub struct Reshaper<'a> {
    catalog: &'a SchemaCatalog,
}

impl<'a> Reshaper<'a> {
    pub fn new(catalog: &'a SchemaCatalog) -> Self {
        Self { catalog }
    }

    /// Shapes the whole mapping into one document
    ///
    /// Tables keep the order in which they were mapped.
    pub fn apply_shape(&self, mapped: &TableRowMap, style: Style) -> Document {
        let mut document = Document::new();
        for (table_id, rows) in mapped.iter() {
            match self.catalog.schema_object(table_id) {
                Some(table) => shape_table(&mut document, table, rows, style),
                None => tracing::debug!(table_id, "Skipping undefined table while shaping"),
            }
        }
        document
    }

    /// Shapes the mapping into one document per slice, or one document without a slice
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `slice_name` is not defined.
    pub fn apply_sliced_shape(
        &self,
        mapped: &TableRowMap,
        style: Style,
        slice_name: Option<&str>,
    ) -> Result<(Vec<Document>, Option<SliceReport>)> {
        let Some(slice_name) = slice_name else {
            return Ok((vec![self.apply_shape(mapped, style)], None));
        };

        let (parts, report) = slice_tables(self.catalog, mapped, slice_name)?;
        let documents = parts
            .iter()
            .map(|part| self.apply_shape(&part.tables, style))
            .collect();
        Ok((documents, Some(report)))
    }
}
