//! Data selector evaluation
//!
//! A container passes a list of named selectors only if every clause of every
//! selector holds. A clause holds when its category exists, has at least one row,
//! defines the clause attribute, and every row's value is in the allowed set.

use crate::domain::{CifdbError, Result, SourceContainer};
use crate::schema::{SchemaCatalog, SelectorClause};

/// Evaluates named data selectors against source containers
#[derive(Debug, Clone, Copy)]
pub struct SelectorEvaluator<'a> {
    catalog: &'a SchemaCatalog,
}

impl<'a> SelectorEvaluator<'a> {
    pub fn new(catalog: &'a SchemaCatalog) -> Self {
        Self { catalog }
    }

    /// Checks that every selector name is defined in the catalog
    ///
    /// # Errors
    ///
    /// Returns [`CifdbError::Configuration`] naming the undefined selectors.
    pub fn validate<S: AsRef<str>>(&self, selector_names: &[S]) -> Result<()> {
        let missing: Vec<&str> = selector_names
            .iter()
            .map(AsRef::as_ref)
            .filter(|name| self.catalog.data_selectors(name).is_none())
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(CifdbError::Configuration(format!(
                "Undefined data selectors: {}",
                missing.join(", ")
            )))
        }
    }

    /// Returns true if `container` passes all named selectors
    ///
    /// Evaluation stops at the first failing clause. An undefined selector name
    /// rejects the container.
    pub fn passes<S: AsRef<str>>(&self, container: &SourceContainer, selector_names: &[S]) -> bool {
        for name in selector_names.iter().map(AsRef::as_ref) {
            let Some(clauses) = self.catalog.data_selectors(name) else {
                tracing::error!(selector = name, "Undefined data selector");
                return false;
            };
            for clause in clauses {
                if !clause_passes(container, clause) {
                    tracing::debug!(
                        container = container.name(),
                        selector = name,
                        category = %clause.category,
                        attribute = %clause.attribute,
                        "Container rejected by data selector"
                    );
                    return false;
                }
            }
        }
        true
    }
}

/// Evaluates one clause with all-rows semantics
pub fn clause_passes(container: &SourceContainer, clause: &SelectorClause) -> bool {
    let Some(category) = container.get_obj(&clause.category) else {
        return false;
    };
    if category.row_count() == 0 || !category.has_attribute(&clause.attribute) {
        return false;
    }

    (0..category.row_count()).all(|row| {
        category
            .value(&clause.attribute, row)
            .map(|value| clause.values.iter().any(|allowed| allowed == value))
            .unwrap_or(false)
    })
}
