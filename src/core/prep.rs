//! Document preparation
//!
//! [`DataPrep`] runs the read side of the pipeline: parse locators, admit
//! containers through data selectors, map them onto schema tables and reshape
//! the result. Its public methods are a boundary: configuration errors are
//! logged and produce empty results instead of propagating.

use crate::adapters::source::{CifReader, SourceParser};
use crate::core::mapping::{CategoryMapper, FilterFlags, TableSelection};
use crate::core::reshape::{Reshaper, Style};
use crate::core::select::SelectorEvaluator;
use crate::domain::{
    CifdbError, ContainerMetadata, Document, Result, SourceContainer, TableRowMap,
};
use crate::schema::SchemaCatalog;
use std::sync::Arc;

/// A parsed container with the provenance recorded when it was read
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedContainer {
    pub container: SourceContainer,
    pub metadata: ContainerMetadata,
}

impl ParsedContainer {
    pub fn new(container: SourceContainer, metadata: ContainerMetadata) -> Self {
        Self {
            container,
            metadata,
        }
    }
}

/// Documents built from a set of containers
///
/// `container_names[i]` names the container `documents[i]` came from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PreparedDocuments {
    pub documents: Vec<Document>,
    pub container_names: Vec<String>,
    /// Locators that failed to parse or whose containers were rejected
    pub rejected_locators: Vec<String>,
    /// Slice unit-cardinality violations across all containers
    pub cardinality_violations: usize,
    /// Containers read, including rejected ones
    pub containers_read: usize,
}

/// Read-side pipeline over one schema catalog
#[derive(Clone)]
pub struct DataPrep {
    catalog: Arc<SchemaCatalog>,
    parser: Arc<dyn SourceParser>,
    selection: TableSelection,
}

impl DataPrep {
    /// Create a preparation step reading CIF files
    pub fn new(catalog: Arc<SchemaCatalog>) -> Self {
        Self {
            catalog,
            parser: Arc::new(CifReader::new()),
            selection: TableSelection::all(),
        }
    }

    /// Use a different source parser
    pub fn with_parser(mut self, parser: Arc<dyn SourceParser>) -> Self {
        self.parser = parser;
        self
    }

    pub fn catalog(&self) -> &SchemaCatalog {
        &self.catalog
    }

    /// Restrict mapping to these tables; `None` maps every table
    pub fn set_include_list(&mut self, include: Option<Vec<String>>) {
        self.selection.set_include_list(include);
    }

    /// Never map these tables
    pub fn set_exclude_list(&mut self, exclude: Vec<String>) {
        self.selection.set_exclude_list(exclude);
    }

    /// Parse every locator
    ///
    /// # Returns
    ///
    /// The parsed containers in locator order, and the locators that failed.
    pub fn get_container_list<S: AsRef<str>>(
        &self,
        locators: &[S],
    ) -> (Vec<ParsedContainer>, Vec<String>) {
        let mut containers = Vec::new();
        let mut failed = Vec::new();
        for locator in locators {
            let locator = locator.as_ref();
            match self.parser.parse(locator) {
                Ok(parsed) => {
                    if parsed.is_empty() {
                        tracing::warn!(locator, "Locator contains no data blocks");
                    }
                    containers.extend(parsed.into_iter().map(|container| {
                        ParsedContainer::new(container, ContainerMetadata::for_locator(locator))
                    }));
                }
                Err(e) => {
                    tracing::warn!(locator, error = %e, "Failed to parse locator");
                    failed.push(locator.to_string());
                }
            }
        }
        (containers, failed)
    }

    /// Parse, select, map and shape locators into one aggregate document
    ///
    /// # Returns
    ///
    /// The aggregate document and the names of the containers that passed selection.
    pub fn fetch<S: AsRef<str>, T: AsRef<str>>(
        &self,
        locators: &[S],
        style: Style,
        flags: FilterFlags,
        selectors: &[T],
    ) -> (Document, Vec<String>) {
        let (containers, _) = self.get_container_list(locators);
        self.process(&containers, style, flags, selectors)
    }

    /// Select, map and shape already-parsed containers into one aggregate document
    ///
    /// Rows of all admitted containers are appended per table before shaping.
    pub fn process<T: AsRef<str>>(
        &self,
        containers: &[ParsedContainer],
        style: Style,
        flags: FilterFlags,
        selectors: &[T],
    ) -> (Document, Vec<String>) {
        let evaluator = SelectorEvaluator::new(&self.catalog);
        if let Err(e) = evaluator.validate(selectors) {
            tracing::error!(error = %e, "Invalid data selectors");
            return (Document::new(), Vec::new());
        }

        let mapper = CategoryMapper::new(&self.catalog, flags);
        let table_ids = self.selection.resolve(&self.catalog);
        let mut aggregate = TableRowMap::new();
        let mut names = Vec::new();

        for parsed in containers {
            if !evaluator.passes(&parsed.container, selectors) {
                continue;
            }
            aggregate.extend(mapper.map_container(&parsed.container, &parsed.metadata, &table_ids));
            names.push(parsed.container.name().to_string());
        }

        if flags.drop_empty_tables {
            aggregate.drop_empty_tables();
        }
        tracing::debug!(
            containers = names.len(),
            tables = aggregate.len(),
            rows = aggregate.total_rows(),
            "Processed containers"
        );
        (Reshaper::new(&self.catalog).apply_shape(&aggregate, style), names)
    }

    /// Parse locators and build one document per container (or per slice)
    pub fn fetch_documents<S: AsRef<str>, T: AsRef<str>>(
        &self,
        locators: &[S],
        style: Style,
        flags: FilterFlags,
        selectors: &[T],
        slice_name: Option<&str>,
    ) -> PreparedDocuments {
        let (containers, failed) = self.get_container_list(locators);
        let mut prepared = self.process_documents(&containers, style, flags, selectors, slice_name);
        prepared.rejected_locators.extend(failed);
        prepared
    }

    /// Build one document per admitted container, or one per slice key with a slice
    pub fn process_documents<T: AsRef<str>>(
        &self,
        containers: &[ParsedContainer],
        style: Style,
        flags: FilterFlags,
        selectors: &[T],
        slice_name: Option<&str>,
    ) -> PreparedDocuments {
        match self.try_process_documents(containers, style, flags, selectors, slice_name) {
            Ok(prepared) => prepared,
            Err(e) => {
                tracing::error!(error = %e, "Document preparation failed");
                PreparedDocuments {
                    containers_read: containers.len(),
                    ..PreparedDocuments::default()
                }
            }
        }
    }

    fn try_process_documents<T: AsRef<str>>(
        &self,
        containers: &[ParsedContainer],
        style: Style,
        flags: FilterFlags,
        selectors: &[T],
        slice_name: Option<&str>,
    ) -> Result<PreparedDocuments> {
        let evaluator = SelectorEvaluator::new(&self.catalog);
        evaluator.validate(selectors)?;
        if let Some(slice) = slice_name {
            if !self.catalog.has_slice(slice) {
                return Err(CifdbError::Configuration(format!(
                    "Slice '{slice}' is not defined in schema '{}'",
                    self.catalog.name
                )));
            }
        }

        let mapper = CategoryMapper::new(&self.catalog, flags);
        let reshaper = Reshaper::new(&self.catalog);
        let table_ids = self.selection.resolve(&self.catalog);
        let mut prepared = PreparedDocuments {
            containers_read: containers.len(),
            ..PreparedDocuments::default()
        };

        for parsed in containers {
            let name = parsed.container.name();
            if !evaluator.passes(&parsed.container, selectors) {
                let locator = parsed.metadata.locator_or_unknown();
                if !prepared.rejected_locators.contains(&locator) {
                    prepared.rejected_locators.push(locator);
                }
                continue;
            }

            let mut mapped = mapper.map_container(&parsed.container, &parsed.metadata, &table_ids);
            if flags.drop_empty_tables {
                mapped.drop_empty_tables();
            }

            let (documents, report) = reshaper.apply_sliced_shape(&mapped, style, slice_name)?;
            if let Some(report) = report {
                if !report.is_clean() {
                    tracing::warn!(
                        container = name,
                        slice = %report.slice_name,
                        violations = report.cardinality_violations.len(),
                        null_keys = report.null_keys,
                        "Slice data-quality conditions"
                    );
                }
                prepared.cardinality_violations += report.cardinality_violations.len();
            }

            prepared
                .container_names
                .extend(std::iter::repeat(name.to_string()).take(documents.len()));
            prepared.documents.extend(documents);
        }

        tracing::info!(
            containers = containers.len(),
            documents = prepared.documents.len(),
            rejected = prepared.rejected_locators.len(),
            "Prepared documents"
        );
        Ok(prepared)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::source::parse_cif_str;
    use serde_json::{json, Value};

    const CATALOG: &str = r#"{
        "name": "pdbx_core",
        "tables": [
            {
                "id": "ENTRY",
                "name": "entry",
                "attributes": [
                    {"id": "ID", "name": "id", "order": 1,
                     "source": {"category": "entry", "attribute": "id"}}
                ],
                "categories": [{"category": "entry"}],
                "slices": {"ENTITY": {"extra": true}}
            },
            {
                "id": "ENTITY",
                "name": "entity",
                "attributes": [
                    {"id": "ID", "name": "id", "order": 1,
                     "source": {"category": "entity", "attribute": "id"}},
                    {"id": "TYPE", "name": "type", "order": 2,
                     "source": {"category": "entity", "attribute": "type"}}
                ],
                "categories": [{"category": "entity"}],
                "slices": {"ENTITY": {"attributes": [
                    {"parent_category": "ENTITY", "parent_attribute": "ID", "child_attribute": "ID"}
                ]}}
            },
            {
                "id": "IDS",
                "name": "rcsb_entry_container_identifiers",
                "attributes": [
                    {"id": "ENTRY_ID", "name": "entry_id", "order": 1,
                     "source": {"category": "rcsb_entry_container_identifiers", "attribute": "entry_id"}},
                    {"id": "ENTITY_IDS", "name": "entity_ids", "order": 2,
                     "source": {"category": "rcsb_entry_container_identifiers", "attribute": "entity_ids"}},
                    {"id": "POLYMER_IDS", "name": "polymer_entity_ids", "order": 3,
                     "source": {"category": "rcsb_entry_container_identifiers", "attribute": "polymer_entity_ids"}},
                    {"id": "NON_POLYMER_IDS", "name": "non-polymer_entity_ids", "order": 4,
                     "source": {"category": "rcsb_entry_container_identifiers", "attribute": "non-polymer_entity_ids"}}
                ],
                "categories": [{"category": "rcsb_entry_container_identifiers"}]
            },
            {
                "id": "STATUS",
                "name": "pdbx_database_status",
                "attributes": [
                    {"id": "CODE", "name": "status_code", "order": 1,
                     "source": {"category": "pdbx_database_status", "attribute": "status_code"}}
                ],
                "categories": [{"category": "pdbx_database_status"}]
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

    const CIF: &str = r#"data_1ABC
_entry.id 1ABC
_pdbx_database_status.status_code REL
loop_
_entity.id
_entity.type
1 polymer
2 non-polymer
data_2XYZ
_entry.id 2XYZ
_pdbx_database_status.status_code HPUB
loop_
_entity.id
_entity.type
1 polymer
"#;

    fn prep() -> DataPrep {
        DataPrep::new(Arc::new(SchemaCatalog::from_json_str(CATALOG, true).unwrap()))
    }

    fn containers() -> Vec<ParsedContainer> {
        parse_cif_str(CIF)
            .unwrap()
            .into_iter()
            .map(|c| ParsedContainer::new(c, ContainerMetadata::for_locator("mem://test.cif")))
            .collect()
    }

    #[test]
    fn test_container_identifiers_scenario() {
        let mut prep = prep();
        prep.set_include_list(Some(vec!["IDS".to_string()]));
        let containers = containers();

        let (document, names) =
            prep.process(&containers[..1], Style::RowwiseByName, FilterFlags::default(), &[] as &[&str]);
        assert_eq!(names, vec!["1ABC"]);
        assert_eq!(
            Value::Object(document),
            json!({"rcsb_entry_container_identifiers": [{
                "entry_id": "1ABC",
                "entity_ids": "1,2",
                "polymer_entity_ids": "1",
                "non-polymer_entity_ids": "2"
            }]})
        );
    }

    #[test]
    fn test_process_aggregates_and_selects() {
        let mut prep = prep();
        prep.set_include_list(Some(vec!["ENTITY".to_string()]));

        let (document, names) = prep.process(
            &containers(),
            Style::RowwiseById,
            FilterFlags::default(),
            &[] as &[&str],
        );
        assert_eq!(names, vec!["1ABC", "2XYZ"]);
        assert_eq!(document["ENTITY"].as_array().unwrap().len(), 3);

        let (document, names) = prep.process(
            &containers(),
            Style::RowwiseById,
            FilterFlags::default(),
            &["PUBLIC_RELEASE"],
        );
        assert_eq!(names, vec!["1ABC"]);
        assert_eq!(document["ENTITY"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_undefined_selector_yields_empty() {
        let (document, names) = prep().process(
            &containers(),
            Style::RowwiseById,
            FilterFlags::default(),
            &["NOT_DEFINED"],
        );
        assert!(document.is_empty());
        assert!(names.is_empty());
    }

    #[test]
    fn test_process_documents_per_container() {
        let mut prep = prep();
        prep.set_exclude_list(vec!["IDS".to_string()]);

        let prepared = prep.process_documents(
            &containers(),
            Style::RowwiseByName,
            FilterFlags::default(),
            &["PUBLIC_RELEASE"],
            None,
        );
        assert_eq!(prepared.documents.len(), 1);
        assert_eq!(prepared.container_names, vec!["1ABC"]);
        assert_eq!(prepared.rejected_locators, vec!["mem://test.cif"]);
        assert!(!prepared.documents[0].contains_key("rcsb_entry_container_identifiers"));
    }

    #[test]
    fn test_process_documents_sliced() {
        let prepared = prep().process_documents(
            &containers()[..1],
            Style::RowwiseByName,
            FilterFlags::default(),
            &[] as &[&str],
            Some("ENTITY"),
        );
        assert_eq!(prepared.documents.len(), 2);
        assert_eq!(prepared.container_names, vec!["1ABC", "1ABC"]);
        for document in &prepared.documents {
            assert_eq!(document["entity"].as_array().unwrap().len(), 1);
            assert_eq!(document["entry"], json!([{"id": "1ABC"}]));
        }
    }

    #[test]
    fn test_undefined_slice_yields_empty() {
        let prepared = prep().process_documents(
            &containers(),
            Style::RowwiseByName,
            FilterFlags::default(),
            &[] as &[&str],
            Some("ASSEMBLY"),
        );
        assert!(prepared.documents.is_empty());
        assert_eq!(prepared.containers_read, 2);
    }

    #[test]
    fn test_fetch_documents_reports_unreadable_locators() {
        let prepared = prep().fetch_documents(
            &["/nonexistent/1abc.cif"],
            Style::RowwiseById,
            FilterFlags::default(),
            &[] as &[&str],
            None,
        );
        assert!(prepared.documents.is_empty());
        assert_eq!(prepared.rejected_locators, vec!["/nonexistent/1abc.cif"]);
    }
}
