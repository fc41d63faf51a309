//! Closed registries of computed-attribute methods and derived-category builders
//!
//! Catalog files name methods and builders by string. Both are resolved here at
//! catalog load time, so the mapper only ever dispatches on typed variants.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Synthetic attribute behaviours evaluated once per table against its row list
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComputedMethod {
    /// Broadcast the container name into every row
    DatablockId,
    /// Broadcast the container load date (or a fresh timestamp)
    LoadDateTime,
    /// Broadcast the container locator (or `"unknown"`)
    Locator,
    /// Assign each row its 1-based position
    RowIndex,
    /// Unrecognised name, kept only when strict method checking is off
    Unsupported(String),
}

impl ComputedMethod {
    /// Resolves a method name as written in a catalog
    ///
    /// Names are matched case-insensitively, with or without a trailing `()`, and
    /// with or without a `set_`/`get` prefix (`datablockid()`, `getdatetime`,
    /// `set_row_index`).
    pub fn parse(name: &str) -> Option<Self> {
        let normalized: String = name
            .trim()
            .trim_end_matches("()")
            .to_lowercase()
            .chars()
            .filter(|c| *c != '_')
            .collect();
        let normalized = normalized
            .strip_prefix("set")
            .unwrap_or(&normalized)
            .to_string();

        match normalized.as_str() {
            "datablockid" | "containername" => Some(Self::DatablockId),
            "getdatetime" | "loaddatetime" | "loaddate" => Some(Self::LoadDateTime),
            "getlocator" | "locator" => Some(Self::Locator),
            "rowindex" => Some(Self::RowIndex),
            _ => None,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::DatablockId => "datablockid",
            Self::LoadDateTime => "getdatetime",
            Self::Locator => "getlocator",
            Self::RowIndex => "rowindex",
            Self::Unsupported(name) => name,
        }
    }
}

impl fmt::Display for ComputedMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Builders that add a synthetic category to a container before mapping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DerivedCategoryBuilder {
    /// One row of entry/entity/assembly identifier lists
    BuildContainerEntryIds,
    /// One row per entity: entry id and entity id
    BuildContainerEntityIds,
    /// One row per assembly: entry id and assembly id
    BuildContainerAssemblyIds,
    /// Adds the joined author list to each citation row
    AggregateCitationAuthors,
    /// Appends the deposited coordinates as an assembly labelled `deposited`
    AddDepositedAssembly,
    /// Maps free-text assembly details onto a three-term vocabulary
    FilterAssemblyDetails,
    /// Flags author-defined assemblies as candidates (`Y`/`N`)
    AssignAssemblyCandidates,
}

impl fmt::Display for DerivedCategoryBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::BuildContainerEntryIds => "build_container_entry_ids",
            Self::BuildContainerEntityIds => "build_container_entity_ids",
            Self::BuildContainerAssemblyIds => "build_container_assembly_ids",
            Self::AggregateCitationAuthors => "aggregate_citation_authors",
            Self::AddDepositedAssembly => "add_deposited_assembly",
            Self::FilterAssemblyDetails => "filter_assembly_details",
            Self::AssignAssemblyCandidates => "assign_assembly_candidates",
        };
        write!(f, "{name}")
    }
}

/// A derived category declared in the catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivedCategoryDef {
    /// Category created (or, for attribute builders, extended) by the builder
    pub category: String,
    pub builder: DerivedCategoryBuilder,
    /// Attribute written by attribute builders
    #[serde(default)]
    pub attribute: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("datablockid()", Some(ComputedMethod::DatablockId); "datablock call")]
    #[test_case("DatablockId", Some(ComputedMethod::DatablockId); "datablock case")]
    #[test_case("getdatetime()", Some(ComputedMethod::LoadDateTime); "datetime")]
    #[test_case("set_load_date", Some(ComputedMethod::LoadDateTime); "set load date")]
    #[test_case("getlocator()", Some(ComputedMethod::Locator); "locator")]
    #[test_case("rowindex()", Some(ComputedMethod::RowIndex); "row index")]
    #[test_case("set_row_index", Some(ComputedMethod::RowIndex); "set row index")]
    #[test_case("frobnicate()", None; "unknown")]
    fn test_parse_method(name: &str, expected: Option<ComputedMethod>) {
        assert_eq!(ComputedMethod::parse(name), expected);
    }

    #[test]
    fn test_builder_deserialize() {
        let def: DerivedCategoryDef = serde_json::from_str(
            r#"{"category": "rcsb_entry_container_identifiers", "builder": "build_container_entry_ids"}"#,
        )
        .unwrap();
        assert_eq!(def.builder, DerivedCategoryBuilder::BuildContainerEntryIds);
        assert!(def.attribute.is_none());

        let def: DerivedCategoryDef = serde_json::from_str(
            r#"{"category": "pdbx_struct_assembly", "builder": "assign_assembly_candidates"}"#,
        )
        .unwrap();
        assert_eq!(def.builder, DerivedCategoryBuilder::AssignAssemblyCandidates);
        assert_eq!(def.builder.to_string(), "assign_assembly_candidates");

        let unknown = serde_json::from_str::<DerivedCategoryDef>(
            r#"{"category": "x", "builder": "build_everything"}"#,
        );
        assert!(unknown.is_err());
    }
}
