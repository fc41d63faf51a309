//! Derived category builders
//!
//! Builders run before mapping. They never touch the parsed container; they return
//! an enriched copy carrying the synthetic categories declared in the catalog.

use crate::domain::{Category, SourceContainer, MISSING_VALUE};
use crate::schema::{DerivedCategoryBuilder, DerivedCategoryDef};

/// Default attribute written by [`DerivedCategoryBuilder::AggregateCitationAuthors`]
pub const DEFAULT_AUTHOR_ATTRIBUTE: &str = "rcsb_authors";

/// Default attribute written by [`DerivedCategoryBuilder::FilterAssemblyDetails`]
pub const DEFAULT_DETAILS_ATTRIBUTE: &str = "rcsb_details";

/// Default attribute written by [`DerivedCategoryBuilder::AssignAssemblyCandidates`]
pub const DEFAULT_CANDIDATE_ATTRIBUTE: &str = "rcsb_candidate_assembly";

/// Assembly id and details value of the deposited-coordinates assembly
pub const DEPOSITED_ASSEMBLY_ID: &str = "deposited";
const DEPOSITED_DETAILS: &str = "deposited_coordinates";

const AUTHOR_AND_SOFTWARE: &str = "author_and_software_defined_assembly";
const AUTHOR: &str = "author_defined_assembly";
const SOFTWARE: &str = "software_defined_assembly";

/// Returns a copy of `container` with every derived category applied
///
/// A builder whose prerequisites are missing is skipped and logged at debug level.
pub fn apply_derived_categories(
    container: &SourceContainer,
    derived: &[DerivedCategoryDef],
) -> SourceContainer {
    let mut enriched = container.clone();
    for def in derived {
        let applied = match def.builder {
            DerivedCategoryBuilder::BuildContainerEntryIds => {
                build_container_entry_ids(&enriched, &def.category).map(|c| enriched.append(c))
            }
            DerivedCategoryBuilder::BuildContainerEntityIds => {
                build_container_entity_ids(&enriched, &def.category).map(|c| enriched.append(c))
            }
            DerivedCategoryBuilder::BuildContainerAssemblyIds => {
                build_container_assembly_ids(&enriched, &def.category).map(|c| enriched.append(c))
            }
            DerivedCategoryBuilder::AggregateCitationAuthors => aggregate_citation_authors(
                &mut enriched,
                &def.category,
                def.attribute.as_deref().unwrap_or(DEFAULT_AUTHOR_ATTRIBUTE),
            ),
            DerivedCategoryBuilder::AddDepositedAssembly => add_deposited_assembly(&mut enriched),
            DerivedCategoryBuilder::FilterAssemblyDetails => filter_assembly_details(
                &mut enriched,
                &def.category,
                def.attribute.as_deref().unwrap_or(DEFAULT_DETAILS_ATTRIBUTE),
            ),
            DerivedCategoryBuilder::AssignAssemblyCandidates => assign_assembly_candidates(
                &mut enriched,
                &def.category,
                def.attribute.as_deref().unwrap_or(DEFAULT_CANDIDATE_ATTRIBUTE),
            ),
        };

        if applied.is_none() {
            tracing::debug!(
                container = container.name(),
                category = %def.category,
                builder = %def.builder,
                "Derived category skipped, prerequisites missing"
            );
        }
    }
    enriched
}

fn joined_or_missing(values: &[&str]) -> String {
    if values.is_empty() {
        MISSING_VALUE.to_string()
    } else {
        values.join(",")
    }
}

fn entry_id(container: &SourceContainer) -> Option<String> {
    container
        .get_obj("entry")?
        .value("id", 0)
        .map(str::to_string)
}

/// Single-row category of entry, entity and assembly identifier lists
pub fn build_container_entry_ids(container: &SourceContainer, category_name: &str) -> Option<Category> {
    let entry_id = entry_id(container)?;

    let (entity_ids, polymer_ids, non_polymer_ids) = match container.get_obj("entity") {
        Some(entity) => (
            entity.attribute_value_list("id"),
            entity.select_values_where("id", "polymer", "type"),
            entity.select_values_where("id", "non-polymer", "type"),
        ),
        None => (Vec::new(), Vec::new(), Vec::new()),
    };
    let assembly_ids = container
        .get_obj("pdbx_struct_assembly")
        .map(|a| a.attribute_value_list("id"))
        .unwrap_or_default();

    let attributes = [
        "entry_id",
        "entity_ids",
        "polymer_entity_ids",
        "non-polymer_entity_ids",
        "assembly_ids",
    ];
    Some(Category::with_rows(
        category_name,
        attributes.iter().map(|a| a.to_string()).collect(),
        vec![vec![
            entry_id,
            entity_ids.join(","),
            joined_or_missing(&polymer_ids),
            joined_or_missing(&non_polymer_ids),
            joined_or_missing(&assembly_ids),
        ]],
    ))
}

fn per_row_ids(
    container: &SourceContainer,
    category_name: &str,
    source_category: &str,
    id_attribute: &str,
) -> Option<Category> {
    let entry_id = entry_id(container)?;
    let ids = container.get_obj(source_category)?.attribute_value_list("id");

    Some(Category::with_rows(
        category_name,
        vec!["entry_id".to_string(), id_attribute.to_string()],
        ids.into_iter()
            .map(|id| vec![entry_id.clone(), id.to_string()])
            .collect(),
    ))
}

/// One row per entity: `entry_id`, `entity_id`
pub fn build_container_entity_ids(container: &SourceContainer, category_name: &str) -> Option<Category> {
    per_row_ids(container, category_name, "entity", "entity_id")
}

/// One row per assembly: `entry_id`, `assembly_id`
pub fn build_container_assembly_ids(
    container: &SourceContainer,
    category_name: &str,
) -> Option<Category> {
    per_row_ids(container, category_name, "pdbx_struct_assembly", "assembly_id")
}

/// Writes the `;`-joined author names of each citation into `attribute`
pub fn aggregate_citation_authors(
    container: &mut SourceContainer,
    category_name: &str,
    attribute: &str,
) -> Option<()> {
    let authors = container.get_obj("citation_author")?.clone();
    let citation = container.get_obj_mut(category_name)?;
    citation.append_attribute(attribute);

    for row in 0..citation.row_count() {
        let names = match citation.value("id", row) {
            Some(citation_id) => authors.select_values_where("name", citation_id, "citation_id"),
            None => Vec::new(),
        };
        let joined = if names.is_empty() {
            MISSING_VALUE.to_string()
        } else {
            names.join(";")
        };
        citation.set_value(joined, attribute, row);
    }
    Some(())
}

/// Appends the deposited coordinates as assembly `deposited`
///
/// The generator row lists every `struct_asym` id under the identity operator,
/// which is added to `pdbx_struct_oper_list` when that category is absent.
pub fn add_deposited_assembly(container: &mut SourceContainer) -> Option<()> {
    let asym_ids = container
        .get_obj("struct_asym")?
        .attribute_value_list("id")
        .join(",");

    if !container.exists("pdbx_struct_assembly") {
        container.append(Category::new(
            "pdbx_struct_assembly",
            [
                "id",
                "details",
                "method_details",
                "oligomeric_details",
                "oligomeric_count",
                DEFAULT_DETAILS_ATTRIBUTE,
                DEFAULT_CANDIDATE_ATTRIBUTE,
            ]
            .iter()
            .map(|a| a.to_string())
            .collect(),
        ));
    }
    if !container.exists("pdbx_struct_assembly_gen") {
        container.append(Category::new(
            "pdbx_struct_assembly_gen",
            ["assembly_id", "oper_expression", "asym_id_list", "ordinal"]
                .iter()
                .map(|a| a.to_string())
                .collect(),
        ));
    }
    if !container.exists("pdbx_struct_oper_list") {
        container.append(identity_operation());
    }

    let generators = container.get_obj_mut("pdbx_struct_assembly_gen")?;
    let row = generators.row_count();
    generators.set_value(DEPOSITED_ASSEMBLY_ID, "assembly_id", row);
    generators.set_value("1", "oper_expression", row);
    generators.set_value(asym_ids, "asym_id_list", row);

    let assemblies = container.get_obj_mut("pdbx_struct_assembly")?;
    let row = assemblies.row_count();
    assemblies.set_value(DEPOSITED_ASSEMBLY_ID, "id", row);
    assemblies.set_value(DEPOSITED_DETAILS, "details", row);
    Some(())
}

fn identity_operation() -> Category {
    let attributes = [
        "id",
        "type",
        "name",
        "symmetry_operation",
        "matrix[1][1]",
        "matrix[1][2]",
        "matrix[1][3]",
        "vector[1]",
        "matrix[2][1]",
        "matrix[2][2]",
        "matrix[2][3]",
        "vector[2]",
        "matrix[3][1]",
        "matrix[3][2]",
        "matrix[3][3]",
        "vector[3]",
    ];
    let row = [
        "1",
        "identity operation",
        "1_555",
        "x, y, z",
        "1.0000000000",
        "0.0000000000",
        "0.0000000000",
        "0.0000000000",
        "0.0000000000",
        "1.0000000000",
        "0.0000000000",
        "0.0000000000",
        "0.0000000000",
        "0.0000000000",
        "1.0000000000",
        "0.0000000000",
    ];
    Category::with_rows(
        "pdbx_struct_oper_list",
        attributes.iter().map(|a| a.to_string()).collect(),
        vec![row.iter().map(|v| v.to_string()).collect()],
    )
}

/// Restricted vocabulary for free-text assembly details
///
/// Unlisted details fall back to `software_defined_assembly`.
pub fn assembly_details_term(details: &str) -> &'static str {
    match details {
        "author_and_software_defined_assembly"
        | "complete icosahedral assembly"
        | "complete point assembly"
        | "representative helical assembly" => AUTHOR_AND_SOFTWARE,
        "author_defined_assembly" => AUTHOR,
        _ => SOFTWARE,
    }
}

/// Writes the vocabulary term of each assembly's `details` into `attribute`
pub fn filter_assembly_details(
    container: &mut SourceContainer,
    category_name: &str,
    attribute: &str,
) -> Option<()> {
    label_assemblies(container, category_name, attribute, |term| term.to_string())
}

/// Writes `Y` for author-defined assemblies and `N` otherwise
pub fn assign_assembly_candidates(
    container: &mut SourceContainer,
    category_name: &str,
    attribute: &str,
) -> Option<()> {
    label_assemblies(container, category_name, attribute, |term| {
        let flag = match term {
            AUTHOR | AUTHOR_AND_SOFTWARE => "Y",
            _ => "N",
        };
        flag.to_string()
    })
}

fn label_assemblies(
    container: &mut SourceContainer,
    category_name: &str,
    attribute: &str,
    label: impl Fn(&str) -> String,
) -> Option<()> {
    let assemblies = container.get_obj_mut(category_name)?;
    assemblies.append_attribute(attribute);

    for row in 0..assemblies.row_count() {
        let term = assembly_details_term(assemblies.value("details", row).unwrap_or(""));
        assemblies.set_value(label(term), attribute, row);
    }
    Some(())
}
