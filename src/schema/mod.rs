//! Schema catalog: target table definitions, selectors, slices and method registries

pub mod catalog;
pub mod methods;
pub mod table;

pub use catalog::{SchemaCatalog, SelectorClause, SliceParent};
pub use methods::{ComputedMethod, DerivedCategoryBuilder, DerivedCategoryDef};
pub use table::{
    AppType, AttributeDef, AttributeSource, CategoryMapping, ComputedAttribute, MethodRef,
    SchemaTable, SliceAttribute, TableSlice,
};
