//! Category mapping
//!
//! Turns source containers into table → row lists according to the schema catalog.

pub mod computed;
pub mod convert;
pub mod derived;
pub mod mapper;

pub use convert::{convert_value, FilterFlags};
pub use derived::apply_derived_categories;
pub use mapper::{CategoryMapper, TableSelection};
