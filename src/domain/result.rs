//! Result type alias for cifdb
//!
//! This module provides a convenient Result type alias that uses CifdbError
//! as the error type.

use super::errors::CifdbError;

/// Result type alias for cifdb operations
///
/// # Examples
///
/// ```
/// use cifdb::domain::result::Result;
/// use cifdb::domain::errors::CifdbError;
///
/// fn example_function() -> Result<String> {
///     Ok("success".to_string())
/// }
///
/// fn failing_function() -> Result<()> {
///     Err(CifdbError::Validation("Invalid input".to_string()))
/// }
/// ```
pub type Result<T> = std::result::Result<T, CifdbError>;
