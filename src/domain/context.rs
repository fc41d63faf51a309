//! Error context extension trait
//!
//! Adds `.context()` / `.with_context()` to any `Result` whose error converts into
//! [`CifdbError`], keeping the library on its own error type instead of `anyhow`.
//!
//! ```rust
//! use cifdb::domain::Result;
//! use cifdb::domain::context::ResultExt;
//!
//! fn read_catalog(path: &str) -> Result<String> {
//!     std::fs::read_to_string(path)
//!         .with_context(|| format!("Failed to read schema catalog {path}"))
//! }
//! ```

use crate::domain::errors::CifdbError;
use crate::domain::result::Result;

/// Extension trait for adding context to `Result` types
pub trait ResultExt<T> {
    /// Prefixes the error message with `context`
    fn context<C>(self, context: C) -> Result<T>
    where
        C: std::fmt::Display + Send + Sync + 'static;

    /// Like [`ResultExt::context`], but the message is built only on error
    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        C: std::fmt::Display + Send + Sync + 'static,
        F: FnOnce() -> C;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: Into<CifdbError>,
{
    fn context<C>(self, context: C) -> Result<T>
    where
        C: std::fmt::Display + Send + Sync + 'static,
    {
        self.map_err(|e| wrap(e.into(), context))
    }

    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        C: std::fmt::Display + Send + Sync + 'static,
        F: FnOnce() -> C,
    {
        self.map_err(|e| wrap(e.into(), f()))
    }
}

/// Keeps the variant of errors that callers branch on; others become `Other`
fn wrap(error: CifdbError, context: impl std::fmt::Display) -> CifdbError {
    match error {
        CifdbError::Configuration(msg) => CifdbError::Configuration(format!("{context}: {msg}")),
        CifdbError::Schema(msg) => CifdbError::Schema(format!("{context}: {msg}")),
        CifdbError::Parse(msg) => CifdbError::Parse(format!("{context}: {msg}")),
        CifdbError::Io(msg) => CifdbError::Io(format!("{context}: {msg}")),
        other => CifdbError::Other(format!("{context}: {other}")),
    }
}
