//! Source parsers
//!
//! Turn input locators into [`SourceContainer`]s. Parsing is synchronous; the
//! pipeline runs it on the blocking pool.

pub mod cif;
pub mod json;

pub use cif::{parse_cif_str, CifReader};
pub use json::{parse_json_str, JsonContainerReader};

use crate::config::SourceFormat;
use crate::domain::{Result, ResultExt, SourceContainer};
use std::path::Path;

/// Parser contract: one locator yields zero or more containers
pub trait SourceParser: Send + Sync {
    /// Parse the document at `locator`
    ///
    /// # Errors
    ///
    /// Returns an error if the locator cannot be read or is malformed.
    fn parse(&self, locator: &str) -> Result<Vec<SourceContainer>>;
}

/// Parser for a configured source format
pub fn create_source_parser(format: SourceFormat) -> Box<dyn SourceParser> {
    match format {
        SourceFormat::Cif => Box::new(CifReader::new()),
        SourceFormat::Json => Box::new(JsonContainerReader::new()),
    }
}

/// Reads a path-list file: one locator per line, `#` comments and blank lines skipped
///
/// Relative entries are kept as written.
pub fn read_path_list(path: impl AsRef<Path>) -> Result<Vec<String>> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read path list {}", path.display()))?;
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_read_path_list() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# load list").unwrap();
        writeln!(file, "data/1abc.cif").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "  data/2xyz.cif  ").unwrap();

        let paths = read_path_list(file.path()).unwrap();
        assert_eq!(paths, vec!["data/1abc.cif", "data/2xyz.cif"]);
    }

    #[test]
    fn test_missing_path_list() {
        assert!(read_path_list("/nonexistent/list.txt").is_err());
    }
}
