//! Mapped rows, documents and document keys
//!
//! Rows and documents are `serde_json` maps built with insertion order preserved, so
//! attribute order in a row follows the schema attribute order it was created with.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::hash::{Hash, Hasher};

/// One mapped row: attribute id (or name, after reshaping) to scalar value
pub type MappedRow = Map<String, Value>;

/// A final per-record (or per-slice) payload
pub type Document = Map<String, Value>;

/// Table id to row list, in first-insertion order
///
/// Rows for the same table are appended, never overwritten, so several containers
/// can be aggregated into one map.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableRowMap {
    entries: Vec<(String, Vec<MappedRow>)>,
}

impl TableRowMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rows recorded for a table
    pub fn rows(&self, table_id: &str) -> Option<&[MappedRow]> {
        self.entries
            .iter()
            .find(|(id, _)| id == table_id)
            .map(|(_, rows)| rows.as_slice())
    }

    /// Returns the row list for a table, creating an empty one if needed
    pub fn ensure(&mut self, table_id: &str) -> &mut Vec<MappedRow> {
        let position = match self.entries.iter().position(|(id, _)| id == table_id) {
            Some(position) => position,
            None => {
                self.entries.push((table_id.to_string(), Vec::new()));
                self.entries.len() - 1
            }
        };
        &mut self.entries[position].1
    }

    /// Appends rows to a table
    pub fn append(&mut self, table_id: &str, rows: Vec<MappedRow>) {
        self.ensure(table_id).extend(rows);
    }

    pub fn contains(&self, table_id: &str) -> bool {
        self.rows(table_id).is_some()
    }

    pub fn table_ids(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(id, _)| id.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[MappedRow])> {
        self.entries
            .iter()
            .map(|(id, rows)| (id.as_str(), rows.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total_rows(&self) -> usize {
        self.entries.iter().map(|(_, rows)| rows.len()).sum()
    }

    /// Removes tables whose row list is empty
    pub fn drop_empty_tables(&mut self) {
        self.entries.retain(|(_, rows)| !rows.is_empty());
    }

    /// Merges another map into this one, appending rows table by table
    pub fn extend(&mut self, other: TableRowMap) {
        for (table_id, rows) in other.entries {
            self.append(&table_id, rows);
        }
    }
}

/// Identifier generated by the store for an inserted document
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentId(String);

impl DocumentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Fresh random identifier
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Result of resolving a [`KeyPath`] against a document
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PathLookup<'a> {
    /// The path exists; the value may be JSON null
    Found(&'a Value),
    /// Some segment of the path is absent
    NotFound,
}

/// A dot-notation document key split into segments (`"rcsb_id"`, `"entry.id"`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct KeyPath {
    segments: Vec<String>,
}

impl KeyPath {
    /// Parses a dot-notation path
    ///
    /// # Errors
    ///
    /// Returns an error for an empty path or an empty segment.
    pub fn parse(path: &str) -> Result<Self, String> {
        if path.trim().is_empty() {
            return Err("Key path cannot be empty".to_string());
        }
        let segments: Vec<String> = path.split('.').map(str::to_string).collect();
        if segments.iter().any(|s| s.is_empty()) {
            return Err(format!("Key path '{path}' has an empty segment"));
        }
        Ok(Self { segments })
    }

    /// Parses a list of dot-notation paths
    pub fn parse_list<S: AsRef<str>>(paths: &[S]) -> Result<Vec<Self>, String> {
        paths.iter().map(|p| Self::parse(p.as_ref())).collect()
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Resolves the path against a document
    pub fn lookup<'a>(&self, document: &'a Document) -> PathLookup<'a> {
        let Some((first, rest)) = self.segments.split_first() else {
            return PathLookup::NotFound;
        };
        let Some(mut current) = document.get(first) else {
            return PathLookup::NotFound;
        };
        for segment in rest {
            match current.get(segment.as_str()) {
                Some(next) => current = next,
                None => return PathLookup::NotFound,
            }
        }
        PathLookup::Found(current)
    }

    pub fn dotted(&self) -> String {
        self.segments.join(".")
    }
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.dotted())
    }
}

impl TryFrom<String> for KeyPath {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<KeyPath> for String {
    fn from(path: KeyPath) -> Self {
        path.dotted()
    }
}

/// Tuple of key values extracted from a document, one component per key path
///
/// A component is `None` when the path was not found in the document.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyTuple(Vec<Option<Value>>);

impl KeyTuple {
    /// Extracts the key tuple of `document` for `paths`
    pub fn from_document(document: &Document, paths: &[KeyPath]) -> Self {
        Self(
            paths
                .iter()
                .map(|path| match path.lookup(document) {
                    PathLookup::Found(value) => Some(value.clone()),
                    PathLookup::NotFound => None,
                })
                .collect(),
        )
    }

    pub fn components(&self) -> &[Option<Value>] {
        &self.0
    }

    /// True if any component's path was not found
    pub fn has_missing(&self) -> bool {
        self.0.iter().any(Option::is_none)
    }
}

impl Eq for KeyTuple {}

impl Hash for KeyTuple {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for component in &self.0 {
            match component {
                None => 0u8.hash(state),
                Some(Value::Null) => 1u8.hash(state),
                Some(Value::Bool(b)) => {
                    2u8.hash(state);
                    b.hash(state);
                }
                Some(Value::Number(n)) => {
                    3u8.hash(state);
                    n.to_string().hash(state);
                }
                Some(Value::String(s)) => {
                    4u8.hash(state);
                    s.hash(state);
                }
                // Containers hash by kind only; equality still compares contents
                Some(Value::Array(_)) => 5u8.hash(state),
                Some(Value::Object(_)) => 6u8.hash(state),
            }
        }
    }
}

impl fmt::Display for KeyTuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .0
            .iter()
            .map(|c| match c {
                Some(v) => v.to_string(),
                None => "<missing>".to_string(),
            })
            .collect();
        write!(f, "({})", parts.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_key_path_lookup_nested() {
        let document = doc(json!({"entry": {"id": "1ABC", "rev": null}, "n": 1}));
        let path = KeyPath::parse("entry.id").unwrap();
        assert_eq!(path.lookup(&document), PathLookup::Found(&json!("1ABC")));

        let path = KeyPath::parse("entry.rev").unwrap();
        assert_eq!(path.lookup(&document), PathLookup::Found(&Value::Null));

        let path = KeyPath::parse("entry.missing").unwrap();
        assert_eq!(path.lookup(&document), PathLookup::NotFound);

        let path = KeyPath::parse("n.deeper").unwrap();
        assert_eq!(path.lookup(&document), PathLookup::NotFound);
    }

    #[test]
    fn test_key_path_parse_rejects_empty() {
        assert!(KeyPath::parse("").is_err());
        assert!(KeyPath::parse("a..b").is_err());
        assert_eq!(KeyPath::parse("a.b").unwrap().segments().len(), 2);
    }

    #[test]
    fn test_key_tuple_distinguishes_missing_from_null() {
        let paths = KeyPath::parse_list(&["k"]).unwrap();
        let missing = KeyTuple::from_document(&doc(json!({})), &paths);
        let null = KeyTuple::from_document(&doc(json!({"k": null})), &paths);
        assert_ne!(missing, null);
        assert!(missing.has_missing());
        assert!(!null.has_missing());
    }

    #[test]
    fn test_key_tuple_as_map_key() {
        let paths = KeyPath::parse_list(&["a", "b.c"]).unwrap();
        let first = KeyTuple::from_document(&doc(json!({"a": 1, "b": {"c": "x"}})), &paths);
        let again = KeyTuple::from_document(&doc(json!({"b": {"c": "x"}, "a": 1})), &paths);

        let mut index = HashMap::new();
        index.insert(first, 0usize);
        assert_eq!(index.get(&again), Some(&0));
    }

    #[test]
    fn test_table_row_map_appends() {
        let mut map = TableRowMap::new();
        let mut row = MappedRow::new();
        row.insert("id".to_string(), json!("1"));
        map.append("entity", vec![row.clone()]);
        map.append("entry", Vec::new());
        map.append("entity", vec![row]);

        assert_eq!(map.rows("entity").unwrap().len(), 2);
        assert_eq!(map.table_ids().collect::<Vec<_>>(), vec!["entity", "entry"]);
        map.drop_empty_tables();
        assert_eq!(map.len(), 1);
        assert_eq!(map.total_rows(), 2);
    }
}
