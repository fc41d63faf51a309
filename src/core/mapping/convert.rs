//! Source value conversion and output filter flags

use crate::domain::{is_null_marker, CifdbError, Result};
use crate::schema::{AppType, AttributeDef};
use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use std::fmt;
use std::str::FromStr;

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d:%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
];

/// Output filters applied while mapping
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FilterFlags {
    /// Omit null attributes from rows
    pub drop_empty_attributes: bool,
    /// Drop tables with no rows
    pub drop_empty_tables: bool,
    /// Normalize date and datetime values to RFC 3339
    pub assign_dates: bool,
    /// Split delimited attributes into JSON lists
    pub convert_iterables: bool,
}

impl FilterFlags {
    /// Parses a list of flag names
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Result<Self> {
        let mut flags = Self::default();
        for name in names {
            flags.set(name.as_ref())?;
        }
        Ok(flags)
    }

    fn set(&mut self, name: &str) -> Result<()> {
        match name.trim().to_lowercase().replace('_', "-").as_str() {
            "" => {}
            "drop-empty-attributes" => self.drop_empty_attributes = true,
            "drop-empty-tables" => self.drop_empty_tables = true,
            "assign-dates" => self.assign_dates = true,
            "convert-iterables" => self.convert_iterables = true,
            other => {
                return Err(CifdbError::Configuration(format!(
                    "Unknown filter flag '{other}'"
                )))
            }
        }
        Ok(())
    }

    fn names(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        if self.drop_empty_attributes {
            names.push("drop-empty-attributes");
        }
        if self.drop_empty_tables {
            names.push("drop-empty-tables");
        }
        if self.assign_dates {
            names.push("assign-dates");
        }
        if self.convert_iterables {
            names.push("convert-iterables");
        }
        names
    }
}

impl FromStr for FilterFlags {
    type Err = CifdbError;

    /// Parses `|`- or `,`-separated flag names
    fn from_str(s: &str) -> Result<Self> {
        let names: Vec<&str> = s.split(['|', ',']).collect();
        Self::from_names(&names)
    }
}

impl TryFrom<String> for FilterFlags {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        value.parse().map_err(|e: CifdbError| e.to_string())
    }
}

impl From<FilterFlags> for String {
    fn from(flags: FilterFlags) -> Self {
        flags.names().join("|")
    }
}

impl fmt::Display for FilterFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.names().join("|"))
    }
}

/// Converts a raw source value to its output JSON value
///
/// `?` and `.` become null. Numeric types that fail to parse become null and are
/// logged as a data-quality condition.
pub fn convert_value(table_id: &str, attribute: &AttributeDef, raw: &str, flags: FilterFlags) -> Value {
    if is_null_marker(raw) {
        return Value::Null;
    }

    if flags.convert_iterables {
        if let Some(delimiter) = attribute.iterable_delimiter.as_deref() {
            let items = raw
                .split(delimiter)
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(|item| convert_scalar(table_id, attribute, item, flags))
                .collect();
            return Value::Array(items);
        }
    }

    convert_scalar(table_id, attribute, raw, flags)
}

fn convert_scalar(table_id: &str, attribute: &AttributeDef, raw: &str, flags: FilterFlags) -> Value {
    let value = if attribute.is_enumerated() {
        attribute.normalize_enum(raw)
    } else {
        raw
    };

    let converted = match attribute.app_type {
        AppType::Integer => value.trim().parse::<i64>().ok().map(Value::from),
        AppType::Float => value
            .trim()
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number),
        AppType::Date | AppType::DateTime if flags.assign_dates => {
            Some(normalize_date(value).map(Value::String).unwrap_or_else(|| {
                tracing::debug!(
                    table_id,
                    attribute_id = %attribute.id,
                    value,
                    "Unrecognised date format, keeping raw value"
                );
                Value::String(value.to_string())
            }))
        }
        _ => Some(Value::String(value.to_string())),
    };

    converted.unwrap_or_else(|| {
        tracing::warn!(
            table_id,
            attribute_id = %attribute.id,
            value,
            app_type = ?attribute.app_type,
            "Value conversion failed, setting null"
        );
        Value::Null
    })
}

/// Normalizes a date or datetime string to RFC 3339 (UTC)
pub fn normalize_date(value: &str) -> Option<String> {
    let value = value.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.with_timezone(&Utc).to_rfc3339_opts(SecondsFormat::Secs, true));
    }
    for format in DATETIME_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(value, format) {
            return Some(parsed.and_utc().to_rfc3339_opts(SecondsFormat::Secs, true));
        }
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc().to_rfc3339_opts(SecondsFormat::Secs, true))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use test_case::test_case;

    fn attribute(app_type: AppType) -> AttributeDef {
        AttributeDef {
            id: "A".to_string(),
            name: "a".to_string(),
            app_type,
            order: 1,
            nullable: true,
            primary_key: false,
            enumeration: Vec::new(),
            iterable_delimiter: None,
            source: None,
            method: None,
        }
    }

    #[test_case(AppType::String, "abc", json!("abc"); "string")]
    #[test_case(AppType::Integer, "42", json!(42); "integer")]
    #[test_case(AppType::Integer, "4x", Value::Null; "bad integer")]
    #[test_case(AppType::Float, "1.5", json!(1.5); "float")]
    #[test_case(AppType::Float, "?", Value::Null; "question mark")]
    #[test_case(AppType::String, ".", Value::Null; "dot")]
    #[test_case(AppType::Date, "2018-03-01", json!("2018-03-01"); "date without assign")]
    fn test_convert_value(app_type: AppType, raw: &str, expected: Value) {
        let attr = attribute(app_type);
        assert_eq!(convert_value("T", &attr, raw, FilterFlags::default()), expected);
    }

    #[test]
    fn test_assign_dates() {
        let flags = FilterFlags {
            assign_dates: true,
            ..Default::default()
        };
        let attr = attribute(AppType::Date);
        assert_eq!(
            convert_value("T", &attr, "2018-03-01", flags),
            json!("2018-03-01T00:00:00Z")
        );
        assert_eq!(
            convert_value("T", &attribute(AppType::DateTime), "2018-03-01:12:30:00", flags),
            json!("2018-03-01T12:30:00Z")
        );
        assert_eq!(convert_value("T", &attr, "soon", flags), json!("soon"));
    }

    #[test]
    fn test_convert_iterables() {
        let mut attr = attribute(AppType::Integer);
        attr.iterable_delimiter = Some(",".to_string());
        let flags = FilterFlags {
            convert_iterables: true,
            ..Default::default()
        };
        assert_eq!(convert_value("T", &attr, "1, 2,3", flags), json!([1, 2, 3]));
        assert_eq!(
            convert_value("T", &attr, "1,2", FilterFlags::default()),
            Value::Null
        );
    }

    #[test]
    fn test_enumeration_normalized() {
        let mut attr = attribute(AppType::String);
        attr.enumeration = vec!["non-polymer".to_string()];
        assert_eq!(
            convert_value("T", &attr, "NON-POLYMER", FilterFlags::default()),
            json!("non-polymer")
        );
    }

    #[test]
    fn test_filter_flags_parse() {
        let flags: FilterFlags = "drop-empty-attributes|drop_empty_tables".parse().unwrap();
        assert!(flags.drop_empty_attributes);
        assert!(flags.drop_empty_tables);
        assert!(!flags.assign_dates);
        assert_eq!(flags.to_string(), "drop-empty-attributes|drop-empty-tables");

        assert!("".parse::<FilterFlags>().unwrap() == FilterFlags::default());
        assert!("drop-everything".parse::<FilterFlags>().is_err());
    }
}
