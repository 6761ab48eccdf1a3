//! Field values and records
//!
//! A record is one row of a backing table: a set of scalar fields plus the key
//! of the table that owns it.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;

/// A scalar value stored in a record field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// Null/missing value
    Null,

    /// Boolean value
    Boolean(bool),

    /// 64-bit signed integer
    Integer(i64),

    /// 64-bit floating point
    Float(f64),

    /// UTF-8 string
    String(String),
}

impl FieldValue {
    /// Returns true if the value is null
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// Try to get as string reference
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Text used for substring matching; `None` for null fields, which never match
    pub fn search_text(&self) -> Option<Cow<'_, str>> {
        match self {
            FieldValue::Null => None,
            FieldValue::String(s) => Some(Cow::Borrowed(s)),
            other => Some(Cow::Owned(other.to_string())),
        }
    }

    /// Get the type name of this value
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldValue::Null => "null",
            FieldValue::Boolean(_) => "boolean",
            FieldValue::Integer(_) => "integer",
            FieldValue::Float(_) => "float",
            FieldValue::String(_) => "string",
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Null => Ok(()),
            FieldValue::Boolean(b) => write!(f, "{}", b),
            FieldValue::Integer(i) => write!(f, "{}", i),
            FieldValue::Float(v) => write!(f, "{}", v),
            FieldValue::String(s) => f.write_str(s),
        }
    }
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        FieldValue::Boolean(v)
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::Integer(v)
    }
}

impl From<i32> for FieldValue {
    fn from(v: i32) -> Self {
        FieldValue::Integer(v as i64)
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::Float(v)
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        FieldValue::String(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::String(v.to_string())
    }
}

/// One row of a backing table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Identifier of the table this row belongs to
    #[serde(rename = "tableKey")]
    pub table_key: String,

    /// Column name to value
    #[serde(flatten)]
    pub fields: BTreeMap<String, FieldValue>,
}

impl Record {
    /// Create an empty record owned by `table_key`
    pub fn new<S: Into<String>>(table_key: S) -> Self {
        Self {
            table_key: table_key.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Builder: add a field
    pub fn with<K: Into<String>, V: Into<FieldValue>>(mut self, key: K, value: V) -> Self {
        self.set(key, value);
        self
    }

    /// Set a field value
    pub fn set<K: Into<String>, V: Into<FieldValue>>(&mut self, key: K, value: V) {
        self.fields.insert(key.into(), value.into());
    }

    /// Get a field value
    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key)
    }

    /// Iterate over all field values
    pub fn values(&self) -> impl Iterator<Item = &FieldValue> {
        self.fields.values()
    }

    /// Render the given columns as display strings, empty for missing or null fields
    pub fn project(&self, columns: &[String]) -> Vec<String> {
        columns
            .iter()
            .map(|col| self.get(col).map(|v| v.to_string()).unwrap_or_default())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_text() {
        assert_eq!(FieldValue::Null.search_text(), None);
        assert_eq!(FieldValue::from(42).search_text().as_deref(), Some("42"));
        assert_eq!(FieldValue::from(true).search_text().as_deref(), Some("true"));
        assert_eq!(
            FieldValue::from("Apex Corp").search_text().as_deref(),
            Some("Apex Corp")
        );
    }

    #[test]
    fn test_record_json_shape() {
        let json = r#"{"tableKey":"t1","company":"Apex Corp","employees":120,"public":false,"note":null}"#;
        let record: Record = serde_json::from_str(json).unwrap();

        assert_eq!(record.table_key, "t1");
        assert_eq!(record.get("company"), Some(&FieldValue::from("Apex Corp")));
        assert_eq!(record.get("employees"), Some(&FieldValue::Integer(120)));
        assert_eq!(record.get("public"), Some(&FieldValue::Boolean(false)));
        assert_eq!(record.get("note"), Some(&FieldValue::Null));
        assert!(record.get("tableKey").is_none());
    }

    #[test]
    fn test_project() {
        let record = Record::new("t1")
            .with("company", "Nova Inc")
            .with("revenue", 1.5)
            .with("note", FieldValue::Null);

        let row = record.project(&[
            "company".to_string(),
            "revenue".to_string(),
            "note".to_string(),
            "missing".to_string(),
        ]);
        assert_eq!(row, vec!["Nova Inc", "1.5", "", ""]);
    }
}
