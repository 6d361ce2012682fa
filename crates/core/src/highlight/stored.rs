//! Highlight sets as they are persisted.
//!
//! Records written by older clients hold the highlighted keys either as a JSON array, as a
//! JSON array encoded inside a string, or as a raw comma/space separated string. The shape is
//! decided once, when the record is decoded, and consumers only ever see a normalised key set.

use crate::lab::normalize;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::collections::BTreeSet;

/// Persisted highlight data, decoded at the storage boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoredHighlights {
    StructuredList(Vec<String>),
    LegacyRawString(String),
}

impl Default for StoredHighlights {
    fn default() -> Self {
        StoredHighlights::StructuredList(Vec::new())
    }
}

impl StoredHighlights {
    pub fn from_keys<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        StoredHighlights::StructuredList(keys.into_iter().map(Into::into).collect())
    }

    /// Decodes a textual highlight value.
    ///
    /// Text starting with `[` must be a JSON array of strings and decodes to an empty set when
    /// it is not. A JSON string scalar is unwrapped and decoded again. Other text is kept as a
    /// legacy delimited string.
    pub fn from_text(text: &str) -> Self {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Self::default();
        }

        if trimmed.starts_with('"') {
            if let Ok(inner) = serde_json::from_str::<String>(trimmed) {
                return Self::from_text(&inner);
            }
        }

        if trimmed.starts_with('[') {
            return match serde_json::from_str::<Vec<String>>(trimmed) {
                Ok(keys) => StoredHighlights::StructuredList(keys),
                Err(e) => {
                    tracing::warn!(error = %e, "malformed highlight data; treating as empty");
                    Self::default()
                }
            };
        }

        StoredHighlights::LegacyRawString(trimmed.to_owned())
    }

    /// Decodes any JSON value found in the highlight field of a record.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Null => Self::default(),
            Value::String(text) => Self::from_text(&text),
            Value::Array(items) => StoredHighlights::StructuredList(
                items
                    .into_iter()
                    .filter_map(|item| match item {
                        Value::String(s) => Some(s),
                        other => {
                            tracing::warn!(entry = %other, "ignoring non-text highlight entry");
                            None
                        }
                    })
                    .collect(),
            ),
            other => {
                tracing::warn!(value = %other, "malformed highlight data; treating as empty");
                Self::default()
            }
        }
    }

    /// The normalised, de-duplicated set of highlighted keys.
    pub fn keys(&self) -> BTreeSet<String> {
        match self {
            StoredHighlights::StructuredList(keys) => normalize_all(keys.iter().map(String::as_str)),
            StoredHighlights::LegacyRawString(raw) => normalize_all(
                raw.split(|c: char| c == ',' || c.is_whitespace())
                    .filter(|s| !s.is_empty()),
            ),
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.keys().contains(&normalize(key))
    }

    pub fn is_empty(&self) -> bool {
        self.keys().is_empty()
    }
}

pub(crate) fn normalize_all<'a>(raw: impl Iterator<Item = &'a str>) -> BTreeSet<String> {
    raw.map(normalize).filter(|k| !k.is_empty()).collect()
}

impl Serialize for StoredHighlights {
    /// Always written as a JSON array of canonical keys.
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.keys())
    }
}

impl<'de> Deserialize<'de> for StoredHighlights {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(Self::from_value(Value::deserialize(deserializer)?))
    }
}

/// Highlight keys supplied by a caller: a key collection or a text value in any persisted
/// format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HighlightInput {
    Keys(Vec<String>),
    Text(String),
}

impl HighlightInput {
    pub fn normalized(&self) -> BTreeSet<String> {
        match self {
            HighlightInput::Keys(keys) => normalize_all(keys.iter().map(String::as_str)),
            HighlightInput::Text(text) => StoredHighlights::from_text(text).keys(),
        }
    }
}

impl From<Vec<String>> for HighlightInput {
    fn from(keys: Vec<String>) -> Self {
        HighlightInput::Keys(keys)
    }
}

impl From<Vec<&str>> for HighlightInput {
    fn from(keys: Vec<&str>) -> Self {
        HighlightInput::Keys(keys.into_iter().map(str::to_owned).collect())
    }
}

impl From<BTreeSet<String>> for HighlightInput {
    fn from(keys: BTreeSet<String>) -> Self {
        HighlightInput::Keys(keys.into_iter().collect())
    }
}

impl From<&str> for HighlightInput {
    fn from(text: &str) -> Self {
        HighlightInput::Text(text.to_owned())
    }
}

impl From<&StoredHighlights> for HighlightInput {
    fn from(stored: &StoredHighlights) -> Self {
        HighlightInput::Keys(stored.keys().into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn set(keys: &[&str]) -> BTreeSet<String> {
        keys.iter().map(|k| k.to_string()).collect()
    }

    #[test]
    fn test_decode_structured_array() {
        let stored: StoredHighlights = serde_json::from_value(json!(["CT", "HbA1c", "ct"])).unwrap();
        assert_eq!(stored.keys(), set(&["ct", "hba1c"]));
    }

    #[test]
    fn test_decode_json_inside_string() {
        let stored: StoredHighlights = serde_json::from_value(json!("[\"COL\",\"gluc\"]")).unwrap();
        assert!(matches!(stored, StoredHighlights::StructuredList(_)));
        assert_eq!(stored.keys(), set(&["ct", "gluc"]));
    }

    #[test]
    fn test_decode_legacy_delimited_string() {
        let stored: StoredHighlights = serde_json::from_value(json!("tsh, T4L  hb")).unwrap();
        assert!(matches!(stored, StoredHighlights::LegacyRawString(_)));
        assert_eq!(stored.keys(), set(&["hb", "t4l", "tsh"]));
    }

    #[test]
    fn test_decode_string_scalar_text() {
        let stored = StoredHighlights::from_text("\"ct\"");
        assert_eq!(stored.keys(), set(&["ct"]));

        let stored = StoredHighlights::from_text("\"COL, hba1c\"");
        assert_eq!(stored.keys(), set(&["ct", "hba1c"]));
    }

    #[test]
    fn test_malformed_values_decode_empty() {
        for value in [json!("[\"ct\", "), json!({"ct": true}), json!(42), json!(null)] {
            let stored: StoredHighlights = serde_json::from_value(value).unwrap();
            assert!(stored.is_empty());
        }
    }

    #[test]
    fn test_serialises_as_canonical_array() {
        let stored = StoredHighlights::LegacyRawString("COL,hba1c".into());
        assert_eq!(serde_json::to_value(&stored).unwrap(), json!(["ct", "hba1c"]));
    }

    #[test]
    fn test_input_text_and_keys_agree() {
        let from_text = HighlightInput::from("[\"VFS\", \"T4l\"]").normalized();
        let from_keys = HighlightInput::from(vec!["vfg", "t4l"]).normalized();
        assert_eq!(from_text, from_keys);
    }
}
