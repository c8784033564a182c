use std::collections::BTreeMap;

use serde::Serialize;

use crate::domain::entities::ContentEntry;
use crate::domain::types::ContentType;

use super::allowlist::Field;

/// Resolved value of one allow-listed key.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectedValue {
    pub value: String,
    #[serde(rename = "type")]
    pub content_type: ContentType,
    pub title: String,
}

/// Key-ordered projection of the allow-listed entries.
///
/// Ordering by key keeps every serialized target byte-stable across runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ContentMap(BTreeMap<String, ProjectedValue>);

impl ContentMap {
    /// Project entries through the fallback chain (text, then media).
    /// Inactive entries and entries without a value are left out.
    pub fn from_entries(entries: &[ContentEntry]) -> Self {
        let map = entries
            .iter()
            .filter_map(|entry| {
                let value = entry.resolved_value()?;
                Some((
                    entry.key.clone(),
                    ProjectedValue {
                        value: value.to_string(),
                        content_type: entry.content_type,
                        title: entry.title.clone(),
                    },
                ))
            })
            .collect();
        Self(map)
    }

    pub fn get(&self, key: &str) -> Option<&ProjectedValue> {
        self.0.get(key)
    }

    pub fn value(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(|projected| projected.value.as_str())
    }

    /// Map value for the field, else its hardcoded default.
    pub fn value_or_default(&self, field: &Field) -> &str {
        self.value(field.key).unwrap_or(field.default)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
