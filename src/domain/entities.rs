//! Domain entities mirrored from the canonical content store.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::domain::types::ContentType;

/// Opaque record from a non-content domain (vessels, packages, ...).
pub type DomainEntry = serde_json::Value;

/// One editable, key-addressed unit of site content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "WireEntry")]
pub struct ContentEntry {
    pub key: String,
    pub title: String,
    pub content: Option<String>,
    pub media_url: Option<String>,
    pub content_type: ContentType,
    pub page: String,
    pub section: String,
    pub order: i32,
    pub is_active: bool,
    #[serde(with = "time::serde::rfc3339::option")]
    pub created_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub updated_at: Option<OffsetDateTime>,
}

impl ContentEntry {
    /// First non-empty value along the entry's part of the fallback chain:
    /// text content, then media reference. Inactive entries resolve to nothing.
    pub fn resolved_value(&self) -> Option<&str> {
        if !self.is_active {
            return None;
        }
        non_empty(self.content.as_deref()).or_else(|| non_empty(self.media_url.as_deref()))
    }
}

/// Accepts every field spelling the read endpoints have used for an entry.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireEntry {
    key: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    value: Option<String>,
    #[serde(default)]
    media_url: Option<String>,
    #[serde(default)]
    image_url: Option<String>,
    #[serde(default)]
    video_url: Option<String>,
    #[serde(default)]
    content_type: Option<String>,
    #[serde(default, rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    page: String,
    #[serde(default)]
    section: Option<String>,
    #[serde(default)]
    order: i32,
    #[serde(default = "default_active")]
    is_active: bool,
    #[serde(default, with = "time::serde::rfc3339::option")]
    created_at: Option<OffsetDateTime>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    updated_at: Option<OffsetDateTime>,
}

fn default_active() -> bool {
    true
}

impl From<WireEntry> for ContentEntry {
    fn from(wire: WireEntry) -> Self {
        let content_type = wire
            .content_type
            .or(wire.kind)
            .and_then(|raw| ContentType::try_from(raw.as_str()).ok())
            .unwrap_or_default();

        Self {
            key: wire.key,
            title: wire.title,
            content: wire.content.or(wire.value),
            media_url: wire.media_url.or(wire.image_url).or(wire.video_url),
            content_type,
            page: wire.page,
            section: wire.section.unwrap_or_default(),
            order: wire.order,
            is_active: wire.is_active,
            created_at: wire.created_at,
            updated_at: wire.updated_at,
        }
    }
}

/// Entry normalized for rendered views: `content` already resolved.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentBlock {
    pub key: String,
    pub title: String,
    /// Text, else media reference, else empty.
    pub content: String,
    pub text: Option<String>,
    pub media_url: Option<String>,
    pub content_type: ContentType,
    pub section: String,
    pub order: i32,
}

impl ContentBlock {
    /// Normalize an entry; inactive entries have no block.
    pub fn from_entry(entry: ContentEntry) -> Option<Self> {
        if !entry.is_active {
            return None;
        }
        let content = entry.resolved_value().unwrap_or_default().to_string();
        Some(Self {
            key: entry.key,
            title: entry.title,
            content,
            text: entry.content,
            media_url: entry.media_url,
            content_type: entry.content_type,
            section: entry.section,
            order: entry.order,
        })
    }

    /// Text, then media reference, then `fallback`.
    pub fn resolve_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        non_empty(self.text.as_deref())
            .or_else(|| non_empty(self.media_url.as_deref()))
            .unwrap_or(fallback)
    }
}

/// One section of the grouped read form.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupedSection {
    pub section: String,
    pub fields: Vec<GroupedField>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupedField {
    pub key: String,
    pub label: String,
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(rename = "type")]
    pub field_type: ContentType,
}

/// Group entries by section, keeping first-appearance order of sections and
/// the incoming order of fields.
pub fn group_by_section(entries: &[ContentEntry]) -> Vec<GroupedSection> {
    let mut groups: Vec<GroupedSection> = Vec::new();

    for entry in entries.iter().filter(|entry| entry.is_active) {
        let value = entry.resolved_value().unwrap_or_default().to_string();
        let placeholder = value.is_empty().then(|| entry.title.clone());
        let field = GroupedField {
            key: entry.key.clone(),
            label: entry.title.clone(),
            value,
            placeholder,
            field_type: entry.content_type,
        };

        match groups
            .iter_mut()
            .find(|group| group.section == entry.section)
        {
            Some(group) => group.fields.push(field),
            None => groups.push(GroupedSection {
                section: entry.section.clone(),
                fields: vec![field],
            }),
        }
    }

    groups
}

pub(crate) fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|candidate| !candidate.trim().is_empty())
}
