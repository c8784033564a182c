//! Repository traits describing access to the canonical content store.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::entities::{ContentEntry, DomainEntry, GroupedSection, group_by_section};
use crate::domain::types::Domain;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("content store unavailable: {0}")]
    Unavailable(String),
    #[error("content store returned an undecodable payload: {0}")]
    Decode(String),
}

impl StoreError {
    pub fn unavailable(err: impl std::fmt::Display) -> Self {
        Self::Unavailable(err.to_string())
    }

    pub fn decode(err: impl std::fmt::Display) -> Self {
        Self::Decode(err.to_string())
    }
}

/// Read access to the canonical store. Implementations only ever return
/// active entries.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Active entries for a page (optionally one section), ordered by
    /// `(section, order)`.
    async fn fetch_by_page(
        &self,
        page: &str,
        section: Option<&str>,
    ) -> Result<Vec<ContentEntry>, StoreError>;

    /// Active entries whose key is in `keys`.
    async fn fetch_by_keys(&self, keys: &[&str]) -> Result<Vec<ContentEntry>, StoreError>;

    /// Records of a non-content domain.
    async fn fetch_domain(&self, domain: Domain) -> Result<Vec<DomainEntry>, StoreError>;

    /// Grouped read form used by the named non-homepage pages.
    async fn fetch_grouped(&self, page: &str) -> Result<Vec<GroupedSection>, StoreError> {
        let entries = self.fetch_by_page(page, None).await?;
        Ok(group_by_section(&entries))
    }
}

/// The list-form read endpoint consumed by page caches.
///
/// Returns the raw JSON body: a well-behaved endpoint answers with an array of
/// entries, but callers must cope with anything else.
#[async_trait]
pub trait ContentSource: Send + Sync {
    async fn fetch_page(
        &self,
        page: &str,
        section: Option<&str>,
    ) -> Result<serde_json::Value, StoreError>;
}
