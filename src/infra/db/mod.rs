//! Postgres-backed content store.

mod util;

pub use util::map_sqlx_error;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::{
    FromRow,
    postgres::{PgPool, PgPoolOptions},
    query,
};
use time::OffsetDateTime;
use tracing::warn;

use crate::application::repos::{ContentStore, StoreError};
use crate::domain::entities::{ContentEntry, DomainEntry};
use crate::domain::types::{ContentType, Domain};

const ENTRY_COLUMNS: &str = r#"key, title, content, media_url, content_type, page, section,
       "order" AS sort_order, is_active, created_at, updated_at"#;

#[derive(FromRow)]
struct ContentEntryRow {
    key: String,
    title: String,
    content: Option<String>,
    media_url: Option<String>,
    content_type: String,
    page: String,
    section: Option<String>,
    sort_order: i32,
    is_active: bool,
    created_at: Option<OffsetDateTime>,
    updated_at: Option<OffsetDateTime>,
}

impl From<ContentEntryRow> for ContentEntry {
    fn from(row: ContentEntryRow) -> Self {
        let content_type = ContentType::try_from(row.content_type.as_str()).unwrap_or_else(|_| {
            warn!(key = %row.key, content_type = %row.content_type, "Unknown content type; treating as text");
            ContentType::default()
        });

        Self {
            key: row.key,
            title: row.title,
            content: row.content,
            media_url: row.media_url,
            content_type,
            page: row.page,
            section: row.section.unwrap_or_default(),
            order: row.sort_order,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(FromRow)]
struct DomainRow {
    record: serde_json::Value,
}

#[derive(Clone)]
pub struct PostgresContentStore {
    pool: Arc<PgPool>,
}

impl PostgresContentStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn connect(
        url: &str,
        max_connections: u32,
        acquire_timeout: Duration,
    ) -> Result<PgPool, sqlx::Error> {
        PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(acquire_timeout)
            .connect(url)
            .await
    }

    /// Round-trip a trivial query so a reachable-but-broken database fails
    /// at startup rather than on the first read.
    pub async fn health_check(&self) -> Result<(), StoreError> {
        query("SELECT 1")
            .execute(self.pool())
            .await
            .map(|_| ())
            .map_err(map_sqlx_error)
    }
}

#[async_trait]
impl ContentStore for PostgresContentStore {
    async fn fetch_by_page(
        &self,
        page: &str,
        section: Option<&str>,
    ) -> Result<Vec<ContentEntry>, StoreError> {
        let sql = format!(
            "SELECT {ENTRY_COLUMNS}
             FROM content_entries
             WHERE is_active
               AND page = $1
               AND ($2::text IS NULL OR section = $2)
             ORDER BY section, \"order\", key"
        );
        let rows = sqlx::query_as::<_, ContentEntryRow>(&sql)
            .bind(page)
            .bind(section)
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(ContentEntry::from).collect())
    }

    async fn fetch_by_keys(&self, keys: &[&str]) -> Result<Vec<ContentEntry>, StoreError> {
        let keys: Vec<String> = keys.iter().map(|key| key.to_string()).collect();
        let sql = format!(
            "SELECT {ENTRY_COLUMNS}
             FROM content_entries
             WHERE is_active
               AND key = ANY($1)
             ORDER BY key"
        );
        let rows = sqlx::query_as::<_, ContentEntryRow>(&sql)
            .bind(keys)
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(ContentEntry::from).collect())
    }

    async fn fetch_domain(&self, domain: Domain) -> Result<Vec<DomainEntry>, StoreError> {
        // Table names come from the closed `Domain` set, never from input.
        let sql = format!("SELECT to_jsonb(t) AS record FROM {} t", domain.as_str());
        let rows = sqlx::query_as::<_, DomainRow>(&sql)
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(|row| row.record).collect())
    }
}
