//! In-process content store.
//!
//! Backs offline generator runs and the test suites. Every read is counted so
//! callers can assert how often the store was actually consulted.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::application::repos::{ContentSource, ContentStore, StoreError};
use crate::domain::entities::{ContentEntry, DomainEntry};
use crate::domain::types::Domain;

use super::error::InfraError;

/// On-disk seed: `{ "entries": [...], "domains": { "vessels": [...], ... } }`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SeedFile {
    pub entries: Vec<ContentEntry>,
    pub domains: BTreeMap<String, Vec<DomainEntry>>,
}

#[derive(Debug, Default)]
struct CallCounters {
    by_page: AtomicUsize,
    by_keys: AtomicUsize,
    domain: AtomicUsize,
}

#[derive(Debug, Default)]
pub struct InMemoryContentStore {
    entries: Mutex<Vec<ContentEntry>>,
    domains: Mutex<BTreeMap<Domain, Vec<DomainEntry>>>,
    failing: Mutex<HashSet<Domain>>,
    unavailable: AtomicBool,
    calls: CallCounters,
}

fn guard<T>(lock: &Mutex<T>) -> MutexGuard<'_, T> {
    lock.lock().unwrap_or_else(PoisonError::into_inner)
}

impl InMemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_seed(seed: SeedFile) -> Result<Self, InfraError> {
        let store = Self::new();
        for (name, records) in seed.domains {
            let domain = Domain::try_from(name.as_str()).map_err(|_| {
                InfraError::configuration(format!("unknown domain `{name}` in seed file"))
            })?;
            store.set_domain(domain, records);
        }
        *guard(&store.entries) = seed.entries;
        Ok(store)
    }

    pub async fn load_seed(path: &Path) -> Result<Self, InfraError> {
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|err| InfraError::seed(path, err.to_string()))?;
        let seed: SeedFile =
            serde_json::from_str(&raw).map_err(|err| InfraError::seed(path, err.to_string()))?;
        let store = Self::from_seed(seed).map_err(|err| InfraError::seed(path, err.to_string()))?;
        info!(
            path = %path.display(),
            entries = store.entry_count(),
            "Seeded in-memory content store"
        );
        Ok(store)
    }

    /// Insert or replace the entry with the same key.
    pub fn upsert(&self, entry: ContentEntry) {
        let mut entries = guard(&self.entries);
        match entries.iter_mut().find(|existing| existing.key == entry.key) {
            Some(existing) => *existing = entry,
            None => entries.push(entry),
        }
    }

    /// Flip `is_active` on `key`; returns whether the key exists.
    pub fn set_active(&self, key: &str, active: bool) -> bool {
        let mut entries = guard(&self.entries);
        match entries.iter_mut().find(|entry| entry.key == key) {
            Some(entry) => {
                entry.is_active = active;
                true
            }
            None => false,
        }
    }

    pub fn set_domain(&self, domain: Domain, records: Vec<DomainEntry>) {
        guard(&self.domains).insert(domain, records);
    }

    /// Make reads of `domain` fail until [`restore_domain`](Self::restore_domain).
    pub fn fail_domain(&self, domain: Domain) {
        guard(&self.failing).insert(domain);
    }

    pub fn restore_domain(&self, domain: Domain) {
        guard(&self.failing).remove(&domain);
    }

    /// Make every read fail, as if the store were unreachable.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn entry_count(&self) -> usize {
        guard(&self.entries).len()
    }

    pub fn by_page_calls(&self) -> usize {
        self.calls.by_page.load(Ordering::SeqCst)
    }

    pub fn by_keys_calls(&self) -> usize {
        self.calls.by_keys.load(Ordering::SeqCst)
    }

    /// Domain reads across all domains, failed ones included.
    pub fn domain_calls(&self) -> usize {
        self.calls.domain.load(Ordering::SeqCst)
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(
                "in-memory store marked unavailable".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl ContentStore for InMemoryContentStore {
    async fn fetch_by_page(
        &self,
        page: &str,
        section: Option<&str>,
    ) -> Result<Vec<ContentEntry>, StoreError> {
        self.calls.by_page.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;

        let mut entries: Vec<ContentEntry> = guard(&self.entries)
            .iter()
            .filter(|entry| entry.is_active && entry.page == page)
            .filter(|entry| section.is_none_or(|section| entry.section == section))
            .cloned()
            .collect();
        entries.sort_by(|a, b| (&a.section, a.order).cmp(&(&b.section, b.order)));
        Ok(entries)
    }

    async fn fetch_by_keys(&self, keys: &[&str]) -> Result<Vec<ContentEntry>, StoreError> {
        self.calls.by_keys.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;

        let wanted: HashSet<&str> = keys.iter().copied().collect();
        Ok(guard(&self.entries)
            .iter()
            .filter(|entry| entry.is_active && wanted.contains(entry.key.as_str()))
            .cloned()
            .collect())
    }

    async fn fetch_domain(&self, domain: Domain) -> Result<Vec<DomainEntry>, StoreError> {
        self.calls.domain.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;

        if guard(&self.failing).contains(&domain) {
            return Err(StoreError::Unavailable(format!("{domain} table unreachable")));
        }
        Ok(guard(&self.domains).get(&domain).cloned().unwrap_or_default())
    }
}

/// Serves the list-form read endpoint straight from a [`ContentStore`].
pub struct StoreSource {
    store: Arc<dyn ContentStore>,
}

impl StoreSource {
    pub fn new(store: Arc<dyn ContentStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl ContentSource for StoreSource {
    async fn fetch_page(&self, page: &str, section: Option<&str>) -> Result<Value, StoreError> {
        let entries = self.store.fetch_by_page(page, section).await?;
        debug!(page, entries = entries.len(), "Serving page from store");
        serde_json::to_value(entries).map_err(StoreError::decode)
    }
}
