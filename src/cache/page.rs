//! Per-page content cache for rendered views.
//!
//! Holds the normalized blocks of one page scope. Reads never fail: every
//! degraded state resolves to the caller's fallback. Fetches are sequenced so
//! a late response can never overwrite a newer one.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use metrics::counter;
use serde_json::Value;
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

use crate::application::repos::ContentSource;
use crate::domain::entities::{ContentBlock, ContentEntry};

use super::lock::{rw_read, rw_write};
use super::snapshot::CacheSnapshot;

const SOURCE: &str = "cache::page";

const METRIC_PAGE_FETCH: &str = "tidecast_page_fetch_total";
const METRIC_PAGE_STALE_DISCARDED: &str = "tidecast_page_stale_discarded_total";

/// The page (and optional section) a cache is mounted for.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PageScope {
    pub page: String,
    pub section: Option<String>,
}

impl PageScope {
    pub fn new(page: impl Into<String>) -> Self {
        Self {
            page: page.into(),
            section: None,
        }
    }

    pub fn with_section(mut self, section: impl Into<String>) -> Self {
        self.section = Some(section.into());
        self
    }

    /// Unscoped signals concern every page.
    pub fn concerns(&self, page: Option<&str>) -> bool {
        page.is_none_or(|page| page == self.page)
    }
}

#[derive(Debug)]
enum PageState {
    Empty,
    Ready(CacheSnapshot<Arc<Vec<ContentBlock>>>),
    Malformed { reason: String },
}

#[derive(Debug)]
struct Slot {
    state: PageState,
    applied_seq: u64,
}

/// Result of one [`PageCache::fetch_content`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The response was the newest seen and replaced the cached blocks.
    Applied { sequence: u64, blocks: usize },
    /// A newer response had already been applied; this one was dropped.
    Discarded { sequence: u64, latest: u64 },
    /// The body was not a list; the cache now serves fallbacks.
    Malformed { sequence: u64 },
    /// The read failed; the previous blocks are kept.
    Failed { sequence: u64 },
}

impl FetchOutcome {
    pub fn sequence(&self) -> u64 {
        match self {
            FetchOutcome::Applied { sequence, .. }
            | FetchOutcome::Discarded { sequence, .. }
            | FetchOutcome::Malformed { sequence }
            | FetchOutcome::Failed { sequence } => *sequence,
        }
    }
}

pub struct PageCache {
    source: Arc<dyn ContentSource>,
    scope: PageScope,
    slot: RwLock<Slot>,
    sequence: AtomicU64,
    fetches: AtomicU64,
    applied: watch::Sender<u64>,
}

impl PageCache {
    pub fn new(source: Arc<dyn ContentSource>, scope: PageScope) -> Self {
        Self {
            source,
            scope,
            slot: RwLock::new(Slot {
                state: PageState::Empty,
                applied_seq: 0,
            }),
            sequence: AtomicU64::new(0),
            fetches: AtomicU64::new(0),
            applied: watch::channel(0).0,
        }
    }

    pub fn scope(&self) -> &PageScope {
        &self.scope
    }

    /// Read the page scope from the source and apply it if it is still the
    /// newest response.
    #[instrument(skip(self), fields(page = %self.scope.page, section = ?self.scope.section))]
    pub async fn fetch_content(&self) -> FetchOutcome {
        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        self.fetches.fetch_add(1, Ordering::Relaxed);
        counter!(METRIC_PAGE_FETCH, "page" => self.scope.page.clone()).increment(1);

        let body = match self
            .source
            .fetch_page(&self.scope.page, self.scope.section.as_deref())
            .await
        {
            Ok(body) => body,
            Err(err) => {
                warn!(sequence, error = %err, "Page fetch failed; keeping last-known-good content");
                return FetchOutcome::Failed { sequence };
            }
        };

        let normalized = normalize(body);

        let mut slot = rw_write(&self.slot, SOURCE, "fetch_content");
        if sequence <= slot.applied_seq {
            counter!(METRIC_PAGE_STALE_DISCARDED, "page" => self.scope.page.clone()).increment(1);
            debug!(
                sequence,
                latest = slot.applied_seq,
                "Discarding out-of-order page response"
            );
            return FetchOutcome::Discarded {
                sequence,
                latest: slot.applied_seq,
            };
        }
        slot.applied_seq = sequence;
        self.applied.send_replace(sequence);

        match normalized {
            Ok(blocks) => {
                let count = blocks.len();
                slot.state = PageState::Ready(CacheSnapshot::new(Arc::new(blocks)));
                info!(sequence, blocks = count, "Page content applied");
                FetchOutcome::Applied {
                    sequence,
                    blocks: count,
                }
            }
            Err(reason) => {
                warn!(sequence, %reason, "Page endpoint returned a malformed body");
                slot.state = PageState::Malformed { reason };
                FetchOutcome::Malformed { sequence }
            }
        }
    }

    /// Resolve `key` to text, then media reference, then `fallback`.
    ///
    /// Never fails; an empty or malformed cache yields `fallback`.
    pub fn get_content(&self, key: &str, fallback: &str) -> String {
        let slot = rw_read(&self.slot, SOURCE, "get_content");
        match &slot.state {
            PageState::Ready(snapshot) => match snapshot.data.iter().find(|block| block.key == key)
            {
                Some(block) => block.resolve_or(fallback).to_string(),
                None => {
                    debug!(key, page = %self.scope.page, "Content key not cached; using fallback");
                    fallback.to_string()
                }
            },
            PageState::Malformed { reason } => {
                warn!(key, page = %self.scope.page, %reason, "Page cache malformed; using fallback");
                fallback.to_string()
            }
            PageState::Empty => {
                debug!(key, page = %self.scope.page, "Page cache empty; using fallback");
                fallback.to_string()
            }
        }
    }

    pub fn get_content_block(&self, key: &str) -> Option<ContentBlock> {
        let slot = rw_read(&self.slot, SOURCE, "get_content_block");
        match &slot.state {
            PageState::Ready(snapshot) => {
                snapshot.data.iter().find(|block| block.key == key).cloned()
            }
            PageState::Empty | PageState::Malformed { .. } => None,
        }
    }

    /// Currently cached blocks; empty unless a list has been applied.
    pub fn blocks(&self) -> Arc<Vec<ContentBlock>> {
        let slot = rw_read(&self.slot, SOURCE, "blocks");
        match &slot.state {
            PageState::Ready(snapshot) => snapshot.data.clone(),
            PageState::Empty | PageState::Malformed { .. } => Arc::default(),
        }
    }

    pub fn is_malformed(&self) -> bool {
        matches!(
            rw_read(&self.slot, SOURCE, "is_malformed").state,
            PageState::Malformed { .. }
        )
    }

    /// Sequence number of the response currently applied, `0` before any.
    pub fn applied_sequence(&self) -> u64 {
        rw_read(&self.slot, SOURCE, "applied_sequence").applied_seq
    }

    /// Receiver that observes the sequence number of every applied response.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.applied.subscribe()
    }

    /// Number of fetches issued so far.
    pub fn fetch_count(&self) -> u64 {
        self.fetches.load(Ordering::Relaxed)
    }
}

fn normalize(body: Value) -> Result<Vec<ContentBlock>, String> {
    let items = match body {
        Value::Array(items) => items,
        other => return Err(format!("expected a list of entries, got {}", kind_of(&other))),
    };

    let mut blocks = Vec::with_capacity(items.len());
    for item in items {
        match serde_json::from_value::<ContentEntry>(item) {
            Ok(entry) => {
                let key = entry.key.clone();
                match ContentBlock::from_entry(entry) {
                    Some(block) => blocks.push(block),
                    None => debug!(%key, "Dropping inactive entry"),
                }
            }
            Err(err) => warn!(error = %err, "Dropping undecodable entry"),
        }
    }
    Ok(blocks)
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}
