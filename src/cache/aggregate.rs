//! Server-side aggregation cache.
//!
//! Assembles every non-content domain into one [`ContentIndex`] snapshot for
//! the text-response helper and serves it until the TTL lapses. Created once at
//! process start; dropping it discards the snapshot.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use metrics::{counter, histogram};
use serde::Serialize;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, error, info, instrument, warn};

use crate::application::repos::ContentStore;
use crate::domain::entities::DomainEntry;
use crate::domain::types::Domain;

use super::config::CacheConfig;
use super::lock::{rw_read, rw_write};
use super::snapshot::CacheSnapshot;

const SOURCE: &str = "cache::aggregate";

const METRIC_INDEX_HIT: &str = "tidecast_index_hit_total";
const METRIC_INDEX_FILL: &str = "tidecast_index_fill_total";
const METRIC_INDEX_DOMAIN_FAILURE: &str = "tidecast_index_domain_failure_total";
const METRIC_INDEX_FILL_MS: &str = "tidecast_index_fill_ms";

/// Named buckets, one per domain.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ContentIndex {
    pub vessels: Vec<DomainEntry>,
    pub packages: Vec<DomainEntry>,
    pub itineraries: Vec<DomainEntry>,
    pub posts: Vec<DomainEntry>,
    pub faqs: Vec<DomainEntry>,
    /// Domains whose fetch failed during the fill that produced this index.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub unavailable: Vec<Domain>,
    /// Every configured domain failed; nothing here came from the store.
    #[serde(skip)]
    pub store_unavailable: bool,
}

impl ContentIndex {
    pub fn bucket(&self, domain: Domain) -> &[DomainEntry] {
        match domain {
            Domain::Vessels => &self.vessels,
            Domain::Packages => &self.packages,
            Domain::Itineraries => &self.itineraries,
            Domain::Posts => &self.posts,
            Domain::Faqs => &self.faqs,
        }
    }

    fn bucket_mut(&mut self, domain: Domain) -> &mut Vec<DomainEntry> {
        match domain {
            Domain::Vessels => &mut self.vessels,
            Domain::Packages => &mut self.packages,
            Domain::Itineraries => &mut self.itineraries,
            Domain::Posts => &mut self.posts,
            Domain::Faqs => &mut self.faqs,
        }
    }

    pub fn is_empty(&self) -> bool {
        Domain::ALL.iter().all(|domain| self.bucket(*domain).is_empty())
    }

    /// Plain-text context block for the text-response helper.
    pub fn render_context(&self) -> String {
        let mut out = String::new();
        for domain in Domain::ALL {
            let records = self.bucket(domain);
            if records.is_empty() {
                continue;
            }
            if !out.is_empty() {
                out.push('\n');
            }
            out.push_str(&format!("## {}\n", domain.heading()));
            for record in records {
                out.push_str(&format!("- {}\n", describe_record(record)));
            }
        }
        out
    }
}

fn describe_record(record: &DomainEntry) -> String {
    let field = |name: &str| {
        record
            .get(name)
            .and_then(serde_json::Value::as_str)
            .map(str::trim)
            .filter(|value| !value.is_empty())
    };

    if let Some(question) = field("question") {
        return match field("answer") {
            Some(answer) => format!("{question}: {answer}"),
            None => question.to_string(),
        };
    }

    let label = field("name").or_else(|| field("title"));
    match (label, field("description").or_else(|| field("summary"))) {
        (Some(label), Some(detail)) => format!("{label}: {detail}"),
        (Some(label), None) => label.to_string(),
        _ => record.to_string(),
    }
}

/// Time-boxed, single-flight cache over all configured domains.
pub struct AggregationCache {
    store: Arc<dyn ContentStore>,
    ttl: Duration,
    domains: Vec<Domain>,
    snapshot: RwLock<Option<CacheSnapshot<Arc<ContentIndex>>>>,
    /// Result of the most recent fill, handed to callers that queued behind it.
    fill: Mutex<Option<Arc<ContentIndex>>>,
    /// Completed fills; bumped while the fill lock is held.
    fill_generation: AtomicU64,
}

impl AggregationCache {
    pub fn new(store: Arc<dyn ContentStore>, ttl: Duration) -> Self {
        Self {
            store,
            ttl,
            domains: Domain::ALL.to_vec(),
            snapshot: RwLock::new(None),
            fill: Mutex::new(None),
            fill_generation: AtomicU64::new(0),
        }
    }

    pub fn from_config(store: Arc<dyn ContentStore>, config: &CacheConfig) -> Self {
        Self::new(store, config.index_ttl())
    }

    /// Restrict the fill to `domains`, fetched in the given order.
    pub fn with_domains(mut self, domains: impl IntoIterator<Item = Domain>) -> Self {
        self.domains = domains.into_iter().collect();
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Return the current snapshot, refilling it first when absent or expired.
    ///
    /// Concurrent callers that find the snapshot stale queue on the fill lock
    /// and take the result of the fill that finished while they waited, even
    /// when that fill found the store unavailable.
    #[instrument(skip(self))]
    pub async fn index_all(&self) -> Arc<ContentIndex> {
        if let Some(index) = self.fresh() {
            counter!(METRIC_INDEX_HIT).increment(1);
            return index;
        }

        let seen_generation = self.fill_generation.load(Ordering::Acquire);
        let mut last_fill = self.fill.lock().await;
        if let Some(index) = self.fresh() {
            debug!("Aggregation snapshot filled by a concurrent caller");
            counter!(METRIC_INDEX_HIT).increment(1);
            return index;
        }
        if self.fill_generation.load(Ordering::Acquire) != seen_generation
            && let Some(index) = last_fill.as_ref()
        {
            debug!("Reusing the outcome of the fill this caller waited on");
            return index.clone();
        }

        let started_at = Instant::now();
        let index = self.fetch_all().await;
        histogram!(METRIC_INDEX_FILL_MS).record(started_at.elapsed().as_secs_f64() * 1000.0);

        let index = if index.store_unavailable {
            error!(
                domains = self.domains.len(),
                "Content store unavailable: every domain failed"
            );
            self.last().unwrap_or_else(|| Arc::new(index))
        } else {
            self.store_snapshot(index)
        };

        *last_fill = Some(index.clone());
        self.fill_generation.fetch_add(1, Ordering::Release);
        index
    }

    fn store_snapshot(&self, index: ContentIndex) -> Arc<ContentIndex> {
        let index = Arc::new(index);
        *rw_write(&self.snapshot, SOURCE, "store_snapshot") = Some(CacheSnapshot::new(index.clone()));
        counter!(METRIC_INDEX_FILL).increment(1);
        info!(
            vessels = index.vessels.len(),
            packages = index.packages.len(),
            itineraries = index.itineraries.len(),
            posts = index.posts.len(),
            faqs = index.faqs.len(),
            unavailable = ?index.unavailable,
            "Aggregation snapshot refreshed"
        );
        index
    }

    /// Last stored snapshot, or an empty index; never touches the store.
    pub fn get_content(&self) -> Arc<ContentIndex> {
        self.last().unwrap_or_default()
    }

    /// Drop the snapshot so the next [`index_all`](Self::index_all) refills.
    pub fn invalidate(&self) {
        *rw_write(&self.snapshot, SOURCE, "invalidate") = None;
        debug!("Aggregation snapshot invalidated");
    }

    pub fn snapshot_age(&self) -> Option<Duration> {
        rw_read(&self.snapshot, SOURCE, "snapshot_age")
            .as_ref()
            .map(CacheSnapshot::age)
    }

    fn fresh(&self) -> Option<Arc<ContentIndex>> {
        rw_read(&self.snapshot, SOURCE, "fresh")
            .as_ref()
            .filter(|snapshot| snapshot.is_fresh(self.ttl))
            .map(|snapshot| snapshot.data.clone())
    }

    fn last(&self) -> Option<Arc<ContentIndex>> {
        rw_read(&self.snapshot, SOURCE, "last")
            .as_ref()
            .map(|snapshot| snapshot.data.clone())
    }

    async fn fetch_all(&self) -> ContentIndex {
        let mut index = ContentIndex::default();

        for domain in &self.domains {
            match self.store.fetch_domain(*domain).await {
                Ok(records) => *index.bucket_mut(*domain) = records,
                Err(err) => {
                    warn!(domain = %domain, error = %err, "Domain fetch failed; serving it empty");
                    counter!(METRIC_INDEX_DOMAIN_FAILURE, "domain" => domain.as_str())
                        .increment(1);
                    index.unavailable.push(*domain);
                }
            }
        }

        index.store_unavailable =
            !self.domains.is_empty() && index.unavailable.len() == self.domains.len();
        index
    }
}
