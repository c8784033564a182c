//! TTL, single-flight and failure-isolation behavior of the aggregation cache.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tidecast::application::repos::{ContentStore, StoreError};
use tidecast::cache::AggregationCache;
use tidecast::domain::entities::{ContentEntry, DomainEntry};
use tidecast::domain::types::Domain;
use tidecast::infra::memory::InMemoryContentStore;

const TTL: Duration = Duration::from_secs(300);

fn seeded_store() -> Arc<InMemoryContentStore> {
    let store = InMemoryContentStore::new();
    store.set_domain(
        Domain::Vessels,
        vec![json!({ "name": "Aurora", "description": "Catamaran for 12" })],
    );
    store.set_domain(
        Domain::Packages,
        vec![json!({ "title": "Sunset cruise", "summary": "Three hours" })],
    );
    store.set_domain(Domain::Itineraries, vec![json!({ "name": "Outer islands" })]);
    store.set_domain(Domain::Posts, vec![json!({ "title": "Season opening" })]);
    store.set_domain(
        Domain::Faqs,
        vec![json!({ "question": "Is lunch included?", "answer": "Yes" })],
    );
    Arc::new(store)
}

/// Delegates to the in-memory store but yields on every domain read, so
/// concurrent fills really interleave.
struct SlowStore {
    inner: Arc<InMemoryContentStore>,
}

#[async_trait]
impl ContentStore for SlowStore {
    async fn fetch_by_page(
        &self,
        page: &str,
        section: Option<&str>,
    ) -> Result<Vec<ContentEntry>, StoreError> {
        self.inner.fetch_by_page(page, section).await
    }

    async fn fetch_by_keys(&self, keys: &[&str]) -> Result<Vec<ContentEntry>, StoreError> {
        self.inner.fetch_by_keys(keys).await
    }

    async fn fetch_domain(&self, domain: Domain) -> Result<Vec<DomainEntry>, StoreError> {
        tokio::time::sleep(Duration::from_millis(20)).await;
        self.inner.fetch_domain(domain).await
    }
}

#[tokio::test(start_paused = true)]
async fn second_call_within_ttl_reuses_snapshot() {
    let store = seeded_store();
    let cache = AggregationCache::new(store.clone(), TTL);

    let first = cache.index_all().await;
    let second = cache.index_all().await;

    assert_eq!(store.domain_calls(), Domain::ALL.len());
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(first.vessels.len(), 1);
    assert_eq!(first.faqs[0]["answer"], "Yes");
}

#[tokio::test(start_paused = true)]
async fn expired_snapshot_is_refilled() {
    let store = seeded_store();
    let cache = AggregationCache::new(store.clone(), TTL);

    cache.index_all().await;
    tokio::time::advance(TTL + Duration::from_secs(1)).await;
    cache.index_all().await;

    assert_eq!(store.domain_calls(), 2 * Domain::ALL.len());
}

#[tokio::test(start_paused = true)]
async fn invalidate_forces_a_refill() {
    let store = seeded_store();
    let cache = AggregationCache::new(store.clone(), TTL);

    cache.index_all().await;
    cache.invalidate();
    assert!(cache.snapshot_age().is_none());
    cache.index_all().await;

    assert_eq!(store.domain_calls(), 2 * Domain::ALL.len());
}

#[tokio::test(start_paused = true)]
async fn concurrent_callers_share_one_fill() {
    let store = seeded_store();
    let cache = AggregationCache::new(
        Arc::new(SlowStore {
            inner: store.clone(),
        }),
        TTL,
    );

    let (a, b, c) = tokio::join!(cache.index_all(), cache.index_all(), cache.index_all());

    assert_eq!(store.domain_calls(), Domain::ALL.len());
    assert!(Arc::ptr_eq(&a, &b));
    assert!(Arc::ptr_eq(&b, &c));
}

#[tokio::test(start_paused = true)]
async fn concurrent_callers_share_one_fill_during_outage() {
    let store = seeded_store();
    store.set_unavailable(true);
    let cache = AggregationCache::new(
        Arc::new(SlowStore {
            inner: store.clone(),
        }),
        TTL,
    );

    let (a, b, c) = tokio::join!(cache.index_all(), cache.index_all(), cache.index_all());

    assert_eq!(store.domain_calls(), Domain::ALL.len());
    assert!(a.store_unavailable && b.store_unavailable && c.store_unavailable);
    assert!(Arc::ptr_eq(&a, &b));
    assert!(Arc::ptr_eq(&b, &c));

    // Nothing was cached, so the next caller retries.
    store.set_unavailable(false);
    let recovered = cache.index_all().await;
    assert_eq!(store.domain_calls(), 2 * Domain::ALL.len());
    assert!(!recovered.store_unavailable);
    assert_eq!(recovered.vessels.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn failing_domain_is_served_empty() {
    let store = seeded_store();
    store.fail_domain(Domain::Faqs);
    let cache = AggregationCache::new(store.clone(), TTL);

    let index = cache.index_all().await;

    assert!(index.faqs.is_empty());
    assert_eq!(index.unavailable, vec![Domain::Faqs]);
    assert!(!index.store_unavailable);
    assert_eq!(index.vessels.len(), 1);
    assert_eq!(index.packages.len(), 1);
    assert_eq!(index.itineraries.len(), 1);
    assert_eq!(index.posts.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn total_outage_keeps_previous_snapshot() {
    let store = seeded_store();
    let cache = AggregationCache::new(store.clone(), TTL);

    let good = cache.index_all().await;
    store.set_unavailable(true);
    tokio::time::advance(TTL + Duration::from_secs(1)).await;

    let during_outage = cache.index_all().await;
    assert!(Arc::ptr_eq(&good, &during_outage));
    assert_eq!(store.domain_calls(), 2 * Domain::ALL.len());
}

#[tokio::test(start_paused = true)]
async fn total_outage_without_snapshot_reports_store_unavailable() {
    let store = seeded_store();
    store.set_unavailable(true);
    let cache = AggregationCache::new(store.clone(), TTL);

    let index = cache.index_all().await;

    assert!(index.store_unavailable);
    assert!(index.is_empty());
    assert_eq!(index.unavailable.len(), Domain::ALL.len());
    assert!(cache.snapshot_age().is_none());
}

#[tokio::test(start_paused = true)]
async fn restricted_domains_are_the_only_ones_read() {
    let store = seeded_store();
    let cache =
        AggregationCache::new(store.clone(), TTL).with_domains([Domain::Vessels, Domain::Faqs]);

    let index = cache.index_all().await;

    assert_eq!(store.domain_calls(), 2);
    assert!(index.packages.is_empty());
    assert_eq!(index.vessels.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn context_lists_every_populated_domain() {
    let store = seeded_store();
    let cache = AggregationCache::new(store, TTL);

    let context = cache.index_all().await.render_context();

    assert!(context.contains("- Aurora: Catamaran for 12"));
    assert!(context.contains("- Sunset cruise: Three hours"));
    assert!(context.contains("- Is lunch included?: Yes"));
}
