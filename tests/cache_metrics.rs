use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use metrics_util::debugging::DebuggingRecorder;
use serde_json::{Value, json};
use tempfile::TempDir;
use tidecast::application::repos::{ContentSource, StoreError};
use tidecast::artifacts::{ArtifactGenerator, ArtifactPaths};
use tidecast::cache::{
    AggregationCache, CacheConfig, FetchOutcome, PageCache, PageScope, RefreshListener,
    SENTINEL_STORAGE_KEY,
};
use tidecast::domain::types::Domain;
use tidecast::infra::memory::InMemoryContentStore;

/// The first request answers after the second one.
struct LaggingSource {
    calls: AtomicUsize,
}

#[async_trait]
impl ContentSource for LaggingSource {
    async fn fetch_page(&self, _page: &str, _section: Option<&str>) -> Result<Value, StoreError> {
        if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        Ok(json!([{ "key": "hero_title", "content": "Hi", "page": "homepage" }]))
    }
}

#[tokio::test(start_paused = true)]
async fn cache_paths_emit_expected_metric_keys() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    recorder
        .install()
        .expect("debug metrics recorder should install in this test process");

    // Aggregation fill, hit and a failing domain
    let store = Arc::new(InMemoryContentStore::new());
    store.fail_domain(Domain::Posts);
    let aggregation = AggregationCache::from_config(store.clone(), &CacheConfig::default());
    aggregation.index_all().await;
    aggregation.index_all().await;

    // Out-of-order page responses
    let cache = Arc::new(PageCache::new(
        Arc::new(LaggingSource {
            calls: AtomicUsize::new(0),
        }),
        PageScope::new("homepage"),
    ));
    let (late, early) = tokio::join!(cache.fetch_content(), cache.fetch_content());
    assert!(matches!(late, FetchOutcome::Discarded { sequence: 1, latest: 2 }));
    assert!(matches!(early, FetchOutcome::Applied { sequence: 2, .. }));

    // Coalesced signal burst
    let (trigger, listener) = RefreshListener::mount(CacheConfig::default(), cache.clone());
    trigger.storage_changed(SENTINEL_STORAGE_KEY);
    trigger.focus_regained();
    assert!(listener.consume().await.is_some());

    // A target that cannot be written
    let dir = TempDir::new().expect("tempdir");
    let paths = ArtifactPaths::under(dir.path());
    std::fs::create_dir_all(&paths.snapshot).expect("block snapshot path");
    let report = ArtifactGenerator::new(store, paths)
        .run()
        .await
        .expect("store readable");
    assert!(!report.is_success());

    let names: HashSet<String> = snapshotter
        .snapshot()
        .into_vec()
        .into_iter()
        .map(|(composite_key, _, _, _)| composite_key.key().name().to_string())
        .collect();

    let expected = [
        "tidecast_index_hit_total",
        "tidecast_index_fill_total",
        "tidecast_index_domain_failure_total",
        "tidecast_index_fill_ms",
        "tidecast_page_fetch_total",
        "tidecast_page_stale_discarded_total",
        "tidecast_signal_coalesced_total",
        "tidecast_refresh_ms",
        "tidecast_artifact_failure_total",
    ];

    for metric in expected {
        assert!(names.contains(metric), "missing metric: {metric}");
    }
}
