//! Signal-driven refresh of a mounted page cache, end to end against the
//! in-memory store.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tidecast::application::repos::ContentStore;
use tidecast::cache::{
    AppEvent, BroadcastChannel, CacheConfig, PageCache, PageScope, RefreshListener,
    SENTINEL_STORAGE_KEY, Signal, SignalTrigger,
};
use tidecast::domain::entities::ContentEntry;
use tidecast::infra::memory::{InMemoryContentStore, StoreSource};
use tokio::sync::watch;
use tokio::task::JoinHandle;

fn entry(value: serde_json::Value) -> ContentEntry {
    serde_json::from_value(value).expect("valid entry")
}

fn homepage_store() -> Arc<InMemoryContentStore> {
    let store = InMemoryContentStore::new();
    store.upsert(entry(json!({
        "key": "hero_video_title",
        "content": "Welcome",
        "page": "homepage",
        "section": "hero"
    })));
    store.upsert(entry(json!({
        "key": "hero_video",
        "mediaUrl": "/videos/reef.mp4",
        "contentType": "video",
        "page": "homepage",
        "section": "hero",
        "order": 1
    })));
    store.upsert(entry(json!({
        "key": "about_title",
        "content": "About us",
        "page": "about",
        "section": "intro"
    })));
    Arc::new(store)
}

struct Mounted {
    cache: Arc<PageCache>,
    trigger: SignalTrigger,
    applied: watch::Receiver<u64>,
    listener: JoinHandle<()>,
}

impl Mounted {
    async fn new(store: Arc<InMemoryContentStore>, page: &str) -> Self {
        let source = Arc::new(StoreSource::new(store as Arc<dyn ContentStore>));
        let cache = Arc::new(PageCache::new(source, PageScope::new(page)));
        let mut applied = cache.subscribe();
        cache.fetch_content().await;
        let _ = applied.borrow_and_update();

        let (trigger, listener) = RefreshListener::mount(CacheConfig::default(), cache.clone());
        Self {
            cache,
            trigger,
            applied,
            listener: listener.spawn(),
        }
    }

    async fn next_refresh(&mut self) -> u64 {
        self.applied.changed().await.expect("cache alive");
        *self.applied.borrow_and_update()
    }

    /// Let any pending debounce window elapse.
    async fn settle(&self) {
        tokio::time::sleep(Duration::from_secs(2)).await;
    }
}

impl Drop for Mounted {
    fn drop(&mut self) {
        self.listener.abort();
    }
}

#[tokio::test(start_paused = true)]
async fn sentinel_storage_change_refetches_once() {
    let mut mounted = Mounted::new(homepage_store(), "homepage").await;

    mounted.trigger.storage_changed(SENTINEL_STORAGE_KEY);
    assert_eq!(mounted.next_refresh().await, 2);
    mounted.settle().await;

    assert_eq!(mounted.cache.fetch_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn focus_regained_refetches_once() {
    let mut mounted = Mounted::new(homepage_store(), "homepage").await;

    mounted.trigger.focus_regained();
    assert_eq!(mounted.next_refresh().await, 2);
    mounted.settle().await;

    assert_eq!(mounted.cache.fetch_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn app_event_refetches_once() {
    let mut mounted = Mounted::new(homepage_store(), "homepage").await;

    mounted
        .trigger
        .app_event(AppEvent::ContentUpdated, Some("homepage"));
    assert_eq!(mounted.next_refresh().await, 2);
    mounted.settle().await;

    assert_eq!(mounted.cache.fetch_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn broadcast_refetches_once() {
    let mut mounted = Mounted::new(homepage_store(), "homepage").await;

    mounted
        .trigger
        .broadcast(BroadcastChannel::WebsiteRefresh, None);
    assert_eq!(mounted.next_refresh().await, 2);
    mounted.settle().await;

    assert_eq!(mounted.cache.fetch_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn burst_of_signals_coalesces_into_one_fetch() {
    let mut mounted = Mounted::new(homepage_store(), "homepage").await;

    mounted.trigger.storage_changed(SENTINEL_STORAGE_KEY);
    mounted.trigger.focus_regained();
    mounted
        .trigger
        .app_event(AppEvent::ContentRefresh, None);
    mounted
        .trigger
        .broadcast(BroadcastChannel::ContentUpdates, Some("homepage"));

    assert_eq!(mounted.next_refresh().await, 2);
    mounted.settle().await;

    assert_eq!(mounted.cache.fetch_count(), 2);
    assert!(mounted.trigger.queue().is_empty());
}

#[tokio::test(start_paused = true)]
async fn burst_larger_than_batch_limit_refetches_once() {
    let mut mounted = Mounted::new(homepage_store(), "homepage").await;
    let burst = CacheConfig::default().signal_batch_limit() * 2 + 50;

    for _ in 0..burst {
        mounted.trigger.focus_regained();
    }

    assert_eq!(mounted.next_refresh().await, 2);
    tokio::time::sleep(Duration::from_secs(5)).await;

    assert_eq!(mounted.cache.fetch_count(), 2);
    assert!(mounted.trigger.queue().is_empty());
}

#[tokio::test(start_paused = true)]
async fn unrelated_signals_do_not_refetch() {
    let mounted = Mounted::new(homepage_store(), "homepage").await;

    mounted.trigger.storage_changed("theme-preference");
    mounted
        .trigger
        .app_event(AppEvent::ContentUpdated, Some("about"));
    mounted
        .trigger
        .broadcast(BroadcastChannel::ContentUpdates, Some("about"));
    mounted.settle().await;

    assert_eq!(mounted.cache.fetch_count(), 1);
    assert!(!mounted.applied.has_changed().expect("cache alive"));
}

#[tokio::test(start_paused = true)]
async fn parsed_signal_lines_drive_refreshes() {
    let mut mounted = Mounted::new(homepage_store(), "homepage").await;

    let signal = Signal::parse("event content-updated homepage").expect("valid signal");
    mounted.trigger.publish(signal);

    assert_eq!(mounted.next_refresh().await, 2);
}

#[tokio::test(start_paused = true)]
async fn deactivated_entry_falls_back_after_refresh() {
    let store = homepage_store();
    let mut mounted = Mounted::new(store.clone(), "homepage").await;

    assert_eq!(
        mounted.cache.get_content("hero_video_title", "X"),
        "Welcome"
    );
    assert_eq!(
        mounted.cache.get_content("hero_video", "/fallback.mp4"),
        "/videos/reef.mp4"
    );

    assert!(store.set_active("hero_video_title", false));
    // Still the last-known-good value until a signal arrives.
    assert_eq!(
        mounted.cache.get_content("hero_video_title", "X"),
        "Welcome"
    );

    mounted.trigger.storage_changed(SENTINEL_STORAGE_KEY);
    mounted.next_refresh().await;

    assert_eq!(mounted.cache.get_content("hero_video_title", "X"), "X");
    assert!(mounted.cache.get_content_block("hero_video_title").is_none());
}

#[tokio::test(start_paused = true)]
async fn store_outage_keeps_last_known_good_content() {
    let store = homepage_store();
    let mounted = Mounted::new(store.clone(), "homepage").await;

    store.set_unavailable(true);
    mounted.trigger.focus_regained();
    mounted.settle().await;

    assert_eq!(mounted.cache.fetch_count(), 2);
    assert_eq!(
        mounted.cache.get_content("hero_video_title", "X"),
        "Welcome"
    );
    assert_eq!(mounted.cache.blocks().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn section_scope_reads_only_that_section() {
    let store = homepage_store();
    let source = Arc::new(StoreSource::new(store as Arc<dyn ContentStore>));
    let cache = PageCache::new(source, PageScope::new("homepage").with_section("footer"));

    cache.fetch_content().await;

    assert!(cache.blocks().is_empty());
    assert_eq!(cache.get_content("hero_video_title", "Welcome"), "Welcome");
}
