//! Refresh listener for one mounted page cache.
//!
//! Waits for invalidation signals, lets a burst settle for the debounce
//! window, then drains the queue and issues at most one refetch.

use std::sync::Arc;
use std::time::Instant;

use metrics::{counter, histogram};
use time::OffsetDateTime;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use super::config::CacheConfig;
use super::events::SignalQueue;
use super::page::{FetchOutcome, PageCache};
use super::planner::RefreshPlan;
use super::trigger::SignalTrigger;

const METRIC_SIGNAL_COALESCED: &str = "tidecast_signal_coalesced_total";
const METRIC_REFRESH_MS: &str = "tidecast_refresh_ms";

/// Connects the signal queue to a page cache.
///
/// The listener:
/// 1. Drains signals from the queue
/// 2. Merges them into a refresh plan for its page
/// 3. Refetches once if the plan calls for it
pub struct RefreshListener {
    config: CacheConfig,
    queue: Arc<SignalQueue>,
    notify: Arc<Notify>,
    cache: Arc<PageCache>,
}

impl RefreshListener {
    pub fn new(
        config: CacheConfig,
        queue: Arc<SignalQueue>,
        notify: Arc<Notify>,
        cache: Arc<PageCache>,
    ) -> Self {
        Self {
            config,
            queue,
            notify,
            cache,
        }
    }

    /// Build a trigger and listener sharing one queue for `cache`.
    pub fn mount(config: CacheConfig, cache: Arc<PageCache>) -> (SignalTrigger, Self) {
        let queue = Arc::new(SignalQueue::new());
        let notify = Arc::new(Notify::new());
        let trigger = SignalTrigger::new(queue.clone(), notify.clone());
        (trigger, Self::new(config, queue, notify, cache))
    }

    /// Drain every pending signal and refetch if any of them concern the page.
    ///
    /// The whole queue folds into one plan; the batch limit only sizes each
    /// drain and caps the signal IDs that are logged.
    ///
    /// Returns the fetch outcome, or `None` when nothing was fetched.
    #[instrument(skip(self), fields(page = %self.cache.scope().page))]
    pub async fn consume(&self) -> Option<FetchOutcome> {
        let started_at = Instant::now();
        let limit = self.config.signal_batch_limit();
        let mut events = Vec::new();
        loop {
            let batch = self.queue.drain(limit);
            if batch.is_empty() {
                break;
            }
            events.extend(batch);
        }
        if events.is_empty() {
            return None;
        }

        let signal_count = events.len();
        let signal_ids: Vec<Uuid> = events.iter().take(limit).map(|e| e.id).collect();
        let plan = RefreshPlan::from_events(events, self.cache.scope(), &self.config.sentinel_key);
        let waited_ms = plan
            .first_received_at
            .map(|received_at| (OffsetDateTime::now_utc() - received_at).whole_milliseconds());

        info!(
            signal_count,
            signal_ids = ?signal_ids,
            latest_epoch = ?plan.latest_epoch,
            waited_ms = ?waited_ms,
            plan = %plan,
            "Signal batch drained"
        );

        if plan.is_empty() {
            debug!(ignored = plan.ignored, "No signal concerned this page");
            return None;
        }

        counter!(METRIC_SIGNAL_COALESCED).increment(plan.coalesced as u64);
        let outcome = self.cache.fetch_content().await;

        info!(
            sequence = outcome.sequence(),
            coalesced = plan.coalesced,
            "Page refresh complete"
        );
        histogram!(METRIC_REFRESH_MS).record(started_at.elapsed().as_secs_f64() * 1000.0);

        Some(outcome)
    }

    /// Run the listener until the task is aborted.
    ///
    /// Signals arriving during the debounce window or the refetch leave a
    /// stored wake-up, so they are picked up by the next cycle.
    pub fn spawn(self) -> JoinHandle<()> {
        let debounce = self.config.signal_debounce();
        tokio::spawn(async move {
            loop {
                self.notify.notified().await;
                tokio::time::sleep(debounce).await;
                self.consume().await;
                if !self.queue.is_empty() {
                    self.notify.notify_one();
                }
            }
        })
    }

    pub fn queue(&self) -> &Arc<SignalQueue> {
        &self.queue
    }

    pub fn cache(&self) -> &Arc<PageCache> {
        &self.cache
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;
    use serde_json::{Value, json};

    use super::*;
    use crate::application::repos::{ContentSource, StoreError};
    use crate::cache::events::{AppEvent, BroadcastChannel, SENTINEL_STORAGE_KEY, Signal};
    use crate::cache::page::PageScope;

    struct StaticSource;

    #[async_trait]
    impl ContentSource for StaticSource {
        async fn fetch_page(&self, _page: &str, _section: Option<&str>) -> Result<Value, StoreError> {
            Ok(json!([{ "key": "hero_title", "content": "Hello" }]))
        }
    }

    fn mounted(config: CacheConfig) -> (SignalTrigger, RefreshListener) {
        let cache = Arc::new(PageCache::new(
            Arc::new(StaticSource),
            PageScope::new("homepage"),
        ));
        RefreshListener::mount(config, cache)
    }

    #[tokio::test]
    async fn consume_empty_queue_fetches_nothing() {
        let (_trigger, listener) = mounted(CacheConfig::default());
        assert!(listener.consume().await.is_none());
        assert_eq!(listener.cache().fetch_count(), 0);
    }

    #[tokio::test]
    async fn consume_merges_batch_into_one_fetch() {
        let (trigger, listener) = mounted(CacheConfig::default());

        trigger.storage_changed(SENTINEL_STORAGE_KEY);
        trigger.focus_regained();
        trigger.app_event(AppEvent::ContentUpdated, None);
        trigger.broadcast(BroadcastChannel::ContentUpdates, None);

        let outcome = listener.consume().await;
        assert!(matches!(outcome, Some(FetchOutcome::Applied { .. })));
        assert_eq!(listener.cache().fetch_count(), 1);
        assert!(listener.queue().is_empty());
    }

    #[tokio::test]
    async fn consume_drains_past_batch_limit() {
        let config = CacheConfig {
            signal_batch_limit: 2,
            ..Default::default()
        };
        let (trigger, listener) = mounted(config);

        for _ in 0..5 {
            trigger.focus_regained();
        }

        assert!(listener.consume().await.is_some());
        assert!(listener.queue().is_empty());
        assert_eq!(listener.cache().fetch_count(), 1);
    }

    #[tokio::test]
    async fn foreign_signals_do_not_fetch() {
        let (trigger, listener) = mounted(CacheConfig::default());

        trigger.storage_changed("theme");
        trigger.app_event(AppEvent::ContentRefresh, Some("fleet"));

        assert!(listener.consume().await.is_none());
        assert_eq!(listener.cache().fetch_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn spawned_listener_debounces_bursts() {
        let (trigger, listener) = mounted(CacheConfig::default());
        let cache = listener.cache().clone();
        let handle = listener.spawn();

        trigger.publish(Signal::FocusRegained);
        trigger.publish(Signal::FocusRegained);
        trigger.broadcast(BroadcastChannel::WebsiteRefresh, Some("homepage"));

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(cache.fetch_count(), 0);

        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(cache.fetch_count(), 1);

        handle.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn burst_beyond_batch_limit_refetches_once() {
        let (trigger, listener) = mounted(CacheConfig::default());
        let limit = CacheConfig::default().signal_batch_limit();
        let cache = listener.cache().clone();
        let handle = listener.spawn();

        for _ in 0..(limit * 2 + 50) {
            trigger.focus_regained();
        }

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(cache.fetch_count(), 1);

        handle.abort();
    }
}
