//! Cache configuration.
//!
//! Controls the aggregation snapshot lifetime and the invalidation bus. Values
//! come from the `[cache]` table of the settings file.

use std::time::Duration;

use super::events::SENTINEL_STORAGE_KEY;

const DEFAULT_INDEX_TTL_SECS: u64 = 300;
const DEFAULT_SIGNAL_DEBOUNCE_MS: u64 = 250;
const DEFAULT_SIGNAL_BATCH_LIMIT: usize = 100;

/// Resolved cache configuration.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Lifetime of an aggregation snapshot.
    pub index_ttl_secs: u64,
    /// Quiet period after the first invalidation signal before refetching.
    pub signal_debounce_ms: u64,
    /// Maximum signals merged into one refresh plan.
    pub signal_batch_limit: usize,
    /// Storage key whose change events invalidate page caches.
    pub sentinel_key: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            index_ttl_secs: DEFAULT_INDEX_TTL_SECS,
            signal_debounce_ms: DEFAULT_SIGNAL_DEBOUNCE_MS,
            signal_batch_limit: DEFAULT_SIGNAL_BATCH_LIMIT,
            sentinel_key: SENTINEL_STORAGE_KEY.to_string(),
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            index_ttl_secs: settings.index_ttl.as_secs(),
            signal_debounce_ms: u64::try_from(settings.signal_debounce.as_millis())
                .unwrap_or(u64::MAX),
            signal_batch_limit: settings.signal_batch_limit.get(),
            sentinel_key: settings.sentinel_key.clone(),
        }
    }
}

impl CacheConfig {
    pub fn index_ttl(&self) -> Duration {
        Duration::from_secs(self.index_ttl_secs)
    }

    pub fn signal_debounce(&self) -> Duration {
        Duration::from_millis(self.signal_debounce_ms)
    }

    /// Batch limit clamped to at least one signal.
    pub fn signal_batch_limit(&self) -> usize {
        self.signal_batch_limit.max(1)
    }
}
