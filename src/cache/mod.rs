//! Tidecast cache system
//!
//! Two independent caches sit between the canonical content store and its
//! consumers:
//!
//! - **Aggregation cache**: one TTL-bounded snapshot of every non-content
//!   domain for the text-response helper
//! - **Page cache**: the normalized entries of one page, refreshed by
//!   invalidation signals coalesced on an internal bus
//!
//! ## Configuration
//!
//! ```toml
//! [cache]
//! index_ttl_seconds = 300
//! signal_debounce_ms = 250
//! signal_batch_limit = 100
//! sentinel_key = "content-last-updated"
//! ```

mod aggregate;
mod bus;
mod config;
mod events;
mod lock;
mod page;
mod planner;
mod snapshot;
mod trigger;

pub use aggregate::{AggregationCache, ContentIndex};
pub use bus::RefreshListener;
pub use config::CacheConfig;
pub use events::{
    AppEvent, BroadcastChannel, Epoch, SENTINEL_STORAGE_KEY, Signal, SignalEvent,
    SignalParseError, SignalQueue, SignalSource,
};
pub use page::{FetchOutcome, PageCache, PageScope};
pub use planner::RefreshPlan;
pub use snapshot::CacheSnapshot;
pub use trigger::SignalTrigger;
