//! Invalidation signals.
//!
//! Every external source that can make a page cache stale (storage changes,
//! focus, application events, cross-tab broadcasts) is translated into a
//! [`Signal`] and queued here for the refresh consumer.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use thiserror::Error;
use time::OffsetDateTime;
use tracing::debug;
use uuid::Uuid;

use super::lock::mutex_lock;

const SOURCE: &str = "cache::events";

/// Storage key the editing surface touches after every successful save.
pub const SENTINEL_STORAGE_KEY: &str = "content-last-updated";

/// Monotonic epoch for ordering signals within this process.
pub type Epoch = u64;

/// Custom application events fired by the editing surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AppEvent {
    ContentUpdated,
    ContentRefresh,
}

impl AppEvent {
    pub fn as_str(self) -> &'static str {
        match self {
            AppEvent::ContentUpdated => "content-updated",
            AppEvent::ContentRefresh => "content-refresh",
        }
    }
}

impl TryFrom<&str> for AppEvent {
    type Error = ();

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "content-updated" | "contentUpdated" => Ok(AppEvent::ContentUpdated),
            "content-refresh" | "contentRefresh" => Ok(AppEvent::ContentRefresh),
            _ => Err(()),
        }
    }
}

/// Cross-tab publish/subscribe channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BroadcastChannel {
    ContentUpdates,
    WebsiteRefresh,
}

impl BroadcastChannel {
    pub fn as_str(self) -> &'static str {
        match self {
            BroadcastChannel::ContentUpdates => "content-updates",
            BroadcastChannel::WebsiteRefresh => "website-refresh",
        }
    }
}

impl TryFrom<&str> for BroadcastChannel {
    type Error = ();

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "content-updates" => Ok(BroadcastChannel::ContentUpdates),
            "website-refresh" => Ok(BroadcastChannel::WebsiteRefresh),
            _ => Err(()),
        }
    }
}

/// The four families of invalidation sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SignalSource {
    Storage,
    Focus,
    AppEvent,
    Broadcast,
}

impl fmt::Display for SignalSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SignalSource::Storage => "storage",
            SignalSource::Focus => "focus",
            SignalSource::AppEvent => "event",
            SignalSource::Broadcast => "broadcast",
        })
    }
}

/// An invalidation signal as received from its source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signal {
    /// A storage-change event for `key`.
    StorageChanged { key: String },
    /// The window regained focus.
    FocusRegained,
    /// A custom application event, optionally scoped to one page.
    App { event: AppEvent, page: Option<String> },
    /// A cross-tab broadcast message, optionally scoped to one page.
    Broadcast {
        channel: BroadcastChannel,
        page: Option<String>,
    },
}

impl Signal {
    pub fn source(&self) -> SignalSource {
        match self {
            Signal::StorageChanged { .. } => SignalSource::Storage,
            Signal::FocusRegained => SignalSource::Focus,
            Signal::App { .. } => SignalSource::AppEvent,
            Signal::Broadcast { .. } => SignalSource::Broadcast,
        }
    }

    /// Parse the textual wire form:
    /// `storage <key>`, `focus`, `event <name> [page]`, `broadcast <channel> [page]`.
    pub fn parse(line: &str) -> Result<Self, SignalParseError> {
        let mut parts = line.split_whitespace();
        let kind = parts.next().ok_or(SignalParseError::Empty)?;
        let argument = parts.next();
        let page = parts.next().map(str::to_string);

        if parts.next().is_some() {
            return Err(SignalParseError::TrailingInput(line.trim().to_string()));
        }

        match kind {
            "storage" => {
                let key = argument.ok_or(SignalParseError::MissingArgument("storage"))?;
                Ok(Signal::StorageChanged {
                    key: key.to_string(),
                })
            }
            "focus" => Ok(Signal::FocusRegained),
            "event" => {
                let name = argument.ok_or(SignalParseError::MissingArgument("event"))?;
                let event = AppEvent::try_from(name)
                    .map_err(|_| SignalParseError::UnknownName(name.to_string()))?;
                Ok(Signal::App { event, page })
            }
            "broadcast" => {
                let name = argument.ok_or(SignalParseError::MissingArgument("broadcast"))?;
                let channel = BroadcastChannel::try_from(name)
                    .map_err(|_| SignalParseError::UnknownName(name.to_string()))?;
                Ok(Signal::Broadcast { channel, page })
            }
            other => Err(SignalParseError::UnknownKind(other.to_string())),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignalParseError {
    #[error("empty signal line")]
    Empty,
    #[error("unknown signal kind `{0}`")]
    UnknownKind(String),
    #[error("`{0}` signals need an argument")]
    MissingArgument(&'static str),
    #[error("unknown event or channel `{0}`")]
    UnknownName(String),
    #[error("unexpected trailing input in `{0}`")]
    TrailingInput(String),
}

/// A queued signal with idempotency and ordering metadata.
#[derive(Debug, Clone)]
pub struct SignalEvent {
    pub id: Uuid,
    pub epoch: Epoch,
    pub signal: Signal,
    pub received_at: OffsetDateTime,
}

impl SignalEvent {
    pub fn new(signal: Signal, epoch: Epoch) -> Self {
        Self {
            id: Uuid::new_v4(),
            epoch,
            signal,
            received_at: OffsetDateTime::now_utc(),
        }
    }
}

/// In-memory FIFO of pending signals.
pub struct SignalQueue {
    queue: Mutex<VecDeque<SignalEvent>>,
    epoch_counter: AtomicU64,
}

impl SignalQueue {
    pub fn new() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            epoch_counter: AtomicU64::new(0),
        }
    }

    pub fn next_epoch(&self) -> Epoch {
        self.epoch_counter.fetch_add(1, Ordering::SeqCst)
    }

    /// Queue a signal and return the epoch it was stamped with.
    pub fn publish(&self, signal: Signal) -> Epoch {
        let epoch = self.next_epoch();
        let event = SignalEvent::new(signal, epoch);

        debug!(
            signal_id = %event.id,
            signal_epoch = event.epoch,
            signal_source = %event.signal.source(),
            "Invalidation signal enqueued"
        );

        mutex_lock(&self.queue, SOURCE, "publish").push_back(event);
        epoch
    }

    /// Drain up to `limit` signals in FIFO order.
    pub fn drain(&self, limit: usize) -> Vec<SignalEvent> {
        let mut queue = mutex_lock(&self.queue, SOURCE, "drain");
        let count = limit.min(queue.len());
        queue.drain(..count).collect()
    }

    pub fn len(&self) -> usize {
        mutex_lock(&self.queue, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for SignalQueue {
    fn default() -> Self {
        Self::new()
    }
}
