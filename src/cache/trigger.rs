//! Signal trigger.
//!
//! Entry point for the four external invalidation sources. Each method
//! queues a signal and wakes the refresh listener.

use std::sync::Arc;

use tokio::sync::Notify;

use super::events::{AppEvent, BroadcastChannel, Epoch, Signal, SignalQueue};

/// Cloneable handle that feeds the signal bus.
#[derive(Clone)]
pub struct SignalTrigger {
    queue: Arc<SignalQueue>,
    notify: Arc<Notify>,
}

impl SignalTrigger {
    pub fn new(queue: Arc<SignalQueue>, notify: Arc<Notify>) -> Self {
        Self { queue, notify }
    }

    /// Queue a signal and wake the listener.
    pub fn publish(&self, signal: Signal) -> Epoch {
        let epoch = self.queue.publish(signal);
        self.notify.notify_one();
        epoch
    }

    /// A storage-change event for `key`.
    pub fn storage_changed(&self, key: &str) -> Epoch {
        self.publish(Signal::StorageChanged {
            key: key.to_string(),
        })
    }

    /// The window regained focus.
    pub fn focus_regained(&self) -> Epoch {
        self.publish(Signal::FocusRegained)
    }

    /// A custom application event fired by the editing surface.
    pub fn app_event(&self, event: AppEvent, page: Option<&str>) -> Epoch {
        self.publish(Signal::App {
            event,
            page: page.map(str::to_string),
        })
    }

    /// A cross-tab broadcast message.
    pub fn broadcast(&self, channel: BroadcastChannel, page: Option<&str>) -> Epoch {
        self.publish(Signal::Broadcast {
            channel,
            page: page.map(str::to_string),
        })
    }

    pub fn queue(&self) -> &Arc<SignalQueue> {
        &self.queue
    }
}
