//! Refresh plan generation.
//!
//! Merges a burst of invalidation signals into a single decision for one page
//! cache.

use std::collections::{BTreeSet, HashSet};
use std::fmt;

use time::OffsetDateTime;

use super::events::{Epoch, Signal, SignalEvent, SignalSource};
use super::page::PageScope;

/// What a drained batch of signals means for one page cache.
///
/// Every relevant signal in the batch collapses into the same refetch; the
/// plan only records why.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct RefreshPlan {
    /// Whether at least one signal concerns the page.
    pub refetch: bool,
    /// Sources that contributed a relevant signal.
    pub sources: BTreeSet<SignalSource>,
    /// Relevant signals folded into the refetch beyond the first.
    pub coalesced: usize,
    /// Signals that did not concern the page (other storage keys, other pages).
    pub ignored: usize,
    /// Highest epoch seen in the batch.
    pub latest_epoch: Option<Epoch>,
    /// When the oldest signal of the batch was queued.
    pub first_received_at: Option<OffsetDateTime>,
}

impl fmt::Display for RefreshPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sources: Vec<String> = self.sources.iter().map(ToString::to_string).collect();
        write!(
            f,
            "RefreshPlan {{ refetch: {}, sources: [{}], coalesced: {}, ignored: {}, latest_epoch: ",
            self.refetch,
            sources.join(", "),
            self.coalesced,
            self.ignored,
        )?;
        match self.latest_epoch {
            Some(epoch) => write!(f, "{epoch} }}"),
            None => f.write_str("none }"),
        }
    }
}

impl RefreshPlan {
    /// Merge drained signals into one plan.
    ///
    /// - Deduplicates by signal ID
    /// - Drops storage changes for keys other than `sentinel_key`
    /// - Drops events and broadcasts scoped to another page
    pub fn from_events(events: Vec<SignalEvent>, scope: &PageScope, sentinel_key: &str) -> Self {
        let mut plan = Self::default();
        let mut seen_ids = HashSet::new();
        let mut relevant = 0_usize;

        for event in events.into_iter().filter(|e| seen_ids.insert(e.id)) {
            plan.latest_epoch = Some(plan.latest_epoch.map_or(event.epoch, |e| e.max(event.epoch)));
            plan.first_received_at = Some(
                plan.first_received_at
                    .map_or(event.received_at, |t| t.min(event.received_at)),
            );

            let concerns_page = match &event.signal {
                Signal::StorageChanged { key } => key == sentinel_key,
                Signal::FocusRegained => true,
                Signal::App { page, .. } | Signal::Broadcast { page, .. } => {
                    scope.concerns(page.as_deref())
                }
            };

            if concerns_page {
                relevant += 1;
                plan.sources.insert(event.signal.source());
            } else {
                plan.ignored += 1;
            }
        }

        plan.refetch = relevant > 0;
        plan.coalesced = relevant.saturating_sub(1);
        plan
    }

    pub fn is_empty(&self) -> bool {
        !self.refetch
    }
}
