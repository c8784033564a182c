use std::sync::Once;

use metrics::{Unit, describe_counter, describe_histogram};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install a global tracing subscriber using the provided logging settings.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(true).boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(ErrorLayer::default())
        .with(fmt_layer)
        .try_init()
        .map_err(|err| {
            InfraError::telemetry(format!("failed to install tracing subscriber: {err}"))
        })
}

fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            "tidecast_index_hit_total",
            Unit::Count,
            "Aggregation index reads served from a fresh snapshot."
        );
        describe_counter!(
            "tidecast_index_fill_total",
            Unit::Count,
            "Aggregation snapshots stored after a fill."
        );
        describe_counter!(
            "tidecast_index_domain_failure_total",
            Unit::Count,
            "Domain fetches that failed during an aggregation fill."
        );
        describe_histogram!(
            "tidecast_index_fill_ms",
            Unit::Milliseconds,
            "Aggregation fill latency in milliseconds."
        );
        describe_counter!(
            "tidecast_page_fetch_total",
            Unit::Count,
            "Page cache fetches issued."
        );
        describe_counter!(
            "tidecast_page_stale_discarded_total",
            Unit::Count,
            "Page responses dropped because a newer one was already applied."
        );
        describe_counter!(
            "tidecast_signal_coalesced_total",
            Unit::Count,
            "Invalidation signals folded into another signal's refetch."
        );
        describe_histogram!(
            "tidecast_refresh_ms",
            Unit::Milliseconds,
            "Signal-driven page refresh latency in milliseconds."
        );
        describe_counter!(
            "tidecast_artifact_failure_total",
            Unit::Count,
            "Artifact targets that failed to render or write."
        );
    });
}
