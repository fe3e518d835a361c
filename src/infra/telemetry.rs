use std::sync::Once;

use metrics::{Unit, counter, describe_counter};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

pub const STORE_REQUESTS_TOTAL: &str = "medee_store_requests_total";
pub const POSTS_DROPPED_TOTAL: &str = "medee_posts_dropped_total";

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

/// Count one call against an external store.
pub fn record_store_request(store: &'static str, op: &'static str, ok: bool) {
    let outcome = if ok { "ok" } else { "error" };
    counter!(STORE_REQUESTS_TOTAL, "store" => store, "op" => op, "outcome" => outcome).increment(1);
}

fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            STORE_REQUESTS_TOTAL,
            Unit::Count,
            "Requests issued to the key-value and object stores, by outcome."
        );
        describe_counter!(
            POSTS_DROPPED_TOTAL,
            Unit::Count,
            "Posts skipped by the aggregate read because they failed to load."
        );
    });
}
