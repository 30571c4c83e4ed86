use std::sync::Once;

use metrics::{Unit, describe_counter, describe_gauge, describe_histogram};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::cache::metric_names::{
    METRIC_ENTRIES, METRIC_HIT_TOTAL, METRIC_INVALIDATE_MS, METRIC_INVALIDATED_TOTAL,
    METRIC_MISS_TOTAL, METRIC_REEXECUTE_TOTAL, METRIC_STORE_TOTAL,
};
use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install a global tracing subscriber using the provided logging settings.
///
/// `RUST_LOG` directives take precedence over the configured level.
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

/// Register descriptions for every metric the cache emits.
///
/// Safe to call more than once; only the first call registers.
pub fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            METRIC_HIT_TOTAL,
            Unit::Count,
            "Total number of queries answered from the result cache."
        );
        describe_counter!(
            METRIC_MISS_TOTAL,
            Unit::Count,
            "Total number of queries not answered from the result cache."
        );
        describe_counter!(
            METRIC_STORE_TOTAL,
            Unit::Count,
            "Total number of query results written to the result cache."
        );
        describe_counter!(
            METRIC_INVALIDATED_TOTAL,
            Unit::Count,
            "Total number of cached queries made stale by mutations."
        );
        describe_counter!(
            METRIC_REEXECUTE_TOTAL,
            Unit::Count,
            "Total number of stale queries handed back to the client."
        );
        describe_gauge!(
            METRIC_ENTRIES,
            Unit::Count,
            "Current number of results held by the result cache."
        );
        describe_histogram!(
            METRIC_INVALIDATE_MS,
            Unit::Milliseconds,
            "Post-mutation invalidation latency in milliseconds."
        );
    });
}

#[cfg(test)]
mod tests {
    use tracing::level_filters::LevelFilter;

    use super::*;

    #[test]
    fn second_init_reports_telemetry_error() {
        let logging = LoggingSettings {
            level: LevelFilter::DEBUG,
            format: LogFormat::Json,
        };

        let _ = init(&logging);
        let err = init(&logging).expect_err("global subscriber is already set");

        assert!(matches!(err, InfraError::Telemetry(_)));
        assert!(err.to_string().contains("failed to install tracing subscriber"));
    }
}
