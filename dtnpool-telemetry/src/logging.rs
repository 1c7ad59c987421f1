//! ## dtnpool-telemetry::logging
//! **`tracing` subscriber driven by [`TelemetryConfig`]**
//!
//! `RUST_LOG` wins over the configured level when set. Output is
//! human-readable lines by default, newline-delimited JSON when
//! `telemetry.json` is enabled. Logs go to stderr; stdout carries command
//! output.

use dtnpool_config::TelemetryConfig;
use dtnpool_core::alloc::StatsSnapshot;
use thiserror::Error;
use tracing::{info_span, Subscriber};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("invalid log filter: {0}")]
    Filter(#[from] tracing_subscriber::filter::ParseError),

    #[error("failed to install log subscriber: {0}")]
    Install(String),
}

#[derive(Clone)]
pub struct PoolLogger;

impl PoolLogger {
    /// Installs the global subscriber. Fails if one is already installed.
    pub fn try_init(config: &TelemetryConfig) -> Result<(), TelemetryError> {
        let filter = match EnvFilter::try_from_default_env() {
            Ok(filter) => filter,
            Err(_) => EnvFilter::try_new(&config.log_level)?,
        };
        tracing::subscriber::set_global_default(subscriber(config, filter, std::io::stderr))
            .map_err(|e| TelemetryError::Install(e.to_string()))
    }

    /// Like [`PoolLogger::try_init`], but an already installed subscriber is
    /// kept.
    pub fn init(config: &TelemetryConfig) -> Result<(), TelemetryError> {
        match Self::try_init(config) {
            Err(TelemetryError::Install(_)) => Ok(()),
            other => other,
        }
    }

    /// Emits one structured event carrying every pool counter.
    pub fn log_stats(label: &str, stats: &StatsSnapshot) {
        let _span = info_span!("pool_stats", label).entered();
        tracing::info!(
            allocations = stats.allocations,
            alloc_failures = stats.alloc_failures,
            recycles = stats.recycles,
            collected = stats.collected,
            quarantined = stats.quarantined,
            jobs_activated = stats.jobs_activated,
            jobs_dispatched = stats.jobs_dispatched,
            high_water = stats.high_water,
            "pool statistics"
        );
    }
}

fn subscriber<W>(
    config: &TelemetryConfig,
    filter: EnvFilter,
    writer: W,
) -> Box<dyn Subscriber + Send + Sync>
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let builder = fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_thread_names(true)
        .with_span_events(FmtSpan::CLOSE);

    if config.json {
        Box::new(builder.json().finish())
    } else {
        Box::new(builder.finish())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::{Arc, Mutex};
    use tracing_test::traced_test;

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn events_go_to_the_configured_writer() {
        let captured = Captured::default();
        let sink = captured.clone();
        let config = TelemetryConfig {
            log_level: "info".into(),
            json: true,
        };
        let subscriber = subscriber(&config, EnvFilter::new("info"), move || sink.clone());

        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(flows = 2, "soak started");
        });

        let out = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        assert!(out.contains("soak started"));
        assert!(out.contains("\"flows\":2"));
    }

    #[traced_test]
    #[test]
    fn stats_are_logged_as_fields() {
        let snapshot = StatsSnapshot {
            allocations: 12,
            high_water: 5,
            ..StatsSnapshot::default()
        };
        PoolLogger::log_stats("soak", &snapshot);
        assert!(logs_contain("pool statistics"));
        assert!(logs_contain("high_water=5"));
    }

    #[test]
    fn bad_level_is_rejected() {
        let config = TelemetryConfig {
            log_level: "dtnpool=loud".into(),
            json: false,
        };
        if std::env::var_os("RUST_LOG").is_none() {
            assert!(matches!(
                PoolLogger::try_init(&config),
                Err(TelemetryError::Filter(_))
            ));
        }
    }
}
