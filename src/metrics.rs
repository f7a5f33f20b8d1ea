//! Observability hooks.
//!
//! With the `metrics` feature, [`METRICS`] exposes OpenTelemetry instruments
//! backed by a Prometheus registry. With the `tracing` feature,
//! [`tracing_helpers`] builds the spans used around processing, statement
//! execution and transaction control.

#[cfg(feature = "metrics")]
pub use prometheus_metrics::*;

#[cfg(feature = "metrics")]
mod prometheus_metrics {
    use once_cell::sync::Lazy;
    use opentelemetry::metrics::{Counter, Histogram, MeterProvider as _};
    use opentelemetry_sdk::metrics::SdkMeterProvider;
    use prometheus::Registry;
    use std::time::Duration;

    pub static METRICS: Lazy<SchemaSyncMetrics> = Lazy::new(SchemaSyncMetrics::init);

    pub struct SchemaSyncMetrics {
        /// Registry the exporter writes into; serve it from your metrics endpoint.
        pub registry: Registry,
        pub provider: SdkMeterProvider,
        pub statements_total: Counter<u64>,
        pub statement_errors_total: Counter<u64>,
        pub statement_duration: Histogram<f64>,
        pub process_total: Counter<u64>,
        pub process_failures_total: Counter<u64>,
    }

    impl SchemaSyncMetrics {
        pub fn init() -> Self {
            let registry = Registry::new();
            let provider = match opentelemetry_prometheus::exporter()
                .with_registry(registry.clone())
                .build()
            {
                Ok(exporter) => SdkMeterProvider::builder().with_reader(exporter).build(),
                Err(err) => {
                    log::warn!("Prometheus exporter unavailable, metrics are not exported: {err}");
                    SdkMeterProvider::builder().build()
                }
            };
            let meter = provider.meter("schemasync");

            let statements_total = meter
                .u64_counter("schemasync_statements_total")
                .with_description("Total statements and queries executed")
                .build();

            let statement_errors_total = meter
                .u64_counter("schemasync_statement_errors_total")
                .with_description("Statements and queries that failed")
                .build();

            let statement_duration = meter
                .f64_histogram("schemasync_statement_duration_seconds")
                .with_description("Duration of statements and queries")
                .build();

            let process_total = meter
                .u64_counter("schemasync_process_total")
                .with_description("Tables processed")
                .build();

            let process_failures_total = meter
                .u64_counter("schemasync_process_failures_total")
                .with_description("Table processing runs that failed")
                .build();

            Self {
                registry,
                provider,
                statements_total,
                statement_errors_total,
                statement_duration,
                process_total,
                process_failures_total,
            }
        }

        pub fn record_statement(&self, elapsed: Duration) {
            self.statements_total.add(1, &[]);
            self.statement_duration.record(elapsed.as_secs_f64(), &[]);
        }

        pub fn record_statement_error(&self) {
            self.statement_errors_total.add(1, &[]);
        }

        pub fn record_process(&self, ok: bool) {
            self.process_total.add(1, &[]);
            if !ok {
                self.process_failures_total.add(1, &[]);
            }
        }
    }
}

#[cfg(feature = "tracing")]
pub mod tracing_helpers {
    use crate::transaction::TransactionAction;
    use tracing::{info_span, Span};

    /// Longest statement prefix recorded on a span.
    const SQL_PREVIEW: usize = 120;

    pub fn process_span(table: &str, database: &str) -> Span {
        info_span!("schemasync.process", table = table, database = database)
    }

    pub fn execute_statement_span(sql: &str) -> Span {
        let preview = match sql.char_indices().nth(SQL_PREVIEW) {
            Some((at, _)) => &sql[..at],
            None => sql,
        };
        info_span!("schemasync.execute", sql = preview)
    }

    pub fn transaction_span(action: &TransactionAction) -> Span {
        info_span!("schemasync.transaction", action = ?action)
    }

    pub fn connect_span(database: &str) -> Span {
        info_span!("schemasync.connect", database = database)
    }

    pub fn fetch_table_span(table: &str) -> Span {
        info_span!("schemasync.fetch_table", table = table)
    }
}
