/*
 * Copyright 2026 Schemock Team
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 *     http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 */

use crate::config::TelemetryConfig;
use tracing::{debug, info};

#[cfg(feature = "otel")]
mod otel {
    use crate::config::TelemetryConfig;
    use crate::telemetry::attributes::{self, kv};
    use once_cell::sync::{Lazy, OnceCell};
    use opentelemetry::metrics::{Counter, Histogram};
    use opentelemetry::{global, KeyValue};
    use opentelemetry_sdk::metrics::{PeriodicReader, SdkMeterProvider};
    use std::time::Duration;
    use tracing::{error, info, warn};

    pub(super) static METER_PROVIDER: OnceCell<SdkMeterProvider> = OnceCell::new();

    pub(super) struct Instruments {
        pub requests: Counter<u64>,
        pub duration: Histogram<f64>,
        pub errors: Counter<u64>,
    }

    pub(super) static INSTRUMENTS: Lazy<Instruments> = Lazy::new(|| {
        let meter = global::meter("schemock");
        Instruments {
            requests: meter
                .u64_counter("mock_requests_total")
                .with_description("Total number of requests served by the mock server")
                .build(),
            duration: meter
                .f64_histogram("mock_request_duration")
                .with_description("Mock request duration in seconds")
                .with_unit("s")
                .build(),
            errors: meter
                .u64_counter("mock_errors_total")
                .with_description("Requests that did not resolve to a mock response")
                .build(),
        }
    });

    pub(super) fn init(config: &TelemetryConfig) -> anyhow::Result<()> {
        let exporter = otlp_exporter!(MetricExporter, config, "v1/metrics").map_err(|e| {
            error!("Failed to build OpenTelemetry metric exporter: {}", e);
            anyhow::anyhow!("OpenTelemetry metric exporter build failed: {}", e)
        })?;

        let reader = PeriodicReader::builder(exporter)
            .with_interval(Duration::from_secs(10))
            .build();

        let provider = SdkMeterProvider::builder()
            .with_reader(reader)
            .with_resource(crate::telemetry::resource(config))
            .build();

        global::set_meter_provider(provider.clone());
        if METER_PROVIDER.set(provider).is_err() {
            warn!("Meter provider already installed");
        }

        info!("OpenTelemetry metrics initialized");
        Ok(())
    }

    pub(super) fn request_attributes(method: &str, route: &str, status: u16) -> Vec<KeyValue> {
        vec![
            kv::http_method(method),
            kv::http_route(route),
            kv::http_response_status_code(status),
        ]
    }

    pub(super) fn outcome_attribute(route: &str, status: u16) -> KeyValue {
        let schema = (route != super::UNMATCHED_ROUTE).then_some(route);
        kv::mock_outcome(attributes::mock::outcome(schema, status))
    }
}

/// Route label used when no schema served the request.
pub const UNMATCHED_ROUTE: &str = "unmatched";

/// Installs the OTLP meter provider when export is enabled.
pub fn init_metrics(config: &TelemetryConfig) -> anyhow::Result<()> {
    if !config.enabled {
        info!("Metrics export is disabled");
        return Ok(());
    }

    #[cfg(feature = "otel")]
    {
        otel::init(config)
    }

    #[cfg(not(feature = "otel"))]
    {
        info!("Metrics export requested but the otel feature is not enabled");
        Ok(())
    }
}

pub(crate) fn shutdown() {
    #[cfg(feature = "otel")]
    {
        if let Some(provider) = otel::METER_PROVIDER.get() {
            if let Err(e) = provider.shutdown() {
                tracing::warn!(error = %e, "Meter provider shutdown failed");
            }
        }
    }
}

/// Counts a served request. `route` is the schema name, or
/// [`UNMATCHED_ROUTE`].
pub fn record_request(method: &str, route: &str, status: u16) {
    #[cfg(feature = "otel")]
    {
        let mut attributes = otel::request_attributes(method, route, status);
        attributes.push(otel::outcome_attribute(route, status));
        otel::INSTRUMENTS.requests.add(1, &attributes);
    }

    debug!(
        method = %method,
        route = %route,
        status = status,
        "Request completed"
    );
}

pub fn record_latency(method: &str, route: &str, latency_ms: f64) {
    let latency_seconds = latency_ms / 1000.0;

    #[cfg(feature = "otel")]
    {
        use crate::telemetry::attributes::kv;
        otel::INSTRUMENTS.duration.record(
            latency_seconds,
            &[kv::http_method(method), kv::http_route(route)],
        );
    }

    debug!(
        method = %method,
        route = %route,
        latency_ms = latency_ms,
        latency_seconds = latency_seconds,
        "Request latency"
    );
}

pub fn record_error(method: &str, path: &str, error_type: &str) {
    #[cfg(feature = "otel")]
    {
        use crate::telemetry::attributes::kv;
        otel::INSTRUMENTS
            .errors
            .add(1, &[kv::http_method(method), kv::error_type(error_type)]);
    }

    debug!(
        method = %method,
        path = %path,
        error_type = %error_type,
        "Request error"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_metrics_init() {
        let config = TelemetryConfig::default();
        assert!(init_metrics(&config).is_ok());
    }

    #[test]
    fn test_recording_without_provider() {
        record_request("GET", "Users", 200);
        record_request("DELETE", UNMATCHED_ROUTE, 404);
        record_latency("GET", "Users", 1.5);
        record_error("DELETE", "/unknown", "not_found");
    }

    #[cfg(feature = "otel")]
    #[test]
    fn test_request_attributes() {
        let attributes = otel::request_attributes("GET", "Users", 200);
        assert_eq!(attributes.len(), 3);
        assert_eq!(attributes[1].value.as_str(), "Users");

        let outcome = otel::outcome_attribute(UNMATCHED_ROUTE, 404);
        assert_eq!(outcome.value.as_str(), "not_found");
        let outcome = otel::outcome_attribute("Users", 200);
        assert_eq!(outcome.value.as_str(), "matched");
    }
}
