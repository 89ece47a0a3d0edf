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

/// Builds an OTLP exporter of the given kind for the configured protocol.
/// `http` posts to `<endpoint>/<signal path>`; anything else uses gRPC.
#[cfg(feature = "otel")]
macro_rules! otlp_exporter {
    ($exporter:ident, $config:expr, $signal_path:expr) => {{
        use opentelemetry_otlp::WithExportConfig as _;

        let config: &$crate::config::TelemetryConfig = $config;
        let timeout = std::time::Duration::from_secs(config.timeout_seconds);

        if config.protocol.eq_ignore_ascii_case("http") {
            let endpoint = $crate::telemetry::signal_endpoint(&config.endpoint, $signal_path);
            tracing::info!("Configuring HTTP {} exporter: {}", stringify!($exporter), endpoint);
            opentelemetry_otlp::$exporter::builder()
                .with_http()
                .with_endpoint(endpoint)
                .with_timeout(timeout)
                .build()
        } else {
            tracing::info!(
                "Configuring gRPC {} exporter: {}",
                stringify!($exporter),
                config.endpoint
            );
            opentelemetry_otlp::$exporter::builder()
                .with_tonic()
                .with_endpoint(config.endpoint.clone())
                .with_timeout(timeout)
                .build()
        }
    }};
}

pub mod attributes;
pub mod metrics;
#[cfg(feature = "otel")]
pub mod otel_direct;
pub mod tracer;

pub use metrics::init_metrics;
pub use tracer::{init_tracing, tracing_middleware};

use crate::config::TelemetryConfig;
use anyhow::Context;
use tracing::info;

/// Appends the OTLP/HTTP signal path unless the endpoint already ends in it.
pub fn signal_endpoint(endpoint: &str, signal_path: &str) -> String {
    let trimmed = endpoint.trim_end_matches('/');
    if trimmed.ends_with(signal_path) {
        trimmed.to_string()
    } else {
        format!("{}/{}", trimmed, signal_path)
    }
}

#[cfg(feature = "otel")]
pub(crate) fn resource(config: &TelemetryConfig) -> opentelemetry_sdk::Resource {
    use opentelemetry::KeyValue;

    opentelemetry_sdk::Resource::builder()
        .with_attributes(vec![
            KeyValue::new("service.name", config.service_name.clone()),
            KeyValue::new("service.version", config.service_version.clone()),
        ])
        .build()
}

pub fn init_telemetry(config: &TelemetryConfig) -> anyhow::Result<()> {
    init_tracing(config).context("Failed to initialize tracing")?;
    init_metrics(config).context("Failed to initialize metrics")?;

    if config.enabled {
        info!(
            service = %config.service_name,
            endpoint = %config.endpoint,
            protocol = %config.protocol,
            "Telemetry export enabled"
        );
    }

    Ok(())
}

/// Flushes and stops the OTLP providers, if any were installed.
pub fn shutdown_telemetry() {
    info!("Shutting down telemetry");
    tracer::shutdown();
    metrics::shutdown();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_disabled_telemetry() {
        let config = TelemetryConfig {
            log_format: "json".to_string(),
            ..TelemetryConfig::default()
        };

        assert!(init_telemetry(&config).is_ok());
        shutdown_telemetry();
    }

    #[test]
    fn test_signal_endpoint() {
        assert_eq!(
            signal_endpoint("http://localhost:4318", "v1/traces"),
            "http://localhost:4318/v1/traces"
        );
        assert_eq!(
            signal_endpoint("http://localhost:4318/", "v1/logs"),
            "http://localhost:4318/v1/logs"
        );
        assert_eq!(
            signal_endpoint("http://collector/v1/metrics", "v1/metrics"),
            "http://collector/v1/metrics"
        );
    }
}
