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
use crate::server::handlers::MatchedSchema;
use crate::telemetry::attributes;
use actix_web::dev::{Service, ServiceRequest, ServiceResponse, Transform};
use futures::future::LocalBoxFuture;
use std::future::{ready, Ready};
use std::rc::Rc;
use std::task::{Context as TaskContext, Poll};
use tracing::{info, Instrument};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Registry};

#[cfg(feature = "otel")]
use crate::telemetry::otel_direct;

#[cfg(feature = "otel")]
struct ActixHeaderExtractor<'a>(&'a actix_web::http::header::HeaderMap);

#[cfg(feature = "otel")]
impl opentelemetry::propagation::Extractor for ActixHeaderExtractor<'_> {
    fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|v| v.to_str().ok())
    }

    fn keys(&self) -> Vec<&str> {
        self.0.keys().map(|k| k.as_str()).collect()
    }
}

#[cfg(feature = "otel")]
mod otel {
    use crate::config::TelemetryConfig;
    use once_cell::sync::OnceCell;
    use opentelemetry_sdk::logs::SdkLoggerProvider;
    use opentelemetry_sdk::propagation::TraceContextPropagator;
    use opentelemetry_sdk::trace::{Sampler, SdkTracerProvider};
    use tracing::{error, warn};

    pub(super) static TRACER_PROVIDER: OnceCell<SdkTracerProvider> = OnceCell::new();
    pub(super) static LOGGER_PROVIDER: OnceCell<SdkLoggerProvider> = OnceCell::new();

    pub(super) fn providers(
        config: &TelemetryConfig,
    ) -> anyhow::Result<(SdkTracerProvider, SdkLoggerProvider)> {
        let span_exporter = otlp_exporter!(SpanExporter, config, "v1/traces").map_err(|e| {
            error!("Failed to build OpenTelemetry span exporter: {}", e);
            anyhow::anyhow!("OpenTelemetry span exporter build failed: {}", e)
        })?;

        let log_exporter = otlp_exporter!(LogExporter, config, "v1/logs").map_err(|e| {
            error!("Failed to build OpenTelemetry log exporter: {}", e);
            anyhow::anyhow!("OpenTelemetry log exporter build failed: {}", e)
        })?;

        let resource = crate::telemetry::resource(config);

        let tracer_provider = SdkTracerProvider::builder()
            .with_batch_exporter(span_exporter)
            .with_resource(resource.clone())
            .with_sampler(Sampler::ParentBased(Box::new(Sampler::TraceIdRatioBased(
                config.sampling_rate,
            ))))
            .build();

        let logger_provider = SdkLoggerProvider::builder()
            .with_batch_exporter(log_exporter)
            .with_resource(resource)
            .build();

        opentelemetry::global::set_tracer_provider(tracer_provider.clone());
        opentelemetry::global::set_text_map_propagator(TraceContextPropagator::new());
        crate::telemetry::otel_direct::init_direct_tracer(tracer_provider.clone());

        if TRACER_PROVIDER.set(tracer_provider.clone()).is_err()
            || LOGGER_PROVIDER.set(logger_provider.clone()).is_err()
        {
            warn!("OpenTelemetry providers already installed");
        }

        Ok((tracer_provider, logger_provider))
    }
}

/// Installs the global `tracing` subscriber.
///
/// Console output is always on, as JSON when `log_format` is `json`. With
/// the `otel` feature and `enabled`, spans and log events are also exported
/// over OTLP. A second call is a no-op.
pub fn init_tracing(config: &TelemetryConfig) -> anyhow::Result<()> {
    if tracing::dispatcher::has_been_set() {
        info!("A tracing subscriber is already set, skipping initialization");
        return Ok(());
    }

    let filter = EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    let json = config.log_format.eq_ignore_ascii_case("json");
    let json_layer = json.then(|| tracing_subscriber::fmt::layer().json());
    let text_layer = (!json).then(|| tracing_subscriber::fmt::layer());

    #[cfg(feature = "otel")]
    {
        use opentelemetry::trace::TracerProvider as _;

        let (otel_layer, log_layer) = if config.enabled {
            let (tracer_provider, logger_provider) = otel::providers(config)?;
            let tracer = tracer_provider.tracer("schemock");
            (
                Some(tracing_opentelemetry::layer().with_tracer(tracer)),
                Some(
                    opentelemetry_appender_tracing::layer::OpenTelemetryTracingBridge::new(
                        &logger_provider,
                    ),
                ),
            )
        } else {
            (None, None)
        };

        let _ = Registry::default()
            .with(filter)
            .with(otel_layer)
            .with(log_layer)
            .with(json_layer)
            .with(text_layer)
            .try_init();
    }

    #[cfg(not(feature = "otel"))]
    {
        let _ = Registry::default()
            .with(filter)
            .with(json_layer)
            .with(text_layer)
            .try_init();
    }

    info!(
        level = %config.log_level,
        format = %config.log_format,
        export = config.enabled,
        "Tracing initialized"
    );
    Ok(())
}

pub(crate) fn shutdown() {
    #[cfg(feature = "otel")]
    {
        if let Some(provider) = otel::TRACER_PROVIDER.get() {
            if let Err(e) = provider.shutdown() {
                tracing::warn!(error = %e, "Tracer provider shutdown failed");
            }
        }
        if let Some(provider) = otel::LOGGER_PROVIDER.get() {
            if let Err(e) = provider.shutdown() {
                tracing::warn!(error = %e, "Logger provider shutdown failed");
            }
        }
    }
}

fn log_status(status: u16) {
    if (200..300).contains(&status) {
        tracing::info!("Request successful");
    } else if (300..400).contains(&status) {
        tracing::info!("Redirection");
    } else if (400..500).contains(&status) {
        tracing::warn!("Client error");
    } else if status >= 500 {
        tracing::error!("Server error");
    }
}

pub fn tracing_middleware() -> TracingMiddleware {
    TracingMiddleware
}

/// Wraps every request in an `http.request` span, continues W3C trace
/// context from the request headers and records the schema that served it.
pub struct TracingMiddleware;

impl<S, B> Transform<S, ServiceRequest> for TracingMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = actix_web::Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = actix_web::Error;
    type Transform = TracingMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(TracingMiddlewareService {
            service: Rc::new(service),
        }))
    }
}

pub struct TracingMiddlewareService<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for TracingMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = actix_web::Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = actix_web::Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&self, cx: &mut TaskContext<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();
        let method = req.method().to_string();
        let target = req.path().to_string();

        let span = tracing::info_span!(
            "http.request",
            http.method = %method,
            http.target = %target,
            mock.schema.name = tracing::field::Empty,
            http.response.status_code = tracing::field::Empty,
        );

        #[cfg(feature = "otel")]
        let direct_span = {
            use opentelemetry::propagation::TextMapPropagator;
            use opentelemetry::trace::{Span as _, TraceContextExt as _};
            use tracing_opentelemetry::OpenTelemetrySpanExt;

            let parent_cx = opentelemetry_sdk::propagation::TraceContextPropagator::new()
                .extract(&ActixHeaderExtractor(req.headers()));
            let direct_span = otel_direct::start_server_span(&method, &target, &parent_cx);
            let cx = match &direct_span {
                Some(direct) => parent_cx.with_remote_span_context(direct.span_context().clone()),
                None => parent_cx,
            };
            let _ = span.set_parent(cx);
            direct_span
        };

        Box::pin(async move {
            let response = service.call(req).instrument(span.clone()).await?;
            let status = response.status().as_u16();
            let schema = response
                .response()
                .extensions()
                .get::<MatchedSchema>()
                .map(|matched| matched.0.clone());

            span.record(attributes::http::RESPONSE_STATUS_CODE, status);
            if let Some(schema) = &schema {
                span.record(attributes::mock::SCHEMA_NAME, schema.as_str());
            }

            #[cfg(feature = "otel")]
            {
                if let Some(direct) = direct_span {
                    otel_direct::finish_server_span(direct, status, schema.as_deref());
                }
            }

            let _guard = span.enter();
            log_status(status);

            Ok(response)
        })
    }
}
