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

//! Server spans created straight from the SDK tracer provider.
//!
//! These carry the mock attributes as real OTel attributes and end with an
//! explicit status. The `tracing` request span is parented to them.

use crate::telemetry::attributes::{self, kv};
use opentelemetry::trace::{Span as _, SpanKind, Status, Tracer as _, TracerProvider as _};
use opentelemetry::Context;
use opentelemetry_sdk::trace::{SdkTracerProvider, Span, Tracer};
use std::sync::RwLock;

static TRACER_PROVIDER: RwLock<Option<SdkTracerProvider>> = RwLock::new(None);

pub fn init_direct_tracer(provider: SdkTracerProvider) {
    if let Ok(mut slot) = TRACER_PROVIDER.write() {
        *slot = Some(provider);
    }
}

fn tracer() -> Option<Tracer> {
    let slot = TRACER_PROVIDER.read().ok()?;
    slot.as_ref().map(|provider| provider.tracer("schemock-direct"))
}

/// Starts a server span for an incoming request, or `None` when OTLP export
/// has not been initialized.
pub fn start_server_span(method: &str, target: &str, parent_cx: &Context) -> Option<Span> {
    let tracer = tracer()?;

    let span = tracer
        .span_builder("http.request")
        .with_kind(SpanKind::Server)
        .with_attributes(vec![kv::http_method(method), kv::http_target(target)])
        .start_with_context(&tracer, parent_cx);

    Some(span)
}

pub fn finish_server_span(mut span: Span, status: u16, schema: Option<&str>) {
    span.set_attribute(kv::http_response_status_code(status));
    span.set_attribute(kv::mock_outcome(attributes::mock::outcome(schema, status)));

    if let Some(schema) = schema {
        span.set_attribute(kv::mock_schema_name(schema));
        span.set_attribute(kv::http_route(schema));
    }

    match status {
        200..=399 => span.set_status(Status::Ok),
        400..=499 => span.set_status(Status::error("Client error")),
        _ => span.set_status(Status::error("Server error")),
    }

    span.end();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    static TEST_LOCK: Mutex<()> = Mutex::new(());

    fn swap_provider(provider: Option<SdkTracerProvider>) -> Option<SdkTracerProvider> {
        let mut slot = TRACER_PROVIDER.write().unwrap();
        std::mem::replace(&mut *slot, provider)
    }

    #[test]
    fn test_no_span_without_provider() {
        let _guard = TEST_LOCK.lock().unwrap();
        let original = swap_provider(None);

        let span = start_server_span("GET", "/users", &Context::current());
        assert!(span.is_none());

        swap_provider(original);
    }

    #[test]
    fn test_span_lifecycle_with_provider() {
        let _guard = TEST_LOCK.lock().unwrap();
        let original = swap_provider(None);

        init_direct_tracer(SdkTracerProvider::builder().build());

        let span = start_server_span("GET", "/users/1", &Context::current());
        assert!(span.is_some());
        finish_server_span(span.unwrap(), 200, Some("User by id"));

        let span = start_server_span("DELETE", "/unknown", &Context::current()).unwrap();
        finish_server_span(span, 404, None);

        swap_provider(original);
    }
}
