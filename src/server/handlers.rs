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

use crate::dispatch::{MockRequest, MockResponse, DEFAULT_CONTENT_TYPE};
use crate::server::app::AppState;
use crate::telemetry::metrics::{record_error, record_latency, record_request, UNMATCHED_ROUTE};
use actix_web::http::header::{HeaderName, HeaderValue, CONTENT_TYPE};
use actix_web::http::StatusCode;
use actix_web::web;
use actix_web::HttpRequest;
use actix_web::HttpResponse;
use std::collections::HashMap;
use std::time::Instant;
use tracing::{info, warn};

/// Name of the schema that served a response. Stored in the response
/// extensions so the tracing middleware can attach it to the request span.
#[derive(Debug, Clone)]
pub struct MatchedSchema(pub String);

pub async fn request_handler(
    req: HttpRequest,
    body: web::Bytes,
    data: web::Data<AppState>,
) -> HttpResponse {
    let start_time = Instant::now();
    let request = mock_request(&req, body);

    info!(
        method = %request.method,
        path = %request.path,
        "Processing request"
    );

    let response = match data.dispatcher.try_dispatch(&request) {
        Ok(response) => response,
        Err(e) => {
            warn!(
                method = %request.method,
                path = %request.path,
                error = %e,
                "No mock response"
            );
            record_error(&request.method, &request.path, e.kind());
            data.dispatcher.error_response(&e)
        }
    };

    let route = response.schema.as_deref().unwrap_or(UNMATCHED_ROUTE);
    let latency = start_time.elapsed().as_secs_f64() * 1000.0;
    record_request(&request.method, route, response.status);
    record_latency(&request.method, route, latency);

    into_http_response(response)
}

fn mock_request(req: &HttpRequest, body: web::Bytes) -> MockRequest {
    let mut headers: HashMap<String, String> = HashMap::new();
    for (name, value) in req.headers() {
        let value = String::from_utf8_lossy(value.as_bytes());
        headers
            .entry(name.as_str().to_string())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(&value);
            })
            .or_insert_with(|| value.into_owned());
    }

    MockRequest {
        method: req.method().to_string(),
        path: req.uri().path().to_string(),
        query: req.uri().query().unwrap_or_default().to_string(),
        headers,
        body,
    }
}

fn into_http_response(response: MockResponse) -> HttpResponse {
    let status = StatusCode::from_u16(response.status).unwrap_or_else(|_| {
        warn!(status = response.status, "Invalid status code, responding with 500");
        StatusCode::INTERNAL_SERVER_ERROR
    });

    let mut builder = HttpResponse::build(status);

    for (name, value) in &response.headers {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                builder.insert_header((name, value));
            }
            _ => warn!(header = %name, "Skipping invalid response header"),
        }
    }

    let content_type = HeaderValue::from_str(&response.content_type).unwrap_or_else(|_| {
        warn!(content_type = %response.content_type, "Invalid Content-Type, using default");
        HeaderValue::from_static(DEFAULT_CONTENT_TYPE)
    });
    builder.insert_header((CONTENT_TYPE, content_type));

    let mut http_response = builder.body(response.body);
    if let Some(schema) = response.schema {
        http_response.extensions_mut().insert(MatchedSchema(schema));
    }

    http_response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MockSchema, ResponseCandidate, SchemaStore};
    use crate::dispatch::condition::ExpressionEvaluator;
    use crate::dispatch::Dispatcher;
    use actix_web::body::to_bytes;
    use actix_web::test;
    use std::sync::Arc;

    fn create_test_state(responses: Vec<ResponseCandidate>) -> web::Data<AppState> {
        let store = SchemaStore::new(vec![MockSchema {
            name: "Widget".to_string(),
            method: "GET".to_string(),
            endpoint: "/widgets/{id}".to_string(),
            responses,
        }]);
        let dispatcher = Dispatcher::new(store, Arc::new(ExpressionEvaluator::new()));
        web::Data::new(AppState::new(Arc::new(dispatcher), 1024 * 1024))
    }

    fn candidate(status: u16, headers: &[(&str, &str)], body: &str) -> ResponseCandidate {
        ResponseCandidate {
            condition: None,
            status_code: status,
            headers: headers
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            response_template: Some(serde_json::Value::String(body.to_string())),
        }
    }

    #[actix_web::test]
    async fn test_request_handler_renders_mock() {
        let state = create_test_state(vec![candidate(
            200,
            &[("X-Widget", "{{path.id}}")],
            r#"{"id":"{{path.id}}"}"#,
        )]);

        let req = test::TestRequest::get().uri("/widgets/5").to_http_request();
        let resp = request_handler(req, web::Bytes::new(), state).await;

        assert_eq!(resp.status(), 200);
        assert_eq!(resp.headers().get("x-widget").unwrap(), "5");
        assert_eq!(resp.headers().get("content-type").unwrap(), "application/json");
        assert_eq!(
            resp.extensions().get::<MatchedSchema>().map(|m| m.0.as_str()),
            Some("Widget")
        );

        let body = to_bytes(resp.into_body()).await.unwrap();
        assert_eq!(body, r#"{"id":"5"}"#);
    }

    #[actix_web::test]
    async fn test_request_handler_not_found() {
        let state = create_test_state(vec![candidate(200, &[], "ok")]);

        let req = test::TestRequest::get().uri("/gadgets").to_http_request();
        let resp = request_handler(req, web::Bytes::new(), state).await;

        assert_eq!(resp.status(), 404);
        assert!(resp.extensions().get::<MatchedSchema>().is_none());
    }

    #[actix_web::test]
    async fn test_invalid_header_is_skipped() {
        let state = create_test_state(vec![candidate(
            200,
            &[("Bad Header", "x"), ("X-Line", "a\nb"), ("X-Good", "yes")],
            "ok",
        )]);

        let req = test::TestRequest::get().uri("/widgets/1").to_http_request();
        let resp = request_handler(req, web::Bytes::new(), state).await;

        assert_eq!(resp.status(), 200);
        assert_eq!(resp.headers().get("x-good").unwrap(), "yes");
        assert!(resp.headers().get("x-line").is_none());
    }

    #[actix_web::test]
    async fn test_content_type_override() {
        let state = create_test_state(vec![candidate(
            200,
            &[("Content-Type", "text/plain; charset=utf-8")],
            "plain",
        )]);

        let req = test::TestRequest::get().uri("/widgets/1").to_http_request();
        let resp = request_handler(req, web::Bytes::new(), state).await;

        assert_eq!(
            resp.headers().get("content-type").unwrap(),
            "text/plain; charset=utf-8"
        );
    }

    #[actix_web::test]
    async fn test_invalid_status_becomes_500() {
        let response = into_http_response(MockResponse {
            status: 1000,
            content_type: DEFAULT_CONTENT_TYPE.to_string(),
            headers: Vec::new(),
            body: String::new(),
            schema: None,
        });
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[actix_web::test]
    async fn test_repeated_request_headers_are_joined() {
        let req = test::TestRequest::get()
            .uri("/widgets/1?x=1")
            .append_header(("Accept", "text/html"))
            .append_header(("Accept", "application/json"))
            .to_http_request();

        let request = mock_request(&req, web::Bytes::new());
        assert_eq!(request.headers["accept"], "text/html, application/json");
        assert_eq!(request.query, "x=1");
    }
}
