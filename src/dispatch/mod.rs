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

//! Request-to-response dispatch.
//!
//! [`Dispatcher`] is independent of the HTTP server: it takes a
//! [`MockRequest`], finds the schema, selects a response candidate and renders
//! it into a [`MockResponse`]. The server layer only converts between wire
//! types and these.

pub mod condition;
pub mod matcher;
pub mod multipart;
pub mod request;
pub mod selector;
pub mod template;

use crate::config::{Config, MockSchema, ResponseCandidate, SchemaStore};
use bytes::Bytes;
use condition::{ConditionEvaluator, ConditionInput, ExpressionEvaluator};
use matcher::SchemaMatcher;
use multipart::MultipartError;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use template::TemplateContext;
use thiserror::Error;
use tracing::{debug, warn};

pub use condition::DEFAULT_MARKER;
pub use selector::SelectionKind;

pub const DEFAULT_CONTENT_TYPE: &str = "application/json";

#[derive(Debug, Clone, Default)]
pub struct MockRequest {
    pub method: String,
    pub path: String,
    /// Raw query string, without the leading `?`.
    pub query: String,
    pub headers: HashMap<String, String>,
    pub body: Bytes,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockResponse {
    pub status: u16,
    pub content_type: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
    /// Name of the schema that produced the response, if any.
    pub schema: Option<String>,
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("No mock defined for {method} {path}")]
    NotFound { method: String, path: String },

    #[error("No condition matched the request and no default response was defined")]
    NoResponseMatch { schema: String },

    #[error(transparent)]
    Multipart(#[from] MultipartError),
}

impl DispatchError {
    pub fn status(&self) -> u16 {
        match self {
            DispatchError::NotFound { .. } => 404,
            DispatchError::NoResponseMatch { .. } => 500,
            DispatchError::Multipart(_) => 400,
        }
    }

    /// Short label used for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            DispatchError::NotFound { .. } => "not_found",
            DispatchError::NoResponseMatch { .. } => "no_response_match",
            DispatchError::Multipart(_) => "bad_request",
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct NotFoundBody<'a> {
    error: &'static str,
    message: String,
    available_endpoints: Vec<EndpointSummary<'a>>,
}

#[derive(Serialize)]
struct EndpointSummary<'a> {
    method: &'a str,
    endpoint: &'a str,
    name: &'a str,
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

pub struct Dispatcher {
    matcher: SchemaMatcher,
    evaluator: Arc<dyn ConditionEvaluator>,
    default_headers: HashMap<String, String>,
    environment: HashMap<String, String>,
}

impl Dispatcher {
    pub fn new(store: SchemaStore, evaluator: Arc<dyn ConditionEvaluator>) -> Self {
        Self {
            matcher: SchemaMatcher::new(store),
            evaluator,
            default_headers: HashMap::new(),
            environment: HashMap::new(),
        }
    }

    /// Dispatcher with the expression evaluator plus the default headers and
    /// environment variables from `config`.
    pub fn from_config(config: &Config, store: SchemaStore) -> Self {
        Self::new(store, Arc::new(ExpressionEvaluator::new()))
            .with_default_headers(config.mock_server.default_headers.clone())
            .with_environment(config.environment_variables())
    }

    pub fn with_default_headers(mut self, headers: HashMap<String, String>) -> Self {
        self.default_headers = headers;
        self
    }

    pub fn with_environment(mut self, variables: HashMap<String, String>) -> Self {
        self.environment = variables;
        self
    }

    pub fn schemas(&self) -> &[MockSchema] {
        self.matcher.schemas()
    }

    /// Always produces a response; dispatch failures become JSON error
    /// payloads with the matching status.
    pub fn dispatch(&self, request: &MockRequest) -> MockResponse {
        match self.try_dispatch(request) {
            Ok(response) => response,
            Err(e) => {
                warn!(
                    method = %request.method,
                    path = %request.path,
                    error = %e,
                    "Dispatch failed"
                );
                self.error_response(&e)
            }
        }
    }

    pub fn try_dispatch(&self, request: &MockRequest) -> Result<MockResponse, DispatchError> {
        let found = self
            .matcher
            .find(&request.method, &request.path)
            .ok_or_else(|| DispatchError::NotFound {
                method: request.method.clone(),
                path: request.path.clone(),
            })?;
        let schema = found.schema;

        let content_type = request::header_value(&request.headers, "content-type");
        let body = request::parse_body(content_type, &request.body)?;
        let query = request::parse_query(&request.query);

        let input = ConditionInput {
            headers: &request.headers,
            body: &body,
            query: &query,
            path: &found.path_params,
        };

        let selection = selector::select(
            &schema.responses,
            |condition| self.evaluator.is_default(condition),
            |expression| self.evaluator.evaluate(expression, &input),
        )
        .ok_or_else(|| DispatchError::NoResponseMatch {
            schema: schema.name.clone(),
        })?;

        debug!(
            schema = %schema.name,
            selection = ?selection.kind,
            status = selection.candidate.status_code,
            "Selected response"
        );

        let context = TemplateContext {
            environment: self.environment.clone(),
            headers: request.headers.clone(),
            path: found.path_params,
            query,
            body,
        };

        Ok(self.render(schema, selection.candidate, &context))
    }

    fn render(
        &self,
        schema: &MockSchema,
        candidate: &ResponseCandidate,
        context: &TemplateContext,
    ) -> MockResponse {
        let mut headers: Vec<(String, String)> = Vec::new();
        for (name, value) in self.default_headers.iter().chain(&candidate.headers) {
            upsert_header(&mut headers, name, context.render_header(value));
        }

        let mut content_type = DEFAULT_CONTENT_TYPE.to_string();
        headers.retain(|(name, value)| {
            if name.eq_ignore_ascii_case("content-type") {
                content_type = value.clone();
                false
            } else {
                true
            }
        });

        let body = template::expand_dynamic(&context.render(&candidate.body_template()));

        MockResponse {
            status: candidate.status_code,
            content_type,
            headers,
            body,
            schema: Some(schema.name.clone()),
        }
    }

    pub fn error_response(&self, error: &DispatchError) -> MockResponse {
        let body = match error {
            DispatchError::NotFound { .. } => to_pretty_json(&NotFoundBody {
                error: "Not Found",
                message: error.to_string(),
                available_endpoints: self
                    .schemas()
                    .iter()
                    .map(|schema| EndpointSummary {
                        method: &schema.method,
                        endpoint: &schema.endpoint,
                        name: &schema.name,
                        kind: "advanced",
                    })
                    .collect(),
            }),
            DispatchError::NoResponseMatch { .. } => to_pretty_json(&ErrorBody {
                error: "No Response Match",
                message: error.to_string(),
            }),
            DispatchError::Multipart(_) => to_pretty_json(&ErrorBody {
                error: "Bad Request",
                message: error.to_string(),
            }),
        };

        let schema = match error {
            DispatchError::NoResponseMatch { schema } => Some(schema.clone()),
            _ => None,
        };

        MockResponse {
            status: error.status(),
            content_type: DEFAULT_CONTENT_TYPE.to_string(),
            headers: Vec::new(),
            body,
            schema,
        }
    }
}

fn upsert_header(headers: &mut Vec<(String, String)>, name: &str, value: String) {
    match headers
        .iter_mut()
        .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
    {
        Some(entry) => *entry = (name.to_string(), value),
        None => headers.push((name.to_string(), value)),
    }
}

fn to_pretty_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|e| {
        warn!(error = %e, "Failed to serialize error body");
        String::from("{}")
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn candidate(condition: Option<&str>, status: u16, template: Value) -> ResponseCandidate {
        ResponseCandidate {
            condition: condition.map(str::to_string),
            status_code: status,
            headers: HashMap::new(),
            response_template: Some(template),
        }
    }

    fn schema(name: &str, method: &str, endpoint: &str, responses: Vec<ResponseCandidate>) -> MockSchema {
        MockSchema {
            name: name.to_string(),
            method: method.to_string(),
            endpoint: endpoint.to_string(),
            responses,
        }
    }

    fn dispatcher(schemas: Vec<MockSchema>) -> Dispatcher {
        Dispatcher::new(SchemaStore::new(schemas), Arc::new(ExpressionEvaluator::new()))
    }

    fn get(path: &str) -> MockRequest {
        MockRequest {
            method: "GET".to_string(),
            path: path.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_path_parameter_rendered_into_body() {
        let dispatcher = dispatcher(vec![schema(
            "Item",
            "GET",
            "/items/{id}",
            vec![candidate(None, 200, json!(r#"{"id":"{{path.id}}"}"#))],
        )]);

        let response = dispatcher.dispatch(&get("/items/9"));
        assert_eq!(response.status, 200);
        assert_eq!(response.body, r#"{"id":"9"}"#);
        assert_eq!(response.content_type, DEFAULT_CONTENT_TYPE);
        assert_eq!(response.schema.as_deref(), Some("Item"));
    }

    #[test]
    fn test_not_found_lists_endpoints() {
        let dispatcher = dispatcher(vec![
            schema("Users", "GET", "/users", vec![candidate(None, 200, json!([]))]),
            schema("Create", "POST", "/users", vec![candidate(None, 201, json!({}))]),
        ]);

        let request = MockRequest {
            method: "DELETE".to_string(),
            path: "/unknown".to_string(),
            ..Default::default()
        };

        let response = dispatcher.dispatch(&request);
        assert_eq!(response.status, 404);
        assert!(response.schema.is_none());
        assert!(response.body.contains('\n'));

        let body: Value = serde_json::from_str(&response.body).unwrap();
        assert_eq!(body["error"], "Not Found");
        assert_eq!(body["message"], "No mock defined for DELETE /unknown");
        assert_eq!(body["availableEndpoints"].as_array().unwrap().len(), 2);
        assert_eq!(
            body["availableEndpoints"][1],
            json!({ "method": "POST", "endpoint": "/users", "name": "Create", "type": "advanced" })
        );
    }

    #[test]
    fn test_error_body_key_order() {
        let dispatcher = dispatcher(vec![]);
        let response = dispatcher.error_response(&DispatchError::NoResponseMatch {
            schema: "Empty".to_string(),
        });

        assert_eq!(response.status, 500);
        assert_eq!(
            response.body,
            "{\n  \"error\": \"No Response Match\",\n  \"message\": \"No condition matched the request and no default response was defined\"\n}"
        );
        assert_eq!(response.schema.as_deref(), Some("Empty"));
    }

    #[test]
    fn test_schema_without_candidates_is_no_response_match() {
        let dispatcher = dispatcher(vec![schema("Empty", "GET", "/empty", vec![])]);

        let result = dispatcher.try_dispatch(&get("/empty"));
        assert!(matches!(result, Err(DispatchError::NoResponseMatch { .. })));
        assert_eq!(dispatcher.dispatch(&get("/empty")).status, 500);
    }

    #[test]
    fn test_condition_selects_candidate() {
        let dispatcher = dispatcher(vec![schema(
            "Search",
            "GET",
            "/search",
            vec![
                candidate(Some("query.role == \"admin\""), 200, json!("admin")),
                candidate(Some("default"), 403, json!("denied")),
            ],
        )]);

        let mut request = get("/search");
        request.query = "role=admin".to_string();
        let response = dispatcher.dispatch(&request);
        assert_eq!(response.status, 200);
        assert_eq!(response.body, "admin");

        request.query = "role=guest".to_string();
        let response = dispatcher.dispatch(&request);
        assert_eq!(response.status, 403);
        assert_eq!(response.body, "denied");
    }

    #[test]
    fn test_truncated_condition_falls_through_to_default() {
        let dispatcher = dispatcher(vec![schema(
            "Search",
            "GET",
            "/search",
            vec![
                candidate(Some("query.role =="), 200, json!("admin")),
                candidate(Some("default"), 403, json!("denied")),
            ],
        )]);

        let mut request = get("/search");
        request.query = "role=guest".to_string();
        let response = dispatcher.dispatch(&request);
        assert_eq!(response.status, 403);
        assert_eq!(response.body, "denied");
    }

    #[test]
    fn test_headers_merge_and_content_type() {
        let mut response_candidate = candidate(None, 200, json!("<p>{{query.name}}</p>"));
        response_candidate.headers = HashMap::from([
            ("content-type".to_string(), "text/html".to_string()),
            ("x-powered-by".to_string(), "candidate".to_string()),
            ("X-Key".to_string(), "{{env.API_KEY}}".to_string()),
        ]);

        let dispatcher = dispatcher(vec![schema("Page", "GET", "/page", vec![response_candidate])])
            .with_default_headers(HashMap::from([(
                "X-Powered-By".to_string(),
                "schemock".to_string(),
            )]))
            .with_environment(HashMap::from([("API_KEY".to_string(), "k1".to_string())]));

        let mut request = get("/page");
        request.query = "name=Ada".to_string();
        let response = dispatcher.dispatch(&request);

        assert_eq!(response.content_type, "text/html");
        assert_eq!(response.body, "<p>Ada</p>");

        let powered: Vec<_> = response
            .headers
            .iter()
            .filter(|(name, _)| name.eq_ignore_ascii_case("x-powered-by"))
            .collect();
        assert_eq!(powered.len(), 1);
        assert_eq!(powered[0].1, "candidate");

        assert!(response
            .headers
            .contains(&("X-Key".to_string(), "k1".to_string())));
    }

    #[test]
    fn test_body_values_rendered() {
        let dispatcher = dispatcher(vec![schema(
            "Echo",
            "POST",
            "/echo",
            vec![candidate(None, 201, json!({ "hello": "{{body.name}}" }))],
        )]);

        let request = MockRequest {
            method: "POST".to_string(),
            path: "/echo".to_string(),
            headers: HashMap::from([("Content-Type".to_string(), "application/json".to_string())]),
            body: Bytes::from_static(br#"{"name":"Ada"}"#),
            ..Default::default()
        };

        let response = dispatcher.dispatch(&request);
        assert_eq!(response.status, 201);
        let body: Value = serde_json::from_str(&response.body).unwrap();
        assert_eq!(body, json!({ "hello": "Ada" }));
    }

    #[test]
    fn test_final_dynamic_pass_over_rendered_body() {
        let dispatcher = dispatcher(vec![schema(
            "Echo",
            "GET",
            "/echo",
            vec![candidate(None, 200, json!("{{query.v}}"))],
        )]);

        let mut request = get("/echo");
        request.query = "v={{$random:int:5:5}}".to_string();
        assert_eq!(dispatcher.dispatch(&request).body, "5");
    }

    #[test]
    fn test_malformed_multipart_is_bad_request() {
        let dispatcher = dispatcher(vec![schema(
            "Upload",
            "POST",
            "/upload",
            vec![candidate(None, 200, json!("ok"))],
        )]);

        let request = MockRequest {
            method: "POST".to_string(),
            path: "/upload".to_string(),
            headers: HashMap::from([(
                "Content-Type".to_string(),
                "multipart/form-data; boundary=xyz".to_string(),
            )]),
            body: Bytes::from_static(b"--xyz\r\nContent-Disposition: form-data; name=\"a\"\r\n"),
            ..Default::default()
        };

        let response = dispatcher.dispatch(&request);
        assert_eq!(response.status, 400);
        let body: Value = serde_json::from_str(&response.body).unwrap();
        assert_eq!(body["error"], "Bad Request");
    }
}
