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

//! Attribute keys shared by spans, logs and metrics.

pub mod http {
    pub const METHOD: &str = "http.method";

    pub const ROUTE: &str = "http.route";

    pub const TARGET: &str = "http.target";

    pub const RESPONSE_STATUS_CODE: &str = "http.response.status_code";
}

pub mod mock {
    /// Name of the schema that served the request.
    pub const SCHEMA_NAME: &str = "mock.schema.name";

    /// `matched`, `not_found` or `rejected`.
    pub const OUTCOME: &str = "mock.outcome";

    pub fn outcome(schema: Option<&str>, status: u16) -> &'static str {
        match (schema, status) {
            (Some(_), _) => "matched",
            (None, 404) => "not_found",
            (None, _) => "rejected",
        }
    }
}

pub mod error {
    pub const TYPE: &str = "error.type";
}

#[cfg(feature = "otel")]
pub mod kv {
    use opentelemetry::KeyValue;

    pub fn http_method(method: impl Into<String>) -> KeyValue {
        KeyValue::new(super::http::METHOD, method.into())
    }

    pub fn http_route(route: impl Into<String>) -> KeyValue {
        KeyValue::new(super::http::ROUTE, route.into())
    }

    pub fn http_target(target: impl Into<String>) -> KeyValue {
        KeyValue::new(super::http::TARGET, target.into())
    }

    pub fn http_response_status_code(status: u16) -> KeyValue {
        KeyValue::new(super::http::RESPONSE_STATUS_CODE, status as i64)
    }

    pub fn mock_schema_name(name: impl Into<String>) -> KeyValue {
        KeyValue::new(super::mock::SCHEMA_NAME, name.into())
    }

    pub fn mock_outcome(outcome: &'static str) -> KeyValue {
        KeyValue::new(super::mock::OUTCOME, outcome)
    }

    pub fn error_type(error_type: impl Into<String>) -> KeyValue {
        KeyValue::new(super::error::TYPE, error_type.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_constants() {
        assert_eq!(http::METHOD, "http.method");
        assert_eq!(http::ROUTE, "http.route");
        assert_eq!(http::TARGET, "http.target");
        assert_eq!(http::RESPONSE_STATUS_CODE, "http.response.status_code");
    }

    #[test]
    fn test_mock_outcome() {
        assert_eq!(mock::outcome(Some("Users"), 200), "matched");
        assert_eq!(mock::outcome(Some("Users"), 500), "matched");
        assert_eq!(mock::outcome(None, 404), "not_found");
        assert_eq!(mock::outcome(None, 400), "rejected");
    }

    #[cfg(feature = "otel")]
    #[test]
    fn test_kv_helpers() {
        let status = kv::http_response_status_code(201);
        assert_eq!(status.key.as_str(), http::RESPONSE_STATUS_CODE);
        assert_eq!(status.value, opentelemetry::Value::I64(201));

        let schema = kv::mock_schema_name("Users");
        assert_eq!(schema.key.as_str(), mock::SCHEMA_NAME);
        assert_eq!(schema.value.as_str(), "Users");
    }
}
