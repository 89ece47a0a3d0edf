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

//! Condition expressions attached to response candidates.

use serde_json::{Map, Value};
use std::collections::HashMap;
use tracing::debug;

pub const DEFAULT_MARKER: &str = "default";

const OPERATOR_CHARS: &[char] = &['=', '!', '<', '>', '&', '|', '+', '-', '*', '/', '%'];

/// Per-request values a condition may inspect.
#[derive(Debug, Clone, Copy)]
pub struct ConditionInput<'a> {
    pub headers: &'a HashMap<String, String>,
    pub body: &'a Value,
    pub query: &'a HashMap<String, String>,
    pub path: &'a HashMap<String, String>,
}

/// Decides whether a candidate's condition holds for a request.
///
/// Implementations must be total: a broken expression evaluates to `false`
/// instead of failing the request.
pub trait ConditionEvaluator: Send + Sync {
    fn is_default(&self, condition: Option<&str>) -> bool {
        condition.map_or(true, |c| {
            let c = c.trim();
            c.is_empty() || c.eq_ignore_ascii_case(DEFAULT_MARKER)
        })
    }

    fn evaluate(&self, expression: &str, input: &ConditionInput<'_>) -> bool;
}

/// Evaluates conditions with the `eval` expression language.
///
/// Expressions see `headers` (also bound as `header`), `query`, `path` and
/// `body`. Header names are available both as sent and lower-cased, so
/// `headers.authorization == "secret"` works whatever casing the client used.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExpressionEvaluator;

impl ExpressionEvaluator {
    pub fn new() -> Self {
        Self
    }

    fn headers_value(headers: &HashMap<String, String>) -> Value {
        let mut map = Map::with_capacity(headers.len() * 2);
        for (name, value) in headers {
            map.insert(name.to_lowercase(), Value::String(value.clone()));
        }
        for (name, value) in headers {
            map.insert(name.clone(), Value::String(value.clone()));
        }
        Value::Object(map)
    }

    /// Detects an operator with no right-hand operand, such as `query.role ==`
    /// or `(a == ) || b`. `eval` accepts these and evaluates them against the
    /// left operand, so they are rejected before execution.
    fn has_dangling_operator(expression: &str) -> bool {
        let mut code = String::with_capacity(expression.len());
        let mut quote = None;
        let mut escaped = false;
        for c in expression.chars() {
            match quote {
                Some(q) => {
                    if escaped {
                        escaped = false;
                    } else if c == '\\' {
                        escaped = true;
                    } else if c == q {
                        quote = None;
                        code.push('_');
                    }
                }
                None if c == '"' || c == '\'' => quote = Some(c),
                None => code.push(c),
            }
        }

        let ends_with_operator = |text: &str| text.trim_end().ends_with(OPERATOR_CHARS);

        ends_with_operator(&code)
            || code
                .split("&&")
                .flat_map(|part| part.split("||"))
                .flat_map(|part| part.split(')'))
                .any(ends_with_operator)
    }
}

impl ConditionEvaluator for ExpressionEvaluator {
    fn evaluate(&self, expression: &str, input: &ConditionInput<'_>) -> bool {
        if Self::has_dangling_operator(expression) {
            debug!(condition = %expression, "Condition has an incomplete operand");
            return false;
        }

        let headers = Self::headers_value(input.headers);

        let result = eval::Expr::new(expression)
            .value("headers", &headers)
            .value("header", &headers)
            .value("query", input.query)
            .value("path", input.path)
            .value("body", input.body)
            .exec();

        match result {
            Ok(value) => {
                let matched = value.as_bool().unwrap_or(false);
                debug!(condition = %expression, matched, "Evaluated condition");
                matched
            }
            Err(e) => {
                debug!(condition = %expression, error = %e, "Condition evaluation failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Fixture {
        headers: HashMap<String, String>,
        body: Value,
        query: HashMap<String, String>,
        path: HashMap<String, String>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                headers: HashMap::from([("Authorization".to_string(), "secret".to_string())]),
                body: json!({ "count": 3, "kind": "order" }),
                query: HashMap::from([("role".to_string(), "admin".to_string())]),
                path: HashMap::from([("id".to_string(), "42".to_string())]),
            }
        }

        fn input(&self) -> ConditionInput<'_> {
            ConditionInput {
                headers: &self.headers,
                body: &self.body,
                query: &self.query,
                path: &self.path,
            }
        }
    }

    #[test]
    fn test_default_markers() {
        let evaluator = ExpressionEvaluator::new();
        assert!(evaluator.is_default(None));
        assert!(evaluator.is_default(Some("")));
        assert!(evaluator.is_default(Some("  ")));
        assert!(evaluator.is_default(Some("default")));
        assert!(evaluator.is_default(Some(" DEFAULT ")));
        assert!(!evaluator.is_default(Some("query.role == \"admin\"")));
    }

    #[test]
    fn test_query_and_path_conditions() {
        let fixture = Fixture::new();
        let evaluator = ExpressionEvaluator::new();

        assert!(evaluator.evaluate("query.role == \"admin\"", &fixture.input()));
        assert!(!evaluator.evaluate("query.role == \"guest\"", &fixture.input()));
        assert!(evaluator.evaluate("path.id == \"42\"", &fixture.input()));
    }

    #[test]
    fn test_body_conditions() {
        let fixture = Fixture::new();
        let evaluator = ExpressionEvaluator::new();

        assert!(evaluator.evaluate("body.count > 2", &fixture.input()));
        assert!(evaluator.evaluate("body.kind == \"order\" && body.count < 10", &fixture.input()));
        assert!(!evaluator.evaluate("body.count > 5", &fixture.input()));
    }

    #[test]
    fn test_headers_lowercased() {
        let fixture = Fixture::new();
        let evaluator = ExpressionEvaluator::new();

        assert!(evaluator.evaluate("headers.authorization == \"secret\"", &fixture.input()));
        assert!(evaluator.evaluate("header.Authorization == \"secret\"", &fixture.input()));
    }

    #[test]
    fn test_invalid_or_non_boolean_expressions_are_false() {
        let fixture = Fixture::new();
        let evaluator = ExpressionEvaluator::new();

        assert!(!evaluator.evaluate("query.role ==", &fixture.input()));
        assert!(!evaluator.evaluate("1 + 1", &fixture.input()));
        assert!(!evaluator.evaluate("query.role", &fixture.input()));
    }

    #[test]
    fn test_incomplete_operands_are_false() {
        let fixture = Fixture::new();
        let evaluator = ExpressionEvaluator::new();

        assert!(!evaluator.evaluate("path.id ==", &fixture.input()));
        assert!(!evaluator.evaluate("query.role == \"admin\" &&", &fixture.input()));
        assert!(!evaluator.evaluate("query.role == && path.id == \"42\"", &fixture.input()));
        assert!(!evaluator.evaluate("(body.count >) || true", &fixture.input()));
        assert!(!evaluator.evaluate("body.count > 2 ||  ", &fixture.input()));
    }

    #[test]
    fn test_operators_inside_string_literals() {
        let fixture = Fixture::new();
        let evaluator = ExpressionEvaluator::new();

        assert!(evaluator.evaluate("body.kind != \"order-\"", &fixture.input()));
        assert!(evaluator.evaluate("(query.role == \"admin\") && path.id != \"a||\"", &fixture.input()));
    }
}
