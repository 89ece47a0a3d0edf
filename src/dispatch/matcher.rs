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

use crate::config::{MockSchema, SchemaStore};
use regex::Regex;
use std::collections::HashMap;
use tracing::warn;

/// Named values bound by `{name}` placeholders of an endpoint pattern.
pub type PathParameters = HashMap<String, String>;

/// Placeholder form of an endpoint: one capture group per `{name}`.
#[derive(Debug, Clone)]
struct Placeholders {
    names: Vec<String>,
    /// `None` when the pattern could not be compiled; such a pattern never matches.
    regex: Option<Regex>,
}

/// A compiled endpoint pattern.
#[derive(Debug, Clone)]
pub struct PathPattern {
    raw: String,
    lowered: String,
    placeholders: Option<Placeholders>,
}

impl PathPattern {
    pub fn compile(pattern: &str) -> Self {
        let placeholders = has_placeholders(pattern).then(|| Self::compile_placeholders(pattern));

        Self {
            raw: pattern.to_string(),
            lowered: pattern.to_lowercase(),
            placeholders,
        }
    }

    /// Literal text is matched exactly. Each placeholder binds a non-empty run
    /// of non-`/` characters, as short as possible, so `{from}-{to}` splits
    /// `1-5` at the first dash.
    fn compile_placeholders(pattern: &str) -> Placeholders {
        let mut names = Vec::new();
        let mut source = String::from("^");
        let mut rest = pattern;

        while let Some(open) = rest.find('{') {
            let Some(close) = rest[open..].find('}').map(|i| open + i) else {
                break;
            };
            source.push_str(&regex::escape(&rest[..open]));
            source.push_str("([^/]+?)");
            names.push(rest[open + 1..close].to_string());
            rest = &rest[close + 1..];
        }
        source.push_str(&regex::escape(rest));
        source.push('$');

        let regex = Regex::new(&source)
            .map_err(|e| warn!(pattern = %pattern, error = %e, "Failed to compile endpoint pattern"))
            .ok();

        Placeholders { names, regex }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn has_placeholders(&self) -> bool {
        self.placeholders.is_some()
    }

    /// Tests `path` against the pattern.
    ///
    /// Without placeholders this is a case-insensitive comparison of the whole
    /// path. With placeholders the path must have exactly as many segments as
    /// the pattern, literal text must be equal, and every placeholder must
    /// bind a non-empty value. A repeated name keeps its last binding.
    pub fn matches(&self, path: &str) -> Option<PathParameters> {
        let Some(placeholders) = &self.placeholders else {
            return (self.lowered == path.to_lowercase()).then(PathParameters::new);
        };

        let captures = placeholders.regex.as_ref()?.captures(path)?;
        let params = placeholders
            .names
            .iter()
            .zip(captures.iter().skip(1))
            .filter_map(|(name, value)| Some((name.clone(), value?.as_str().to_string())))
            .collect();

        Some(params)
    }
}

fn has_placeholders(pattern: &str) -> bool {
    pattern.contains('{') && pattern.contains('}')
}

/// One-off match of `path` against an uncompiled pattern.
pub fn match_path(pattern: &str, path: &str) -> Option<PathParameters> {
    PathPattern::compile(pattern).matches(path)
}

/// A schema chosen for a request together with its bound path parameters.
#[derive(Debug)]
pub struct SchemaMatch<'a> {
    pub schema: &'a MockSchema,
    pub path_params: PathParameters,
}

/// Resolves a request method and path to a schema of the store.
#[derive(Debug, Clone)]
pub struct SchemaMatcher {
    store: SchemaStore,
    patterns: Vec<PathPattern>,
}

impl SchemaMatcher {
    pub fn new(store: SchemaStore) -> Self {
        let patterns = store
            .list()
            .iter()
            .map(|schema| PathPattern::compile(&schema.endpoint))
            .collect();

        Self { store, patterns }
    }

    pub fn schemas(&self) -> &[MockSchema] {
        self.store.list()
    }

    /// Exact method and endpoint matches win over pattern matches. Pattern
    /// matching only considers endpoints with placeholders, in store order.
    pub fn find(&self, method: &str, path: &str) -> Option<SchemaMatch<'_>> {
        let lowered_path = path.to_lowercase();
        let candidates = || {
            self.store
                .list()
                .iter()
                .zip(&self.patterns)
                .filter(|(schema, _)| schema.method.eq_ignore_ascii_case(method))
        };

        if let Some((schema, pattern)) =
            candidates().find(|(schema, _)| schema.endpoint.to_lowercase() == lowered_path)
        {
            return Some(SchemaMatch {
                schema,
                path_params: pattern.matches(path).unwrap_or_default(),
            });
        }

        candidates()
            .filter(|(_, pattern)| pattern.has_placeholders())
            .find_map(|(schema, pattern)| {
                pattern.matches(path).map(|path_params| SchemaMatch {
                    schema,
                    path_params,
                })
            })
    }
}
