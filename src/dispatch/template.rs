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

//! `{{ ... }}` marker substitution for response bodies and header values.
//!
//! Unresolved markers are left untouched so they show up in the response.

use crate::dispatch::request::header_value;
use once_cell::sync::Lazy;
use rand::Rng;
use regex::{Captures, Regex};
use serde_json::Value;
use std::collections::HashMap;

pub const RANDOM_NUMBER_BOUND: u32 = 10_000;

static MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{\s*([^{}]+?)\s*\}\}").expect("valid marker regex"));

static RANDOM_INT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{\{\s*\$random:int:(-?\d+):(-?\d+)\s*\}\}")
        .expect("valid random marker regex")
});

/// Replaces every well-formed `{{$random:int:<min>:<max>}}` marker with an
/// integer drawn uniformly from `min..=max`. Markers with `min > max` or
/// bounds that do not fit an `i64` are kept as they are.
pub fn expand_dynamic(template: &str) -> String {
    if !template.contains("$random") {
        return template.to_string();
    }

    RANDOM_INT
        .replace_all(template, |caps: &Captures| {
            let bounds = caps[1].parse::<i64>().ok().zip(caps[2].parse::<i64>().ok());
            match bounds {
                Some((min, max)) if min <= max => {
                    rand::thread_rng().gen_range(min..=max).to_string()
                }
                _ => caps[0].to_string(),
            }
        })
        .into_owned()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VariableSet {
    Body,
    Header,
}

/// Request data visible to templates. Built once per request.
#[derive(Debug, Clone, Default)]
pub struct TemplateContext {
    pub environment: HashMap<String, String>,
    pub headers: HashMap<String, String>,
    pub path: HashMap<String, String>,
    pub query: HashMap<String, String>,
    pub body: Value,
}

impl TemplateContext {
    /// Renders a response body template.
    ///
    /// Resolves `$random:int` markers, then `path.*`, `query.*`, `header.*`
    /// (or `headers.*`), `body.*`, `random.id`, `random.number` and
    /// `timestamp`. Random values are fresh for every marker; the timestamp
    /// is taken once per call.
    pub fn render(&self, template: &str) -> String {
        let expanded = expand_dynamic(template);
        self.substitute(&expanded, VariableSet::Body)
    }

    /// Renders a response header value.
    ///
    /// Header values see `path.*`, `env.*`, `query.*`, `header.*` and
    /// `body.*` but none of the generated values available to bodies.
    pub fn render_header(&self, template: &str) -> String {
        self.substitute(template, VariableSet::Header)
    }

    fn substitute(&self, template: &str, set: VariableSet) -> String {
        if !template.contains("{{") {
            return template.to_string();
        }

        let timestamp = chrono::Utc::now().timestamp().to_string();

        MARKER
            .replace_all(template, |caps: &Captures| {
                self.resolve(&caps[1], set, &timestamp)
                    .unwrap_or_else(|| caps[0].to_string())
            })
            .into_owned()
    }

    fn resolve(&self, key: &str, set: VariableSet, timestamp: &str) -> Option<String> {
        if set == VariableSet::Body {
            match key {
                "random.id" => return Some(uuid::Uuid::new_v4().to_string()),
                "random.number" => {
                    return Some(rand::thread_rng().gen_range(0..RANDOM_NUMBER_BOUND).to_string())
                }
                "timestamp" => return Some(timestamp.to_string()),
                _ => {}
            }
        }

        let (namespace, name) = key.split_once('.')?;
        match namespace {
            "path" => self.path.get(name).cloned(),
            "env" if set == VariableSet::Header => self.environment.get(name).cloned(),
            "query" => self.query.get(name).cloned(),
            "header" | "headers" => header_value(&self.headers, name).map(str::to_string),
            "body" => self.body_field(name),
            _ => None,
        }
    }

    fn body_field(&self, name: &str) -> Option<String> {
        let value = self.body.as_object()?.get(name)?;
        Some(match value {
            Value::String(s) => s.clone(),
            Value::Null => String::new(),
            other => other.to_string(),
        })
    }
}
