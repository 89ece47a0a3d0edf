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

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    #[serde(default)]
    pub mock_server: MockServerConfig,
    #[serde(default)]
    pub environments: Vec<Environment>,
    /// Schemas declared inline; appended after the ones found in `schema_dir`.
    #[serde(default)]
    pub schemas: Vec<MockSchema>,
}

impl Config {
    /// Variables of the configured default environment.
    ///
    /// Falls back to the first declared environment when no default is named
    /// or the named one does not exist, and to an empty set when none exist.
    pub fn environment_variables(&self) -> HashMap<String, String> {
        let named = self.mock_server.default_environment.as_deref().and_then(|name| {
            self.environments
                .iter()
                .find(|env| env.name.eq_ignore_ascii_case(name))
        });

        named
            .or_else(|| self.environments.first())
            .map(|env| env.variables.clone())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_workers")]
    pub workers: usize,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_max_request_size")]
    pub max_request_size: usize,
    /// Per-worker cap on concurrent connections. Unbounded (actix default) when unset.
    #[serde(default)]
    pub max_connections: Option<usize>,
    /// Time allowed for a client to send request headers.
    #[serde(default)]
    pub client_request_timeout_ms: Option<u64>,
}

fn default_port() -> u16 {
    8080
}

fn default_workers() -> usize {
    4
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_max_request_size() -> usize {
    10 * 1024 * 1024 // 10MB
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Enables OTLP export. Console logging is always on.
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_service_name")]
    pub service_name: String,
    #[serde(default = "default_service_version")]
    pub service_version: String,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_protocol")]
    pub protocol: String,
    #[serde(default = "default_sampling_rate")]
    pub sampling_rate: f64,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_log_format")]
    pub log_format: String,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

fn default_service_name() -> String {
    "schemock".to_string()
}

fn default_service_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

fn default_endpoint() -> String {
    "http://localhost:4317".to_string()
}

fn default_protocol() -> String {
    "grpc".to_string()
}

fn default_sampling_rate() -> f64 {
    1.0
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_timeout_seconds() -> u64 {
    10
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MockServerConfig {
    /// Directory scanned recursively for `*.mock.json` files.
    #[serde(default = "default_schema_dir")]
    pub schema_dir: PathBuf,
    /// Headers added to every mock response before the candidate's own headers.
    #[serde(default)]
    pub default_headers: HashMap<String, String>,
    #[serde(default)]
    pub default_environment: Option<String>,
}

fn default_schema_dir() -> PathBuf {
    PathBuf::from(".apify")
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Environment {
    pub name: String,
    #[serde(default)]
    pub variables: HashMap<String, String>,
}

/// A mock definition: one method and endpoint pattern bound to an ordered list
/// of conditional responses. Order of `responses` is significant.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MockSchema {
    #[serde(default, alias = "Name")]
    pub name: String,
    #[serde(alias = "Method")]
    pub method: String,
    #[serde(alias = "Endpoint")]
    pub endpoint: String,
    #[serde(default, alias = "Responses")]
    pub responses: Vec<ResponseCandidate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseCandidate {
    #[serde(default, alias = "Condition")]
    pub condition: Option<String>,
    #[serde(default = "default_status_code", alias = "StatusCode")]
    pub status_code: u16,
    #[serde(default, alias = "Headers")]
    pub headers: HashMap<String, String>,
    /// Either a literal string template or a structured value serialized
    /// before templating.
    #[serde(default, alias = "ResponseTemplate")]
    pub response_template: Option<serde_json::Value>,
}

fn default_status_code() -> u16 {
    200
}

impl ResponseCandidate {
    pub fn body_template(&self) -> String {
        match &self.response_template {
            Some(serde_json::Value::String(template)) => template.clone(),
            Some(value) => serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string()),
            None => "{}".to_string(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            workers: default_workers(),
            host: default_host(),
            max_request_size: default_max_request_size(),
            max_connections: None,
            client_request_timeout_ms: None,
        }
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            service_name: default_service_name(),
            service_version: default_service_version(),
            endpoint: default_endpoint(),
            protocol: default_protocol(),
            sampling_rate: default_sampling_rate(),
            log_level: default_log_level(),
            log_format: default_log_format(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

impl Default for MockServerConfig {
    fn default() -> Self {
        Self {
            schema_dir: default_schema_dir(),
            default_headers: HashMap::new(),
            default_environment: None,
        }
    }
}
