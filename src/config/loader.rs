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

use crate::config::types::{Config, MockSchema, ServerConfig, TelemetryConfig};
use anyhow::Context;
use std::fs;
use std::path::Path;

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Config> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;

        Self::from_str(&content)
    }

    pub fn from_str(content: &str) -> anyhow::Result<Config> {
        let config: Config =
            serde_yaml::from_str(content).with_context(|| "Failed to parse YAML configuration")?;

        Self::validate(&config)?;

        Ok(config)
    }

    fn validate(config: &Config) -> anyhow::Result<()> {
        Self::validate_server_config(&config.server)?;

        if config.telemetry.sampling_rate < 0.0 || config.telemetry.sampling_rate > 1.0 {
            anyhow::bail!("Sampling rate must be between 0.0 and 1.0");
        }

        if config.telemetry.enabled {
            Self::validate_telemetry_config(&config.telemetry)?;
        }

        for environment in &config.environments {
            if environment.name.trim().is_empty() {
                anyhow::bail!("Environment name cannot be empty");
            }
        }

        for schema in &config.schemas {
            Self::validate_schema(schema)
                .with_context(|| format!("Invalid inline schema '{}'", schema.name))?;
        }

        Ok(())
    }

    fn validate_server_config(server: &ServerConfig) -> anyhow::Result<()> {
        if server.port == 0 {
            anyhow::bail!("Server port cannot be 0");
        }

        if server.workers == 0 {
            anyhow::bail!("Number of workers cannot be 0");
        }

        if server.max_connections == Some(0) {
            anyhow::bail!("max_connections must be greater than 0 when set");
        }

        if server.client_request_timeout_ms == Some(0) {
            anyhow::bail!("client_request_timeout_ms must be greater than 0 when set");
        }

        Ok(())
    }

    fn validate_telemetry_config(config: &TelemetryConfig) -> anyhow::Result<()> {
        if config.endpoint.is_empty() {
            anyhow::bail!("Telemetry endpoint cannot be empty");
        }

        let url = url::Url::parse(&config.endpoint).map_err(|_| {
            anyhow::anyhow!("Invalid telemetry endpoint URL format: {}", config.endpoint)
        })?;

        if url.scheme() != "http" && url.scheme() != "https" {
            anyhow::bail!("Telemetry endpoint must use http:// or https:// scheme");
        }

        if url.host().is_none() {
            anyhow::bail!("Telemetry endpoint must have a host");
        }

        let protocol = config.protocol.to_lowercase();
        if protocol != "http" && protocol != "grpc" {
            anyhow::bail!(
                "Telemetry protocol must be 'http' or 'grpc', got '{}'",
                config.protocol
            );
        }

        if config.timeout_seconds == 0 {
            anyhow::bail!("Telemetry timeout must be greater than 0");
        }

        Ok(())
    }

    /// Checks a single mock schema. Shared by inline schemas and files loaded
    /// from the schema directory.
    pub fn validate_schema(schema: &MockSchema) -> anyhow::Result<()> {
        if schema.name.trim().is_empty() {
            anyhow::bail!("Schema name cannot be empty");
        }

        if schema.method.trim().is_empty() {
            anyhow::bail!("Schema method cannot be empty");
        }

        if schema.endpoint.trim().is_empty() {
            anyhow::bail!("Schema endpoint cannot be empty");
        }

        if schema.responses.is_empty() {
            anyhow::bail!("Schema must have at least one response");
        }

        for response in &schema.responses {
            if !(100..=599).contains(&response.status_code) {
                anyhow::bail!("Invalid HTTP status code: {}", response.status_code);
            }
        }

        Ok(())
    }
}
