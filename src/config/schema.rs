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

//! Mock schema discovery.
//!
//! Schemas are read once at startup from `*.mock.json` files below the
//! configured directory plus any declared inline in the config file. The
//! resulting [`SchemaStore`] is immutable and shared by every request.

use crate::config::loader::ConfigLoader;
use crate::config::types::{Config, MockSchema};
use anyhow::Context;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

pub const SCHEMA_FILE_SUFFIX: &str = ".mock.json";

pub struct SchemaLoader;

impl SchemaLoader {
    /// Loads every schema file below `dir`, in sorted path order.
    ///
    /// A missing directory is created and yields no schemas. Files that fail
    /// to parse or validate are skipped with a warning.
    pub fn load_dir<P: AsRef<Path>>(dir: P) -> anyhow::Result<Vec<MockSchema>> {
        let dir = dir.as_ref();

        if !dir.exists() {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create mock schema directory: {:?}", dir))?;
            info!(dir = ?dir, "Created mock schema directory");
            return Ok(Vec::new());
        }

        let mut files = Vec::new();
        Self::collect_schema_files(dir, &mut files)?;
        files.sort();

        info!(count = files.len(), dir = ?dir, "Found mock schema files");

        let mut schemas = Vec::with_capacity(files.len());
        for file in files {
            match Self::load_file(&file) {
                Ok(schema) => {
                    info!(
                        name = %schema.name,
                        method = %schema.method,
                        endpoint = %schema.endpoint,
                        "Loaded mock schema"
                    );
                    schemas.push(schema);
                }
                Err(e) => {
                    warn!(file = ?file, error = %format!("{:#}", e), "Skipping mock schema file");
                }
            }
        }

        Ok(schemas)
    }

    pub fn load_file<P: AsRef<Path>>(path: P) -> anyhow::Result<MockSchema> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read schema file: {:?}", path))?;

        let mut schema: MockSchema = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse schema file: {:?}", path))?;

        if schema.name.trim().is_empty() {
            schema.name = schema_name_from_path(path);
        }

        ConfigLoader::validate_schema(&schema)?;

        Ok(schema)
    }

    fn collect_schema_files(dir: &Path, files: &mut Vec<PathBuf>) -> anyhow::Result<()> {
        let entries =
            fs::read_dir(dir).with_context(|| format!("Failed to read directory: {:?}", dir))?;

        for entry in entries {
            let path = entry?.path();
            if path.is_dir() {
                Self::collect_schema_files(&path, files)?;
            } else if path
                .file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.ends_with(SCHEMA_FILE_SUFFIX))
            {
                files.push(path);
            }
        }

        Ok(())
    }
}

fn schema_name_from_path(path: &Path) -> String {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(|name| name.trim_end_matches(SCHEMA_FILE_SUFFIX).to_string())
        .unwrap_or_default()
}

/// Immutable, ordered list of loaded schemas.
#[derive(Debug, Clone)]
pub struct SchemaStore {
    schemas: Arc<[MockSchema]>,
}

impl SchemaStore {
    pub fn new(schemas: Vec<MockSchema>) -> Self {
        Self {
            schemas: schemas.into(),
        }
    }

    /// Directory schemas first, then inline schemas from the config file.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let mut schemas = SchemaLoader::load_dir(&config.mock_server.schema_dir)?;
        schemas.extend(config.schemas.iter().cloned());
        Ok(Self::new(schemas))
    }

    pub fn list(&self) -> &[MockSchema] {
        &self.schemas
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}
