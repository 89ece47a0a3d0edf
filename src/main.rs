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

use anyhow::Context;
use clap::Parser;
use schemock::config::{Config, ConfigLoader, SchemaStore};
use schemock::dispatch::Dispatcher;
use schemock::server::MockServer;
use schemock::telemetry::{init_telemetry, shutdown_telemetry};
use schemock::utils::shutdown_signal;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// YAML configuration file. Built-in defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port to listen on; 0 keeps the configured port.
    #[arg(short, long, default_value_t = 0)]
    port: u16,

    /// Directory scanned for *.mock.json schema files.
    #[arg(short, long)]
    mocks: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => ConfigLoader::from_file(path)
            .with_context(|| format!("Failed to load config from {:?}", path))?,
        None => Config::default(),
    };

    if args.port != 0 {
        config.server.port = args.port;
    }
    if let Some(mocks) = args.mocks {
        config.mock_server.schema_dir = mocks;
    }

    init_telemetry(&config.telemetry)?;

    let store = SchemaStore::from_config(&config).context("Failed to load mock schemas")?;
    if store.is_empty() {
        warn!(
            dir = ?config.mock_server.schema_dir,
            "No mock schemas found, add *.mock.json files and restart"
        );
        shutdown_telemetry();
        return Ok(());
    }

    for schema in store.list() {
        info!(
            method = %schema.method.to_uppercase(),
            endpoint = %schema.endpoint,
            name = %schema.name,
            responses = schema.responses.len(),
            "Mock endpoint"
        );
    }

    let dispatcher = Arc::new(Dispatcher::from_config(&config, store));
    let server = MockServer::new(config.server.clone(), dispatcher).start()?;

    info!("Schemock server is running on {:?}", server.local_addrs());
    info!("Press Ctrl+C to shutdown");

    let handle = server.handle();
    tokio::select! {
        result = server.wait() => {
            if let Err(e) = result {
                warn!(error = %format!("{:#}", e), "Server stopped with an error");
            } else {
                info!("Server stopped");
            }
        }
        _ = shutdown_signal() => {
            info!("Shutdown signal received");
            handle.stop(true).await;
            info!("Server shutdown complete");
        }
    }

    shutdown_telemetry();

    Ok(())
}
