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

//! Starting and stopping the HTTP listener.

use crate::config::ServerConfig;
use crate::dispatch::Dispatcher;
use crate::server::app::{configure, AppState};
use crate::telemetry::tracer::tracing_middleware;
use actix_web::dev::ServerHandle;
use actix_web::{web, App, HttpServer};
use anyhow::Context;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::info;

pub struct MockServer {
    config: ServerConfig,
    dispatcher: Arc<Dispatcher>,
}

impl MockServer {
    pub fn new(config: ServerConfig, dispatcher: Arc<Dispatcher>) -> Self {
        Self { config, dispatcher }
    }

    /// Binds the listener and runs the accept loop on the current tokio
    /// runtime. Returns once the socket is bound.
    pub fn start(self) -> anyhow::Result<RunningServer> {
        let addr = format!("{}:{}", self.config.host, self.config.port);

        info!("Starting server on {}", addr);
        info!("Server workers: {}", self.config.workers);
        info!("Max request size: {} bytes", self.config.max_request_size);

        let state = web::Data::new(AppState::new(
            self.dispatcher.clone(),
            self.config.max_request_size,
        ));

        let mut server = HttpServer::new(move || {
            App::new()
                .wrap(tracing_middleware())
                .configure(configure(state.clone()))
        })
        .workers(self.config.workers);

        if let Some(max_connections) = self.config.max_connections {
            info!("Max connections per worker: {}", max_connections);
            server = server.max_connections(max_connections);
        }

        if let Some(timeout_ms) = self.config.client_request_timeout_ms {
            server = server.client_request_timeout(Duration::from_millis(timeout_ms));
        }

        let server = server
            .bind(&addr)
            .with_context(|| format!("Failed to bind {}", addr))?;
        let addrs = server.addrs();
        let server = server.run();
        let handle = server.handle();
        let task = tokio::spawn(server);

        Ok(RunningServer {
            addrs,
            handle,
            task,
        })
    }
}

/// A bound, running mock server.
pub struct RunningServer {
    addrs: Vec<SocketAddr>,
    handle: ServerHandle,
    task: JoinHandle<std::io::Result<()>>,
}

impl RunningServer {
    pub fn local_addrs(&self) -> &[SocketAddr] {
        &self.addrs
    }

    pub fn handle(&self) -> ServerHandle {
        self.handle.clone()
    }

    /// Stops accepting connections. With `graceful`, in-flight requests are
    /// given time to finish.
    pub async fn stop(&self, graceful: bool) {
        self.handle.stop(graceful).await;
    }

    /// Resolves when the accept loop exits.
    pub async fn wait(self) -> anyhow::Result<()> {
        self.task.await.context("Server task panicked")??;
        Ok(())
    }
}
