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

//! Schema-driven mock HTTP server.
//!
//! Mock schemas bind an HTTP method and endpoint pattern to an ordered list
//! of conditional responses. [`dispatch::Dispatcher`] resolves a request to
//! one rendered response; [`server::MockServer`] serves it over HTTP.

pub mod config;
pub mod dispatch;
pub mod server;
pub mod telemetry;
pub mod utils;

pub use config::{Config, ConfigLoader, MockSchema, ResponseCandidate, SchemaStore};
pub use dispatch::{Dispatcher, MockRequest, MockResponse};
pub use server::{MockServer, RunningServer};
