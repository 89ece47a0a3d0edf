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

use crate::dispatch::Dispatcher;
use crate::server::handlers::request_handler;
use actix_web::web;
use std::sync::Arc;

/// Shared, read-only state handed to every worker.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
    pub max_request_size: usize,
}

impl AppState {
    pub fn new(dispatcher: Arc<Dispatcher>, max_request_size: usize) -> Self {
        Self {
            dispatcher,
            max_request_size,
        }
    }
}

/// Registers the mock handler as the catch-all service.
///
/// There are no other routes: every method and path goes to the dispatcher,
/// so mock schemas can claim any endpoint.
pub fn configure(state: web::Data<AppState>) -> impl FnOnce(&mut web::ServiceConfig) {
    move |cfg: &mut web::ServiceConfig| {
        let limit = state.max_request_size;
        cfg.app_data(state)
            .app_data(web::PayloadConfig::new(limit))
            .default_service(web::to(request_handler));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MockSchema, ResponseCandidate, SchemaStore};
    use crate::dispatch::condition::ExpressionEvaluator;
    use actix_web::{test, App};
    use std::collections::HashMap;

    fn create_test_state(max_request_size: usize) -> web::Data<AppState> {
        let store = SchemaStore::new(vec![MockSchema {
            name: "Upload".to_string(),
            method: "POST".to_string(),
            endpoint: "/upload".to_string(),
            responses: vec![ResponseCandidate {
                condition: None,
                status_code: 202,
                headers: HashMap::new(),
                response_template: Some(serde_json::json!("accepted")),
            }],
        }]);
        let dispatcher = Dispatcher::new(store, Arc::new(ExpressionEvaluator::new()));
        web::Data::new(AppState::new(Arc::new(dispatcher), max_request_size))
    }

    #[actix_web::test]
    async fn test_every_path_reaches_dispatcher() {
        let app = test::init_service(App::new().configure(configure(create_test_state(1024)))).await;

        let req = test::TestRequest::post().uri("/upload").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 202);

        let req = test::TestRequest::get().uri("/health").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 404);
    }

    #[actix_web::test]
    async fn test_payload_limit() {
        let app = test::init_service(App::new().configure(configure(create_test_state(8)))).await;

        let req = test::TestRequest::post()
            .uri("/upload")
            .set_payload("this body is longer than eight bytes")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 413);
    }
}
