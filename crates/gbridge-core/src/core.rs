use std::sync::Arc;

use axum::Router;
use axum::routing::post;
use gbridge_provider_core::Provider;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handler::chat_completions_handler;

pub struct CoreState {
    pub provider: Arc<dyn Provider>,
    /// Used when a request carries no `Authorization` header.
    pub fallback_api_key: Option<String>,
}

pub struct Core {
    state: Arc<CoreState>,
}

impl Core {
    pub fn new(provider: Arc<dyn Provider>, fallback_api_key: Option<String>) -> Self {
        Self {
            state: Arc::new(CoreState {
                provider,
                fallback_api_key,
            }),
        }
    }

    /// Every response, errors and preflights included, carries permissive
    /// CORS headers.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/v1/chat/completions", post(chat_completions_handler))
            .route("/chat/completions", post(chat_completions_handler))
            .with_state(self.state.clone())
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive())
    }

    pub fn state(&self) -> Arc<CoreState> {
        self.state.clone()
    }
}
