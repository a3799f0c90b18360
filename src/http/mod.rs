//! HTTP surface.
//!
//! Routes, all mounted under the configured base path:
//!
//! | Method | Path                       | Auth         |
//! |--------|----------------------------|--------------|
//! | GET    | `/ping`, `/ping/`          | none         |
//! | GET    | `/registrations`           | bearer token |
//! | POST   | `/registrations`           | bearer token |
//! | POST   | `/webhook/{secret_handle}` | secret URL   |

pub mod auth;
pub mod handlers;
pub mod response;

use crate::hub::Hub;
use crate::webhook::WebhookRouter;
use axum::Router;
use axum::middleware;
use axum::routing::{get, post};
use std::sync::Arc;

/// Shared state for every route.
#[derive(Clone)]
pub struct AppState {
    pub hub: Arc<Hub>,
    pub webhooks: WebhookRouter,
    /// Token required on the registration endpoint, if any.
    pub access_token: Option<Arc<str>>,
}

impl AppState {
    pub fn new(hub: Arc<Hub>, access_token: Option<String>) -> Self {
        Self {
            webhooks: WebhookRouter::new(Arc::clone(&hub)),
            hub,
            access_token: access_token.map(Arc::from),
        }
    }
}

/// Build the router, nested under `base_path` unless it is empty.
pub fn build_router(state: AppState, base_path: &str) -> Router {
    let registrations = Router::new()
        .route(
            "/registrations",
            get(handlers::registration_info).post(handlers::register),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_bearer,
        ));

    let routes = Router::new()
        .route("/ping", get(handlers::ping))
        .route("/ping/", get(handlers::ping))
        .route("/webhook/{secret_handle}", post(handlers::webhook))
        .merge(registrations)
        .with_state(state);

    if base_path.is_empty() {
        routes
    } else {
        Router::new().nest(base_path, routes)
    }
}
