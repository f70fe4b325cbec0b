//! Bidder console
//!
//! Client-side project directory with change broadcast, the typed REST client
//! it loads from, and a reference backend implementing the `/projects` API
//! with SQLite persistence.

pub mod api;
pub mod auth;
pub mod client;
pub mod config;
pub mod console;
pub mod db;
pub mod directory;
pub mod errors;
pub mod models;
pub mod notices;

use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use config::Config;
use db::Repository;

pub use client::{HttpBackend, HttpClient, ProjectBackend, ProjectResources};
pub use console::ProjectConsole;
pub use directory::{ProjectChanges, ProjectDirectory, Snapshot};
pub use errors::{ConsoleError, ConsoleResult};
pub use notices::NoticeQueue;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub config: Arc<Config>,
}

/// Create the reference backend router with all routes.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let psk = state.config.api_psk.clone();

    let api_routes = Router::new()
        .route("/projects", get(api::list_projects).post(api::create_project))
        .route(
            "/projects/{id}",
            get(api::get_project)
                .put(api::update_project)
                .delete(api::delete_project),
        )
        .route("/projects/{id}/defaultProject", post(api::set_default_project))
        .route(
            "/projects/{id}/authorized",
            post(api::verify_authorization).delete(api::revoke_authorization),
        )
        .route(
            "/projects/{id}/networks",
            get(api::list_networks).post(api::create_network),
        )
        .route("/projects/{id}/firewalls", get(api::list_firewalls))
        .route("/projects/{id}/users", get(api::list_users).post(api::add_user))
        .layer(middleware::from_fn(move |req, next| {
            auth::psk_auth_layer(psk.clone(), req, next)
        }));

    // Health check (no auth required)
    let health_routes = Router::new().route("/health", get(health_check));

    Router::new()
        .merge(api_routes)
        .merge(health_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
mod testing;
