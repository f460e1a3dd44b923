use axum::{
    Router,
    http::HeaderValue,
    middleware,
    routing::{delete, get, post, put},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::db::Store;
use crate::state::SharedState;

mod admin;
pub mod auth;
mod error;
mod health;
mod library;
mod observability;
mod steam;
mod types;

pub use error::ApiError;
pub use types::*;

use metrics_exporter_prometheus::PrometheusHandle;

#[derive(Clone)]
pub struct AppState {
    pub shared: Arc<SharedState>,

    pub start_time: std::time::Instant,

    pub prometheus_handle: Option<PrometheusHandle>,
}

impl AppState {
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.shared.config
    }

    #[must_use]
    pub fn store(&self) -> &Store {
        &self.shared.store
    }
}

#[must_use]
pub fn create_app_state(
    shared: Arc<SharedState>,
    prometheus_handle: Option<PrometheusHandle>,
) -> Arc<AppState> {
    Arc::new(AppState {
        shared,
        start_time: std::time::Instant::now(),
        prometheus_handle,
    })
}

pub fn router(state: Arc<AppState>) -> Router {
    let cors_origins = state.config().server.cors_allowed_origins.clone();

    let api_router = Router::new()
        .route("/health", get(health::get_health))
        .merge(create_admin_router(state.clone()))
        .merge(create_provisioning_router(state.clone()))
        .merge(create_user_router())
        .with_state(state.clone());

    let cors_layer = if cors_origins.contains(&"*".to_string()) {
        CorsLayer::new().allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> =
            cors_origins.iter().filter_map(|s| s.parse().ok()).collect();
        CorsLayer::new().allow_origin(origins)
    };

    Router::new()
        .nest("/api", api_router)
        .layer(cors_layer.allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn_with_state(
            state,
            observability::logging_middleware,
        ))
}

/// Administrator routes that are refused while setup is incomplete.
fn create_admin_router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/admin/keys", get(admin::list_keys))
        .route(
            "/admin/steam/accounts/{id}/sync",
            post(admin::sync_account),
        )
        .route("/admin/steam/sync-all", post(admin::sync_all))
        .route("/admin/steam/sync-prices", post(admin::sync_prices))
        .route("/admin/users", get(admin::list_users))
        .route("/admin/users", post(admin::register_user))
        .route("/admin/users/search", get(admin::search_users))
        .route("/admin/users/{id}", get(admin::get_user))
        .route("/admin/games", get(admin::list_games))
        .route("/admin/games/{app_id}", get(admin::get_game))
        .route("/admin/compare", post(admin::compare_discord_users))
        .route("/metrics", get(observability::get_metrics))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::admin_middleware,
        ))
        .route_layer(middleware::from_fn_with_state(state, auth::require_ready))
}

/// Key provisioning completes setup, so it only requires a valid key, and is
/// the one route that takes the one-time key.
fn create_provisioning_router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/admin/keys", post(admin::provision_key))
        .route_layer(middleware::from_fn_with_state(
            state,
            auth::provisioning_middleware,
        ))
}

/// End-user routes. Identity comes from the [`auth::CurrentUser`] extractor.
fn create_user_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/library/games", get(library::list_games))
        .route(
            "/library/users/{user_id}/games",
            get(library::list_user_games),
        )
        .route("/library/value", get(library::get_value))
        .route("/library/compare/{user_id}", get(library::compare_with_user))
        .route(
            "/library/compare/discord/{discord_id}",
            get(library::compare_with_discord_user),
        )
        .route("/library/visibility", put(library::set_visibility))
        .route("/steam/accounts", get(steam::list_accounts))
        .route("/steam/accounts", post(steam::link_account))
        .route("/steam/accounts/{id}", delete(steam::unlink_account))
}
