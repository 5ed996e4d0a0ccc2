pub mod middleware;
pub mod protocol;
pub mod rest;
pub mod state;

pub use middleware::resolve_owner;
pub use rest::ApiDoc;

use axum::{
    middleware as axum_middleware,
    routing::{get, patch, post, put},
    Router,
};
use std::sync::Arc;
use state::AppState;

/// Builds the API routes. Every route runs behind the owner-key middleware.
pub fn build_router(app_state: Arc<AppState>) -> Router {
    Router::new()
        .route("/dashboard", get(rest::dashboard_handler))
        .route(
            "/titles",
            get(rest::list_titles_handler).post(rest::create_title_handler),
        )
        .route(
            "/titles/{title_id}",
            patch(rest::update_title_handler).delete(rest::remove_title_handler),
        )
        .route(
            "/watch-logs",
            get(rest::list_watch_logs_handler).post(rest::add_watch_log_handler),
        )
        .route(
            "/watch-logs/{log_id}",
            axum::routing::delete(rest::remove_watch_log_handler),
        )
        .route(
            "/languages",
            get(rest::list_languages_handler).put(rest::upsert_language_handler),
        )
        .route("/profile", get(rest::get_profile_handler))
        .route("/profile/setup", post(rest::setup_profile_handler))
        .route(
            "/profile/learning-language",
            put(rest::set_learning_language_handler),
        )
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            resolve_owner,
        ))
        .with_state(app_state)
}
