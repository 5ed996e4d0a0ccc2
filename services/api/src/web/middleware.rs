//! services/api/src/web/middleware.rs
//!
//! Resolves which owner a request acts for.

use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use series_learner_core::domain::OwnerKey;
use std::sync::Arc;
use tracing::debug;

use crate::web::state::AppState;

pub const OWNER_KEY_HEADER: &str = "x-owner-key";

/// Middleware that attaches an [`OwnerKey`] to the request.
///
/// The `x-owner-key` header wins when it carries a non-empty value; otherwise the
/// configured owner key applies. Handlers read the key from request extensions.
pub async fn resolve_owner(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Response {
    let owner_key = owner_from_headers(req.headers())
        .unwrap_or_else(|| state.config.owner_key.clone());
    debug!(owner = %owner_key, path = %req.uri().path(), "Resolved request owner");

    req.extensions_mut().insert(owner_key);
    next.run(req).await
}

fn owner_from_headers(headers: &HeaderMap) -> Option<OwnerKey> {
    headers
        .get(OWNER_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|key| !key.is_empty())
        .map(OwnerKey::new)
}
