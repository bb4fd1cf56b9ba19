//! Route definitions for role membership.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::roles;
use crate::state::AppState;

/// Routes mounted at `/roles`.
///
/// ```text
/// POST /grant          -> grant (admin)
/// POST /revoke         -> revoke (admin)
/// GET  /{name}/users   -> users_by_role
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/grant", post(roles::grant))
        .route("/revoke", post(roles::revoke))
        .route("/{name}/users", get(roles::users_by_role))
}

/// Routes mounted at `/teachers`.
pub fn teachers_router() -> Router<AppState> {
    Router::new().route("/", get(roles::teachers))
}
