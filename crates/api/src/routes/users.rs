//! Route definitions for the `/users` resource.

use axum::routing::get;
use axum::Router;

use crate::handlers::users;
use crate::state::AppState;

/// Routes mounted at `/users` (admin only, except a self profile update).
///
/// ```text
/// GET    /             -> list_users
/// GET    /{id}         -> get_user
/// PUT    /{id}         -> update_user (admin or self)
/// DELETE /{id}         -> deactivate_user
/// GET    /{id}/roles   -> user_roles
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(users::list_users))
        .route(
            "/{id}",
            get(users::get_user)
                .put(users::update_user)
                .delete(users::deactivate_user),
        )
        .route("/{id}/roles", get(users::user_roles))
}
