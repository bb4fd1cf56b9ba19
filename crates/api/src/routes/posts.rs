//! Route definitions for the `/posts` resource.

use axum::routing::get;
use axum::Router;

use crate::handlers::posts;
use crate::state::AppState;

/// Routes mounted at `/posts`.
///
/// ```text
/// GET    /       -> list_posts
/// POST   /       -> create_post (teacher/admin)
/// GET    /{id}   -> get_post
/// PUT    /{id}   -> update_post (teacher/admin)
/// DELETE /{id}   -> delete_post (teacher/admin)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(posts::list_posts).post(posts::create_post))
        .route(
            "/{id}",
            get(posts::get_post)
                .put(posts::update_post)
                .delete(posts::delete_post),
        )
}
