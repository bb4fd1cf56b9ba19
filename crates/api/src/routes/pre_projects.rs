//! Route definitions for the `/pre-projects` resource.

use axum::routing::{delete, get, post, put};
use axum::Router;

use crate::handlers::pre_projects;
use crate::state::AppState;

/// Routes mounted at `/pre-projects`.
///
/// ```text
/// GET    /                  -> list_pre_projects
/// POST   /                  -> create_pre_project
/// GET    /associated        -> associated_pre_projects
/// GET    /{id}              -> get_pre_project
/// PUT    /{id}              -> update_pre_project
/// DELETE /{id}              -> delete_pre_project
/// POST   /{id}/responses    -> respond (invited advisor)
/// DELETE /{id}/advisors     -> reset_advisors (admin)
/// PUT    /{id}/can-update   -> set_can_update (admin)
/// POST   /{id}/migrate      -> migrate (admin)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(pre_projects::list_pre_projects).post(pre_projects::create_pre_project),
        )
        .route("/associated", get(pre_projects::associated_pre_projects))
        .route(
            "/{id}",
            get(pre_projects::get_pre_project)
                .put(pre_projects::update_pre_project)
                .delete(pre_projects::delete_pre_project),
        )
        .route("/{id}/responses", post(pre_projects::respond))
        .route("/{id}/advisors", delete(pre_projects::reset_advisors))
        .route("/{id}/can-update", put(pre_projects::set_can_update))
        .route("/{id}/migrate", post(pre_projects::migrate))
}
