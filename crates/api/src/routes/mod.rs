pub mod auth;
pub mod books;
pub mod health;
pub mod messaging;
pub mod posts;
pub mod pre_projects;
pub mod roles;
pub mod users;

use axum::routing::get;
use axum::Router;

use crate::handlers;
use crate::state::AppState;
use crate::ws;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /ws                                   WebSocket (?token=<jwt>)
///
/// /auth/signup                          signup (public)
/// /auth/login                           login (public)
/// /auth/me                              current user (requires auth)
///
/// /users                                list (admin)
/// /users/{id}                           get, deactivate (admin); update (admin or self)
/// /users/{id}/roles                     role names (admin)
/// /statistics                           student and book counts (public)
///
/// /roles/grant                          grant role (admin)
/// /roles/revoke                         revoke role (admin)
/// /roles/{name}/users                   active users holding a role
/// /teachers                             active teachers
///
/// /books                                list, create (create: admin)
/// /books/{id}                           get, update, delete (mutations: admin)
///
/// /posts                                list, create (create: teacher/admin)
/// /posts/{id}                           get, update, delete
///
/// /pre-projects                         list, create (requires auth)
/// /pre-projects/associated              caller's pre-projects
/// /pre-projects/{id}                    get, update, delete
/// /pre-projects/{id}/responses          advisor response (POST)
/// /pre-projects/{id}/advisors           reset responses (DELETE, admin)
/// /pre-projects/{id}/can-update         toggle edit lock (PUT, admin)
/// /pre-projects/{id}/migrate            migrate to book (POST, admin)
///
/// /messages                             send (POST)
/// /messages/{id}                        delete own message
///
/// /conversations                        caller's conversations
/// /conversations/{id}                   messages, delete
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Chat push.
        .route("/ws", get(ws::ws_handler))
        .nest("/auth", auth::router())
        .nest("/users", users::router())
        .route("/statistics", get(handlers::users::statistics))
        .nest("/roles", roles::router())
        .nest("/teachers", roles::teachers_router())
        .nest("/books", books::router())
        .nest("/posts", posts::router())
        .nest("/pre-projects", pre_projects::router())
        .nest("/messages", messaging::messages_router())
        .nest("/conversations", messaging::conversations_router())
}
