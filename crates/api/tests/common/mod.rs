//! Shared helpers for API integration tests.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use gradhub_api::auth::jwt::{generate_access_token, JwtConfig};
use gradhub_api::config::ServerConfig;
use gradhub_api::router::build_app_router;
use gradhub_api::similarity::SimilarityChecker;
use gradhub_api::state::AppState;
use gradhub_api::ws::WsManager;
use gradhub_core::storage::{FileStorage, LocalFileStorage};
use gradhub_core::types::DbId;
use gradhub_db::lifecycle::PreProjectLifecycle;
use gradhub_db::models::user::CreateUser;
use gradhub_db::repositories::{UserRepo, UserRoleRepo};
use http_body_util::BodyExt;
use sqlx::PgPool;
use tower::ServiceExt;

const BOUNDARY: &str = "gradhub-test-boundary";

/// Build a test `ServerConfig` with safe defaults and the given upload dir.
pub fn test_config(upload_dir: PathBuf) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 30,
        upload_dir,
        similarity_service_url: None,
        jwt: test_jwt(),
    }
}

pub fn test_jwt() -> JwtConfig {
    JwtConfig {
        secret: "test-secret-that-is-long-enough-for-hmac".to_string(),
        access_token_expiry_mins: 15,
    }
}

/// Build the full application router with the similarity gate disabled.
pub fn build_test_app(pool: PgPool) -> Router {
    build_test_app_with(pool, None)
}

/// Build the full application router with an injected similarity checker.
///
/// Uploads go to a fresh temporary directory that outlives the test.
pub fn build_test_app_with(
    pool: PgPool,
    similarity: Option<Arc<dyn SimilarityChecker>>,
) -> Router {
    build_router(pool, similarity, Arc::new(WsManager::new()))
}

/// Build the application router and hand back its WebSocket manager so a
/// test can register connections and observe pushed events.
pub fn build_test_app_with_ws(pool: PgPool) -> (Router, Arc<WsManager>) {
    let ws_manager = Arc::new(WsManager::new());
    (build_router(pool, None, Arc::clone(&ws_manager)), ws_manager)
}

fn build_router(
    pool: PgPool,
    similarity: Option<Arc<dyn SimilarityChecker>>,
    ws_manager: Arc<WsManager>,
) -> Router {
    let upload_dir = tempfile::Builder::new()
        .prefix("gradhub-uploads-")
        .tempdir()
        .unwrap()
        .into_path();
    let config = test_config(upload_dir.clone());
    let storage: Arc<dyn FileStorage> = Arc::new(LocalFileStorage::new(upload_dir));

    let state = AppState {
        lifecycle: PreProjectLifecycle::new(pool.clone(), Arc::clone(&storage)),
        pool,
        config: Arc::new(config.clone()),
        ws_manager,
        storage,
        similarity,
    };

    build_app_router(state, &config)
}

/// Insert an active user with the given roles and return its id and a
/// valid access token.
pub async fn user_with_token(pool: &PgPool, name: &str, roles: &[&str]) -> (DbId, String) {
    let user = UserRepo::create(
        pool,
        &CreateUser {
            name: name.to_string(),
            email: email_for(name),
            password_hash: "unused".to_string(),
            image: None,
        },
    )
    .await
    .unwrap();
    for role in roles {
        UserRoleRepo::grant(pool, user.id, role).await.unwrap();
    }
    let roles: Vec<String> = roles.iter().map(|r| r.to_string()).collect();
    let token = generate_access_token(user.id, &roles, &test_jwt()).unwrap();
    (user.id, token)
}

pub fn email_for(name: &str) -> String {
    format!("{}@uni.test", name.to_lowercase().replace(' ', "."))
}

pub fn this_year() -> i32 {
    use chrono::Datelike;
    chrono::Utc::now().year()
}

pub fn long_description() -> String {
    "A platform that follows graduation projects from first proposal to the archived book."
        .to_string()
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

pub async fn send(app: Router, request: Request<Body>) -> Response<Body> {
    app.oneshot(request).await.unwrap()
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    send(app, request).await
}

pub async fn get_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    let request = Request::builder()
        .uri(uri)
        .header("authorization", format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

pub async fn delete_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::DELETE)
        .uri(uri)
        .header("authorization", format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    json_request(app, Method::POST, uri, None, body).await
}

pub async fn post_json_auth(
    app: Router,
    uri: &str,
    token: &str,
    body: serde_json::Value,
) -> Response<Body> {
    json_request(app, Method::POST, uri, Some(token), body).await
}

pub async fn put_json_auth(
    app: Router,
    uri: &str,
    token: &str,
    body: serde_json::Value,
) -> Response<Body> {
    json_request(app, Method::PUT, uri, Some(token), body).await
}

async fn json_request(
    app: Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: serde_json::Value,
) -> Response<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    send(app, builder.body(Body::from(body.to_string())).unwrap()).await
}

/// Send a `multipart/form-data` request with text fields and an optional
/// `file` part.
pub async fn multipart_auth(
    app: Router,
    method: Method,
    uri: &str,
    token: &str,
    fields: &[(&str, &str)],
    file: Option<(&str, &[u8])>,
) -> Response<Body> {
    multipart_upload_auth(app, method, uri, token, fields, "file", file).await
}

/// Like [`multipart_auth`], with the upload sent under `file_field`.
pub async fn multipart_upload_auth(
    app: Router,
    method: Method,
    uri: &str,
    token: &str,
    fields: &[(&str, &str)],
    file_field: &str,
    file: Option<(&str, &[u8])>,
) -> Response<Body> {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("authorization", format!("Bearer {token}"))
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(multipart_body(fields, file_field, file)))
        .unwrap();
    send(app, request).await
}

pub fn multipart_body(
    fields: &[(&str, &str)],
    file_field: &str,
    file: Option<(&str, &[u8])>,
) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some((file_name, bytes)) = file {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{file_field}\"; filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
