//! HTTP-level tests for signup, login, `me`, and role management.

mod common;

use axum::http::StatusCode;
use common::{body_json, delete_auth, get, get_auth, post_json, post_json_auth, user_with_token};
use gradhub_api::auth::password::hash_password;
use gradhub_core::roles::{ROLE_ADMIN, ROLE_TEACHER};
use gradhub_db::models::user::CreateUser;
use gradhub_db::repositories::UserRepo;
use sqlx::PgPool;

async fn signup(
    app: axum::Router,
    name: &str,
    email: &str,
    password: &str,
) -> axum::response::Response {
    post_json(
        app,
        "/api/v1/auth/signup",
        serde_json::json!({ "name": name, "email": email, "password": password }),
    )
    .await
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn signup_grants_student_and_returns_token(pool: PgPool) {
    let app = common::build_test_app(pool);

    let response = signup(app.clone(), "Lina Saleh", "Lina@Uni.test", "correct horse").await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let json = body_json(response).await;
    assert!(json["access_token"].is_string());
    assert_eq!(json["user"]["email"], "lina@uni.test");
    assert_eq!(json["user"]["roles"], serde_json::json!(["student"]));
    assert!(json["user"].get("password_hash").is_none());

    let token = json["access_token"].as_str().unwrap();
    let me = get_auth(app, "/api/v1/auth/me", token).await;
    assert_eq!(me.status(), StatusCode::OK);
    assert_eq!(body_json(me).await["data"]["name"], "Lina Saleh");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn signup_rejects_duplicate_email(pool: PgPool) {
    let app = common::build_test_app(pool);

    let first = signup(app.clone(), "Omar Khalil", "omar@uni.test", "password-one").await;
    assert_eq!(first.status(), StatusCode::CREATED);

    let second = signup(app, "Omar Again", "OMAR@uni.test", "password-two").await;
    assert_eq!(second.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(second).await["code"], "CONFLICT");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn signup_reports_each_invalid_field(pool: PgPool) {
    let app = common::build_test_app(pool);

    let response = signup(app, "Al", "not-an-email", "short").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = body_json(response).await;
    assert_eq!(json["code"], "VALIDATION_ERROR");
    assert!(json["fields"]["name"].is_string());
    assert!(json["fields"]["email"].is_string());
    assert!(json["fields"]["password"].is_string());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn login_checks_password_and_active_flag(pool: PgPool) {
    let user = UserRepo::create(
        &pool,
        &CreateUser {
            name: "Rana Aziz".into(),
            email: "rana@uni.test".into(),
            password_hash: hash_password("rana-password").unwrap(),
            image: None,
        },
    )
    .await
    .unwrap();
    let app = common::build_test_app(pool.clone());

    let ok = post_json(
        app.clone(),
        "/api/v1/auth/login",
        serde_json::json!({ "email": "rana@uni.test", "password": "rana-password" }),
    )
    .await;
    assert_eq!(ok.status(), StatusCode::OK);
    assert_eq!(body_json(ok).await["user"]["id"], user.id);

    let wrong = post_json(
        app.clone(),
        "/api/v1/auth/login",
        serde_json::json!({ "email": "rana@uni.test", "password": "nope-nope" }),
    )
    .await;
    assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);

    UserRepo::deactivate(&pool, user.id).await.unwrap();
    let inactive = post_json(
        app,
        "/api/v1/auth/login",
        serde_json::json!({ "email": "rana@uni.test", "password": "rana-password" }),
    )
    .await;
    assert_eq!(inactive.status(), StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn admin_grants_and_revokes_roles(pool: PgPool) {
    let (_, admin) = user_with_token(&pool, "Admin One", &[ROLE_ADMIN]).await;
    let (student, _) = user_with_token(&pool, "Yara Nasser", &["student"]).await;
    let app = common::build_test_app(pool);

    let granted = post_json_auth(
        app.clone(),
        "/api/v1/roles/grant",
        &admin,
        serde_json::json!({ "user_id": student, "role": "graduation_student" }),
    )
    .await;
    assert_eq!(granted.status(), StatusCode::OK);
    let json = body_json(granted).await;
    assert_eq!(json["data"]["changed"], true);
    assert_eq!(
        json["data"]["roles"],
        serde_json::json!(["student", "graduation_student"])
    );

    let again = post_json_auth(
        app.clone(),
        "/api/v1/roles/grant",
        &admin,
        serde_json::json!({ "user_id": student, "role": "graduation_student" }),
    )
    .await;
    assert_eq!(body_json(again).await["data"]["changed"], false);

    let revoked = post_json_auth(
        app.clone(),
        "/api/v1/roles/revoke",
        &admin,
        serde_json::json!({ "user_id": student, "role": "student" }),
    )
    .await;
    assert_eq!(revoked.status(), StatusCode::OK);

    let roles = get_auth(app.clone(), &format!("/api/v1/users/{student}/roles"), &admin).await;
    assert_eq!(
        body_json(roles).await["data"],
        serde_json::json!(["graduation_student"])
    );

    let unknown = post_json_auth(
        app,
        "/api/v1/roles/grant",
        &admin,
        serde_json::json!({ "user_id": student, "role": "superuser" }),
    )
    .await;
    assert_eq!(unknown.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn deactivated_users_leave_public_lists(pool: PgPool) {
    let (_, admin) = user_with_token(&pool, "Admin Two", &[ROLE_ADMIN]).await;
    let (teacher, _) = user_with_token(&pool, "Dr Hana Fares", &[ROLE_TEACHER]).await;
    let app = common::build_test_app(pool);

    let listed = get(app.clone(), "/api/v1/teachers").await;
    assert_eq!(listed.status(), StatusCode::OK);
    assert_eq!(body_json(listed).await["data"][0]["id"], teacher);

    let removed = delete_auth(app.clone(), &format!("/api/v1/users/{teacher}"), &admin).await;
    assert_eq!(removed.status(), StatusCode::NO_CONTENT);

    let listed = get(app.clone(), "/api/v1/roles/teacher/users").await;
    assert_eq!(body_json(listed).await["data"], serde_json::json!([]));

    let twice = delete_auth(app, &format!("/api/v1/users/{teacher}"), &admin).await;
    assert_eq!(twice.status(), StatusCode::NOT_FOUND);
}
