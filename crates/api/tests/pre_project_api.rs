//! HTTP-level tests for the pre-project lifecycle: submission, advisor
//! arbitration, updates, the similarity gate, and migration to a book.

mod common;

use std::sync::Arc;

use async_trait::async_trait;
use axum::http::{Method, StatusCode};
use axum::Router;
use common::{
    body_json, delete_auth, get_auth, long_description, multipart_auth, post_json_auth,
    put_json_auth, this_year, user_with_token,
};
use gradhub_api::similarity::{SimilarityChecker, SimilarityError};
use gradhub_core::roles::{ROLE_ADMIN, ROLE_GRADUATION_STUDENT, ROLE_STUDENT, ROLE_TEACHER};
use gradhub_core::similarity::SimilarityResponse;
use gradhub_core::types::DbId;
use sqlx::PgPool;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

struct Cast {
    owner: DbId,
    owner_token: String,
    teacher_a: DbId,
    teacher_a_token: String,
    teacher_b: DbId,
    teacher_b_token: String,
    admin_token: String,
}

async fn cast(pool: &PgPool) -> Cast {
    let (owner, owner_token) =
        user_with_token(pool, "Maya Daher", &[ROLE_STUDENT, ROLE_GRADUATION_STUDENT]).await;
    let (teacher_a, teacher_a_token) = user_with_token(pool, "Dr Adel Saad", &[ROLE_TEACHER]).await;
    let (teacher_b, teacher_b_token) = user_with_token(pool, "Dr Rima Tal", &[ROLE_TEACHER]).await;
    let (_, admin_token) = user_with_token(pool, "Registrar", &[ROLE_ADMIN]).await;
    Cast {
        owner,
        owner_token,
        teacher_a,
        teacher_a_token,
        teacher_b,
        teacher_b_token,
        admin_token,
    }
}

async fn submit(
    app: Router,
    token: &str,
    name: &str,
    extra: &[(&str, &str)],
) -> axum::response::Response {
    let year = this_year().to_string();
    let description = long_description();
    let mut fields = vec![
        ("name", name),
        ("description", description.as_str()),
        ("year", year.as_str()),
        ("season", "fall"),
    ];
    fields.extend_from_slice(extra);
    multipart_auth(
        app,
        Method::POST,
        "/api/v1/pre-projects",
        token,
        &fields,
        Some(("proposal.pdf", b"%PDF-1.4 proposal".as_slice())),
    )
    .await
}

/// Submit as the cast's owner with both teachers invited; returns the id.
async fn submitted(app: Router, c: &Cast) -> DbId {
    let advisors = format!("{},{}", c.teacher_a, common::email_for("Dr Rima Tal"));
    let response = submit(app, &c.owner_token, "Campus Navigator", &[("advisors", advisors.as_str())]).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await["data"]["id"].as_i64().unwrap()
}

async fn respond(app: Router, token: &str, id: DbId, status: &str) -> axum::response::Response {
    post_json_auth(
        app,
        &format!("/api/v1/pre-projects/{id}/responses"),
        token,
        serde_json::json!({ "status": status }),
    )
    .await
}

struct Fixed(serde_json::Value);

#[async_trait]
impl SimilarityChecker for Fixed {
    async fn check(&self, _: &str, _: &str) -> Result<SimilarityResponse, SimilarityError> {
        Ok(serde_json::from_value(self.0.clone()).unwrap())
    }
}

struct Offline;

#[async_trait]
impl SimilarityChecker for Offline {
    async fn check(&self, _: &str, _: &str) -> Result<SimilarityResponse, SimilarityError> {
        Err(SimilarityError::UnexpectedStatus(500))
    }
}

fn close_match() -> Arc<dyn SimilarityChecker> {
    Arc::new(Fixed(serde_json::json!({
        "similar_projects": [
            {"project_id": 41, "name": "Campus Guide", "similarity_score": 91.5, "source_table": "books"},
            {"project_id": 42, "name": "Unrelated", "similarity_score": 12.0, "source_table": "books"}
        ]
    })))
}

// ---------------------------------------------------------------------------
// Submission
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn graduation_student_submits_and_is_enrolled(pool: PgPool) {
    let c = cast(&pool).await;
    let app = common::build_test_app(pool);

    let advisors = format!("{}, {}", c.teacher_a, common::email_for("Dr Rima Tal"));
    let response = submit(app, &c.owner_token, "Campus Navigator", &[("advisors", advisors.as_str())]).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let data = &body_json(response).await["data"];
    assert_eq!(data["project_owner"], c.owner);
    assert_eq!(data["students"][0]["id"], c.owner);
    assert_eq!(data["advisors"].as_array().unwrap().len(), 2);
    assert!(data["advisors"]
        .as_array()
        .unwrap()
        .iter()
        .all(|a| a["status"] == "pending"));
    assert!(data["accepted_advisor"].is_null());
    assert!(data["file"].as_str().unwrap().starts_with("pre_projects/"));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn plain_students_cannot_submit(pool: PgPool) {
    let c = cast(&pool).await;
    let (_, token) = user_with_token(&pool, "First Year", &[ROLE_STUDENT]).await;
    let app = common::build_test_app(pool);

    let advisors = c.teacher_a.to_string();
    let response = submit(app, &token, "Campus Navigator", &[("advisors", advisors.as_str())]).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn second_submission_by_owner_conflicts(pool: PgPool) {
    let c = cast(&pool).await;
    let app = common::build_test_app(pool);
    submitted(app.clone(), &c).await;

    let advisors = c.teacher_b.to_string();
    let response = submit(app, &c.owner_token, "Another Idea", &[("advisors", advisors.as_str())]).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(response).await["code"], "OWNER_HAS_PRE_PROJECT");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn enrolled_student_cannot_join_another_project(pool: PgPool) {
    let c = cast(&pool).await;
    let (_, other_token) =
        user_with_token(&pool, "Karim Zein", &[ROLE_STUDENT, ROLE_GRADUATION_STUDENT]).await;
    let app = common::build_test_app(pool);
    submitted(app.clone(), &c).await;

    let advisors = c.teacher_b.to_string();
    let students = c.owner.to_string();
    let response = submit(
        app,
        &other_token,
        "Lab Scheduler",
        &[("advisors", advisors.as_str()), ("students", students.as_str())],
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(response).await["code"], "STUDENT_HAS_PRE_PROJECT");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn invalid_fields_are_reported_together(pool: PgPool) {
    let c = cast(&pool).await;
    let app = common::build_test_app(pool);

    let advisors = c.teacher_a.to_string();
    let response = multipart_auth(
        app,
        Method::POST,
        "/api/v1/pre-projects",
        &c.owner_token,
        &[
            ("name", "Campus Navigator"),
            ("description", "Too short"),
            ("year", this_year().to_string().as_str()),
            ("season", "winter"),
            ("advisors", advisors.as_str()),
        ],
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = body_json(response).await;
    assert_eq!(json["code"], "VALIDATION_ERROR");
    assert!(json["fields"]["description"].is_string());
    assert!(json["fields"]["season"].is_string());
    assert!(json["fields"].get("name").is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn unknown_participants_are_field_errors(pool: PgPool) {
    let c = cast(&pool).await;
    let app = common::build_test_app(pool);

    let response = submit(
        app,
        &c.owner_token,
        "Campus Navigator",
        &[("advisors", "nobody@uni.test")],
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert!(json["fields"]["advisors"]
        .as_str()
        .unwrap()
        .contains("nobody@uni.test"));
}

// ---------------------------------------------------------------------------
// Arbitration
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn first_acceptance_wins(pool: PgPool) {
    let c = cast(&pool).await;
    let (_, outsider) = user_with_token(&pool, "Dr Outsider", &[ROLE_TEACHER]).await;
    let app = common::build_test_app(pool);
    let id = submitted(app.clone(), &c).await;

    let first = respond(app.clone(), &c.teacher_a_token, id, "accepted").await;
    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(body_json(first).await["data"]["status"], "accepted");

    let second = respond(app.clone(), &c.teacher_b_token, id, "accepted").await;
    assert_eq!(second.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(second).await["code"], "ACCEPTED_BY_OTHER");

    let again = respond(app.clone(), &c.teacher_a_token, id, "accepted").await;
    assert_eq!(again.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(again).await["code"], "ALREADY_ACCEPTED");

    let stranger = respond(app.clone(), &outsider, id, "accepted").await;
    assert_eq!(stranger.status(), StatusCode::BAD_REQUEST);
    assert!(body_json(stranger).await["fields"]["advisor_id"].is_string());

    let details = get_auth(app, &format!("/api/v1/pre-projects/{id}"), &c.owner_token).await;
    let data = &body_json(details).await["data"];
    assert_eq!(data["accepted_advisor"], c.teacher_a);
    assert_eq!(data["accepted_advisor_info"]["id"], c.teacher_a);
    let statuses: Vec<(i64, String)> = data["advisors"]
        .as_array()
        .unwrap()
        .iter()
        .map(|a| (a["id"].as_i64().unwrap(), a["status"].as_str().unwrap().to_string()))
        .collect();
    assert!(statuses.contains(&(c.teacher_a, "accepted".to_string())));
    assert!(statuses.contains(&(c.teacher_b, "rejected".to_string())));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn bad_status_is_a_field_error(pool: PgPool) {
    let c = cast(&pool).await;
    let app = common::build_test_app(pool);
    let id = submitted(app.clone(), &c).await;

    let response = respond(app, &c.teacher_a_token, id, "maybe").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_json(response).await["fields"]["status"].is_string());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn admin_reset_reopens_arbitration(pool: PgPool) {
    let c = cast(&pool).await;
    let app = common::build_test_app(pool);
    let id = submitted(app.clone(), &c).await;
    respond(app.clone(), &c.teacher_a_token, id, "accepted").await;

    let forbidden =
        delete_auth(app.clone(), &format!("/api/v1/pre-projects/{id}/advisors"), &c.owner_token)
            .await;
    assert_eq!(forbidden.status(), StatusCode::FORBIDDEN);

    let reset =
        delete_auth(app.clone(), &format!("/api/v1/pre-projects/{id}/advisors"), &c.admin_token)
            .await;
    assert_eq!(reset.status(), StatusCode::NO_CONTENT);

    let details = get_auth(app, &format!("/api/v1/pre-projects/{id}"), &c.owner_token).await;
    let data = &body_json(details).await["data"];
    assert!(data["accepted_advisor"].is_null());
    assert_eq!(data["advisors"], serde_json::json!([]));
}

// ---------------------------------------------------------------------------
// Update / delete
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn owner_updates_partially_until_locked(pool: PgPool) {
    let c = cast(&pool).await;
    let app = common::build_test_app(pool);
    let id = submitted(app.clone(), &c).await;
    let uri = format!("/api/v1/pre-projects/{id}");

    let response = multipart_auth(
        app.clone(),
        Method::PUT,
        &uri,
        &c.owner_token,
        &[("name", "Campus Navigator v2")],
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let data = &body_json(response).await["data"];
    assert_eq!(data["name"], "Campus Navigator v2");
    assert_eq!(data["description"], long_description());
    assert_eq!(data["advisors"].as_array().unwrap().len(), 2);

    let locked = put_json_auth(
        app.clone(),
        &format!("{uri}/can-update"),
        &c.admin_token,
        serde_json::json!({ "can_update": false }),
    )
    .await;
    assert_eq!(locked.status(), StatusCode::OK);
    assert_eq!(body_json(locked).await["data"]["can_update"], false);

    let response = multipart_auth(
        app,
        Method::PUT,
        &uri,
        &c.owner_token,
        &[("name", "Campus Navigator v3")],
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_json(response).await["code"], "PRE_PROJECT_LOCKED");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn only_owner_or_admin_deletes(pool: PgPool) {
    let c = cast(&pool).await;
    let (_, stranger) =
        user_with_token(&pool, "Other Student", &[ROLE_STUDENT, ROLE_GRADUATION_STUDENT]).await;
    let app = common::build_test_app(pool);
    let id = submitted(app.clone(), &c).await;
    let uri = format!("/api/v1/pre-projects/{id}");

    let response = delete_auth(app.clone(), &uri, &stranger).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = delete_auth(app.clone(), &uri, &c.owner_token).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = get_auth(app, &uri, &c.owner_token).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn associated_lists_projects_per_participant(pool: PgPool) {
    let c = cast(&pool).await;
    let (_, outsider) = user_with_token(&pool, "Dr Nobody", &[ROLE_TEACHER]).await;
    let app = common::build_test_app(pool);
    let id = submitted(app.clone(), &c).await;

    let mine = get_auth(app.clone(), "/api/v1/pre-projects/associated", &c.teacher_b_token).await;
    assert_eq!(body_json(mine).await["data"][0]["id"], id);

    let none = get_auth(app.clone(), "/api/v1/pre-projects/associated", &outsider).await;
    assert_eq!(body_json(none).await["data"], serde_json::json!([]));

    let all = get_auth(app, "/api/v1/pre-projects?search=navigator", &outsider).await;
    let json = body_json(all).await;
    assert_eq!(json["meta"]["total"], 1);
    assert_eq!(json["data"][0]["id"], id);
}

// ---------------------------------------------------------------------------
// Migration
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn migration_turns_accepted_project_into_book(pool: PgPool) {
    let c = cast(&pool).await;
    let app = common::build_test_app(pool);
    let id = submitted(app.clone(), &c).await;
    let uri = format!("/api/v1/pre-projects/{id}/migrate");
    let body = serde_json::json!({ "degree": 92, "discussant_ids": [c.teacher_b] });

    let early = post_json_auth(app.clone(), &uri, &c.admin_token, body.clone()).await;
    assert_eq!(early.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(early).await["code"], "NO_ACCEPTED_ADVISOR");

    respond(app.clone(), &c.teacher_a_token, id, "accepted").await;

    let not_admin = post_json_auth(app.clone(), &uri, &c.owner_token, body.clone()).await;
    assert_eq!(not_admin.status(), StatusCode::FORBIDDEN);

    let migrated = post_json_auth(app.clone(), &uri, &c.admin_token, body).await;
    assert_eq!(migrated.status(), StatusCode::CREATED);
    let book = body_json(migrated).await["data"].clone();
    assert_eq!(book["name"], "Campus Navigator");
    assert_eq!(book["degree"], 92);
    assert_eq!(book["students"][0]["id"], c.owner);
    assert_eq!(book["advisors"][0]["id"], c.teacher_a);
    assert_eq!(book["discussants"][0]["id"], c.teacher_b);

    let gone = get_auth(app.clone(), &format!("/api/v1/pre-projects/{id}"), &c.admin_token).await;
    assert_eq!(gone.status(), StatusCode::NOT_FOUND);

    let book_id = book["id"].as_i64().unwrap();
    let public = common::get(app.clone(), &format!("/api/v1/books/{book_id}")).await;
    assert_eq!(public.status(), StatusCode::OK);

    let roles = get_auth(app, &format!("/api/v1/users/{}/roles", c.owner), &c.admin_token).await;
    assert_eq!(
        body_json(roles).await["data"],
        serde_json::json!(["student", "graduated"])
    );
}

// ---------------------------------------------------------------------------
// Similarity gate
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn similar_proposals_are_blocked(pool: PgPool) {
    let c = cast(&pool).await;
    let app = common::build_test_app_with(pool, Some(close_match()));

    let advisors = c.teacher_a.to_string();
    let response = submit(
        app,
        &c.owner_token,
        "Campus Navigator",
        &[("advisors", advisors.as_str()), ("confirm", "true")],
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let json = body_json(response).await;
    assert_eq!(json["code"], "SIMILAR_PROJECTS");
    let matches = json["similar_projects"].as_array().unwrap();
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0]["project_id"], 41);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn admin_confirmation_bypasses_the_gate(pool: PgPool) {
    let c = cast(&pool).await;
    let app = common::build_test_app_with(pool, Some(close_match()));

    let advisors = c.teacher_a.to_string();
    let students = c.owner.to_string();
    let blocked = submit(
        app.clone(),
        &c.admin_token,
        "Campus Navigator",
        &[("advisors", advisors.as_str()), ("students", students.as_str())],
    )
    .await;
    assert_eq!(blocked.status(), StatusCode::CONFLICT);

    let confirmed = submit(
        app,
        &c.admin_token,
        "Campus Navigator",
        &[("advisors", advisors.as_str()), ("students", students.as_str()), ("confirm", "true")],
    )
    .await;
    assert_eq!(confirmed.status(), StatusCode::CREATED);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn unreachable_similarity_service_is_503(pool: PgPool) {
    let c = cast(&pool).await;
    let app = common::build_test_app_with(pool, Some(Arc::new(Offline)));

    let advisors = c.teacher_a.to_string();
    let response = submit(app, &c.owner_token, "Campus Navigator", &[("advisors", advisors.as_str())]).await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body_json(response).await["code"], "SERVICE_UNAVAILABLE");
}
