//! Direct messaging over HTTP: sending, conversation access, deletion.

mod common;

use axum::http::{Method, StatusCode};
use axum::Router;
use axum::extract::ws::Message;
use common::{body_json, delete_auth, get, get_auth, multipart_auth, user_with_token};
use gradhub_core::roles::{ROLE_GRADUATED, ROLE_STUDENT, ROLE_TEACHER};
use gradhub_core::types::DbId;
use sqlx::PgPool;

async fn send_text(app: Router, token: &str, receiver: DbId, body: &str) -> axum::response::Response {
    let receiver = receiver.to_string();
    multipart_auth(
        app,
        Method::POST,
        "/api/v1/messages",
        token,
        &[("receiver_id", receiver.as_str()), ("body", body)],
        None,
    )
    .await
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn sent_message_opens_a_conversation(pool: PgPool) {
    let (sender, sender_token) = user_with_token(&pool, "Lina Haddad", &[ROLE_STUDENT]).await;
    let (receiver, receiver_token) = user_with_token(&pool, "Dr Omar Ali", &[ROLE_TEACHER]).await;
    let app = common::build_test_app(pool);

    let response = send_text(app.clone(), &sender_token, receiver, "  Can we meet on Monday?  ").await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let message = body_json(response).await["data"].clone();
    assert_eq!(message["sender_id"], sender);
    assert_eq!(message["receiver_id"], receiver);
    assert_eq!(message["body"], "Can we meet on Monday?");

    let list = get_auth(app.clone(), "/api/v1/conversations", &receiver_token).await;
    assert_eq!(list.status(), StatusCode::OK);
    let conversations = body_json(list).await["data"].clone();
    assert_eq!(conversations.as_array().unwrap().len(), 1);
    assert_eq!(conversations[0]["other_user_id"], sender);
    assert_eq!(conversations[0]["last_message"], "Can we meet on Monday?");

    let id = conversations[0]["id"].as_i64().unwrap();
    let view = get_auth(app, &format!("/api/v1/conversations/{id}"), &receiver_token).await;
    assert_eq!(view.status(), StatusCode::OK);
    let data = body_json(view).await["data"].clone();
    assert_eq!(data["other_user"]["id"], sender);
    assert_eq!(data["messages"][0]["id"], message["id"]);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn replies_reuse_the_same_conversation(pool: PgPool) {
    let (a, a_token) = user_with_token(&pool, "Lina Haddad", &[ROLE_STUDENT]).await;
    let (b, b_token) = user_with_token(&pool, "Dr Omar Ali", &[ROLE_TEACHER]).await;
    let app = common::build_test_app(pool);

    let first = body_json(send_text(app.clone(), &a_token, b, "Hello").await).await;
    let reply = body_json(send_text(app.clone(), &b_token, a, "Hi, sure").await).await;
    assert_eq!(first["data"]["conversation_id"], reply["data"]["conversation_id"]);

    let list = get_auth(app, "/api/v1/conversations", &a_token).await;
    let conversations = body_json(list).await["data"].clone();
    assert_eq!(conversations.as_array().unwrap().len(), 1);
    assert_eq!(conversations[0]["last_message"], "Hi, sure");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn invalid_messages_are_rejected(pool: PgPool) {
    let (me, token) = user_with_token(&pool, "Lina Haddad", &[ROLE_STUDENT]).await;
    let (other, _) = user_with_token(&pool, "Dr Omar Ali", &[ROLE_TEACHER]).await;
    let app = common::build_test_app(pool);

    let to_self = send_text(app.clone(), &token, me, "Note to self").await;
    assert_eq!(to_self.status(), StatusCode::BAD_REQUEST);
    assert!(body_json(to_self).await["fields"]["receiver_id"].is_string());

    let empty = send_text(app.clone(), &token, other, "   ").await;
    assert_eq!(empty.status(), StatusCode::BAD_REQUEST);
    assert!(body_json(empty).await["fields"]["body"].is_string());

    let unknown = send_text(app, &token, 999_999, "Anyone there?").await;
    assert_eq!(unknown.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn attachment_only_message_is_accepted(pool: PgPool) {
    let (_, token) = user_with_token(&pool, "Lina Haddad", &[ROLE_STUDENT]).await;
    let (other, _) = user_with_token(&pool, "Dr Omar Ali", &[ROLE_TEACHER]).await;
    let app = common::build_test_app(pool);

    let receiver = other.to_string();
    let response = multipart_auth(
        app,
        Method::POST,
        "/api/v1/messages",
        &token,
        &[("receiver_id", receiver.as_str())],
        Some(("draft.pdf", b"%PDF-1.4 draft".as_slice())),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let data = body_json(response).await["data"].clone();
    assert!(data["body"].is_null());
    assert!(data["file"].as_str().unwrap().starts_with("messages/"));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn outsiders_cannot_read_a_conversation(pool: PgPool) {
    let (_, a_token) = user_with_token(&pool, "Lina Haddad", &[ROLE_STUDENT]).await;
    let (b, _) = user_with_token(&pool, "Dr Omar Ali", &[ROLE_TEACHER]).await;
    let (_, outsider) = user_with_token(&pool, "Sami Nassar", &[ROLE_STUDENT]).await;
    let app = common::build_test_app(pool);

    let sent = body_json(send_text(app.clone(), &a_token, b, "Hello").await).await;
    let id = sent["data"]["conversation_id"].as_i64().unwrap();
    let uri = format!("/api/v1/conversations/{id}");

    let read = get_auth(app.clone(), &uri, &outsider).await;
    assert_eq!(read.status(), StatusCode::FORBIDDEN);

    let delete = delete_auth(app.clone(), &uri, &outsider).await;
    assert_eq!(delete.status(), StatusCode::FORBIDDEN);

    let missing = get_auth(app, "/api/v1/conversations/999999", &a_token).await;
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn only_the_sender_deletes_a_message(pool: PgPool) {
    let (_, a_token) = user_with_token(&pool, "Lina Haddad", &[ROLE_STUDENT]).await;
    let (b, b_token) = user_with_token(&pool, "Dr Omar Ali", &[ROLE_TEACHER]).await;
    let app = common::build_test_app(pool);

    let sent = body_json(send_text(app.clone(), &a_token, b, "Oops, wrong chat").await).await;
    let id = sent["data"]["id"].as_i64().unwrap();
    let conversation = sent["data"]["conversation_id"].as_i64().unwrap();
    let uri = format!("/api/v1/messages/{id}");

    let by_receiver = delete_auth(app.clone(), &uri, &b_token).await;
    assert_eq!(by_receiver.status(), StatusCode::FORBIDDEN);

    let by_sender = delete_auth(app.clone(), &uri, &a_token).await;
    assert_eq!(by_sender.status(), StatusCode::NO_CONTENT);

    let again = delete_auth(app.clone(), &uri, &a_token).await;
    assert_eq!(again.status(), StatusCode::NOT_FOUND);

    let view = get_auth(app, &format!("/api/v1/conversations/{conversation}"), &b_token).await;
    assert_eq!(body_json(view).await["data"]["messages"], serde_json::json!([]));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn deleting_a_conversation_removes_it_for_both(pool: PgPool) {
    let (_, a_token) = user_with_token(&pool, "Lina Haddad", &[ROLE_STUDENT]).await;
    let (b, b_token) = user_with_token(&pool, "Dr Omar Ali", &[ROLE_TEACHER]).await;
    let app = common::build_test_app(pool);

    let sent = body_json(send_text(app.clone(), &a_token, b, "Hello").await).await;
    let id = sent["data"]["conversation_id"].as_i64().unwrap();

    let deleted = delete_auth(app.clone(), &format!("/api/v1/conversations/{id}"), &b_token).await;
    assert_eq!(deleted.status(), StatusCode::NO_CONTENT);

    let list = get_auth(app, "/api/v1/conversations", &a_token).await;
    assert_eq!(body_json(list).await["data"], serde_json::json!([]));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn deleting_a_conversation_discards_attachments_and_notifies_both(pool: PgPool) {
    let (a, a_token) = user_with_token(&pool, "Lina Haddad", &[ROLE_STUDENT]).await;
    let (b, b_token) = user_with_token(&pool, "Dr Omar Ali", &[ROLE_TEACHER]).await;
    let (app, ws_manager) = common::build_test_app_with_ws(pool);

    let receiver = b.to_string();
    let sent = multipart_auth(
        app.clone(),
        Method::POST,
        "/api/v1/messages",
        &a_token,
        &[("receiver_id", receiver.as_str()), ("body", "Chapter two")],
        Some(("chapter2.pdf", b"%PDF-1.4 chapter".as_slice())),
    )
    .await;
    let sent = body_json(sent).await["data"].clone();
    let id = sent["conversation_id"].as_i64().unwrap();
    let file = sent["file"].as_str().unwrap().to_string();
    assert_eq!(
        get(app.clone(), &format!("/uploads/{file}")).await.status(),
        StatusCode::OK
    );

    let mut a_rx = ws_manager.add("a".into(), a).await;
    let mut b_rx = ws_manager.add("b".into(), b).await;

    let deleted = delete_auth(app.clone(), &format!("/api/v1/conversations/{id}"), &b_token).await;
    assert_eq!(deleted.status(), StatusCode::NO_CONTENT);

    assert_eq!(
        get(app, &format!("/uploads/{file}")).await.status(),
        StatusCode::NOT_FOUND
    );
    for rx in [&mut a_rx, &mut b_rx] {
        let Ok(Message::Text(text)) = rx.try_recv() else {
            panic!("expected a conversation.deleted frame");
        };
        let value: serde_json::Value = serde_json::from_str(text.as_str()).unwrap();
        assert_eq!(value["type"], "conversation.deleted");
        assert_eq!(value["data"]["id"], id);
    }
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn graduated_users_cannot_read_conversations(pool: PgPool) {
    let (_, token) = user_with_token(&pool, "Alumna", &[ROLE_STUDENT, ROLE_GRADUATED]).await;
    let app = common::build_test_app(pool);

    let response = get_auth(app, "/api/v1/conversations", &token).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_json(response).await["code"], "FORBIDDEN");
}
