//! Chat REST API Tests

use std::sync::Arc;

use axum::{body::Body, http::Request, http::StatusCode};
use chrono::Utc;
use pretty_assertions::assert_eq;

use chat_relay::domain::{ChatStore, NewMessage};
use chat_relay::presentation::websocket::{ChannelConnection, Connection};

use crate::common::{expect_json, TestApp};

async fn open_chat(app: &TestApp, caller: &str, other: &str) -> String {
    let token = app.token_for(caller);
    let body = format!(r#"{{"user_id":"{}"}}"#, other);
    let json = expect_json(
        app.post_json_auth("/api/v1/chats", &body, &token).await,
        StatusCode::CREATED,
    )
    .await;
    json["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_list_chats_requires_token() {
    let app = TestApp::new();

    let json = expect_json(app.get("/api/v1/chats").await, StatusCode::UNAUTHORIZED).await;

    assert_eq!(json["code"], 10003);
}

#[tokio::test]
async fn test_list_chats_rejects_forged_token() {
    let app = TestApp::new();

    let response = app.get_auth("/api/v1/chats", "not-a-jwt").await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_create_chat_then_reopen() {
    let app = TestApp::new();
    let chat_id = open_chat(&app, "u1", "u2").await;

    // The other participant opening the same pair gets the existing chat
    let token = app.token_for("u2");
    let json = expect_json(
        app.post_json_auth("/api/v1/chats", r#"{"user_id":"u1"}"#, &token)
            .await,
        StatusCode::OK,
    )
    .await;

    assert_eq!(json["id"], chat_id.as_str());
    assert_eq!(json["user_data"]["username"], "alice");
    assert_eq!(json["count_messages"], 0);
}

#[tokio::test]
async fn test_create_chat_with_self_is_rejected() {
    let app = TestApp::new();
    let token = app.token_for("u1");

    let response = app
        .post_json_auth("/api/v1/chats", r#"{"user_id":"u1"}"#, &token)
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_create_chat_with_empty_user_id_is_rejected() {
    let app = TestApp::new();
    let token = app.token_for("u1");

    let response = app
        .post_json_auth("/api/v1/chats", r#"{"user_id":""}"#, &token)
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_create_chat_with_unknown_user() {
    let app = TestApp::new();
    let token = app.token_for("u1");

    let response = app
        .post_json_auth("/api/v1/chats", r#"{"user_id":"ghost"}"#, &token)
        .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_list_and_get_chat() {
    let app = TestApp::new();
    let chat_id = open_chat(&app, "u1", "u2").await;
    open_chat(&app, "u3", "u1").await;
    let token = app.token_for("u1");

    let list = expect_json(app.get_auth("/api/v1/chats", &token).await, StatusCode::OK).await;
    assert_eq!(list.as_array().unwrap().len(), 2);

    let uri = format!("/api/v1/chats/{}", chat_id);
    let chat = expect_json(app.get_auth(&uri, &token).await, StatusCode::OK).await;
    assert_eq!(chat["user_data"]["id"], "u2");

    let outsider = app.token_for("u3");
    let response = app.get_auth(&uri, &outsider).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app.get_auth("/api/v1/chats/missing", &token).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_history_is_paged() {
    let app = TestApp::new();
    let chat_id = open_chat(&app, "u1", "u2").await;
    for i in 0..45 {
        app.store
            .save_message(&NewMessage::stamp(chat_id.as_str(), format!("m{i}"), "u1", Utc::now()))
            .await
            .unwrap();
    }
    let token = app.token_for("u2");

    let uri = format!("/api/v1/chats/{}/messages", chat_id);
    let first = expect_json(app.get_auth(&uri, &token).await, StatusCode::OK).await;
    assert_eq!(first["messages"].as_array().unwrap().len(), 20);
    assert_eq!(first["total_pages"], 3);

    let uri = format!("/api/v1/chats/{}/messages?limit=20&page=3", chat_id);
    let last = expect_json(app.get_auth(&uri, &token).await, StatusCode::OK).await;
    assert_eq!(last["messages"].as_array().unwrap().len(), 5);
}

#[tokio::test]
async fn test_history_query_bounds() {
    let app = TestApp::new();
    let chat_id = open_chat(&app, "u1", "u2").await;
    let token = app.token_for("u1");

    for query in ["limit=100", "limit=0", "page=0", "limit=abc"] {
        let uri = format!("/api/v1/chats/{}/messages?{}", chat_id, query);
        let response = app.get_auth(&uri, &token).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "query {}", query);
    }
}

#[tokio::test]
async fn test_history_requires_participation() {
    let app = TestApp::new();
    let chat_id = open_chat(&app, "u1", "u2").await;
    let token = app.token_for("u3");

    let uri = format!("/api/v1/chats/{}/messages", chat_id);
    let response = app.get_auth(&uri, &token).await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_online_users_excludes_caller() {
    let app = TestApp::new();
    for user in ["u1", "u2"] {
        let (conn, _rx) = ChannelConnection::new(user);
        let conn: Arc<dyn Connection> = Arc::new(conn);
        app.state.gateway.register(conn);
    }
    let token = app.token_for("u1");

    let json = expect_json(
        app.get_auth("/api/v1/online-users", &token).await,
        StatusCode::OK,
    )
    .await;

    let users = json["online_users"].as_array().unwrap();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0]["username"], "bob");
}

#[tokio::test]
async fn test_token_from_query_parameter() {
    let app = TestApp::new();
    let uri = format!("/api/v1/chats?token={}", app.token_for("u1"));

    let response = app.get(&uri).await;

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_token_from_cookie() {
    let app = TestApp::new();
    let request = Request::builder()
        .method("GET")
        .uri("/api/v1/chats")
        .header("Cookie", format!("auth_token={}", app.token_for("u1")))
        .body(Body::empty())
        .unwrap();

    let response = app.send(request).await;

    assert_eq!(response.status(), StatusCode::OK);
}
