use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use chrono::Duration;
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use messagely_api::{AppState, AppStateInner, router};
use messagely_auth::TokenSigner;
use messagely_db::Database;

const SECRET: &[u8] = b"integration-test-secret";

fn app() -> Router {
    app_with_state().0
}

fn app_with_state() -> (Router, AppState) {
    let state: AppState = Arc::new(AppStateInner {
        db: Database::open_in_memory().unwrap(),
        tokens: TokenSigner::new(SECRET, Duration::hours(1)),
    });
    (router(state.clone()), state)
}

async fn call(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let body = match body {
        Some(json) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };

    let response = app
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

async fn register(app: &Router, username: &str, password: &str) -> String {
    let (status, body) = call(
        app,
        Method::POST,
        "/auth/register",
        None,
        Some(json!({
            "username": username,
            "password": password,
            "first_name": "First",
            "last_name": "Last",
            "phone": "+15551234567",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "register {username}: {body}");
    body["token"].as_str().unwrap().to_string()
}

async fn login(app: &Router, username: &str, password: &str) -> (StatusCode, Value) {
    call(
        app,
        Method::POST,
        "/auth/login",
        None,
        Some(json!({ "username": username, "password": password })),
    )
    .await
}

async fn send(app: &Router, token: &str, to: &str, text: &str) -> i64 {
    let (status, body) = call(
        app,
        Method::POST,
        "/messages",
        Some(token),
        Some(json!({ "to_username": to, "body": text })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "send: {body}");
    body["message"]["id"].as_i64().unwrap()
}

#[tokio::test]
async fn duplicate_registration_keeps_first_password() {
    let app = app();
    register(&app, "alice", "pw1").await;

    let (status, body) = call(
        &app,
        Method::POST,
        "/auth/register",
        None,
        Some(json!({
            "username": "alice",
            "password": "pw2",
            "first_name": "Other",
            "last_name": "Person",
            "phone": "0",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "username already taken");

    let (status, body) = login(&app, "alice", "pw1").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["token"].is_string());

    let (status, _) = login(&app, "alice", "pw2").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn login_failure_does_not_reveal_whether_user_exists() {
    let app = app();
    register(&app, "alice", "pw1").await;

    let (wrong_status, wrong_body) = login(&app, "alice", "nope").await;
    let (ghost_status, ghost_body) = login(&app, "ghost", "nope").await;

    assert_eq!(wrong_status, StatusCode::BAD_REQUEST);
    assert_eq!(wrong_status, ghost_status);
    assert_eq!(wrong_body, ghost_body);
}

#[tokio::test]
async fn missing_fields_are_validation_errors() {
    let app = app();

    let (status, body) = login(&app, "alice", "").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "password is required");

    let (status, body) = call(
        &app,
        Method::POST,
        "/auth/register",
        None,
        Some(json!({ "username": "alice", "password": "pw" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "first_name is required");

    let (status, _) = call(&app, Method::POST, "/auth/login", None, Some(json!("not an object"))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn login_records_last_login_for_that_user() {
    let app = app();
    let alice = register(&app, "alice", "pw1").await;
    let bob = register(&app, "bob", "pw2").await;

    let (_, body) = call(&app, Method::GET, "/users/alice", Some(&alice), None).await;
    assert!(body["user"]["last_login_at"].is_null());
    assert!(body["user"]["join_at"].is_string());

    let (status, _) = login(&app, "alice", "pw1").await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = call(&app, Method::GET, "/users/alice", Some(&alice), None).await;
    assert!(body["user"]["last_login_at"].is_string());

    let (_, body) = call(&app, Method::GET, "/users/bob", Some(&bob), None).await;
    assert!(body["user"]["last_login_at"].is_null());
}

#[tokio::test]
async fn protected_routes_require_a_valid_token() {
    let app = app();
    register(&app, "alice", "pw1").await;

    let foreign = TokenSigner::new(b"some-other-secret", Duration::hours(1))
        .issue("alice")
        .unwrap();

    for uri in ["/users", "/users/alice", "/users/alice/to", "/messages/1"] {
        let (status, _) = call(&app, Method::GET, uri, None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{uri} without token");

        let (status, _) = call(&app, Method::GET, uri, Some("garbage"), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{uri} with garbage token");

        let (status, _) = call(&app, Method::GET, uri, Some(&foreign), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{uri} with foreign token");
    }

    let (status, _) = call(&app, Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn user_list_exposes_only_public_fields() {
    let app = app();
    let alice = register(&app, "alice", "pw1").await;
    register(&app, "bob", "pw2").await;

    let (status, body) = call(&app, Method::GET, "/users", Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK);

    let users = body["users"].as_array().unwrap();
    assert_eq!(users.len(), 2);
    for user in users {
        let mut keys: Vec<&str> = user.as_object().unwrap().keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(keys, ["first_name", "last_name", "phone", "username"]);
    }
}

#[tokio::test]
async fn profiles_and_mailboxes_are_owner_only() {
    let app = app();
    let alice = register(&app, "alice", "pw1").await;
    register(&app, "bob", "pw2").await;

    for uri in ["/users/bob", "/users/bob/to", "/users/bob/from"] {
        let (status, body) = call(&app, Method::GET, uri, Some(&alice), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN, "{uri}");
        assert_eq!(body["error"], "permission denied");
    }

    for uri in ["/users/alice", "/users/alice/to", "/users/alice/from"] {
        let (status, _) = call(&app, Method::GET, uri, Some(&alice), None).await;
        assert_eq!(status, StatusCode::OK, "{uri}");
    }
}

#[tokio::test]
async fn message_lifecycle_between_sender_and_recipient() {
    let app = app();
    let alice = register(&app, "alice", "pw1").await;
    let bob = register(&app, "bob", "pw2").await;
    let carol = register(&app, "carol", "pw3").await;

    let id = send(&app, &alice, "bob", "hi bob").await;
    let uri = format!("/messages/{id}");
    let read_uri = format!("/messages/{id}/read");

    // Both parties can read it; nobody else can.
    for token in [&alice, &bob] {
        let (status, body) = call(&app, Method::GET, &uri, Some(token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"]["from_user"]["username"], "alice");
        assert_eq!(body["message"]["to_user"]["username"], "bob");
        assert!(body["message"]["read_at"].is_null());
    }
    let (status, _) = call(&app, Method::GET, &uri, Some(&carol), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Only bob may mark it read, and the first timestamp sticks.
    let (status, first) = call(&app, Method::POST, &read_uri, Some(&bob), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["message"]["id"], id);
    assert!(first["message"]["read_at"].is_string());

    let (status, _) = call(&app, Method::POST, &read_uri, Some(&alice), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = call(&app, Method::POST, &read_uri, Some(&carol), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, second) = call(&app, Method::POST, &read_uri, Some(&bob), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["message"]["read_at"], second["message"]["read_at"]);

    let (_, body) = call(&app, Method::GET, &uri, Some(&alice), None).await;
    assert_eq!(body["message"]["read_at"], first["message"]["read_at"]);
}

#[tokio::test]
async fn mailboxes_list_counterparts() {
    let app = app();
    let alice = register(&app, "alice", "pw1").await;
    let bob = register(&app, "bob", "pw2").await;

    let (_, body) = call(&app, Method::GET, "/users/bob/to", Some(&bob), None).await;
    assert_eq!(body["messages"], json!([]));

    send(&app, &alice, "bob", "one").await;
    send(&app, &alice, "bob", "two").await;

    let (_, body) = call(&app, Method::GET, "/users/bob/to", Some(&bob), None).await;
    let inbox = body["messages"].as_array().unwrap();
    assert_eq!(inbox.len(), 2);
    assert_eq!(inbox[0]["body"], "one");
    assert_eq!(inbox[0]["from_user"]["username"], "alice");

    let (_, body) = call(&app, Method::GET, "/users/alice/from", Some(&alice), None).await;
    let outbox = body["messages"].as_array().unwrap();
    assert_eq!(outbox.len(), 2);
    assert_eq!(outbox[1]["to_user"]["username"], "bob");
}

#[tokio::test]
async fn sender_is_always_the_caller() {
    let app = app();
    let alice = register(&app, "alice", "pw1").await;
    register(&app, "bob", "pw2").await;

    let (status, body) = call(
        &app,
        Method::POST,
        "/messages",
        Some(&alice),
        Some(json!({ "to_username": "bob", "body": "hello" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["message"]["from_username"], "alice");
    assert_eq!(body["message"]["to_username"], "bob");

    // Naming another sender is not accepted at all.
    let (status, _) = call(
        &app,
        Method::POST,
        "/messages",
        Some(&alice),
        Some(json!({ "from_username": "bob", "to_username": "alice", "body": "spoof" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn message_errors() {
    let app = app();
    let alice = register(&app, "alice", "pw1").await;

    let (status, _) = call(
        &app,
        Method::POST,
        "/messages",
        Some(&alice),
        Some(json!({ "to_username": "nobody", "body": "hello?" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = call(
        &app,
        Method::POST,
        "/messages",
        Some(&alice),
        Some(json!({ "to_username": "alice" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "body is required");

    let (status, _) = call(&app, Method::GET, "/messages/999", Some(&alice), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = call(&app, Method::POST, "/messages/999/read", Some(&alice), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn malformed_message_id_is_a_json_validation_error() {
    let app = app();
    let alice = register(&app, "alice", "pw1").await;

    for (method, uri) in [
        (Method::GET, "/messages/abc"),
        (Method::POST, "/messages/abc/read"),
        (Method::GET, "/messages/99999999999999999999999"),
    ] {
        let (status, body) = call(&app, method, uri, Some(&alice), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert!(body["error"].is_string(), "{uri} should carry a JSON error, got {body}");
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_registrations_admit_exactly_one() {
    let app = app();

    let attempts: Vec<_> = (0..8)
        .map(|i| {
            let app = app.clone();
            tokio::spawn(async move {
                let (status, _) = call(
                    &app,
                    Method::POST,
                    "/auth/register",
                    None,
                    Some(json!({
                        "username": "alice",
                        "password": format!("pw{i}"),
                        "first_name": "First",
                        "last_name": "Last",
                        "phone": "0",
                    })),
                )
                .await;
                status
            })
        })
        .collect();

    let mut statuses = Vec::new();
    for attempt in attempts {
        statuses.push(attempt.await.unwrap());
    }

    let created = statuses.iter().filter(|s| **s == StatusCode::CREATED).count();
    let conflicts = statuses.iter().filter(|s| **s == StatusCode::CONFLICT).count();
    assert_eq!(created, 1, "{statuses:?}");
    assert_eq!(conflicts, 7, "{statuses:?}");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_mark_read_keeps_one_timestamp() {
    let app = app();
    let alice = register(&app, "alice", "pw1").await;
    let bob = register(&app, "bob", "pw2").await;
    let id = send(&app, &alice, "bob", "read me").await;

    let marks: Vec<_> = (0..8)
        .map(|_| {
            let app = app.clone();
            let bob = bob.clone();
            tokio::spawn(async move {
                call(&app, Method::POST, &format!("/messages/{id}/read"), Some(&bob), None).await
            })
        })
        .collect();

    let mut read_ats = Vec::new();
    for mark in marks {
        let (status, body) = mark.await.unwrap();
        assert_eq!(status, StatusCode::OK);
        read_ats.push(body["message"]["read_at"].clone());
    }

    assert!(read_ats[0].is_string());
    assert!(read_ats.iter().all(|r| *r == read_ats[0]), "{read_ats:?}");

    let (_, body) = call(&app, Method::GET, &format!("/messages/{id}"), Some(&bob), None).await;
    assert_eq!(body["message"]["read_at"], read_ats[0]);
}

#[tokio::test]
async fn corrupt_stored_timestamp_fails_the_request() {
    let (app, state) = app_with_state();
    let alice = register(&app, "alice", "pw1").await;

    state
        .db
        .with_conn(|conn| {
            conn.execute("UPDATE users SET join_at = 'garbage' WHERE username = 'alice'", [])?;
            Ok(())
        })
        .unwrap();

    let (status, body) = call(&app, Method::GET, "/users/alice", Some(&alice), None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "internal server error");
}
