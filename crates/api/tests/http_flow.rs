//! End-to-end tests over the router: register, review, vote, and the
//! session gate.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::header::{CONTENT_TYPE, COOKIE, SET_COOKIE};
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use goodshelf_api::{AppState, SessionStore, router};
use goodshelf_domain::Services;
use goodshelf_storage::{CatalogStore, MemoryStorage, NewBook};
use goodshelf_types::BookId;

#[tokio::test]
async fn register_review_and_vote_flow() {
    let (app, store) = test_app();
    let book = seed_book(&store, "Dune").await;

    // Register and keep the session cookie.
    let response = send(
        &app,
        Request::post("/api/auth/register")
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(
                json!({
                    "username": "alice",
                    "password": "hunter2!",
                    "confirm_password": "hunter2!"
                })
                .to_string(),
            ))
            .unwrap(),
    )
    .await;
    assert_eq!(response.0, StatusCode::CREATED);
    let cookie = response.2.expect("register should set a session cookie");
    assert_eq!(response.1["username"], "alice");

    // Submit a review.
    let response = send(
        &app,
        Request::post(format!("/api/books/{}/reviews", book.get()))
            .header(CONTENT_TYPE, "application/json")
            .header(COOKIE, cookie.as_str())
            .body(Body::from(
                json!({ "rating": 5, "comment": "the spice must flow" }).to_string(),
            ))
            .unwrap(),
    )
    .await;
    assert_eq!(response.0, StatusCode::CREATED);
    let review_id = response.1["id"].as_i64().unwrap();

    // Submitting again replaces, not duplicates.
    let response = send(
        &app,
        Request::post(format!("/api/books/{}/reviews", book.get()))
            .header(CONTENT_TYPE, "application/json")
            .header(COOKIE, cookie.as_str())
            .body(Body::from(
                json!({ "rating": 3, "comment": "second thoughts" }).to_string(),
            ))
            .unwrap(),
    )
    .await;
    assert_eq!(response.0, StatusCode::OK);
    assert_eq!(response.1["id"].as_i64(), Some(review_id));
    assert_eq!(response.1["rating"], 3);

    // Vote, then vote again to retract.
    let response = send(
        &app,
        Request::post(format!("/api/reviews/{review_id}/vote"))
            .header(CONTENT_TYPE, "application/json")
            .header(COOKIE, cookie.as_str())
            .body(Body::from(json!({ "kind": "up" }).to_string()))
            .unwrap(),
    )
    .await;
    assert_eq!(response.0, StatusCode::OK);
    assert_eq!(response.1["outcome"], "created");
    assert_eq!(response.1["tally"]["net"], 1);

    let response = send(
        &app,
        Request::post(format!("/api/reviews/{review_id}/vote"))
            .header(CONTENT_TYPE, "application/json")
            .header(COOKIE, cookie.as_str())
            .body(Body::from(json!({ "kind": "up" }).to_string()))
            .unwrap(),
    )
    .await;
    assert_eq!(response.1["outcome"], "retracted");
    assert_eq!(response.1["tally"]["net"], 0);

    // The tally endpoint is public.
    let response = send(
        &app,
        Request::get(format!("/api/reviews/{review_id}/votes"))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(response.0, StatusCode::OK);
    assert_eq!(response.1["upvotes"], 0);
    assert_eq!(response.1["viewer_vote"], Value::Null);
}

#[tokio::test]
async fn mutating_routes_require_a_session() {
    let (app, store) = test_app();
    let book = seed_book(&store, "Dune").await;

    let response = send(
        &app,
        Request::post(format!("/api/books/{}/reviews", book.get()))
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(
                json!({ "rating": 5, "comment": "anonymous praise" }).to_string(),
            ))
            .unwrap(),
    )
    .await;
    assert_eq!(response.0, StatusCode::UNAUTHORIZED);

    // Browsing stays open.
    let response = send(&app, Request::get("/api/books").body(Body::empty()).unwrap()).await;
    assert_eq!(response.0, StatusCode::OK);
    assert_eq!(response.1["total"], 1);

    let response = send(
        &app,
        Request::get(format!("/api/books/{}", book.get()))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(response.0, StatusCode::OK);
    assert_eq!(response.1["book"]["title"], "Dune");
}

#[tokio::test]
async fn login_issues_a_working_session_cookie() {
    let (app, _) = test_app();

    let response = send(
        &app,
        Request::post("/api/auth/register")
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(
                json!({
                    "username": "alice",
                    "password": "hunter2!",
                    "confirm_password": "hunter2!"
                })
                .to_string(),
            ))
            .unwrap(),
    )
    .await;
    assert_eq!(response.0, StatusCode::CREATED);

    let response = send(
        &app,
        Request::post("/api/auth/login")
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(
                json!({ "username": "alice", "password": "hunter2!" }).to_string(),
            ))
            .unwrap(),
    )
    .await;
    assert_eq!(response.0, StatusCode::OK);
    assert_eq!(response.1["username"], "alice");
    let cookie = response.2.expect("login should set a session cookie");

    let response = send(
        &app,
        Request::get("/api/me")
            .header(COOKIE, cookie.as_str())
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(response.0, StatusCode::OK);
    assert_eq!(response.1["user"]["username"], "alice");
}

#[tokio::test]
async fn logout_invalidates_the_cookie() {
    let (app, _) = test_app();

    let response = send(
        &app,
        Request::post("/api/auth/register")
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(
                json!({
                    "username": "alice",
                    "password": "hunter2!",
                    "confirm_password": "hunter2!"
                })
                .to_string(),
            ))
            .unwrap(),
    )
    .await;
    let cookie = response.2.unwrap();

    let response = send(
        &app,
        Request::post("/api/auth/logout")
            .header(COOKIE, cookie.as_str())
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(response.0, StatusCode::NO_CONTENT);

    let response = send(
        &app,
        Request::get("/api/me")
            .header(COOKIE, cookie.as_str())
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(response.0, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn admin_routes_are_role_gated() {
    let (app, _) = test_app();

    let response = send(
        &app,
        Request::post("/api/auth/register")
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(
                json!({
                    "username": "alice",
                    "password": "hunter2!",
                    "confirm_password": "hunter2!"
                })
                .to_string(),
            ))
            .unwrap(),
    )
    .await;
    let cookie = response.2.unwrap();

    let response = send(
        &app,
        Request::get("/api/admin/users")
            .header(COOKIE, cookie.as_str())
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(response.0, StatusCode::FORBIDDEN);
}

// === Helpers ===

fn test_app() -> (Router, Arc<MemoryStorage>) {
    let store = Arc::new(MemoryStorage::new());
    let sessions = Arc::new(SessionStore::new(Duration::from_secs(3600)));
    let state = AppState::new(Services::new(store.clone()), sessions);
    (router(state), store)
}

async fn seed_book(store: &MemoryStorage, title: &str) -> BookId {
    store
        .create_book(&NewBook {
            title: title.to_string(),
            author: "Frank Herbert".to_string(),
            ..Default::default()
        })
        .await
        .unwrap()
        .id
}

/// Fire a request and return (status, parsed JSON body, session cookie).
async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value, Option<String>) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let cookie = response
        .headers()
        .get(SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(|v| v.to_string());
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body, cookie)
}
