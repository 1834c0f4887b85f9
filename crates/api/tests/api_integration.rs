//! API integration tests.
//!
//! These tests verify the API endpoints work correctly together, with the
//! services wired over a mock database.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use ballotbox_api::{middleware::AppState, middleware::auth_middleware, router as api_router};
use ballotbox_core::{PollService, UserService, VoteService};
use ballotbox_db::entities::{choice, poll, user};
use ballotbox_db::repositories::{
    ChoiceRepository, PollRepository, UserRepository, VoteRepository,
};
use chrono::Utc;
use maplit::btreemap;
use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase, Value};
use tower::ServiceExt;

fn build_app(db: DatabaseConnection) -> Router {
    let db = Arc::new(db);
    let user_repo = UserRepository::new(Arc::clone(&db));
    let poll_repo = PollRepository::new(Arc::clone(&db));
    let choice_repo = ChoiceRepository::new(Arc::clone(&db));
    let vote_repo = VoteRepository::new(db);

    let state = AppState {
        user_service: UserService::new(user_repo),
        poll_service: PollService::new(poll_repo.clone(), choice_repo.clone()),
        vote_service: VoteService::new(poll_repo, choice_repo, vote_repo),
    };

    Router::new()
        .nest("/api", api_router())
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
        .with_state(state)
}

fn create_test_user(id: &str, username: &str) -> user::Model {
    user::Model {
        id: id.to_string(),
        username: username.to_string(),
        username_lower: username.to_lowercase(),
        password_hash: "$argon2id$test".to_string(),
        token: Some("test_token".to_string()),
        can_create_polls: true,
        created_at: Utc::now().into(),
        updated_at: None,
    }
}

fn create_test_poll(id: &str, owner_id: &str) -> poll::Model {
    poll::Model {
        id: id.to_string(),
        text: "Best color?".to_string(),
        owner_id: owner_id.to_string(),
        active: true,
        created_at: Utc::now().into(),
        updated_at: None,
    }
}

fn create_test_choice(id: &str, poll_id: &str, text: &str) -> choice::Model {
    choice::Model {
        id: id.to_string(),
        poll_id: poll_id.to_string(),
        text: text.to_string(),
        created_at: Utc::now().into(),
    }
}

fn json_request(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn authed_json_request(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .header("Authorization", "Bearer test_token")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_cast_vote_requires_auth() {
    let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
    let app = build_app(db);

    let response = app
        .oneshot(json_request(
            "/api/votes/create",
            r#"{"pollId":"p1","choiceId":"c1"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_create_poll_requires_auth() {
    let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
    let app = build_app(db);

    let response = app
        .oneshot(json_request(
            "/api/polls/create",
            r#"{"text":"Best color?","choice1":"Red","choice2":"Blue"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_signup_rejects_short_password() {
    let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
    let app = build_app(db);

    let response = app
        .oneshot(json_request(
            "/api/auth/signup",
            r#"{"username":"bob","password":"short"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_signin_unknown_user_is_unauthorized() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([Vec::<user::Model>::new()])
        .into_connection();
    let app = build_app(db);

    let response = app
        .oneshot(json_request(
            "/api/auth/signin",
            r#"{"username":"nobody","password":"whatever123"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_list_polls_with_token() {
    let user = create_test_user("u1", "alice");
    let poll = create_test_poll("p1", "u1");

    let db = MockDatabase::new(DatabaseBackend::Postgres)
        // auth middleware: token lookup
        .append_query_results([[user]])
        // paginator: count, then page fetch
        .append_query_results([vec![btreemap! {
            "num_items" => Into::<Value>::into(1i64),
        }]])
        .append_query_results([[poll]])
        .into_connection();
    let app = build_app(db);

    let response = app
        .oneshot(authed_json_request("/api/polls/list", r"{}"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["data"]["polls"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"]["page"], 1);
    assert_eq!(body["data"]["totalItems"], 1);
}

#[tokio::test]
async fn test_poll_results_are_public_and_zero_filled() {
    let poll = create_test_poll("p1", "u1");
    let choice1 = create_test_choice("c1", "p1", "Red");
    let choice2 = create_test_choice("c2", "p1", "Blue");

    let db = MockDatabase::new(DatabaseBackend::Postgres)
        // poll lookup (results handler)
        .append_query_results([[poll.clone()]])
        // tally: poll lookup, choices, grouped counts (none yet)
        .append_query_results([[poll]])
        .append_query_results([[choice1, choice2]])
        .append_query_results([Vec::<BTreeMap<&str, Value>>::new()])
        .into_connection();
    let app = build_app(db);

    let response = app
        .oneshot(json_request("/api/polls/results", r#"{"pollId":"p1"}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    let results = body["data"]["results"].as_array().unwrap();
    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|r| r["votes"] == 0));
    assert_eq!(body["data"]["totalVotes"], 0);
}

#[tokio::test]
async fn test_show_poll_anonymous_cannot_vote() {
    let poll = create_test_poll("p1", "u1");
    let choice1 = create_test_choice("c1", "p1", "Red");
    let choice2 = create_test_choice("c2", "p1", "Blue");

    let db = MockDatabase::new(DatabaseBackend::Postgres)
        // poll lookup (show handler)
        .append_query_results([[poll.clone()]])
        // tally: poll lookup, choices, grouped counts
        .append_query_results([[poll]])
        .append_query_results([[choice1, choice2]])
        .append_query_results([Vec::<BTreeMap<&str, Value>>::new()])
        .into_connection();
    let app = build_app(db);

    let response = app
        .oneshot(json_request("/api/polls/show", r#"{"pollId":"p1"}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["data"]["canVote"], false);
    assert_eq!(body["data"]["choices"].as_array().unwrap().len(), 2);
}
