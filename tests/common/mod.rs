#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use starsteps::config::ContentConfig;
use starsteps::routes::build_router;
use starsteps::state::AppState;

pub fn create_test_app() -> Router {
    let state = AppState::from_config(ContentConfig::embedded().expect("embedded catalog"));
    build_router(Arc::new(state))
}

pub async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            builder = builder.header("content-type", "application/json");
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
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

/// Register a learner and return its id.
pub async fn register(app: &Router, name: &str, email: &str, age: u32) -> String {
    let (status, body) = send(
        app,
        Method::POST,
        "/api/v1/learners",
        Some(serde_json::json!({ "name": name, "email": email, "age": age })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    body["id"].as_str().unwrap().to_string()
}

/// Start a lesson and return the session snapshot.
pub async fn start(app: &Router, learner_id: &str, subject: &str, lesson_id: u32) -> Value {
    let (status, body) = send(
        app,
        Method::POST,
        "/api/v1/lessons",
        Some(serde_json::json!({ "learnerId": learner_id, "subject": subject, "lessonId": lesson_id })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    body
}

pub async fn interact(app: &Router, session: &str, element: &str, choice: Option<&str>) -> Value {
    let (status, body) = send(
        app,
        Method::POST,
        &format!("/api/v1/lessons/{}/interact", session),
        Some(serde_json::json!({ "elementId": element, "choice": choice })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    body
}

pub async fn advance(app: &Router, session: &str) -> Value {
    let (status, body) = send(app, Method::POST, &format!("/api/v1/lessons/{}/advance", session), None).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    body
}
