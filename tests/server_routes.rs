//! HTTP routes exercised in-process through `tower::ServiceExt::oneshot`.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use league_bracket::server::{router, ServerState};
use league_bracket::BracketOptions;
use serde_json::{json, Value};
use tower::ServiceExt; // For `oneshot` method

fn app() -> Router {
    router(ServerState::new(BracketOptions::default()))
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

fn four_teams(bracket_type: &str) -> Value {
    json!({
        "type": bracket_type,
        "entrants": [
            { "id": 1, "displayName": "Harbor City", "seed": 1 },
            { "id": 2, "displayName": "North Quay", "seed": 2 },
            { "id": 3, "displayName": "Mill Lane" },
            { "id": 4, "displayName": "Old Docks" }
        ]
    })
}

async fn create(app: &Router, bracket_type: &str) -> String {
    let (status, body) = send(app, "POST", "/brackets", Some(four_teams(bracket_type))).await;
    assert_eq!(status, StatusCode::CREATED);
    body["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_create_and_fetch_bracket() {
    let app = app();
    let id = create(&app, "singleElimination").await;

    let (status, list) = send(&app, "GET", "/brackets", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list, json!([id]));

    let (status, snapshot) = send(&app, "GET", &format!("/brackets/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(snapshot["status"], "inProgress");
    assert_eq!(snapshot["rounds"][1]["label"], "Finals");
}

#[tokio::test]
async fn test_record_result_advances_winner() {
    let app = app();
    let id = create(&app, "singleElimination").await;

    let uri = format!("/brackets/{id}/matches/1/result");
    let (status, snapshot) = send(&app, "POST", &uri, Some(json!({ "scoreA": 3, "scoreB": 1 }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(snapshot["rounds"][1]["matches"][0]["slots"][0]["entrantId"], 1);

    let (status, snapshot) = send(&app, "DELETE", &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(snapshot["rounds"][1]["matches"][0]["slots"][0]["entrantId"], Value::Null);
}

#[tokio::test]
async fn test_error_statuses() {
    let app = app();
    let id = create(&app, "doubleElimination").await;

    let (status, body) = send(
        &app,
        "POST",
        &format!("/brackets/{id}/matches/1/result"),
        Some(json!({ "scoreA": 2, "scoreB": 2 })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"].as_str().unwrap().contains("tie"));

    let (status, _) = send(
        &app,
        "POST",
        &format!("/brackets/{id}/matches/99/result"),
        Some(json!({ "scoreA": 2, "scoreB": 0 })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let missing = uuid::Uuid::new_v4();
    let (status, _) = send(&app, "GET", &format!("/brackets/{missing}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(
        &app,
        "POST",
        "/brackets",
        Some(json!({ "type": "singleElimination", "entrants": [{ "id": 1, "displayName": "Solo" }] })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("at least two"));
}

#[tokio::test]
async fn test_state_restore_and_archive() {
    let app = app();
    let id = create(&app, "doubleElimination").await;
    send(
        &app,
        "POST",
        &format!("/brackets/{id}/matches/2/result"),
        Some(json!({ "scoreA": 0, "scoreB": 2 })),
    )
    .await;

    let (status, stored) = send(&app, "GET", &format!("/brackets/{id}/state"), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, archived) = send(&app, "DELETE", &format!("/brackets/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(archived, stored);
    let (status, _) = send(&app, "GET", &format!("/brackets/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let other = uuid::Uuid::new_v4();
    let (status, _) = send(&app, "PUT", &format!("/brackets/{other}"), Some(stored.clone())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, snapshot) = send(&app, "PUT", &format!("/brackets/{id}"), Some(stored)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(snapshot["id"], id);
    assert_eq!(snapshot["type"], "doubleElimination");
}
