//! WebSocket end-to-end tests
//!
//! Runs the full router on a real listener and talks to `/ws` with
//! `tokio-tungstenite`.

mod common;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tower::ServiceExt;

use common::*;
use taskcollab::backend::realtime::AUTH_FAILURE_CLOSE_CODE;
use taskcollab::backend::routes::create_router;

#[tokio::test]
async fn handshake_replies_auth_success() {
    let (addr, _state) = spawn_server().await;
    let mut ws = connect_ws(addr, Some(&jwt_for(ALICE))).await;

    let reply = next_json(&mut ws).await;
    assert_eq!(reply["type"], "auth_success");
    assert_eq!(reply["data"]["user_id"], ALICE);
    assert!(reply["data"]["connection_id"].is_string());
    assert!(reply["timestamp"].is_string());
}

#[tokio::test]
async fn scenario_invalid_token_closes_with_auth_code() {
    let (addr, state) = spawn_server().await;
    let mut ws = connect_ws(addr, Some("not-a-jwt")).await;

    let reply = next_json(&mut ws).await;
    assert_eq!(reply["type"], "auth_error");
    match next_frame(&mut ws).await {
        Received::Close(code) => assert_eq!(code, Some(AUTH_FAILURE_CLOSE_CODE)),
        other => panic!("expected close, got {:?}", other),
    }

    assert!(eventually(|| state.hub.stats().connections == 0).await);
    assert_eq!(state.hub.stats().users, 0);
}

#[tokio::test]
async fn missing_token_is_rejected() {
    let (addr, state) = spawn_server().await;
    let mut ws = connect_ws(addr, None).await;

    assert_eq!(next_json(&mut ws).await["type"], "auth_error");
    assert!(matches!(
        next_frame(&mut ws).await,
        Received::Close(Some(AUTH_FAILURE_CLOSE_CODE))
    ));
    assert!(eventually(|| state.hub.stats().connections == 0).await);
}

#[tokio::test]
async fn scenario_bad_json_keeps_connection_usable() {
    let (addr, _state) = spawn_server().await;
    let mut ws = connect_ws(addr, Some(&jwt_for(ALICE))).await;
    expect_type(&mut ws, "auth_success").await;

    send_text(&mut ws, "not-json").await;
    let reply = next_json(&mut ws).await;
    assert_eq!(reply["type"], "error");
    assert_eq!(reply["data"], json!({"error": "Invalid JSON message format"}));

    send_json(&mut ws, json!({"type": "heartbeat"})).await;
    assert_eq!(next_json(&mut ws).await["type"], "heartbeat");
}

#[tokio::test]
async fn unknown_type_and_bad_payload_are_reported() {
    let (addr, _state) = spawn_server().await;
    let mut ws = connect_ws(addr, Some(&jwt_for(ALICE))).await;
    expect_type(&mut ws, "auth_success").await;

    send_json(&mut ws, json!({"type": "launch_rockets", "data": {}})).await;
    let reply = next_json(&mut ws).await;
    assert_eq!(reply["data"]["error"], "Unknown message type: launch_rockets");

    send_json(&mut ws, json!({"type": "subscribe_project", "data": {"project_id": "ten"}})).await;
    let reply = next_json(&mut ws).await;
    assert_eq!(reply["type"], "error");

    send_json(&mut ws, json!({"type": "subscribe_project", "data": {"project_id": 404}})).await;
    let reply = next_json(&mut ws).await;
    assert_eq!(reply["data"]["error"], "Project 404 not found or access denied");
}

#[tokio::test]
async fn subscribe_join_and_leave_over_the_wire() {
    let (addr, state) = spawn_server().await;

    let mut bob = connect_ws(addr, Some(&jwt_for(BOB))).await;
    expect_type(&mut bob, "auth_success").await;
    send_json(&mut bob, json!({"type": "subscribe_project", "data": {"project_id": PROJECT}})).await;
    let ack = next_json(&mut bob).await;
    assert_eq!(ack["type"], "subscribed");
    assert_eq!(ack["data"], json!({"subject": "project", "subject_id": PROJECT}));

    let mut alice = connect_ws(addr, Some(&jwt_for(ALICE))).await;
    expect_type(&mut alice, "auth_success").await;
    send_json(&mut alice, json!({"type": "subscribe_project", "data": {"project_id": PROJECT}})).await;
    expect_type(&mut alice, "subscribed").await;

    let joined = next_json(&mut bob).await;
    assert_eq!(joined["type"], "user_joined");
    assert_eq!(joined["data"], json!({"user_id": ALICE, "project_id": PROJECT}));

    send_json(&mut bob, json!({"type": "get_presence", "data": {"project_id": PROJECT}})).await;
    let presence = next_json(&mut bob).await;
    assert_eq!(presence["type"], "presence");
    let users: Vec<i64> = presence["data"]["users"]
        .as_array()
        .expect("users array")
        .iter()
        .filter_map(|u| u["user_id"].as_i64())
        .collect();
    assert_eq!(users, vec![ALICE, BOB]);

    alice.close(None).await.expect("close alice");
    let left = expect_type(&mut bob, "user_left").await;
    assert_eq!(left["data"], json!({"user_id": ALICE, "project_id": PROJECT}));
    assert!(eventually(|| state.hub.stats().connections == 1).await);
}

#[tokio::test]
async fn typing_indicators_over_the_wire() {
    let (addr, _state) = spawn_server().await;

    let mut bob = connect_ws(addr, Some(&jwt_for(BOB))).await;
    expect_type(&mut bob, "auth_success").await;
    send_json(&mut bob, json!({"type": "subscribe_task", "data": {"task_id": TASK}})).await;
    expect_type(&mut bob, "subscribed").await;

    let mut alice = connect_ws(addr, Some(&jwt_for(ALICE))).await;
    expect_type(&mut alice, "auth_success").await;
    send_json(&mut alice, json!({"type": "typing_start", "data": {"task_id": TASK}})).await;

    let typing = next_json(&mut bob).await;
    assert_eq!(typing["type"], "user_typing");
    assert_eq!(typing["data"], json!({"user_id": ALICE, "task_id": TASK}));

    // Dropping the socket mid-typing clears the indicator
    drop(alice);
    let stopped = expect_type(&mut bob, "user_stopped_typing").await;
    assert_eq!(stopped["data"], json!({"user_id": ALICE, "task_id": TASK}));
}

#[tokio::test]
async fn posted_events_reach_subscribers() {
    let (addr, state) = spawn_server().await;
    let mut bob = connect_ws(addr, Some(&jwt_for(BOB))).await;
    expect_type(&mut bob, "auth_success").await;
    send_json(&mut bob, json!({"type": "subscribe_project", "data": {"project_id": PROJECT}})).await;
    expect_type(&mut bob, "subscribed").await;

    let body = json!({
        "event": "task_deleted",
        "actor_id": ALICE,
        "project_id": PROJECT,
        "task_id": TASK,
    });
    let response = create_router(state.clone())
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/events")
                .header(header::AUTHORIZATION, format!("Bearer {}", jwt_for(ALICE)))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    let deleted = expect_type(&mut bob, "task_deleted").await;
    assert_eq!(
        deleted["data"],
        json!({"task_id": TASK, "project_id": PROJECT, "deleted_by": ALICE})
    );
}

#[tokio::test]
async fn api_requires_bearer_token() {
    let app = create_router(test_state());
    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/realtime/stats")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn health_and_stats_endpoints() {
    let state = test_state();

    let health = create_router(state.clone())
        .oneshot(Request::builder().uri("/health").body(Body::empty()).expect("request"))
        .await
        .expect("response");
    assert_eq!(health.status(), StatusCode::OK);
    let body: Value = serde_json::from_slice(&to_bytes(health.into_body(), usize::MAX).await.expect("body"))
        .expect("json");
    assert_eq!(body["status"], "ok");
    assert_eq!(body["connections"], 0);

    let stats = create_router(state)
        .oneshot(
            Request::builder()
                .uri("/api/realtime/stats")
                .header(header::AUTHORIZATION, format!("Bearer {}", jwt_for(BOB)))
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(stats.status(), StatusCode::OK);
    let body: Value = serde_json::from_slice(&to_bytes(stats.into_body(), usize::MAX).await.expect("body"))
        .expect("json");
    assert_eq!(body["typing_indicators"], 0);
}

#[tokio::test]
async fn presence_endpoint_rejects_unknown_project() {
    let response = create_router(test_state())
        .oneshot(
            Request::builder()
                .uri("/api/projects/999/presence")
                .header(header::AUTHORIZATION, format!("Bearer {}", jwt_for(BOB)))
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
