use axum::{
    body::{Body, to_bytes},
    extract::State,
    http::{Request, StatusCode},
};
use field_booking::routes::{health::health_check, payment_router};
use tower::ServiceExt;

mod common;

#[tokio::test]
async fn health_check_pings_the_database() {
    let (code, response) = health_check(State(common::database().await)).await;
    assert_eq!(code, StatusCode::OK);
    assert_eq!(response.0.message, "Health check");

    let data = response.0.data.expect("health data");
    assert_eq!(data.status, "ok");
    assert_eq!(data.database, "up");
}

#[tokio::test]
async fn health_route_is_mounted_on_the_payment_service() {
    let harness = common::payment_harness().await;
    let app = payment_router().with_state(harness.state);

    let response = app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn unknown_path_is_answered_with_the_envelope() {
    let harness = common::payment_harness().await;
    let app = payment_router().with_state(harness.state);

    let response = app
        .oneshot(Request::get("/api/v1/nothing").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["message"], "Not Found");
    assert_eq!(json["data"]["path"], "/api/v1/nothing");
}
