//! Router tests for paths that settle before touching the database:
//! signature rejection, provider validation, extractor rejections.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use tower::ServiceExt;

use reelforge_api::config::ServerConfig;
use reelforge_api::router;
use reelforge_api::state::AppState;

/// State with a lazy pool: handlers that reach the database would fail,
/// which is exactly what these tests prove never happens.
fn test_state() -> AppState {
    let pool = sqlx::postgres::PgPoolOptions::new()
        .connect_lazy("postgres://localhost:1/unreachable")
        .unwrap();
    AppState {
        pool,
        config: ServerConfig {
            host: "127.0.0.1".into(),
            port: 0,
            cors_origins: vec![],
            request_timeout_secs: 30,
            webhook_secret: "test-secret".into(),
        },
    }
}

#[tokio::test]
async fn webhook_without_signature_is_unauthorized() {
    let app = router::build(test_state());

    let response = app
        .oneshot(
            Request::post("/api/v1/hooks/render/nova")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"job_handle":"h1","status":"completed"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["error"]["code"], "INVALID_SIGNATURE");
}

#[tokio::test]
async fn webhook_with_bad_signature_is_unauthorized() {
    let app = router::build(test_state());

    let response = app
        .oneshot(
            Request::post("/api/v1/hooks/render/nova")
                .header("X-Render-Signature", "deadbeef")
                .body(Body::from(r#"{"job_handle":"h1","status":"completed"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn unknown_route_is_not_found() {
    let app = router::build(test_state());

    let response = app
        .oneshot(Request::get("/api/v1/nope").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn malformed_generation_body_is_a_client_error() {
    let app = router::build(test_state());

    let response = app
        .oneshot(
            Request::post("/api/v1/generations")
                .header("content-type", "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert!(response.status().is_client_error());
}
