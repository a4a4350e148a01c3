mod common;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use common::default_center;
use serde_json::{json, Value};
use tower::util::ServiceExt;
use warmline::{create_router, AppState};

fn app() -> Router {
    let t = default_center();
    create_router(AppState::new(t.center))
}

fn post(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_answers_ok() {
    let response = app().oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn enqueue_reports_the_waiting_position() {
    let app = app();

    let response = app
        .oneshot(post(
            "/api/queue/enqueue",
            json!({"identity": "a@example.com", "category": "support"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "waiting");
    assert_eq!(body["position"], 1);
    assert!(body["assignment"].is_null());
}

#[tokio::test]
async fn position_of_an_unknown_customer_is_not_found() {
    let response = app()
        .oneshot(get("/api/queue/position/ghost@example.com"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body = body_json(response).await;
    assert!(body["error"]
        .as_str()
        .unwrap()
        .contains("queue position unavailable"));
}

#[tokio::test]
async fn an_available_agent_is_assigned_on_enqueue() {
    let app = app();

    let response = app
        .clone()
        .oneshot(post(
            "/api/agents/status",
            json!({"agent_id": "a1", "status": "available"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["record"]["status"], "available");
    assert!(body["assignment"].is_null());

    let response = app
        .oneshot(post(
            "/api/queue/enqueue",
            json!({"identity": "a@example.com", "category": "support"}),
        ))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["status"], "assigned");
    assert_eq!(body["assignment"]["agent_id"], "a1");
    assert!(body["assignment"]["room"]
        .as_str()
        .unwrap()
        .starts_with("support-"));
}

#[tokio::test]
async fn an_unknown_status_is_a_bad_request() {
    let response = app()
        .oneshot(post(
            "/api/agents/status",
            json!({"agent_id": "a1", "status": "lunching"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn transfer_initiate_and_ready_round_trip() {
    let app = app();

    let response = app
        .clone()
        .oneshot(post(
            "/api/transfer/initiate",
            json!({
                "from_agent_id": "a1",
                "room": "support-1",
                "customer_identity": "john.doe@example.com",
                "target_role": "compliance",
                "summary": "S"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["summary"], "S");
    assert_eq!(body["ready_to_join"], false);

    // Not visible to the target agent until marked ready
    let response = app
        .clone()
        .oneshot(get("/api/transfer/pending/b1"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .clone()
        .oneshot(post("/api/transfer/ready", json!({"target_agent_id": "b1"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.oneshot(get("/api/transfer/pending/b1")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["ready_to_join"], true);
}

#[tokio::test]
async fn transcription_stop_without_a_session_succeeds() {
    let response = app()
        .oneshot(post("/api/transcription/stop", json!({"room": "ghost"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "stopped");
}

#[tokio::test]
async fn invalid_base64_audio_is_a_bad_request() {
    let response = app()
        .oneshot(post(
            "/api/transcription/audio",
            json!({"room": "support-1", "pcm": "not base64!!"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn the_voice_webhook_renders_connect_markup() {
    let response = app()
        .oneshot(post("/api/telephony/voice?room=support-1", json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "application/xml"
    );

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let xml = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(xml.contains("<Room>support-1</Room>"));
}
