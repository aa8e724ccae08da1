use super::mock::MockCheckInApi;
use super::{CheckInApi, CheckInClient, CheckInResult, EventDetail, GENERIC_FAILURE_MESSAGE};
use crate::config::CheckInConfig;
use crate::scan::ScanToken;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Clone)]
struct StubState {
    event_hits: Arc<AtomicUsize>,
}

async fn stub_checkin(Json(body): Json<serde_json::Value>) -> (StatusCode, Json<serde_json::Value>) {
    let token = body["token"].as_str().unwrap_or_default();
    match token {
        "ABC123" => (
            StatusCode::OK,
            Json(serde_json::json!({
                "guest": {"id": 7, "name": "Asha", "category": "VIP", "plus_ones": 1, "checked_in": true, "event_id": 42},
                "already_checked_in": false
            })),
        ),
        "DUP999" => (
            StatusCode::OK,
            Json(serde_json::json!({
                "guest": {"id": 8, "name": "Ben", "plus_ones": 0, "checked_in": true},
                "already_checked_in": true
            })),
        ),
        "GARBLED" => (StatusCode::OK, Json(serde_json::json!({"unexpected": true}))),
        "NOBODY" => (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({"error": "bad token"})),
        ),
        _ => (StatusCode::INTERNAL_SERVER_ERROR, Json(serde_json::json!({}))),
    }
}

async fn stub_event(
    State(state): State<StubState>,
    Path(id): Path<i64>,
) -> (StatusCode, Json<serde_json::Value>) {
    state.event_hits.fetch_add(1, Ordering::SeqCst);
    if id == 42 {
        (
            StatusCode::OK,
            Json(serde_json::json!({"id": 42, "name": "Summer Gala", "wristband_color": "gold"})),
        )
    } else {
        (StatusCode::NOT_FOUND, Json(serde_json::json!({"error": "no such event"})))
    }
}

async fn spawn_stub_server() -> (String, Arc<AtomicUsize>) {
    let event_hits = Arc::new(AtomicUsize::new(0));
    let state = StubState {
        event_hits: Arc::clone(&event_hits),
    };
    let app = Router::new()
        .route("/checkin/token", post(stub_checkin))
        .route("/events/:id", get(stub_event))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind stub server");
    let addr = listener.local_addr().expect("stub addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("stub server");
    });

    (format!("http://{}", addr), event_hits)
}

fn client(base_url: &str) -> CheckInClient {
    CheckInClient::new(&CheckInConfig {
        base_url: base_url.to_string(),
        timeout_ms: 2000,
    })
    .expect("client builds")
}

#[tokio::test]
async fn fresh_check_in_maps_to_success() {
    let (base, _) = spawn_stub_server().await;
    let client = client(&base);

    match client.check_in(&ScanToken::normalize("abc123")).await {
        CheckInResult::Success { guest, event } => {
            assert_eq!(guest.name, "Asha");
            assert_eq!(guest.plus_ones, 1);
            assert_eq!(guest.event_id, Some(42));
            assert!(event.is_none());
        }
        other => panic!("expected success, got {:?}", other),
    }
}

#[tokio::test]
async fn repeat_check_in_maps_to_already_checked_in() {
    let (base, _) = spawn_stub_server().await;
    let client = client(&base);

    match client.check_in(&ScanToken::normalize("DUP999")).await {
        CheckInResult::AlreadyCheckedIn { guest } => assert_eq!(guest.name, "Ben"),
        other => panic!("expected already-checked-in, got {:?}", other),
    }
}

#[tokio::test]
async fn server_error_message_is_surfaced_verbatim() {
    let (base, _) = spawn_stub_server().await;
    let client = client(&base);

    match client.check_in(&ScanToken::normalize("NOBODY")).await {
        CheckInResult::Failure { message } => assert_eq!(message, "bad token"),
        other => panic!("expected failure, got {:?}", other),
    }
}

#[tokio::test]
async fn missing_error_body_falls_back_to_generic_message() {
    let (base, _) = spawn_stub_server().await;
    let client = client(&base);

    match client.check_in(&ScanToken::normalize("WHO")).await {
        CheckInResult::Failure { message } => assert_eq!(message, GENERIC_FAILURE_MESSAGE),
        other => panic!("expected failure, got {:?}", other),
    }
}

#[tokio::test]
async fn malformed_success_body_is_a_generic_failure() {
    let (base, _) = spawn_stub_server().await;
    let client = client(&base);

    match client.check_in(&ScanToken::normalize("GARBLED")).await {
        CheckInResult::Failure { message } => assert_eq!(message, GENERIC_FAILURE_MESSAGE),
        other => panic!("expected failure, got {:?}", other),
    }
}

#[tokio::test]
async fn unreachable_server_is_a_generic_failure() {
    // nothing listens on this port
    let client = client("http://127.0.0.1:9");

    match client.check_in(&ScanToken::normalize("ABC123")).await {
        CheckInResult::Failure { message } => assert_eq!(message, GENERIC_FAILURE_MESSAGE),
        other => panic!("expected failure, got {:?}", other),
    }
}

#[tokio::test]
async fn event_detail_is_fetched_then_cached() {
    let (base, event_hits) = spawn_stub_server().await;
    let client = client(&base);

    let detail = client.event_detail(42).await.expect("event found");
    assert_eq!(detail.name, "Summer Gala");
    assert_eq!(detail.wristband_color.as_deref(), Some("gold"));

    let again = client.event_detail(42).await.expect("cached event");
    assert_eq!(again, detail);
    assert_eq!(event_hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn unknown_event_degrades_to_none() {
    let (base, _) = spawn_stub_server().await;
    let client = client(&base);
    assert!(client.event_detail(999).await.is_none());
}

#[tokio::test]
async fn mock_api_consumes_script_in_order() {
    let mock = MockCheckInApi::new();
    mock.push_outcome(MockCheckInApi::success("Asha", 1, None));
    mock.set_event(EventDetail {
        id: 5,
        name: "Launch Party".to_string(),
        wristband_color: None,
    });

    let first = mock.check_in(&ScanToken::normalize("t1")).await;
    assert!(first.is_success());
    let second = mock.check_in(&ScanToken::normalize("t2")).await;
    assert!(matches!(second, CheckInResult::Failure { .. }));

    assert_eq!(mock.call_count(), 2);
    assert_eq!(mock.event_detail(5).await.unwrap().name, "Launch Party");
    assert!(mock.event_detail(6).await.is_none());
}
