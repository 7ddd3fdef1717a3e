use super::*;
use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use serde_json::json;
use std::sync::Arc;
use tokio::{
    net::TcpListener,
    sync::{oneshot, Mutex},
};

#[derive(Clone)]
struct ServerState {
    tx: Arc<Mutex<Option<oneshot::Sender<AuditRequest>>>>,
}

async fn handle_audit(
    State(state): State<ServerState>,
    Json(payload): Json<AuditRequest>,
) -> Json<serde_json::Value> {
    if let Some(tx) = state.tx.lock().await.take() {
        let _ = tx.send(payload);
    }
    Json(json!([
        {
            "citation_text": "Ekman (1992)",
            "status": "REAL",
            "source": "OpenAlex",
            "confidence": 1.0,
            "message": "Paper exists. Content check: REAL",
            "metadata": {"found": true, "title": "An argument for basic emotions", "year": "1992", "oa_url": null}
        },
        {
            "citation_text": "Smith (2023)",
            "status": "SUSPICIOUS",
            "source": "Google Search",
            "confidence": 0.4,
            "message": "Only loosely matching sources found",
            "metadata": {"reason": "weak match", "info": null}
        }
    ]))
}

async fn serve(app: Router) -> String {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    format!("http://{addr}")
}

async fn spawn_audit_server() -> (String, oneshot::Receiver<AuditRequest>) {
    let (tx, rx) = oneshot::channel();
    let state = ServerState {
        tx: Arc::new(Mutex::new(Some(tx))),
    };
    let app = Router::new()
        .route("/api/audit", post(handle_audit))
        .with_state(state);
    (serve(app).await, rx)
}

#[tokio::test]
async fn posts_text_and_decodes_results_in_order() {
    let (base_url, request_rx) = spawn_audit_server().await;
    let service = HttpAuditService::new(format!("{base_url}/"));

    let results = service.audit("Ekman (1992) and Smith (2023)").await.expect("audit");

    let request = request_rx.await.expect("request");
    assert_eq!(request.text, "Ekman (1992) and Smith (2023)");
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].citation_text, "Ekman (1992)");
    assert_eq!(
        results[0].metadata.as_ref().and_then(|m| m.title.as_deref()),
        Some("An argument for basic emotions")
    );
    assert_eq!(results[1].status, shared::domain::VerdictStatus::Suspicious);
    assert_eq!(results[1].metadata, None);
}

#[tokio::test]
async fn non_success_status_carries_service_detail() {
    let app = Router::new().route(
        "/api/audit",
        post(|| async {
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({"detail": "LLM quota exhausted"})),
            )
        }),
    );
    let service = HttpAuditService::new(serve(app).await);

    let err = service.audit("Smith (2023)").await.expect_err("must fail");
    match err {
        TransportError::Status { status, detail } => {
            assert_eq!(status, 503);
            assert_eq!(detail, "LLM quota exhausted");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn plain_text_error_body_is_truncated() {
    let long_body = "x".repeat(500);
    let app = Router::new().route(
        "/api/audit",
        post(move || {
            let body = long_body.clone();
            async move { (StatusCode::INTERNAL_SERVER_ERROR, body) }
        }),
    );
    let service = HttpAuditService::new(serve(app).await);

    let err = service.audit("Smith (2023)").await.expect_err("must fail");
    let TransportError::Status { detail, .. } = err else {
        panic!("expected status error");
    };
    assert_eq!(detail.chars().count(), ERROR_DETAIL_MAX_CHARS + 3);
    assert!(detail.ends_with("..."));
}

#[tokio::test]
async fn non_array_payload_is_a_decode_error() {
    let app = Router::new().route(
        "/api/audit",
        post(|| async { Json(json!({"results": []})) }),
    );
    let service = HttpAuditService::new(serve(app).await);

    let err = service.audit("Smith (2023)").await.expect_err("must fail");
    assert!(matches!(err, TransportError::Decode(_)), "got {err:?}");
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn unreachable_service_is_a_network_error() {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);

    let service = HttpAuditService::new(format!("http://{addr}"));
    let err = service.audit("Smith (2023)").await.expect_err("must fail");
    assert!(matches!(err, TransportError::Network(_)), "got {err:?}");
    assert!(err.is_retryable());
}

#[test]
fn endpoint_joins_audit_path_once() {
    let service = HttpAuditService::new("http://127.0.0.1:8000/");
    assert_eq!(service.endpoint(), "http://127.0.0.1:8000/api/audit");
}

#[test]
fn no_retry_policy_never_waits() {
    let err = TransportError::Network("refused".to_string());
    assert_eq!(RetryPolicy::None.delay_after(1, &err), None);
    assert_eq!(
        RetryPolicy::from_max_attempts(1, Duration::from_millis(10)),
        RetryPolicy::None
    );
}

#[test]
fn backoff_doubles_until_attempts_run_out() {
    let policy = RetryPolicy::Backoff {
        max_attempts: 3,
        initial_delay: Duration::from_millis(100),
    };
    let err = TransportError::Timeout(Duration::from_secs(30));
    assert_eq!(policy.delay_after(1, &err), Some(Duration::from_millis(100)));
    assert_eq!(policy.delay_after(2, &err), Some(Duration::from_millis(200)));
    assert_eq!(policy.delay_after(3, &err), None);
}

#[test]
fn backoff_skips_non_retryable_errors() {
    let policy = RetryPolicy::from_max_attempts(5, Duration::from_millis(100));
    let client_error = TransportError::Status {
        status: 422,
        detail: "field required".to_string(),
    };
    assert_eq!(policy.delay_after(1, &client_error), None);
    assert_eq!(
        policy.delay_after(1, &TransportError::Decode("bad".to_string())),
        None
    );
}
