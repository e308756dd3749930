use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use http_body_util::BodyExt;
use relay_backend::{
    AppState,
    cache::store::{KvStore, MemoryStore},
    clock::ManualClock,
    config::Config,
    error::RelayError,
    integrations::{Deliverer, Transformer},
    router::create_router,
    utils::error_codes,
};
use serde_json::{Value, json};
use tower::ServiceExt;

struct ShoutingTransformer;

#[async_trait]
impl Transformer for ShoutingTransformer {
    async fn transform(&self, text: &str) -> Result<String, RelayError> {
        Ok(text.to_uppercase())
    }
}

#[derive(Default)]
struct Outbox {
    sent: Mutex<Vec<String>>,
}

#[async_trait]
impl Deliverer for Outbox {
    async fn deliver(&self, text: &str) -> Result<(), RelayError> {
        self.sent.lock().unwrap().push(text.to_string());
        Ok(())
    }
}

struct TestApp {
    router: Router,
    clock: ManualClock,
    store: Arc<MemoryStore>,
    outbox: Arc<Outbox>,
}

fn test_config() -> Config {
    Config {
        rate_limit_requests: 3,
        rate_limit_window_secs: 60,
        delivery_delay_secs: Some(120),
        cron_secret: Some("s3cret".to_string()),
        ..Config::default()
    }
}

fn app(config: Config) -> TestApp {
    let clock = ManualClock::default();
    let store = Arc::new(MemoryStore::with_clock(Arc::new(clock.clone())));
    let outbox = Arc::new(Outbox::default());
    let state = AppState::new(
        config,
        store.clone(),
        Arc::new(clock.clone()),
        Arc::new(ShoutingTransformer),
        outbox.clone(),
    );
    TestApp {
        router: create_router(state),
        clock,
        store,
        outbox,
    }
}

fn submit(message: &str, session: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/messages/submit")
        .header(header::CONTENT_TYPE, "application/json")
        .header("x-real-ip", "198.51.100.4")
        .header("x-session-token", session)
        .body(Body::from(json!({ "message": message }).to_string()))
        .unwrap()
}

fn status(session: &str) -> Request<Body> {
    Request::builder()
        .uri("/api/quota/status")
        .header("x-real-ip", "198.51.100.4")
        .header("x-session-token", session)
        .body(Body::empty())
        .unwrap()
}

fn sweep(token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("POST").uri("/api/cron/sweep");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_submit_queues_and_sweep_delivers_after_delay() {
    let app = app(test_config());

    let response = app
        .router
        .clone()
        .oneshot(submit("meet me at noon", "s1"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(response.headers()["x-ratelimit-remaining"], "2");
    let body = json_body(response).await;
    assert_eq!(body["code"], error_codes::SUCCESS);
    assert_eq!(body["resp_data"]["queued"], true);
    assert_eq!(body["resp_data"]["remaining"], 2);
    assert!(body["resp_data"].get("id").is_none());

    assert_eq!(app.store.list("queue:").await.unwrap().len(), 1);

    let response = app.router.clone().oneshot(sweep(Some("s3cret"))).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["resp_data"]["delivered"], 0);
    assert_eq!(body["resp_data"]["not_due"], 1);

    app.clock.advance(Duration::from_secs(120));
    let response = app.router.clone().oneshot(sweep(Some("s3cret"))).await.unwrap();
    let body = json_body(response).await;
    assert_eq!(body["resp_data"]["delivered"], 1);

    assert_eq!(
        app.outbox.sent.lock().unwrap().clone(),
        vec!["MEET ME AT NOON".to_string()]
    );
    assert!(app.store.list("queue:").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_submit_rejected_when_quota_exhausted() {
    let app = app(test_config());

    for _ in 0..3 {
        let response = app.router.clone().oneshot(submit("hi", "s1")).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let response = app.router.clone().oneshot(submit("hi", "s1")).await.unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(response.headers()["x-ratelimit-remaining"], "0");
    assert_eq!(response.headers()[header::RETRY_AFTER], "60");
    let body = json_body(response).await;
    assert_eq!(body["code"], error_codes::RATE_LIMIT);

    // 被拒绝的请求不会入队
    assert_eq!(app.store.list("queue:").await.unwrap().len(), 3);

    // 另一个会话不受影响
    let response = app.router.clone().oneshot(submit("hi", "s2")).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    // 窗口过期后恢复
    app.clock.advance(Duration::from_secs(60));
    let response = app.router.clone().oneshot(submit("hi", "s1")).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(response.headers()["x-ratelimit-remaining"], "2");
}

#[tokio::test]
async fn test_status_does_not_consume_quota() {
    let app = app(test_config());

    for _ in 0..3 {
        let response = app.router.clone().oneshot(status("s1")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["resp_data"]["remaining"], 3);
        assert_eq!(body["resp_data"]["limit"], 3);
    }

    app.router.clone().oneshot(submit("hi", "s1")).await.unwrap();
    let response = app.router.clone().oneshot(status("s1")).await.unwrap();
    assert_eq!(response.headers()["x-ratelimit-remaining"], "2");
}

#[tokio::test]
async fn test_empty_message_rejected() {
    let app = app(test_config());

    let response = app.router.clone().oneshot(submit("   ", "s1")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["code"], error_codes::VALIDATION_ERROR);
    assert!(app.store.list("queue:").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_sweep_requires_cron_secret() {
    let app = app(test_config());

    let response = app.router.clone().oneshot(sweep(None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app.router.clone().oneshot(sweep(Some("guess"))).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app.router.clone().oneshot(sweep(Some("s3cret"))).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_sweep_open_without_secret() {
    let app = app(Config {
        cron_secret: None,
        ..test_config()
    });

    let response = app.router.clone().oneshot(sweep(None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["resp_data"]["scanned"], 0);
}

#[tokio::test]
async fn test_immediate_mode_delivered_by_inline_attempt() {
    let app = app(Config {
        deliver_immediately: true,
        ..test_config()
    });

    let response = app.router.clone().oneshot(submit("now", "s1")).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    // 即时尝试在后台任务中执行
    for _ in 0..50 {
        if !app.outbox.sent.lock().unwrap().is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(app.outbox.sent.lock().unwrap().clone(), vec!["NOW".to_string()]);

    let response = app.router.clone().oneshot(sweep(Some("s3cret"))).await.unwrap();
    let body = json_body(response).await;
    assert_eq!(body["resp_data"]["delivered"], 0);
}
