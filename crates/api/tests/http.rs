//! Integration tests for the API routes.
//!
//! Uses `tower::ServiceExt` to drive the Axum router without a real HTTP
//! server, over the in-memory store and queue.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use tower::ServiceExt;

use pushgate_api::routes::create_router;
use pushgate_api::state::AppState;
use pushgate_common::config::AppConfig;
use pushgate_common::identity::generate_name;
use pushgate_common::signing::sign_params;
use pushgate_dispatch::Dispatcher;
use pushgate_queue::MemoryQueue;
use pushgate_store::{MemoryStore, Storer};

// ============================================================
// Helpers
// ============================================================

fn test_config(app_key: Option<&str>, app_secret: Option<&str>) -> AppConfig {
    AppConfig {
        redis_url: "redis://unused".to_string(),
        http_addr: "0.0.0.0:0".to_string(),
        app_key: app_key.map(|k| k.to_string()),
        app_secret: app_secret.map(|s| s.to_string()),
        queue_prefix: "pusher:".to_string(),
        worker_count: 1,
        max_retry: 3,
        mail_api_url: None,
        mail_api_key: None,
        mail_from: None,
        mail_from_name: None,
        sms_api_url: None,
        sms_app_key: None,
        sms_app_secret: None,
        hooks_file: None,
    }
}

struct TestApp {
    store: Arc<MemoryStore>,
    queue: Arc<MemoryQueue>,
    state: AppState,
}

impl TestApp {
    fn new() -> Self {
        Self::with_auth(None, None)
    }

    fn with_auth(app_key: Option<&str>, app_secret: Option<&str>) -> Self {
        let store = Arc::new(MemoryStore::new());
        let queue = Arc::new(MemoryQueue::new());
        let dispatcher = Arc::new(Dispatcher::new(store.clone(), queue.clone(), "pusher:"));
        let state = AppState::new(store.clone(), dispatcher, test_config(app_key, app_secret));
        Self {
            store,
            queue,
            state,
        }
    }

    fn router(&self) -> Router {
        create_router(self.state.clone())
    }

    async fn request(&self, req: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = self.router().oneshot(req).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }
}

fn form_post(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

// ============================================================
// Routes
// ============================================================

#[tokio::test]
async fn health_endpoint() {
    let app = TestApp::new();
    let (status, json) = app.request(get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert_eq!(json["service"], "pushgate-api");
}

#[tokio::test]
async fn recipient_crud_flow() {
    let app = TestApp::new();

    let (status, json) = app
        .request(form_post(
            "/pusher/pushers/",
            "pusher=lupino&email=l%40example.com&nickname=Lupino&phoneNumber=12345678901&createdAt=1456403493",
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["result"], "OK");

    let (status, json) = app.request(get("/pusher/pushers/lupino/")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["pusher"]["id"], "lupino");
    assert_eq!(json["pusher"]["email"], "l@example.com");
    assert_eq!(json["pusher"]["createdAt"], 1456403493);

    let (status, _) = app
        .request(form_post("/pusher/pushers/lupino/", "nickname=Wolf"))
        .await;
    assert_eq!(status, StatusCode::OK);
    let (_, json) = app.request(get("/pusher/pushers/lupino/")).await;
    assert_eq!(json["pusher"]["nickname"], "Wolf");
    // untouched fields survive partial updates
    assert_eq!(json["pusher"]["email"], "l@example.com");

    let delete = Request::builder()
        .method("DELETE")
        .uri("/pusher/pushers/lupino/")
        .body(Body::empty())
        .unwrap();
    let (status, _) = app.request(delete).await;
    assert_eq!(status, StatusCode::OK);

    let (status, json) = app.request(get("/pusher/pushers/lupino/")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["err"], "pusher lupino not exists.");
}

#[tokio::test]
async fn create_without_id_is_rejected() {
    let app = TestApp::new();
    let (status, json) = app
        .request(form_post("/pusher/pushers/", "email=x%40example.com"))
        .await;
    assert_eq!(status, StatusCode::NOT_ACCEPTABLE);
    assert_eq!(json["err"], "pusher is required.");
}

#[tokio::test]
async fn subscription_management_updates_membership() {
    let app = TestApp::new();
    app.request(form_post("/pusher/pushers/", "pusher=lupino"))
        .await;

    let (status, _) = app
        .request(form_post("/pusher/sendmail/add", "pusher=lupino"))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, json) = app.request(get("/pusher/pushers/lupino/")).await;
    assert_eq!(json["pusher"]["senders"], serde_json::json!(["sendmail"]));

    // by-sender listing sees it
    let (_, json) = app.request(get("/pusher/sendmail/pushers/")).await;
    assert_eq!(json["total"], 1);
    assert_eq!(json["sender"], "sendmail");

    let (status, _) = app
        .request(form_post("/pusher/sendmail/delete", "pusher=lupino"))
        .await;
    assert_eq!(status, StatusCode::OK);
    let (_, json) = app.request(get("/pusher/pushers/lupino/")).await;
    assert_eq!(json["pusher"]["senders"], serde_json::json!([]));
}

#[tokio::test]
async fn tagging_narrows_search() {
    let app = TestApp::new();
    app.request(form_post("/pusher/pushers/", "pusher=lupino"))
        .await;
    app.request(form_post("/pusher/sendmail/add", "pusher=lupino"))
        .await;
    app.request(form_post("/pusher/sendmail/tag", "pusher=lupino&tag=vip"))
        .await;

    let (status, json) = app
        .request(get("/pusher/search/?q=senders%3Asendmail%20tags%3Avip"))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["total"], 1);
    assert_eq!(json["pushers"][0]["id"], "lupino");

    app.request(form_post("/pusher/sendmail/untag", "pusher=lupino&tag=vip"))
        .await;
    let (_, json) = app
        .request(get("/pusher/search/?q=senders%3Asendmail%20tags%3Avip"))
        .await;
    assert_eq!(json["total"], 0);
}

#[tokio::test]
async fn push_respects_the_membership_gate() {
    let app = TestApp::new();
    app.request(form_post("/pusher/pushers/", "pusher=lupino"))
        .await;

    // not subscribed, no force: rejected, nothing submitted
    let (status, json) = app
        .request(form_post(
            "/pusher/sendmail/push",
            "pusher=lupino&data=%7B%22subject%22%3A%22s%22%7D",
        ))
        .await;
    assert_eq!(status, StatusCode::NOT_ACCEPTABLE);
    assert_eq!(json["err"], "pusher lupino not has sender sendmail.");
    assert!(app.queue.submissions().is_empty());

    // forced: job lands on the sender queue under the derived name
    let (status, json) = app
        .request(form_post(
            "/pusher/sendmail/push",
            "pusher=lupino&data=%7B%22subject%22%3A%22s%22%7D&force=true",
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    let expected = generate_name("lupino", "{\"subject\":\"s\"}");
    assert_eq!(json["name"], expected);

    let subs = app.queue.submissions();
    assert_eq!(subs.len(), 1);
    assert_eq!(subs[0].queue_name, "pusher:sendmail");
    assert_eq!(subs[0].name, expected);
}

#[tokio::test]
async fn push_all_submits_a_control_job() {
    let app = TestApp::new();
    let (status, json) = app
        .request(form_post("/pusher/sendmail/pushall", "data=hello&tag=vip"))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["result"], "OK");

    let subs = app.queue.submissions();
    assert_eq!(subs.len(), 1);
    assert_eq!(subs[0].queue_name, "pusher:pushall");
    assert_eq!(json["name"], subs[0].name);
}

#[tokio::test]
async fn cancel_push_requests_removal() {
    let app = TestApp::new();
    let (status, json) = app
        .request(form_post("/pusher/sendmail/cancelpush", "name=somejob"))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["result"], "OK");
    assert_eq!(
        app.queue.removals(),
        vec![("pusher:sendmail".to_string(), "somejob".to_string())]
    );
}

#[tokio::test]
async fn listing_pages_by_recency_and_caps_size() {
    let app = TestApp::new();
    for i in 1..=5 {
        let mut r = pushgate_common::types::Recipient::new(format!("id{}", i));
        r.created_at = i;
        app.store.set(&r).await.unwrap();
    }

    let (status, json) = app.request(get("/pusher/pushers/?from=1&size=2")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["total"], 5);
    assert_eq!(json["pushers"][0]["id"], "id4");
    assert_eq!(json["pushers"][1]["id"], "id3");

    let (_, json) = app.request(get("/pusher/pushers/?size=500")).await;
    assert_eq!(json["size"], 100);
}

#[tokio::test]
async fn search_requires_a_query() {
    let app = TestApp::new();
    let (status, json) = app.request(get("/pusher/search/")).await;
    assert_eq!(status, StatusCode::NOT_ACCEPTABLE);
    assert_eq!(json["err"], "q is required.");
}

// ============================================================
// Signed-request authentication end to end
// ============================================================

#[tokio::test]
async fn unsigned_requests_are_rejected_when_auth_is_enabled() {
    let app = TestApp::with_auth(Some("k"), Some("s"));
    let (status, json) = app.request(get("/pusher/pushers/")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["err"], "Invalid X-App-Key");

    // health stays open for probes
    let (status, _) = app.request(get("/health")).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn signed_form_post_passes_authentication() {
    let app = TestApp::with_auth(Some("k"), Some("s"));
    let timestamp = chrono::Utc::now().timestamp().to_string();

    let mut params = BTreeMap::new();
    params.insert("app_key".to_string(), "k".to_string());
    params.insert("timestamp".to_string(), timestamp.clone());
    params.insert("path".to_string(), "/pusher/pushers/".to_string());
    params.insert("pusher".to_string(), "lupino".to_string());
    let sign = sign_params("s", &params);

    let req = Request::builder()
        .method("POST")
        .uri("/pusher/pushers/")
        .header("content-type", "application/x-www-form-urlencoded")
        .header("X-App-Key", "k")
        .header("X-Request-Time", &timestamp)
        .header("X-Request-Signature", sign)
        .body(Body::from("pusher=lupino"))
        .unwrap();
    let (status, json) = app.request(req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["result"], "OK");

    // the recipient really was created downstream of the middleware
    assert!(app.store.get("lupino").await.unwrap().is_some());
}
