//! Hook receiver tests over real HTTP.

use hivconnect::change_log::{
    ChangeEvent, ChangeKind, ChangeLogger, ChangeSink, ManualClock, RecordingSink,
};
use hivconnect::hooks::ChangeHooks;
use hivconnect::server;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

struct Harness {
    base: String,
    sink: Arc<RecordingSink>,
    clock: Arc<ManualClock>,
    http: reqwest::Client,
}

async fn start() -> Harness {
    let clock = Arc::new(ManualClock::new(1_700_000_000_000));
    let sink = Arc::new(RecordingSink::new());
    let logger = ChangeLogger::with_parts(5000, 100, clock.clone(), sink.clone());
    let hooks = ChangeHooks::new(Arc::new(logger));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        server::serve(listener, hooks).await.unwrap();
    });

    let harness = Harness {
        base: format!("http://127.0.0.1:{}", port),
        sink,
        clock,
        http: reqwest::Client::new(),
    };
    wait_for_server(&harness).await;
    harness
}

async fn wait_for_server(h: &Harness) {
    let url = format!("{}/health", h.base);
    for _ in 0..50 {
        if let Ok(resp) = h.http.get(&url).send().await {
            if resp.status().is_success() {
                return;
            }
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    panic!("Server did not become ready within 5 seconds");
}

/// Emission is detached; give the spawned task a moment to run.
async fn wait_for_events(sink: &RecordingSink, expected: usize) {
    for _ in 0..50 {
        if sink.len() >= expected {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

async fn post(h: &Harness, path: &str, body: Value) -> (u16, Value) {
    let resp = h
        .http
        .post(format!("{}{}", h.base, path))
        .json(&body)
        .send()
        .await
        .unwrap();
    let status = resp.status().as_u16();
    let body = resp.json().await.unwrap_or(Value::Null);
    (status, body)
}

// ─── Tests ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_health() {
    let h = start().await;
    let body: Value = h
        .http
        .get(format!("{}/health", h.base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_change_echoes_document_and_logs() {
    let h = start().await;
    let doc = json!({ "id": 42, "name": "Hope House", "status": "active" });

    let (status, body) = post(
        &h,
        "/hooks/collections/providers/change",
        json!({ "doc": doc, "operation": "update" }),
    )
    .await;

    assert_eq!(status, 200);
    assert_eq!(body["doc"], doc);

    wait_for_events(&h.sink, 1).await;
    let events = h.sink.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].target, "providers");
    assert_eq!(events[0].kind, ChangeKind::Updated);
    assert_eq!(events[0].document_id, "42");
}

#[tokio::test]
async fn test_repeated_saves_within_cooldown_log_once() {
    let h = start().await;
    let req = json!({ "doc": { "id": 7, "title": "World AIDS Day" }, "operation": "update" });

    for _ in 0..3 {
        let (status, _) = post(&h, "/hooks/collections/blog/change", req.clone()).await;
        assert_eq!(status, 200);
        h.clock.advance(1000);
    }
    wait_for_events(&h.sink, 1).await;
    assert_eq!(h.sink.len(), 1);

    h.clock.advance(5000);
    post(&h, "/hooks/collections/blog/change", req).await;
    wait_for_events(&h.sink, 2).await;
    assert_eq!(h.sink.len(), 2);
}

#[tokio::test]
async fn test_delete_with_id_only() {
    let h = start().await;
    let (status, body) = post(
        &h,
        "/hooks/collections/pdf-library/delete",
        json!({ "id": 7 }),
    )
    .await;

    assert_eq!(status, 200);
    assert_eq!(body["doc"], Value::Null);

    wait_for_events(&h.sink, 1).await;
    let events = h.sink.events();
    assert_eq!(events[0].kind, ChangeKind::Deleted);
    assert_eq!(events[0].document_id, "7");
}

#[tokio::test]
async fn test_delete_falls_back_to_slug() {
    let h = start().await;
    let doc = json!({ "slug": "annual-report", "title": "Annual Report" });
    let (status, body) = post(
        &h,
        "/hooks/collections/blog/delete",
        json!({ "doc": doc }),
    )
    .await;

    assert_eq!(status, 200);
    assert_eq!(body["doc"], doc);
    wait_for_events(&h.sink, 1).await;
    assert_eq!(h.sink.events()[0].document_id, "annual-report");
}

#[tokio::test]
async fn test_global_change_uses_global_id() {
    let h = start().await;
    let doc = json!({ "hotlineNumber": "1-800-HIV-INFO" });
    let (status, body) = post(
        &h,
        "/hooks/globals/site-settings/change",
        json!({ "doc": doc }),
    )
    .await;

    assert_eq!(status, 200);
    assert_eq!(body["doc"], doc);
    wait_for_events(&h.sink, 1).await;
    let events = h.sink.events();
    assert_eq!(events[0].target, "site-settings");
    assert_eq!(events[0].document_id, "global");
}

#[tokio::test]
async fn test_unwatched_and_unknown_targets_are_404() {
    let h = start().await;

    let (status, body) = post(
        &h,
        "/hooks/collections/tags/change",
        json!({ "doc": { "id": 1 }, "operation": "create" }),
    )
    .await;
    assert_eq!(status, 404);
    assert_eq!(body["error"]["code"], "not_found");

    let (status, _) = post(
        &h,
        "/hooks/collections/widgets/delete",
        json!({ "id": 1 }),
    )
    .await;
    assert_eq!(status, 404);

    let (status, _) = post(
        &h,
        "/hooks/globals/footer/change",
        json!({ "doc": {} }),
    )
    .await;
    assert_eq!(status, 404);

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(h.sink.is_empty());
}

#[tokio::test]
async fn test_bad_operation_is_rejected() {
    let h = start().await;
    let (status, _) = post(
        &h,
        "/hooks/collections/providers/change",
        json!({ "doc": { "id": 1 }, "operation": "upsert" }),
    )
    .await;
    assert!((400..500).contains(&status));
    assert!(h.sink.is_empty());
}

struct FailingSink;

impl ChangeSink for FailingSink {
    fn emit(&self, _event: &ChangeEvent) -> anyhow::Result<()> {
        anyhow::bail!("stdout closed")
    }
}

#[tokio::test]
async fn test_failing_sink_still_answers_with_document() {
    let logger = ChangeLogger::with_parts(
        5000,
        100,
        Arc::new(ManualClock::new(0)),
        Arc::new(FailingSink),
    );
    let hooks = ChangeHooks::new(Arc::new(logger));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://127.0.0.1:{}", listener.local_addr().unwrap().port());
    tokio::spawn(async move {
        server::serve(listener, hooks).await.unwrap();
    });

    let http = reqwest::Client::new();
    for _ in 0..50 {
        if http.get(format!("{}/health", base)).send().await.is_ok() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    let doc = json!({ "id": 11, "name": "Hyacinth", "status": "active" });
    for path in [
        "/hooks/collections/providers/change",
        "/hooks/collections/blog/change",
    ] {
        let resp = http
            .post(format!("{}{}", base, path))
            .json(&json!({ "doc": doc, "operation": "create" }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status().as_u16(), 200);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["doc"], doc);
    }

    let resp = http
        .post(format!("{}/hooks/collections/providers/delete", base))
        .json(&json!({ "id": 11, "doc": doc }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["doc"], doc);
}
