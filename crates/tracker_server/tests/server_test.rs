//! HTTP and WebSocket behaviour of a running server.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use rusqlite::Connection;
use serde_json::{Value, json};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracker_core::SyncedEntry;
use tracker_server::{
    AppState, Config, build_router,
    db::{DataRepo, init_database},
    email::EmailService,
    push::HttpPushSender,
    store::ServerStore,
    sync::ChangeHub,
};

async fn spawn_server(vars: &[(&str, &str)]) -> String {
    let vars: Vec<(String, String)> = vars
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    let config = Arc::new(
        Config::from_vars(|name| vars.iter().find(|(k, _)| k == name).map(|(_, v)| v.clone()))
            .unwrap(),
    );

    let conn = Connection::open_in_memory().unwrap();
    init_database(&conn).unwrap();
    let state = AppState {
        config: config.clone(),
        store: Arc::new(ServerStore::new(
            Arc::new(DataRepo::new(conn)),
            Arc::new(ChangeHub::new()),
        )),
        email_service: Arc::new(EmailService::new(config)),
        push_sender: Arc::new(HttpPushSender::new()),
    };

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, build_router(&state)).await.unwrap();
    });
    format!("127.0.0.1:{}", addr.port())
}

#[tokio::test]
async fn put_then_get_round_trips_row() {
    let addr = spawn_server(&[]).await;
    let client = reqwest::Client::new();

    let missing = client
        .get(format!("http://{}/api/data/budget", addr))
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status(), 404);

    let written: SyncedEntry = client
        .put(format!("http://{}/api/data/budget", addr))
        .json(&json!({ "value": { "rent": 1200 }, "updated_at": "2025-03-01T08:00:00.123456Z" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(written.value, json!({ "rent": 1200 }));

    let read: SyncedEntry = client
        .get(format!("http://{}/api/data/budget", addr))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(read, written);

    let all: Vec<SyncedEntry> = client
        .get(format!("http://{}/api/data", addr))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(all, vec![written]);
}

#[tokio::test]
async fn subscriber_receives_writes_to_its_key_only() {
    let addr = spawn_server(&[]).await;
    let client = reqwest::Client::new();

    let (mut ws, _) = connect_async(format!("ws://{}/api/subscribe?key=streak_count", addr))
        .await
        .unwrap();

    // Wait until the subscription is registered before writing
    for _ in 0..50 {
        let status: Value = client
            .get(format!("http://{}/api/status", addr))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        if status["live_subscribers"] == json!(1) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    client
        .put(format!("http://{}/api/data/other_key", addr))
        .json(&json!({ "value": "ignored" }))
        .send()
        .await
        .unwrap();
    client
        .put(format!("http://{}/api/data/streak_count", addr))
        .json(&json!({ "value": 5 }))
        .send()
        .await
        .unwrap();

    let frame = tokio::time::timeout(Duration::from_secs(5), ws.next())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    let Message::Text(text) = frame else {
        panic!("expected a text frame, got {:?}", frame);
    };
    let entry: SyncedEntry = serde_json::from_str(&text).unwrap();
    assert_eq!(entry.key, "streak_count");
    assert_eq!(entry.value, json!(5));
}

#[tokio::test]
async fn push_endpoints_validate_and_dedup() {
    let addr = spawn_server(&[]).await;
    let client = reqwest::Client::new();

    let bad = client
        .post(format!("http://{}/api/push/subscribe", addr))
        .json(&json!({ "keys": {} }))
        .send()
        .await
        .unwrap();
    assert_eq!(bad.status(), 400);
    let body: Value = bad.json().await.unwrap();
    assert_eq!(body["error"], "Invalid subscription");

    for _ in 0..2 {
        let ok = client
            .post(format!("http://{}/api/push/subscribe", addr))
            .json(&json!({ "endpoint": "https://push.example/abc" }))
            .send()
            .await
            .unwrap();
        assert_eq!(ok.status(), 200);
    }

    let stored: SyncedEntry = client
        .get(format!("http://{}/api/data/push_subscriptions", addr))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(stored.value.as_array().unwrap().len(), 1);

    let bad_schedule = client
        .post(format!("http://{}/api/push/schedule", addr))
        .json(&json!({ "time": "08:00" }))
        .send()
        .await
        .unwrap();
    assert_eq!(bad_schedule.status(), 400);

    let schedule = client
        .post(format!("http://{}/api/push/schedule", addr))
        .json(&json!([{ "time": "08:00", "message": "Stretch", "enabled": true }]))
        .send()
        .await
        .unwrap();
    assert_eq!(schedule.status(), 200);
}

#[tokio::test]
async fn cron_requires_secret_and_reports_missing_schedules() {
    let addr = spawn_server(&[("CRON_SECRET", "s3cret")]).await;
    let client = reqwest::Client::new();

    let denied = client
        .get(format!("http://{}/api/cron/notify", addr))
        .send()
        .await
        .unwrap();
    assert_eq!(denied.status(), 401);

    let allowed: Value = client
        .get(format!("http://{}/api/cron/notify", addr))
        .bearer_auth("s3cret")
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(allowed, json!({ "message": "No schedules found" }));
}

#[tokio::test]
async fn auth_log_without_email_reports_error_body() {
    let addr = spawn_server(&[]).await;

    let response = reqwest::Client::new()
        .post(format!("http://{}/api/auth-log", addr))
        .json(&json!({ "timestamp": 1740787200000i64, "userAgent": "Safari" }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Email service not configured");
}

#[tokio::test]
async fn tools_pass_through_to_store() {
    let addr = spawn_server(&[]).await;
    let client = reqwest::Client::new();

    let definitions: Value = client
        .get(format!("http://{}/api/tools", addr))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(definitions.as_array().unwrap().len(), 2);

    let update: Value = client
        .post(format!("http://{}/api/tools/updateUserData", addr))
        .json(&json!({ "key": "theme", "value": "dark" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(update["success"], true);
    assert_eq!(update["message"], "Successfully updated theme.");

    let read: Value = client
        .post(format!("http://{}/api/tools/getUserData", addr))
        .json(&json!({ "key": "theme" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(read["value"], "dark");

    let unknown = client
        .post(format!("http://{}/api/tools/deleteEverything", addr))
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(unknown.status(), 404);
    let body: Value = unknown.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().contains("deleteEverything"));

    let missing_value = client
        .post(format!("http://{}/api/tools/updateUserData", addr))
        .json(&json!({ "key": "theme" }))
        .send()
        .await
        .unwrap();
    assert_eq!(missing_value.status(), 400);
    let body: Value = missing_value.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().starts_with("Invalid tool arguments"));
    assert!(body.get("value").is_none());
}
