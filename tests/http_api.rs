use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use shared_scheduler::server::{api_router, AppState};
use shared_scheduler::store::MemoryStore;
use shared_scheduler::ServerMessage;

fn app() -> (AppState, Router) {
    let state = AppState::new(Arc::new(MemoryStore::new())).unwrap();
    (state.clone(), api_router(state))
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut req = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(v) => {
            req = req.header(header::CONTENT_TYPE, "application/json");
            Body::from(v.to_string())
        }
        None => Body::empty(),
    };

    let resp = app.clone().oneshot(req.body(body).unwrap()).await.unwrap();
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

fn single(title: &str, date: &str, time: &str, duration: &str) -> Value {
    json!({ "type": "single", "title": title, "time": time, "duration": duration, "date": date })
}

#[tokio::test]
async fn task_crud_cycle() {
    let (_state, app) = app();

    let (status, created) = send(&app, Method::POST, "/api/tasks", Some(single("Интеграционная задача", "2025-03-10", "10:00", "60"))).await;
    assert_eq!(status, StatusCode::OK);
    let id = created["id"].as_str().unwrap().to_string();

    let (status, updated) = send(
        &app,
        Method::PUT,
        &format!("/api/tasks/{id}"),
        Some(single("Измененная задача", "2025-03-10", "10:00", "60")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["id"], id.as_str());
    assert_eq!(updated["title"], "Измененная задача");

    let (status, toggled) = send(&app, Method::POST, &format!("/api/tasks/{id}/toggle"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(toggled["completed"], true);

    let (status, _) = send(&app, Method::DELETE, &format!("/api/tasks/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);

    let (_, list) = send(&app, Method::GET, "/api/tasks", None).await;
    assert_eq!(list["tasks"], json!([]));

    let (status, _) = send(&app, Method::DELETE, &format!("/api/tasks/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn empty_title_is_rejected() {
    let (state, app) = app();
    let (status, body) = send(&app, Method::POST, "/api/tasks", Some(single("  ", "2025-03-10", "10:00", "60"))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "title required");
    assert!(state.planner.tasks().is_empty());
}

#[tokio::test]
async fn day_view_reflects_daily_hours() {
    let (_state, app) = app();

    let (status, _) = send(&app, Method::PUT, "/api/settings", Some(json!({ "step": 10, "dailyHours": 0 }))).await;
    assert_eq!(status, StatusCode::OK);
    let (_, day0) = send(&app, Method::GET, "/api/days/2025-03-10", None).await;

    send(&app, Method::PUT, "/api/settings", Some(json!({ "step": 10, "dailyHours": 8 }))).await;
    let (_, day8) = send(&app, Method::GET, "/api/days/2025-03-10", None).await;

    assert_eq!(day0["freeHours"], "24h");
    assert_eq!(day8["freeHours"], "16h");
    assert_eq!(
        day0["freeMinutes"].as_u64().unwrap() - day8["freeMinutes"].as_u64().unwrap(),
        8 * 60
    );
    assert_eq!(day8["level"], "free");

    let (status, _) = send(&app, Method::PUT, "/api/settings", Some(json!({ "dailyHours": 3 }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn day_view_expands_recurring_tasks() {
    let (_state, app) = app();
    let weekly = json!({
        "type": "recurring",
        "title": "Повторяющаяся задача",
        "time": "15:00",
        "duration": "30",
        "recurringType": "weekly",
        "weekdays": ["1", "3", "5"],
        "startDate": "2025-03-01",
        "endDate": "2025-03-31"
    });
    send(&app, Method::POST, "/api/tasks", Some(weekly)).await;
    send(&app, Method::POST, "/api/tasks", Some(single("Обычная задача", "2025-03-10", "10:00", "60"))).await;

    // 2025-03-10 is a Monday
    let (_, day) = send(&app, Method::GET, "/api/days/2025-03-10", None).await;
    let occ = day["occurrences"].as_array().unwrap();
    assert_eq!(occ.len(), 2);
    assert_eq!(occ[0]["time"], "10:00");
    assert_eq!(occ[1]["isRecurringInstance"], true);
    assert_eq!(day["gaps"].as_array().unwrap().len(), 3);

    let (_, tuesday) = send(&app, Method::GET, "/api/days/2025-03-11", None).await;
    assert!(tuesday["occurrences"].as_array().unwrap().is_empty());

    let (status, month) = send(&app, Method::GET, "/api/months/2025/3", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(month["days"].as_array().unwrap().len(), 31);

    let (status, _) = send(&app, Method::GET, "/api/days/2025-13-01", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn conflict_check_is_advisory() {
    let (state, app) = app();
    send(&app, Method::POST, "/api/tasks", Some(single("Первая задача", "2025-03-10", "10:00", "120"))).await;

    let (_, overlapping) = send(
        &app,
        Method::POST,
        "/api/conflicts",
        Some(json!({ "date": "2025-03-10", "time": "11:00", "duration": 60 })),
    )
    .await;
    assert_eq!(overlapping["conflict"], true);

    let (_, touching) = send(
        &app,
        Method::POST,
        "/api/conflicts",
        Some(json!({ "date": "2025-03-10", "time": "12:00", "duration": 60 })),
    )
    .await;
    assert_eq!(touching["conflict"], false);

    // The overlapping task can still be created.
    let (status, _) = send(&app, Method::POST, "/api/tasks", Some(single("Пересекающаяся задача", "2025-03-10", "11:00", "60"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(state.planner.tasks().len(), 2);
}

#[tokio::test]
async fn import_and_export() {
    let (state, app) = app();

    let (status, body) = send(&app, Method::POST, "/api/import", Some(json!({ "invalidProperty": "test" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().starts_with("invalid format"));

    let doc = json!({
        "tasks": [single("Импортированная задача", "2025-03-10", "14:00", "90")],
        "settings": { "step": 30, "theme": "dark-mode", "notifications": true }
    });
    let (status, _) = send(&app, Method::POST, "/api/import", Some(doc)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(state.planner.settings().step, 30);

    let resp = app
        .clone()
        .oneshot(Request::builder().uri("/api/export").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(
        resp.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"tasks-backup.json\""
    );
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let exported: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(exported["tasks"][0]["title"], "Импортированная задача");
    assert_eq!(exported["tasks"][0]["duration"], 90);
}

#[tokio::test]
async fn group_replace_over_http_reaches_socket_members() {
    let (state, app) = app();
    let (member, mut rx) = state.hub.connect();
    state.hub.join(&member, "g1");
    assert_eq!(
        rx.try_recv().unwrap(),
        ServerMessage::TasksUpdated { group_id: "g1".into(), tasks: vec![] }
    );

    let (_, empty) = send(&app, Method::GET, "/api/groups/g1/tasks", None).await;
    assert_eq!(empty, json!({ "tasks": [] }));

    let task = json!({ "id": "x", "type": "single", "title": "taskX", "time": "09:00", "duration": 30, "date": "2025-03-10" });
    let (status, body) = send(&app, Method::POST, "/api/groups/g1/tasks", Some(json!({ "tasks": [task] }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let ServerMessage::TasksUpdated { tasks, .. } = rx.try_recv().unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].id(), "x");

    let (_, day) = send(&app, Method::GET, "/api/days/2025-03-10?group=g1", None).await;
    assert_eq!(day["occurrences"].as_array().unwrap().len(), 1);

    let (status, _) = send(&app, Method::GET, "/api/groups/bad%20id/tasks", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn undecodable_bodies_get_json_400() {
    let (state, app) = app();

    let bad_task = json!({ "type": "single", "title": "", "time": "09:00", "duration": 30, "date": "2025-03-10" });
    let (status, body) = send(&app, Method::POST, "/api/groups/g1/tasks", Some(json!({ "tasks": [bad_task] }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("title required"));
    assert!(state.hub.tasks("g1").is_empty());

    let (status, body) = send(&app, Method::PUT, "/api/settings", Some(json!({ "step": "ten" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (status, body) = send(&app, Method::POST, "/api/conflicts", Some(json!({ "date": "2025-03-10" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn month_notes_round_trip() {
    let (state, app) = app();

    let (status, body) = send(&app, Method::GET, "/api/notes/2025/1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "note": "" }));

    let (status, _) = send(&app, Method::PUT, "/api/notes/2025/1", Some(json!({ "note": "Тестовый план на январь" }))).await;
    assert_eq!(status, StatusCode::OK);
    let (_, body) = send(&app, Method::GET, "/api/notes/2025/1", None).await;
    assert_eq!(body["note"], "Тестовый план на январь");

    let (_, exported) = send(&app, Method::GET, "/api/export", None).await;
    assert_eq!(exported["notes"], json!({ "2025-01": "Тестовый план на январь" }));

    let (status, _) = send(&app, Method::PUT, "/api/notes/2025/13", Some(json!({ "note": "x" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(state.planner.export().notes.len(), 1);
}
