// --------------------------------------------------
// Handles API endpoints related to task CRUD operations,
// settings, and backup export / import.
//
// Responsibilities:
// - Create / read / update / delete tasks
// - Toggle task completion (per occurrence for recurring tasks)
// - Get / update settings
// - Get / update month notes
// - Export / import the combined backup document
// -------------------------------------------------

use axum::{
    extract::{Path, Query, State},
    http::header,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiJson};
use crate::models::{self, Backup, Settings, Task, TaskRecord};
use crate::server::AppState;

#[derive(Debug, Serialize)]
pub struct TasksResponse {
    pub tasks: Vec<Task>,
}

// -----------------------------
// GET /api/tasks
// Returns every task of the local list
// -----------------------------
pub async fn get_tasks(State(state): State<AppState>) -> Json<TasksResponse> {
    Json(TasksResponse {
        tasks: state.planner.tasks(),
    })
}

// -----------------------------
// POST /api/tasks
// Validates and stores a new task
// -----------------------------
pub async fn create_task(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<TaskRecord>,
) -> Result<Json<Task>, ApiError> {
    let task = state.planner.add_task(input)?;
    Ok(Json(task))
}

// -----------------------------
// PUT /api/tasks/:id
// Replaces an existing task's definition
// ----------------------------
pub async fn update_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(input): ApiJson<TaskRecord>,
) -> Result<Json<Task>, ApiError> {
    let task = state.planner.update_task(&id, input)?;
    Ok(Json(task))
}

// -----------------------------
// DELETE /api/tasks/:id
// Removes a task permanently
// -----------------------------
pub async fn delete_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    state.planner.delete_task(&id)?;
    Ok(Json(serde_json::json!({ "ok": true })))
}

#[derive(Debug, Deserialize)]
pub struct ToggleQuery {
    pub date: Option<String>, // "YYYY-MM-DD", required for recurring tasks
}

// -----------------------------
// POST /api/tasks/:id/toggle
// Toggles completion of a task or of one recurring occurrence
// -----------------------------
pub async fn toggle_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(q): Query<ToggleQuery>,
) -> Result<Json<Task>, ApiError> {
    let date = q.date.as_deref().map(models::parse_date).transpose()?;
    let task = state.planner.toggle_completed(&id, date)?;
    Ok(Json(task))
}

// -----------------------------
// GET /api/settings
// -----------------------------
pub async fn get_settings(State(state): State<AppState>) -> Json<Settings> {
    Json(state.planner.settings())
}

// -----------------------------
// PUT /api/settings
// Takes effect immediately for every day view
// -----------------------------
pub async fn put_settings(
    State(state): State<AppState>,
    ApiJson(s): ApiJson<Settings>,
) -> Result<Json<Settings>, ApiError> {
    Ok(Json(state.planner.set_settings(s)?))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MonthNote {
    #[serde(default)]
    pub note: String,
}

// -----------------------------
// GET /api/notes/:year/:month
// Free-text note of one month, empty if none
// -----------------------------
pub async fn get_note(
    State(state): State<AppState>,
    Path((year, month)): Path<(i32, u32)>,
) -> Result<Json<MonthNote>, ApiError> {
    let note = state.planner.note(year, month)?;
    Ok(Json(MonthNote { note }))
}

// -----------------------------
// PUT /api/notes/:year/:month
// Blank text clears the note
// -----------------------------
pub async fn put_note(
    State(state): State<AppState>,
    Path((year, month)): Path<(i32, u32)>,
    ApiJson(body): ApiJson<MonthNote>,
) -> Result<Json<MonthNote>, ApiError> {
    let note = state.planner.set_note(year, month, &body.note)?;
    Ok(Json(MonthNote { note }))
}

// -----------------------------
// GET /api/export
// Downloads tasks, settings and notes as tasks-backup.json
// -----------------------------
pub async fn export_backup(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(header::CONTENT_DISPOSITION, "attachment; filename=\"tasks-backup.json\"")],
        Json(state.planner.export()),
    )
}

// -----------------------------
// POST /api/import
// Raw JSON body; malformed documents get 400 "invalid format"
// -----------------------------
pub async fn import_backup(State(state): State<AppState>, body: String) -> Result<Json<Backup>, ApiError> {
    Ok(Json(state.planner.import(&body)?))
}
