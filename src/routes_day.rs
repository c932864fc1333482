use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiJson};
use crate::interval::{TimeInterval, MINUTES_PER_DAY};
use crate::logic::{self, DayOverview, DaySummary};
use crate::models::{self, Occurrence, Settings, Task};
use crate::server::AppState;
use crate::sync;

#[derive(Debug, Deserialize)]
pub struct SourceQuery {
    pub group: Option<String>, // read a group's list instead of the local one
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunningTask {
    pub task_id: String,
    pub title: String,
    pub progress: u8, // percent
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayResponse {
    #[serde(flatten)]
    pub summary: DaySummary,
    pub running: Vec<RunningTask>,
    pub settings: Settings,
}

#[derive(Debug, Serialize)]
pub struct MonthResponse {
    pub year: i32,
    pub month: u32,
    pub days: Vec<DayOverview>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictRequest {
    pub date: String,     // "YYYY-MM-DD"
    pub time: String,     // "HH:MM"
    pub duration: u32,    // minutes
    pub ignore_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ConflictResponse {
    pub conflict: bool,
    pub conflicts: Vec<Occurrence>,
}

fn now_local() -> NaiveDateTime {
    chrono::Local::now().naive_local()
}

// Task list a view is computed from: a group's, or the local planner's.
fn source_tasks(state: &AppState, q: &SourceQuery) -> Result<Vec<Task>, ApiError> {
    match q.group.as_deref() {
        Some(g) if sync::valid_group_id(g) => Ok(state.hub.tasks(g)),
        Some(g) => Err(ApiError::BadRequest(format!("invalid group id: {g}"))),
        None => Ok(state.planner.tasks()),
    }
}

// -----------------------------
// GET /api/days/:date
// Occurrences, gaps, free time and load level of one day
// -----------------------------
pub async fn get_day(
    State(state): State<AppState>,
    Path(date): Path<String>,
    Query(q): Query<SourceQuery>,
) -> Result<Json<DayResponse>, ApiError> {
    let date = models::parse_date(&date)?;
    let tasks = source_tasks(&state, &q)?;
    let settings = state.planner.settings();

    let summary = logic::day_summary(&tasks, date, &settings);
    let now = now_local();
    let running = summary
        .occurrences
        .iter()
        .filter_map(|o| {
            logic::occurrence_progress(o, now).map(|progress| RunningTask {
                task_id: o.task_id.clone(),
                title: o.title.clone(),
                progress,
            })
        })
        .collect();

    tracing::debug!(%date, occurrences = summary.occurrences.len(), free = summary.free_minutes, "day computed");
    Ok(Json(DayResponse { summary, running, settings }))
}

// -----------------------------
// GET /api/months/:year/:month
// Per-day load levels for calendar colouring
// -----------------------------
pub async fn get_month(
    State(state): State<AppState>,
    Path((year, month)): Path<(i32, u32)>,
    Query(q): Query<SourceQuery>,
) -> Result<Json<MonthResponse>, ApiError> {
    let tasks = source_tasks(&state, &q)?;
    let settings = state.planner.settings();

    let days = logic::month_overview(&tasks, year, month, &settings)
        .ok_or_else(|| ApiError::BadRequest(format!("invalid month: {year}-{month}")))?;
    Ok(Json(MonthResponse { year, month, days }))
}

// -----------------------------
// POST /api/conflicts
// Advisory overlap check before creating or editing a task
// -----------------------------
pub async fn check_conflicts(
    State(state): State<AppState>,
    Query(q): Query<SourceQuery>,
    ApiJson(req): ApiJson<ConflictRequest>,
) -> Result<Json<ConflictResponse>, ApiError> {
    let date: NaiveDate = models::parse_date(&req.date)?;
    let start = models::parse_hhmm(&req.time)?;
    if req.duration == 0 {
        return Err(ApiError::BadRequest("duration must be positive".to_string()));
    }
    let candidate = TimeInterval::new(start, start.saturating_add(req.duration).min(MINUTES_PER_DAY));

    let tasks = source_tasks(&state, &q)?;
    let conflicts = logic::conflicts_with(&tasks, date, &candidate, req.ignore_id.as_deref());

    Ok(Json(ConflictResponse {
        conflict: !conflicts.is_empty(),
        conflicts,
    }))
}
